use thiserror::Error;

/// Every way an engine operation can be refused. None of these leave the
/// engine half-mutated.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EngineError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("{what} {value} is out of range ({allowed})")]
    OutOfRange {
        what: &'static str,
        value: String,
        allowed: &'static str,
    },

    #[error("a pattern named '{0}' already exists")]
    DuplicateName(String),

    #[error("'{0}' not found")]
    NotFound(String),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl EngineError {
    pub(crate) fn out_of_range(
        what: &'static str,
        value: impl ToString,
        allowed: &'static str,
    ) -> Self {
        EngineError::OutOfRange {
            what,
            value: value.to_string(),
            allowed,
        }
    }
}
