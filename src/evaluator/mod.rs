//! The seam to whatever actually plays program text.
//!
//! The engine only produces text; an [`Evaluator`] receives it. The middle
//! layer emits [`EvalCommand`]s and the binary forwards them with
//! [`dispatch`].

use thiserror::Error;

mod program_file;

pub use program_file::ProgramFileEvaluator;

/// Identifies one accepted `evaluate` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EvalHandle(pub u64);

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("nothing to play")]
    EmptyProgram,
    #[error("evaluator is busy")]
    Busy,
    #[error("evaluator has shut down")]
    Disconnected,
    #[error("evaluator i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub enum EvalCommand {
    Evaluate(String),
    Stop,
    SetCps(f64),
}

/// How a request ended, reported back asynchronously.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalOutcome {
    Running,
    Stopped,
    /// A newer request arrived before this one was applied.
    Superseded,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvalReport {
    pub handle: Option<EvalHandle>,
    pub outcome: EvalOutcome,
}

pub trait Evaluator {
    fn evaluate(&mut self, program: &str) -> Result<EvalHandle, EvalError>;
    fn stop(&mut self) -> Result<(), EvalError>;
    /// Change the tempo of the running program without waiting for a new
    /// `evaluate`. Does nothing when nothing is running.
    fn set_cps(&mut self, cps: f64) -> Result<(), EvalError>;
}

pub fn dispatch<E: Evaluator + ?Sized>(
    evaluator: &mut E,
    cmd: EvalCommand,
) -> Result<Option<EvalHandle>, EvalError> {
    match cmd {
        EvalCommand::Evaluate(program) => evaluator.evaluate(&program).map(Some),
        EvalCommand::Stop => evaluator.stop().map(|_| None),
        EvalCommand::SetCps(cps) => evaluator.set_cps(cps).map(|_| None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        next: u64,
    }

    impl Evaluator for Recorder {
        fn evaluate(&mut self, program: &str) -> Result<EvalHandle, EvalError> {
            if program.trim().is_empty() {
                return Err(EvalError::EmptyProgram);
            }
            self.calls.push(format!("eval {program}"));
            self.next += 1;
            Ok(EvalHandle(self.next))
        }

        fn stop(&mut self) -> Result<(), EvalError> {
            self.calls.push("stop".into());
            Ok(())
        }

        fn set_cps(&mut self, cps: f64) -> Result<(), EvalError> {
            self.calls.push(format!("cps {cps}"));
            Ok(())
        }
    }

    #[test]
    fn dispatch_routes_each_command() {
        let mut r = Recorder::default();
        let handle = dispatch(&mut r, EvalCommand::Evaluate("s(\"bd\")".into())).unwrap();
        assert_eq!(handle, Some(EvalHandle(1)));
        assert_eq!(dispatch(&mut r, EvalCommand::SetCps(0.5)).unwrap(), None);
        assert_eq!(dispatch(&mut r, EvalCommand::Stop).unwrap(), None);
        assert_eq!(r.calls, vec!["eval s(\"bd\")", "cps 0.5", "stop"]);
    }

    #[test]
    fn dispatch_passes_errors_up() {
        let mut r = Recorder::default();
        let err = dispatch(&mut r, EvalCommand::Evaluate("  ".into())).unwrap_err();
        assert!(matches!(err, EvalError::EmptyProgram));
        assert!(r.calls.is_empty());
    }
}
