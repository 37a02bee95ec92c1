use crate::shared::{DisplayState, Mode};

// state local to tui, used to resolve keys into semantic inputevents
// synced from DisplayState per loop
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub mode: Mode,
    pub naming: bool, // library name prompt is open, keys go to the name
}

impl TuiState {
    pub fn sync(&mut self, ds: &DisplayState) {
        self.mode = ds.mode;
        self.naming = ds.name_prompt.is_some();
    }
}
