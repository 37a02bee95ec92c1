//! Step grids and pattern code, kept in sync.
//!
//! The [`engine`] owns tracks, the mix, global parameters, the saved-pattern
//! library and undo history, and turns them into one program for an
//! external pattern evaluator. [`evaluator`] is the seam to that evaluator;
//! [`pipeline`] reads and writes the project on disk.

pub mod engine;
pub mod evaluator;
pub mod pipeline;
