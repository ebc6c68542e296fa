//! Provides input/output for model checkpoints and generation reports.
//!
//! Checkpoints are a directory holding JSON vocabulary metadata next to a safetensors
//! weight file; reports are flat CSV tables with one row per generated molecule.

pub mod checkpoint;
pub mod report;
