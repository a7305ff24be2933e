//! Report rendering: fixed-width console output and machine-readable JSON.

pub mod console;
pub mod json;
