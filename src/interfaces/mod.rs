//! Interfaces layer: the CSV script and report formats used by the binary.

pub mod csv;
