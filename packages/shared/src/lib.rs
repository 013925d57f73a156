//! Utilities shared by the Nounou binaries: logging setup and clock helpers.

pub mod logger;
pub mod time;
