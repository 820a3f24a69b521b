//! Shared error types for the jscloak crates.

pub mod errors;
