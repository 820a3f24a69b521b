//! Command-line front end of the jscloak JavaScript obfuscator.

pub mod commands;
