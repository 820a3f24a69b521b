//! Structural metrics used to report what the transform passes did.

pub mod metrics;
