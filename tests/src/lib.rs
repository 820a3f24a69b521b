//! Integration tests spanning the jscloak crates.

#[cfg(test)]
mod core;
#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod transforms;
