//! Small helpers shared across the crate
pub(crate) mod hashing;
pub(crate) mod statistics;
