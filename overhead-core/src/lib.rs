///! Core satellite tracking subsystem
///!
///! Selects and persists a stable working set of orbital objects near an
///! observer, propagates their element sets to geodetic positions on demand
///! and caches the computed result. HTTP plumbing lives in `overhead-server`.
pub mod errors;
pub mod sat;

pub use errors::{Result, TrackerError};
