//! Persistence for tracker state, organized through [store::JsonFileStore].
//! The basic idea is:
//!  - There is a directory holding one JSON file per top-level key
//!    (`settings`, `daily`, `weekly`, ...).
//!  - Writes are last-write-wins per key and guarded with advisory file
//!    locks, so a read-side CLI can run next to the daemon.
//!  - A value that fails to parse is treated as absent rather than an error.

pub mod entities;
pub mod store;
