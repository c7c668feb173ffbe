//! Tracks how much time is spent on which websites and whether that time
//! was productive. A browser-side shim feeds tab, focus and idle events to
//! the `serve` daemon over stdin; the daemon attributes elapsed time to
//! domains, classifies it, and folds it into rolling daily/weekly/monthly
//! counters that the other subcommands read back out.
//!

pub mod cli;
pub mod storage;
pub mod tracker;
pub mod utils;
