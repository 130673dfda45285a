//! # Logging Setup
//!
//! Installs the process-wide `log` backend: a `fern` dispatcher writing
//! `[timestamp][target][level] message` lines to stdout and to a per-run file.
//! Library code only ever talks to the `log` facade.

/// fern dispatcher and log file retention.
pub mod logsetup;

pub use logsetup::{cleanup_old_logs, parse_level, setup_logging};
