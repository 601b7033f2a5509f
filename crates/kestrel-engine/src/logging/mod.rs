//! Logging setup.
//!
//! The engine logs through the `log` facade; this module installs the
//! `env_logger` backend for binaries that want it.

mod init;

pub use init::{LoggingConfig, init_logging};
