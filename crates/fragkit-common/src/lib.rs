//! # FragKit Common
//!
//! Shared infrastructure for the FragKit crates.
//!
//! ## Features
//!
//! - Logging configuration and setup on top of `tracing-subscriber`
//! - Engine configuration resolved once per process

pub mod config;
pub mod logging;

pub use config::{ConfigError, EngineConfig, CONFIG_ENV_VAR};
pub use logging::{init_logging, try_init_logging, LogConfig, LogFormat};
