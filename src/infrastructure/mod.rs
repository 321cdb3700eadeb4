//! Infrastructure layer module
//!
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Host telemetry probes (sysinfo)

pub mod config;
pub mod logging;
pub mod telemetry;
