//! Courier Runtime - Configuration, logging and assembly for Courier.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `CourierConfig`)
//! - Logging configuration (`LoggingBuilder`, `SpanEvents`)
//! - Runtime assembly (`CourierRuntime`)
//!
//! ```rust,no_run
//! use courier_runtime::CourierRuntime;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Loads courier.toml from the current directory plus COURIER_* overrides
//! let runtime = CourierRuntime::builder().build()?;
//! let output = runtime.handle(r#"{"eventType":"ORDER_PLACED","eventTime":0}"#)?;
//! println!("{output}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig, LoggingConfig, Profile};
pub use error::{LoggingError, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{CourierRuntime, RuntimeBuilder};

// Re-export figment for programmatic overrides and tracing for handler crates
pub use figment;
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides the logging macros handlers commonly need:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
