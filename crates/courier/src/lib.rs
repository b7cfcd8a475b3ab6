//! # Courier
//!
//! A per-invocation message broker that routes JSON envelopes to registered
//! handlers.
//!
//! ## Overview
//!
//! A host (typically a serverless function) calls Courier once per
//! invocation with a raw JSON envelope. Courier reads one of three envelope
//! schemas, routes the resulting payload to every handler declared for its
//! key, and returns the final payload (or a compact error envelope) as a
//! string.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌────────────┐     ┌──────────┐
//! │    Host     │────▶│ Normalizer │────▶│ Dispatcher │────▶│ Response │
//! │ (raw JSON)  │     │            │     │            │     │          │
//! └─────────────┘     └────────────┘     └────────────┘     └──────────┘
//!                                           │  │  │
//!                                        event / request handlers
//! ```
//!
//! - **Runtime**: Loads configuration, installs logging, freezes the registry
//! - **Normalizer**: Legacy, versioned and passthrough envelope schemas
//! - **Dispatcher**: Case-insensitive fan-out to every matching handler
//! - **Handlers**: Event handlers (errors abort) and request handlers (errors
//!   are returned to the caller)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier::prelude::*;
//!
//! fn verify_email(payload: &mut Payload) -> HandlerResult {
//!     info!(user = ?payload.current_user_id(), "Verifying email");
//!     Ok(())
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = HandlerRegistry::new()
//!         .event(verify_email, [Declaration::async_event(["pagebuilder:VERIFY_EMAIL"])])?;
//!
//!     let runtime = CourierRuntime::builder().registry(registry).build()?;
//!     let output = runtime.handle_invocation(
//!         r#"{"eventType":"pagebuilder:VERIFY_EMAIL","eventTime":0}"#,
//!         "req-1",
//!     )?;
//!     println!("{output}");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use courier_core as core;
pub use courier_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use courier_runtime::{CourierRuntime, RuntimeError};

    // Handler registration
    pub use courier_core::prelude::*;

    // Logging macros for handlers
    pub use courier_runtime::prelude::*;
}
