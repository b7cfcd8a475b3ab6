//! # Courier Core
//!
//! The per-invocation message broker behind Courier.
//!
//! Every invocation hands the broker one raw JSON envelope. The broker
//! normalizes it into a [`Payload`], routes the payload to every registered
//! handler whose declared key matches, and turns the final payload into the
//! output string.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Payload**: The normalized message and its call kind ([`Payload`], [`CallKind`])
//! - **Envelope**: Legacy, versioned and passthrough schemas ([`Normalizer`])
//! - **Errors**: Envelope and handler failures ([`EnvelopeError`], [`HandlerError`])
//!
//! ### Framework Layer
//!
//! - **Handlers**: The two handler families ([`EventHandler`], [`RequestHandler`])
//! - **Registry**: Explicit registration with declarations ([`HandlerRegistry`])
//! - **Dispatcher**: Case-insensitive fan-out routing ([`Dispatcher`])
//! - **Broker**: The end-to-end pipeline ([`Broker`])
//!
//! ```text
//! ┌──────────┐     ┌────────────┐     ┌────────────┐     ┌──────────┐
//! │ envelope │────▶│ Normalizer │────▶│ Dispatcher │────▶│ response │
//! └──────────┘     └────────────┘     └────────────┘     └──────────┘
//!                                        │   ▲
//!                                        ▼   │
//!                                      handlers
//! ```
//!
//! ## Example
//!
//! ```rust
//! use courier_core::prelude::*;
//!
//! let table = HandlerRegistry::new()
//!     .named_request(
//!         "cart_add",
//!         |payload: &mut Payload| -> HandlerResult {
//!             payload.body_mut().insert("accepted".into(), true.into());
//!             Ok(())
//!         },
//!         [Declaration::request_intercept(["commerce:CART_ADD"])],
//!     )
//!     .unwrap()
//!     .build();
//!
//! let broker = Broker::new(BrokerConfig::default(), table);
//! let output = broker
//!     .handle(r#"{"uuid":"1","key":"CART_ADD","typeId":2,"uri":"","currentUserId":"u"}"#)
//!     .unwrap();
//! assert!(output.contains(r#""accepted":true"#));
//! ```

pub mod error;
pub mod foundation;
pub mod framework;

pub use error::{
    BrokerError, BrokerResult, DispatchError, DispatchResult, RegistryError, RegistryResult,
    ResponseError, ResponseResult,
};

// Re-export foundation types
pub use foundation::{
    CallKind, EnvelopeError, EnvelopeResult, HandlerError, HandlerResult, Normalizer,
    NormalizerConfig, Payload, RequestError,
};

// Re-export framework types
pub use framework::{
    Broker, BrokerConfig, Declaration, Dispatcher, EventHandler, HandlerRegistry, HandlerTable,
    RequestHandler,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::{BrokerError, BrokerResult};
    pub use super::foundation::{CallKind, HandlerError, HandlerResult, Payload, RequestError};
    pub use super::framework::{
        Broker, BrokerConfig, Declaration, EventHandler, HandlerRegistry, RequestHandler,
    };
}
