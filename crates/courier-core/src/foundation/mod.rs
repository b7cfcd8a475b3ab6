//! Foundation layer - Payload model and envelope parsing.
//!
//! This module contains the data the broker works on:
//! - The normalized [`Payload`] and its [`CallKind`]
//! - Envelope normalization for the legacy, versioned and passthrough schemas
//! - Envelope and handler error types

pub mod envelope;
pub mod error;
pub mod payload;

pub use envelope::{DEFAULT_NAMESPACE, Normalizer, NormalizerConfig, namespace_key};
pub use error::{EnvelopeError, EnvelopeResult, HandlerError, HandlerResult};
pub use payload::{CallKind, Payload, RequestError};
