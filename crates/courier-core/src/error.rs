//! Error types for registration, dispatch and the broker pipeline.
//!
//! Envelope and handler errors are defined in [`crate::foundation::error`].

use thiserror::Error;

use crate::foundation::error::{EnvelopeError, HandlerError};
use crate::framework::descriptor::HandlerKind;

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while registering handlers.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A declaration does not belong to the handler's family.
    #[error("handler '{handler}' is a {expected} handler but carries a '{declaration}' declaration")]
    KindMismatch {
        /// The handler name.
        handler: String,
        /// The offending declaration.
        declaration: &'static str,
        /// The family the handler was registered as.
        expected: HandlerKind,
    },
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors that escape dispatch.
///
/// Only event handlers produce these; request handler failures are attached to
/// the payload.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An event handler failed.
    #[error("event handler '{handler}' failed: {source}")]
    EventHandler {
        /// The handler name.
        handler: String,
        /// The handler's error.
        #[source]
        source: HandlerError,
    },
}

// =============================================================================
// Response Errors
// =============================================================================

/// Errors raised while building the output string.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The payload could not be serialized.
    #[error("unable to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

// =============================================================================
// Broker Errors
// =============================================================================

/// Errors returned by [`Broker::handle`](crate::framework::Broker::handle).
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The envelope could not be normalized.
    ///
    /// `message` is the underlying failure when exception propagation is
    /// enabled, otherwise [`BrokerError::GENERIC_INVALID_ENVELOPE`].
    #[error("{message}")]
    InvalidEnvelope {
        /// Caller-visible message.
        message: String,
        /// The underlying failure.
        #[source]
        source: EnvelopeError,
    },

    /// An event handler failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The response could not be serialized.
    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl BrokerError {
    /// Message used when envelope failures are not propagated.
    pub const GENERIC_INVALID_ENVELOPE: &'static str = "Invalid event payload";

    /// Wraps an envelope error, keeping its message only if `propagate` is set.
    pub fn invalid_envelope(source: EnvelopeError, propagate: bool) -> Self {
        let message = if propagate {
            source.to_string()
        } else {
            Self::GENERIC_INVALID_ENVELOPE.to_owned()
        };
        Self::InvalidEnvelope { message, source }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for handler registration.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for dispatch.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for response building.
pub type ResponseResult<T> = Result<T, ResponseError>;

/// Result type for the broker pipeline.
pub type BrokerResult<T> = Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_envelope_hides_cause_unless_propagated() {
        let hidden = BrokerError::invalid_envelope(EnvelopeError::BlankKey, false);
        assert_eq!(hidden.to_string(), "Invalid event payload");

        let shown = BrokerError::invalid_envelope(EnvelopeError::BlankKey, true);
        assert_eq!(shown.to_string(), "Key must be provided and cannot be blank");
    }

    #[test]
    fn test_dispatch_error_names_handler() {
        let err = DispatchError::EventHandler {
            handler: "VerifyEmail".into(),
            source: HandlerError::event("E1", "mailbox full"),
        };
        assert_eq!(err.to_string(), "event handler 'VerifyEmail' failed: mailbox full");
    }
}
