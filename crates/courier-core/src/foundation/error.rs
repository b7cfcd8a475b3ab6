//! Error types raised by envelopes and handlers.
//!
//! Errors raised while routing and serializing live in [`crate::error`].

use thiserror::Error;

// =============================================================================
// Envelope Errors
// =============================================================================

/// Errors that make an inbound envelope invalid.
///
/// Every variant aborts the invocation before any handler runs.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The message is not valid JSON.
    #[error("unable to deserialize incoming message payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The message is valid JSON but not an object.
    #[error("envelope must be a JSON object")]
    NotAnObject,

    /// A field required by the detected schema is absent or null.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A field is present but has the wrong shape.
    #[error("field '{field}' is invalid: {reason}")]
    InvalidField {
        /// The offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Passthrough envelopes must carry a non-blank `key`.
    #[error("Key must be provided and cannot be blank")]
    BlankKey,

    /// Passthrough `time` is not an epoch-seconds value.
    #[error("Time is not a valid epoch format")]
    InvalidEpoch,

    /// The `typeId` does not name a known call kind.
    #[error("unknown typeId {0}")]
    UnknownTypeId(i64),

    /// Versioned envelopes only carry async (1) or sync (5) events.
    #[error("typeId {0} is not supported by versioned envelopes")]
    UnsupportedVersionedType(i64),

    /// A legacy envelope with neither `eventType` nor `key`.
    #[error("legacy envelope must carry either 'eventType' or 'key'")]
    Unrecognized,
}

impl EnvelopeError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for envelope normalization.
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

// =============================================================================
// Handler Errors
// =============================================================================

/// Errors a handler can return.
///
/// Request dispatch attaches [`HandlerError::Request`] to the payload verbatim
/// and every other variant under the sentinel code `9999`. Event dispatch
/// attaches nothing: any error aborts the invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Structured error raised by a request handler.
    #[error("{message}")]
    Request {
        /// Caller-visible error code.
        code: String,
        /// Caller-visible error message.
        message: String,
    },

    /// Structured error raised by an event handler.
    #[error("{message}")]
    Event {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },

    /// Any other failure.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    /// Creates a structured request error.
    pub fn request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a structured event error.
    pub fn event(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Event {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a request error from `"code:message"` shorthand.
    ///
    /// Splits on the first `:`; the rest, colons included, is the message.
    /// Text without a `:` becomes the code with an empty message.
    pub fn request_pair(pair: &str) -> Self {
        let (code, message) = split_pair(pair);
        Self::request(code, message)
    }

    /// Creates an event error from `"code:message"` shorthand.
    pub fn event_pair(pair: &str) -> Self {
        let (code, message) = split_pair(pair);
        Self::event(code, message)
    }

    /// Creates an unstructured failure from a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(anyhow::Error::msg(message.into()))
    }

    /// Returns the structured code, if the error carries one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Request { code, .. } | Self::Event { code, .. } => Some(code),
            Self::Failed(_) => None,
        }
    }
}

fn split_pair(pair: &str) -> (&str, &str) {
    pair.split_once(':').unwrap_or((pair, ""))
}

/// Result type returned by handlers.
pub type HandlerResult = Result<(), HandlerError>;
