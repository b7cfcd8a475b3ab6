//! Response projection.
//!
//! A request-kind payload that carries an error is answered with a compact
//! error envelope:
//!
//! ```json
//! { "uuid": "...", "error": { "code": "...", "message": "..." }, "currentUserId": "...", "body": {} }
//! ```
//!
//! Everything else is answered with the payload itself.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;

use crate::error::ResponseResult;
use crate::foundation::payload::{Payload, RequestError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<&'a str>,
    error: &'a RequestError,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_user_id: Option<&'a str>,
    body: &'a Map<String, Value>,
}

/// Serializes the final payload into the output string.
///
/// # Errors
///
/// Returns [`ResponseError::Serialize`](crate::error::ResponseError::Serialize)
/// if serialization fails.
pub fn build(payload: &Payload) -> ResponseResult<String> {
    let result = match payload.error() {
        Some(error) if payload.kind().is_request() => serde_json::to_string(&ErrorEnvelope {
            uuid: payload.uuid(),
            error,
            current_user_id: payload.current_user_id(),
            body: payload.body(),
        }),
        _ => serde_json::to_string(payload),
    };

    result.map_err(|err| {
        error!(key = %payload.key(), error = %err, "Failed to serialize response");
        err.into()
    })
}
