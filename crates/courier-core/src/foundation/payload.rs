//! The normalized, typed form of one inbound envelope.
//!
//! A [`Payload`] is produced by the [`Normalizer`](super::envelope::Normalizer),
//! mutated in place by the [`Dispatcher`](crate::framework::Dispatcher) and
//! finally projected into an output string by the response builder.
//!
//! # Call kinds
//!
//! ```text
//! typeId  kind               handler set   routing key
//! ──────  ─────────────────  ───────────   ─────────────────────────────
//!   1     AsyncEvent         event         key
//!   2     RequestIntercept   request       key + "_BEFORE" (or raw key)
//!   3     ResponseIntercept  request       key + "_AFTER"  (or raw key)
//!   4     CustomEndpoint     request       namespaced uri
//!   5     SyncEvent          request       key
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::error::EnvelopeError;

/// The kind of call an envelope represents, keyed by its numeric `typeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Fire-and-forget event (`typeId = 1`).
    AsyncEvent,
    /// Intercept that runs before the host handles a request (`typeId = 2`).
    RequestIntercept,
    /// Intercept that runs after the host handled a request (`typeId = 3`).
    ResponseIntercept,
    /// Custom endpoint routed by uri (`typeId = 4`).
    CustomEndpoint,
    /// Synchronous event (`typeId = 5`).
    SyncEvent,
}

impl CallKind {
    /// Returns the numeric `typeId` of this kind.
    pub fn type_id(self) -> u8 {
        match self {
            Self::AsyncEvent => 1,
            Self::RequestIntercept => 2,
            Self::ResponseIntercept => 3,
            Self::CustomEndpoint => 4,
            Self::SyncEvent => 5,
        }
    }

    /// Returns `true` for the only event kind, [`CallKind::AsyncEvent`].
    ///
    /// Every other kind is a request kind and may carry an error back to the
    /// caller.
    pub fn is_event(self) -> bool {
        matches!(self, Self::AsyncEvent)
    }

    /// Returns `true` for request kinds (typeIds 2 through 5).
    pub fn is_request(self) -> bool {
        !self.is_event()
    }

    /// Returns a short name suitable for log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AsyncEvent => "async_event",
            Self::RequestIntercept => "request_intercept",
            Self::ResponseIntercept => "response_intercept",
            Self::CustomEndpoint => "custom_endpoint",
            Self::SyncEvent => "sync_event",
        }
    }
}

impl TryFrom<i64> for CallKind {
    type Error = EnvelopeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::AsyncEvent),
            2 => Ok(Self::RequestIntercept),
            3 => Ok(Self::ResponseIntercept),
            4 => Ok(Self::CustomEndpoint),
            5 => Ok(Self::SyncEvent),
            other => Err(EnvelopeError::UnknownTypeId(other)),
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CallKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.type_id())
    }
}

/// A structured error attached to a request-kind payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestError {
    /// Caller-visible error code.
    pub code: String,
    /// Caller-visible error message.
    pub message: String,
}

impl RequestError {
    /// Sentinel code used for failures that carry no code of their own.
    pub const UNHANDLED_CODE: &'static str = "9999";

    /// Creates a request error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates the fallback error for an unstructured handler failure.
    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::new(Self::UNHANDLED_CODE, message)
    }
}

/// The normalized payload of one invocation.
///
/// `body` is always a JSON object. `key` is namespaced except in passthrough
/// mode. `error` is only ever set while dispatching a request kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub(crate) key: String,
    pub(crate) body: Map<String, Value>,
    #[serde(rename = "typeId")]
    pub(crate) kind: CallKind,
    pub(crate) version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) current_user_id: Option<String>,
    #[serde(
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<RequestError>,
}

impl Payload {
    /// Creates a payload of the given kind with an empty body.
    pub fn new(kind: CallKind, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            body: Map::new(),
            kind,
            version: 1,
            uuid: None,
            current_user_id: None,
            time: None,
            uri: None,
            error: None,
        }
    }

    /// Sets the schema version (builder pattern).
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Sets the caller-supplied uuid (builder pattern).
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    /// Sets the caller's user id (builder pattern).
    pub fn with_current_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.current_user_id = Some(user_id.into());
        self
    }

    /// Sets the event time (builder pattern).
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Sets the legacy endpoint uri (builder pattern).
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Replaces the body (builder pattern).
    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }

    /// The routing key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The call kind.
    pub fn kind(&self) -> CallKind {
        self.kind
    }

    /// The numeric `typeId`.
    pub fn type_id(&self) -> u8 {
        self.kind.type_id()
    }

    /// The schema version (1 for legacy envelopes).
    pub fn version(&self) -> i64 {
        self.version
    }

    /// The caller-supplied uuid, if any.
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    /// The id of the user that triggered the call, if any.
    pub fn current_user_id(&self) -> Option<&str> {
        self.current_user_id.as_deref()
    }

    /// The event time, if any.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    /// The legacy endpoint uri.
    #[deprecated(note = "custom endpoints route by `key`; `uri` is kept for legacy envelopes")]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub(crate) fn raw_uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// The JSON body.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Mutable access to the JSON body, for handlers that write a result.
    pub fn body_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.body
    }

    /// The error attached during dispatch, if any.
    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    /// Attaches an error, replacing any earlier one.
    pub fn set_error(&mut self, error: RequestError) {
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_kind_round_trips_type_ids() {
        for id in 1..=5 {
            let kind = CallKind::try_from(id).unwrap();
            assert_eq!(i64::from(kind.type_id()), id);
        }
    }

    #[test]
    fn test_call_kind_rejects_unknown_type_id() {
        assert!(matches!(
            CallKind::try_from(7),
            Err(EnvelopeError::UnknownTypeId(7))
        ));
        assert!(CallKind::try_from(0).is_err());
    }

    #[test]
    fn test_only_async_event_is_event_kind() {
        assert!(CallKind::AsyncEvent.is_event());
        assert!(CallKind::RequestIntercept.is_request());
        assert!(CallKind::ResponseIntercept.is_request());
        assert!(CallKind::CustomEndpoint.is_request());
        assert!(CallKind::SyncEvent.is_request());
    }

    #[test]
    fn test_payload_serializes_camel_case_and_skips_absent_fields() {
        let payload = Payload::new(CallKind::SyncEvent, "commerce:ORDER")
            .with_version(2)
            .with_uuid("u-1")
            .with_current_user_id("user-1")
            .with_time(DateTime::from_timestamp_millis(1_648_496_000).unwrap());

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "key": "commerce:ORDER",
                "body": {},
                "typeId": 5,
                "version": 2,
                "uuid": "u-1",
                "currentUserId": "user-1",
                "time": 1_648_496_000_i64,
            })
        );
    }

    #[test]
    fn test_set_error_keeps_last() {
        let mut payload = Payload::new(CallKind::CustomEndpoint, "commerce:x");
        payload.set_error(RequestError::new("1", "first"));
        payload.set_error(RequestError::unhandled("second"));
        assert_eq!(payload.error(), Some(&RequestError::new("9999", "second")));
    }
}
