//! Envelope normalization.
//!
//! Three envelope schemas coexist on the wire. The [`Normalizer`] detects which
//! one a message uses and builds a [`Payload`] from it:
//!
//! ```text
//! passthrough flag set ──▶ passthrough   key required, body merged, time in epoch seconds
//! version > 1          ──▶ versioned     typeId ∈ {1, 5}, eventName namespaced
//! otherwise            ──▶ legacy        eventType ⇒ event, key ⇒ request
//! ```
//!
//! Field access is lenient in the way the upstream producers expect: text
//! fields accept any scalar, integer fields accept numeric strings and coerce
//! anything else to `0`, and an explicit `null` counts as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::error::{EnvelopeError, EnvelopeResult};
use super::payload::{CallKind, Payload};

/// Namespace prepended to keys that carry none.
pub const DEFAULT_NAMESPACE: &str = "commerce";

/// Prefixes `key` with `namespace` unless it already contains a `:`.
///
/// ```rust
/// use courier_core::foundation::envelope::namespace_key;
///
/// assert_eq!(namespace_key("CART_ADD", "commerce"), "commerce:CART_ADD");
/// assert_eq!(namespace_key("pagebuilder:VERIFY_EMAIL", "commerce"), "pagebuilder:VERIFY_EMAIL");
/// ```
pub fn namespace_key(key: &str, namespace: &str) -> String {
    if key.contains(':') {
        key.to_owned()
    } else {
        format!("{namespace}:{key}")
    }
}

/// Settings that decide how envelopes are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Read every envelope in passthrough mode.
    #[serde(default)]
    pub passthrough: bool,

    /// Namespace for un-namespaced keys.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_owned()
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            passthrough: false,
            namespace: default_namespace(),
        }
    }
}

/// Turns raw JSON envelopes into [`Payload`]s.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    /// Creates a normalizer with the given settings.
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Returns the settings of this normalizer.
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Parses and normalizes one raw envelope.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvelopeError`] when the message is not a JSON object or
    /// misses a field required by its schema.
    pub fn normalize(&self, raw: &str) -> EnvelopeResult<Payload> {
        let fields = match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Fields(map),
            _ => return Err(EnvelopeError::NotAnObject),
        };

        if self.config.passthrough {
            trace!("Normalizing envelope in passthrough mode");
            return self.passthrough(fields);
        }

        match fields.int("version") {
            Some(version) if version > 1 => {
                trace!(version, "Normalizing versioned envelope");
                self.versioned(fields, version)
            }
            _ => {
                trace!("Normalizing legacy envelope");
                self.legacy(fields)
            }
        }
    }

    fn namespaced(&self, key: &str) -> String {
        namespace_key(key, &self.config.namespace)
    }

    fn passthrough(&self, mut fields: Fields) -> EnvelopeResult<Payload> {
        let is_async = match fields.get("typeId") {
            None => true,
            Some(value) => scalar_text(value).as_deref() == Some("1"),
        };
        let kind = if is_async {
            CallKind::AsyncEvent
        } else {
            CallKind::SyncEvent
        };

        let key = match fields.text("key")? {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(EnvelopeError::BlankKey),
        };

        let mut payload = Payload::new(kind, key)
            .with_version(2)
            .with_uuid("")
            .with_current_user_id("")
            .with_time(Utc::now());

        if let Some(version) = fields.int("version") {
            payload.version = version;
        }
        if let Some(type_id) = fields.int("typeId") {
            payload.kind = CallKind::try_from(type_id)?;
        }
        if let Some(time) = fields.text("time")? {
            let seconds = time
                .parse::<i64>()
                .map_err(|_| EnvelopeError::InvalidEpoch)?;
            payload.time =
                Some(DateTime::from_timestamp(seconds, 0).ok_or(EnvelopeError::InvalidEpoch)?);
        }
        if let Some(uuid) = fields.text("uuid")? {
            payload.uuid = Some(uuid);
        }
        if let Some(user_id) = fields.text("currentUserId")? {
            payload.current_user_id = Some(user_id);
        }
        if let Some(Value::Object(body)) = fields.take("body") {
            payload.body.extend(body);
        }

        debug!(key = %payload.key, kind = %payload.kind, "Normalized passthrough envelope");
        Ok(payload)
    }

    fn versioned(&self, mut fields: Fields, version: i64) -> EnvelopeResult<Payload> {
        let type_id = fields.required_int("typeId")?;
        let kind = match type_id {
            1 => CallKind::AsyncEvent,
            5 => CallKind::SyncEvent,
            other => return Err(EnvelopeError::UnsupportedVersionedType(other)),
        };

        let current_user_id = fields.required_text("currentUserId")?;
        let event_name = fields.required_text("eventName")?;

        let mut payload = Payload::new(kind, self.namespaced(&event_name))
            .with_version(version)
            .with_current_user_id(current_user_id);

        if let Some(millis) = fields.int("eventTime") {
            payload.time = Some(millis_to_time("eventTime", millis)?);
        }
        if let Some(uuid) = fields.text("uuid")? {
            payload.uuid = Some(uuid);
        }
        payload.body = fields.body()?;

        debug!(key = %payload.key, kind = %payload.kind, version, "Normalized versioned envelope");
        Ok(payload)
    }

    fn legacy(&self, mut fields: Fields) -> EnvelopeResult<Payload> {
        let mut payload = if fields.contains("eventType") {
            let event_type = fields.required_text("eventType")?;
            let millis = fields.required_int("eventTime")?;
            Payload::new(CallKind::AsyncEvent, self.namespaced(&event_type))
                .with_time(millis_to_time("eventTime", millis)?)
        } else if fields.contains("key") {
            let uuid = fields.required_text("uuid")?;
            let key = fields.required_text("key")?;
            let kind = CallKind::try_from(fields.required_int("typeId")?)?;
            let uri = fields.required_text("uri")?;
            let current_user_id = fields.required_text("currentUserId")?;
            Payload::new(kind, self.namespaced(&key))
                .with_uuid(uuid)
                .with_uri(uri)
                .with_current_user_id(current_user_id)
        } else {
            return Err(EnvelopeError::Unrecognized);
        };
        payload.version = 1;
        payload.body = fields.body()?;

        debug!(key = %payload.key, kind = %payload.kind, "Normalized legacy envelope");
        Ok(payload)
    }
}

fn millis_to_time(field: &'static str, millis: i64) -> EnvelopeResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| EnvelopeError::invalid_field(field, "timestamp out of range"))
}

/// Lenient, name-based access to the fields of an envelope object.
struct Fields(Map<String, Value>);

impl Fields {
    /// Returns the field unless it is absent or `null`.
    fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn take(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name).filter(|v| !v.is_null())
    }

    fn text(&self, name: &'static str) -> EnvelopeResult<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => scalar_text(value)
                .map(Some)
                .ok_or_else(|| EnvelopeError::invalid_field(name, "expected a scalar value")),
        }
    }

    fn required_text(&self, name: &'static str) -> EnvelopeResult<String> {
        self.text(name)?.ok_or(EnvelopeError::MissingField(name))
    }

    fn int(&self, name: &str) -> Option<i64> {
        self.get(name).map(coerce_int)
    }

    fn required_int(&self, name: &'static str) -> EnvelopeResult<i64> {
        self.int(name).ok_or(EnvelopeError::MissingField(name))
    }

    /// Takes the body verbatim; absent or `null` becomes an empty object.
    fn body(&mut self) -> EnvelopeResult<Map<String, Value>> {
        match self.take("body") {
            None => Ok(Map::new()),
            Some(Value::Object(body)) => Ok(body),
            Some(_) => Err(EnvelopeError::invalid_field(
                "body",
                "expected a JSON object",
            )),
        }
    }
}

/// Text form of a non-null scalar; `None` for everything else.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use serde_json::json;

    fn normalize(value: Value) -> EnvelopeResult<Payload> {
        Normalizer::default().normalize(&value.to_string())
    }

    fn passthrough(value: Value) -> EnvelopeResult<Payload> {
        Normalizer::new(NormalizerConfig {
            passthrough: true,
            ..Default::default()
        })
        .normalize(&value.to_string())
    }

    #[test]
    fn test_namespace_key_prefixes_bare_keys_only() {
        for key in ["CART_ADD", "some/url/1", ""] {
            assert_eq!(namespace_key(key, "commerce"), format!("commerce:{key}"));
        }
        for key in ["pagebuilder:VERIFY_EMAIL", "commerce:CART_ADD", ":"] {
            assert_eq!(namespace_key(key, "commerce"), key);
        }
    }

    #[test]
    fn test_rejects_non_json_and_non_objects() {
        let normalizer = Normalizer::default();
        assert!(matches!(
            normalizer.normalize("not json"),
            Err(EnvelopeError::Json(_))
        ));
        assert!(matches!(
            normalizer.normalize("[1, 2]"),
            Err(EnvelopeError::NotAnObject)
        ));
    }

    #[test]
    fn test_legacy_event() {
        let payload = normalize(json!({
            "eventType": "VERIFY_EMAIL",
            "eventTime": 1_648_496_000_000_i64,
            "body": {"email": "a@b.c"}
        }))
        .unwrap();

        assert_eq!(payload.kind(), CallKind::AsyncEvent);
        assert_eq!(payload.key(), "commerce:VERIFY_EMAIL");
        assert_eq!(payload.version(), 1);
        assert_eq!(
            payload.time(),
            Some(Utc.timestamp_millis_opt(1_648_496_000_000).unwrap())
        );
        assert_eq!(payload.body()["email"], "a@b.c");
    }

    #[test]
    fn test_legacy_event_with_empty_time_is_epoch() {
        let payload = normalize(json!({"eventType": "pagebuilder:VERIFY_EMAIL", "eventTime": ""}))
            .unwrap();
        assert_eq!(payload.key(), "pagebuilder:VERIFY_EMAIL");
        assert_eq!(payload.time().map(|t| t.timestamp_millis()), Some(0));
        assert!(payload.body().is_empty());
    }

    #[test]
    fn test_legacy_event_requires_event_time() {
        assert!(matches!(
            normalize(json!({"eventType": "VERIFY_EMAIL"})),
            Err(EnvelopeError::MissingField("eventTime"))
        ));
    }

    #[test]
    fn test_legacy_request() {
        let payload = normalize(json!({
            "key": "CART_ADD",
            "typeId": 2,
            "uuid": "abc",
            "uri": "/cart",
            "currentUserId": "user-9"
        }))
        .unwrap();

        assert_eq!(payload.kind(), CallKind::RequestIntercept);
        assert_eq!(payload.key(), "commerce:CART_ADD");
        assert_eq!(payload.uuid(), Some("abc"));
        assert_eq!(payload.raw_uri(), Some("/cart"));
        assert_eq!(payload.current_user_id(), Some("user-9"));
        assert_eq!(payload.version(), 1);
    }

    #[test]
    fn test_legacy_request_requires_every_field() {
        for missing in ["uuid", "typeId", "uri", "currentUserId"] {
            let mut envelope = json!({
                "key": "CART_ADD",
                "typeId": 2,
                "uuid": "",
                "uri": "",
                "currentUserId": ""
            });
            envelope.as_object_mut().unwrap().remove(missing);
            assert!(
                matches!(normalize(envelope), Err(EnvelopeError::MissingField(f)) if f == missing),
                "{missing} should be required"
            );
        }
    }

    #[test]
    fn test_null_fields_count_as_absent() {
        let envelope = json!({
            "key": "CART_ADD",
            "typeId": 2,
            "uuid": "",
            "uri": null,
            "currentUserId": ""
        });
        assert!(matches!(
            normalize(envelope),
            Err(EnvelopeError::MissingField("uri"))
        ));

        let payload = passthrough(json!({"key": "k", "typeId": null})).unwrap();
        assert_eq!(payload.kind(), CallKind::AsyncEvent);
    }

    #[test]
    fn test_legacy_request_accepts_string_type_id() {
        let payload = normalize(json!({
            "key": "x", "typeId": "4", "uuid": "", "uri": "", "currentUserId": ""
        }))
        .unwrap();
        assert_eq!(payload.kind(), CallKind::CustomEndpoint);
    }

    #[test]
    fn test_legacy_without_discriminator_is_rejected() {
        assert!(matches!(
            normalize(json!({"body": {}})),
            Err(EnvelopeError::Unrecognized)
        ));
    }

    #[test]
    fn test_version_one_is_legacy() {
        let payload = normalize(json!({"version": 1, "eventType": "X", "eventTime": 0})).unwrap();
        assert_eq!(payload.key(), "commerce:X");
        assert_eq!(payload.version(), 1);
    }

    #[test]
    fn test_versioned_sync_event() {
        let payload = normalize(json!({
            "eventName": "commerce:some/url/2",
            "version": 2,
            "typeId": 5,
            "uuid": "uuid123",
            "currentUserId": "userid123",
            "body": {"test": "sync body"}
        }))
        .unwrap();

        assert_eq!(payload.kind(), CallKind::SyncEvent);
        assert_eq!(payload.version(), 2);
        assert_eq!(payload.key(), "commerce:some/url/2");
        assert_eq!(payload.uuid(), Some("uuid123"));
        assert_eq!(payload.current_user_id(), Some("userid123"));
        assert_eq!(payload.body()["test"], "sync body");
        assert_eq!(payload.time(), None);
    }

    #[test]
    fn test_versioned_async_event_reads_millis() {
        let payload = normalize(json!({
            "eventName": "VERIFY_EMAIL",
            "version": 2,
            "typeId": 1,
            "eventTime": 1_648_496_000,
            "currentUserId": ""
        }))
        .unwrap();

        assert_eq!(payload.kind(), CallKind::AsyncEvent);
        assert_eq!(payload.key(), "commerce:VERIFY_EMAIL");
        assert_eq!(payload.time().map(|t| t.timestamp_millis()), Some(1_648_496_000));
        assert_eq!(payload.uuid(), None);
    }

    #[test]
    fn test_versioned_rejects_request_intercept_types() {
        for type_id in [2, 3, 4] {
            let result = normalize(json!({
                "eventName": "commerce:SYNC_TEST",
                "version": 2,
                "typeId": type_id,
                "uuid": "",
                "currentUserId": ""
            }));
            assert!(matches!(
                result,
                Err(EnvelopeError::UnsupportedVersionedType(t)) if t == type_id
            ));
        }
    }

    #[test]
    fn test_versioned_requires_event_name() {
        assert!(matches!(
            normalize(json!({"version": 3, "typeId": 5, "currentUserId": ""})),
            Err(EnvelopeError::MissingField("eventName"))
        ));
    }

    #[test]
    fn test_body_must_be_an_object() {
        assert!(matches!(
            normalize(json!({"eventType": "X", "eventTime": 0, "body": [1]})),
            Err(EnvelopeError::InvalidField { field: "body", .. })
        ));
    }

    #[test]
    fn test_passthrough_requires_key() {
        let result = passthrough(json!({
            "eventName": "pagebuilder:VERIFY_EMAIL",
            "version": 2,
            "typeId": 1,
            "currentUserId": ""
        }));
        assert!(matches!(result, Err(EnvelopeError::BlankKey)));
        assert!(matches!(
            passthrough(json!({"key": "   "})),
            Err(EnvelopeError::BlankKey)
        ));
    }

    #[test]
    fn test_passthrough_defaults_and_overlay() {
        let payload = passthrough(json!({
            "key": "pagebuilder:VERIFY_EMAIL",
            "time": "1679696377",
            "body": {"someKey": "someValue", "aUtf8Char": "€"}
        }))
        .unwrap();

        assert_eq!(payload.kind(), CallKind::AsyncEvent);
        assert_eq!(payload.version(), 2);
        assert_eq!(payload.uuid(), Some(""));
        assert_eq!(payload.current_user_id(), Some(""));
        let time = payload.time().unwrap();
        assert_eq!((time.year(), time.month(), time.day()), (2023, 3, 24));
        assert_eq!(payload.body()["someKey"], "someValue");
        assert_eq!(payload.body()["aUtf8Char"], "€");
    }

    #[test]
    fn test_passthrough_does_not_namespace() {
        let payload = passthrough(json!({"key": "VERIFY_EMAIL"})).unwrap();
        assert_eq!(payload.key(), "VERIFY_EMAIL");
    }

    #[test]
    fn test_passthrough_type_id_selects_request_default() {
        let payload = passthrough(json!({"key": "k", "typeId": 3, "uuid": "u"})).unwrap();
        assert_eq!(payload.kind(), CallKind::ResponseIntercept);
        assert_eq!(payload.uuid(), Some("u"));

        let payload = passthrough(json!({"key": "k", "typeId": "1"})).unwrap();
        assert_eq!(payload.kind(), CallKind::AsyncEvent);
    }

    #[test]
    fn test_passthrough_rejects_bad_epoch() {
        assert!(matches!(
            passthrough(json!({"key": "k", "time": "yesterday"})),
            Err(EnvelopeError::InvalidEpoch)
        ));
    }

    #[test]
    fn test_passthrough_ignores_non_object_body() {
        let payload = passthrough(json!({"key": "k", "body": "text"})).unwrap();
        assert!(payload.body().is_empty());
    }

    #[test]
    fn test_custom_namespace() {
        let normalizer = Normalizer::new(NormalizerConfig {
            passthrough: false,
            namespace: "identity".into(),
        });
        let payload = normalizer
            .normalize(r#"{"eventType":"LOGIN","eventTime":0}"#)
            .unwrap();
        assert_eq!(payload.key(), "identity:LOGIN");
    }
}
