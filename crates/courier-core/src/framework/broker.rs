//! The broker pipeline.
//!
//! One [`Broker`] serves every invocation of a process. Each call runs
//!
//! ```text
//! raw ──▶ Normalizer ──▶ Dispatcher ──▶ response::build ──▶ output
//! ```
//!
//! and owns its [`Payload`]; the handler table is shared read-only, so a
//! broker may be used from several threads at once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{Level, debug, error, span};

use crate::error::{BrokerError, BrokerResult};
use crate::foundation::envelope::{DEFAULT_NAMESPACE, Normalizer, NormalizerConfig};
use crate::foundation::payload::Payload;
use crate::framework::dispatcher::Dispatcher;
use crate::framework::registry::HandlerTable;
use crate::framework::response;

/// Broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Read every envelope in passthrough mode.
    #[serde(default)]
    pub passthrough: bool,

    /// Report the underlying cause of envelope failures instead of a generic
    /// message.
    #[serde(default)]
    pub propagate_exceptions: bool,

    /// Namespace for un-namespaced keys and custom endpoint uris.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_owned()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            passthrough: false,
            propagate_exceptions: false,
            namespace: default_namespace(),
        }
    }
}

impl BrokerConfig {
    /// Enables passthrough mode (builder pattern).
    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// Enables exception propagation (builder pattern).
    pub fn with_propagate_exceptions(mut self, propagate: bool) -> Self {
        self.propagate_exceptions = propagate;
        self
    }

    /// Sets the namespace (builder pattern).
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            passthrough: self.passthrough,
            namespace: self.namespace.clone(),
        }
    }
}

/// Runs the normalize, dispatch and respond pipeline.
#[derive(Debug, Clone)]
pub struct Broker {
    normalizer: Normalizer,
    dispatcher: Dispatcher,
    propagate_exceptions: bool,
}

impl Broker {
    /// Creates a broker over a frozen handler table.
    pub fn new(config: BrokerConfig, table: Arc<HandlerTable>) -> Self {
        Self {
            normalizer: Normalizer::new(config.normalizer_config()),
            dispatcher: Dispatcher::new(table, config.namespace),
            propagate_exceptions: config.propagate_exceptions,
        }
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handles one raw envelope and returns the output string.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::InvalidEnvelope`] if the envelope cannot be normalized
    /// - [`BrokerError::Dispatch`] if an event handler fails
    /// - [`BrokerError::Response`] if the output cannot be serialized
    pub fn handle(&self, raw: &str) -> BrokerResult<String> {
        let payload = self.normalize(raw)?;
        debug!(kind = %payload.kind(), key = %payload.key(), "Envelope normalized");

        let payload = self.dispatcher.dispatch(payload).inspect_err(|err| {
            error!(error = %err, "Dispatch aborted");
        })?;
        Ok(response::build(&payload)?)
    }

    /// Handles one raw envelope inside a span tagged with the host's
    /// invocation id.
    ///
    /// # Errors
    ///
    /// Same as [`Broker::handle`].
    pub fn handle_invocation(&self, raw: &str, request_id: &str) -> BrokerResult<String> {
        let span = span!(Level::INFO, "invocation", request_id = %request_id);
        let _enter = span.enter();
        self.handle(raw)
    }

    fn normalize(&self, raw: &str) -> BrokerResult<Payload> {
        self.normalizer.normalize(raw).map_err(|err| {
            error!(error = %err, "Failed to normalize envelope");
            BrokerError::invalid_envelope(err, self.propagate_exceptions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    use crate::foundation::error::{EnvelopeError, HandlerError, HandlerResult};
    use crate::framework::descriptor::Declaration;
    use crate::framework::registry::HandlerRegistry;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_broker_is_send_sync() {
        assert_send_sync::<Broker>();
    }

    #[test]
    fn test_config_defaults() {
        let config: BrokerConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, BrokerConfig::default());
        assert_eq!(config.namespace, "commerce");
        assert!(!config.passthrough);
        assert!(!config.propagate_exceptions);
    }

    #[test]
    fn test_invalid_envelope_message_depends_on_propagation() {
        let raw = r#"{"passthrough": true}"#;
        let config = BrokerConfig::default().with_passthrough(true);

        let hidden = Broker::new(config.clone(), HandlerTable::empty())
            .handle(raw)
            .unwrap_err();
        assert_eq!(hidden.to_string(), "Invalid event payload");

        let shown = Broker::new(config.with_propagate_exceptions(true), HandlerTable::empty())
            .handle(raw)
            .unwrap_err();
        assert_eq!(shown.to_string(), "Key must be provided and cannot be blank");
        assert!(matches!(
            shown,
            BrokerError::InvalidEnvelope { source: EnvelopeError::BlankKey, .. }
        ));
    }

    #[test]
    fn test_request_error_becomes_error_envelope() {
        let table = HandlerRegistry::new()
            .named_request(
                "endpoint",
                |_: &mut Payload| -> HandlerResult { Err(HandlerError::request("E1", "nope")) },
                [Declaration::sync_event(["commerce:some/url/2"])],
            )
            .unwrap()
            .build();
        let broker = Broker::new(BrokerConfig::default(), table);

        let output = broker
            .handle_invocation(
                r#"{"version": 2, "typeId": 5, "eventName": "some/url/2", "uuid": "u-1", "currentUserId": "user-1"}"#,
                "req-1",
            )
            .unwrap();
        let output: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            output,
            json!({
                "uuid": "u-1",
                "error": { "code": "E1", "message": "nope" },
                "currentUserId": "user-1",
                "body": {},
            })
        );
    }

    #[test]
    fn test_custom_namespace_applies_to_keys() {
        let table = HandlerRegistry::new()
            .named_event(
                "audit",
                |payload: &mut Payload| -> HandlerResult {
                    payload.body_mut().insert("seen".into(), json!(true));
                    Ok(())
                },
                [Declaration::async_event(["shop:ORDER_PLACED"])],
            )
            .unwrap()
            .build();
        let broker = Broker::new(BrokerConfig::default().with_namespace("shop"), table);

        let output = broker
            .handle(r#"{"version": 2, "typeId": 1, "eventName": "ORDER_PLACED", "currentUserId": "u"}"#)
            .unwrap();
        let output: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(output["key"], "shop:ORDER_PLACED");
        assert_eq!(output["body"]["seen"], true);
    }
}
