//! Payload dispatcher.
//!
//! The [`Dispatcher`] routes one [`Payload`] to every handler whose declared
//! key matches the routing key derived from the payload's call kind.
//!
//! # Fan-out Dispatch
//!
//! 1. Handlers are visited in registration order
//! 2. Every declared key is compared case-insensitively with the routing key
//! 3. Every match invokes the handler; nothing short-circuits
//!
//! Finding no handler at all is not an error.
//!
//! Event handler failures abort dispatch and propagate to the caller.
//! Request handler failures are captured onto the payload (see
//! [`capture`](super::capture)) and dispatch continues.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{Level, debug, info, span, trace};

use crate::error::{DispatchError, DispatchResult};
use crate::foundation::envelope::namespace_key;
use crate::foundation::payload::{CallKind, Payload};
use crate::framework::capture::capture;
use crate::framework::registry::HandlerTable;

/// Routes payloads to registered handlers.
///
/// `Dispatcher` is `Send + Sync`; the handler table is shared read-only.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<HandlerTable>,
    namespace: String,
}

impl Dispatcher {
    /// Creates a dispatcher over `table`.
    ///
    /// `namespace` is applied to the uri of custom endpoint calls.
    pub fn new(table: Arc<HandlerTable>, namespace: impl Into<String>) -> Self {
        Self {
            table,
            namespace: namespace.into(),
        }
    }

    /// Returns the handler table.
    pub fn table(&self) -> &Arc<HandlerTable> {
        &self.table
    }

    /// Dispatches `payload` and returns it, possibly carrying an error.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::EventHandler`] when an event handler fails.
    /// Request handler failures never produce an error here.
    pub fn dispatch(&self, mut payload: Payload) -> DispatchResult<Payload> {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            kind = %payload.kind(),
            key = %payload.key()
        );
        let _enter = span.enter();

        let invoked = if payload.kind().is_event() {
            self.dispatch_event(&mut payload)?
        } else {
            self.dispatch_request(&mut payload)
        };

        if invoked == 0 {
            debug!("No handler matched");
        } else {
            debug!(invoked, "Dispatch finished");
        }
        Ok(payload)
    }

    fn dispatch_event(&self, payload: &mut Payload) -> DispatchResult<usize> {
        let mut invoked = 0;
        for descriptor in self.table.event_handlers() {
            for key in &descriptor.keys {
                if !keys_match(payload.key(), key) {
                    continue;
                }
                trace!(handler = %descriptor.name, key = %key, "Event handler matched");
                descriptor
                    .handler
                    .handle(payload)
                    .map_err(|source| DispatchError::EventHandler {
                        handler: descriptor.name.clone(),
                        source,
                    })?;
                invoked += 1;
            }
        }
        Ok(invoked)
    }

    fn dispatch_request(&self, payload: &mut Payload) -> usize {
        let kind = payload.kind();
        let mut invoked = 0;
        for descriptor in self.table.request_handlers() {
            let Some(route) = descriptor.routes.for_kind(kind) else {
                continue;
            };
            let Some(routing_key) = self.routing_key(payload, kind, route.suffix()) else {
                continue;
            };

            for key in route.keys() {
                if !keys_match(&routing_key, key) {
                    continue;
                }
                info!(
                    handler = %descriptor.name,
                    uri = payload.raw_uri().unwrap_or_default(),
                    "Invoking request handler"
                );
                capture(&descriptor.name, descriptor.handler.as_ref(), payload);
                invoked += 1;
            }
        }
        invoked
    }

    /// Derives the key a request handler's route is matched against.
    ///
    /// Custom endpoints match the namespaced uri, and a payload without a uri
    /// matches nothing.
    fn routing_key(
        &self,
        payload: &Payload,
        kind: CallKind,
        suffix: Option<&str>,
    ) -> Option<String> {
        let base = match kind {
            CallKind::CustomEndpoint => {
                Cow::Owned(namespace_key(payload.raw_uri()?, &self.namespace))
            }
            _ => Cow::Borrowed(payload.key()),
        };
        Some(match suffix {
            Some(suffix) => format!("{base}{suffix}"),
            None => base.into_owned(),
        })
    }
}

/// Case-insensitive key comparison with full Unicode lowercase folding.
fn keys_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
