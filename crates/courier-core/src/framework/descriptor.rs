//! Handler declarations and the descriptors resolved from them.
//!
//! A handler declares which keys it serves through one or more
//! [`Declaration`]s. Current declarations ([`Declaration::AsyncEvent`],
//! [`Declaration::SyncEvent`]) coexist with legacy ones that older handlers
//! still carry. Registration resolves the declarations once into a
//! descriptor, so dispatch never has to look at them again.
//!
//! # Resolution rules
//!
//! ```text
//! event handlers     keys   = AsyncEvent ?? Event
//! typeId 2 (before)  keys   = RequestIntercept (raw key) ?? SyncEvent (key + "_BEFORE")
//! typeId 3 (after)   keys   = ResponseIntercept (raw key) ?? SyncEvent (key + "_AFTER")
//! typeId 4 (endpoint) keys  = SyncEvent ?? Endpoint, matched against the namespaced uri
//! typeId 5 (sync)    keys   = SyncEvent only
//! ```

use std::fmt;

use crate::foundation::payload::CallKind;
use crate::framework::handler::{BoxedEventHandler, BoxedRequestHandler};

/// Suffix appended to the key of before-intercepts served by sync-event handlers.
pub const BEFORE_SUFFIX: &str = "_BEFORE";

/// Suffix appended to the key of after-intercepts served by sync-event handlers.
pub const AFTER_SUFFIX: &str = "_AFTER";

/// The handler family a declaration or descriptor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Async event handler.
    Event,
    /// Request handler.
    Request,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => f.write_str("event"),
            Self::Request => f.write_str("request"),
        }
    }
}

/// The keys a handler declares it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// Async event keys.
    AsyncEvent(Vec<String>),
    /// Legacy async event keys, superseded by [`Declaration::AsyncEvent`].
    Event(Vec<String>),
    /// Sync event keys. Serves sync events, custom endpoints and (with the
    /// `_BEFORE` / `_AFTER` suffixes) intercepts.
    SyncEvent(Vec<String>),
    /// Legacy before-intercept keys.
    RequestIntercept(Vec<String>),
    /// Legacy after-intercept keys.
    ResponseIntercept(Vec<String>),
    /// Legacy custom endpoint keys.
    Endpoint(Vec<String>),
}

impl Declaration {
    /// Declares async event keys.
    pub fn async_event<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AsyncEvent(collect(keys))
    }

    /// Declares legacy async event keys.
    pub fn event<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Event(collect(keys))
    }

    /// Declares sync event keys.
    pub fn sync_event<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::SyncEvent(collect(keys))
    }

    /// Declares legacy before-intercept keys.
    pub fn request_intercept<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::RequestIntercept(collect(keys))
    }

    /// Declares legacy after-intercept keys.
    pub fn response_intercept<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ResponseIntercept(collect(keys))
    }

    /// Declares legacy custom endpoint keys.
    pub fn endpoint<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Endpoint(collect(keys))
    }

    /// The handler family this declaration belongs to.
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::AsyncEvent(_) | Self::Event(_) => HandlerKind::Event,
            Self::SyncEvent(_)
            | Self::RequestIntercept(_)
            | Self::ResponseIntercept(_)
            | Self::Endpoint(_) => HandlerKind::Request,
        }
    }

    /// A short name for log and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AsyncEvent(_) => "async_event",
            Self::Event(_) => "event",
            Self::SyncEvent(_) => "sync_event",
            Self::RequestIntercept(_) => "request_intercept",
            Self::ResponseIntercept(_) => "response_intercept",
            Self::Endpoint(_) => "endpoint",
        }
    }
}

fn collect<I, S>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter().map(Into::into).collect()
}

/// Keys grouped by declaration, the first declaration of each variant wins.
#[derive(Debug, Default)]
pub(crate) struct DeclarationSet {
    async_event: Option<Vec<String>>,
    event: Option<Vec<String>>,
    sync_event: Option<Vec<String>>,
    request_intercept: Option<Vec<String>>,
    response_intercept: Option<Vec<String>>,
    endpoint: Option<Vec<String>>,
}

impl DeclarationSet {
    pub(crate) fn insert(&mut self, declaration: Declaration) {
        let (slot, keys) = match declaration {
            Declaration::AsyncEvent(keys) => (&mut self.async_event, keys),
            Declaration::Event(keys) => (&mut self.event, keys),
            Declaration::SyncEvent(keys) => (&mut self.sync_event, keys),
            Declaration::RequestIntercept(keys) => (&mut self.request_intercept, keys),
            Declaration::ResponseIntercept(keys) => (&mut self.response_intercept, keys),
            Declaration::Endpoint(keys) => (&mut self.endpoint, keys),
        };
        slot.get_or_insert(keys);
    }

    /// Event keys: the current declaration takes precedence over the legacy one.
    pub(crate) fn event_keys(self) -> Vec<String> {
        self.async_event.or(self.event).unwrap_or_default()
    }

    pub(crate) fn request_routes(self) -> RequestRoutes {
        let sync = self.sync_event;
        RequestRoutes {
            before: match self.request_intercept {
                Some(keys) => Some(Route::raw(keys)),
                None => sync.clone().map(|keys| Route::suffixed(keys, BEFORE_SUFFIX)),
            },
            after: match self.response_intercept {
                Some(keys) => Some(Route::raw(keys)),
                None => sync.clone().map(|keys| Route::suffixed(keys, AFTER_SUFFIX)),
            },
            endpoint: sync.clone().or(self.endpoint).map(Route::raw),
            sync: sync.map(Route::raw),
        }
    }
}

/// Candidate keys for one call kind plus the suffix applied to the payload key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    keys: Vec<String>,
    suffix: Option<&'static str>,
}

impl Route {
    fn raw(keys: Vec<String>) -> Self {
        Self { keys, suffix: None }
    }

    fn suffixed(keys: Vec<String>, suffix: &'static str) -> Self {
        Self {
            keys,
            suffix: Some(suffix),
        }
    }

    /// The candidate keys, in declaration order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The suffix appended to the payload key before matching.
    pub fn suffix(&self) -> Option<&'static str> {
        self.suffix
    }
}

/// Per-call-kind routes of one request handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestRoutes {
    before: Option<Route>,
    after: Option<Route>,
    endpoint: Option<Route>,
    sync: Option<Route>,
}

impl RequestRoutes {
    /// Returns the route serving `kind`, if the handler declared one.
    pub fn for_kind(&self, kind: CallKind) -> Option<&Route> {
        match kind {
            CallKind::AsyncEvent => None,
            CallKind::RequestIntercept => self.before.as_ref(),
            CallKind::ResponseIntercept => self.after.as_ref(),
            CallKind::CustomEndpoint => self.endpoint.as_ref(),
            CallKind::SyncEvent => self.sync.as_ref(),
        }
    }

    /// Returns `true` if no call kind routes to the handler.
    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none() && self.endpoint.is_none() && self.sync.is_none()
    }
}

/// A registered event handler and the keys it matches.
#[derive(Clone)]
pub struct EventDescriptor {
    pub(crate) name: String,
    pub(crate) handler: BoxedEventHandler,
    pub(crate) keys: Vec<String>,
}

impl EventDescriptor {
    /// The handler name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always [`HandlerKind::Event`].
    pub fn kind(&self) -> HandlerKind {
        HandlerKind::Event
    }

    /// The resolved keys.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("name", &self.name)
            .field("keys", &self.keys)
            .finish()
    }
}

/// A registered request handler and its per-call-kind routes.
#[derive(Clone)]
pub struct RequestDescriptor {
    pub(crate) name: String,
    pub(crate) handler: BoxedRequestHandler,
    pub(crate) routes: RequestRoutes,
}

impl RequestDescriptor {
    /// The handler name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always [`HandlerKind::Request`].
    pub fn kind(&self) -> HandlerKind {
        HandlerKind::Request
    }

    /// The resolved routes.
    pub fn routes(&self) -> &RequestRoutes {
        &self.routes
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("name", &self.name)
            .field("routes", &self.routes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(declarations: impl IntoIterator<Item = Declaration>) -> DeclarationSet {
        let mut set = DeclarationSet::default();
        for declaration in declarations {
            set.insert(declaration);
        }
        set
    }

    #[test]
    fn test_declaration_kinds() {
        assert_eq!(Declaration::async_event(["a"]).kind(), HandlerKind::Event);
        assert_eq!(Declaration::event(["a"]).kind(), HandlerKind::Event);
        assert_eq!(Declaration::sync_event(["a"]).kind(), HandlerKind::Request);
        assert_eq!(Declaration::endpoint(["a"]).kind(), HandlerKind::Request);
    }

    #[test]
    fn test_current_event_declaration_wins() {
        let keys = set([
            Declaration::event(["legacy:KEY"]),
            Declaration::async_event(["current:KEY"]),
        ])
        .event_keys();
        assert_eq!(keys, vec!["current:KEY".to_string()]);

        let keys = set([Declaration::event(["legacy:KEY"])]).event_keys();
        assert_eq!(keys, vec!["legacy:KEY".to_string()]);
    }

    #[test]
    fn test_sync_event_serves_every_request_kind() {
        let routes = set([Declaration::sync_event(["commerce:SYNC_TEST"])]).request_routes();

        let before = routes.for_kind(CallKind::RequestIntercept).unwrap();
        assert_eq!(before.suffix(), Some(BEFORE_SUFFIX));
        let after = routes.for_kind(CallKind::ResponseIntercept).unwrap();
        assert_eq!(after.suffix(), Some(AFTER_SUFFIX));
        assert_eq!(routes.for_kind(CallKind::CustomEndpoint).unwrap().suffix(), None);
        assert_eq!(routes.for_kind(CallKind::SyncEvent).unwrap().keys(), ["commerce:SYNC_TEST"]);
        assert!(routes.for_kind(CallKind::AsyncEvent).is_none());
    }

    #[test]
    fn test_legacy_intercepts_take_precedence_over_sync_event() {
        let routes = set([
            Declaration::sync_event(["commerce:NEW"]),
            Declaration::request_intercept(["commerce:OLD"]),
        ])
        .request_routes();

        let before = routes.for_kind(CallKind::RequestIntercept).unwrap();
        assert_eq!(before.keys(), ["commerce:OLD"]);
        assert_eq!(before.suffix(), None);
        let after = routes.for_kind(CallKind::ResponseIntercept).unwrap();
        assert_eq!(after.keys(), ["commerce:NEW"]);
    }

    #[test]
    fn test_sync_event_takes_precedence_over_legacy_endpoint() {
        let routes = set([
            Declaration::endpoint(["commerce:old/url"]),
            Declaration::sync_event(["commerce:new/url"]),
        ])
        .request_routes();
        assert_eq!(
            routes.for_kind(CallKind::CustomEndpoint).unwrap().keys(),
            ["commerce:new/url"]
        );
    }

    #[test]
    fn test_legacy_only_handler_has_no_sync_route() {
        let routes = set([Declaration::endpoint(["commerce:some/url/1"])]).request_routes();
        assert!(routes.for_kind(CallKind::SyncEvent).is_none());
        assert!(routes.for_kind(CallKind::RequestIntercept).is_none());
        assert!(!routes.is_empty());
        assert!(set([]).request_routes().is_empty());
    }
}
