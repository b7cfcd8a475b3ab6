//! Explicit handler registration.
//!
//! Handlers are registered once, in order, together with their declarations.
//! [`HandlerRegistry::build`] freezes the result into a [`HandlerTable`] that
//! is shared read-only by every invocation.
//!
//! ```rust
//! use courier_core::framework::{Declaration, HandlerRegistry};
//! use courier_core::{HandlerResult, Payload};
//!
//! let table = HandlerRegistry::new()
//!     .event(
//!         |_: &mut Payload| -> HandlerResult { Ok(()) },
//!         [Declaration::async_event(["pagebuilder:VERIFY_EMAIL"])],
//!     )
//!     .unwrap()
//!     .request(
//!         |_: &mut Payload| -> HandlerResult { Ok(()) },
//!         [Declaration::sync_event(["commerce:some/url/2"])],
//!     )
//!     .unwrap()
//!     .build();
//!
//! assert_eq!(table.event_handlers().len(), 1);
//! assert_eq!(table.request_handlers().len(), 1);
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::framework::descriptor::{
    Declaration, DeclarationSet, EventDescriptor, HandlerKind, RequestDescriptor,
};
use crate::framework::handler::{EventHandler, RequestHandler, short_type_name};

/// Builder collecting handlers in registration order.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    events: Vec<EventDescriptor>,
    requests: Vec<RequestDescriptor>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an event handler named after its type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KindMismatch`] if a request declaration is
    /// supplied.
    pub fn event<H, I>(self, handler: H, declarations: I) -> RegistryResult<Self>
    where
        H: EventHandler,
        I: IntoIterator<Item = Declaration>,
    {
        self.named_event(short_type_name::<H>(), handler, declarations)
    }

    /// Registers an event handler under an explicit name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KindMismatch`] if a request declaration is
    /// supplied.
    pub fn named_event<H, I>(
        mut self,
        name: impl Into<String>,
        handler: H,
        declarations: I,
    ) -> RegistryResult<Self>
    where
        H: EventHandler,
        I: IntoIterator<Item = Declaration>,
    {
        let name = name.into();
        let keys = resolve(&name, HandlerKind::Event, declarations)?.event_keys();
        if keys.is_empty() {
            warn!(handler = %name, "Event handler declares no keys and will never run");
        }
        debug!(handler = %name, ?keys, "Registered event handler");

        self.events.push(EventDescriptor {
            name,
            handler: Arc::new(handler),
            keys,
        });
        Ok(self)
    }

    /// Registers a request handler named after its type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KindMismatch`] if an event declaration is
    /// supplied.
    pub fn request<H, I>(self, handler: H, declarations: I) -> RegistryResult<Self>
    where
        H: RequestHandler,
        I: IntoIterator<Item = Declaration>,
    {
        self.named_request(short_type_name::<H>(), handler, declarations)
    }

    /// Registers a request handler under an explicit name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KindMismatch`] if an event declaration is
    /// supplied.
    pub fn named_request<H, I>(
        mut self,
        name: impl Into<String>,
        handler: H,
        declarations: I,
    ) -> RegistryResult<Self>
    where
        H: RequestHandler,
        I: IntoIterator<Item = Declaration>,
    {
        let name = name.into();
        let routes = resolve(&name, HandlerKind::Request, declarations)?.request_routes();
        if routes.is_empty() {
            warn!(handler = %name, "Request handler declares no keys and will never run");
        }
        debug!(handler = %name, ?routes, "Registered request handler");

        self.requests.push(RequestDescriptor {
            name,
            handler: Arc::new(handler),
            routes,
        });
        Ok(self)
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.events.len() + self.requests.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freezes the registry into a shareable table.
    pub fn build(self) -> Arc<HandlerTable> {
        Arc::new(HandlerTable {
            events: self.events,
            requests: self.requests,
        })
    }
}

fn resolve<I>(name: &str, expected: HandlerKind, declarations: I) -> RegistryResult<DeclarationSet>
where
    I: IntoIterator<Item = Declaration>,
{
    let mut set = DeclarationSet::default();
    for declaration in declarations {
        if declaration.kind() != expected {
            return Err(RegistryError::KindMismatch {
                handler: name.to_owned(),
                declaration: declaration.name(),
                expected,
            });
        }
        set.insert(declaration);
    }
    Ok(set)
}

/// The frozen, ordered handler lists consumed by the dispatcher.
#[derive(Debug, Default)]
pub struct HandlerTable {
    events: Vec<EventDescriptor>,
    requests: Vec<RequestDescriptor>,
}

impl HandlerTable {
    /// Creates a table with no handlers.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Event handlers in registration order.
    pub fn event_handlers(&self) -> &[EventDescriptor] {
        &self.events
    }

    /// Request handlers in registration order.
    pub fn request_handlers(&self) -> &[RequestDescriptor] {
        &self.requests
    }
}
