//! Handler traits.
//!
//! Courier has two handler families. An [`EventHandler`] reacts to async
//! events and any error it returns aborts the invocation. A
//! [`RequestHandler`] serves the request kinds (intercepts, custom endpoints,
//! sync events) and its errors are attached to the payload instead.
//!
//! Both traits are implemented for plain closures, so small handlers need no
//! dedicated type:
//!
//! ```rust
//! use courier_core::{HandlerError, Payload};
//! use courier_core::framework::RequestHandler;
//!
//! let reject = |payload: &mut Payload| -> Result<(), HandlerError> {
//!     if payload.body().get("sku").is_none() {
//!         return Err(HandlerError::request("E400", "sku is required"));
//!     }
//!     Ok(())
//! };
//! # fn assert_handler<H: RequestHandler>(_: &H) {}
//! # assert_handler(&reject);
//! ```

use std::sync::Arc;

use crate::foundation::error::HandlerResult;
use crate::foundation::payload::Payload;

/// Handles async events.
///
/// Handlers run synchronously on the invoking thread and may mutate the
/// payload.
pub trait EventHandler: Send + Sync + 'static {
    /// Handles one event payload.
    fn handle(&self, payload: &mut Payload) -> HandlerResult;
}

/// Handles request kinds: before/after intercepts, custom endpoints and sync
/// events.
///
/// Write results into [`Payload::body_mut`]. Return
/// [`HandlerError::Request`](crate::HandlerError::Request) to send a
/// structured error back to the caller.
pub trait RequestHandler: Send + Sync + 'static {
    /// Handles one request payload.
    fn handle(&self, payload: &mut Payload) -> HandlerResult;
}

impl<F> EventHandler for F
where
    F: Fn(&mut Payload) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, payload: &mut Payload) -> HandlerResult {
        self(payload)
    }
}

impl<F> RequestHandler for F
where
    F: Fn(&mut Payload) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, payload: &mut Payload) -> HandlerResult {
        self(payload)
    }
}

/// A shareable event handler.
pub type BoxedEventHandler = Arc<dyn EventHandler>;

/// A shareable request handler.
pub type BoxedRequestHandler = Arc<dyn RequestHandler>;

/// Returns the unqualified type name of `T`, used as the default handler name.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
