//! Error capture for request handlers.
//!
//! A request handler's failure never aborts dispatch. Instead it is turned
//! into a [`RequestError`] on the payload:
//!
//! - [`HandlerError::Request`] is attached verbatim
//! - any other error, or a panic, is attached under code `9999`
//!
//! Each capture overwrites the previous error, so only the last failure of a
//! fan-out reaches the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::foundation::error::HandlerError;
use crate::foundation::payload::{Payload, RequestError};
use crate::framework::handler::RequestHandler;

/// Runs one request handler and attaches any failure to `payload`.
///
/// Returns `true` if the handler completed without error.
pub fn capture(name: &str, handler: &dyn RequestHandler, payload: &mut Payload) -> bool {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(payload)));

    let request_error = match outcome {
        Ok(Ok(())) => return true,
        Ok(Err(HandlerError::Request { code, message })) => RequestError::new(code, message),
        Ok(Err(err)) => {
            error!(handler = %name, error = %err, "Request handler failed");
            RequestError::unhandled(err.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(handler = %name, panic = %message, "Request handler panicked");
            RequestError::unhandled(message)
        }
    };

    payload.set_error(request_error);
    false
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}
