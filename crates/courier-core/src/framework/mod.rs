//! Framework layer - Registration, routing and the broker pipeline.
//!
//! This module contains the invocation pipeline:
//! - Handler traits for the event and request families
//! - Declarations and the registry that resolves them once
//! - The fan-out dispatcher and request error capture
//! - Response projection and the [`Broker`] tying it together

pub mod broker;
pub mod capture;
pub mod descriptor;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod response;

pub use broker::{Broker, BrokerConfig};
pub use capture::capture;
pub use descriptor::{
    AFTER_SUFFIX, BEFORE_SUFFIX, Declaration, EventDescriptor, HandlerKind, RequestDescriptor,
    RequestRoutes, Route,
};
pub use dispatcher::Dispatcher;
pub use handler::{BoxedEventHandler, BoxedRequestHandler, EventHandler, RequestHandler};
pub use registry::{HandlerRegistry, HandlerTable};
