//! Session layer
//!
//! Liveness check, script authentication, optional user login and the
//! cookie-carrying remote procedure call every other layer is built on.

mod client;
mod transport;

pub use client::{Session, STATUS_DOWN};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, MockTransport, Transport, TransportError,
};
