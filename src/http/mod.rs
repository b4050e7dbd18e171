//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request id, trace, timeout, limit)
//!     → request.rs (mount path split, request URL, client address)
//!     → proxy::RequestForwarder (origin exchange)
//!     → response.rs (error → status code) or relayed origin response
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, X_REQUEST_ID};
pub use server::HttpServer;
