//! Forwarding engine.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → rewrite.rs (target + escaped path + escaped query)
//!     → headers.rs (hop-by-hop filter, Host, X-Forwarded-For)
//!     → client.rs (OriginClient, never follows redirects)
//!     → forwarder.rs status dispatch:
//!         300..=303 → Location rewritten, 302 to client
//!         304       → bare 304
//!         other     → headers copied, body streamed
//! ```

pub mod client;
pub mod encode;
pub mod forwarder;
pub mod headers;
pub mod rewrite;

pub use client::{HyperOriginClient, OriginClient};
pub use forwarder::RequestForwarder;
pub use rewrite::UrlRewriter;
