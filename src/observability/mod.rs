//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder and HTTP layer produce:
//!     → logging.rs (structured log events, request spans via TraceLayer)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID (`x-request-id`) is attached to every request span
//! - Metrics are cheap (atomic increments) and off by default

pub mod logging;
pub mod metrics;
