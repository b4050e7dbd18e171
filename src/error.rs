//! Error type shared by the forwarding engine and the HTTP layer.

use thiserror::Error;

/// Everything that can go wrong while forwarding one request.
///
/// The core never recovers from any of these: it logs, drops the in-flight
/// origin exchange and hands the error to the HTTP layer, which maps it to a
/// status code (see `http::response`).
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The configured target URL is unusable. Fatal at startup.
    #[error("invalid target url `{url}`: {reason}")]
    InvalidTarget { url: String, reason: String },

    /// The origin answered 300..=303 without a `Location` header.
    #[error("received status code {status} but no Location header was found in the response")]
    MissingLocation { status: u16 },

    /// DNS, connect, TLS or read failure reported by the outbound client.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// The rewritten URL was rejected by the outbound URI parser.
    #[error("invalid outbound uri `{uri}`: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },

    #[error("failed to build outbound message: {0}")]
    Http(#[from] axum::http::Error),

    /// Reading or draining a body stream failed.
    #[error("body stream failed: {0}")]
    Body(#[from] axum::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Short stable label, used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::InvalidTarget { .. } => "invalid_target",
            ProxyError::MissingLocation { .. } => "missing_location",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::InvalidUri { .. } => "invalid_uri",
            ProxyError::Http(_) => "http",
            ProxyError::Body(_) => "body",
            ProxyError::Io(_) => "io",
        }
    }
}
