//! Outbound HTTP client.
//!
//! The forwarder talks to the origin through [`OriginClient`], so the engine
//! can be driven by the pooled hyper client in production and by scripted
//! origins in tests. Whatever sits behind the trait must never follow
//! redirects: redirect responses are rewritten and handed back to the client.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::TimeoutConfig;
use crate::error::ProxyError;

/// Executes a prepared request against the origin.
///
/// Implementations are shared across all in-flight requests. Dropping the
/// returned future, or the response body, aborts the exchange.
#[async_trait]
pub trait OriginClient: Send + Sync {
    async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, ProxyError>;
}

/// Pooled client speaking http and https to the origin.
pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Default [`OriginClient`] backed by the hyper-util legacy client, which has
/// no redirect handling at all.
#[derive(Clone)]
pub struct HyperOriginClient {
    client: HttpsClient,
}

impl HyperOriginClient {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut http = HttpConnector::new();
        http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        http.enforce_http(false);

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(https);

        tracing::debug!(
            connect_timeout_secs = timeouts.connect_secs,
            idle_timeout_secs = timeouts.idle_secs,
            "Origin client configured"
        );

        Self { client }
    }
}

#[async_trait]
impl OriginClient for HyperOriginClient {
    async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let response = self.client.request(request).await?;
        Ok(response.map(Body::new))
    }
}
