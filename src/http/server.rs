//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler as fallback
//! - Wire up middleware (request ID, tracing, timeout, concurrency limit)
//! - Bind server to listener and serve until shutdown
//! - Hand each request under the mount path to the forwarder

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::{request_id, InboundRequest};
use crate::lifecycle::shutdown;
use crate::observability::metrics::{self, Outcome};
use crate::proxy::{HyperOriginClient, RequestForwarder};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<RequestForwarder>,
    pub mount_path: Arc<str>,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server forwarding through the default hyper origin client.
    ///
    /// Fails when the configured target is unusable.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let client = Arc::new(HyperOriginClient::new(&config.timeouts));
        let forwarder = RequestForwarder::new(&config.upstream, client)?;
        Ok(Self::with_forwarder(config, forwarder))
    }

    /// Create a server around an already built forwarder.
    pub fn with_forwarder(config: ProxyConfig, forwarder: RequestForwarder) -> Self {
        let state = AppState {
            forwarder: Arc::new(forwarder),
            mount_path: Arc::from(config.upstream.mount_path.as_str()),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// An origin that has not produced a response head within
    /// `timeouts.request_secs` is answered with 504.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(ConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id(request.headers()),
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. In-flight requests are allowed to finish.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target_url = %self.config.upstream.target_url,
            mount_path = %self.config.upstream.mount_path,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Forward every request under the mount path to the origin.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let Some(inbound) = InboundRequest::from_http(request, addr, &state.mount_path) else {
        tracing::debug!(path = %path, "Request outside mount path");
        metrics::record_request(&method, 404, Outcome::NotMounted, start_time);
        return StatusCode::NOT_FOUND.into_response();
    };

    match state.forwarder.handle(inbound).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method, status.as_u16(), Outcome::from_status(status), start_time);
            response
        }
        Err(e) => {
            tracing::error!(method = %method, path = %path, error = %e, "Proxy request failed");
            metrics::record_upstream_error(e.kind());
            let response = e.into_response();
            metrics::record_request(&method, response.status().as_u16(), Outcome::Error, start_time);
            response
        }
    }
}
