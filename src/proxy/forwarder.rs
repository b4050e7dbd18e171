//! Per-request forwarding engine.
//!
//! # Responsibilities
//! - Build the outbound request (URL, body, headers, `X-Forwarded-For`)
//! - Run it through the [`OriginClient`]
//! - Dispatch on the origin status: rewrite redirects, short-circuit 304,
//!   stream everything else
//!
//! # Design Decisions
//! - No state survives a request; the forwarder is shared behind an `Arc`
//! - Origin bodies are drained on the redirect and 304 branches so pooled
//!   connections stay reusable, and streamed chunk by chunk otherwise
//! - Cancelling means dropping: an early return drops the origin response and
//!   with it the connection

use std::sync::Arc;

use axum::body::{Body, HttpBody as _};
use axum::http::header::{CONTENT_LENGTH, LOCATION, TRANSFER_ENCODING};
use axum::http::{HeaderValue, Request, Response, StatusCode, Uri};
use futures_util::TryStreamExt;
use http_body_util::BodyExt;
use hyper::ext::ReasonPhrase;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::http::request::InboundRequest;
use crate::proxy::client::OriginClient;
use crate::proxy::headers::{copy_request_headers, copy_response_headers, set_x_forwarded_for};
use crate::proxy::rewrite::UrlRewriter;

/// Callback run on the fully prepared outbound request, just before it is sent.
pub type PreparedHook = Arc<dyn Fn(&mut Request<Body>) + Send + Sync>;

pub struct RequestForwarder {
    rewriter: UrlRewriter,
    target_host: HeaderValue,
    forward_client_ip: bool,
    client: Arc<dyn OriginClient>,
    on_prepared: Option<PreparedHook>,
}

impl RequestForwarder {
    /// Fails with [`ProxyError::InvalidTarget`] when the target is unusable.
    pub fn new(upstream: &UpstreamConfig, client: Arc<dyn OriginClient>) -> Result<Self, ProxyError> {
        let rewriter = UrlRewriter::new(&upstream.target_url)?;
        let target_host =
            HeaderValue::from_str(&rewriter.host_header()).map_err(|e| ProxyError::InvalidTarget {
                url: rewriter.target().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            target_url = %rewriter.target(),
            forward_client_ip = upstream.forward_client_ip,
            "Forwarder initialized"
        );

        Ok(Self {
            rewriter,
            target_host,
            forward_client_ip: upstream.forward_client_ip,
            client,
            on_prepared: None,
        })
    }

    pub fn with_on_prepared<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Request<Body>) + Send + Sync + 'static,
    {
        self.on_prepared = Some(Arc::new(hook));
        self
    }

    pub fn rewriter(&self) -> &UrlRewriter {
        &self.rewriter
    }

    /// Forward one request and produce the client response.
    pub async fn handle(&self, inbound: InboundRequest) -> Result<Response<Body>, ProxyError> {
        let InboundRequest {
            method,
            path_info,
            query,
            headers,
            remote_addr,
            body,
            content_length,
            request_url,
        } = inbound;

        let upstream_url = self
            .rewriter
            .rewrite_request(path_info.as_deref(), query.as_deref());
        let uri: Uri = upstream_url.parse().map_err(|source| ProxyError::InvalidUri {
            uri: upstream_url.clone(),
            source,
        })?;

        let has_body = headers.contains_key(CONTENT_LENGTH) || headers.contains_key(TRANSFER_ENCODING);
        let body = if has_body { body } else { Body::empty() };
        let mut request = Request::builder().method(method).uri(uri).body(body)?;

        copy_request_headers(&headers, request.headers_mut(), &self.target_host);
        if has_body {
            if let Some(len) = content_length {
                request.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
            }
        }
        if self.forward_client_ip {
            set_x_forwarded_for(&headers, request.headers_mut(), &remote_addr);
        }

        if let Some(hook) = &self.on_prepared {
            hook(&mut request);
        }

        tracing::debug!(
            method = %request.method(),
            upstream_url = %upstream_url,
            "Forwarding request"
        );

        let result = match self.client.execute(request).await {
            Ok(response) => {
                self.dispatch(response, &upstream_url, &request_url, path_info.as_deref())
                    .await
            }
            Err(e) => Err(e),
        };

        result.inspect_err(|e| {
            tracing::warn!(
                upstream_url = %upstream_url,
                error = %e,
                "Aborting upstream exchange"
            );
        })
    }

    async fn dispatch(
        &self,
        response: Response<Body>,
        upstream_url: &str,
        request_url: &str,
        path_info: Option<&str>,
    ) -> Result<Response<Body>, ProxyError> {
        let status = response.status();

        match status.as_u16() {
            300..=303 => {
                let location = response
                    .headers()
                    .get_all(LOCATION)
                    .iter()
                    .next_back()
                    .cloned()
                    .ok_or(ProxyError::MissingLocation {
                        status: status.as_u16(),
                    })?;

                let location = match location.to_str() {
                    Ok(raw) => {
                        let rewritten = self.rewriter.rewrite_location(raw, request_url, path_info);
                        HeaderValue::from_str(&rewritten).map_err(axum::http::Error::from)?
                    }
                    // Not text, so it cannot start with the target either.
                    Err(_) => location,
                };

                drain(response.into_body()).await?;

                tracing::debug!(
                    origin_status = status.as_u16(),
                    location = ?location,
                    "Relaying origin redirect"
                );

                Ok(Response::builder()
                    .status(StatusCode::FOUND)
                    .header(LOCATION, location)
                    .body(Body::empty())?)
            }
            304 => {
                drain(response.into_body()).await?;

                Ok(Response::builder()
                    .status(StatusCode::NOT_MODIFIED)
                    .header(CONTENT_LENGTH, 0)
                    .body(Body::empty())?)
            }
            _ => {
                let (parts, body) = response.into_parts();

                let body = if body.is_end_stream() {
                    Body::empty()
                } else {
                    relay(body, upstream_url.to_string())
                };

                let mut relayed = Response::new(body);
                *relayed.status_mut() = parts.status;
                if let Some(reason) = parts.extensions.get::<ReasonPhrase>() {
                    relayed.extensions_mut().insert(reason.clone());
                }
                copy_response_headers(&parts.headers, relayed.headers_mut());

                Ok(relayed)
            }
        }
    }
}

/// Stream the origin body to the client as it arrives. Errors after the
/// response head has gone out can only be logged; hyper aborts the connection.
fn relay(body: Body, upstream_url: String) -> Body {
    Body::from_stream(TryStreamExt::inspect_err(body.into_data_stream(), move |e| {
        tracing::warn!(
            upstream_url = %upstream_url,
            error = %e,
            "Origin body failed mid-stream"
        );
    }))
}

/// Read and discard the rest of a body.
async fn drain(mut body: Body) -> Result<(), ProxyError> {
    while let Some(frame) = body.frame().await {
        frame?;
    }
    Ok(())
}
