//! Inbound request extraction.
//!
//! # Responsibilities
//! - Split the request path into mount point and path suffix (`path_info`)
//! - Recover the absolute request URL as the client addressed it
//! - Capture the direct client address and declared body length
//!
//! # Design Decisions
//! - The path is taken raw (still percent-encoded); the encoder downstream is
//!   idempotent on escaped input, so nothing is decoded and re-encoded
//! - Requests outside the mount point are not proxied

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, HOST};
use axum::http::{HeaderMap, Method, Request, Uri};

pub const X_REQUEST_ID: &str = "x-request-id";

/// One client request, as seen by the forwarding engine.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    /// Path after the mount point. `None` when the path is the mount point itself.
    pub path_info: Option<String>,
    /// Raw query, without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    /// Direct peer IP.
    pub remote_addr: String,
    pub body: Body,
    /// Declared body length; `None` when absent or unparsable.
    pub content_length: Option<u64>,
    /// Absolute request URL without the query.
    pub request_url: String,
}

impl InboundRequest {
    /// Build from an axum request. Returns `None` when the path is outside
    /// `mount_path` (`""` mounts the proxy at the root).
    pub fn from_http(request: Request<Body>, remote: SocketAddr, mount_path: &str) -> Option<Self> {
        let (parts, body) = request.into_parts();

        let path_info = split_path_info(parts.uri.path(), mount_path)?.map(str::to_owned);
        let request_url = request_url(&parts.uri, &parts.headers);
        let content_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        Some(Self {
            method: parts.method,
            path_info,
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            remote_addr: remote.ip().to_string(),
            body,
            content_length,
            request_url,
        })
    }
}

/// `Some(None)` for the mount point itself, `Some(Some(rest))` below it and
/// `None` outside it.
fn split_path_info<'a>(path: &'a str, mount_path: &str) -> Option<Option<&'a str>> {
    if mount_path.is_empty() {
        return Some(Some(path));
    }
    match path.strip_prefix(mount_path)? {
        "" => Some(None),
        rest if rest.starts_with('/') => Some(Some(rest)),
        _ => None,
    }
}

/// Absolute URL of the request without its query. HTTP/2 requests carry the
/// authority in the URI; HTTP/1.1 ones in `Host`.
fn request_url(uri: &Uri, headers: &HeaderMap) -> String {
    let scheme = uri.scheme_str().unwrap_or("http");
    let authority = uri
        .authority()
        .map(|a| a.as_str())
        .or_else(|| headers.get(HOST).and_then(|h| h.to_str().ok()))
        .unwrap_or("localhost");
    format!("{scheme}://{authority}{}", uri.path())
}

/// Correlation id set by the request-id middleware, for log fields.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> SocketAddr {
        "192.0.2.10:54321".parse().unwrap()
    }

    #[test]
    fn root_mount_keeps_whole_path() {
        let req = Request::builder()
            .uri("/foo/bar?x=1")
            .header("host", "proxy.example")
            .body(Body::empty())
            .unwrap();

        let inbound = InboundRequest::from_http(req, remote(), "").unwrap();
        assert_eq!(inbound.path_info.as_deref(), Some("/foo/bar"));
        assert_eq!(inbound.query.as_deref(), Some("x=1"));
        assert_eq!(inbound.request_url, "http://proxy.example/foo/bar");
        assert_eq!(inbound.remote_addr, "192.0.2.10");
    }

    #[test]
    fn mount_prefix_is_stripped() {
        let req = Request::builder()
            .uri("/mount/page")
            .header("host", "proxy")
            .body(Body::empty())
            .unwrap();

        let inbound = InboundRequest::from_http(req, remote(), "/mount").unwrap();
        assert_eq!(inbound.path_info.as_deref(), Some("/page"));
        assert_eq!(inbound.request_url, "http://proxy/mount/page");
    }

    #[test]
    fn mount_point_itself_has_no_path_info() {
        let req = Request::builder().uri("/mount").body(Body::empty()).unwrap();
        let inbound = InboundRequest::from_http(req, remote(), "/mount").unwrap();
        assert_eq!(inbound.path_info, None);
        assert_eq!(inbound.query, None);
    }

    #[test]
    fn paths_outside_mount_are_rejected() {
        for uri in ["/other", "/mountain", "/"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            assert!(InboundRequest::from_http(req, remote(), "/mount").is_none(), "{uri}");
        }
    }

    #[test]
    fn absolute_form_uri_supplies_authority() {
        let req = Request::builder()
            .uri("https://edge.example:8443/a")
            .header("host", "ignored")
            .body(Body::empty())
            .unwrap();
        let inbound = InboundRequest::from_http(req, remote(), "").unwrap();
        assert_eq!(inbound.request_url, "https://edge.example:8443/a");
    }

    #[test]
    fn content_length_is_parsed() {
        let req = Request::builder()
            .method("POST")
            .uri("/submit")
            .header("content-length", "11")
            .body(Body::from("hello world"))
            .unwrap();
        let inbound = InboundRequest::from_http(req, remote(), "").unwrap();
        assert_eq!(inbound.content_length, Some(11));
        assert_eq!(inbound.method, Method::POST);

        let req = Request::builder()
            .uri("/x")
            .header("content-length", "lots")
            .body(Body::empty())
            .unwrap();
        assert_eq!(InboundRequest::from_http(req, remote(), "").unwrap().content_length, None);
    }

    #[test]
    fn ipv6_remote_address_has_no_port() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let inbound = InboundRequest::from_http(req, "[2001:db8::1]:443".parse().unwrap(), "").unwrap();
        assert_eq!(inbound.remote_addr, "2001:db8::1");
    }
}
