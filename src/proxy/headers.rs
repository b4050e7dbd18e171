//! Header hygiene between client, proxy and origin.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Point the outbound `Host` at the target
//! - Extend the `X-Forwarded-For` chain with the direct client
//!
//! `HeaderName` comparisons are case-insensitive because names are stored
//! lower-cased, so the tables below work for any spelling the client used.

use axum::http::header::{
    CONNECTION, CONTENT_LENGTH, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE,
    TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that apply to a single transport hop (RFC 2616 §13.5.1).
pub static HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    CONNECTION,
    HeaderName::from_static("keep-alive"),
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    HeaderName::from_static("trailers"),
    TRANSFER_ENCODING,
    UPGRADE,
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.iter().any(|h| h == name)
}

/// Copy client headers onto the outbound request.
///
/// `Content-Length` is never copied; the outbound body framing supplies it.
/// Every `Host` value is replaced by `target_host`.
pub fn copy_request_headers(inbound: &HeaderMap, outbound: &mut HeaderMap, target_host: &HeaderValue) {
    for (name, value) in inbound.iter() {
        if name == CONTENT_LENGTH || is_hop_by_hop(name) {
            continue;
        }
        if name == HOST {
            outbound.append(HOST, target_host.clone());
        } else {
            outbound.append(name.clone(), value.clone());
        }
    }
}

/// Set the outbound `X-Forwarded-For` to the inbound chain plus `remote_addr`.
///
/// Works on raw bytes so that values carrying obs-text survive unchanged.
pub fn set_x_forwarded_for(inbound: &HeaderMap, outbound: &mut HeaderMap, remote_addr: &str) {
    let mut chain: Vec<u8> = Vec::new();
    for value in inbound.get_all(&X_FORWARDED_FOR) {
        chain.extend_from_slice(value.as_bytes());
        chain.extend_from_slice(b", ");
    }
    chain.extend_from_slice(remote_addr.as_bytes());

    match HeaderValue::from_bytes(&chain) {
        Ok(value) => {
            outbound.insert(X_FORWARDED_FOR.clone(), value);
        }
        Err(_) => {
            tracing::warn!(
                chain = %String::from_utf8_lossy(&chain),
                "Dropping unrepresentable X-Forwarded-For chain"
            );
        }
    }
}

/// Append every end-to-end origin header to the client response.
pub fn copy_response_headers(origin: &HeaderMap, response: &mut HeaderMap) {
    for (name, value) in origin.iter() {
        if is_hop_by_hop(name) {
            continue;
        }
        response.append(name.clone(), value.clone());
    }
}
