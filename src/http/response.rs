//! Error responses.
//!
//! # Responsibilities
//! - Map forwarding errors to HTTP status codes
//! - Render a small JSON body describing the failure
//!
//! # Design Decisions
//! - Origin misbehaviour (a redirect without `Location`) is a 500, transport
//!   failures towards the origin are 502
//! - Only used before any response head has been sent; failures while
//!   streaming a body abort the connection instead

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::ProxyError;

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidUri { .. } => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) | ProxyError::Body(_) | ProxyError::Io(_) => StatusCode::BAD_GATEWAY,
            ProxyError::MissingLocation { .. } | ProxyError::Http(_) | ProxyError::InvalidTarget { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() }).to_string();
        let mut response = (self.status_code(), body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
