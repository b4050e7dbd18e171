//! URL rewriting in both directions.
//!
//! # Responsibilities
//! - Build the outbound request URL from the inbound path suffix and query
//! - Translate origin redirect locations back into proxy URLs
//!
//! # Design Decisions
//! - The target is kept exactly as configured; prefix matching on redirects
//!   works on that literal string, not on a normalised form
//! - Fragments never leave the proxy

use url::Url;

use crate::error::ProxyError;
use crate::proxy::encode::encode_uri_query;

/// Parse and check a target URL, returning a human-readable reason on failure.
///
/// Shared by config validation and by [`UrlRewriter::new`].
pub fn parse_target(target: &str) -> Result<Url, String> {
    let url = Url::parse(target).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("must not carry a query or fragment".to_string());
    }
    Ok(url)
}

/// Rewrites URLs between the proxy's address space and the target's.
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    /// Target exactly as configured.
    target: String,
    /// Parsed form, used for host and port.
    target_url: Url,
}

impl UrlRewriter {
    pub fn new(target: &str) -> Result<Self, ProxyError> {
        let target = target.trim();
        let target_url = parse_target(target).map_err(|reason| ProxyError::InvalidTarget {
            url: target.to_string(),
            reason,
        })?;

        Ok(Self {
            target: target.to_string(),
            target_url,
        })
    }

    /// The target as configured.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Value for the outbound `Host` header: the target host, plus `:port`
    /// when the target names a non-default port.
    pub fn host_header(&self) -> String {
        let host = self.target_url.host_str().unwrap_or_default();
        match self.target_url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Build the outbound URL: `target + path_info + "?" + query`.
    ///
    /// `path_info` is appended only when present. The query is appended when
    /// non-empty, with everything from the first `#` dropped.
    pub fn rewrite_request(&self, path_info: Option<&str>, query: Option<&str>) -> String {
        let mut url = String::with_capacity(500);
        url.push_str(&self.target);

        if let Some(path_info) = path_info {
            url.push_str(&encode_uri_query(path_info));
        }

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            let without_fragment = query.split('#').next().unwrap_or_default();
            url.push_str(&encode_uri_query(without_fragment));
        }

        url
    }

    /// Translate a `Location` sent by the origin into one the client can use.
    ///
    /// Locations under the target are re-rooted at the proxy's mount point,
    /// which is `request_url` minus its `path_info` suffix. Anything else is
    /// returned unchanged.
    pub fn rewrite_location(
        &self,
        location: &str,
        request_url: &str,
        path_info: Option<&str>,
    ) -> String {
        let Some(rest) = location.strip_prefix(self.target.as_str()) else {
            return location.to_string();
        };

        let mount_url = match path_info {
            Some(path_info) => request_url.strip_suffix(path_info).unwrap_or_else(|| {
                tracing::debug!(
                    request_url = %request_url,
                    path_info = %path_info,
                    "Request URL does not end with path info"
                );
                request_url
            }),
            None => request_url,
        };

        format!("{mount_url}{rest}")
    }
}
