//! Shared HTTP plumbing.
//!
//! One `reqwest::Client` serves every module. It keeps a cookie store so
//! that JSF portals see the same session between the page load and the
//! form post that follows.

use std::time::Duration;

use url::Url;

use crate::config::{ConfigError, LookupConfig};
use crate::error::LookupError;

/// Headers PrimeFaces sends with its partial (ajax) requests.
pub(crate) const AJAX_HEADERS: [(&str, &str); 3] = [
    ("Faces-Request", "partial/ajax"),
    ("X-Requested-With", "XMLHttpRequest"),
    ("Accept", "application/xml, text/xml, */*; q=0.01"),
];

/// Accept header for full HTML page loads.
pub(crate) const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Build the client shared by every module.
pub fn build_client(config: &LookupConfig) -> Result<reqwest::Client, LookupError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .cookie_store(true)
        .build()
        .map_err(|e| LookupError::Http {
            endpoint: "client_init".into(),
            source: e,
        })
}

/// Resolve `path` against a portal base URL.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, LookupError> {
    base.join(path)
        .map_err(|e| ConfigError::InvalidUrl(path.to_string(), e.to_string()).into())
}

/// `scheme://host[:port]` of a URL, for `Origin` headers.
pub(crate) fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Send a request and reject non-success statuses.
pub(crate) async fn send(
    request: reqwest::RequestBuilder,
    endpoint: &str,
) -> Result<reqwest::Response, LookupError> {
    tracing::debug!(endpoint, "sending request");
    let resp = request.send().await.map_err(|e| LookupError::Http {
        endpoint: endpoint.into(),
        source: e,
    })?;

    if !resp.status().is_success() {
        return Err(LookupError::Status {
            endpoint: endpoint.into(),
            status: resp.status().as_u16(),
        });
    }
    Ok(resp)
}

/// Send a request and read the body as text.
pub(crate) async fn send_text(
    request: reqwest::RequestBuilder,
    endpoint: &str,
) -> Result<(Url, String), LookupError> {
    let resp = send(request, endpoint).await?;
    let url = resp.url().clone();
    let body = resp.text().await.map_err(|e| LookupError::Http {
        endpoint: endpoint.into(),
        source: e,
    })?;
    Ok((url, body))
}

/// Send a request and read the body as bytes.
pub(crate) async fn send_bytes(
    request: reqwest::RequestBuilder,
    endpoint: &str,
) -> Result<Vec<u8>, LookupError> {
    let resp = send(request, endpoint).await?;
    resp.bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| LookupError::Http {
            endpoint: endpoint.into(),
            source: e,
        })
}

/// Attach the PrimeFaces ajax headers plus `Origin` and `Referer`.
pub(crate) fn ajax(request: reqwest::RequestBuilder, referer: &Url) -> reqwest::RequestBuilder {
    AJAX_HEADERS
        .iter()
        .fold(request, |req, (name, value)| req.header(*name, *value))
        .header("Origin", origin(referer))
        .header("Referer", referer.as_str())
}
