//! Request transformer — credential and header attachment
//!
//! Pure descriptor shaping: no side effects, no I/O. The pipeline calls
//! `attach` after URL resolution and just before handing the request to
//! the transport.

use crate::types::{Body, Method};
use std::collections::BTreeMap;

/// A fully resolved request, ready for the transport
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,

    /// Absolute URL, query string included
    pub url: String,

    /// Final header set
    pub headers: BTreeMap<String, String>,

    /// Optional body
    pub body: Option<Body>,

    /// Send same-origin cookies alongside the authorization header
    pub include_credentials: bool,
}

/// Attach credentials and content-type headers to a resolved request
///
/// Adds a bearer authorization header when a credential is present.
/// Form bodies keep content-type unset so the transport can negotiate
/// the multipart boundary; other bodies default to JSON unless the
/// caller already set a content-type. The prepared request always sends
/// same-origin cookies as a fallback authentication channel.
pub fn attach(
    method: Method,
    url: String,
    mut headers: BTreeMap<String, String>,
    body: Option<Body>,
    credential: Option<&str>,
) -> PreparedRequest {
    if let Some(token) = credential {
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));
    }

    let is_form = matches!(body, Some(Body::Form(_)));
    let has_content_type = headers.keys().any(|k| k.eq_ignore_ascii_case("content-type"));
    if !is_form && !has_content_type {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }

    PreparedRequest {
        method,
        url,
        headers,
        body,
        include_credentials: true,
    }
}
