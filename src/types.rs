//! Core request and response types for the pipeline
//!
//! A `Request` describes an outbound call before transmission. Every
//! pipeline call — success or failure, live or mocked — resolves to an
//! `Envelope` with the same shape, so consuming code branches on
//! `header.success` instead of on the type of the result.

use crate::error::ApiError;
use bytes::Bytes;
use std::collections::BTreeMap;

/// HTTP method of an outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Whether this method carries a body the sanitizer must inspect
    pub fn is_mutating(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A single value in a multi-part form body
#[derive(Debug, Clone)]
pub enum FormValue {
    /// Plain text part
    Text(String),
    /// Binary part (file upload)
    Bytes {
        filename: String,
        content_type: String,
        data: Bytes,
    },
}

/// Ordered multi-part form body
///
/// Parts keep declaration order so the wire layout is deterministic.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    parts: Vec<(String, FormValue)>,
}

impl FormData {
    /// Create an empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text part
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormValue::Text(value.into())));
        self
    }

    /// Append a binary part
    pub fn bytes(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormValue::Bytes {
                filename: filename.into(),
                content_type: content_type.into(),
                data: data.into(),
            },
        ));
        self
    }

    /// Declared parts, in order
    pub fn parts(&self) -> &[(String, FormValue)] {
        &self.parts
    }
}

/// Request body — structured JSON or a multi-part form
#[derive(Debug, Clone)]
pub enum Body {
    Json(serde_json::Value),
    Form(FormData),
}

/// Descriptor for an outbound call before transmission
///
/// Path segments of the form `:name` are placeholders resolved from the
/// same-named query parameter; the resolved parameter is removed from the
/// query set so it never reappears as a query string entry.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,

    /// Endpoint path, possibly containing `:name` placeholders
    pub path: String,

    /// Query parameters (unique keys, deterministic order)
    pub params: BTreeMap<String, String>,

    /// Extra headers set by the caller
    pub headers: BTreeMap<String, String>,

    /// Optional body
    pub body: Option<Body>,

    /// Append the configured environment suffix to the base URL
    pub use_suffix: bool,

    /// Participate in slow-backend tracking (and UI loading indicators)
    pub show_loader: bool,

    /// Resolve from static mock data instead of the transport
    pub mock: bool,
}

impl Request {
    /// Create a request with the given method and path
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            use_suffix: true,
            show_loader: true,
            mock: false,
        }
    }

    /// Shorthand for a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Shorthand for a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Shorthand for a PUT request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Shorthand for a PATCH request
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// Shorthand for a DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Add a query parameter (also feeds path placeholder resolution)
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set a JSON body
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    /// Set a multi-part form body
    pub fn with_form(mut self, form: FormData) -> Self {
        self.body = Some(Body::Form(form));
        self
    }

    /// Skip the environment suffix when building the URL
    pub fn without_suffix(mut self) -> Self {
        self.use_suffix = false;
        self
    }

    /// Opt out of slow-backend tracking for this call
    ///
    /// Background polls set this so they never hold a loading indicator
    /// open or count toward the slow-backend signal.
    pub fn without_loader(mut self) -> Self {
        self.show_loader = false;
        self
    }

    /// Mark this request for mock-data resolution
    pub fn mocked(mut self) -> Self {
        self.mock = true;
        self
    }

    /// Last segment of the path, used as the mock resource key
    pub fn last_path_segment(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
    }

    /// Resolve `:name` placeholders in the path from the query parameters
    ///
    /// Returns the resolved path and the remaining (unconsumed) parameters.
    /// An unresolved placeholder is reported by name so the caller can fail
    /// fast before dispatch.
    pub fn resolve_path(&self) -> std::result::Result<(String, BTreeMap<String, String>), String> {
        let mut remaining = self.params.clone();
        let mut segments = Vec::new();

        for segment in self.path.split('/') {
            if let Some(name) = segment.strip_prefix(':') {
                match remaining.remove(name) {
                    Some(value) => segments.push(value),
                    None => return Err(name.to_string()),
                }
            } else {
                segments.push(segment.to_string());
            }
        }

        Ok((segments.join("/"), remaining))
    }
}

/// Status summary of a completed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Numeric HTTP status (0 for local failures)
    pub status: u16,

    /// Status text as reported by the backend
    pub status_text: String,

    /// True only for status 200, 201, or 300
    pub success: bool,
}

impl ResponseHeader {
    /// Build a header, deriving `success` from the status code
    pub fn from_status(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            success: is_success_status(status),
        }
    }
}

/// `success` policy shared by live and mocked paths
pub fn is_success_status(status: u16) -> bool {
    matches!(status, 200 | 201 | 300)
}

/// Normalized result of a pipeline call
///
/// Identical shape on success and failure: `data` is None and `error` is
/// Some exactly when the call failed.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The request that produced this result
    pub request: Request,

    /// Decoded body, None on failure
    pub data: Option<serde_json::Value>,

    /// Status summary
    pub header: ResponseHeader,

    /// The call never left the process (offline / flagged input)
    pub local: bool,

    /// The call was resolved from mock data
    pub mock: bool,

    /// Failure payload, None on success
    pub error: Option<ApiError>,
}

impl Envelope {
    /// Wrap a successful result
    pub fn success(
        request: Request,
        data: serde_json::Value,
        status: u16,
        status_text: impl Into<String>,
    ) -> Self {
        let mock = request.mock;
        Self {
            request,
            data: Some(data),
            header: ResponseHeader::from_status(status, status_text),
            local: false,
            mock,
            error: None,
        }
    }

    /// Wrap a failure that reached (or was rejected by) the backend
    pub fn failure(request: Request, error: ApiError, status_text: impl Into<String>) -> Self {
        let mock = request.mock;
        let status = error.status;
        Self {
            request,
            data: None,
            header: ResponseHeader::from_status(status, status_text),
            local: false,
            mock,
            error: Some(error),
        }
    }

    /// Wrap a failure that never left the process
    pub fn local_failure(request: Request, error: ApiError, status_text: impl Into<String>) -> Self {
        let mut envelope = Self::failure(request, error, status_text);
        envelope.local = true;
        envelope
    }
}
