//! HTTP transport backed by reqwest

use crate::transform::PreparedRequest;
use crate::transport::{RawResponse, ResponseBody, Transport, TransportError};
use crate::types::{Body, FormValue, Method};
use async_trait::async_trait;

/// Transport that issues real HTTP calls
///
/// The underlying client keeps a cookie store, so prepared requests that
/// ask for same-origin credentials get them without per-call work.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with the default client settings
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("entity-client/0.1")
            .cookie_store(true)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        builder = match request.body {
            Some(Body::Json(ref value)) => builder.json(value),
            Some(Body::Form(ref form)) => {
                let mut multipart = reqwest::multipart::Form::new();
                for (name, value) in form.parts() {
                    multipart = match value {
                        FormValue::Text(text) => multipart.text(name.clone(), text.clone()),
                        FormValue::Bytes {
                            filename,
                            content_type,
                            data,
                        } => {
                            let part = reqwest::multipart::Part::bytes(data.to_vec())
                                .file_name(filename.clone())
                                .mime_str(content_type)
                                .map_err(|e| {
                                    TransportError::connection(
                                        request.url.clone(),
                                        format!("invalid part content-type: {}", e),
                                    )
                                })?;
                            multipart.part(name.clone(), part)
                        }
                    };
                }
                builder.multipart(multipart)
            }
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::timeout(request.url.clone())
            } else {
                TransportError::connection(request.url.clone(), e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);

        let bytes = response.bytes().await.map_err(|e| {
            TransportError::connection(request.url.clone(), format!("body read failed: {}", e))
        })?;

        let body = if bytes.is_empty() {
            ResponseBody::Empty
        } else if is_json {
            match serde_json::from_slice(&bytes) {
                Ok(value) => ResponseBody::Json(value),
                // Mislabelled content-type; keep the raw bytes.
                Err(_) => ResponseBody::Binary(bytes),
            }
        } else {
            ResponseBody::Binary(bytes)
        };

        tracing::debug!(url = %request.url, status, "Transport call completed");
        Ok(RawResponse {
            status,
            status_text,
            body,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
