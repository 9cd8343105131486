//! Outbound HTTP dispatch seam.
//!
//! [`HttpDispatcher`] is the trait the `api_call` and `webhook` executors
//! send requests through. Since it uses RPITIT it cannot be a trait
//! object directly; [`BoxHttpDispatcher`] provides the type-erased wrapper
//! via the usual object-safe `*Dyn` companion trait with boxed futures.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use flowmill_types::workflow::HttpAuth;

// ---------------------------------------------------------------------------
// Request/response types
// ---------------------------------------------------------------------------

/// A prepared outbound HTTP request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    /// JSON body, sent with `Content-Type: application/json` when present.
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl OutboundRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Apply node-level authentication to the request headers.
    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        match auth {
            HttpAuth::Bearer { token } => {
                self.headers
                    .insert("Authorization".to_string(), format!("Bearer {token}"));
            }
            HttpAuth::Basic { username, password } => {
                let credentials = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                self.headers
                    .insert("Authorization".to_string(), format!("Basic {credentials}"));
            }
            HttpAuth::ApiKey { header, key } => {
                self.headers.insert(header.clone(), key.clone());
            }
        }
        self
    }
}

/// Response from an outbound HTTP request.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Raw response body text.
    pub body: String,
}

impl OutboundResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body parsed as JSON, falling back to a JSON string of the raw
    /// text for non-JSON responses.
    pub fn body_json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

/// Errors from HTTP dispatch.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },
}

// ---------------------------------------------------------------------------
// HMAC payload signing
// ---------------------------------------------------------------------------

/// Compute the `X-Signature-256` header value for a webhook payload:
/// `sha256=<hex(hmac_sha256(secret, payload))>`.
pub fn signature_header(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload);
    format!("sha256={}", hex_encode(&mac.finalize().into_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

// ---------------------------------------------------------------------------
// HttpDispatcher
// ---------------------------------------------------------------------------

/// Transport seam for outbound HTTP.
pub trait HttpDispatcher: Send + Sync {
    fn dispatch(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<OutboundResponse, HttpError>> + Send;
}

/// Object-safe version of [`HttpDispatcher`] with boxed futures. A blanket
/// implementation covers every `HttpDispatcher`.
pub trait HttpDispatcherDyn: Send + Sync {
    fn dispatch_boxed(
        &self,
        request: OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OutboundResponse, HttpError>> + Send + '_>>;
}

impl<T: HttpDispatcher> HttpDispatcherDyn for T {
    fn dispatch_boxed(
        &self,
        request: OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OutboundResponse, HttpError>> + Send + '_>> {
        Box::pin(self.dispatch(request))
    }
}

/// Type-erased HTTP dispatcher for runtime composition.
pub struct BoxHttpDispatcher {
    inner: Box<dyn HttpDispatcherDyn + Send + Sync>,
}

impl BoxHttpDispatcher {
    pub fn new<T: HttpDispatcher + 'static>(dispatcher: T) -> Self {
        Self {
            inner: Box::new(dispatcher),
        }
    }

    pub async fn dispatch(&self, request: OutboundRequest) -> Result<OutboundResponse, HttpError> {
        self.inner.dispatch_boxed(request).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bearer_auth_header() {
        let request = OutboundRequest::new("GET", "https://api.example.com").with_auth(
            &HttpAuth::Bearer {
                token: "tok-123".to_string(),
            },
        );
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer tok-123")
        );
    }

    #[test]
    fn test_basic_auth_header() {
        let request = OutboundRequest::new("GET", "https://api.example.com").with_auth(
            &HttpAuth::Basic {
                username: "user".to_string(),
                password: "pass".to_string(),
            },
        );
        // base64("user:pass")
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Basic dXNlcjpwYXNz")
        );
    }

    #[test]
    fn test_api_key_auth_header() {
        let request = OutboundRequest::new("GET", "https://api.example.com").with_auth(
            &HttpAuth::ApiKey {
                header: "X-Api-Key".to_string(),
                key: "k".to_string(),
            },
        );
        assert_eq!(request.headers.get("X-Api-Key").map(String::as_str), Some("k"));
    }

    #[test]
    fn test_signature_header_shape() {
        let sig = signature_header("secret", b"{\"a\":1}");
        assert!(sig.starts_with("sha256="));
        // 32-byte digest -> 64 hex chars.
        assert_eq!(sig.len(), "sha256=".len() + 64);
        // Stable for identical inputs.
        assert_eq!(sig, signature_header("secret", b"{\"a\":1}"));
        assert_ne!(sig, signature_header("other", b"{\"a\":1}"));
    }

    #[test]
    fn test_body_json_fallback() {
        let response = OutboundResponse {
            status: 200,
            headers: HashMap::new(),
            body: "{\"ok\":true}".to_string(),
        };
        assert_eq!(response.body_json(), json!({ "ok": true }));

        let response = OutboundResponse {
            status: 200,
            headers: HashMap::new(),
            body: "plain text".to_string(),
        };
        assert_eq!(response.body_json(), json!("plain text"));
    }

    #[tokio::test]
    async fn test_box_dispatcher_delegates() {
        struct Fixed;
        impl HttpDispatcher for Fixed {
            async fn dispatch(
                &self,
                _request: OutboundRequest,
            ) -> Result<OutboundResponse, HttpError> {
                Ok(OutboundResponse {
                    status: 204,
                    headers: HashMap::new(),
                    body: String::new(),
                })
            }
        }

        let dispatcher = BoxHttpDispatcher::new(Fixed);
        let response = dispatcher
            .dispatch(OutboundRequest::new("GET", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(response.status, 204);
        assert!(response.is_success());
    }
}
