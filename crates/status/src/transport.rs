//! HTTP transport port.
//!
//! The reporter only ever issues `POST` requests, each carrying exactly one
//! kind of authentication and one kind of body. [`HttpTransport`] is the seam
//! between that logic and whatever client actually moves bytes; connection
//! pooling, TLS and timeouts are the implementation's concern.
//!
//! ## Architectural Layer
//!
//! **Port definition.** The `transport` crate provides the `reqwest`-backed
//! implementation; tests use [`crate::fakes::FakeTransport`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::TransportError;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Authentication attached to a request.
#[derive(Clone, PartialEq, Eq)]
pub enum RequestAuth {
    /// HTTP basic authentication (used for the client-credentials exchange).
    Basic {
        /// Client key.
        username: String,
        /// Client secret.
        password: String,
    },
    /// Bearer token authentication (used for status submissions).
    Bearer(String),
}

impl std::fmt::Debug for RequestAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Body of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` pairs, sent in order.
    Form(Vec<(String, String)>),
    /// A pre-serialised `application/json` document.
    ///
    /// Kept as text so the exact bytes sent are fixed by the caller.
    Json(String),
}

/// A single `POST` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute target URL.
    pub url: String,
    /// Authentication to attach.
    pub auth: RequestAuth,
    /// Request body.
    pub body: RequestBody,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Status code and raw body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response from a status code and raw body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response whose body is `value` serialised as JSON.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    /// Returns `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialises the body as JSON.
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Flags forwarded opaquely to the transport implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Log request and response bodies at debug level.
    pub debug: bool,
    /// Verify TLS certificates.
    pub verify: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            debug: false,
            verify: true,
        }
    }
}

/// Sends `POST` requests and returns their responses.
///
/// Any response, whatever its status code, is `Ok`. `Err` means no response
/// was received. Implementations must not retry on their own.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and waits for the response.
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
