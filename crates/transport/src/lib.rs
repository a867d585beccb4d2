// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! HTTP transport adapter.
//!
//! Implements [`status::HttpTransport`] over `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection pooling, TLS, timeouts and body encoding all
//! live here. The reporter sees only [`status::HttpTransport`]; it never learns
//! which client sent its requests. This adapter performs exactly one attempt
//! per request and never retries.
//!
//! ## Flags
//!
//! | [`TransportOptions`] field | Effect |
//! |----------------------------|--------|
//! | `debug` | request and response bodies are logged at `DEBUG` (credentials never are) |
//! | `verify = false` | TLS certificate verification is disabled |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use status::{
    HttpRequest, HttpResponse, HttpTransport, RequestAuth, RequestBody, TransportError,
    TransportOptions,
};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("bbstatus/", env!("CARGO_PKG_VERSION"));

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    options: TransportOptions,
}

impl ReqwestTransport {
    /// Builds a transport honouring `options` with the default timeout.
    pub fn new(options: TransportOptions) -> Result<Self, TransportError> {
        Self::with_timeout(options, DEFAULT_TIMEOUT)
    }

    /// Builds a transport honouring `options` with a custom timeout.
    pub fn with_timeout(options: TransportOptions, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .danger_accept_invalid_certs(!options.verify)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        if !options.verify {
            tracing::warn!("TLS certificate verification is disabled");
        }

        Ok(Self { client, options })
    }

    /// The flags this transport was built with.
    pub fn options(&self) -> TransportOptions {
        self.options
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest { url, auth, body } = request;

        if self.options.debug {
            match &body {
                RequestBody::Form(pairs) => tracing::debug!(%url, form = ?pairs, "POST"),
                RequestBody::Json(json) => tracing::debug!(%url, body = %json, "POST"),
            }
        }

        let mut builder = self.client.post(&url);
        builder = match auth {
            RequestAuth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            RequestAuth::Bearer(token) => builder.bearer_auth(token),
        };
        builder = match body {
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::Json(json) => builder.header(CONTENT_TYPE, "application/json").body(json),
        };

        let response = builder.send().await.map_err(|e| TransportError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| TransportError::Body {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if self.options.debug {
            tracing::debug!(
                %url,
                status,
                body = %String::from_utf8_lossy(&body),
                "response"
            );
        }

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
