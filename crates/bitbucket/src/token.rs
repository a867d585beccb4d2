//! OAuth2 client-credentials exchange.
//!
//! Every status push re-authenticates: [`TokenManager::acquire`] performs one
//! exchange and hands back a token that is used for exactly one submission.
//! Nothing is cached, so there is no expiry to track and no stale token to
//! evict.

use std::sync::Arc;

use serde::Deserialize;
use status::{
    ApiErrorDetails, AuthenticationError, Credentials, HttpRequest, HttpTransport, LogEntry, LogSink, RequestAuth,
    RequestBody,
};

/// A bearer token valid for a single status submission.
///
/// Not `Clone`: it is moved into the one request it authorises.
pub struct OAuthToken(String);

impl OAuthToken {
    /// Returns the raw bearer string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, yielding the bearer string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OAuthToken(<redacted>)")
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchanges client credentials for bearer tokens.
pub struct TokenManager {
    transport: Arc<dyn HttpTransport>,
    sink: Arc<dyn LogSink>,
    oauth_url: String,
    credentials: Credentials,
}

impl TokenManager {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sink: Arc<dyn LogSink>,
        oauth_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            sink,
            oauth_url: oauth_url.into(),
            credentials,
        }
    }

    /// Performs one exchange, logging any failure.
    ///
    /// `None` means "no token available": the caller abandons the push it was
    /// acquiring the token for, and nothing else.
    pub async fn acquire(&self) -> Option<OAuthToken> {
        match self.exchange().await {
            Ok(token) => Some(token),
            Err(error) => {
                self.sink.record(LogEntry::AuthenticationFailed(error));
                None
            }
        }
    }

    /// Performs one exchange.
    ///
    /// Credentials are resolved immediately before the request. A credential
    /// failure makes no request at all.
    pub async fn exchange(&self) -> Result<OAuthToken, AuthenticationError> {
        let (key, secret) = self.credentials.resolve()?;

        let request = HttpRequest {
            url: self.oauth_url.clone(),
            auth: RequestAuth::Basic {
                username: key,
                password: secret,
            },
            body: RequestBody::Form(vec![(
                "grant_type".to_string(),
                "client_credentials".to_string(),
            )]),
        };
        let response = self.transport.post(request).await?;

        if !response.is_success() {
            return Err(AuthenticationError::Rejected {
                status: response.status,
                details: ApiErrorDetails::from_body(&response.body),
            });
        }

        match response.parse_json::<TokenResponse>() {
            Ok(body) if !body.access_token.is_empty() => Ok(OAuthToken(body.access_token)),
            _ => Err(AuthenticationError::MissingToken {
                status: response.status,
            }),
        }
    }
}
