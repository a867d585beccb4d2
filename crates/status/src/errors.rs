//! Error taxonomy for status reporting.
//!
//! Every failure a push can hit is handled where it occurs: it is turned into
//! a [`crate::LogEntry`] and the affected source reference is dropped. None of
//! these errors propagate past the reporter, and none of them is fatal to the
//! build pipeline.
//!
//! | Error | Raised when |
//! |-------|-------------|
//! | [`ParseError`] | A repository URL has fewer than two path segments. |
//! | [`AuthenticationError`] | The authorization call could not produce a token. |
//! | [`ReportError`] | The status call did not answer `200` or `201`. |
//! | [`TransportError`] | No HTTP response was received at all. |
//! | [`CredentialError`] | A client key or secret could not be resolved. |

use thiserror::Error;

// ---------------------------------------------------------------------------
// Remote error details
// ---------------------------------------------------------------------------

/// The `error` / `error_description` fields a rejected call may embed in its
/// response body.
///
/// Parsing is lenient: a body that is not JSON, or that lacks both fields,
/// produces empty details rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiErrorDetails {
    /// Machine-readable error code (e.g. `"invalid_grant"`).
    pub error: Option<String>,
    /// Human-readable explanation.
    pub error_description: Option<String>,
}

impl ApiErrorDetails {
    /// Extracts error details from a raw response body.
    ///
    /// Accepts both the OAuth shape (`{"error": "...", "error_description":
    /// "..."}`) and the REST API shape (`{"error": {"message": "..."}}`).
    pub fn from_body(body: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
            return Self::default();
        };
        let error = match value.get("error") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Object(obj)) => obj
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            _ => None,
        };
        let error_description = value
            .get("error_description")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        Self {
            error,
            error_description,
        }
    }

    /// Returns `true` when neither field is present.
    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.error_description.is_none()
    }
}

impl std::fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.error, &self.error_description) {
            (Some(e), Some(d)) => write!(f, " ({e}: {d})"),
            (Some(e), None) => write!(f, " ({e})"),
            (None, Some(d)) => write!(f, " ({d})"),
            (None, None) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A repository URL could not be reduced to `(owner, repository)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Fewer than two non-empty path segments remained after stripping the
    /// scheme and host.
    #[error("unable to parse repository URL '{url}': expected an owner and a repository in the path")]
    TooFewSegments {
        /// The URL as supplied.
        url: String,
    },

    /// The repository segment was empty once the `.git` suffix was removed.
    #[error("unable to parse repository URL '{url}': empty repository name")]
    EmptyRepository {
        /// The URL as supplied.
        url: String,
    },
}

/// The HTTP transport failed before a response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport could not be constructed (e.g. TLS backend setup).
    #[error("HTTP transport setup failed: {0}")]
    Setup(String),

    /// The request could not be sent or timed out.
    #[error("HTTP request to {url} failed: {message}")]
    Request {
        /// Target URL of the failed request.
        url: String,
        /// Transport-supplied description.
        message: String,
    },

    /// The response body could not be read.
    #[error("unable to read HTTP response from {url}: {message}")]
    Body {
        /// Target URL of the request.
        url: String,
        /// Transport-supplied description.
        message: String,
    },
}

/// A client key or secret could not be resolved at call time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The named environment variable is unset or not valid Unicode.
    #[error("environment variable '{0}' is not set")]
    MissingEnv(String),

    /// The secret file could not be read.
    #[error("unable to read secret file '{path}': {message}")]
    Unreadable {
        /// Path of the secret file.
        path: String,
        /// I/O error description.
        message: String,
    },

    /// The resolved value was empty.
    #[error("resolved credential is empty")]
    Empty,
}

/// The authorization call did not yield a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    /// The authorization endpoint answered with a non-2xx status.
    #[error("{status}: unable to authenticate to Bitbucket{details}")]
    Rejected {
        /// HTTP status code of the response.
        status: u16,
        /// Error fields embedded in the response body.
        details: ApiErrorDetails,
    },

    /// A 2xx response carried no usable `access_token`.
    #[error("{status}: unable to authenticate to Bitbucket (response carried no access_token)")]
    MissingToken {
        /// HTTP status code of the response.
        status: u16,
    },

    /// The client key or secret could not be resolved; no request was made.
    #[error("unable to authenticate to Bitbucket: {0}")]
    Credentials(#[from] CredentialError),

    /// The authorization request never produced a response.
    #[error("unable to authenticate to Bitbucket: {0}")]
    Transport(#[from] TransportError),
}

impl AuthenticationError {
    /// HTTP status code of the failed call, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::MissingToken { status } => Some(*status),
            Self::Credentials(_) | Self::Transport(_) => None,
        }
    }
}

/// The status call was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The status endpoint answered with something other than `200`/`201`.
    #[error("{status}: unable to upload Bitbucket status{details}")]
    Rejected {
        /// HTTP status code of the response.
        status: u16,
        /// Error fields embedded in the response body.
        details: ApiErrorDetails,
    },

    /// The status request never produced a response.
    #[error("unable to upload Bitbucket status: {0}")]
    Transport(#[from] TransportError),

    /// The payload could not be encoded; nothing was sent.
    #[error("unable to encode Bitbucket status: {0}")]
    Encode(String),
}

impl ReportError {
    /// HTTP status code of the failed call, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(_) | Self::Encode(_) => None,
        }
    }
}
