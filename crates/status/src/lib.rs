// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Core domain for build-status reporting.
//!
//! This crate contains every domain concept, newtype identifier, value type and
//! error type used to turn build lifecycle events into commit statuses, plus the
//! repository URL parser. Service and infrastructure crates build on the ports
//! defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; other crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`BuilderName`, `Revision`, `PushId`, etc.) |
//! | [`types`] | Value types (`Build`, `BuildStatusEvent`, `StatusPayload`, etc.) |
//! | [`errors`] | Parse, authentication, report, transport and credential errors |
//! | [`repo_url`] | Repository URL → `(owner, repository)` |
//! | [`transport`] | [`HttpTransport`] port |
//! | [`sink`] | [`LogSink`] port and the `tracing`-backed sink |
//! | [`secret`] | Pull-based credential resolution |

pub mod errors;
pub mod identifiers;
pub mod repo_url;
pub mod secret;
pub mod sink;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod fakes;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{
    ApiErrorDetails, AuthenticationError, CredentialError, ParseError, ReportError,
    TransportError,
};
pub use identifiers::{BuildId, BuildNumber, BuilderName, PushId, Revision};
pub use repo_url::parse_repo_url;
pub use secret::{Credentials, SecretSource};
pub use sink::{LogEntry, LogLevel, LogSink, TracingSink};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, RequestAuth, RequestBody, TransportOptions,
};
pub use types::{
    Build, BuildPhase, BuildResult, BuildStatusEvent, LifecycleKey, RepoCoordinates,
    SourceReference, StatusLabel, StatusPayload, StatusState,
};

#[cfg(any(test, feature = "test-support"))]
pub use fakes::{FakeTransport, RecordingSink};
