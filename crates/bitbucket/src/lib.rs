// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Bitbucket commit-status reporter.
//!
//! Turns build lifecycle events into commit statuses on a Bitbucket-style
//! status API:
//!
//! 1. [`dispatch`] decides, once per reporter, whether events flow through the
//!    per-event path or a deprecated single-build hook.
//! 2. [`reporter`] maps each event to a status state and pushes it for every
//!    source reference the build carries.
//! 3. [`token`] exchanges the client key and secret for a fresh bearer token
//!    before every submission.
//!
//! ## Architectural Layer
//!
//! **Service.** All HTTP goes through [`status::HttpTransport`] and all log
//! output through [`status::LogSink`]; this crate never touches a socket or a
//! global logger. Failures are logged and drop the affected reference only;
//! nothing here is fatal to the build pipeline.

pub mod config;
pub mod dispatch;
pub mod reporter;
pub mod token;

use std::sync::Arc;

use status::{HttpTransport, LogSink};

pub use config::{ConfigError, ReporterConfig, SecretSpec, DEFAULT_BASE_URL, DEFAULT_OAUTH_URL};
pub use dispatch::{BitbucketStatusPush, DispatchMode, LegacySend, LEGACY_SEND_DEPRECATION};
pub use reporter::{PushOutcome, ReporterSettings, StatusReporter};
pub use token::{OAuthToken, TokenManager};

/// Wires a [`StatusReporter`] from configuration and ports.
pub fn reporter_from_config(
    config: &ReporterConfig,
    transport: Arc<dyn HttpTransport>,
    sink: Arc<dyn LogSink>,
) -> StatusReporter {
    let tokens = TokenManager::new(
        Arc::clone(&transport),
        Arc::clone(&sink),
        config.oauth_url.clone(),
        config.credentials(),
    );
    StatusReporter::new(config.settings(), tokens, transport, sink)
}
