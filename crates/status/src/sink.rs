//! Log sink port.
//!
//! The reporter's only user-visible output is log output. Rather than writing
//! to global logging state, every component receives a [`LogSink`] and records
//! typed [`LogEntry`] values into it. [`TracingSink`] forwards entries to
//! `tracing` with structured fields; tests capture them with
//! [`crate::fakes::RecordingSink`].

use crate::{
    AuthenticationError, BuilderName, ParseError, RepoCoordinates, ReportError, Revision,
};

/// Severity of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Deprecations and recoverable input problems.
    Warn,
    /// A status could not be published.
    Error,
}

/// Something the reporter has to tell its operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// A source reference's repository URL could not be parsed; the reference
    /// was skipped before any request was made.
    UnparseableRepository {
        /// Builder whose event carried the reference.
        builder: BuilderName,
        /// Why parsing failed.
        error: ParseError,
    },

    /// No token could be obtained; the reference was skipped.
    AuthenticationFailed(AuthenticationError),

    /// A status submission failed.
    ReportFailed {
        /// Repository the status was addressed to.
        coordinates: RepoCoordinates,
        /// Commit the status was addressed to.
        revision: Revision,
        /// Why the submission failed.
        error: ReportError,
    },

    /// An event was routed through the deprecated single-build hook.
    LegacySendDeprecated {
        /// Fixed, matchable deprecation message.
        message: &'static str,
    },

    /// An event was dropped because its builder is not in the allow-list.
    BuilderNotReported {
        /// Builder that was filtered out.
        builder: BuilderName,
    },
}

impl LogEntry {
    /// Returns the severity of this entry.
    pub fn level(&self) -> LogLevel {
        match self {
            Self::AuthenticationFailed(_) | Self::ReportFailed { .. } => LogLevel::Error,
            Self::UnparseableRepository { .. } | Self::LegacySendDeprecated { .. } => {
                LogLevel::Warn
            }
            Self::BuilderNotReported { .. } => LogLevel::Debug,
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnparseableRepository { builder, error } => {
                write!(f, "{error}; skipping status for builder {builder}")
            }
            Self::AuthenticationFailed(error) => write!(f, "{error}"),
            Self::ReportFailed {
                coordinates,
                revision,
                error,
            } => write!(f, "{error} for {coordinates} at {revision}"),
            Self::LegacySendDeprecated { message } => f.write_str(message),
            Self::BuilderNotReported { builder } => {
                write!(f, "builder {builder} is not reported to Bitbucket")
            }
        }
    }
}

/// Destination for [`LogEntry`] values.
pub trait LogSink: Send + Sync {
    /// Records one entry.
    fn record(&self, entry: LogEntry);
}

/// Forwards entries to `tracing`, one event per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, entry: LogEntry) {
        match &entry {
            LogEntry::UnparseableRepository { builder, .. } => {
                tracing::warn!(builder = %builder, "{entry}");
            }
            LogEntry::AuthenticationFailed(error) => {
                let (api_error, description) = match error {
                    AuthenticationError::Rejected { details, .. } => (
                        details.error.as_deref(),
                        details.error_description.as_deref(),
                    ),
                    _ => (None, None),
                };
                tracing::error!(
                    status = error.status(),
                    error = api_error,
                    error_description = description,
                    "{entry}"
                );
            }
            LogEntry::ReportFailed {
                coordinates,
                revision,
                error,
            } => {
                let (api_error, description) = match error {
                    ReportError::Rejected { details, .. } => (
                        details.error.as_deref(),
                        details.error_description.as_deref(),
                    ),
                    ReportError::Transport(_) | ReportError::Encode(_) => (None, None),
                };
                tracing::error!(
                    status = error.status(),
                    repository = %coordinates,
                    revision = %revision,
                    error = api_error,
                    error_description = description,
                    "{entry}"
                );
            }
            LogEntry::LegacySendDeprecated { .. } => tracing::warn!("{entry}"),
            LogEntry::BuilderNotReported { builder } => {
                tracing::debug!(builder = %builder, "{entry}");
            }
        }
    }
}

impl<S: LogSink + ?Sized> LogSink for std::sync::Arc<S> {
    fn record(&self, entry: LogEntry) {
        (**self).record(entry);
    }
}
