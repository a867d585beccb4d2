//! Per-event status reporting.
//!
//! [`StatusReporter::report`] turns one [`BuildStatusEvent`] into one status
//! submission per source reference. Each reference is pushed independently:
//! parse the repository URL, acquire a fresh token, post the status. A failure
//! at any step is logged and drops only that reference.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::Instrument;

use status::{
    parse_repo_url, ApiErrorDetails, BuildStatusEvent, BuilderName, HttpRequest, HttpTransport, LogEntry, LogSink,
    PushId, RepoCoordinates, ReportError, RequestAuth, RequestBody, SourceReference, StatusLabel,
    StatusPayload, StatusState,
};

use crate::token::TokenManager;

/// What happened to one source reference of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The status was accepted (`200` or `201`).
    Reported,
    /// The repository URL could not be parsed; no request was made.
    SkippedUnparseable,
    /// No token could be obtained; no status call was made.
    SkippedNoToken,
    /// The status call failed.
    ReportFailed,
}

/// Reporter settings that are not ports.
#[derive(Debug, Clone, Default)]
pub struct ReporterSettings {
    /// Base URL of the repositories API (no trailing slash required).
    pub base_url: String,
    /// When set, only builders in this list are reported.
    pub builders: Option<HashSet<BuilderName>>,
    /// Per-builder status key/name overrides.
    pub labels: HashMap<BuilderName, StatusLabel>,
}

/// Publishes commit statuses for build lifecycle events.
pub struct StatusReporter {
    transport: Arc<dyn HttpTransport>,
    sink: Arc<dyn LogSink>,
    tokens: TokenManager,
    settings: ReporterSettings,
}

impl StatusReporter {
    pub fn new(
        settings: ReporterSettings,
        tokens: TokenManager,
        transport: Arc<dyn HttpTransport>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            transport,
            sink,
            tokens,
            settings,
        }
    }

    /// The sink this reporter logs to.
    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Returns `true` if events from `builder` should be reported.
    pub fn reports_builder(&self, builder: &BuilderName) -> bool {
        self.settings
            .builders
            .as_ref()
            .map_or(true, |allowed| allowed.contains(builder))
    }

    /// Status key and display name used for `builder`.
    pub fn label_for(&self, builder: &BuilderName) -> StatusLabel {
        self.settings
            .labels
            .get(builder)
            .cloned()
            .unwrap_or_else(|| StatusLabel::for_builder(builder))
    }

    /// Status endpoint for one commit.
    pub fn status_url(&self, coordinates: &RepoCoordinates, revision: &str) -> String {
        format!(
            "{}/{}/{}/commit/{}/statuses/build",
            self.settings.base_url.trim_end_matches('/'),
            coordinates.owner(),
            coordinates.repo(),
            revision
        )
    }

    /// Reports `event` for every source reference it carries.
    ///
    /// Pushes run concurrently; this returns once all of them have resolved,
    /// with one outcome per reference in reference order.
    pub async fn report(&self, event: &BuildStatusEvent) -> Vec<PushOutcome> {
        let state = event.state();
        let label = self.label_for(&event.build.builder);
        let pushes = event
            .build
            .sources
            .iter()
            .map(|source| self.push(event, source, state, label.clone()));
        join_all(pushes).await
    }

    async fn push(
        &self,
        event: &BuildStatusEvent,
        source: &SourceReference,
        state: StatusState,
        label: StatusLabel,
    ) -> PushOutcome {
        let push_id = PushId::new_random();
        let span = tracing::debug_span!(
            "status.push",
            %push_id,
            builder = %event.build.builder,
            build = %event.build.number,
            revision = %source.revision,
            state = %state,
        );

        async move {
            let coordinates = match parse_repo_url(&source.repository) {
                Ok(coordinates) => coordinates,
                Err(error) => {
                    self.sink.record(LogEntry::UnparseableRepository {
                        builder: event.build.builder.clone(),
                        error,
                    });
                    return PushOutcome::SkippedUnparseable;
                }
            };

            let Some(token) = self.tokens.acquire().await else {
                return PushOutcome::SkippedNoToken;
            };

            let payload = StatusPayload::new(&event.build, state, label);
            match self
                .submit(&coordinates, source.revision.as_str(), &payload, token.into_inner())
                .await
            {
                Ok(()) => {
                    tracing::debug!("status published");
                    PushOutcome::Reported
                }
                Err(error) => {
                    self.sink.record(LogEntry::ReportFailed {
                        coordinates,
                        revision: source.revision.clone(),
                        error,
                    });
                    PushOutcome::ReportFailed
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn submit(
        &self,
        coordinates: &RepoCoordinates,
        revision: &str,
        payload: &StatusPayload,
        token: String,
    ) -> Result<(), ReportError> {
        let body = payload.to_json()?;
        let request = HttpRequest {
            url: self.status_url(coordinates, revision),
            auth: RequestAuth::Bearer(token),
            body: RequestBody::Json(body),
        };

        let response = self.transport.post(request).await?;
        match response.status {
            200 | 201 => Ok(()),
            status => Err(ReportError::Rejected {
                status,
                details: ApiErrorDetails::from_body(&response.body),
            }),
        }
    }
}
