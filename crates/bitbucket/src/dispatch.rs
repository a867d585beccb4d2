//! Event dispatch with backward compatibility for the single-build hook.
//!
//! Reporters historically published statuses by implementing a one-argument
//! `send(build)` hook. The per-event path in [`StatusReporter::report`]
//! replaces it, but existing hooks keep working: a [`BitbucketStatusPush`]
//! built with [`BitbucketStatusPush::with_legacy_send`] routes every event
//! through the hook and logs a deprecation notice each time.
//!
//! The choice is made once, at construction, and never changes:
//!
//! ```text
//! new(..)              -> Default : event -> StatusReporter::report
//! with_legacy_send(..) -> Legacy  : event -> deprecation notice -> LegacySend::send
//! ```
//!
//! A hook that delegates to [`StatusReporter::report`] produces exactly the
//! same authorization and status calls as the default path.

use std::sync::Arc;

use async_trait::async_trait;
use status::{Build, BuildStatusEvent, LifecycleKey, LogEntry};

use crate::reporter::{PushOutcome, StatusReporter};

/// Deprecation notice logged every time the legacy hook is used.
pub const LEGACY_SEND_DEPRECATION: &str =
    "send() in reporters has been deprecated; report through the per-event path instead";

/// The deprecated single-build reporting hook.
///
/// Implementations usually do their own bookkeeping and then delegate to
/// `reporter.report(event)`.
#[async_trait]
pub trait LegacySend: Send + Sync {
    /// Reports one event.
    async fn send(&self, reporter: &StatusReporter, event: &BuildStatusEvent) -> Vec<PushOutcome>;
}

/// Which code path decides what to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Events go straight to [`StatusReporter::report`].
    Default,
    /// Events go through a [`LegacySend`] hook.
    Legacy,
}

enum Dispatch {
    Default,
    Legacy(Arc<dyn LegacySend>),
}

/// Entry point for lifecycle notifications.
pub struct BitbucketStatusPush {
    reporter: StatusReporter,
    dispatch: Dispatch,
}

impl BitbucketStatusPush {
    /// Creates a push that reports through the per-event path.
    pub fn new(reporter: StatusReporter) -> Self {
        Self {
            reporter,
            dispatch: Dispatch::Default,
        }
    }

    /// Creates a push that routes every event through `hook`.
    pub fn with_legacy_send(reporter: StatusReporter, hook: Arc<dyn LegacySend>) -> Self {
        Self {
            reporter,
            dispatch: Dispatch::Legacy(hook),
        }
    }

    /// The dispatch path fixed at construction.
    pub fn mode(&self) -> DispatchMode {
        match self.dispatch {
            Dispatch::Default => DispatchMode::Default,
            Dispatch::Legacy(_) => DispatchMode::Legacy,
        }
    }

    pub fn reporter(&self) -> &StatusReporter {
        &self.reporter
    }

    /// Handles a raw lifecycle notification.
    pub async fn got_event(&self, key: LifecycleKey, build: Build) -> Vec<PushOutcome> {
        self.handle_event(&BuildStatusEvent::new(key.phase, build))
            .await
    }

    /// Handles one event, returning one outcome per source reference.
    ///
    /// Events from builders outside the allow-list are dropped before the
    /// dispatch decision, so they neither reach the hook nor log a deprecation.
    pub async fn handle_event(&self, event: &BuildStatusEvent) -> Vec<PushOutcome> {
        if !self.reporter.reports_builder(&event.build.builder) {
            self.reporter.sink().record(LogEntry::BuilderNotReported {
                builder: event.build.builder.clone(),
            });
            return Vec::new();
        }

        match &self.dispatch {
            Dispatch::Default => self.reporter.report(event).await,
            Dispatch::Legacy(hook) => {
                self.reporter.sink().record(LogEntry::LegacySendDeprecated {
                    message: LEGACY_SEND_DEPRECATION,
                });
                hook.send(&self.reporter, event).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use status::{
        BuildNumber, BuildPhase, BuildResult, BuilderName, Credentials, FakeTransport,
        HttpResponse, HttpTransport, LogSink, RecordingSink, Revision, SecretSource,
        SourceReference,
    };

    use super::*;
    use crate::reporter::ReporterSettings;
    use crate::token::TokenManager;

    const OAUTH_URL: &str = "https://bitbucket.org/site/oauth2/access_token";
    const STATUS_URL: &str =
        "https://api.bitbucket.org/2.0/repositories/user/repo/commit/d34db33fd43db33f/statuses/build";

    #[derive(Default)]
    struct CountingSend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LegacySend for CountingSend {
        async fn send(&self, reporter: &StatusReporter, event: &BuildStatusEvent) -> Vec<PushOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            reporter.report(event).await
        }
    }

    fn reporter(transport: &FakeTransport, sink: &RecordingSink, builders: Option<&[&str]>) -> StatusReporter {
        let transport: Arc<dyn HttpTransport> = Arc::new(transport.clone());
        let sink: Arc<dyn LogSink> = Arc::new(sink.clone());
        let tokens = TokenManager::new(
            Arc::clone(&transport),
            Arc::clone(&sink),
            OAUTH_URL,
            Credentials::new(SecretSource::fixed("key"), SecretSource::fixed("secret")),
        );
        let settings = ReporterSettings {
            base_url: "https://api.bitbucket.org/2.0/repositories".to_string(),
            builders: builders.map(|names| {
                names
                    .iter()
                    .filter_map(|n| BuilderName::new(*n))
                    .collect::<HashSet<_>>()
            }),
            ..ReporterSettings::default()
        };
        StatusReporter::new(settings, tokens, transport, sink)
    }

    fn build() -> Build {
        Build {
            builder: BuilderName::new("Builder0").unwrap(),
            number: BuildNumber::new(0),
            url: "http://localhost:8080/#builders/79/builds/0".to_string(),
            complete: false,
            result: None,
            sources: vec![SourceReference::new(
                "https://example.org/user/repo",
                Revision::new("d34db33fd43db33f").unwrap(),
            )],
        }
    }

    fn script_lifecycle(transport: &FakeTransport) {
        for _ in 0..3 {
            transport.respond(OAUTH_URL, HttpResponse::json(200, &json!({"access_token": "foo"})));
            transport.respond(STATUS_URL, HttpResponse::new(201, ""));
        }
    }

    /// new -> finished(success) -> finished(failure), as the pipeline emits them.
    async fn run_lifecycle(push: &BitbucketStatusPush) {
        let key = |action: &str| LifecycleKey::from_parts("builds", 20, action).unwrap();
        let mut b = build();
        push.got_event(key("new"), b.clone()).await;

        b.complete = true;
        b.result = Some(BuildResult::Success);
        push.got_event(key("finished"), b.clone()).await;

        b.result = Some(BuildResult::Failure);
        push.got_event(key("finished"), b).await;
    }

    fn states(transport: &FakeTransport) -> Vec<String> {
        transport
            .requests_to(STATUS_URL)
            .into_iter()
            .map(|r| match r.body {
                status::RequestBody::Json(body) => {
                    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
                    v["state"].as_str().unwrap_or_default().to_string()
                }
                status::RequestBody::Form(_) => String::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn default_path_reports_the_whole_lifecycle() {
        let transport = FakeTransport::new();
        let sink = RecordingSink::new();
        script_lifecycle(&transport);

        let push = BitbucketStatusPush::new(reporter(&transport, &sink, None));
        assert_eq!(push.mode(), DispatchMode::Default);
        run_lifecycle(&push).await;

        assert_eq!(states(&transport), ["INPROGRESS", "SUCCESSFUL", "FAILED"]);
        assert!(transport.is_drained());
        assert!(sink.entries().is_empty());
    }

    #[tokio::test]
    async fn legacy_hook_is_called_once_per_event_with_one_deprecation_each() {
        let transport = FakeTransport::new();
        let sink = RecordingSink::new();
        script_lifecycle(&transport);
        let hook = Arc::new(CountingSend::default());

        let push = BitbucketStatusPush::with_legacy_send(
            reporter(&transport, &sink, None),
            Arc::clone(&hook) as Arc<dyn LegacySend>,
        );
        assert_eq!(push.mode(), DispatchMode::Legacy);
        run_lifecycle(&push).await;

        assert_eq!(hook.calls.load(Ordering::SeqCst), 3);
        let deprecations: Vec<_> = sink
            .entries()
            .into_iter()
            .filter(|e| matches!(e, LogEntry::LegacySendDeprecated { .. }))
            .collect();
        assert_eq!(deprecations.len(), 3);
        assert!(sink.logged("send() in reporters has been deprecated"));
    }

    #[tokio::test]
    async fn both_paths_make_identical_requests() {
        let default_transport = FakeTransport::new();
        let legacy_transport = FakeTransport::new();
        script_lifecycle(&default_transport);
        script_lifecycle(&legacy_transport);

        let default_push =
            BitbucketStatusPush::new(reporter(&default_transport, &RecordingSink::new(), None));
        let legacy_push = BitbucketStatusPush::with_legacy_send(
            reporter(&legacy_transport, &RecordingSink::new(), None),
            Arc::new(CountingSend::default()),
        );
        run_lifecycle(&default_push).await;
        run_lifecycle(&legacy_push).await;

        assert_eq!(default_transport.requests().len(), 6);
        assert_eq!(default_transport.requests(), legacy_transport.requests());
    }

    #[tokio::test]
    async fn builders_outside_the_allow_list_are_not_reported() {
        let transport = FakeTransport::new();
        let sink = RecordingSink::new();
        let hook = Arc::new(CountingSend::default());
        let push = BitbucketStatusPush::with_legacy_send(
            reporter(&transport, &sink, Some(&["Builder1"])),
            Arc::clone(&hook) as Arc<dyn LegacySend>,
        );

        let outcomes = push
            .handle_event(&BuildStatusEvent::new(BuildPhase::Started, build()))
            .await;

        assert!(outcomes.is_empty());
        assert!(transport.requests().is_empty());
        assert_eq!(hook.calls.load(Ordering::SeqCst), 0);
        assert!(sink.problems().is_empty());
    }
}
