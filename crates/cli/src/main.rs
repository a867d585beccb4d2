// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bbstatus entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load the JSON reporter config named by
//!    `--config` (or `BBSTATUS_CONFIG`) and validate it.
//! 2. **Wire observability**: see [`observability`].
//! 3. **Construct infrastructure**: a [`transport::ReqwestTransport`] and a
//!    [`status::TracingSink`], injected into the reporter.
//! 4. **Drive events**: read lifecycle notifications as JSON lines from a file
//!    or stdin and hand each to [`bitbucket::BitbucketStatusPush::got_event`],
//!    in stream order.
//!
//! Reporting failures never fail the process; they are logged and counted.

mod events;
mod observability;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bitbucket::{reporter_from_config, BitbucketStatusPush, PushOutcome, ReporterConfig};
use clap::Parser;
use status::{HttpTransport, LogSink, TracingSink};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use transport::ReqwestTransport;

use crate::events::{parse_line, StreamItem};

#[derive(Parser)]
#[command(
    name = "bbstatus",
    version,
    about = "Publish build lifecycle events as Bitbucket commit statuses"
)]
struct Args {
    /// Reporter configuration (JSON)
    #[arg(long, env = "BBSTATUS_CONFIG")]
    config: PathBuf,

    /// Event stream in JSON-lines form; stdin when omitted
    events: Option<PathBuf>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    events: usize,
    reported: usize,
    skipped: usize,
    failed: usize,
}

impl Summary {
    fn record(&mut self, outcomes: &[PushOutcome]) {
        self.events += 1;
        for outcome in outcomes {
            match outcome {
                PushOutcome::Reported => self.reported += 1,
                PushOutcome::SkippedUnparseable | PushOutcome::SkippedNoToken => self.skipped += 1,
                PushOutcome::ReportFailed => self.failed += 1,
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let telemetry = observability::init()?;

    let result = run(args).await;
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "bbstatus aborted");
    }

    telemetry.shutdown();
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = ReporterConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let transport: Arc<dyn HttpTransport> = Arc::new(
        ReqwestTransport::new(config.transport_options()).context("building the HTTP client")?,
    );
    let sink: Arc<dyn LogSink> = Arc::new(TracingSink);
    let push = BitbucketStatusPush::new(reporter_from_config(&config, transport, sink));

    let summary = match &args.events {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            drive(&push, BufReader::new(file)).await?
        }
        None => drive(&push, BufReader::new(tokio::io::stdin())).await?,
    };

    tracing::info!(
        events = summary.events,
        reported = summary.reported,
        skipped = summary.skipped,
        failed = summary.failed,
        "event stream drained"
    );
    Ok(())
}

async fn drive<R>(push: &BitbucketStatusPush, reader: R) -> anyhow::Result<Summary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = Summary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("reading the event stream")? {
        line_no += 1;
        match parse_line(&line) {
            Ok(StreamItem::Event(key, build)) => {
                let outcomes = push.got_event(key, build).await;
                summary.record(&outcomes);
            }
            Ok(StreamItem::Ignored { resource, action }) => {
                tracing::debug!(line = line_no, %resource, %action, "ignoring notification");
            }
            Ok(StreamItem::Blank) => {}
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed event");
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use bitbucket::{SecretSpec, DEFAULT_OAUTH_URL};
    use serde_json::json;
    use status::{FakeTransport, HttpResponse, RecordingSink, RequestBody};

    use super::*;

    const STATUS_URL: &str =
        "https://api.bitbucket.org/2.0/repositories/user/repo/commit/d34db33fd43db33f/statuses/build";

    fn event_line(action: &str, extra: &str) -> String {
        format!(
            r#"{{"key":["builds",20,"{action}"],"build":{{"builder":"Builder0","number":0,"url":"http://ci/0"{extra},"sources":[{{"repository":"https://example.org/user/repo","revision":"d34db33fd43db33f"}}]}}}}"#
        )
    }

    #[tokio::test]
    async fn drive_reports_events_in_stream_order_and_skips_bad_lines() {
        let transport = FakeTransport::new();
        for _ in 0..2 {
            transport.respond(DEFAULT_OAUTH_URL, HttpResponse::json(200, &json!({"access_token": "foo"})));
            transport.respond(STATUS_URL, HttpResponse::new(201, ""));
        }
        let sink = RecordingSink::new();
        let config = ReporterConfig::new(
            SecretSpec::Value("key".into()),
            SecretSpec::Value("secret".into()),
        );
        let push = BitbucketStatusPush::new(reporter_from_config(
            &config,
            Arc::new(transport.clone()),
            Arc::new(sink.clone()),
        ));

        let stream = [
            event_line("new", ""),
            "{not json".to_string(),
            event_line("new", "").replacen(r#"["builds""#, r#"["steps""#, 1),
            String::new(),
            event_line("finished", r#","complete":true,"results":0"#),
        ]
        .join("\n");

        let summary = drive(&push, BufReader::new(stream.as_bytes())).await.unwrap();

        assert_eq!(
            summary,
            Summary {
                events: 2,
                reported: 2,
                skipped: 0,
                failed: 0,
            }
        );
        let states: Vec<String> = transport
            .requests_to(STATUS_URL)
            .into_iter()
            .map(|r| match r.body {
                RequestBody::Json(body) => {
                    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
                    body["state"].as_str().unwrap().to_string()
                }
                RequestBody::Form(_) => panic!("status bodies are JSON"),
            })
            .collect();
        assert_eq!(states, ["INPROGRESS", "SUCCESSFUL"]);
        assert!(transport.is_drained());
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn summary_counts_every_outcome() {
        let mut summary = Summary::default();
        summary.record(&[PushOutcome::Reported, PushOutcome::SkippedNoToken]);
        summary.record(&[PushOutcome::ReportFailed, PushOutcome::SkippedUnparseable]);
        summary.record(&[]);

        assert_eq!(
            summary,
            Summary {
                events: 3,
                reported: 1,
                skipped: 2,
                failed: 1,
            }
        );
    }

    #[test]
    fn events_path_is_optional() {
        let args = Args::try_parse_from(["bbstatus", "--config", "bb.json"]).unwrap();
        assert_eq!(args.config, PathBuf::from("bb.json"));
        assert!(args.events.is_none());

        let args =
            Args::try_parse_from(["bbstatus", "--config", "bb.json", "events.jsonl"]).unwrap();
        assert_eq!(args.events, Some(PathBuf::from("events.jsonl")));
    }
}
