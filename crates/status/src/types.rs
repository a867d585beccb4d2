//! Shared value types for the build-status reporting domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! the data that flows from a lifecycle notification to a commit-status
//! submission: the build as the pipeline reports it, the event wrapping it,
//! the repository coordinates derived from its sources, and the payload that
//! is finally posted.

use serde::{Deserialize, Serialize};

use crate::{BuildId, BuildNumber, BuilderName, ReportError, Revision};

// ---------------------------------------------------------------------------
// Build lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle phase of a build at the time a notification is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    /// The build has been created and is running.
    Started,
    /// The build has completed with a result.
    Finished,
}

impl BuildPhase {
    /// Maps the pipeline's notification action (`"new"`, `"finished"`) to a phase.
    ///
    /// Returns `None` for actions this reporter does not subscribe to.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "new" => Some(Self::Started),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------

/// Result code of a completed build.
///
/// Serialised as the pipeline's integer result code (`0` = success, `2` =
/// failure, ...). Only [`BuildResult::Success`] counts as success; every
/// other code is a non-success outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BuildResult {
    /// Every step succeeded.
    Success,
    /// Completed, but at least one step reported warnings.
    Warnings,
    /// At least one step failed.
    Failure,
    /// The build was skipped.
    Skipped,
    /// The build hit an internal error.
    Exception,
    /// The build will be retried.
    Retry,
    /// The build was cancelled.
    Cancelled,
}

impl BuildResult {
    /// Returns the result for a raw pipeline result code, or `None` if unknown.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Warnings),
            2 => Some(Self::Failure),
            3 => Some(Self::Skipped),
            4 => Some(Self::Exception),
            5 => Some(Self::Retry),
            6 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns the raw pipeline result code.
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Warnings => 1,
            Self::Failure => 2,
            Self::Skipped => 3,
            Self::Exception => 4,
            Self::Retry => 5,
            Self::Cancelled => 6,
        }
    }

    /// Returns `true` only for [`BuildResult::Success`].
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl TryFrom<u8> for BuildResult {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown build result code {code}"))
    }
}

impl From<BuildResult> for u8 {
    fn from(result: BuildResult) -> Self {
        result.code()
    }
}

// ---------------------------------------------------------------------------

/// What a build actually built: a repository URL plus the revision checked out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceReference {
    /// Repository URL in any supported dialect (scp-like, `https://`, `ssh://`).
    pub repository: String,
    /// Revision that was built.
    pub revision: Revision,
}

impl SourceReference {
    /// Creates a [`SourceReference`].
    pub fn new(repository: impl Into<String>, revision: Revision) -> Self {
        Self {
            repository: repository.into(),
            revision,
        }
    }
}

// ---------------------------------------------------------------------------

/// A build as exposed by the pipeline at notification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// Name of the builder that ran the build.
    pub builder: BuilderName,
    /// Build number within the builder.
    pub number: BuildNumber,
    /// Externally reachable URL of the build's detail page.
    pub url: String,
    /// `true` once the build has completed.
    #[serde(default)]
    pub complete: bool,
    /// Result code; `None` while the build is still running.
    #[serde(default, rename = "results")]
    pub result: Option<BuildResult>,
    /// Source references the build was made from (normally one).
    #[serde(default)]
    pub sources: Vec<SourceReference>,
}

// ---------------------------------------------------------------------------

/// Key of a lifecycle notification: which build, and which transition.
///
/// The pipeline publishes notifications keyed by the triple
/// `("builds", <build id>, "new" | "finished")`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LifecycleKey {
    /// Pipeline-wide build id.
    pub build_id: BuildId,
    /// Transition the notification reports.
    pub phase: BuildPhase,
}

impl LifecycleKey {
    /// Parses a notification key triple.
    ///
    /// Returns `None` for resources other than `"builds"` and for actions the
    /// reporter does not subscribe to.
    pub fn from_parts(resource: &str, build_id: u64, action: &str) -> Option<Self> {
        if resource != "builds" {
            return None;
        }
        let phase = BuildPhase::from_action(action)?;
        Some(Self {
            build_id: BuildId::new(build_id),
            phase,
        })
    }
}

/// One lifecycle notification together with the build it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStatusEvent {
    /// Lifecycle phase reported by the notification.
    pub phase: BuildPhase,
    /// The build at the time of the notification.
    pub build: Build,
}

impl BuildStatusEvent {
    /// Creates an event for `build` in the given `phase`.
    pub fn new(phase: BuildPhase, build: Build) -> Self {
        Self { phase, build }
    }

    /// Returns the commit-status state this event should publish.
    pub fn state(&self) -> StatusState {
        StatusState::for_phase(self.phase, self.build.result)
    }
}

// ---------------------------------------------------------------------------
// Commit-status API values
// ---------------------------------------------------------------------------

/// `(owner, repository)` pair addressing a repository on the status API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoCoordinates {
    owner: String,
    repo: String,
}

impl RepoCoordinates {
    /// Creates coordinates from an owner and a repository name.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Returns the owning user or workspace.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name (without any `.git` suffix).
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl std::fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

// ---------------------------------------------------------------------------

/// Commit-status state as understood by the status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusState {
    /// The build is running.
    #[serde(rename = "INPROGRESS")]
    InProgress,
    /// The build finished successfully.
    #[serde(rename = "SUCCESSFUL")]
    Successful,
    /// The build finished with any non-success result.
    #[serde(rename = "FAILED")]
    Failed,
}

impl StatusState {
    /// Maps a lifecycle phase and result to a status state.
    ///
    /// | phase | result | state |
    /// |-------|--------|-------|
    /// | started | any | `InProgress` |
    /// | finished | success | `Successful` |
    /// | finished | anything else (or none) | `Failed` |
    pub fn for_phase(phase: BuildPhase, result: Option<BuildResult>) -> Self {
        match (phase, result) {
            (BuildPhase::Started, _) => Self::InProgress,
            (BuildPhase::Finished, Some(r)) if r.is_success() => Self::Successful,
            (BuildPhase::Finished, _) => Self::Failed,
        }
    }

    /// Returns the wire representation (`"INPROGRESS"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "INPROGRESS",
            Self::Successful => "SUCCESSFUL",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for StatusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Status `key` and display `name` used for one builder's submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabel {
    /// Stable key identifying the status on a commit.
    pub key: String,
    /// Human-readable name shown by the hosting service.
    pub name: String,
}

impl StatusLabel {
    /// Uses the builder name as both key and display name.
    pub fn for_builder(builder: &BuilderName) -> Self {
        Self {
            key: builder.to_string(),
            name: builder.to_string(),
        }
    }
}

/// JSON body of a status submission.
///
/// Field order is the wire order: `url`, `state`, `key`, `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Link back to the build's detail page.
    pub url: String,
    /// State being published.
    pub state: StatusState,
    /// Status key.
    pub key: String,
    /// Status display name.
    pub name: String,
}

impl StatusPayload {
    /// Builds the payload for `build` in `state`, labelled with `label`.
    pub fn new(build: &Build, state: StatusState, label: StatusLabel) -> Self {
        Self {
            url: build.url.clone(),
            state,
            key: label.key,
            name: label.name,
        }
    }

    /// Encodes the request body.
    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string(self).map_err(|e| ReportError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_is_always_in_progress() {
        for result in [None, Some(BuildResult::Success), Some(BuildResult::Failure)] {
            assert_eq!(
                StatusState::for_phase(BuildPhase::Started, result),
                StatusState::InProgress
            );
        }
    }

    #[test]
    fn finished_success_is_successful() {
        assert_eq!(
            StatusState::for_phase(BuildPhase::Finished, Some(BuildResult::Success)),
            StatusState::Successful
        );
    }

    #[test]
    fn finished_non_success_is_failed() {
        for code in 1..=6 {
            let result = BuildResult::from_code(code);
            assert!(result.is_some());
            assert_eq!(
                StatusState::for_phase(BuildPhase::Finished, result),
                StatusState::Failed,
                "result code {code}"
            );
        }
        assert_eq!(
            StatusState::for_phase(BuildPhase::Finished, None),
            StatusState::Failed
        );
    }

    #[test]
    fn unknown_result_codes_are_rejected() {
        assert_eq!(BuildResult::from_code(7), None);
        assert!(serde_json::from_str::<BuildResult>("42").is_err());
    }

    #[test]
    fn lifecycle_keys_parse_only_build_transitions() {
        let key = LifecycleKey::from_parts("builds", 20, "new").unwrap();
        assert_eq!(key.build_id, BuildId::new(20));
        assert_eq!(key.phase, BuildPhase::Started);

        let key = LifecycleKey::from_parts("builds", 20, "finished").unwrap();
        assert_eq!(key.phase, BuildPhase::Finished);

        assert!(LifecycleKey::from_parts("builds", 20, "claimed").is_none());
        assert!(LifecycleKey::from_parts("buildrequests", 20, "new").is_none());
    }

    #[test]
    fn payload_serialises_in_wire_order() {
        let build = Build {
            builder: BuilderName::new("Builder0").unwrap(),
            number: BuildNumber::new(0),
            url: "http://localhost:8080/#builders/79/builds/0".to_string(),
            complete: false,
            result: None,
            sources: Vec::new(),
        };
        let payload = StatusPayload::new(
            &build,
            StatusState::InProgress,
            StatusLabel::for_builder(&build.builder),
        );
        assert_eq!(
            payload.to_json().unwrap(),
            r#"{"url":"http://localhost:8080/#builders/79/builds/0","state":"INPROGRESS","key":"Builder0","name":"Builder0"}"#
        );
    }

    #[test]
    fn builds_deserialise_from_pipeline_json() {
        let build: Build = serde_json::from_str(
            r#"{
                "builder": "Builder0",
                "number": 3,
                "url": "http://localhost:8080/#builders/79/builds/3",
                "complete": true,
                "results": 2,
                "sources": [{"repository": "git@bitbucket.org:user/repo.git", "revision": "abc123"}]
            }"#,
        )
        .unwrap();
        assert_eq!(build.result, Some(BuildResult::Failure));
        assert_eq!(build.sources.len(), 1);
        assert_eq!(build.sources[0].revision.as_str(), "abc123");
    }
}
