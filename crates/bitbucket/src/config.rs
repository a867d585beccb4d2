//! Reporter configuration.
//!
//! Deserialised from JSON. Credentials are stored as [`SecretSpec`]s and
//! turned into [`SecretSource`]s that re-read their value on every call, so a
//! rotated key in the environment or on disk is picked up by the next push.
//!
//! ```json
//! {
//!   "oauth_key": { "env": "BITBUCKET_KEY" },
//!   "oauth_secret": { "file": "/run/secrets/bitbucket" },
//!   "builders": ["linux", "macos"],
//!   "status_labels": { "linux": { "key": "ci/linux", "name": "Linux" } },
//!   "verify": true
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use status::{BuilderName, CredentialError, Credentials, SecretSource, StatusLabel, TransportOptions};
use thiserror::Error;

use crate::reporter::ReporterSettings;

/// Default base URL of the repositories API.
pub const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org/2.0/repositories";

/// Default OAuth2 token endpoint.
pub const DEFAULT_OAUTH_URL: &str = "https://bitbucket.org/site/oauth2/access_token";

/// Errors raised while loading or validating a [`ReporterConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("unable to read configuration '{path}': {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`ReporterConfig`].
    #[error("invalid configuration '{path}': {source}")]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A field holds a value the reporter cannot use.
    #[error("invalid configuration: {field}: {message}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Where a credential comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSpec {
    /// A literal value.
    Value(String),
    /// The named environment variable, read on every call.
    Env(String),
    /// The contents of a file (trailing newline removed), read on every call.
    ///
    /// The read is a small synchronous `std::fs` call made on the async task
    /// that performs the token exchange, once per push.
    File(PathBuf),
}

impl SecretSpec {
    /// Builds the resolver for this credential.
    pub fn to_source(&self) -> SecretSource {
        match self.clone() {
            Self::Value(value) => SecretSource::fixed(value),
            Self::Env(var) => SecretSource::from_fn(move || {
                std::env::var(&var).map_err(|_| CredentialError::MissingEnv(var.clone()))
            }),
            Self::File(path) => SecretSource::from_fn(move || {
                std::fs::read_to_string(&path)
                    .map(|s| s.trim_end_matches(['\r', '\n']).to_string())
                    .map_err(|e| CredentialError::Unreadable {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })
            }),
        }
    }
}

/// Full reporter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReporterConfig {
    /// OAuth consumer key.
    pub oauth_key: SecretSpec,
    /// OAuth consumer secret.
    pub oauth_secret: SecretSpec,
    /// Base URL of the repositories API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// OAuth2 token endpoint.
    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,
    /// Only report these builders. All builders are reported when absent.
    #[serde(default)]
    pub builders: Option<Vec<String>>,
    /// Per-builder status key/name overrides.
    #[serde(default)]
    pub status_labels: HashMap<String, StatusLabel>,
    /// Log HTTP bodies at debug level.
    #[serde(default)]
    pub debug: bool,
    /// Verify TLS certificates.
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_oauth_url() -> String {
    DEFAULT_OAUTH_URL.to_string()
}

fn default_verify() -> bool {
    true
}

impl ReporterConfig {
    /// Configuration with default URLs and flags for the given credentials.
    pub fn new(oauth_key: SecretSpec, oauth_secret: SecretSpec) -> Self {
        Self {
            oauth_key,
            oauth_secret,
            base_url: default_base_url(),
            oauth_url: default_oauth_url(),
            builders: None,
            status_labels: HashMap::new(),
            debug: false,
            verify: default_verify(),
        }
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks URLs and builder names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("base_url", &self.base_url)?;
        check_url("oauth_url", &self.oauth_url)?;

        if let Some(builders) = &self.builders {
            if builders.iter().any(String::is_empty) {
                return Err(ConfigError::Invalid {
                    field: "builders",
                    message: "builder names must not be empty".to_string(),
                });
            }
        }
        for (builder, label) in &self.status_labels {
            if builder.is_empty() || label.key.is_empty() || label.name.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "status_labels",
                    message: format!("label for builder '{builder}' has an empty field"),
                });
            }
        }
        Ok(())
    }

    /// Credentials resolved per call from the configured specs.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.oauth_key.to_source(), self.oauth_secret.to_source())
    }

    /// Flags forwarded to the transport.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            debug: self.debug,
            verify: self.verify,
        }
    }

    /// Reporter settings derived from this configuration.
    pub fn settings(&self) -> ReporterSettings {
        let builders = self.builders.as_ref().map(|names| {
            names
                .iter()
                .filter_map(BuilderName::new)
                .collect::<HashSet<_>>()
        });
        let labels = self
            .status_labels
            .iter()
            .filter_map(|(builder, label)| Some((BuilderName::new(builder.as_str())?, label.clone())))
            .collect();
        ReporterSettings {
            base_url: self.base_url.clone(),
            builders,
            labels,
        }
    }
}

fn check_url(field: &'static str, url: &str) -> Result<(), ConfigError> {
    let has_host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty());
    if has_host {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("'{url}' is not an http(s) URL"),
        })
    }
}
