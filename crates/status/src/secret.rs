//! Pull-based credential resolution.
//!
//! Client keys and secrets are never stored as plain strings by the reporter.
//! A [`SecretSource`] is resolved immediately before every authorization call,
//! so rotating a credential takes effect on the next push.

use std::sync::Arc;

use crate::CredentialError;

type Resolver = dyn Fn() -> Result<String, CredentialError> + Send + Sync;

/// A zero-argument resolver returning the current value of a credential.
///
/// Resolvers run synchronously inside the async token exchange, so they must
/// stay cheap: an environment lookup or a small file read.
#[derive(Clone)]
pub struct SecretSource {
    resolve: Arc<Resolver>,
}

impl SecretSource {
    /// A credential that never changes.
    pub fn fixed(value: impl Into<String>) -> Self {
        let value = value.into();
        Self::from_fn(move || Ok(value.clone()))
    }

    /// A credential computed by `resolve` on every call.
    pub fn from_fn<F>(resolve: F) -> Self
    where
        F: Fn() -> Result<String, CredentialError> + Send + Sync + 'static,
    {
        Self {
            resolve: Arc::new(resolve),
        }
    }

    /// Resolves the current value.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error, and returns [`CredentialError::Empty`]
    /// when the resolver yields an empty string.
    pub fn resolve(&self) -> Result<String, CredentialError> {
        let value = (self.resolve)()?;
        if value.is_empty() {
            return Err(CredentialError::Empty);
        }
        Ok(value)
    }
}

impl std::fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretSource(<redacted>)")
    }
}

/// OAuth client key and secret, both resolved per call.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// OAuth consumer key.
    pub key: SecretSource,
    /// OAuth consumer secret.
    pub secret: SecretSource,
}

impl Credentials {
    /// Creates credentials from two sources.
    pub fn new(key: SecretSource, secret: SecretSource) -> Self {
        Self { key, secret }
    }

    /// Resolves `(key, secret)` for one authorization call.
    pub fn resolve(&self) -> Result<(String, String), CredentialError> {
        Ok((self.key.resolve()?, self.secret.resolve()?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn resolvers_run_on_every_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = SecretSource::from_fn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("secret-{n}"))
        });

        assert_eq!(source.resolve().unwrap(), "secret-0");
        assert_eq!(source.resolve().unwrap(), "secret-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_values_are_rejected() {
        assert_eq!(SecretSource::fixed("").resolve(), Err(CredentialError::Empty));
    }

    #[test]
    fn debug_output_is_redacted() {
        let creds = Credentials::new(SecretSource::fixed("key"), SecretSource::fixed("hunter2"));
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
