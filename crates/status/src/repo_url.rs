//! Repository URL normalisation.
//!
//! Reduces a repository URL in any of the dialects git hosts hand out to the
//! `(owner, repository)` pair the status API is addressed by:
//!
//! | Dialect | Example |
//! |---------|---------|
//! | scp-like | `git@bitbucket.org:owner/repo.git` |
//! | `https://` | `https://bitbucket.org/owner/repo` |
//! | `ssh://` | `ssh://git@bitbucket.org/owner/repo.git` |
//!
//! Parsing is a pure function of the input string.

use crate::{ParseError, RepoCoordinates};

const GIT_SUFFIX: &str = ".git";

/// Extracts `(owner, repository)` from a repository URL.
///
/// The scheme and host (plus any `user@`) are removed, the remaining path is
/// split on `/`, and the last two non-empty segments become the owner and the
/// repository. A trailing `.git` is stripped from the repository.
///
/// # Errors
///
/// Returns [`ParseError`] when fewer than two path segments remain, or when
/// the repository segment is nothing but `.git`.
pub fn parse_repo_url(url: &str) -> Result<RepoCoordinates, ParseError> {
    let path = strip_host(url);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let &[.., owner, repo] = segments.as_slice() else {
        return Err(ParseError::TooFewSegments {
            url: url.to_string(),
        });
    };

    let repo = repo.strip_suffix(GIT_SUFFIX).unwrap_or(repo);
    if repo.is_empty() {
        return Err(ParseError::EmptyRepository {
            url: url.to_string(),
        });
    }

    Ok(RepoCoordinates::new(owner, repo))
}

/// Returns the path portion of `url`.
fn strip_host(url: &str) -> &str {
    if let Some((_, rest)) = url.split_once("://") {
        // scheme://[user@]host[:port]/path
        return rest.split_once('/').map_or("", |(_, path)| path);
    }
    // [user@]host:path
    url.split_once(':').map_or(url, |(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(url: &str) -> (String, String) {
        let coords = parse_repo_url(url).unwrap();
        (coords.owner().to_string(), coords.repo().to_string())
    }

    fn user_repo() -> (String, String) {
        ("user".to_string(), "repo".to_string())
    }

    #[test]
    fn parses_scp_like_urls() {
        assert_eq!(parse("git@bitbucket.com:user/repo.git"), user_repo());
        assert_eq!(parse("git@bitbucket.com:user/repo"), user_repo());
    }

    #[test]
    fn parses_https_urls() {
        assert_eq!(parse("https://bitbucket.com/user/repo.git"), user_repo());
        assert_eq!(parse("https://bitbucket.com/user/repo"), user_repo());
    }

    #[test]
    fn parses_ssh_urls() {
        assert_eq!(parse("ssh://git@bitbucket.com/user/repo.git"), user_repo());
        assert_eq!(parse("ssh://git@bitbucket.com/user/repo"), user_repo());
    }

    #[test]
    fn takes_the_last_two_segments() {
        assert_eq!(parse("https://host:7990/scm/user/repo.git"), user_repo());
        assert_eq!(parse("https://example.org/user/repo/"), user_repo());
        assert_eq!(parse("https://user@example.org/user/repo"), user_repo());
    }

    #[test]
    fn only_a_trailing_git_suffix_is_stripped() {
        assert_eq!(
            parse("https://bitbucket.com/user/repo.github.io"),
            ("user".to_string(), "repo.github.io".to_string())
        );
    }

    #[test]
    fn rejects_urls_without_owner_and_repo() {
        for url in [
            "",
            "https://bitbucket.com",
            "https://bitbucket.com/",
            "https://bitbucket.com/repo",
            "git@bitbucket.com:repo.git",
        ] {
            assert!(
                matches!(parse_repo_url(url), Err(ParseError::TooFewSegments { .. })),
                "{url:?} should not parse"
            );
        }
    }

    #[test]
    fn rejects_a_bare_git_suffix() {
        assert!(matches!(
            parse_repo_url("https://bitbucket.com/user/.git"),
            Err(ParseError::EmptyRepository { .. })
        ));
    }
}
