//! Source repository resolution and checkout.
//!
//! Resolution expands one declared SCM URL into an ordered candidate list
//! (fallback-organization rewrites included), then attempts a minimal git
//! sequence against each candidate until one succeeds. There is no
//! full-history clone: fetching exactly the wanted ref works uniformly for
//! tags and raw commit hashes.

use crate::error::TesterError;
use crate::process::run_captured;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

const GITHUB_PATH_PATTERN: &str = r"(.*github\.com[:/])([^/]*)(.*)";

/// Expands a declared SCM URL into the ordered candidate list. When a
/// fallback organization is configured and the URL has a `github.com` path
/// shape, two rewrites of the organization segment are appended; non-GitHub
/// URLs get no fallback candidates.
pub fn candidate_urls(url: &str, fallback_organization: Option<&str>) -> Vec<String> {
    let mut candidates = vec![url.to_string()];
    let organization = match fallback_organization {
        Some(org) => org,
        None => return candidates,
    };
    let pattern = Regex::new(GITHUB_PATH_PATTERN).expect("github pattern is valid");
    let captures = match pattern.captures(url) {
        Some(captures) => captures,
        None => {
            debug!(url, "no github.com path segment; skipping fallback rewrites");
            return candidates;
        }
    };
    candidates.push(format!(
        "scm:git:git@github.com:{}{}",
        organization, &captures[3]
    ));
    candidates.push(format!("{}{}{}", &captures[1], organization, &captures[3]));
    candidates
}

/// Strips the `scm:git:` transport prefix and upgrades the insecure
/// `git://` scheme, which GitHub no longer serves.
pub fn normalize_url(url: &str) -> String {
    let url = url.strip_prefix("scm:git:").unwrap_or(url);
    url.replace("git://", "https://")
}

/// Last path component of a git URL, without a trailing `.git`.
pub fn repo_name_from_url(url: &str) -> Result<String, TesterError> {
    let index = url.rfind('/').ok_or_else(|| {
        TesterError::sources_unavailable(format!("failed to obtain local directory for {url}"))
    })?;
    let name = &url[index + 1..];
    Ok(name.strip_suffix(".git").unwrap_or(name).to_string())
}

/// Resolves and checks out the given ref, trying each candidate URL in
/// order. All candidate failures are retained; when every candidate fails
/// the raised error carries the earlier failures as suppressed causes, most
/// recent first.
pub fn clone_repository(
    url: &str,
    fallback_organization: Option<&str>,
    scm_ref: &str,
    checkout_dir: &Path,
) -> Result<(), TesterError> {
    let mut last: Option<TesterError> = None;
    for candidate in candidate_urls(url, fallback_organization) {
        let candidate = normalize_url(&candidate);
        match clone_impl(&candidate, scm_ref, checkout_dir) {
            Ok(()) => return Ok(()),
            Err(fatal @ TesterError::Io(_)) => return Err(fatal),
            Err(failure) => {
                last = Some(match last.take() {
                    Some(previous) => failure.suppress(previous),
                    None => failure,
                });
            }
        }
    }
    Err(last.unwrap_or_else(|| {
        TesterError::sources_unavailable(format!("no clone candidates for {url}"))
    }))
}

/// The minimal checkout sequence: recreate the target directory, `git
/// init`, `git fetch <url> <ref>`, `git checkout FETCH_HEAD`.
fn clone_impl(url: &str, scm_ref: &str, checkout_dir: &Path) -> Result<(), TesterError> {
    info!(url, r#ref = scm_ref, dir = %checkout_dir.display(), "checking out from git repository");

    if checkout_dir.is_dir() {
        fs::remove_dir_all(checkout_dir)?;
    }
    fs::create_dir_all(checkout_dir)?;

    run_git(checkout_dir, &["init"])?;
    run_git(checkout_dir, &["fetch", url, scm_ref])?;
    run_git(checkout_dir, &["checkout", "FETCH_HEAD"])?;
    Ok(())
}

fn run_git(checkout_dir: &Path, args: &[&str]) -> Result<(), TesterError> {
    let output = run_captured(Command::new("git").args(args).current_dir(checkout_dir))?;
    if !output.success() {
        return Err(TesterError::sources_unavailable(format!(
            "git {} failed with exit status {}: {}",
            args.first().copied().unwrap_or_default(),
            output.status,
            output.output.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn fallback_expansion_rewrites_organization_segment() {
        let candidates = candidate_urls("git@github.com:orga/repo.git", Some("orgb"));
        assert_eq!(
            candidates,
            vec![
                "git@github.com:orga/repo.git",
                "scm:git:git@github.com:orgb/repo.git",
                "git@github.com:orgb/repo.git",
            ]
        );
    }

    #[test]
    fn fallback_expansion_handles_https_urls() {
        let candidates =
            candidate_urls("https://github.com/jenkinsci/mailer-plugin.git", Some("acme"));
        assert_eq!(candidates.len(), 3);
        assert_eq!(
            candidates[2],
            "https://github.com/acme/mailer-plugin.git"
        );
    }

    #[test]
    fn non_github_urls_skip_fallback() {
        let candidates = candidate_urls("https://gitlab.example.com/x/y.git", Some("acme"));
        assert_eq!(candidates, vec!["https://gitlab.example.com/x/y.git"]);
    }

    #[test]
    fn no_fallback_organization_means_single_candidate() {
        let candidates = candidate_urls("git@github.com:orga/repo.git", None);
        assert_eq!(candidates, vec!["git@github.com:orga/repo.git"]);
    }

    #[parameterized(
        scm_prefix = { "scm:git:https://github.com/a/b.git", "https://github.com/a/b.git" },
        insecure_scheme = { "git://github.com/a/b.git", "https://github.com/a/b.git" },
        scm_prefix_and_insecure = { "scm:git:git://github.com/a/b.git", "https://github.com/a/b.git" },
        untouched = { "git@github.com:a/b.git", "git@github.com:a/b.git" },
    )]
    fn url_normalization(input: &str, expected: &str) {
        assert_eq!(normalize_url(input), expected);
    }

    #[test]
    fn repo_name_extraction() {
        assert_eq!(
            repo_name_from_url("https://example.com/group/plugin-x.git").unwrap(),
            "plugin-x"
        );
        assert_eq!(
            repo_name_from_url("https://example.com/group/plugin-x").unwrap(),
            "plugin-x"
        );
    }

    #[test]
    fn repo_name_without_path_separator_is_rejected() {
        let err = repo_name_from_url("plugin-x").unwrap_err();
        assert!(matches!(err, TesterError::SourcesUnavailable { .. }));
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn exhausted_candidates_chain_every_failure() {
        if !git_available() {
            eprintln!("git not available; skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path().join("checkout");
        let err = clone_repository(
            "git@github.com:orga/does-not-exist.git",
            Some("orgb"),
            "v1.0",
            &checkout,
        )
        .unwrap_err();
        match err {
            TesterError::SourcesUnavailable { suppressed, .. } => {
                // one failure per candidate, two of them suppressed
                assert_eq!(suppressed.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn clone_checks_out_the_requested_ref() {
        if !git_available() {
            eprintln!("git not available; skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let origin = dir.path().join("origin");
        fs::create_dir_all(&origin).unwrap();
        for args in [
            vec!["init", "-b", "main"],
            vec!["config", "user.email", "test@example.com"],
            vec!["config", "user.name", "Test"],
        ] {
            assert!(Command::new("git")
                .args(&args)
                .current_dir(&origin)
                .output()
                .unwrap()
                .status
                .success());
        }
        fs::write(origin.join("pom.xml"), "<project/>").unwrap();
        for args in [
            vec!["add", "."],
            vec!["commit", "-m", "release"],
            vec!["tag", "demo-1.0"],
        ] {
            assert!(Command::new("git")
                .args(&args)
                .current_dir(&origin)
                .output()
                .unwrap()
                .status
                .success());
        }

        let checkout = dir.path().join("checkout");
        clone_repository(origin.to_str().unwrap(), None, "demo-1.0", &checkout).unwrap();
        assert!(checkout.join("pom.xml").is_file());
    }
}
