//! Run configuration.
//!
//! Assembled once from CLI arguments, then read-only for the whole run. The
//! core never mutates it; hooks receive a shared reference through their
//! phase contexts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WAR file not found: {0}")]
    WarNotFound(PathBuf),

    #[error("local checkout directory not found: {0}")]
    LocalCheckoutNotFound(PathBuf),

    #[error("invalid Maven property '{0}', expected key=value")]
    InvalidProperty(String),
}

/// Configuration of one test run.
#[derive(Debug, Clone)]
pub struct TesterConfig {
    /// The core distribution WAR under test.
    pub war: PathBuf,

    /// Directory receiving checkouts and build logs.
    pub working_dir: PathBuf,

    /// When non-empty, only these plugin ids are tested.
    pub include_plugins: BTreeSet<String>,

    /// Plugin ids never tested.
    pub exclude_plugins: BTreeSet<String>,

    /// Abort the whole run on the first failure instead of aggregating.
    pub fail_fast: bool,

    /// GitHub organization to retry clones against when the declared one is
    /// gone.
    pub fallback_github_organization: Option<String>,

    /// Extra properties passed to every test invocation. The tester's own
    /// forced properties win on conflict.
    pub maven_properties: BTreeMap<String, String>,

    /// Maven executable to invoke.
    pub external_maven: PathBuf,

    /// Optional Maven settings file.
    pub maven_settings: Option<PathBuf>,

    /// Extra arguments passed to every Maven invocation.
    pub maven_args: Vec<String>,

    /// Hook/extractor ids omitted from registration.
    pub excluded_hooks: Vec<String>,

    /// Pre-existing checkout tested as one extra repository group, without
    /// any checkout step.
    pub local_checkout_dir: Option<PathBuf>,

    /// Optional path receiving the JSON scan report.
    pub report: Option<PathBuf>,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            war: PathBuf::from("jenkins.war"),
            working_dir: PathBuf::from("work"),
            include_plugins: BTreeSet::new(),
            exclude_plugins: BTreeSet::new(),
            fail_fast: false,
            fallback_github_organization: None,
            maven_properties: BTreeMap::new(),
            external_maven: PathBuf::from("mvn"),
            maven_settings: None,
            maven_args: Vec::new(),
            excluded_hooks: Vec::new(),
            local_checkout_dir: None,
            report: None,
        }
    }
}

impl TesterConfig {
    /// Checks that the configured paths exist before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.war.is_file() {
            return Err(ConfigError::WarNotFound(self.war.clone()));
        }
        if let Some(dir) = &self.local_checkout_dir {
            if !dir.is_dir() {
                return Err(ConfigError::LocalCheckoutNotFound(dir.clone()));
            }
        }
        Ok(())
    }
}

/// Parses one `key=value` CLI property.
pub fn parse_property(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(ConfigError::InvalidProperty(raw.to_string())),
    }
}

impl fmt::Display for TesterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Plugin compatibility test configuration:")?;
        writeln!(f, "  WAR: {}", self.war.display())?;
        writeln!(f, "  Working dir: {}", self.working_dir.display())?;
        writeln!(f, "  Fail fast: {}", self.fail_fast)?;
        if !self.include_plugins.is_empty() {
            writeln!(f, "  Include: {:?}", self.include_plugins)?;
        }
        if !self.exclude_plugins.is_empty() {
            writeln!(f, "  Exclude: {:?}", self.exclude_plugins)?;
        }
        if let Some(org) = &self.fallback_github_organization {
            writeln!(f, "  Fallback organization: {org}")?;
        }
        if let Some(dir) = &self.local_checkout_dir {
            writeln!(f, "  Local checkout: {}", dir.display())?;
        }
        Ok(())
    }
}
