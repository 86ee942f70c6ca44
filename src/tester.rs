//! The orchestration loop: scan, extract, filter, group, clone, build.
//!
//! Control flow is fully sequential. Work is grouped by source repository so
//! each repository is checked out once; failures are recorded per group (a
//! failed clone skips every plugin in the group as one failure) or per
//! plugin, and either abort the run immediately (fail-fast) or are
//! aggregated into a single error raised at the end.

use crate::config::TesterConfig;
use crate::error::{AggregateFailure, FailureChain, TesterError};
use crate::hooks::{
    BeforeCheckoutContext, BeforeCompilationContext, BeforeExecutionContext, HookRegistry,
};
use crate::maven::{BuildRunner, ExternalMavenRunner};
use crate::metadata::{MetadataExtractorChain, PluginMetadata, ProjectModel};
use crate::scm;
use crate::versions::VersionNumber;
use crate::war::{self, BundledPlugin, ScanResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// First core line where the zeroed `javax.servlet:servlet-api` placeholder
/// no longer trips the upper-bounds check (JENKINS-68696).
const SERVLET_EXCLUDE_THRESHOLD: &str = "2.382";

/// Goals of the test invocation, before hooks adjust them.
const TEST_GOALS: [&str; 3] = [
    "hpi:resolve-test-dependencies",
    "hpi:test-hpl",
    "surefire:test",
];

/// One unit of checkout work: every plugin built from the same repository.
struct RepoGroup {
    checkout_dir: PathBuf,
    /// `(url, ref)` to clone, or `None` for a pre-existing local checkout.
    clone: Option<(String, String)>,
    plugins: Vec<PluginMetadata>,
}

pub struct PluginCompatTester {
    config: TesterConfig,
    runner: Box<dyn BuildRunner>,
}

impl PluginCompatTester {
    pub fn new(config: TesterConfig) -> Self {
        let runner = Box::new(ExternalMavenRunner::new(
            config.external_maven.clone(),
            config.maven_settings.clone(),
            config.maven_args.clone(),
        ));
        Self { config, runner }
    }

    /// Replaces the build-tool invocation, for exercising the orchestration
    /// loop without a Maven installation.
    pub fn with_runner(config: TesterConfig, runner: Box<dyn BuildRunner>) -> Self {
        Self { config, runner }
    }

    /// Runs the whole compatibility test cycle.
    pub fn test_plugins(&self) -> Result<(), AggregateFailure> {
        let hooks = self.build_hook_registry();
        let extractors = self.build_extractor_chain();

        let scan = war::scan_war(&self.config.war, war::DEFAULT_PLUGIN_PATTERN)?;
        if let Some(report) = &self.config.report {
            write_report(report, &scan)?;
        }
        info!(
            core = %scan.core_version,
            "starting plugin tests on core coordinates org.jenkins-ci.main:jenkins-war:{}",
            scan.core_version
        );

        let mut failures = FailureChain::new();
        let plugins = filter_plugins(
            scan.plugins,
            &self.config.include_plugins,
            &self.config.exclude_plugins,
        );

        let mut by_repo: BTreeMap<String, Vec<PluginMetadata>> = BTreeMap::new();
        for plugin in &plugins {
            match self.resolve_metadata(plugin, &scan.core_version, &hooks, &extractors) {
                Ok(Some(metadata)) => match metadata.scm_url.clone() {
                    Some(url) => by_repo.entry(url).or_default().push(metadata),
                    None => self.record(
                        &mut failures,
                        TesterError::sources_unavailable(format!(
                            "{} has no SCM URL after extraction",
                            metadata.plugin_id
                        )),
                    )?,
                },
                Ok(None) => {}
                Err(e) => self.record(&mut failures, e)?,
            }
        }

        let mut groups = Vec::new();
        for (url, group_plugins) in by_repo {
            // all plugins of one reactor are assumed to share the release tag
            let tag = group_plugins[0].git_commit.clone();
            match scm::repo_name_from_url(&url) {
                Ok(name) => groups.push(RepoGroup {
                    checkout_dir: self.config.working_dir.join(name),
                    clone: Some((url, tag)),
                    plugins: group_plugins,
                }),
                Err(e) => self.record(&mut failures, e)?,
            }
        }
        if let Some(local) = self.local_checkout_group()? {
            groups.push(local);
        }

        for group in groups {
            if let Some((url, tag)) = &group.clone {
                if let Err(e) = scm::clone_repository(
                    url,
                    self.config.fallback_github_organization.as_deref(),
                    tag,
                    &group.checkout_dir,
                ) {
                    // one failure for the whole group
                    warn!(url, "skipping {} plugin(s): {e}", group.plugins.len());
                    self.record(&mut failures, e)?;
                    continue;
                }
            }
            for metadata in &group.plugins {
                if let Err(e) =
                    self.test_plugin_against(&scan.core_version, metadata, &group.checkout_dir, &hooks)
                {
                    self.record(&mut failures, e)?;
                }
            }
        }

        failures.into_result()
    }

    fn build_hook_registry(&self) -> HookRegistry {
        let mut builder = HookRegistry::builder().with_builtin();
        for excluded in &self.config.excluded_hooks {
            builder = builder.exclude(excluded);
        }
        builder.build()
    }

    fn build_extractor_chain(&self) -> MetadataExtractorChain {
        let mut builder = MetadataExtractorChain::builder().with_builtin();
        for excluded in &self.config.excluded_hooks {
            builder = builder.exclude(excluded);
        }
        builder.build()
    }

    /// Extracts a plugin's metadata and runs it through the before-checkout
    /// pipeline, which may rewrite the SCM coordinates.
    fn resolve_metadata(
        &self,
        plugin: &BundledPlugin,
        core_version: &str,
        hooks: &HookRegistry,
        extractors: &MetadataExtractorChain,
    ) -> Result<Option<PluginMetadata>, TesterError> {
        let metadata = match extractors.extract(plugin)? {
            Some(metadata) => metadata,
            None => return Ok(None),
        };
        let mut context = BeforeCheckoutContext {
            metadata,
            core_version,
            config: &self.config,
        };
        hooks.run_before_checkout(&mut context)?;
        Ok(Some(context.metadata))
    }

    /// The local checkout, when configured, forms one extra group with no
    /// checkout step and no before-checkout hooks.
    fn local_checkout_group(&self) -> Result<Option<RepoGroup>, TesterError> {
        let dir = match &self.config.local_checkout_dir {
            Some(dir) if dir.is_dir() => dir,
            _ => return Ok(None),
        };
        let metadata = local_checkout_metadata(dir)?;
        info!(plugin = %metadata.plugin_id, dir = %dir.display(), "using local checkout");
        Ok(Some(RepoGroup {
            checkout_dir: dir.clone(),
            clone: None,
            plugins: vec![metadata],
        }))
    }

    fn test_plugin_against(
        &self,
        core_version: &str,
        metadata: &PluginMetadata,
        checkout_dir: &Path,
        hooks: &HookRegistry,
    ) -> Result<(), TesterError> {
        info!(
            plugin = %metadata.plugin_id,
            version = %metadata.version,
            core = core_version,
            "starting to test plugin"
        );

        let log_file = create_build_log_file(
            &self.config.working_dir,
            &metadata.plugin_id,
            &metadata.version,
            core_version,
        )?;

        let mut before_compile = BeforeCompilationContext {
            metadata,
            core_version,
            config: &self.config,
            checkout_dir,
        };
        hooks.run_before_compilation(&mut before_compile)?;

        // First build against the original POM. This defends against source
        // incompatibilities and ensures the artifact under test is as close
        // as possible to what was actually released; javadoc generation is
        // skipped because it commonly fails and is irrelevant here.
        let first_build_props =
            BTreeMap::from([("maven.javadoc.skip".to_string(), "true".to_string())]);
        self.runner.run(
            &first_build_props,
            checkout_dir,
            metadata.module_path.as_deref(),
            &log_file,
            &["clean".to_string(), "process-test-classes".to_string()],
        )?;

        let mut execution = BeforeExecutionContext {
            metadata,
            core_version,
            config: &self.config,
            checkout_dir,
            goals: TEST_GOALS.iter().map(|g| g.to_string()).collect(),
            properties: self.config.maven_properties.clone(),
        };
        hooks.run_before_execution(&mut execution)?;

        let properties = execution_properties(
            execution.properties,
            &self.config.war,
            core_version,
        );
        self.runner.run(
            &properties,
            checkout_dir,
            metadata.module_path.as_deref(),
            &log_file,
            &execution.goals,
        )
    }

    /// Applies the failure policy: fatal errors and fail-fast propagate
    /// immediately, everything else is retained.
    fn record(
        &self,
        failures: &mut FailureChain,
        error: TesterError,
    ) -> Result<(), AggregateFailure> {
        if error.is_fatal() || self.config.fail_fast {
            return Err(error.into());
        }
        warn!("recorded failure: {error}");
        failures.record(error);
        Ok(())
    }
}

/// Drops plugins in the exclude set, then, when an include set is given,
/// everything outside it.
fn filter_plugins(
    plugins: Vec<BundledPlugin>,
    include: &BTreeSet<String>,
    exclude: &BTreeSet<String>,
) -> Vec<BundledPlugin> {
    plugins
        .into_iter()
        .filter(|p| {
            if exclude.contains(&p.plugin_id) {
                info!(plugin = %p.plugin_id, "in excluded plugins; skipping");
                return false;
            }
            if !include.is_empty() && !include.contains(&p.plugin_id) {
                info!(plugin = %p.plugin_id, "not in included plugins; skipping");
                return false;
            }
            true
        })
        .collect()
}

/// The per-plugin build log, recreated empty on every run.
fn create_build_log_file(
    working_dir: &Path,
    plugin_id: &str,
    plugin_version: &str,
    core_version: &str,
) -> Result<PathBuf, TesterError> {
    let path = working_dir.join(build_log_path(plugin_id, plugin_version, core_version));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, b"")?;
    Ok(path)
}

fn build_log_path(plugin_id: &str, plugin_version: &str, core_version: &str) -> PathBuf {
    PathBuf::from(format!(
        "logs/{plugin_id}/v{plugin_version}_against_jenkins_{core_version}.log"
    ))
}

/// Force-injects the properties every test invocation must carry, after the
/// hooks had their turn.
fn execution_properties(
    mut properties: BTreeMap<String, String>,
    war: &Path,
    core_version: &str,
) -> BTreeMap<String, String> {
    properties.insert("overrideWar".to_string(), war.display().to_string());
    properties.insert("jenkins.version".to_string(), core_version.to_string());
    properties.insert("useUpperBounds".to_string(), "true".to_string());
    if VersionNumber::parse(core_version)
        .is_older_than(&VersionNumber::parse(SERVLET_EXCLUDE_THRESHOLD))
    {
        // Cores before 2.382 ship javax.servlet:servlet-api pinned to 0 to
        // keep the library off the classpath; upgrading it to a nonzero
        // version just to satisfy the upper-bounds check is not a realistic
        // test scenario (JENKINS-68696).
        properties.insert(
            "upperBoundsExcludes".to_string(),
            "javax.servlet:servlet-api".to_string(),
        );
    }
    properties
}

/// Reads the plugin metadata of a pre-existing checkout straight from its
/// POM.
fn local_checkout_metadata(dir: &Path) -> Result<PluginMetadata, TesterError> {
    let pom_path = dir.join("pom.xml");
    let pom = fs::read_to_string(&pom_path).map_err(|e| {
        TesterError::sources_unavailable(format!(
            "local checkout has no readable {}: {e}",
            pom_path.display()
        ))
    })?;
    let model = ProjectModel::parse(&pom)?;
    PluginMetadata::builder()
        .plugin_id(&model.artifact_id)
        .name(model.name.as_deref().unwrap_or(&model.artifact_id))
        .version(model.version.as_deref().unwrap_or("unreleased"))
        .git_commit(model.scm_tag.as_deref().unwrap_or("HEAD"))
        .build()
}

fn write_report(path: &Path, scan: &ScanResult) -> Result<(), TesterError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(scan)
        .map_err(|e| TesterError::Structural(format!("cannot serialize scan report: {e}")))?;
    fs::write(path, json)?;
    info!(report = %path.display(), "wrote scan report");
    Ok(())
}
