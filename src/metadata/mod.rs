//! Plugin metadata: the buildable-unit description derived from a plugin's
//! project descriptor.
//!
//! Extraction is a chain of independently pluggable strategies ordered by
//! the hook ordering policy; the first one that produces a value wins. A
//! plugin for which no extractor produces a value is excluded from testing.

pub mod extractors;

use crate::error::TesterError;
use crate::ordering::{compare_order, HookOrder};
use crate::war::BundledPlugin;
use tracing::{debug, info};

/// Immutable description of one buildable plugin.
///
/// Built incrementally by the extraction chain and the before-checkout hook
/// pipeline; treated as complete once handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    pub plugin_id: String,
    pub name: String,
    pub version: String,
    /// Sub-module path within the repository, for multi-module reactors.
    pub module_path: Option<String>,
    /// Git URL of the plugin sources. `None` only for local checkouts.
    pub scm_url: Option<String>,
    /// Tag or commit hash that produced the released artifact.
    pub git_commit: String,
}

impl PluginMetadata {
    pub fn builder() -> PluginMetadataBuilder {
        PluginMetadataBuilder::default()
    }

    /// Rebuilds this metadata with a different SCM URL. Used by
    /// before-checkout hooks that redirect known-moved repositories.
    pub fn with_scm_url(mut self, scm_url: impl Into<String>) -> Self {
        self.scm_url = Some(scm_url.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct PluginMetadataBuilder {
    plugin_id: Option<String>,
    name: Option<String>,
    version: Option<String>,
    module_path: Option<String>,
    scm_url: Option<String>,
    git_commit: Option<String>,
}

impl PluginMetadataBuilder {
    pub fn plugin_id(mut self, value: impl Into<String>) -> Self {
        self.plugin_id = Some(value.into());
        self
    }

    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = Some(value.into());
        self
    }

    pub fn version(mut self, value: impl Into<String>) -> Self {
        self.version = Some(value.into());
        self
    }

    pub fn module_path(mut self, value: impl Into<String>) -> Self {
        self.module_path = Some(value.into());
        self
    }

    pub fn scm_url(mut self, value: impl Into<String>) -> Self {
        self.scm_url = Some(value.into());
        self
    }

    pub fn git_commit(mut self, value: impl Into<String>) -> Self {
        self.git_commit = Some(value.into());
        self
    }

    pub fn build(self) -> Result<PluginMetadata, TesterError> {
        let plugin_id = self
            .plugin_id
            .ok_or_else(|| TesterError::Structural("plugin metadata without id".into()))?;
        Ok(PluginMetadata {
            name: self.name.unwrap_or_else(|| plugin_id.clone()),
            version: self
                .version
                .ok_or_else(|| TesterError::Structural(format!("{plugin_id} has no version")))?,
            module_path: self.module_path,
            scm_url: self.scm_url,
            git_commit: self.git_commit.unwrap_or_else(|| "HEAD".to_string()),
            plugin_id,
        })
    }
}

/// Relevant parts of a plugin's POM.
#[derive(Debug, Clone, Default)]
pub struct ProjectModel {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub name: Option<String>,
    pub packaging: Option<String>,
    pub scm_connection: Option<String>,
    pub scm_tag: Option<String>,
    pub modules: Vec<String>,
}

impl ProjectModel {
    /// Parses the POM, resolving the group id through `<parent>` when the
    /// project does not declare its own.
    pub fn parse(pom: &str) -> Result<Self, TesterError> {
        let doc = roxmltree::Document::parse(pom)
            .map_err(|e| TesterError::Structural(format!("unparseable POM: {e}")))?;
        let project = doc.root_element();

        let direct_child = |parent: roxmltree::Node, tag: &str| -> Option<String> {
            parent
                .children()
                .find(|n| n.has_tag_name(tag))
                .and_then(|n| n.text())
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        };

        let artifact_id = direct_child(project, "artifactId")
            .ok_or_else(|| TesterError::Structural("POM without artifactId".into()))?;
        let parent = project.children().find(|n| n.has_tag_name("parent"));
        let group_id = direct_child(project, "groupId")
            .or_else(|| parent.and_then(|p| direct_child(p, "groupId")));
        let version = direct_child(project, "version")
            .or_else(|| parent.and_then(|p| direct_child(p, "version")));

        let scm = project.children().find(|n| n.has_tag_name("scm"));
        let scm_connection = scm.and_then(|scm| direct_child(scm, "connection"));
        let scm_tag = scm.and_then(|scm| direct_child(scm, "tag"));

        let modules = project
            .children()
            .find(|n| n.has_tag_name("modules"))
            .map(|modules| {
                modules
                    .children()
                    .filter(|n| n.has_tag_name("module"))
                    .filter_map(|n| n.text())
                    .map(|t| t.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            group_id,
            version,
            name: direct_child(project, "name"),
            packaging: direct_child(project, "packaging"),
            scm_connection,
            scm_tag,
            modules,
            artifact_id,
        })
    }

    /// The declared git URL, with the `scm:git:` transport prefix stripped.
    /// Any other transport is unsupported.
    pub fn git_url(&self) -> Result<String, TesterError> {
        let connection = self.scm_connection.as_deref().ok_or_else(|| {
            TesterError::sources_unavailable(format!("{} declares no SCM connection", self.artifact_id))
        })?;
        match connection.strip_prefix("scm:git:") {
            Some(url) => Ok(url.to_string()),
            None => Err(TesterError::sources_unavailable(format!(
                "SCM URL {connection} is not supported, only git URLs are allowed"
            ))),
        }
    }
}

/// A pluggable strategy deriving [`PluginMetadata`] from a project
/// descriptor.
pub trait MetadataExtractor: HookOrder + Send + Sync {
    /// Returns `Ok(None)` when this extractor does not apply to the plugin;
    /// the chain then consults the next one.
    fn extract(
        &self,
        plugin: &BundledPlugin,
        model: Option<&ProjectModel>,
    ) -> Result<Option<PluginMetadata>, TesterError>;
}

/// Ordered extraction chain, frozen after construction.
pub struct MetadataExtractorChain {
    extractors: Vec<Box<dyn MetadataExtractor>>,
}

impl MetadataExtractorChain {
    pub fn builder() -> MetadataExtractorChainBuilder {
        MetadataExtractorChainBuilder::default()
    }

    /// Runs the chain for one plugin. The first extractor producing a value
    /// wins; `Ok(None)` means the plugin is excluded from testing.
    pub fn extract(&self, plugin: &BundledPlugin) -> Result<Option<PluginMetadata>, TesterError> {
        let model = match &plugin.descriptor.pom {
            Some(pom) => Some(ProjectModel::parse(pom)?),
            None => None,
        };
        for extractor in &self.extractors {
            if let Some(metadata) = extractor.extract(plugin, model.as_ref())? {
                debug!(
                    plugin = %plugin.plugin_id,
                    extractor = extractor.id(),
                    "extracted plugin metadata"
                );
                return Ok(Some(metadata));
            }
        }
        info!(
            plugin = %plugin.plugin_id,
            "no metadata extractor applies; excluding from testing"
        );
        Ok(None)
    }

    #[cfg(test)]
    pub(crate) fn extractor_ids(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.id()).collect()
    }
}

/// Builds the chain: each extension location contributes a registration
/// step, exclusion filtering runs before the chain is frozen.
#[derive(Default)]
pub struct MetadataExtractorChainBuilder {
    extractors: Vec<Box<dyn MetadataExtractor>>,
    excluded: Vec<String>,
}

impl MetadataExtractorChainBuilder {
    /// Registers the extractors shipped with the tester.
    pub fn with_builtin(mut self) -> Self {
        self.extractors
            .push(Box::new(extractors::ModernManifestExtractor));
        self.extractors
            .push(Box::new(extractors::LegacyMultiModuleExtractor::new()));
        self.extractors
            .push(Box::new(extractors::LegacySingleModuleExtractor));
        self
    }

    pub fn register(mut self, extractor: Box<dyn MetadataExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn exclude(mut self, id: impl Into<String>) -> Self {
        self.excluded.push(id.into());
        self
    }

    pub fn build(self) -> MetadataExtractorChain {
        let excluded = self.excluded;
        let mut extractors: Vec<Box<dyn MetadataExtractor>> = self
            .extractors
            .into_iter()
            .filter(|e| !excluded.iter().any(|x| x == e.id()))
            .collect();
        extractors.sort_by(|a, b| compare_order(a.order(), a.id(), b.order(), b.id()));
        MetadataExtractorChain { extractors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::war::manifest::JarManifest;
    use crate::war::PluginDescriptor;

    fn plugin(manifest: &str, pom: Option<&str>) -> BundledPlugin {
        BundledPlugin {
            plugin_id: "demo".into(),
            version: "1.0".into(),
            url: "jar:demo.war!/WEB-INF/plugins/demo.hpi".into(),
            name: "Demo".into(),
            descriptor: PluginDescriptor {
                manifest: JarManifest::parse(manifest),
                pom: pom.map(String::from),
            },
        }
    }

    const DEMO_POM: &str = r#"<?xml version="1.0"?>
<project>
  <parent><groupId>org.jenkins-ci.plugins</groupId></parent>
  <artifactId>demo</artifactId>
  <name>Demo Plugin</name>
  <packaging>hpi</packaging>
  <scm>
    <connection>scm:git:https://github.com/jenkinsci/demo-plugin.git</connection>
    <tag>demo-1.0</tag>
  </scm>
</project>"#;

    #[test]
    fn parses_pom_model() {
        let model = ProjectModel::parse(DEMO_POM).unwrap();
        assert_eq!(model.artifact_id, "demo");
        assert_eq!(model.group_id.as_deref(), Some("org.jenkins-ci.plugins"));
        assert_eq!(model.name.as_deref(), Some("Demo Plugin"));
        assert_eq!(
            model.git_url().unwrap(),
            "https://github.com/jenkinsci/demo-plugin.git"
        );
        assert_eq!(model.scm_tag.as_deref(), Some("demo-1.0"));
    }

    #[test]
    fn non_git_scm_is_sources_unavailable() {
        let model = ProjectModel::parse(
            r#"<project>
  <artifactId>demo</artifactId>
  <scm><connection>scm:svn:https://svn.example.com/demo</connection></scm>
</project>"#,
        )
        .unwrap();
        let err = model.git_url().unwrap_err();
        assert!(matches!(err, TesterError::SourcesUnavailable { .. }));
    }

    #[test]
    fn chain_is_sorted_by_order_and_first_result_wins() {
        let chain = MetadataExtractorChain::builder().with_builtin().build();
        assert_eq!(
            chain.extractor_ids(),
            vec![
                "ModernManifestExtractor",
                "LegacyMultiModuleExtractor",
                "LegacySingleModuleExtractor",
            ]
        );

        let metadata = chain
            .extract(&plugin("Short-Name: demo\r\n", Some(DEMO_POM)))
            .unwrap()
            .unwrap();
        assert_eq!(metadata.plugin_id, "demo");
        assert_eq!(
            metadata.scm_url.as_deref(),
            Some("https://github.com/jenkinsci/demo-plugin.git")
        );
        assert_eq!(metadata.git_commit, "demo-1.0");
        assert_eq!(metadata.module_path, None);
    }

    #[test]
    fn plugin_without_descriptor_is_excluded() {
        let chain = MetadataExtractorChain::builder().with_builtin().build();
        let result = chain.extract(&plugin("Short-Name: demo\r\n", None)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn excluded_extractor_is_not_consulted() {
        let chain = MetadataExtractorChain::builder()
            .with_builtin()
            .exclude("LegacySingleModuleExtractor")
            .build();
        assert_eq!(
            chain.extractor_ids(),
            vec!["ModernManifestExtractor", "LegacyMultiModuleExtractor"]
        );
    }

    #[test]
    fn builder_requires_id_and_version() {
        assert!(PluginMetadata::builder().build().is_err());
        assert!(PluginMetadata::builder().plugin_id("x").build().is_err());
        let metadata = PluginMetadata::builder()
            .plugin_id("x")
            .version("1.0")
            .build()
            .unwrap();
        assert_eq!(metadata.name, "x");
        assert_eq!(metadata.git_commit, "HEAD");
    }
}
