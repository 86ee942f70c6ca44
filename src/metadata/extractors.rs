//! Built-in metadata extractors.

use super::{MetadataExtractor, PluginMetadata, ProjectModel};
use crate::error::TesterError;
use crate::ordering::HookOrder;
use crate::war::BundledPlugin;
use std::collections::HashMap;

/// Reads the SCM coordinates that recent releases of the HPI packaging
/// plugin record directly in the jar manifest (`Plugin-ScmConnection`,
/// `Plugin-ScmTag`, and `Plugin-Module` for reactor members). Runs first and
/// does not need the embedded POM at all.
pub struct ModernManifestExtractor;

impl HookOrder for ModernManifestExtractor {
    fn order(&self) -> i32 {
        500
    }

    fn id(&self) -> &str {
        "ModernManifestExtractor"
    }
}

impl MetadataExtractor for ModernManifestExtractor {
    fn extract(
        &self,
        plugin: &BundledPlugin,
        _model: Option<&ProjectModel>,
    ) -> Result<Option<PluginMetadata>, TesterError> {
        let manifest = &plugin.descriptor.manifest;
        let (connection, tag) = match (
            manifest.attribute("Plugin-ScmConnection"),
            manifest.attribute("Plugin-ScmTag"),
        ) {
            (Some(connection), Some(tag)) => (connection, tag),
            _ => return Ok(None),
        };
        let url = match connection.strip_prefix("scm:git:") {
            Some(url) => url,
            None => {
                return Err(TesterError::sources_unavailable(format!(
                    "SCM URL {connection} is not supported, only git URLs are allowed"
                )))
            }
        };

        let mut builder = PluginMetadata::builder()
            .plugin_id(&plugin.plugin_id)
            .name(&plugin.name)
            .version(&plugin.version)
            .scm_url(url)
            .git_commit(tag);
        if let Some(module) = manifest.attribute("Plugin-Module") {
            builder = builder.module_path(module);
        }
        builder.build().map(Some)
    }
}

/// Known non-standard multi-module reactors whose module layout cannot be
/// inferred from the POM. This is a data-quality workaround for a fixed
/// handful of projects, not a general mechanism; entries should be deleted
/// as upstream releases start recording module paths in their manifests.
pub struct LegacyMultiModuleExtractor {
    /// group id -> the module path is the plugin id itself
    group_ids_with_id_as_module: Vec<&'static str>,
    /// plugin id -> module path override
    module_overrides: HashMap<&'static str, &'static str>,
}

impl LegacyMultiModuleExtractor {
    pub fn new() -> Self {
        let module_overrides = HashMap::from([
            // https://github.com/jenkinsci/pipeline-model-definition-plugin
            ("pipeline-model-api", "pipeline-model-api"),
            ("pipeline-model-definition", "pipeline-model-definition"),
            ("pipeline-model-extensions", "pipeline-model-extensions"),
            ("pipeline-stage-tags-metadata", "pipeline-stage-tags-metadata"),
            // https://github.com/jenkinsci/declarative-pipeline-migration-assistant-plugin
            (
                "declarative-pipeline-migration-assistant",
                "declarative-pipeline-migration-assistant",
            ),
            (
                "declarative-pipeline-migration-assistant-api",
                "declarative-pipeline-migration-assistant-api",
            ),
            // https://github.com/jenkinsci/pipeline-stage-view-plugin
            ("pipeline-rest-api", "rest-api"),
            ("pipeline-stage-view", "ui"),
            // https://github.com/jenkinsci/swarm-plugin
            ("swarm", "plugin"),
            // https://github.com/jenkinsci/warnings-ng-plugin
            ("warnings-ng", "plugin"),
            // https://github.com/jenkinsci/workflow-cps-plugin
            ("workflow-cps", "plugin"),
        ]);
        Self {
            group_ids_with_id_as_module: vec![
                "io.jenkins.blueocean",
                "io.jenkins.plugins.mina-sshd-api",
            ],
            module_overrides,
        }
    }
}

impl Default for LegacyMultiModuleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HookOrder for LegacyMultiModuleExtractor {
    fn order(&self) -> i32 {
        -500
    }

    fn id(&self) -> &str {
        "LegacyMultiModuleExtractor"
    }
}

impl MetadataExtractor for LegacyMultiModuleExtractor {
    fn extract(
        &self,
        plugin: &BundledPlugin,
        model: Option<&ProjectModel>,
    ) -> Result<Option<PluginMetadata>, TesterError> {
        let model = match model {
            Some(model) => model,
            None => return Ok(None),
        };

        let module_path = self
            .module_overrides
            .get(plugin.plugin_id.as_str())
            .copied()
            .map(String::from)
            .or_else(|| {
                let group_id = model.group_id.as_deref()?;
                self.group_ids_with_id_as_module
                    .contains(&group_id)
                    .then(|| plugin.plugin_id.clone())
            });
        let module_path = match module_path {
            Some(path) => path,
            None => return Ok(None),
        };

        let url = model.git_url()?;
        PluginMetadata::builder()
            .plugin_id(&plugin.plugin_id)
            .name(model.name.as_deref().unwrap_or(&plugin.name))
            .version(&plugin.version)
            .module_path(module_path)
            .scm_url(url)
            .git_commit(model.scm_tag.as_deref().unwrap_or("HEAD"))
            .build()
            .map(Some)
    }
}

/// Fallback for ordinary single-module plugins: everything comes from the
/// embedded POM, the plugin builds at the repository root.
pub struct LegacySingleModuleExtractor;

impl HookOrder for LegacySingleModuleExtractor {
    fn order(&self) -> i32 {
        -1000
    }

    fn id(&self) -> &str {
        "LegacySingleModuleExtractor"
    }
}

impl MetadataExtractor for LegacySingleModuleExtractor {
    fn extract(
        &self,
        plugin: &BundledPlugin,
        model: Option<&ProjectModel>,
    ) -> Result<Option<PluginMetadata>, TesterError> {
        let model = match model {
            Some(model) => model,
            None => return Ok(None),
        };
        let url = model.git_url()?;
        PluginMetadata::builder()
            .plugin_id(&plugin.plugin_id)
            .name(model.name.as_deref().unwrap_or(&plugin.name))
            .version(&plugin.version)
            .scm_url(url)
            .git_commit(model.scm_tag.as_deref().unwrap_or("HEAD"))
            .build()
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::war::manifest::JarManifest;
    use crate::war::PluginDescriptor;

    fn plugin(id: &str, manifest: &str, pom: Option<&str>) -> BundledPlugin {
        BundledPlugin {
            plugin_id: id.into(),
            version: "2.0".into(),
            url: format!("jar:demo.war!/WEB-INF/plugins/{id}.hpi"),
            name: id.into(),
            descriptor: PluginDescriptor {
                manifest: JarManifest::parse(manifest),
                pom: pom.map(String::from),
            },
        }
    }

    fn pom(group_id: &str, artifact_id: &str) -> String {
        format!(
            r#"<project>
  <groupId>{group_id}</groupId>
  <artifactId>{artifact_id}</artifactId>
  <scm>
    <connection>scm:git:https://github.com/jenkinsci/{artifact_id}-plugin.git</connection>
    <tag>{artifact_id}-2.0</tag>
  </scm>
</project>"#
        )
    }

    #[test]
    fn modern_extractor_uses_manifest_scm_attributes() {
        let plugin = plugin(
            "credentials",
            "Plugin-ScmConnection: scm:git:https://github.com/jenkinsci/credentials-plugin.git\r\nPlugin-ScmTag: credentials-2.0\r\n",
            None,
        );
        let metadata = ModernManifestExtractor
            .extract(&plugin, None)
            .unwrap()
            .unwrap();
        assert_eq!(
            metadata.scm_url.as_deref(),
            Some("https://github.com/jenkinsci/credentials-plugin.git")
        );
        assert_eq!(metadata.git_commit, "credentials-2.0");
    }

    #[test]
    fn modern_extractor_skips_plugins_without_scm_attributes() {
        let plugin = plugin("credentials", "Short-Name: credentials\r\n", None);
        assert!(ModernManifestExtractor
            .extract(&plugin, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn modern_extractor_rejects_non_git_connection() {
        let plugin = plugin(
            "credentials",
            "Plugin-ScmConnection: scm:svn:https://svn.example.com/x\r\nPlugin-ScmTag: x-1\r\n",
            None,
        );
        assert!(ModernManifestExtractor.extract(&plugin, None).is_err());
    }

    #[test]
    fn legacy_multimodule_overrides_module_path() {
        let extractor = LegacyMultiModuleExtractor::new();
        let pom = pom("org.jenkins-ci.plugins", "pipeline-stage-view");
        let model = ProjectModel::parse(&pom).unwrap();
        let plugin = plugin("pipeline-stage-view", "", Some(&pom));
        let metadata = extractor.extract(&plugin, Some(&model)).unwrap().unwrap();
        assert_eq!(metadata.module_path.as_deref(), Some("ui"));
    }

    #[test]
    fn legacy_multimodule_maps_known_group_ids() {
        let extractor = LegacyMultiModuleExtractor::new();
        let pom = pom("io.jenkins.blueocean", "blueocean-rest");
        let model = ProjectModel::parse(&pom).unwrap();
        let plugin = plugin("blueocean-rest", "", Some(&pom));
        let metadata = extractor.extract(&plugin, Some(&model)).unwrap().unwrap();
        assert_eq!(metadata.module_path.as_deref(), Some("blueocean-rest"));
    }

    #[test]
    fn legacy_multimodule_passes_on_ordinary_plugins() {
        let extractor = LegacyMultiModuleExtractor::new();
        let pom = pom("org.jenkins-ci.plugins", "mailer");
        let model = ProjectModel::parse(&pom).unwrap();
        let plugin = plugin("mailer", "", Some(&pom));
        assert!(extractor.extract(&plugin, Some(&model)).unwrap().is_none());
    }

    #[test]
    fn single_module_extractor_builds_from_pom() {
        let pom = pom("org.jenkins-ci.plugins", "mailer");
        let model = ProjectModel::parse(&pom).unwrap();
        let plugin = plugin("mailer", "", Some(&pom));
        let metadata = LegacySingleModuleExtractor
            .extract(&plugin, Some(&model))
            .unwrap()
            .unwrap();
        assert_eq!(metadata.module_path, None);
        assert_eq!(metadata.git_commit, "mailer-2.0");
        assert_eq!(metadata.version, "2.0");
    }
}
