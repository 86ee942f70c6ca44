//! WAR scanning: core version detection and bundled plugin inventory.
//!
//! A single sequential pass over the archive finds the core jar (exactly one
//! must exist) and every bundled plugin matching the caller-supplied entry
//! pattern. Each plugin's nested archive is opened in memory to read its
//! manifest and its embedded POM, which together form the project descriptor
//! consumed by the metadata extraction chain.

pub mod manifest;

use crate::error::TesterError;
use manifest::JarManifest;
use regex::Regex;
use serde::Serialize;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};
use zip::ZipArchive;

/// Entry name pattern of the core jar inside the WAR.
pub const CORE_FILE_PATTERN: &str = r"^WEB-INF/lib/jenkins-core-([0-9.]+(?:-[0-9a-f.]+)*(?:-(?i:[a-z]+)-?[0-9a-f.]*)?(?:-(?i:[a-z]+)-?[0-9a-f_.]*)?(?:-SNAPSHOT)?)\.jar$";

/// Default entry pattern for bundled plugins. Callers may vary this to
/// target a different class of bundled plugin (e.g. detached plugins).
pub const DEFAULT_PLUGIN_PATTERN: &str = r"^WEB-INF/plugins/([^/.]+)\.[hj]pi$";

/// One bundled plugin found in the WAR.
#[derive(Debug, Clone, Serialize)]
pub struct BundledPlugin {
    pub plugin_id: String,
    pub version: String,
    pub url: String,
    pub name: String,
    #[serde(skip)]
    pub descriptor: PluginDescriptor,
}

/// The project descriptor extracted from a plugin's nested archive: its jar
/// manifest and, when present, the POM that built it.
#[derive(Debug, Clone, Default)]
pub struct PluginDescriptor {
    pub manifest: JarManifest,
    pub pom: Option<String>,
}

/// Outcome of scanning one WAR.
#[derive(Debug, Serialize)]
pub struct ScanResult {
    pub core_version: String,
    pub plugins: Vec<BundledPlugin>,
}

/// Truncates everything after a `-SNAPSHOT` token, keeping the marker
/// itself. Idempotent; returns the input unchanged when no extra build
/// qualifier follows.
pub fn normalize_version(version: &str) -> String {
    match version.find("-SNAPSHOT") {
        Some(index) => version[..index + "-SNAPSHOT".len()].to_string(),
        None => version.to_string(),
    }
}

/// Scans the WAR, returning the core version and the plugin inventory.
pub fn scan_war(war: &Path, plugin_pattern: &str) -> Result<ScanResult, TesterError> {
    let core_regex = Regex::new(CORE_FILE_PATTERN)
        .map_err(|e| TesterError::Structural(format!("invalid core pattern: {e}")))?;
    // patterns match the whole entry name, anchored or not
    let plugin_regex = Regex::new(&format!("^(?:{plugin_pattern})$"))
        .map_err(|e| TesterError::Structural(format!("invalid plugin pattern: {e}")))?;

    let file = File::open(war)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| TesterError::Structural(format!("cannot open {}: {e}", war.display())))?;

    let mut core_version: Option<String> = None;
    let mut plugins = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| {
            TesterError::Structural(format!("cannot read entry {index} of {}: {e}", war.display()))
        })?;
        let entry_name = entry.name().to_string();

        if let Some(captures) = core_regex.captures(&entry_name) {
            if core_version.is_some() {
                return Err(TesterError::Structural(format!(
                    ">1 jenkins-core.jar in {}",
                    war.display()
                )));
            }
            core_version = Some(captures[1].to_string());
            continue;
        }

        if let Some(captures) = plugin_regex.captures(&entry_name) {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).map_err(|e| {
                TesterError::Structural(format!("cannot read {entry_name}: {e}"))
            })?;
            let descriptor = read_descriptor(&entry_name, &bytes)?;

            let fallback_id = captures.get(1).map(|m| m.as_str()).unwrap_or(&entry_name);
            let plugin_id = descriptor
                .manifest
                .attribute("Short-Name")
                .or_else(|| descriptor.manifest.attribute("Extension-Name"))
                .unwrap_or(fallback_id)
                .to_string();
            let version = descriptor.manifest.attribute("Plugin-Version").ok_or_else(|| {
                TesterError::Structural(format!("{entry_name} has no Plugin-Version"))
            })?;
            let name = descriptor
                .manifest
                .attribute("Long-Name")
                .unwrap_or(&plugin_id)
                .to_string();

            debug!(plugin = %plugin_id, version = %version, "found bundled plugin");
            plugins.push(BundledPlugin {
                plugin_id,
                version: normalize_version(version),
                url: format!("jar:{}!/{}", war.display(), entry_name),
                name,
                descriptor,
            });
        }
    }

    let core_version = core_version.ok_or_else(|| {
        TesterError::Structural(format!("no jenkins-core.jar in {}", war.display()))
    })?;
    info!(
        war = %war.display(),
        core = %core_version,
        plugins = plugins.len(),
        "scanned WAR contents"
    );
    Ok(ScanResult {
        core_version,
        plugins,
    })
}

/// Opens the nested plugin archive and pulls out its manifest and embedded
/// POM.
fn read_descriptor(entry_name: &str, bytes: &[u8]) -> Result<PluginDescriptor, TesterError> {
    let mut inner = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| TesterError::Structural(format!("{entry_name} is not a jar: {e}")))?;

    let manifest = {
        let mut raw = String::new();
        inner
            .by_name("META-INF/MANIFEST.MF")
            .map_err(|e| TesterError::Structural(format!("{entry_name} has no manifest: {e}")))?
            .read_to_string(&mut raw)
            .map_err(|e| {
                TesterError::Structural(format!("unreadable manifest in {entry_name}: {e}"))
            })?;
        JarManifest::parse(&raw)
    };

    let pom_entry = (0..inner.len()).find_map(|i| {
        let name = inner.name_for_index(i)?;
        (name.starts_with("META-INF/maven/") && name.ends_with("/pom.xml"))
            .then(|| name.to_string())
    });
    let pom = match pom_entry {
        Some(name) => {
            let mut raw = String::new();
            inner
                .by_name(&name)
                .map_err(|e| TesterError::Structural(format!("cannot open {name}: {e}")))?
                .read_to_string(&mut raw)
                .map_err(|e| TesterError::Structural(format!("unreadable {name}: {e}")))?;
            Some(raw)
        }
        None => None,
    };

    Ok(PluginDescriptor { manifest, pom })
}
