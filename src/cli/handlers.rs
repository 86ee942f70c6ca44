//! Subcommand handlers mapping results to process exit codes.

use super::commands::{ScanArgs, TestArgs};
use crate::config::{parse_property, TesterConfig};
use crate::tester::PluginCompatTester;
use crate::war;
use std::fs;
use tracing::{error, info};

pub fn handle_test(args: &TestArgs) -> i32 {
    let config = match config_from_args(args) {
        Ok(config) => config,
        Err(message) => {
            error!("{message}");
            return 2;
        }
    };
    info!("{config}");

    match PluginCompatTester::new(config).test_plugins() {
        Ok(()) => {
            info!("all plugins passed");
            0
        }
        Err(failure) => {
            error!(
                "{} failure(s) while testing plugins: {}",
                failure.failure_count(),
                failure.head
            );
            for (i, cause) in failure.suppressed.iter().enumerate() {
                error!("  suppressed[{i}]: {cause}");
            }
            1
        }
    }
}

pub fn handle_scan(args: &ScanArgs) -> i32 {
    let pattern = args
        .plugin_pattern
        .as_deref()
        .unwrap_or(war::DEFAULT_PLUGIN_PATTERN);
    let scan = match war::scan_war(&args.war, pattern) {
        Ok(scan) => scan,
        Err(e) => {
            error!("scan failed: {e}");
            return 1;
        }
    };
    let json = match serde_json::to_string_pretty(&scan) {
        Ok(json) => json,
        Err(e) => {
            error!("cannot serialize scan result: {e}");
            return 1;
        }
    };
    match &args.output {
        Some(path) => {
            if let Err(e) = fs::write(path, json) {
                error!("cannot write {}: {e}", path.display());
                return 1;
            }
        }
        None => println!("{json}"),
    }
    0
}

fn config_from_args(args: &TestArgs) -> Result<TesterConfig, String> {
    let mut maven_properties = std::collections::BTreeMap::new();
    for raw in &args.properties {
        let (key, value) = parse_property(raw).map_err(|e| e.to_string())?;
        maven_properties.insert(key, value);
    }

    let config = TesterConfig {
        war: args.war.clone(),
        working_dir: args.working_dir.clone(),
        include_plugins: args.include_plugins.iter().cloned().collect(),
        exclude_plugins: args.exclude_plugins.iter().cloned().collect(),
        fail_fast: args.fail_fast,
        fallback_github_organization: args.fallback_github_organization.clone(),
        maven_properties,
        external_maven: args.external_maven.clone(),
        maven_settings: args.maven_settings.clone(),
        maven_args: args.maven_args.clone(),
        excluded_hooks: args.exclude_hooks.clone(),
        local_checkout_dir: args.local_checkout_dir.clone(),
        report: args.report.clone(),
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
