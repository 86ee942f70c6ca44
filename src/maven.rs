//! External Maven invocation.
//!
//! The build tool is an external collaborator: the tester only needs "run
//! this goal list with these properties against this working directory,
//! capture output to this log file, fail on a non-zero exit".

use crate::error::TesterError;
use crate::process::run_captured;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Abstraction over the build-tool invocation, so the orchestrator can be
/// exercised without a Maven installation.
pub trait BuildRunner {
    fn run(
        &self,
        properties: &BTreeMap<String, String>,
        working_dir: &Path,
        module_path: Option<&str>,
        log_file: &Path,
        goals: &[String],
    ) -> Result<(), TesterError>;
}

/// Runs a real `mvn` binary.
pub struct ExternalMavenRunner {
    executable: PathBuf,
    settings: Option<PathBuf>,
    args: Vec<String>,
}

impl ExternalMavenRunner {
    pub fn new(executable: PathBuf, settings: Option<PathBuf>, args: Vec<String>) -> Self {
        Self {
            executable,
            settings,
            args,
        }
    }
}

impl Default for ExternalMavenRunner {
    fn default() -> Self {
        Self::new(PathBuf::from("mvn"), None, Vec::new())
    }
}

impl BuildRunner for ExternalMavenRunner {
    fn run(
        &self,
        properties: &BTreeMap<String, String>,
        working_dir: &Path,
        module_path: Option<&str>,
        log_file: &Path,
        goals: &[String],
    ) -> Result<(), TesterError> {
        let mut command = Command::new(&self.executable);
        command.current_dir(working_dir);
        command.args(["-B", "-ntp"]);
        if let Some(settings) = &self.settings {
            command.arg("-s").arg(settings);
        }
        command.args(&self.args);
        for (key, value) in properties {
            command.arg(format!("-D{key}={value}"));
        }
        if let Some(module) = module_path {
            command.args(["-pl", module]);
        }
        command.args(goals);

        info!(
            goals = ?goals,
            dir = %working_dir.display(),
            log = %log_file.display(),
            "running maven"
        );
        let output = run_captured(&mut command)?;
        fs::write(log_file, &output.output)?;
        debug!(status = output.status, "maven finished");

        if !output.success() {
            return Err(TesterError::Execution {
                message: format!(
                    "maven goals {goals:?} failed with exit status {}",
                    output.status
                ),
                log: log_file.to_path_buf(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(executable: &str) -> ExternalMavenRunner {
        ExternalMavenRunner::new(PathBuf::from(executable), None, Vec::new())
    }

    #[test]
    fn successful_run_writes_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("build.log");
        runner("true")
            .run(
                &BTreeMap::new(),
                dir.path(),
                None,
                &log,
                &["clean".into(), "verify".into()],
            )
            .unwrap();
        assert!(log.is_file());
    }

    #[test]
    fn non_zero_exit_is_an_execution_failure_carrying_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("build.log");
        let err = runner("false")
            .run(&BTreeMap::new(), dir.path(), None, &log, &["verify".into()])
            .unwrap_err();
        match err {
            TesterError::Execution { log: reported, .. } => assert_eq!(reported, log),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn renders_settings_args_properties_and_module_in_order() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let shim = dir.path().join("mvn-echo");
        fs::write(&shim, "#!/bin/sh\necho \"$@\"\n").unwrap();
        let mut perms = fs::metadata(&shim).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&shim, perms).unwrap();

        let settings = dir.path().join("settings.xml");
        fs::write(&settings, "<settings/>").unwrap();
        let log = dir.path().join("build.log");
        let properties = BTreeMap::from([
            ("jenkins.version".to_string(), "2.401.3".to_string()),
            ("useUpperBounds".to_string(), "true".to_string()),
        ]);

        ExternalMavenRunner::new(
            shim,
            Some(settings.clone()),
            vec!["--offline".to_string()],
        )
        .run(
            &properties,
            dir.path(),
            Some("plugin"),
            &log,
            &["clean".into(), "verify".into()],
        )
        .unwrap();

        let rendered = fs::read_to_string(&log).unwrap();
        assert_eq!(
            rendered.trim(),
            format!(
                "-B -ntp -s {} --offline -Djenkins.version=2.401.3 -DuseUpperBounds=true -pl plugin clean verify",
                settings.display()
            )
        );
    }

    #[test]
    fn missing_executable_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("build.log");
        let err = runner("definitely-not-maven-xyz")
            .run(&BTreeMap::new(), dir.path(), None, &log, &["verify".into()])
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
