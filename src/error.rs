//! Error taxonomy for the compatibility tester.
//!
//! Four domain failures can occur while testing a plugin: its sources cannot
//! be resolved, the external Maven invocation fails, the WAR under test is
//! structurally broken, or a hook rejects a phase. Plain I/O errors are kept
//! separate because they indicate environment corruption and are always
//! fatal, regardless of the fail-fast setting.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A failure produced while testing plugins against a core release.
#[derive(Debug, Error)]
pub enum TesterError {
    /// The plugin sources could not be checked out: every candidate URL was
    /// exhausted, or the declared SCM is not a git URL. Earlier attempts are
    /// retained as suppressed causes, most recent first.
    #[error("plugin sources unavailable: {message}")]
    SourcesUnavailable {
        message: String,
        suppressed: Vec<TesterError>,
    },

    /// The external build tool exited non-zero. The build log holds the
    /// full output.
    #[error("build execution failed: {message} (log: {log})")]
    Execution { message: String, log: PathBuf },

    /// The WAR under test is malformed: missing or duplicate core jar, or an
    /// unreadable bundled plugin.
    #[error("structural error: {0}")]
    Structural(String),

    /// A hook aborted its phase for the current plugin.
    #[error("hook {hook} failed: {message}")]
    Hook { hook: String, message: String },

    /// Environment-level I/O failure. Never swallowed by the fail-fast
    /// policy.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TesterError {
    pub fn sources_unavailable(message: impl Into<String>) -> Self {
        TesterError::SourcesUnavailable {
            message: message.into(),
            suppressed: Vec::new(),
        }
    }

    /// True when the failure signals environment corruption rather than a
    /// plugin-specific problem.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TesterError::Io(_))
    }

    /// Folds an earlier failure into this one as a suppressed cause,
    /// flattening its own suppressed chain behind it. Variants that cannot
    /// carry causes are rewrapped as sources-unavailable so no failure is
    /// ever dropped.
    pub fn suppress(self, earlier: TesterError) -> TesterError {
        let (message, mut suppressed) = match self {
            TesterError::SourcesUnavailable {
                message,
                suppressed,
            } => (message, suppressed),
            other => (other.to_string(), Vec::new()),
        };
        match earlier {
            TesterError::SourcesUnavailable {
                message: earlier_message,
                suppressed: earlier_suppressed,
            } => {
                suppressed.push(TesterError::sources_unavailable(earlier_message));
                suppressed.extend(earlier_suppressed);
            }
            other => suppressed.push(other),
        }
        TesterError::SourcesUnavailable {
            message,
            suppressed,
        }
    }
}

/// Accumulates failures across a non-fail-fast run.
///
/// Mirrors suppressed-exception chaining: each recorded failure becomes the
/// new head and the previous head (with its own suppressed causes) is folded
/// in behind it, so the final error reports every failure in reverse
/// discovery order.
#[derive(Debug, Default)]
pub struct FailureChain {
    head: Option<TesterError>,
    suppressed: Vec<TesterError>,
}

impl FailureChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Records a failure, making it the most recent cause.
    pub fn record(&mut self, error: TesterError) {
        if let Some(prev) = self.head.take() {
            self.suppressed.insert(0, prev);
        }
        self.head = Some(error);
    }

    /// Consumes the chain, raising exactly one error that carries every
    /// other recorded failure as a suppressed cause. Returns `Ok(())` when
    /// nothing was recorded.
    pub fn into_result(self) -> Result<(), AggregateFailure> {
        match self.head {
            None => Ok(()),
            Some(head) => Err(AggregateFailure {
                head,
                suppressed: self.suppressed,
            }),
        }
    }
}

/// The single error raised at the end of a non-fail-fast run.
#[derive(Debug)]
pub struct AggregateFailure {
    pub head: TesterError,
    pub suppressed: Vec<TesterError>,
}

impl AggregateFailure {
    /// Total number of failures, head included.
    pub fn failure_count(&self) -> usize {
        1 + self.suppressed.len()
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for (i, cause) in self.suppressed.iter().enumerate() {
            write!(f, "\n  suppressed[{}]: {}", i, cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFailure {}

impl From<TesterError> for AggregateFailure {
    fn from(head: TesterError) -> Self {
        Self {
            head,
            suppressed: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_is_ok() {
        let chain = FailureChain::new();
        assert!(chain.is_empty());
        assert!(chain.into_result().is_ok());
    }

    #[test]
    fn single_failure_has_no_suppressed_causes() {
        let mut chain = FailureChain::new();
        chain.record(TesterError::Structural("no core jar".into()));
        let err = chain.into_result().unwrap_err();
        assert_eq!(err.failure_count(), 1);
        assert!(err.suppressed.is_empty());
    }

    #[test]
    fn failures_are_chained_most_recent_first() {
        let mut chain = FailureChain::new();
        chain.record(TesterError::sources_unavailable("clone of repo-a failed"));
        chain.record(TesterError::Execution {
            message: "mvn exited 1".into(),
            log: PathBuf::from("logs/plugin-b/build.log"),
        });
        chain.record(TesterError::sources_unavailable("clone of repo-c failed"));

        let err = chain.into_result().unwrap_err();
        assert_eq!(err.failure_count(), 3);
        assert!(matches!(err.head, TesterError::SourcesUnavailable { .. }));
        assert!(matches!(err.suppressed[0], TesterError::Execution { .. }));
        assert!(matches!(
            err.suppressed[1],
            TesterError::SourcesUnavailable { .. }
        ));
    }

    #[test]
    fn suppress_flattens_the_earlier_chain_most_recent_first() {
        let earlier = TesterError::sources_unavailable("candidate one failed")
            .suppress(TesterError::sources_unavailable("zeroth attempt"));
        let folded = TesterError::sources_unavailable("candidate two failed").suppress(earlier);
        match folded {
            TesterError::SourcesUnavailable {
                message,
                suppressed,
            } => {
                assert_eq!(message, "candidate two failed");
                assert_eq!(suppressed.len(), 2);
                assert!(suppressed[0].to_string().contains("candidate one failed"));
                assert!(suppressed[1].to_string().contains("zeroth attempt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn suppress_rewraps_heads_that_cannot_carry_causes() {
        let folded = TesterError::Structural("bad archive".into())
            .suppress(TesterError::sources_unavailable("earlier failure"));
        match folded {
            TesterError::SourcesUnavailable {
                message,
                suppressed,
            } => {
                assert!(message.contains("bad archive"));
                assert_eq!(suppressed.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn io_errors_are_fatal() {
        let err = TesterError::from(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk on fire",
        ));
        assert!(err.is_fatal());
        assert!(!TesterError::Structural("x".into()).is_fatal());
    }

    #[test]
    fn aggregate_display_lists_suppressed() {
        let mut chain = FailureChain::new();
        chain.record(TesterError::Structural("first".into()));
        chain.record(TesterError::Structural("second".into()));
        let rendered = chain.into_result().unwrap_err().to_string();
        assert!(rendered.contains("second"));
        assert!(rendered.contains("suppressed[0]: structural error: first"));
    }
}
