//! plugin-compat-tester - builds and tests Jenkins plugins against a core
//! release
//!
//! The tester verifies that independently released plugins remain binary
//! compatible with a given Jenkins core: it scans the core distribution WAR
//! for bundled plugins, checks out each plugin's sources at the exact commit
//! that produced its released artifact, and builds and tests it against that
//! core version with Maven.
//!
//! # Core Concepts
//!
//! - **Scanning**: one pass over the WAR derives the core version and the
//!   bundled plugin inventory ([`war`])
//! - **Extraction**: an ordered chain of pluggable strategies derives each
//!   plugin's buildable-unit description from its project descriptor
//!   ([`metadata`])
//! - **Hooks**: predicate-gated extension points around the checkout,
//!   compilation and execution steps work around known per-plugin
//!   irregularities ([`hooks`])
//! - **Orchestration**: plugins are grouped by source repository, each
//!   repository is checked out once, and failures are aggregated or abort
//!   the run depending on the fail-fast policy ([`tester`])

pub mod cli;
pub mod config;
pub mod error;
pub mod hooks;
pub mod maven;
pub mod metadata;
pub mod ordering;
pub mod process;
pub mod scm;
pub mod tester;
pub mod versions;
pub mod war;

pub use config::{ConfigError, TesterConfig};
pub use error::{AggregateFailure, FailureChain, TesterError};
pub use hooks::{HookRegistry, HookRegistryBuilder};
pub use metadata::{MetadataExtractorChain, PluginMetadata};
pub use tester::PluginCompatTester;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
