use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tests Jenkins plugins for binary compatibility against a core release
#[derive(Parser, Debug)]
#[command(
    name = "pct",
    about = "Builds and tests Jenkins plugins against a given core release",
    version,
    long_about = "pct scans a Jenkins WAR for bundled plugins, checks out each plugin's \
                  sources at the commit that produced its released artifact, and builds \
                  and tests it against the WAR's core version."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Increase verbosity")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the compatibility test cycle",
        long_about = "Scans the WAR, groups plugins by source repository, checks each \
                      repository out once and builds/tests every plugin against the \
                      WAR's core version.\n\n\
                      Examples:\n  \
                      pct test --war jenkins.war\n  \
                      pct test --war jenkins.war --include-plugins mailer,credentials\n  \
                      pct test --war jenkins.war --fail-fast"
    )]
    Test(TestArgs),

    #[command(
        about = "Scan a WAR and print its plugin inventory",
        long_about = "Scans the WAR without building anything and prints the core \
                      version and bundled plugin inventory as JSON."
    )]
    Scan(ScanArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TestArgs {
    #[arg(long, value_name = "FILE", help = "Jenkins WAR under test")]
    pub war: PathBuf,

    #[arg(
        long,
        value_name = "DIR",
        default_value = "work",
        help = "Directory receiving checkouts and build logs"
    )]
    pub working_dir: PathBuf,

    #[arg(
        long,
        value_name = "IDS",
        value_delimiter = ',',
        help = "Only test these plugin ids"
    )]
    pub include_plugins: Vec<String>,

    #[arg(
        long,
        value_name = "IDS",
        value_delimiter = ',',
        help = "Never test these plugin ids"
    )]
    pub exclude_plugins: Vec<String>,

    #[arg(long, help = "Abort on the first failure instead of aggregating")]
    pub fail_fast: bool,

    #[arg(
        long,
        value_name = "ORG",
        help = "GitHub organization to retry clones against when the declared one is gone"
    )]
    pub fallback_github_organization: Option<String>,

    #[arg(
        short = 'D',
        long = "define",
        value_name = "KEY=VALUE",
        help = "Extra Maven property for every test invocation"
    )]
    pub properties: Vec<String>,

    #[arg(
        long,
        value_name = "PATH",
        default_value = "mvn",
        help = "Maven executable to invoke"
    )]
    pub external_maven: PathBuf,

    #[arg(long, value_name = "FILE", help = "Maven settings file")]
    pub maven_settings: Option<PathBuf>,

    #[arg(
        long = "maven-arg",
        value_name = "ARG",
        help = "Extra argument for every Maven invocation"
    )]
    pub maven_args: Vec<String>,

    #[arg(
        long,
        value_name = "IDS",
        value_delimiter = ',',
        help = "Hook/extractor ids to leave unregistered"
    )]
    pub exclude_hooks: Vec<String>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Test this pre-existing checkout instead of cloning it"
    )]
    pub local_checkout_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Write the JSON scan report here")]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[arg(long, value_name = "FILE", help = "Jenkins WAR to scan")]
    pub war: PathBuf,

    #[arg(
        long,
        value_name = "REGEX",
        help = "Override the bundled-plugin entry pattern (matched against the whole entry name)"
    )]
    pub plugin_pattern: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}
