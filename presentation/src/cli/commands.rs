//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for aggregated responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Per-handler results, conflicts and oversight
    Full,
    /// Only the synthesized summary
    Summary,
    /// JSON output
    Json,
}

/// CLI arguments for delegate
#[derive(Parser, Debug)]
#[command(name = "delegate")]
#[command(author, version, about = "Delegation router - route a request to specialist handlers")]
#[command(long_about = r#"
Delegate routes a free-form request to one or more specialist handlers,
runs them according to their dependencies, and merges the results.

The pipeline has four steps:
1. Classify: score every registered handler against the request
2. Plan: pick an orchestration pattern and order handlers into stages
3. Dispatch: run each stage concurrently, stages strictly in order
4. Aggregate: merge results into one response with an overall status

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./delegate.toml     Project-level config
3. ~/.config/delegate/config.toml   Global config

Example:
  delegate "Provision the VPC with terraform and deploy the helm chart"
  delegate -d containers "Roll out the new release"
  delegate --plan-only "Review the terraform module"
"#)]
pub struct Cli {
    /// The request to route (not required with --list-handlers or --show-config)
    pub request: Option<String>,

    /// Explicit domain hints (can be specified multiple times)
    #[arg(short, long, value_name = "DOMAIN")]
    pub domain: Vec<String>,

    /// Output format (overrides the config file)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Per-handler timeout in seconds (overrides the config file)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Print the execution plan without dispatching
    #[arg(long)]
    pub plan_only: bool,

    /// List registered handlers and exit
    #[arg(long)]
    pub list_handlers: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_with_domains() {
        let cli = Cli::try_parse_from([
            "delegate",
            "-d",
            "containers",
            "--domain",
            "infrastructure",
            "-o",
            "json",
            "--timeout",
            "5",
            "deploy it",
        ])
        .unwrap();

        assert_eq!(cli.request.as_deref(), Some("deploy it"));
        assert_eq!(cli.domain, vec!["containers", "infrastructure"]);
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert_eq!(cli.timeout, Some(5));
        assert!(!cli.plan_only);
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["delegate", "-vv", "-q", "--list-handlers"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.quiet);
        assert!(cli.list_handlers);
        assert!(cli.request.is_none());
        assert!(cli.output.is_none());
    }
}
