//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bounded parallel task runner with a shared timeout budget
#[derive(Parser, Debug)]
#[command(name = "fanout")]
#[command(author = "hephaex@gmail.com")]
#[command(version)]
#[command(about = "Fan an operation out over many targets with a shared timeout")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check TCP reachability of every target
    Probe(ProbeArgs),

    /// Run a shell command once per target
    Exec(ExecArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Options shared by every batch run
#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Targets; JSON arrays/objects/strings are parsed, anything else is a plain string
    pub targets: Vec<String>,

    /// Add the targets of a named group from the config file
    #[arg(short, long)]
    pub group: Option<String>,

    /// Read additional targets from a YAML or JSON list
    #[arg(long)]
    pub inputs_file: Option<PathBuf>,

    /// Shared timeout for the whole batch in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Maximum concurrent operations
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Argument unpacking (none, positional, keyword)
    #[arg(short, long)]
    pub unpack: Option<String>,

    /// Fail if any target fails or times out
    #[arg(short, long)]
    pub strict: bool,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Name shown in logs and reports
    #[arg(long)]
    pub label: Option<String>,

    /// Disable per-task log events
    #[arg(long)]
    pub no_task_log: bool,
}

/// Arguments for probe command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Port used for targets that name only a host
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Connect timeout per target in milliseconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,
}

/// Arguments for exec command
#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Command template: {} is the target, {0}/{1} positional and {name} keyword arguments
    #[arg(short, long)]
    pub command: String,

    #[command(flatten)]
    pub run: RunArgs,

    /// Shell used to run commands
    #[arg(long)]
    pub shell: Option<String>,
}

/// Arguments for configuration management
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Destination path
        #[arg(long, default_value = "fanout.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Show environment variables
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_probe() {
        let args = Args::parse_from([
            "fanout", "probe", "10.0.0.1", "10.0.0.2:9042", "--workers", "4", "--strict", "-p", "2222",
        ]);
        match args.command {
            Command::Probe(probe) => {
                assert_eq!(probe.run.targets, vec!["10.0.0.1", "10.0.0.2:9042"]);
                assert_eq!(probe.run.workers, Some(4));
                assert!(probe.run.strict);
                assert_eq!(probe.port, Some(2222));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_exec() {
        let args = Args::parse_from([
            "fanout",
            "exec",
            "-c",
            "ssh {0}@{1} uptime",
            "--unpack",
            "positional",
            r#"["centos","10.0.0.5"]"#,
            "-v",
        ]);
        assert!(args.verbose);
        match args.command {
            Command::Exec(exec) => {
                assert_eq!(exec.command, "ssh {0}@{1} uptime");
                assert_eq!(exec.run.unpack.as_deref(), Some("positional"));
                assert_eq!(exec.run.targets.len(), 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
