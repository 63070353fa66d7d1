//! fanout - bounded parallel task runner
//!
//! Fans an operation out over many targets (regions, builders, hosts) with a
//! capped number of concurrent workers and one shared timeout budget.
//!
//! ## Usage
//!
//! ```bash
//! # Check which builders accept SSH connections
//! fanout probe builder-1 builder-2 10.0.0.7:2222 --timeout 20
//!
//! # Run a command per region, at most 8 at a time
//! fanout exec -c "aws ec2 describe-instances --region {}" --group aws-regions -w 8
//!
//! # Spread structured targets into the command
//! fanout exec -c "ssh {user}@{host} uptime" --unpack keyword '{"user":"centos","host":"10.0.0.5"}'
//!
//! # Write an example configuration
//! fanout config init
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::Value;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod cli;

use cli::{Args, Command, ConfigAction, RunArgs};
use fanout::config::{print_env_help, ConfigFile, EnvConfig, TargetGroup};
use fanout::executor::{aggregate, ParallelExecutor, RunConfig, RunSummary, UnpackMode};
use fanout::ops::{CommandTemplate, Operation};
use fanout::output::{OutputFormat, ResultFormatter, RunReport};
use fanout::utils::{init_logger, LogLevel, Timer};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_config = EnvConfig::load();
    let config_path = args
        .config
        .clone()
        .or_else(|| env_config.config_file.as_ref().map(PathBuf::from));
    let mut config_file = ConfigFile::load_or_default(config_path.as_deref())?;
    env_config.apply_to(&mut config_file.app);

    let level = LogLevel::from_str(&config_file.app.log_level).unwrap_or(LogLevel::Info);
    init_logger(if args.verbose { level.verbose() } else { level });

    match args.command {
        Command::Probe(probe_args) => {
            let operation = Operation::Probe {
                default_port: probe_args.port.unwrap_or(config_file.app.default_port),
                connect_timeout: probe_args
                    .connect_timeout
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| config_file.app.connect_timeout()),
            };
            run_operation(operation, &probe_args.run, &config_file).await?;
        }
        Command::Exec(exec_args) => {
            let shell = exec_args
                .shell
                .clone()
                .unwrap_or_else(|| config_file.app.shell.clone());
            let template = CommandTemplate::parse(&exec_args.command)?.with_shell(shell);
            run_operation(Operation::Exec(Arc::new(template)), &exec_args.run, &config_file)
                .await?;
        }
        Command::Config(config_args) => {
            manage_config(config_args.action, config_path, &config_file, &env_config)?;
        }
    }

    Ok(())
}

async fn run_operation(operation: Operation, run: &RunArgs, config_file: &ConfigFile) -> Result<()> {
    let app = &config_file.app;

    let group = match run.group.as_deref() {
        Some(name) => Some(
            config_file
                .group(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown target group: {name}"))?,
        ),
        None => None,
    };

    let inputs = collect_inputs(run, group)?;
    if inputs.is_empty() {
        anyhow::bail!("No targets given");
    }

    let unpack = match run.unpack.as_deref() {
        Some(s) => UnpackMode::from_str(s)
            .ok_or_else(|| anyhow::anyhow!("Unknown unpack mode: {s}"))?,
        None => group.and_then(|g| g.unpack).unwrap_or(app.unpack),
    };

    let format_name = run.format.as_deref().unwrap_or(&app.format);
    let format = OutputFormat::from_str(format_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {format_name}"))?;

    let label = run
        .label
        .clone()
        .unwrap_or_else(|| operation.name().to_string());
    let timeout = Duration::from_secs(run.timeout.unwrap_or(app.timeout_secs));

    let mut run_config = RunConfig::new(inputs, timeout)
        .with_unpack_mode(unpack)
        .with_label(&label);
    if let Some(workers) = run.workers.or(app.max_workers) {
        run_config = run_config.with_max_workers(workers);
    }
    if run.no_task_log {
        run_config = run_config.without_logging();
    }

    info!(
        "Running {} on {} target(s) (timeout {}s, unpack {})",
        label,
        run_config.inputs().len(),
        timeout.as_secs(),
        unpack
    );

    let executor = ParallelExecutor::new(run_config);
    let started_at = Utc::now();
    let timer = Timer::start(&label);

    let outcomes = executor
        .run_all(move |args| operation.clone().call(args))
        .await;

    let summary = RunSummary::from_outcomes(&label, &outcomes, timer.stop(), started_at);
    let report = RunReport::new(summary, &outcomes);

    let mut formatter = ResultFormatter::new(format);
    if !std::io::stdout().is_terminal() {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format_report(&report)?);

    if run.strict {
        if let Err(err) = aggregate(outcomes) {
            if err.is_timeout() {
                warn!("{} did not finish within {}s", label, timeout.as_secs());
            }
            return Err(err.into());
        }
    }

    Ok(())
}

/// Targets from the group, then the inputs file, then the command line
fn collect_inputs(run: &RunArgs, group: Option<&TargetGroup>) -> Result<Vec<Value>> {
    let mut inputs = Vec::new();

    if let Some(group) = group {
        inputs.extend(group.targets.iter().cloned());
    }
    if let Some(path) = &run.inputs_file {
        inputs.extend(load_inputs_file(path)?);
    }
    inputs.extend(run.targets.iter().map(|t| parse_target(t)));

    Ok(inputs)
}

fn load_inputs_file(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read inputs file: {}", path.display()))?;
    // YAML is a superset of JSON
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse inputs file: {}", path.display()))
}

/// Structured JSON targets are parsed, everything else stays a string
fn parse_target(raw: &str) -> Value {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') || trimmed.starts_with('"') {
        if let Ok(value) = serde_json::from_str(raw) {
            return value;
        }
    }
    Value::String(raw.to_string())
}

fn manage_config(
    action: ConfigAction,
    config_path: Option<PathBuf>,
    config_file: &ConfigFile,
    env_config: &EnvConfig,
) -> Result<()> {
    match action {
        ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            ConfigFile::example().save(&path)?;
            println!("✓ Wrote example configuration to {}", path.display());
        }
        ConfigAction::Show => {
            let source = config_path
                .or_else(ConfigFile::find)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "defaults".to_string());
            println!("# source: {source}");
            print!(
                "{}",
                serde_yaml::to_string(config_file).context("Failed to serialize config")?
            );
        }
        ConfigAction::Env => {
            print_env_help();
            println!();
            env_config.print_summary();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("10.0.0.1:22"), json!("10.0.0.1:22"));
        assert_eq!(parse_target(r#"["a", 1]"#), json!(["a", 1]));
        assert_eq!(parse_target(r#"{"host": "h"}"#), json!({"host": "h"}));
        assert_eq!(parse_target("[broken"), json!("[broken"));
        assert_eq!(parse_target("42"), json!("42"));
    }

    #[test]
    fn test_collect_inputs_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- from-file\n- [a, 1]").unwrap();

        let run = RunArgs {
            targets: vec!["from-cli".to_string()],
            inputs_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let group = TargetGroup::new("g", ["from-group"]);

        let inputs = collect_inputs(&run, Some(&group)).unwrap();
        assert_eq!(
            inputs,
            vec![
                json!("from-group"),
                json!("from-file"),
                json!(["a", 1]),
                json!("from-cli")
            ]
        );
    }
}
