//! Shell command fan-out
//!
//! Renders a command template per task input and runs it through the shell.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::executor::Args;

/// Environment variable carrying the raw task input as JSON
pub const INPUT_ENV: &str = "FANOUT_INPUT";

/// Command errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unclosed placeholder in template: {0}")]
    UnclosedPlaceholder(String),

    #[error("Unmatched '}}' in template: {0}")]
    UnmatchedBrace(String),

    #[error("No value for placeholder {{{0}}}")]
    MissingValue(String),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {}: {}", .code.map_or("signal".to_string(), |c| c.to_string()), .stderr.trim())]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Text(String),
    Whole,
    Index(usize),
    Name(String),
}

/// Parsed command template
///
/// `{}` is the whole input, `{0}`, `{1}` are positional arguments and
/// `{name}` keyword arguments. `{{` and `}}` are literal braces.
#[derive(Clone, Debug)]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
    shell: String,
}

impl CommandTemplate {
    pub fn parse(template: &str) -> Result<Self, CommandError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => {
                                return Err(CommandError::UnclosedPlaceholder(
                                    template.to_string(),
                                ))
                            }
                        }
                    }
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    let name = name.trim();
                    segments.push(if name.is_empty() {
                        Segment::Whole
                    } else if let Ok(index) = name.parse() {
                        Segment::Index(index)
                    } else {
                        Segment::Name(name.to_string())
                    });
                }
                '}' => return Err(CommandError::UnmatchedBrace(template.to_string())),
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
            shell: "sh".to_string(),
        })
    }

    /// Shell used to run rendered commands (invoked as `<shell> -c <command>`)
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute `args` into the template
    pub fn render(&self, args: &Args) -> Result<String, CommandError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Whole => out.push_str(&whole(args)),
                Segment::Index(index) => {
                    let value = match args {
                        Args::Positional(items) => items.get(*index),
                        Args::Single(value) if *index == 0 => Some(value),
                        _ => None,
                    }
                    .ok_or_else(|| CommandError::MissingValue(index.to_string()))?;
                    out.push_str(&plain(value));
                }
                Segment::Name(name) => {
                    let value = match args {
                        Args::Keyword(map) => map.get(name),
                        Args::Single(Value::Object(map)) => map.get(name),
                        _ => None,
                    }
                    .ok_or_else(|| CommandError::MissingValue(name.clone()))?;
                    out.push_str(&plain(value));
                }
            }
        }
        Ok(out)
    }

    /// Render and run the command for one task
    pub async fn run(&self, args: Args) -> Result<CommandReport, CommandError> {
        let command = self.render(&args)?;
        debug!("Running: {}", command);

        let start = Instant::now();
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&command)
            .env(INPUT_ENV, input_json(&args))
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(CommandError::Failed {
                command,
                code: output.status.code(),
                stderr,
            });
        }

        Ok(CommandReport {
            command,
            exit_code: output.status.code().unwrap_or_default(),
            stdout,
            stderr,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Output of a successful command
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandReport {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Strings render without JSON quotes
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn whole(args: &Args) -> String {
    match args {
        Args::Single(value) => plain(value),
        Args::Positional(items) => items.iter().map(plain).collect::<Vec<_>>().join(" "),
        Args::Keyword(map) => Value::Object(map.clone()).to_string(),
    }
}

fn input_json(args: &Args) -> String {
    match args {
        Args::Single(value) => value.to_string(),
        Args::Positional(items) => Value::Array(items.clone()).to_string(),
        Args::Keyword(map) => Value::Object(map.clone()).to_string(),
    }
}
