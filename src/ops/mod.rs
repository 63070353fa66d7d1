//! Built-in operations
//!
//! Operations the CLI can fan out over a batch of targets.

pub mod exec;
pub mod probe;

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::executor::Args;

pub use exec::{CommandError, CommandReport, CommandTemplate};
pub use probe::{ProbeError, ProbeReport, ProbeTarget};

/// Closed set of operations runnable from the command line
#[derive(Clone, Debug)]
pub enum Operation {
    /// TCP reachability check
    Probe {
        default_port: u16,
        connect_timeout: Duration,
    },
    /// Shell command rendered per input
    Exec(Arc<CommandTemplate>),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Probe { .. } => "probe",
            Operation::Exec(_) => "exec",
        }
    }

    /// Run the operation for one task, returning its report as JSON
    pub async fn call(self, args: Args) -> anyhow::Result<Value> {
        let report = match self {
            Operation::Probe {
                default_port,
                connect_timeout,
            } => serde_json::to_value(probe::probe(args, default_port, connect_timeout).await?)?,
            Operation::Exec(template) => serde_json::to_value(template.run(args).await?)?,
        };
        Ok(report)
    }
}
