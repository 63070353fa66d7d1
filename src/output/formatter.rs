//! Output formatters for run results
//!
//! Provides JSON, Table, CSV and summary output formats.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::executor::{RunSummary, TaskOutcome};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Resolution of one task as shown to operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Ok,
    Failed,
    Timeout,
}

impl OutcomeStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "✓",
            OutcomeStatus::Failed => "✗",
            OutcomeStatus::Timeout => "⏱",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Ok => write!(f, "OK"),
            OutcomeStatus::Failed => write!(f, "FAILED"),
            OutcomeStatus::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

/// Owned, serializable view of a task outcome
#[derive(Clone, Debug, Serialize)]
pub struct OutcomeRecord {
    pub index: usize,
    pub input: Value,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutcomeRecord {
    pub fn from_outcome<T: Serialize>(outcome: &TaskOutcome<'_, T>) -> Self {
        let (status, value, error) = match &outcome.result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(value) => (OutcomeStatus::Ok, Some(value), None),
                Err(e) => (
                    OutcomeStatus::Failed,
                    None,
                    Some(format!("failed to serialize result: {e}")),
                ),
            },
            Err(e) if e.is_timeout() => (OutcomeStatus::Timeout, None, Some(e.to_string())),
            Err(e) => (OutcomeStatus::Failed, None, Some(e.to_string())),
        };

        Self {
            index: outcome.index,
            input: outcome.input.clone(),
            status,
            value,
            error,
        }
    }
}

/// Everything printed for one run
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub outcomes: Vec<OutcomeRecord>,
}

impl RunReport {
    pub fn new<T: Serialize>(summary: RunSummary, outcomes: &[TaskOutcome<'_, T>]) -> Self {
        Self {
            summary,
            outcomes: outcomes.iter().map(OutcomeRecord::from_outcome).collect(),
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a whole run
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.format_table(report)),
            OutputFormat::Json => serde_json::to_string(report).context("Failed to serialize report"),
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(report).context("Failed to serialize report")
            }
            OutputFormat::Csv => self.format_csv(report),
            OutputFormat::Summary => Ok(self.format_summary(&report.summary)),
        }
    }

    /// Format a single outcome line
    pub fn format_record(&self, record: &OutcomeRecord) -> String {
        let status = format!("{} {}", record.status.symbol(), record.status);
        let status = if self.colorize {
            match record.status {
                OutcomeStatus::Ok => format!("\x1b[32m{status:9}\x1b[0m"),
                OutcomeStatus::Failed => format!("\x1b[31m{status:9}\x1b[0m"),
                OutcomeStatus::Timeout => format!("\x1b[33m{status:9}\x1b[0m"),
            }
        } else {
            format!("{status:9}")
        };

        let detail = match (&record.value, &record.error) {
            (_, Some(error)) => error.clone(),
            (Some(value), None) => compact(value),
            (None, None) => String::new(),
        };

        format!(
            "{:3}. {:28} {} {}",
            record.index,
            truncate(&compact(&record.input), 28),
            status,
            truncate(&detail, 60)
        )
    }

    fn format_table(&self, report: &RunReport) -> String {
        let mut output = String::new();
        let summary = &report.summary;

        output.push_str(&format!("\n── {} ", summary.label));
        output.push_str(&"─".repeat(60usize.saturating_sub(summary.label.len())));
        output.push('\n');

        for record in &report.outcomes {
            output.push_str(&self.format_record(record));
            output.push('\n');
        }

        output.push_str(&"─".repeat(64));
        output.push('\n');
        output.push_str(&self.format_summary(summary));
        output.push('\n');
        output
    }

    fn format_csv(&self, report: &RunReport) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["index", "input", "status", "value", "error"])?;

        for record in &report.outcomes {
            writer.write_record([
                record.index.to_string(),
                compact(&record.input),
                record.status.to_string(),
                record.value.as_ref().map(compact).unwrap_or_default(),
                record.error.clone().unwrap_or_default(),
            ])?;
        }

        let bytes = writer.into_inner().context("Failed to flush CSV output")?;
        String::from_utf8(bytes).context("CSV output is not UTF-8")
    }

    fn format_summary(&self, summary: &RunSummary) -> String {
        format!(
            "{}: {}/{} ok, {} failed, {} timed out ({:.1}%) in {}ms",
            summary.label,
            summary.succeeded,
            summary.total,
            summary.failed,
            summary.timed_out,
            summary.success_rate(),
            summary.duration_ms
        )
    }
}

/// Strings print bare, everything else as compact JSON
fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    let line = s.lines().next().unwrap_or("");
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TaskError;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;

    fn sample_report() -> RunReport {
        let inputs = [json!("us-east-1"), json!("eu-west-1"), json!("ap-south-1")];
        let outcomes = vec![
            TaskOutcome {
                index: 0,
                input: &inputs[0],
                result: Ok(json!(12)),
            },
            TaskOutcome {
                index: 1,
                input: &inputs[1],
                result: Err(TaskError::Failed(anyhow::anyhow!("AccessDenied"))),
            },
            TaskOutcome {
                index: 2,
                input: &inputs[2],
                result: Err(TaskError::Timeout {
                    waited: Duration::from_secs(6),
                }),
            },
        ];
        let summary =
            RunSummary::from_outcomes("list-instances", &outcomes, Duration::from_secs(6), Utc::now());
        RunReport::new(summary, &outcomes)
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("JSON-PRETTY"), Some(OutputFormat::JsonPretty));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }

    #[test]
    fn test_records_keep_status() {
        let report = sample_report();
        let statuses: Vec<_> = report.outcomes.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![OutcomeStatus::Ok, OutcomeStatus::Failed, OutcomeStatus::Timeout]
        );
        assert_eq!(report.outcomes[0].value, Some(json!(12)));
        assert_eq!(report.outcomes[1].error.as_deref(), Some("AccessDenied"));
    }

    #[test]
    fn test_json_output() {
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let out = formatter.format_report(&sample_report()).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["summary"]["total"], json!(3));
        assert_eq!(parsed["outcomes"][2]["status"], json!("timeout"));
        assert!(parsed["outcomes"][0].get("error").is_none());
    }

    #[test]
    fn test_csv_output() {
        let formatter = ResultFormatter::new(OutputFormat::Csv);
        let out = formatter.format_report(&sample_report()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "index,input,status,value,error");
        assert_eq!(lines[1], "0,us-east-1,OK,12,");
        assert_eq!(lines[2], "1,eu-west-1,FAILED,,AccessDenied");
    }

    #[test]
    fn test_table_and_summary_output() {
        let report = sample_report();

        let table = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_report(&report)
            .unwrap();
        assert!(table.contains("list-instances"));
        assert!(table.contains("✗ FAILED"));
        assert!(table.contains("AccessDenied"));

        let summary = ResultFormatter::new(OutputFormat::Summary)
            .format_report(&report)
            .unwrap();
        assert!(summary.starts_with("list-instances: 1/3 ok, 1 failed, 1 timed out"));
    }

    #[test]
    fn test_unserializable_value_is_reported_as_failure() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let input = json!("eu-north-1");
        let value: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let outcome = TaskOutcome {
            index: 0,
            input: &input,
            result: Ok(value),
        };

        let record = OutcomeRecord::from_outcome(&outcome);
        assert_eq!(record.status, OutcomeStatus::Failed);
        assert!(record.value.is_none());
        assert!(record
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("failed to serialize result")));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("first\nsecond", 20), "first");
    }
}
