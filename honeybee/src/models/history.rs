//! History models

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use honeybee_api::HistoryEntryResponse;

/// On-disk body of a history file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Artifact kind label, e.g. `Dockerfile`
    #[serde(rename = "type")]
    pub kind: String,

    /// `[target, [misconfiguration, ...]]`
    pub input_parameters: (String, Vec<String>),

    /// Generated files or raw template text
    pub output: serde_json::Value,
}

/// A stored generation transaction
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Decimal seconds since the epoch, also the file stem
    pub key: String,
    pub timestamp: f64,
    pub record: HistoryRecord,
}

impl HistoryEntry {
    pub fn kind(&self) -> &str {
        &self.record.kind
    }

    pub fn target(&self) -> &str {
        &self.record.input_parameters.0
    }

    pub fn misconfigurations(&self) -> &[String] {
        &self.record.input_parameters.1
    }

    /// Local time of the entry
    pub fn local_time(&self) -> Option<DateTime<Local>> {
        let secs = self.timestamp.floor();
        let nanos = ((self.timestamp - secs) * 1e9).round().min(999_999_999.0) as u32;
        Local.timestamp_opt(secs as i64, nanos).single()
    }

    /// `<type> | <target> (<m1, m2>) - <ctime>`, the text history search runs on
    pub fn label(&self) -> String {
        let ctime = self
            .local_time()
            .map(|time| time.format("%a %b %e %H:%M:%S %Y").to_string())
            .unwrap_or_else(|| self.key.clone());

        if self.target().is_empty() {
            return format!("{} - {}", self.kind(), ctime);
        }

        let misconfigs = if self.misconfigurations().is_empty() {
            String::new()
        } else {
            format!(" ({})", self.misconfigurations().join(", "))
        };
        format!("{} | {}{} - {}", self.kind(), self.target(), misconfigs, ctime)
    }
}

impl From<&HistoryEntry> for HistoryEntryResponse {
    fn from(entry: &HistoryEntry) -> Self {
        HistoryEntryResponse {
            timestamp: entry.key.clone(),
            kind: entry.record.kind.clone(),
            label: entry.label(),
            input_parameters: entry.record.input_parameters.clone(),
            output: entry.record.output.clone(),
        }
    }
}
