//! History filtering

use chrono::NaiveDate;

use honeybee_api::{ArtifactKind, HistoryParams};

use crate::errors::HoneybeeError;
use crate::models::history::HistoryEntry;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Filter over history entries; every unset field matches everything
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Kind labels to keep
    pub kinds: Vec<String>,
    /// Inclusive local date range
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring of the entry label
    pub search: Option<String>,
}

impl HistoryQuery {
    pub fn new(
        kinds: Vec<String>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        search: Option<String>,
    ) -> Self {
        // A reversed range means the same days
        let (from, to) = match (from, to) {
            (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
            range => range,
        };
        let kinds = kinds
            .iter()
            .map(|kind| canonical_kind(kind))
            .filter(|kind| !kind.is_empty())
            .collect();
        let search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        Self {
            kinds,
            from,
            to,
            search,
        }
    }

    pub fn from_params(params: &HistoryParams) -> Result<Self, HoneybeeError> {
        let kinds = params
            .kinds
            .as_deref()
            .map(|kinds| kinds.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self::new(
            kinds,
            parse_date(params.from.as_deref())?,
            parse_date(params.to.as_deref())?,
            params.q.clone(),
        ))
    }

    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        if !self.kinds.is_empty() && !self.kinds.iter().any(|kind| kind == entry.kind()) {
            return false;
        }

        if self.from.is_some() || self.to.is_some() {
            let Some(date) = entry.local_time().map(|time| time.date_naive()) else {
                return false;
            };
            if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
                return false;
            }
        }

        match &self.search {
            Some(search) => entry.label().to_lowercase().contains(search),
            None => true,
        }
    }

    /// Matching entries, newest first
    pub fn apply(&self, entries: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
        let mut matching: Vec<HistoryEntry> =
            entries.into_iter().filter(|entry| self.matches(entry)).collect();
        matching.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));
        matching
    }
}

fn canonical_kind(kind: &str) -> String {
    match ArtifactKind::from_label(kind) {
        Some(kind) => kind.label().to_string(),
        None => kind.trim().to_string(),
    }
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, HoneybeeError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Some)
            .map_err(|e| HoneybeeError::InvalidRequest(format!("Invalid date {:?}: {}", raw, e))),
        None => Ok(None),
    }
}
