//! Query history store
//!
//! One JSON file per generation, named after the decimal timestamp of the
//! transaction. Entries are written once and never updated or deleted.

use std::io::ErrorKind;
use std::path::Path;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::errors::HoneybeeError;
use crate::filesys::dir::Dir;
use crate::models::history::{HistoryEntry, HistoryRecord};

const MAX_KEY_BUMPS: u32 = 1000;
const MICROS_PER_SEC: u32 = 1_000_000;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: Dir,
}

impl HistoryStore {
    pub fn new(dir: Dir) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Dir {
        &self.dir
    }

    /// Append one entry and return its key.
    ///
    /// Keys are `<seconds>.<microseconds>`. When the key is already taken it is
    /// moved forward one microsecond at a time.
    pub async fn record(
        &self,
        kind: &str,
        input_parameters: (String, Vec<String>),
        output: serde_json::Value,
    ) -> Result<String, HoneybeeError> {
        let record = HistoryRecord {
            kind: kind.to_string(),
            input_parameters,
            output,
        };
        let contents = serde_json::to_string(&record)?;

        let now = Utc::now();
        let mut secs = now.timestamp();
        let mut micros = now.timestamp_subsec_micros().min(MICROS_PER_SEC - 1);

        for _ in 0..MAX_KEY_BUMPS {
            let key = format!("{}.{:06}", secs, micros);
            let file = self.dir.file(&format!("{}.json", key));
            match file.write_new(&contents).await {
                Ok(()) => {
                    info!("Recorded {} history entry {}", kind, key);
                    return Ok(key);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("History key {} taken, bumping", key);
                    micros += 1;
                    if micros == MICROS_PER_SEC {
                        micros = 0;
                        secs += 1;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(HoneybeeError::Internal(format!(
            "No free history key after {} attempts",
            MAX_KEY_BUMPS
        )))
    }

    /// Every readable entry, in no particular order.
    ///
    /// Files that are not history records are skipped.
    pub async fn list(&self) -> Result<Vec<HistoryEntry>, HoneybeeError> {
        if !self.dir.exists().await {
            return Ok(Vec::new());
        }

        let paths = self.dir.list_files().await?;
        let results = join_all(paths.iter().map(|path| read_entry(path))).await;

        let mut entries = Vec::with_capacity(paths.len());
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!("Skipping history file {}: {}", path.display(), e),
            }
        }
        Ok(entries)
    }
}

async fn read_entry(path: &Path) -> Result<Option<HistoryEntry>, HoneybeeError> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        return Ok(None);
    }
    let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
        return Ok(None);
    };
    let Ok(timestamp) = key.parse::<f64>() else {
        debug!("Ignoring {}: not a timestamp", path.display());
        return Ok(None);
    };

    let record = crate::filesys::file::File::new(path)
        .read_json::<HistoryRecord>()
        .await?;
    Ok(Some(HistoryEntry {
        key: key.to_string(),
        timestamp,
        record,
    }))
}
