//! Local cart: an append-only list of committed configurations kept in a
//! single named record as a JSON array.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use shared::protocol::DraftRecord;
use thiserror::Error;
use tracing::{info, warn};

use crate::RecordStore;

/// Persisted cart payload that cannot be read as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPersistedState {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("payload is a JSON {0}, expected an array")]
    NotAnArray(&'static str),
}

#[derive(Clone)]
pub struct DraftStore {
    records: Arc<dyn RecordStore>,
    record_name: String,
}

impl DraftStore {
    pub fn new(records: Arc<dyn RecordStore>, record_name: impl Into<String>) -> Self {
        Self {
            records,
            record_name: record_name.into(),
        }
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    /// Returns every committed draft in commit order.
    ///
    /// A missing, empty or malformed payload reads as an empty cart. Entries
    /// that do not decode as a draft are skipped. Only failures of the
    /// underlying record store are returned as errors.
    pub async fn read_all(&self) -> Result<Vec<DraftRecord>> {
        let entries = self.read_entries().await?;
        let mut drafts = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<DraftRecord>(entry) {
                Ok(draft) => drafts.push(draft),
                Err(err) => warn!(
                    record = %self.record_name,
                    index,
                    error = %err,
                    "skipping undecodable draft entry"
                ),
            }
        }
        Ok(drafts)
    }

    /// Appends one draft and writes the whole sequence back. Returns the
    /// number of entries now stored.
    ///
    /// Entries this release cannot decode are written back untouched.
    pub async fn append(&self, draft: &DraftRecord) -> Result<usize> {
        let mut entries = self.read_entries().await?;
        entries.push(serde_json::to_value(draft).context("failed to encode draft record")?);

        let payload =
            serde_json::to_string(&entries).context("failed to encode draft sequence")?;
        self.records
            .save_record(&self.record_name, &payload)
            .await?;

        info!(
            record = %self.record_name,
            item = %draft.item_name,
            quantity = %draft.quantity,
            total = %draft.total_price,
            entries = entries.len(),
            "draft appended"
        );
        Ok(entries.len())
    }

    /// Number of entries in the stored array, including undecodable ones.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.read_entries().await?.len())
    }

    pub async fn clear(&self) -> Result<bool> {
        let removed = self.records.delete_record(&self.record_name).await?;
        if removed {
            info!(record = %self.record_name, "drafts cleared");
        }
        Ok(removed)
    }

    async fn read_entries(&self) -> Result<Vec<Value>> {
        let Some(payload) = self.records.load_record(&self.record_name).await? else {
            return Ok(Vec::new());
        };

        match parse_entries(&payload) {
            Ok(entries) => Ok(entries),
            Err(anomaly) => {
                warn!(
                    record = %self.record_name,
                    error = %anomaly,
                    "persisted drafts are unreadable; treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }
}

pub(crate) fn parse_entries(payload: &str) -> Result<Vec<Value>, MalformedPersistedState> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(entries)) => Ok(entries),
        Ok(other) => Err(MalformedPersistedState::NotAnArray(json_kind(&other))),
        Err(err) => Err(MalformedPersistedState::InvalidJson(err.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "tests/drafts_tests.rs"]
mod tests;
