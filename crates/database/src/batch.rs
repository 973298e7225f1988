//! Batches: the unit of transmission from a source to one target.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use ddldiff::Action;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    WaitingTransmission,
    Transmitting,
    WaitingApply,
    Applied,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::WaitingTransmission => "waiting_transmission",
            BatchStatus::Transmitting => "transmitting",
            BatchStatus::WaitingApply => "waiting_apply",
            BatchStatus::Applied => "applied",
        }
    }
}

impl FromStr for BatchStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "waiting_transmission" => Ok(BatchStatus::WaitingTransmission),
            "transmitting" => Ok(BatchStatus::Transmitting),
            "waiting_apply" => Ok(BatchStatus::WaitingApply),
            "applied" => Ok(BatchStatus::Applied),
            other => Err(Error::InvalidBatchStatus(other.to_string())),
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `teleport.batch`. Member events are linked through
/// `teleport.batch_events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Assigned on insert
    pub id: Option<i64>,
    pub status: BatchStatus,
    /// Name of the source database
    pub source: String,
    /// Name of the target the batch is destined for
    pub target: String,
    /// JSON array of tagged actions
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Batch {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            status: BatchStatus::WaitingTransmission,
            source: source.into(),
            target: target.into(),
            data: None,
            created_at: None,
        }
    }

    pub fn set_actions(&mut self, actions: &[Action]) -> Result<()> {
        self.data = Some(serde_json::to_string(actions)?);
        Ok(())
    }

    /// Actions stored in the batch; empty when no data was set.
    pub fn actions(&self) -> Result<Vec<Action>> {
        match &self.data {
            Some(data) => Ok(serde_json::from_str(data)?),
            None => Ok(Vec::new()),
        }
    }
}
