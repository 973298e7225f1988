//! Change events recorded by the source database triggers.
//!
//! Every DDL command and every row change on a watched table inserts one row
//! into `teleport.event`. The batcher later groups events that are still
//! `waiting_batch` into per-target batches.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use ddldiff::{Action, DdlChange};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A DDL command; data holds the `{pre, post}` catalog snapshots
    Ddl,
    /// A row change on a watched table
    Dml,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ddl => "ddl",
            EventKind::Dml => "dml",
        }
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ddl" => Ok(EventKind::Ddl),
            "dml" => Ok(EventKind::Dml),
            other => Err(Error::InvalidEventKind(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an event. Events are inserted as `WaitingBatch` and move to
/// `Batched` when a batch containing them commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    WaitingBatch,
    Building,
    Batched,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::WaitingBatch => "waiting_batch",
            EventStatus::Building => "building",
            EventStatus::Batched => "batched",
        }
    }
}

impl FromStr for EventStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "waiting_batch" => Ok(EventStatus::WaitingBatch),
            "building" => Ok(EventStatus::Building),
            "batched" => Ok(EventStatus::Batched),
            other => Err(Error::InvalidEventStatus(other.to_string())),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `teleport.event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub kind: EventKind,
    pub status: EventStatus,
    /// Command tag (`CREATE TABLE`) or `schema.table` for row changes
    pub trigger_tag: String,
    /// `ddl_command_end`, or `INSERT`/`UPDATE`/`DELETE` for row changes
    pub trigger_event: String,
    pub transaction_id: String,
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new(
        id: i64,
        kind: EventKind,
        trigger_tag: impl Into<String>,
        trigger_event: impl Into<String>,
        transaction_id: impl Into<String>,
        data: Option<String>,
    ) -> Self {
        Self {
            id,
            kind,
            status: EventStatus::WaitingBatch,
            trigger_tag: trigger_tag.into(),
            trigger_event: trigger_event.into(),
            transaction_id: transaction_id.into(),
            data,
            created_at: None,
        }
    }

    /// Parse the `id,kind,trigger_tag,trigger_event,transaction_id,data`
    /// notification format. Everything after the fifth comma is data.
    pub fn from_csv(line: &str) -> Result<Self> {
        let mut fields = line.splitn(6, ',');
        let mut next = |name: &str| {
            fields
                .next()
                .ok_or_else(|| Error::MalformedEvent(format!("missing {name} in {line:?}")))
        };

        let id = next("id")?;
        let kind = next("kind")?;
        let trigger_tag = next("trigger_tag")?;
        let trigger_event = next("trigger_event")?;
        let transaction_id = next("transaction_id")?;
        let data = next("data")?;

        let id = id
            .trim()
            .parse()
            .map_err(|_| Error::MalformedEvent(format!("invalid id {id:?}")))?;

        Ok(Self::new(
            id,
            kind.trim().parse()?,
            trigger_tag,
            trigger_event,
            transaction_id,
            Some(data.to_string()),
        ))
    }

    fn data(&self) -> Result<&str> {
        self.data
            .as_deref()
            .ok_or(Error::MissingData { event_id: self.id })
    }

    /// Store a single action as the event payload.
    pub fn set_data_from_action(&mut self, action: &Action) -> Result<()> {
        self.data = Some(serde_json::to_string(action)?);
        Ok(())
    }

    /// Decode a payload written by [`Event::set_data_from_action`].
    pub fn action_from_data(&self) -> Result<Action> {
        Ok(serde_json::from_str(self.data()?)?)
    }

    /// Decode the `{pre, post}` snapshot pair of a DDL event.
    pub fn ddl_change(&self) -> Result<DdlChange> {
        Ok(DdlChange::parse(self.data()?)?)
    }
}
