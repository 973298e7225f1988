//! Groups waiting events into per-target batches.
//!
//! Each pass reads every `waiting_batch` event, turns DDL events into
//! actions by reconciling their `pre` and `post` catalog snapshots, and
//! commits one batch per configured target holding the actions that target
//! replicates. The batches of a pass are committed together, so a failure
//! leaves every event waiting for the next pass. Events whose payload
//! cannot be reconciled stay `waiting_batch` for inspection and do not
//! block the others.

use anyhow::Context;
use ddldiff::{Action, TargetExpression};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use teleport_database::{Batch, Event, EventKind, EventStatus, EventStore};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

/// Resolves to the shutdown signal once Ctrl+C is received.
pub fn setup_shutdown_handler() -> broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");

        info!("Received interrupt signal (Ctrl+C)");
        let _ = shutdown_tx.send(());
    });

    shutdown_rx
}

pub struct Batcher<S: EventStore> {
    store: Arc<S>,
    source: String,
    targets: BTreeMap<String, TargetExpression>,
    /// Held for the duration of a pass; a pass that cannot take it is skipped
    in_flight: Mutex<()>,
}

impl<S: EventStore> Batcher<S> {
    pub fn new(
        store: Arc<S>,
        source: impl Into<String>,
        targets: BTreeMap<String, TargetExpression>,
    ) -> Self {
        Self {
            store,
            source: source.into(),
            targets,
            in_flight: Mutex::new(()),
        }
    }

    /// Run passes every `interval` until `shutdown` fires. A failed pass is
    /// logged and retried on the next tick.
    pub async fn watch(&self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "Batching events of {} for {} target(s) every {interval:?}",
            self.source,
            self.targets.len()
        );

        loop {
            if let Err(e) = self.create_batches().await {
                error!("Batching pass failed: {e:#}");
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Run one pass and return the committed batches.
    ///
    /// Returns None when another pass is still in flight.
    pub async fn create_batches(&self) -> anyhow::Result<Option<Vec<Batch>>> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Previous batching pass still running, skipping");
            return Ok(None);
        };

        let events = self
            .store
            .get_events(EventStatus::WaitingBatch)
            .await
            .context("Failed to read waiting events")?;
        if events.is_empty() {
            debug!("No events waiting for a batch");
            return Ok(Some(Vec::new()));
        }
        if self.targets.is_empty() {
            warn!("{} events waiting but no targets configured", events.len());
            return Ok(Some(Vec::new()));
        }

        let mut ready = Vec::with_capacity(events.len());
        let mut actions = Vec::new();
        for event in events {
            match event_actions(&event) {
                Ok(event_actions) => {
                    debug!(
                        "Event {} ({} {}) produced {} action(s)",
                        event.id,
                        event.kind,
                        event.trigger_tag,
                        event_actions.len()
                    );
                    actions.extend(event_actions);
                    ready.push(event);
                }
                Err(e) => warn!("Leaving event {} waiting: {e}", event.id),
            }
        }
        if ready.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let mut batches = Vec::with_capacity(self.targets.len());
        let mut counts = Vec::with_capacity(self.targets.len());
        for (target, expression) in &self.targets {
            let filtered: Vec<Action> = actions
                .iter()
                .filter(|a| a.filter(expression))
                .cloned()
                .collect();

            let mut batch = Batch::new(self.source.as_str(), target.as_str());
            batch
                .set_actions(&filtered)
                .with_context(|| format!("Failed to encode batch for target {target}"))?;
            batches.push(batch);
            counts.push(filtered.len());
        }

        self.store
            .commit_batches(&mut batches, &ready)
            .await
            .with_context(|| format!("Failed to commit batches for {} target(s)", batches.len()))?;

        for (batch, count) in batches.iter().zip(counts) {
            info!(
                "Committed batch {} for target {}: {} event(s), {count} action(s)",
                batch.id.unwrap_or_default(),
                batch.target,
                ready.len()
            );
        }
        Ok(Some(batches))
    }
}

/// Actions carried by one event. Row changes are batched without actions.
fn event_actions(event: &Event) -> teleport_database::Result<Vec<Action>> {
    match event.kind {
        EventKind::Ddl => Ok(event.ddl_change()?.actions()?),
        EventKind::Dml => Ok(Vec::new()),
    }
}
