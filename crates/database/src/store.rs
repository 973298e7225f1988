//! Event store trait and an in-memory implementation.
//!
//! The batcher only talks to an [`EventStore`], so the same batching logic
//! runs against the PostgreSQL-backed [`crate::Database`] or the
//! [`MemoryStore`] used by tests and the offline tooling.

use crate::batch::Batch;
use crate::error::Result;
use crate::event::{Event, EventStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Persistence for events, batches and their membership.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events with the given status, ordered by id.
    async fn get_events(&self, status: EventStatus) -> Result<Vec<Event>>;

    /// Read a single event.
    ///
    /// Returns None if the event doesn't exist.
    async fn get_event(&self, id: i64) -> Result<Option<Event>>;

    /// Insert an event and return its assigned id.
    async fn insert_event(&self, event: &Event) -> Result<i64>;

    /// Persist the status and data of an existing event.
    async fn update_event(&self, event: &Event) -> Result<()>;

    /// Insert every batch, link every event to each of them through
    /// `batch_events` and mark the events `batched`. Either all of it
    /// happens or none of it does, so an event is never marked batched
    /// while a batch it belongs in is missing.
    ///
    /// On success each `batch.id` holds the assigned id.
    async fn commit_batches(&self, batches: &mut [Batch], events: &[Event]) -> Result<()>;

    /// [`EventStore::commit_batches`] for a single batch.
    async fn commit_batch(&self, batch: &mut Batch, events: &[Event]) -> Result<()> {
        self.commit_batches(std::slice::from_mut(batch), events).await
    }

    /// Ids of the events that belong to a batch, ordered by id.
    async fn batch_event_ids(&self, batch_id: i64) -> Result<Vec<i64>>;

    /// Read a single batch.
    ///
    /// Returns None if the batch doesn't exist.
    async fn get_batch(&self, id: i64) -> Result<Option<Batch>>;
}

#[derive(Debug, Default)]
struct MemoryState {
    next_event_id: i64,
    next_batch_id: i64,
    events: BTreeMap<i64, Event>,
    batches: BTreeMap<i64, Batch>,
    batch_events: Vec<(i64, i64)>,
}

/// In-memory implementation of [`EventStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn get_events(&self, status: EventStatus) -> Result<Vec<Event>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect())
    }

    async fn get_event(&self, id: i64) -> Result<Option<Event>> {
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn insert_event(&self, event: &Event) -> Result<i64> {
        let mut state = self.state.lock().await;
        state.next_event_id += 1;
        let id = state.next_event_id;

        let mut stored = event.clone();
        stored.id = id;
        stored.created_at.get_or_insert_with(Utc::now);
        state.events.insert(id, stored);
        Ok(id)
    }

    async fn update_event(&self, event: &Event) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(stored) = state.events.get_mut(&event.id) {
            stored.status = event.status;
            stored.data = event.data.clone();
        }
        Ok(())
    }

    async fn commit_batches(&self, batches: &mut [Batch], events: &[Event]) -> Result<()> {
        let mut state = self.state.lock().await;
        for batch in batches.iter_mut() {
            state.next_batch_id += 1;
            let batch_id = state.next_batch_id;

            batch.id = Some(batch_id);
            batch.created_at.get_or_insert_with(Utc::now);
            state.batches.insert(batch_id, batch.clone());
            state
                .batch_events
                .extend(events.iter().map(|event| (batch_id, event.id)));
        }

        for event in events {
            if let Some(stored) = state.events.get_mut(&event.id) {
                stored.status = EventStatus::Batched;
            }
        }
        Ok(())
    }

    async fn batch_event_ids(&self, batch_id: i64) -> Result<Vec<i64>> {
        let state = self.state.lock().await;
        let mut ids: Vec<i64> = state
            .batch_events
            .iter()
            .filter(|(batch, _)| *batch == batch_id)
            .map(|(_, event)| *event)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn get_batch(&self, id: i64) -> Result<Option<Batch>> {
        Ok(self.state.lock().await.batches.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn dml_event() -> Event {
        Event::new(0, EventKind::Dml, "public.users", "INSERT", "42", None)
    }

    #[tokio::test]
    async fn test_insert_and_get_event() {
        let store = MemoryStore::new();

        let first = store.insert_event(&dml_event()).await.unwrap();
        let second = store.insert_event(&dml_event()).await.unwrap();

        assert_eq!((first, second), (1, 2));
        let event = store.get_event(first).await.unwrap().unwrap();
        assert_eq!(event.id, first);
        assert_eq!(event.status, EventStatus::WaitingBatch);
        assert!(event.created_at.is_some());
        assert!(store.get_event(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_event_status() {
        let store = MemoryStore::new();
        let id = store.insert_event(&dml_event()).await.unwrap();

        let mut event = store.get_event(id).await.unwrap().unwrap();
        event.status = EventStatus::Building;
        store.update_event(&event).await.unwrap();

        assert!(store
            .get_events(EventStatus::WaitingBatch)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store.get_events(EventStatus::Building).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_commit_batch_links_and_marks_events() {
        let store = MemoryStore::new();
        for _ in 0..3 {
            store.insert_event(&dml_event()).await.unwrap();
        }
        let waiting = store.get_events(EventStatus::WaitingBatch).await.unwrap();
        let mut batch = Batch::new("source", "replica");

        store.commit_batch(&mut batch, &waiting[..2]).await.unwrap();

        let batch_id = batch.id.unwrap();
        assert_eq!(store.batch_event_ids(batch_id).await.unwrap(), vec![1, 2]);
        assert_eq!(
            store.get_batch(batch_id).await.unwrap().unwrap().target,
            "replica"
        );
        let remaining = store.get_events(EventStatus::WaitingBatch).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 3);
    }

    #[tokio::test]
    async fn test_commit_batches_links_events_to_every_batch() {
        let store = MemoryStore::new();
        for _ in 0..2 {
            store.insert_event(&dml_event()).await.unwrap();
        }
        let waiting = store.get_events(EventStatus::WaitingBatch).await.unwrap();
        let mut batches = vec![Batch::new("source", "a"), Batch::new("source", "b")];

        store.commit_batches(&mut batches, &waiting).await.unwrap();

        let ids: Vec<i64> = batches.iter().map(|b| b.id.unwrap()).collect();
        assert_eq!(ids, vec![1, 2]);
        for id in ids {
            assert_eq!(store.batch_event_ids(id).await.unwrap(), vec![1, 2]);
        }
        assert_eq!(store.get_batch(2).await.unwrap().unwrap().target, "b");
        assert!(store
            .get_events(EventStatus::WaitingBatch)
            .await
            .unwrap()
            .is_empty());
    }
}
