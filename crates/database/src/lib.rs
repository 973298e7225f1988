//! Source database side of teleport.
//!
//! Triggers installed by [`Database::install_triggers`] record every DDL
//! command and every row change into `teleport.event`. The batcher reads
//! those events through the [`EventStore`] trait and commits them as
//! per-target [`Batch`]es.
//!
//! # Modules
//!
//! - [`event`] - event records and their payload encodings
//! - [`batch`] - batch records
//! - [`store`] - the [`EventStore`] trait and the in-memory [`MemoryStore`]
//! - [`postgres`] - the PostgreSQL-backed [`Database`]
//!
//! # Example
//!
//! ```ignore
//! use teleport_database::{Database, EventStatus, EventStore};
//!
//! let db = Database::start("source", "host=localhost user=postgres dbname=app").await?;
//! let waiting = db.get_events(EventStatus::WaitingBatch).await?;
//! ```

pub mod batch;
pub mod error;
pub mod event;
pub mod postgres;
pub mod store;

pub use batch::{Batch, BatchStatus};
pub use error::{Error, Result};
pub use event::{Event, EventKind, EventStatus};
pub use postgres::{new_postgresql_client, Database, INTERNAL_SCHEMA};
pub use store::{EventStore, MemoryStore};
