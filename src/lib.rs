//! Teleport
//!
//! Replicates PostgreSQL schema changes from a source database to any number
//! of targets.
//!
//! # Pipeline
//!
//! - Triggers on the source record DDL commands and row changes as events
//!   (`teleport_database`)
//! - The [`batcher`] reconciles each DDL event's catalog snapshots into
//!   actions (`ddldiff`) and commits one batch per target
//! - [`diff`] runs the same reconciliation offline on snapshot files
//!
//! # CLI Usage
//!
//! ```bash
//! # Create internal tables and install triggers for every target
//! teleport --config teleport.yml install-triggers
//!
//! # Batch waiting events until Ctrl+C
//! teleport --config teleport.yml batcher
//!
//! # Reconcile two snapshot files and print SQL
//! teleport diff --pre before.json --post after.json --sql
//! ```

pub mod batcher;
pub mod config;
pub mod diff;

pub use batcher::{setup_shutdown_handler, Batcher};
pub use config::{Config, DatabaseConfig, TargetConfig};
