//! Catalog reconciliation for teleport.
//!
//! Given two snapshots of a PostgreSQL structural catalog, this crate
//! computes the ordered list of DDL actions that turns the first into the
//! second.
//!
//! # Modules
//!
//! - [`catalog`] - typed snapshot model (schemas, tables, columns, indexes,
//!   types, enums, attributes, functions, extensions)
//! - [`diffable`] - the contract shared by every entity and the [`Node`] sum type
//! - [`mod@reconcile`] - identity-based pairing of sibling lists
//! - [`action`] - the tagged [`Action`] records and their SQL rendering
//! - [`target`] - target expressions selecting what a target replicates
//! - [`change`] - the `{pre, post}` payload of a DDL event
//!
//! # Example
//!
//! ```ignore
//! use ddldiff::{Catalog, DdlChange};
//!
//! let pre = Catalog::parse(&pre_json)?;
//! let post = Catalog::parse(&post_json)?;
//! for action in post.diff(Some(&pre))? {
//!     println!("{}", action.to_sql()?);
//! }
//! ```

pub mod action;
pub mod catalog;
pub mod change;
pub mod context;
pub mod diffable;
pub mod error;
pub mod reconcile;
pub mod sql;
pub mod target;

pub use action::Action;
pub use catalog::{
    Attribute, Catalog, Column, Enum, Extension, Function, Index, Oid, Parent, RelationKind,
    Schema, Table, Type, TypeKind,
};
pub use change::DdlChange;
pub use context::Context;
pub use diffable::{Diffable, Identity, Kind, Node};
pub use error::{Error, Result};
pub use reconcile::{pair, reconcile, reconcile_parts, Pairing, Reconciled};
pub use target::TargetExpression;
