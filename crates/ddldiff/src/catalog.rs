//! Typed model of a PostgreSQL structural catalog.
//!
//! A [`Catalog`] is a forest of [`Schema`] trees parsed from the JSON emitted
//! by the catalog introspection query. Every entity is an immutable value:
//! snapshots are parsed once per diff, linked to their parents during
//! construction and discarded afterwards.
//!
//! ## Snapshot format
//!
//! ```text
//! [{"oid":"2200","schema_name":"public","owner_id":"10","classes":
//!     [{"oid":"16443","namespace_oid":"2200","relation_kind":"r","relation_name":"users",
//!       "columns":[{"class_oid":"16443","attr_name":"id","attr_num":1,"type_name":"int4","type_oid":"23"}],
//!       "indexes":null}],
//!   "types":null,"functions":null,"extensions":null}]
//! ```
//!
//! Absent or `null` collections parse as empty.

mod column;
mod extension;
mod function;
mod index;
mod schema;
mod table;
mod types;

pub use column::Column;
pub use extension::Extension;
pub use function::Function;
pub use index::Index;
pub use schema::Schema;
pub use table::{RelationKind, Table};
pub use types::{Attribute, Enum, Type, TypeKind};

use crate::action::Action;
use crate::context::Context;
use crate::diffable::Node;
use crate::error::Result;
use crate::reconcile::reconcile;
use serde::{Deserialize, Deserializer, Serialize};

/// Catalog object id, kept in the textual form the introspection query emits.
pub type Oid = String;

/// Non-owning reference from a child entity to its structural parent.
///
/// Filled in while a snapshot is constructed and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Parent {
    pub oid: Oid,
    pub name: String,
}

impl Parent {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
        }
    }

    /// True until the entity has been linked into a tree.
    pub fn is_unset(&self) -> bool {
        self.oid.is_empty() && self.name.is_empty()
    }
}

/// A full catalog snapshot: zero or more schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<Schema>>", into = "Vec<Schema>")]
pub struct Catalog {
    pub schemas: Vec<Schema>,
}

impl From<Option<Vec<Schema>>> for Catalog {
    fn from(schemas: Option<Vec<Schema>>) -> Self {
        Self::new(schemas.unwrap_or_default())
    }
}

impl From<Catalog> for Vec<Schema> {
    fn from(catalog: Catalog) -> Self {
        catalog.schemas
    }
}

impl Catalog {
    /// Build a catalog, linking every child to its parent.
    pub fn new(schemas: Vec<Schema>) -> Self {
        Self {
            schemas: schemas.into_iter().map(Schema::linked).collect(),
        }
    }

    /// Parse a serialized snapshot.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up a schema by name.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Every table paired with the schema that owns it.
    pub fn tables(&self) -> impl Iterator<Item = (&Schema, &Table)> {
        self.schemas
            .iter()
            .flat_map(|schema| schema.tables.iter().map(move |table| (schema, table)))
    }

    /// Total number of entities in the snapshot.
    pub fn entity_count(&self) -> usize {
        self.schemas.iter().map(|s| Node::Schema(s).count()).sum()
    }

    /// Actions transforming `prior` (absent for pure creation) into `self`.
    pub fn diff(&self, prior: Option<&Catalog>) -> Result<Vec<Action>> {
        let prior = prior.map(|c| c.schemas.as_slice()).unwrap_or_default();
        reconcile(prior, &self.schemas, &Context::root())
    }
}

/// Deserialize a collection that may be absent or `null`.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
