use super::{nullable, Column, Index, Oid, Parent};
use crate::action::Action;
use crate::context::Context;
use crate::diffable::{Diffable, Identity, Kind, Node};
use crate::error::Result;
use crate::reconcile::reconcile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `pg_class.relkind`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    #[default]
    #[serde(rename = "r")]
    Ordinary,
    #[serde(rename = "i")]
    Index,
    #[serde(rename = "S")]
    Sequence,
    #[serde(rename = "t")]
    Toast,
    #[serde(rename = "v")]
    View,
    #[serde(rename = "m")]
    MaterializedView,
    #[serde(rename = "c")]
    CompositeType,
    #[serde(rename = "f")]
    ForeignTable,
    #[serde(rename = "p")]
    PartitionedTable,
    #[serde(rename = "I")]
    PartitionedIndex,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Ordinary => "r",
            RelationKind::Index => "i",
            RelationKind::Sequence => "S",
            RelationKind::Toast => "t",
            RelationKind::View => "v",
            RelationKind::MaterializedView => "m",
            RelationKind::CompositeType => "c",
            RelationKind::ForeignTable => "f",
            RelationKind::PartitionedTable => "p",
            RelationKind::PartitionedIndex => "I",
        }
    }

    /// Only ordinary tables get change-capture triggers.
    pub fn is_ordinary(&self) -> bool {
        matches!(self, RelationKind::Ordinary)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relation (`pg_class` row) with its columns and indexes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub oid: Oid,

    pub relation_kind: RelationKind,

    #[serde(rename = "relation_name")]
    pub name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub columns: Vec<Column>,

    #[serde(default, deserialize_with = "nullable")]
    pub indexes: Vec<Index>,

    #[serde(skip)]
    pub schema: Parent,
}

impl Table {
    pub fn new(oid: impl Into<Oid>, relation_kind: RelationKind, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            relation_kind,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        let schema = std::mem::take(&mut self.schema);
        self.linked(schema)
    }

    pub fn with_indexes(mut self, indexes: Vec<Index>) -> Self {
        self.indexes = indexes;
        let schema = std::mem::take(&mut self.schema);
        self.linked(schema)
    }

    pub(crate) fn linked(mut self, schema: Parent) -> Self {
        self.schema = schema;
        let parent = Parent::new(&self.oid, &self.name);
        for column in &mut self.columns {
            column.table = parent.clone();
        }
        for index in &mut self.indexes {
            index.table = parent.clone();
        }
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl Diffable for Table {
    fn kind(&self) -> Kind {
        Kind::Table
    }

    fn identity(&self) -> Identity<'_> {
        Identity::oid_or_name(&self.oid, &self.name)
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let mut actions = Vec::new();

        match prior {
            None => actions.push(Action::CreateTable {
                schema_name: ctx.schema().to_string(),
                table_name: self.name.clone(),
                relation_kind: self.relation_kind,
            }),
            Some(prior) if !self.is_equal(prior) => actions.push(Action::AlterTable {
                schema_name: ctx.schema().to_string(),
                source_name: prior.name.clone(),
                target_name: self.name.clone(),
            }),
            Some(_) => {}
        }

        let ctx = ctx.with_parent(&self.name);
        let empty = Table::default();
        let prior = prior.unwrap_or(&empty);
        actions.extend(reconcile(&prior.columns, &self.columns, &ctx)?);
        actions.extend(reconcile(&prior.indexes, &self.indexes, &ctx)?);

        Ok(actions)
    }

    fn drop_actions(&self, ctx: &Context<'_>) -> Vec<Action> {
        vec![Action::DropTable {
            schema_name: ctx.schema().to_string(),
            table_name: self.name.clone(),
        }]
    }

    fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name && self.relation_kind == other.relation_kind
    }

    fn children(&self) -> Vec<Node<'_>> {
        self.columns
            .iter()
            .map(Node::Column)
            .chain(self.indexes.iter().map(Node::Index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("16443", RelationKind::Ordinary, "users").with_columns(vec![
            Column::new(1, "id", "int4"),
            Column::new(2, "email", "text"),
        ])
    }

    #[test]
    fn test_parse_relation_kind() {
        let table: Table = serde_json::from_str(
            r#"{"oid":"1","namespace_oid":"2200","relation_kind":"v","relation_name":"active_users"}"#,
        )
        .unwrap();
        assert_eq!(table.relation_kind, RelationKind::View);
        assert!(!table.relation_kind.is_ordinary());
        assert!(table.columns.is_empty());
        assert!(table.indexes.is_empty());
    }

    #[test]
    fn test_create_table_creates_columns() {
        let actions = users().diff(None, &Context::new("public")).unwrap();

        assert_eq!(actions.len(), 3);
        assert!(matches!(&actions[0], Action::CreateTable { table_name, .. } if table_name == "users"));
        assert!(matches!(
            &actions[1],
            Action::CreateColumn { table_name, column_name, .. } if table_name == "users" && column_name == "id"
        ));
        assert!(matches!(
            &actions[2],
            Action::CreateColumn { column_name, .. } if column_name == "email"
        ));
    }

    #[test]
    fn test_rename_table_qualifies_children_with_new_name() {
        let pre = users();
        let mut post = users();
        post.name = "accounts".to_string();
        post.columns.push(Column::new(3, "created_at", "timestamptz"));

        let actions = post.diff(Some(&pre), &Context::new("public")).unwrap();

        assert_eq!(
            actions,
            vec![
                Action::AlterTable {
                    schema_name: "public".to_string(),
                    source_name: "users".to_string(),
                    target_name: "accounts".to_string(),
                },
                Action::CreateColumn {
                    schema_name: "public".to_string(),
                    table_name: "accounts".to_string(),
                    column_name: "created_at".to_string(),
                    data_type: "timestamptz".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_drop_table_does_not_drop_columns() {
        let actions = users().drop_actions(&Context::new("public"));
        assert_eq!(
            actions,
            vec![Action::DropTable {
                schema_name: "public".to_string(),
                table_name: "users".to_string(),
            }]
        );
    }

    #[test]
    fn test_relation_kind_change_is_unsupported() {
        let pre = Table::new("16443", RelationKind::Ordinary, "users");
        let post = Table::new("16443", RelationKind::PartitionedTable, "users");

        let actions = post.diff(Some(&pre), &Context::new("public")).unwrap();

        match actions[0].to_sql() {
            Err(crate::error::Error::Unsupported { action }) => {
                assert_eq!(action, "~ table public.users -> users")
            }
            other => panic!("Expected Unsupported, got {other:?}"),
        }
    }

    #[test]
    fn test_with_columns_links_to_table() {
        let table = users();
        assert!(table
            .columns
            .iter()
            .all(|c| c.table == Parent::new("16443", "users")));
    }
}
