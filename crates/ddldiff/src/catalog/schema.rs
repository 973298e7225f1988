use super::{nullable, Extension, Function, Oid, Parent, Table, Type};
use crate::action::Action;
use crate::context::Context;
use crate::diffable::{Diffable, Identity, Kind, Node};
use crate::error::Result;
use crate::reconcile::reconcile_parts;
use serde::{Deserialize, Serialize};

/// A namespace and everything it owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub oid: Oid,

    #[serde(rename = "schema_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(rename = "classes", default, deserialize_with = "nullable")]
    pub tables: Vec<Table>,

    #[serde(default, deserialize_with = "nullable")]
    pub types: Vec<Type>,

    #[serde(default, deserialize_with = "nullable")]
    pub functions: Vec<Function>,

    #[serde(default, deserialize_with = "nullable")]
    pub extensions: Vec<Extension>,
}

impl Schema {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tables(mut self, tables: Vec<Table>) -> Self {
        self.tables = tables;
        self.linked()
    }

    pub fn with_types(mut self, types: Vec<Type>) -> Self {
        self.types = types;
        self.linked()
    }

    pub fn with_functions(mut self, functions: Vec<Function>) -> Self {
        self.functions = functions;
        self.linked()
    }

    pub fn with_extensions(mut self, extensions: Vec<Extension>) -> Self {
        self.extensions = extensions;
        self.linked()
    }

    /// Point every descendant at its immediate container.
    pub(crate) fn linked(mut self) -> Self {
        let parent = Parent::new(&self.oid, &self.name);
        self.tables = std::mem::take(&mut self.tables)
            .into_iter()
            .map(|t| t.linked(parent.clone()))
            .collect();
        self.types = std::mem::take(&mut self.types)
            .into_iter()
            .map(|t| t.linked(parent.clone()))
            .collect();
        for function in &mut self.functions {
            function.schema = parent.clone();
        }
        for extension in &mut self.extensions {
            extension.schema = parent.clone();
        }
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

impl Diffable for Schema {
    fn kind(&self) -> Kind {
        Kind::Schema
    }

    fn identity(&self) -> Identity<'_> {
        Identity::oid_or_name(&self.oid, &self.name)
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let mut actions = Vec::new();

        match prior {
            None => actions.push(Action::CreateSchema {
                schema_name: self.name.clone(),
            }),
            Some(prior) if !self.is_equal(prior) => actions.push(Action::AlterSchema {
                source_name: prior.name.clone(),
                target_name: self.name.clone(),
            }),
            Some(_) => {}
        }

        let ctx = ctx.with_schema(&self.name);
        let empty = Schema::default();
        let prior = prior.unwrap_or(&empty);
        let types = reconcile_parts(&prior.types, &self.types, &ctx)?;
        let extensions = reconcile_parts(&prior.extensions, &self.extensions, &ctx)?;
        let functions = reconcile_parts(&prior.functions, &self.functions, &ctx)?;
        let tables = reconcile_parts(&prior.tables, &self.tables, &ctx)?;

        // Types and extensions are created before the functions and tables
        // that reference them, and dropped after.
        actions.extend(types.changes);
        actions.extend(extensions.changes);
        actions.extend(functions.changes);
        actions.extend(tables.changes);
        actions.extend(tables.drops);
        actions.extend(functions.drops);
        actions.extend(extensions.drops);
        actions.extend(types.drops);

        Ok(actions)
    }

    fn drop_actions(&self, _ctx: &Context<'_>) -> Vec<Action> {
        vec![Action::DropSchema {
            schema_name: self.name.clone(),
        }]
    }

    fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name
    }

    fn children(&self) -> Vec<Node<'_>> {
        self.types
            .iter()
            .map(Node::Type)
            .chain(self.extensions.iter().map(Node::Extension))
            .chain(self.functions.iter().map(Node::Function))
            .chain(self.tables.iter().map(Node::Table))
            .collect()
    }
}
