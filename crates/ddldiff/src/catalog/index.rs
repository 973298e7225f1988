use super::{Oid, Parent};
use crate::action::Action;
use crate::context::Context;
use crate::diffable::{Diffable, Identity, Kind, Node};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// An index together with its `pg_get_indexdef` text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(rename = "index_oid")]
    pub oid: Oid,

    #[serde(rename = "index_name")]
    pub name: String,

    #[serde(rename = "index_def")]
    pub definition: String,

    /// Backs a primary key, unique or exclusion constraint.
    #[serde(rename = "index_constraint", default)]
    pub constraint: bool,

    #[serde(skip)]
    pub table: Parent,
}

impl Index {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            definition: definition.into(),
            ..Default::default()
        }
    }

    /// Whether the index enforces uniqueness.
    pub fn is_unique(&self) -> bool {
        self.definition
            .trim_start()
            .to_ascii_uppercase()
            .starts_with("CREATE UNIQUE INDEX")
    }

    /// Access method and key list, i.e. everything after ` USING `.
    ///
    /// The definition embeds the index and table names, so comparing it
    /// verbatim would turn every rename into a rebuild.
    pub fn shape(&self) -> &str {
        match self.definition.find(" USING ") {
            Some(pos) => &self.definition[pos + 1..],
            None => &self.definition,
        }
    }
}

impl Diffable for Index {
    fn kind(&self) -> Kind {
        Kind::Index
    }

    fn identity(&self) -> Identity<'_> {
        Identity::oid_or_name(&self.oid, &self.name)
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let action = match prior {
            None => Action::CreateIndex {
                schema_name: ctx.schema().to_string(),
                table_name: ctx.parent_name().to_string(),
                index_name: self.name.clone(),
                index_def: self.definition.clone(),
            },
            Some(prior) if !self.is_equal(prior) => {
                let rebuilt = self.is_unique() != prior.is_unique() || self.shape() != prior.shape();
                Action::AlterIndex {
                    schema_name: ctx.schema().to_string(),
                    table_name: ctx.parent_name().to_string(),
                    source_name: prior.name.clone(),
                    target_name: self.name.clone(),
                    index_def: rebuilt.then(|| self.definition.clone()),
                    constraint: prior.constraint,
                }
            }
            Some(_) => return Ok(Vec::new()),
        };
        Ok(vec![action])
    }

    fn drop_actions(&self, ctx: &Context<'_>) -> Vec<Action> {
        vec![Action::DropIndex {
            schema_name: ctx.schema().to_string(),
            table_name: ctx.parent_name().to_string(),
            index_name: self.name.clone(),
            constraint: self.constraint,
        }]
    }

    fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name
            && self.is_unique() == other.is_unique()
            && self.shape() == other.shape()
    }

    fn children(&self) -> Vec<Node<'_>> {
        Vec::new()
    }
}
