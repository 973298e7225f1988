use super::{Oid, Parent};
use crate::action::Action;
use crate::context::Context;
use crate::diffable::{Diffable, Identity, Kind, Node};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A table column (`pg_attribute` row).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub class_oid: Oid,

    #[serde(rename = "attr_name")]
    pub name: String,

    #[serde(rename = "attr_num")]
    pub num: i32,

    pub type_name: String,

    #[serde(default)]
    pub type_oid: Oid,

    #[serde(skip)]
    pub table: Parent,
}

impl Column {
    pub fn new(num: i32, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            num,
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }
}

impl Diffable for Column {
    fn kind(&self) -> Kind {
        Kind::Column
    }

    /// Attribute numbers survive renames and type changes.
    fn identity(&self) -> Identity<'_> {
        Identity::Number(self.num)
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let action = match prior {
            None => Action::CreateColumn {
                schema_name: ctx.schema().to_string(),
                table_name: ctx.parent_name().to_string(),
                column_name: self.name.clone(),
                data_type: self.type_name.clone(),
            },
            Some(prior) if !self.is_equal(prior) => Action::AlterColumn {
                schema_name: ctx.schema().to_string(),
                table_name: ctx.parent_name().to_string(),
                source_name: prior.name.clone(),
                target_name: self.name.clone(),
                source_type: prior.type_name.clone(),
                target_type: self.type_name.clone(),
            },
            Some(_) => return Ok(Vec::new()),
        };
        Ok(vec![action])
    }

    fn drop_actions(&self, ctx: &Context<'_>) -> Vec<Action> {
        vec![Action::DropColumn {
            schema_name: ctx.schema().to_string(),
            table_name: ctx.parent_name().to_string(),
            column_name: self.name.clone(),
        }]
    }

    fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name && self.type_name == other.type_name
    }

    fn children(&self) -> Vec<Node<'_>> {
        Vec::new()
    }
}
