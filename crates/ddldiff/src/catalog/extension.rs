use super::{Oid, Parent};
use crate::action::Action;
use crate::context::Context;
use crate::diffable::{Diffable, Identity, Kind, Node};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// An installed extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub oid: Oid,

    #[serde(rename = "extension_name")]
    pub name: String,

    #[serde(skip)]
    pub schema: Parent,
}

impl Extension {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Diffable for Extension {
    fn kind(&self) -> Kind {
        Kind::Extension
    }

    fn identity(&self) -> Identity<'_> {
        Identity::oid_or_name(&self.oid, &self.name)
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let action = match prior {
            None => Action::CreateExtension {
                schema_name: ctx.schema().to_string(),
                extension_name: self.name.clone(),
            },
            Some(prior) if !self.is_equal(prior) => Action::AlterExtension {
                schema_name: ctx.schema().to_string(),
                source_name: prior.name.clone(),
                target_name: self.name.clone(),
            },
            Some(_) => return Ok(Vec::new()),
        };
        Ok(vec![action])
    }

    fn drop_actions(&self, ctx: &Context<'_>) -> Vec<Action> {
        vec![Action::DropExtension {
            schema_name: ctx.schema().to_string(),
            extension_name: self.name.clone(),
        }]
    }

    fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name
    }

    fn children(&self) -> Vec<Node<'_>> {
        Vec::new()
    }
}
