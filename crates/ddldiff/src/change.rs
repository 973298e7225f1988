//! The payload of a DDL event: catalog snapshots taken before and after a
//! DDL command.

use crate::action::Action;
use crate::catalog::Catalog;
use crate::context::Context;
use crate::error::Result;
use crate::reconcile::reconcile;
use serde::{Deserialize, Serialize};

/// `{"pre": [...], "post": [...]}`; either side may be absent or `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DdlChange {
    #[serde(default)]
    pub pre: Option<Catalog>,

    #[serde(default)]
    pub post: Option<Catalog>,
}

impl DdlChange {
    pub fn new(pre: Option<Catalog>, post: Option<Catalog>) -> Self {
        Self { pre, post }
    }

    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Actions replaying this change on a target.
    pub fn actions(&self) -> Result<Vec<Action>> {
        match (&self.pre, &self.post) {
            (pre, Some(post)) => post.diff(pre.as_ref()),
            (Some(pre), None) => reconcile(&pre.schemas, &[], &Context::root()),
            (None, None) => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_null_sides_as_absent() {
        let change = DdlChange::parse(r#"{"pre":null,"post":[{"oid":"1","schema_name":"app"}]}"#)
            .unwrap();
        assert!(change.pre.is_none());

        let actions = change.actions().unwrap();
        assert_eq!(
            actions,
            vec![Action::CreateSchema {
                schema_name: "app".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_post_drops_everything() {
        let change = DdlChange::parse(r#"{"pre":[{"oid":"1","schema_name":"app"}]}"#).unwrap();
        assert_eq!(
            change.actions().unwrap(),
            vec![Action::DropSchema {
                schema_name: "app".to_string()
            }]
        );
    }

    #[test]
    fn test_empty_change_has_no_actions() {
        let change = DdlChange::parse("{}").unwrap();
        assert!(change.actions().unwrap().is_empty());
    }
}
