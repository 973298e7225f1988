use super::{Oid, Parent};
use crate::action::Action;
use crate::context::Context;
use crate::diffable::{Diffable, Identity, Kind, Node};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A function and its `pg_get_functiondef` source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub oid: Oid,

    #[serde(rename = "function_name")]
    pub name: String,

    #[serde(rename = "function_def")]
    pub definition: String,

    #[serde(rename = "function_arguments", default)]
    pub arguments: String,

    #[serde(skip)]
    pub schema: Parent,
}

impl Function {
    pub fn new(
        oid: impl Into<Oid>,
        name: impl Into<String>,
        definition: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            definition: definition.into(),
            arguments: arguments.into(),
            ..Default::default()
        }
    }
}

impl Diffable for Function {
    fn kind(&self) -> Kind {
        Kind::Function
    }

    fn identity(&self) -> Identity<'_> {
        Identity::oid_or_name(&self.oid, &self.name)
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let action = match prior {
            None => Action::CreateFunction {
                schema_name: ctx.schema().to_string(),
                function_name: self.name.clone(),
                function_def: self.definition.clone(),
                arguments: self.arguments.clone(),
            },
            Some(prior) if !self.is_equal(prior) => Action::AlterFunction {
                schema_name: ctx.schema().to_string(),
                source_name: prior.name.clone(),
                target_name: self.name.clone(),
                arguments: prior.arguments.clone(),
                target_arguments: (self.arguments != prior.arguments)
                    .then(|| self.arguments.clone()),
                function_def: (self.definition != prior.definition
                    || self.arguments != prior.arguments)
                    .then(|| self.definition.clone()),
            },
            Some(_) => return Ok(Vec::new()),
        };
        Ok(vec![action])
    }

    fn drop_actions(&self, ctx: &Context<'_>) -> Vec<Action> {
        vec![Action::DropFunction {
            schema_name: ctx.schema().to_string(),
            function_name: self.name.clone(),
            arguments: self.arguments.clone(),
        }]
    }

    /// `pg_get_functiondef` embeds the function name, so a rename also
    /// carries the new definition.
    fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name
            && self.arguments == other.arguments
            && self.definition == other.definition
    }

    fn children(&self) -> Vec<Node<'_>> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEF: &str = "CREATE OR REPLACE FUNCTION public.add(a integer, b integer)\n RETURNS integer\n LANGUAGE sql\nAS $function$ SELECT a + b $function$\n";

    #[test]
    fn test_parse_function() {
        let function: Function = serde_json::from_str(
            r#"{"oid":"700","function_name":"add","function_def":"CREATE FUNCTION add()","function_arguments":"a integer, b integer"}"#,
        )
        .unwrap();
        assert_eq!(function.name, "add");
        assert_eq!(function.arguments, "a integer, b integer");
    }

    #[test]
    fn test_changed_body_replaces_definition() {
        let pre = Function::new("700", "add", DEF, "a integer, b integer");
        let post = Function::new(
            "700",
            "add",
            DEF.replace("a + b", "b + a"),
            "a integer, b integer",
        );

        let actions = post.diff(Some(&pre), &Context::new("public")).unwrap();

        assert!(matches!(
            &actions[..],
            [Action::AlterFunction { function_def: Some(def), .. }] if def.contains("b + a")
        ));
    }

    #[test]
    fn test_changed_arguments_replace_prior_overload() {
        let pre = Function::new("700", "add", DEF, "a integer, b integer");
        let post = Function::new(
            "700",
            "add",
            DEF.replace("integer", "bigint"),
            "a bigint, b bigint",
        );

        let actions = post.diff(Some(&pre), &Context::new("public")).unwrap();
        assert!(matches!(
            &actions[..],
            [Action::AlterFunction { arguments, target_arguments: Some(target), .. }]
                if arguments == "a integer, b integer" && target == "a bigint, b bigint"
        ));

        let sql = actions[0].to_sql().unwrap();
        let mut lines = sql.lines();
        assert_eq!(
            lines.next(),
            Some(r#"DROP FUNCTION "public"."add"(a integer, b integer);"#)
        );
        assert!(lines.next().unwrap().starts_with("CREATE OR REPLACE FUNCTION public.add(a bigint, b bigint)"));
    }

    #[test]
    fn test_drop_function_keeps_signature() {
        let function = Function::new("700", "add", DEF, "a integer, b integer");
        assert_eq!(
            function.drop_actions(&Context::new("public")),
            vec![Action::DropFunction {
                schema_name: "public".to_string(),
                function_name: "add".to_string(),
                arguments: "a integer, b integer".to_string(),
            }]
        );
    }
}
