use super::{nullable, Oid, Parent};
use crate::action::Action;
use crate::context::Context;
use crate::diffable::{Diffable, Identity, Kind, Node};
use crate::error::Result;
use crate::reconcile::reconcile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `pg_type.typtype`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    #[serde(rename = "b")]
    Base,
    #[default]
    #[serde(rename = "c")]
    Composite,
    #[serde(rename = "d")]
    Domain,
    #[serde(rename = "e")]
    Enum,
    #[serde(rename = "p")]
    Pseudo,
    #[serde(rename = "r")]
    Range,
    #[serde(rename = "m")]
    Multirange,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Base => "b",
            TypeKind::Composite => "c",
            TypeKind::Domain => "d",
            TypeKind::Enum => "e",
            TypeKind::Pseudo => "p",
            TypeKind::Range => "r",
            TypeKind::Multirange => "m",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined type. Enum types carry labels, composite types carry
/// attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Type {
    pub oid: Oid,

    #[serde(rename = "type_name")]
    pub name: String,

    #[serde(rename = "type_type")]
    pub kind: TypeKind,

    #[serde(default, deserialize_with = "nullable")]
    pub enums: Vec<Enum>,

    #[serde(default, deserialize_with = "nullable")]
    pub attributes: Vec<Attribute>,

    #[serde(skip)]
    pub schema: Parent,
}

impl Type {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn with_enums(mut self, enums: Vec<Enum>) -> Self {
        self.enums = enums;
        let schema = std::mem::take(&mut self.schema);
        self.linked(schema)
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        let schema = std::mem::take(&mut self.schema);
        self.linked(schema)
    }

    /// Label actions with renames first, then additions in label order.
    /// Each added label is placed after its predecessor, or before the
    /// first existing label when it leads the list.
    fn reconcile_enums(&self, prior: &[Enum], ctx: &Context<'_>) -> Result<Vec<Action>> {
        let post = in_sort_order(&self.enums);
        let (mut added, mut actions): (Vec<_>, Vec<_>) = reconcile(&in_sort_order(prior), &post, ctx)?
            .into_iter()
            .partition(|action| matches!(action, Action::CreateEnum { .. }));

        let is_added = |label: &str| {
            added
                .iter()
                .any(|a| matches!(a, Action::CreateEnum { label: l, .. } if l == label))
        };
        let placements: Vec<(Option<String>, Option<String>)> = added
            .iter()
            .map(|action| {
                let Action::CreateEnum { label, .. } = action else {
                    return (None, None);
                };
                let Some(position) = post.iter().position(|e| &e.label == label) else {
                    return (None, None);
                };
                if position > 0 {
                    return (None, Some(post[position - 1].label.clone()));
                }
                let before = post[1..]
                    .iter()
                    .find(|e| !is_added(&e.label))
                    .map(|e| e.label.clone());
                (before, None)
            })
            .collect();

        for (action, placement) in added.iter_mut().zip(placements) {
            if let Action::CreateEnum { before, after, .. } = action {
                (*before, *after) = placement;
            }
        }
        actions.extend(added);
        Ok(actions)
    }

    pub(crate) fn linked(mut self, schema: Parent) -> Self {
        self.schema = schema;
        let parent = Parent::new(&self.oid, &self.name);
        for label in &mut self.enums {
            label.parent = parent.clone();
        }
        for attribute in &mut self.attributes {
            attribute.parent = parent.clone();
        }
        self
    }
}

impl Diffable for Type {
    fn kind(&self) -> Kind {
        Kind::Type
    }

    fn identity(&self) -> Identity<'_> {
        Identity::oid_or_name(&self.oid, &self.name)
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let mut actions = Vec::new();

        match prior {
            None => actions.push(Action::CreateType {
                schema_name: ctx.schema().to_string(),
                type_name: self.name.clone(),
                type_kind: self.kind,
            }),
            Some(prior) if !self.is_equal(prior) => actions.push(Action::AlterType {
                schema_name: ctx.schema().to_string(),
                source_name: prior.name.clone(),
                target_name: self.name.clone(),
            }),
            Some(_) => {}
        }

        let ctx = ctx.with_parent(&self.name);
        let empty = Type::default();
        let prior = prior.unwrap_or(&empty);
        actions.extend(self.reconcile_enums(&prior.enums, &ctx)?);
        actions.extend(reconcile(&prior.attributes, &self.attributes, &ctx)?);

        Ok(actions)
    }

    fn drop_actions(&self, ctx: &Context<'_>) -> Vec<Action> {
        vec![Action::DropType {
            schema_name: ctx.schema().to_string(),
            type_name: self.name.clone(),
        }]
    }

    fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }

    fn children(&self) -> Vec<Node<'_>> {
        self.enums
            .iter()
            .map(Node::Enum)
            .chain(self.attributes.iter().map(Node::Attribute))
            .collect()
    }
}

/// Labels ordered by `enum_sort_order`; labels without one keep their
/// position relative to each other.
fn in_sort_order(enums: &[Enum]) -> Vec<Enum> {
    let mut sorted = enums.to_vec();
    sorted.sort_by(|a, b| {
        a.sort_order
            .partial_cmp(&b.sort_order)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted
}

/// One label of an enum type (`pg_enum` row).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<Oid>,

    #[serde(rename = "enum_label")]
    pub label: String,

    #[serde(
        rename = "enum_sort_order",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sort_order: Option<f64>,

    #[serde(skip)]
    pub parent: Parent,
}

impl Enum {
    pub fn new(oid: impl Into<Oid>, label: impl Into<String>) -> Self {
        Self {
            oid: Some(oid.into()),
            label: label.into(),
            ..Default::default()
        }
    }
}

impl Diffable for Enum {
    fn kind(&self) -> Kind {
        Kind::Enum
    }

    fn identity(&self) -> Identity<'_> {
        Identity::oid_or_name(self.oid.as_deref().unwrap_or_default(), &self.label)
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let action = match prior {
            None => Action::CreateEnum {
                schema_name: ctx.schema().to_string(),
                type_name: ctx.parent_name().to_string(),
                label: self.label.clone(),
                before: None,
                after: None,
            },
            Some(prior) if !self.is_equal(prior) => Action::AlterEnum {
                schema_name: ctx.schema().to_string(),
                type_name: ctx.parent_name().to_string(),
                source_label: prior.label.clone(),
                target_label: self.label.clone(),
            },
            Some(_) => return Ok(Vec::new()),
        };
        Ok(vec![action])
    }

    fn drop_actions(&self, ctx: &Context<'_>) -> Vec<Action> {
        vec![Action::DropEnum {
            schema_name: ctx.schema().to_string(),
            type_name: ctx.parent_name().to_string(),
            label: self.label.clone(),
        }]
    }

    fn is_equal(&self, other: &Self) -> bool {
        self.label == other.label
    }

    fn children(&self) -> Vec<Node<'_>> {
        Vec::new()
    }
}

/// One field of a composite type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "attr_name")]
    pub name: String,

    pub type_name: String,

    #[serde(rename = "attr_num", default, skip_serializing_if = "Option::is_none")]
    pub num: Option<i32>,

    #[serde(skip)]
    pub parent: Parent,
}

impl Attribute {
    pub fn new(num: i32, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            num: Some(num),
            ..Default::default()
        }
    }
}

impl Diffable for Attribute {
    fn kind(&self) -> Kind {
        Kind::Attribute
    }

    fn identity(&self) -> Identity<'_> {
        match self.num {
            Some(num) => Identity::Number(num),
            None => Identity::Name(&self.name),
        }
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let action = match prior {
            None => Action::CreateAttribute {
                schema_name: ctx.schema().to_string(),
                type_name: ctx.parent_name().to_string(),
                attribute_name: self.name.clone(),
                data_type: self.type_name.clone(),
            },
            Some(prior) if !self.is_equal(prior) => Action::AlterAttribute {
                schema_name: ctx.schema().to_string(),
                type_name: ctx.parent_name().to_string(),
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
        vec![Action::DropAttribute {
            schema_name: ctx.schema().to_string(),
            type_name: ctx.parent_name().to_string(),
            attribute_name: self.name.clone(),
        }]
    }

    fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name && self.type_name == other.type_name
    }

    fn children(&self) -> Vec<Node<'_>> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mood() -> Type {
        Type::new("500", "mood", TypeKind::Enum)
            .with_enums(vec![Enum::new("501", "sad"), Enum::new("502", "ok")])
    }

    #[test]
    fn test_parse_enum_type() {
        let parsed: Type = serde_json::from_str(
            r#"{"oid":"500","type_name":"mood","type_type":"e","enums":
                [{"oid":"501","enum_label":"sad","enum_sort_order":1},
                 {"enum_label":"ok"}],
               "attributes":null}"#,
        )
        .unwrap();

        assert_eq!(parsed.kind, TypeKind::Enum);
        assert_eq!(parsed.enums[0].sort_order, Some(1.0));
        assert_eq!(parsed.enums[0].identity(), Identity::Oid("501"));
        assert_eq!(parsed.enums[1].identity(), Identity::Name("ok"));
        assert!(parsed.attributes.is_empty());
    }

    #[test]
    fn test_create_enum_type_creates_labels() {
        let actions = mood().diff(None, &Context::new("public")).unwrap();

        assert_eq!(
            actions,
            vec![
                Action::CreateType {
                    schema_name: "public".to_string(),
                    type_name: "mood".to_string(),
                    type_kind: TypeKind::Enum,
                },
                Action::CreateEnum {
                    schema_name: "public".to_string(),
                    type_name: "mood".to_string(),
                    label: "sad".to_string(),
                    before: None,
                    after: None,
                },
                Action::CreateEnum {
                    schema_name: "public".to_string(),
                    type_name: "mood".to_string(),
                    label: "ok".to_string(),
                    before: None,
                    after: Some("sad".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_relabel_and_add_enum() {
        let pre = mood();
        let post = Type::new("500", "mood", TypeKind::Enum).with_enums(vec![
            Enum::new("501", "unhappy"),
            Enum::new("502", "ok"),
            Enum::new("503", "happy"),
        ]);

        let actions = post.diff(Some(&pre), &Context::new("public")).unwrap();
        let names: Vec<&str> = actions.iter().map(Action::name).collect();

        assert_eq!(names, vec!["alter_enum", "create_enum"]);
    }

    fn labelled(oid: &str, label: &str, sort_order: f64) -> Enum {
        Enum {
            sort_order: Some(sort_order),
            ..Enum::new(oid, label)
        }
    }

    #[test]
    fn test_label_inserted_between_existing_labels() {
        let pre = Type::new("500", "mood", TypeKind::Enum)
            .with_enums(vec![labelled("501", "sad", 1.0), labelled("502", "happy", 2.0)]);
        let post = Type::new("500", "mood", TypeKind::Enum).with_enums(vec![
            labelled("501", "sad", 1.0),
            labelled("502", "happy", 2.0),
            labelled("503", "ok", 1.5),
        ]);

        let actions = post.diff(Some(&pre), &Context::new("public")).unwrap();

        assert_eq!(actions.len(), 1);
        assert_eq!(
            actions[0].to_sql().unwrap(),
            r#"ALTER TYPE "public"."mood" ADD VALUE 'ok' AFTER 'sad';"#
        );
    }

    #[test]
    fn test_leading_labels_go_before_first_existing_label() {
        let pre = Type::new("500", "mood", TypeKind::Enum)
            .with_enums(vec![labelled("501", "sad", 1.0)]);
        let post = Type::new("500", "mood", TypeKind::Enum).with_enums(vec![
            labelled("501", "unhappy", 1.0),
            labelled("503", "angry", 0.25),
            labelled("504", "tired", 0.5),
        ]);

        let actions = post.diff(Some(&pre), &Context::new("public")).unwrap();
        let sql: Vec<String> = actions.iter().map(|a| a.to_sql().unwrap()).collect();

        assert_eq!(
            sql,
            vec![
                r#"ALTER TYPE "public"."mood" RENAME VALUE 'sad' TO 'unhappy';"#,
                r#"ALTER TYPE "public"."mood" ADD VALUE 'angry' BEFORE 'unhappy';"#,
                r#"ALTER TYPE "public"."mood" ADD VALUE 'tired' AFTER 'angry';"#,
            ]
        );
    }

    #[test]
    fn test_kind_change_keeping_name_is_unsupported() {
        let pre = Type::new("600", "address", TypeKind::Composite);
        let post = Type::new("600", "address", TypeKind::Domain);

        let actions = post.diff(Some(&pre), &Context::new("public")).unwrap();

        assert_eq!(actions.len(), 1);
        assert!(matches!(
            actions[0].to_sql(),
            Err(crate::error::Error::Unsupported { .. })
        ));
    }

    #[test]
    fn test_composite_attribute_type_change() {
        let pre = Type::new("600", "address", TypeKind::Composite)
            .with_attributes(vec![Attribute::new(1, "zip", "int4")]);
        let post = Type::new("600", "address", TypeKind::Composite)
            .with_attributes(vec![Attribute::new(1, "zip", "text")]);

        let actions = post.diff(Some(&pre), &Context::new("public")).unwrap();

        assert_eq!(
            actions,
            vec![Action::AlterAttribute {
                schema_name: "public".to_string(),
                type_name: "address".to_string(),
                source_name: "zip".to_string(),
                target_name: "zip".to_string(),
                source_type: "int4".to_string(),
                target_type: "text".to_string(),
            }]
        );
    }

    #[test]
    fn test_children_are_linked_to_type() {
        let ty = mood();
        assert!(ty.enums.iter().all(|e| e.parent == Parent::new("500", "mood")));
    }
}
