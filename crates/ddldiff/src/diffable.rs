//! The contract every catalog entity implements.
//!
//! Composite entities ([`Schema`], [`Table`], [`Type`]) reconcile their child
//! collections through [`crate::reconcile`]; leaf entities only compare their
//! own attributes. [`Node`] closes the set of entity kinds so code that walks
//! a heterogeneous tree can match exhaustively.

use crate::action::Action;
use crate::catalog::{Attribute, Column, Enum, Extension, Function, Index, Schema, Table, Type};
use crate::context::Context;
use crate::error::{Error, Result};
use std::fmt;

/// Entity kinds present in a catalog snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Schema,
    Table,
    Column,
    Index,
    Type,
    Enum,
    Attribute,
    Function,
    Extension,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Schema => "schema",
            Kind::Table => "table",
            Kind::Column => "column",
            Kind::Index => "index",
            Kind::Type => "type",
            Kind::Enum => "enum",
            Kind::Attribute => "attribute",
            Kind::Function => "function",
            Kind::Extension => "extension",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable key used to pair an entity across two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity<'a> {
    /// Catalog object id assigned by the source database
    Oid(&'a str),
    /// Attribute number, for entities that share their parent's oid
    Number(i32),
    /// Fallback when no oid is available
    Name(&'a str),
}

impl<'a> Identity<'a> {
    /// Oid when the snapshot carries one, otherwise the name.
    pub fn oid_or_name(oid: &'a str, name: &'a str) -> Self {
        if oid.is_empty() {
            Identity::Name(name)
        } else {
            Identity::Oid(oid)
        }
    }
}

impl fmt::Display for Identity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Oid(oid) => write!(f, "oid {oid}"),
            Identity::Number(num) => write!(f, "number {num}"),
            Identity::Name(name) => write!(f, "name {name}"),
        }
    }
}

/// Capability set shared by every catalog entity.
pub trait Diffable {
    /// Kind of this entity.
    fn kind(&self) -> Kind;

    /// Key used to match this entity against the prior snapshot.
    fn identity(&self) -> Identity<'_>;

    /// Actions turning `prior` into `self`.
    ///
    /// With no prior this is one create action followed by the creation of
    /// every child. With a prior that is not [`Diffable::is_equal`] this is
    /// one alter action followed by the reconciled children; an equal prior
    /// only yields the children's actions.
    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>>;

    /// The single action removing this entity. Children are left to the
    /// target's cascading drop.
    fn drop_actions(&self, ctx: &Context<'_>) -> Vec<Action>;

    /// Structural equality ignoring identity.
    fn is_equal(&self, other: &Self) -> bool;

    /// Child entities in creation order.
    fn children(&self) -> Vec<Node<'_>>;
}

/// A borrowed catalog entity of any kind.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Schema(&'a Schema),
    Table(&'a Table),
    Column(&'a Column),
    Index(&'a Index),
    Type(&'a Type),
    Enum(&'a Enum),
    Attribute(&'a Attribute),
    Function(&'a Function),
    Extension(&'a Extension),
}

macro_rules! each_node {
    ($node:expr, $inner:ident => $body:expr) => {
        match $node {
            Node::Schema($inner) => $body,
            Node::Table($inner) => $body,
            Node::Column($inner) => $body,
            Node::Index($inner) => $body,
            Node::Type($inner) => $body,
            Node::Enum($inner) => $body,
            Node::Attribute($inner) => $body,
            Node::Function($inner) => $body,
            Node::Extension($inner) => $body,
        }
    };
}

impl<'a> Node<'a> {
    /// Like [`Diffable::children`], but borrowed for the lifetime of the
    /// snapshot rather than of this node.
    pub fn child_nodes(self) -> Vec<Node<'a>> {
        each_node!(self, inner => inner.children())
    }

    /// Number of entities in the subtree rooted at this node, itself included.
    pub fn count(&self) -> usize {
        1 + self.child_nodes().iter().map(Node::count).sum::<usize>()
    }
}

impl Diffable for Node<'_> {
    fn kind(&self) -> Kind {
        each_node!(self, inner => inner.kind())
    }

    fn identity(&self) -> Identity<'_> {
        each_node!(self, inner => inner.identity())
    }

    fn diff(&self, prior: Option<&Self>, ctx: &Context<'_>) -> Result<Vec<Action>> {
        let Some(prior) = prior else {
            return each_node!(self, inner => inner.diff(None, ctx));
        };

        match (self, prior) {
            (Node::Schema(post), Node::Schema(pre)) => post.diff(Some(*pre), ctx),
            (Node::Table(post), Node::Table(pre)) => post.diff(Some(*pre), ctx),
            (Node::Column(post), Node::Column(pre)) => post.diff(Some(*pre), ctx),
            (Node::Index(post), Node::Index(pre)) => post.diff(Some(*pre), ctx),
            (Node::Type(post), Node::Type(pre)) => post.diff(Some(*pre), ctx),
            (Node::Enum(post), Node::Enum(pre)) => post.diff(Some(*pre), ctx),
            (Node::Attribute(post), Node::Attribute(pre)) => post.diff(Some(*pre), ctx),
            (Node::Function(post), Node::Function(pre)) => post.diff(Some(*pre), ctx),
            (Node::Extension(post), Node::Extension(pre)) => post.diff(Some(*pre), ctx),
            (post, pre) => Err(Error::KindMismatch {
                expected: pre.kind(),
                found: post.kind(),
            }),
        }
    }

    fn drop_actions(&self, ctx: &Context<'_>) -> Vec<Action> {
        each_node!(self, inner => inner.drop_actions(ctx))
    }

    fn is_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Schema(a), Node::Schema(b)) => a.is_equal(b),
            (Node::Table(a), Node::Table(b)) => a.is_equal(b),
            (Node::Column(a), Node::Column(b)) => a.is_equal(b),
            (Node::Index(a), Node::Index(b)) => a.is_equal(b),
            (Node::Type(a), Node::Type(b)) => a.is_equal(b),
            (Node::Enum(a), Node::Enum(b)) => a.is_equal(b),
            (Node::Attribute(a), Node::Attribute(b)) => a.is_equal(b),
            (Node::Function(a), Node::Function(b)) => a.is_equal(b),
            (Node::Extension(a), Node::Extension(b)) => a.is_equal(b),
            _ => false,
        }
    }

    fn children(&self) -> Vec<Node<'_>> {
        each_node!(self, inner => inner.children())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_falls_back_to_name() {
        assert_eq!(Identity::oid_or_name("42", "users"), Identity::Oid("42"));
        assert_eq!(Identity::oid_or_name("", "users"), Identity::Name("users"));
    }

    #[test]
    fn test_node_diff_rejects_kind_mismatch() {
        let schema = Schema::new("100", "public");
        let table = Table::new("100", crate::RelationKind::Ordinary, "public");

        let result = Node::Schema(&schema).diff(Some(&Node::Table(&table)), &Context::root());

        match result {
            Err(Error::KindMismatch { expected, found }) => {
                assert_eq!(expected, Kind::Table);
                assert_eq!(found, Kind::Schema);
            }
            other => panic!("Expected KindMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_node_diff_dispatches_matching_kinds() {
        let pre = Schema::new("100", "public");
        let post = Schema::new("100", "app");

        let actions = Node::Schema(&post)
            .diff(Some(&Node::Schema(&pre)), &Context::root())
            .unwrap();

        assert_eq!(
            actions,
            vec![Action::AlterSchema {
                source_name: "public".to_string(),
                target_name: "app".to_string(),
            }]
        );
    }

    #[test]
    fn test_node_count_includes_descendants() {
        let schema = Schema::new("1", "public").with_tables(vec![Table::new(
            "2",
            crate::RelationKind::Ordinary,
            "users",
        )
        .with_columns(vec![
            crate::Column::new(1, "id", "int4"),
            crate::Column::new(2, "email", "text"),
        ])]);

        assert_eq!(Node::Schema(&schema).count(), 4);
    }
}
