//! Generic list reconciliation shared by every composite entity.
//!
//! Two sibling lists are paired by [`Diffable::identity`]. Each post entity
//! is either matched to a prior entity (and diffed against it, which yields
//! an alter when the two are not equal and recurses into children) or is new.
//! Prior entities with no match are dropped. Renames fall out of identity
//! matching: same oid, different name.

use crate::action::Action;
use crate::context::Context;
use crate::diffable::{Diffable, Identity};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// How a single entity relates across the two snapshots.
#[derive(Debug)]
pub enum Pairing<'a, T> {
    /// Matched and structurally equal; only children may change
    Unchanged { prior: &'a T, post: &'a T },
    /// Matched but not equal: a rename or attribute change
    Altered { prior: &'a T, post: &'a T },
    /// Present only in the post snapshot
    Created(&'a T),
    /// Present only in the prior snapshot
    Dropped(&'a T),
}

/// Pair two sibling lists by identity.
///
/// Matched and new entities come first in post order, followed by the
/// unmatched prior entities in prior order.
pub fn pair<'a, T: Diffable>(prior: &'a [T], post: &'a [T]) -> Result<Vec<Pairing<'a, T>>> {
    ensure_unique(prior)?;
    ensure_unique(post)?;

    let by_identity: HashMap<Identity<'a>, &'a T> =
        prior.iter().map(|entity| (entity.identity(), entity)).collect();
    let post_identities: HashSet<Identity<'a>> = post.iter().map(Diffable::identity).collect();

    let mut pairings = Vec::with_capacity(prior.len().max(post.len()));
    for entity in post {
        let pairing = match by_identity.get(&entity.identity()) {
            Some(&prior) if entity.is_equal(prior) => Pairing::Unchanged {
                prior,
                post: entity,
            },
            Some(&prior) => Pairing::Altered {
                prior,
                post: entity,
            },
            None => Pairing::Created(entity),
        };
        pairings.push(pairing);
    }

    pairings.extend(
        prior
            .iter()
            .filter(|entity| !post_identities.contains(&entity.identity()))
            .map(Pairing::Dropped),
    );

    Ok(pairings)
}

/// Result of reconciling one sibling list, with drops kept apart so a
/// composite can order them against its other collections.
#[derive(Debug, Default)]
pub struct Reconciled {
    /// Creates and alters (with their recursive child actions), in post order
    pub changes: Vec<Action>,
    /// One drop per removed entity, in prior order
    pub drops: Vec<Action>,
}

impl Reconciled {
    pub fn into_actions(mut self) -> Vec<Action> {
        self.changes.append(&mut self.drops);
        self.changes
    }
}

/// Reconcile `prior` against `post`, keeping changes and drops apart.
pub fn reconcile_parts<T: Diffable>(
    prior: &[T],
    post: &[T],
    ctx: &Context<'_>,
) -> Result<Reconciled> {
    let mut reconciled = Reconciled::default();

    for pairing in pair(prior, post)? {
        match pairing {
            Pairing::Created(entity) => {
                debug!("Creating {} {}", entity.kind(), entity.identity());
                reconciled.changes.extend(entity.diff(None, ctx)?);
            }
            Pairing::Altered { prior, post } => {
                debug!("Altering {} {}", post.kind(), post.identity());
                reconciled.changes.extend(post.diff(Some(prior), ctx)?);
            }
            Pairing::Unchanged { prior, post } => {
                reconciled.changes.extend(post.diff(Some(prior), ctx)?);
            }
            Pairing::Dropped(entity) => {
                debug!("Dropping {} {}", entity.kind(), entity.identity());
                reconciled.drops.extend(entity.drop_actions(ctx));
            }
        }
    }

    Ok(reconciled)
}

/// Actions transforming the `prior` sibling list into `post`: changes
/// first, then drops.
pub fn reconcile<T: Diffable>(prior: &[T], post: &[T], ctx: &Context<'_>) -> Result<Vec<Action>> {
    Ok(reconcile_parts(prior, post, ctx)?.into_actions())
}

fn ensure_unique<T: Diffable>(entities: &[T]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entities.len());
    for entity in entities {
        let identity = entity.identity();
        if !seen.insert(identity) {
            return Err(Error::DuplicateIdentity {
                kind: entity.kind(),
                identity: identity.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, RelationKind, Schema, Table};
    use crate::diffable::Kind;

    fn table(oid: &str, name: &str) -> Table {
        Table::new(oid, RelationKind::Ordinary, name)
    }

    #[test]
    fn test_pair_classifies_every_entity() {
        let prior = vec![table("1", "kept"), table("2", "old_name"), table("3", "gone")];
        let post = vec![table("1", "kept"), table("2", "new_name"), table("4", "fresh")];

        let pairings = pair(&prior, &post).unwrap();

        assert_eq!(pairings.len(), 4);
        assert!(matches!(pairings[0], Pairing::Unchanged { post, .. } if post.name == "kept"));
        assert!(matches!(
            pairings[1],
            Pairing::Altered { prior, post } if prior.name == "old_name" && post.name == "new_name"
        ));
        assert!(matches!(pairings[2], Pairing::Created(t) if t.name == "fresh"));
        assert!(matches!(pairings[3], Pairing::Dropped(t) if t.name == "gone"));
    }

    #[test]
    fn test_same_name_new_oid_is_drop_and_create() {
        let prior = vec![table("1", "users")];
        let post = vec![table("2", "users")];

        let actions = reconcile(&prior, &post, &Context::new("public")).unwrap();

        assert_eq!(
            actions,
            vec![
                Action::CreateTable {
                    schema_name: "public".to_string(),
                    table_name: "users".to_string(),
                    relation_kind: RelationKind::Ordinary,
                },
                Action::DropTable {
                    schema_name: "public".to_string(),
                    table_name: "users".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let post = vec![
            Column::new(1, "id", "int4"),
            Column::new(1, "other_id", "int4"),
        ];

        match reconcile(&[], &post, &Context::new("public").with_parent("users")) {
            Err(Error::DuplicateIdentity { kind, identity }) => {
                assert_eq!(kind, Kind::Column);
                assert_eq!(identity, "number 1");
            }
            other => panic!("Expected DuplicateIdentity, got {other:?}"),
        }
    }

    #[test]
    fn test_identical_lists_yield_nothing() {
        let schemas = vec![Schema::new("1", "public").with_tables(vec![
            table("2", "users").with_columns(vec![Column::new(1, "id", "int4")])
        ])];

        assert!(reconcile(&schemas, &schemas, &Context::root())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_names_are_used_when_oids_are_missing() {
        let prior = vec![table("", "users")];
        let post = vec![table("", "users"), table("", "orders")];

        let actions = reconcile(&prior, &post, &Context::new("public")).unwrap();

        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], Action::CreateTable { table_name, .. } if table_name == "orders"));
    }
}
