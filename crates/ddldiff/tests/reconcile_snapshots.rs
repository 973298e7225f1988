//! End-to-end reconciliation of serialized catalog snapshots.
//!
//! Each test parses `pre` and `post` snapshots in the introspection format
//! and checks the resulting action list.

use ddldiff::{Action, Catalog, DdlChange, Diffable, Error, Kind, Node, TargetExpression};

const PUBLIC_USERS: &str = r#"[
    {"oid":"2200","schema_name":"public","owner_id":"10","classes":[
        {"oid":"16443","namespace_oid":"2200","relation_kind":"r","relation_name":"users",
         "columns":[
            {"class_oid":"16443","attr_name":"id","attr_num":1,"type_name":"int4","type_oid":"23"},
            {"class_oid":"16443","attr_name":"email","attr_num":2,"type_name":"text","type_oid":"25"}
         ],
         "indexes":[
            {"index_oid":"16450","index_name":"users_pkey","index_def":"CREATE UNIQUE INDEX users_pkey ON public.users USING btree (id)"}
         ]}
    ],"types":null,"functions":null,"extensions":null}
]"#;

fn public_users() -> Catalog {
    Catalog::parse(PUBLIC_USERS).unwrap()
}

#[test]
fn test_unchanged_snapshot_yields_no_actions() {
    let pre = public_users();
    let post = public_users();
    assert!(post.diff(Some(&pre)).unwrap().is_empty());
}

#[test]
fn test_pure_creation_creates_every_entity_once() {
    let post = public_users();

    let actions = post.diff(None).unwrap();

    assert_eq!(actions.len(), post.entity_count());
    assert!(actions.iter().all(|a| a.name().starts_with("create_")));
    assert_eq!(
        actions.iter().map(Action::name).collect::<Vec<_>>(),
        vec![
            "create_schema",
            "create_table",
            "create_column",
            "create_column",
            "create_index"
        ]
    );
}

#[test]
fn test_column_rename_is_one_alter() {
    let pre = public_users();
    let post = Catalog::parse(&PUBLIC_USERS.replace(r#""attr_name":"email""#, r#""attr_name":"email_address""#))
        .unwrap();

    let actions = post.diff(Some(&pre)).unwrap();

    assert_eq!(
        actions,
        vec![Action::AlterColumn {
            schema_name: "public".to_string(),
            table_name: "users".to_string(),
            source_name: "email".to_string(),
            target_name: "email_address".to_string(),
            source_type: "text".to_string(),
            target_type: "text".to_string(),
        }]
    );
    assert_eq!(
        actions[0].to_sql().unwrap(),
        r#"ALTER TABLE "public"."users" RENAME COLUMN "email" TO "email_address";"#
    );
}

#[test]
fn test_table_rename_keeps_children() {
    let pre = public_users();
    let post = Catalog::parse(
        &PUBLIC_USERS.replace(r#""relation_name":"users""#, r#""relation_name":"accounts""#),
    )
    .unwrap();

    let actions = post.diff(Some(&pre)).unwrap();

    assert_eq!(
        actions,
        vec![Action::AlterTable {
            schema_name: "public".to_string(),
            source_name: "users".to_string(),
            target_name: "accounts".to_string(),
        }]
    );
}

#[test]
fn test_dropped_table_is_a_single_drop() {
    let pre = public_users();
    let post = Catalog::parse(r#"[{"oid":"2200","schema_name":"public","classes":null}]"#).unwrap();

    let actions = post.diff(Some(&pre)).unwrap();

    assert_eq!(
        actions,
        vec![Action::DropTable {
            schema_name: "public".to_string(),
            table_name: "users".to_string(),
        }]
    );
}

#[test]
fn test_drop_then_recreate_is_not_a_rename() {
    let pre = public_users();
    let post = Catalog::parse(&PUBLIC_USERS.replace(r#""oid":"16443""#, r#""oid":"16500""#)).unwrap();

    let actions = post.diff(Some(&pre)).unwrap();
    let names: Vec<&str> = actions.iter().map(Action::name).collect();

    assert_eq!(names.iter().filter(|n| **n == "create_table").count(), 1);
    assert_eq!(names.iter().filter(|n| **n == "drop_table").count(), 1);
    assert!(!names.contains(&"alter_table"));
}

#[test]
fn test_enum_type_created_before_table_using_it() {
    let post = Catalog::parse(
        r#"[{"oid":"2200","schema_name":"public",
             "classes":[{"oid":"1","namespace_oid":"2200","relation_kind":"r","relation_name":"people",
                         "columns":[{"class_oid":"1","attr_name":"mood","attr_num":1,"type_name":"mood","type_oid":"2"}]}],
             "types":[{"oid":"2","type_name":"mood","type_type":"e",
                       "enums":[{"oid":"3","enum_label":"sad","enum_sort_order":1},
                                {"oid":"4","enum_label":"happy","enum_sort_order":2}]}]}]"#,
    )
    .unwrap();

    let pre = Catalog::parse(r#"[{"oid":"2200","schema_name":"public"}]"#).unwrap();
    let sql: Vec<String> = post
        .diff(Some(&pre))
        .unwrap()
        .iter()
        .map(|a| a.to_sql().unwrap())
        .collect();

    assert_eq!(
        sql,
        vec![
            r#"CREATE TYPE "public"."mood" AS ENUM ();"#,
            r#"ALTER TYPE "public"."mood" ADD VALUE 'sad';"#,
            r#"ALTER TYPE "public"."mood" ADD VALUE 'happy' AFTER 'sad';"#,
            r#"CREATE TABLE "public"."people" ();"#,
            r#"ALTER TABLE "public"."people" ADD COLUMN "mood" mood;"#,
        ]
    );
}

#[test]
fn test_duplicate_oids_are_rejected() {
    let post = Catalog::parse(
        r#"[{"oid":"1","schema_name":"a"},{"oid":"1","schema_name":"b"}]"#,
    )
    .unwrap();

    match post.diff(None) {
        Err(Error::DuplicateIdentity { kind, .. }) => assert_eq!(kind, Kind::Schema),
        other => panic!("Expected DuplicateIdentity, got {other:?}"),
    }
}

#[test]
fn test_every_entity_is_equal_to_itself() {
    let catalog = public_users();
    let mut stack: Vec<Node<'_>> = catalog.schemas.iter().map(Node::Schema).collect();
    let mut seen = 0;
    while let Some(node) = stack.pop() {
        assert!(node.is_equal(&node), "{} not equal to itself", node.kind());
        stack.extend(node.child_nodes());
        seen += 1;
    }
    assert_eq!(seen, catalog.entity_count());
}

#[test]
fn test_ddl_change_filtered_for_target() {
    let change = DdlChange::parse(&format!(
        r#"{{"pre":null,"post":{}}}"#,
        PUBLIC_USERS.replace('\n', " ")
    ))
    .unwrap();
    let actions = change.actions().unwrap();

    let replica: TargetExpression = "public.users".parse().unwrap();
    let audit: TargetExpression = "audit.*".parse().unwrap();

    assert_eq!(actions.iter().filter(|a| a.filter(&replica)).count(), actions.len());
    assert_eq!(actions.iter().filter(|a| a.filter(&audit)).count(), 0);
}
