//! Offline reconciliation of two catalog snapshot files.

use anyhow::Context;
use ddldiff::{Action, Catalog, TargetExpression};
use std::fs;
use std::path::Path;

/// How `diff` prints actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// One tagged JSON action per line
    Json,
    /// Rendered PostgreSQL statements
    Sql,
}

fn read_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    Catalog::parse(&json).with_context(|| format!("Invalid snapshot {}", path.display()))
}

/// Actions turning `pre` into `post`, restricted to `target` when given.
/// A missing `pre` means every entity in `post` is created.
pub fn diff_files(
    pre: Option<&Path>,
    post: &Path,
    target: Option<&TargetExpression>,
) -> anyhow::Result<Vec<Action>> {
    let pre = pre.map(read_catalog).transpose()?;
    let post = read_catalog(post)?;

    let actions = post.diff(pre.as_ref()).context("Failed to reconcile snapshots")?;
    Ok(match target {
        Some(target) => actions.into_iter().filter(|a| a.filter(target)).collect(),
        None => actions,
    })
}

/// Render actions as output lines.
pub fn render(actions: &[Action], output: Output) -> anyhow::Result<Vec<String>> {
    actions
        .iter()
        .map(|action| match output {
            Output::Json => serde_json::to_string(action).context("Failed to encode action"),
            Output::Sql => action
                .to_sql()
                .with_context(|| format!("Cannot render {action}")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn snapshot(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    const PRE: &str = r#"[{"oid":"1","schema_name":"public","classes":[
        {"oid":"10","namespace_oid":"1","relation_kind":"r","relation_name":"users"}]}]"#;
    const POST: &str = r#"[{"oid":"1","schema_name":"public","classes":[
        {"oid":"10","namespace_oid":"1","relation_kind":"r","relation_name":"accounts"}]},
        {"oid":"2","schema_name":"audit"}]"#;

    #[test]
    fn test_diff_files_renders_sql() {
        let (pre, post) = (snapshot(PRE), snapshot(POST));

        let actions = diff_files(Some(pre.path()), post.path(), None).unwrap();

        assert_eq!(
            render(&actions, Output::Sql).unwrap(),
            vec![
                r#"ALTER TABLE "public"."users" RENAME TO "accounts";"#.to_string(),
                r#"CREATE SCHEMA "audit";"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_diff_files_filters_by_target() {
        let (pre, post) = (snapshot(PRE), snapshot(POST));
        let target: TargetExpression = "audit.*".parse().unwrap();

        let actions = diff_files(Some(pre.path()), post.path(), Some(&target)).unwrap();

        assert_eq!(
            render(&actions, Output::Json).unwrap(),
            vec![r#"{"kind":"create_schema","schema_name":"audit"}"#.to_string()]
        );
    }

    #[test]
    fn test_missing_pre_is_pure_creation() {
        let post = snapshot(POST);

        let actions = diff_files(None, post.path(), None).unwrap();

        assert_eq!(
            actions.iter().map(Action::name).collect::<Vec<_>>(),
            vec!["create_schema", "create_table", "create_schema"]
        );
    }

    #[test]
    fn test_invalid_snapshot_names_the_file() {
        let post = snapshot("{");
        let err = diff_files(None, post.path(), None).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid snapshot"));
    }
}
