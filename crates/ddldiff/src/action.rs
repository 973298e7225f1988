//! Concrete DDL actions produced by reconciliation.
//!
//! Actions are plain records. They serialize with an explicit `kind` tag so
//! a stored action list decodes back into the same variants:
//!
//! ```text
//! {"kind":"alter_schema","source_name":"app","target_name":"billing"}
//! ```
//!
//! Names are carried unqualified together with the schema they live in;
//! [`Action::to_sql`] renders them fully qualified.

use crate::catalog::{RelationKind, TypeKind};
use crate::error::{Error, Result};
use crate::sql::{Ident, Lit, Qualified};
use crate::target::TargetExpression;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    CreateSchema {
        schema_name: String,
    },
    /// Rename; `schema_name()` reports the new name.
    AlterSchema {
        source_name: String,
        target_name: String,
    },
    DropSchema {
        schema_name: String,
    },

    CreateTable {
        schema_name: String,
        table_name: String,
        relation_kind: RelationKind,
    },
    AlterTable {
        schema_name: String,
        source_name: String,
        target_name: String,
    },
    DropTable {
        schema_name: String,
        table_name: String,
    },

    CreateColumn {
        schema_name: String,
        table_name: String,
        column_name: String,
        data_type: String,
    },
    /// Rename and/or type change of one column.
    AlterColumn {
        schema_name: String,
        table_name: String,
        source_name: String,
        target_name: String,
        source_type: String,
        target_type: String,
    },
    DropColumn {
        schema_name: String,
        table_name: String,
        column_name: String,
    },

    CreateIndex {
        schema_name: String,
        table_name: String,
        index_name: String,
        index_def: String,
    },
    /// Rename; `index_def` is set when the index must be rebuilt.
    /// `constraint` marks an index owned by a primary key, unique or
    /// exclusion constraint.
    AlterIndex {
        schema_name: String,
        table_name: String,
        source_name: String,
        target_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index_def: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        constraint: bool,
    },
    DropIndex {
        schema_name: String,
        table_name: String,
        index_name: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        constraint: bool,
    },

    CreateType {
        schema_name: String,
        type_name: String,
        type_kind: TypeKind,
    },
    AlterType {
        schema_name: String,
        source_name: String,
        target_name: String,
    },
    DropType {
        schema_name: String,
        type_name: String,
    },

    /// New label, placed next to an existing neighbour when one is known.
    CreateEnum {
        schema_name: String,
        type_name: String,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after: Option<String>,
    },
    AlterEnum {
        schema_name: String,
        type_name: String,
        source_label: String,
        target_label: String,
    },
    DropEnum {
        schema_name: String,
        type_name: String,
        label: String,
    },

    CreateAttribute {
        schema_name: String,
        type_name: String,
        attribute_name: String,
        data_type: String,
    },
    AlterAttribute {
        schema_name: String,
        type_name: String,
        source_name: String,
        target_name: String,
        source_type: String,
        target_type: String,
    },
    DropAttribute {
        schema_name: String,
        type_name: String,
        attribute_name: String,
    },

    CreateFunction {
        schema_name: String,
        function_name: String,
        function_def: String,
        arguments: String,
    },
    /// `arguments` is the prior signature, needed to address the function.
    /// `target_arguments` is set when the signature changed, in which case
    /// the prior overload is dropped before `function_def` is applied.
    AlterFunction {
        schema_name: String,
        source_name: String,
        target_name: String,
        arguments: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_arguments: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function_def: Option<String>,
    },
    DropFunction {
        schema_name: String,
        function_name: String,
        arguments: String,
    },

    CreateExtension {
        schema_name: String,
        extension_name: String,
    },
    AlterExtension {
        schema_name: String,
        source_name: String,
        target_name: String,
    },
    DropExtension {
        schema_name: String,
        extension_name: String,
    },
}

impl Action {
    /// The serialized `kind` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateSchema { .. } => "create_schema",
            Action::AlterSchema { .. } => "alter_schema",
            Action::DropSchema { .. } => "drop_schema",
            Action::CreateTable { .. } => "create_table",
            Action::AlterTable { .. } => "alter_table",
            Action::DropTable { .. } => "drop_table",
            Action::CreateColumn { .. } => "create_column",
            Action::AlterColumn { .. } => "alter_column",
            Action::DropColumn { .. } => "drop_column",
            Action::CreateIndex { .. } => "create_index",
            Action::AlterIndex { .. } => "alter_index",
            Action::DropIndex { .. } => "drop_index",
            Action::CreateType { .. } => "create_type",
            Action::AlterType { .. } => "alter_type",
            Action::DropType { .. } => "drop_type",
            Action::CreateEnum { .. } => "create_enum",
            Action::AlterEnum { .. } => "alter_enum",
            Action::DropEnum { .. } => "drop_enum",
            Action::CreateAttribute { .. } => "create_attribute",
            Action::AlterAttribute { .. } => "alter_attribute",
            Action::DropAttribute { .. } => "drop_attribute",
            Action::CreateFunction { .. } => "create_function",
            Action::AlterFunction { .. } => "alter_function",
            Action::DropFunction { .. } => "drop_function",
            Action::CreateExtension { .. } => "create_extension",
            Action::AlterExtension { .. } => "alter_extension",
            Action::DropExtension { .. } => "drop_extension",
        }
    }

    /// Schema the action applies to.
    pub fn schema_name(&self) -> &str {
        match self {
            Action::AlterSchema { target_name, .. } => target_name.as_str(),
            Action::CreateSchema { schema_name }
            | Action::DropSchema { schema_name }
            | Action::CreateTable { schema_name, .. }
            | Action::AlterTable { schema_name, .. }
            | Action::DropTable { schema_name, .. }
            | Action::CreateColumn { schema_name, .. }
            | Action::AlterColumn { schema_name, .. }
            | Action::DropColumn { schema_name, .. }
            | Action::CreateIndex { schema_name, .. }
            | Action::AlterIndex { schema_name, .. }
            | Action::DropIndex { schema_name, .. }
            | Action::CreateType { schema_name, .. }
            | Action::AlterType { schema_name, .. }
            | Action::DropType { schema_name, .. }
            | Action::CreateEnum { schema_name, .. }
            | Action::AlterEnum { schema_name, .. }
            | Action::DropEnum { schema_name, .. }
            | Action::CreateAttribute { schema_name, .. }
            | Action::AlterAttribute { schema_name, .. }
            | Action::DropAttribute { schema_name, .. }
            | Action::CreateFunction { schema_name, .. }
            | Action::AlterFunction { schema_name, .. }
            | Action::DropFunction { schema_name, .. }
            | Action::CreateExtension { schema_name, .. }
            | Action::AlterExtension { schema_name, .. }
            | Action::DropExtension { schema_name, .. } => schema_name.as_str(),
        }
    }

    /// Table the action applies to, for table, column and index actions.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Action::AlterTable { target_name, .. } => Some(target_name.as_str()),
            Action::CreateTable { table_name, .. }
            | Action::DropTable { table_name, .. }
            | Action::CreateColumn { table_name, .. }
            | Action::AlterColumn { table_name, .. }
            | Action::DropColumn { table_name, .. }
            | Action::CreateIndex { table_name, .. }
            | Action::AlterIndex { table_name, .. }
            | Action::DropIndex { table_name, .. } => Some(table_name.as_str()),
            _ => None,
        }
    }

    /// Whether a target subscribed with `expression` should receive this
    /// action. Renames match on either side of the rename.
    pub fn filter(&self, expression: &TargetExpression) -> bool {
        let schema = self.schema_name();
        match self {
            Action::AlterSchema { source_name, .. } => {
                expression.matches(schema, None) || expression.matches(source_name, None)
            }
            Action::AlterTable { source_name, .. } => {
                expression.matches(schema, self.table_name())
                    || expression.matches(schema, Some(source_name))
            }
            _ => expression.matches(schema, self.table_name()),
        }
    }

    /// Render PostgreSQL DDL. Multi-statement renderings are newline separated.
    pub fn to_sql(&self) -> Result<String> {
        let sql = match self {
            Action::CreateSchema { schema_name } => {
                format!("CREATE SCHEMA {};", Ident(schema_name))
            }
            Action::AlterSchema {
                source_name,
                target_name,
            } => format!(
                "ALTER SCHEMA {} RENAME TO {};",
                Ident(source_name),
                Ident(target_name)
            ),
            Action::DropSchema { schema_name } => {
                format!("DROP SCHEMA {} CASCADE;", Ident(schema_name))
            }

            Action::CreateTable {
                schema_name,
                table_name,
                relation_kind,
            } => match relation_kind {
                RelationKind::Ordinary => {
                    format!("CREATE TABLE {} ();", Qualified(schema_name, table_name))
                }
                _ => return Err(self.unsupported()),
            },
            // Same name means the relation kind changed, which has no ALTER
            Action::AlterTable {
                source_name,
                target_name,
                ..
            } if source_name == target_name => return Err(self.unsupported()),
            Action::AlterTable {
                schema_name,
                source_name,
                target_name,
            } => format!(
                "ALTER TABLE {} RENAME TO {};",
                Qualified(schema_name, source_name),
                Ident(target_name)
            ),
            Action::DropTable {
                schema_name,
                table_name,
            } => format!("DROP TABLE {} CASCADE;", Qualified(schema_name, table_name)),

            Action::CreateColumn {
                schema_name,
                table_name,
                column_name,
                data_type,
            } => format!(
                "ALTER TABLE {} ADD COLUMN {} {};",
                Qualified(schema_name, table_name),
                Ident(column_name),
                data_type
            ),
            Action::AlterColumn {
                schema_name,
                table_name,
                source_name,
                target_name,
                source_type,
                target_type,
            } => {
                let table = Qualified(schema_name, table_name);
                let mut statements = Vec::new();
                if source_name != target_name {
                    statements.push(format!(
                        "ALTER TABLE {table} RENAME COLUMN {} TO {};",
                        Ident(source_name),
                        Ident(target_name)
                    ));
                }
                if source_type != target_type {
                    statements.push(format!(
                        "ALTER TABLE {table} ALTER COLUMN {column} TYPE {target_type} USING {column}::{target_type};",
                        column = Ident(target_name),
                    ));
                }
                statements.join("\n")
            }
            Action::DropColumn {
                schema_name,
                table_name,
                column_name,
            } => format!(
                "ALTER TABLE {} DROP COLUMN {};",
                Qualified(schema_name, table_name),
                Ident(column_name)
            ),

            Action::CreateIndex { index_def, .. } => statement(index_def),
            // Rebuilding a constraint's index means rebuilding the constraint
            Action::AlterIndex {
                index_def: Some(_),
                constraint: true,
                ..
            } => return Err(self.unsupported()),
            Action::AlterIndex {
                schema_name,
                source_name,
                target_name,
                index_def,
                ..
            } => {
                let mut statements = Vec::new();
                if source_name != target_name {
                    statements.push(format!(
                        "ALTER INDEX {} RENAME TO {};",
                        Qualified(schema_name, source_name),
                        Ident(target_name)
                    ));
                }
                if let Some(index_def) = index_def {
                    statements.push(format!(
                        "DROP INDEX {};",
                        Qualified(schema_name, target_name)
                    ));
                    statements.push(statement(index_def));
                }
                statements.join("\n")
            }
            Action::DropIndex {
                schema_name,
                table_name,
                index_name,
                constraint: true,
            } => format!(
                "ALTER TABLE {} DROP CONSTRAINT {};",
                Qualified(schema_name, table_name),
                Ident(index_name)
            ),
            Action::DropIndex {
                schema_name,
                index_name,
                ..
            } => format!("DROP INDEX {};", Qualified(schema_name, index_name)),

            Action::CreateType {
                schema_name,
                type_name,
                type_kind,
            } => {
                let body = match type_kind {
                    TypeKind::Enum => "ENUM ()",
                    TypeKind::Composite => "()",
                    _ => return Err(self.unsupported()),
                };
                format!("CREATE TYPE {} AS {body};", Qualified(schema_name, type_name))
            }
            Action::AlterType {
                source_name,
                target_name,
                ..
            } if source_name == target_name => return Err(self.unsupported()),
            Action::AlterType {
                schema_name,
                source_name,
                target_name,
            } => format!(
                "ALTER TYPE {} RENAME TO {};",
                Qualified(schema_name, source_name),
                Ident(target_name)
            ),
            Action::DropType {
                schema_name,
                type_name,
            } => format!("DROP TYPE {} CASCADE;", Qualified(schema_name, type_name)),

            Action::CreateEnum {
                schema_name,
                type_name,
                label,
                before,
                after,
            } => {
                let placement = match (after, before) {
                    (Some(after), _) => format!(" AFTER {}", Lit(after)),
                    (None, Some(before)) => format!(" BEFORE {}", Lit(before)),
                    (None, None) => String::new(),
                };
                format!(
                    "ALTER TYPE {} ADD VALUE {}{placement};",
                    Qualified(schema_name, type_name),
                    Lit(label)
                )
            }
            Action::AlterEnum {
                schema_name,
                type_name,
                source_label,
                target_label,
            } => format!(
                "ALTER TYPE {} RENAME VALUE {} TO {};",
                Qualified(schema_name, type_name),
                Lit(source_label),
                Lit(target_label)
            ),
            // PostgreSQL cannot remove a label from an enum
            Action::DropEnum { .. } => return Err(self.unsupported()),

            Action::CreateAttribute {
                schema_name,
                type_name,
                attribute_name,
                data_type,
            } => format!(
                "ALTER TYPE {} ADD ATTRIBUTE {} {};",
                Qualified(schema_name, type_name),
                Ident(attribute_name),
                data_type
            ),
            Action::AlterAttribute {
                schema_name,
                type_name,
                source_name,
                target_name,
                source_type,
                target_type,
            } => {
                let ty = Qualified(schema_name, type_name);
                let mut statements = Vec::new();
                if source_name != target_name {
                    statements.push(format!(
                        "ALTER TYPE {ty} RENAME ATTRIBUTE {} TO {};",
                        Ident(source_name),
                        Ident(target_name)
                    ));
                }
                if source_type != target_type {
                    statements.push(format!(
                        "ALTER TYPE {ty} ALTER ATTRIBUTE {} TYPE {target_type};",
                        Ident(target_name)
                    ));
                }
                statements.join("\n")
            }
            Action::DropAttribute {
                schema_name,
                type_name,
                attribute_name,
            } => format!(
                "ALTER TYPE {} DROP ATTRIBUTE {};",
                Qualified(schema_name, type_name),
                Ident(attribute_name)
            ),

            Action::CreateFunction { function_def, .. } => statement(function_def),
            Action::AlterFunction {
                schema_name,
                source_name,
                target_name,
                arguments,
                target_arguments,
                function_def,
            } => {
                let mut statements = Vec::new();
                if source_name != target_name {
                    statements.push(format!(
                        "ALTER FUNCTION {}({arguments}) RENAME TO {};",
                        Qualified(schema_name, source_name),
                        Ident(target_name)
                    ));
                }
                // CREATE OR REPLACE with new arguments adds an overload
                if target_arguments.is_some() {
                    statements.push(format!(
                        "DROP FUNCTION {}({arguments});",
                        Qualified(schema_name, target_name)
                    ));
                }
                if let Some(function_def) = function_def {
                    statements.push(statement(function_def));
                }
                statements.join("\n")
            }
            Action::DropFunction {
                schema_name,
                function_name,
                arguments,
            } => format!(
                "DROP FUNCTION {}({arguments});",
                Qualified(schema_name, function_name)
            ),

            Action::CreateExtension {
                schema_name,
                extension_name,
            } => format!(
                "CREATE EXTENSION IF NOT EXISTS {} SCHEMA {};",
                Ident(extension_name),
                Ident(schema_name)
            ),
            Action::AlterExtension {
                schema_name,
                source_name,
                target_name,
            } => format!(
                "DROP EXTENSION IF EXISTS {};\nCREATE EXTENSION IF NOT EXISTS {} SCHEMA {};",
                Ident(source_name),
                Ident(target_name),
                Ident(schema_name)
            ),
            Action::DropExtension { extension_name, .. } => {
                format!("DROP EXTENSION IF EXISTS {};", Ident(extension_name))
            }
        };

        Ok(sql)
    }

    fn unsupported(&self) -> Error {
        Error::Unsupported {
            action: self.to_string(),
        }
    }
}

/// Terminate a catalog-provided definition with exactly one semicolon.
fn statement(definition: &str) -> String {
    format!("{};", definition.trim_end().trim_end_matches(';'))
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateSchema { schema_name } => write!(f, "+ schema {schema_name}"),
            Action::AlterSchema {
                source_name,
                target_name,
            } => write!(f, "~ schema {source_name} -> {target_name}"),
            Action::DropSchema { schema_name } => write!(f, "- schema {schema_name}"),

            Action::CreateTable {
                schema_name,
                table_name,
                relation_kind,
            } => write!(f, "+ table {schema_name}.{table_name} ({relation_kind})"),
            Action::AlterTable {
                schema_name,
                source_name,
                target_name,
            } => write!(f, "~ table {schema_name}.{source_name} -> {target_name}"),
            Action::DropTable {
                schema_name,
                table_name,
            } => write!(f, "- table {schema_name}.{table_name}"),

            Action::CreateColumn {
                schema_name,
                table_name,
                column_name,
                data_type,
            } => write!(f, "+ column {schema_name}.{table_name}.{column_name}: {data_type}"),
            Action::AlterColumn {
                schema_name,
                table_name,
                source_name,
                target_name,
                source_type,
                target_type,
            } => write!(
                f,
                "~ column {schema_name}.{table_name}.{source_name}: {source_type} -> {target_name}: {target_type}"
            ),
            Action::DropColumn {
                schema_name,
                table_name,
                column_name,
            } => write!(f, "- column {schema_name}.{table_name}.{column_name}"),

            Action::CreateIndex {
                schema_name,
                index_name,
                ..
            } => write!(f, "+ index {schema_name}.{index_name}"),
            Action::AlterIndex {
                schema_name,
                source_name,
                target_name,
                ..
            } => write!(f, "~ index {schema_name}.{source_name} -> {target_name}"),
            Action::DropIndex {
                schema_name,
                index_name,
                ..
            } => write!(f, "- index {schema_name}.{index_name}"),

            Action::CreateType {
                schema_name,
                type_name,
                type_kind,
            } => write!(f, "+ type {schema_name}.{type_name} ({type_kind})"),
            Action::AlterType {
                schema_name,
                source_name,
                target_name,
            } => write!(f, "~ type {schema_name}.{source_name} -> {target_name}"),
            Action::DropType {
                schema_name,
                type_name,
            } => write!(f, "- type {schema_name}.{type_name}"),

            Action::CreateEnum {
                schema_name,
                type_name,
                label,
                ..
            } => write!(f, "+ enum {schema_name}.{type_name} '{label}'"),
            Action::AlterEnum {
                schema_name,
                type_name,
                source_label,
                target_label,
            } => write!(
                f,
                "~ enum {schema_name}.{type_name} '{source_label}' -> '{target_label}'"
            ),
            Action::DropEnum {
                schema_name,
                type_name,
                label,
            } => write!(f, "- enum {schema_name}.{type_name} '{label}'"),

            Action::CreateAttribute {
                schema_name,
                type_name,
                attribute_name,
                data_type,
            } => write!(
                f,
                "+ attribute {schema_name}.{type_name}.{attribute_name}: {data_type}"
            ),
            Action::AlterAttribute {
                schema_name,
                type_name,
                source_name,
                target_name,
                source_type,
                target_type,
            } => write!(
                f,
                "~ attribute {schema_name}.{type_name}.{source_name}: {source_type} -> {target_name}: {target_type}"
            ),
            Action::DropAttribute {
                schema_name,
                type_name,
                attribute_name,
            } => write!(f, "- attribute {schema_name}.{type_name}.{attribute_name}"),

            Action::CreateFunction {
                schema_name,
                function_name,
                arguments,
                ..
            } => write!(f, "+ function {schema_name}.{function_name}({arguments})"),
            Action::AlterFunction {
                schema_name,
                source_name,
                target_name,
                arguments,
                ..
            } => write!(
                f,
                "~ function {schema_name}.{source_name}({arguments}) -> {target_name}"
            ),
            Action::DropFunction {
                schema_name,
                function_name,
                arguments,
            } => write!(f, "- function {schema_name}.{function_name}({arguments})"),

            Action::CreateExtension {
                schema_name,
                extension_name,
            } => write!(f, "+ extension {extension_name} in {schema_name}"),
            Action::AlterExtension {
                source_name,
                target_name,
                ..
            } => write!(f, "~ extension {source_name} -> {target_name}"),
            Action::DropExtension { extension_name, .. } => {
                write!(f, "- extension {extension_name}")
            }
        }
    }
}
