//! Two-pass DDL generation over resolved tables, in list order (children first).
//!
//! Pass 1 creates every table and its column-level extras and records the
//! matching rollback. Pass 2 adds reference columns and their constraints once
//! every target table exists.
use serde::Serialize;

use crate::model::{Cardinality, Column, ResolvedReference, ResolvedTable, StorageType};
use crate::render::{self, Check, ColumnDef, CreateTable, DefaultValue, Dialect, SqlType, TableOp};

/// Ordered statements: run `up` front to back to build, `down` front to back to tear down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Queries {
    pub up: Vec<String>,
    pub down: Vec<String>,
}

pub fn generate(tables: &[ResolvedTable], dialect: Dialect) -> Queries {
    let mut up_ops = Vec::new();
    let mut down_ops = Vec::new();

    for resolved in tables {
        create_ops(resolved, dialect, &mut up_ops, &mut down_ops);
    }
    for resolved in tables {
        reference_ops(resolved, dialect, &mut up_ops);
    }

    let queries = Queries {
        up: up_ops.iter().map(|op| render::render(op, dialect)).collect(),
        down: down_ops.iter().map(|op| render::render(op, dialect)).collect(),
    };
    tracing::debug!(up = queries.up.len(), down = queries.down.len(), ?dialect, "statements generated");
    queries
}

// ————————————————————————————————————————————————————————————————————————————
// PASS 1
// ————————————————————————————————————————————————————————————————————————————

fn create_ops(resolved: &ResolvedTable, dialect: Dialect, up: &mut Vec<TableOp>, down: &mut Vec<TableOp>) {
    let table = &resolved.table;
    down.push(TableOp::DropTable { name: table.name.clone() });

    let mut create = CreateTable {
        name: table.name.clone(),
        columns: Vec::with_capacity(table.columns.len()),
        checks: Vec::new(),
        primary_key: primary_key(resolved),
    };
    let mut enum_types = Vec::new();
    let mut comments = Vec::new();
    let mut indexes = Vec::new();
    let mut uniques = Vec::new();

    for column in &table.columns {
        let mut def = ColumnDef::new(&column.name, SqlType::from(column.kind));

        if let Some(values) = &column.enum_values {
            let name = format!("{}_{}_enum", table.name, column.name);
            let values: Vec<String> = values.iter().map(ToString::to_string).collect();
            if dialect.native_enum_types() {
                enum_types.push(TableOp::CreateEnumType { name: name.clone(), values: values.clone() });
                down.push(TableOp::DropType { name: name.clone() });
            }
            def.ty = SqlType::Enum { name, values };
        }

        def.not_null = table.required.contains(&column.name) || column.metadata.not_null;
        let raw_default = column.metadata.default.as_ref().filter(|d| !d.is_empty());
        def.default = match (&column.default, raw_default) {
            (Some(literal), _) => Some(DefaultValue::Literal(literal.to_string())),
            (None, Some(raw)) => Some(DefaultValue::Raw(raw.clone())),
            (None, None) => None,
        };

        if let Some(comment) = comment(column) {
            if !dialect.inline_comments() {
                comments.push(TableOp::CommentOnColumn {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    comment: comment.clone(),
                });
            }
            def.comment = Some(comment);
        }

        if column.kind == StorageType::Integer && (column.minimum.is_some() || column.maximum.is_some()) {
            create.checks.push(Check {
                column: column.name.clone(),
                minimum: column.minimum.clone(),
                maximum: column.maximum.clone(),
            });
        }
        if column.metadata.index {
            indexes.push(TableOp::CreateIndex { table: table.name.clone(), column: column.name.clone() });
        }
        if column.metadata.unique {
            uniques.push(TableOp::AddUnique { table: table.name.clone(), column: column.name.clone() });
        }

        create.columns.push(def);
    }
    if folds_references(resolved, dialect) {
        create.columns.extend(resolved.references.iter().map(reference_column));
    }

    up.extend(enum_types);
    up.push(TableOp::CreateTable(create));
    up.extend(comments);
    up.extend(indexes);
    up.extend(uniques);
}

/// Explicit key wins, else a stored column literally named `id`.
fn primary_key(resolved: &ResolvedTable) -> Option<String> {
    let table = &resolved.table;
    match &table.primary_key {
        Some(key) => Some(key.clone()),
        None => table.column("id").map(|c| c.name.clone()),
    }
}

fn comment(column: &Column) -> Option<String> {
    if let Some(comment) = column.metadata.comment.as_ref().filter(|c| !c.is_empty()) {
        return Some(comment.clone());
    }
    match (&column.title, &column.description) {
        (Some(title), Some(description)) => Some(format!("{title}: {description}")),
        (Some(title), None) => Some(title.clone()),
        (None, Some(description)) => Some(description.clone()),
        (None, None) => None,
    }
}

/// A table made only of references cannot be created empty on every dialect;
/// there its reference columns are declared up front and pass 2 only adds constraints.
fn folds_references(resolved: &ResolvedTable, dialect: Dialect) -> bool {
    resolved.table.columns.is_empty() && !resolved.references.is_empty() && !dialect.allows_empty_tables()
}

/// Reference columns take the referenced column's type.
fn reference_column(reference: &ResolvedReference) -> ColumnDef {
    ColumnDef::new(&reference.name, SqlType::from(StorageType::from(reference.kind)))
}

// ————————————————————————————————————————————————————————————————————————————
// PASS 2
// ————————————————————————————————————————————————————————————————————————————

fn reference_ops(resolved: &ResolvedTable, dialect: Dialect, up: &mut Vec<TableOp>) {
    if resolved.references.is_empty() {
        return;
    }
    let table = &resolved.table.name;
    if !folds_references(resolved, dialect) {
        let columns = resolved.references.iter().map(reference_column).collect();
        up.push(TableOp::AddColumns { table: table.clone(), columns });
    }

    for reference in &resolved.references {
        up.push(TableOp::AddForeignKey {
            table: table.clone(),
            column: reference.name.clone(),
            target_table: reference.target_table.clone(),
            target_column: reference.target_column.clone(),
        });
        if reference.cardinality == Cardinality::One {
            up.push(TableOp::AddUnique { table: table.clone(), column: reference.name.clone() });
        }
    }
}
