//! Resolve `$ref` targets against the visited tables.
use std::collections::HashMap;

use crate::model::{ReferenceType, ResolvedReference, ResolvedTable, Table, UnresolvedReference, ValidationError};

/// Every reference on every table is attempted; any failure fails the whole set.
pub fn resolve(tables: Vec<Table>) -> Result<Vec<ResolvedTable>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut resolved_refs = Vec::with_capacity(tables.len());
    {
        // first table wins on a (deliberate) name collision
        let mut by_name: HashMap<&str, &Table> = HashMap::new();
        for table in &tables {
            by_name.entry(table.name.as_str()).or_insert(table);
        }

        for table in &tables {
            let mut references = Vec::new();
            for reference in &table.unresolved_references {
                match resolve_one(&by_name, reference) {
                    Ok(resolved) => references.push(resolved),
                    Err(error) => errors.push(error),
                }
            }
            resolved_refs.push(references);
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let resolved: Vec<ResolvedTable> = tables
        .into_iter()
        .zip(resolved_refs)
        .map(|(table, references)| ResolvedTable { table, references })
        .collect();
    tracing::debug!(
        references = resolved.iter().map(|t| t.references.len()).sum::<usize>(),
        "references resolved"
    );
    Ok(resolved)
}

fn resolve_one(
    tables: &HashMap<&str, &Table>,
    reference: &UnresolvedReference,
) -> Result<ResolvedReference, ValidationError> {
    let target = &reference.target_path;
    let segments: Vec<&str> = target.split('/').skip(1).collect();
    let (column_name, table_segments) = match segments.split_last() {
        Some((column, table)) => (*column, table),
        None => ("", &[][..]),
    };
    let table_name = table_segments.join("_");

    let fail = |message: String| {
        let mut path = reference.schema_path.clone();
        path.push(reference.name.clone());
        ValidationError { path, message }
    };

    let Some(table) = tables.get(table_name.as_str()) else {
        return Err(fail(format!("{target} references unknown table \"{table_name}\"")));
    };
    let Some(column) = table.column(column_name) else {
        return Err(fail(format!(
            "{target} references unknown column \"{column_name}\" in table \"{table_name}\""
        )));
    };
    let kind = ReferenceType::try_from(column.kind).map_err(|disallowed| {
        fail(format!(
            "{target} references disallowed \"{}\" type column \"{column_name}\" in table \"{table_name}\"",
            disallowed.as_str()
        ))
    })?;

    Ok(ResolvedReference {
        name: reference.name.clone(),
        kind,
        target_table: table.name.clone(),
        target_column: column.name.clone(),
        cardinality: reference.cardinality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, Column, ColumnAttrs, StorageType};

    fn table(name: &str, columns: &[(&str, StorageType)], refs: &[(&str, &str)]) -> Table {
        Table {
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|(n, k)| Column::new(*n, *k, ColumnAttrs::default()))
                .collect(),
            unresolved_references: refs
                .iter()
                .map(|(n, target)| UnresolvedReference {
                    name: n.to_string(),
                    target_path: target.to_string(),
                    schema_path: vec!["properties".into(), name.into(), "properties".into()],
                    cardinality: Cardinality::One,
                })
                .collect(),
            ..Table::default()
        }
    }

    #[test]
    fn carries_the_target_type() {
        let tables = vec![
            table("posts", &[("id", StorageType::Integer)], &[("author", "#/users/id")]),
            table("users", &[("id", StorageType::Uuid)], &[]),
        ];
        let resolved = resolve(tables).unwrap();
        assert_eq!(
            resolved[0].references,
            vec![ResolvedReference {
                name: "author".into(),
                kind: ReferenceType::Uuid,
                target_table: "users".into(),
                target_column: "id".into(),
                cardinality: Cardinality::One,
            }]
        );
        assert!(resolved[1].references.is_empty());
    }

    #[test]
    fn multi_segment_paths_join_into_table_names() {
        let tables = vec![
            table("company_departments", &[("id", StorageType::String)], &[]),
            table("audit", &[], &[("department", "#/company/departments/id")]),
        ];
        let resolved = resolve(tables).unwrap();
        assert_eq!(resolved[1].references[0].target_table, "company_departments");
        assert_eq!(resolved[1].references[0].kind, ReferenceType::String);
    }

    #[test]
    fn collects_every_failure() {
        let tables = vec![
            table(
                "posts",
                &[("id", StorageType::String)],
                &[
                    ("a", "#/users/id"),
                    ("b", "#/tags/name"),
                    ("c", "#/tags/created"),
                    ("d", "#/tags/score"),
                    ("e", "#/tags/id"),
                ],
            ),
            table(
                "tags",
                &[("id", StorageType::Integer), ("created", StorageType::Datetime), ("score", StorageType::Number)],
                &[],
            ),
        ];
        let errors = resolve(tables).unwrap_err();
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "#/users/id references unknown table \"users\"",
                "#/tags/name references unknown column \"name\" in table \"tags\"",
                "#/tags/created references disallowed \"datetime\" type column \"created\" in table \"tags\"",
                "#/tags/score references disallowed \"number\" type column \"score\" in table \"tags\"",
            ]
        );
        assert_eq!(errors[0].path, ["properties", "posts", "properties", "a"]);
    }

    #[test]
    fn references_to_reference_columns_are_unknown() {
        let tables = vec![
            table("users", &[("id", StorageType::Integer)], &[("team", "#/teams/id")]),
            table("teams", &[("id", StorageType::Integer)], &[]),
            table("posts", &[], &[("team", "#/users/team")]),
        ];
        let errors = resolve(tables).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "#/users/team references unknown column \"team\" in table \"users\"");
    }
}
