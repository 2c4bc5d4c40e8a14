//! Flatten the validated schema tree into relational tables.
//!
//! Depth-first: every nested object / array becomes its own table, emitted
//! *before* the table containing it. Nested tables get a synthetic reference
//! back to their parent's key, injected into a fresh copy of the nested schema.
use crate::model::{
    Cardinality, Column, ColumnSchema, DatabaseSchema, StorageType, Table, TableSchema, UnresolvedReference,
};

pub fn visit(schema: &DatabaseSchema) -> Vec<Table> {
    let mut visitor = Visitor::default();
    for (name, table) in &schema.tables {
        visitor.table(name, table, &[], &["properties".to_string()], Cardinality::One);
    }
    tracing::debug!(tables = visitor.tables.len(), "schema visited");
    visitor.tables
}

#[derive(Default)]
struct Visitor {
    tables: Vec<Table>,
}

impl Visitor {
    /// `path` holds the enclosing table names, `schema_path` the document location
    /// of the enclosing properties map. References declared on an array-derived
    /// table are all `Many`.
    fn table(
        &mut self,
        name: &str,
        schema: &TableSchema,
        path: &[String],
        schema_path: &[String],
        cardinality: Cardinality,
    ) {
        let mut table_path = path.to_vec();
        table_path.push(name.to_string());

        let mut columns_schema_path = schema_path.to_vec();
        columns_schema_path.push(name.to_string());
        if cardinality == Cardinality::Many {
            columns_schema_path.push("items".to_string());
        }
        columns_schema_path.push("properties".to_string());

        let mut table = Table {
            name: table_path.join("_"),
            required: schema.required.iter().cloned().collect(),
            primary_key: schema.primary_key.clone(),
            columns: Vec::new(),
            unresolved_references: Vec::new(),
        };

        for (key, column) in &schema.properties {
            match column {
                ColumnSchema::Reference { target } => {
                    table.unresolved_references.push(UnresolvedReference {
                        name: key.clone(),
                        target_path: target.clone(),
                        schema_path: columns_schema_path.clone(),
                        cardinality,
                    });
                }
                ColumnSchema::Object(nested) => {
                    let nested = with_back_reference(nested, schema, &table_path);
                    self.table(key, &nested, &table_path, &columns_schema_path, Cardinality::One);
                }
                ColumnSchema::Array(items) => {
                    let nested = match items.as_ref() {
                        ColumnSchema::Object(item) => with_back_reference(item, schema, &table_path),
                        scalar => {
                            let mut values = TableSchema::default();
                            values.properties.insert("value".to_string(), scalar.clone());
                            with_back_reference(&values, schema, &table_path)
                        }
                    };
                    self.table(key, &nested, &table_path, &columns_schema_path, Cardinality::Many);
                }
                ColumnSchema::Literal { kind, attrs } => {
                    table.columns.push(Column::new(key, StorageType::from(*kind), attrs.clone()));
                }
                ColumnSchema::String { format, attrs } => {
                    let kind = format.map_or(StorageType::String, StorageType::from);
                    table.columns.push(Column::new(key, kind, attrs.clone()));
                }
                ColumnSchema::Json { storage, attrs, .. } => {
                    table.columns.push(Column::new(key, StorageType::from(*storage), attrs.clone()));
                }
            }
        }

        self.tables.push(table);
    }
}

/// Copy of `nested` with an extra `<parent path>_<key>` reference to `#/<parent path>/<key>`.
/// The parent's tree is never touched.
fn with_back_reference(nested: &TableSchema, parent: &TableSchema, parent_path: &[String]) -> TableSchema {
    let key = parent.key_or_id();
    let name = format!("{}_{key}", parent_path.join("_"));
    let target = format!("#/{}/{key}", parent_path.join("/"));

    let mut out = nested.clone();
    out.properties.insert(name, ColumnSchema::Reference { target });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;
    use serde_json::json;

    fn visit_json(schema: serde_json::Value) -> Vec<Table> {
        visit(&validate(&schema).unwrap())
    }

    fn names(tables: &[Table]) -> Vec<&str> {
        tables.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn children_are_emitted_before_parents() {
        let tables = visit_json(json!({
            "type": "object",
            "properties": {
                "company": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "departments": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "id": { "type": "string", "format": "uuid" },
                                    "employees": {
                                        "type": "array",
                                        "items": { "type": "object", "properties": { "id": { "type": "integer" } } }
                                    }
                                }
                            }
                        },
                        "settings": { "type": "object", "properties": { "theme": { "type": "string" } } }
                    }
                },
                "audit": { "type": "object", "properties": { "at": { "type": "string", "format": "date" } } }
            }
        }));
        assert_eq!(
            names(&tables),
            ["company_departments_employees", "company_departments", "company_settings", "company", "audit"]
        );
    }

    #[test]
    fn nested_tables_reference_their_parent_key() {
        let tables = visit_json(json!({
            "type": "object",
            "properties": {
                "users": {
                    "type": "object",
                    "x-primary-key": "name",
                    "properties": {
                        "name": { "type": "string" },
                        "settings": { "type": "object", "properties": { "theme": { "type": "string" } } },
                        "tags": { "type": "array", "items": { "type": "string" } }
                    }
                }
            }
        }));
        let settings = &tables[0];
        assert_eq!(settings.name, "users_settings");
        assert_eq!(
            settings.unresolved_references,
            vec![UnresolvedReference {
                name: "users_name".into(),
                target_path: "#/users/name".into(),
                schema_path: vec!["properties".into(), "users".into(), "properties".into(), "settings".into(), "properties".into()],
                cardinality: Cardinality::One,
            }]
        );

        let tags = &tables[1];
        assert_eq!(tags.name, "users_tags");
        assert_eq!(tags.columns.len(), 1);
        assert_eq!(tags.columns[0].name, "value");
        assert_eq!(tags.columns[0].kind, StorageType::String);
        assert_eq!(tags.unresolved_references[0].target_path, "#/users/name");
        assert_eq!(tags.unresolved_references[0].cardinality, Cardinality::Many);
        assert_eq!(
            tags.unresolved_references[0].schema_path,
            ["properties", "users", "properties", "tags", "items", "properties"]
        );
    }

    #[test]
    fn deep_back_reference_uses_full_parent_path() {
        let tables = visit_json(json!({
            "type": "object",
            "properties": {
                "company": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "departments": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "id": { "type": "string" },
                                    "head": { "type": "object", "properties": { "name": { "type": "string" } } }
                                }
                            }
                        }
                    }
                }
            }
        }));
        let head = &tables[0];
        assert_eq!(head.name, "company_departments_head");
        let back = &head.unresolved_references[0];
        assert_eq!(back.name, "company_departments_id");
        assert_eq!(back.target_path, "#/company/departments/id");
        // an object nested inside an array item is still a single parent row
        assert_eq!(back.cardinality, Cardinality::One);
    }

    #[test]
    fn format_refines_storage_type() {
        let tables = visit_json(json!({
            "type": "object",
            "properties": {
                "users": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "email": { "type": "string", "format": "email" },
                        "born": { "type": "string", "format": "date" },
                        "seen": { "type": "string", "format": "date-time" },
                        "score": { "type": "number" },
                        "age": { "type": "integer" },
                        "active": { "type": "boolean" },
                        "prefs": { "type": "object", "properties": {}, "metadata": { "type": "jsonb" } }
                    }
                }
            }
        }));
        let kinds: Vec<_> = tables[0].columns.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            [
                StorageType::Uuid,
                StorageType::Email,
                StorageType::Date,
                StorageType::DateTime,
                StorageType::Number,
                StorageType::Integer,
                StorageType::Boolean,
                StorageType::Jsonb,
            ]
        );
    }

    #[test]
    fn array_of_references_becomes_join_table() {
        let tables = visit_json(json!({
            "type": "object",
            "properties": {
                "tags": { "type": "object", "properties": { "id": { "type": "integer" } } },
                "posts": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "tags": { "type": "array", "items": { "$ref": "#/tags/id" } }
                    }
                }
            }
        }));
        assert_eq!(names(&tables), ["tags", "posts_tags", "posts"]);
        let join = &tables[1];
        assert!(join.columns.is_empty());
        let refs: Vec<_> = join
            .unresolved_references
            .iter()
            .map(|r| (r.name.as_str(), r.target_path.as_str(), r.cardinality))
            .collect();
        assert_eq!(
            refs,
            [("value", "#/tags/id", Cardinality::Many), ("posts_id", "#/posts/id", Cardinality::Many)]
        );
    }

    #[test]
    fn parent_schema_is_not_mutated() {
        let db = validate(&json!({
            "type": "object",
            "properties": {
                "users": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "settings": { "type": "object", "properties": { "theme": { "type": "string" } } }
                    }
                }
            }
        }))
        .unwrap();
        let first = visit(&db);
        let second = visit(&db);
        assert_eq!(first, second);
        match &db.tables["users"].properties["settings"] {
            ColumnSchema::Object(settings) => assert_eq!(settings.properties.len(), 1),
            other => panic!("unexpected column {other:?}"),
        }
    }
}
