//! Schema validation: raw JSON document → typed `DatabaseSchema`.
//!
//! Two tiers:
//! - `syntax`: generic well-formedness, fail-fast with a single `["#"]` error;
//! - structural rules (reference syntax, primary keys, required fields, nesting),
//!   accumulated across every table before returning.
pub mod metadata;
pub mod syntax;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::model::{
    ColumnAttrs, ColumnSchema, DatabaseSchema, JsonShape, LiteralKind, Metadata, Scalar, StringFormat,
    TableSchema, ValidationError,
};

pub const SYNTAX_ERROR_MESSAGE: &str = "Invalid JSON Schema syntax";

// ------------------------------- Front API -------------------------------- //

pub fn validate(raw: &Value) -> Result<DatabaseSchema, Vec<ValidationError>> {
    if !syntax::is_valid_document(raw) {
        tracing::warn!("rejecting document: {SYNTAX_ERROR_MESSAGE}");
        return Err(vec![ValidationError::new(["#"], SYNTAX_ERROR_MESSAGE)]);
    }

    let mut v = Validator::default();
    let mut tables = IndexMap::new();

    // `is_valid_document` guarantees an object root with object `properties`.
    let empty = Map::new();
    let properties = raw.get("properties").and_then(Value::as_object).unwrap_or(&empty);
    for (name, table) in properties {
        let path = vec!["properties".to_string(), name.clone()];
        let parsed = table
            .as_object()
            .filter(|obj| obj.get("type").and_then(Value::as_str) == Some("object"))
            .and_then(|obj| obj.get("properties").and_then(Value::as_object).map(|props| (obj, props)));
        match parsed {
            Some((obj, props)) => {
                let table = v.table(obj, props, &path);
                tables.insert(name.clone(), table);
            }
            None => v.error(path, "Tables must be object schemas with \"properties\""),
        }
    }

    if v.errors.is_empty() {
        tracing::debug!(tables = tables.len(), "schema validated");
        Ok(DatabaseSchema { tables })
    } else {
        Err(v.errors)
    }
}

// ------------------------------- Validator -------------------------------- //

#[derive(Default)]
struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    fn error(&mut self, path: Vec<String>, message: impl Into<String>) {
        self.errors.push(ValidationError { path, message: message.into() });
    }

    /// Parse a table's columns, then apply the table-level rules.
    fn table(&mut self, obj: &Map<String, Value>, props: &Map<String, Value>, path: &[String]) -> TableSchema {
        let mut properties = IndexMap::new();
        for (key, raw) in props {
            let column_path = child(path, ["properties", key.as_str()]);
            if let Some(column) = self.column(raw, &column_path) {
                properties.insert(key.clone(), column);
            }
        }

        let required: Vec<String> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|xs| xs.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let primary_key = obj.get("x-primary-key").and_then(Value::as_str).map(str::to_string);

        let table = TableSchema { properties, required, primary_key };
        self.table_rules(&table, props, path);
        table
    }

    /// Key and nesting rules look at each property's declared shape, so they
    /// still apply when the column itself failed to parse.
    fn table_rules(&mut self, table: &TableSchema, raw_props: &Map<String, Value>, path: &[String]) {
        if table.primary_key.is_none() {
            if let Some(problem) = raw_props.get("id").and_then(|id| Declared::of(id).key_problem()) {
                let message = match problem {
                    KeyProblem::Reference => {
                        "\"id\" is considered a primary key when \"x-primary-key\" is missing and cannot be a \"$ref\""
                            .to_string()
                    }
                    KeyProblem::Type(ty) => format!(
                        "\"id\" is considered a primary key when \"x-primary-key\" is missing and cannot be of type \"{ty}\""
                    ),
                    KeyProblem::Format(format) => format!(
                        "\"id\" is considered a primary key when \"x-primary-key\" is missing and cannot be of type \"string\" format \"{format}\""
                    ),
                };
                self.error(path.to_vec(), message);
            }
        }

        if !raw_props.contains_key("id") && table.primary_key.is_none() {
            let nested = raw_props
                .iter()
                .find_map(|(name, raw)| Declared::of(raw).nested_kind().map(|kind| (name, kind)));
            if let Some((name, kind)) = nested {
                self.error(
                    path.to_vec(),
                    format!(
                        "Must have an \"id\" property or a custom primary key via \"x-primary-key\" because it has nested \"{name}\" of type \"{kind}\""
                    ),
                );
            }
        }

        for field in &table.required {
            if !raw_props.contains_key(field) {
                self.error(path.to_vec(), format!("Requires missing field \"{field}\""));
            }
        }

        if let Some(pk) = &table.primary_key {
            let Some(raw) = raw_props.get(pk) else {
                self.error(path.to_vec(), format!("Refers to unknown field \"{pk}\""));
                return;
            };
            if let Some(problem) = Declared::of(raw).key_problem() {
                let message = match problem {
                    KeyProblem::Reference => "Primary key cannot be a \"$ref\"".to_string(),
                    KeyProblem::Type(ty) => format!("Primary key cannot be of type \"{ty}\""),
                    KeyProblem::Format(format) => {
                        format!("Primary key cannot be of type \"string\" format \"{format}\"")
                    }
                };
                self.error(path.to_vec(), message);
            }
        }
    }

    fn column(&mut self, raw: &Value, path: &[String]) -> Option<ColumnSchema> {
        let Some(obj) = raw.as_object() else {
            self.error(path.to_vec(), "Unsupported column schema");
            return None;
        };

        if let Some(target) = obj.get("$ref").and_then(Value::as_str) {
            self.reference_syntax(target, path);
            return Some(ColumnSchema::Reference { target: target.to_string() });
        }

        match obj.get("type").and_then(Value::as_str) {
            Some("boolean") => self.literal(obj, LiteralKind::Boolean, path),
            Some("number") => self.literal(obj, LiteralKind::Number, path),
            Some("integer") => self.literal(obj, LiteralKind::Integer, path),
            Some("string") => {
                let format = match obj.get("format").and_then(Value::as_str) {
                    None => None,
                    Some(raw) => match StringFormat::parse(raw) {
                        Some(format) => Some(format),
                        None => {
                            self.error(child(path, ["format"]), format!("Unsupported string format \"{raw}\""));
                            None
                        }
                    },
                };
                let attrs = self.attrs(obj, path)?;
                Some(ColumnSchema::String { format, attrs })
            }
            Some("object") => self.object(obj, path),
            Some("array") => self.array(obj, path),
            _ => {
                self.error(path.to_vec(), "Unsupported column schema");
                None
            }
        }
    }

    fn literal(&mut self, obj: &Map<String, Value>, kind: LiteralKind, path: &[String]) -> Option<ColumnSchema> {
        let attrs = self.attrs(obj, path)?;
        Some(ColumnSchema::Literal { kind, attrs })
    }

    fn object(&mut self, obj: &Map<String, Value>, path: &[String]) -> Option<ColumnSchema> {
        let attrs = self.attrs(obj, path)?;
        if let Some(storage) = attrs.metadata.storage {
            return Some(ColumnSchema::Json { shape: JsonShape::Object, storage, attrs });
        }
        let Some(props) = obj.get("properties").and_then(Value::as_object) else {
            self.error(path.to_vec(), "Object columns must declare \"properties\"");
            return None;
        };
        Some(ColumnSchema::Object(self.table(obj, props, path)))
    }

    fn array(&mut self, obj: &Map<String, Value>, path: &[String]) -> Option<ColumnSchema> {
        let attrs = self.attrs(obj, path)?;
        if let Some(storage) = attrs.metadata.storage {
            return Some(ColumnSchema::Json { shape: JsonShape::Array, storage, attrs });
        }
        let Some(items) = obj.get("items").filter(|items| items.is_object()) else {
            self.error(path.to_vec(), "Array columns must declare \"items\"");
            return None;
        };
        if items.get("type").and_then(Value::as_str) == Some("array") {
            self.error(path.to_vec(), "Arrays cannot directly contain arrays");
            return None;
        }
        let items = self.column(items, &child(path, ["items"]))?;
        Some(ColumnSchema::Array(Box::new(items)))
    }

    /// Both rules are checked independently; both may fire for one `$ref`.
    fn reference_syntax(&mut self, target: &str, path: &[String]) {
        let ref_path = child(path, ["$ref"]);
        if !target.starts_with("#/") {
            self.error(ref_path.clone(), "$ref must start with \"#/\"");
        }
        if target.split('/').count() < 3 {
            self.error(ref_path, "$ref must include at least one table and a column, e.g. \"#/users/id\"");
        }
    }

    fn attrs(&mut self, obj: &Map<String, Value>, path: &[String]) -> Option<ColumnAttrs> {
        let mut ok = true;

        let default = match obj.get("default") {
            None => None,
            Some(v) => {
                let scalar = Scalar::from_json(v);
                if scalar.is_none() {
                    self.error(child(path, ["default"]), "Default must be a string, number or boolean");
                    ok = false;
                }
                scalar
            }
        };

        let enum_values = match obj.get("enum").and_then(Value::as_array) {
            None => None,
            Some(xs) => {
                let values: Option<Vec<Scalar>> = xs.iter().map(Scalar::from_json).collect();
                if values.is_none() {
                    self.error(child(path, ["enum"]), "Enum values must be strings, numbers or booleans");
                    ok = false;
                }
                values
            }
        };

        let metadata = match obj.get("metadata") {
            None => Metadata::default(),
            Some(raw) => match metadata::from_value_with_path::<Metadata>(raw.clone()) {
                Ok(md) => md,
                Err((segments, message)) => {
                    let mut err_path = child(path, ["metadata"]);
                    err_path.extend(segments);
                    self.error(err_path, format!("Invalid metadata: {message}"));
                    ok = false;
                    Metadata::default()
                }
            },
        };

        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let number = |key: &str| match obj.get(key) {
            Some(Value::Number(n)) => Some(n.clone()),
            _ => None,
        };

        ok.then(|| ColumnAttrs {
            default,
            enum_values,
            title: text("title"),
            description: text("description"),
            minimum: number("minimum"),
            maximum: number("maximum"),
            metadata,
        })
    }
}

// ------------------------------- Utilities -------------------------------- //

enum KeyProblem {
    Reference,
    Type(&'static str),
    Format(&'static str),
}

/// What a raw property declares itself to be, independent of whether it parses.
enum Declared {
    Reference,
    /// Normalized into its own table.
    Nested(&'static str),
    /// `object`/`array` stored in a json/jsonb column.
    Json(&'static str),
    Number,
    String(Option<StringFormat>),
    Other,
}

impl Declared {
    fn of(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else { return Self::Other };
        if obj.get("$ref").is_some_and(Value::is_string) {
            return Self::Reference;
        }
        let json_storage = obj
            .get("metadata")
            .and_then(|md| md.get("type"))
            .and_then(Value::as_str)
            .is_some_and(|ty| matches!(ty, "json" | "jsonb"));
        match obj.get("type").and_then(Value::as_str) {
            Some("object") if json_storage => Self::Json("object"),
            Some("object") => Self::Nested("object"),
            Some("array") if json_storage => Self::Json("array"),
            Some("array") => Self::Nested("array"),
            Some("number") => Self::Number,
            Some("string") => Self::String(obj.get("format").and_then(Value::as_str).and_then(StringFormat::parse)),
            _ => Self::Other,
        }
    }

    fn nested_kind(&self) -> Option<&'static str> {
        match self {
            Self::Nested(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Why the property cannot serve as a primary key, if it cannot.
    fn key_problem(&self) -> Option<KeyProblem> {
        match self {
            Self::Reference => Some(KeyProblem::Reference),
            Self::Nested(kind) | Self::Json(kind) => Some(KeyProblem::Type(*kind)),
            Self::Number => Some(KeyProblem::Type("number")),
            Self::String(Some(format)) if format.is_temporal() => Some(KeyProblem::Format(format.as_str())),
            Self::String(_) | Self::Other => None,
        }
    }
}

fn child<'a>(path: &[String], segments: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out = path.to_vec();
    out.extend(segments.into_iter().map(str::to_string));
    out
}

// ------------------------------- Tests ------------------------------------ //
