//! Typed trees shared by every compiler stage. No `serde_json::Value` past validation.
//!
//! Two layers live here:
//! - the *validated schema* (`DatabaseSchema` → `TableSchema` → `ColumnSchema`), a closed
//!   tagged union produced by `validate` and consumed by `visit`;
//! - the *normalized tables* (`Table`, `Column`, references) produced by `visit`,
//!   `resolve` and consumed by `generate`.
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

// ————————————————————————————————————————————————————————————————————————————
// VALIDATED SCHEMA
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default)]
pub struct DatabaseSchema {
    /// Top-level tables in declaration order.
    pub tables: IndexMap<String, TableSchema>,
}

#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub properties: IndexMap<String, ColumnSchema>,
    pub required: Vec<String>,
    /// `x-primary-key`
    pub primary_key: Option<String>,
}

impl TableSchema {
    /// Column a child table points back to: the explicit key, else `id`.
    pub fn key_or_id(&self) -> &str {
        self.primary_key.as_deref().unwrap_or("id")
    }
}

#[derive(Debug, Clone)]
pub enum ColumnSchema {
    Literal { kind: LiteralKind, attrs: ColumnAttrs },
    String { format: Option<StringFormat>, attrs: ColumnAttrs },
    /// `object`/`array` stored whole in a json/jsonb column.
    Json { shape: JsonShape, storage: JsonStorage, attrs: ColumnAttrs },
    Reference { target: String },
    Object(TableSchema),
    Array(Box<ColumnSchema>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Boolean,
    Number,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Uuid,
    Date,
    /// `datetime`
    Datetime,
    /// `date-time`
    DateTime,
    Email,
}

impl StringFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uuid" => Some(Self::Uuid),
            "date" => Some(Self::Date),
            "datetime" => Some(Self::Datetime),
            "date-time" => Some(Self::DateTime),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::DateTime => "date-time",
            Self::Email => "email",
        }
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Datetime | Self::DateTime)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonStorage {
    Json,
    Jsonb,
}

/// Attributes every stored (non-reference, non-nested) column may carry.
#[derive(Debug, Clone, Default)]
pub struct ColumnAttrs {
    pub default: Option<Scalar>,
    pub enum_values: Option<Vec<Scalar>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub minimum: Option<serde_json::Number>,
    pub maximum: Option<serde_json::Number>,
    pub metadata: Metadata,
}

/// Column `metadata` object. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metadata {
    pub index: bool,
    pub unique: bool,
    /// Raw SQL default expression, rendered verbatim.
    pub default: Option<String>,
    pub not_null: bool,
    pub comment: Option<String>,
    #[serde(rename = "type")]
    pub storage: Option<JsonStorage>,
}

/// A `default`/`enum` literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl Scalar {
    pub fn from_json(v: &serde_json::Value) -> Option<Self> {
        match v {
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Number(n) => Some(Self::Number(n.clone())),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            _ => None,
        }
    }
}

/// Text form used inside quoted SQL literals. Booleans follow the `'1'`/`'0'` convention.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Bool(true) => f.write_str("1"),
            Scalar::Bool(false) => f.write_str("0"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// NORMALIZED TABLES
// ————————————————————————————————————————————————————————————————————————————

/// Storage type of a visited column. `format` wins over `type` when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Uuid,
    String,
    Email,
    Date,
    Datetime,
    DateTime,
    Boolean,
    Number,
    Integer,
    Json,
    Jsonb,
}

impl StorageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::String => "string",
            Self::Email => "email",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::DateTime => "date-time",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Json => "json",
            Self::Jsonb => "jsonb",
        }
    }
}

impl From<LiteralKind> for StorageType {
    fn from(kind: LiteralKind) -> Self {
        match kind {
            LiteralKind::Boolean => Self::Boolean,
            LiteralKind::Number => Self::Number,
            LiteralKind::Integer => Self::Integer,
        }
    }
}

impl From<StringFormat> for StorageType {
    fn from(format: StringFormat) -> Self {
        match format {
            StringFormat::Uuid => Self::Uuid,
            StringFormat::Date => Self::Date,
            StringFormat::Datetime => Self::Datetime,
            StringFormat::DateTime => Self::DateTime,
            StringFormat::Email => Self::Email,
        }
    }
}

impl From<JsonStorage> for StorageType {
    fn from(storage: JsonStorage) -> Self {
        match storage {
            JsonStorage::Json => Self::Json,
            JsonStorage::Jsonb => Self::Jsonb,
        }
    }
}

/// Types a foreign key may take. Temporal and `number` columns are unreferenceable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    String,
    Boolean,
    Integer,
    Uuid,
    Email,
    Json,
    Jsonb,
}

impl TryFrom<StorageType> for ReferenceType {
    type Error = StorageType;

    fn try_from(ty: StorageType) -> Result<Self, Self::Error> {
        match ty {
            StorageType::String => Ok(Self::String),
            StorageType::Boolean => Ok(Self::Boolean),
            StorageType::Integer => Ok(Self::Integer),
            StorageType::Uuid => Ok(Self::Uuid),
            StorageType::Email => Ok(Self::Email),
            StorageType::Json => Ok(Self::Json),
            StorageType::Jsonb => Ok(Self::Jsonb),
            StorageType::Date | StorageType::Datetime | StorageType::DateTime | StorageType::Number => {
                Err(ty)
            }
        }
    }
}

impl From<ReferenceType> for StorageType {
    fn from(ty: ReferenceType) -> Self {
        match ty {
            ReferenceType::String => Self::String,
            ReferenceType::Boolean => Self::Boolean,
            ReferenceType::Integer => Self::Integer,
            ReferenceType::Uuid => Self::Uuid,
            ReferenceType::Email => Self::Email,
            ReferenceType::Json => Self::Json,
            ReferenceType::Jsonb => Self::Jsonb,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    /// Child side of a one-to-many; never unique.
    Many,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: StorageType,
    pub default: Option<Scalar>,
    pub enum_values: Option<Vec<Scalar>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub minimum: Option<serde_json::Number>,
    pub maximum: Option<serde_json::Number>,
    pub metadata: Metadata,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: StorageType, attrs: ColumnAttrs) -> Self {
        Self {
            name: name.into(),
            kind,
            default: attrs.default,
            enum_values: attrs.enum_values,
            title: attrs.title,
            description: attrs.description,
            minimum: attrs.minimum,
            maximum: attrs.maximum,
            metadata: attrs.metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedReference {
    pub name: String,
    /// `#/<table>.../<column>`
    pub target_path: String,
    /// Location of the referencing property's parent, for error reporting.
    pub schema_path: Vec<String>,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReference {
    pub name: String,
    /// Always the referenced column's type.
    pub kind: ReferenceType,
    pub target_table: String,
    pub target_column: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// `_`-joined path from the schema root.
    pub name: String,
    pub required: IndexSet<String>,
    pub primary_key: Option<String>,
    pub columns: Vec<Column>,
    pub unresolved_references: Vec<UnresolvedReference>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTable {
    pub table: Table,
    pub references: Vec<ResolvedReference>,
}

// ————————————————————————————————————————————————————————————————————————————
// ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} at {}", .path.join("/"))]
pub struct ValidationError {
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl IntoIterator<Item = impl Into<String>>, message: impl Into<String>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }
}
