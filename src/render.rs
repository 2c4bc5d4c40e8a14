//! Abstract DDL operations and their dialect-specific SQL text.
//!
//! `render` is deterministic: one `TableOp` in, one `;`-terminated statement out.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::StorageType;

/// SQL dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL
    #[default]
    #[value(alias = "postgres", alias = "postgresql")]
    Pg,
    /// MySQL
    Mysql,
}

impl Dialect {
    /// Enums get their own `create type` / `drop type` statements.
    pub fn native_enum_types(self) -> bool {
        matches!(self, Self::Pg)
    }

    /// `create table t ()` is accepted.
    pub fn allows_empty_tables(self) -> bool {
        matches!(self, Self::Pg)
    }

    /// Column comments are part of the column definition instead of a separate statement.
    pub fn inline_comments(self) -> bool {
        matches!(self, Self::Mysql)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlType {
    Uuid,
    Varchar(u32),
    Json,
    Jsonb,
    Boolean,
    Date,
    Timestamptz,
    Real,
    Integer,
    Enum { name: String, values: Vec<String> },
}

impl From<StorageType> for SqlType {
    fn from(kind: StorageType) -> Self {
        match kind {
            StorageType::Uuid => SqlType::Uuid,
            StorageType::String | StorageType::Email => SqlType::Varchar(255),
            StorageType::Json => SqlType::Json,
            StorageType::Jsonb => SqlType::Jsonb,
            StorageType::Boolean => SqlType::Boolean,
            StorageType::Date => SqlType::Date,
            StorageType::Datetime | StorageType::DateTime => SqlType::Timestamptz,
            StorageType::Number => SqlType::Real,
            StorageType::Integer => SqlType::Integer,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Rendered as a quoted string literal.
    Literal(String),
    /// Rendered verbatim.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: SqlType,
    pub not_null: bool,
    pub default: Option<DefaultValue>,
    pub comment: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self { name: name.into(), ty, not_null: false, default: None, comment: None }
    }
}

/// Range check on one column; at least one bound is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub column: String,
    pub minimum: Option<serde_json::Number>,
    pub maximum: Option<serde_json::Number>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub checks: Vec<Check>,
    pub primary_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableOp {
    CreateEnumType { name: String, values: Vec<String> },
    CreateTable(CreateTable),
    CommentOnColumn { table: String, column: String, comment: String },
    CreateIndex { table: String, column: String },
    AddUnique { table: String, column: String },
    AddColumns { table: String, columns: Vec<ColumnDef> },
    AddForeignKey { table: String, column: String, target_table: String, target_column: String },
    DropTable { name: String },
    DropType { name: String },
}

// ------------------------------- Rendering -------------------------------- //

pub fn render(op: &TableOp, dialect: Dialect) -> String {
    let id = |s: &str| Ident(s.to_string(), dialect).to_string();
    match op {
        TableOp::CreateEnumType { name, values } => {
            let values: Vec<String> = values.iter().map(|v| Lit(v).to_string()).collect();
            format!("create type {} as enum ({});", id(name), values.join(", "))
        }
        TableOp::CreateTable(table) => {
            let mut parts: Vec<String> = table.columns.iter().map(|c| column_def(c, dialect)).collect();
            for check in &table.checks {
                parts.push(check_constraint(&table.name, check, dialect));
            }
            if let Some(pk) = &table.primary_key {
                parts.push(format!(
                    "constraint {} primary key ({})",
                    id(&format!("{}_pkey", table.name)),
                    id(pk)
                ));
            }
            format!("create table {} ({});", id(&table.name), parts.join(", "))
        }
        TableOp::CommentOnColumn { table, column, comment } => {
            format!("comment on column {}.{} is {};", id(table), id(column), Lit(comment))
        }
        TableOp::CreateIndex { table, column } => format!(
            "create index {} on {} ({});",
            id(&format!("{table}_{column}_index")),
            id(table),
            id(column)
        ),
        TableOp::AddUnique { table, column } => format!(
            "alter table {} add constraint {} unique ({});",
            id(table),
            id(&format!("{table}_{column}_unique")),
            id(column)
        ),
        TableOp::AddColumns { table, columns } => {
            let adds: Vec<String> =
                columns.iter().map(|c| format!("add column {}", column_def(c, dialect))).collect();
            format!("alter table {} {};", id(table), adds.join(", "))
        }
        TableOp::AddForeignKey { table, column, target_table, target_column } => format!(
            "alter table {} add constraint {} foreign key ({}) references {} ({});",
            id(table),
            id(&format!("{table}_{column}_foreign")),
            id(column),
            id(target_table),
            id(target_column)
        ),
        TableOp::DropTable { name } => format!("drop table if exists {} cascade;", id(name)),
        TableOp::DropType { name } => format!("drop type {};", id(name)),
    }
}

fn column_def(column: &ColumnDef, dialect: Dialect) -> String {
    let mut out = format!("{} {}", Ident(column.name.clone(), dialect), sql_type(&column.ty, dialect));
    if column.not_null {
        out.push_str(" not null");
    }
    match &column.default {
        Some(DefaultValue::Literal(text)) => out.push_str(&format!(" default {}", Lit(text))),
        Some(DefaultValue::Raw(expr)) => out.push_str(&format!(" default {expr}")),
        None => {}
    }
    if dialect.inline_comments() {
        if let Some(comment) = &column.comment {
            out.push_str(&format!(" comment {}", Lit(comment)));
        }
    }
    out
}

fn check_constraint(table: &str, check: &Check, dialect: Dialect) -> String {
    let column = Ident(check.column.clone(), dialect);
    let mut bounds = Vec::new();
    if let Some(min) = &check.minimum {
        bounds.push(format!("{column} >= {min}"));
    }
    if let Some(max) = &check.maximum {
        bounds.push(format!("{column} <= {max}"));
    }
    format!(
        "constraint {} check ({})",
        Ident(format!("{table}_{}_check", check.column), dialect),
        bounds.join(" and ")
    )
}

fn sql_type(ty: &SqlType, dialect: Dialect) -> String {
    match (ty, dialect) {
        (SqlType::Varchar(n), _) => format!("varchar({n})"),
        (SqlType::Json, _) => "json".to_string(),
        (SqlType::Boolean, _) => "boolean".to_string(),
        (SqlType::Date, _) => "date".to_string(),

        (SqlType::Uuid, Dialect::Pg) => "uuid".to_string(),
        (SqlType::Jsonb, Dialect::Pg) => "jsonb".to_string(),
        (SqlType::Timestamptz, Dialect::Pg) => "timestamptz".to_string(),
        (SqlType::Real, Dialect::Pg) => "real".to_string(),
        (SqlType::Integer, Dialect::Pg) => "integer".to_string(),
        (SqlType::Enum { name, .. }, Dialect::Pg) => Ident(name.clone(), dialect).to_string(),

        (SqlType::Uuid, Dialect::Mysql) => "char(36)".to_string(),
        (SqlType::Jsonb, Dialect::Mysql) => "json".to_string(),
        (SqlType::Timestamptz, Dialect::Mysql) => "datetime".to_string(),
        (SqlType::Real, Dialect::Mysql) => "float".to_string(),
        (SqlType::Integer, Dialect::Mysql) => "int".to_string(),
        (SqlType::Enum { values, .. }, Dialect::Mysql) => {
            let values: Vec<String> = values.iter().map(|v| Lit(v).to_string()).collect();
            format!("enum({})", values.join(", "))
        }
    }
}

/// A quoted identifier: `"x"` for pg, `` `x` `` for mysql, quote chars doubled.
struct Ident(String, Dialect);

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = match self.1 {
            Dialect::Pg => '"',
            Dialect::Mysql => '`',
        };
        write!(f, "{quote}")?;
        for c in self.0.chars() {
            if c == quote {
                write!(f, "{quote}{quote}")?;
            } else {
                write!(f, "{c}")?;
            }
        }
        write!(f, "{quote}")
    }
}

/// A single-quoted string literal.
struct Lit<'a>(&'a str);

impl fmt::Display for Lit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'")?;
        for c in self.0.chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{c}")?;
            }
        }
        write!(f, "'")
    }
}
