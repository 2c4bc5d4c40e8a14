//! Compile a JSON-Schema document describing tables into relational DDL.
//!
//! Pipeline: `validate` → `visit` → `resolve` → `generate`. The outcome is either
//! ordered `up`/`down` statements or the full list of [`ValidationError`]s.
pub mod error;
pub mod generate;
pub mod jq_exec;
pub mod model;
pub mod render;
pub mod resolve;
pub mod validate;
pub mod visit;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use generate::Queries;
pub use model::ValidationError;
pub use render::Dialect;

// ————————————————————————————————————————————————————————————————————————————
// OPTIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub dialect: Dialect,
}

impl CompileOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

/// Pure and deterministic; on `Err` the list is never empty.
pub fn compile(schema: &Value, options: &CompileOptions) -> Result<Queries, Vec<ValidationError>> {
    let validated = validate::validate(schema)?;
    let tables = visit::visit(&validated);
    let resolved = resolve::resolve(tables)?;
    Ok(generate::generate(&resolved, options.dialect))
}

/// Validation only: the same errors `compile` would report, without generating SQL.
pub fn check(schema: &Value) -> Result<(), Vec<ValidationError>> {
    let validated = validate::validate(schema)?;
    resolve::resolve(visit::visit(&validated))?;
    Ok(())
}

/// `{queries, errors}` result object; exactly one side is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileOutput {
    pub queries: Option<Queries>,
    pub errors: Option<Vec<ValidationError>>,
}

impl From<Result<Queries, Vec<ValidationError>>> for CompileOutput {
    fn from(result: Result<Queries, Vec<ValidationError>>) -> Self {
        match result {
            Ok(queries) => Self { queries: Some(queries), errors: None },
            Err(errors) => Self { queries: None, errors: Some(errors) },
        }
    }
}

pub fn json_schema_to_sql(schema: &Value, dialect: Dialect) -> CompileOutput {
    compile(schema, &CompileOptions::new(dialect)).into()
}
