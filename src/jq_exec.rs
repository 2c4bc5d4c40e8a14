//! jq pre-processing of input documents.
//!
//! A filter is compiled once and then applied to every loaded document; each
//! filter output becomes a schema document of its own.
use anyhow::{anyhow, Context, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, Filter, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;

pub struct JqFilter {
    source: String,
    filter: Filter<Native<Val>>,
}

impl JqFilter {
    pub fn compile(source: &str) -> Result<Self> {
        let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = load::Arena::default();
        let program = load::File { code: source, path: () };

        let modules = loader.load(&arena, program).map_err(parse_errors)?;
        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(undefined_errors)?;

        Ok(Self { source: source.to_string(), filter })
    }

    /// Outputs of the filter on `document`, in order. `name` only labels errors.
    pub fn apply(&self, document: &Value, name: &str) -> Result<Vec<Value>> {
        let inputs = RcIter::new(core::iter::empty());
        self.filter
            .run((Ctx::new([], &inputs), Val::from(document.clone())))
            .map(|output| output.map(Value::from).map_err(|e| anyhow!("{e}")))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("jq `{}` failed on {name}", self.source))
    }
}

fn parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .map(|(file, err)| format!("parse error: {err:?} in `{}`", file.code))
        .collect();
    anyhow!(lines.join("\n"))
}

fn undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .flat_map(|(file, list)| {
            list.into_iter()
                .map(move |(name, undef)| format!("undefined `{name}`: {undef:?} in `{}`", file.code))
        })
        .collect();
    anyhow!(lines.join("\n"))
}
