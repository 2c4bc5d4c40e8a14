//! CLI: JSON-Schema documents → (up/down SQL | validation report)
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use json_ddl::error::{Error, Result};
use json_ddl::jq_exec::JqFilter;
use json_ddl::{CompileOptions, CompileOutput, Dialect, Queries, ValidationError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile JSON-Schema table definitions into relational DDL
#[derive(Parser, Debug)]
#[command(name = "json-ddl", version)]
pub struct CommandLineInterface {
    /// debug logging for the compiler stages (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile each document into up/down statements
    Compile(CompileOut),
    /// validate each document without generating SQL
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select the schema in each document (e.g. /components/db)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is compiled separately.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// up statements, a `-- down` separator, down statements
    Sql,
    /// the `{queries, errors}` object
    Json,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[arg(long, value_enum, env = "JSON_DDL_DIALECT", default_value_t = Dialect::Pg)]
    dialect: Dialect,

    /// write `<DIR>/<timestamp>_<name>/{up,down}.sql` instead of printing
    #[arg(long, env = "JSON_DDL_OUT_DIR")]
    out_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Sql)]
    format: OutputFormat,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

/// One schema document after path resolution, pointer selection and jq.
#[derive(Debug)]
struct Document {
    source: PathBuf,
    /// Output name: the file stem, suffixed when jq yields several documents.
    name: String,
    schema: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let jq_filter = self
            .jq_expr
            .as_deref()
            .map(JqFilter::compile)
            .transpose()
            .map_err(|error| Error::JqCompile(format!("{error:#}")))?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source = std::fs::read_to_string(&source_path)
                .map_err(|source| Error::Read { path: source_path.clone(), source })?;
            let json_value = serde_json::from_str::<Value>(&source)
                .map_err(|source| Error::Parse { path: source_path.clone(), source })?;
            let json_value = match self.json_pointer.as_deref() {
                None => json_value,
                Some(pointer) => json_value.pointer(pointer).cloned().ok_or_else(|| Error::Pointer {
                    path: source_path.clone(),
                    pointer: pointer.to_string(),
                })?,
            };
            let stem = source_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "schema".to_string());

            match jq_filter.as_ref() {
                None => documents.push(Document { source: source_path, name: stem, schema: json_value }),
                Some(filter) => {
                    let outputs = filter
                        .apply(&json_value, &source_path.display().to_string())
                        .map_err(|error| Error::Jq { path: source_path.clone(), message: format!("{error:#}") })?;
                    let many = outputs.len() > 1;
                    for (ix, schema) in outputs.into_iter().enumerate() {
                        let name = if many { format!("{stem}_{ix}") } else { stem.clone() };
                        documents.push(Document { source: source_path.clone(), name, schema });
                    }
                }
            }
        }
        tracing::debug!(documents = documents.len(), "inputs loaded");
        Ok(documents)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when at least one document failed validation.
    pub fn run(&self) -> anyhow::Result<bool> {
        match &self.cmd {
            Command::Compile(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(true);
                }
                let documents = target.input_settings.load()?;
                let options = CompileOptions::new(target.dialect);
                let results: Vec<_> = documents
                    .par_iter()
                    .map(|doc| json_ddl::compile(&doc.schema, &options))
                    .collect();

                let mut ok = true;
                let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();
                for (doc, result) in documents.iter().zip(results) {
                    ok &= result.is_ok();
                    match target.format {
                        OutputFormat::Json => {
                            let output = CompileOutput::from(result);
                            println!("{}", serde_json::to_string_pretty(&output)?);
                        }
                        OutputFormat::Sql => match result {
                            Ok(queries) => match target.out_dir.as_ref() {
                                Some(out_dir) => {
                                    let dir = out_dir.join(format!("{timestamp}_{}", doc.name));
                                    write_queries(&dir, &queries)?;
                                    eprintln!("{} {}", "wrote".green(), dir.display());
                                }
                                None => {
                                    if documents.len() > 1 {
                                        println!("-- {}", doc.source.display());
                                    }
                                    print_queries(&queries);
                                }
                            },
                            Err(errors) => report_errors(&doc.source, &errors),
                        },
                    }
                }
                Ok(ok)
            }
            Command::Check(target) => {
                let documents = target.input_settings.load()?;
                let results: Vec<_> = documents.par_iter().map(|doc| json_ddl::check(&doc.schema)).collect();
                let mut ok = true;
                for (doc, result) in documents.iter().zip(results) {
                    match result {
                        Ok(()) => eprintln!("{} {}", "ok".green(), doc.source.display()),
                        Err(errors) => {
                            ok = false;
                            report_errors(&doc.source, &errors);
                        }
                    }
                }
                Ok(ok)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_queries(queries: &Queries) {
    for statement in &queries.up {
        println!("{statement}");
    }
    println!("-- down");
    for statement in &queries.down {
        println!("{statement}");
    }
}

fn write_queries(dir: &Path, queries: &Queries) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| Error::Write { path: dir.to_path_buf(), source })?;
    for (file_name, statements) in [("up.sql", &queries.up), ("down.sql", &queries.down)] {
        let path = dir.join(file_name);
        let mut contents = statements.join("\n");
        contents.push('\n');
        std::fs::write(&path, contents).map_err(|source| Error::Write { path, source })?;
    }
    Ok(())
}

fn report_errors(source: &Path, errors: &[ValidationError]) {
    eprintln!("{} {}", "error:".red().bold(), source.display());
    for error in errors {
        eprintln!("  {} {}", format!("/{}", error.path.join("/")).yellow(), error.message);
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                return Err(Error::NoMatches(pattern.to_string()));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["schema.json", "db/other.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("schema.json"), PathBuf::from("db/other.json")]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        let err = resolve_file_path_patterns(["/definitely/not/here/*.json"]).unwrap_err();
        assert!(matches!(err, Error::NoMatches(_)));
    }

    #[test]
    fn parses_compile_flags() {
        let cli = CommandLineInterface::try_parse_from([
            "json-ddl", "compile", "-i", "a.json", "b.json", "--dialect", "mysql", "--format", "json",
        ])
        .unwrap();
        match cli.cmd {
            Command::Compile(target) => {
                assert_eq!(target.input_settings.input, ["a.json", "b.json"]);
                assert_eq!(target.dialect, Dialect::Mysql);
                assert!(matches!(target.format, OutputFormat::Json));
            }
            Command::Check(_) => panic!("expected compile"),
        }
    }
}
