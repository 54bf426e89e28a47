use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use neographql::config::TranslatorConfig;
use neographql::query_ast::{ResolveTree, TranslationContext};
use neographql::schema_model::{build_schema_model, SchemaBuildOptions, TypeDefinitionDocument};
use serde_json::{Map, Value};

/// neographql - translate a GraphQL request into Cypher
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Type definitions (YAML or JSON)
    #[arg(long)]
    schema: PathBuf,

    /// Resolved request tree (JSON)
    #[arg(long)]
    request: PathBuf,

    /// Verified JWT claims (JSON object); omit for an unauthenticated request
    #[arg(long)]
    jwt: Option<PathBuf>,

    /// Translator configuration (YAML); defaults to NEOGRAPHQL_* variables
    #[arg(long)]
    config: Option<PathBuf>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TranslatorConfig::from_yaml_file(path),
        None => TranslatorConfig::from_env(),
    }
    .context("invalid configuration")?;

    let document = TypeDefinitionDocument::from_file(&cli.schema)
        .with_context(|| format!("loading schema {}", cli.schema.display()))?;
    let options = SchemaBuildOptions {
        interface_conflict_policy: config.interface_conflict_policy,
    };
    let model = build_schema_model(document, &options).context("invalid schema")?;

    let tree: ResolveTree = read_json(&cli.request)?;
    let mut context = TranslationContext::new(config);
    if let Some(path) = &cli.jwt {
        let claims: Map<String, Value> = read_json(path)?;
        context = context.with_jwt(claims);
    }

    let query = neographql::translate(&model, &tree, &context)
        .with_context(|| format!("translating `{}`", tree.name))?;

    println!("{}", query.cypher);
    println!();
    println!("{}", serde_json::to_string_pretty(&Value::Object(query.params))?);
    if !query.connection_windows.is_empty() {
        log::info!(
            "{} connection(s) need cursors filled in from the result",
            query.connection_windows.len()
        );
    }
    Ok(())
}
