//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::ingest::{parse_data_date, IngestEngine};
use crate::query::QueryEngine;
use crate::testdata;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Ingest {
                file,
                date,
                data_type,
                chunk_size,
            } => {
                let engine = IngestEngine::new(config)?;
                let date = parse_optional_date(date.as_deref())?;
                let report =
                    engine.ingest_file(file, *chunk_size, date, data_type.as_deref())?;
                print_json(&json!({
                    "status": if report.errors == 0 { "success" } else { "partial" },
                    "total_records": report.total_records,
                    "chunks": report.chunks,
                    "errors": report.errors,
                }))
            }

            Commands::Query { sql, limit } => {
                let engine = QueryEngine::new(config)?;
                let outcome = engine.execute_sql(sql, *limit)?;
                print_json(&serde_json::to_value(outcome)?)
            }

            Commands::Search {
                term,
                column,
                limit,
            } => {
                let engine = QueryEngine::new(config)?;
                let outcome = engine.search(term, column.as_deref(), *limit)?;
                print_json(&serde_json::to_value(outcome)?)
            }

            Commands::Stats => {
                let query_engine = QueryEngine::new(Arc::clone(&config))?;
                let ingest_engine = IngestEngine::new(config)?;
                let statistics = query_engine.statistics()?;
                let files = ingest_engine.file_stats()?;
                print_json(&json!({
                    "statistics": statistics,
                    "files": files,
                }))
            }

            Commands::Files => {
                let engine = IngestEngine::new(config)?;
                let files = engine.file_stats()?;
                print_json(&json!({
                    "files": files,
                    "total_files": files.len(),
                }))
            }

            Commands::Seed {
                kind,
                count,
                date,
                data_type,
            } => {
                let engine = IngestEngine::new(config)?;
                let records = testdata::generate(kind, *count)?;
                let date = parse_optional_date(date.as_deref())?;
                let tag = data_type.clone().unwrap_or_else(|| kind.clone());
                let receipt =
                    engine.append(&Value::Array(records), date, Some(&tag))?;
                print_json(&serde_json::to_value(receipt)?)
            }

            Commands::Serve { port } => crate::cli::serve(config, *port).await,
        }
    }

    /// Load store configuration, applying CLI overrides
    fn load_config(&self) -> Result<Arc<StoreConfig>> {
        let mut config = match &self.cli.config {
            Some(path) => StoreConfig::load(path)?,
            None => StoreConfig::default(),
        };

        if let Some(data_dir) = &self.cli.data_dir {
            config.data_dir.clone_from(data_dir);
        }

        config.validate()?;
        Ok(Arc::new(config))
    }
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(parse_data_date).transpose()
}

fn print_json(value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
