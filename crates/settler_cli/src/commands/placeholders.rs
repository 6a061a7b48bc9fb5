//! Placeholders command - List the placeholders a template uses.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::warn;

use settler_templates::{Placeholder, TemplateRenderer};

use super::SyntaxArg;

#[derive(Args)]
pub struct PlaceholdersArgs {
    /// Template file to inspect
    pub template: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Only recognise one placeholder syntax
    #[arg(long, value_enum)]
    pub syntax: Option<SyntaxArg>,
}

/// One identifier and where it first appears.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PlaceholderSummary {
    pub name: String,
    pub syntax: String,
    pub line: usize,
    pub column: usize,
    pub occurrences: usize,
}

pub async fn execute(args: PlaceholdersArgs) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.template)
        .await
        .with_context(|| format!("Failed to read template {:?}", args.template))?;

    let renderer = TemplateRenderer::new();
    let scan = renderer
        .scan(&content, SyntaxArg::to_set(args.syntax))
        .with_context(|| format!("Failed to scan template {:?}", args.template))?;

    for warning in &scan.warnings {
        warn!("{}", warning);
    }

    let summary = summarize(&scan.placeholders);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.is_empty() {
        println!("No placeholders found in {}", args.template.display());
        return Ok(());
    }

    for entry in &summary {
        println!(
            "{:<32} {:>5}:{:<4} {:<7} x{}",
            entry.name, entry.line, entry.column, entry.syntax, entry.occurrences
        );
    }
    Ok(())
}

/// Group occurrences by identifier, keeping the first location.
fn summarize(placeholders: &[Placeholder]) -> Vec<PlaceholderSummary> {
    let mut by_name: BTreeMap<&str, PlaceholderSummary> = BTreeMap::new();
    for p in placeholders {
        by_name
            .entry(p.name.as_str())
            .and_modify(|s| s.occurrences += 1)
            .or_insert_with(|| PlaceholderSummary {
                name: p.name.clone(),
                syntax: p.syntax.to_string(),
                line: p.line,
                column: p.column,
                occurrences: 1,
            });
    }
    by_name.into_values().collect()
}
