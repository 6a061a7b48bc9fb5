//! Apply command - Render every template listed in a manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use settler_templates::{ResolveOptions, TemplateResolver};

use super::VarArgs;

#[derive(Args)]
pub struct ApplyArgs {
    /// Render manifest
    #[arg(default_value = "settler.yaml")]
    pub manifest: PathBuf,

    /// Directory destinations are relative to (defaults to the current directory)
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    #[command(flatten)]
    pub vars: VarArgs,

    /// Overwrite existing output files
    #[arg(short, long)]
    pub force: bool,

    /// Render everything but write nothing
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: ApplyArgs) -> Result<()> {
    info!("Applying manifest: {:?}", args.manifest);

    let target = match args.target {
        Some(target) => target,
        None => std::env::current_dir()?,
    };
    let vars = args.vars.build()?;

    let resolver = TemplateResolver::from_manifest_file(&args.manifest)
        .with_context(|| format!("Failed to load manifest {:?}", args.manifest))?;
    let options = ResolveOptions::new()
        .overwrite(args.force)
        .dry_run(args.dry_run);

    let result = resolver
        .resolve(&vars, &target, &options)
        .with_context(|| format!("Failed to apply manifest '{}'", resolver.manifest().name))?;

    for warning in &result.warnings {
        warn!("{}", warning);
    }

    if args.dry_run {
        println!("🔎 Dry run of '{}':", result.manifest_name);
        for file in &result.rendered {
            println!(
                "   {} → {}",
                file.template.display(),
                file.destination.display()
            );
        }
        return Ok(());
    }

    println!(
        "✅ Manifest '{}' applied: {} file(s) written",
        result.manifest_name,
        result.created_files.len()
    );
    for file in &result.created_files {
        println!("   - {}", file.display());
    }

    let unresolved = result.unresolved();
    if !unresolved.is_empty() {
        println!();
        println!(
            "⚠️  Left unresolved: {}",
            unresolved.into_iter().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}
