//! Check command - Report missing variables before rendering.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use settler_templates::{TemplateRenderer, TemplateResolver, VariableMap};

use super::{CliError, VarArgs};

#[derive(Args)]
pub struct CheckArgs {
    /// Template file or manifest (`.yaml`/`.yml`) to check
    pub path: PathBuf,

    #[command(flatten)]
    pub vars: VarArgs,
}

pub async fn execute(args: CheckArgs) -> Result<()> {
    let vars = args.vars.build()?;

    if is_manifest(&args.path) {
        check_manifest(&args.path, &vars)
    } else {
        check_template(&args.path, &vars).await
    }
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn check_manifest(path: &Path, vars: &VariableMap) -> Result<()> {
    info!("Checking manifest: {:?}", path);

    let resolver = TemplateResolver::from_manifest_file(path)
        .with_context(|| format!("Failed to load manifest {:?}", path))?;
    let result = resolver.validate(vars)?;

    println!("📋 Manifest '{}'", result.manifest_name);
    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }

    if result.valid {
        println!("   ✅ All variables available");
        Ok(())
    } else {
        for error in &result.errors {
            println!("   ❌ {}", error);
        }
        Err(CliError::ValidationFailed(result.errors.len()).into())
    }
}

async fn check_template(path: &Path, vars: &VariableMap) -> Result<()> {
    info!("Checking template: {:?}", path);

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read template {:?}", path))?;

    let renderer = TemplateRenderer::new();
    let missing = renderer
        .missing_variables(&content, vars)
        .with_context(|| format!("Failed to scan template {:?}", path))?;

    println!("📋 Template {}", path.display());
    if missing.is_empty() {
        println!("   ✅ All variables available");
        return Ok(());
    }

    for name in &missing {
        println!("   ❌ No value for {}", name);
    }
    Err(CliError::ValidationFailed(missing.len()).into())
}
