//! Render command - Render a single template file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use settler_templates::{output_path_for, MissingPolicy, RenderOptions, TemplateError, TemplateRenderer};

use super::{CliError, SyntaxArg, VarArgs};

#[derive(Args)]
pub struct RenderArgs {
    /// Template file to render
    pub template: PathBuf,

    /// Output file, `-` for stdout (defaults to the template path without `.tpl`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub vars: VarArgs,

    /// Fail when a placeholder has no value
    #[arg(long)]
    pub strict: bool,

    /// Only recognise one placeholder syntax
    #[arg(long, value_enum)]
    pub syntax: Option<SyntaxArg>,

    /// Overwrite an existing output file
    #[arg(short, long)]
    pub force: bool,
}

pub async fn execute(args: RenderArgs) -> Result<()> {
    info!("Rendering template: {:?}", args.template);

    let content = tokio::fs::read_to_string(&args.template)
        .await
        .with_context(|| format!("Failed to read template {:?}", args.template))?;
    let vars = args.vars.build()?;

    let missing = if args.strict {
        MissingPolicy::Fail
    } else {
        MissingPolicy::LeaveAsIs
    };
    let options = RenderOptions::new()
        .with_missing(missing)
        .with_syntaxes(SyntaxArg::to_set(args.syntax));

    let renderer = TemplateRenderer::new();
    let result = renderer
        .render(&content, &vars, &options)
        .with_context(|| format!("Failed to render template {:?}", args.template))?;

    for warning in &result.warnings {
        warn!("{}", warning);
    }
    if !result.unresolved.is_empty() {
        warn!(
            "Left unresolved: {}",
            result.unresolved.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    let output = output_target(&args.template, args.output.as_deref())?;
    let Some(output) = output else {
        print!("{}", result.output);
        return Ok(());
    };

    if !args.force && tokio::fs::try_exists(&output).await.unwrap_or(false) {
        return Err(TemplateError::AlreadyExists(output).into());
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&output, &result.output)
        .await
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!(
        "✅ Rendered {} ({} substitution(s), {} unresolved)",
        output.display(),
        result.substitutions,
        result.unresolved.len()
    );
    Ok(())
}

/// Destination file, or `None` for stdout.
fn output_target(template: &Path, output: Option<&Path>) -> Result<Option<PathBuf>> {
    match output {
        Some(path) if path == Path::new("-") => Ok(None),
        Some(path) => Ok(Some(path.to_path_buf())),
        None => output_path_for(template)
            .map(Some)
            .ok_or_else(|| CliError::NoOutputPath(template.to_path_buf()).into()),
    }
}
