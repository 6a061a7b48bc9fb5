//! CLI command definitions.
//!
//! This module defines the command structure for the Settler CLI and the
//! argument groups shared between subcommands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::debug;

use settler_templates::{parse_assignment, Syntax, SyntaxSet, TemplateError, VariableMap};

pub mod apply;
pub mod check;
pub mod placeholders;
pub mod render;

/// Settler - render instance-specific configuration from templates
#[derive(Parser)]
#[command(name = "settler")]
#[command(version, about = "Settler - render instance-specific configuration from templates")]
#[command(long_about = r#"
Settler fills placeholders in configuration templates with values supplied at
install time. Two placeholder syntaxes are understood:

  {{ DB_HOST }}
  __replace_this_DB_HOST_value__

COMMANDS:
  render        → Render a single template file
  placeholders  → List the placeholders a template uses
  check         → Report variables a template or manifest is missing
  apply         → Render every template listed in a manifest

VARIABLES (later sources win):
  --from-env / --env-prefix   process environment
  --vars-file                 YAML, JSON or TOML file
  -D NAME=VALUE               command line

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Template error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a template file
    Render(render::RenderArgs),

    /// List the placeholders used by a template
    Placeholders(placeholders::PlaceholdersArgs),

    /// Report missing variables for a template or manifest
    Check(check::CheckArgs),

    /// Render all templates of a manifest
    Apply(apply::ApplyArgs),
}

/// Errors raised by the CLI itself.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Validation failed with {0} error(s)")]
    ValidationFailed(usize),

    #[error("Cannot derive an output path for {0}: its name has no .tpl component, pass --output")]
    NoOutputPath(PathBuf),
}

/// Placeholder syntax selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyntaxArg {
    /// `{{ NAME }}`
    Braces,
    /// `__replace_this_NAME_value__`
    Marker,
}

impl SyntaxArg {
    pub fn to_set(selected: Option<Self>) -> SyntaxSet {
        match selected {
            Some(Self::Braces) => SyntaxSet::only(Syntax::Braces),
            Some(Self::Marker) => SyntaxSet::only(Syntax::Marker),
            None => SyntaxSet::all(),
        }
    }
}

/// Where variable values come from.
#[derive(Args, Debug, Default)]
pub struct VarArgs {
    /// Set a variable, may be repeated
    #[arg(short = 'D', long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// Values file (YAML, JSON or TOML)
    #[arg(long, env = "SETTLER_VARS_FILE")]
    pub vars_file: Option<PathBuf>,

    /// Read environment variables starting with this prefix (prefix removed)
    #[arg(long, env = "SETTLER_ENV_PREFIX")]
    pub env_prefix: Option<String>,

    /// Read every environment variable whose name is a valid identifier
    #[arg(long, conflicts_with = "env_prefix")]
    pub from_env: bool,
}

impl VarArgs {
    /// Build the variable map: environment, then values file, then `-D`.
    pub fn build(&self) -> Result<VariableMap> {
        self.build_from(std::env::vars())
    }

    fn build_from<I>(&self, env: I) -> Result<VariableMap>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars = if self.from_env || self.env_prefix.is_some() {
            VariableMap::from_env_vars(env, self.env_prefix.as_deref())
        } else {
            VariableMap::new()
        };
        debug!("{} variable(s) from the environment", vars.len());

        if let Some(path) = &self.vars_file {
            let from_file = VariableMap::from_file(path)
                .with_context(|| format!("Failed to load values file {:?}", path))?;
            debug!("{} variable(s) from {:?}", from_file.len(), path);
            vars.merge(from_file);
        }

        for assignment in &self.vars {
            match parse_assignment(assignment) {
                Ok((name, value)) => {
                    vars.insert(name, value)?;
                }
                Err(TemplateError::InvalidIdentifier(name)) => {
                    // Rejected again here, which records the name as ignored.
                    vars.insert_lenient(name, String::new());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(vars)
    }
}
