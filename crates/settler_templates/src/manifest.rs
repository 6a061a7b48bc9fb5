//! Render manifest definitions.
//!
//! A manifest describes one install run: which templates to render, where
//! the results go, which variables are expected and how unresolved
//! placeholders are treated. It is written in YAML:
//!
//! ```yaml
//! name: drupal-8-local
//! templates_dir: templates
//! missing: fail
//! variables:
//!   - name: DB_HOST
//!     required: true
//!   - name: DB_PORT
//!     default: "3306"
//!     pattern: "^[0-9]+$"
//! templates:
//!   - template: drupal_settings
//!     variant: "8"
//!     destination: web/sites/default/settings.local.php
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::renderer::{MissingPolicy, RenderOptions};
use crate::syntax::{is_valid_identifier, Syntax, SyntaxSet};
use crate::variables::VariableMap;

/// Declared template variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Regular expression the value must match.
    #[serde(default)]
    pub pattern: Option<String>,
}

/// One template to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEntry {
    /// Template file name (`config.tpl.php`) or base name (`drupal_settings`).
    pub template: String,
    /// Variant to prefer when `template` is a base name.
    #[serde(default)]
    pub variant: Option<String>,
    /// Output path relative to the target directory.
    #[serde(default)]
    pub destination: Option<PathBuf>,
    /// Overrides the manifest-wide missing policy.
    #[serde(default)]
    pub missing: Option<MissingPolicy>,
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_syntaxes() -> Vec<Syntax> {
    Syntax::all().to_vec()
}

/// Render manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderManifest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Template directory, relative to the manifest file.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    #[serde(default)]
    pub missing: MissingPolicy,
    #[serde(default = "default_syntaxes")]
    pub syntaxes: Vec<Syntax>,
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    pub templates: Vec<TemplateEntry>,
}

impl RenderManifest {
    /// Load and check a manifest file.
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        debug!("Loading manifest from {:?}", path);
        let content = fs::read_to_string(path)?;
        let manifest = Self::from_yaml(&content)?;

        let issues = manifest.structure_issues();
        if !issues.is_empty() {
            return Err(TemplateError::InvalidManifest {
                path: path.to_path_buf(),
                message: issues.join("; "),
            });
        }
        Ok(manifest)
    }

    /// Parse a manifest without checking its structure.
    pub fn from_yaml(content: &str) -> TemplateResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Problems with the manifest itself, independent of any values.
    pub fn structure_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.templates.is_empty() {
            issues.push("No templates listed".to_string());
        }
        if self.syntaxes.is_empty() {
            issues.push("No placeholder syntaxes enabled".to_string());
        }

        let mut seen = HashSet::new();
        for var in &self.variables {
            if !is_valid_identifier(&var.name) {
                issues.push(format!("Invalid variable name: {:?}", var.name));
            }
            if !seen.insert(var.name.as_str()) {
                issues.push(format!("Variable declared twice: {}", var.name));
            }
            if let Some(pattern) = &var.pattern {
                if let Err(e) = Regex::new(pattern) {
                    issues.push(format!("Invalid pattern for {}: {}", var.name, e));
                }
            }
        }

        let mut destinations = HashSet::new();
        for entry in &self.templates {
            if let Some(destination) = &entry.destination {
                if destination.is_absolute() {
                    issues.push(format!(
                        "Destination must be relative: {}",
                        destination.display()
                    ));
                }
                if !destinations.insert(destination.clone()) {
                    issues.push(format!(
                        "Destination used twice: {}",
                        destination.display()
                    ));
                }
            }
        }

        issues
    }

    /// Get required variables.
    pub fn required_variables(&self) -> Vec<&VariableSpec> {
        self.variables.iter().filter(|v| v.required).collect()
    }

    /// Required variables with neither a value nor a default.
    pub fn missing_required(&self, provided: &VariableMap) -> Vec<String> {
        self.required_variables()
            .into_iter()
            .filter(|v| !provided.contains(&v.name) && v.default.is_none())
            .map(|v| v.name.clone())
            .collect()
    }

    /// Check provided values against their declared patterns.
    pub fn check_patterns(&self, provided: &VariableMap) -> TemplateResult<()> {
        for var in &self.variables {
            let (Some(pattern), Some(value)) = (&var.pattern, provided.get(&var.name)) else {
                continue;
            };
            let re = Regex::new(pattern)?;
            if !re.is_match(value) {
                return Err(TemplateError::InvalidVariable {
                    variable: var.name.clone(),
                    message: format!("does not match pattern: {}", pattern),
                });
            }
        }
        Ok(())
    }

    /// Validate provided variables.
    pub fn validate_variables(&self, provided: &VariableMap) -> Vec<String> {
        let mut errors: Vec<String> = self
            .missing_required(provided)
            .into_iter()
            .map(|name| format!("Missing required variable: {}", name))
            .collect();

        for var in &self.variables {
            let (Some(pattern), Some(value)) = (&var.pattern, provided.get(&var.name)) else {
                continue;
            };
            match Regex::new(pattern) {
                Ok(re) if !re.is_match(value) => errors.push(format!(
                    "Variable '{}' does not match pattern: {}",
                    var.name, pattern
                )),
                Ok(_) => {}
                Err(e) => errors.push(format!("Invalid pattern for {}: {}", var.name, e)),
            }
        }

        errors
    }

    /// Declared defaults overridden by provided values.
    pub fn apply_defaults(&self, provided: &VariableMap) -> VariableMap {
        let mut vars = VariableMap::new();
        for var in &self.variables {
            if let Some(default) = &var.default {
                vars.insert_lenient(var.name.clone(), default.clone());
            }
        }
        vars.merge(provided.clone());
        vars
    }

    /// Manifest-wide render options.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions::new()
            .with_missing(self.missing)
            .with_syntaxes(SyntaxSet::from_slice(&self.syntaxes))
    }

    /// Render options for one entry.
    pub fn entry_options(&self, entry: &TemplateEntry) -> RenderOptions {
        let options = self.render_options();
        match entry.missing {
            Some(missing) => options.with_missing(missing),
            None => options,
        }
    }
}
