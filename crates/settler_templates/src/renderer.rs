//! Template rendering.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::syntax::{Placeholder, PlaceholderScanner, Scan, SyntaxSet};
use crate::variables::VariableMap;

/// What to do with a placeholder whose identifier has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Copy the placeholder text unchanged.
    #[default]
    LeaveAsIs,
    /// Fail the whole render.
    Fail,
}

/// Options for a single render.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub missing: MissingPolicy,
    pub syntaxes: SyntaxSet,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on any unresolved placeholder.
    pub fn strict() -> Self {
        Self::new().with_missing(MissingPolicy::Fail)
    }

    pub fn with_missing(mut self, missing: MissingPolicy) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_syntaxes(mut self, syntaxes: SyntaxSet) -> Self {
        self.syntaxes = syntaxes;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.missing == MissingPolicy::Fail
    }
}

/// Outcome of a render.
#[derive(Debug, Clone, Default)]
pub struct RenderResult {
    /// Rendered text.
    pub output: String,
    /// Identifiers that were substituted.
    pub resolved: BTreeSet<String>,
    /// Identifiers referenced by the template but absent from the variables.
    pub unresolved: BTreeSet<String>,
    /// Number of placeholder occurrences replaced.
    pub substitutions: usize,
    /// Non-fatal problems noticed while rendering.
    pub warnings: Vec<String>,
}

impl RenderResult {
    /// True when every placeholder was substituted.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Template renderer.
///
/// Rendering is a pure function of the template, the variables and the
/// options. Values are inserted verbatim and never rescanned, so callers must
/// escape them for the destination format beforehand.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    scanner: PlaceholderScanner,
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        Self {
            scanner: PlaceholderScanner::new(),
        }
    }

    /// Render a template.
    pub fn render(
        &self,
        template: &str,
        variables: &VariableMap,
        options: &RenderOptions,
    ) -> TemplateResult<RenderResult> {
        let scan = self.scanner.scan(template, options.syntaxes)?;

        if options.is_strict() {
            if let Some(missing) = first_missing(&scan.placeholders, variables) {
                debug!(
                    "Strict render failed at line {}, column {}: {} has no value",
                    missing.line, missing.column, missing.name
                );
                return Err(TemplateError::MissingVariable(missing.name.clone()));
            }
        }

        let mut result = RenderResult {
            output: String::with_capacity(template.len()),
            warnings: scan.warnings,
            ..Default::default()
        };
        for key in variables.ignored_keys() {
            result
                .warnings
                .push(format!("Ignored variable with invalid name: {:?}", key));
        }

        let mut cursor = 0;
        for placeholder in &scan.placeholders {
            result.output.push_str(&template[cursor..placeholder.start]);
            match variables.get(&placeholder.name) {
                Some(value) => {
                    result.output.push_str(value);
                    result.resolved.insert(placeholder.name.clone());
                    result.substitutions += 1;
                }
                None => {
                    result
                        .output
                        .push_str(&template[placeholder.start..placeholder.end]);
                    result.unresolved.insert(placeholder.name.clone());
                }
            }
            cursor = placeholder.end;
        }
        result.output.push_str(&template[cursor..]);

        debug!(
            "Rendered {} substitutions, {} unresolved",
            result.substitutions,
            result.unresolved.len()
        );
        Ok(result)
    }

    /// Render with default options and return only the text.
    pub fn render_content(&self, content: &str, variables: &VariableMap) -> TemplateResult<String> {
        Ok(self.render(content, variables, &RenderOptions::default())?.output)
    }

    /// All placeholder identifiers in a template.
    pub fn extract_placeholders(&self, template: &str) -> TemplateResult<BTreeSet<String>> {
        Ok(self
            .scan(template, SyntaxSet::all())?
            .placeholders
            .into_iter()
            .map(|p| p.name)
            .collect())
    }

    /// Every placeholder occurrence with its position.
    pub fn scan(&self, template: &str, syntaxes: SyntaxSet) -> TemplateResult<Scan> {
        self.scanner.scan(template, syntaxes)
    }

    /// Identifiers a strict render of `template` would fail on.
    pub fn missing_variables(
        &self,
        template: &str,
        variables: &VariableMap,
    ) -> TemplateResult<BTreeSet<String>> {
        Ok(self
            .extract_placeholders(template)?
            .into_iter()
            .filter(|name| !variables.contains(name))
            .collect())
    }
}

fn first_missing<'a>(placeholders: &'a [Placeholder], variables: &VariableMap) -> Option<&'a Placeholder> {
    placeholders.iter().find(|p| !variables.contains(&p.name))
}
