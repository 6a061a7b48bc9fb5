//! Template resolver for validating and executing render manifests.
//!
//! The resolver handles:
//! - Template lookup (file names and variants)
//! - Variable defaults and validation
//! - Rendering every entry before anything is written
//! - Writing outputs to the target directory

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{TemplateError, TemplateResult};
use crate::loader::TemplateLoader;
use crate::manifest::{RenderManifest, TemplateEntry};
use crate::renderer::TemplateRenderer;
use crate::variables::VariableMap;

/// Options for resolving a manifest.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Whether to overwrite existing files.
    pub overwrite: bool,
    /// Render without writing anything.
    pub dry_run: bool,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A rendered manifest entry, not yet written.
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub template: PathBuf,
    pub destination: PathBuf,
    pub content: String,
    pub unresolved: BTreeSet<String>,
}

/// Template resolver result.
#[derive(Debug)]
pub struct ResolveResult {
    pub manifest_name: String,
    /// Directory the destinations are relative to.
    pub target_path: PathBuf,
    /// Everything that was rendered.
    pub rendered: Vec<RenderedFile>,
    /// Files that were written. Empty on a dry run.
    pub created_files: Vec<PathBuf>,
    /// Warnings during resolution.
    pub warnings: Vec<String>,
}

impl ResolveResult {
    /// Identifiers left unresolved in any output.
    pub fn unresolved(&self) -> BTreeSet<&str> {
        self.rendered
            .iter()
            .flat_map(|f| f.unresolved.iter().map(String::as_str))
            .collect()
    }
}

/// Validation result for a manifest against a set of variables.
#[derive(Debug)]
pub struct ValidationResult {
    pub manifest_name: String,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new(manifest_name: &str) -> Self {
        Self {
            manifest_name: manifest_name.to_string(),
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.valid = false;
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Template resolver executes a render manifest.
pub struct TemplateResolver {
    manifest: RenderManifest,
    loader: TemplateLoader,
    renderer: TemplateRenderer,
}

impl TemplateResolver {
    /// Create a resolver; `base_dir` is the directory the manifest's
    /// `templates_dir` is relative to.
    pub fn new(manifest: RenderManifest, base_dir: impl AsRef<Path>) -> Self {
        let loader = TemplateLoader::new(base_dir.as_ref().join(&manifest.templates_dir));
        Self {
            manifest,
            loader,
            renderer: TemplateRenderer::new(),
        }
    }

    /// Load a manifest file and resolve templates relative to it.
    pub fn from_manifest_file(path: &Path) -> TemplateResult<Self> {
        let manifest = RenderManifest::from_file(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::new(manifest, base_dir))
    }

    pub fn manifest(&self) -> &RenderManifest {
        &self.manifest
    }

    /// Check that the manifest can be rendered with the given variables.
    pub fn validate(&self, provided: &VariableMap) -> TemplateResult<ValidationResult> {
        let mut result = ValidationResult::new(&self.manifest.name);

        for issue in self.manifest.structure_issues() {
            result.add_error(issue);
        }
        for error in self.manifest.validate_variables(provided) {
            result.add_error(error);
        }

        let vars = self.manifest.apply_defaults(provided);
        for key in vars.ignored_keys() {
            result.add_warning(format!("Ignored variable with invalid name: {:?}", key));
        }

        for entry in &self.manifest.templates {
            let template = match self.loader.find(&entry.template, entry.variant.as_deref()) {
                Ok(t) => t,
                Err(e) => {
                    result.add_error(e.to_string());
                    continue;
                }
            };

            let content = match self.loader.load(&template) {
                Ok(content) => content,
                Err(e) => {
                    result.add_error(format!("{}: {}", template.path.display(), e));
                    continue;
                }
            };
            let options = self.manifest.entry_options(entry);
            let scan = match self.renderer.scan(&content, options.syntaxes) {
                Ok(scan) => scan,
                Err(e) => {
                    result.add_error(format!("{}: {}", template.path.display(), e));
                    continue;
                }
            };

            for warning in scan.warnings {
                result.add_warning(format!("{}: {}", template.path.display(), warning));
            }

            let missing: BTreeSet<&str> = scan
                .placeholders
                .iter()
                .map(|p| p.name.as_str())
                .filter(|name| !vars.contains(name))
                .collect();
            for name in missing {
                let msg = format!("{}: no value for {}", template.path.display(), name);
                if options.is_strict() {
                    result.add_error(msg);
                } else {
                    result.add_warning(msg);
                }
            }
        }

        result.valid = result.errors.is_empty();
        Ok(result)
    }

    /// Render every entry in memory.
    pub fn render_all(
        &self,
        provided: &VariableMap,
        target_path: &Path,
    ) -> TemplateResult<(Vec<RenderedFile>, Vec<String>)> {
        let missing = self.manifest.missing_required(provided);
        if let Some(first) = missing.first() {
            debug!("Missing required variables: {}", missing.join(", "));
            return Err(TemplateError::MissingVariable(first.clone()));
        }
        self.manifest.check_patterns(provided)?;

        let vars = self.manifest.apply_defaults(provided);
        let mut rendered = Vec::with_capacity(self.manifest.templates.len());
        let mut warnings = Vec::new();

        for entry in &self.manifest.templates {
            let file = self.render_entry(entry, &vars, target_path, &mut warnings)?;
            rendered.push(file);
        }

        Ok((rendered, warnings))
    }

    fn render_entry(
        &self,
        entry: &TemplateEntry,
        vars: &VariableMap,
        target_path: &Path,
        warnings: &mut Vec<String>,
    ) -> TemplateResult<RenderedFile> {
        let template = self.loader.find(&entry.template, entry.variant.as_deref())?;
        let content = self.loader.load(&template)?;
        let options = self.manifest.entry_options(entry);

        let result = self.renderer.render(&content, vars, &options)?;
        for warning in result.warnings {
            warnings.push(format!("{}: {}", template.path.display(), warning));
        }
        if !result.unresolved.is_empty() {
            warnings.push(format!(
                "{}: left unresolved: {}",
                template.path.display(),
                result.unresolved.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }

        let destination = match &entry.destination {
            Some(destination) => target_path.join(destination),
            None => target_path.join(template.output_file_name()),
        };
        debug!("Rendered {:?} for {:?}", template.path, destination);

        Ok(RenderedFile {
            template: template.path,
            destination,
            content: result.output,
            unresolved: result.unresolved,
        })
    }

    /// Render the manifest and write the outputs under `target_path`.
    ///
    /// Nothing is written unless every entry renders and no destination
    /// conflicts with an existing file.
    pub fn resolve(
        &self,
        provided: &VariableMap,
        target_path: &Path,
        options: &ResolveOptions,
    ) -> TemplateResult<ResolveResult> {
        info!(
            "Resolving manifest '{}' to {:?}",
            self.manifest.name, target_path
        );

        let (rendered, warnings) = self.render_all(provided, target_path)?;

        let mut seen = HashSet::new();
        for file in &rendered {
            if !seen.insert(file.destination.clone()) {
                return Err(TemplateError::InvalidManifest {
                    path: file.destination.clone(),
                    message: "more than one template renders to this destination".to_string(),
                });
            }
            if file.destination.exists() && !options.overwrite {
                return Err(TemplateError::AlreadyExists(file.destination.clone()));
            }
        }

        let mut created_files = Vec::new();
        if options.dry_run {
            info!("Dry run: {} file(s) rendered, nothing written", rendered.len());
        } else {
            for file in &rendered {
                if let Some(parent) = file.destination.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&file.destination, &file.content)?;
                debug!("Wrote: {:?}", file.destination);
                created_files.push(file.destination.clone());
            }
            info!("Wrote {} file(s)", created_files.len());
        }

        Ok(ResolveResult {
            manifest_name: self.manifest.name.clone(),
            target_path: target_path.to_path_buf(),
            rendered,
            created_files,
            warnings,
        })
    }
}
