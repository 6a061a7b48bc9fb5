//! Template discovery and loading.
//!
//! Template files carry a `tpl` component in their name, optionally preceded
//! by a variant: `drupal_settings.8.tpl.php` is variant `8` of the
//! `drupal_settings` template. The rendered file keeps the name minus the
//! `tpl` component.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{TemplateError, TemplateResult};

const TEMPLATE_MARKER: &str = "tpl";

/// A template file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub path: PathBuf,
    /// Name before the variant, e.g. `drupal_settings`.
    pub base: String,
    /// Variant such as a CMS version or database driver.
    pub variant: Option<String>,
    /// Extension after the `tpl` component, e.g. `php`.
    pub extension: Option<String>,
}

impl TemplateFile {
    /// Parse a template path. Returns `None` for files without a `tpl` component.
    pub fn parse(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let parts: Vec<&str> = file_name.split('.').collect();
        let marker = parts.iter().rposition(|p| *p == TEMPLATE_MARKER)?;
        if marker == 0 {
            return None;
        }

        let stem = &parts[..marker];
        let (base, variant) = match stem {
            [base] => (base.to_string(), None),
            [rest @ .., variant] => (rest.join("."), Some(variant.to_string())),
            [] => return None,
        };
        let extension = match &parts[marker + 1..] {
            [] => None,
            ext => Some(ext.join(".")),
        };

        Some(Self {
            path: path.to_path_buf(),
            base,
            variant,
            extension,
        })
    }

    /// File name of the rendered output.
    pub fn output_file_name(&self) -> String {
        let mut name = self.base.clone();
        if let Some(variant) = &self.variant {
            name.push('.');
            name.push_str(variant);
        }
        if let Some(extension) = &self.extension {
            name.push('.');
            name.push_str(extension);
        }
        name
    }

    /// Output path next to the template.
    pub fn output_path(&self) -> PathBuf {
        self.path.with_file_name(self.output_file_name())
    }
}

/// Output path for a template path: same directory, `tpl` component removed.
pub fn output_path_for(template_path: &Path) -> Option<PathBuf> {
    TemplateFile::parse(template_path).map(|t| t.output_path())
}

/// Template loader.
pub struct TemplateLoader {
    templates_path: PathBuf,
}

impl TemplateLoader {
    /// Create a new template loader.
    pub fn new(templates_path: impl Into<PathBuf>) -> Self {
        Self {
            templates_path: templates_path.into(),
        }
    }

    pub fn templates_path(&self) -> &Path {
        &self.templates_path
    }

    /// Find every template file under the templates directory, sorted by path.
    pub fn discover(&self) -> TemplateResult<Vec<TemplateFile>> {
        if !self.templates_path.exists() {
            warn!("Templates directory does not exist: {:?}", self.templates_path);
            return Ok(Vec::new());
        }

        let mut templates = Vec::new();
        for entry in WalkDir::new(&self.templates_path).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(template) = TemplateFile::parse(entry.path()) {
                debug!("Found template: {:?}", template.path);
                templates.push(template);
            }
        }

        templates.sort_by(|a, b| a.path.cmp(&b.path));
        info!(
            "Discovered {} template(s) in {:?}",
            templates.len(),
            self.templates_path
        );
        Ok(templates)
    }

    /// Pick a template by base name, preferring the requested variant and
    /// falling back to the unversioned file.
    pub fn select(&self, base: &str, variant: Option<&str>) -> TemplateResult<TemplateFile> {
        let candidates: Vec<TemplateFile> = self
            .discover()?
            .into_iter()
            .filter(|t| t.base == base)
            .collect();

        if let Some(variant) = variant {
            if let Some(found) = candidates
                .iter()
                .find(|t| t.variant.as_deref() == Some(variant))
            {
                return Ok(found.clone());
            }
        }

        if let Some(found) = candidates.iter().find(|t| t.variant.is_none()) {
            if let Some(variant) = variant {
                debug!("No variant {} of {}, using unversioned template", variant, base);
            }
            return Ok(found.clone());
        }

        Err(TemplateError::NotFound(match variant {
            Some(variant) => format!("{} (variant {})", base, variant),
            None => base.to_string(),
        }))
    }

    /// Resolve a manifest reference: either a template file name relative to
    /// the templates directory, or a base name to select with `variant`.
    pub fn find(&self, reference: &str, variant: Option<&str>) -> TemplateResult<TemplateFile> {
        let candidate = self.templates_path.join(reference);
        if let Some(template) = TemplateFile::parse(&candidate) {
            if !candidate.is_file() {
                return Err(TemplateError::NotFound(candidate.display().to_string()));
            }
            return Ok(template);
        }
        self.select(reference, variant)
    }

    /// Read a template's text.
    pub fn load(&self, template: &TemplateFile) -> TemplateResult<String> {
        debug!("Loading template from {:?}", template.path);
        Ok(fs::read_to_string(&template.path)?)
    }
}
