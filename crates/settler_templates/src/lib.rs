//! # settler_templates
//!
//! Placeholder substitution for instance-specific configuration files.
//!
//! Templates are plain text (PHP settings files, `.env` files, ...) carrying
//! placeholders in either of two syntaxes:
//!
//! - `{{ DB_HOST }}`
//! - `__replace_this_DB_HOST_value__`
//!
//! The [`TemplateRenderer`] is a pure transform from template text and a
//! [`VariableMap`] to rendered text. Everything around it (finding template
//! files, reading values, writing results) lives in the loader, manifest and
//! resolver modules.
//!
//! ## Example
//!
//! ```rust
//! use settler_templates::{RenderOptions, TemplateRenderer, VariableMap};
//!
//! let renderer = TemplateRenderer::new();
//! let vars = VariableMap::new()
//!     .with_variable("DB_HOST", "db")
//!     .with_variable("DB_NAME", "'prod'");
//!
//! let result = renderer
//!     .render(
//!         "host = '{{ DB_HOST }}'; __replace_this_DB_NAME_value__",
//!         &vars,
//!         &RenderOptions::strict(),
//!     )
//!     .unwrap();
//! assert_eq!(result.output, "host = 'db'; 'prod'");
//! ```

pub mod error;
pub mod loader;
pub mod manifest;
pub mod renderer;
pub mod resolver;
pub mod syntax;
pub mod variables;

pub use error::{TemplateError, TemplateResult};
pub use loader::{output_path_for, TemplateFile, TemplateLoader};
pub use manifest::{RenderManifest, TemplateEntry, VariableSpec};
pub use renderer::{MissingPolicy, RenderOptions, RenderResult, TemplateRenderer};
pub use resolver::{
    RenderedFile, ResolveOptions, ResolveResult, TemplateResolver, ValidationResult,
};
pub use syntax::{is_valid_identifier, Placeholder, PlaceholderScanner, Scan, Syntax, SyntaxSet};
pub use variables::{parse_assignment, VariableMap};
