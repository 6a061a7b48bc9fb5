//! Variable maps and the sources they are built from.
//!
//! A [`VariableMap`] only ever holds names that satisfy the placeholder
//! identifier grammar. Values can come from explicit pairs, from a snapshot
//! of the process environment handed in by the caller, or from a values file
//! in YAML, JSON or TOML.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{TemplateError, TemplateResult};
use crate::syntax::is_valid_identifier;

/// Mapping from identifier to replacement value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableMap {
    values: BTreeMap<String, String>,
    ignored: Vec<String>,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, skipping names that are not valid identifiers.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.insert_lenient(name, value);
        }
        map
    }

    /// Build from an environment snapshot such as `std::env::vars()`.
    ///
    /// With a prefix, only variables starting with it are taken and the
    /// prefix is stripped from the name. Names that are not identifiers are
    /// skipped without a warning since every environment carries some.
    pub fn from_env_vars<I>(vars: I, prefix: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = Self::new();
        for (name, value) in vars {
            let name = match prefix {
                Some(prefix) => match name.strip_prefix(prefix) {
                    Some(stripped) => stripped.to_string(),
                    None => continue,
                },
                None => name,
            };

            if is_valid_identifier(&name) {
                map.values.insert(name, value);
            } else {
                debug!("Skipping environment variable {:?}", name);
            }
        }
        map
    }

    /// Load a flat values file. The format follows the file extension.
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        debug!("Loading variables from {:?}", path);
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let values: BTreeMap<String, ScalarValue> = match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => return Err(TemplateError::UnsupportedFormat(path.to_path_buf())),
        };

        Ok(Self::from_pairs(
            values.into_iter().map(|(k, v)| (k, v.to_string())),
        ))
    }

    /// Insert a value, rejecting names that are not identifiers.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> TemplateResult<Option<String>> {
        let name = name.into();
        if !is_valid_identifier(&name) {
            return Err(TemplateError::InvalidIdentifier(name));
        }
        Ok(self.values.insert(name, value.into()))
    }

    /// Insert a value, or record the name as ignored. Returns whether it was inserted.
    pub fn insert_lenient(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        match self.insert(name, value) {
            Ok(_) => true,
            Err(TemplateError::InvalidIdentifier(name)) => {
                warn!("Ignoring variable with invalid name: {:?}", name);
                self.ignored.push(name);
                false
            }
            Err(_) => false,
        }
    }

    /// Builder form of [`VariableMap::insert_lenient`].
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_lenient(name, value);
        self
    }

    /// Layer `other` on top of this map; its values win.
    pub fn merge(&mut self, other: VariableMap) {
        self.values.extend(other.values);
        self.ignored.extend(other.ignored);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Names rejected by the lenient builders.
    pub fn ignored_keys(&self) -> &[String] {
        &self.ignored
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Parse a `NAME=VALUE` assignment. The value may be empty or contain `=`.
pub fn parse_assignment(s: &str) -> TemplateResult<(String, String)> {
    let (name, value) = s.split_once('=').ok_or_else(|| TemplateError::InvalidVariable {
        variable: s.to_string(),
        message: "expected NAME=VALUE".to_string(),
    })?;

    let name = name.trim();
    if !is_valid_identifier(name) {
        return Err(TemplateError::InvalidIdentifier(name.to_string()));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Scalar accepted in a values file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ScalarValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}
