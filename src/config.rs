use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_PREFIX: &str = "ui";

/// Caller-supplied replacement for the default namespace rewrite.
///
/// Receives the extracted selector and the configured namespace and
/// returns the target selector verbatim.
#[derive(Clone)]
pub struct SelectorProcessor(Arc<dyn Fn(&str, &str) -> String + Send + Sync>);

impl SelectorProcessor {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, selector: &str, namespace: &str) -> String {
        (self.0)(selector, namespace)
    }
}

impl fmt::Debug for SelectorProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SelectorProcessor(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Source {
    One(String),
    Many(Vec<String>),
}

impl Source {
    pub fn patterns(&self) -> Vec<String> {
        match self {
            Source::One(pattern) => vec![pattern.clone()],
            Source::Many(patterns) => patterns.clone(),
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Source::Many(Vec::new())
    }
}

impl From<&str> for Source {
    fn from(value: &str) -> Self {
        Source::One(value.to_string())
    }
}

impl From<Vec<String>> for Source {
    fn from(value: Vec<String>) -> Self {
        Source::Many(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Options {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub namespace: String,
    /// Extra palette entries for the reference generator.
    #[serde(default)]
    pub colors: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(skip)]
    pub process_selector: Option<SelectorProcessor>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            source: Source::default(),
            ignore: Vec::new(),
            prefix: default_prefix(),
            namespace: String::new(),
            colors: BTreeMap::new(),
            process_selector: None,
        }
    }
}

impl Options {
    pub fn new(source: impl Into<Source>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_ignore(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_process_selector<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.process_selector = Some(SelectorProcessor::new(f));
        self
    }

    pub fn validate(&self) -> Result<()> {
        let patterns = self.source.patterns();
        if patterns.is_empty() {
            return Err(Error::Config("`source` is required".to_string()));
        }
        if patterns.iter().any(|pattern| pattern.trim().is_empty()) {
            return Err(Error::Config(
                "`source` must not contain empty patterns".to_string(),
            ));
        }
        if self.ignore.iter().any(|pattern| pattern.trim().is_empty()) {
            return Err(Error::Config(
                "`ignore` must not contain empty patterns".to_string(),
            ));
        }
        Ok(())
    }

    pub fn namespace_config(&self) -> NamespaceConfig {
        NamespaceConfig {
            namespace: self.namespace.clone(),
            prefix: self.prefix.clone(),
            rewrite: self.process_selector.clone(),
        }
    }
}

/// Namespace settings for a single generation pass.
#[derive(Debug, Clone, Default)]
pub struct NamespaceConfig {
    pub namespace: String,
    pub prefix: String,
    pub rewrite: Option<SelectorProcessor>,
}

impl NamespaceConfig {
    pub fn new(namespace: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            prefix: prefix.into(),
            rewrite: None,
        }
    }

    /// Prefix used in variant names; falls back to the namespace when empty.
    pub fn public_prefix(&self) -> &str {
        if self.prefix.is_empty() {
            &self.namespace
        } else {
            &self.prefix
        }
    }
}

pub fn load(path: &Path) -> Result<Options> {
    let text = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text)
        .map_err(|err| Error::Config(format!("failed to parse {}: {}", path.display(), err)))
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
