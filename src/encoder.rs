//! Variant-name encoding.
//!
//! A target selector becomes a flat token usable between the `:`
//! separators of a utility class. The stages run in a fixed order and
//! each one rewrites the output of the previous stage:
//!
//! 1. `[class*=X]` becomes `X`
//! 2. namespaced classes take the public prefix (only with a namespace)
//! 3. class dots at the start or right after a combinator are dropped
//! 4. `:` / `::` become `!`
//! 5. whitespace runs become `|`

use crate::config::NamespaceConfig;
use crate::error::{Error, Result};
use regex::{Captures, NoExpand, Regex};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Encoder {
    namespace: Option<NamespacePatterns>,
}

#[derive(Debug, Clone)]
struct NamespacePatterns {
    compound: Regex,
    bare: Regex,
    prefix: String,
}

impl Encoder {
    /// Encoder without namespace substitution.
    pub fn plain() -> Self {
        Self { namespace: None }
    }

    pub fn new(config: &NamespaceConfig) -> Result<Self> {
        if config.namespace.is_empty() {
            return Ok(Self::plain());
        }
        let escaped = regex::escape(&config.namespace);
        let compound = compile(&format!(r"([a-zA-Z]+)\.{}-", escaped), &config.namespace)?;
        let bare = compile(&format!(r"\.{}-", escaped), &config.namespace)?;
        Ok(Self {
            namespace: Some(NamespacePatterns {
                compound,
                bare,
                prefix: config.public_prefix().to_string(),
            }),
        })
    }

    pub fn encode(&self, target: &str) -> String {
        let name = unwrap_attribute_classes(target);
        let name = self.substitute_namespace(&name);
        let name = strip_class_dots(&name);
        let name = mark_pseudos(&name);
        join_descendants(&name)
    }

    /// `tag.ns-x` keeps its dot, a bare `.ns-x` loses it.
    pub fn substitute_namespace(&self, selector: &str) -> String {
        let Some(patterns) = self.namespace.as_ref() else {
            return selector.to_string();
        };
        let compound = patterns
            .compound
            .replace_all(selector, |caps: &Captures| {
                format!("{}.{}-", &caps[1], patterns.prefix)
            });
        let bare_replacement = format!("{}-", patterns.prefix);
        patterns
            .bare
            .replace_all(&compound, NoExpand(&bare_replacement))
            .into_owned()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::plain()
    }
}

pub fn unwrap_attribute_classes(selector: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| static_regex(r"\[class\*=(.*)\]"));
    pattern.replace_all(selector, "${1}").into_owned()
}

pub fn strip_class_dots(selector: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| static_regex(r"^\.+|(\s+|\+|~|>)\."));
    pattern.replace_all(selector, "${1}").into_owned()
}

pub fn mark_pseudos(selector: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| static_regex(r":+"));
    pattern.replace_all(selector, "!").into_owned()
}

pub fn join_descendants(selector: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| static_regex(r"\s+"));
    pattern.replace_all(selector, "|").into_owned()
}

fn compile(pattern: &str, namespace: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| {
        Error::Config(format!(
            "namespace '{}' cannot be matched in selectors: {}",
            namespace, err
        ))
    })
}

fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static selector pattern is valid")
}
