//! A small utility-CSS generator acting as the host for selector variants.
//!
//! It knows a handful of utilities and applies registered variant
//! templates to candidates such as `el-input__inner!focus:text-red-500`.

use crate::error::{Error, Result};
use crate::registrar::VariantSink;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneratorConfig {
    pub minify: bool,
    /// Palette entries layered over the built-in palette.
    pub colors: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub css: CssOutput,
    pub class_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CssOutput(String);

impl CssOutput {
    pub fn new(css: String) -> Self {
        Self(css)
    }
}

impl Deref for CssOutput {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl fmt::Display for CssOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<CssOutput> for String {
    fn from(value: CssOutput) -> Self {
        value.0
    }
}

/// Registered variants in registration order.
///
/// Registering an existing name replaces its templates but keeps its slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantTable {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl VariantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<(usize, &[String])> {
        let idx = *self.index.get(name)?;
        Some((idx, self.entries[idx].1.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, templates)| (name.as_str(), templates.as_slice()))
    }
}

impl VariantSink for VariantTable {
    fn add_variant(&mut self, name: &str, templates: &[String]) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Registration {
                name: name.to_string(),
                message: "variant name is empty".to_string(),
            });
        }
        if templates.is_empty() {
            return Err(Error::Registration {
                name: name.to_string(),
                message: "no selector templates".to_string(),
            });
        }
        if let Some(template) = templates.iter().find(|template| !template.contains('&')) {
            return Err(Error::Registration {
                name: name.to_string(),
                message: format!("template '{}' has no `&` placeholder", template),
            });
        }

        match self.index.get(name) {
            Some(&idx) => self.entries[idx].1 = templates.to_vec(),
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), templates.to_vec()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
    variants: VariantTable,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            variants: VariantTable::new(),
        }
    }

    pub fn variants(&self) -> &VariantTable {
        &self.variants
    }

    pub fn generate(&self, classes: &[String]) -> GenerationResult {
        let mut rules = Vec::<(RuleSortKey, Vec<String>)>::new();

        for (position, class) in classes.iter().enumerate() {
            if let Some((variant_order, class_rules)) = self.generate_class(class) {
                let key = RuleSortKey {
                    variant_bucket: u8::from(!variant_order.is_empty()),
                    variant_order,
                    position,
                };
                rules.push((key, class_rules));
            }
        }

        rules.sort_by(|(left, _), (right, _)| left.cmp(right));
        let class_count = rules.len();
        let separator = if self.config.minify { "" } else { "\n" };
        let css = rules
            .into_iter()
            .flat_map(|(_, class_rules)| class_rules)
            .collect::<Vec<_>>()
            .join(separator);

        GenerationResult {
            css: CssOutput::new(css),
            class_count,
        }
    }

    fn generate_class(&self, class: &str) -> Option<(Vec<usize>, Vec<String>)> {
        let (variants, base) = parse_variants(class);
        let declarations = utility_declarations(base, &self.config)?;

        let mut selectors = vec![format!(".{}", escape_selector(class))];
        let mut variant_order = Vec::with_capacity(variants.len());
        for variant in variants.iter().rev() {
            let (order, templates) = self.variants.get(variant)?;
            variant_order.push(order);
            selectors = selectors
                .iter()
                .flat_map(|selector| {
                    templates
                        .iter()
                        .map(move |template| template.replacen('&', selector, 1))
                })
                .collect();
        }
        variant_order.reverse();

        let rules = selectors
            .iter()
            .map(|selector| rule(selector, &declarations, self.config.minify))
            .collect::<Option<Vec<_>>>()?;
        Some((variant_order, rules))
    }
}

impl VariantSink for Generator {
    fn add_variant(&mut self, name: &str, templates: &[String]) -> Result<()> {
        self.variants.add_variant(name, templates)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RuleSortKey {
    variant_bucket: u8,
    variant_order: Vec<usize>,
    position: usize,
}

/// Splits `a:b:utility` on top-level colons; `[]` and `()` protect theirs.
fn parse_variants(class: &str) -> (Vec<&str>, &str) {
    let mut paren_depth = 0usize;
    let mut bracket_depth = 0usize;
    let mut split_indices = Vec::new();

    for (idx, ch) in class.char_indices() {
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            ':' if paren_depth == 0 && bracket_depth == 0 => split_indices.push(idx),
            _ => {}
        }
    }

    let mut variants = Vec::new();
    let mut start = 0usize;
    for idx in split_indices {
        variants.push(&class[start..idx]);
        start = idx + 1;
    }
    (variants, &class[start..])
}

fn utility_declarations(base: &str, config: &GeneratorConfig) -> Option<String> {
    let declarations = match base {
        "border" => "border-width:1px",
        "border-0" => "border-width:0px",
        "border-2" => "border-width:2px",
        "border-4" => "border-width:4px",
        "border-8" => "border-width:8px",
        "border-none" => "border-style:none",
        "border-solid" => "border-style:solid",
        "border-dashed" => "border-style:dashed",
        "border-dotted" => "border-style:dotted",
        "shadow" => {
            "--tw-shadow:0 1px 3px 0 rgb(0 0 0 / 0.1), 0 1px 2px -1px rgb(0 0 0 / 0.1);\
             --tw-shadow-colored:0 1px 3px 0 var(--tw-shadow-color), 0 1px 2px -1px var(--tw-shadow-color);\
             box-shadow:var(--tw-ring-offset-shadow, 0 0 #0000), var(--tw-ring-shadow, 0 0 #0000), var(--tw-shadow)"
        }
        "shadow-none" => {
            "--tw-shadow:0 0 #0000;\
             --tw-shadow-colored:0 0 #0000;\
             box-shadow:var(--tw-ring-offset-shadow, 0 0 #0000), var(--tw-ring-shadow, 0 0 #0000), var(--tw-shadow)"
        }
        "hidden" => "display:none",
        "block" => "display:block",
        "flex" => "display:flex",
        "inline-flex" => "display:inline-flex",
        _ => return color_declarations(base, config),
    };
    Some(declarations.to_string())
}

fn color_declarations(base: &str, config: &GeneratorConfig) -> Option<String> {
    let (prefix, color, shade) = split_color_class(base)?;
    let value = config
        .colors
        .get(color)
        .and_then(|shades| shades.get(shade))
        .map(String::as_str)
        .or_else(|| default_color(color, shade))?;
    let property = match prefix {
        "text" => "color",
        "bg" => "background-color",
        "border" => "border-color",
        "outline" => "outline-color",
        "fill" => "fill",
        "stroke" => "stroke",
        _ => return None,
    };
    Some(format!("{}:{}", property, value))
}

fn split_color_class(class: &str) -> Option<(&str, &str, &str)> {
    let (prefix, rest) = class.split_once('-')?;
    let (color, shade) = rest.rsplit_once('-')?;
    if shade.is_empty() || color.is_empty() {
        return None;
    }
    Some((prefix, color, shade))
}

fn default_color(color: &str, shade: &str) -> Option<&'static str> {
    let value = match (color, shade) {
        ("gray", "100") => "#f3f4f6",
        ("gray", "500") => "#6b7280",
        ("gray", "900") => "#111827",
        ("red", "100") => "#fee2e2",
        ("red", "500") => "#ef4444",
        ("red", "700") => "#b91c1c",
        ("orange", "500") => "#f97316",
        ("yellow", "500") => "#eab308",
        ("green", "500") => "#22c55e",
        ("blue", "100") => "#dbeafe",
        ("blue", "500") => "#3b82f6",
        ("blue", "700") => "#1d4ed8",
        ("purple", "500") => "#a855f7",
        _ => return None,
    };
    Some(value)
}

fn rule(selector: &str, declarations: &str, minify: bool) -> Option<String> {
    let formatted = format_declarations(declarations, minify);
    if formatted.is_empty() {
        return None;
    }
    if minify {
        return Some(format!("{}{{{}}}", selector, formatted));
    }
    let lines = formatted
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .map(|decl| format!("  {};", decl))
        .collect::<Vec<_>>()
        .join("\n");
    Some(format!("{} {{\n{}\n}}", selector, lines))
}

fn format_declarations(declarations: &str, minify: bool) -> String {
    let mut parts = Vec::new();
    for decl in declarations.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        if minify {
            parts.push(format!("{}:{}", name.trim(), value.trim()));
        } else {
            parts.push(format!("{}: {}", name.trim(), value.trim()));
        }
    }
    if minify {
        parts.join(";")
    } else {
        parts.join("; ")
    }
}

pub fn escape_selector(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);

    for ch in class.chars() {
        match ch {
            '\\' | ':' | '/' | '[' | ']' | '(' | ')' | '&' | '>' | '+' | '~' | '|' | ','
            | '%' | '=' | '!' | '*' | '@' | '#' | '\'' | '"' | '.' | '^' | '$' | '?' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' ' => escaped.push_str("\\ "),
            _ => escaped.push(ch),
        }
    }

    escaped
}
