//! One generation pass: discover, extract, rewrite, encode, register.

use crate::config::{NamespaceConfig, Options};
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::extractor::{self, SelectorSet};
use crate::preprocess::{Preprocessor, Stylesheets};
use crate::registrar::{self, EncodedVariant, VariantSink};
use crate::rewrite::rewrite;
use crate::scanner;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Selectors per source file stem, in discovery order.
///
/// A later file with the same stem replaces the earlier one's selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorMap {
    files: Vec<(String, SelectorSet)>,
}

impl SelectorMap {
    pub fn insert(&mut self, name: String, selectors: SelectorSet) {
        match self.files.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = selectors,
            None => self.files.push((name, selectors)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SelectorSet> {
        self.files
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, selectors)| selectors)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(name, _)| name.as_str())
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.files.iter().flat_map(|(_, selectors)| selectors.iter())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub struct Plugin {
    options: Options,
    base_dir: PathBuf,
    preprocessor: Box<dyn Preprocessor>,
}

impl Plugin {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            base_dir: PathBuf::from("."),
            preprocessor: Box::new(Stylesheets),
        }
    }

    /// Directory that relative `source` and `ignore` patterns resolve against.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn preprocessor(mut self, preprocessor: impl Preprocessor + 'static) -> Self {
        self.preprocessor = Box::new(preprocessor);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn collect_selectors(&self) -> Result<SelectorMap> {
        self.options.validate()?;
        let paths = scanner::resolve_sources(
            &self.options.source.patterns(),
            &self.options.ignore,
            &self.base_dir,
        )?;

        let mut map = SelectorMap::default();
        for path in paths {
            let source = scanner::read_source(&path)?;
            let css = self.preprocessor.compile(&source.path, &source.content)?;
            let selectors = extract_selectors(&source.path, &css)?;
            debug!(path = %source.path.display(), selectors = selectors.len(), "extracted selectors");
            map.insert(source.name, selectors);
        }
        Ok(map)
    }

    /// Every variant of the pass, computed before anything is registered.
    pub fn variants(&self) -> Result<Vec<EncodedVariant>> {
        let map = self.collect_selectors()?;
        encode_variants(&map, &self.options.namespace_config())
    }

    /// Runs the pass against `sink` and returns the number of registrations.
    pub fn apply<S>(&self, sink: &mut S) -> Result<usize>
    where
        S: VariantSink + ?Sized,
    {
        let map = self.collect_selectors()?;
        let variants = encode_variants(&map, &self.options.namespace_config())?;
        for variant in &variants {
            registrar::register(sink, variant)?;
        }
        debug!(files = map.len(), variants = variants.len(), "registered variants");
        Ok(variants.len())
    }
}

/// Runs a pass relative to the current directory with the default preprocessor.
pub fn register_variants<S>(options: Options, sink: &mut S) -> Result<usize>
where
    S: VariantSink + ?Sized,
{
    Plugin::new(options).apply(sink)
}

pub fn encode_variants(map: &SelectorMap, config: &NamespaceConfig) -> Result<Vec<EncodedVariant>> {
    let encoder = Encoder::new(config)?;
    Ok(map
        .selectors()
        .map(|selector| EncodedVariant::new(&encoder, &rewrite(selector, config)))
        .collect())
}

fn extract_selectors(path: &Path, css: &str) -> Result<SelectorSet> {
    extractor::extract(css).map_err(|err| Error::Parse {
        path: path.to_path_buf(),
        message: err.message,
        line: err.line,
        column: err.column,
    })
}
