use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One stylesheet read for the current pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File stem, e.g. `el-input` for `theme-chalk/el-input.css`.
    pub name: String,
    pub content: String,
}

pub fn read_source(path: &Path) -> Result<SourceFile> {
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content = match content.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => content,
    };
    Ok(SourceFile {
        path: path.to_path_buf(),
        name: file_stem(path),
        content,
    })
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Resolves literal paths and glob patterns to files, relative to `base`.
///
/// Each pattern's matches are sorted; patterns keep their order and a file
/// matched twice is only listed once.
pub fn resolve_sources(patterns: &[String], ignore: &[String], base: &Path) -> Result<Vec<PathBuf>> {
    let ignore_set = build_globset(ignore)?;
    let mut paths = Vec::new();
    let mut seen = HashSet::new();

    for pattern in patterns {
        let mut matched = if is_glob(pattern) {
            walk_glob(pattern, base)?
        } else {
            let path = base.join(pattern);
            if path.is_file() { vec![path] } else { Vec::new() }
        };
        matched.retain(|path| !is_ignored(&ignore_set, path, base));
        matched.sort();
        for path in matched {
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }

    Ok(paths)
}

fn walk_glob(pattern: &str, base: &Path) -> Result<Vec<PathBuf>> {
    let matcher = compile_glob(pattern)?.compile_matcher();
    let root = base.join(literal_root(pattern));
    let absolute = Path::new(pattern).is_absolute();
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }

    let mut builder = WalkBuilder::new(&root);
    builder
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(true);

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                // A broken link only matters when the pattern would have picked it up.
                if let Some(path) = error_path(&err).filter(|path| is_dangling(path)) {
                    if !glob_matches(&matcher, path, base, absolute) {
                        continue;
                    }
                }
                return Err(walk_error(&root, err));
            }
        };
        let path = entry.path();
        if !glob_matches(&matcher, path, base, absolute) {
            continue;
        }
        if is_dangling(path) {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "dangling symlink"),
            });
        }
        if entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            out.push(path.to_path_buf());
        }
    }

    Ok(out)
}

fn is_dangling(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
        && !path.exists()
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

fn walk_error(root: &Path, err: ignore::Error) -> Error {
    let path = error_path(&err).unwrap_or(root).to_path_buf();
    let source = match err.io_error() {
        Some(io_err) => io::Error::new(io_err.kind(), err.to_string()),
        None => io::Error::other(err.to_string()),
    };
    Error::Read { path, source }
}

fn glob_matches(matcher: &GlobMatcher, path: &Path, base: &Path, absolute: bool) -> bool {
    if absolute {
        return matcher.is_match(path);
    }
    let relative = path.strip_prefix(base).unwrap_or(path);
    matcher.is_match(relative)
}

fn is_ignored(ignore_set: &GlobSet, path: &Path, base: &Path) -> bool {
    let relative = path.strip_prefix(base).unwrap_or(path);
    ignore_set.is_match(relative) || ignore_set.is_match(path)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Leading path components of `pattern` that contain no glob syntax.
fn literal_root(pattern: &str) -> PathBuf {
    let literal = pattern
        .split('/')
        .take_while(|component| !is_glob(component))
        .collect::<Vec<_>>();
    if literal.len() == 1 && literal[0].is_empty() {
        return PathBuf::from("/");
    }
    PathBuf::from(literal.join("/"))
}

fn compile_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|err| Error::InvalidGlob {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile_glob(pattern)?);
    }
    builder.build().map_err(|err| Error::InvalidGlob {
        pattern: patterns.join(", "),
        message: err.to_string(),
    })
}

/// Collects utility-class candidates from content files (markup or scripts).
pub fn scan_content(patterns: &[String], ignore: &[String], base: &Path) -> Result<Vec<String>> {
    let mut classes = Vec::new();
    let mut seen = HashSet::new();

    for path in resolve_sources(patterns, ignore, base)? {
        let text = fs::read_to_string(&path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        for class in extract_candidates(&text) {
            if seen.insert(class.clone()) {
                classes.push(class);
            }
        }
    }

    Ok(classes)
}

/// Class candidates from `class`-like attributes and quoted strings.
pub fn extract_candidates(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for value in quoted_values(text) {
        for token in value.split_whitespace() {
            if is_candidate(token) && seen.insert(token.to_string()) {
                out.push(token.to_string());
            }
        }
    }

    out
}

fn quoted_values(text: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(['"', '\'', '`']) {
        let Some(quote) = rest[start..].chars().next() else {
            break;
        };
        let body = &rest[start + 1..];
        match body.find(quote) {
            Some(end) => {
                values.push(&body[..end]);
                rest = &body[end + 1..];
            }
            None => break,
        }
    }

    values
}

fn is_candidate(token: &str) -> bool {
    !token.is_empty()
        && token.chars().any(|ch| ch.is_ascii_alphanumeric())
        && !token.contains(['<', '=', '{', '}', ';', '(', ')', ',', '$'])
        && !token.starts_with(['/', '.', '#', '@'])
}
