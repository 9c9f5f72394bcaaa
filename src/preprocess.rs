use crate::error::{Error, Result};
use std::path::Path;

/// Turns a source stylesheet into plain CSS text.
pub trait Preprocessor {
    fn compile(&self, path: &Path, source: &str) -> Result<String>;
}

/// Dispatches on file extension: Sass dialects are compiled, everything
/// else is treated as CSS.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stylesheets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Css,
    Scss,
    Sass,
}

impl Dialect {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|value| value.to_str())
            .map(|value| value.to_ascii_lowercase());
        match ext.as_deref() {
            Some("scss") => Dialect::Scss,
            Some("sass") => Dialect::Sass,
            _ => Dialect::Css,
        }
    }
}

impl Preprocessor for Stylesheets {
    fn compile(&self, path: &Path, source: &str) -> Result<String> {
        match Dialect::from_path(path) {
            Dialect::Css => Ok(source.to_string()),
            dialect => compile_sass(path, source, dialect),
        }
    }
}

#[cfg(feature = "sass")]
fn compile_sass(path: &Path, source: &str, dialect: Dialect) -> Result<String> {
    let syntax = match dialect {
        Dialect::Sass => grass::InputSyntax::Sass,
        _ => grass::InputSyntax::Scss,
    };
    let mut options = grass::Options::default().input_syntax(syntax);
    if let Some(dir) = path.parent() {
        options = options.load_path(dir);
    }
    grass::from_string(source.to_string(), &options).map_err(|err| Error::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
        line: 0,
        column: 0,
    })
}

#[cfg(not(feature = "sass"))]
fn compile_sass(path: &Path, _source: &str, _dialect: Dialect) -> Result<String> {
    Err(Error::Parse {
        path: path.to_path_buf(),
        message: "Sass support is disabled (enable the `sass` feature)".to_string(),
        line: 0,
        column: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::{Dialect, Preprocessor, Stylesheets};
    use std::path::Path;

    #[test]
    fn detects_dialect_from_extension() {
        assert_eq!(Dialect::from_path(Path::new("a/el-input.css")), Dialect::Css);
        assert_eq!(Dialect::from_path(Path::new("a/input.SCSS")), Dialect::Scss);
        assert_eq!(Dialect::from_path(Path::new("a/input.sass")), Dialect::Sass);
        assert_eq!(Dialect::from_path(Path::new("a/theme.pcss")), Dialect::Css);
    }

    #[test]
    fn css_passes_through_unchanged() {
        let css = ".el-input { color: red }";
        let out = Stylesheets
            .compile(Path::new("el-input.css"), css)
            .expect("css passthrough");
        assert_eq!(out, css);
    }

    #[cfg(feature = "sass")]
    #[test]
    fn compiles_nested_scss() {
        let scss = r#"
$ns: ep;
.#{$ns}-input {
  &__wrapper { border-width: 1px; }
  &__inner:focus { color: red; }
}
"#;
        let css = Stylesheets
            .compile(Path::new("input.scss"), scss)
            .expect("scss should compile");
        assert!(css.contains(".ep-input__wrapper"));
        assert!(css.contains(".ep-input__inner:focus"));
    }

    #[cfg(feature = "sass")]
    #[test]
    fn scss_errors_are_parse_errors() {
        let err = Stylesheets
            .compile(Path::new("broken.scss"), ".a { color: $missing; }")
            .unwrap_err();
        assert!(err.is_parse());
    }
}
