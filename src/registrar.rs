use crate::encoder::Encoder;
use crate::error::Result;

/// Host-side extension point receiving named variants.
///
/// Each template contains `&`, which the host replaces with the selector
/// of the utility class carrying the variant.
pub trait VariantSink {
    fn add_variant(&mut self, name: &str, templates: &[String]) -> Result<()>;
}

impl<S: VariantSink + ?Sized> VariantSink for &mut S {
    fn add_variant(&mut self, name: &str, templates: &[String]) -> Result<()> {
        (**self).add_variant(name, templates)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedVariant {
    pub name: String,
    pub self_form: String,
    pub descendant_form: String,
}

impl EncodedVariant {
    pub fn new(encoder: &Encoder, target: &str) -> Self {
        Self {
            name: encoder.encode(target),
            self_form: self_form(target),
            descendant_form: descendant_form(target),
        }
    }

    pub fn templates(&self) -> Vec<String> {
        vec![self.self_form.clone(), self.descendant_form.clone()]
    }
}

/// The anchor element itself matches `target`.
pub fn self_form(target: &str) -> String {
    format!("&{}", target)
}

/// Some descendant of the anchor element matches `target`.
pub fn descendant_form(target: &str) -> String {
    format!("& {}", requalify_combinator_operands(target))
}

pub fn register<S>(sink: &mut S, variant: &EncodedVariant) -> Result<()>
where
    S: VariantSink + ?Sized,
{
    tracing::trace!(name = %variant.name, "registering variant");
    sink.add_variant(&variant.name, &variant.templates())
}

/// Prefixes a bare name right after `>`, `~` or `+` with a class dot.
///
/// Combinators inside `[]`, `()` or strings are left alone.
pub fn requalify_combinator_operands(selector: &str) -> String {
    let mut out = String::with_capacity(selector.len() + 4);
    let mut chars = selector.chars().peekable();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        out.push(ch);
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            '>' | '~' | '+' if depth == 0 => {
                while let Some(ws) = chars.next_if(|c| c.is_whitespace()) {
                    out.push(ws);
                }
                if chars.peek().is_some_and(|c| is_bare_name_start(*c)) {
                    out.push('.');
                }
            }
            _ => {}
        }
    }

    out
}

fn is_bare_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-'
}

#[cfg(test)]
mod tests {
    use super::{
        EncodedVariant, VariantSink, descendant_form, register, requalify_combinator_operands,
        self_form,
    };
    use crate::encoder::Encoder;
    use crate::error::{Error, Result};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, Vec<String>)>,
    }

    impl VariantSink for Recorder {
        fn add_variant(&mut self, name: &str, templates: &[String]) -> Result<()> {
            self.calls.push((name.to_string(), templates.to_vec()));
            Ok(())
        }
    }

    struct Rejecting;

    impl VariantSink for Rejecting {
        fn add_variant(&mut self, name: &str, _templates: &[String]) -> Result<()> {
            Err(Error::Registration {
                name: name.to_string(),
                message: "rejected".to_string(),
            })
        }
    }

    #[test]
    fn builds_both_forms() {
        assert_eq!(self_form(".el-input__wrapper"), "&.el-input__wrapper");
        assert_eq!(descendant_form(".el-input__wrapper"), "& .el-input__wrapper");
    }

    #[test]
    fn child_combinator_round_trip() {
        let variant = EncodedVariant::new(
            &Encoder::plain(),
            ".el-input-group--prepend>.el-input__wrapper",
        );
        assert_eq!(variant.name, "el-input-group--prepend>el-input__wrapper");
        assert_eq!(
            variant.descendant_form,
            "& .el-input-group--prepend>.el-input__wrapper"
        );
        assert_eq!(
            variant.self_form,
            "&.el-input-group--prepend>.el-input__wrapper"
        );
    }

    #[test]
    fn bare_operands_after_combinators_are_requalified() {
        assert_eq!(
            requalify_combinator_operands("el-input-group--prepend>el-input__wrapper"),
            "el-input-group--prepend>.el-input__wrapper"
        );
        assert_eq!(requalify_combinator_operands(".a + b ~c"), ".a + .b ~.c");
    }

    #[test]
    fn qualified_operands_are_untouched() {
        for selector in [".a>.b", ".a > #b", ".a>[data-x]", ".a>*", ".a>:hover", ".a > .b"] {
            assert_eq!(requalify_combinator_operands(selector), selector);
        }
    }

    #[test]
    fn combinators_in_brackets_parens_and_strings_are_ignored() {
        for selector in [
            ".a[class~=b]",
            ".a:nth-child(2n+b)",
            ".a[title=\"x>y\"]",
            ".a\\+b",
        ] {
            assert_eq!(requalify_combinator_operands(selector), selector);
        }
    }

    #[test]
    fn registers_both_templates_under_one_name() {
        let mut sink = Recorder::default();
        let variant = EncodedVariant::new(&Encoder::plain(), ".el-input__inner:focus");
        register(&mut sink, &variant).expect("register");
        assert_eq!(
            sink.calls,
            vec![(
                "el-input__inner!focus".to_string(),
                vec![
                    "&.el-input__inner:focus".to_string(),
                    "& .el-input__inner:focus".to_string()
                ]
            )]
        );
    }

    #[test]
    fn host_rejection_propagates() {
        let variant = EncodedVariant::new(&Encoder::plain(), ".a");
        let err = register(&mut Rejecting, &variant).unwrap_err();
        assert!(matches!(err, Error::Registration { ref name, .. } if name == "a"));
    }
}
