//! Selector extraction from compiled stylesheet text.
//!
//! Walks rule blocks (top-level, nested, and inside at-rule blocks) and
//! collects every selector of every selector list in document order.
//! Declarations and at-rule preludes are skipped. Selector text is taken
//! byte-exact from the source, minus comments.

use cssparser::{
    AtRuleParser, BasicParseErrorKind, CowRcStr, DeclarationParser, ParseError, ParseErrorKind,
    Parser, ParserInput, ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
    StyleSheetParser, ToCss, Token,
};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Distinct selectors of one stylesheet, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorSet {
    selectors: Vec<String>,
    seen: HashSet<String>,
}

impl SelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, selector: String) -> bool {
        if self.seen.contains(&selector) {
            return false;
        }
        self.seen.insert(selector.clone());
        self.selectors.push(selector);
        true
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.selectors
    }
}

impl<'a> IntoIterator for &'a SelectorSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.selectors.iter()
    }
}

pub fn extract(content: &str) -> Result<SelectorSet, SyntaxError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut input = ParserInput::new(content);
    let mut parser = Parser::new(&mut input);
    check_tokens(&mut parser, content.len()).map_err(|err| syntax_error(content, err))?;

    let mut input = ParserInput::new(content);
    let mut parser = Parser::new(&mut input);
    let mut collector = SelectorCollector::default();
    let mut failure = None;
    for result in StyleSheetParser::new(&mut parser, &mut collector) {
        if let Err((err, _)) = result {
            failure = Some(err);
            break;
        }
    }

    match failure {
        Some(err) => Err(match collector.problem.take() {
            Some(problem) => problem.locate(content),
            None => syntax_error(content, err),
        }),
        None => Ok(collector.out),
    }
}

/// Splits a selector list on commas that are not nested in `()`, `[]` or strings.
pub fn split_selector_list(list: &str) -> Vec<String> {
    let mut input = ParserInput::new(list);
    let mut parser = Parser::new(&mut input);
    selector_texts::<()>(&mut parser).unwrap_or_default()
}

/// A structural problem at a byte offset of the stylesheet.
#[derive(Debug, Clone)]
struct Problem {
    message: &'static str,
    offset: usize,
}

impl Problem {
    fn new(message: &'static str, offset: usize) -> Self {
        Self { message, offset }
    }

    fn locate(&self, src: &str) -> SyntaxError {
        let (line, column) = line_and_column(src, self.offset);
        SyntaxError {
            message: self.message.to_string(),
            line,
            column,
        }
    }
}

/// Receives every rule of the stylesheet. Style rule preludes are split
/// into selectors; at-rule blocks and style rule blocks are walked for
/// nested rules; declarations are consumed and dropped.
#[derive(Default)]
struct SelectorCollector {
    out: SelectorSet,
    /// First prelude problem; cssparser may report a less precise error
    /// (end of input) for the same rule.
    problem: Option<Problem>,
}

impl SelectorCollector {
    fn fail<'i, T>(
        &mut self,
        input: &Parser<'i, '_>,
        problem: Problem,
    ) -> Result<T, ParseError<'i, Problem>> {
        self.problem.get_or_insert_with(|| problem.clone());
        Err(input.new_custom_error(problem))
    }

    fn walk_body<'i>(&mut self, input: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, Problem>> {
        for item in RuleBodyParser::new(input, self) {
            item.map_err(|(err, _)| err)?;
        }
        Ok(())
    }
}

impl<'i> QualifiedRuleParser<'i> for SelectorCollector {
    type Prelude = Vec<String>;
    type QualifiedRule = ();
    type Error = Problem;

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Problem>> {
        skip_stray_semicolons(input);
        let start = input.position().byte_index();
        if has_semicolon(input) {
            return self.fail(
                input,
                Problem::new("unexpected declaration outside of a rule", start),
            );
        }
        let selectors = selector_texts::<Problem>(input)?;
        if selectors.is_empty() {
            let at = input.position().byte_index();
            return self.fail(input, Problem::new("rule is missing a selector", at));
        }
        Ok(selectors)
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<(), ParseError<'i, Problem>> {
        for selector in prelude {
            self.out.insert(selector);
        }
        self.walk_body(input)
    }
}

impl<'i> AtRuleParser<'i> for SelectorCollector {
    type Prelude = ();
    type AtRule = ();
    type Error = Problem;

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<(), ParseError<'i, Problem>> {
        while input.next().is_ok() {}
        Ok(())
    }

    fn rule_without_block(&mut self, _prelude: (), _start: &ParserState) -> Result<(), ()> {
        Ok(())
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: (),
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<(), ParseError<'i, Problem>> {
        self.walk_body(input)
    }
}

impl<'i> DeclarationParser<'i> for SelectorCollector {
    type Declaration = ();
    type Error = Problem;

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _declaration_start: &ParserState,
    ) -> Result<(), ParseError<'i, Problem>> {
        let custom_property = name.starts_with("--");
        loop {
            let start = input.position().byte_index();
            let opens_block = match input.next() {
                Ok(token) => matches!(token, Token::CurlyBracketBlock),
                Err(_) => return Ok(()),
            };
            if opens_block && !custom_property {
                // `a:hover { .. }` is a nested rule, not a declaration.
                return Err(input.new_custom_error(Problem::new("unexpected `{`", start)));
            }
        }
    }
}

impl<'i> RuleBodyItemParser<'i, (), Problem> for SelectorCollector {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        true
    }
}

fn skip_stray_semicolons(input: &mut Parser<'_, '_>) {
    loop {
        let state = input.state();
        let is_semicolon = matches!(input.next(), Ok(Token::Semicolon));
        if !is_semicolon {
            input.reset(&state);
            return;
        }
    }
}

fn has_semicolon(input: &mut Parser<'_, '_>) -> bool {
    let state = input.state();
    let mut found = false;
    while let Ok(token) = input.next() {
        if matches!(token, Token::Semicolon) {
            found = true;
            break;
        }
    }
    input.reset(&state);
    found
}

/// Source text of each top-level comma-separated item, comments dropped.
fn selector_texts<'i, E>(input: &mut Parser<'i, '_>) -> Result<Vec<String>, ParseError<'i, E>> {
    let items = input.parse_comma_separated(|item| -> Result<String, ParseError<'i, E>> {
        let mut text = String::new();
        push_source(item, &mut text);
        Ok(text)
    })?;
    Ok(items
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect())
}

/// Appends the exact source of every remaining token except comments.
fn push_source(input: &mut Parser<'_, '_>, out: &mut String) {
    loop {
        let start = input.position();
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return,
        };
        match token {
            Token::Comment(_) => {}
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                out.push_str(input.slice_from(start));
                let inner_end = input.parse_nested_block(|nested| {
                    push_source(nested, out);
                    Ok::<_, ParseError<'_, ()>>(nested.position())
                });
                if let Ok(inner_end) = inner_end {
                    out.push_str(input.slice_from(inner_end));
                }
            }
            _ => out.push_str(input.slice_from(start)),
        }
    }
}

/// Token-level checks cssparser recovers from silently.
fn check_tokens<'i>(input: &mut Parser<'i, '_>, len: usize) -> Result<(), ParseError<'i, Problem>> {
    loop {
        let start = input.position();
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };
        let text = input.slice_from(start);
        let message = match token {
            Token::Comment(_) if !(text.len() >= 4 && text.ends_with("*/")) => {
                Some("unterminated comment")
            }
            Token::QuotedString(_) if !is_terminated_string(text) => Some("unterminated string"),
            Token::BadString(_) => Some("unterminated string"),
            Token::BadUrl(_) => Some("malformed url"),
            Token::CloseCurlyBracket => Some("unexpected `}`"),
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let closed = input.parse_nested_block(|nested| {
                    check_tokens(nested, len)?;
                    Ok(nested.position().byte_index() < len)
                })?;
                (!closed && matches!(token, Token::CurlyBracketBlock)).then_some("unclosed block")
            }
            _ => None,
        };
        if let Some(message) = message {
            return Err(input.new_custom_error(Problem::new(message, start.byte_index())));
        }
    }
}

fn is_terminated_string(text: &str) -> bool {
    let Some(quote) = text.chars().next() else {
        return false;
    };
    if text.len() < 2 || !text.ends_with(quote) {
        return false;
    }
    let body = &text[1..text.len() - 1];
    body.chars().rev().take_while(|&ch| ch == '\\').count() % 2 == 0
}

fn syntax_error(src: &str, err: ParseError<'_, Problem>) -> SyntaxError {
    let message = match err.kind {
        ParseErrorKind::Custom(problem) => return problem.locate(src),
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => {
            "unexpected end of input".to_string()
        }
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("unexpected `{}`", token.to_css_string())
        }
        ParseErrorKind::Basic(BasicParseErrorKind::AtRuleInvalid(name)) => {
            format!("invalid at-rule @{}", name)
        }
        ParseErrorKind::Basic(_) => "invalid rule".to_string(),
    };
    SyntaxError {
        message,
        line: err.location.line as usize + 1,
        column: err.location.column as usize,
    }
}

fn line_and_column(src: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let before = &src[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(idx) => before[idx + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::{extract, split_selector_list};

    fn selectors(css: &str) -> Vec<String> {
        extract(css).expect("css should parse").into_vec()
    }

    #[test]
    fn collects_selector_lists_in_document_order() {
        let css = r#"
.el-input { display: inline-flex; }
.el-input__wrapper, .el-input__inner:focus { border-width: 1px; }
.el-input__inner::placeholder { color: gray; }
"#;
        assert_eq!(
            selectors(css),
            vec![
                ".el-input",
                ".el-input__wrapper",
                ".el-input__inner:focus",
                ".el-input__inner::placeholder",
            ]
        );
    }

    #[test]
    fn drops_later_duplicates() {
        let css = ".a { color: red } .b, .a { color: blue } .b { margin: 0 }";
        assert_eq!(selectors(css), vec![".a", ".b"]);
    }

    #[test]
    fn trims_whitespace_around_commas() {
        let css = ".a ,\n  .b  >  .c\t,.d { color: red }";
        assert_eq!(selectors(css), vec![".a", ".b  >  .c", ".d"]);
    }

    #[test]
    fn walks_rules_inside_at_rules_and_nested_rules() {
        let css = r#"
@charset "UTF-8";
@import url("base.css");
@media (max-width: 600px) {
  .el-input--small .el-input__inner { height: 24px; }
}
@supports (display: grid) { .grid { display: grid; } }
.card {
  color: red;
  .card__title { font-weight: 600 }
}
@font-face { font-family: x; src: url(a.woff); }
"#;
        assert_eq!(
            selectors(css),
            vec![
                ".el-input--small .el-input__inner",
                ".grid",
                ".card",
                ".card__title",
            ]
        );
    }

    #[test]
    fn keyframe_selectors_are_rules_too() {
        let css = "@keyframes spin { from { opacity: 0 } to { opacity: 1 } }";
        assert_eq!(selectors(css), vec!["from", "to"]);
    }

    #[test]
    fn ignores_comments_and_braces_in_strings() {
        let css = r#"
/* .commented { } */
.a/* inline */.b { content: "}"; }
[data-x="{,}"] { color: red }
"#;
        assert_eq!(selectors(css), vec![".a.b", "[data-x=\"{,}\"]"]);
    }

    #[test]
    fn keeps_commas_inside_functional_pseudo_classes() {
        assert_eq!(
            split_selector_list(".a:not(.b, .c), .d:is([x=\"1,2\"])"),
            vec![".a:not(.b, .c)", ".d:is([x=\"1,2\"])"]
        );
    }

    #[test]
    fn selector_text_is_byte_exact() {
        let css = ".el-input-group--prepend>.el-input__wrapper, .a~.b , .c+.d { x: y }";
        assert_eq!(
            selectors(css),
            vec![".el-input-group--prepend>.el-input__wrapper", ".a~.b", ".c+.d"]
        );
    }

    #[test]
    fn leading_byte_order_mark_is_dropped() {
        let css = "\u{FEFF}.el-input__wrapper { border-width: 1px }";
        assert_eq!(selectors(css), vec![".el-input__wrapper"]);
    }

    #[test]
    fn nested_rules_starting_with_a_name_are_rules() {
        let css = r#"
.menu {
  color: red;
  a:hover { color: blue; }
  li > a { margin: 0 }
  --slot: { x: y };
}
@font-face { font-family: x; src: url(a.woff); }
"#;
        assert_eq!(selectors(css), vec![".menu", "a:hover", "li > a"]);
    }

    #[test]
    fn malformed_declaration_is_an_error() {
        assert!(extract(".a { color red; }").is_err());
    }

    #[test]
    fn extraction_is_idempotent() {
        let css = ".x, .y:hover { a: b } .z::after { c: d }";
        assert_eq!(selectors(css), selectors(css));
    }

    #[test]
    fn reports_unclosed_block() {
        let err = extract(".a { color: red;\n.b { color: blue; }").unwrap_err();
        assert_eq!(err.message, "unclosed block");
        assert_eq!((err.line, err.column), (1, 4));
    }

    #[test]
    fn reports_stray_closing_brace() {
        let err = extract(".a { }\n}").unwrap_err();
        assert_eq!(err.message, "unexpected `}`");
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn reports_unterminated_comment_and_string() {
        assert_eq!(
            extract(".a { } /* open").unwrap_err().message,
            "unterminated comment"
        );
        assert_eq!(
            extract(".a { content: \"x }").unwrap_err().message,
            "unterminated string"
        );
    }

    #[test]
    fn reports_missing_selector_and_stray_text() {
        assert_eq!(
            extract("{ color: red }").unwrap_err().message,
            "rule is missing a selector"
        );
        assert_eq!(
            extract("color: red;").unwrap_err().message,
            "unexpected declaration outside of a rule"
        );
        assert_eq!(
            extract(".a { } .b").unwrap_err().message,
            "unexpected end of input"
        );
    }

    #[test]
    fn empty_stylesheet_has_no_selectors() {
        assert!(extract("").expect("empty css").is_empty());
        assert!(extract("  /* only a comment */ ").expect("comment").is_empty());
    }
}
