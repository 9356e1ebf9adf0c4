//! CSS Validator
//!
//! Heuristic check that a piece of text is a CSS body and not host-language
//! code leaked by a bad delimiter scan or an unresolved interpolation.

use std::sync::LazyLock;

use regex::Regex;

use crate::template;

/// Placeholder substituted for interpolations when checking raw bodies
const INTERPOLATION_PLACEHOLDER: &str = "0";

static CODE_FINGERPRINTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\s*(?:import|export)\b",
        r"^\s*(?:const|let|var)\s+[A-Za-z_$]",
        r"^\s*(?:async\s+)?function\b",
        r"^\s*[A-Za-z_$][\w$]*\s*=[^=]",
        r"=>",
        r"\$\{",
        r"\b(?:throw|return)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static regex"))
    .collect()
});

static CSS_CONSTRUCTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[A-Za-z-]+\s*:\s*[^;{}\s][^;{}]*",
        r"\{",
        r"@[A-Za-z-]+",
        r"&",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static regex"))
    .collect()
});

/// CSS text classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct CssValidator;

impl CssValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check finished CSS text, returning the reason on rejection
    pub fn check(&self, css: &str) -> Result<(), &'static str> {
        if css.trim().is_empty() {
            return Err("empty CSS");
        }
        if self.looks_like_code(css) {
            return Err("looks like host-language code");
        }
        let Some(structure) = strip_strings_and_comments(css) else {
            return Err("unterminated string or comment");
        };
        if !braces_balanced(&structure) {
            return Err("unbalanced braces");
        }
        if !CSS_CONSTRUCTS.iter().any(|re| re.is_match(css)) {
            return Err("no recognizable CSS construct");
        }
        Ok(())
    }

    /// Does this text look like finished CSS?
    pub fn is_valid_css(&self, css: &str) -> bool {
        self.check(css).is_ok()
    }

    /// Check a raw template body, ignoring well-formed interpolations
    pub fn check_style_body(&self, body: &str) -> Result<(), &'static str> {
        let neutral = template::replace_interpolations(body, |_| {
            Some(INTERPOLATION_PLACEHOLDER.to_string())
        });
        self.check(&neutral)
    }

    /// Does this raw template body look like a style body?
    pub fn is_valid_style_body(&self, body: &str) -> bool {
        self.check_style_body(body).is_ok()
    }

    /// Check a value about to be substituted into a declaration. A value may
    /// not end its declaration or open and close blocks of its own.
    pub fn check_value(&self, value: &str) -> Result<(), &'static str> {
        let Some(structure) = strip_strings_and_comments(value) else {
            return Err("unterminated string or comment in value");
        };
        if structure.contains(['{', '}', ';']) {
            return Err("value escapes its declaration");
        }
        Ok(())
    }

    /// Does the text carry a host-language syntax fingerprint?
    pub fn looks_like_code(&self, text: &str) -> bool {
        CODE_FINGERPRINTS.iter().any(|re| re.is_match(text))
    }
}

/// `text` without its quoted strings and comments; `None` if one of them
/// never ends
fn strip_strings_and_comments(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => loop {
                match chars.next()? {
                    '\\' => {
                        chars.next()?;
                    }
                    c if c == ch => break,
                    _ => {}
                }
            },
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                loop {
                    let c = chars.next()?;
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(ch),
        }
    }
    Some(out)
}

fn braces_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_declarations() {
        let v = CssValidator::new();
        assert!(v.is_valid_css("color: red;"));
        assert!(v.is_valid_css(".a { margin: 0 }"));
        assert!(v.is_valid_css("@media (min-width: 10px) {}"));
        assert!(v.is_valid_css("&:hover { color: blue; }"));
    }

    #[test]
    fn test_rejects_empty() {
        let v = CssValidator::new();
        assert_eq!(v.check(""), Err("empty CSS"));
        assert_eq!(v.check("   \n\t"), Err("empty CSS"));
    }

    #[test]
    fn test_rejects_code() {
        let v = CssValidator::new();
        assert!(!v.is_valid_css("import x from 'y'"));
        assert!(!v.is_valid_css("const a = 1; color: red;"));
        assert!(!v.is_valid_css("function foo() { return 1 }"));
        assert!(!v.is_valid_css("x = 3"));
        assert!(!v.is_valid_css("color: ${x => { throw }}"));
        assert!(!v.is_valid_css("content: x => { throw }"));
    }

    #[test]
    fn test_rejects_non_css() {
        let v = CssValidator::new();
        assert_eq!(v.check("not css at all;;;"), Err("no recognizable CSS construct"));
    }

    #[test]
    fn test_style_body_ignores_interpolations() {
        let v = CssValidator::new();
        assert!(v.is_valid_style_body("color: ${p => p.color};"));
        assert!(v.is_valid_style_body("color: ${x => { throw }}"));
        assert!(!v.is_valid_style_body("export default Button;"));
        assert!(!v.is_valid_style_body("color: ${p => p.x"));
    }

    #[test]
    fn test_rejects_unbalanced_braces() {
        let v = CssValidator::new();
        assert_eq!(v.check("color: red; } body { display: none;"), Err("unbalanced braces"));
        assert_eq!(v.check("&:hover { color: blue;"), Err("unbalanced braces"));
        assert_eq!(v.check("content: 'x"), Err("unterminated string or comment"));
        assert!(v.is_valid_css("content: '}'; /* { */ color: red;"));
        assert!(!v.is_valid_style_body("color: ${p => p.on ? 'red' : 'blue'}; } body { display: none;"));
    }

    #[test]
    fn test_check_value() {
        let v = CssValidator::new();
        assert_eq!(v.check_value("12px"), Ok(()));
        assert_eq!(v.check_value("\"a;b\""), Ok(()));
        assert_eq!(v.check_value("red; } body { display: none"), Err("value escapes its declaration"));
        assert_eq!(v.check_value("red; margin: 0"), Err("value escapes its declaration"));
        assert!(v.check_value("'open").is_err());
    }

    #[test]
    fn test_attribute_selectors_are_not_assignments() {
        let v = CssValidator::new();
        assert!(v.is_valid_css("input[type=text] { border: 0; }"));
    }
}
