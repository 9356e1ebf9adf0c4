//! Interpolation Expression Matchers
//!
//! Classifies a `${ … }` expression into one of a small closed set of shapes.
//! Each matcher returns `Option<PatternMatch>`; the first match wins and an
//! expression no matcher accepts is declined. Nothing here evaluates general
//! code.

use std::sync::LazyLock;

use regex::Regex;

const REFERENCE: &str = r"[A-Za-z_$][\w$]*(?:\??\.[A-Za-z_$][\w$]*)*";

static PARAM_PREAMBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\(\s*([A-Za-z_$][\w$]*)\s*(?::[^)]*)?\)|([A-Za-z_$][\w$]*))\s*=>\s*")
        .expect("static regex")
});

static DESTRUCTURED_PREAMBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(\s*\{([^}]*)\}\s*(?::[^)]*)?\)\s*=>\s*").expect("static regex")
});

static DESTRUCTURED_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_$][\w$]*)\s*(?:=\s*(.+))?$").expect("static regex")
});

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({REFERENCE})\s*(===|==|!==|!=)\s*(.+)$")).expect("static regex")
});

static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(!?)\s*({REFERENCE})$")).expect("static regex")
});

static LOGICAL_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({REFERENCE})\s*(?:\|\||\?\?)\s*(.+)$")).expect("static regex")
});

static BARE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^({REFERENCE})$")).expect("static regex"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").expect("static regex"));

/// Recognized expression shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// `prop === 'a' ? x : y` (also `==`, `!==`, `!=`)
    Equality {
        compared: String,
        negated: bool,
        then: Option<String>,
        otherwise: Option<String>,
    },
    /// `prop ? x : y`; a `None` branch is not a literal
    Truthy {
        then: Option<String>,
        otherwise: Option<String>,
    },
    /// `prop || 'x'` or `prop ?? 'x'`
    Default { fallback: String },
    /// Nested member access such as `theme.colors.primary`
    Member,
    /// Plain reference to a prop
    Direct,
}

/// A classified expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Prop name, or dot path for nested access
    pub prop_name: String,
    pub shape: Shape,
    /// Default from `||`/`??` or from a destructuring preamble
    pub default_value: Option<String>,
}

type Matcher = fn(&Scope, &str) -> Option<PatternMatch>;

/// Matchers in priority order
const MATCHERS: &[Matcher] = &[match_equality, match_truthy, match_default, match_reference];

impl PatternMatch {
    /// Classify an interpolation expression, or decline
    pub fn parse(expression: &str) -> Option<Self> {
        let (scope, body) = strip_preamble(expression.trim());
        let body = strip_parens(body.trim());
        MATCHERS.iter().find_map(|matcher| matcher(&scope, body))
    }

    /// Values the shape itself tells us the prop can take
    pub fn shape_candidates(&self) -> Vec<String> {
        match &self.shape {
            Shape::Equality { compared, negated, then, otherwise } => {
                let (on_equal, on_differ) = if *negated { (otherwise, then) } else { (then, otherwise) };
                let mut values = vec![compared.clone()];
                // `prop === 'a' ? 'a' : 'b'` maps the prop onto its own domain
                if on_equal.as_ref() == Some(compared) {
                    if let Some(other) = on_differ.as_ref().filter(|other| *other != compared) {
                        values.push(other.clone());
                    }
                }
                values
            }
            Shape::Truthy { then: Some(_), otherwise: Some(_) } => {
                vec!["true".to_string(), "false".to_string()]
            }
            Shape::Default { fallback } => vec![fallback.clone()],
            Shape::Truthy { .. } | Shape::Member | Shape::Direct => Vec::new(),
        }
    }

    /// Does the shape leave the value domain open for secondary discovery?
    pub fn is_open(&self) -> bool {
        matches!(
            self.shape,
            Shape::Equality { .. } | Shape::Default { .. } | Shape::Direct
        )
    }

    /// Evaluate against concrete prop values.
    ///
    /// `None` means the expression cannot be resolved statically and must be
    /// left to the dynamic path.
    pub fn evaluate<'a, F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let value = lookup(&self.prop_name).or(self.default_value.as_deref());

        match &self.shape {
            Shape::Equality { compared, negated, then, otherwise } => {
                let equal = value == Some(compared.as_str());
                if equal != *negated { then.clone() } else { otherwise.clone() }
            }
            Shape::Truthy { then, otherwise } => {
                if value.is_some_and(is_truthy) { then.clone() } else { otherwise.clone() }
            }
            Shape::Default { fallback } => match value {
                Some(v) if is_truthy(v) => Some(v.to_string()),
                _ => Some(fallback.clone()),
            },
            Shape::Member => None,
            Shape::Direct => value.map(str::to_string),
        }
    }
}

/// JavaScript-like truthiness of a stringified value
pub fn is_truthy(value: &str) -> bool {
    !matches!(value, "" | "false" | "0" | "null" | "undefined" | "NaN")
}

/// Parse a literal, returning its value without quotes
pub fn parse_literal(text: &str) -> Option<String> {
    let text = text.trim();
    let first = text.chars().next()?;

    if matches!(first, '\'' | '"' | '`') && text.len() >= 2 && text.ends_with(first) {
        let inner = &text[1..text.len() - 1];
        if inner.contains(first) || (first == '`' && inner.contains("${")) {
            return None;
        }
        return Some(inner.to_string());
    }

    if NUMBER.is_match(text) || text == "true" || text == "false" {
        return Some(text.to_string());
    }

    None
}

/// How references inside the expression reach the prop object
#[derive(Debug)]
enum Scope {
    /// `p => p.variant`
    Param(String),
    /// `({ variant, size = 'md' }) => variant`
    Destructured(Vec<(String, Option<String>)>),
    /// No preamble
    Bare,
}

impl Scope {
    /// Map a reference to `(prop path, destructured default)`
    fn resolve(&self, reference: &str) -> Option<(String, Option<String>)> {
        let reference = reference.replace("?.", ".");
        match self {
            Scope::Param(param) => reference
                .strip_prefix(param.as_str())?
                .strip_prefix('.')
                .map(|path| (path.to_string(), None)),
            Scope::Destructured(names) => {
                let head = reference.split('.').next()?;
                let (_, default) = names.iter().find(|(name, _)| name == head)?;
                Some((reference.clone(), default.clone()))
            }
            Scope::Bare => Some((reference, None)),
        }
    }
}

fn strip_preamble(expression: &str) -> (Scope, &str) {
    if let Some(caps) = DESTRUCTURED_PREAMBLE.captures(expression) {
        let names = caps[1]
            .split(',')
            .filter_map(|entry| {
                let entry = DESTRUCTURED_ENTRY.captures(entry.trim())?;
                let default = entry.get(2).and_then(|m| parse_literal(m.as_str()));
                Some((entry[1].to_string(), default))
            })
            .collect();
        let rest = &expression[caps.get(0).map_or(0, |m| m.end())..];
        return (Scope::Destructured(names), rest);
    }

    if let Some(caps) = PARAM_PREAMBLE.captures(expression) {
        let param = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let rest = &expression[caps.get(0).map_or(0, |m| m.end())..];
        return (Scope::Param(param.to_string()), rest);
    }

    (Scope::Bare, expression)
}

/// Remove one pair of parentheses wrapping the whole expression
fn strip_parens(body: &str) -> &str {
    if body.starts_with('(') && body.ends_with(')') {
        let inner = &body[1..body.len() - 1];
        if balanced(inner) {
            return inner.trim();
        }
    }
    body
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for ch in text.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Split `cond ? a : b` at its top-level `?` and matching `:`
fn split_ternary(body: &str) -> Option<(&str, &str, &str)> {
    let bytes = body.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0i32;
    let mut question: Option<usize> = None;
    let mut pending = 0usize;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'?' if depth == 0 => {
                let next = bytes.get(i + 1).copied();
                if next == Some(b'.') || next == Some(b'?') {
                    i += 2;
                    continue;
                }
                if question.is_none() {
                    question = Some(i);
                } else {
                    pending += 1;
                }
            }
            b':' if depth == 0 && question.is_some() => {
                if pending == 0 {
                    let q = question?;
                    return Some((&body[..q], &body[q + 1..i], &body[i + 1..]));
                }
                pending -= 1;
            }
            _ => {}
        }
        i += 1;
    }

    None
}

fn finish(path: String, default_value: Option<String>, shape: Shape) -> PatternMatch {
    let shape = if path.contains('.') { Shape::Member } else { shape };
    PatternMatch { prop_name: path, shape, default_value }
}

fn match_equality(scope: &Scope, body: &str) -> Option<PatternMatch> {
    let (condition, then, otherwise) = split_ternary(body)?;
    let caps = COMPARISON.captures(condition.trim())?;
    let compared = parse_literal(&caps[3])?;
    let (path, default) = scope.resolve(&caps[1])?;

    Some(finish(
        path,
        default,
        Shape::Equality {
            compared,
            negated: caps[2].starts_with('!'),
            then: parse_literal(then),
            otherwise: parse_literal(otherwise),
        },
    ))
}

fn match_truthy(scope: &Scope, body: &str) -> Option<PatternMatch> {
    let (condition, then, otherwise) = split_ternary(body)?;
    let caps = CONDITION.captures(condition.trim())?;
    let (path, default) = scope.resolve(&caps[2])?;

    let (then, otherwise) = (parse_literal(then), parse_literal(otherwise));
    let (then, otherwise) = if caps[1].is_empty() { (then, otherwise) } else { (otherwise, then) };

    Some(finish(path, default, Shape::Truthy { then, otherwise }))
}

fn match_default(scope: &Scope, body: &str) -> Option<PatternMatch> {
    let caps = LOGICAL_DEFAULT.captures(body)?;
    let fallback = parse_literal(&caps[2])?;
    let (path, _) = scope.resolve(&caps[1])?;

    Some(finish(
        path,
        Some(fallback.clone()),
        Shape::Default { fallback },
    ))
}

fn match_reference(scope: &Scope, body: &str) -> Option<PatternMatch> {
    let caps = BARE_REFERENCE.captures(body)?;
    let (path, default) = scope.resolve(&caps[1])?;
    Some(finish(path, default, Shape::Direct))
}
