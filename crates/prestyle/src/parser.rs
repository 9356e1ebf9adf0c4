//! Style Source Parser
//!
//! Locates style-template declarations (`const Button = styled.button\`…\``)
//! in a unit of source text and extracts their raw bodies. This is targeted
//! pattern recognition, not a grammar: anything unexpected is skipped with a
//! diagnostic and the scan moves on.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::validator::CssValidator;
use crate::{content_hash, template, StyleError};

/// Bytes after a declaration searched for animation wrappers
pub const ANIMATION_LOOKAHEAD: usize = 500;

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:styled\s*\.\s*([A-Za-z][\w-]*)|styled\s*\(\s*(?:'([^']*)'|"([^"]*)"|([A-Za-z_$][\w$.]*))\s*\)|(css)\b)"#,
    )
    .expect("static regex")
});

static ANIMATION_PROPERTIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s;{])(?:animation|transition|transform)(?:-[a-z-]+)?\s*:|@keyframes\b")
        .expect("static regex")
});

static ANIMATION_HOOKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\buse(?:Spring|Springs|Transition|Trail|Chain)\s*\(").expect("static regex")
});

/// One parsed style-template binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleDeclaration {
    /// Identifier the style is bound to
    pub component_name: String,
    /// Underlying element or base component, if any
    pub tag_name: Option<String>,
    /// Raw template body
    pub style_body: String,
    /// Body uses animation properties, or the component is wrapped for
    /// continuous animation
    pub has_animation: bool,
    /// Rolling hash of `style_body`
    pub content_hash: String,
}

impl StyleDeclaration {
    /// Build a declaration, deriving the hash and the body-level animation flag
    pub fn new(component_name: &str, tag_name: Option<&str>, style_body: &str) -> Self {
        Self {
            component_name: component_name.to_string(),
            tag_name: tag_name.map(str::to_string),
            style_body: style_body.to_string(),
            has_animation: body_has_animation(style_body),
            content_hash: content_hash(style_body),
        }
    }
}

/// Parse result with the diagnostics of skipped declarations
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub declarations: Vec<StyleDeclaration>,
    pub diagnostics: Vec<StyleError>,
}

/// Style source parser
#[derive(Debug, Default)]
pub struct StyleParser {
    validator: CssValidator,
}

impl StyleParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a source unit, dropping declarations that could not be parsed
    pub fn parse(&self, source: &str) -> Vec<StyleDeclaration> {
        self.parse_with_diagnostics(source).declarations
    }

    /// Parse a source unit, keeping a diagnostic for every skipped declaration
    pub fn parse_with_diagnostics(&self, source: &str) -> ParseOutput {
        let mut output = ParseOutput::default();
        let mut pos = 0;

        while let Some(caps) = DECLARATION.captures_at(source, pos) {
            let Some(whole) = caps.get(0) else { break };
            let name = caps.get(1).map_or("", |m| m.as_str());
            let tag = (2..=5).find_map(|i| caps.get(i)).map(|m| m.as_str());

            match self.parse_declaration(source, whole.end(), name, tag) {
                Ok((declaration, next)) => {
                    tracing::debug!(
                        component = %declaration.component_name,
                        hash = %declaration.content_hash,
                        animated = declaration.has_animation,
                        "parsed style declaration"
                    );
                    output.declarations.push(declaration);
                    pos = next;
                }
                Err(error) => {
                    tracing::warn!(component = name, %error, "skipping style declaration");
                    output.diagnostics.push(error);
                    pos = whole.end();
                }
            }
        }

        output
    }

    /// Parse one declaration whose binding call ends at `call_end`.
    /// Returns the declaration and the byte index just past its template.
    fn parse_declaration(
        &self,
        source: &str,
        call_end: usize,
        name: &str,
        tag: Option<&str>,
    ) -> Result<(StyleDeclaration, usize), StyleError> {
        let skip = |reason: &str| StyleError::ParseSkip {
            component: name.to_string(),
            reason: reason.to_string(),
        };

        let open = find_template_start(source, call_end)
            .ok_or_else(|| skip("no template literal after the style call"))?;
        let close = template::find_template_end(source, open + 1)
            .ok_or_else(|| skip("unterminated template literal"))?;

        let body = &source[open + 1..close];
        self.validator
            .check_style_body(body)
            .map_err(|reason| StyleError::ValidationReject {
                component: name.to_string(),
                reason: reason.to_string(),
            })?;

        let mut declaration = StyleDeclaration::new(name, tag, body);
        if !declaration.has_animation {
            declaration.has_animation = wrapped_for_animation(source, close + 1, name);
        }

        Ok((declaration, close + 1))
    }
}

/// Does the body itself use animation-related CSS?
pub fn body_has_animation(body: &str) -> bool {
    ANIMATION_PROPERTIES.is_match(body)
}

/// Skip whitespace, an optional `.attrs(…)` call and an optional generic
/// argument list, returning the index of the opening backtick.
fn find_template_start(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = skip_whitespace(bytes, from);

    if source[i..].starts_with(".attrs") {
        i = skip_whitespace(bytes, i + ".attrs".len());
        i = skip_balanced(bytes, i, b'(', b')')?;
        i = skip_whitespace(bytes, i);
    }

    if bytes.get(i) == Some(&b'<') {
        i = skip_balanced(bytes, i, b'<', b'>')?;
        i = skip_whitespace(bytes, i);
    }

    (bytes.get(i) == Some(&b'`')).then_some(i)
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Skip a bracketed group starting at `open`, returning the index past it.
/// The `>` of an arrow `=>` never closes a group.
fn skip_balanced(bytes: &[u8], start: usize, open: u8, close: u8) -> Option<usize> {
    if bytes.get(start) != Some(&open) {
        return None;
    }

    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if b == b'>' && i > 0 && bytes[i - 1] == b'=' {
            continue;
        }
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        } else if b == b'`' {
            return None;
        }
    }
    None
}

/// Look for an animation wrapper or hook shortly after the declaration
fn wrapped_for_animation(source: &str, from: usize, name: &str) -> bool {
    let mut end = (from + ANIMATION_LOOKAHEAD).min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let window = &source[from.min(end)..end];

    if ANIMATION_HOOKS.is_match(window) {
        return true;
    }

    let wrapper = format!(
        r"\b(?:animated|withSpring)\s*\(\s*{}\s*[,)]",
        regex::escape(name)
    );
    Regex::new(&wrapper).is_ok_and(|re| re.is_match(window))
}
