//! Secondary Value Discovery
//!
//! Best-effort completion of a prop's value domain from the rest of the source
//! unit. Sources are consulted in a fixed order and the first one that yields
//! values wins:
//! 1. Type declarations (`variant?: 'primary' | 'secondary'`, `flag: boolean`,
//!    one level of `type Alias = 'a' | 'b'`)
//! 2. Usage sites (`variant="primary"`, `variant={'primary'}`, `variant: 'primary'`)
//! 3. Built-in vocabulary for a few conventional prop names

use regex::Regex;

use crate::expression::parse_literal;

/// Conventional prop names with their usual tokens
const VOCABULARY: &[(&str, &[&str])] = &[
    ("size", &["small", "medium", "large"]),
    ("variant", &["primary", "secondary"]),
    ("align", &["left", "center", "right"]),
    ("orientation", &["horizontal", "vertical"]),
];

/// Where discovered values came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverySource {
    TypeDeclaration,
    UsageSite,
    Vocabulary,
}

/// Discover candidate values for `prop` in `source`
pub fn discover_values(prop: &str, source: &str) -> Option<(DiscoverySource, Vec<String>)> {
    let found = from_type_declarations(prop, source)
        .map(|values| (DiscoverySource::TypeDeclaration, values))
        .or_else(|| from_usage_sites(prop, source).map(|values| (DiscoverySource::UsageSite, values)))
        .or_else(|| from_vocabulary(prop).map(|values| (DiscoverySource::Vocabulary, values)));

    if let Some((origin, values)) = &found {
        tracing::debug!(prop, ?origin, count = values.len(), "discovered prop values");
    }
    found
}

fn from_type_declarations(prop: &str, source: &str) -> Option<Vec<String>> {
    let re = Regex::new(&format!(r"\b{}\??\s*:\s*([^;,\n}}]+)", regex::escape(prop))).ok()?;
    let mut values = Vec::new();

    for caps in re.captures_iter(source) {
        let type_expr = caps[1].trim();
        let members = literal_union(type_expr)
            .filter(|members| members.len() > 1)
            .or_else(|| (type_expr == "boolean").then(boolean_domain))
            .or_else(|| alias_union(type_expr, source));

        if let Some(members) = members {
            push_unique(&mut values, members);
        }
    }

    (!values.is_empty()).then_some(values)
}

fn from_usage_sites(prop: &str, source: &str) -> Option<Vec<String>> {
    let prop = regex::escape(prop);
    let patterns = [
        format!(r#"\b{prop}\s*=\s*\{{?\s*(?:'([^']*)'|"([^"]*)")"#),
        format!(r#"\b{prop}\s*:\s*(?:'([^']*)'|"([^"]*)")\s*[,}}\n]"#),
    ];

    let mut values = Vec::new();
    for pattern in &patterns {
        let Ok(re) = Regex::new(pattern) else { continue };
        for caps in re.captures_iter(source) {
            if let Some(value) = caps.get(1).or_else(|| caps.get(2)) {
                push_unique(&mut values, [value.as_str().to_string()]);
            }
        }
    }

    (!values.is_empty()).then_some(values)
}

fn from_vocabulary(prop: &str) -> Option<Vec<String>> {
    VOCABULARY
        .iter()
        .find(|(name, _)| *name == prop)
        .map(|(_, tokens)| tokens.iter().map(|t| t.to_string()).collect())
}

/// `'a' | 'b' | 3` → `[a, b, 3]`; `None` if any member is not a literal
fn literal_union(type_expr: &str) -> Option<Vec<String>> {
    type_expr
        .split('|')
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .map(parse_literal)
        .collect::<Option<Vec<_>>>()
        .filter(|members| !members.is_empty())
}

fn alias_union(alias: &str, source: &str) -> Option<Vec<String>> {
    if !alias.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return None;
    }
    let re = Regex::new(&format!(r"\btype\s+{}\s*=\s*([^;\n]+)", regex::escape(alias))).ok()?;
    let caps = re.captures(source)?;
    let type_expr = caps[1].trim();
    literal_union(type_expr).or_else(|| (type_expr == "boolean").then(boolean_domain))
}

fn boolean_domain() -> Vec<String> {
    vec!["true".to_string(), "false".to_string()]
}

fn push_unique<I: IntoIterator<Item = String>>(values: &mut Vec<String>, new: I) {
    for value in new {
        if !values.contains(&value) {
            values.push(value);
        }
    }
}
