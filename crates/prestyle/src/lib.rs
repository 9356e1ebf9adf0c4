//! prestyle: Static Style Extraction & Resolution
//!
//! Turns parameterized style templates into precomputed CSS classes at build
//! time and resolves live prop objects to those classes at render time.
//! Anything that cannot be enumerated statically stays on the dynamic path.
//!
//! # Example
//! ```rust,ignore
//! use prestyle::{StyleParser, PatternExtractor, StaticGenerator, ResolverMap, StaticResolver};
//!
//! let source = "const Button = styled.button`color: ${p => p.variant === 'primary' ? 'white' : 'black'};`";
//! let declarations = StyleParser::new().parse(source);
//! let patterns = PatternExtractor::new().extract(&declarations[0], source);
//! let records = StaticGenerator::default().generate(&declarations[0], &patterns);
//! let resolver = StaticResolver::new(Some(ResolverMap::from_records(&records)));
//! ```

pub mod config;
pub mod discovery;
pub mod expression;
pub mod generator;
pub mod optimizer;
pub mod parser;
pub mod patterns;
pub mod registry;
pub mod resolver;
pub mod template;
pub mod validator;
pub mod variables;

pub use config::StyleConfig;
pub use generator::{merge_duplicate_rules, CombinationRecord, MergedRule, StaticGenerator};
pub use optimizer::{analyze_size_reduction, CssOptimizer, OptimizedCss, SizeReport};
pub use parser::{ParseOutput, StyleDeclaration, StyleParser};
pub use patterns::{PatternExtractor, PropPattern};
pub use registry::{RegistryStats, StyleRegistry};
pub use resolver::{Resolution, ResolverConfig, ResolverMap, ResolverStats, StaticResolver};
pub use validator::CssValidator;
pub use variables::{CssVariableManager, InlineStyle, StyleTarget};

/// Prop name → chosen value for one combination. Keys are kept sorted.
pub type PropCombination = std::collections::BTreeMap<String, String>;

/// Separator between `key:value` pairs in a canonical combination key
pub const KEY_SEPARATOR: char = '|';

/// Build the canonical lookup key for a set of prop values.
///
/// Pairs are sorted by key so that the key does not depend on the order the
/// props were supplied in. `\\`, `|` and `:` inside names and values are
/// backslash-escaped, so no value can spell the key of another combination.
pub fn canonical_key<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut key = String::new();
    for (i, (name, value)) in pairs.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        push_escaped(&mut key, name);
        key.push(':');
        push_escaped(&mut key, value);
    }
    key
}

fn push_escaped(key: &mut String, part: &str) {
    for ch in part.chars() {
        if matches!(ch, '\\' | KEY_SEPARATOR | ':') {
            key.push('\\');
        }
        key.push(ch);
    }
}

/// 32-bit rolling hash (`h * 31 + c`, wrapping) of a string → 8 hex chars
///
/// Fast and stable across runs. Collisions are possible and tolerated.
pub fn content_hash(s: &str) -> String {
    let mut h: u32 = 0;
    for ch in s.chars() {
        h = h.wrapping_mul(31).wrapping_add(ch as u32);
    }
    format!("{:08x}", h)
}

/// Static style error
///
/// None of these abort a build. They are collected as diagnostics or logged,
/// and the affected unit falls back to the dynamic path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StyleError {
    #[error("Skipped declaration {component}: {reason}")]
    ParseSkip { component: String, reason: String },

    #[error("Rejected CSS for {component}: {reason}")]
    ValidationReject { component: String, reason: String },

    #[error("{component} needs {count} combinations (limit {max})")]
    CombinationOverflow { component: String, count: u128, max: usize },

    #[error("CSS transform failed: {0}")]
    OptimizeFailure(String),

    #[error("Resolver map unavailable: {0}")]
    ResolverDegraded(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key_is_order_independent() {
        let a = canonical_key([("variant", "primary"), ("size", "large")]);
        let b = canonical_key([("size", "large"), ("variant", "primary")]);
        assert_eq!(a, b);
        assert_eq!(a, "size:large|variant:primary");
    }

    #[test]
    fn test_canonical_key_escapes_separators() {
        let forged = canonical_key([("a", "x|b:y")]);
        let real = canonical_key([("a", "x"), ("b", "y")]);
        assert_ne!(forged, real);
        assert_eq!(forged, r"a:x\|b\:y");
        assert_eq!(canonical_key([("a", r"x\")]), r"a:x\\");
        assert_ne!(canonical_key([("a:b", "c")]), canonical_key([("a", "b:c")]));
    }

    #[test]
    fn test_canonical_key_empty() {
        assert_eq!(canonical_key(std::iter::empty()), "");
    }

    #[test]
    fn test_content_hash_stable() {
        assert_eq!(content_hash("color: red;"), content_hash("color: red;"));
        assert_ne!(content_hash("color: red;"), content_hash("color: blue;"));
        assert_eq!(content_hash(""), "00000000");
        assert_eq!(content_hash("a"), "00000061");
        assert_eq!(content_hash("ab"), format!("{:08x}", 97 * 31 + 98));
    }
}
