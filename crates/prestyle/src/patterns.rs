//! Prop Pattern Extractor
//!
//! Finds the props a style body depends on and the values each can take.
//! Malformed or unrecognized interpolations produce no pattern: a missed
//! optimization is acceptable, a wrong enumeration is not.

use serde::{Deserialize, Serialize};

use crate::discovery::discover_values;
use crate::expression::{PatternMatch, Shape};
use crate::parser::StyleDeclaration;
use crate::template;

/// One prop a style body depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropPattern {
    /// Simple identifier, or dot path for nested access
    pub prop_name: String,
    /// Ordered, duplicate-free candidate values
    pub candidate_values: Vec<String>,
    pub default_value: Option<String>,
}

impl PropPattern {
    pub fn new<I, S>(prop_name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pattern = Self {
            prop_name: prop_name.to_string(),
            candidate_values: Vec::new(),
            default_value: None,
        };
        pattern.add_values(values);
        pattern
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    /// Append values not already present, keeping discovery order
    fn add_values<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            let value = value.into();
            if !self.candidate_values.contains(&value) {
                self.candidate_values.push(value);
            }
        }
    }
}

/// Prop pattern extractor
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    /// Complete open value domains from the surrounding source
    secondary_discovery: bool,
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self { secondary_discovery: true }
    }

    /// Disable scanning the rest of the source for values
    pub fn without_discovery(mut self) -> Self {
        self.secondary_discovery = false;
        self
    }

    /// Extract the enumerable patterns of one declaration.
    ///
    /// `source` is the whole source unit the declaration came from; it is only
    /// read for secondary value discovery.
    pub fn extract(&self, declaration: &StyleDeclaration, source: &str) -> Vec<PropPattern> {
        let patterns = self.extract_body(&declaration.style_body, source);
        tracing::debug!(
            component = %declaration.component_name,
            patterns = patterns.len(),
            "extracted prop patterns"
        );
        patterns
    }

    /// Extract the enumerable patterns of a raw style body
    pub fn extract_body(&self, body: &str, source: &str) -> Vec<PropPattern> {
        let mut patterns: Vec<PropPattern> = Vec::new();

        for interp in template::interpolations(body) {
            let Some(matched) = PatternMatch::parse(interp.expression) else {
                tracing::debug!(expression = interp.expression, "unrecognized interpolation");
                continue;
            };
            if matched.shape == Shape::Member {
                tracing::debug!(prop = %matched.prop_name, "member access left to the dynamic path");
                continue;
            }

            let mut values = matched.shape_candidates();
            if self.secondary_discovery && matched.is_open() {
                if let Some((_, discovered)) = discover_values(&matched.prop_name, source) {
                    values.extend(discovered);
                }
            }

            match patterns.iter_mut().find(|p| p.prop_name == matched.prop_name) {
                Some(existing) => {
                    existing.add_values(values);
                    if existing.default_value.is_none() {
                        existing.default_value = matched.default_value;
                    }
                }
                None => {
                    let mut pattern = PropPattern::new(&matched.prop_name, values);
                    pattern.default_value = matched.default_value;
                    patterns.push(pattern);
                }
            }
        }

        patterns.retain(|pattern| {
            let keep = !pattern.candidate_values.is_empty();
            if !keep {
                tracing::debug!(prop = %pattern.prop_name, "no enumerable values");
            }
            keep
        });
        patterns
    }
}
