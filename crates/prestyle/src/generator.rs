//! Combinatorial Static Generator
//!
//! Expands a declaration's prop patterns into one precompiled rule per value
//! combination. Coverage is all-or-nothing per declaration: either every
//! combination is generated or the component stays on the dynamic path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expression::PatternMatch;
use crate::parser::StyleDeclaration;
use crate::patterns::PropPattern;
use crate::validator::CssValidator;
use crate::{content_hash, template, PropCombination, StyleError};

/// Default cap on combinations per declaration
pub const DEFAULT_MAX_COMBINATIONS: usize = 64;

/// One concrete instantiation of a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationRecord {
    pub prop_combination: PropCombination,
    pub class_name: String,
    /// Interpolated declaration text
    pub css_body: String,
    /// `css_body` wrapped in the class selector
    pub css_rule: String,
    pub css_hash: String,
}

impl CombinationRecord {
    fn new(component_name: &str, prop_combination: PropCombination, css_body: String) -> Self {
        let class_name = class_name(component_name, &prop_combination);
        let css_rule = format!(".{} {{ {} }}", class_name, css_body);
        let css_hash = content_hash(&css_body);
        Self { prop_combination, class_name, css_body, css_rule, css_hash }
    }

    /// Canonical resolver key of this combination
    pub fn key(&self) -> String {
        crate::canonical_key(
            self.prop_combination
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }
}

/// A rule shared by every class whose body is byte-identical
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRule {
    pub class_names: Vec<String>,
    pub css_body: String,
}

impl MergedRule {
    pub fn selector(&self) -> String {
        self.class_names
            .iter()
            .map(|name| format!(".{}", name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_css(&self) -> String {
        format!("{} {{ {} }}", self.selector(), self.css_body)
    }
}

/// Generation result with the diagnostics of everything dropped
#[derive(Debug, Default)]
pub struct GenerateOutput {
    pub records: Vec<CombinationRecord>,
    pub diagnostics: Vec<StyleError>,
}

/// Combinatorial static generator
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    max_combinations: usize,
    validator: CssValidator,
}

impl Default for StaticGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMBINATIONS)
    }
}

impl StaticGenerator {
    pub fn new(max_combinations: usize) -> Self {
        Self {
            max_combinations,
            validator: CssValidator::new(),
        }
    }

    pub fn max_combinations(&self) -> usize {
        self.max_combinations
    }

    /// Generate the records of one declaration
    pub fn generate(&self, declaration: &StyleDeclaration, patterns: &[PropPattern]) -> Vec<CombinationRecord> {
        self.generate_with_diagnostics(declaration, patterns).records
    }

    /// Generate the records of one declaration, keeping a diagnostic for each
    /// dropped combination or for the dropped declaration
    pub fn generate_with_diagnostics(
        &self,
        declaration: &StyleDeclaration,
        patterns: &[PropPattern],
    ) -> GenerateOutput {
        let mut output = GenerateOutput::default();
        let component = declaration.component_name.as_str();

        if declaration.has_animation {
            tracing::debug!(component, "animated declaration left to the dynamic path");
            return output;
        }

        if let Err(reason) = self.validator.check_style_body(&declaration.style_body) {
            tracing::warn!(component, reason, "style body rejected");
            output.diagnostics.push(StyleError::ValidationReject {
                component: component.to_string(),
                reason: reason.to_string(),
            });
            return output;
        }

        let count = combination_count(patterns);
        if count > self.max_combinations as u128 {
            tracing::warn!(component, count = %count, max = self.max_combinations, "too many combinations");
            output.diagnostics.push(StyleError::CombinationOverflow {
                component: component.to_string(),
                count,
                max: self.max_combinations,
            });
            return output;
        }

        // Patterns without candidates are held at their default and never enumerated
        let (enumerated, held): (Vec<&PropPattern>, Vec<&PropPattern>) = patterns
            .iter()
            .partition(|pattern| !pattern.candidate_values.is_empty());
        let held_defaults: BTreeMap<String, String> = held
            .iter()
            .filter_map(|p| Some((p.prop_name.clone(), p.default_value.clone()?)))
            .collect();

        let mut combinations = Vec::new();
        enumerate(&enumerated, 0, &mut PropCombination::new(), &mut combinations);

        for combination in combinations {
            let mut context = held_defaults.clone();
            context.extend(combination.clone());

            let checked = interpolate(&declaration.style_body, &context)
                .and_then(|css_body| self.validator.check(&css_body).map(|()| css_body));
            match checked {
                Ok(css_body) => output.records.push(CombinationRecord::new(component, combination, css_body)),
                Err(reason) => {
                    tracing::warn!(component, ?combination, reason, "generated CSS rejected");
                    output.diagnostics.push(StyleError::ValidationReject {
                        component: component.to_string(),
                        reason: format!("{} for {:?}", reason, combination),
                    });
                }
            }
        }

        tracing::debug!(component, records = output.records.len(), "generated static rules");
        output
    }
}

/// Number of combinations the patterns expand to; empty patterns count as 1
pub fn combination_count(patterns: &[PropPattern]) -> u128 {
    patterns
        .iter()
        .map(|pattern| pattern.candidate_values.len().max(1) as u128)
        .try_fold(1u128, |total, n| total.checked_mul(n))
        .unwrap_or(u128::MAX)
}

/// Cartesian product in pattern order, values in discovery order
fn enumerate(
    patterns: &[&PropPattern],
    index: usize,
    current: &mut PropCombination,
    out: &mut Vec<PropCombination>,
) {
    let Some(pattern) = patterns.get(index) else {
        out.push(current.clone());
        return;
    };

    for value in &pattern.candidate_values {
        current.insert(pattern.prop_name.clone(), value.clone());
        enumerate(patterns, index + 1, current, out);
    }
    current.remove(&pattern.prop_name);
}

/// Substitute every recognized interpolation with its value under `context`.
///
/// Interpolations that cannot be resolved are left verbatim, which the
/// validator then rejects. A value that would end its declaration or open a
/// block is an error.
pub fn interpolate(body: &str, context: &BTreeMap<String, String>) -> Result<String, &'static str> {
    let validator = CssValidator::new();
    let mut rejected = None;

    let out = template::replace_interpolations(body, |interp| {
        let value = PatternMatch::parse(interp.expression)?
            .evaluate(|name| context.get(name).map(String::as_str))?;
        match validator.check_value(&value) {
            Ok(()) => Some(value),
            Err(reason) => {
                rejected.get_or_insert(reason);
                None
            }
        }
    });

    match rejected {
        Some(reason) => Err(reason),
        None => Ok(out.trim().to_string()),
    }
}

/// Deterministic class name: lowercase component name followed by the sorted
/// `key-value` tokens of the combination
pub fn class_name(component_name: &str, combination: &PropCombination) -> String {
    let mut tokens: Vec<String> = combination
        .iter()
        .map(|(name, value)| format!("{}-{}", class_token(name), class_token(value)))
        .collect();
    tokens.sort();

    let mut name = class_token(&component_name.to_lowercase());
    for token in tokens {
        name.push('_');
        name.push_str(&token);
    }
    name
}

/// Replace characters not allowed in a class name. A changed token, or one
/// containing the `_` token separator, gets a short hash suffix so distinct
/// values never share a class.
fn class_token(raw: &str) -> String {
    let token: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();

    if token == raw && !raw.contains('_') {
        token
    } else {
        format!("{}{}", token, &content_hash(raw)[4..])
    }
}

/// Group records with identical bodies into shared rules, in first-seen order
pub fn merge_duplicate_rules(records: &[CombinationRecord]) -> Vec<MergedRule> {
    let mut merged: Vec<MergedRule> = Vec::new();

    for record in records {
        match merged.iter_mut().find(|rule| rule.css_body == record.css_body) {
            Some(rule) => {
                if !rule.class_names.contains(&record.class_name) {
                    rule.class_names.push(record.class_name.clone());
                }
            }
            None => merged.push(MergedRule {
                class_names: vec![record.class_name.clone()],
                css_body: record.css_body.clone(),
            }),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> StyleDeclaration {
        StyleDeclaration::new(
            "Button",
            Some("button"),
            "color: ${p => p.variant === 'primary' ? 'white' : 'black'};\n\
             padding: ${p => p.size === 'large' ? '12px' : '4px'};",
        )
    }

    fn button_patterns() -> Vec<PropPattern> {
        vec![
            PropPattern::new("variant", ["primary", "secondary"]),
            PropPattern::new("size", ["small", "large"]),
        ]
    }

    #[test]
    fn test_generates_every_combination() {
        let records = StaticGenerator::default().generate(&button(), &button_patterns());
        assert_eq!(records.len(), 4);

        let names: Vec<&str> = records.iter().map(|r| r.class_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "button_size-small_variant-primary",
                "button_size-large_variant-primary",
                "button_size-small_variant-secondary",
                "button_size-large_variant-secondary",
            ]
        );

        let primary_large = &records[1];
        assert_eq!(primary_large.css_body, "color: white;\npadding: 12px;");
        assert_eq!(
            primary_large.css_rule,
            ".button_size-large_variant-primary { color: white;\npadding: 12px; }"
        );
    }

    #[test]
    fn test_animation_yields_nothing() {
        let mut decl = button();
        decl.has_animation = true;
        assert!(StaticGenerator::default().generate(&decl, &button_patterns()).is_empty());
    }

    #[test]
    fn test_overflow_yields_nothing() {
        let out = StaticGenerator::new(3).generate_with_diagnostics(&button(), &button_patterns());
        assert!(out.records.is_empty());
        assert!(matches!(
            out.diagnostics[0],
            StyleError::CombinationOverflow { count: 4, max: 3, .. }
        ));
    }

    #[test]
    fn test_static_component() {
        let decl = StyleDeclaration::new("Plain", None, "  margin: 0;  ");
        let records = StaticGenerator::default().generate(&decl, &[]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].class_name, "plain");
        assert!(records[0].prop_combination.is_empty());
        assert_eq!(records[0].css_body, "margin: 0;");
    }

    #[test]
    fn test_unresolvable_body_without_patterns() {
        let decl = StyleDeclaration::new("Broken", None, "color: ${x => { throw }}");
        let out = StaticGenerator::default().generate_with_diagnostics(&decl, &[]);
        assert!(out.records.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_single_bad_combination_is_skipped() {
        let decl = StyleDeclaration::new(
            "Note",
            None,
            "content: ${p => p.kind === 'ok' ? 'fine' : 'x => { throw }'};",
        );
        let patterns = vec![PropPattern::new("kind", ["ok", "bad"])];
        let out = StaticGenerator::default().generate_with_diagnostics(&decl, &patterns);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].class_name, "note_kind-ok");
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_held_pattern_uses_default() {
        let decl = StyleDeclaration::new("Gap", None, "gap: ${p => p.gap};");
        let patterns = vec![PropPattern::new("gap", Vec::<String>::new()).with_default("8px")];
        let records = StaticGenerator::default().generate(&decl, &patterns);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].css_body, "gap: 8px;");
        assert!(records[0].prop_combination.is_empty());
    }

    #[test]
    fn test_class_name_is_deterministic() {
        let mut combo = PropCombination::new();
        combo.insert("variant".into(), "primary".into());
        combo.insert("size".into(), "large".into());
        assert_eq!(class_name("Button", &combo), class_name("Button", &combo.clone()));
        assert_eq!(class_name("Button", &combo), "button_size-large_variant-primary");
        assert_eq!(class_name("Button", &PropCombination::new()), "button");
    }

    #[test]
    fn test_class_name_sanitizes_values() {
        let mut a = PropCombination::new();
        a.insert("opacity".into(), "0.5".into());
        let mut b = PropCombination::new();
        b.insert("opacity".into(), "0-5".into());

        let name_a = class_name("Box", &a);
        assert!(name_a.starts_with("box_opacity-0-5"));
        assert_ne!(name_a, class_name("Box", &b));
    }

    #[test]
    fn test_class_name_separator_in_value() {
        let mut forged = PropCombination::new();
        forged.insert("a".into(), "x_b-y".into());
        let mut real = PropCombination::new();
        real.insert("a".into(), "x".into());
        real.insert("b".into(), "y".into());

        assert_eq!(class_name("C", &real), "c_a-x_b-y");
        assert_ne!(class_name("C", &forged), class_name("C", &real));
        assert!(!class_name("My_Box", &PropCombination::new()).ends_with("my_box"));
    }

    #[test]
    fn test_value_escaping_its_declaration_is_rejected() {
        let decl = StyleDeclaration::new("Swatch", None, "color: ${p => p.tone};");
        let patterns = vec![PropPattern::new("tone", ["red", "red; } body { display: none"])];
        let out = StaticGenerator::default().generate_with_diagnostics(&decl, &patterns);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].css_body, "color: red;");
        assert!(matches!(
            out.diagnostics.as_slice(),
            [StyleError::ValidationReject { reason, .. }] if reason.contains("escapes its declaration")
        ));
        assert!(out.records.iter().all(|r| !r.css_rule.contains("body")));
    }

    #[test]
    fn test_merge_duplicate_rules() {
        let decl = StyleDeclaration::new(
            "Tag",
            None,
            "color: ${p => p.tone === 'loud' ? 'red' : 'gray'};",
        );
        let patterns = vec![PropPattern::new("tone", ["loud", "soft", "quiet"])];
        let records = StaticGenerator::default().generate(&decl, &patterns);
        let merged = merge_duplicate_rules(&records);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].class_names, vec!["tag_tone-soft", "tag_tone-quiet"]);
        assert_eq!(merged[1].to_css(), ".tag_tone-soft, .tag_tone-quiet { color: gray; }");
    }

    #[test]
    fn test_combination_count() {
        assert_eq!(combination_count(&[]), 1);
        assert_eq!(combination_count(&button_patterns()), 4);
        let held = PropPattern::new("x", Vec::<String>::new());
        assert_eq!(combination_count(&[held]), 1);
    }
}
