//! CSS Variable Manager
//!
//! Turns prop and theme objects into custom-property assignments on a style
//! target. Invalid names and values are dropped silently.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Something custom properties can be written to (an element's inline style)
pub trait StyleTarget {
    fn set_property(&mut self, name: &str, value: &str);
}

/// Ordered inline style declarations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    properties: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Render as a `style` attribute value
    pub fn to_style_attribute(&self) -> String {
        self.properties
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl StyleTarget for InlineStyle {
    fn set_property(&mut self, name: &str, value: &str) {
        match self.properties.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.properties.push((name.to_string(), value.to_string())),
        }
    }
}

/// CSS custom property manager
#[derive(Debug, Clone, Copy, Default)]
pub struct CssVariableManager;

impl CssVariableManager {
    pub fn new() -> Self {
        Self
    }

    /// `--{component_key}-{prop}` for every scalar prop
    pub fn generate_component_variables(
        &self,
        component_key: &str,
        props: &Map<String, Value>,
    ) -> BTreeMap<String, String> {
        props
            .iter()
            .filter_map(|(name, value)| {
                let value = stringify(value)?;
                Some((format!("--{}-{}", component_key, name), value))
            })
            .collect()
    }

    /// Write every string/number leaf of a nested theme object.
    ///
    /// Path segments are joined with `-`: `{ colors: { primary: "#000" } }`
    /// with prefix `theme` becomes `--theme-colors-primary`. Returns the number
    /// of variables written.
    pub fn apply_theme_variables<T>(&self, theme: &Value, target: &mut T, prefix: Option<&str>) -> usize
    where
        T: StyleTarget + ?Sized,
    {
        let mut leaves = Vec::new();
        let mut path: Vec<&str> = prefix.into_iter().filter(|p| !p.is_empty()).collect();
        collect_leaves(theme, &mut path, &mut leaves);
        self.apply_css_variables(target, leaves)
    }

    /// Validate and write variables, returning how many were written
    pub fn apply_css_variables<T, I, K, V>(&self, target: &mut T, variables: I) -> usize
    where
        T: StyleTarget + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut applied = 0;

        for (name, value) in variables {
            let name = name.as_ref();
            if !is_valid_variable_name(name) {
                tracing::debug!(name, "discarding invalid custom property name");
                continue;
            }

            let Some(value) = stringify(&value.into()).map(|v| sanitize_value(&v)) else {
                tracing::debug!(name, "discarding non-scalar custom property value");
                continue;
            };
            if value.is_empty() {
                continue;
            }

            target.set_property(name, &value);
            applied += 1;
        }

        applied
    }
}

/// `--` followed by one or more ASCII alphanumerics or hyphens
pub fn is_valid_variable_name(name: &str) -> bool {
    name.strip_prefix("--").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Strip characters that could end the declaration or its block
pub fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ';' | '{' | '}'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn collect_leaves<'a>(value: &'a Value, path: &mut Vec<&'a str>, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(key);
                collect_leaves(child, path, out);
                path.pop();
            }
        }
        Value::String(_) | Value::Number(_) if !path.is_empty() => {
            out.push((format!("--{}", path.join("-")), value.clone()));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_component_variables() {
        let props = json!({ "color": "red", "size": 4, "onClick": null, "nested": { "a": 1 }, "on": true });
        let vars = CssVariableManager::new().generate_component_variables("button", props.as_object().unwrap());

        assert_eq!(vars.len(), 3);
        assert_eq!(vars["--button-color"], "red");
        assert_eq!(vars["--button-size"], "4");
        assert_eq!(vars["--button-on"], "true");
    }

    #[test]
    fn test_apply_theme_variables() {
        let theme = json!({
            "colors": { "primary": "#0af", "text": { "muted": "#999" } },
            "space": 8,
            "fonts": ["a", "b"],
            "dark": null
        });
        let mut style = InlineStyle::new();
        let applied = CssVariableManager::new().apply_theme_variables(&theme, &mut style, Some("theme"));

        assert_eq!(applied, 3);
        assert_eq!(style.get_property("--theme-colors-primary"), Some("#0af"));
        assert_eq!(style.get_property("--theme-colors-text-muted"), Some("#999"));
        assert_eq!(style.get_property("--theme-space"), Some("8"));
    }

    #[test]
    fn test_theme_without_prefix() {
        let mut style = InlineStyle::new();
        CssVariableManager::new().apply_theme_variables(&json!({ "gap": "4px" }), &mut style, None);
        assert_eq!(style.get_property("--gap"), Some("4px"));
    }

    #[test]
    fn test_apply_css_variables_validates() {
        let mut style = InlineStyle::new();
        let applied = CssVariableManager::new().apply_css_variables(
            &mut style,
            [
                ("--ok", json!("1px")),
                ("no-dashes", json!("x")),
                ("--has space", json!("x")),
                ("--", json!("x")),
                ("--obj", json!({ "a": 1 })),
                ("--evil", json!("red; } body { display: none")),
            ],
        );

        assert_eq!(applied, 2);
        assert_eq!(style.get_property("--ok"), Some("1px"));
        assert_eq!(style.get_property("--evil"), Some("red  body  display: none"));
        assert_eq!(style.to_style_attribute(), "--ok: 1px; --evil: red  body  display: none");
    }

    #[test]
    fn test_set_property_replaces() {
        let mut style = InlineStyle::new();
        style.set_property("--a", "1");
        style.set_property("--a", "2");
        assert_eq!(style.len(), 1);
        assert_eq!(style.get_property("--a"), Some("2"));
    }

    #[test]
    fn test_variable_names() {
        assert!(is_valid_variable_name("--a-b-1"));
        assert!(!is_valid_variable_name("--a_b"));
        assert!(!is_valid_variable_name("-a"));
        assert!(!is_valid_variable_name("--"));
    }
}
