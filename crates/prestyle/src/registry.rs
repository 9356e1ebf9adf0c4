//! Style Registry
//!
//! Build-run store for everything the pipeline accumulates across source
//! units: registered declarations, per-component resolver maps and the
//! deduplicated rule bodies of the final stylesheet. One registry per build;
//! `reset` clears it between runs.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::generator::{CombinationRecord, MergedRule};
use crate::parser::StyleDeclaration;
use crate::resolver::ResolverMap;
use crate::StyleError;

/// Index of a stored rule body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RuleId(pub u32);

/// Deduplication statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegistryStats {
    /// Rule bodies interned
    pub total: u64,
    /// Distinct bodies stored
    pub unique: u64,
    /// Bodies that reused a stored rule
    pub deduplicated: u64,
    pub bytes_stored: u64,
    /// Bytes that would have been emitted again without deduplication
    pub bytes_saved: u64,
}

impl RegistryStats {
    /// Deduplication rate as a percentage
    pub fn dedup_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.deduplicated as f64 / self.total as f64 * 100.0
        }
    }

    /// Bytes saved as a percentage of the undeduplicated size
    pub fn savings_rate(&self) -> f64 {
        let total_would_be = self.bytes_stored + self.bytes_saved;
        if total_would_be == 0 {
            0.0
        } else {
            self.bytes_saved as f64 / total_would_be as f64 * 100.0
        }
    }
}

#[derive(Debug)]
struct StoredRule {
    body: Arc<str>,
    class_names: Vec<String>,
}

/// What the registry knows about one component
#[derive(Debug, Clone, Default)]
pub struct ComponentEntry {
    pub content_hash: String,
    pub resolver: ResolverMap,
}

/// Build-run style store
#[derive(Debug, Default)]
pub struct StyleRegistry {
    /// Body hash → every rule with that hash
    by_hash: HashMap<u64, Vec<RuleId>>,
    rules: Vec<StoredRule>,
    components: BTreeMap<String, ComponentEntry>,
    stats: RegistryStats,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_body(body: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        hasher.finish()
    }

    /// Claim a component name for this build.
    ///
    /// Returns `Ok(false)` when the same declaration was already registered
    /// (nothing to regenerate). A different body under a taken name, or a
    /// name that differs from a taken one only in case, would produce
    /// clashing class names and is rejected.
    pub fn register_declaration(&mut self, declaration: &StyleDeclaration) -> Result<bool, StyleError> {
        let name = declaration.component_name.as_str();
        let skip = |reason: &str| StyleError::ParseSkip {
            component: name.to_string(),
            reason: reason.to_string(),
        };
        let lowercase = name.to_lowercase();

        match self.components.get(name) {
            Some(entry) if entry.content_hash == declaration.content_hash => Ok(false),
            Some(_) => Err(skip("component name already registered with a different body")),
            None if self.components.keys().any(|taken| taken.to_lowercase() == lowercase) => {
                Err(skip("component name differs from a registered one only in case"))
            }
            None => {
                self.components.insert(
                    declaration.component_name.clone(),
                    ComponentEntry {
                        content_hash: declaration.content_hash.clone(),
                        resolver: ResolverMap::new(),
                    },
                );
                Ok(true)
            }
        }
    }

    /// Store a component's generated records: bodies go to the rule store,
    /// keys to the component's resolver map
    pub fn add_records(&mut self, component_name: &str, records: &[CombinationRecord]) {
        for record in records {
            self.intern(&record.css_body, &record.class_name);
        }

        self.components
            .entry(component_name.to_string())
            .or_default()
            .resolver
            .extend_records(records);

        tracing::debug!(component = component_name, records = records.len(), "registered records");
    }

    /// Intern a rule body under a class name, returning its rule
    pub fn intern(&mut self, body: &str, class_name: &str) -> RuleId {
        self.stats.total += 1;
        let hash = Self::hash_body(body);

        let rules = &mut self.rules;
        let bucket = self.by_hash.entry(hash).or_default();
        if let Some(&id) = bucket.iter().find(|id| rules[id.0 as usize].body.as_ref() == body) {
            let rule = &mut rules[id.0 as usize];
            if !rule.class_names.iter().any(|name| name == class_name) {
                rule.class_names.push(class_name.to_string());
            }
            self.stats.deduplicated += 1;
            self.stats.bytes_saved += body.len() as u64;
            return id;
        }
        if !bucket.is_empty() {
            tracing::debug!(class_name, "rule hash collision");
        }

        let id = RuleId(rules.len() as u32);
        rules.push(StoredRule {
            body: Arc::from(body),
            class_names: vec![class_name.to_string()],
        });
        bucket.push(id);

        self.stats.unique += 1;
        self.stats.bytes_stored += body.len() as u64;
        id
    }

    pub fn get_str(&self, id: RuleId) -> Option<&str> {
        self.rules.get(id.0 as usize).map(|rule| rule.body.as_ref())
    }

    /// Stored rules in first-seen order
    pub fn merged_rules(&self) -> Vec<MergedRule> {
        self.rules
            .iter()
            .map(|rule| MergedRule {
                class_names: rule.class_names.clone(),
                css_body: rule.body.to_string(),
            })
            .collect()
    }

    /// Unoptimized stylesheet of every stored rule, one per line
    pub fn stylesheet(&self) -> String {
        self.rules
            .iter()
            .map(|rule| {
                MergedRule {
                    class_names: rule.class_names.clone(),
                    css_body: rule.body.to_string(),
                }
                .to_css()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn component(&self, name: &str) -> Option<&ComponentEntry> {
        self.components.get(name)
    }

    /// Resolver maps of components that have at least one static class
    pub fn resolver_maps(&self) -> BTreeMap<String, ResolverMap> {
        self.components
            .iter()
            .filter(|(_, entry)| !entry.resolver.is_empty())
            .map(|(name, entry)| (name.clone(), entry.resolver.clone()))
            .collect()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Number of distinct rules stored
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    /// Forget everything, including statistics
    pub fn reset(&mut self) {
        self.by_hash.clear();
        self.rules.clear();
        self.components.clear();
        self.stats = RegistryStats::default();
    }
}
