//! Runtime Resolver
//!
//! Maps a live prop object to a precomputed class name in one hash lookup.
//! The map is built at compile time and never mutated; a resolver without a
//! usable map is degraded and misses on every call.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generator::CombinationRecord;
use crate::{canonical_key, StyleError};

/// Props never part of a combination key
pub const INTERNAL_PROPS: &[&str] = &["children", "key", "ref", "className", "style", "theme"];

/// Canonical combination key → class name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolverMap {
    entries: HashMap<String, String>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from generated records
    pub fn from_records(records: &[CombinationRecord]) -> Self {
        let mut map = Self::new();
        map.extend_records(records);
        map
    }

    pub fn extend_records(&mut self, records: &[CombinationRecord]) {
        for record in records {
            self.insert(record.key(), record.class_name.clone());
        }
    }

    pub fn insert(&mut self, key: String, class_name: String) {
        if let Some(previous) = self.entries.insert(key.clone(), class_name) {
            tracing::warn!(key = %key, previous = %previous, "resolver key mapped twice");
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let sorted: BTreeMap<&str, &str> = self
            .entries
            .iter()
            .map(|(key, class)| (key.as_str(), class.as_str()))
            .collect();
        sorted.into_iter()
    }

    /// Load a persisted map
    pub fn from_json(json: &str) -> Result<Self, StyleError> {
        let map: Self = serde_json::from_str(json)
            .map_err(|e| StyleError::ResolverDegraded(e.to_string()))?;

        if let Some((key, _)) = map.entries.iter().find(|(_, class)| class.trim().is_empty()) {
            return Err(StyleError::ResolverDegraded(format!("empty class name for key {:?}", key)));
        }
        Ok(map)
    }

    /// Serialize with keys sorted, so identical builds produce identical files
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let sorted: BTreeMap<&String, &String> = self.entries.iter().collect();
        serde_json::to_string_pretty(&sorted)
    }
}

/// Outcome of a resolver lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A precomputed class covers these props
    Resolved(&'a str),
    /// No static class; the caller takes the dynamic path
    Unresolved,
}

impl<'a> Resolution<'a> {
    pub fn class_name(self) -> Option<&'a str> {
        match self {
            Resolution::Resolved(class) => Some(class),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Resolver options
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    /// Report misses as needing runtime style computation
    pub allow_dynamic_fallback: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            allow_dynamic_fallback: true,
        }
    }
}

/// Lookup counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub hits: u64,
    pub misses: u64,
}

impl ResolverStats {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.hits as f64 / self.total() as f64 * 100.0
        }
    }
}

#[derive(Debug)]
enum ResolverState {
    Ready(Arc<ResolverMap>),
    Degraded,
}

/// Runtime resolver
#[derive(Debug)]
pub struct StaticResolver {
    state: ResolverState,
    config: ResolverConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StaticResolver {
    /// Create a resolver owning its map; `None` yields a degraded resolver
    pub fn new(map: Option<ResolverMap>) -> Self {
        Self::shared(map.map(Arc::new))
    }

    /// Create a resolver over a map shared with other resolvers
    pub fn shared(map: Option<Arc<ResolverMap>>) -> Self {
        let state = match map {
            Some(map) => ResolverState::Ready(map),
            None => {
                tracing::warn!("no resolver map, every lookup will miss");
                ResolverState::Degraded
            }
        };

        Self {
            state,
            config: ResolverConfig::default(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a resolver from a persisted map, degrading if it cannot be read
    pub fn from_json(json: &str) -> Self {
        match ResolverMap::from_json(json) {
            Ok(map) => Self::new(Some(map)),
            Err(error) => {
                tracing::warn!(%error, "invalid resolver map");
                Self::new(None)
            }
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.state, ResolverState::Degraded)
    }

    /// Look up the class covering these props
    pub fn resolve_props(&self, props: &Value) -> Resolution<'_> {
        let found = match (&self.state, props_key(props)) {
            (ResolverState::Ready(map), Some(key)) => map.get(&key),
            _ => None,
        };

        match found {
            Some(class) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Resolution::Resolved(class)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Resolution::Unresolved
            }
        }
    }

    /// Must the caller compute styles at render time?
    pub fn should_use_runtime(&self, props: &Value) -> bool {
        !self.resolve_props(props).is_resolved() && self.config.allow_dynamic_fallback
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Canonical key of a prop object; `None` if `props` is not an object.
///
/// Internal props and null values are left out. `$`-prefixed transient props
/// are kept: they are style-only props and take part in combinations.
pub fn props_key(props: &Value) -> Option<String> {
    let props = props.as_object()?;

    let rendered: Vec<(&str, String)> = props
        .iter()
        .filter(|(name, value)| {
            !value.is_null() && !INTERNAL_PROPS.contains(&name.as_str())
        })
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.as_str(), value)
        })
        .collect();

    Some(canonical_key(rendered.iter().map(|(name, value)| (*name, value.as_str()))))
}
