//! Build Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::generator::{StaticGenerator, DEFAULT_MAX_COMBINATIONS};
use crate::optimizer::CssOptimizer;
use crate::StyleError;

/// Style pipeline configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleConfig {
    /// Browserslist queries; empty uses the optimizer default
    pub targets: Vec<String>,

    /// Minify the final stylesheet
    pub minify: bool,

    /// Extract prop patterns and precompile combinations
    pub analyze_prop_patterns: bool,

    /// Cap on combinations per declaration
    pub max_prop_combinations: usize,

    /// Glob patterns of source files to process (empty = everything)
    pub include: Vec<String>,

    /// Glob patterns of source files to skip
    pub exclude: Vec<String>,

    /// Emit a source map for the stylesheet
    pub source_maps: bool,

    /// Bound on one CSS transform (milliseconds)
    pub transform_timeout_ms: u64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            minify: true,
            analyze_prop_patterns: true,
            max_prop_combinations: DEFAULT_MAX_COMBINATIONS,
            include: Vec::new(),
            exclude: vec!["**/node_modules/**".to_string()],
            source_maps: false,
            transform_timeout_ms: 5_000,
        }
    }
}

impl StyleConfig {
    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, StyleError> {
        let config: Self = serde_json::from_str(json).map_err(|e| StyleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StyleError> {
        if self.max_prop_combinations == 0 {
            return Err(StyleError::Config("maxPropCombinations must be at least 1".to_string()));
        }
        if self.transform_timeout_ms == 0 {
            return Err(StyleError::Config("transformTimeoutMs must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Browser targets to hand the optimizer, `None` for the default query
    pub fn browser_targets(&self) -> Option<&[String]> {
        (!self.targets.is_empty()).then_some(self.targets.as_slice())
    }

    pub fn transform_timeout(&self) -> Duration {
        Duration::from_millis(self.transform_timeout_ms)
    }

    pub fn generator(&self) -> StaticGenerator {
        StaticGenerator::new(self.max_prop_combinations)
    }

    pub fn optimizer(&self) -> CssOptimizer {
        CssOptimizer::new().with_source_maps(self.source_maps)
    }
}
