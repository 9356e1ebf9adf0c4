//! Source file filter
//!
//! Include/exclude glob matching over source paths. With no include
//! patterns, every file with a script extension is a candidate.

use std::path::Path;

use glob::{MatchOptions, Pattern, PatternError};

/// Extensions processed when no include pattern is configured
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Include/exclude path filter
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl SourceFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, PatternError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Should this path be compiled?
    pub fn matches(&self, path: &Path) -> bool {
        let path = normalize(path);
        let path = Path::new(&path);

        if self.exclude.iter().any(|p| p.matches_path_with(path, MATCH_OPTIONS)) {
            return false;
        }

        if self.include.is_empty() {
            return path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
        }

        self.include.iter().any(|p| p.matches_path_with(path, MATCH_OPTIONS))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, PatternError> {
    patterns.iter().map(|p| Pattern::new(p)).collect()
}

/// Forward slashes only, so one pattern set works on every platform
fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include: &[&str], exclude: &[&str]) -> SourceFilter {
        let include: Vec<String> = include.iter().map(|s| s.to_string()).collect();
        let exclude: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        SourceFilter::new(&include, &exclude).unwrap()
    }

    #[test]
    fn test_default_extensions() {
        let f = filter(&[], &[]);
        assert!(f.matches(Path::new("src/Button.tsx")));
        assert!(f.matches(Path::new("lib/index.js")));
        assert!(!f.matches(Path::new("styles/site.css")));
        assert!(!f.matches(Path::new("README")));
    }

    #[test]
    fn test_include_patterns() {
        let f = filter(&["src/**/*.tsx"], &[]);
        assert!(f.matches(Path::new("src/components/Button.tsx")));
        assert!(!f.matches(Path::new("src/components/Button.ts")));
        assert!(!f.matches(Path::new("test/Button.tsx")));
    }

    #[test]
    fn test_exclude_wins() {
        let f = filter(&["**/*.ts"], &["**/node_modules/**", "**/*.test.ts"]);
        assert!(f.matches(Path::new("app/theme.ts")));
        assert!(!f.matches(Path::new("app/node_modules/pkg/index.ts")));
        assert!(!f.matches(Path::new("app/theme.test.ts")));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(SourceFilter::new(&["src/[".to_string()], &[]).is_err());
    }
}
