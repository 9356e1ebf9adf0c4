//! CSS Optimizer using lightningcss
//!
//! Prefixes and minifies generated CSS for the configured browser targets.
//! Failures never escape: a failed transform falls back to a regex minifier,
//! and if that fails too the input is returned untouched.

use std::time::Duration;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Features, Targets};
use parcel_sourcemap::SourceMap;
use regex::Regex;
use serde::Serialize;

use crate::validator::CssValidator;
use crate::StyleError;

pub use crate::generator::merge_duplicate_rules;

/// Browserslist query used when no targets are configured
pub const DEFAULT_BROWSER_QUERY: &str = ">= 0.25%";

/// Optimized stylesheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizedCss {
    pub code: String,
    /// V3 source map JSON, when enabled
    pub map: Option<String>,
}

impl OptimizedCss {
    fn unchanged(css: &str) -> Self {
        Self { code: css.to_string(), map: None }
    }
}

/// Before/after byte sizes of an optimization
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeReport {
    pub original_size: usize,
    pub optimized_size: usize,
    /// Bytes saved; negative if the output grew
    pub reduction: i64,
    /// Reduction relative to the original, rounded to two decimals
    pub percentage: f64,
}

/// CSS optimizer
#[derive(Debug, Clone)]
pub struct CssOptimizer {
    source_maps: bool,
    filename: String,
    validator: CssValidator,
}

impl Default for CssOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CssOptimizer {
    pub fn new() -> Self {
        Self {
            source_maps: false,
            filename: "styles.css".to_string(),
            validator: CssValidator::new(),
        }
    }

    /// Emit a source map alongside the optimized code
    pub fn with_source_maps(mut self, enabled: bool) -> Self {
        self.source_maps = enabled;
        self
    }

    /// Source name recorded in diagnostics and source maps
    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = filename.to_string();
        self
    }

    /// Optimize a stylesheet. Never fails.
    pub fn optimize(&self, css: &str, targets: Option<&[String]>, minify: bool) -> OptimizedCss {
        if let Err(reason) = self.validator.check(css) {
            tracing::debug!(reason, "optimizer input is not CSS, passing through");
            return OptimizedCss::unchanged(css);
        }

        self.finish(css, minify, self.transform(css, targets, minify))
    }

    /// Optimize with a bounded wait on the transform.
    ///
    /// The transform runs on the blocking pool; if it does not finish within
    /// `timeout` the regex/pass-through fallbacks are used instead.
    pub async fn optimize_with_timeout(
        &self,
        css: &str,
        targets: Option<&[String]>,
        minify: bool,
        timeout: Duration,
    ) -> OptimizedCss {
        if let Err(reason) = self.validator.check(css) {
            tracing::debug!(reason, "optimizer input is not CSS, passing through");
            return OptimizedCss::unchanged(css);
        }

        let optimizer = self.clone();
        let input = css.to_string();
        let targets = targets.map(<[String]>::to_vec);
        let transform = smol::unblock(move || optimizer.transform(&input, targets.as_deref(), minify));
        let deadline = async {
            smol::Timer::after(timeout).await;
            Err(StyleError::OptimizeFailure(format!("transform timed out after {:?}", timeout)))
        };

        let result = smol::future::or(transform, deadline).await;
        self.finish(css, minify, result)
    }

    /// Apply the fallback tiers to a transform result
    fn finish(&self, css: &str, minify: bool, result: Result<OptimizedCss, StyleError>) -> OptimizedCss {
        let error = match result {
            Ok(optimized) if !optimized.code.trim().is_empty() => return optimized,
            Ok(_) => StyleError::OptimizeFailure("transform produced no output".to_string()),
            Err(error) => error,
        };
        tracing::warn!(%error, minify, "CSS transform failed, falling back");

        if minify {
            match regex_minify(css) {
                Ok(code) if !code.is_empty() => return OptimizedCss { code, map: None },
                Ok(_) => tracing::warn!("regex minifier produced no output"),
                Err(error) => tracing::warn!(%error, "regex minifier failed"),
            }
        }

        OptimizedCss::unchanged(css)
    }

    /// Run the lightningcss pipeline: parse → minify → print
    fn transform(&self, css: &str, targets: Option<&[String]>, minify: bool) -> Result<OptimizedCss, StyleError> {
        let targets = resolve_targets(targets);

        let options = ParserOptions {
            filename: self.filename.clone(),
            error_recovery: true,
            ..ParserOptions::default()
        };
        let mut stylesheet = StyleSheet::parse(css, options)
            .map_err(|e| StyleError::OptimizeFailure(format!("parse error: {}", e)))?;

        stylesheet
            .minify(MinifyOptions {
                targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| StyleError::OptimizeFailure(format!("minify error: {:?}", e)))?;

        let mut source_map = self.source_maps.then(|| SourceMap::new("/"));
        let printer_options = PrinterOptions {
            minify,
            targets,
            source_map: source_map.as_mut(),
            ..PrinterOptions::default()
        };
        let result = stylesheet
            .to_css(printer_options)
            .map_err(|e| StyleError::OptimizeFailure(format!("print error: {:?}", e)))?;

        let map = source_map.and_then(|mut map| map.to_json(None).ok());
        Ok(OptimizedCss { code: result.code, map })
    }
}

/// Resolve browserslist queries into lightningcss targets.
///
/// Vendor prefixes follow the browsers; color and nesting lowering are
/// always on, logical properties are never rewritten.
pub fn resolve_targets(queries: Option<&[String]>) -> Targets {
    let resolved = match queries {
        Some(queries) if !queries.is_empty() => Browsers::from_browserslist(queries.iter().map(String::as_str)),
        _ => Browsers::from_browserslist([DEFAULT_BROWSER_QUERY]),
    };

    let browsers = match resolved {
        Ok(browsers) => browsers,
        Err(error) => {
            tracing::warn!(%error, "invalid browser targets, using defaults");
            Browsers::from_browserslist([DEFAULT_BROWSER_QUERY]).ok().flatten()
        }
    };

    Targets {
        browsers,
        include: Features::Colors | Features::Nesting,
        exclude: Features::LogicalProperties,
    }
}

/// Conservative minifier: strip comments, collapse whitespace, drop spaces
/// around block and list punctuation
pub fn regex_minify(css: &str) -> Result<String, regex::Error> {
    let comments = Regex::new(r"/\*[\s\S]*?\*/")?;
    let whitespace = Regex::new(r"\s+")?;
    let punctuation = Regex::new(r"\s*([{};,>])\s*")?;
    let after_colon = Regex::new(r":\s+")?;
    let last_semicolon = Regex::new(r";\}")?;

    let out = comments.replace_all(css, "");
    let out = whitespace.replace_all(&out, " ");
    let out = punctuation.replace_all(&out, "${1}");
    let out = after_colon.replace_all(&out, ":");
    let out = last_semicolon.replace_all(&out, "}");
    Ok(out.trim().to_string())
}

/// Byte-accurate size comparison of two stylesheets
pub fn analyze_size_reduction(original: &str, optimized: &str) -> SizeReport {
    let original_size = original.len();
    let optimized_size = optimized.len();
    let reduction = original_size as i64 - optimized_size as i64;
    let percentage = if original_size == 0 {
        0.0
    } else {
        (reduction as f64 / original_size as f64 * 10_000.0).round() / 100.0
    };

    SizeReport {
        original_size,
        optimized_size,
        reduction,
        percentage,
    }
}
