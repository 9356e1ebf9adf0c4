//! prestyle-build: Build-run orchestration
//!
//! Runs every source file of a build through the parser, extractor and
//! generator, collects the results in one [`StyleRegistry`], and emits the
//! optimized stylesheet together with the per-component resolver maps.
//!
//! # Example
//! ```rust,ignore
//! use prestyle::StyleConfig;
//! use prestyle_build::StyleCompiler;
//!
//! smol::block_on(async {
//!     let mut compiler = StyleCompiler::new(StyleConfig::default())?;
//!     compiler.compile_dir("src".as_ref()).await?;
//!     compiler.finish().await.write_to("dist".as_ref()).await?;
//!     anyhow::Ok(())
//! });
//! ```

pub mod filter;
pub mod logging;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use prestyle::optimizer::OptimizedCss;
use prestyle::parser::ParseOutput;
use prestyle::registry::RegistryStats;
use prestyle::{
    analyze_size_reduction, template, CssOptimizer, PatternExtractor, ResolverMap, SizeReport, StaticGenerator,
    StaticResolver, StyleConfig, StyleError, StyleParser, StyleRegistry,
};

pub use filter::SourceFilter;

/// Stylesheet file name inside the output directory
pub const STYLESHEET_FILE: &str = "styles.css";
/// Source map file name inside the output directory
pub const SOURCE_MAP_FILE: &str = "styles.css.map";
/// Resolver manifest file name inside the output directory
pub const RESOLVER_FILE: &str = "resolver.json";

/// What one source unit contributed to the build
#[derive(Debug, Clone, Default)]
pub struct ModuleOutput {
    pub file_id: String,
    /// Declarations found in the source
    pub declarations: usize,
    /// Components that received at least one static class
    pub static_components: Vec<String>,
    /// Combination records generated
    pub records: usize,
    pub diagnostics: Vec<StyleError>,
}

/// Build-run compiler
#[derive(Debug)]
pub struct StyleCompiler {
    config: StyleConfig,
    filter: SourceFilter,
    parser: StyleParser,
    extractor: PatternExtractor,
    generator: StaticGenerator,
    optimizer: CssOptimizer,
    registry: StyleRegistry,
    diagnostics: usize,
}

impl StyleCompiler {
    pub fn new(config: StyleConfig) -> Result<Self, StyleError> {
        config.validate()?;
        let filter = SourceFilter::new(&config.include, &config.exclude)
            .map_err(|e| StyleError::Config(format!("invalid glob pattern: {}", e)))?;

        Ok(Self {
            filter,
            parser: StyleParser::new(),
            extractor: PatternExtractor::new(),
            generator: config.generator(),
            optimizer: config.optimizer().with_filename(STYLESHEET_FILE),
            registry: StyleRegistry::new(),
            diagnostics: 0,
            config,
        })
    }

    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    pub fn registry(&self) -> &StyleRegistry {
        &self.registry
    }

    /// Does the include/exclude filter accept this path?
    pub fn should_process(&self, path: &Path) -> bool {
        self.filter.matches(path)
    }

    /// Compile one unit of source text
    pub fn compile_source(&mut self, file_id: &str, source: &str) -> ModuleOutput {
        let ParseOutput {
            declarations,
            diagnostics,
        } = self.parser.parse_with_diagnostics(source);

        let mut output = ModuleOutput {
            file_id: file_id.to_string(),
            declarations: declarations.len(),
            diagnostics,
            ..ModuleOutput::default()
        };

        for declaration in &declarations {
            let component = declaration.component_name.as_str();

            match self.registry.register_declaration(declaration) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(file = file_id, component, "declaration already compiled");
                    continue;
                }
                Err(error) => {
                    tracing::warn!(file = file_id, component, %error, "skipping declaration");
                    output.diagnostics.push(error);
                    continue;
                }
            }

            let patterns = if self.config.analyze_prop_patterns {
                self.extractor.extract(declaration, source)
            } else if template::interpolations(&declaration.style_body).is_empty() {
                Vec::new()
            } else {
                tracing::debug!(file = file_id, component, "prop analysis disabled, keeping dynamic");
                continue;
            };

            let generated = self.generator.generate_with_diagnostics(declaration, &patterns);
            output.diagnostics.extend(generated.diagnostics);
            if generated.records.is_empty() {
                continue;
            }

            output.records += generated.records.len();
            output.static_components.push(component.to_string());
            self.registry.add_records(component, &generated.records);
        }

        self.diagnostics += output.diagnostics.len();
        tracing::info!(
            file = file_id,
            declarations = output.declarations,
            records = output.records,
            diagnostics = output.diagnostics.len(),
            "compiled source"
        );
        output
    }

    /// Read and compile one file, whether or not the filter accepts it
    pub async fn compile_file(&mut self, path: &Path) -> Result<ModuleOutput> {
        let source = smol::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read source file {}", path.display()))?;

        Ok(self.compile_source(&path.to_string_lossy(), &source))
    }

    /// Compile every path the filter accepts, in the order given
    pub async fn compile_files<I, P>(&mut self, paths: I) -> Result<Vec<ModuleOutput>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut outputs = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !self.should_process(path) {
                tracing::debug!(path = %path.display(), "filtered out");
                continue;
            }
            outputs.push(self.compile_file(path).await?);
        }
        Ok(outputs)
    }

    /// Compile every accepted file under `root`.
    ///
    /// Filter patterns are matched against paths relative to `root`; files
    /// are visited in sorted order so repeated builds agree.
    pub async fn compile_dir(&mut self, root: &Path) -> Result<Vec<ModuleOutput>> {
        let pattern = format!("{}/**/*", glob::Pattern::escape(&root.to_string_lossy()));
        let entries = glob::glob(&pattern).with_context(|| format!("Invalid source root {}", root.display()))?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            if !path.is_file() {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path.as_path());
            if self.should_process(relative) {
                files.push(path);
            }
        }
        files.sort();

        let mut outputs = Vec::with_capacity(files.len());
        for path in &files {
            outputs.push(self.compile_file(path).await?);
        }
        tracing::info!(root = %root.display(), files = outputs.len(), "compiled directory");
        Ok(outputs)
    }

    /// Optimize the accumulated stylesheet and package the build output
    pub async fn finish(&self) -> BuildArtifact {
        let raw = self.registry.stylesheet();
        let optimized = if raw.is_empty() {
            OptimizedCss::default()
        } else {
            self.optimizer
                .optimize_with_timeout(
                    &raw,
                    self.config.browser_targets(),
                    self.config.minify,
                    self.config.transform_timeout(),
                )
                .await
        };

        let size = analyze_size_reduction(&raw, &optimized.code);
        let registry = *self.registry.stats();
        tracing::info!(
            components = self.registry.component_count(),
            rules = self.registry.len(),
            bytes = size.optimized_size,
            reduction = size.percentage,
            "build finished"
        );

        BuildArtifact {
            stylesheet: optimized.code,
            source_map: optimized.map,
            resolvers: self.registry.resolver_maps(),
            size,
            registry,
            diagnostics: self.diagnostics,
        }
    }

    /// Drop everything compiled so far
    pub fn reset(&mut self) {
        self.registry.reset();
        self.diagnostics = 0;
    }
}

/// Output of one build run
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    pub stylesheet: String,
    pub source_map: Option<String>,
    /// Component name → resolver map
    pub resolvers: BTreeMap<String, ResolverMap>,
    /// Raw vs optimized stylesheet size
    pub size: SizeReport,
    pub registry: RegistryStats,
    /// Diagnostics raised over the whole run
    pub diagnostics: usize,
}

/// Where [`BuildArtifact::write_to`] put each file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub stylesheet: PathBuf,
    pub source_map: Option<PathBuf>,
    pub resolver: PathBuf,
}

impl BuildArtifact {
    /// Resolver manifest: `{ component: { key: class } }`, keys sorted
    pub fn resolver_json(&self) -> serde_json::Result<String> {
        let manifest: BTreeMap<&str, BTreeMap<&str, &str>> = self
            .resolvers
            .iter()
            .map(|(component, map)| (component.as_str(), map.iter().collect()))
            .collect();
        serde_json::to_string_pretty(&manifest)
    }

    /// Resolver for one component; degraded if it has no static classes
    pub fn resolver(&self, component: &str) -> StaticResolver {
        StaticResolver::new(self.resolvers.get(component).cloned())
    }

    /// Write stylesheet, source map and resolver manifest into `dir`
    pub async fn write_to(&self, dir: &Path) -> Result<ArtifactPaths> {
        smol::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let source_map = match &self.source_map {
            Some(map) => {
                let path = dir.join(SOURCE_MAP_FILE);
                smol::fs::write(&path, map)
                    .await
                    .with_context(|| format!("Failed to write source map {}", path.display()))?;
                Some(path)
            }
            None => None,
        };

        let stylesheet = dir.join(STYLESHEET_FILE);
        let css = match source_map {
            Some(_) => format!("{}\n/*# sourceMappingURL={} */\n", self.stylesheet, SOURCE_MAP_FILE),
            None => self.stylesheet.clone(),
        };
        write_css_file(&stylesheet, &css).await?;

        let resolver = dir.join(RESOLVER_FILE);
        let manifest = self.resolver_json().context("Failed to serialize resolver manifest")?;
        smol::fs::write(&resolver, manifest)
            .await
            .with_context(|| format!("Failed to write resolver manifest {}", resolver.display()))?;

        tracing::info!(dir = %dir.display(), "wrote build artifact");
        Ok(ArtifactPaths {
            stylesheet,
            source_map,
            resolver,
        })
    }
}

/// Write CSS text to `path`, creating parent directories as needed
pub async fn write_css_file(path: &Path, css: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        smol::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    smol::fs::write(path, css)
        .await
        .with_context(|| format!("Failed to write stylesheet {}", path.display()))?;

    tracing::debug!(path = %path.display(), bytes = css.len(), "wrote CSS file");
    Ok(())
}

/// Parse a resolver manifest written by [`BuildArtifact::write_to`]
pub fn parse_resolver_manifest(json: &str) -> Result<BTreeMap<String, ResolverMap>, StyleError> {
    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|e| StyleError::ResolverDegraded(e.to_string()))?;

    raw.into_iter()
        .map(|(component, map)| Ok((component, ResolverMap::from_json(&map.to_string())?)))
        .collect()
}

/// Load a resolver manifest from disk
pub async fn load_resolver_manifest(path: &Path) -> Result<BTreeMap<String, ResolverMap>> {
    let json = smol::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read resolver manifest {}", path.display()))?;

    parse_resolver_manifest(&json).with_context(|| format!("Failed to parse resolver manifest {}", path.display()))
}

/// Load a JSON configuration file; a missing file means defaults
pub async fn load_config(path: &Path) -> Result<StyleConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        return Ok(StyleConfig::default());
    }

    let json = smol::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config {}", path.display()))?;

    StyleConfig::from_json(&json).with_context(|| format!("Failed to parse config {}", path.display()))
}
