//! End-to-end build tests over files on disk

use std::fs;
use std::path::Path;

use prestyle::{Resolution, StaticResolver, StyleConfig};
use prestyle_build::{
    load_config, load_resolver_manifest, write_css_file, StyleCompiler, RESOLVER_FILE, SOURCE_MAP_FILE,
    STYLESHEET_FILE,
};
use serde_json::json;

const BUTTON: &str = r#"
type Variant = 'primary' | 'secondary';

interface ButtonProps {
    variant: Variant;
    disabled: boolean;
}

export const Button = styled.button<ButtonProps>`
    color: ${p => p.variant === 'primary' ? 'white' : 'black'};
    opacity: ${p => p.disabled ? 0.5 : 1};
`;
"#;

const THEMED: &str = r#"
export const Title = styled.h1`
    color: ${({ theme }) => theme.colors.heading};
`;

export const Spinner = styled.div`
    animation: spin 1s linear infinite;
`;
"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Button.tsx", BUTTON);
    write(dir.path(), "src/Title.tsx", THEMED);
    write(dir.path(), "src/styles.css", ".ignored { color: red; }");
    write(dir.path(), "node_modules/lib/index.js", "const Lib = styled.div`margin: 0;`;");
    dir
}

#[test]
fn test_compile_dir_and_write() {
    let dir = project();
    let out = dir.path().join("dist");

    let artifact = smol::block_on(async {
        let mut compiler = StyleCompiler::new(StyleConfig::default()).unwrap();
        let outputs = compiler.compile_dir(&dir.path().join("src")).await.unwrap();
        assert_eq!(outputs.len(), 2);
        compiler.finish().await
    });

    assert_eq!(artifact.resolvers.len(), 1);
    assert_eq!(artifact.resolvers["Button"].len(), 4);
    assert!(!artifact.stylesheet.is_empty());
    assert!(artifact.stylesheet.contains("button_disabled-true_variant-primary"));
    assert!(!artifact.stylesheet.contains("title"));
    assert!(!artifact.stylesheet.contains("spinner"));

    let paths = smol::block_on(artifact.write_to(&out)).unwrap();
    assert_eq!(paths.stylesheet, out.join(STYLESHEET_FILE));
    assert_eq!(paths.resolver, out.join(RESOLVER_FILE));
    assert_eq!(paths.source_map, None);
    assert_eq!(fs::read_to_string(&paths.stylesheet).unwrap(), artifact.stylesheet);

    let manifest = smol::block_on(load_resolver_manifest(&paths.resolver)).unwrap();
    let resolver = StaticResolver::new(manifest.get("Button").cloned());
    assert_eq!(
        resolver.resolve_props(&json!({ "disabled": false, "variant": "secondary" })),
        Resolution::Resolved("button_disabled-false_variant-secondary")
    );
    assert!(resolver.should_use_runtime(&json!({ "variant": "ghost", "disabled": false })));

    let title = StaticResolver::new(manifest.get("Title").cloned());
    assert!(title.is_degraded());
}

#[test]
fn test_excluded_files_are_skipped() {
    let dir = project();
    let outputs = smol::block_on(async {
        let mut compiler = StyleCompiler::new(StyleConfig::default()).unwrap();
        compiler.compile_dir(dir.path()).await.unwrap()
    });

    let files: Vec<&str> = outputs.iter().map(|o| o.file_id.as_str()).collect();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| !f.contains("node_modules") && !f.ends_with(".css")));
}

#[test]
fn test_compile_files_applies_include() {
    let dir = project();
    let config = StyleConfig {
        include: vec!["**/Button.tsx".to_string()],
        ..StyleConfig::default()
    };

    let outputs = smol::block_on(async {
        let mut compiler = StyleCompiler::new(config).unwrap();
        compiler
            .compile_files([dir.path().join("src/Button.tsx"), dir.path().join("src/Title.tsx")])
            .await
            .unwrap()
    });

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].static_components, vec!["Button"]);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = smol::block_on(async {
        let mut compiler = StyleCompiler::new(StyleConfig::default()).unwrap();
        compiler.compile_file(&dir.path().join("missing.tsx")).await
    });

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("missing.tsx"));
}

#[test]
fn test_builds_are_reproducible() {
    let dir = project();
    let build = || {
        smol::block_on(async {
            let mut compiler = StyleCompiler::new(StyleConfig::default()).unwrap();
            compiler.compile_dir(&dir.path().join("src")).await.unwrap();
            compiler.finish().await
        })
    };

    let first = build();
    let second = build();
    assert_eq!(first.stylesheet, second.stylesheet);
    assert_eq!(first.resolver_json().unwrap(), second.resolver_json().unwrap());
}

#[test]
fn test_source_map_is_written() {
    let dir = project();
    let config = StyleConfig {
        source_maps: true,
        ..StyleConfig::default()
    };

    let paths = smol::block_on(async {
        let mut compiler = StyleCompiler::new(config).unwrap();
        compiler.compile_dir(&dir.path().join("src")).await.unwrap();
        compiler.finish().await.write_to(&dir.path().join("dist")).await.unwrap()
    });

    assert_eq!(paths.source_map, Some(dir.path().join("dist").join(SOURCE_MAP_FILE)));
    let css = fs::read_to_string(paths.stylesheet).unwrap();
    assert!(css.ends_with("/*# sourceMappingURL=styles.css.map */\n"));
}

#[test]
fn test_write_css_file_creates_parents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a/b/site.css");
    smol::block_on(write_css_file(&path, ".a{color:red}")).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), ".a{color:red}");
}

#[test]
fn test_load_config() {
    let dir = tempfile::tempdir().unwrap();

    let missing = smol::block_on(load_config(&dir.path().join("prestyle.json"))).unwrap();
    assert_eq!(missing, StyleConfig::default());

    let path = dir.path().join("prestyle.json");
    fs::write(&path, r#"{ "minify": false, "maxPropCombinations": 8 }"#).unwrap();
    let config = smol::block_on(load_config(&path)).unwrap();
    assert!(!config.minify);
    assert_eq!(config.max_prop_combinations, 8);

    fs::write(&path, "{ broken").unwrap();
    assert!(smol::block_on(load_config(&path)).is_err());
}
