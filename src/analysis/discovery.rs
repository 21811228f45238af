// Generic discovery engine
//
// One traversal for every file-based kind: walk the kind's directories,
// resolve each file to a class name, deduplicate, introspect, let the
// kind's strategy decide qualification and extract metadata, then run
// the flow analyzer where the kind asks for it.

use crate::analysis::component::{Component, ComponentKind, Metadata, ScanResult, Structure};
use crate::analysis::flow::FlowAnalyzer;
use crate::analysis::introspect::{AttributeProvider, TypeIntrospector};
use crate::analysis::providers::ProviderFacts;
use crate::analysis::resolve::{ClassIndex, PathResolver};
use crate::analysis::routes::RouteRegistry;
use crate::config::Config;
use crate::error::Result;
use crate::parser::PhpClass;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Per-call scan options
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Directories to scan instead of the kind's configured ones
    pub paths: Option<Vec<PathBuf>>,
    /// Overrides `scan.recursive`
    pub recursive: Option<bool>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths = Some(paths);
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }
}

/// Everything a mapper needs for one scan call
pub struct ScanContext<'a> {
    pub root: &'a Path,
    pub config: &'a Config,
    pub index: ClassIndex,
    pub providers: ProviderFacts,
    pub introspector: &'a dyn TypeIntrospector,
    pub attributes: &'a dyn AttributeProvider,
    pub routes: &'a dyn RouteRegistry,
    pub flow: FlowAnalyzer,
    pub exclude: Vec<glob::Pattern>,
}

impl<'a> ScanContext<'a> {
    /// Path relative to the root, with forward slashes
    pub fn relative(&self, path: &Path) -> String {
        relative_path(self.root, path)
    }

    /// Directories to walk for a kind
    pub fn directories(&self, kind: ComponentKind, options: &ScanOptions) -> Vec<PathBuf> {
        match &options.paths {
            Some(paths) => paths
                .iter()
                .map(|p| if p.is_absolute() { p.clone() } else { self.root.join(p) })
                .collect(),
            None => self
                .config
                .paths_for(kind)
                .iter()
                .map(|p| self.root.join(p))
                .collect(),
        }
    }

    pub fn recursive(&self, options: &ScanOptions) -> bool {
        options.recursive.unwrap_or(self.config.scan.recursive)
    }
}

/// Produces the scan result for one kind
pub trait Mapper {
    fn kind(&self) -> ComponentKind;

    fn scan(&self, ctx: &ScanContext<'_>, options: &ScanOptions) -> Result<ScanResult>;
}

/// Per-kind qualification and extraction
pub trait KindStrategy {
    fn kind(&self) -> ComponentKind;

    /// Whether the introspected class is a component of this kind
    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool;

    /// Kind-specific metadata
    fn extract(&self, class: &PhpClass, source: &str, ctx: &ScanContext<'_>) -> Result<Metadata>;

    /// Run the flow analyzer on the file
    fn analyzes_flow(&self) -> bool {
        false
    }

    /// Report protected methods in the structure too
    fn include_protected(&self) -> bool {
        false
    }
}

/// File-based mapper driven by a kind strategy
pub struct FileMapper<S> {
    strategy: S,
    resolver: PathResolver,
}

impl<S: KindStrategy> FileMapper<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            resolver: PathResolver::new(),
        }
    }

    fn map_class(
        &self,
        class: &PhpClass,
        path: &Path,
        ctx: &ScanContext<'_>,
    ) -> Result<Component> {
        let source = std::fs::read_to_string(path)?;
        let metadata = self.strategy.extract(class, &source, ctx)?;

        let mut component =
            Component::from_class(self.strategy.kind(), class, ctx.relative(path), metadata);
        component.structure = Some(Structure::from_class(class, self.strategy.include_protected()));
        if self.strategy.analyzes_flow() {
            component.flow = Some(ctx.flow.analyze_with_imports(&source, &class.imports));
        }
        Ok(component)
    }
}

impl<S: KindStrategy> Mapper for FileMapper<S> {
    fn kind(&self) -> ComponentKind {
        self.strategy.kind()
    }

    fn scan(&self, ctx: &ScanContext<'_>, options: &ScanOptions) -> Result<ScanResult> {
        let kind = self.strategy.kind();
        let recursive = ctx.recursive(options);
        let mut seen = HashSet::new();
        let mut data = Vec::new();

        for dir in ctx.directories(kind, options) {
            for path in discover_files(ctx.root, &dir, recursive, &ctx.exclude) {
                let Some(fq_name) = self.resolver.resolve(&path) else {
                    debug!(path = %path.display(), "skipped: no namespaced type");
                    continue;
                };
                if seen.contains(&fq_name) {
                    continue;
                }

                let class = match ctx.introspector.introspect(&fq_name, &path) {
                    Ok(class) => class,
                    Err(e) => {
                        warn!(class = %fq_name, error = %e, "recording degraded entry");
                        data.push(Component::degraded(kind, &fq_name, ctx.relative(&path), e.to_string()));
                        seen.insert(fq_name);
                        continue;
                    }
                };

                if !self.strategy.qualifies(&class, ctx) {
                    debug!(class = %fq_name, kind = %kind, "skipped: does not qualify");
                    continue;
                }
                seen.insert(fq_name.clone());

                match self.map_class(&class, &path, ctx) {
                    Ok(component) => data.push(component),
                    Err(e) => {
                        warn!(class = %fq_name, error = %e, "recording degraded entry");
                        data.push(Component::degraded(kind, &fq_name, ctx.relative(&path), e.to_string()));
                    }
                }
            }
        }

        info!(kind = %kind, count = data.len(), "scan complete");
        Ok(ScanResult::new(kind, data))
    }
}

/// PHP files under `dir`, sorted, minus excluded root-relative paths.
/// A missing directory yields nothing.
pub fn discover_files(
    root: &Path,
    dir: &Path,
    recursive: bool,
    exclude: &[glob::Pattern],
) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .max_depth(if recursive { usize::MAX } else { 1 });

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "php"))
        .filter(|p| {
            let relative = relative_path(root, p);
            !exclude.iter().any(|pattern| pattern.matches(&relative))
        })
        .collect();

    files.sort();
    files
}

/// Compile exclude globs; invalid ones are reported by config validation
pub fn compile_excludes(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect()
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::introspect::SourceIntrospector;
    use crate::analysis::kinds::testing::{find, App};
    use crate::analysis::kinds::ServiceStrategy;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_discover_recursive_and_flat() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app/Jobs/A.php", "<?php");
        write(dir.path(), "app/Jobs/Nested/B.php", "<?php");
        write(dir.path(), "app/Jobs/readme.md", "x");

        let jobs = dir.path().join("app/Jobs");
        assert_eq!(discover_files(dir.path(), &jobs, true, &[]).len(), 2);
        assert_eq!(discover_files(dir.path(), &jobs, false, &[]).len(), 1);
    }

    #[test]
    fn test_discover_excludes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app/Jobs/A.php", "<?php");
        write(dir.path(), "app/Jobs/Legacy/B.php", "<?php");

        let exclude = compile_excludes(&["app/Jobs/Legacy/**".to_string()]);
        let files = discover_files(dir.path(), &dir.path().join("app/Jobs"), true, &exclude);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("A.php"));
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(discover_files(dir.path(), &dir.path().join("nope"), true, &[]).is_empty());
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/srv/app"), Path::new("/srv/app/app/Models/User.php")),
            "app/Models/User.php"
        );
    }

    /// Fails for classes named `Broken`, reads the source otherwise
    struct FailingIntrospector(SourceIntrospector);

    impl TypeIntrospector for FailingIntrospector {
        fn introspect(&self, fq_name: &str, path: &Path) -> Result<PhpClass> {
            if fq_name.ends_with("\\Broken") {
                return Err(Error::introspection(fq_name, "class could not be loaded"));
            }
            self.0.introspect(fq_name, path)
        }
    }

    #[test]
    fn test_failed_introspection_degrades_and_continues() {
        let app = App::new()
            .file("app/Services/A.php", "<?php\nnamespace App\\Services;\nclass A { public function run() {} }\n")
            .file("app/Services/Broken.php", "<?php\nnamespace App\\Services;\nclass Broken {}\n")
            .file("app/Services/Z.php", "<?php\nnamespace App\\Services;\nclass Z {}\n");

        let result = app.scan_with(ServiceStrategy, &FailingIntrospector(SourceIntrospector::new()));
        assert_eq!(result.count, 3);

        let names: Vec<_> = result.data.iter().map(|c| c.short_name.as_str()).collect();
        assert_eq!(names, vec!["A", "Broken", "Z"]);

        let broken = find(&result, "Broken");
        assert!(broken.is_degraded());
        assert_eq!(broken.file_path, "app/Services/Broken.php");
        assert!(broken.note.as_deref().unwrap().contains("could not be loaded"));
        assert!(!find(&result, "A").is_degraded());
        assert!(!find(&result, "Z").is_degraded());
    }

    #[test]
    fn test_scan_options_builder() {
        let options = ScanOptions::new()
            .with_paths(vec![PathBuf::from("src/Jobs")])
            .with_recursive(false);
        assert_eq!(options.paths.unwrap().len(), 1);
        assert_eq!(options.recursive, Some(false));
    }
}
