// Analysis: discovery, introspection and flow inference for Laravel apps

pub mod component;
pub mod discovery;
pub mod flow;
pub mod introspect;
pub mod kinds;
pub mod narrative;
pub mod providers;
pub mod resolve;
pub mod routes;

pub use component::*;
pub use discovery::{compile_excludes, discover_files, FileMapper, KindStrategy, Mapper, ScanContext, ScanOptions};
pub use flow::{Dependencies, FacadeUse, FlowAnalyzer, FlowEdge, FlowReport, JobDispatch, RelationKind};
pub use introspect::{
    AttributeProvider, JsonAttributes, RuntimeAttributes, SourceAttributes, SourceIntrospector, TypeIntrospector,
};
pub use kinds::mapper_for;
pub use narrative::{connected_to, synthesize_flows};
pub use providers::ProviderFacts;
pub use resolve::{ClassIndex, PathResolver};
pub use routes::{RouteAction, RouteDefinition, RouteFileRegistry, RouteMapper, RouteRegistry, StaticRoutes};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{ExportArtifact, ExportFormat, Exporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::info;

/// Eloquent model events, in the order Laravel documents them
pub const LIFECYCLE_HOOKS: [&str; 15] = [
    "retrieved",
    "creating",
    "created",
    "updating",
    "updated",
    "saving",
    "saved",
    "deleting",
    "deleted",
    "restoring",
    "restored",
    "replicating",
    "forceDeleting",
    "forceDeleted",
    "trashed",
];

/// What a scan or export request covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Kind(ComponentKind),
}

impl Target {
    pub fn kinds(&self) -> Vec<ComponentKind> {
        match self {
            Target::All => ComponentKind::ALL.to_vec(),
            Target::Kind(kind) => vec![*kind],
        }
    }
}

impl std::str::FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Target::All)
        } else {
            s.parse().map(Target::Kind)
        }
    }
}

/// Scan coordinator: dispatches requests to mappers and aggregates results
pub struct Surveyor {
    root: PathBuf,
    config: Config,
    introspector: Box<dyn TypeIntrospector>,
    attributes: Box<dyn AttributeProvider>,
    routes: Box<dyn RouteRegistry>,
    verbose: bool,
}

impl Surveyor {
    /// Coordinator for the application at `root`
    pub fn new(root: &Path, config: Config) -> Result<Self> {
        if !root.exists() {
            return Err(Error::PathNotFound(root.to_path_buf()));
        }
        let root = root.canonicalize()?;
        let routes = RouteFileRegistry::new(
            config.scan.route_files.clone(),
            &config.scan.controllers_namespace,
        );

        Ok(Self {
            root,
            config,
            introspector: Box::new(SourceIntrospector::new()),
            attributes: Box::new(SourceAttributes::new()),
            routes: Box::new(routes),
            verbose: false,
        })
    }

    pub fn with_introspector(mut self, introspector: Box<dyn TypeIntrospector>) -> Self {
        self.introspector = introspector;
        self
    }

    pub fn with_attributes(mut self, attributes: Box<dyn AttributeProvider>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_route_registry(mut self, routes: Box<dyn RouteRegistry>) -> Self {
        self.routes = routes;
        self
    }

    /// Show a progress bar while scanning several kinds
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fresh context: the class index and provider facts are rebuilt every call
    fn context(&self) -> ScanContext<'_> {
        let exclude = compile_excludes(&self.config.scan.exclude);
        ScanContext {
            root: &self.root,
            config: &self.config,
            index: ClassIndex::build(&self.root, &self.config.scan.index_paths, &exclude),
            providers: ProviderFacts::collect(&self.root, &self.config, &exclude),
            introspector: self.introspector.as_ref(),
            attributes: self.attributes.as_ref(),
            routes: self.routes.as_ref(),
            flow: FlowAnalyzer::new(self.config.flow.clone()),
            exclude,
        }
    }

    /// Scan one kind
    pub fn scan(&self, kind: ComponentKind, options: &ScanOptions) -> Result<ScanResult> {
        let ctx = self.context();
        mapper_for(kind).scan(&ctx, options)
    }

    /// Scan every kind the target names, sharing one context
    pub fn scan_target(&self, target: Target, options: &ScanOptions) -> Result<Vec<ScanResult>> {
        let kinds = target.kinds();
        let ctx = self.context();

        let progress = if self.verbose && kinds.len() > 1 {
            let pb = ProgressBar::new(kinds.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut results = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if let Some(ref pb) = progress {
                pb.set_message(kind.label());
                pb.inc(1);
            }
            results.push(mapper_for(kind).scan(&ctx, options)?);
        }

        if let Some(pb) = progress {
            pb.finish_with_message("Scan complete");
        }
        Ok(results)
    }

    /// Scan results wrapped with run metadata
    pub fn aggregate(&self, target: Target, options: &ScanOptions) -> Result<Architecture> {
        let results = self.scan_target(target, options)?;
        let metadata = ArchitectureMetadata::new(&self.config.project.name, &self.root.to_string_lossy());
        let architecture = Architecture::new(metadata, results);
        info!(
            total = architecture.total(),
            kinds = architecture.non_empty().count(),
            "architecture aggregated"
        );
        Ok(architecture)
    }

    /// Every kind
    pub fn scan_all(&self) -> Result<Architecture> {
        self.aggregate(Target::All, &ScanOptions::new())
    }

    /// Scan and render. The format is checked before anything is scanned.
    pub fn export(&self, target: Target, format: &str, options: &ScanOptions) -> Result<ExportArtifact> {
        let format: ExportFormat = format.parse()?;
        self.export_with(target, format, options, &Exporter::new(self.config.clone()))
    }

    /// Export with a caller-built exporter (custom PDF renderer, for instance)
    pub fn export_with(
        &self,
        target: Target,
        format: ExportFormat,
        options: &ScanOptions,
        exporter: &Exporter,
    ) -> Result<ExportArtifact> {
        exporter.check_available(format)?;
        let architecture = self.aggregate(target, options)?;
        exporter.export(&architecture, format)
    }
}
