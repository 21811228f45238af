use crate::analysis::ComponentKind;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub scan: ScanConfig,
    pub flow: FlowConfig,
    pub heuristics: HeuristicsConfig,
    pub narratives: NarrativeConfig,
    pub export: ExportConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

/// Discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub recursive: bool,
    pub exclude: Vec<String>,
    /// Directories indexed for inheritance lookups
    pub index_paths: Vec<String>,
    pub providers_path: String,
    pub models_namespace: String,
    pub controllers_namespace: String,
    /// Per-kind directory overrides, keyed by kind slug
    pub paths: BTreeMap<String, Vec<String>>,
    pub route_files: Vec<RouteFileConfig>,
}

/// A route file and the attributes its service provider applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFileConfig {
    pub path: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub middleware: Vec<String>,
}

/// Flow analyzer tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Namespace substrings that mark a dependency as a model
    pub model_markers: Vec<String>,
    /// Namespace substrings that mark a dependency as a service
    pub service_markers: Vec<String>,
    /// Facade short name -> category
    pub facades: BTreeMap<String, String>,
    /// Names never reported as dependencies
    pub ignored: Vec<String>,
}

/// Naming-convention rules for kinds with no structural marker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    pub observer: NamingRule,
    pub listener: NamingRule,
    pub policy: NamingRule,
    pub rule: NamingRule,
}

/// Suffix + marker-method classification rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRule {
    pub suffixes: Vec<String>,
    pub marker_methods: Vec<String>,
    pub mode: MatchMode,
}

/// How a naming rule combines its two signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Suffix and at least one marker method
    #[default]
    All,
    /// Suffix or at least one marker method
    Any,
}

/// Canned lifecycle narratives for the source-module export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub route_keywords: Vec<RouteNarrative>,
    pub maintenance_keywords: Vec<String>,
}

/// URI keyword that triggers a named flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNarrative {
    pub keyword: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Export settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub title: Option<String>,
    pub json: JsonOptions,
    pub markdown: MarkdownOptions,
    pub html: HtmlOptions,
    pub pdf: PdfOptions,
}

/// Structured-data export flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    pub pretty: bool,
    pub escape_slashes: bool,
    pub escape_unicode: bool,
}

/// Human-document sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    pub metadata: bool,
    pub summary: bool,
    pub toc: bool,
    pub diagram: bool,
}

/// Hypertext export settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlOptions {
    pub template: Option<PathBuf>,
}

/// Printable export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    pub paper: String,
    pub orientation: Orientation,
    pub font: String,
    pub allow_remote: bool,
    /// Explicit renderer binary, otherwise looked up on PATH
    pub binary: Option<PathBuf>,
    pub template: Option<PathBuf>,
}

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(Error::config_validation(format!(
                "unknown orientation: {}",
                other
            ))),
        }
    }
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        }
    }
}

/// Paper sizes the PDF renderer accepts
pub const PAPER_SIZES: &[&str] = &["a3", "a4", "a5", "letter", "legal", "tabloid"];

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Untitled Project".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            exclude: vec!["vendor/**".to_string(), "node_modules/**".to_string()],
            index_paths: vec!["app".to_string()],
            providers_path: "app/Providers".to_string(),
            models_namespace: "App\\Models".to_string(),
            controllers_namespace: "App\\Http\\Controllers".to_string(),
            paths: BTreeMap::new(),
            route_files: vec![
                RouteFileConfig {
                    path: "routes/web.php".to_string(),
                    prefix: String::new(),
                    middleware: vec!["web".to_string()],
                },
                RouteFileConfig {
                    path: "routes/api.php".to_string(),
                    prefix: "api".to_string(),
                    middleware: vec!["api".to_string()],
                },
            ],
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        let facades = [
            ("Auth", "auth"),
            ("Gate", "authorization"),
            ("DB", "database"),
            ("Cache", "cache"),
            ("Mail", "mail"),
            ("Log", "logging"),
            ("Response", "http"),
            ("Queue", "queue"),
            ("Bus", "queue"),
            ("Event", "events"),
            ("Broadcast", "broadcasting"),
            ("Storage", "filesystem"),
            ("Notification", "notifications"),
            ("Http", "http"),
            ("Redirect", "http"),
            ("Session", "session"),
            ("Hash", "security"),
            ("Validator", "validation"),
        ];
        Self {
            model_markers: vec!["\\Models\\".to_string()],
            service_markers: vec!["\\Services\\".to_string()],
            facades: facades
                .iter()
                .map(|(name, category)| (name.to_string(), category.to_string()))
                .collect(),
            ignored: vec![
                "self".to_string(),
                "static".to_string(),
                "parent".to_string(),
            ],
        }
    }
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            observer: NamingRule {
                suffixes: vec!["Observer".to_string()],
                marker_methods: crate::analysis::LIFECYCLE_HOOKS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                mode: MatchMode::All,
            },
            listener: NamingRule {
                suffixes: vec!["Listener".to_string(), "Subscriber".to_string()],
                marker_methods: vec!["handle".to_string(), "subscribe".to_string()],
                mode: MatchMode::Any,
            },
            policy: NamingRule {
                suffixes: vec!["Policy".to_string()],
                marker_methods: [
                    "viewAny",
                    "view",
                    "create",
                    "update",
                    "delete",
                    "restore",
                    "forceDelete",
                    "before",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                mode: MatchMode::All,
            },
            rule: NamingRule {
                suffixes: vec!["Rule".to_string()],
                marker_methods: vec![
                    "passes".to_string(),
                    "validate".to_string(),
                    "__invoke".to_string(),
                ],
                mode: MatchMode::Any,
            },
        }
    }
}

impl Default for NamingRule {
    fn default() -> Self {
        Self {
            suffixes: Vec::new(),
            marker_methods: Vec::new(),
            mode: MatchMode::All,
        }
    }
}

impl NamingRule {
    /// Apply the rule to a class short name and its method names
    pub fn matches<'a>(&self, short_name: &str, methods: impl IntoIterator<Item = &'a str>) -> bool {
        let by_name = self.suffixes.iter().any(|s| short_name.ends_with(s.as_str()));
        let mut methods = methods.into_iter();
        let by_method = methods.any(|m| self.marker_methods.iter().any(|marker| marker == m));
        match self.mode {
            MatchMode::All => by_name && by_method,
            MatchMode::Any => by_name || by_method,
        }
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        let rule = |keyword: &str, name: &str, description: &str| RouteNarrative {
            keyword: keyword.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        };
        Self {
            route_keywords: vec![
                rule(
                    "register",
                    "User Registration",
                    "Account creation from the registration endpoint",
                ),
                rule("order", "Order Processing", "Order placement and fulfilment"),
                rule("checkout", "Checkout", "Cart checkout and payment capture"),
                rule("payment", "Payment Processing", "Payment handling"),
            ],
            maintenance_keywords: ["clean", "prune", "purge", "backup", "sync", "archive"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            escape_slashes: false,
            escape_unicode: false,
        }
    }
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            metadata: true,
            summary: true,
            toc: true,
            diagram: true,
        }
    }
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            paper: "a4".to_string(),
            orientation: Orientation::default(),
            font: "DejaVu Sans".to_string(),
            allow_remote: false,
            binary: None,
            template: None,
        }
    }
}

/// CLI overrides merged on top of a loaded config
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub exclude: Vec<String>,
    pub no_recursive: bool,
    pub title: Option<String>,
    pub template: Option<PathBuf>,
    pub paper: Option<String>,
    pub orientation: Option<Orientation>,
    pub compact: bool,
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: CliOverrides) {
        if !cli.exclude.is_empty() {
            self.scan.exclude.extend(cli.exclude);
        }

        if cli.no_recursive {
            self.scan.recursive = false;
        }

        if let Some(title) = cli.title {
            self.export.title = Some(title);
        }

        if let Some(template) = cli.template {
            self.export.html.template = Some(template.clone());
            self.export.pdf.template = Some(template);
        }

        if let Some(paper) = cli.paper {
            self.export.pdf.paper = paper.to_ascii_lowercase();
        }

        if let Some(orientation) = cli.orientation {
            self.export.pdf.orientation = orientation;
        }

        if cli.compact {
            self.export.json.pretty = false;
        }
    }

    /// Directories scanned for a kind, relative to the application root
    pub fn paths_for(&self, kind: ComponentKind) -> Vec<String> {
        match self.scan.paths.get(kind.slug()) {
            Some(paths) => paths.clone(),
            None => kind.default_paths().iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for key in self.scan.paths.keys() {
            ComponentKind::from_str(key).map_err(|_| {
                Error::config_validation(format!("unknown kind in scan.paths: {}", key))
            })?;
        }

        for pattern in &self.scan.exclude {
            glob::Pattern::new(pattern)?;
        }

        if self.scan.index_paths.is_empty() {
            return Err(Error::config_validation(
                "at least one index path required",
            ));
        }

        if self.scan.route_files.iter().any(|f| f.path.trim().is_empty()) {
            return Err(Error::config_validation("route file path cannot be empty"));
        }

        if self.flow.model_markers.is_empty() {
            return Err(Error::config_validation("flow.model_markers cannot be empty"));
        }

        if self.flow.service_markers.is_empty() {
            return Err(Error::config_validation(
                "flow.service_markers cannot be empty",
            ));
        }

        if !PAPER_SIZES.contains(&self.export.pdf.paper.to_ascii_lowercase().as_str()) {
            return Err(Error::config_validation(format!(
                "unknown paper size: {}",
                self.export.pdf.paper
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project.name, "Untitled Project");
        assert!(config.scan.recursive);
        assert_eq!(config.scan.route_files.len(), 2);
        assert!(config.export.json.pretty);
        assert_eq!(config.flow.facades.get("DB").map(String::as_str), Some("database"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[project]
name = "Shop"

[scan]
recursive = false

[scan.paths]
models = ["app/Domain/Models"]

[flow]
service_markers = ["\\Services\\", "\\Repositories\\"]

[export.pdf]
paper = "letter"
orientation = "landscape"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.project.name, "Shop");
        assert!(!config.scan.recursive);
        assert_eq!(config.paths_for(ComponentKind::Model), vec!["app/Domain/Models"]);
        assert_eq!(config.flow.service_markers.len(), 2);
        assert_eq!(config.export.pdf.orientation, Orientation::Landscape);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/surveyor.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_paths_for_default() {
        let config = Config::default();
        assert_eq!(config.paths_for(ComponentKind::Job), vec!["app/Jobs"]);
    }

    #[test]
    fn test_validation_unknown_kind() {
        let mut config = Config::default();
        config.scan.paths.insert("widgets".to_string(), vec!["app".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bad_paper() {
        let mut config = Config::default();
        config.export.pdf.paper = "napkin".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bad_glob() {
        let mut config = Config::default();
        config.scan.exclude.push("[".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_markers() {
        let mut config = Config::default();
        config.flow.model_markers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_cli() {
        let mut config = Config::default();
        config.merge_cli(CliOverrides {
            exclude: vec!["storage/**".to_string()],
            no_recursive: true,
            title: Some("Shop Architecture".to_string()),
            paper: Some("Letter".to_string()),
            orientation: Some(Orientation::Landscape),
            compact: true,
            ..Default::default()
        });
        assert!(config.scan.exclude.contains(&"storage/**".to_string()));
        assert!(!config.scan.recursive);
        assert_eq!(config.export.title.as_deref(), Some("Shop Architecture"));
        assert_eq!(config.export.pdf.paper, "letter");
        assert_eq!(config.export.pdf.orientation, Orientation::Landscape);
        assert!(!config.export.json.pretty);
    }

    #[test]
    fn test_naming_rule_modes() {
        let all = NamingRule {
            suffixes: vec!["Observer".to_string()],
            marker_methods: vec!["created".to_string()],
            mode: MatchMode::All,
        };
        assert!(all.matches("UserObserver", ["created"]));
        assert!(!all.matches("UserObserver", ["handle"]));
        assert!(!all.matches("UserWatcher", ["created"]));

        let any = NamingRule {
            mode: MatchMode::Any,
            ..all
        };
        assert!(any.matches("UserWatcher", ["created"]));
        assert!(!any.matches("UserWatcher", ["handle"]));
    }

    #[test]
    fn test_orientation_parsing() {
        assert_eq!("Landscape".parse::<Orientation>().unwrap(), Orientation::Landscape);
        assert!("sideways".parse::<Orientation>().is_err());
    }
}
