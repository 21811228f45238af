// Component data model
//
// A Component is one discovered class (or route) of a known kind. The
// per-kind metadata is a tagged variant so every kind keeps its own field
// shape while sharing identity, structure and flow.

use crate::analysis::flow::{FlowEdge, FlowReport};
use crate::error::Error;
use crate::parser::{Method, Parameter, PhpClass, Visibility};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Architectural kind of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Route,
    Model,
    Controller,
    Command,
    Job,
    Event,
    Listener,
    Observer,
    Policy,
    Rule,
    Middleware,
    Request,
    Resource,
    Notification,
    Service,
    Action,
}

impl ComponentKind {
    /// Every kind, in report order
    pub const ALL: [ComponentKind; 16] = [
        ComponentKind::Route,
        ComponentKind::Model,
        ComponentKind::Controller,
        ComponentKind::Command,
        ComponentKind::Job,
        ComponentKind::Event,
        ComponentKind::Listener,
        ComponentKind::Observer,
        ComponentKind::Policy,
        ComponentKind::Rule,
        ComponentKind::Middleware,
        ComponentKind::Request,
        ComponentKind::Resource,
        ComponentKind::Notification,
        ComponentKind::Service,
        ComponentKind::Action,
    ];

    /// Plural lowercase name used in config keys, buckets and CLI targets
    pub fn slug(&self) -> &'static str {
        match self {
            ComponentKind::Route => "routes",
            ComponentKind::Model => "models",
            ComponentKind::Controller => "controllers",
            ComponentKind::Command => "commands",
            ComponentKind::Job => "jobs",
            ComponentKind::Event => "events",
            ComponentKind::Listener => "listeners",
            ComponentKind::Observer => "observers",
            ComponentKind::Policy => "policies",
            ComponentKind::Rule => "rules",
            ComponentKind::Middleware => "middleware",
            ComponentKind::Request => "requests",
            ComponentKind::Resource => "resources",
            ComponentKind::Notification => "notifications",
            ComponentKind::Service => "services",
            ComponentKind::Action => "actions",
        }
    }

    /// Human section title
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::Route => "Routes",
            ComponentKind::Model => "Models",
            ComponentKind::Controller => "Controllers",
            ComponentKind::Command => "Commands",
            ComponentKind::Job => "Jobs",
            ComponentKind::Event => "Events",
            ComponentKind::Listener => "Listeners",
            ComponentKind::Observer => "Observers",
            ComponentKind::Policy => "Policies",
            ComponentKind::Rule => "Validation Rules",
            ComponentKind::Middleware => "Middleware",
            ComponentKind::Request => "Form Requests",
            ComponentKind::Resource => "API Resources",
            ComponentKind::Notification => "Notifications",
            ComponentKind::Service => "Services",
            ComponentKind::Action => "Actions",
        }
    }

    /// Conventional directories, relative to the application root
    pub fn default_paths(&self) -> &'static [&'static str] {
        match self {
            ComponentKind::Route => &["routes"],
            ComponentKind::Model => &["app/Models"],
            ComponentKind::Controller => &["app/Http/Controllers"],
            ComponentKind::Command => &["app/Console/Commands"],
            ComponentKind::Job => &["app/Jobs"],
            ComponentKind::Event => &["app/Events"],
            ComponentKind::Listener => &["app/Listeners"],
            ComponentKind::Observer => &["app/Observers"],
            ComponentKind::Policy => &["app/Policies"],
            ComponentKind::Rule => &["app/Rules"],
            ComponentKind::Middleware => &["app/Http/Middleware"],
            ComponentKind::Request => &["app/Http/Requests"],
            ComponentKind::Resource => &["app/Http/Resources"],
            ComponentKind::Notification => &["app/Notifications"],
            ComponentKind::Service => &["app/Services"],
            ComponentKind::Action => &["app/Actions"],
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ComponentKind {
    type Err = Error;

    /// Accepts singular or plural, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ComponentKind::ALL
            .iter()
            .copied()
            .find(|kind| {
                let slug = kind.slug();
                wanted == slug || wanted == singular(slug)
            })
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

fn singular(slug: &str) -> String {
    if let Some(stem) = slug.strip_suffix("ies") {
        format!("{}y", stem)
    } else if let Some(stem) = slug.strip_suffix('s') {
        stem.to_string()
    } else {
        slug.to_string()
    }
}

/// How far a detected fact can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Found by textual pattern matching
    #[default]
    Heuristic,
    /// Read from an explicit declaration
    Declared,
}

/// A method signature as reported in a component's structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
}

impl From<&Method> for MethodSignature {
    fn from(method: &Method) -> Self {
        Self {
            name: method.name.clone(),
            visibility: method.visibility,
            is_static: method.is_static,
            parameters: method.parameters.clone(),
            return_type: method.return_type.clone(),
        }
    }
}

/// Introspected shape of a class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub extends: Option<String>,
    pub interfaces: Vec<String>,
    pub traits: Vec<String>,
    pub constructor: Vec<Parameter>,
    pub methods: Vec<MethodSignature>,
}

impl Structure {
    /// Public methods, plus protected ones when asked
    pub fn from_class(class: &PhpClass, include_protected: bool) -> Self {
        let methods = class
            .methods
            .iter()
            .filter(|m| !m.is_magic())
            .filter(|m| match m.visibility {
                Visibility::Public => true,
                Visibility::Protected => include_protected,
                Visibility::Private => false,
            })
            .map(MethodSignature::from)
            .collect();

        Self {
            extends: class.resolved_parent(),
            interfaces: class.resolved_interfaces(),
            traits: class.resolved_traits(),
            constructor: class
                .constructor()
                .map(|c| c.parameters.clone())
                .unwrap_or_default(),
            methods,
        }
    }
}

/// Category derived from a route's URI prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouteCategory {
    Api,
    Admin,
    Webhook,
    System,
    #[default]
    Web,
}

impl RouteCategory {
    pub fn from_uri(uri: &str) -> Self {
        let uri = uri.trim_start_matches('/').to_ascii_lowercase();
        if uri == "api" || uri.starts_with("api/") {
            RouteCategory::Api
        } else if uri == "admin" || uri.starts_with("admin/") {
            RouteCategory::Admin
        } else if uri.contains("webhooks") {
            RouteCategory::Webhook
        } else if uri.contains("health") || uri.contains("status") {
            RouteCategory::System
        } else {
            RouteCategory::Web
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteCategory::Api => "api",
            RouteCategory::Admin => "admin",
            RouteCategory::Webhook => "webhook",
            RouteCategory::System => "system",
            RouteCategory::Web => "web",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMeta {
    pub uri: String,
    pub methods: Vec<String>,
    pub name: Option<String>,
    pub middleware: Vec<String>,
    pub controller: Option<String>,
    pub action: Option<String>,
    pub closure: bool,
    pub category: RouteCategory,
}

impl RouteMeta {
    /// `Controller@method`, the closure marker, or nothing
    pub fn handler(&self) -> String {
        match (&self.controller, &self.action) {
            (Some(controller), Some(action)) => format!("{}@{}", controller, action),
            (Some(controller), None) => controller.clone(),
            _ if self.closure => "Closure".to_string(),
            _ => String::new(),
        }
    }
}

/// An Eloquent relation method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    /// StudlyCase relation class, e.g. `BelongsTo`
    #[serde(rename = "type")]
    pub relation_type: String,
    /// Fully-qualified related model, absent for `morphTo`
    pub related: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub table: String,
    pub primary_key: String,
    pub fillable: Vec<String>,
    pub guarded: Vec<String>,
    pub hidden: Vec<String>,
    pub casts: BTreeMap<String, String>,
    pub relations: Vec<Relation>,
    pub scopes: Vec<String>,
    pub boot_hooks: Vec<String>,
    pub observers: Vec<String>,
    pub dispatches_events: BTreeMap<String, String>,
    pub soft_deletes: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerMeta {
    pub actions: Vec<String>,
    pub middleware: Vec<String>,
    pub resourceful: bool,
    pub invokable: bool,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMeta {
    pub signature: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub arguments: Vec<String>,
    pub options: Vec<String>,
}

/// Queue routing of a job or notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub queue: Option<String>,
    pub connection: Option<String>,
    pub tries: Option<String>,
    pub timeout: Option<String>,
    pub backoff: Option<String>,
}

impl QueueConfig {
    pub fn is_empty(&self) -> bool {
        self.queue.is_none()
            && self.connection.is_none()
            && self.tries.is_none()
            && self.timeout.is_none()
            && self.backoff.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMeta {
    pub queueable: bool,
    pub unique: bool,
    pub queue_config: QueueConfig,
    pub constructor_params: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub broadcast: bool,
    pub channels: Vec<String>,
    pub payload: Vec<String>,
    pub listeners: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerMeta {
    pub events: Vec<String>,
    pub queued: bool,
    pub subscriber: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverMeta {
    pub model: Option<String>,
    pub hooks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMeta {
    pub model: Option<String>,
    pub abilities: Vec<String>,
    pub has_before: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    pub contract: Option<String>,
    pub invokable: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddlewareMeta {
    pub aliases: Vec<String>,
    pub parameters: Vec<String>,
    pub terminable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub rules: BTreeMap<String, String>,
    pub authorizes: bool,
    pub messages: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub collection: bool,
    pub attributes: Vec<String>,
    pub collects: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMeta {
    pub channels: Vec<String>,
    pub queued: bool,
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMeta {
    pub methods: Vec<String>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMeta {
    pub entry_point: Option<String>,
    pub dependencies: Vec<String>,
}

/// Kind-specific metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Metadata {
    Route(RouteMeta),
    Model(ModelMeta),
    Controller(ControllerMeta),
    Command(CommandMeta),
    Job(JobMeta),
    Event(EventMeta),
    Listener(ListenerMeta),
    Observer(ObserverMeta),
    Policy(PolicyMeta),
    Rule(RuleMeta),
    Middleware(MiddlewareMeta),
    Request(RequestMeta),
    Resource(ResourceMeta),
    Notification(NotificationMeta),
    Service(ServiceMeta),
    Action(ActionMeta),
    /// Introspection failed; only identity is known
    Degraded,
}

/// One discovered unit of the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub kind: ComponentKind,
    pub fq_name: String,
    pub short_name: String,
    pub namespace: String,
    /// Path relative to the application root
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Structure>,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowReport>,
    /// Reason for a degraded entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Component {
    /// Component for an introspected class
    pub fn from_class(kind: ComponentKind, class: &PhpClass, file_path: String, metadata: Metadata) -> Self {
        Self {
            kind,
            fq_name: class.fq_name(),
            short_name: class.name.clone(),
            namespace: class.namespace.clone().unwrap_or_default(),
            file_path,
            structure: None,
            metadata,
            flow: None,
            note: None,
        }
    }

    /// Name-only entry recorded when introspection fails
    pub fn degraded(kind: ComponentKind, fq_name: &str, file_path: String, note: impl Into<String>) -> Self {
        Self {
            kind,
            fq_name: fq_name.to_string(),
            short_name: crate::parser::short_name(fq_name).to_string(),
            namespace: crate::parser::namespace_of(fq_name).to_string(),
            file_path,
            structure: None,
            metadata: Metadata::Degraded,
            flow: None,
            note: Some(note.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.metadata, Metadata::Degraded)
    }

    /// Edges found by the flow analyzer for this component
    pub fn edges(&self) -> Vec<FlowEdge> {
        self.flow
            .as_ref()
            .map(|flow| flow.edges(&self.fq_name))
            .unwrap_or_default()
    }
}

/// Homogeneous result of scanning one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub count: usize,
    pub data: Vec<Component>,
}

impl ScanResult {
    pub fn new(kind: ComponentKind, data: Vec<Component>) -> Self {
        Self {
            kind,
            count: data.len(),
            data,
        }
    }

    pub fn empty(kind: ComponentKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A synthesized lifecycle narrative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    pub trigger: String,
    pub description: String,
    pub steps: Vec<String>,
    pub confidence: Confidence,
}

/// Run information attached to an architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureMetadata {
    pub project: String,
    pub generated_at: String,
    pub root: String,
    pub generator: String,
}

impl ArchitectureMetadata {
    pub fn new(project: &str, root: &str) -> Self {
        Self {
            project: project.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            root: root.to_string(),
            generator: format!("surveyor {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Every scan result of one analysis run.
///
/// Serialized as one object: `metadata`, each scanned kind keyed by its
/// slug in report order, then `flows`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ArchitectureFields")]
pub struct Architecture {
    pub metadata: ArchitectureMetadata,
    pub results: Vec<ScanResult>,
    pub flows: Vec<Flow>,
}

impl Serialize for Architecture {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut results: Vec<&ScanResult> = self.results.iter().collect();
        results.sort_by_key(|r| r.kind);

        let mut map = serializer.serialize_map(Some(results.len() + 2))?;
        map.serialize_entry("metadata", &self.metadata)?;
        for result in results {
            map.serialize_entry(result.kind.slug(), result)?;
        }
        map.serialize_entry("flows", &self.flows)?;
        map.end()
    }
}

#[derive(Deserialize)]
struct ArchitectureFields {
    metadata: ArchitectureMetadata,
    #[serde(default)]
    flows: Vec<Flow>,
    #[serde(flatten)]
    results: BTreeMap<String, ScanResult>,
}

impl From<ArchitectureFields> for Architecture {
    fn from(fields: ArchitectureFields) -> Self {
        let mut results: Vec<ScanResult> = fields.results.into_values().collect();
        results.sort_by_key(|r| r.kind);
        Self {
            metadata: fields.metadata,
            results,
            flows: fields.flows,
        }
    }
}

impl Architecture {
    pub fn new(metadata: ArchitectureMetadata, results: Vec<ScanResult>) -> Self {
        Self {
            metadata,
            results,
            flows: Vec::new(),
        }
    }

    /// Scan result for a kind, if it was scanned
    pub fn get(&self, kind: ComponentKind) -> Option<&ScanResult> {
        self.results.iter().find(|r| r.kind == kind)
    }

    /// Components of a kind; empty when the kind was not scanned
    pub fn components(&self, kind: ComponentKind) -> &[Component] {
        self.get(kind).map(|r| r.data.as_slice()).unwrap_or(&[])
    }

    pub fn count(&self, kind: ComponentKind) -> usize {
        self.get(kind).map_or(0, |r| r.count)
    }

    pub fn total(&self) -> usize {
        self.results.iter().map(|r| r.count).sum()
    }

    /// Scan results with at least one component
    pub fn non_empty(&self) -> impl Iterator<Item = &ScanResult> {
        self.results.iter().filter(|r| !r.is_empty())
    }

    pub fn all_components(&self) -> impl Iterator<Item = &Component> {
        self.results.iter().flat_map(|r| r.data.iter())
    }

    /// Flow edges across all components
    pub fn edges(&self) -> Vec<FlowEdge> {
        self.all_components().flat_map(Component::edges).collect()
    }
}
