// Source-data export: a PHP file returning one array literal
//
// Buckets carry their own field subsets rather than a uniform dump. A
// second pass adds `connected_to` maps and synthesized lifecycle flows.

use crate::analysis::{connected_to, synthesize_flows, Architecture, Component, ComponentKind, Flow, Metadata};
use crate::config::Config;
use std::collections::BTreeMap;

/// Buckets always present, in output order; `metadata` and `flows` are built separately
const FIXED_BUCKETS: [ComponentKind; 8] = [
    ComponentKind::Route,
    ComponentKind::Command,
    ComponentKind::Model,
    ComponentKind::Controller,
    ComponentKind::Service,
    ComponentKind::Job,
    ComponentKind::Event,
    ComponentKind::Listener,
];

/// Buckets emitted only when non-empty
const OPTIONAL_BUCKETS: [ComponentKind; 8] = [
    ComponentKind::Policy,
    ComponentKind::Middleware,
    ComponentKind::Observer,
    ComponentKind::Action,
    ComponentKind::Resource,
    ComponentKind::Notification,
    ComponentKind::Request,
    ComponentKind::Rule,
];

/// A PHP literal value
#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<PhpValue>),
    Map(Vec<(String, PhpValue)>),
}

impl From<&str> for PhpValue {
    fn from(s: &str) -> Self {
        PhpValue::Str(s.to_string())
    }
}

impl From<String> for PhpValue {
    fn from(s: String) -> Self {
        PhpValue::Str(s)
    }
}

impl From<&String> for PhpValue {
    fn from(s: &String) -> Self {
        PhpValue::Str(s.clone())
    }
}

impl From<bool> for PhpValue {
    fn from(b: bool) -> Self {
        PhpValue::Bool(b)
    }
}

impl From<usize> for PhpValue {
    fn from(n: usize) -> Self {
        PhpValue::Int(n as i64)
    }
}

impl<T: Into<PhpValue>> From<Option<T>> for PhpValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PhpValue::Null, Into::into)
    }
}

impl From<&[String]> for PhpValue {
    fn from(items: &[String]) -> Self {
        PhpValue::List(items.iter().map(PhpValue::from).collect())
    }
}

impl From<&Vec<String>> for PhpValue {
    fn from(items: &Vec<String>) -> Self {
        PhpValue::from(items.as_slice())
    }
}

impl From<&BTreeMap<String, String>> for PhpValue {
    fn from(map: &BTreeMap<String, String>) -> Self {
        PhpValue::Map(map.iter().map(|(k, v)| (k.clone(), PhpValue::from(v))).collect())
    }
}

impl From<BTreeMap<String, Vec<String>>> for PhpValue {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        PhpValue::Map(map.iter().map(|(k, v)| (k.clone(), PhpValue::from(v))).collect())
    }
}

impl PhpValue {
    fn write(&self, out: &mut String, depth: usize) {
        match self {
            PhpValue::Null => out.push_str("null"),
            PhpValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            PhpValue::Int(n) => out.push_str(&n.to_string()),
            PhpValue::Str(s) => out.push_str(&quote(s)),
            PhpValue::List(items) if items.is_empty() => out.push_str("[]"),
            PhpValue::Map(entries) if entries.is_empty() => out.push_str("[]"),
            PhpValue::List(items) => {
                out.push_str("[\n");
                for item in items {
                    indent(out, depth + 1);
                    item.write(out, depth + 1);
                    out.push_str(",\n");
                }
                indent(out, depth);
                out.push(']');
            }
            PhpValue::Map(entries) => {
                out.push_str("[\n");
                for (key, value) in entries {
                    indent(out, depth + 1);
                    out.push_str(&quote(key));
                    out.push_str(" => ");
                    value.write(out, depth + 1);
                    out.push_str(",\n");
                }
                indent(out, depth);
                out.push(']');
            }
        }
    }

    /// PHP source for this value at the top level
    pub fn to_php(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

/// Single-quoted PHP string literal
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Small builder for ordered maps
struct Entry(Vec<(String, PhpValue)>);

impl Entry {
    fn new() -> Self {
        Entry(Vec::new())
    }

    fn with(mut self, key: &str, value: impl Into<PhpValue>) -> Self {
        self.0.push((key.to_string(), value.into()));
        self
    }

    fn done(self) -> PhpValue {
        PhpValue::Map(self.0)
    }
}

/// The complete PHP module
pub fn render(architecture: &Architecture, config: &Config) -> String {
    let mut out = String::from("<?php\n\n");
    out.push_str(&format!(
        "// Generated by {} on {}\n\n",
        architecture.metadata.generator, architecture.metadata.generated_at
    ));
    out.push_str("return ");
    out.push_str(&document(architecture, config).to_php());
    out.push_str(";\n");
    out
}

/// The returned array as a value tree
pub fn document(architecture: &Architecture, config: &Config) -> PhpValue {
    let mut buckets = vec![("metadata".to_string(), metadata(architecture))];

    for kind in FIXED_BUCKETS {
        buckets.push((kind.slug().to_string(), bucket(architecture, kind, config)));
    }

    let flows = if architecture.flows.is_empty() {
        synthesize_flows(architecture, &config.narratives)
    } else {
        architecture.flows.clone()
    };
    buckets.push(("flows".to_string(), PhpValue::List(flows.iter().map(flow).collect())));

    for kind in OPTIONAL_BUCKETS {
        if architecture.count(kind) > 0 {
            buckets.push((kind.slug().to_string(), bucket(architecture, kind, config)));
        }
    }
    PhpValue::Map(buckets)
}

fn metadata(architecture: &Architecture) -> PhpValue {
    let meta = &architecture.metadata;
    let counts = ComponentKind::ALL
        .iter()
        .map(|k| (k.slug().to_string(), PhpValue::from(architecture.count(*k))))
        .collect();
    Entry::new()
        .with("project", &meta.project)
        .with("generated_at", &meta.generated_at)
        .with("root", &meta.root)
        .with("generator", &meta.generator)
        .with("total", architecture.total())
        .with("counts", PhpValue::Map(counts))
        .done()
}

fn bucket(architecture: &Architecture, kind: ComponentKind, config: &Config) -> PhpValue {
    PhpValue::List(
        architecture
            .components(kind)
            .iter()
            .map(|c| component(c, config))
            .collect(),
    )
}

fn component(c: &Component, config: &Config) -> PhpValue {
    let base = Entry::new().with("class", &c.fq_name);
    let entry = match &c.metadata {
        Metadata::Route(meta) => Entry::new()
            .with("uri", &meta.uri)
            .with("methods", &meta.methods)
            .with("name", meta.name.as_ref())
            .with("controller", meta.controller.as_ref())
            .with("action", meta.action.as_ref())
            .with("middleware", &meta.middleware)
            .with("category", meta.category.as_str()),
        Metadata::Command(meta) => base
            .with("signature", meta.signature.as_ref())
            .with("name", meta.name.as_ref())
            .with("description", meta.description.as_ref()),
        Metadata::Model(meta) => base
            .with("table", &meta.table)
            .with("fillable", &meta.fillable)
            .with(
                "relations",
                PhpValue::List(
                    meta.relations
                        .iter()
                        .map(|r| {
                            Entry::new()
                                .with("name", &r.name)
                                .with("type", &r.relation_type)
                                .with("related", r.related.as_ref())
                                .done()
                        })
                        .collect(),
                ),
            )
            .with("observers", &meta.observers)
            .with("connected_to", connected_to(c, &config.flow)),
        Metadata::Controller(meta) => base
            .with("actions", &meta.actions)
            .with("middleware", &meta.middleware)
            .with("connected_to", connected_to(c, &config.flow)),
        Metadata::Service(meta) => base
            .with("methods", &meta.methods)
            .with("connected_to", connected_to(c, &config.flow)),
        Metadata::Job(meta) => base
            .with("queued", meta.queueable)
            .with("queue", meta.queue_config.queue.as_ref())
            .with("connection", meta.queue_config.connection.as_ref()),
        Metadata::Event(meta) => base
            .with("broadcast", meta.broadcast)
            .with("listeners", &meta.listeners),
        Metadata::Listener(meta) => base.with("events", &meta.events).with("queued", meta.queued),
        Metadata::Policy(meta) => base
            .with("model", meta.model.as_ref())
            .with("abilities", &meta.abilities),
        Metadata::Middleware(meta) => base.with("aliases", &meta.aliases),
        Metadata::Observer(meta) => base.with("model", meta.model.as_ref()).with("hooks", &meta.hooks),
        Metadata::Action(meta) => base.with("entry_point", meta.entry_point.as_ref()),
        Metadata::Resource(meta) => base.with("attributes", &meta.attributes),
        Metadata::Notification(meta) => base.with("channels", &meta.channels),
        Metadata::Request(meta) => base.with("rules", &meta.rules),
        Metadata::Rule(meta) => base.with("message", meta.message.as_ref()),
        Metadata::Degraded => base.with("note", c.note.as_ref()),
    };
    entry.done()
}

fn flow(flow: &Flow) -> PhpValue {
    let confidence = match flow.confidence {
        crate::analysis::Confidence::Heuristic => "heuristic",
        crate::analysis::Confidence::Declared => "declared",
    };
    Entry::new()
        .with("name", &flow.name)
        .with("trigger", &flow.trigger)
        .with("description", &flow.description)
        .with("steps", &flow.steps)
        .with("confidence", confidence)
        .done()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        ArchitectureMetadata, FlowReport, ModelMeta, ObserverMeta, Relation, RouteMeta, ScanResult,
    };

    fn component(kind: ComponentKind, fq_name: &str, metadata: Metadata) -> Component {
        let mut c = Component::degraded(kind, fq_name, String::new(), "");
        c.note = None;
        c.metadata = metadata;
        c
    }

    fn keys(value: &PhpValue) -> Vec<&str> {
        match value {
            PhpValue::Map(entries) => entries.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    fn get<'a>(value: &'a PhpValue, key: &str) -> &'a PhpValue {
        match value {
            PhpValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .unwrap_or_else(|| panic!("missing key {}", key)),
            other => panic!("not a map: {:?}", other),
        }
    }

    fn empty() -> Architecture {
        Architecture::new(ArchitectureMetadata::new("Empty", "/srv/empty"), Vec::new())
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("App\\Models\\User"), "'App\\\\Models\\\\User'");
        assert_eq!(quote("it's"), "'it\\'s'");
    }

    #[test]
    fn test_value_writer() {
        let value = Entry::new()
            .with("name", "x")
            .with("tags", PhpValue::List(vec!["a".into(), "b".into()]))
            .with("empty", PhpValue::List(vec![]))
            .with("missing", None::<String>)
            .with("n", 3usize)
            .done();
        assert_eq!(
            value.to_php(),
            "[\n    'name' => 'x',\n    'tags' => [\n        'a',\n        'b',\n    ],\n    'empty' => [],\n    'missing' => null,\n    'n' => 3,\n]"
        );
    }

    #[test]
    fn test_empty_architecture_has_fixed_buckets_only() {
        let doc = document(&empty(), &Config::default());
        assert_eq!(
            keys(&doc),
            vec![
                "metadata",
                "routes",
                "commands",
                "models",
                "controllers",
                "services",
                "jobs",
                "events",
                "listeners",
                "flows"
            ]
        );
        assert_eq!(get(&doc, "routes"), &PhpValue::List(vec![]));

        let source = render(&empty(), &Config::default());
        assert!(source.starts_with("<?php\n"));
        assert!(source.trim_end().ends_with("];"));
    }

    #[test]
    fn test_optional_buckets_and_lifecycle_flow() {
        let order = component(
            ComponentKind::Model,
            "App\\Models\\Order",
            Metadata::Model(ModelMeta {
                table: "orders".to_string(),
                relations: vec![Relation {
                    name: "customer".to_string(),
                    relation_type: "BelongsTo".to_string(),
                    related: Some("App\\Models\\Customer".to_string()),
                }],
                ..Default::default()
            }),
        );
        let observer = component(
            ComponentKind::Observer,
            "App\\Observers\\OrderObserver",
            Metadata::Observer(ObserverMeta {
                model: Some("App\\Models\\Order".to_string()),
                hooks: vec!["created".to_string()],
            }),
        );
        let arch = Architecture::new(
            ArchitectureMetadata::new("Shop", "/srv/shop"),
            vec![
                ScanResult::new(ComponentKind::Model, vec![order]),
                ScanResult::new(ComponentKind::Observer, vec![observer]),
                ScanResult::empty(ComponentKind::Policy),
            ],
        );

        let doc = document(&arch, &Config::default());
        let names = keys(&doc);
        assert!(names.contains(&"observers"));
        assert!(!names.contains(&"policies"));

        let PhpValue::List(models) = get(&doc, "models") else {
            panic!("models is not a list");
        };
        let connected = get(&models[0], "connected_to");
        assert_eq!(
            get(connected, "models"),
            &PhpValue::List(vec!["App\\Models\\Customer".into()])
        );

        let PhpValue::List(flows) = get(&doc, "flows") else {
            panic!("flows is not a list");
        };
        assert_eq!(get(&flows[0], "name"), &PhpValue::from("Order Lifecycle"));
        assert_eq!(get(&flows[0], "confidence"), &PhpValue::from("heuristic"));
    }

    #[test]
    fn test_route_bucket_fields() {
        let mut route = component(
            ComponentKind::Route,
            "POST checkout",
            Metadata::Route(RouteMeta {
                uri: "checkout".to_string(),
                methods: vec!["POST".to_string()],
                controller: Some("App\\Http\\Controllers\\CheckoutController".to_string()),
                action: Some("store".to_string()),
                ..Default::default()
            }),
        );
        route.flow = Some(FlowReport::default());
        let arch = Architecture::new(
            ArchitectureMetadata::new("Shop", "/srv/shop"),
            vec![ScanResult::new(ComponentKind::Route, vec![route])],
        );

        let source = render(&arch, &Config::default());
        assert!(source.contains("'uri' => 'checkout',"));
        assert!(source.contains("'controller' => 'App\\\\Http\\\\Controllers\\\\CheckoutController',"));
        assert!(source.contains("'name' => 'Checkout',"));
        assert!(source.contains("'trigger' => 'route: POST checkout',"));
    }
}
