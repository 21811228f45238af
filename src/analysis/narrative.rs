// Synthesized lifecycle narratives
//
// Illustrative flows built from superficial signals: route URIs containing
// a domain keyword, maintenance-sounding command names, and models with
// observers. None of this is a verified call graph.

use crate::analysis::component::{
    Architecture, Component, ComponentKind, Confidence, Flow, Metadata, ModelMeta, ObserverMeta,
};
use crate::config::{FlowConfig, NarrativeConfig};
use crate::parser::short_name;
use std::collections::BTreeMap;

/// Every narrative the architecture supports, in a stable order
pub fn synthesize_flows(arch: &Architecture, config: &NarrativeConfig) -> Vec<Flow> {
    let mut flows = route_flows(arch, config);
    flows.extend(maintenance_flow(arch, config));
    flows.extend(model_lifecycle_flows(arch));
    flows
}

fn route_flows(arch: &Architecture, config: &NarrativeConfig) -> Vec<Flow> {
    let routes = arch.components(ComponentKind::Route);
    config
        .route_keywords
        .iter()
        .filter_map(|rule| {
            let keyword = rule.keyword.to_ascii_lowercase();
            let matching: Vec<&Component> = routes
                .iter()
                .filter(|r| match &r.metadata {
                    Metadata::Route(meta) => meta.uri.to_ascii_lowercase().contains(&keyword),
                    _ => false,
                })
                .collect();
            let first = matching.first()?;

            let mut steps = Vec::new();
            for route in &matching {
                if let Metadata::Route(meta) = &route.metadata {
                    let handler = meta.handler();
                    steps.push(if handler.is_empty() {
                        route.fq_name.clone()
                    } else {
                        format!("{} -> {}", route.fq_name, handler)
                    });
                }
                if let Some(flow) = &route.flow {
                    for job in &flow.jobs {
                        let mode = if job.is_async { "queued" } else { "sync" };
                        steps.push(format!("dispatch {} ({})", job.job, mode));
                    }
                    steps.extend(flow.events.iter().map(|e| format!("fire {}", e)));
                    steps.extend(flow.notifications.iter().map(|n| format!("notify {}", n)));
                }
            }

            Some(Flow {
                name: rule.name.clone(),
                trigger: format!("route: {}", first.fq_name),
                description: rule.description.clone(),
                steps,
                confidence: Confidence::Heuristic,
            })
        })
        .collect()
}

fn maintenance_flow(arch: &Architecture, config: &NarrativeConfig) -> Option<Flow> {
    let keywords: Vec<String> = config
        .maintenance_keywords
        .iter()
        .map(|k| k.to_ascii_lowercase())
        .collect();

    let steps: Vec<String> = arch
        .components(ComponentKind::Command)
        .iter()
        .filter(|c| {
            let name = c.short_name.to_ascii_lowercase();
            keywords.iter().any(|k| name.contains(k.as_str()))
        })
        .map(|c| match &c.metadata {
            Metadata::Command(meta) => match &meta.name {
                Some(name) => format!("artisan {} ({})", name, c.short_name),
                None => c.short_name.clone(),
            },
            _ => c.short_name.clone(),
        })
        .collect();

    if steps.is_empty() {
        return None;
    }
    Some(Flow {
        name: "Scheduled Maintenance".to_string(),
        trigger: "scheduler".to_string(),
        description: "Housekeeping commands run on a schedule".to_string(),
        steps,
        confidence: Confidence::Heuristic,
    })
}

/// One flow per model with at least one observer
fn model_lifecycle_flows(arch: &Architecture) -> Vec<Flow> {
    let observers: Vec<(&Component, &ObserverMeta)> = arch
        .components(ComponentKind::Observer)
        .iter()
        .filter_map(|c| match &c.metadata {
            Metadata::Observer(meta) => Some((c, meta)),
            _ => None,
        })
        .collect();

    arch.components(ComponentKind::Model)
        .iter()
        .filter_map(|model| {
            let Metadata::Model(meta) = &model.metadata else {
                return None;
            };
            let attached = attached_observers(model, meta, &observers);
            if attached.is_empty() {
                return None;
            }

            let mut steps = Vec::new();
            for observer in &attached {
                let hooks = observers
                    .iter()
                    .find(|(c, _)| c.fq_name == *observer)
                    .map(|(_, o)| o.hooks.clone())
                    .unwrap_or_default();
                if hooks.is_empty() {
                    steps.push(format!("{} observes", short_name(observer)));
                }
                for hook in hooks {
                    steps.push(format!("{}::{}", short_name(observer), hook));
                }
            }
            for (hook, event) in &meta.dispatches_events {
                steps.push(format!("{} fires {}", hook, event));
            }

            Some(Flow {
                name: format!("{} Lifecycle", model.short_name),
                trigger: format!("Eloquent events on {}", model.fq_name),
                description: format!("Observer callbacks registered for {}", model.short_name),
                steps,
                confidence: Confidence::Heuristic,
            })
        })
        .collect()
}

fn attached_observers(model: &Component, meta: &ModelMeta, observers: &[(&Component, &ObserverMeta)]) -> Vec<String> {
    let mut attached = meta.observers.clone();
    for (component, observer) in observers {
        if observer.model.as_deref() == Some(model.fq_name.as_str()) && !attached.contains(&component.fq_name) {
            attached.push(component.fq_name.clone());
        }
    }
    attached
}

/// Names a component collaborates with, re-bucketed by namespace marker
pub fn connected_to(component: &Component, config: &FlowConfig) -> BTreeMap<String, Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    if let Some(flow) = &component.flow {
        names.extend(flow.dependencies.names());
        names.extend(flow.job_names());
        names.extend(flow.events.iter().cloned());
        names.extend(flow.notifications.iter().cloned());
    }
    match &component.metadata {
        Metadata::Model(meta) => names.extend(meta.relations.iter().filter_map(|r| r.related.clone())),
        Metadata::Controller(meta) => names.extend(meta.dependencies.iter().cloned()),
        Metadata::Service(meta) => names.extend(meta.dependencies.iter().cloned()),
        _ => {}
    }

    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in names {
        let Some(bucket) = bucket_for(&name, config) else {
            continue;
        };
        let entries = buckets.entry(bucket.to_string()).or_default();
        if !entries.contains(&name) && name != component.fq_name {
            entries.push(name);
        }
    }
    buckets.retain(|_, v| !v.is_empty());
    buckets
}

fn bucket_for(name: &str, config: &FlowConfig) -> Option<&'static str> {
    let matches = |markers: &[String]| markers.iter().any(|m| name.contains(m.as_str()));
    if matches(&config.model_markers) {
        Some("models")
    } else if matches(&config.service_markers) {
        Some("services")
    } else if name.contains("\\Jobs\\") {
        Some("jobs")
    } else if name.contains("\\Events\\") {
        Some("events")
    } else if name.contains("\\Notifications\\") {
        Some("notifications")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::component::{ArchitectureMetadata, CommandMeta, RouteMeta, ScanResult};
    use crate::analysis::flow::{FlowReport, JobDispatch};

    fn component(kind: ComponentKind, fq_name: &str, metadata: Metadata) -> Component {
        let mut c = Component::degraded(kind, fq_name, String::new(), "");
        c.note = None;
        c.metadata = metadata;
        c
    }

    fn architecture() -> Architecture {
        let mut checkout = component(
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
        checkout.flow = Some(FlowReport {
            jobs: vec![JobDispatch {
                job: "App\\Jobs\\CapturePayment".to_string(),
                is_async: true,
            }],
            ..Default::default()
        });

        let prune = component(
            ComponentKind::Command,
            "App\\Console\\Commands\\PruneCarts",
            Metadata::Command(CommandMeta {
                name: Some("carts:prune".to_string()),
                ..Default::default()
            }),
        );
        let report = component(
            ComponentKind::Command,
            "App\\Console\\Commands\\SendReport",
            Metadata::Command(CommandMeta::default()),
        );

        let mut order_meta = ModelMeta::default();
        order_meta.observers = vec!["App\\Observers\\OrderObserver".to_string()];
        order_meta
            .dispatches_events
            .insert("created".to_string(), "App\\Events\\OrderCreated".to_string());
        let order = component(ComponentKind::Model, "App\\Models\\Order", Metadata::Model(order_meta));
        let user = component(ComponentKind::Model, "App\\Models\\User", Metadata::Model(ModelMeta::default()));
        let observer = component(
            ComponentKind::Observer,
            "App\\Observers\\OrderObserver",
            Metadata::Observer(ObserverMeta {
                model: Some("App\\Models\\Order".to_string()),
                hooks: vec!["created".to_string(), "deleted".to_string()],
            }),
        );

        Architecture::new(
            ArchitectureMetadata::new("Shop", "/srv/shop"),
            vec![
                ScanResult::new(ComponentKind::Route, vec![checkout]),
                ScanResult::new(ComponentKind::Command, vec![prune, report]),
                ScanResult::new(ComponentKind::Model, vec![order, user]),
                ScanResult::new(ComponentKind::Observer, vec![observer]),
            ],
        )
    }

    #[test]
    fn test_route_keyword_flow() {
        let flows = synthesize_flows(&architecture(), &NarrativeConfig::default());
        let checkout = flows.iter().find(|f| f.name == "Checkout").unwrap();
        assert_eq!(checkout.trigger, "route: POST checkout");
        assert_eq!(
            checkout.steps,
            vec![
                "POST checkout -> App\\Http\\Controllers\\CheckoutController@store",
                "dispatch App\\Jobs\\CapturePayment (queued)",
            ]
        );
        assert!(!flows.iter().any(|f| f.name == "User Registration"));
    }

    #[test]
    fn test_maintenance_flow() {
        let flows = synthesize_flows(&architecture(), &NarrativeConfig::default());
        let maintenance = flows.iter().find(|f| f.name == "Scheduled Maintenance").unwrap();
        assert_eq!(maintenance.steps, vec!["artisan carts:prune (PruneCarts)"]);
    }

    #[test]
    fn test_model_lifecycle_flow() {
        let flows = synthesize_flows(&architecture(), &NarrativeConfig::default());
        let lifecycle: Vec<&Flow> = flows.iter().filter(|f| f.name.ends_with("Lifecycle")).collect();
        assert_eq!(lifecycle.len(), 1);
        assert_eq!(lifecycle[0].name, "Order Lifecycle");
        assert_eq!(
            lifecycle[0].steps,
            vec![
                "OrderObserver::created",
                "OrderObserver::deleted",
                "created fires App\\Events\\OrderCreated",
            ]
        );
    }

    #[test]
    fn test_empty_architecture_has_no_flows() {
        let arch = Architecture::new(ArchitectureMetadata::new("Empty", "/"), Vec::new());
        assert!(synthesize_flows(&arch, &NarrativeConfig::default()).is_empty());
    }

    #[test]
    fn test_connected_to() {
        let mut controller = component(
            ComponentKind::Controller,
            "App\\Http\\Controllers\\OrderController",
            Metadata::Controller(crate::analysis::component::ControllerMeta {
                dependencies: vec!["App\\Services\\PaymentService".to_string()],
                ..Default::default()
            }),
        );
        let mut flow = FlowReport::default();
        flow.dependencies.models.push("App\\Models\\Order".to_string());
        flow.dependencies.other.push("App\\Support\\Money".to_string());
        flow.events.push("App\\Events\\OrderPlaced".to_string());
        controller.flow = Some(flow);

        let connected = connected_to(&controller, &FlowConfig::default());
        assert_eq!(connected["models"], vec!["App\\Models\\Order"]);
        assert_eq!(connected["services"], vec!["App\\Services\\PaymentService"]);
        assert_eq!(connected["events"], vec!["App\\Events\\OrderPlaced"]);
        assert!(!connected.contains_key("jobs"));
    }
}
