// Kind-specific fields shared by the human-readable exporters

use crate::analysis::{Component, Metadata};
use crate::parser::short_name;
use serde::Serialize;

/// One labelled value shown under a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detail {
    pub label: &'static str,
    pub value: String,
}

fn push(rows: &mut Vec<Detail>, label: &'static str, value: impl Into<String>) {
    let value = value.into();
    if !value.is_empty() {
        rows.push(Detail { label, value });
    }
}

fn list(items: &[String]) -> String {
    items.join(", ")
}

fn short_list(items: &[String]) -> String {
    items.iter().map(|i| short_name(i)).collect::<Vec<_>>().join(", ")
}

fn mode(queued: bool) -> &'static str {
    if queued {
        "queued"
    } else {
        "sync"
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Kind-specific rows; empty values are left out
pub fn detail_rows(component: &Component) -> Vec<Detail> {
    let mut rows = Vec::new();
    match &component.metadata {
        Metadata::Route(meta) => {
            push(&mut rows, "URI", format!("/{}", meta.uri.trim_start_matches('/')));
            push(&mut rows, "Methods", meta.methods.join("|"));
            push(&mut rows, "Handler", meta.handler());
            push(&mut rows, "Name", meta.name.clone().unwrap_or_default());
            push(&mut rows, "Middleware", list(&meta.middleware));
            push(&mut rows, "Category", meta.category.as_str());
        }
        Metadata::Model(meta) => {
            push(&mut rows, "Table", meta.table.as_str());
            push(&mut rows, "Primary key", meta.primary_key.as_str());
            push(&mut rows, "Fillable", list(&meta.fillable));
            push(&mut rows, "Guarded", list(&meta.guarded));
            let relations: Vec<String> = meta
                .relations
                .iter()
                .map(|r| match &r.related {
                    Some(related) => format!("{} ({} {})", r.name, r.relation_type, short_name(related)),
                    None => format!("{} ({})", r.name, r.relation_type),
                })
                .collect();
            push(&mut rows, "Relations", list(&relations));
            push(&mut rows, "Scopes", list(&meta.scopes));
            push(&mut rows, "Observers", short_list(&meta.observers));
            if meta.soft_deletes {
                push(&mut rows, "Soft deletes", "yes");
            }
        }
        Metadata::Controller(meta) => {
            push(&mut rows, "Actions", list(&meta.actions));
            push(&mut rows, "Middleware", list(&meta.middleware));
            if meta.resourceful {
                push(&mut rows, "Resourceful", "yes");
            }
            if meta.invokable {
                push(&mut rows, "Invokable", "yes");
            }
            push(&mut rows, "Dependencies", short_list(&meta.dependencies));
        }
        Metadata::Command(meta) => {
            push(&mut rows, "Command", meta.name.clone().unwrap_or_default());
            push(&mut rows, "Description", meta.description.clone().unwrap_or_default());
            push(&mut rows, "Arguments", list(&meta.arguments));
            push(&mut rows, "Options", list(&meta.options));
        }
        Metadata::Job(meta) => {
            push(&mut rows, "Mode", mode(meta.queueable));
            push(&mut rows, "Queue", meta.queue_config.queue.clone().unwrap_or_default());
            push(&mut rows, "Connection", meta.queue_config.connection.clone().unwrap_or_default());
            push(&mut rows, "Tries", meta.queue_config.tries.clone().unwrap_or_default());
            if meta.unique {
                push(&mut rows, "Unique", "yes");
            }
            push(&mut rows, "Constructor", list(&meta.constructor_params));
        }
        Metadata::Event(meta) => {
            push(&mut rows, "Broadcast", yes_no(meta.broadcast));
            push(&mut rows, "Channels", list(&meta.channels));
            push(&mut rows, "Payload", list(&meta.payload));
            push(&mut rows, "Listeners", short_list(&meta.listeners));
        }
        Metadata::Listener(meta) => {
            push(&mut rows, "Events", short_list(&meta.events));
            push(&mut rows, "Mode", mode(meta.queued));
            if meta.subscriber {
                push(&mut rows, "Subscriber", "yes");
            }
        }
        Metadata::Observer(meta) => {
            push(&mut rows, "Model", meta.model.clone().unwrap_or_default());
            push(&mut rows, "Hooks", list(&meta.hooks));
        }
        Metadata::Policy(meta) => {
            push(&mut rows, "Model", meta.model.clone().unwrap_or_default());
            push(&mut rows, "Abilities", list(&meta.abilities));
            if meta.has_before {
                push(&mut rows, "Before hook", "yes");
            }
        }
        Metadata::Rule(meta) => {
            push(&mut rows, "Contract", meta.contract.as_deref().map(short_name).unwrap_or_default());
            push(&mut rows, "Message", meta.message.clone().unwrap_or_default());
        }
        Metadata::Middleware(meta) => {
            push(&mut rows, "Aliases", list(&meta.aliases));
            push(&mut rows, "Parameters", list(&meta.parameters));
            if meta.terminable {
                push(&mut rows, "Terminable", "yes");
            }
        }
        Metadata::Request(meta) => {
            let rules: Vec<String> = meta.rules.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            push(&mut rows, "Rules", rules.join("; "));
            push(&mut rows, "Authorizes", yes_no(meta.authorizes));
        }
        Metadata::Resource(meta) => {
            push(&mut rows, "Attributes", list(&meta.attributes));
            if meta.collection {
                push(&mut rows, "Collection", "yes");
            }
            push(&mut rows, "Collects", meta.collects.clone().unwrap_or_default());
        }
        Metadata::Notification(meta) => {
            push(&mut rows, "Channels", list(&meta.channels));
            push(&mut rows, "Mode", mode(meta.queued));
        }
        Metadata::Service(meta) => {
            push(&mut rows, "Methods", list(&meta.methods));
            push(&mut rows, "Dependencies", short_list(&meta.dependencies));
        }
        Metadata::Action(meta) => {
            push(&mut rows, "Entry point", meta.entry_point.clone().unwrap_or_default());
            push(&mut rows, "Dependencies", short_list(&meta.dependencies));
        }
        Metadata::Degraded => {
            push(&mut rows, "Note", component.note.clone().unwrap_or_default());
        }
    }
    rows
}

/// One-line description used in listings
pub fn summary(component: &Component) -> String {
    match &component.metadata {
        Metadata::Route(meta) => meta.handler(),
        Metadata::Model(meta) => format!("table {}, {} relations", meta.table, meta.relations.len()),
        Metadata::Controller(meta) => format!("{} actions", meta.actions.len()),
        Metadata::Command(meta) => meta.name.clone().unwrap_or_default(),
        Metadata::Job(meta) => mode(meta.queueable).to_string(),
        Metadata::Event(meta) => format!("{} listeners", meta.listeners.len()),
        Metadata::Listener(meta) => short_list(&meta.events),
        Metadata::Observer(meta) => meta.model.as_deref().map(short_name).unwrap_or_default().to_string(),
        Metadata::Policy(meta) => meta.model.as_deref().map(short_name).unwrap_or_default().to_string(),
        Metadata::Rule(meta) => meta.message.clone().unwrap_or_default(),
        Metadata::Middleware(meta) => list(&meta.aliases),
        Metadata::Request(meta) => format!("{} rules", meta.rules.len()),
        Metadata::Resource(meta) => format!("{} attributes", meta.attributes.len()),
        Metadata::Notification(meta) => list(&meta.channels),
        Metadata::Service(meta) => format!("{} methods", meta.methods.len()),
        Metadata::Action(meta) => meta.entry_point.clone().unwrap_or_default(),
        Metadata::Degraded => component.note.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ComponentKind, JobMeta, ModelMeta, QueueConfig, Relation, RouteMeta};

    fn component(kind: ComponentKind, fq_name: &str, metadata: Metadata) -> Component {
        let mut c = Component::degraded(kind, fq_name, String::new(), "");
        c.note = None;
        c.metadata = metadata;
        c
    }

    fn value<'a>(rows: &'a [Detail], label: &str) -> Option<&'a str> {
        rows.iter().find(|r| r.label == label).map(|r| r.value.as_str())
    }

    #[test]
    fn test_model_rows() {
        let meta = ModelMeta {
            table: "posts".to_string(),
            primary_key: "id".to_string(),
            fillable: vec!["title".to_string(), "body".to_string()],
            relations: vec![Relation {
                name: "author".to_string(),
                relation_type: "BelongsTo".to_string(),
                related: Some("App\\Models\\Author".to_string()),
            }],
            ..Default::default()
        };
        let rows = detail_rows(&component(ComponentKind::Model, "App\\Models\\Post", Metadata::Model(meta)));
        assert_eq!(value(&rows, "Table"), Some("posts"));
        assert_eq!(value(&rows, "Fillable"), Some("title, body"));
        assert_eq!(value(&rows, "Relations"), Some("author (BelongsTo Author)"));
        assert_eq!(value(&rows, "Guarded"), None);
    }

    #[test]
    fn test_route_rows() {
        let meta = RouteMeta {
            uri: "api/users".to_string(),
            methods: vec!["GET".to_string(), "HEAD".to_string()],
            controller: Some("App\\Http\\Controllers\\UserController".to_string()),
            action: Some("index".to_string()),
            middleware: vec!["api".to_string(), "auth:sanctum".to_string()],
            ..Default::default()
        };
        let rows = detail_rows(&component(ComponentKind::Route, "GET|HEAD api/users", Metadata::Route(meta)));
        assert_eq!(value(&rows, "URI"), Some("/api/users"));
        assert_eq!(value(&rows, "Methods"), Some("GET|HEAD"));
        assert_eq!(value(&rows, "Handler"), Some("App\\Http\\Controllers\\UserController@index"));
        assert_eq!(value(&rows, "Middleware"), Some("api, auth:sanctum"));
    }

    #[test]
    fn test_job_rows() {
        let meta = JobMeta {
            queueable: true,
            queue_config: QueueConfig {
                queue: Some("emails".to_string()),
                connection: Some("redis".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let job = component(ComponentKind::Job, "App\\Jobs\\SendMail", Metadata::Job(meta));
        let rows = detail_rows(&job);
        assert_eq!(value(&rows, "Mode"), Some("queued"));
        assert_eq!(value(&rows, "Queue"), Some("emails"));
        assert_eq!(value(&rows, "Connection"), Some("redis"));
        assert_eq!(summary(&job), "queued");
    }

    #[test]
    fn test_degraded_rows_show_note() {
        let c = Component::degraded(ComponentKind::Model, "App\\Models\\Broken", String::new(), "unreadable");
        assert_eq!(value(&detail_rows(&c), "Note"), Some("unreadable"));
    }
}
