use crate::analysis::component::{ComponentKind, JobMeta, Metadata, NotificationMeta, QueueConfig};
use crate::analysis::discovery::{KindStrategy, ScanContext};
use crate::analysis::introspect::returned_array;
use crate::error::Result;
use crate::parser::lexer::unquote;
use crate::parser::literal::parse_array;
use crate::parser::{short_name, PhpClass};

const NOTIFICATION_BASE: &str = "Illuminate\\Notifications\\Notification";

/// Queued and synchronous jobs
#[derive(Debug, Default, Clone, Copy)]
pub struct JobStrategy;

impl KindStrategy for JobStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Job
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete()
            && (class.has_method("handle")
                || ctx.index.uses_trait(class, "Dispatchable")
                || ctx.index.implements(class, "ShouldQueue"))
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        let attributes = ctx.attributes.describe(class)?;
        let scalar = |name: &str| {
            class
                .property(name)
                .and_then(|p| p.default.as_deref())
                .map(|raw| unquote(raw).unwrap_or_else(|| raw.trim().to_string()))
        };

        let queue_config = QueueConfig {
            queue: attributes.queue,
            connection: attributes.connection,
            tries: scalar("tries"),
            timeout: scalar("timeout"),
            backoff: scalar("backoff"),
        };

        Ok(Metadata::Job(JobMeta {
            queueable: ctx.index.implements(class, "ShouldQueue"),
            unique: ctx.index.implements(class, "ShouldBeUnique"),
            queue_config,
            constructor_params: class
                .constructor()
                .map(|c| c.parameters.iter().map(|p| p.display()).collect())
                .unwrap_or_default(),
        }))
    }

    fn analyzes_flow(&self) -> bool {
        true
    }
}

/// Notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NotificationStrategy;

impl KindStrategy for NotificationStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Notification
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && ctx.index.extends_any(class, &[NOTIFICATION_BASE])
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        // via() returns channel names or channel classes
        let channels = class
            .method("via")
            .and_then(|m| returned_array(m.body_text()))
            .and_then(|raw| parse_array(&raw))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                entry
                    .string_value()
                    .or_else(|| entry.class_value().map(|c| short_name(&c).to_string()))
            })
            .collect();

        let formats = class
            .public_methods()
            .filter_map(|m| m.name.strip_prefix("to"))
            .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
            .map(|rest| rest.to_ascii_lowercase())
            .collect();

        Ok(Metadata::Notification(NotificationMeta {
            channels,
            queued: ctx.index.implements(class, "ShouldQueue"),
            formats,
        }))
    }
}
