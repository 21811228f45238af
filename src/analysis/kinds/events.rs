use super::{conventional_model, method_names};
use crate::analysis::component::{ComponentKind, EventMeta, ListenerMeta, Metadata, ObserverMeta};
use crate::analysis::discovery::{KindStrategy, ScanContext};
use crate::analysis::LIFECYCLE_HOOKS;
use crate::error::Result;
use crate::parser::{PhpClass, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;

static CHANNEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"new\s+\\?(?:[\w\\]*\\)?(PrivateChannel|PresenceChannel|Channel)\s*\(\s*['"]([^'"]+)['"]\s*\)"#)
        .expect("valid channel regex")
});

/// Events: every concrete class in the events directories
#[derive(Debug, Default, Clone, Copy)]
pub struct EventStrategy;

impl KindStrategy for EventStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Event
    }

    fn qualifies(&self, class: &PhpClass, _ctx: &ScanContext<'_>) -> bool {
        class.is_concrete()
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        let broadcast = ctx.index.implements(class, "ShouldBroadcast")
            || ctx.index.implements(class, "ShouldBroadcastNow");

        let channels = class
            .method("broadcastOn")
            .map(|m| {
                CHANNEL_RE
                    .captures_iter(m.body_text())
                    .map(|cap| match &cap[1] {
                        "PrivateChannel" => format!("private-{}", &cap[2]),
                        "PresenceChannel" => format!("presence-{}", &cap[2]),
                        _ => cap[2].to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut payload: Vec<String> = class
            .properties
            .iter()
            .filter(|p| p.visibility == Visibility::Public && !p.is_static)
            .map(|p| p.name.clone())
            .collect();
        if let Some(constructor) = class.constructor() {
            for param in &constructor.parameters {
                if param.promoted == Some(Visibility::Public) && !payload.contains(&param.name) {
                    payload.push(param.name.clone());
                }
            }
        }

        Ok(Metadata::Event(EventMeta {
            broadcast,
            channels,
            payload,
            listeners: ctx.providers.listeners_of(&class.fq_name()).to_vec(),
        }))
    }
}

/// Event listeners, by naming rule
#[derive(Debug, Default, Clone, Copy)]
pub struct ListenerStrategy;

impl KindStrategy for ListenerStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Listener
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && ctx.config.heuristics.listener.matches(&class.name, method_names(class))
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        let mut events = Vec::new();
        if let Some(event) = class
            .method("handle")
            .and_then(|m| m.parameters.first())
            .and_then(|p| p.bare_type())
        {
            for part in event.split('|').map(str::trim).filter(|p| !p.is_empty()) {
                events.push(class.resolve(part));
            }
        }
        for event in ctx.providers.events_for_listener(&class.fq_name()) {
            if !events.contains(&event) {
                events.push(event);
            }
        }

        Ok(Metadata::Listener(ListenerMeta {
            events,
            queued: ctx.index.implements(class, "ShouldQueue"),
            subscriber: class.has_method("subscribe"),
        }))
    }

    fn analyzes_flow(&self) -> bool {
        true
    }
}

/// Model observers, by naming rule
#[derive(Debug, Default, Clone, Copy)]
pub struct ObserverStrategy;

impl KindStrategy for ObserverStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Observer
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && ctx.config.heuristics.observer.matches(&class.name, method_names(class))
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        let model = ctx
            .providers
            .models_for_observer(&class.fq_name())
            .into_iter()
            .next()
            .or_else(|| conventional_model(class, "Observer", &ctx.config.scan.models_namespace));

        let hooks = class
            .methods
            .iter()
            .map(|m| m.name.as_str())
            .filter(|name| LIFECYCLE_HOOKS.contains(name))
            .map(str::to_string)
            .collect();

        Ok(Metadata::Observer(ObserverMeta { model, hooks }))
    }

    fn analyzes_flow(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::kinds::testing::{find, App};

    fn app() -> App {
        App::new()
            .file(
                "app/Events/OrderPlaced.php",
                r#"<?php
namespace App\Events;

use App\Models\Order;
use Illuminate\Broadcasting\PrivateChannel;
use Illuminate\Contracts\Broadcasting\ShouldBroadcast;

class OrderPlaced implements ShouldBroadcast
{
    public string $source = 'web';

    public function __construct(public Order $order, private int $attempt = 0) {}

    public function broadcastOn(): array
    {
        return [new PrivateChannel('orders.'.$this->order->id), new PrivateChannel('admin')];
    }
}
"#,
            )
            .file(
                "app/Events/Contracts/Auditable.php",
                "<?php\nnamespace App\\Events\\Contracts;\ninterface Auditable {}\n",
            )
            .file(
                "app/Listeners/SendOrderConfirmation.php",
                r#"<?php
namespace App\Listeners;

use App\Events\OrderPlaced;
use App\Mail\OrderConfirmation;
use Illuminate\Contracts\Queue\ShouldQueue;
use Illuminate\Support\Facades\Mail;

class SendOrderConfirmation implements ShouldQueue
{
    public function handle(OrderPlaced $event): void
    {
        Mail::to($event->order->user)->send(new OrderConfirmation($event->order));
    }
}
"#,
            )
            .file(
                "app/Listeners/AuditTrail.php",
                "<?php\nnamespace App\\Listeners;\nclass AuditTrail { public function handle($event) {} }\n",
            )
            .file(
                "app/Listeners/ListenerHelper.php",
                "<?php\nnamespace App\\Listeners;\nclass ListenerHelper { public function format() {} }\n",
            )
            .file(
                "app/Observers/OrderObserver.php",
                r#"<?php
namespace App\Observers;

use App\Models\Order;

class OrderObserver
{
    public function created(Order $order): void {}
    public function deleting(Order $order): void {}
    public function helper(): void {}
}
"#,
            )
            .file(
                "app/Observers/AuditObserver.php",
                "<?php\nnamespace App\\Observers;\nclass AuditObserver { public function saved($model) {} }\n",
            )
            .file(
                "app/Providers/EventServiceProvider.php",
                r#"<?php
namespace App\Providers;

use App\Events\OrderPlaced;
use App\Listeners\AuditTrail;
use App\Listeners\SendOrderConfirmation;
use App\Models\Invoice;
use App\Observers\AuditObserver;

class EventServiceProvider
{
    protected $listen = [
        OrderPlaced::class => [SendOrderConfirmation::class, AuditTrail::class],
    ];

    public function boot(): void
    {
        Invoice::observe(AuditObserver::class);
    }
}
"#,
            )
    }

    #[test]
    fn test_event_metadata() {
        let app = app();
        let result = app.scan(EventStrategy);
        assert_eq!(result.count, 1);
        match &find(&result, "OrderPlaced").metadata {
            Metadata::Event(meta) => {
                assert!(meta.broadcast);
                assert_eq!(meta.channels, vec!["private-admin"]);
                assert_eq!(meta.payload, vec!["source", "order"]);
                assert_eq!(
                    meta.listeners,
                    vec!["App\\Listeners\\SendOrderConfirmation", "App\\Listeners\\AuditTrail"]
                );
            }
            other => panic!("unexpected metadata {:?}", other),
        }
    }

    #[test]
    fn test_listener_metadata() {
        let app = app();
        let result = app.scan(ListenerStrategy);
        let names: Vec<&str> = result.data.iter().map(|c| c.short_name.as_str()).collect();
        assert_eq!(names, vec!["AuditTrail", "SendOrderConfirmation"]);

        match &find(&result, "AuditTrail").metadata {
            Metadata::Listener(meta) => assert_eq!(meta.events, vec!["App\\Events\\OrderPlaced"]),
            other => panic!("unexpected metadata {:?}", other),
        }

        let listener = find(&result, "SendOrderConfirmation");
        match &listener.metadata {
            Metadata::Listener(meta) => {
                assert_eq!(meta.events, vec!["App\\Events\\OrderPlaced"]);
                assert!(meta.queued);
                assert!(!meta.subscriber);
            }
            other => panic!("unexpected metadata {:?}", other),
        }
        let flow = listener.flow.as_ref().unwrap();
        assert!(flow.dependencies.facades.iter().any(|f| f.name == "Mail"));
    }

    #[test]
    fn test_observer_metadata() {
        let app = app();
        let result = app.scan(ObserverStrategy);
        assert_eq!(result.count, 2);

        match &find(&result, "OrderObserver").metadata {
            Metadata::Observer(meta) => {
                assert_eq!(meta.model.as_deref(), Some("App\\Models\\Order"));
                assert_eq!(meta.hooks, vec!["created", "deleting"]);
            }
            other => panic!("unexpected metadata {:?}", other),
        }
        match &find(&result, "AuditObserver").metadata {
            Metadata::Observer(meta) => {
                assert_eq!(meta.model.as_deref(), Some("App\\Models\\Invoice"));
                assert_eq!(meta.hooks, vec!["saved"]);
            }
            other => panic!("unexpected metadata {:?}", other),
        }
    }
}
