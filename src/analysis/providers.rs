// Wiring declared outside the components themselves
//
// Service providers attach observers to models, listeners to events and
// policies to models. The HTTP kernel (or bootstrap/app.php) names
// middleware aliases. These facts are collected once per scan.

use crate::analysis::discovery::discover_files;
use crate::config::Config;
use crate::parser::lexer::{matching_delimiter, strip_comments};
use crate::parser::literal::{class_ref, class_refs, parse_array};
use crate::parser::{parse_imports, parse_namespace, qualify, PhpParser, UseImport};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

static OBSERVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([\\\w]+)::observe\s*\(").expect("valid observe regex")
});

static EVENT_LISTEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Event::listen\s*\(").expect("valid listen regex")
});

static GATE_POLICY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Gate::policy\s*\(\s*([\\\w]+)::class\s*,\s*([\\\w]+)::class")
        .expect("valid policy regex")
});

static ALIAS_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"->alias\s*\(").expect("valid alias regex"));

/// Declarations gathered from providers and the middleware registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderFacts {
    /// Model -> observers
    pub observers: BTreeMap<String, Vec<String>>,
    /// Event -> listeners
    pub listeners: BTreeMap<String, Vec<String>>,
    /// Model -> policy
    pub policies: BTreeMap<String, String>,
    /// Middleware class -> aliases
    pub middleware_aliases: BTreeMap<String, Vec<String>>,
}

impl ProviderFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the providers directory, the HTTP kernel and bootstrap/app.php
    pub fn collect(root: &Path, config: &Config, exclude: &[glob::Pattern]) -> Self {
        let mut facts = Self::new();

        let providers = root.join(&config.scan.providers_path);
        for path in discover_files(root, &providers, true, exclude) {
            match std::fs::read_to_string(&path) {
                Ok(source) => facts.read_provider(&source),
                Err(e) => debug!(path = %path.display(), error = %e, "provider unreadable"),
            }
        }

        for rel in ["app/Http/Kernel.php", "bootstrap/app.php"] {
            if let Ok(source) = std::fs::read_to_string(root.join(rel)) {
                facts.read_middleware_aliases(&source);
            }
        }

        debug!(
            observed_models = facts.observers.len(),
            events = facts.listeners.len(),
            policies = facts.policies.len(),
            "provider facts collected"
        );
        facts
    }

    /// Observers, listeners and policies declared in one provider file
    pub fn read_provider(&mut self, source: &str) {
        let clean = strip_comments(source);
        let namespace = parse_namespace(source);
        let imports = parse_imports(source);
        let q = |raw: &str| qualify(raw, namespace.as_deref(), &imports);

        for cap in OBSERVE_RE.captures_iter(&clean) {
            let Some(whole) = cap.get(0) else { continue };
            let model = q(&cap[1]);
            if let Some(args) = call_arguments(&clean, whole.end() - 1) {
                for observer in class_refs(args) {
                    push_unique(self.observers.entry(model.clone()).or_default(), q(&observer));
                }
            }
        }

        for cap in EVENT_LISTEN_RE.find_iter(&clean) {
            let Some(args) = call_arguments(&clean, cap.end() - 1) else {
                continue;
            };
            let mut parts = crate::parser::lexer::split_top_level(args, b',').into_iter();
            let (Some(event), Some(listener)) = (parts.next(), parts.next()) else {
                continue;
            };
            let Some(event) = class_ref(event) else { continue };
            for listener in class_refs(listener).into_iter().take(1) {
                push_unique(self.listeners.entry(q(&event)).or_default(), q(&listener));
            }
        }

        for cap in GATE_POLICY_RE.captures_iter(&clean) {
            self.policies.insert(q(&cap[1]), q(&cap[2]));
        }

        if let Ok(class) = PhpParser::new().parse_source(source, Default::default()) {
            if let Some(listen) = class.property("listen").and_then(|p| p.default.as_deref()) {
                self.read_listen_map(listen, &q);
            }
            if let Some(policies) = class.property("policies").and_then(|p| p.default.as_deref()) {
                for entry in parse_array(policies).unwrap_or_default() {
                    let model = entry.key.as_deref().and_then(class_ref);
                    if let (Some(model), Some(policy)) = (model, entry.class_value()) {
                        self.policies.insert(q(&model), q(&policy));
                    }
                }
            }
        }
    }

    fn read_listen_map(&mut self, raw: &str, q: &dyn Fn(&str) -> String) {
        for entry in parse_array(raw).unwrap_or_default() {
            let Some(event) = entry.key.as_deref().and_then(class_ref) else {
                continue;
            };
            let listeners = self.listeners.entry(q(&event)).or_default();
            for listener in class_refs(&entry.value) {
                push_unique(listeners, q(&listener));
            }
        }
    }

    /// `$middlewareAliases` / `$routeMiddleware` or `->alias([...])`
    pub fn read_middleware_aliases(&mut self, source: &str) {
        let clean = strip_comments(source);
        let namespace = parse_namespace(source);
        let imports = parse_imports(source);

        let mut arrays = Vec::new();
        if let Ok(class) = PhpParser::new().parse_source(source, Default::default()) {
            for name in ["middlewareAliases", "routeMiddleware"] {
                if let Some(raw) = class.property(name).and_then(|p| p.default.clone()) {
                    arrays.push(raw);
                }
            }
        }
        for m in ALIAS_CALL_RE.find_iter(&clean) {
            if let Some(args) = call_arguments(&clean, m.end() - 1) {
                arrays.push(args.to_string());
            }
        }

        for raw in arrays {
            self.add_aliases(&raw, namespace.as_deref(), &imports);
        }
    }

    fn add_aliases(&mut self, raw: &str, namespace: Option<&str>, imports: &[UseImport]) {
        for entry in parse_array(raw).unwrap_or_default() {
            if let (Some(alias), Some(class)) = (entry.key.clone(), entry.class_value()) {
                let class = qualify(&class, namespace, imports);
                push_unique(self.middleware_aliases.entry(class).or_default(), alias);
            }
        }
    }

    pub fn observers_of(&self, model: &str) -> &[String] {
        self.observers.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn listeners_of(&self, event: &str) -> &[String] {
        self.listeners.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Events a listener is registered for
    pub fn events_for_listener(&self, listener: &str) -> Vec<String> {
        self.listeners
            .iter()
            .filter(|(_, listeners)| listeners.iter().any(|l| l == listener))
            .map(|(event, _)| event.clone())
            .collect()
    }

    /// Models an observer is attached to
    pub fn models_for_observer(&self, observer: &str) -> Vec<String> {
        self.observers
            .iter()
            .filter(|(_, observers)| observers.iter().any(|o| o == observer))
            .map(|(model, _)| model.clone())
            .collect()
    }

    /// Model governed by a policy
    pub fn model_for_policy(&self, policy: &str) -> Option<String> {
        self.policies
            .iter()
            .find(|(_, p)| p.as_str() == policy)
            .map(|(model, _)| model.clone())
    }

    pub fn aliases_of(&self, middleware: &str) -> &[String] {
        self.middleware_aliases
            .get(middleware)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Text between the parentheses opening at `open`
fn call_arguments(text: &str, open: usize) -> Option<&str> {
    let close = matching_delimiter(text, open)?;
    Some(&text[open + 1..close])
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_PROVIDER: &str = r#"<?php

namespace App\Providers;

use App\Events\OrderPlaced;
use App\Listeners\SendOrderConfirmation;
use App\Models\Order;
use App\Models\User;
use App\Observers\OrderObserver;
use App\Observers\UserObserver;
use App\Policies\OrderPolicy;
use Illuminate\Support\Facades\Event;
use Illuminate\Support\Facades\Gate;

class EventServiceProvider extends ServiceProvider
{
    protected $listen = [
        OrderPlaced::class => [
            SendOrderConfirmation::class,
            \App\Listeners\UpdateInventory::class,
        ],
    ];

    protected $policies = [
        Order::class => OrderPolicy::class,
    ];

    public function boot(): void
    {
        User::observe(UserObserver::class);
        Order::observe([OrderObserver::class]);
        Event::listen(OrderPlaced::class, [\App\Listeners\NotifyWarehouse::class, 'handle']);
        Gate::policy(User::class, \App\Policies\UserPolicy::class);
        // Ghost::observe(GhostObserver::class);
    }
}
"#;

    #[test]
    fn test_observers() {
        let mut facts = ProviderFacts::new();
        facts.read_provider(EVENT_PROVIDER);
        assert_eq!(facts.observers_of("App\\Models\\User"), ["App\\Observers\\UserObserver"]);
        assert_eq!(facts.observers_of("App\\Models\\Order"), ["App\\Observers\\OrderObserver"]);
        assert!(facts.observers_of("App\\Providers\\Ghost").is_empty());
        assert_eq!(
            facts.models_for_observer("App\\Observers\\UserObserver"),
            vec!["App\\Models\\User".to_string()]
        );
    }

    #[test]
    fn test_listeners() {
        let mut facts = ProviderFacts::new();
        facts.read_provider(EVENT_PROVIDER);
        assert_eq!(
            facts.listeners_of("App\\Events\\OrderPlaced"),
            [
                "App\\Listeners\\NotifyWarehouse",
                "App\\Listeners\\SendOrderConfirmation",
                "App\\Listeners\\UpdateInventory",
            ]
        );
        assert_eq!(
            facts.events_for_listener("App\\Listeners\\UpdateInventory"),
            vec!["App\\Events\\OrderPlaced".to_string()]
        );
    }

    #[test]
    fn test_policies() {
        let mut facts = ProviderFacts::new();
        facts.read_provider(EVENT_PROVIDER);
        assert_eq!(
            facts.policies.get("App\\Models\\Order").map(String::as_str),
            Some("App\\Policies\\OrderPolicy")
        );
        assert_eq!(
            facts.model_for_policy("App\\Policies\\UserPolicy").as_deref(),
            Some("App\\Models\\User")
        );
    }

    #[test]
    fn test_kernel_aliases() {
        let mut facts = ProviderFacts::new();
        facts.read_middleware_aliases(
            r#"<?php
namespace App\Http;
class Kernel extends HttpKernel
{
    protected $middlewareAliases = [
        'auth' => \App\Http\Middleware\Authenticate::class,
        'admin' => Middleware\EnsureAdmin::class,
    ];
}
"#,
        );
        assert_eq!(facts.aliases_of("App\\Http\\Middleware\\Authenticate"), ["auth"]);
        assert_eq!(facts.aliases_of("App\\Http\\Middleware\\EnsureAdmin"), ["admin"]);
    }

    #[test]
    fn test_bootstrap_aliases() {
        let mut facts = ProviderFacts::new();
        facts.read_middleware_aliases(
            r#"<?php
use App\Http\Middleware\EnsureSubscribed;
return Application::configure(basePath: dirname(__DIR__))
    ->withMiddleware(function (Middleware $middleware) {
        $middleware->alias([
            'subscribed' => EnsureSubscribed::class,
        ]);
    })->create();
"#,
        );
        assert_eq!(facts.aliases_of("App\\Http\\Middleware\\EnsureSubscribed"), ["subscribed"]);
    }
}
