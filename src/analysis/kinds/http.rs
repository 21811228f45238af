use super::dependencies;
use crate::analysis::component::{
    ComponentKind, ControllerMeta, Metadata, MiddlewareMeta, RequestMeta, ResourceMeta,
};
use crate::analysis::discovery::{KindStrategy, ScanContext};
use crate::analysis::introspect::returned_array;
use crate::parser::lexer::{matching_delimiter, split_top_level, unquote};
use crate::parser::literal::{class_ref, keys, parse_array, string_list, string_map};
use crate::error::Result;
use crate::parser::PhpClass;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

const BASE_CONTROLLER: &str = "Illuminate\\Routing\\Controller";
const FORM_REQUEST: &str = "Illuminate\\Foundation\\Http\\FormRequest";
const JSON_RESOURCE: &str = "Illuminate\\Http\\Resources\\Json\\JsonResource";
const RESOURCE_COLLECTION: &str = "Illuminate\\Http\\Resources\\Json\\ResourceCollection";

const RESOURCE_ACTIONS: [&str; 7] = ["index", "create", "store", "show", "edit", "update", "destroy"];

static MIDDLEWARE_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$this\s*->\s*middleware\s*\(").expect("valid middleware call regex")
});

static MIDDLEWARE_NEW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"new\s+\\?(?:[\w\\]*\\)?Middleware\s*\(\s*(['"][^'"]+['"])"#)
        .expect("valid middleware object regex")
});

/// HTTP controllers
#[derive(Debug, Default, Clone, Copy)]
pub struct ControllerStrategy;

impl KindStrategy for ControllerStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Controller
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete()
            && (class.name.ends_with("Controller") || ctx.index.extends_any(class, &[BASE_CONTROLLER]))
    }

    fn extract(&self, class: &PhpClass, _source: &str, _ctx: &ScanContext<'_>) -> Result<Metadata> {
        let actions: Vec<String> = class
            .public_methods()
            .filter(|m| !m.is_static && m.name != "middleware")
            .map(|m| m.name.clone())
            .collect();
        let resourceful = actions
            .iter()
            .filter(|a| RESOURCE_ACTIONS.contains(&a.as_str()))
            .count()
            >= 3;

        Ok(Metadata::Controller(ControllerMeta {
            resourceful,
            invokable: class.has_method("__invoke"),
            middleware: controller_middleware(class),
            dependencies: dependencies(class),
            actions,
        }))
    }

    fn analyzes_flow(&self) -> bool {
        true
    }

    fn include_protected(&self) -> bool {
        true
    }
}

/// `$this->middleware(...)` in the constructor and the static
/// `middleware()` declaration
fn controller_middleware(class: &PhpClass) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !out.contains(&name) {
            out.push(name);
        }
    };

    if let Some(body) = class.constructor().and_then(|c| c.body.as_deref()) {
        for m in MIDDLEWARE_CALL_RE.find_iter(body) {
            let Some(close) = matching_delimiter(body, m.end() - 1) else {
                continue;
            };
            let args = body[m.end()..close].trim();
            let names = if args.starts_with('[') {
                string_list(args)
            } else {
                split_top_level(args, b',').into_iter().filter_map(unquote).collect()
            };
            names.into_iter().for_each(&mut push);
        }
    }

    if let Some(declared) = class
        .method("middleware")
        .filter(|m| m.is_static)
        .and_then(|m| returned_array(m.body_text()))
    {
        for entry in parse_array(&declared).unwrap_or_default() {
            if let Some(name) = entry.string_value() {
                push(name);
            } else if let Some(cap) = MIDDLEWARE_NEW_RE.captures(&entry.value) {
                if let Some(name) = unquote(&cap[1]) {
                    push(name);
                }
            }
        }
    }

    out
}

/// Request middleware: any concrete class with a `handle` method
#[derive(Debug, Default, Clone, Copy)]
pub struct MiddlewareStrategy;

impl KindStrategy for MiddlewareStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Middleware
    }

    fn qualifies(&self, class: &PhpClass, _ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && class.has_method("handle")
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        // $request and $next come first
        let parameters = class
            .method("handle")
            .map(|m| m.parameters.iter().skip(2).map(|p| p.name.clone()).collect())
            .unwrap_or_default();

        Ok(Metadata::Middleware(MiddlewareMeta {
            aliases: ctx.providers.aliases_of(&class.fq_name()).to_vec(),
            parameters,
            terminable: class.has_method("terminate"),
        }))
    }

    fn analyzes_flow(&self) -> bool {
        true
    }
}

/// Form requests
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestStrategy;

impl KindStrategy for RequestStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Request
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && ctx.index.extends_any(class, &[FORM_REQUEST])
    }

    fn extract(&self, class: &PhpClass, _source: &str, _ctx: &ScanContext<'_>) -> Result<Metadata> {
        let returned = |name: &str| class.method(name).and_then(|m| returned_array(m.body_text()));

        let rules = returned("rules")
            .and_then(|raw| parse_array(&raw))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let field = entry.key.clone()?;
                Some((field, rule_text(&entry.value)))
            })
            .collect();

        let messages: BTreeMap<String, String> = returned("messages")
            .map(|raw| string_map(&raw).into_iter().collect())
            .unwrap_or_default();

        Ok(Metadata::Request(RequestMeta {
            rules,
            authorizes: class.has_method("authorize"),
            messages,
        }))
    }
}

/// `'required|email'` stays as is; `['required', new Uppercase]` becomes
/// `required|new Uppercase`
fn rule_text(value: &str) -> String {
    if let Some(text) = unquote(value) {
        return text;
    }
    match parse_array(value) {
        Some(entries) => entries
            .iter()
            .map(|e| e.string_value().unwrap_or_else(|| e.value.trim().to_string()))
            .collect::<Vec<_>>()
            .join("|"),
        None => value.trim().to_string(),
    }
}

/// API resources and resource collections
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceStrategy;

impl KindStrategy for ResourceStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Resource
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && ctx.index.extends_any(class, &[JSON_RESOURCE, RESOURCE_COLLECTION])
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        let attributes = class
            .method("toArray")
            .and_then(|m| returned_array(m.body_text()))
            .map(|raw| keys(&raw))
            .unwrap_or_default();
        let collects = class
            .property("collects")
            .and_then(|p| p.default.as_deref())
            .and_then(class_ref)
            .map(|c| class.resolve(&c));

        Ok(Metadata::Resource(ResourceMeta {
            collection: ctx.index.extends_any(class, &[RESOURCE_COLLECTION]),
            attributes,
            collects,
        }))
    }
}
