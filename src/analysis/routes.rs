// Route registry
//
// Routes are not discovered by walking classes; they come from a registry.
// The default registry reads the route files statically: verb routes,
// `match`/`any`, resource expansion and nested groups with their prefix,
// middleware, name and controller attributes.

use crate::analysis::component::{Component, ComponentKind, Metadata, RouteCategory, RouteMeta, ScanResult};
use crate::analysis::discovery::{Mapper, ScanContext, ScanOptions};
use crate::analysis::flow::FlowReport;
use crate::analysis::resolve::singularize;
use crate::config::RouteFileConfig;
use crate::error::{Error, Result};
use crate::parser::lexer::{matching_delimiter, split_top_level, strip_comments, unquote};
use crate::parser::literal::{class_ref, parse_array, string_list};
use crate::parser::{parse_imports, qualify, UseImport};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Methods reported for `Route::any`
pub const ANY_METHODS: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

const VERBS: [&str; 6] = ["get", "post", "put", "patch", "delete", "options"];

/// What a route dispatches to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    Controller { class: String, method: String },
    Closure,
    View(String),
    None,
}

/// One registered route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    /// Normalized: no leading slash, `/` for the root
    pub uri: String,
    /// Uppercase, HEAD excluded
    pub methods: Vec<String>,
    pub name: Option<String>,
    pub middleware: Vec<String>,
    pub action: RouteAction,
}

/// Source of the application's routes
pub trait RouteRegistry {
    fn routes(&self, root: &Path) -> Result<Vec<RouteDefinition>>;
}

/// Reads route files from disk
#[derive(Debug, Clone)]
pub struct RouteFileRegistry {
    files: Vec<RouteFileConfig>,
    controllers_namespace: String,
}

impl RouteFileRegistry {
    pub fn new(files: Vec<RouteFileConfig>, controllers_namespace: &str) -> Self {
        Self {
            files,
            controllers_namespace: controllers_namespace.to_string(),
        }
    }

    /// Parse one route file's contents with the attributes its provider applies
    pub fn parse(&self, source: &str, file: &RouteFileConfig) -> Vec<RouteDefinition> {
        let imports = parse_imports(source);
        let reader = RouteReader {
            imports: &imports,
            controllers_namespace: &self.controllers_namespace,
        };
        let group = GroupAttributes {
            prefix: file.prefix.clone(),
            middleware: file.middleware.clone(),
            ..Default::default()
        };
        let mut routes = Vec::new();
        reader.read_block(&strip_comments(source), &group, &mut routes);
        routes
    }
}

impl RouteRegistry for RouteFileRegistry {
    fn routes(&self, root: &Path) -> Result<Vec<RouteDefinition>> {
        let mut routes = Vec::new();
        for file in &self.files {
            let path = root.join(&file.path);
            if !path.is_file() {
                debug!(path = %path.display(), "route file absent");
                continue;
            }
            let source = std::fs::read_to_string(&path)
                .map_err(|e| Error::routes(format!("{}: {}", path.display(), e)))?;
            routes.extend(self.parse(&source, file));
        }
        Ok(routes)
    }
}

/// Attributes inherited from enclosing groups
#[derive(Debug, Clone, Default)]
struct GroupAttributes {
    prefix: String,
    middleware: Vec<String>,
    name: String,
    controller: Option<String>,
}

impl GroupAttributes {
    fn nest(&self, calls: &[Call<'_>], reader: &RouteReader<'_>) -> Self {
        let mut inner = self.clone();
        for call in calls {
            inner.apply(call.name, call.args, reader);
        }
        inner
    }

    fn apply(&mut self, key: &str, args: &str, reader: &RouteReader<'_>) {
        let first = split_top_level(args, b',').first().map(|a| a.trim()).unwrap_or("");
        match key {
            "prefix" => {
                if let Some(prefix) = unquote(first) {
                    self.prefix = join_uri(&self.prefix, &prefix);
                }
            }
            "middleware" => {
                for m in string_or_list(args) {
                    push_unique(&mut self.middleware, m);
                }
            }
            "name" | "as" => {
                if let Some(name) = unquote(first) {
                    self.name.push_str(&name);
                }
            }
            "controller" => {
                self.controller = class_ref(first)
                    .or_else(|| unquote(first))
                    .map(|c| reader.qualify(&c));
            }
            _ => {}
        }
    }
}

/// One `name(args)` link of a fluent chain
#[derive(Debug, Clone, Copy)]
struct Call<'a> {
    name: &'a str,
    args: &'a str,
}

struct RouteReader<'a> {
    imports: &'a [UseImport],
    controllers_namespace: &'a str,
}

impl<'a> RouteReader<'a> {
    fn qualify(&self, raw: &str) -> String {
        qualify(raw, Some(self.controllers_namespace), self.imports)
    }

    /// Every top-level `Route::...;` statement of a block
    fn read_block(&self, text: &str, group: &GroupAttributes, out: &mut Vec<RouteDefinition>) {
        for statement in split_top_level(text, b';') {
            let statement = statement.trim();
            let Some(start) = statement.find("Route::") else {
                continue;
            };
            let calls = parse_chain(&statement[start + "Route::".len()..]);
            self.read_statement(&calls, group, out);
        }
    }

    fn read_statement(&self, calls: &[Call<'_>], group: &GroupAttributes, out: &mut Vec<RouteDefinition>) {
        let Some(pos) = calls.iter().position(|c| is_terminal(c.name)) else {
            return;
        };
        let (before, rest) = calls.split_at(pos);
        let terminal = rest[0];
        let after = &rest[1..];

        if terminal.name == "group" {
            self.read_group(terminal.args, &group.nest(before, self), out);
            return;
        }

        let scoped = group.nest(before, self);
        let produced = match terminal.name {
            "resource" => self.resource(terminal.args, after, false, &scoped),
            "apiResource" => self.resource(terminal.args, after, true, &scoped),
            _ => self.single(terminal, &scoped).into_iter().collect(),
        };

        for mut route in produced {
            for call in after {
                match call.name {
                    "name" => {
                        if let Some(name) = first_string(call.args) {
                            route.name = Some(format!("{}{}", scoped.name, name));
                        }
                    }
                    "middleware" => {
                        for m in string_or_list(call.args) {
                            push_unique(&mut route.middleware, m);
                        }
                    }
                    _ => {}
                }
            }
            out.push(route);
        }
    }

    /// `group(function () {...})`, `group([...], function () {...})`
    fn read_group(&self, args: &str, group: &GroupAttributes, out: &mut Vec<RouteDefinition>) {
        let mut attributes = group.clone();
        let parts = split_top_level(args, b',');
        if let Some(first) = parts.first() {
            if let Some(entries) = parse_array(first) {
                for entry in entries {
                    let Some(key) = entry.key.as_deref() else { continue };
                    attributes.apply(key, &entry.value, self);
                }
            }
        }

        let Some(open) = args.find('{') else {
            return;
        };
        let Some(close) = matching_delimiter(args, open) else {
            return;
        };
        self.read_block(&args[open + 1..close], &attributes, out);
    }

    /// A verb, `match`, `any` or `view` route
    fn single(&self, call: Call<'_>, group: &GroupAttributes) -> Option<RouteDefinition> {
        let args = split_top_level(call.args, b',');
        let arg = |i: usize| args.get(i).map(|a| a.trim()).unwrap_or("");

        let (methods, uri, action) = match call.name {
            "match" => {
                let methods = string_list(arg(0))
                    .iter()
                    .map(|m| m.to_ascii_uppercase())
                    .filter(|m| m != "HEAD")
                    .collect();
                (methods, unquote(arg(1))?, self.action(&args[2.min(args.len())..], group))
            }
            "any" => (
                ANY_METHODS.iter().map(|m| m.to_string()).collect(),
                unquote(arg(0))?,
                self.action(&args[1.min(args.len())..], group),
            ),
            "view" => (
                vec!["GET".to_string()],
                unquote(arg(0))?,
                RouteAction::View(unquote(arg(1)).unwrap_or_default()),
            ),
            verb => (
                vec![verb.to_ascii_uppercase()],
                unquote(arg(0))?,
                self.action(&args[1.min(args.len())..], group),
            ),
        };

        Some(RouteDefinition {
            uri: join_uri(&group.prefix, &uri),
            methods,
            name: None,
            middleware: group.middleware.clone(),
            action,
        })
    }

    fn action(&self, args: &[&str], group: &GroupAttributes) -> RouteAction {
        let Some(raw) = args.first().map(|a| a.trim()).filter(|a| !a.is_empty()) else {
            return RouteAction::None;
        };

        if raw.starts_with("function") || raw.starts_with("fn") || raw.starts_with("static") {
            return RouteAction::Closure;
        }
        if let Some(entries) = parse_array(raw) {
            let class = entries.first().and_then(|e| e.class_value());
            let method = entries.get(1).and_then(|e| e.string_value());
            return match (class, method) {
                (Some(class), method) => RouteAction::Controller {
                    class: self.qualify(&class),
                    method: method.unwrap_or_else(|| "__invoke".to_string()),
                },
                (None, _) => RouteAction::None,
            };
        }
        if let Some(class) = class_ref(raw) {
            return RouteAction::Controller {
                class: self.qualify(&class),
                method: "__invoke".to_string(),
            };
        }
        if let Some(text) = unquote(raw) {
            if let Some((class, method)) = text.split_once('@') {
                return RouteAction::Controller {
                    class: self.qualify(class),
                    method: method.to_string(),
                };
            }
            if let Some(controller) = &group.controller {
                return RouteAction::Controller {
                    class: controller.clone(),
                    method: text,
                };
            }
        }
        RouteAction::None
    }

    fn resource(
        &self,
        args: &str,
        modifiers: &[Call<'_>],
        api: bool,
        group: &GroupAttributes,
    ) -> Vec<RouteDefinition> {
        let parts = split_top_level(args, b',');
        let Some(name) = parts.first().and_then(|p| unquote(p)) else {
            return Vec::new();
        };
        let Some(controller) = parts.get(1).and_then(|p| class_ref(p)) else {
            return Vec::new();
        };
        let controller = self.qualify(&controller);

        let mut actions: Vec<&str> = RESOURCE_ACTIONS
            .iter()
            .map(|(action, _, _)| *action)
            .filter(|a| !(api && (*a == "create" || *a == "edit")))
            .collect();
        for call in modifiers {
            let listed = string_or_list(call.args);
            match call.name {
                "only" => actions.retain(|a| listed.iter().any(|l| l == a)),
                "except" => actions.retain(|a| !listed.iter().any(|l| l == a)),
                _ => {}
            }
        }

        let base = resource_base(&name);
        let param = singularize(name.rsplit('.').next().unwrap_or(&name)).replace('-', "_");

        RESOURCE_ACTIONS
            .iter()
            .filter(|(action, _, _)| actions.contains(action))
            .map(|(action, methods, suffix)| {
                let uri = suffix.replace("{param}", &format!("{{{}}}", param));
                RouteDefinition {
                    uri: join_uri(&group.prefix, &join_uri(&base, &uri)),
                    methods: methods.iter().map(|m| m.to_string()).collect(),
                    name: Some(format!("{}{}.{}", group.name, name, action)),
                    middleware: group.middleware.clone(),
                    action: RouteAction::Controller {
                        class: controller.clone(),
                        method: action.to_string(),
                    },
                }
            })
            .collect()
    }
}

/// Resource action, methods, URI suffix
const RESOURCE_ACTIONS: [(&str, &[&str], &str); 7] = [
    ("index", &["GET"], ""),
    ("create", &["GET"], "create"),
    ("store", &["POST"], ""),
    ("show", &["GET"], "{param}"),
    ("edit", &["GET"], "{param}/edit"),
    ("update", &["PUT", "PATCH"], "{param}"),
    ("destroy", &["DELETE"], "{param}"),
];

/// `photos.comments` -> `photos/{photo}/comments`
fn resource_base(name: &str) -> String {
    let segments: Vec<&str> = name.split('.').collect();
    let mut uri = String::new();
    for (i, segment) in segments.iter().enumerate() {
        uri = join_uri(&uri, segment);
        if i + 1 < segments.len() {
            uri = join_uri(&uri, &format!("{{{}}}", singularize(segment)));
        }
    }
    uri
}

fn is_terminal(name: &str) -> bool {
    VERBS.contains(&name) || matches!(name, "match" | "any" | "view" | "resource" | "apiResource" | "group")
}

/// Split `get('/x', ...)->name('y')->middleware('z')` into calls
fn parse_chain(text: &str) -> Vec<Call<'_>> {
    let mut calls = Vec::new();
    let mut rest = text;
    loop {
        let ident_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if ident_len == 0 {
            break;
        }
        let name = &rest[..ident_len];
        let after = rest[ident_len..].trim_start();
        let offset = rest.len() - after.len();
        if !after.starts_with('(') {
            break;
        }
        let Some(close) = matching_delimiter(rest, offset) else {
            break;
        };
        calls.push(Call {
            name,
            args: &rest[offset + 1..close],
        });
        let tail = rest[close + 1..].trim_start();
        match tail.strip_prefix("->") {
            Some(next) => rest = next.trim_start(),
            None => break,
        }
    }
    calls
}

fn first_string(args: &str) -> Option<String> {
    split_top_level(args, b',').first().and_then(|a| unquote(a))
}

/// `'auth'`, `'auth', 'verified'` or `['auth', 'verified']`
fn string_or_list(args: &str) -> Vec<String> {
    let args = args.trim();
    if args.starts_with('[') {
        return string_list(args);
    }
    split_top_level(args, b',')
        .into_iter()
        .filter_map(unquote)
        .collect()
}

/// Join two URI parts without doubled slashes; empty becomes `/`
pub fn join_uri(prefix: &str, uri: &str) -> String {
    let parts: Vec<&str> = [prefix, uri]
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        "/".to_string()
    } else {
        parts.join("/")
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Maps registry routes to components, analyzing controller actions
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteMapper;

impl RouteMapper {
    pub fn new() -> Self {
        Self
    }

    fn component(&self, route: RouteDefinition, ctx: &ScanContext<'_>) -> Component {
        let fq_name = format!("{} {}", route.methods.join("|"), route.uri);
        let (controller, action, closure) = match &route.action {
            RouteAction::Controller { class, method } => (Some(class.clone()), Some(method.clone()), false),
            RouteAction::Closure => (None, None, true),
            _ => (None, None, false),
        };

        let file_path = controller
            .as_deref()
            .and_then(|c| ctx.index.get(c))
            .map(|c| ctx.relative(&c.path))
            .unwrap_or_default();

        let flow = match (&controller, &action) {
            (Some(class), Some(method)) => self.controller_flow(class, method, ctx),
            _ => None,
        };

        let meta = RouteMeta {
            category: RouteCategory::from_uri(&route.uri),
            uri: route.uri,
            methods: route.methods,
            name: route.name,
            middleware: route.middleware,
            controller,
            action,
            closure,
        };

        Component {
            kind: ComponentKind::Route,
            short_name: meta.name.clone().unwrap_or_else(|| meta.uri.clone()),
            namespace: String::new(),
            fq_name,
            file_path,
            structure: None,
            metadata: Metadata::Route(meta),
            flow,
            note: None,
        }
    }

    /// Flow of the action method body, or of the whole controller file when
    /// the method cannot be isolated
    fn controller_flow(&self, class: &str, method: &str, ctx: &ScanContext<'_>) -> Option<FlowReport> {
        let indexed = ctx.index.get(class)?;
        let source = std::fs::read_to_string(&indexed.path).ok()?;
        let imports = parse_imports(&source);
        let body = ctx
            .introspector
            .introspect(class, &indexed.path)
            .ok()
            .and_then(|c| c.method(method).and_then(|m| m.body.clone()));
        match body {
            Some(body) => Some(ctx.flow.analyze_with_imports(&body, &imports)),
            None => {
                debug!(class, method, "action body not found, analyzing whole file");
                Some(ctx.flow.analyze_with_imports(&source, &imports))
            }
        }
    }
}

impl Mapper for RouteMapper {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Route
    }

    fn scan(&self, ctx: &ScanContext<'_>, _options: &ScanOptions) -> Result<ScanResult> {
        let mut seen = HashSet::new();
        let mut data = Vec::new();
        for route in ctx.routes.routes(ctx.root)? {
            if route.methods.is_empty() {
                continue;
            }
            let component = self.component(route, ctx);
            if seen.insert(component.fq_name.clone()) {
                data.push(component);
            }
        }
        info!(kind = %ComponentKind::Route, count = data.len(), "scan complete");
        Ok(ScanResult::new(ComponentKind::Route, data))
    }
}

/// Used by tests and callers that already hold route definitions
#[derive(Debug, Clone, Default)]
pub struct StaticRoutes(pub Vec<RouteDefinition>);

impl RouteRegistry for StaticRoutes {
    fn routes(&self, _root: &Path) -> Result<Vec<RouteDefinition>> {
        Ok(self.0.clone())
    }
}
