use crate::analysis::component::{ComponentKind, Metadata, ModelMeta, Relation};
use crate::analysis::discovery::{KindStrategy, ScanContext};
use crate::analysis::resolve::{resolve_class_reference, table_name};
use crate::analysis::LIFECYCLE_HOOKS;
use crate::error::Result;
use crate::parser::literal::{class_refs, parse_array};
use crate::parser::PhpClass;
use once_cell::sync::Lazy;
use regex::Regex;

const MODEL_BASES: [&str; 3] = [
    "Illuminate\\Database\\Eloquent\\Model",
    "Illuminate\\Foundation\\Auth\\User",
    "Illuminate\\Database\\Eloquent\\Relations\\Pivot",
];

static RELATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"return\s+\$this\s*->\s*(hasOneThrough|hasManyThrough|hasOne|hasMany|belongsToMany|belongsTo|morphOne|morphMany|morphToMany|morphTo|morphedByMany)\s*\(\s*(?:([\\\w]+)::class)?",
    )
    .expect("valid relation regex")
});

static BOOT_HOOK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:static|self)::(\w+)\s*\(").expect("valid boot hook regex")
});

/// Eloquent models, including models extending an application base model
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelStrategy;

impl KindStrategy for ModelStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Model
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && ctx.index.extends_any(class, &MODEL_BASES)
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        let attributes = ctx.attributes.describe(class)?;
        let fq_name = class.fq_name();

        let (fillable, guarded) = match (attributes.fillable, attributes.guarded) {
            (None, None) => (Vec::new(), vec!["*".to_string()]),
            (fillable, guarded) => (fillable.unwrap_or_default(), guarded.unwrap_or_default()),
        };

        let mut observers: Vec<String> = ctx.providers.observers_of(&fq_name).to_vec();
        if let Some(attribute) = class.attribute("ObservedBy") {
            for observer in class_refs(&attribute.arguments) {
                let observer = class.resolve(&observer);
                if !observers.contains(&observer) {
                    observers.push(observer);
                }
            }
        }

        let dispatches_events = class
            .property("dispatchesEvents")
            .and_then(|p| p.default.as_deref())
            .and_then(parse_array)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| Some((entry.key.clone()?, class.resolve(&entry.class_value()?))))
            .collect();

        Ok(Metadata::Model(ModelMeta {
            table: attributes.table.unwrap_or_else(|| table_name(&class.name)),
            primary_key: attributes.primary_key.unwrap_or_else(|| "id".to_string()),
            fillable,
            guarded,
            hidden: attributes.hidden.unwrap_or_default(),
            casts: attributes.casts.unwrap_or_default(),
            relations: relations(class, ctx),
            scopes: scopes(class),
            boot_hooks: boot_hooks(class),
            observers,
            dispatches_events,
            soft_deletes: ctx.index.uses_trait(class, "SoftDeletes"),
        }))
    }

    fn include_protected(&self) -> bool {
        true
    }
}

fn relations(class: &PhpClass, ctx: &ScanContext<'_>) -> Vec<Relation> {
    let models_namespace = &ctx.config.scan.models_namespace;
    class
        .methods
        .iter()
        .filter(|m| !m.is_static)
        .filter_map(|method| {
            let cap = RELATION_RE.captures(method.body_text())?;
            let constructor = &cap[1];
            let related = match constructor {
                "morphTo" => None,
                _ => cap
                    .get(2)
                    .map(|m| resolve_class_reference(m.as_str(), class, &ctx.index, models_namespace)),
            };
            Some(Relation {
                name: method.name.clone(),
                relation_type: relation_type(constructor),
                related,
            })
        })
        .collect()
}

/// `belongsToMany` -> `BelongsToMany`; `morphedByMany` is a `MorphToMany`
fn relation_type(constructor: &str) -> String {
    if constructor == "morphedByMany" {
        return "MorphToMany".to_string();
    }
    let mut chars = constructor.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `scopeActive` -> `active`
fn scopes(class: &PhpClass) -> Vec<String> {
    class
        .methods
        .iter()
        .filter_map(|m| m.name.strip_prefix("scope"))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
        .map(|rest| {
            let mut chars = rest.chars();
            match chars.next() {
                Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Lifecycle callbacks registered in `boot` / `booted`
fn boot_hooks(class: &PhpClass) -> Vec<String> {
    let mut hooks = Vec::new();
    for method in ["boot", "booted"].iter().filter_map(|name| class.method(name)) {
        for cap in BOOT_HOOK_RE.captures_iter(method.body_text()) {
            let hook = &cap[1];
            if LIFECYCLE_HOOKS.contains(&hook) && !hooks.iter().any(|h| h == hook) {
                hooks.push(hook.to_string());
            }
        }
    }
    hooks
}
