// Per-kind strategies for the file mapper
//
// Each strategy answers two questions about an introspected class: does it
// belong to the kind, and what kind-specific metadata does it carry.

mod command;
mod domain;
mod events;
mod guards;
mod http;
mod model;
mod queue;

pub use command::CommandStrategy;
pub use domain::{ActionStrategy, ServiceStrategy};
pub use events::{EventStrategy, ListenerStrategy, ObserverStrategy};
pub use guards::{PolicyStrategy, RuleStrategy};
pub use http::{ControllerStrategy, MiddlewareStrategy, RequestStrategy, ResourceStrategy};
pub use model::ModelStrategy;
pub use queue::{JobStrategy, NotificationStrategy};

use crate::analysis::component::ComponentKind;
use crate::analysis::discovery::{FileMapper, Mapper};
use crate::analysis::routes::RouteMapper;
use crate::parser::{short_name, PhpClass};

/// The mapper producing components of `kind`
pub fn mapper_for(kind: ComponentKind) -> Box<dyn Mapper> {
    match kind {
        ComponentKind::Route => Box::new(RouteMapper::new()),
        ComponentKind::Model => Box::new(FileMapper::new(ModelStrategy)),
        ComponentKind::Controller => Box::new(FileMapper::new(ControllerStrategy)),
        ComponentKind::Command => Box::new(FileMapper::new(CommandStrategy)),
        ComponentKind::Job => Box::new(FileMapper::new(JobStrategy)),
        ComponentKind::Event => Box::new(FileMapper::new(EventStrategy)),
        ComponentKind::Listener => Box::new(FileMapper::new(ListenerStrategy)),
        ComponentKind::Observer => Box::new(FileMapper::new(ObserverStrategy)),
        ComponentKind::Policy => Box::new(FileMapper::new(PolicyStrategy)),
        ComponentKind::Rule => Box::new(FileMapper::new(RuleStrategy)),
        ComponentKind::Middleware => Box::new(FileMapper::new(MiddlewareStrategy)),
        ComponentKind::Request => Box::new(FileMapper::new(RequestStrategy)),
        ComponentKind::Resource => Box::new(FileMapper::new(ResourceStrategy)),
        ComponentKind::Notification => Box::new(FileMapper::new(NotificationStrategy)),
        ComponentKind::Service => Box::new(FileMapper::new(ServiceStrategy)),
        ComponentKind::Action => Box::new(FileMapper::new(ActionStrategy)),
    }
}

const BUILTIN_TYPES: [&str; 16] = [
    "int", "float", "string", "bool", "array", "mixed", "callable", "iterable", "object", "self",
    "static", "null", "false", "true", "void", "never",
];

/// Fully-qualified class types injected through the constructor
pub(crate) fn dependencies(class: &PhpClass) -> Vec<String> {
    let mut out = Vec::new();
    let Some(constructor) = class.constructor() else {
        return out;
    };
    for param in &constructor.parameters {
        let Some(hint) = param.bare_type() else { continue };
        for part in hint.split(['|', '&']) {
            let part = part.trim();
            if part.is_empty() || BUILTIN_TYPES.contains(&part.to_ascii_lowercase().as_str()) {
                continue;
            }
            let resolved = class.resolve(part);
            if !out.contains(&resolved) {
                out.push(resolved);
            }
        }
    }
    out
}

pub(crate) fn method_names(class: &PhpClass) -> impl Iterator<Item = &str> {
    class.methods.iter().map(|m| m.name.as_str())
}

/// `OrderObserver` -> `App\Models\Order` under the given namespace
pub(crate) fn conventional_model(class: &PhpClass, suffix: &str, models_namespace: &str) -> Option<String> {
    let base = short_name(&class.name).strip_suffix(suffix)?;
    if base.is_empty() {
        return None;
    }
    Some(format!("{}\\{}", models_namespace.trim_matches('\\'), base))
}
