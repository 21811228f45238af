// Introspection collaborators
//
// TypeIntrospector describes a class's structure. AttributeProvider
// supplies values a running application computes at runtime (table names,
// command signatures); the default reads them from property literals and
// a JSON file may override them per class.

use crate::error::{Error, Result};
use crate::parser::lexer::{split_top_level, unquote};
use crate::parser::literal::{string_list, string_map};
use crate::parser::{PhpClass, PhpParser};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

static ON_QUEUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"onQueue\s*\(\s*['"]([^'"]+)['"]"#).expect("valid onQueue regex")
});

static ON_CONNECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"onConnection\s*\(\s*['"]([^'"]+)['"]"#).expect("valid onConnection regex")
});

static RETURN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\breturn\s+").expect("valid return regex"));

/// Structural description of a type
pub trait TypeIntrospector {
    /// Describe the class `fq_name` declared in `path`
    fn introspect(&self, fq_name: &str, path: &Path) -> Result<PhpClass>;
}

/// Introspection by reading the declaring file
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceIntrospector {
    parser: PhpParser,
}

impl SourceIntrospector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TypeIntrospector for SourceIntrospector {
    fn introspect(&self, fq_name: &str, path: &Path) -> Result<PhpClass> {
        let class = self
            .parser
            .parse_file(path)
            .map_err(|e| Error::introspection(fq_name, e.to_string()))?;
        if class.fq_name() != fq_name {
            return Err(Error::introspection(
                fq_name,
                format!("{} now declares {}", path.display(), class.fq_name()),
            ));
        }
        Ok(class)
    }
}

/// Values normally read from a live instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeAttributes {
    pub table: Option<String>,
    pub primary_key: Option<String>,
    pub fillable: Option<Vec<String>>,
    pub guarded: Option<Vec<String>>,
    pub hidden: Option<Vec<String>>,
    pub casts: Option<BTreeMap<String, String>>,
    pub signature: Option<String>,
    pub command_name: Option<String>,
    pub description: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub queue: Option<String>,
    pub connection: Option<String>,
}

impl RuntimeAttributes {
    /// Fields set in `over` win
    pub fn overlay(self, over: RuntimeAttributes) -> Self {
        Self {
            table: over.table.or(self.table),
            primary_key: over.primary_key.or(self.primary_key),
            fillable: over.fillable.or(self.fillable),
            guarded: over.guarded.or(self.guarded),
            hidden: over.hidden.or(self.hidden),
            casts: over.casts.or(self.casts),
            signature: over.signature.or(self.signature),
            command_name: over.command_name.or(self.command_name),
            description: over.description.or(self.description),
            aliases: over.aliases.or(self.aliases),
            queue: over.queue.or(self.queue),
            connection: over.connection.or(self.connection),
        }
    }
}

/// Runtime-only attributes of a component, given its identity
pub trait AttributeProvider {
    fn describe(&self, class: &PhpClass) -> Result<RuntimeAttributes>;
}

/// Reads runtime attributes from declared property defaults
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceAttributes;

impl SourceAttributes {
    pub fn new() -> Self {
        Self
    }
}

impl AttributeProvider for SourceAttributes {
    fn describe(&self, class: &PhpClass) -> Result<RuntimeAttributes> {
        let string_prop = |name: &str| {
            class
                .property(name)
                .and_then(|p| p.default.as_deref())
                .and_then(unquote)
        };
        let list_prop = |name: &str| {
            class
                .property(name)
                .and_then(|p| p.default.as_deref())
                .map(string_list)
        };

        let casts = class
            .property("casts")
            .and_then(|p| p.default.as_deref())
            .map(string_map)
            .or_else(|| {
                class
                    .method("casts")
                    .and_then(|m| returned_array(m.body_text()))
                    .map(|raw| string_map(&raw))
            })
            .map(|pairs| pairs.into_iter().collect());

        let as_command = class.attribute("AsCommand").map(|a| parse_as_command(&a.arguments));
        let signature = string_prop("signature");
        let command_name = string_prop("name")
            .or_else(|| as_command.as_ref().and_then(|c| c.name.clone()))
            .or_else(|| {
                signature
                    .as_deref()
                    .and_then(|s| s.split_whitespace().next())
                    .map(str::to_string)
            });

        let constructor = class.constructor().map(|c| c.body_text()).unwrap_or("");

        Ok(RuntimeAttributes {
            table: string_prop("table"),
            primary_key: string_prop("primaryKey"),
            fillable: list_prop("fillable"),
            guarded: list_prop("guarded"),
            hidden: list_prop("hidden"),
            casts,
            signature,
            command_name,
            description: string_prop("description")
                .or_else(|| as_command.as_ref().and_then(|c| c.description.clone())),
            aliases: list_prop("aliases").or_else(|| as_command.and_then(|c| c.aliases)),
            queue: string_prop("queue")
                .or_else(|| ON_QUEUE_RE.captures(constructor).map(|c| c[1].to_string())),
            connection: string_prop("connection")
                .or_else(|| ON_CONNECTION_RE.captures(constructor).map(|c| c[1].to_string())),
        })
    }
}

/// Source attributes with per-class overrides loaded from JSON
///
/// The file maps fully-qualified class names to objects with any of the
/// [`RuntimeAttributes`] fields.
#[derive(Debug, Clone, Default)]
pub struct JsonAttributes {
    overrides: BTreeMap<String, RuntimeAttributes>,
    source: SourceAttributes,
}

impl JsonAttributes {
    pub fn new(overrides: BTreeMap<String, RuntimeAttributes>) -> Self {
        Self {
            overrides,
            source: SourceAttributes,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let overrides: BTreeMap<String, RuntimeAttributes> = serde_json::from_str(contents)?;
        Ok(Self::new(
            overrides
                .into_iter()
                .map(|(k, v)| (k.trim_start_matches('\\').to_string(), v))
                .collect(),
        ))
    }
}

impl AttributeProvider for JsonAttributes {
    fn describe(&self, class: &PhpClass) -> Result<RuntimeAttributes> {
        let base = self.source.describe(class)?;
        Ok(match self.overrides.get(&class.fq_name()) {
            Some(over) => base.overlay(over.clone()),
            None => base,
        })
    }
}

/// Array literal after the first `return` in a method body
pub fn returned_array(body: &str) -> Option<String> {
    let start = RETURN_RE.find(body)?.end();
    let rest = body[start..].trim_start();
    rest.starts_with('[').then(|| rest.to_string())
}

#[derive(Debug, Default)]
struct AsCommand {
    name: Option<String>,
    description: Option<String>,
    aliases: Option<Vec<String>>,
}

/// `#[AsCommand(name: 'x', description: 'y', aliases: ['z'])]`, named or positional
fn parse_as_command(arguments: &str) -> AsCommand {
    let mut command = AsCommand::default();
    for (position, arg) in split_top_level(arguments, b',').into_iter().enumerate() {
        let arg = arg.trim();
        let (key, value) = match arg.split_once(':') {
            Some((key, value)) if key.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                (key.trim().to_string(), value.trim())
            }
            _ => (
                match position {
                    0 => "name",
                    1 => "description",
                    2 => "aliases",
                    _ => "",
                }
                .to_string(),
                arg,
            ),
        };
        match key.as_str() {
            "name" => command.name = unquote(value),
            "description" => command.description = unquote(value),
            "aliases" => command.aliases = Some(string_list(value)),
            _ => {}
        }
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn class(source: &str) -> PhpClass {
        PhpParser::new()
            .parse_source(source, PathBuf::from("x.php"))
            .unwrap()
    }

    #[test]
    fn test_model_attributes() {
        let model = class(
            r#"<?php
namespace App\Models;
class Invoice extends Model {
    protected $table = 'billing_invoices';
    protected $primaryKey = 'invoice_id';
    protected $fillable = ['number', 'total'];
    protected $hidden = ['secret'];
    protected function casts(): array
    {
        return [
            'paid_at' => 'datetime',
            'total' => 'decimal:2',
        ];
    }
}
"#,
        );
        let attrs = SourceAttributes.describe(&model).unwrap();
        assert_eq!(attrs.table.as_deref(), Some("billing_invoices"));
        assert_eq!(attrs.primary_key.as_deref(), Some("invoice_id"));
        assert_eq!(attrs.fillable, Some(vec!["number".to_string(), "total".to_string()]));
        assert_eq!(attrs.guarded, None);
        let casts = attrs.casts.unwrap();
        assert_eq!(casts.get("paid_at").map(String::as_str), Some("datetime"));
        assert_eq!(casts.get("total").map(String::as_str), Some("decimal:2"));
    }

    #[test]
    fn test_command_attributes_from_properties() {
        let command = class(
            r#"<?php
namespace App\Console\Commands;
class PruneLogs extends Command {
    protected $signature = 'logs:prune {--days=30}';
    protected $description = 'Delete old log rows';
}
"#,
        );
        let attrs = SourceAttributes.describe(&command).unwrap();
        assert_eq!(attrs.signature.as_deref(), Some("logs:prune {--days=30}"));
        assert_eq!(attrs.command_name.as_deref(), Some("logs:prune"));
        assert_eq!(attrs.description.as_deref(), Some("Delete old log rows"));
    }

    #[test]
    fn test_command_attributes_from_as_command() {
        let command = class(
            r#"<?php
namespace App\Console\Commands;
#[AsCommand(name: 'app:sync', description: 'Sync things', aliases: ['sync'])]
class SyncCommand extends Command {}
"#,
        );
        let attrs = SourceAttributes.describe(&command).unwrap();
        assert_eq!(attrs.command_name.as_deref(), Some("app:sync"));
        assert_eq!(attrs.description.as_deref(), Some("Sync things"));
        assert_eq!(attrs.aliases, Some(vec!["sync".to_string()]));
    }

    #[test]
    fn test_positional_as_command() {
        let parsed = parse_as_command("'app:report', 'Build report'");
        assert_eq!(parsed.name.as_deref(), Some("app:report"));
        assert_eq!(parsed.description.as_deref(), Some("Build report"));
    }

    #[test]
    fn test_queue_from_constructor() {
        let job = class(
            r#"<?php
namespace App\Jobs;
class Export {
    public function __construct() { $this->onQueue('exports'); $this->onConnection('redis'); }
}
"#,
        );
        let attrs = SourceAttributes.describe(&job).unwrap();
        assert_eq!(attrs.queue.as_deref(), Some("exports"));
        assert_eq!(attrs.connection.as_deref(), Some("redis"));
    }

    #[test]
    fn test_json_overrides() {
        let provider = JsonAttributes::from_json(
            r#"{"\\App\\Models\\User": {"table": "members", "fillable": ["email"]}}"#,
        )
        .unwrap();
        let user = class("<?php\nnamespace App\\Models;\nclass User { protected $table = 'users'; protected $hidden = ['password']; }\n");
        let attrs = provider.describe(&user).unwrap();
        assert_eq!(attrs.table.as_deref(), Some("members"));
        assert_eq!(attrs.fillable, Some(vec!["email".to_string()]));
        assert_eq!(attrs.hidden, Some(vec!["password".to_string()]));
    }

    #[test]
    fn test_json_overrides_invalid() {
        assert!(JsonAttributes::from_json("not json").is_err());
    }

    #[test]
    fn test_source_introspector_mismatch() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("User.php");
        std::fs::write(&path, "<?php\nnamespace App\\Models;\nclass Member {}\n").unwrap();

        let introspector = SourceIntrospector::new();
        assert!(introspector.introspect("App\\Models\\Member", &path).is_ok());
        let err = introspector.introspect("App\\Models\\User", &path).unwrap_err();
        assert!(matches!(err, Error::Introspection { .. }));
        assert!(introspector
            .introspect("App\\Models\\Gone", &dir.path().join("Gone.php"))
            .is_err());
    }
}
