// Types for PHP declarations extracted from source text
//
// Only the parts of a class the mappers need are kept: header, imports,
// attributes, traits, properties (with raw default text) and methods.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of top-level type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Trait,
    Enum,
}

impl TypeKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "class" => Some(TypeKind::Class),
            "interface" => Some(TypeKind::Interface),
            "trait" => Some(TypeKind::Trait),
            "enum" => Some(TypeKind::Enum),
            _ => None,
        }
    }
}

/// Member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "public" | "var" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// A `use` import at file level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseImport {
    /// Fully-qualified imported name, without a leading backslash
    pub name: String,
    pub alias: Option<String>,
}

impl UseImport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim_start_matches('\\').to_string(),
            alias: None,
        }
    }

    pub fn with_alias(name: &str, alias: &str) -> Self {
        Self {
            name: name.trim_start_matches('\\').to_string(),
            alias: Some(alias.to_string()),
        }
    }

    /// Name as used in code (alias if present, otherwise last segment)
    pub fn used_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => short_name(&self.name),
        }
    }
}

/// A function or method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Parameter {
    pub name: String,
    pub type_hint: Option<String>,
    pub nullable: bool,
    pub has_default: bool,
    pub default: Option<String>,
    pub variadic: bool,
    pub by_reference: bool,
    /// Visibility when promoted to a property
    pub promoted: Option<Visibility>,
}

impl Parameter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn typed(name: &str, type_hint: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hint: Some(type_hint.to_string()),
            nullable: type_hint.starts_with('?'),
            ..Default::default()
        }
    }

    /// Type hint without the nullable marker
    pub fn bare_type(&self) -> Option<&str> {
        self.type_hint.as_deref().map(|t| t.trim_start_matches('?'))
    }

    /// Render as `Type $name`
    pub fn display(&self) -> String {
        match &self.type_hint {
            Some(t) => format!("{} ${}", t, self.name),
            None => format!("${}", self.name),
        }
    }
}

/// A class method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    /// Text between the outer braces, absent for abstract methods
    pub body: Option<String>,
    pub line: usize,
}

impl Method {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: false,
            parameters: Vec::new(),
            return_type: None,
            body: None,
            line: 0,
        }
    }

    /// Magic methods other than `__invoke`
    pub fn is_magic(&self) -> bool {
        self.name.starts_with("__") && self.name != "__invoke"
    }

    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// A class property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub type_hint: Option<String>,
    /// Raw default value text
    pub default: Option<String>,
}

/// A `#[Name(arguments)]` attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// Raw text between the parentheses
    pub arguments: String,
}

/// A parsed PHP type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpClass {
    pub path: PathBuf,
    pub namespace: Option<String>,
    pub name: String,
    pub kind: TypeKind,
    pub is_abstract: bool,
    pub is_final: bool,
    /// Parent as written in source
    pub extends: Option<String>,
    /// Interfaces as written in source
    pub interfaces: Vec<String>,
    /// Traits as written in source
    pub traits: Vec<String>,
    pub imports: Vec<UseImport>,
    pub attributes: Vec<Attribute>,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
}

impl PhpClass {
    pub fn new(path: PathBuf, namespace: Option<String>, name: &str) -> Self {
        Self {
            path,
            namespace,
            name: name.to_string(),
            kind: TypeKind::Class,
            is_abstract: false,
            is_final: false,
            extends: None,
            interfaces: Vec::new(),
            traits: Vec::new(),
            imports: Vec::new(),
            attributes: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Namespace + name
    pub fn fq_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}\\{}", ns, self.name),
            _ => self.name.clone(),
        }
    }

    /// Concrete class that can be instantiated
    pub fn is_concrete(&self) -> bool {
        self.kind == TypeKind::Class && !self.is_abstract
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }

    pub fn constructor(&self) -> Option<&Method> {
        self.method("__construct")
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn attribute(&self, short: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| short_name(&a.name) == short)
    }

    /// Public, non-magic methods
    pub fn public_methods(&self) -> impl Iterator<Item = &Method> {
        self.methods
            .iter()
            .filter(|m| m.visibility == Visibility::Public && !m.is_magic())
    }

    /// Resolve a name as written in this file to a fully-qualified name
    pub fn resolve(&self, raw: &str) -> String {
        qualify(raw, self.namespace.as_deref(), &self.imports)
    }

    pub fn resolved_parent(&self) -> Option<String> {
        self.extends.as_deref().map(|p| self.resolve(p))
    }

    pub fn resolved_interfaces(&self) -> Vec<String> {
        self.interfaces.iter().map(|i| self.resolve(i)).collect()
    }

    pub fn resolved_traits(&self) -> Vec<String> {
        self.traits.iter().map(|t| self.resolve(t)).collect()
    }

    /// Whether a trait with this short name is used directly
    pub fn uses_trait(&self, short: &str) -> bool {
        self.traits.iter().any(|t| short_name(t) == short)
    }

    /// Whether an interface with this short name is implemented directly
    pub fn implements(&self, short: &str) -> bool {
        self.interfaces.iter().any(|i| short_name(i) == short)
    }
}

/// Last segment of a backslash-separated name
pub fn short_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

/// Everything before the last backslash
pub fn namespace_of(name: &str) -> &str {
    let trimmed = name.trim_start_matches('\\');
    match trimmed.rfind('\\') {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Resolve a name through `use` imports only, `None` if nothing matches
pub fn resolve_import(raw: &str, imports: &[UseImport]) -> Option<String> {
    if let Some(stripped) = raw.strip_prefix('\\') {
        return Some(stripped.to_string());
    }
    let (head, rest) = match raw.find('\\') {
        Some(idx) => (&raw[..idx], Some(&raw[idx + 1..])),
        None => (raw, None),
    };
    imports
        .iter()
        .find(|i| i.used_name() == head)
        .map(|i| match rest {
            Some(rest) => format!("{}\\{}", i.name, rest),
            None => i.name.clone(),
        })
}

/// Resolve a name using PHP's rules: leading backslash, imports, namespace
pub fn qualify(raw: &str, namespace: Option<&str>, imports: &[UseImport]) -> String {
    let raw = raw.trim();
    if let Some(resolved) = resolve_import(raw, imports) {
        return resolved;
    }
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}\\{}", ns, raw),
        _ => raw.to_string(),
    }
}
