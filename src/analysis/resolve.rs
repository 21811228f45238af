// Name resolution
//
// PathResolver maps a file to the fully-qualified name it declares.
// ClassIndex records the header of every class under the index paths so
// mappers can walk inheritance chains and check that a guessed name exists.

use crate::analysis::discovery::discover_files;
use crate::parser::{namespace_of, parse_header, resolve_import, short_name, PhpClass, PhpParser};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File path -> declared fully-qualified type name
#[derive(Debug, Default, Clone, Copy)]
pub struct PathResolver;

impl PathResolver {
    pub fn new() -> Self {
        Self
    }

    /// `None` when the file cannot be read or lacks a namespace or type
    pub fn resolve(&self, path: &Path) -> Option<String> {
        let source = std::fs::read_to_string(path).ok()?;
        self.resolve_source(&source)
    }

    pub fn resolve_source(&self, source: &str) -> Option<String> {
        match parse_header(source) {
            (Some(namespace), Some(name)) => Some(format!("{}\\{}", namespace, name)),
            _ => None,
        }
    }
}

/// Header facts for one indexed class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedClass {
    pub path: PathBuf,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub traits: Vec<String>,
}

/// Every class declared under the index paths of one scan
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    classes: BTreeMap<String, IndexedClass>,
    namespaces: BTreeSet<String>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every PHP file under the given directories
    pub fn build(root: &Path, index_paths: &[String], exclude: &[glob::Pattern]) -> Self {
        let parser = PhpParser::new();
        let mut index = Self::new();

        for dir in index_paths {
            for path in discover_files(root, &root.join(dir), true, exclude) {
                match parser.parse_file(&path) {
                    Ok(class) if class.namespace.is_some() => index.insert(&class),
                    Ok(_) => debug!(path = %path.display(), "not indexed: no namespace"),
                    Err(e) => debug!(path = %path.display(), error = %e, "not indexed"),
                }
            }
        }

        debug!(classes = index.len(), "class index built");
        index
    }

    pub fn insert(&mut self, class: &PhpClass) {
        let fq_name = class.fq_name();
        self.namespaces.insert(namespace_of(&fq_name).to_string());
        self.classes.insert(
            fq_name,
            IndexedClass {
                path: class.path.clone(),
                parent: class.resolved_parent(),
                interfaces: class.resolved_interfaces(),
                traits: class.resolved_traits(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, fq_name: &str) -> bool {
        self.classes.contains_key(fq_name.trim_start_matches('\\'))
    }

    pub fn get(&self, fq_name: &str) -> Option<&IndexedClass> {
        self.classes.get(fq_name.trim_start_matches('\\'))
    }

    /// Whether any indexed class lives in this namespace
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace.trim_matches('\\'))
    }

    /// Parents of a class, nearest first. Stops at the first class outside
    /// the index and on cycles.
    pub fn ancestors(&self, class: &PhpClass) -> Vec<String> {
        let mut chain = Vec::new();
        let mut next = class.resolved_parent();
        while let Some(parent) = next {
            if chain.contains(&parent) || parent == class.fq_name() {
                break;
            }
            next = self.get(&parent).and_then(|p| p.parent.clone());
            chain.push(parent);
        }
        chain
    }

    /// Whether the class or any ancestor is one of `targets`
    pub fn extends_any(&self, class: &PhpClass, targets: &[&str]) -> bool {
        self.ancestors(class)
            .iter()
            .any(|a| targets.contains(&a.as_str()))
    }

    /// Interfaces declared on the class and its indexed ancestors
    pub fn all_interfaces(&self, class: &PhpClass) -> Vec<String> {
        let mut interfaces = class.resolved_interfaces();
        for ancestor in self.ancestors(class) {
            if let Some(indexed) = self.get(&ancestor) {
                interfaces.extend(indexed.interfaces.iter().cloned());
            }
        }
        interfaces
    }

    /// Traits used by the class and its indexed ancestors
    pub fn all_traits(&self, class: &PhpClass) -> Vec<String> {
        let mut traits = class.resolved_traits();
        for ancestor in self.ancestors(class) {
            if let Some(indexed) = self.get(&ancestor) {
                traits.extend(indexed.traits.iter().cloned());
            }
        }
        traits
    }

    /// Interface check by short name across the chain
    pub fn implements(&self, class: &PhpClass, short: &str) -> bool {
        self.all_interfaces(class).iter().any(|i| short_name(i) == short)
    }

    /// Trait check by short name across the chain
    pub fn uses_trait(&self, class: &PhpClass, short: &str) -> bool {
        self.all_traits(class).iter().any(|t| short_name(t) == short)
    }
}

/// Resolve a class reference found in `class` to a fully-qualified name.
///
/// Order: a literal qualified name, a `use` import, the class's own
/// namespace when the result is a known class, the models namespace when
/// that is a known class, the own namespace when it holds indexed classes,
/// and finally the models namespace.
pub fn resolve_class_reference(
    raw: &str,
    class: &PhpClass,
    index: &ClassIndex,
    fallback_namespace: &str,
) -> String {
    let raw = raw.trim();
    if raw.starts_with('\\') {
        return raw.trim_start_matches('\\').to_string();
    }
    if let Some(imported) = resolve_import(raw, &class.imports) {
        return imported;
    }
    if raw.contains('\\') {
        return raw.to_string();
    }

    let own_namespace = class.namespace.as_deref().unwrap_or("");
    let in_own = join(own_namespace, raw);
    let in_fallback = join(fallback_namespace, raw);

    if index.contains(&in_own) {
        in_own
    } else if index.contains(&in_fallback) {
        in_fallback
    } else if !own_namespace.is_empty() && index.has_namespace(own_namespace) {
        in_own
    } else {
        in_fallback
    }
}

fn join(namespace: &str, name: &str) -> String {
    let namespace = namespace.trim_matches('\\');
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", namespace, name)
    }
}

/// `OrderItem` -> `order_item`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if i > 0 && (prev_lower || (next_lower && chars[i - 1].is_uppercase())) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

/// English plural of a lowercase word, covering the common suffix rules
pub fn pluralize(word: &str) -> String {
    const IRREGULAR: &[(&str, &str)] = &[
        ("person", "people"),
        ("child", "children"),
        ("man", "men"),
        ("woman", "women"),
        ("mouse", "mice"),
        ("datum", "data"),
        ("criterion", "criteria"),
    ];
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == word) {
        return plural.to_string();
    }
    if word.ends_with("ss")
        || word.ends_with('x')
        || word.ends_with("ch")
        || word.ends_with("sh")
        || word.ends_with('s')
        || word.ends_with('z')
    {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", word)
}

/// Rough inverse of [`pluralize`], used for route parameters
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        format!("{}y", stem)
    } else if word.ends_with("sses") || word.ends_with("ches") || word.ends_with("shes") || word.ends_with("xes") {
        word[..word.len() - 2].to_string()
    } else if let Some(stem) = word.strip_suffix('s').filter(|_| !word.ends_with("ss")) {
        stem.to_string()
    } else {
        word.to_string()
    }
}

/// Default table for a model: snake case, last word pluralized
pub fn table_name(class_short_name: &str) -> String {
    let snake = snake_case(class_short_name);
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, pluralize(last)),
        None => pluralize(&snake),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn class(source: &str) -> PhpClass {
        PhpParser::new()
            .parse_source(source, PathBuf::from("x.php"))
            .unwrap()
    }

    #[test]
    fn test_path_resolver() {
        let resolver = PathResolver::new();
        assert_eq!(
            resolver.resolve_source("<?php\nnamespace App\\Models;\nclass User {}\n"),
            Some("App\\Models\\User".to_string())
        );
        assert_eq!(resolver.resolve_source("<?php\nclass Global {}\n"), None);
        assert_eq!(resolver.resolve_source("<?php\nnamespace App;\nreturn [];\n"), None);
        assert_eq!(resolver.resolve(Path::new("/nonexistent/File.php")), None);
    }

    #[test]
    fn test_index_ancestors() {
        let mut index = ClassIndex::new();
        index.insert(&class(
            "<?php\nnamespace App\\Models;\nuse Illuminate\\Database\\Eloquent\\Model;\nabstract class BaseModel extends Model implements Auditable { use Tracks; }\n",
        ));
        let user = class("<?php\nnamespace App\\Models;\nclass User extends BaseModel {}\n");

        assert_eq!(
            index.ancestors(&user),
            vec![
                "App\\Models\\BaseModel".to_string(),
                "Illuminate\\Database\\Eloquent\\Model".to_string()
            ]
        );
        assert!(index.extends_any(&user, &["Illuminate\\Database\\Eloquent\\Model"]));
        assert!(index.implements(&user, "Auditable"));
        assert!(index.uses_trait(&user, "Tracks"));
        assert!(index.has_namespace("App\\Models"));
    }

    #[test]
    fn test_index_cycle_terminates() {
        let mut index = ClassIndex::new();
        index.insert(&class("<?php\nnamespace App;\nclass A extends B {}\n"));
        index.insert(&class("<?php\nnamespace App;\nclass B extends A {}\n"));
        let a = class("<?php\nnamespace App;\nclass A extends B {}\n");
        assert_eq!(index.ancestors(&a), vec!["App\\B".to_string()]);
    }

    #[test]
    fn test_index_build_from_disk() {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("app/Models");
        fs::create_dir_all(&models).unwrap();
        fs::write(models.join("Post.php"), "<?php\nnamespace App\\Models;\nclass Post extends Model {}\n").unwrap();
        fs::write(models.join("helpers.php"), "<?php\nfunction x() {}\n").unwrap();

        let index = ClassIndex::build(dir.path(), &["app".to_string()], &[]);
        assert_eq!(index.len(), 1);
        assert!(index.contains("App\\Models\\Post"));
    }

    #[test]
    fn test_resolve_reference_order() {
        let mut index = ClassIndex::new();
        index.insert(&class("<?php\nnamespace App\\Models;\nclass Tag {}\n"));
        index.insert(&class("<?php\nnamespace App\\Domain\\Blog;\nclass Comment {}\n"));

        let post = class(
            "<?php\nnamespace App\\Domain\\Blog;\nuse App\\Models\\Author;\nuse Vendor\\Media as Asset;\nclass Post {}\n",
        );
        let resolve = |raw| resolve_class_reference(raw, &post, &index, "App\\Models");

        assert_eq!(resolve("\\Lib\\Thing"), "Lib\\Thing");
        assert_eq!(resolve("Author"), "App\\Models\\Author");
        assert_eq!(resolve("Asset"), "Vendor\\Media");
        assert_eq!(resolve("Comment"), "App\\Domain\\Blog\\Comment");
        assert_eq!(resolve("Tag"), "App\\Models\\Tag");
        // unknown, but the own namespace holds indexed classes
        assert_eq!(resolve("Draft"), "App\\Domain\\Blog\\Draft");

        let orphan = class("<?php\nnamespace Legacy;\nclass Orphan {}\n");
        assert_eq!(
            resolve_class_reference("Ghost", &orphan, &index, "App\\Models"),
            "App\\Models\\Ghost"
        );
    }

    #[test]
    fn test_table_name() {
        assert_eq!(table_name("User"), "users");
        assert_eq!(table_name("OrderItem"), "order_items");
        assert_eq!(table_name("Category"), "categories");
        assert_eq!(table_name("Address"), "addresses");
        assert_eq!(table_name("Person"), "people");
        assert_eq!(table_name("HTTPLog"), "http_logs");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("class"), "class");
        assert_eq!(singularize("photo"), "photo");
    }
}
