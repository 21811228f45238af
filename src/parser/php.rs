// PHP declaration scanner
//
// Reads namespaces, imports and the first type declaration of a file by
// pattern matching over comment-free text. This is not a full parser: it
// is tuned for the shape of framework application code and degrades to
// partial results on unusual input.

use crate::error::{Error, Result};
use crate::parser::ast::*;
use crate::parser::lexer::{
    find_top_level, line_of, mask_nested_blocks, matching_delimiter, split_top_level,
    strip_comments,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*namespace\s+([A-Za-z_][\w\\]*)\s*[;{]").expect("valid namespace regex")
});

static TYPE_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*((?:(?:abstract|final|readonly)\s+)*)(class|interface|trait|enum)\s+([A-Za-z_]\w*)([^{;]*)\{",
    )
    .expect("valid declaration regex")
});

static EXTENDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bextends\s+([\w\\]+(?:\s*,\s*[\w\\]+)*)").expect("valid extends regex")
});

static IMPLEMENTS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bimplements\s+([\w\\]+(?:\s*,\s*[\w\\]+)*)").expect("valid implements regex")
});

static USE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*use\s+([^;]+);").expect("valid use regex"));

static TRAIT_USE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(?:^|[;{}])\s*use\s+([\w\\]+(?:\s*,\s*[\w\\]+)*)\s*[;{]").expect("valid trait regex")
});

static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"((?:\b(?:public|protected|private|static|abstract|final)\s+)*)function\s+&?\s*([A-Za-z_]\w*)\s*\(",
    )
    .expect("valid method regex")
});

static PROPERTY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)(?:^|[;}])\s*((?:(?:public|protected|private|var|static|readonly)\s+)+)(?:([?\w\\|]+)\s+)?\$(\w+)\s*(=)?",
    )
    .expect("valid property regex")
});

static PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((?:(?:public|protected|private|readonly)\s+)*)(?:([?\w\\|]+)\s+)?(&\s*)?(\.\.\.\s*)?\$(\w+)$",
    )
    .expect("valid parameter regex")
});

static VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\w+)").expect("valid variable regex"));

/// Scanner for PHP source files
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpParser;

impl PhpParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse the first type declaration in a file
    pub fn parse_file(&self, path: &Path) -> Result<PhpClass> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;
        self.parse_source(&source, path.to_path_buf())
    }

    /// Parse the first type declaration in source text
    pub fn parse_source(&self, source: &str, path: PathBuf) -> Result<PhpClass> {
        let clean = strip_comments(source);

        let decl = TYPE_DECL_RE
            .captures(&clean)
            .ok_or_else(|| Error::parse(&path, "no class, interface, trait or enum declaration"))?;
        let whole = decl.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();
        let (decl_start, open_brace) = (whole.0, whole.1 - 1);

        let namespace = NAMESPACE_RE
            .captures(&clean[..decl_start])
            .map(|c| c[1].to_string());
        let mut class = PhpClass::new(path, namespace, &decl[3]);

        class.kind = TypeKind::from_keyword(&decl[2]).unwrap_or_default();
        let modifiers = &decl[1];
        class.is_abstract = modifiers.contains("abstract");
        class.is_final = modifiers.contains("final");

        let tail = &decl[4];
        if let Some(ext) = EXTENDS_RE.captures(tail) {
            let names = split_names(&ext[1]);
            if class.kind == TypeKind::Interface {
                class.interfaces.extend(names);
            } else {
                class.extends = names.into_iter().next();
            }
        }
        if let Some(imp) = IMPLEMENTS_RE.captures(tail) {
            class.interfaces.extend(split_names(&imp[1]));
        }

        class.imports = parse_imports_in(&clean[..decl_start]);
        class.attributes = parse_attributes(&clean[..decl_start]);

        let close_brace = matching_delimiter(&clean, open_brace).unwrap_or(clean.len());
        let body_start = open_brace + 1;
        let body = &clean[body_start..close_brace.max(body_start)];
        parse_members(&mut class, &clean, body, body_start);

        Ok(class)
    }
}

/// Namespace and name of the first type declaration, without the member scan
pub fn parse_header(source: &str) -> (Option<String>, Option<String>) {
    let clean = strip_comments(source);
    let decl = TYPE_DECL_RE.captures(&clean);
    let limit = decl
        .as_ref()
        .and_then(|d| d.get(0))
        .map_or(clean.len(), |m| m.start());
    let namespace = NAMESPACE_RE
        .captures(&clean[..limit])
        .map(|c| c[1].to_string());
    (namespace, decl.map(|d| d[3].to_string()))
}

/// File-level `use` imports of a whole source file
pub fn parse_imports(source: &str) -> Vec<UseImport> {
    let clean = strip_comments(source);
    let limit = TYPE_DECL_RE
        .find(&clean)
        .map_or(clean.len(), |m| m.start());
    parse_imports_in(&clean[..limit])
}

/// Namespace declared in a source file
pub fn parse_namespace(source: &str) -> Option<String> {
    parse_header(source).0
}

fn parse_imports_in(text: &str) -> Vec<UseImport> {
    let mut imports = Vec::new();
    for cap in USE_RE.captures_iter(text) {
        let clause = cap[1].trim();
        if clause.starts_with("function ") || clause.starts_with("const ") {
            continue;
        }
        if let (Some(open), Some(close)) = (clause.find('{'), clause.rfind('}')) {
            let prefix = clause[..open].trim().trim_end_matches('\\');
            for item in clause[open + 1..close].split(',') {
                if let Some(import) = parse_use_item(item) {
                    imports.push(UseImport {
                        name: format!("{}\\{}", prefix, import.name),
                        alias: import.alias,
                    });
                }
            }
        } else {
            imports.extend(clause.split(',').filter_map(parse_use_item));
        }
    }
    imports
}

fn parse_use_item(item: &str) -> Option<UseImport> {
    let parts: Vec<&str> = item.split_whitespace().collect();
    match parts.as_slice() {
        [name] => Some(UseImport::new(name)),
        [name, kw, alias] if kw.eq_ignore_ascii_case("as") => Some(UseImport::with_alias(name, alias)),
        _ => None,
    }
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `#[...]` attributes after the last statement before the declaration
fn parse_attributes(prefix: &str) -> Vec<Attribute> {
    let start = prefix.rfind(';').map_or(0, |i| i + 1);
    let segment = &prefix[start..];
    let mut attributes = Vec::new();
    let mut offset = 0;

    while let Some(rel) = segment[offset..].find("#[") {
        let bracket = offset + rel + 1;
        let Some(close) = matching_delimiter(segment, bracket) else {
            break;
        };
        for item in split_top_level(&segment[bracket + 1..close], b',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (name, arguments) = match item.find('(') {
                Some(paren) => {
                    let end = matching_delimiter(item, paren).unwrap_or(item.len());
                    (&item[..paren], item[paren + 1..end.max(paren + 1)].trim())
                }
                None => (item, ""),
            };
            attributes.push(Attribute {
                name: name.trim().trim_start_matches('\\').to_string(),
                arguments: arguments.to_string(),
            });
        }
        offset = close + 1;
    }

    attributes
}

fn parse_members(class: &mut PhpClass, clean: &str, body: &str, body_offset: usize) {
    let masked = mask_nested_blocks(body);

    for cap in TRAIT_USE_RE.captures_iter(&masked) {
        class.traits.extend(split_names(&cap[1]));
    }

    let mut param_ranges = Vec::new();
    for cap in METHOD_RE.captures_iter(&masked) {
        let Some(whole) = cap.get(0) else { continue };
        let paren_open = whole.end() - 1;
        let Some(paren_close) = matching_delimiter(&masked, paren_open) else {
            continue;
        };
        param_ranges.push((paren_open, paren_close));

        let modifiers = &cap[1];
        let mut method = Method::new(&cap[2]);
        method.visibility = modifiers
            .split_whitespace()
            .find_map(Visibility::from_keyword)
            .unwrap_or_default();
        method.is_static = modifiers.contains("static");
        method.is_abstract = modifiers.contains("abstract");
        method.parameters = parse_parameters(&body[paren_open + 1..paren_close]);
        method.line = line_of(clean, body_offset + whole.start());

        let after = &masked[paren_close + 1..];
        let stop = after.find(['{', ';']).unwrap_or(after.len());
        let return_type = after[..stop].trim().trim_start_matches(':').trim();
        if !return_type.is_empty() {
            method.return_type = Some(return_type.to_string());
        }

        if after[stop..].starts_with('{') {
            let open = paren_close + 1 + stop;
            let close = matching_delimiter(&masked, open).unwrap_or(body.len());
            method.body = Some(body[open + 1..close.max(open + 1)].to_string());
        }

        class.methods.push(method);
    }

    for cap in PROPERTY_RE.captures_iter(&masked) {
        let Some(whole) = cap.get(0) else { continue };
        let inside_params = param_ranges
            .iter()
            .any(|(open, close)| whole.start() > *open && whole.start() < *close);
        if inside_params {
            continue;
        }

        let modifiers = &cap[1];
        let default = cap.get(4).map(|eq| {
            let rest = &body[eq.end()..];
            let end = find_top_level(rest, ";").unwrap_or(rest.len());
            rest[..end].trim().to_string()
        });

        class.properties.push(Property {
            name: cap[3].to_string(),
            visibility: modifiers
                .split_whitespace()
                .find_map(Visibility::from_keyword)
                .unwrap_or_default(),
            is_static: modifiers.contains("static"),
            type_hint: cap.get(2).map(|t| t.as_str().to_string()),
            default,
        });
    }
}

/// Parse a parameter list (text between the parentheses)
pub fn parse_parameters(list: &str) -> Vec<Parameter> {
    split_top_level(list, b',')
        .into_iter()
        .filter_map(|item| parse_parameter(item.trim()))
        .collect()
}

fn parse_parameter(item: &str) -> Option<Parameter> {
    let mut rest = item;
    while rest.starts_with("#[") {
        let close = matching_delimiter(rest, 1)?;
        rest = rest[close + 1..].trim_start();
    }
    if rest.is_empty() {
        return None;
    }

    let (decl, default) = match find_top_level(rest, "=") {
        Some(idx) => (rest[..idx].trim(), Some(rest[idx + 1..].trim().to_string())),
        None => (rest.trim(), None),
    };

    let mut param = match PARAM_RE.captures(decl) {
        Some(cap) => Parameter {
            name: cap[5].to_string(),
            type_hint: cap.get(2).map(|t| t.as_str().to_string()),
            by_reference: cap.get(3).is_some(),
            variadic: cap.get(4).is_some(),
            promoted: cap[1].split_whitespace().find_map(|kw| match kw {
                "readonly" => None,
                other => Visibility::from_keyword(other),
            }),
            ..Default::default()
        },
        None => Parameter::new(&VARIABLE_RE.captures(decl)?[1]),
    };

    if param.promoted.is_none() && decl.starts_with("readonly ") {
        param.promoted = Some(Visibility::Public);
    }

    param.nullable = param.type_hint.as_deref().is_some_and(|t| {
        t.starts_with('?') || t.split('|').any(|part| part.eq_ignore_ascii_case("null"))
    }) || default
        .as_deref()
        .is_some_and(|d| d.eq_ignore_ascii_case("null"));
    param.has_default = default.is_some();
    param.default = default;

    Some(param)
}
