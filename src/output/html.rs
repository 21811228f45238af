// Hypertext export
//
// The built-in report and `.tera` templates go through Tera. Anything else
// is a simple template: `{{ $var }}` substitution plus
// `<!-- START:kind --> ... <!-- END:kind -->` blocks repeated per item.

use crate::analysis::{Architecture, ComponentKind};
use crate::error::{Error, Result};
use crate::output::templates::{html_escape, ItemView, ReportView, TemplateEngine, REPORT_TEMPLATE};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

static VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*\$(\w+)\s*\}\}").expect("valid template variable regex"));

static BLOCK_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--\s*START:([\w-]+)\s*-->").expect("valid block start regex"));

/// Renders the architecture to one HTML document
pub struct HtmlExporter {
    template: Option<PathBuf>,
}

impl HtmlExporter {
    pub fn new(template: Option<PathBuf>) -> Self {
        Self { template }
    }

    pub fn render(&self, architecture: &Architecture, title: &str) -> Result<String> {
        let view = ReportView::build(architecture, title);
        let Some(path) = &self.template else {
            return TemplateEngine::new()?.render_report(REPORT_TEMPLATE, &view);
        };

        if !path.is_file() {
            return Err(Error::TemplateNotFound(path.clone()));
        }
        let source = fs::read_to_string(path)?;
        if uses_engine_syntax(path, &source) {
            debug!(template = %path.display(), "rendering with tera");
            let mut engine = TemplateEngine::new()?;
            let name = engine.add_template_file(path)?;
            engine.render_report(&name, &view)
        } else {
            debug!(template = %path.display(), "rendering simple template");
            Ok(render_simple(&source, &view))
        }
    }
}

/// Tera by file suffix, or by a directive or comment tag in the body
pub fn uses_engine_syntax(path: &Path, source: &str) -> bool {
    let tera_suffix = path
        .file_name()
        .map(|n| n.to_string_lossy().ends_with(".tera"))
        .unwrap_or(false);
    tera_suffix || source.contains("{%") || source.contains("{#")
}

/// Substitute variables and expand section blocks
pub fn render_simple(source: &str, view: &ReportView) -> String {
    let globals = global_vars(view);
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = BLOCK_START_RE.captures(rest) {
        let (Some(whole), Some(name)) = (start.get(0), start.get(1)) else {
            break;
        };
        let end_marker = format!("<!-- END:{} -->", name.as_str());
        let body_start = whole.end();
        let Some(body_len) = rest[body_start..].find(&end_marker) else {
            // Unterminated block: emit the remainder as plain text
            break;
        };

        out.push_str(&substitute(&rest[..whole.start()], &globals, None));
        let body = &rest[body_start..body_start + body_len];
        if let Some(section) = section_items(view, name.as_str()) {
            for item in section {
                out.push_str(&substitute(body, &globals, Some(&item_vars(item))));
            }
        }
        rest = &rest[body_start + body_len + end_marker.len()..];
    }

    out.push_str(&substitute(rest, &globals, None));
    out
}

/// Items of the section a block names; kind names are accepted singular or plural
fn section_items<'a>(view: &'a ReportView, name: &str) -> Option<&'a [ItemView]> {
    let slug = name.parse::<ComponentKind>().ok()?.slug();
    view.section(slug).map(|s| s.items.as_slice())
}

fn substitute(text: &str, globals: &HashMap<String, String>, item: Option<&HashMap<String, String>>) -> String {
    VAR_RE
        .replace_all(text, |cap: &Captures| {
            let name = &cap[1];
            item.and_then(|vars| vars.get(name))
                .or_else(|| globals.get(name))
                .map(|value| html_escape(value))
                .unwrap_or_default()
        })
        .into_owned()
}

fn global_vars(view: &ReportView) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("title".to_string(), view.title.clone());
    vars.insert("project".to_string(), view.project.clone());
    vars.insert("generated_at".to_string(), view.generated_at.clone());
    vars.insert("root".to_string(), view.root.clone());
    vars.insert("generator".to_string(), view.generator.clone());
    vars.insert("total".to_string(), view.total.to_string());
    for kind in ComponentKind::ALL {
        let count = view.section(kind.slug()).map_or(0, |s| s.count);
        vars.insert(format!("{}_count", kind.slug()), count.to_string());
    }
    vars
}

fn item_vars(item: &ItemView) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("fq_name".to_string(), item.fq_name.clone());
    vars.insert("short_name".to_string(), item.short_name.clone());
    vars.insert("namespace".to_string(), item.namespace.clone());
    vars.insert("file_path".to_string(), item.file_path.clone());
    vars.insert("kind".to_string(), item.kind.clone());
    vars.insert("summary".to_string(), item.summary.clone());
    vars.insert("note".to_string(), item.note.clone());
    vars
}
