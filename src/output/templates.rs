// Template engine for the hypertext report

use crate::analysis::{Architecture, Component, ScanResult};
use crate::error::{Error, Result};
use crate::output::details::{detail_rows, summary, Detail};
use crate::output::diagrams::DiagramGenerator;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera, Value};

/// Name of the built-in report template
pub const REPORT_TEMPLATE: &str = "report.html";

/// Template engine wrapping Tera with custom filters and templates
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Engine with the embedded report template
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(REPORT_TEMPLATE, include_str!("../../templates/report.html.tera"))
            .map_err(|e| Error::template_render(REPORT_TEMPLATE, &e))?;
        register_filters(&mut tera);
        Ok(Self { tera })
    }

    /// Register a template file; returns the name to render it by
    pub fn add_template_file(&mut self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(Error::TemplateNotFound(path.to_path_buf()));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom.html".to_string());
        // Keep the `.html` suffix so Tera autoescapes the output
        let name = file_name
            .strip_suffix(".tera")
            .map(str::to_string)
            .unwrap_or(file_name);
        self.tera
            .add_template_file(path, Some(&name))
            .map_err(|e| Error::template_render(name.clone(), &e))?;
        Ok(name)
    }

    /// Render a template with context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(template_name, context)
            .map_err(|e| Error::template_render(template_name, &e))
    }

    /// Render a template against a report view
    pub fn render_report(&self, template_name: &str, view: &ReportView) -> Result<String> {
        let context = Context::from_serialize(view).map_err(|e| Error::template_render(template_name, &e))?;
        self.render(template_name, &context)
    }
}

fn register_filters(tera: &mut Tera) {
    tera.register_filter("truncate_words", truncate_words);
    tera.register_filter("pluralize", pluralize);
    tera.register_filter("slugify", slugify_filter);
}

/// Template-facing snapshot of an architecture
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub title: String,
    pub project: String,
    pub generated_at: String,
    pub root: String,
    pub generator: String,
    pub total: usize,
    pub sections: Vec<SectionView>,
    pub diagram: Option<String>,
}

/// One non-empty kind
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub slug: String,
    pub label: String,
    pub count: usize,
    pub items: Vec<ItemView>,
}

/// One component as templates see it
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub fq_name: String,
    pub short_name: String,
    pub namespace: String,
    pub file_path: String,
    pub kind: String,
    pub summary: String,
    pub note: String,
    pub details: Vec<Detail>,
}

impl ReportView {
    pub fn build(architecture: &Architecture, title: &str) -> Self {
        let meta = &architecture.metadata;
        Self {
            title: title.to_string(),
            project: meta.project.clone(),
            generated_at: meta.generated_at.clone(),
            root: meta.root.clone(),
            generator: meta.generator.clone(),
            total: architecture.total(),
            sections: architecture.non_empty().map(SectionView::from_result).collect(),
            diagram: DiagramGenerator::new().generate_flow_graph(architecture),
        }
    }

    /// Section for a kind slug, if it has components
    pub fn section(&self, slug: &str) -> Option<&SectionView> {
        self.sections.iter().find(|s| s.slug == slug)
    }
}

impl SectionView {
    fn from_result(result: &ScanResult) -> Self {
        Self {
            slug: result.kind.slug().to_string(),
            label: result.kind.label().to_string(),
            count: result.count,
            items: result.data.iter().map(ItemView::from_component).collect(),
        }
    }
}

impl ItemView {
    fn from_component(component: &Component) -> Self {
        Self {
            fq_name: component.fq_name.clone(),
            short_name: component.short_name.clone(),
            namespace: component.namespace.clone(),
            file_path: component.file_path.clone(),
            kind: component.kind.slug().to_string(),
            summary: summary(component),
            note: component.note.clone().unwrap_or_default(),
            details: detail_rows(component),
        }
    }
}

/// Truncate text to a number of words
fn truncate_words(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value.as_str().unwrap_or("");
    let max_words = args
        .get("count")
        .and_then(|v| v.as_u64())
        .unwrap_or(50) as usize;

    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() <= max_words {
        Ok(Value::String(s.to_string()))
    } else {
        let truncated: String = words[..max_words].join(" ");
        Ok(Value::String(format!("{}...", truncated)))
    }
}

/// Pluralize a word based on count
fn pluralize(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let count = value.as_u64().unwrap_or(0);
    let singular = args
        .get("singular")
        .and_then(|v| v.as_str())
        .unwrap_or("component");
    let default_plural = format!("{}s", singular);
    let plural = args
        .get("plural")
        .and_then(|v| v.as_str())
        .unwrap_or(&default_plural);

    if count == 1 {
        Ok(Value::String(format!("{} {}", count, singular)))
    } else {
        Ok(Value::String(format!("{} {}", count, plural)))
    }
}

fn slugify_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value.as_str().unwrap_or("");
    Ok(Value::String(slugify(s)))
}

/// Convert text to URL-friendly slug
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
