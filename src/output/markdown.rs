// Human-document export

use crate::analysis::{Architecture, Component, ScanResult};
use crate::config::MarkdownOptions;
use crate::output::details::detail_rows;
use crate::output::diagrams::DiagramGenerator;
use crate::output::templates::slugify;

/// Title, then the optional blocks, then one section per non-empty kind.
/// An architecture with no components yields the title alone.
pub fn render(architecture: &Architecture, title: &str, options: &MarkdownOptions) -> String {
    let mut md = format!("# {}\n", title);
    if architecture.total() == 0 {
        return md;
    }

    if options.metadata {
        let meta = &architecture.metadata;
        md.push('\n');
        md.push_str(&format!("- **Project:** {}\n", meta.project));
        md.push_str(&format!("- **Root:** `{}`\n", meta.root));
        md.push_str(&format!("- **Generated:** {}\n", meta.generated_at));
        md.push_str(&format!("- **Generator:** {}\n", meta.generator));
    }

    if options.summary {
        md.push_str("\n## Summary\n\n| Kind | Count |\n|------|------:|\n");
        for result in architecture.non_empty() {
            md.push_str(&format!("| {} | {} |\n", result.kind.label(), result.count));
        }
        md.push_str(&format!("| **Total** | **{}** |\n", architecture.total()));
    }

    if options.toc {
        md.push_str("\n## Contents\n\n");
        for result in architecture.non_empty() {
            let heading = section_heading(result);
            md.push_str(&format!("- [{}](#{})\n", heading, slugify(&heading)));
        }
    }

    if options.diagram {
        if let Some(diagram) = DiagramGenerator::new().with_direction("LR").generate_flow_graph(architecture) {
            md.push_str("\n## Flow Diagram\n\n```mermaid\n");
            md.push_str(&diagram);
            md.push_str("\n```\n");
        }
    }

    for result in architecture.non_empty() {
        md.push_str(&format!("\n## {}\n", section_heading(result)));
        for component in &result.data {
            write_component(&mut md, component);
        }
    }
    md
}

fn section_heading(result: &ScanResult) -> String {
    format!("{} ({})", result.kind.label(), result.count)
}

fn write_component(md: &mut String, component: &Component) {
    md.push_str(&format!("\n### {}\n\n", component.short_name));
    md.push_str(&format!("- **Class:** `{}`\n", component.fq_name));
    if !component.namespace.is_empty() {
        md.push_str(&format!("- **Namespace:** `{}`\n", component.namespace));
    }
    if !component.file_path.is_empty() {
        md.push_str(&format!("- **File:** `{}`\n", component.file_path));
    }
    for detail in detail_rows(component) {
        md.push_str(&format!("- **{}:** {}\n", detail.label, escape_inline(&detail.value)));
    }
}

/// Keep values from breaking table or emphasis markup
fn escape_inline(value: &str) -> String {
    value.replace('|', "\\|").replace('*', "\\*").replace('_', "\\_")
}
