// Export pipeline
//
// Every exporter is a pure function of (Architecture, Config). The
// Exporter front picks one by format and wraps the result in an artifact.

pub mod details;
pub mod diagrams;
pub mod html;
pub mod json;
pub mod markdown;
pub mod pdf;
pub mod php;
pub mod templates;

pub use diagrams::DiagramGenerator;
pub use html::HtmlExporter;
pub use pdf::{PdfRenderer, WkhtmltopdfRenderer};
pub use templates::TemplateEngine;

use crate::analysis::Architecture;
use crate::config::Config;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Markdown,
    Html,
    Pdf,
    Php,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Json,
        ExportFormat::Markdown,
        ExportFormat::Html,
        ExportFormat::Pdf,
        ExportFormat::Php,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Php => "php",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Html => "text/html",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Php => "application/x-php",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Php => "php",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "html" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            "php" | "source" => Ok(ExportFormat::Php),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Rendered bytes of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactContent {
    Text(String),
    Binary(Vec<u8>),
}

impl ArtifactContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ArtifactContent::Text(text) => text.as_bytes(),
            ArtifactContent::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One exported document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub content: ArtifactContent,
    pub mime_type: String,
    pub extension: String,
}

impl ExportArtifact {
    pub fn text(format: ExportFormat, text: String) -> Self {
        Self::new(format, ArtifactContent::Text(text))
    }

    pub fn binary(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self::new(format, ArtifactContent::Binary(bytes))
    }

    fn new(format: ExportFormat, content: ArtifactContent) -> Self {
        Self {
            format,
            content,
            mime_type: format.mime_type().to_string(),
            extension: format.extension().to_string(),
        }
    }

    /// Text content, `None` for binary artifacts
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            ArtifactContent::Text(text) => Some(text),
            ArtifactContent::Binary(_) => None,
        }
    }

    /// Write the artifact, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.content.as_bytes())?;
        info!(path = %path.display(), bytes = self.content.len(), "artifact written");
        Ok(())
    }
}

/// Format dispatcher over the individual exporters
pub struct Exporter {
    config: Config,
    pdf: Box<dyn PdfRenderer>,
}

impl Exporter {
    pub fn new(config: Config) -> Self {
        let pdf = WkhtmltopdfRenderer::new(config.export.pdf.binary.clone());
        Self {
            config,
            pdf: Box::new(pdf),
        }
    }

    pub fn with_pdf_renderer(mut self, renderer: Box<dyn PdfRenderer>) -> Self {
        self.pdf = renderer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fails when a collaborator the format needs is absent
    pub fn check_available(&self, format: ExportFormat) -> Result<()> {
        if format == ExportFormat::Pdf && !self.pdf.is_available() {
            return Err(Error::missing_dependency(
                self.pdf.name(),
                "install it or set export.pdf.binary in the config",
            ));
        }
        Ok(())
    }

    pub fn export(&self, architecture: &Architecture, format: ExportFormat) -> Result<ExportArtifact> {
        self.check_available(format)?;

        let artifact = match format {
            ExportFormat::Json => {
                ExportArtifact::text(format, json::render(architecture, &self.config.export.json)?)
            }
            ExportFormat::Markdown => ExportArtifact::text(
                format,
                markdown::render(architecture, &self.title(architecture), &self.config.export.markdown),
            ),
            ExportFormat::Html => {
                let exporter = HtmlExporter::new(self.config.export.html.template.clone());
                ExportArtifact::text(format, exporter.render(architecture, &self.title(architecture))?)
            }
            ExportFormat::Pdf => {
                let options = &self.config.export.pdf;
                let exporter = HtmlExporter::new(options.template.clone());
                let markup = exporter.render(architecture, &self.title(architecture))?;
                let markup = pdf::prepare_markup(&markup, options);
                ExportArtifact::binary(format, self.pdf.render(&markup, options)?)
            }
            ExportFormat::Php => ExportArtifact::text(format, php::render(architecture, &self.config)),
        };

        info!(
            format = %format,
            bytes = artifact.content.len(),
            "export rendered"
        );
        Ok(artifact)
    }

    /// Configured title, else the project name
    pub fn title(&self, architecture: &Architecture) -> String {
        self.config
            .export
            .title
            .clone()
            .unwrap_or_else(|| format!("{} Architecture", architecture.metadata.project))
    }
}
