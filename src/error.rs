use std::path::PathBuf;
use thiserror::Error;

/// Surveyor error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Introspection failed for {class}: {message}")]
    Introspection { class: String, message: String },

    #[error("Unknown component kind: {0}")]
    UnknownKind(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing dependency: {dependency} ({hint})")]
    MissingDependency { dependency: String, hint: String },

    #[error("Template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("Failed to render template {template}: {message}")]
    TemplateRender { template: String, message: String },

    #[error("PDF rendering failed: {0}")]
    PdfRender(String),

    #[error("Route registry error: {0}")]
    Routes(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Surveyor operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an introspection error for one class
    pub fn introspection(class: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Introspection {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Create a missing dependency error
    pub fn missing_dependency(dependency: impl Into<String>, hint: impl Into<String>) -> Self {
        Error::MissingDependency {
            dependency: dependency.into(),
            hint: hint.into(),
        }
    }

    /// Wrap a tera failure, keeping the whole cause chain in the message.
    ///
    /// Tera reports the useful part (missing variable, bad filter) in the
    /// source errors rather than the top-level message.
    pub fn template_render(template: impl Into<String>, err: &tera::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Error::TemplateRender {
            template: template.into(),
            message,
        }
    }

    /// Create a route registry error
    pub fn routes(msg: impl Into<String>) -> Self {
        Error::Routes(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_path_not_found_display() {
        let err = Error::PathNotFound(PathBuf::from("/some/path"));
        assert_eq!(err.to_string(), "Path not found: /some/path");
    }

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse("/app/Models/User.php", "no class declaration");
        assert!(err.to_string().contains("/app/Models/User.php"));
        assert!(err.to_string().contains("no class declaration"));
    }

    #[test]
    fn test_unsupported_format_names_format() {
        let err = Error::UnsupportedFormat("yaml".to_string());
        assert_eq!(err.to_string(), "Unsupported export format: yaml");
    }

    #[test]
    fn test_missing_dependency_display() {
        let err = Error::missing_dependency("wkhtmltopdf", "install it or set export.pdf.binary");
        assert!(err.to_string().starts_with("Missing dependency: wkhtmltopdf"));
    }

    #[test]
    fn test_introspection_display() {
        let err = Error::introspection("App\\Models\\User", "file vanished");
        assert_eq!(
            err.to_string(),
            "Introspection failed for App\\Models\\User: file vanished"
        );
    }

    #[test]
    fn test_template_render_keeps_cause() {
        let mut tera = tera::Tera::default();
        tera.add_raw_template("t", "{{ missing.field }}").unwrap();
        let err = tera.render("t", &tera::Context::new()).unwrap_err();
        let wrapped = Error::template_render("t", &err);
        let text = wrapped.to_string();
        assert!(text.starts_with("Failed to render template t"));
        assert!(text.contains("missing"));
    }

    #[test]
    fn test_other_error() {
        let err = Error::other("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
