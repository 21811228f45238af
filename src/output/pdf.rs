// Printable export
//
// The HTML report is handed to an external renderer. The default renderer
// pipes markup through wkhtmltopdf on stdin and reads the PDF from stdout.

use crate::config::PdfOptions;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

static REMOTE_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s(?:src|href)\s*=\s*(?:"(?:https?:)?//[^"]*"|'(?:https?:)?//[^']*')"#)
        .expect("valid remote attribute regex")
});

/// Turns HTML into PDF bytes
pub trait PdfRenderer {
    /// Name reported when the renderer is missing
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    fn render(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>>;
}

/// wkhtmltopdf, from the configured path or the first match on PATH
#[derive(Debug, Clone, Default)]
pub struct WkhtmltopdfRenderer {
    binary: Option<PathBuf>,
}

const BINARY_NAME: &str = "wkhtmltopdf";

impl WkhtmltopdfRenderer {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    /// Resolved executable, if any
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(binary) = &self.binary {
            return binary.is_file().then(|| binary.clone());
        }
        let path = env::var_os("PATH")?;
        env::split_paths(&path).find_map(|dir| {
            let candidate = dir.join(BINARY_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            let exe = dir.join(format!("{}.exe", BINARY_NAME));
            exe.is_file().then_some(exe)
        })
    }
}

impl PdfRenderer for WkhtmltopdfRenderer {
    fn name(&self) -> &str {
        BINARY_NAME
    }

    fn is_available(&self) -> bool {
        self.locate().is_some()
    }

    fn render(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>> {
        let binary = self
            .locate()
            .ok_or_else(|| Error::missing_dependency(BINARY_NAME, "not found on PATH"))?;
        debug!(binary = %binary.display(), paper = %options.paper, "rendering pdf");

        let size = page_size(&options.paper);
        let mut command = Command::new(&binary);
        command
            .arg("--quiet")
            .args(["--page-size", size.as_str()])
            .args(["--orientation", options.orientation.as_str()])
            .args(["--encoding", "utf-8"]);
        if !options.allow_remote {
            command.arg("--disable-external-links");
        }
        let mut child = command
            .args(["-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::PdfRender("renderer stdin unavailable".to_string()))?;
        let input = html.to_string();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        let fed = writer.join();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = %output.status, "pdf renderer failed");
            return Err(Error::PdfRender(if stderr.is_empty() {
                format!("{} exited with {}", BINARY_NAME, output.status)
            } else {
                stderr
            }));
        }
        match fed {
            Ok(result) => result?,
            Err(_) => return Err(Error::PdfRender("failed to feed renderer".to_string())),
        }
        Ok(output.stdout)
    }
}

/// wkhtmltopdf page size spelling: `a4` -> `A4`, `letter` -> `Letter`
fn page_size(paper: &str) -> String {
    let mut chars = paper.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => "A4".to_string(),
    }
}

/// Inject the font and drop remote resources unless allowed
pub fn prepare_markup(html: &str, options: &PdfOptions) -> String {
    let style = format!(
        "<style>body {{ font-family: \"{}\", sans-serif; }}</style>",
        options.font.replace('"', "")
    );
    let mut markup = match html.find("</head>") {
        Some(idx) => format!("{}{}{}", &html[..idx], style, &html[idx..]),
        None => format!("{}{}", style, html),
    };
    if !options.allow_remote {
        markup = REMOTE_ATTR_RE.replace_all(&markup, "").into_owned();
    }
    markup
}
