//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Map the architecture of Laravel applications
#[derive(Parser, Debug)]
#[command(name = "surveyor")]
#[command(about = "Map the architecture of Laravel applications")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Options shared by `scan` and `export`
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Component kind (models, routes, jobs, ...) or "all"
    pub target: String,

    /// Application root
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Directory to scan instead of the kind's defaults (can be repeated)
    #[arg(short, long = "path")]
    pub paths: Vec<PathBuf>,

    /// Only scan the top level of each directory
    #[arg(long)]
    pub no_recursive: bool,

    /// Glob patterns to exclude (can be repeated)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Config file path (defaults to surveyor.toml in the root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON file of per-class attribute overrides
    #[arg(long)]
    pub attributes: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover components and print them
    Scan {
        #[command(flatten)]
        target: TargetArgs,

        /// Print the raw scan result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Discover components and render them to a document
    Export {
        #[command(flatten)]
        target: TargetArgs,

        /// Output format (json, markdown, html, pdf, php)
        #[arg(short, long)]
        format: String,

        /// Output file (stdout when omitted, text formats only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Template for html and pdf output
        #[arg(long)]
        template: Option<PathBuf>,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// PDF paper size
        #[arg(long)]
        paper: Option<String>,

        /// PDF orientation (portrait, landscape)
        #[arg(long)]
        orientation: Option<String>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// List the component kinds and their default directories
    Kinds,

    /// Show version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_defaults() {
        let args = Args::try_parse_from(["surveyor", "scan", "models"]).unwrap();
        match args.command {
            Command::Scan { target, json } => {
                assert_eq!(target.target, "models");
                assert_eq!(target.root, PathBuf::from("."));
                assert!(target.paths.is_empty());
                assert!(!target.no_recursive);
                assert!(target.config.is_none());
                assert!(!json);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_scan_with_options() {
        let args = Args::try_parse_from([
            "surveyor", "scan", "all",
            "--root", "/srv/app",
            "--path", "app/Domain",
            "--path", "app/Legacy",
            "--no-recursive",
            "--exclude", "app/Legacy/Old/**",
            "--config", "custom.toml",
            "--attributes", "attrs.json",
            "--json",
            "--verbose",
        ])
        .unwrap();

        match args.command {
            Command::Scan { target, json } => {
                assert_eq!(target.target, "all");
                assert_eq!(target.root, PathBuf::from("/srv/app"));
                assert_eq!(target.paths, vec![PathBuf::from("app/Domain"), PathBuf::from("app/Legacy")]);
                assert!(target.no_recursive);
                assert_eq!(target.exclude, vec!["app/Legacy/Old/**".to_string()]);
                assert_eq!(target.config, Some(PathBuf::from("custom.toml")));
                assert_eq!(target.attributes, Some(PathBuf::from("attrs.json")));
                assert!(json);
                assert!(target.verbose);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_export_options() {
        let args = Args::try_parse_from([
            "surveyor", "export", "all",
            "--format", "pdf",
            "--output", "out/arch.pdf",
            "--template", "report.html",
            "--title", "Shop",
            "--paper", "letter",
            "--orientation", "landscape",
        ])
        .unwrap();

        match args.command {
            Command::Export { target, format, output, template, title, paper, orientation, compact } => {
                assert_eq!(target.target, "all");
                assert_eq!(format, "pdf");
                assert_eq!(output, Some(PathBuf::from("out/arch.pdf")));
                assert_eq!(template, Some(PathBuf::from("report.html")));
                assert_eq!(title.as_deref(), Some("Shop"));
                assert_eq!(paper.as_deref(), Some("letter"));
                assert_eq!(orientation.as_deref(), Some("landscape"));
                assert!(!compact);
            }
            _ => panic!("Expected Export command"),
        }
    }

    #[test]
    fn test_export_requires_format() {
        assert!(Args::try_parse_from(["surveyor", "export", "models"]).is_err());
    }

    #[test]
    fn test_scan_requires_target() {
        assert!(Args::try_parse_from(["surveyor", "scan"]).is_err());
    }

    #[test]
    fn test_simple_commands() {
        let args = Args::try_parse_from(["surveyor", "version"]).unwrap();
        assert!(matches!(args.command, Command::Version));
        let args = Args::try_parse_from(["surveyor", "kinds"]).unwrap();
        assert!(matches!(args.command, Command::Kinds));
    }
}
