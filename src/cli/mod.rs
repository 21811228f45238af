//! CLI module for Surveyor

mod args;

pub use args::{Args, Command, TargetArgs};

use crate::analysis::{Architecture, ComponentKind, JsonAttributes, ScanOptions, ScanResult, Surveyor, Target};
use crate::config::{CliOverrides, Config, JsonOptions, Orientation};
use crate::error::{Error, Result};
use crate::output::{json, ExportFormat};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "surveyor.toml";

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Scan { target, json } => {
            init_logging(target.verbose);
            let scope: Target = target.target.parse()?;
            let cfg = load_config(&target, CliOverrides::default())?;
            let surveyor = build_surveyor(&target, cfg)?;
            let options = scan_options(&target);

            match scope {
                Target::Kind(kind) => {
                    let result = surveyor.scan(kind, &options)?;
                    if json {
                        print!("{}", json::to_string(&result, &JsonOptions::default())?);
                    } else {
                        print_result(&result);
                    }
                }
                Target::All => {
                    let architecture = surveyor.aggregate(Target::All, &options)?;
                    if json {
                        print!("{}", json::to_string(&architecture, &JsonOptions::default())?);
                    } else {
                        print_architecture(&architecture);
                    }
                }
            }
            Ok(())
        }

        Command::Export {
            target,
            format,
            output,
            template,
            title,
            paper,
            orientation,
            compact,
        } => {
            init_logging(target.verbose);
            let scope: Target = target.target.parse()?;
            let export_format: ExportFormat = format.parse()?;
            let orientation = orientation.map(|o| o.parse::<Orientation>()).transpose()?;
            if export_format == ExportFormat::Pdf && output.is_none() {
                return Err(Error::other("pdf output needs --output"));
            }

            let overrides = CliOverrides {
                title,
                template,
                paper,
                orientation,
                compact,
                ..Default::default()
            };
            let cfg = load_config(&target, overrides)?;
            let surveyor = build_surveyor(&target, cfg)?;
            let artifact = surveyor.export(scope, export_format.as_str(), &scan_options(&target))?;

            match output {
                Some(path) => {
                    artifact.write_to(&path)?;
                    println!("{} written to: {}", export_format, path.display());
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(artifact.content.as_bytes())?;
                    stdout.flush()?;
                }
            }
            Ok(())
        }

        Command::Kinds => {
            for kind in ComponentKind::ALL {
                println!("{:<14} {}", kind.slug(), kind.default_paths().join(", "));
            }
            Ok(())
        }

        Command::Version => {
            println!("surveyor {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Stderr logging, filtered by SURVEYOR_LOG or RUST_LOG
fn init_logging(verbose: bool) {
    let default = if verbose { "surveyor=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SURVEYOR_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Explicit config must load; the root's surveyor.toml is optional.
/// Target flags are merged on top of `overrides`.
fn load_config(target: &TargetArgs, overrides: CliOverrides) -> Result<Config> {
    let mut cfg = match &target.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&target.root.join(CONFIG_FILE)),
    };

    if cfg.project.name == "Untitled Project" || cfg.project.name.is_empty() {
        cfg.project.name = project_name(&target.root);
    }

    cfg.merge_cli(CliOverrides {
        exclude: target.exclude.clone(),
        no_recursive: target.no_recursive,
        ..overrides
    });
    cfg.validate()?;
    Ok(cfg)
}

fn project_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Project".to_string())
}

fn build_surveyor(target: &TargetArgs, cfg: Config) -> Result<Surveyor> {
    let mut surveyor = Surveyor::new(&target.root, cfg)?.with_verbose(target.verbose);
    if let Some(path) = &target.attributes {
        surveyor = surveyor.with_attributes(Box::new(JsonAttributes::load(path)?));
    }
    Ok(surveyor)
}

fn scan_options(target: &TargetArgs) -> ScanOptions {
    let mut options = ScanOptions::new();
    if !target.paths.is_empty() {
        options = options.with_paths(target.paths.clone());
    }
    if target.no_recursive {
        options = options.with_recursive(false);
    }
    options
}

fn print_result(result: &ScanResult) {
    println!("{} ({})", result.kind.label(), result.count);
    for component in &result.data {
        match &component.note {
            Some(note) => println!("  {}  {}  [{}]", component.fq_name, component.file_path, note),
            None => println!("  {}  {}", component.fq_name, component.file_path),
        }
    }
}

fn print_architecture(architecture: &Architecture) {
    println!("{} ({} components)", architecture.metadata.project, architecture.total());
    for result in architecture.non_empty() {
        println!();
        print_result(result);
    }
}
