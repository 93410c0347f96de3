//! Paperscope CLI - extract papers and score converted versions against them.

mod config;
mod loader;

use clap::{Parser, Subcommand};
use config::Config;
use loader::FsLoader;
use paperscope::{ConversionResult, Document, FidelityScorer, ParseOptions, latex};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "paperscope")]
#[command(author, version, about = "Structural extraction and fidelity scoring for academic papers", long_about = None)]
struct Cli {
    /// Configuration file (TOML with [scoring] and [parse] tables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace); RUST_LOG applies otherwise
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a converted document against its LaTeX source
    Score {
        /// LaTeX source of truth
        source: PathBuf,

        /// Converted document (use - for stdin)
        target: PathBuf,

        /// Target format (auto-detected from extension if not specified)
        #[arg(short = 'f', long)]
        target_format: Option<Format>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a LaTeX paper and print the document as JSON
    Extract {
        /// LaTeX source (use - for stdin)
        source: PathBuf,

        /// Keep citations and cross-references unresolved
        #[arg(long)]
        no_resolve: bool,
    },

    /// List readable formats
    Formats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum Format {
    Latex,
    Xml,
    Json,
}

impl Format {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "tex" | "latex" => Some(Format::Latex),
            "xml" => Some(Format::Xml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Format::Latex => "latex",
            Format::Xml => "xml",
            Format::Json => "json",
        }
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Latex => &["tex", "latex"],
            Format::Xml => &["xml"],
            Format::Json => &["json"],
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Format::Latex => "LaTeX paper source (source or target)",
            Format::Xml => "academic-paper XML (target)",
            Format::Json => "JSON document (target)",
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Score {
            source,
            target,
            target_format,
            json,
        } => {
            score(&config, &source, &target, target_format, json)?;
        }
        Commands::Extract { source, no_resolve } => {
            extract(&config, &source, no_resolve)?;
        }
        Commands::Formats => {
            list_formats();
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn score(
    config: &Config,
    source: &Path,
    target: &Path,
    format: Option<Format>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = format
        .or_else(|| {
            if target.as_os_str() == "-" {
                None
            } else {
                target
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(Format::from_extension)
            }
        })
        .ok_or("Cannot determine target format. Use --target-format to specify.")?;

    let source_doc = read_source(source, &config.parse, true)?;
    let target_doc = read_target(target, format, &config.parse)?;

    let report = FidelityScorer::with_policy(config.scoring).score(&source_doc, &target_doc);
    debug!(
        source = %source.display(),
        target = %target.display(),
        overall = report.overall_score,
        "scored"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn extract(
    config: &Config,
    source: &Path,
    no_resolve: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = read_source(source, &config.parse, !no_resolve)?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

/// Read a LaTeX file with its includes expanded, optionally resolving it.
fn read_source(
    path: &Path,
    options: &ParseOptions,
    resolve: bool,
) -> Result<Document, Box<dyn std::error::Error>> {
    let text = read_input(path)?;
    let loader = FsLoader::new(base_dir(path));
    let result = if resolve {
        paperscope::extract_with_includes(&text, &loader, options)?
    } else {
        latex::parse_with_includes(&text, &loader, options)?
    };
    Ok(report_issues(path, result))
}

fn read_target(
    path: &Path,
    format: Format,
    options: &ParseOptions,
) -> Result<Document, Box<dyn std::error::Error>> {
    let result = match format {
        Format::Latex => {
            let text = read_input(path)?;
            latex::parse_with_includes(&text, &FsLoader::new(base_dir(path)), options)?
        }
        Format::Xml | Format::Json => {
            let parser = paperscope::parser_for(format.name())
                .ok_or_else(|| format!("No reader for {} format", format.name()))?;
            parser.parse(read_input(path)?.as_bytes(), options)?
        }
    };
    Ok(report_issues(path, result))
}

fn read_input(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(path)
    }
}

fn base_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if path.as_os_str() != "-" && !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Print issues to stderr and keep the document.
fn report_issues(path: &Path, result: ConversionResult<Document>) -> Document {
    for issue in &result.issues {
        eprintln!("warning: {}: [{}] {}", path.display(), issue.severity, issue);
    }
    result.value
}

fn list_formats() {
    println!("Readable formats:\n");
    for format in [Format::Latex, Format::Xml, Format::Json] {
        println!(
            "  {:8} {:40} (.{})",
            format.name(),
            format.description(),
            format.extensions().join(", .")
        );
    }
}
