//! mdconv - Main Entry Point
//!
//! Converts Markdown files between GitHub, Habr and Dev.to dialects.

use clap::{ArgAction, Parser};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

use mdconv::config::{load_default_options, load_link_map, load_options};
use mdconv::error::{Error, Result};
use mdconv::{ConsoleLogger, Dialect, Logger, Processor, ProcessorOptions, TextFile};

/// Application name constant.
const APP_NAME: &str = "mdconv";

/// CLI flags
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Input files or directories (searched for *.md)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Dialect of the input (detected when omitted)
    #[arg(long)]
    input_dialect: Option<Dialect>,

    /// Dialect of the output (same as input when omitted)
    #[arg(long)]
    output_dialect: Option<Dialect>,

    /// 0 keeps line breaks, -1 joins paragraphs, N wraps at N columns
    #[arg(long, allow_hyphen_values = true)]
    lines_max_length: Option<i32>,

    /// Wrap the first image into a link to this URL
    #[arg(long)]
    header_image_link: Option<String>,

    /// Drop a leading level-1 heading
    #[arg(long, action = ArgAction::SetTrue)]
    remove_title_header: bool,

    /// Canonicalize heading and list marker spacing
    #[arg(long, action = ArgAction::SetTrue)]
    normalize: bool,

    /// Rewrite all line endings to the dominant one
    #[arg(long, action = ArgAction::SetTrue)]
    normalize_breaks: bool,

    /// Indentation unit for nested list items
    #[arg(long = "indent")]
    indent_string: Option<String>,

    /// Probe absolute links and verify anchors and local files
    #[arg(long, action = ArgAction::SetTrue)]
    check_links: bool,

    /// Drop collapsible sections
    #[arg(long, action = ArgAction::SetTrue)]
    remove_details: bool,

    /// Drop HTML comments
    #[arg(long, action = ArgAction::SetTrue)]
    remove_comments: bool,

    /// Base directory for local links (defaults to each input's directory)
    #[arg(long = "root-dir")]
    root_directory: Option<PathBuf>,

    /// Side file of `source  replacement` address pairs
    #[arg(long)]
    images_map: Option<PathBuf>,

    /// Load the images map produced by image-hash comparison
    #[arg(long, action = ArgAction::SetTrue)]
    compare_image_hashes: bool,

    /// Options file (JSON or TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file (single input) or directory
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Cli {
    /// Options file values overridden by explicit flags.
    fn options(&self) -> Result<ProcessorOptions> {
        let mut options = match &self.config {
            Some(path) => load_options(path)?,
            None => load_default_options(),
        };

        if self.input_dialect.is_some() {
            options.input_dialect = self.input_dialect;
        }
        if self.output_dialect.is_some() {
            options.output_dialect = self.output_dialect;
        }
        if let Some(length) = self.lines_max_length {
            options.lines_max_length = length;
        }
        if let Some(link) = &self.header_image_link {
            options.header_image_link = Some(link.clone());
        }
        if let Some(indent) = &self.indent_string {
            options.indent_string = indent.clone();
        }
        if let Some(root) = &self.root_directory {
            options.root_directory = Some(root.clone());
        }
        options.remove_title_header |= self.remove_title_header;
        options.normalize |= self.normalize;
        options.normalize_breaks |= self.normalize_breaks;
        options.check_links |= self.check_links;
        options.remove_details |= self.remove_details;
        options.remove_comments |= self.remove_comments;
        options.compare_image_hashes |= self.compare_image_hashes;

        if let Some(path) = &self.images_map {
            if !options.compare_image_hashes {
                warn!("--images-map given without --compare-image-hashes; loading it anyway");
            }
            options.images_map.extend(load_link_map(path)?);
        }

        options.sanitize();
        Ok(options)
    }
}

/// Expand directories into the Markdown files they contain.
fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        for entry in WalkDir::new(input)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_markdown = path
                .extension()
                .map_or(false, |e| e.to_string_lossy().eq_ignore_ascii_case("md"));
            if entry.file_type().is_file() && is_markdown && !is_converted(path) {
                files.push(path.to_path_buf());
            }
        }
    }
    files
}

/// Whether a file looks like our own output (`name.<dialect>.md`).
fn is_converted(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| Path::new(stem).extension())
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.parse::<Dialect>().is_ok())
}

/// `<stem>.<dialect>.md`, next to the input or inside `output_dir`.
fn output_path(input: &Path, dialect: Dialect, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = format!("{}.{}.md", stem, dialect.name());
    match output_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

fn convert_file(
    cli: &Cli,
    options: &ProcessorOptions,
    input: &Path,
    single: bool,
    logger: &dyn Logger,
) -> Result<()> {
    let text = fs::read_to_string(input)?;
    let file = TextFile::new(text).with_name(input.display().to_string());

    let mut options = options.clone();
    if options.root_directory.is_none() {
        options.root_directory = input.parent().map(Path::to_path_buf);
    }
    let dialect = options.output_dialect_for(options.input_dialect_for(file.data()));

    let converted = Processor::new(options, logger).process(file)?;

    let target = match &cli.output {
        Some(path) if single && !path.is_dir() => path.clone(),
        Some(dir) => output_path(input, dialect, Some(dir)),
        None => output_path(input, dialect, None),
    };
    fs::write(&target, converted).map_err(|e| Error::FileWrite {
        path: target.clone(),
        source: e,
    })?;
    info!("{} → {}", input.display(), target.display());
    Ok(())
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    info!("Starting {}", APP_NAME);

    let options = match cli.options() {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let inputs = collect_inputs(&cli.inputs);
    if inputs.is_empty() {
        warn!("No Markdown files found");
        return ExitCode::FAILURE;
    }

    let logger = ConsoleLogger::new();
    let single = inputs.len() == 1;
    let mut failed = 0;
    for input in &inputs {
        if let Err(e) = convert_file(&cli, &options, input, single, &logger) {
            error!("{}: {}", input.display(), e);
            failed += 1;
        }
    }

    info!(
        "Converted {} of {} files, {} diagnostics at error level",
        inputs.len() - failed,
        inputs.len(),
        logger.error_count()
    );
    if failed > 0 || logger.error_count() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
