// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! utilkit: a kit of small single-purpose utilities
//!
//! Each subcommand parses its arguments, calls into the library, writes its
//! output and exits.

use clap::{Args, Parser, Subcommand};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use utilkit::config::{AppConfig, UrlCheckConfig};
use utilkit::history::{History, UndoOutcome};
use utilkit::index;
use utilkit::tools::audio::speaker::{self, SpeakOptions};
use utilkit::tools::files::duplicates::{self, DuplicateAction, KeepStrategy};
use utilkit::tools::files::hasher::{self, HashAlgorithm, HashOptions};
use utilkit::tools::files::rename::{self, CaseMode, CollisionStrategy, RenameOptions, SortKey};
use utilkit::tools::images::carve::{self, CarveOptions, EnergyMethod};
use utilkit::tools::images::dedupe::{self, DedupeOptions};
use utilkit::tools::images::perceptual::PerceptualAlgo;
use utilkit::tools::images::resize::{self, Resample};
use utilkit::tools::pdf::{text as pdf_text, toolbox};
use utilkit::tools::qr::generator::{self, ErrorCorrection, QrOptions};
use utilkit::tools::web::url_status::{self, UrlChecker};
use utilkit::walk::{FileFilter, WalkOptions};
use utilkit::{Result, UtilkitError};

/// utilkit CLI - small single-purpose utilities
#[derive(Parser, Debug)]
#[command(name = "utilkit")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Image, PDF, file, QR, web and speech utilities", long_about = None)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "utilkit.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Content-aware resize by removing low-energy seams
    Carve {
        /// Input image
        input: PathBuf,

        /// Output image (format from extension)
        output: PathBuf,

        /// Target width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Target height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Energy function
        #[arg(long, value_enum, default_value_t = EnergyMethod::Auto)]
        energy: EnergyMethod,
    },

    /// Resize an image with a resampling filter
    Resize {
        input: PathBuf,
        output: PathBuf,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        /// Derive a missing dimension from the aspect ratio
        #[arg(long)]
        keep_aspect: bool,

        /// Scale to fit inside width x height
        #[arg(long)]
        fit_within: bool,

        #[arg(long, value_enum, default_value_t = Resample::Lanczos)]
        resample: Resample,
    },

    /// Find exact and near-duplicate images
    ImgDedupe(ImgDedupeArgs),

    /// Hash files, write a manifest, or verify one
    Hash(HashArgs),

    /// Batch rename files
    Rename(RenameArgs),

    /// Find duplicate files by content
    Dupes(DupesArgs),

    /// PDF text and page tools
    Pdf {
        #[command(subcommand)]
        action: PdfCommands,
    },

    /// Generate a QR code
    Qr(QrArgs),

    /// Check HTTP status of URLs
    UrlCheck {
        /// URLs to check
        urls: Vec<String>,

        /// Files with one URL per line
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<f64>,

        /// Concurrent requests
        #[arg(long)]
        max_workers: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Speak text through the system TTS engine
    Speak {
        /// Text to speak
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// UTF-8 text file to speak
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(long)]
        voice: Option<String>,

        /// Words per minute
        #[arg(long)]
        rate: Option<u32>,

        /// Write a WAV/AIFF file instead of playing
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Engine binary to use instead of probing
        #[arg(long)]
        engine: Option<String>,
    },

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Tool index operations
    Index {
        #[command(subcommand)]
        action: IndexCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Args, Debug)]
struct ImgDedupeArgs {
    /// Image file or directory
    root: PathBuf,

    #[arg(short, long)]
    recursive: bool,

    #[arg(long)]
    follow_symlinks: bool,

    /// Glob of files to include (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Glob of files to exclude (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    #[arg(long, value_enum, default_value_t = PerceptualAlgo::Phash)]
    algo: PerceptualAlgo,

    /// Maximum Hamming distance for near duplicates
    #[arg(long, default_value = "8")]
    threshold: u32,

    /// Only byte-identical duplicates
    #[arg(long)]
    exact: bool,

    #[arg(long)]
    max_files: Option<usize>,

    /// Write a CSV report here
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print a JSON report
    #[arg(long)]
    json: bool,

    /// Move duplicates into this folder
    #[arg(long)]
    move_to: Option<PathBuf>,

    /// Delete duplicates
    #[arg(long)]
    delete: bool,

    /// Confirm move or delete
    #[arg(short, long)]
    yes: bool,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct HashArgs {
    /// File or directory to hash (base for verification)
    path: PathBuf,

    /// Digest algorithm (default from config)
    #[arg(short, long, value_enum)]
    algo: Option<HashAlgorithm>,

    #[arg(short, long)]
    recursive: bool,

    #[arg(long)]
    follow_symlinks: bool,

    #[arg(long)]
    include: Vec<String>,

    #[arg(long)]
    exclude: Vec<String>,

    /// Store paths relative to the base
    #[arg(long)]
    relative: bool,

    /// Hash with a worker pool
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    workers: Option<usize>,

    /// Write a text manifest here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print records as JSON
    #[arg(long)]
    json: bool,

    /// Verify this manifest instead of hashing
    #[arg(long, conflicts_with_all = ["output", "json"])]
    verify: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenameArgs {
    /// Directory whose files are renamed
    dir: PathBuf,

    #[arg(short, long)]
    recursive: bool,

    #[arg(long)]
    include: Vec<String>,

    #[arg(long)]
    exclude: Vec<String>,

    /// Only these extensions (repeatable)
    #[arg(long = "ext")]
    extensions: Vec<String>,

    #[arg(long, default_value = "")]
    prefix: String,

    #[arg(long, default_value = "")]
    suffix: String,

    /// Literal text to replace in the stem
    #[arg(long)]
    find: Option<String>,

    #[arg(long = "replace", default_value = "")]
    replace_with: String,

    /// Regex applied to the stem
    #[arg(long)]
    regex: Option<String>,

    /// Replacement for --regex (`\1` or `$1` backrefs)
    #[arg(long, default_value = "")]
    regex_repl: String,

    #[arg(long, value_enum)]
    case: Option<CaseMode>,

    /// Replace the extension
    #[arg(long)]
    new_ext: Option<String>,

    /// Tokens: {n} {stem} {ext} {parent} {date}
    #[arg(long)]
    template: Option<String>,

    #[arg(long)]
    enumerate: bool,

    #[arg(long, default_value = "1", allow_hyphen_values = true)]
    start: i64,

    #[arg(long, default_value = "2")]
    pad: usize,

    #[arg(long, value_enum, default_value_t = SortKey::Name)]
    sort: SortKey,

    #[arg(long, value_enum, default_value_t = CollisionStrategy::Number)]
    on_collision: CollisionStrategy,

    /// Keep characters Windows rejects
    #[arg(long)]
    no_sanitize: bool,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct DupesArgs {
    /// Directory to scan
    root: PathBuf,

    #[arg(short, long)]
    recursive: bool,

    /// Ignore files smaller than this many bytes
    #[arg(long, default_value = "1")]
    min_size: u64,

    #[arg(long, value_enum, default_value_t = KeepStrategy::First)]
    keep: KeepStrategy,

    #[arg(long, value_enum, default_value_t = DuplicateAction::Report)]
    action: DuplicateAction,

    #[arg(long)]
    move_to: Option<PathBuf>,

    /// Choose the kept file of each group on stdin
    #[arg(short, long)]
    interactive: bool,

    #[arg(long)]
    json: bool,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum PdfCommands {
    /// Extract text
    Text {
        input: PathBuf,

        /// Pages such as `1,3-5`
        #[arg(short, long)]
        pages: Option<String>,

        /// Trim whitespace around each page
        #[arg(long)]
        strip: bool,

        /// Printed between pages
        #[arg(long, default_value = "\n\n")]
        separator: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show page count and metadata
    Info {
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Concatenate PDFs
    Merge {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// One file per range, e.g. `1-3,7,10-`
    Split {
        input: PathBuf,

        #[arg(long)]
        ranges: String,

        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Pages in the ranges into one file
    Extract {
        input: PathBuf,

        #[arg(long)]
        ranges: String,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rotate pages by a multiple of 90 degrees
    Rotate {
        input: PathBuf,

        #[arg(long)]
        pages: String,

        #[arg(long, allow_hyphen_values = true)]
        angle: i64,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct QrArgs {
    /// Text or URL to encode
    #[arg(short, long, conflicts_with = "file")]
    data: Option<String>,

    /// UTF-8 file to encode
    #[arg(short, long)]
    file: Option<PathBuf>,

    #[arg(short, long, default_value = "qrcode.png")]
    output: PathBuf,

    /// Print a data URI instead of writing a file
    #[arg(long)]
    data_uri: bool,

    /// Symbol version 1-40 (auto when omitted)
    #[arg(long = "version", value_name = "N")]
    qr_version: Option<i16>,

    #[arg(long, value_enum, default_value_t = ErrorCorrection::M)]
    error_correction: ErrorCorrection,

    #[arg(long, default_value = "10")]
    box_size: u32,

    #[arg(long, default_value = "4")]
    border: u32,

    #[arg(long, default_value = "black")]
    fill: String,

    #[arg(long, default_value = "white")]
    back: String,
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent history entries
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Undo recent renames
    Undo {
        /// Number of renames to undo
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Confirm clearing
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum IndexCommands {
    /// Rescan the tool sources and rewrite the cache
    Build,

    /// List indexed tools
    List {
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "utilkit.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let loaded = AppConfig::load(&cli.config);

    // Initialize tracing
    let filter = if cli.trace {
        "trace".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else if cli.quiet {
        "warn".to_string()
    } else {
        loaded
            .as_ref()
            .map(|c| c.log_level.clone())
            .unwrap_or_else(|_| "info".to_string())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter.as_str())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match loaded {
        Ok(config) => run(&cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: AppConfig) -> Result<ExitCode> {
    let progress = !cli.quiet;

    match &cli.command {
        Commands::Carve { input, output, width, height, energy } => {
            let options = CarveOptions {
                width: *width,
                height: *height,
                energy: *energy,
                show_progress: progress,
            };
            let (w, h) = carve::carve_file(input, output, &options)?;
            println!("Saved {} ({}x{})", output.display(), w, h);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Resize { input, output, width, height, keep_aspect, fit_within, resample } => {
            let (w, h) = resize::resize_file(
                input,
                output,
                *width,
                *height,
                *keep_aspect,
                *fit_within,
                *resample,
            )?;
            println!("Saved {} ({}x{})", output.display(), w, h);
            Ok(ExitCode::SUCCESS)
        }
        Commands::ImgDedupe(args) => run_img_dedupe(args),
        Commands::Hash(args) => run_hash(args, &config, progress),
        Commands::Rename(args) => run_rename(args, &config),
        Commands::Dupes(args) => run_dupes(args),
        Commands::Pdf { action } => run_pdf_command(action),
        Commands::Qr(args) => run_qr(args),
        Commands::UrlCheck { urls, file, timeout, max_workers, json } => {
            let mut check_config: UrlCheckConfig = config.url_check.clone();
            if let Some(t) = timeout {
                check_config.timeout_secs = *t;
            }
            if let Some(w) = max_workers {
                check_config.max_workers = *w;
            }
            run_url_check(urls, file, &check_config, *json).await
        }
        Commands::Speak { text, file, voice, rate, output, engine } => {
            let stdin = if text.is_none() && file.is_none() { piped_stdin()? } else { None };
            let text = speaker::read_text(text.as_deref(), file.as_deref(), stdin)?;

            let mut options = SpeakOptions::from(&config.speech);
            options.engine = engine.clone().or(options.engine);
            options.voice = voice.clone().or(options.voice);
            options.rate = rate.or(options.rate);
            options.output = output.clone();

            let used = speaker::speak(&text, &options)?;
            info!("Speech engine: {}", used);
            Ok(ExitCode::SUCCESS)
        }
        Commands::History { action } => run_history_command(&config, action),
        Commands::Index { action } => run_index_command(&config, action),
        Commands::Config { action } => run_config_command(&config, action, &cli.config),
    }
}

/// Read stdin when something is piped in
fn piped_stdin() -> Result<Option<String>> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_img_dedupe(args: &ImgDedupeArgs) -> Result<ExitCode> {
    let options = DedupeOptions {
        filter: FileFilter::new(&args.include, &args.exclude, &[])?,
        walk: WalkOptions { recursive: args.recursive, follow_symlinks: args.follow_symlinks },
        algo: args.algo,
        threshold: args.threshold,
        exact: args.exact,
        max_files: args.max_files,
    };

    let images = dedupe::collect_images(&args.root, &options)?;
    let groups = dedupe::find_groups(&images, args.exact, args.threshold);
    let duplicate_count: usize = groups.iter().map(|g| g.duplicates.len()).sum();
    info!("Scanned {} images: {} groups, {} duplicates", images.len(), groups.len(), duplicate_count);

    if let Some(csv) = &args.csv {
        dedupe::write_report_csv(&groups, csv)?;
        info!("CSV report written to {}", csv.display());
    }
    if args.json {
        print_json(&dedupe::report_json(&groups))?;
    } else {
        for group in &groups {
            println!("{}", group.representative.path.display());
            for dup in &group.duplicates {
                println!("  = {} (distance <= {})", dup.path.display(), group.distance);
            }
        }
    }

    let handled = dedupe::act_on_duplicates(
        &groups,
        args.move_to.as_deref(),
        args.delete,
        args.yes,
        args.dry_run,
    )?;
    if handled > 0 {
        info!("Handled {} duplicates", handled);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_hash(args: &HashArgs, config: &AppConfig, progress: bool) -> Result<ExitCode> {
    if let Some(manifest) = &args.verify {
        let records = match hasher::read_manifest(manifest) {
            Ok(records) => records,
            Err(e) => {
                eprintln!("Error: {}", e);
                return Ok(ExitCode::from(2));
            }
        };
        let summary = hasher::verify_manifest(&records, &hasher::manifest_base(&args.path));
        println!(
            "OK: {}  Missing: {}  Mismatched: {}",
            summary.ok, summary.missing, summary.mismatched
        );
        return Ok(if summary.is_clean() { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let algorithm = match args.algo {
        Some(algo) => algo,
        None => config.hashing.algorithm.parse()?,
    };
    let options = HashOptions {
        algorithm,
        filter: FileFilter::new(&args.include, &args.exclude, &[])?,
        walk: WalkOptions { recursive: args.recursive, follow_symlinks: args.follow_symlinks },
        relative_paths: args.relative,
        parallel: args.parallel,
        workers: args.workers.unwrap_or(config.hashing.workers),
        show_progress: progress,
    };

    let records = hasher::generate_manifest(&args.path, &options)?;
    if let Some(output) = &args.output {
        hasher::write_manifest_text(&records, output)?;
        info!("Wrote {} entries to {}", records.len(), output.display());
    } else if args.json {
        print_json(&records)?;
    } else {
        for record in &records {
            println!("{}", hasher::format_record(record));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_rename(args: &RenameArgs, config: &AppConfig) -> Result<ExitCode> {
    let filter = match FileFilter::new(&args.include, &args.exclude, &args.extensions) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };
    let options = RenameOptions {
        recursive: args.recursive,
        filter,
        prefix: args.prefix.clone(),
        suffix: args.suffix.clone(),
        find: args.find.clone(),
        replace_with: args.replace_with.clone(),
        regex: args.regex.clone(),
        regex_repl: args.regex_repl.clone(),
        case: args.case,
        new_ext: args.new_ext.clone(),
        template: args.template.clone(),
        enumerate: args.enumerate,
        start: args.start,
        pad: args.pad,
        sort: args.sort,
        on_collision: args.on_collision,
        sanitize: !args.no_sanitize,
    };

    let (plans, warnings) = match rename::plan_renames(&args.dir, &options) {
        Ok(planned) => planned,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };
    for warning in &warnings {
        warn!("{}", warning);
    }

    let history = History::new(config.rename.history_path.clone());
    let mut summary = rename::execute_renames(&plans, args.dry_run, args.on_collision, Some(&history));
    summary.skipped += warnings.len();

    println!(
        "Changed: {}  Skipped: {}  Failed: {}",
        summary.changed, summary.skipped, summary.failed
    );
    Ok(if summary.failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn run_dupes(args: &DupesArgs) -> Result<ExitCode> {
    let groups = duplicates::find_duplicates(&args.root, args.recursive, args.min_size)?;

    if args.json {
        print_json(&duplicates::build_report(&groups))?;
    } else if groups.is_empty() {
        println!("No duplicates found");
    } else {
        let report = duplicates::build_report(&groups);
        println!(
            "{} groups, {} files, {} bytes reclaimable",
            report.groups, report.total_files, report.wasted_space
        );
        for group in &groups {
            println!("\n{} ({} bytes each)", group.hash, group.size);
            for file in &group.files {
                println!("  {}", file.display());
            }
        }
    }

    if args.action == DuplicateAction::Report {
        return Ok(ExitCode::SUCCESS);
    }

    let selections = if args.interactive {
        let stdin = std::io::stdin();
        duplicates::interactive_select(&groups, stdin.lock(), std::io::stdout())?
    } else {
        groups
            .iter()
            .map(|g| duplicates::select_by_strategy(g, args.keep))
            .collect()
    };

    let summary = duplicates::apply_action(&selections, args.action, args.move_to.as_deref(), args.dry_run)?;
    println!("Done: {}  Failed: {}", summary.done, summary.failed);
    Ok(if summary.failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn run_pdf_command(action: &PdfCommands) -> Result<ExitCode> {
    match action {
        PdfCommands::Text { input, pages, strip, separator, output } => {
            let selected = pages.as_deref().map(pdf_text::parse_page_ranges).transpose()?;
            let texts = match pdf_text::extract_pdf_text(input, selected.as_deref(), *strip) {
                Ok(texts) => texts,
                Err(e @ UtilkitError::NotFound(_)) => {
                    eprintln!("Error: {}", e);
                    return Ok(ExitCode::from(2));
                }
                Err(e) => return Err(e),
            };
            let joined = texts.join(separator);
            match output {
                Some(out) => {
                    write_text_file(out, &joined)?;
                    info!("Wrote {} pages of text to {}", texts.len(), out.display());
                }
                None => println!("{}", joined),
            }
        }
        PdfCommands::Info { input, json } => {
            let info = toolbox::pdf_info(input)?;
            if *json {
                print_json(&info)?;
            } else {
                println!("Pages: {}", info.page_count);
                for (label, value) in [("Title", &info.title), ("Author", &info.author), ("Subject", &info.subject)] {
                    if let Some(value) = value {
                        println!("{}: {}", label, value);
                    }
                }
            }
        }
        PdfCommands::Merge { inputs, output } => {
            let pages = toolbox::merge(inputs, output)?;
            println!("Merged {} files ({} pages) into {}", inputs.len(), pages, output.display());
        }
        PdfCommands::Split { input, ranges, out_dir } => {
            let written = toolbox::split(input, ranges, out_dir)?;
            for path in &written {
                println!("{}", path.display());
            }
        }
        PdfCommands::Extract { input, ranges, output } => {
            let pages = toolbox::extract(input, ranges, output)?;
            println!("Extracted {} pages into {}", pages, output.display());
        }
        PdfCommands::Rotate { input, pages, angle, output } => {
            let rotated = toolbox::rotate(input, pages, *angle, output)?;
            println!("Rotated {} pages into {}", rotated, output.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn write_text_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn run_qr(args: &QrArgs) -> Result<ExitCode> {
    let data = generator::read_data(args.data.as_deref(), args.file.as_deref())?;
    let options = QrOptions {
        version: args.qr_version,
        error_correction: args.error_correction,
        box_size: args.box_size,
        border: args.border,
        fill: args.fill.clone(),
        back: args.back.clone(),
    };

    if args.data_uri {
        println!("{}", generator::generate_qr_data_uri(&data, &options)?);
    } else {
        let (w, h) = generator::generate_qr_file(&data, &options, &args.output)?;
        println!("Saved {} ({}x{})", args.output.display(), w, h);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_url_check(
    urls: &[String],
    files: &[PathBuf],
    config: &UrlCheckConfig,
    json: bool,
) -> Result<ExitCode> {
    let stdin = piped_stdin()?;
    let urls = url_status::collect_urls(urls, files, stdin.as_deref())?;
    let checker = UrlChecker::new(config)?;

    let results = checker.check_all(&urls).await;
    if json {
        print_json(&results)?;
    } else {
        println!("{}", url_status::render_table(&results));
    }
    Ok(ExitCode::SUCCESS)
}

/// Run history commands
fn run_history_command(config: &AppConfig, action: &HistoryCommands) -> Result<ExitCode> {
    let history = History::new(config.rename.history_path.clone());

    match action {
        HistoryCommands::List { count } => {
            let entries = history.get_recent(*count)?;
            println!("Recent history ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                println!("  {} [{}] {} -> {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.tool,
                    entry.original_path.display(),
                    entry.new_path.display(),
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let results = history.undo(*count, *dry_run)?;
            if results.is_empty() {
                println!("No renames to undo");
            }
            let mut failed = 0;
            for (entry, outcome) in &results {
                let label = match outcome {
                    UndoOutcome::Undone => "Undone",
                    UndoOutcome::WouldUndo => "Would undo",
                    UndoOutcome::MissingTarget => "Missing",
                    UndoOutcome::OriginalOccupied => "Blocked",
                    UndoOutcome::Failed(_) => {
                        failed += 1;
                        "Failed"
                    }
                };
                println!("{}: {} -> {}", label, entry.new_path.display(), entry.original_path.display());
            }
            if failed > 0 {
                eprintln!("Error: {} of {} renames could not be undone", failed, results.len());
                return Ok(ExitCode::FAILURE);
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                return Err(UtilkitError::invalid("Use --force to confirm clearing history"));
            }
            history.clear()?;
            println!("History cleared");
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Run tool index commands
fn run_index_command(config: &AppConfig, action: &IndexCommands) -> Result<ExitCode> {
    match action {
        IndexCommands::Build => {
            let tools = index::rebuild(&config.index)?;
            println!("Indexed {} tools", tools.len());
            println!("\nCategories:");
            for (category, count) in index::category_counts(&tools) {
                println!("  {}: {} tools", category, count);
            }
        }
        IndexCommands::List { category, json } => {
            let tools = index::load_or_build(&config.index)?;
            let selected: Vec<_> = tools
                .iter()
                .filter(|t| category.as_deref().map_or(true, |c| t.category == c))
                .collect();
            if *json {
                print_json(&selected)?;
            } else {
                for tool in selected {
                    println!("{:<10} {:<14} {}", tool.category, tool.name, tool.short_description);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Run config commands
fn run_config_command(config: &AppConfig, action: &ConfigCommands, config_path: &Path) -> Result<ExitCode> {
    match action {
        ConfigCommands::Show => {
            print_json(config)?;
        }
        ConfigCommands::Generate { output, force } => {
            if output.exists() && !force {
                return Err(UtilkitError::Config(format!(
                    "{} already exists. Use --force to overwrite",
                    output.display()
                )));
            }
            AppConfig::default().save(output)?;
            println!("Generated config at {}", output.display());
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {} is valid", config_path.display());
            println!("  Hash algorithm: {}", config.hashing.algorithm);
            println!("  History: {}", config.rename.history_path.display());
            println!("  Web: {}:{}", config.web.host, config.web.port);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_hash_command() {
        let cli = Cli::try_parse_from([
            "utilkit", "hash", "./photos", "--algo", "blake3", "-r", "--output", "SUMS"
        ]).unwrap();

        match cli.command {
            Commands::Hash(args) => {
                assert_eq!(args.algo, Some(HashAlgorithm::Blake3));
                assert!(args.recursive);
                assert_eq!(args.output, Some(PathBuf::from("SUMS")));
            }
            _ => panic!("Expected Hash command"),
        }
    }

    #[test]
    fn test_cli_verify_conflicts_with_output() {
        let result = Cli::try_parse_from([
            "utilkit", "hash", ".", "--verify", "SUMS", "--output", "OTHER"
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_qr_version_flag() {
        let cli = Cli::try_parse_from(["utilkit", "qr", "--data", "hi", "--version", "3"]).unwrap();
        match cli.command {
            Commands::Qr(args) => assert_eq!(args.qr_version, Some(3)),
            _ => panic!("Expected Qr command"),
        }
    }

    #[test]
    fn test_cli_pdf_rotate_negative_angle() {
        let cli = Cli::try_parse_from([
            "utilkit", "pdf", "rotate", "in.pdf", "--pages", "1", "--angle", "-90", "-o", "out.pdf"
        ]).unwrap();
        match cli.command {
            Commands::Pdf { action: PdfCommands::Rotate { angle, .. } } => assert_eq!(angle, -90),
            _ => panic!("Expected pdf rotate"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["utilkit", "history", "list", "--quiet"]).unwrap();
        assert!(cli.quiet);
    }
}
