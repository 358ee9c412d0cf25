use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ponto_core::config_file::{ConfigFile, load_config};
use ponto_core::{PlainTextBackend, TextBackend};
use ponto_ingest::{DirectorySink, LocalSource, PdfSource};
use ponto_parsing::TimesheetExtractor;
use tracing_subscriber::EnvFilter;

mod batch;
mod output;
mod settings;

use output::ColorMode;
use settings::{BatchSettings, Flags, PageExclusions};

/// Timesheet parser - Convert "espelho de ponto" PDFs into structured JSON
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Default log filter when RUST_LOG is unset (e.g. "info", "ponto_parsing=debug")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse one timesheet and print its JSON document
    Parse {
        /// Path to the PDF (or pre-extracted .txt) file
        file_path: PathBuf,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,

        /// Treat the input as pre-extracted UTF-8 text (form feeds separate pages)
        #[arg(long)]
        text: bool,
    },

    /// Parse every PDF in a directory or archive and write one JSON per file
    Batch {
        /// Directory, .zip, .tar.gz/.tgz archive, or single PDF
        input: PathBuf,

        /// Output directory (default: PONTO_OUTPUT_DIR or [output].dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Number of files parsed concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// Key prefix for every output file, e.g. "processed/"
        #[arg(long)]
        prefix: Option<String>,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Show how each line is classified without writing any JSON
    DryRun {
        /// Path to the PDF (or pre-extracted .txt) file
        file_path: PathBuf,

        /// Treat the input as pre-extracted UTF-8 text
        #[arg(long)]
        text: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(default_directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let file_config = load_config();
    init_tracing(&settings::log_directive(
        cli.log_level.as_deref(),
        env_var,
        &file_config,
    ));
    let extractor = TimesheetExtractor::with_config(settings::parsing_config(&file_config)?);
    let exclusions = PageExclusions::from_config(&file_config);

    match cli.command {
        Command::Parse {
            file_path,
            output,
            pretty,
            text,
        } => {
            let backend = backend_for(&file_path, text, exclusions);
            parse(&extractor, backend.as_ref(), &file_path, output, pretty)
        }
        Command::Batch {
            input,
            out_dir,
            workers,
            prefix,
            pretty,
            no_color,
        } => {
            let flags = Flags {
                output_dir: out_dir,
                prefix,
                pretty,
                workers,
            };
            let backend = Arc::new(exclusions.backend());
            batch(extractor, backend, input, flags, &file_config, ColorMode(!no_color)).await
        }
        Command::DryRun {
            file_path,
            text,
            no_color,
            output,
        } => {
            let backend = backend_for(&file_path, text, exclusions);
            dry_run(&extractor, backend.as_ref(), &file_path, no_color, output)
        }
    }
}

/// Plain-text backend for `--text` or a `.txt` extension, MuPDF otherwise.
fn backend_for(path: &Path, force_text: bool, exclusions: PageExclusions) -> Box<dyn TextBackend> {
    let is_text = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    if force_text || is_text {
        Box::new(PlainTextBackend)
    } else {
        Box::new(exclusions.backend())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn writer_for(output: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    })
}

fn parse(
    extractor: &TimesheetExtractor,
    backend: &dyn TextBackend,
    file_path: &Path,
    output: Option<PathBuf>,
    pretty: bool,
) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let outcome = extractor.parse_path(file_path, backend);
    for d in &outcome.diagnostics {
        tracing::warn!(file = %file_path.display(), "{d}");
    }

    let document = outcome.document;
    let json = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    let mut writer = writer_for(output.as_deref())?;
    writeln!(writer, "{json}")?;
    writer.flush()?;

    if document.is_error() {
        anyhow::bail!(
            "{}: {}",
            file_name(file_path),
            document.message.as_deref().unwrap_or("could not be parsed")
        );
    }
    Ok(())
}

async fn batch(
    extractor: TimesheetExtractor,
    backend: Arc<dyn TextBackend>,
    input: PathBuf,
    flags: Flags,
    file_config: &ConfigFile,
    color: ColorMode,
) -> anyhow::Result<()> {
    let settings = BatchSettings::resolve(flags, env_var, file_config);
    let Some(out_dir) = settings.output_dir.clone() else {
        anyhow::bail!(
            "No output directory. Pass --out-dir, set PONTO_OUTPUT_DIR, or set [output].dir in the config file"
        );
    };
    if !input.exists() {
        anyhow::bail!("Input not found: {}", input.display());
    }

    let source = LocalSource::from_path(&input, settings.max_archive_bytes);
    let fetched = tokio::task::spawn_blocking(move || source.fetch()).await??;
    for warning in &fetched.warnings {
        tracing::warn!(input = %input.display(), "{warning}");
    }
    tracing::info!(
        files = fetched.pdfs.len(),
        workers = settings.workers,
        out_dir = %out_dir.display(),
        "starting batch"
    );

    let sink = DirectorySink::new(out_dir).pretty(settings.pretty);
    let mut tally = batch::run_batch(
        fetched.pdfs,
        Arc::new(extractor),
        backend,
        Arc::new(sink),
        settings.prefix.clone(),
        settings.workers,
    )
    .await?;
    tally.warnings = fetched.warnings.len();

    let mut stdout = std::io::stdout();
    output::print_batch_summary(&mut stdout, &tally, color)?;

    if tally.failed() > 0 {
        anyhow::bail!("{} file(s) could not be written", tally.failed());
    }
    Ok(())
}

fn dry_run(
    extractor: &TimesheetExtractor,
    backend: &dyn TextBackend,
    file_path: &Path,
    no_color: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let color = ColorMode(!no_color && output.is_none());
    let mut writer = writer_for(output.as_deref())?;

    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let pages = backend.extract_pages_from_path(file_path)?;
    let lines = extractor.split_lines(&pages.join("\n"));
    let aggregation = extractor.aggregate_days(&lines);
    let outcome = extractor.parse_pages(&pages);

    output::print_dry_run(
        &mut writer,
        &file_name(file_path),
        &lines,
        &aggregation.kinds,
        &outcome.document,
        &outcome.diagnostics,
        color,
    )?;
    Ok(())
}
