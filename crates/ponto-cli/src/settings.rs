use std::path::PathBuf;

use ponto_core::config_file::ConfigFile;
use ponto_parsing::{ParsingConfig, ParsingConfigBuilder};
use ponto_pdf_mupdf::MupdfBackend;

/// Log directive used when neither `RUST_LOG`, `--log-level`, `PONTO_LOG`
/// nor the config file set one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Values given on the command line. `None`/`false` means "not given".
#[derive(Debug, Default)]
pub struct Flags {
    pub output_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub pretty: bool,
    pub workers: Option<usize>,
}

/// Batch settings after resolving flags > env > config file > defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    pub output_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub pretty: bool,
    pub workers: usize,
    /// Total extracted bytes allowed per archive (0 = unlimited).
    pub max_archive_bytes: u64,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl BatchSettings {
    /// `env` looks up an environment variable; pass `|k| std::env::var(k).ok()`.
    pub fn resolve(flags: Flags, env: impl Fn(&str) -> Option<String>, file: &ConfigFile) -> Self {
        let output = file.output.as_ref();
        let batch = file.batch.as_ref();

        let output_dir = flags
            .output_dir
            .or_else(|| env("PONTO_OUTPUT_DIR").map(PathBuf::from))
            .or_else(|| output.and_then(|o| o.dir.clone()).map(PathBuf::from));
        let prefix = flags.prefix.or_else(|| output.and_then(|o| o.prefix.clone()));
        let pretty = flags.pretty || output.and_then(|o| o.pretty).unwrap_or(false);
        let workers = flags
            .workers
            .or_else(|| env("PONTO_WORKERS").and_then(|v| v.parse().ok()))
            .or_else(|| batch.and_then(|b| b.num_workers))
            .unwrap_or_else(default_workers)
            .max(1);
        let max_archive_bytes = batch
            .and_then(|b| b.max_archive_size_mb)
            .map(|mb| u64::from(mb) * 1024 * 1024)
            .unwrap_or(0);

        Self {
            output_dir,
            prefix,
            pretty,
            workers,
            max_archive_bytes,
        }
    }
}

/// Default `EnvFilter` directive: `--log-level` > `PONTO_LOG` > config > `warn`.
/// `RUST_LOG`, when set, still wins over all of these.
pub fn log_directive(
    flag: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
    file: &ConfigFile,
) -> String {
    flag.map(str::to_string)
        .or_else(|| env("PONTO_LOG"))
        .or_else(|| file.logging.as_ref().and_then(|l| l.level.clone()))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Page strips the MuPDF backend drops, as fractions of page height.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageExclusions {
    pub header: f32,
    pub footer: f32,
}

impl PageExclusions {
    /// Read the `[pdf]` section; absent values keep the whole page.
    pub fn from_config(file: &ConfigFile) -> Self {
        let pdf = file.pdf.as_ref();
        let ratio = |v: Option<f32>| v.unwrap_or(0.0).clamp(0.0, 1.0);
        Self {
            header: ratio(pdf.and_then(|p| p.header_exclusion)),
            footer: ratio(pdf.and_then(|p| p.footer_exclusion)),
        }
    }

    pub fn backend(self) -> MupdfBackend {
        MupdfBackend::new()
            .with_header_exclusion(self.header)
            .with_footer_exclusion(self.footer)
    }
}

/// Build the parsing configuration from the `[parsing]` section, if any.
pub fn parsing_config(file: &ConfigFile) -> anyhow::Result<ParsingConfig> {
    let builder = match file.parsing {
        Some(ref section) => ParsingConfigBuilder::from_section(section)?,
        None => ParsingConfigBuilder::new(),
    };
    Ok(builder.build()?)
}
