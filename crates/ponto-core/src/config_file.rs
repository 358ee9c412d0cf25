use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub parsing: Option<ParsingSection>,
    pub output: Option<OutputSection>,
    pub batch: Option<BatchSection>,
    pub logging: Option<LoggingSection>,
    pub pdf: Option<PdfSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingSection {
    pub title_phrase: Option<String>,
    pub employee_marker: Option<String>,
    pub period_marker: Option<String>,
    /// Replaces the built-in column-header exclusion terms.
    pub header_exclusions: Option<Vec<String>>,
    /// Appended to the built-in (or replaced) exclusion terms.
    pub extra_header_exclusions: Option<Vec<String>>,
    pub min_record_len: Option<usize>,
    /// Regex with named groups (`occurrence_type`, `hours`, ...) tried before positional mapping.
    pub record_pattern: Option<String>,
    /// `"from_start_date"` (default) or `"none"`.
    pub month_year: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    pub dir: Option<String>,
    /// Object-key prefix, e.g. `"processed/"`.
    pub prefix: Option<String>,
    pub pretty: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSection {
    pub num_workers: Option<usize>,
    pub max_archive_size_mb: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfSection {
    /// Fraction of page height from the top to drop (0.0 keeps everything).
    pub header_exclusion: Option<f32>,
    /// Fraction of page height from the bottom to drop (0.0 keeps everything).
    pub footer_exclusion: Option<f32>,
}

/// Platform config directory path: `<config_dir>/ponto/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ponto").join("config.toml"))
}

/// Load config by cascading CWD `.ponto.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".ponto.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

fn pick<S, T>(overlay: Option<&S>, base: Option<&S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay.and_then(&field).or_else(|| base.and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bp, op) = (base.parsing.as_ref(), overlay.parsing.as_ref());
    let (bo, oo) = (base.output.as_ref(), overlay.output.as_ref());
    let (bb, ob) = (base.batch.as_ref(), overlay.batch.as_ref());
    let (bl, ol) = (base.logging.as_ref(), overlay.logging.as_ref());
    let (bf, of) = (base.pdf.as_ref(), overlay.pdf.as_ref());

    ConfigFile {
        parsing: Some(ParsingSection {
            title_phrase: pick(op, bp, |p| p.title_phrase.clone()),
            employee_marker: pick(op, bp, |p| p.employee_marker.clone()),
            period_marker: pick(op, bp, |p| p.period_marker.clone()),
            header_exclusions: pick(op, bp, |p| p.header_exclusions.clone()),
            extra_header_exclusions: concat(
                bp.and_then(|p| p.extra_header_exclusions.clone()),
                op.and_then(|p| p.extra_header_exclusions.clone()),
            ),
            min_record_len: pick(op, bp, |p| p.min_record_len),
            record_pattern: pick(op, bp, |p| p.record_pattern.clone()),
            month_year: pick(op, bp, |p| p.month_year.clone()),
        }),
        output: Some(OutputSection {
            dir: pick(oo, bo, |o| o.dir.clone()),
            prefix: pick(oo, bo, |o| o.prefix.clone()),
            pretty: pick(oo, bo, |o| o.pretty),
        }),
        batch: Some(BatchSection {
            num_workers: pick(ob, bb, |b| b.num_workers),
            max_archive_size_mb: pick(ob, bb, |b| b.max_archive_size_mb),
        }),
        logging: Some(LoggingSection {
            level: pick(ol, bl, |l| l.level.clone()),
        }),
        pdf: Some(PdfSection {
            header_exclusion: pick(of, bf, |f| f.header_exclusion),
            footer_exclusion: pick(of, bf, |f| f.footer_exclusion),
        }),
    }
}

/// Additive lists: base entries first, then the overlay's.
fn concat(base: Option<Vec<String>>, overlay: Option<Vec<String>>) -> Option<Vec<String>> {
    match (base, overlay) {
        (Some(mut b), Some(o)) => {
            for term in o {
                if !b.contains(&term) {
                    b.push(term);
                }
            }
            Some(b)
        }
        (b, o) => b.or(o),
    }
}
