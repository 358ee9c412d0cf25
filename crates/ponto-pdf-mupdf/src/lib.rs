use std::path::Path;

use mupdf::{Document, TextPageFlags};

use ponto_core::{BackendError, TextBackend};

/// Horizontal gap, in multiples of the font size, that separates two table
/// columns. Rendered as a double space so the tokenizer can split on it.
const COLUMN_GAP_EM: f32 = 0.9;

/// Horizontal gap, in multiples of the font size, that is rendered as a
/// single word space when the PDF has no explicit space glyph.
const WORD_GAP_EM: f32 = 0.15;

/// Glyphs whose baselines differ by less than this fraction of the font size
/// belong to the same visual row.
const ROW_TOLERANCE_EM: f32 = 0.4;

/// MuPDF-based implementation of [`TextBackend`].
///
/// This crate is the sole AGPL island; it isolates the mupdf dependency
/// (which is AGPL-3.0) so that the parsing crates do not transitively
/// depend on it.
///
/// Timesheet tables are laid out in columns that MuPDF often reports as
/// separate blocks. Glyphs are therefore regrouped into visual rows by
/// baseline, and wide horizontal gaps between glyphs become double spaces.
#[derive(Debug, Default)]
pub struct MupdfBackend {
    /// Fraction of page height from bottom to exclude as footer (0.0–1.0).
    /// `None` (the default) keeps the whole page.
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height from top to exclude as header (0.0–1.0).
    /// `None` (the default) keeps the whole page.
    header_exclusion_ratio: Option<f32>,
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the footer exclusion ratio. Pass `0.0` to disable.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }

    /// Set the header exclusion ratio. Pass `0.0` to disable.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }

    /// Vertical band of a page spanning `y0..y1` that survives the exclusions.
    fn band(&self, y0: f32, y1: f32) -> Band {
        let height = y1 - y0;
        Band {
            top: self.header_exclusion_ratio.map(|r| y0 + height * r),
            bottom: self.footer_exclusion_ratio.map(|r| y1 - height * r),
        }
    }

    fn extract_document(&self, document: &Document) -> Result<Vec<String>, BackendError> {
        let mut pages_text = Vec::new();

        for page_result in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            let page_bounds = page
                .bounds()
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let band = self.band(page_bounds.y0, page_bounds.y1);

            let mut glyphs = Vec::new();
            for block in text_page.blocks() {
                let block_bounds = block.bounds();
                if !band.keeps(block_bounds.y0, block_bounds.y1) {
                    continue;
                }

                for line in block.lines() {
                    for c in line.chars() {
                        let quad = c.quad();
                        glyphs.push(Glyph {
                            ch: c.char().unwrap_or('\u{FFFD}'),
                            x0: quad.ul.x.min(quad.ll.x),
                            x1: quad.ur.x.max(quad.lr.x),
                            baseline: c.origin().y,
                            size: c.size(),
                        });
                    }
                }
            }
            pages_text.push(render_rows(glyphs));
        }

        tracing::debug!(pages = pages_text.len(), "mupdf extraction done");
        Ok(pages_text)
    }
}

impl TextBackend for MupdfBackend {
    fn extract_pages(&self, content: &[u8]) -> Result<Vec<String>, BackendError> {
        if content.is_empty() {
            return Err(BackendError::EmptyInput);
        }
        let document =
            Document::from_bytes(content, "pdf").map_err(|e| BackendError::OpenError(e.to_string()))?;
        self.extract_document(&document)
    }

    fn extract_pages_from_path(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;
        self.extract_document(&document)
    }
}

/// Thresholds for dropping blocks that sit entirely inside the excluded
/// header or footer strip.
#[derive(Debug, Clone, Copy)]
struct Band {
    top: Option<f32>,
    bottom: Option<f32>,
}

impl Band {
    fn keeps(&self, block_y0: f32, block_y1: f32) -> bool {
        !(self.top.is_some_and(|t| block_y1 <= t) || self.bottom.is_some_and(|t| block_y0 >= t))
    }
}

/// One positioned character.
#[derive(Debug, Clone, Copy)]
struct Glyph {
    ch: char,
    x0: f32,
    x1: f32,
    baseline: f32,
    size: f32,
}

#[derive(Debug)]
struct Row {
    baseline: f32,
    size: f32,
    glyphs: Vec<Glyph>,
}

impl Row {
    fn accepts(&self, g: &Glyph) -> bool {
        let size = self.size.max(g.size).max(1.0);
        (self.baseline - g.baseline).abs() < size * ROW_TOLERANCE_EM
    }
}

/// Group glyphs into rows by baseline (top to bottom) and render each row
/// left to right, turning wide gaps into column separators.
fn render_rows(glyphs: Vec<Glyph>) -> String {
    let mut rows: Vec<Row> = Vec::new();
    for g in glyphs {
        match rows.iter_mut().find(|r| r.accepts(&g)) {
            Some(row) => row.glyphs.push(g),
            None => rows.push(Row {
                baseline: g.baseline,
                size: g.size,
                glyphs: vec![g],
            }),
        }
    }
    rows.sort_by(|a, b| a.baseline.total_cmp(&b.baseline));

    let mut out = String::new();
    for mut row in rows {
        row.glyphs.sort_by(|a, b| a.x0.total_cmp(&b.x0));
        let mut line = String::new();
        let mut prev: Option<Glyph> = None;
        for g in row.glyphs {
            if let Some(p) = prev {
                let em = p.size.max(g.size).max(1.0);
                let gap = g.x0 - p.x1;
                if gap > em * COLUMN_GAP_EM {
                    line.push_str("  ");
                } else if gap > em * WORD_GAP_EM && !p.ch.is_whitespace() && !g.ch.is_whitespace()
                {
                    line.push(' ');
                }
            }
            line.push(g.ch);
            prev = Some(g);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
