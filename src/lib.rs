//! Ledger row recovery from text-based PDF statements
//!
//! This crate provides:
//! - Positioned text extraction from PDF pages (lopdf)
//! - Line reconstruction from scattered text fragments
//! - Detection of data rows that end in a monetary amount
//! - Self-calibrating debit/credit column split from amount positions
//! - CSV export of the recovered rows

pub mod amount;
pub mod calibrate;
pub mod export;
pub mod extractor;
pub mod ledger;
pub mod lines;
pub mod rows;

pub use calibrate::{median, Calibration, CalibrationMethod};
pub use extractor::{extract_fragments, Fragment, FragmentSource, MemorySource, PdfSource};
pub use ledger::FinalRow;
pub use rows::{Accumulator, RawRow, Side};

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Options for statement parsing
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Height of the bucket used to snap fragments onto lines (must be > 0)
    pub line_bucket: f32,
    /// Rows whose identifier contains any of these are dropped from the output
    pub skip_markers: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            line_bucket: 3.0,
            skip_markers: vec!["Page".to_string(), "Fecha".to_string()],
        }
    }
}

/// Quality issue found while parsing; the output is still produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// A calibration pool was empty, so the split uses the global median
    DegradedCalibration {
        debit_samples: usize,
        credit_samples: usize,
    },
    /// An amount did not parse and was recorded as zero
    UnparsableAmount {
        page: u32,
        identifier: String,
        amount_text: String,
    },
    /// No line in the document ended in an amount
    NoDataRows,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::DegradedCalibration {
                debit_samples,
                credit_samples,
            } => write!(
                f,
                "degraded calibration ({} debit / {} credit samples), split at median of all amounts",
                debit_samples, credit_samples
            ),
            Advisory::UnparsableAmount {
                page,
                identifier,
                amount_text,
            } => write!(
                f,
                "page {}: amount '{}' of '{}' is not a number, recorded as blank",
                page, amount_text, identifier
            ),
            Advisory::NoDataRows => write!(f, "no data rows found"),
        }
    }
}

/// Result of parsing one statement
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub rows: Vec<FinalRow>,
    pub calibration: Calibration,
    pub advisories: Vec<Advisory>,
    pub page_count: u32,
    /// Lines that ended in an amount, before skip markers were applied
    pub raw_row_count: usize,
    /// Raw rows dropped by a skip marker
    pub excluded_row_count: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl Statement {
    /// Any advisory was raised, about the calibration or about single rows
    pub fn has_advisories(&self) -> bool {
        !self.advisories.is_empty()
    }

    /// Pretty-printed JSON of the whole statement
    pub fn to_json(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse pages that have already been extracted, in page order
pub fn parse_pages<I>(pages: I, options: &ParseOptions) -> Statement
where
    I: IntoIterator<Item = Vec<Fragment>>,
{
    let start = std::time::Instant::now();
    let mut acc = Accumulator::new();

    for (idx, fragments) in pages.into_iter().enumerate() {
        acc.scan_page(idx as u32 + 1, fragments, options.line_bucket);
    }

    finish(acc, options, start)
}

/// Parse every page of a fragment source
///
/// All pages are scanned before any row is assigned a side. The first page
/// that fails to extract aborts the document.
pub fn parse_source(
    source: &dyn FragmentSource,
    options: &ParseOptions,
) -> Result<Statement, LedgerError> {
    let start = std::time::Instant::now();
    let page_count = source.page_count();
    log::info!("parsing statement with {} pages", page_count);

    let mut acc = Accumulator::new();
    let mut fragment_count = 0usize;

    for page in 1..=page_count {
        let fragments = source.page_fragments(page)?;
        fragment_count += fragments.len();
        acc.scan_page(page, fragments, options.line_bucket);
    }

    if page_count > 0 && fragment_count == 0 {
        return Err(LedgerError::NoTextLayer);
    }

    Ok(finish(acc, options, start))
}

/// Calibrate once over the whole document, then assign sides
fn finish(acc: Accumulator, options: &ParseOptions, start: std::time::Instant) -> Statement {
    let mut advisories = Vec::new();

    if acc.rows.is_empty() {
        advisories.push(Advisory::NoDataRows);
    }
    if !acc.pools.is_complete() {
        advisories.push(Advisory::DegradedCalibration {
            debit_samples: acc.pools.debit.len(),
            credit_samples: acc.pools.credit.len(),
        });
    }

    let calibration = calibrate::calibrate(&acc.pools, &acc.all_x());
    let materialized = ledger::materialize(&acc.rows, &calibration, &options.skip_markers);
    advisories.extend(materialized.advisories);

    log::info!(
        "extracted {} rows ({} excluded) from {} pages",
        materialized.rows.len(),
        materialized.excluded,
        acc.pages_scanned
    );

    Statement {
        rows: materialized.rows,
        calibration,
        advisories,
        page_count: acc.pages_scanned,
        raw_row_count: acc.rows.len(),
        excluded_row_count: materialized.excluded,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }
}

/// Parse a PDF statement file with default options
pub fn process_statement<P: AsRef<Path>>(path: P) -> Result<Statement, LedgerError> {
    process_statement_with_options(path, &ParseOptions::default())
}

/// Parse a PDF statement file
pub fn process_statement_with_options<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> Result<Statement, LedgerError> {
    let source = PdfSource::load(path)?;
    parse_source(&source, options)
}

/// Parse a PDF statement from a memory buffer
pub fn process_statement_mem(
    buffer: &[u8],
    options: &ParseOptions,
) -> Result<Statement, LedgerError> {
    let source = PdfSource::load_mem(buffer)?;
    parse_source(&source, options)
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("PDF has no text layer (scanned document, OCR needed)")]
    NoTextLayer,
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for LedgerError {
    fn from(e: lopdf::Error) -> Self {
        LedgerError::Parse(e.to_string())
    }
}
