//! Row classification
//!
//! A line is a data row when its last fragment is an amount. The first
//! fragment is the account identifier, whose leading digit hints at the side
//! of the ledger the amount belongs to. Those hints are only used to collect
//! position samples; the final debit/credit assignment happens after
//! calibration.

use crate::amount::is_amount;
use crate::extractor::Fragment;
use crate::lines::{reconstruct_lines, Line};
use serde::Serialize;

/// Ledger side suggested by an account code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Debit,
    Credit,
}

impl Side {
    /// Side implied by the first character of the trimmed identifier.
    ///
    /// Codes starting with 1, 5 or 6 are debit-side, 2, 3 or 4 credit-side.
    pub fn from_identifier(identifier: &str) -> Option<Side> {
        match identifier.trim().chars().next()? {
            '1' | '5' | '6' => Some(Side::Debit),
            '2' | '3' | '4' => Some(Side::Credit),
            _ => None,
        }
    }
}

/// A line that ends in an amount, before debit/credit assignment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRow {
    /// Page the row was found on (1-indexed)
    pub page: u32,
    pub identifier_raw: String,
    pub identifier_clean: String,
    pub description: String,
    pub amount_text: String,
    /// X position of the amount fragment
    pub x: f32,
}

/// Remove `-` and `,` from an identifier and trim it
pub fn clean_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && *c != ',')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Turn a line into a raw row, or `None` when it is not a data row
pub fn classify_line(line: &Line, page: u32) -> Option<RawRow> {
    let first = line.first()?;
    let last = line.last()?;

    if !is_amount(&last.text) {
        return None;
    }

    let description = line
        .middle()
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(RawRow {
        page,
        identifier_raw: first.text.clone(),
        identifier_clean: clean_identifier(&first.text),
        description,
        amount_text: last.text.clone(),
        x: last.x,
    })
}

/// Amount x positions observed for debit-side and credit-side identifiers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationPools {
    pub debit: Vec<f32>,
    pub credit: Vec<f32>,
}

impl CalibrationPools {
    pub fn record(&mut self, side: Side, x: f32) {
        match side {
            Side::Debit => self.debit.push(x),
            Side::Credit => self.credit.push(x),
        }
    }

    /// Both pools have at least one sample
    pub fn is_complete(&self) -> bool {
        !self.debit.is_empty() && !self.credit.is_empty()
    }
}

/// Document-wide state collected page by page
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    pub rows: Vec<RawRow>,
    pub pools: CalibrationPools,
    pub pages_scanned: u32,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the lines of one page and fold them into the accumulator
    pub fn scan_page(&mut self, page: u32, fragments: Vec<Fragment>, line_bucket: f32) {
        let lines = reconstruct_lines(fragments, line_bucket);
        let before = self.rows.len();

        for line in &lines {
            self.scan_line(line, page);
        }

        self.pages_scanned += 1;
        log::info!(
            "page {}: {} lines, {} data rows",
            page,
            lines.len(),
            self.rows.len() - before
        );
    }

    fn scan_line(&mut self, line: &Line, page: u32) {
        let Some(row) = classify_line(line, page) else {
            log::trace!("page {}: dropped non-data line {:?}", page, line.text());
            return;
        };

        let side = Side::from_identifier(&row.identifier_raw);
        if let Some(side) = side {
            self.pools.record(side, row.x);
        }
        log::debug!(
            "page {}: row {:?} amount {:?} at x={:.1} ({:?})",
            page,
            row.identifier_raw,
            row.amount_text,
            row.x,
            side
        );
        self.rows.push(row);
    }

    /// X positions of every collected row
    pub fn all_x(&self) -> Vec<f32> {
        self.rows.iter().map(|r| r.x).collect()
    }
}
