//! Debit/credit assignment
//!
//! Once the cut-point is known, every raw row's amount lands in the debit
//! column when it sits left of the cut-point and in the credit column
//! otherwise.

use crate::amount::parse_amount;
use crate::calibrate::Calibration;
use crate::rows::RawRow;
use crate::Advisory;
use serde::Serialize;

/// A finished ledger row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalRow {
    #[serde(rename = "identifier_original")]
    pub identifier_raw: String,
    pub identifier_clean: String,
    pub description: String,
    /// `None` is a blank cell; zero amounts are blank in both columns
    pub debit: Option<f64>,
    pub credit: Option<f64>,
}

/// Rows produced by [`materialize`] plus what was dropped or degraded
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    pub rows: Vec<FinalRow>,
    /// Rows skipped because their identifier carried a skip marker
    pub excluded: usize,
    pub advisories: Vec<Advisory>,
}

fn non_zero(value: f64) -> Option<f64> {
    if value != 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Assign each row's amount to debit or credit, preserving row order
///
/// Rows whose raw identifier contains one of `skip_markers` are page footers
/// or date headers and are left out; empty markers match nothing. Amounts that
/// do not parse count as zero.
pub fn materialize(
    rows: &[RawRow],
    calibration: &Calibration,
    skip_markers: &[String],
) -> Materialized {
    let mut out = Materialized::default();

    for row in rows {
        if skip_markers
            .iter()
            .filter(|marker| !marker.is_empty())
            .any(|marker| row.identifier_raw.contains(marker.as_str()))
        {
            out.excluded += 1;
            continue;
        }

        let value = match parse_amount(&row.amount_text) {
            Some(v) => v,
            None => {
                log::warn!(
                    "page {}: amount {:?} for {:?} does not parse, using 0",
                    row.page,
                    row.amount_text,
                    row.identifier_raw
                );
                out.advisories.push(Advisory::UnparsableAmount {
                    page: row.page,
                    identifier: row.identifier_raw.clone(),
                    amount_text: row.amount_text.clone(),
                });
                0.0
            }
        };

        let (debit, credit) = if row.x < calibration.cut_point {
            (non_zero(value), None)
        } else {
            (None, non_zero(value))
        };

        out.rows.push(FinalRow {
            identifier_raw: row.identifier_raw.clone(),
            identifier_clean: row.identifier_clean.clone(),
            description: row.description.clone(),
            debit,
            credit,
        });
    }

    out
}
