//! Column calibration
//!
//! Debit and credit amounts sit in two horizontal bands whose positions vary
//! between issuers. The cut-point between them is the midpoint of the median
//! amount position of each pool.

use crate::rows::CalibrationPools;
use serde::Serialize;

/// How the cut-point was obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CalibrationMethod {
    /// Midpoint between the debit and credit pool medians
    TwoPool { debit_median: f32, credit_median: f32 },
    /// A pool was empty; median of every row's amount position
    GlobalMedian,
}

/// The horizontal split between debit and credit amounts
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    pub cut_point: f32,
    #[serde(flatten)]
    pub method: CalibrationMethod,
}

impl Calibration {
    pub fn is_degraded(&self) -> bool {
        self.method == CalibrationMethod::GlobalMedian
    }
}

/// Median of `values`; 0 for an empty slice
pub fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Compute the cut-point from the pools, or from `all_x` when a pool is empty
pub fn calibrate(pools: &CalibrationPools, all_x: &[f32]) -> Calibration {
    if !pools.is_complete() {
        log::warn!(
            "degraded calibration: {} debit / {} credit samples, splitting at global median",
            pools.debit.len(),
            pools.credit.len()
        );
        return Calibration {
            cut_point: median(all_x),
            method: CalibrationMethod::GlobalMedian,
        };
    }

    let debit_median = median(&pools.debit);
    let credit_median = median(&pools.credit);
    let cut_point = (debit_median + credit_median) / 2.0;
    log::info!("calibrated cut-point x={:.2}", cut_point);

    Calibration {
        cut_point,
        method: CalibrationMethod::TwoPool {
            debit_median,
            credit_median,
        },
    }
}
