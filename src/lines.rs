//! Line reconstruction
//!
//! Groups the fragments of one page into visual rows by bucketing their
//! vertical position, then orders rows top to bottom and fragments left to
//! right.

use crate::extractor::Fragment;
use std::collections::BTreeMap;

/// Fragments sharing one quantized baseline
#[derive(Debug, Clone)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    /// Quantized y of the line
    pub y: f32,
}

impl Line {
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn first(&self) -> Option<&Fragment> {
        self.fragments.first()
    }

    pub fn last(&self) -> Option<&Fragment> {
        self.fragments.last()
    }

    /// Fragments strictly between the first and the last
    pub fn middle(&self) -> &[Fragment] {
        if self.fragments.len() <= 2 {
            &[]
        } else {
            &self.fragments[1..self.fragments.len() - 1]
        }
    }
}

/// Bucket index for a y coordinate; halves round up.
fn bucket_index(y: f32, bucket: f32) -> i64 {
    (y / bucket + 0.5).floor() as i64
}

/// Snap a y coordinate to the nearest multiple of `bucket`
pub fn quantize_y(y: f32, bucket: f32) -> f32 {
    bucket_index(y, bucket) as f32 * bucket
}

/// Group one page's fragments into lines in reading order
///
/// `bucket` must be positive. Whitespace-only fragments are dropped and lines
/// left empty by that are never produced.
pub fn reconstruct_lines(fragments: Vec<Fragment>, bucket: f32) -> Vec<Line> {
    let mut buckets: BTreeMap<i64, Vec<Fragment>> = BTreeMap::new();

    for fragment in fragments {
        buckets
            .entry(bucket_index(fragment.y, bucket))
            .or_default()
            .push(fragment);
    }

    // Page y grows upward, so the highest bucket is read first
    buckets
        .into_iter()
        .rev()
        .filter_map(|(index, mut fragments)| {
            fragments.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
            fragments.retain(|f| !f.text.trim().is_empty());
            if fragments.is_empty() {
                None
            } else {
                Some(Line {
                    fragments,
                    y: index as f32 * bucket,
                })
            }
        })
        .collect()
}
