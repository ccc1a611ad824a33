//! Proportional redistribution of observed span lengths
//!
//! Observed spans rarely add up to the length of the line they subdivide.
//! The difference is absorbed by the spans that are not fixed, in proportion
//! to their observed length.

use crate::error::GeomError;
use crate::position::TINY;
use serde::{Deserialize, Serialize};

/// An observed span length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedSpan {
    /// Observed length
    pub length: f64,
    /// Fixed spans keep their observed length
    #[serde(default)]
    pub fixed: bool,
}

impl ObservedSpan {
    /// An adjustable span
    #[inline]
    #[must_use]
    pub const fn free(length: f64) -> Self {
        Self {
            length,
            fixed: false,
        }
    }

    /// A span immune to adjustment
    #[inline]
    #[must_use]
    pub const fn fixed(length: f64) -> Self {
        Self {
            length,
            fixed: true,
        }
    }
}

/// Scale the free spans so that all spans add up to `total`
///
/// # Errors
/// Returns error if any length is not positive or every span is fixed
pub fn redistribute(spans: &[ObservedSpan], total: f64) -> Result<Vec<f64>, GeomError> {
    if let Some(bad) = spans.iter().find(|s| s.length.is_nan() || s.length <= 0.0) {
        return Err(GeomError::NonPositiveDistance(bad.length));
    }

    let sum_all: f64 = spans.iter().map(|s| s.length).sum();
    let sum_fixed: f64 = spans.iter().filter(|s| s.fixed).map(|s| s.length).sum();
    let sum_free = sum_all - sum_fixed;
    if sum_free < TINY {
        return Err(GeomError::AllSpansFixed);
    }

    let factor = (sum_free + (total - sum_all)) / sum_free;
    Ok(spans
        .iter()
        .map(|s| if s.fixed { s.length } else { s.length * factor })
        .collect())
}

/// Running distances from the start to the end of each span
#[must_use]
pub fn cumulative(lengths: &[f64]) -> Vec<f64> {
    lengths
        .iter()
        .scan(0.0, |acc, l| {
            *acc += l;
            Some(*acc)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn free_spans_stretch_evenly() {
        let spans = [ObservedSpan::free(10.0); 3];
        assert!(close(&redistribute(&spans, 33.0).unwrap(), &[11.0, 11.0, 11.0]));
    }

    #[test]
    fn fixed_span_keeps_its_length() {
        let spans = [
            ObservedSpan::free(10.0),
            ObservedSpan::fixed(10.0),
            ObservedSpan::free(10.0),
        ];
        assert!(close(&redistribute(&spans, 33.0).unwrap(), &[11.5, 10.0, 11.5]));
    }

    #[test]
    fn all_fixed_is_an_error() {
        let spans = [ObservedSpan::fixed(10.0), ObservedSpan::fixed(5.0)];
        assert_eq!(redistribute(&spans, 20.0), Err(GeomError::AllSpansFixed));
        assert_eq!(redistribute(&[], 20.0), Err(GeomError::AllSpansFixed));
    }

    #[test]
    fn non_positive_length_is_an_error() {
        let spans = [ObservedSpan::free(10.0), ObservedSpan::free(0.0)];
        assert_eq!(redistribute(&spans, 20.0), Err(GeomError::NonPositiveDistance(0.0)));
    }

    #[test]
    fn cumulative_distances() {
        assert!(close(&cumulative(&[1.0, 2.0, 3.0]), &[1.0, 3.0, 6.0]));
    }

    proptest! {
        #[test]
        fn prop_adjusted_spans_sum_to_total(
            lengths in proptest::collection::vec(0.1..100.0f64, 1..8),
            fixed_mask in proptest::collection::vec(any::<bool>(), 8),
            total in 1.0..1000.0f64,
        ) {
            let spans: Vec<ObservedSpan> = lengths
                .iter()
                .zip(&fixed_mask)
                .enumerate()
                // keep at least the first span free
                .map(|(i, (l, f))| ObservedSpan { length: *l, fixed: i > 0 && *f })
                .collect();
            let adjusted = redistribute(&spans, total).unwrap();
            let sum: f64 = adjusted.iter().sum();
            prop_assert!((sum - total).abs() < 1e-6);
            for (s, a) in spans.iter().zip(&adjusted) {
                if s.fixed {
                    prop_assert_eq!(s.length, *a);
                }
            }
        }
    }
}
