use serde::{Deserialize, Serialize};
use xbench_engine::Aggregate;

/// Floor of the relative-error denominator.
pub const EPSILON: f64 = f64::MIN_POSITIVE;

/// `|a - b| / max(|a|, |b|, eps)`. Exactly equal inputs give zero.
pub fn relative_error(a: f64, b: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    (a - b).abs() / a.abs().max(b.abs()).max(EPSILON)
}

/// Digits of agreement derived from one relative error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    /// `-log10(rel)` clamped to `[0, max]`.
    pub digits: f64,
    /// The relative error was exactly zero.
    pub exact_match: bool,
    /// The unclamped digits exceeded `max`.
    pub above_maximum: bool,
}

/// Converts a relative error into clamped digits of agreement.
pub fn digits_of_agreement(rel_err: f64, max: u32) -> Agreement {
    let ceiling = f64::from(max);
    if rel_err == 0.0 {
        return Agreement {
            digits: ceiling,
            exact_match: true,
            above_maximum: false,
        };
    }
    let raw = -rel_err.log10();
    Agreement {
        digits: raw.clamp(0.0, ceiling),
        exact_match: false,
        above_maximum: raw > ceiling,
    }
}

/// Element-wise relative error of two aligned series, summarized by `aggregate`.
///
/// `None` when the lengths differ or the series are empty.
pub fn series_relative_error(a: &[f64], b: &[f64], aggregate: Aggregate) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let errors = a.iter().zip(b).map(|(x, y)| relative_error(*x, *y));
    Some(match aggregate {
        Aggregate::Worst => errors.fold(0.0, f64::max),
        Aggregate::Mean => errors.sum::<f64>() / a.len() as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_against_zero_is_exact() {
        assert_eq!(relative_error(0.0, 0.0), 0.0);
        let agreement = digits_of_agreement(0.0, 16);
        assert_eq!(agreement.digits, 16.0);
        assert!(agreement.exact_match);
    }

    #[test]
    fn digits_clamp_at_both_ends() {
        let far = digits_of_agreement(relative_error(1.0, -1.0), 16);
        assert_eq!(far.digits, 0.0);
        let close = digits_of_agreement(1e-18, 12);
        assert_eq!(close.digits, 12.0);
        assert!(close.above_maximum);
        assert!(!close.exact_match);
    }

    #[test]
    fn worst_aggregate_is_the_largest_element_error() {
        let a = [1.0, 2.0, 3.0];
        let b = [1.0, 2.0, 3.3];
        let worst = series_relative_error(&a, &b, Aggregate::Worst).expect("aligned");
        assert!((worst - 0.3 / 3.3).abs() < 1e-15);
        let mean = series_relative_error(&a, &b, Aggregate::Mean).expect("aligned");
        assert!((mean - worst / 3.0).abs() < 1e-15);
        assert_eq!(series_relative_error(&a, &b[..2], Aggregate::Worst), None);
    }
}
