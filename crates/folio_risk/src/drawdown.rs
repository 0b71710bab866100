//! Drawdown and recovery.

use chrono::NaiveDate;
use folio_core::types::{FolioError, FolioResult};
use serde::{Deserialize, Serialize};

/// Drawdown statistics of a dated return series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawdownMetrics {
    /// Deepest drawdown, `≤ 0`.
    pub max_drawdown: f64,
    /// Date of the trough (first occurrence of the deepest drawdown).
    pub max_drawdown_date: NaiveDate,
    /// Calendar days from the trough to the first later point within the
    /// recovery tolerance of the prior peak; `None` if never recovered.
    pub recovery_time_days: Option<i64>,
    /// Drawdown at the last observation.
    pub current_drawdown: f64,
}

/// Drawdown path `(v − peak)/peak` of the compounded value `∏(1 + r)`.
pub fn drawdown_series(returns: &[f64]) -> Vec<f64> {
    let mut value = 1.0;
    let mut peak = f64::NEG_INFINITY;
    returns
        .iter()
        .map(|r| {
            value *= 1.0 + r;
            peak = peak.max(value);
            (value - peak) / peak
        })
        .collect()
}

/// Computes drawdown statistics.
///
/// `recovery_tolerance` is the drawdown level counted as recovered
/// (0.01 means within 1% of the peak).
///
/// # Errors
///
/// Returns `FolioError::InvalidInput` if the series is empty or its length
/// differs from `dates`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use folio_risk::drawdown::max_drawdown;
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
/// let dates = [d(1), d(2), d(4), d(5)];
/// let metrics = max_drawdown(&[0.10, -0.20, 0.30, 0.0], &dates, 0.01).unwrap();
///
/// assert!((metrics.max_drawdown - (-0.20)).abs() < 1e-12);
/// assert_eq!(metrics.max_drawdown_date, d(2));
/// assert_eq!(metrics.recovery_time_days, Some(2));
/// ```
pub fn max_drawdown(
    returns: &[f64],
    dates: &[NaiveDate],
    recovery_tolerance: f64,
) -> FolioResult<DrawdownMetrics> {
    if returns.is_empty() {
        return Err(FolioError::invalid_input("return series is empty"));
    }
    if returns.len() != dates.len() {
        return Err(FolioError::invalid_input(format!(
            "{} returns but {} dates",
            returns.len(),
            dates.len()
        )));
    }

    let path = drawdown_series(returns);
    let (trough, max_drawdown) = path
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::INFINITY), |(best_i, best), (i, dd)| {
            if dd < best {
                (i, dd)
            } else {
                (best_i, best)
            }
        });

    let recovery_time_days = path[trough..]
        .iter()
        .position(|dd| *dd >= -recovery_tolerance)
        .map(|offset| (dates[trough + offset] - dates[trough]).num_days());

    Ok(DrawdownMetrics {
        max_drawdown,
        max_drawdown_date: dates[trough],
        recovery_time_days,
        current_drawdown: path[path.len() - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n as u64).map(|d| start + chrono::Days::new(d)).collect()
    }

    #[test]
    fn test_monotone_gain_has_no_drawdown() {
        let metrics = max_drawdown(&[0.01, 0.02, 0.01], &dates(3), 0.01).unwrap();
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.recovery_time_days, Some(0));
        assert_eq!(metrics.current_drawdown, 0.0);
        assert_eq!(metrics.max_drawdown_date, dates(3)[0]);
    }

    #[test]
    fn test_unrecovered_drawdown() {
        let metrics = max_drawdown(&[0.05, -0.10, -0.05, 0.01], &dates(4), 0.01).unwrap();
        let expected = 0.90 * 0.95 - 1.0;
        assert_abs_diff_eq!(metrics.max_drawdown, expected, epsilon = 1e-12);
        assert_eq!(metrics.max_drawdown_date, dates(4)[2]);
        assert!(metrics.recovery_time_days.is_none());
        assert!(metrics.current_drawdown < 0.0);
    }

    #[test]
    fn test_first_trough_wins_ties() {
        let path = drawdown_series(&[-0.1, 0.0, 0.0]);
        assert_abs_diff_eq!(path[0], 0.0, epsilon = 1e-15);
        let metrics = max_drawdown(&[0.1, -0.5, 1.0, -0.5], &dates(4), 0.01).unwrap();
        assert_eq!(metrics.max_drawdown_date, dates(4)[1]);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(max_drawdown(&[0.01, 0.02], &dates(3), 0.01).is_err());
        assert!(max_drawdown(&[], &[], 0.01).is_err());
    }
}
