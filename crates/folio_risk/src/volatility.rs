//! Volatility decomposition.

use folio_core::stats::{mean, sample_std};
use serde::{Deserialize, Serialize};

/// Annualised volatility breakdown of a return series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolatilityMetrics {
    /// Annualised standard deviation of all periods.
    pub volatility: f64,
    /// Annualised standard deviation of below-mean periods.
    pub downside_volatility: f64,
    /// Annualised standard deviation of above-mean periods.
    pub upside_volatility: f64,
    /// Last value of the rolling series.
    pub current_rolling_volatility: f64,
    /// Mean of the rolling series.
    pub average_rolling_volatility: f64,
    /// Standard deviation of the rolling series.
    pub volatility_of_volatility: f64,
    /// Rolling annualised volatility, one value per full window.
    pub rolling_volatility: Vec<f64>,
}

/// Annualised rolling standard deviation over `window` periods.
///
/// Empty when the series is shorter than the window.
pub fn rolling_volatility(series: &[f64], window: usize, periods_per_year: f64) -> Vec<f64> {
    if window < 2 || series.len() < window {
        return Vec::new();
    }
    let scale = periods_per_year.sqrt();
    series
        .windows(window)
        .map(|w| sample_std(w).unwrap_or(0.0) * scale)
        .collect()
}

/// Computes the volatility breakdown.
///
/// Subsets with fewer than two observations contribute a zero volatility.
/// Without a full rolling window the current and average rolling values
/// fall back to the total volatility and vol-of-vol is zero.
pub fn volatility_metrics(series: &[f64], window: usize, periods_per_year: f64) -> VolatilityMetrics {
    let scale = periods_per_year.sqrt();
    let annualised = |xs: &[f64]| sample_std(xs).unwrap_or(0.0) * scale;

    let m = mean(series);
    let below: Vec<f64> = series.iter().copied().filter(|r| *r < m).collect();
    let above: Vec<f64> = series.iter().copied().filter(|r| *r > m).collect();
    let volatility = annualised(series);

    let rolling = rolling_volatility(series, window, periods_per_year);
    let (current, average) = match rolling.last() {
        Some(&last) => (last, mean(&rolling)),
        None => (volatility, volatility),
    };

    VolatilityMetrics {
        volatility,
        downside_volatility: annualised(&below),
        upside_volatility: annualised(&above),
        current_rolling_volatility: current,
        average_rolling_volatility: average,
        volatility_of_volatility: sample_std(&rolling).unwrap_or(0.0),
        rolling_volatility: rolling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_short_series_falls_back_to_total() {
        let series = [0.01, -0.02, 0.03];
        let metrics = volatility_metrics(&series, 30, 252.0);
        assert!(metrics.rolling_volatility.is_empty());
        assert_eq!(metrics.current_rolling_volatility, metrics.volatility);
        assert_eq!(metrics.average_rolling_volatility, metrics.volatility);
        assert_eq!(metrics.volatility_of_volatility, 0.0);
        // One point above the mean: upside has no dispersion.
        assert_eq!(metrics.upside_volatility, 0.0);
    }

    #[test]
    fn test_rolling_window_count() {
        let series: Vec<f64> = (0..40).map(|t| ((t as f64) * 0.5).sin() * 0.01).collect();
        let rolling = rolling_volatility(&series, 30, 252.0);
        assert_eq!(rolling.len(), 11);
        let first = sample_std(&series[..30]).unwrap() * 252.0_f64.sqrt();
        assert_abs_diff_eq!(rolling[0], first, epsilon = 1e-15);

        let metrics = volatility_metrics(&series, 30, 252.0);
        assert_eq!(metrics.current_rolling_volatility, rolling[10]);
        assert!(metrics.volatility_of_volatility >= 0.0);
    }

    #[test]
    fn test_split_around_mean() {
        let series = [-0.02, -0.01, 0.0, 0.01, 0.02, 0.04];
        let metrics = volatility_metrics(&series, 30, 252.0);
        let below = [-0.02, -0.01, 0.0];
        assert_abs_diff_eq!(
            metrics.downside_volatility,
            sample_std(&below).unwrap() * 252.0_f64.sqrt(),
            epsilon = 1e-15
        );
    }
}
