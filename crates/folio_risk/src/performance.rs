//! Risk-adjusted performance measures.
//!
//! Every function takes periodic returns and annualises with
//! `periods_per_year`. Degenerate denominators resolve to fixed values
//! instead of errors:
//!
//! | Measure           | Degenerate case                    | Value |
//! |-------------------|------------------------------------|-------|
//! | Beta              | zero market variance, < 2 periods  | 1.0   |
//! | Sharpe            | zero volatility                    | 0.0   |
//! | Sortino           | < 2 negative periods or zero dev.  | +∞    |
//! | Information ratio | zero active-return dispersion      | 0.0   |

use folio_core::stats::{mean, sample_covariance, sample_std, sample_variance};

/// Default beta when the market variance is degenerate.
pub const DEFAULT_BETA: f64 = 1.0;

/// Beta of excess portfolio returns against excess market returns.
///
/// The periodic risk-free rate is `risk_free_rate / periods_per_year`.
pub fn beta(portfolio: &[f64], market: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    let rf = risk_free_rate / periods_per_year;
    let p: Vec<f64> = portfolio.iter().map(|r| r - rf).collect();
    let m: Vec<f64> = market.iter().map(|r| r - rf).collect();
    let n = p.len().min(m.len());

    match (sample_covariance(&p[..n], &m[..n]), sample_variance(&m[..n])) {
        (Some(cov), Some(var)) if var > 0.0 => cov / var,
        _ => DEFAULT_BETA,
    }
}

/// Jensen's alpha: `R_p − [r_f + β(R_m − r_f)]` with annualised means.
pub fn alpha(
    portfolio: &[f64],
    market: &[f64],
    beta: f64,
    risk_free_rate: f64,
    periods_per_year: f64,
) -> f64 {
    let annual_p = mean(portfolio) * periods_per_year;
    let annual_m = mean(market) * periods_per_year;
    annual_p - (risk_free_rate + beta * (annual_m - risk_free_rate))
}

/// Annualised Sharpe ratio.
pub fn sharpe_ratio(series: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    let annual_return = mean(series) * periods_per_year;
    let annual_vol = sample_std(series).unwrap_or(0.0) * periods_per_year.sqrt();
    if annual_vol > 0.0 {
        (annual_return - risk_free_rate) / annual_vol
    } else {
        0.0
    }
}

/// Annualised Sortino ratio over the dispersion of negative periods.
pub fn sortino_ratio(series: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    let annual_return = mean(series) * periods_per_year;
    let negatives: Vec<f64> = series.iter().copied().filter(|r| *r < 0.0).collect();
    match sample_std(&negatives) {
        Some(dev) if dev > 0.0 => {
            (annual_return - risk_free_rate) / (dev * periods_per_year.sqrt())
        }
        _ => f64::INFINITY,
    }
}

fn active_returns(portfolio: &[f64], benchmark: &[f64]) -> Vec<f64> {
    portfolio.iter().zip(benchmark).map(|(p, b)| p - b).collect()
}

/// Annualised mean active return over annualised tracking error.
pub fn information_ratio(portfolio: &[f64], benchmark: &[f64], periods_per_year: f64) -> f64 {
    let active = active_returns(portfolio, benchmark);
    match sample_std(&active) {
        Some(dev) if dev > 0.0 => {
            mean(&active) * periods_per_year / (dev * periods_per_year.sqrt())
        }
        _ => 0.0,
    }
}

/// Annualised standard deviation of active returns.
pub fn tracking_error(portfolio: &[f64], benchmark: &[f64], periods_per_year: f64) -> f64 {
    let active = active_returns(portfolio, benchmark);
    sample_std(&active).unwrap_or(0.0) * periods_per_year.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const PPY: f64 = 252.0;

    #[test]
    fn test_beta_of_market_is_one() {
        let market = [0.01, -0.02, 0.015, 0.003, -0.004];
        assert_abs_diff_eq!(beta(&market, &market, 0.06, PPY), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_beta_of_leveraged_market() {
        let market = [0.01, -0.02, 0.015, 0.003, -0.004];
        let levered: Vec<f64> = market.iter().map(|r| 2.0 * r).collect();
        // Excess returns shift both series by the same constant.
        assert_abs_diff_eq!(beta(&levered, &market, 0.0, PPY), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_beta_defaults_on_flat_market() {
        let flat = [0.5; 4];
        assert_eq!(beta(&[0.01, 0.02, 0.0, 0.01], &flat, 0.0, PPY), DEFAULT_BETA);
        assert_eq!(beta(&[0.01], &[0.02], 0.06, PPY), DEFAULT_BETA);
    }

    #[test]
    fn test_alpha_zero_when_portfolio_is_market() {
        let market = [0.01, -0.02, 0.015, 0.003, -0.004];
        let b = beta(&market, &market, 0.06, PPY);
        assert_abs_diff_eq!(alpha(&market, &market, b, 0.06, PPY), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sortino_infinite_without_downside() {
        assert_eq!(sortino_ratio(&[0.01, 0.02, 0.03], 0.06, PPY), f64::INFINITY);
        assert_eq!(sortino_ratio(&[0.01, -0.02, 0.03], 0.06, PPY), f64::INFINITY);
        assert!(sortino_ratio(&[0.01, -0.02, -0.01, 0.03], 0.06, PPY).is_finite());
    }

    #[test]
    fn test_information_ratio_zero_for_benchmark() {
        let b = [0.01, -0.02, 0.015];
        assert_eq!(information_ratio(&b, &b, PPY), 0.0);
        assert_eq!(tracking_error(&b, &b, PPY), 0.0);
    }

    #[test]
    fn test_information_ratio_annualised() {
        let p = [0.02, 0.0, 0.01, 0.03];
        let b = [0.01, 0.0, 0.0, 0.01];
        let active = [0.01, 0.0, 0.01, 0.02];
        let expected = mean(&active) * PPY / (sample_std(&active).unwrap() * PPY.sqrt());
        assert_abs_diff_eq!(information_ratio(&p, &b, PPY), expected, epsilon = 1e-12);
        assert_abs_diff_eq!(
            tracking_error(&p, &b, PPY),
            sample_std(&active).unwrap() * PPY.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sharpe_zero_volatility() {
        assert_eq!(sharpe_ratio(&[0.25; 4], 0.06, PPY), 0.0);
    }
}
