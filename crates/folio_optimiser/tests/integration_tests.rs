//! Integration tests for the allocation pipeline.
//!
//! These tests run the full path from a dated return matrix through
//! estimation into the optimisers, checking the weight invariants and the
//! fallback policy.

use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use folio_core::config::EngineConfig;
use folio_core::stats::estimate;
use folio_core::types::{
    Algorithm, AllocationRequest, AssetMap, FolioError, ReturnMatrix, RiskTolerance,
};
use folio_optimiser::{blend, frontier, optimize};
use proptest::prelude::*;

fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..n as u64).map(|d| start + chrono::Days::new(d)).collect()
}

/// Two assets with annualised μ = [0.10, 0.06], equal variance and zero
/// covariance: the deviation patterns are orthogonal.
fn two_asset_matrix() -> ReturnMatrix {
    let d = 0.01;
    let pattern_a = [d, -d, d, -d];
    let pattern_b = [d, d, -d, -d];
    let n = 40;
    let a: Vec<f64> = (0..n).map(|t| 0.10 / 252.0 + pattern_a[t % 4]).collect();
    let b: Vec<f64> = (0..n).map(|t| 0.06 / 252.0 + pattern_b[t % 4]).collect();
    ReturnMatrix::new(dates(n), vec!["A".into(), "B".into()], vec![a, b]).unwrap()
}

/// Deterministic pseudo-returns for a universe of `n_assets`.
fn synthetic_matrix(n_assets: usize, n_periods: usize) -> ReturnMatrix {
    let names = (0..n_assets).map(|i| format!("ASSET{}", i)).collect();
    let columns = (0..n_assets)
        .map(|i| {
            (0..n_periods)
                .map(|t| {
                    let drift = 0.0002 * (i as f64 + 1.0);
                    let wave = ((t * (i + 3)) as f64 * 0.7).sin() * 0.01 * (1.0 + i as f64 * 0.3);
                    drift + wave
                })
                .collect()
        })
        .collect();
    ReturnMatrix::new(dates(n_periods), names, columns).unwrap()
}

fn caps(values: &[(&str, f64)]) -> AssetMap {
    values.iter().map(|(a, w)| (a.to_string(), *w)).collect()
}

// ============================================================================
// Mean-Variance
// ============================================================================

#[test]
fn test_two_asset_target_scenario() {
    let est = estimate(&two_asset_matrix()).unwrap();
    assert_abs_diff_eq!(est.expected_returns()[0], 0.10, epsilon = 1e-12);
    assert_abs_diff_eq!(est.expected_returns()[1], 0.06, epsilon = 1e-12);
    assert_abs_diff_eq!(est.covariance()[(0, 1)], 0.0, epsilon = 1e-15);

    let request = AllocationRequest::mean_variance(RiskTolerance::Moderate).with_target_return(0.08);
    let result = optimize(&est, &request, &EngineConfig::default()).unwrap();

    assert!(result.status.is_success());
    assert_abs_diff_eq!(result.weights[0] + result.weights[1], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.weight_of("A"), 0.5, epsilon = 1e-4);
    assert_abs_diff_eq!(result.weight_of("B"), 0.5, epsilon = 1e-4);
    assert_abs_diff_eq!(result.expected_return, 0.08, epsilon = 1e-4);
}

#[test]
fn test_target_outside_range_falls_back_without_error() {
    let est = estimate(&synthetic_matrix(4, 60)).unwrap();
    let config = EngineConfig::default();
    for target in [est.max_return() + 0.05, est.min_return() - 0.05] {
        let request = AllocationRequest::mean_variance(RiskTolerance::Moderate).with_target_return(target);
        let result = optimize(&est, &request, &config).unwrap();
        assert!(!result.status.is_success());
        assert!(matches!(
            result.status.cause(),
            Some(FolioError::SolverInfeasible(_))
        ));
        assert_abs_diff_eq!(result.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);

        let expected_return: f64 = est.expected_returns().iter().sum::<f64>() / 4.0;
        assert_abs_diff_eq!(result.expected_return, expected_return, epsilon = 1e-12);
        assert_eq!(result.allocation.len(), 4);
    }
}

#[test]
fn test_result_serialises_status_and_cause() {
    let est = estimate(&synthetic_matrix(3, 60)).unwrap();
    let request = AllocationRequest::mean_variance(RiskTolerance::Moderate).with_target_return(10.0);
    let result = optimize(&est, &request, &EngineConfig::default()).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "fallback");
    assert_eq!(json["cause"]["kind"], "solver_infeasible");
    assert_eq!(json["algorithm"], "mean-variance");
}

// ============================================================================
// Black-Litterman
// ============================================================================

#[test]
fn test_black_litterman_through_dispatcher() {
    let est = estimate(&synthetic_matrix(3, 60)).unwrap();
    let request = AllocationRequest::black_litterman(
        RiskTolerance::Aggressive,
        caps(&[("ASSET0", 0.5), ("ASSET1", 0.3), ("ASSET2", 0.2)]),
    )
    .with_views(caps(&[("ASSET2", 0.25), ("UNKNOWN", 1.0)]));

    let result = optimize(&est, &request, &EngineConfig::default()).unwrap();
    assert_eq!(result.algorithm, Algorithm::BlackLitterman);
    assert_abs_diff_eq!(result.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
    assert_eq!(result.equilibrium_returns.as_ref().map(Vec::len), Some(3));
}

#[test]
fn test_black_litterman_incomplete_weights_is_hard_error() {
    let est = estimate(&synthetic_matrix(3, 60)).unwrap();
    let result = blend(
        &est,
        &caps(&[("ASSET0", 0.5), ("ASSET1", 0.5)]),
        None,
        RiskTolerance::Moderate,
        &EngineConfig::default(),
    );
    assert!(matches!(result, Err(FolioError::InvalidMarketWeights(_))));
}

// ============================================================================
// Frontier
// ============================================================================

#[test]
fn test_frontier_points_are_successful_and_ordered() {
    let est = estimate(&synthetic_matrix(5, 120)).unwrap();
    let frontier = frontier(&est, 0.06, 20, &EngineConfig::default());

    assert!(!frontier.is_empty());
    for pair in frontier.points.windows(2) {
        assert!(pair[0].target_return < pair[1].target_return);
    }
    for point in &frontier.points {
        assert!(point.volatility >= 0.0);
        assert!(point.expected_return >= point.target_return - 1e-5);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_weights_sum_to_one_within_cap(
        n_assets in 3usize..6,
        seed in 0u64..1000,
        tier in prop_oneof![
            Just(RiskTolerance::Conservative),
            Just(RiskTolerance::Moderate),
            Just(RiskTolerance::Aggressive),
        ],
        use_target in any::<bool>(),
    ) {
        let n_periods = 60;
        let names = (0..n_assets).map(|i| format!("S{}", i)).collect();
        let columns = (0..n_assets)
            .map(|i| {
                (0..n_periods)
                    .map(|t| {
                        let phase = (seed as f64) * 0.013 + i as f64 * 1.7;
                        0.0004 * (i as f64 - 1.0) + (t as f64 * 0.9 + phase).sin() * 0.012
                    })
                    .collect()
            })
            .collect();
        let matrix = ReturnMatrix::new(dates(n_periods), names, columns).unwrap();
        let est = estimate(&matrix).unwrap();

        let mut request = AllocationRequest::mean_variance(tier);
        if use_target {
            request = request.with_target_return(0.5 * (est.min_return() + est.max_return()));
        }
        let result = optimize(&est, &request, &EngineConfig::default()).unwrap();

        prop_assert!((result.weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        for &w in &result.weights {
            prop_assert!(w >= 0.0 && w <= 0.4 + 1e-6);
        }
    }
}
