//! Time-indexed matrix of periodic asset returns.

use super::error::{FolioError, FolioResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ordered time series of periodic fractional returns, one column per asset.
///
/// Stored column-major: `columns[i][t]` is the return of asset `i` over
/// period `t`. Dates are strictly ascending and every cell is finite.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use folio_core::types::ReturnMatrix;
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
/// let matrix = ReturnMatrix::new(
///     vec![d(1), d(2), d(3)],
///     vec!["A".to_string(), "B".to_string()],
///     vec![vec![0.01, -0.02, 0.03], vec![0.02, -0.01, -0.01]],
/// )
/// .unwrap();
///
/// assert_eq!(matrix.n_periods(), 3);
/// assert_eq!(matrix.column_by_name("B").unwrap()[0], 0.02);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnMatrix {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    /// Creates a matrix from per-asset return columns.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidInput` if the shapes disagree, dates are
    /// not strictly ascending, asset names repeat, or a cell is not finite.
    pub fn new(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> FolioResult<Self> {
        if assets.len() != columns.len() {
            return Err(FolioError::invalid_input(format!(
                "{} asset names but {} return columns",
                assets.len(),
                columns.len()
            )));
        }
        for (name, column) in assets.iter().zip(&columns) {
            if column.len() != dates.len() {
                return Err(FolioError::invalid_input(format!(
                    "column '{}' has {} cells, expected {}",
                    name,
                    column.len(),
                    dates.len()
                )));
            }
            if let Some(t) = column.iter().position(|r| !r.is_finite()) {
                return Err(FolioError::invalid_input(format!(
                    "column '{}' has a missing or non-finite cell at {}",
                    name, dates[t]
                )));
            }
        }
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(FolioError::invalid_input(format!(
                "dates must be strictly ascending ({} is followed by {})",
                w[0], w[1]
            )));
        }
        for (i, name) in assets.iter().enumerate() {
            if assets[..i].contains(name) {
                return Err(FolioError::invalid_input(format!(
                    "duplicate asset name '{}'",
                    name
                )));
            }
        }

        Ok(Self {
            dates,
            assets,
            columns,
        })
    }

    /// Creates a matrix from per-period rows (`rows[t][i]`).
    pub fn from_rows(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> FolioResult<Self> {
        if rows.len() != dates.len() {
            return Err(FolioError::invalid_input(format!(
                "{} rows but {} dates",
                rows.len(),
                dates.len()
            )));
        }
        let mut columns = vec![Vec::with_capacity(rows.len()); assets.len()];
        for (t, row) in rows.iter().enumerate() {
            if row.len() != assets.len() {
                return Err(FolioError::invalid_input(format!(
                    "row {} has {} cells, expected {}",
                    t,
                    row.len(),
                    assets.len()
                )));
            }
            for (column, &value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Self::new(dates, assets, columns)
    }

    /// Period dates in ascending order.
    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Asset names in column order.
    #[inline]
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Number of assets (columns).
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Number of observed periods (rows).
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.dates.len()
    }

    /// Return column of the asset at `index`.
    #[inline]
    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    /// All return columns.
    #[inline]
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Position of an asset in the universe.
    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Return column of a named asset.
    pub fn column_by_name(&self, asset: &str) -> Option<&[f64]> {
        self.asset_index(asset).map(|i| self.column(i))
    }

    /// Weighted sum of asset returns at every period.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidInput` if `weights` does not have one
    /// entry per asset.
    pub fn weighted_returns(&self, weights: &[f64]) -> FolioResult<Vec<f64>> {
        if weights.len() != self.n_assets() {
            return Err(FolioError::invalid_input(format!(
                "{} weights for {} assets",
                weights.len(),
                self.n_assets()
            )));
        }
        let mut series = vec![0.0; self.n_periods()];
        for (column, &w) in self.columns.iter().zip(weights) {
            if w == 0.0 {
                continue;
            }
            for (acc, &r) in series.iter_mut().zip(column) {
                *acc += w * r;
            }
        }
        Ok(series)
    }

    /// Cross-sectional mean return at every period (equal-weighted proxy).
    pub fn equal_weighted_returns(&self) -> Vec<f64> {
        let n = self.n_assets().max(1) as f64;
        (0..self.n_periods())
            .map(|t| self.columns.iter().map(|c| c[t]).sum::<f64>() / n)
            .collect()
    }
}
