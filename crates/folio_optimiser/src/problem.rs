//! Conic problem builder and Clarabel adapter.
//!
//! Problems are stated as
//!
//! ```text
//! minimise    ½ xᵀPx + qᵀx
//! subject to  Ax + s = b,  s ∈ K
//! ```
//!
//! where K is a product of zero cones (equalities), non-negative cones
//! (inequalities `a·x ≤ b`) and second-order cones. Rows are collected
//! densely and converted to compressed-column form on [`ConicProblem::solve`];
//! portfolio problems have a handful of variables, so density is not a
//! concern.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use folio_core::config::SolverSettings;
use folio_core::types::{FolioError, FolioResult};
use nalgebra::DMatrix;
use tracing::debug;

/// Entries smaller than this are dropped from the sparse matrices.
const SPARSITY_THRESHOLD: f64 = 1e-14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConeKind {
    Zero,
    Nonnegative,
    SecondOrder,
}

#[derive(Clone, Debug)]
struct ConeBlock {
    kind: ConeKind,
    rows: Vec<Vec<f64>>,
    rhs: Vec<f64>,
}

/// Convex quadratic program with conic constraints.
///
/// # Examples
///
/// ```
/// use folio_core::config::SolverSettings;
/// use folio_optimiser::problem::ConicProblem;
/// use nalgebra::DMatrix;
///
/// // minimise x² + y² subject to x + y = 1
/// let mut problem = ConicProblem::new(2).with_quadratic(DMatrix::identity(2, 2) * 2.0);
/// problem.equality(vec![1.0, 1.0], 1.0);
///
/// let x = problem.solve(&SolverSettings::default()).unwrap();
/// assert!((x[0] - 0.5).abs() < 1e-6);
/// assert!((x[1] - 0.5).abs() < 1e-6);
/// ```
#[derive(Clone, Debug)]
pub struct ConicProblem {
    n_vars: usize,
    quadratic: DMatrix<f64>,
    linear: Vec<f64>,
    blocks: Vec<ConeBlock>,
}

impl ConicProblem {
    /// Creates an empty problem over `n_vars` variables.
    pub fn new(n_vars: usize) -> Self {
        Self {
            n_vars,
            quadratic: DMatrix::zeros(n_vars, n_vars),
            linear: vec![0.0; n_vars],
            blocks: Vec::new(),
        }
    }

    /// Sets the symmetric quadratic term P.
    pub fn with_quadratic(mut self, p: DMatrix<f64>) -> Self {
        self.quadratic = p;
        self
    }

    /// Sets the linear term q.
    pub fn with_linear(mut self, q: Vec<f64>) -> Self {
        self.linear = q;
        self
    }

    /// Number of decision variables.
    #[inline]
    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Number of constraint rows.
    pub fn n_constraints(&self) -> usize {
        self.blocks.iter().map(|b| b.rows.len()).sum()
    }

    /// Adds `row · x = rhs`.
    pub fn equality(&mut self, row: Vec<f64>, rhs: f64) {
        self.push_row(ConeKind::Zero, row, rhs);
    }

    /// Adds `row · x ≤ rhs`.
    pub fn inequality(&mut self, row: Vec<f64>, rhs: f64) {
        self.push_row(ConeKind::Nonnegative, row, rhs);
    }

    /// Adds `lower ≤ x_i ≤ upper` for every variable index in `indices`.
    pub fn bounds(&mut self, indices: impl IntoIterator<Item = usize>, lower: f64, upper: f64) {
        for i in indices {
            let mut lo = vec![0.0; self.n_vars];
            lo[i] = -1.0;
            self.inequality(lo, -lower);
            let mut hi = vec![0.0; self.n_vars];
            hi[i] = 1.0;
            self.inequality(hi, upper);
        }
    }

    /// Adds the second-order cone constraint `rhs − rows·x ∈ Q`, i.e.
    /// `‖(rhs − rows·x)[1..]‖ ≤ (rhs − rows·x)[0]`.
    pub fn second_order_cone(&mut self, rows: Vec<Vec<f64>>, rhs: Vec<f64>) {
        if rows.is_empty() {
            return;
        }
        self.blocks.push(ConeBlock {
            kind: ConeKind::SecondOrder,
            rows,
            rhs,
        });
    }

    fn push_row(&mut self, kind: ConeKind, row: Vec<f64>, rhs: f64) {
        match self.blocks.last_mut() {
            Some(block) if block.kind == kind => {
                block.rows.push(row);
                block.rhs.push(rhs);
            }
            _ => self.blocks.push(ConeBlock {
                kind,
                rows: vec![row],
                rhs: vec![rhs],
            }),
        }
    }

    fn quadratic_csc(&self) -> CscMatrix<f64> {
        let n = self.n_vars;
        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for j in 0..n {
            for i in 0..=j {
                let v = 0.5 * (self.quadratic[(i, j)] + self.quadratic[(j, i)]);
                if v.abs() > SPARSITY_THRESHOLD {
                    rowval.push(i);
                    nzval.push(v);
                }
            }
            colptr.push(nzval.len());
        }
        CscMatrix::new(n, n, colptr, rowval, nzval)
    }

    fn constraint_csc(&self) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
        let rows: Vec<&Vec<f64>> = self.blocks.iter().flat_map(|b| b.rows.iter()).collect();
        let m = rows.len();
        let n = self.n_vars;

        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for j in 0..n {
            for (i, row) in rows.iter().enumerate() {
                let v = row.get(j).copied().unwrap_or(0.0);
                if v.abs() > SPARSITY_THRESHOLD {
                    rowval.push(i);
                    nzval.push(v);
                }
            }
            colptr.push(nzval.len());
        }

        let b: Vec<f64> = self
            .blocks
            .iter()
            .flat_map(|block| block.rhs.iter().copied())
            .collect();
        let cones = self
            .blocks
            .iter()
            .map(|block| match block.kind {
                ConeKind::Zero => SupportedConeT::ZeroConeT(block.rows.len()),
                ConeKind::Nonnegative => SupportedConeT::NonnegativeConeT(block.rows.len()),
                ConeKind::SecondOrder => SupportedConeT::SecondOrderConeT(block.rows.len()),
            })
            .collect();

        (CscMatrix::new(m, n, colptr, rowval, nzval), b, cones)
    }

    /// Solves the problem and returns the primal solution.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::SolverInfeasible` if the solver cannot be set
    /// up, reports anything other than a (near-)optimal status, or returns
    /// a non-finite point.
    pub fn solve(&self, settings: &SolverSettings) -> FolioResult<Vec<f64>> {
        let p = self.quadratic_csc();
        let (a, b, cones) = self.constraint_csc();
        debug!(
            n_vars = self.n_vars,
            n_constraints = b.len(),
            n_cones = cones.len(),
            "solving conic problem"
        );

        let clarabel_settings = DefaultSettingsBuilder::default()
            .max_iter(settings.max_iterations)
            .tol_gap_abs(settings.tolerance)
            .tol_gap_rel(settings.tolerance)
            .tol_feas(settings.tolerance)
            .verbose(false)
            .build()
            .map_err(|e| FolioError::infeasible(format!("invalid solver settings: {}", e)))?;

        let mut solver = DefaultSolver::new(&p, &self.linear, &a, &b, &cones, clarabel_settings)
            .map_err(|e| FolioError::infeasible(format!("solver set-up failed: {:?}", e)))?;
        solver.solve();

        match &solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {}
            other => {
                return Err(FolioError::infeasible(format!(
                    "solver finished with status {:?}",
                    other
                )))
            }
        }

        let x = solver.solution.x.clone();
        if x.len() != self.n_vars || x.iter().any(|v| !v.is_finite()) {
            return Err(FolioError::infeasible("solver returned a non-finite point"));
        }
        debug!(status = ?solver.solution.status, iterations = solver.info.iterations, "conic problem solved");
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rows_of_same_kind_share_a_cone() {
        let mut problem = ConicProblem::new(2);
        problem.equality(vec![1.0, 1.0], 1.0);
        problem.inequality(vec![-1.0, 0.0], 0.0);
        problem.inequality(vec![0.0, -1.0], 0.0);
        let (_, b, cones) = problem.constraint_csc();
        assert_eq!(b, vec![1.0, 0.0, 0.0]);
        assert_eq!(cones.len(), 2);
        assert_eq!(problem.n_constraints(), 3);
    }

    #[test]
    fn test_bounded_least_squares() {
        // minimise (x - 2)² subject to 0 ≤ x ≤ 1
        let mut problem = ConicProblem::new(1)
            .with_quadratic(DMatrix::from_element(1, 1, 2.0))
            .with_linear(vec![-4.0]);
        problem.bounds([0], 0.0, 1.0);
        let x = problem.solve(&SolverSettings::default()).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_second_order_cone_caps_norm() {
        // maximise x + y subject to ‖(x, y)‖ ≤ 1
        let mut problem = ConicProblem::new(2).with_linear(vec![-1.0, -1.0]);
        problem.second_order_cone(
            vec![vec![0.0, 0.0], vec![-1.0, 0.0], vec![0.0, -1.0]],
            vec![1.0, 0.0, 0.0],
        );
        let x = problem.solve(&SolverSettings::default()).unwrap();
        let expected = 1.0 / 2.0_f64.sqrt();
        assert_abs_diff_eq!(x[0], expected, epsilon = 1e-5);
        assert_abs_diff_eq!(x[1], expected, epsilon = 1e-5);
    }

    #[test]
    fn test_infeasible_problem_is_reported() {
        let mut problem = ConicProblem::new(1).with_quadratic(DMatrix::from_element(1, 1, 1.0));
        problem.inequality(vec![1.0], -1.0);
        problem.inequality(vec![-1.0], -1.0);
        let result = problem.solve(&SolverSettings::default());
        assert!(matches!(result, Err(FolioError::SolverInfeasible(_))));
    }
}
