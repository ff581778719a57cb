/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the dense RBF interpolation operator and the solver abstraction seams.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Dense RBF interpolation operator and the solver abstraction seams.

use faer::Mat;
use faer::linalg::solvers::{PartialPivLu, Solve};
use motus_rbf_utils::{RbfFunction, get_distance};

use crate::config::RbfFunctionType;

/// An interpolation operator mapping values at control points to values at
/// target points.
///
/// The operator is fitted once per geometry via [`compute`](RbfSolver::compute)
/// and then applied repeatedly via [`interpolate`](RbfSolver::interpolate).
pub trait RbfSolver: Send + Sync {
    /// Fits the operator for the given control and target positions.
    fn compute(&mut self, control_positions: &Mat<f64>, target_positions: &Mat<f64>);

    /// Applies the fitted operator to per-control-point values, returning
    /// one interpolated row per target point.
    fn interpolate(&mut self, values: &Mat<f64>) -> Mat<f64>;

    /// Whether [`compute`](RbfSolver::compute) has run since construction.
    fn computed(&self) -> bool;

    /// Drops the trailing `nb_columns` control-point columns from the fitted
    /// operator, so that subsequent interpolations take values for the
    /// leading control points only.
    fn trim_static_columns(&mut self, nb_columns: usize);
}

/// Builds fresh [`RbfSolver`] instances and the kernels derived from them.
///
/// The coarsening controller discards and rebuilds its operators on every
/// reselection, so it holds a factory rather than a solver.
pub trait SolverFactory: Send + Sync {
    fn build(&self) -> Box<dyn RbfSolver>;

    /// Returns a compactly supported kernel of the given radius from the
    /// same kernel family, for the near-surface correction layer.
    fn correction_kernel(&self, radius: f64) -> Box<dyn RbfFunction>;

    /// Whether the built solvers augment the basis with a linear polynomial.
    fn polynomial_term(&self) -> bool {
        false
    }
}

/// Direct dense RBF interpolation operator.
///
/// Assembles the full symmetric kernel system, factorises it with partial
/// pivoting LU, and stores only the condensed evaluation operator `H`, so
/// each interpolation is a single matrix product.
pub struct DenseRbfSolver {
    kernel: Box<dyn RbfFunction>,
    polynomial_term: bool,
    h_hat: Mat<f64>,
    computed: bool,
}

impl DenseRbfSolver {
    pub fn new(kernel: Box<dyn RbfFunction>, polynomial_term: bool) -> Self {
        Self {
            kernel,
            polynomial_term,
            h_hat: Mat::new(),
            computed: false,
        }
    }
}

impl RbfSolver for DenseRbfSolver {
    fn compute(&mut self, control_positions: &Mat<f64>, target_positions: &Mat<f64>) {
        let n = control_positions.nrows();
        let m = target_positions.nrows();
        let dim = control_positions.ncols();
        assert!(n > 0, "need at least one control point");
        assert_eq!(
            dim,
            target_positions.ncols(),
            "control and target points must share a dimension"
        );

        // Basis size: kernel columns plus an optional linear polynomial tail.
        let basis = match self.polynomial_term {
            true => dim + 1,
            false => 0,
        };

        let mut a_matrix = Mat::<f64>::zeros(n + basis, n + basis);
        for j in 0..n {
            let source = control_positions.row(j);
            for i in j..n {
                let value = self
                    .kernel
                    .evaluate(get_distance(control_positions.row(i), source));
                a_matrix[(i, j)] = value;
                a_matrix[(j, i)] = value;
            }
        }
        if self.polynomial_term {
            for i in 0..n {
                a_matrix[(i, n)] = 1.0;
                a_matrix[(n, i)] = 1.0;
                for k in 0..dim {
                    a_matrix[(i, n + 1 + k)] = control_positions[(i, k)];
                    a_matrix[(n + 1 + k, i)] = control_positions[(i, k)];
                }
            }
        }

        let mut e_matrix = Mat::<f64>::zeros(m, n + basis);
        for i in 0..m {
            let target = target_positions.row(i);
            for j in 0..n {
                e_matrix[(i, j)] = self
                    .kernel
                    .evaluate(get_distance(target, control_positions.row(j)));
            }
            if self.polynomial_term {
                e_matrix[(i, n)] = 1.0;
                for k in 0..dim {
                    e_matrix[(i, n + 1 + k)] = target_positions[(i, k)];
                }
            }
        }

        // Condense E A^-1 into a single operator: solve A X = E^T, H = X^T.
        let lu: PartialPivLu<f64> = a_matrix.partial_piv_lu();
        let x = lu.solve(e_matrix.transpose());
        let h_full = x.transpose().to_owned();

        // Only the kernel columns multiply values; polynomial columns carry
        // no data and are dropped from the stored operator.
        self.h_hat = h_full.as_ref().subcols(0, n).to_owned();
        self.computed = true;
    }

    fn interpolate(&mut self, values: &Mat<f64>) -> Mat<f64> {
        assert!(self.computed, "interpolate called before compute");
        assert_eq!(
            values.nrows(),
            self.h_hat.ncols(),
            "one value row per control point is required"
        );
        &self.h_hat * values
    }

    fn computed(&self) -> bool {
        self.computed
    }

    fn trim_static_columns(&mut self, nb_columns: usize) {
        assert!(self.computed, "trim called before compute");
        assert!(
            nb_columns <= self.h_hat.ncols(),
            "cannot trim more columns than the operator has"
        );
        let keep = self.h_hat.ncols() - nb_columns;
        self.h_hat = self.h_hat.as_ref().subcols(0, keep).to_owned();
    }
}

/// Factory producing [`DenseRbfSolver`] instances for a kernel configuration.
#[derive(Debug, Clone, Copy)]
pub struct DenseSolverFactory {
    kernel_type: RbfFunctionType,
    polynomial_term: bool,
}

impl DenseSolverFactory {
    pub fn new(kernel_type: RbfFunctionType, polynomial_term: bool) -> Self {
        Self {
            kernel_type,
            polynomial_term,
        }
    }
}

impl SolverFactory for DenseSolverFactory {
    fn build(&self) -> Box<dyn RbfSolver> {
        Box::new(DenseRbfSolver::new(
            self.kernel_type.build(),
            self.polynomial_term,
        ))
    }

    fn correction_kernel(&self, radius: f64) -> Box<dyn RbfFunction> {
        self.kernel_type.with_radius(radius).build()
    }

    fn polynomial_term(&self) -> bool {
        self.polynomial_term
    }
}
