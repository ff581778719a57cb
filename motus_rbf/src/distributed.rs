/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements unit-probe control-point coarsening over row-partitioned distributed data.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Unit-probe coarsening over row-partitioned data.
//!
//! The selection logic mirrors the static mode of
//! [`RbfCoarsening`](crate::coarsening::RbfCoarsening), but every matrix is a
//! [`DistributedRows`] value whose rows live on different process ranks, and
//! row gathers go through an explicit pull queue instead of indexed copies.

use std::sync::Arc;

use crate::progress::{ProgressMsg, ProgressSink};
use crate::selection::SelectionReport;

/// A dense matrix whose rows are partitioned across process ranks.
///
/// Element access is collective: `get` returns the same value on every
/// rank, while bulk row gathers use the two-phase pull queue. Callers
/// first reserve and queue the entries their rank owns in the destination,
/// then drain the queue into a flat buffer ordered like the queued calls.
pub trait DistributedRows: Clone {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    /// Rank of the calling process within the matrix's communicator.
    fn rank(&self) -> usize;

    /// A zero-filled matrix on the same communicator and distribution.
    fn zeros(&self, rows: usize, cols: usize) -> Self;

    /// Sets every entry to `value`.
    fn fill(&mut self, value: f64);

    /// Collective read of one entry.
    fn get(&self, row: usize, col: usize) -> f64;

    /// Local write of one entry; the calling rank must own it.
    fn set(&mut self, row: usize, col: usize, value: f64);

    /// Scales one column in place.
    fn scale_col(&mut self, col: usize, alpha: f64);

    /// `self += alpha * other`, elementwise.
    fn axpy(&mut self, alpha: f64, other: &Self);

    /// Collective Frobenius norm over all ranks.
    fn norm(&self) -> f64;

    /// Index and value of the largest Euclidean row norm.
    fn max_row_norm_loc(&self) -> (usize, f64);

    /// Rank owning the given entry.
    fn owner(&self, row: usize, col: usize) -> usize;

    fn reserve_pulls(&mut self, nb_pulls: usize);
    fn queue_pull(&mut self, row: usize, col: usize);

    /// Executes the queued pulls, returning their values in queue order.
    fn process_pull_queue(&mut self) -> Vec<f64>;
}

/// An interpolation operator over distributed matrices.
pub trait DistributedSolver<V: DistributedRows> {
    fn compute(&mut self, control_positions: V, target_positions: V);
    fn interpolate(&mut self, values: &V) -> V;
    fn computed(&self) -> bool;
}

/// Builds fresh [`DistributedSolver`] instances with a shared kernel setup.
pub trait DistributedSolverFactory<V: DistributedRows> {
    fn build(&self) -> Box<dyn DistributedSolver<V>>;
}

/// Gathers the given rows of `data` into `selection`.
///
/// Each rank queues pulls for exactly the entries of `selection` it owns,
/// so after the queue is drained every rank holds its local part of the
/// gathered rows. The unpack order must match the queue order.
pub fn pull_selected_rows<V: DistributedRows>(
    selected: &[usize],
    data: &mut V,
    selection: &mut V,
) {
    assert_eq!(selection.rows(), selected.len());

    let rank = selection.rank();
    let mut nb_pulls = 0;

    for j in 0..selected.len() {
        for dim in 0..data.cols() {
            if selection.owner(j, dim) == rank {
                nb_pulls += 1;
            }
        }
    }

    data.reserve_pulls(nb_pulls);

    for (j, &row) in selected.iter().enumerate() {
        for dim in 0..data.cols() {
            if selection.owner(j, dim) == rank {
                data.queue_pull(row, dim);
            }
        }
    }

    let buffer = data.process_pull_queue();
    let mut index = 0;

    for j in 0..selected.len() {
        for dim in 0..data.cols() {
            if selection.owner(j, dim) == rank {
                selection.set(j, dim, buffer[index]);
                index += 1;
            }
        }
    }
}

/// One-shot unit-probe coarsening for distributed control points.
///
/// Selection runs once inside [`compute`](Self::compute); thereafter the
/// selected points back every interpolation. The probe field is all ones,
/// so the norms in the relative error scalars are known in closed form.
pub struct DistributedUnitCoarsening<V: DistributedRows> {
    tol: f64,
    min_points: usize,
    max_points: usize,
    selected: Vec<usize>,
    factory: Box<dyn DistributedSolverFactory<V>>,
    solver: Box<dyn DistributedSolver<V>>,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl<V: DistributedRows> DistributedUnitCoarsening<V> {
    pub fn new(
        factory: Box<dyn DistributedSolverFactory<V>>,
        tol: f64,
        min_points: usize,
        max_points: usize,
    ) -> Self {
        assert!(tol > 0.0 && tol <= 1.0, "tolerance must lie in (0, 1]");
        assert!(
            max_points >= min_points,
            "max_points must not be below min_points"
        );

        let solver = factory.build();

        Self {
            tol,
            min_points,
            max_points,
            selected: Vec::new(),
            factory,
            solver,
            progress_callback: None,
        }
    }

    /// Optional callback for reporting selection diagnostics. Only rank 0
    /// emits, so a shared sink sees each event once.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Selects the control-point subset from a unit probe and fits the
    /// interpolation operator from it to the target positions.
    pub fn compute(&mut self, mut positions: V, positions_interpolation: V) {
        let nb_points = positions.rows();
        let dim = positions.cols();
        assert!(nb_points >= 2, "greedy selection needs at least two points");
        assert!(dim > 0, "points need at least one coordinate");

        self.selected.clear();

        // First seed: largest radius from the origin.
        let (first, _) = positions.max_row_norm_loc();
        self.selected.push(first);

        // Second seed: largest distance from the first point.
        let mut distance = positions.clone();
        let mut shift = positions.zeros(nb_points, dim);
        shift.fill(1.0);
        for col in 0..dim {
            shift.scale_col(col, positions.get(first, col));
        }
        distance.axpy(-1.0, &shift);
        let (second, _) = distance.max_row_norm_loc();
        self.selected.push(second);

        let max_points = self.max_points.min(nb_points);
        let min_points = self.min_points.min(nb_points);

        // The probe field is all ones, so its norms are known in closed form.
        let unit_norm = ((nb_points * dim) as f64).sqrt();
        let unit_row_norm = (dim as f64).sqrt();
        let epsilon = motus_rbf_utils::SMALL.sqrt();

        let mut error = 0.0;
        let mut error_max = 0.0;

        for _ in 0..max_points {
            // Gather the selected rows and fit a coarse interpolant back
            // onto all control points.
            let mut positions_coarse = positions.zeros(self.selected.len(), dim);
            pull_selected_rows(&self.selected, &mut positions, &mut positions_coarse);

            let mut values_coarse = positions.zeros(self.selected.len(), dim);
            values_coarse.fill(1.0);

            let mut coarse = self.factory.build();
            coarse.compute(positions_coarse, positions.clone());
            let result = coarse.interpolate(&values_coarse);

            assert_eq!(result.rows(), nb_points);
            assert_eq!(result.cols(), dim);

            // Relative errors of the coarse fit against the unit probe.
            let mut diff = positions.zeros(nb_points, dim);
            diff.fill(1.0);
            diff.axpy(-1.0, &result);
            let (loc, largest_row_error) = diff.max_row_norm_loc();
            error = diff.norm() / (unit_norm + epsilon);
            error_max = largest_row_error / (unit_row_norm + epsilon);

            if self.selected.len() >= max_points {
                break;
            }

            let convergence =
                error < self.tol && error_max < self.tol && self.selected.len() >= min_points;
            if convergence {
                break;
            }

            self.selected.push(loc);
        }

        if positions.rank() == 0 {
            if let Some(sink) = self.progress_callback.as_ref() {
                sink.emit(ProgressMsg::Selection(SelectionReport {
                    selected: self.selected.len(),
                    total: nb_points,
                    error,
                    error_max,
                    tol: self.tol,
                }));
            }
        }

        let mut positions_coarse = positions.zeros(self.selected.len(), dim);
        pull_selected_rows(&self.selected, &mut positions, &mut positions_coarse);

        self.solver = self.factory.build();
        self.solver.compute(positions_coarse, positions_interpolation);
    }

    /// Whether [`compute`](Self::compute) has fitted the operator.
    pub fn initialized(&self) -> bool {
        self.solver.computed()
    }

    /// Indices of the selected control points, in selection order.
    pub fn selected_indices(&self) -> &[usize] {
        &self.selected
    }

    /// Interpolates per-control-point values to the target positions.
    pub fn interpolate(&mut self, values: &V) -> V {
        assert!(self.initialized(), "interpolate called before compute");

        let mut data = values.clone();
        let mut selected_values = values.zeros(self.selected.len(), values.cols());
        pull_selected_rows(&self.selected, &mut data, &mut selected_values);

        self.solver.interpolate(&selected_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::generate_random_points;
    use crate::config::RbfFunctionType;
    use crate::solver::{DenseRbfSolver, RbfSolver};
    use faer::Mat;
    use motus_rbf_utils::get_norm;

    /// Single-rank stand-in for a row-partitioned matrix: one process owns
    /// everything, and the pull queue degenerates to indexed reads.
    #[derive(Debug, Clone)]
    struct SingleRankRows {
        data: Mat<f64>,
        pull_queue: Vec<(usize, usize)>,
    }

    impl SingleRankRows {
        fn new(data: Mat<f64>) -> Self {
            Self {
                data,
                pull_queue: Vec::new(),
            }
        }
    }

    impl DistributedRows for SingleRankRows {
        fn rows(&self) -> usize {
            self.data.nrows()
        }

        fn cols(&self) -> usize {
            self.data.ncols()
        }

        fn rank(&self) -> usize {
            0
        }

        fn zeros(&self, rows: usize, cols: usize) -> Self {
            Self::new(Mat::zeros(rows, cols))
        }

        fn fill(&mut self, value: f64) {
            for i in 0..self.data.nrows() {
                for j in 0..self.data.ncols() {
                    self.data[(i, j)] = value;
                }
            }
        }

        fn get(&self, row: usize, col: usize) -> f64 {
            self.data[(row, col)]
        }

        fn set(&mut self, row: usize, col: usize, value: f64) {
            self.data[(row, col)] = value;
        }

        fn scale_col(&mut self, col: usize, alpha: f64) {
            for i in 0..self.data.nrows() {
                self.data[(i, col)] *= alpha;
            }
        }

        fn axpy(&mut self, alpha: f64, other: &Self) {
            for i in 0..self.data.nrows() {
                for j in 0..self.data.ncols() {
                    self.data[(i, j)] += alpha * other.data[(i, j)];
                }
            }
        }

        fn norm(&self) -> f64 {
            self.data.as_ref().norm_l2()
        }

        fn max_row_norm_loc(&self) -> (usize, f64) {
            let mut loc = 0;
            let mut max_norm = -1.0;
            for i in 0..self.data.nrows() {
                let norm = get_norm(self.data.row(i));
                if norm > max_norm {
                    max_norm = norm;
                    loc = i;
                }
            }
            (loc, max_norm)
        }

        fn owner(&self, _row: usize, _col: usize) -> usize {
            0
        }

        fn reserve_pulls(&mut self, nb_pulls: usize) {
            self.pull_queue.reserve(nb_pulls);
        }

        fn queue_pull(&mut self, row: usize, col: usize) {
            self.pull_queue.push((row, col));
        }

        fn process_pull_queue(&mut self) -> Vec<f64> {
            let buffer = self
                .pull_queue
                .iter()
                .map(|&(row, col)| self.data[(row, col)])
                .collect();
            self.pull_queue.clear();
            buffer
        }
    }

    struct LocalSolver {
        inner: DenseRbfSolver,
    }

    impl DistributedSolver<SingleRankRows> for LocalSolver {
        fn compute(&mut self, control_positions: SingleRankRows, target_positions: SingleRankRows) {
            self.inner
                .compute(&control_positions.data, &target_positions.data);
        }

        fn interpolate(&mut self, values: &SingleRankRows) -> SingleRankRows {
            SingleRankRows::new(self.inner.interpolate(&values.data))
        }

        fn computed(&self) -> bool {
            self.inner.computed()
        }
    }

    struct LocalSolverFactory {
        kernel_type: RbfFunctionType,
    }

    impl DistributedSolverFactory<SingleRankRows> for LocalSolverFactory {
        fn build(&self) -> Box<dyn DistributedSolver<SingleRankRows>> {
            Box::new(LocalSolver {
                inner: DenseRbfSolver::new(self.kernel_type.build(), false),
            })
        }
    }

    fn factory() -> Box<dyn DistributedSolverFactory<SingleRankRows>> {
        Box::new(LocalSolverFactory {
            kernel_type: RbfFunctionType::WendlandC2 { radius: 5.0 },
        })
    }

    fn circle_points(n: usize) -> Mat<f64> {
        Mat::from_fn(n, 2, |i, j| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            match j {
                0 => angle.cos(),
                _ => angle.sin(),
            }
        })
    }

    #[test]
    fn pull_choreography_gathers_rows_in_order() {
        let mut data = SingleRankRows::new(generate_random_points(12, 3, 201));
        let selected = vec![5, 0, 9];
        let mut selection = data.zeros(3, 3);

        pull_selected_rows(&selected, &mut data, &mut selection);

        for (j, &row) in selected.iter().enumerate() {
            for dim in 0..3 {
                assert_eq!(selection.data[(j, dim)], data.data[(row, dim)]);
            }
        }
        assert!(data.pull_queue.is_empty());
    }

    #[test]
    fn first_seed_is_the_farthest_point_from_the_origin() {
        let mut points = generate_random_points(15, 2, 211);
        points[(11, 0)] = 40.0;
        points[(11, 1)] = -40.0;

        let mut coarsening = DistributedUnitCoarsening::new(factory(), 0.1, 2, 15);
        coarsening.compute(
            SingleRankRows::new(points.clone()),
            SingleRankRows::new(points),
        );

        assert_eq!(coarsening.selected_indices()[0], 11);
    }

    #[test]
    fn unit_probe_converges_on_a_circle() {
        let positions = circle_points(80);

        let mut coarsening = DistributedUnitCoarsening::new(factory(), 0.05, 4, 80);
        coarsening.compute(
            SingleRankRows::new(positions.clone()),
            SingleRankRows::new(positions.clone()),
        );

        assert!(coarsening.initialized());
        let selected = coarsening.selected_indices();
        assert!(selected.len() >= 4);
        assert!(selected.len() <= 80);

        let mut sorted = selected.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), selected.len(), "duplicate selection");

        // Interpolating the unit probe back onto the control points must
        // resolve it to the selection tolerance; the relative row bound
        // allows a factor of sqrt(2) on the absolute row error in 2-D.
        let mut unit = SingleRankRows::new(Mat::zeros(80, 2));
        unit.fill(1.0);
        let result = coarsening.interpolate(&unit);

        for i in 0..80 {
            let row_error = ((result.data[(i, 0)] - 1.0).powi(2)
                + (result.data[(i, 1)] - 1.0).powi(2))
            .sqrt();
            assert!(row_error < 0.05 * 2.0f64.sqrt() + 1.0e-9, "row {i} error {row_error}");
        }
    }

    #[test]
    fn selection_is_capped_at_max_points() {
        let positions = generate_random_points(30, 3, 221);

        let mut coarsening = DistributedUnitCoarsening::new(factory(), 1.0e-3, 2, 6);
        coarsening.compute(
            SingleRankRows::new(positions.clone()),
            SingleRankRows::new(positions),
        );

        assert!(coarsening.selected_indices().len() <= 6);
    }
}
