/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the greedy control-point selection algorithm used by the coarsening controller.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Greedy control-point selection.

use std::sync::Arc;

use faer::Mat;
use motus_rbf_utils::{SMALL, get_norm, select_mat_rows};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::GrowthStrategy;
use crate::progress::{ProgressMsg, ProgressSink};
use crate::solver::SolverFactory;

/// Controls how the first seed point is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedRule {
    /// Seed with the point carrying the largest displacement row norm.
    /// Used when selecting against a real displacement field.
    LargestDisplacement,

    /// Seed with the moving point farthest from the origin. Used when
    /// selecting against a unit displacement probe, where every moving
    /// row norm ties.
    LargestRadius,
}

/// Summary of a completed greedy selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    /// Number of points selected.
    pub selected: usize,

    /// Total number of candidate points.
    pub total: usize,

    /// Relative 2-norm of the interpolation error over all candidates.
    pub error: f64,

    /// Relative worst-case row error over the unselected candidates.
    pub error_max: f64,

    /// Tolerance the selection ran against.
    pub tol: f64,
}

/// Result of a greedy selection run.
#[derive(Debug)]
pub struct GreedySelection {
    /// Indices of the selected points, in selection order.
    pub indices: Vec<usize>,

    /// Summary statistics of the final iteration.
    pub report: SelectionReport,

    /// Number of greedy iterations performed.
    pub iterations: usize,

    /// Final interpolation residual, one row per candidate point.
    pub residuals: Mat<f64>,
}

/// Greedy selector that grows a control-point subset until the coarse
/// interpolant resolves the given displacement field to tolerance.
///
/// Each iteration fits a coarse interpolant on the selected subset,
/// evaluates it at every candidate point, and adds the worst-resolved
/// unselected point. With [`GrowthStrategy::PairedPoint`] a second point
/// whose residual opposes the first is added in the same iteration.
#[derive(Debug, Clone, Copy)]
pub struct GreedySelector {
    seed: SeedRule,
    growth: GrowthStrategy,
    tol: f64,
    min_points: usize,
    max_points: usize,
}

impl GreedySelector {
    pub fn new(
        seed: SeedRule,
        growth: GrowthStrategy,
        tol: f64,
        min_points: usize,
        max_points: usize,
    ) -> Self {
        assert!(tol > 0.0 && tol < 1.0, "selection tolerance must lie in (0, 1)");
        assert!(min_points > 0, "at least one point must be selected");
        assert!(
            max_points >= min_points,
            "max_points must not be below min_points"
        );

        Self {
            seed,
            growth,
            tol,
            min_points,
            max_points,
        }
    }

    /// Runs the greedy selection for a displacement field.
    ///
    /// `positions` holds one candidate point per row and `values` the
    /// displacement at that point. Returns the selected subset together
    /// with the final residual field.
    pub fn select(
        &self,
        positions: &Mat<f64>,
        values: &Mat<f64>,
        factory: &dyn SolverFactory,
        progress: Option<&Arc<dyn ProgressSink>>,
    ) -> GreedySelection {
        let nb_points = positions.nrows();
        assert!(positions.ncols() > 0, "points need at least one coordinate");
        assert!(nb_points >= 2, "greedy selection needs at least two points");
        assert_eq!(
            nb_points,
            values.nrows(),
            "one value row per point is required"
        );

        let first = self.seed_point(positions, values);
        let second = self.second_seed_point(positions, first);

        let mut selected = vec![first, second];
        let mut is_selected = vec![false; nb_points];
        is_selected[first] = true;
        is_selected[second] = true;

        let max_nb_points = self.max_points.min(nb_points);
        let min_points = self.min_points.min(nb_points);
        let epsilon = SMALL.sqrt();
        let values_norm = values.as_ref().norm_l2();
        let values_max_row_norm = motus_rbf_utils::max_row_norm(values);

        let mut iterations = 0;
        let mut report;
        let residuals;

        loop {
            iterations += 1;

            // Fit the coarse interpolant on the current subset and evaluate
            // it at every candidate point.
            let positions_coarse = select_mat_rows(positions, &selected);
            let values_coarse = select_mat_rows(values, &selected);

            let mut solver = factory.build();
            solver.compute(&positions_coarse, positions);
            let values_interpolation_coarse = solver.interpolate(&values_coarse);

            let error_list: Vec<f64> = (0..nb_points)
                .into_par_iter()
                .map(|j| {
                    motus_rbf_utils::get_distance(
                        values_interpolation_coarse.row(j),
                        values.row(j),
                    )
                })
                .collect();

            // Worst-resolved point that is not already selected.
            let mut index = None;
            let mut largest_error = -1.0;
            for (i, &row_error) in error_list.iter().enumerate() {
                if !is_selected[i] && row_error > largest_error {
                    index = Some(i);
                    largest_error = row_error;
                }
            }

            let residual_norm: f64 = error_list.iter().map(|e| e * e).sum::<f64>().sqrt();
            let error = residual_norm / (values_norm + epsilon);
            let error_max = largest_error.max(0.0) / (values_max_row_norm + epsilon);

            report = SelectionReport {
                selected: selected.len(),
                total: nb_points,
                error,
                error_max,
                tol: self.tol,
            };

            let convergence = (error < self.tol
                && error_max < self.tol
                && selected.len() >= min_points)
                || selected.len() >= max_nb_points;

            if convergence || index.is_none() {
                residuals = &values_interpolation_coarse - values;
                break;
            }

            let index = match index {
                Some(index) => index,
                None => unreachable!(),
            };

            // With paired growth, also add the unselected point whose
            // residual opposes the worst one by more than 90 degrees.
            let mut index2 = None;
            if self.growth == GrowthStrategy::PairedPoint {
                let mut largest_error2 = -1.0;
                for (j, &row_error) in error_list.iter().enumerate() {
                    if is_selected[j] {
                        continue;
                    }
                    let mut dot = 0.0;
                    for k in 0..values.ncols() {
                        dot += (values_interpolation_coarse[(index, k)] - values[(index, k)])
                            * (values_interpolation_coarse[(j, k)] - values[(j, k)]);
                    }
                    if dot < -SMALL && row_error > largest_error2 {
                        index2 = Some(j);
                        largest_error2 = row_error;
                    }
                }
            }

            selected.push(index);
            is_selected[index] = true;

            if let Some(index2) = index2 {
                if index2 != index && selected.len() < max_nb_points {
                    selected.push(index2);
                    is_selected[index2] = true;
                }
            }
        }

        if let Some(sink) = progress {
            sink.emit(ProgressMsg::Selection(report));
        }

        GreedySelection {
            indices: selected,
            report,
            iterations,
            residuals,
        }
    }

    fn seed_point(&self, positions: &Mat<f64>, values: &Mat<f64>) -> usize {
        let nb_points = positions.nrows();

        match self.seed {
            SeedRule::LargestDisplacement => {
                let mut index = 0;
                let mut max_norm = -1.0;
                for i in 0..nb_points {
                    let norm = get_norm(values.row(i));
                    if norm > max_norm {
                        max_norm = norm;
                        index = i;
                    }
                }
                index
            }
            SeedRule::LargestRadius => {
                // Only moving points qualify; static rows have a zero probe.
                let mut index = None;
                let mut max_radius = -1.0;
                for i in 0..nb_points {
                    let radius = get_norm(positions.row(i));
                    if radius > max_radius && get_norm(values.row(i)) > SMALL {
                        max_radius = radius;
                        index = Some(i);
                    }
                }
                match index {
                    Some(index) => index,
                    None => panic!("no moving point found to seed the selection"),
                }
            }
        }
    }

    /// Finds the point farthest from the first seed, skipping distances in
    /// the unit band `1 +- SMALL` so a unit probe cannot pick a degenerate
    /// mirror point. Falls back to the plain farthest point when every
    /// candidate lies in the band.
    fn second_seed_point(&self, positions: &Mat<f64>, first: usize) -> usize {
        let nb_points = positions.nrows();
        let first_row = positions.row(first);

        let mut index = None;
        let mut max_radius = -1.0;
        let mut fallback = if first == 0 { 1 } else { 0 };
        let mut fallback_radius = -1.0;

        for i in 0..nb_points {
            if i == first {
                continue;
            }
            let radius = motus_rbf_utils::get_distance(positions.row(i), first_row);
            if radius > fallback_radius {
                fallback_radius = radius;
                fallback = i;
            }
            if radius > max_radius && (radius < 1.0 - SMALL || radius > 1.0 + SMALL) {
                max_radius = radius;
                index = Some(i);
            }
        }

        index.unwrap_or(fallback)
    }
}
