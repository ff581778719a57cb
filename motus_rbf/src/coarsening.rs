/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the adaptive coarsening controller orchestrating selection and interpolation.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Adaptive coarsening controller.

use std::sync::Arc;

use faer::Mat;
use motus_rbf_utils::{SMALL, max_row_norm, select_mat_rows};

use crate::common::selected_points_to_csv;
use crate::config::{CoarseningSettings, SelectionMode};
use crate::correction::SurfaceCorrection;
use crate::progress::{ProgressMsg, ProgressSink};
use crate::selection::{GreedySelector, SeedRule, SelectionReport};
use crate::solver::{RbfSolver, SolverFactory};

/// Adaptive control-point coarsening for RBF mesh motion.
///
/// Wraps an interpolation solver and replaces the full control-point set
/// with a greedily selected subset. Depending on the configured
/// [`SelectionMode`] the subset is fixed, chosen once from a unit
/// displacement probe, or re-derived from the live displacement field
/// whenever the cached selection stops resolving it.
///
/// The expected call sequence per mesh is one [`compute`](Self::compute)
/// followed by one [`interpolate`](Self::interpolate) per motion step, with
/// [`set_nb_moving_and_static_face_centers`](Self::set_nb_moving_and_static_face_centers)
/// whenever the moving/static partition changes.
pub struct RbfCoarsening {
    settings: CoarseningSettings,
    factory: Box<dyn SolverFactory>,

    /// Operator from the selected points to the interpolation targets.
    solver: Box<dyn RbfSolver>,

    /// Operator from the selected points back to all control points,
    /// used by the live reselection check.
    coarse: Box<dyn RbfSolver>,

    positions: Mat<f64>,
    positions_interpolation: Mat<f64>,

    /// Accumulated total displacement field (live mode).
    total_values: Mat<f64>,

    selected: Vec<usize>,
    residuals: Mat<f64>,
    correction: Option<SurfaceCorrection>,

    nb_moving_face_centers: usize,
    nb_static_face_centers: usize,
    face_centers_set: bool,

    /// Static-row trim count snapshotted when the operator was fitted.
    nb_static_removed: usize,

    file_export_index: usize,
    progress_callback: Option<Arc<dyn ProgressSink>>,
    last_report: Option<SelectionReport>,
    selection_count: usize,
}

impl RbfCoarsening {
    /// Returns a new [`RbfCoarseningBuilder`].
    pub fn builder(
        factory: Box<dyn SolverFactory>,
        settings: CoarseningSettings,
    ) -> RbfCoarseningBuilder {
        RbfCoarseningBuilder {
            factory,
            settings,
            progress_callback: None,
        }
    }

    /// Registers the control points and interpolation targets.
    ///
    /// Resets all cached state; selection runs lazily on the next
    /// [`interpolate`](Self::interpolate) call.
    pub fn compute(&mut self, positions: Mat<f64>, positions_interpolation: Mat<f64>) {
        assert!(positions.ncols() > 0, "points need at least one coordinate");
        assert!(positions.nrows() > 0, "at least one control point is required");
        assert!(
            positions_interpolation.nrows() > 0,
            "at least one interpolation target is required"
        );
        assert_eq!(
            positions.ncols(),
            positions_interpolation.ncols(),
            "control and target points must share a dimension"
        );

        self.positions = positions;
        self.positions_interpolation = positions_interpolation;
        self.solver = self.factory.build();
        self.coarse = self.factory.build();
        self.total_values = Mat::new();
        self.selected.clear();
        self.residuals = Mat::new();
        self.correction = match self.settings.surface_correction {
            true => Some(SurfaceCorrection::new(self.settings.ratio_radius_error)),
            false => None,
        };
        self.nb_static_removed = 0;
        self.last_report = None;
        self.selection_count = 0;
    }

    /// Interpolates a displacement field from the control points to the
    /// interpolation targets, running or reusing the point selection as
    /// the configured mode dictates.
    ///
    /// In live mode with `sum_incremental_values` the input is treated as
    /// an incremental step and accumulated into the running total field
    /// that drives selection; the returned field is the interpolation of
    /// the increment itself.
    pub fn interpolate(&mut self, values: &Mat<f64>) -> Mat<f64> {
        assert!(
            self.positions.nrows() > 0,
            "interpolate called before compute"
        );
        assert_eq!(
            values.nrows(),
            self.positions.nrows(),
            "one value row per control point is required"
        );

        let used_values = match self.settings.mode {
            SelectionMode::Disabled => {
                if !self.solver.computed() {
                    self.solver
                        .compute(&self.positions, &self.positions_interpolation);
                    self.nb_static_removed = match self.face_centers_set {
                        true => self.nb_static_face_centers,
                        false => 0,
                    };
                    self.solver.trim_static_columns(self.nb_static_removed);
                }
                values.clone()
            }
            SelectionMode::Static => {
                if !self.solver.computed() {
                    let probe = self.unit_displacement();
                    let selector = GreedySelector::new(
                        SeedRule::LargestRadius,
                        self.settings.growth,
                        self.settings.tol,
                        self.settings.min_points,
                        self.settings.max_points,
                    );
                    let selection = selector.select(
                        &self.positions,
                        &probe,
                        self.factory.as_ref(),
                        self.progress_callback.as_ref(),
                    );
                    self.finish_selection(selection);
                }
                select_mat_rows(values, &self.selected)
            }
            SelectionMode::Live => {
                self.accumulate(values);

                if self.needs_reselection() {
                    let selector = GreedySelector::new(
                        SeedRule::LargestDisplacement,
                        self.settings.growth,
                        self.settings.tol,
                        self.settings.min_points,
                        self.settings.max_points,
                    );
                    let selection = selector.select(
                        &self.positions,
                        &self.total_values,
                        self.factory.as_ref(),
                        self.progress_callback.as_ref(),
                    );
                    self.finish_selection(selection);
                }
                select_mat_rows(values, &self.selected)
            }
        };

        // Drop the trailing static rows matching the operator trim.
        let keep = used_values.nrows() - self.nb_static_removed;
        let used_values = used_values.as_ref().subrows(0, keep).to_owned();

        let mut values_interpolation = self.solver.interpolate(&used_values);

        if self.settings.mode == SelectionMode::Live {
            if let Some(correction) = self.correction.as_mut() {
                correction.apply(
                    self.factory.as_ref(),
                    &self.positions,
                    &self.positions_interpolation,
                    &self.residuals,
                    &mut values_interpolation,
                );
            }
        }

        values_interpolation
    }

    /// Updates the moving/static partition boundary.
    ///
    /// With selection enabled the static trim count is re-derived from the
    /// current selection; it takes effect on operators fitted afterwards.
    pub fn set_nb_moving_and_static_face_centers(
        &mut self,
        nb_moving_face_centers: usize,
        nb_static_face_centers: usize,
    ) {
        self.nb_moving_face_centers = nb_moving_face_centers;
        self.nb_static_face_centers = nb_static_face_centers;
        self.face_centers_set = true;
    }

    /// Indices of the currently selected control points, in selection order.
    pub fn selected_indices(&self) -> &[usize] {
        &self.selected
    }

    /// Summary of the most recent selection, if any has run.
    pub fn last_selection(&self) -> Option<SelectionReport> {
        self.last_report
    }

    /// Number of selections performed since the last [`compute`](Self::compute).
    pub fn selection_count(&self) -> usize {
        self.selection_count
    }

    fn accumulate(&mut self, values: &Mat<f64>) {
        if !self.settings.sum_incremental_values
            || self.total_values.nrows() != values.nrows()
            || self.total_values.ncols() != values.ncols()
        {
            self.total_values = values.clone();
        } else {
            self.total_values = &self.total_values + values;
        }
    }

    /// Live reselection check: evaluates the cached coarse operator on the
    /// selected rows of the total field and compares against the full field.
    fn needs_reselection(&mut self) -> bool {
        if !self.coarse.computed() {
            return true;
        }

        let values_coarse = select_mat_rows(&self.total_values, &self.selected);
        let values_interpolation_coarse = self.coarse.interpolate(&values_coarse);

        let epsilon = SMALL.sqrt();
        self.residuals = &values_interpolation_coarse - &self.total_values;
        let error = self.residuals.as_ref().norm_l2()
            / (self.total_values.as_ref().norm_l2() + epsilon);
        let error_max = max_row_norm(&self.residuals) / (max_row_norm(&self.total_values) + epsilon);

        let tol = self.settings.tol_live_point_selection;
        let reselection = !(error < tol && error_max < tol);

        if let Some(sink) = self.progress_callback.as_ref() {
            sink.emit(ProgressMsg::ReselectionCheck {
                error,
                error_max,
                tol,
                reselection,
            });
        }

        reselection
    }

    /// Installs a finished selection: stores its indices and residuals,
    /// exports them if requested, refits both operators, and snapshots the
    /// static trim count.
    fn finish_selection(&mut self, selection: crate::selection::GreedySelection) {
        self.selected = selection.indices;
        self.residuals = selection.residuals;
        self.last_report = Some(selection.report);
        self.selection_count += 1;

        if let Some(dir) = self.settings.export_path.clone() {
            let path = dir.join(format!("coarsening_selection_{}.csv", self.file_export_index));
            self.file_export_index += 1;
            if let Err(err) = selected_points_to_csv(&self.positions, &self.selected, &path) {
                if let Some(sink) = self.progress_callback.as_ref() {
                    sink.emit(ProgressMsg::Message {
                        message: format!("selection export to {} failed: {err}", path.display()),
                    });
                }
            }
        }

        let positions_coarse = select_mat_rows(&self.positions, &self.selected);

        self.solver = self.factory.build();
        self.solver
            .compute(&positions_coarse, &self.positions_interpolation);

        if self.settings.mode == SelectionMode::Live {
            self.coarse = self.factory.build();
            self.coarse.compute(&positions_coarse, &self.positions);
        }

        self.nb_static_removed = match self.face_centers_set {
            true => self
                .selected
                .iter()
                .filter(|&&index| index >= self.nb_moving_face_centers)
                .count(),
            false => 0,
        };
        self.solver.trim_static_columns(self.nb_static_removed);

        if let Some(correction) = self.correction.as_mut() {
            correction.invalidate();
        }
    }

    /// Synthetic displacement probe for static selection: one in every
    /// component for moving points, zero for static points. A zero moving
    /// count marks every point as moving.
    fn unit_displacement(&self) -> Mat<f64> {
        let n = self.positions.nrows();
        let d = self.positions.ncols();

        assert!(
            n >= self.nb_moving_face_centers,
            "moving point count exceeds the control point count"
        );

        match self.nb_moving_face_centers {
            0 => Mat::from_fn(n, d, |_, _| 1.0),
            nb_moving => Mat::from_fn(n, d, |i, _| match i < nb_moving {
                true => 1.0,
                false => 0.0,
            }),
        }
    }
}

/// A convenience builder for constructing an [`RbfCoarsening`] instance.
pub struct RbfCoarseningBuilder {
    factory: Box<dyn SolverFactory>,
    settings: CoarseningSettings,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl RbfCoarseningBuilder {
    /// Optional callback for reporting selection progress and diagnostics.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Builds and returns an [`RbfCoarsening`] instance.
    pub fn build(self) -> RbfCoarsening {
        // A unit probe cannot constrain a polynomial tail; the augmented
        // system may be rank deficient during selection.
        if self.settings.mode == SelectionMode::Static && self.factory.polynomial_term() {
            if let Some(sink) = self.progress_callback.as_ref() {
                sink.emit(ProgressMsg::Message {
                    message: "unit displacement selection combined with a polynomial term \
                              can produce unexpected results"
                        .to_string(),
                });
            }
        }

        let solver = self.factory.build();
        let coarse = self.factory.build();

        RbfCoarsening {
            settings: self.settings,
            factory: self.factory,
            solver,
            coarse,
            positions: Mat::new(),
            positions_interpolation: Mat::new(),
            total_values: Mat::new(),
            selected: Vec::new(),
            residuals: Mat::new(),
            correction: None,
            nb_moving_face_centers: 0,
            nb_static_face_centers: 0,
            face_centers_set: false,
            nb_static_removed: 0,
            file_export_index: 0,
            progress_callback: self.progress_callback,
            last_report: None,
            selection_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::generate_random_points;
    use crate::config::RbfFunctionType;
    use crate::solver::{DenseRbfSolver, DenseSolverFactory};

    fn factory(radius: f64) -> Box<dyn SolverFactory> {
        Box::new(DenseSolverFactory::new(
            RbfFunctionType::WendlandC2 { radius },
            false,
        ))
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
    fn disabled_mode_matches_the_plain_solver() {
        let positions = generate_random_points(25, 3, 101);
        let targets = generate_random_points(40, 3, 102);
        let values = generate_random_points(25, 3, 103);

        let settings = CoarseningSettings::builder(SelectionMode::Disabled).build();
        let mut coarsening = RbfCoarsening::builder(factory(10.0), settings).build();
        coarsening.compute(positions.clone(), targets.clone());
        let actual = coarsening.interpolate(&values);

        let mut reference =
            DenseRbfSolver::new(RbfFunctionType::WendlandC2 { radius: 10.0 }.build(), false);
        reference.compute(&positions, &targets);
        let expected = reference.interpolate(&values);

        for i in 0..40 {
            for k in 0..3 {
                assert!((actual[(i, k)] - expected[(i, k)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn static_mode_selects_once_and_is_idempotent() {
        let positions = circle_points(50);
        let targets = generate_random_points(30, 2, 111);
        let values = generate_random_points(50, 2, 112);

        let settings = CoarseningSettings::builder(SelectionMode::Static)
            .tol(0.05)
            .min_points(4)
            .max_points(50)
            .build();
        let mut coarsening = RbfCoarsening::builder(factory(5.0), settings).build();
        coarsening.compute(positions, targets);

        let first = coarsening.interpolate(&values);
        assert_eq!(coarsening.selection_count(), 1);

        let second = coarsening.interpolate(&values);
        assert_eq!(coarsening.selection_count(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn live_mode_reuses_a_selection_that_still_resolves_the_field() {
        let positions = circle_points(60);
        let targets = generate_random_points(20, 2, 121);
        let values = positions.clone();

        let settings = CoarseningSettings::builder(SelectionMode::Live)
            .tol(0.05)
            .tol_live_point_selection(0.5)
            .min_points(4)
            .max_points(60)
            .build();
        let mut coarsening = RbfCoarsening::builder(factory(5.0), settings).build();
        coarsening.compute(positions, targets);

        let _ = coarsening.interpolate(&values);
        assert_eq!(coarsening.selection_count(), 1);

        // A zero increment leaves the accumulated field unchanged, so the
        // cached selection still resolves it.
        let zero = Mat::<f64>::zeros(60, 2);
        let _ = coarsening.interpolate(&zero);
        assert_eq!(coarsening.selection_count(), 1);
    }

    #[test]
    fn live_mode_retriggers_selection_when_the_field_changes_shape() {
        let positions = circle_points(60);
        let targets = generate_random_points(20, 2, 131);

        let settings = CoarseningSettings::builder(SelectionMode::Live)
            .tol(0.05)
            .tol_live_point_selection(0.05)
            .min_points(4)
            .max_points(60)
            .build();
        let mut coarsening = RbfCoarsening::builder(factory(5.0), settings).build();
        coarsening.compute(positions.clone(), targets);

        let _ = coarsening.interpolate(&positions);
        assert_eq!(coarsening.selection_count(), 1);

        // A strongly different increment breaks the cached selection.
        let spike = Mat::from_fn(60, 2, |i, _| match i % 7 {
            0 => 5.0,
            _ => -1.0,
        });
        let _ = coarsening.interpolate(&spike);
        assert_eq!(coarsening.selection_count(), 2);
    }

    #[test]
    fn accumulated_increments_select_like_the_summed_field() {
        let positions = circle_points(40);
        let targets = generate_random_points(15, 2, 141);
        let step = Mat::from_fn(40, 2, |i, j| positions[(i, j)] * 0.2);

        let settings = |sum| {
            CoarseningSettings::builder(SelectionMode::Live)
                .tol(0.05)
                .tol_live_point_selection(1.0e-12)
                .min_points(4)
                .max_points(40)
                .sum_incremental_values(sum)
                .build()
        };

        // Five equal increments with accumulation on.
        let mut incremental = RbfCoarsening::builder(factory(5.0), settings(true)).build();
        incremental.compute(positions.clone(), targets.clone());
        for _ in 0..5 {
            let _ = incremental.interpolate(&step);
        }

        // One call carrying the same running sum with accumulation off,
        // built with the same association order so the totals are bitwise
        // equal.
        let mut total = step.clone();
        for _ in 0..4 {
            total = &total + &step;
        }
        let mut one_shot = RbfCoarsening::builder(factory(5.0), settings(false)).build();
        one_shot.compute(positions, targets);
        let _ = one_shot.interpolate(&total);

        assert_eq!(incremental.selected_indices(), one_shot.selected_indices());
        assert_eq!(incremental.last_selection(), one_shot.last_selection());
    }

    #[test]
    fn static_partition_trims_selected_static_points() {
        // Last ten points are static; their probe rows are zero, so the
        // unit-probe seed can only start in the moving prefix.
        let positions = circle_points(50);
        let targets = generate_random_points(20, 2, 151);

        let settings = CoarseningSettings::builder(SelectionMode::Static)
            .tol(0.05)
            .min_points(4)
            .max_points(50)
            .build();
        let mut coarsening = RbfCoarsening::builder(factory(5.0), settings).build();
        coarsening.compute(positions, targets);
        coarsening.set_nb_moving_and_static_face_centers(40, 10);

        let values = generate_random_points(50, 2, 152);
        let result = coarsening.interpolate(&values);
        assert_eq!(result.nrows(), 20);
        assert_eq!(coarsening.selection_count(), 1);
        assert!(coarsening.selected_indices().len() >= 4);

        // The trim snapshot stays aligned with the fitted operator, so
        // later calls keep working and stay deterministic.
        let again = coarsening.interpolate(&values);
        assert_eq!(result, again);
    }

    #[test]
    fn surface_correction_pins_targets_on_the_boundary() {
        // Targets coincide with control points, so corrected output must
        // reproduce the total field exactly at those points.
        let positions = circle_points(60);
        let targets = positions.clone();
        let values = positions.clone();

        let settings = CoarseningSettings::builder(SelectionMode::Live)
            .tol(0.2)
            .tol_live_point_selection(0.5)
            .min_points(4)
            .max_points(10)
            .surface_correction(true)
            .ratio_radius_error(10.0)
            .build();
        let mut coarsening = RbfCoarsening::builder(factory(5.0), settings).build();
        coarsening.compute(positions.clone(), targets);

        let corrected = coarsening.interpolate(&values);

        for i in 0..60 {
            for k in 0..2 {
                assert!(
                    (corrected[(i, k)] - values[(i, k)]).abs() < 1e-6,
                    "boundary point {i} not pinned"
                );
            }
        }
    }

    #[test]
    #[should_panic]
    fn interpolate_before_compute_is_rejected() {
        let settings = CoarseningSettings::builder(SelectionMode::Live).build();
        let mut coarsening = RbfCoarsening::builder(factory(5.0), settings).build();
        let _ = coarsening.interpolate(&Mat::<f64>::zeros(3, 3));
    }
}
