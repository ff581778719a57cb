/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares configuration types for kernel selection and the adaptive coarsening controller.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Declares configuration types for kernel selection and the adaptive coarsening controller.
use std::path::PathBuf;

use motus_rbf_utils::{
    RbfFunction, ThinPlateSplineFunction, WendlandC0Function, WendlandC2Function,
    WendlandC4Function, WendlandC6Function,
};
use serde::{Deserialize, Serialize};

/// Controls when the greedy point selection runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SelectionMode {
    /// Coarsening is bypassed entirely; every control point is used.
    Disabled,

    /// Selection runs once, against a unit displacement probe, on the
    /// first interpolation after a geometry update.
    Static,

    /// Selection runs against the accumulated displacement field and is
    /// re-triggered whenever the previous selection no longer resolves
    /// the field to tolerance.
    Live,
}

/// Controls how many points each greedy iteration adds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GrowthStrategy {
    /// Add the single worst-resolved point per iteration.
    SinglePoint,

    /// Additionally add a second point whose residual opposes the first,
    /// which damps oscillatory error fields.
    PairedPoint,
}

/// Enum for the available radial basis kernels.
///
/// The compactly supported Wendland kernels carry their support radius;
/// the thin plate spline is global and has none.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum RbfFunctionType {
    WendlandC0 { radius: f64 },
    WendlandC2 { radius: f64 },
    WendlandC4 { radius: f64 },
    WendlandC6 { radius: f64 },
    ThinPlateSpline,
}

impl RbfFunctionType {
    /// Instantiates the kernel this variant describes.
    pub fn build(&self) -> Box<dyn RbfFunction> {
        match *self {
            RbfFunctionType::WendlandC0 { radius } => Box::new(WendlandC0Function::new(radius)),
            RbfFunctionType::WendlandC2 { radius } => Box::new(WendlandC2Function::new(radius)),
            RbfFunctionType::WendlandC4 { radius } => Box::new(WendlandC4Function::new(radius)),
            RbfFunctionType::WendlandC6 { radius } => Box::new(WendlandC6Function::new(radius)),
            RbfFunctionType::ThinPlateSpline => Box::new(ThinPlateSplineFunction::new()),
        }
    }

    /// Returns the same kernel family re-parameterized with a new support
    /// radius. The thin plate spline has no radius and falls back to a
    /// Wendland C2 kernel of the requested support.
    pub fn with_radius(&self, radius: f64) -> RbfFunctionType {
        match *self {
            RbfFunctionType::WendlandC0 { .. } => RbfFunctionType::WendlandC0 { radius },
            RbfFunctionType::WendlandC2 { .. } => RbfFunctionType::WendlandC2 { radius },
            RbfFunctionType::WendlandC4 { .. } => RbfFunctionType::WendlandC4 { radius },
            RbfFunctionType::WendlandC6 { .. } => RbfFunctionType::WendlandC6 { radius },
            RbfFunctionType::ThinPlateSpline => RbfFunctionType::WendlandC2 { radius },
        }
    }
}

/// Parameters controlling the **adaptive control-point coarsening** process.
///
/// Coarsening replaces the full set of control points with a small greedily
/// selected subset whose interpolant resolves the displacement field to a
/// relative tolerance. The settings below govern when selection runs, how
/// the subset grows, and when the controller stops.
///
/// ### Default Values
/// - `mode`: [`SelectionMode::Live`]
/// - `growth`: [`GrowthStrategy::SinglePoint`]
/// - `tol`: `0.1`
/// - `tol_live_point_selection`: `0.1`
/// - `min_points`: `2`
/// - `max_points`: `1000`
/// - `sum_incremental_values`: `true`
/// - `surface_correction`: `false`
/// - `ratio_radius_error`: `10.0`
/// - `export_path`: `None`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoarseningSettings {
    /// When the greedy selection runs.
    pub mode: SelectionMode,

    /// How many points each greedy iteration adds.
    pub growth: GrowthStrategy,

    /// Relative tolerance the selection must reach before it may stop.
    pub tol: f64,

    /// Relative tolerance used by the live reselection check.
    pub tol_live_point_selection: f64,

    /// Minimum number of selected points.
    pub min_points: usize,

    /// Maximum number of selected points.
    pub max_points: usize,

    /// Whether incremental displacement inputs are accumulated into a
    /// running total, or each call already carries the full field.
    pub sum_incremental_values: bool,

    /// Whether a compactly supported correction is blended near the
    /// moving surface after each interpolation.
    pub surface_correction: bool,

    /// Support radius of the correction kernel as a multiple of the
    /// largest selection residual.
    pub ratio_radius_error: f64,

    /// Optional directory that receives a CSV of the selected points
    /// after each selection.
    pub export_path: Option<PathBuf>,
}

impl CoarseningSettings {
    /// Returns a new [`CoarseningSettingsBuilder`] for the given mode.
    pub fn builder(mode: SelectionMode) -> CoarseningSettingsBuilder {
        CoarseningSettingsBuilder::new(mode)
    }
}

/// A convenience builder for constructing a [`CoarseningSettings`] instance.
///
/// The builder should be called via the [`CoarseningSettings::builder`] method.
///
/// See [`CoarseningSettings`] for details on each field.
#[derive(Debug, Clone)]
pub struct CoarseningSettingsBuilder {
    pub mode: SelectionMode,
    pub growth: GrowthStrategy,
    pub tol: f64,
    pub tol_live_point_selection: f64,
    pub min_points: usize,
    pub max_points: usize,
    pub sum_incremental_values: bool,
    pub surface_correction: bool,
    pub ratio_radius_error: f64,
    pub export_path: Option<PathBuf>,
}

impl CoarseningSettingsBuilder {
    fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            growth: GrowthStrategy::SinglePoint,
            tol: 0.1,
            tol_live_point_selection: 0.1,
            min_points: 2,
            max_points: 1000,
            sum_incremental_values: true,
            surface_correction: false,
            ratio_radius_error: 10.0,
            export_path: None,
        }
    }

    /// Sets the growth strategy.
    pub fn growth(mut self, growth: GrowthStrategy) -> Self {
        self.growth = growth;
        self
    }

    /// Sets the selection tolerance.
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the live reselection tolerance.
    pub fn tol_live_point_selection(mut self, tol_live_point_selection: f64) -> Self {
        self.tol_live_point_selection = tol_live_point_selection;
        self
    }

    /// Sets the minimum number of selected points.
    pub fn min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Sets the maximum number of selected points.
    pub fn max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    /// Enables or disables accumulation of incremental displacement inputs.
    pub fn sum_incremental_values(mut self, sum_incremental_values: bool) -> Self {
        self.sum_incremental_values = sum_incremental_values;
        self
    }

    /// Enables or disables the near-surface correction layer.
    pub fn surface_correction(mut self, surface_correction: bool) -> Self {
        self.surface_correction = surface_correction;
        self
    }

    /// Sets the correction support radius as a multiple of the largest residual.
    pub fn ratio_radius_error(mut self, ratio_radius_error: f64) -> Self {
        self.ratio_radius_error = ratio_radius_error;
        self
    }

    /// Sets the directory that receives selection CSV exports.
    pub fn export_path(mut self, export_path: PathBuf) -> Self {
        self.export_path = Some(export_path);
        self
    }

    /// Builds and returns a [`CoarseningSettings`] instance.
    ///
    /// # Panics
    /// Panics when the tolerances fall outside `(0, 1)`, when
    /// `min_points` is zero, or when `max_points < min_points` while
    /// selection is enabled.
    pub fn build(self) -> CoarseningSettings {
        if self.mode != SelectionMode::Disabled {
            assert!(
                self.tol > 0.0 && self.tol < 1.0,
                "selection tolerance must lie in (0, 1)"
            );
            assert!(self.min_points > 0, "at least one point must be selected");
            assert!(
                self.max_points >= self.min_points,
                "max_points must not be below min_points"
            );
        }
        if self.mode == SelectionMode::Live {
            assert!(
                self.tol_live_point_selection > 0.0 && self.tol_live_point_selection < 1.0,
                "live reselection tolerance must lie in (0, 1)"
            );
        }
        if self.surface_correction {
            assert!(
                self.ratio_radius_error > 0.0,
                "correction radius ratio must be positive"
            );
        }

        CoarseningSettings {
            mode: self.mode,
            growth: self.growth,
            tol: self.tol,
            tol_live_point_selection: self.tol_live_point_selection,
            min_points: self.min_points,
            max_points: self.max_points,
            sum_incremental_values: self.sum_incremental_values,
            surface_correction: self.surface_correction,
            ratio_radius_error: self.ratio_radius_error,
            export_path: self.export_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let settings = CoarseningSettings::builder(SelectionMode::Live).build();
        assert_eq!(settings.growth, GrowthStrategy::SinglePoint);
        assert_eq!(settings.tol, 0.1);
        assert_eq!(settings.min_points, 2);
        assert_eq!(settings.max_points, 1000);
        assert!(settings.sum_incremental_values);
        assert!(!settings.surface_correction);
    }

    #[test]
    fn disabled_mode_skips_tolerance_checks() {
        let settings = CoarseningSettings::builder(SelectionMode::Disabled)
            .tol(5.0)
            .min_points(0)
            .build();
        assert_eq!(settings.mode, SelectionMode::Disabled);
    }

    #[test]
    #[should_panic]
    fn out_of_range_tolerance_is_rejected() {
        let _ = CoarseningSettings::builder(SelectionMode::Static)
            .tol(1.5)
            .build();
    }

    #[test]
    #[should_panic]
    fn inverted_point_bounds_are_rejected() {
        let _ = CoarseningSettings::builder(SelectionMode::Live)
            .min_points(50)
            .max_points(10)
            .build();
    }

    #[test]
    fn kernel_reparameterization_keeps_family() {
        let kernel = RbfFunctionType::WendlandC4 { radius: 2.0 };
        assert_eq!(
            kernel.with_radius(7.0),
            RbfFunctionType::WendlandC4 { radius: 7.0 }
        );
        assert_eq!(
            RbfFunctionType::ThinPlateSpline.with_radius(3.0),
            RbfFunctionType::WendlandC2 { radius: 3.0 }
        );
    }

    #[test]
    fn built_kernels_evaluate() {
        let kernel = RbfFunctionType::WendlandC2 { radius: 4.0 }.build();
        assert!((kernel.evaluate(0.0) - 1.0).abs() < 1e-14);
        assert_eq!(kernel.evaluate(4.0), 0.0);
    }
}
