/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the near-surface correction applied after coarse interpolation.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Near-surface correction applied after coarse interpolation.

use faer::Mat;
use motus_rbf_utils::{GREAT, get_distance, max_row_norm};
use rayon::prelude::*;

use crate::solver::SolverFactory;

/// Blends the selection residual back into the interpolated field near the
/// moving surface.
///
/// Each target point inherits the negated residual of its closest control
/// point, weighted by a compactly supported kernel whose radius scales with
/// the largest residual. The correction is stored so the next application
/// only adds the delta against the previous one.
#[derive(Debug)]
pub(crate) struct SurfaceCorrection {
    ratio_radius_error: f64,
    closest_boundary_index: Vec<usize>,
    applied_correction: Mat<f64>,
}

impl SurfaceCorrection {
    pub(crate) fn new(ratio_radius_error: f64) -> Self {
        assert!(
            ratio_radius_error > 0.0,
            "correction radius ratio must be positive"
        );
        Self {
            ratio_radius_error,
            closest_boundary_index: Vec::new(),
            applied_correction: Mat::new(),
        }
    }

    /// Drops the cached nearest-boundary mapping. Called after a
    /// reselection, which changes the residual field the mapping feeds.
    pub(crate) fn invalidate(&mut self) {
        self.closest_boundary_index.clear();
    }

    /// Applies the correction to `values_interpolation` in place.
    ///
    /// `residuals` carries one row per control point, the signed
    /// interpolation error of the last selection or reselection check.
    pub(crate) fn apply(
        &mut self,
        factory: &dyn SolverFactory,
        positions: &Mat<f64>,
        positions_interpolation: &Mat<f64>,
        residuals: &Mat<f64>,
        values_interpolation: &mut Mat<f64>,
    ) {
        let nb_targets = positions_interpolation.nrows();
        assert_eq!(nb_targets, values_interpolation.nrows());
        assert_eq!(residuals.nrows(), positions.nrows());
        assert_eq!(residuals.ncols(), values_interpolation.ncols());

        if self.applied_correction.nrows() == 0 {
            self.applied_correction =
                Mat::zeros(values_interpolation.nrows(), values_interpolation.ncols());
        }

        let radius = self.ratio_radius_error * max_row_norm(residuals);
        if radius <= 0.0 {
            return;
        }

        // Nearest control point per target. The mapping survives until the
        // selection changes; only the distances are refreshed.
        if self.closest_boundary_index.is_empty() {
            self.closest_boundary_index = (0..nb_targets)
                .into_par_iter()
                .map(|i| {
                    let target = positions_interpolation.row(i);
                    let mut smallest_radius = GREAT;
                    let mut boundary_index = 0;
                    for j in 0..positions.nrows() {
                        let distance = get_distance(positions.row(j), target);
                        if distance < smallest_radius {
                            smallest_radius = distance;
                            boundary_index = j;
                        }
                    }
                    boundary_index
                })
                .collect();
        }

        let kernel = factory.correction_kernel(radius);

        for i in 0..nb_targets {
            let boundary_index = self.closest_boundary_index[i];
            let boundary_radius = get_distance(
                positions.row(boundary_index),
                positions_interpolation.row(i),
            );
            let weight = kernel.evaluate(boundary_radius);

            for k in 0..values_interpolation.ncols() {
                let f_eval = -weight * residuals[(boundary_index, k)];
                values_interpolation[(i, k)] += f_eval - self.applied_correction[(i, k)];
                self.applied_correction[(i, k)] = f_eval;
            }
        }
    }
}
