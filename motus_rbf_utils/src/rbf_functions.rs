/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the concrete radial basis kernel functions used for interpolation and correction.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::constants::SMALL;
use std::fmt::Debug;

/// A radial basis kernel evaluated on a Euclidean distance.
///
/// The same kernel family is used by the interpolation solver and by the
/// surface correction layer, which re-parameterizes the support radius from
/// the residual magnitude.
pub trait RbfFunction: Send + Sync + Debug {
    fn evaluate(&self, distance: f64) -> f64;
}

/// Wendland C0 kernel with `phi(v) = (1 - v)^2` on `v = r / radius < 1`.
#[derive(Clone, Debug, Copy)]
pub struct WendlandC0Function {
    pub radius: f64,
}

impl WendlandC0Function {
    pub fn new(radius: f64) -> Self {
        assert!(radius > 0.0, "Wendland kernels need a positive support radius");
        Self { radius }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        let value = r / self.radius;
        match value < 1.0 {
            true => (1.0 - value).powi(2),
            false => 0.0,
        }
    }
}

impl RbfFunction for WendlandC0Function {
    #[inline(always)]
    fn evaluate(&self, distance: f64) -> f64 {
        self.phi(distance)
    }
}

/// Wendland C2 kernel with `phi(v) = (1 - v)^4 (4 v + 1)` on `v = r / radius < 1`.
#[derive(Clone, Debug, Copy)]
pub struct WendlandC2Function {
    pub radius: f64,
}

impl WendlandC2Function {
    pub fn new(radius: f64) -> Self {
        assert!(radius > 0.0, "Wendland kernels need a positive support radius");
        Self { radius }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        let value = r / self.radius;
        match value < 1.0 {
            true => (1.0 - value).powi(4) * (4.0 * value + 1.0),
            false => 0.0,
        }
    }
}

impl RbfFunction for WendlandC2Function {
    #[inline(always)]
    fn evaluate(&self, distance: f64) -> f64 {
        self.phi(distance)
    }
}

/// Wendland C4 kernel with `phi(v) = (1 - v)^6 (35/3 v^2 + 6 v + 1)`.
#[derive(Clone, Debug, Copy)]
pub struct WendlandC4Function {
    pub radius: f64,
}

impl WendlandC4Function {
    pub fn new(radius: f64) -> Self {
        assert!(radius > 0.0, "Wendland kernels need a positive support radius");
        Self { radius }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        let value = r / self.radius;
        match value < 1.0 {
            true => (1.0 - value).powi(6) * (35.0 / 3.0 * value * value + 6.0 * value + 1.0),
            false => 0.0,
        }
    }
}

impl RbfFunction for WendlandC4Function {
    #[inline(always)]
    fn evaluate(&self, distance: f64) -> f64 {
        self.phi(distance)
    }
}

/// Wendland C6 kernel with `phi(v) = (1 - v)^8 (32 v^3 + 25 v^2 + 8 v + 1)`.
#[derive(Clone, Debug, Copy)]
pub struct WendlandC6Function {
    pub radius: f64,
}

impl WendlandC6Function {
    pub fn new(radius: f64) -> Self {
        assert!(radius > 0.0, "Wendland kernels need a positive support radius");
        Self { radius }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        let value = r / self.radius;
        match value < 1.0 {
            true => {
                (1.0 - value).powi(8)
                    * (32.0 * value.powi(3) + 25.0 * value * value + 8.0 * value + 1.0)
            }
            false => 0.0,
        }
    }
}

impl RbfFunction for WendlandC6Function {
    #[inline(always)]
    fn evaluate(&self, distance: f64) -> f64 {
        self.phi(distance)
    }
}

/// Thin plate spline kernel with `phi(r) = r^2 ln r`, zero near the origin.
#[derive(Clone, Debug, Copy, Default)]
pub struct ThinPlateSplineFunction;

impl ThinPlateSplineFunction {
    pub fn new() -> Self {
        Self
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        match r > SMALL {
            true => r * r * r.ln(),
            false => 0.0,
        }
    }
}

impl RbfFunction for ThinPlateSplineFunction {
    #[inline(always)]
    fn evaluate(&self, distance: f64) -> f64 {
        self.phi(distance)
    }
}
