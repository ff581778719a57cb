/////////////////////////////////////////////////////////////////////////////////////////////
//
// Re-exports kernel functions, constants, and helper functions used across the motus_rbf crates.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities for the [`motus_rbf`] crate
//!
//! Radial basis kernels used for interpolation and surface correction, plus
//! the small matrix and distance helpers shared by the coarsening engine and
//! its tests.
mod constants;
mod rbf_functions;
mod utils;

pub use {
    constants::{GREAT, SMALL},
    rbf_functions::{
        RbfFunction, ThinPlateSplineFunction, WendlandC0Function, WendlandC2Function,
        WendlandC4Function, WendlandC6Function,
    },
    utils::{get_distance, get_norm, max_row_norm, select_mat_rows},
};
