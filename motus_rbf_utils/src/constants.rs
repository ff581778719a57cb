/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the scalar guard constants shared by the coarsening numerics.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

/// Small positive scalar used to guard near-zero norms and distances.
///
/// Error-ratio denominators are padded with `SMALL.sqrt()` so that a field
/// that is numerically zero never produces a division by zero.
pub const SMALL: f64 = 1.0e-15;

/// Large positive scalar used to initialise minimum-distance searches.
pub const GREAT: f64 = 1.0e+15;
