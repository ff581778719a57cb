/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared helpers for random point generation and selection CSV export.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use csv::Writer;
use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::path::Path;

/// Generate a matrix of random points in the unit hypercube.
///
/// # Parameters
/// - `n`: Number of points to generate (rows in the output matrix).
/// - `d`: Number of spatial dimensions per point (columns in the output matrix).
/// - `seed`: Random seed, so the same sequence of points is generated
///   deterministically across runs and platforms.
///
/// # Returns
/// A `Mat<f64>` of shape `(n, d)` where each element lies in `[0.0, 1.0)`.
///
/// # Example
/// ```
/// use motus_rbf::generate_random_points;
///
/// // Generate 100 reproducible 3D points
/// let pts = generate_random_points(100, 3, 42);
/// assert_eq!(pts.ncols(), 3);
/// ```
pub fn generate_random_points(n: usize, d: usize, seed: u64) -> Mat<f64> {
    let mut rng = StdRng::seed_from_u64(seed);

    Mat::from_fn(n, d, |_, _| rng.random_range(0.0..1.0))
}

/// Write the selected subset of control points to a CSV file.
///
/// Each row carries the original point index followed by its coordinates,
/// with headers `Index, X0, X1, ...`.
///
/// # Arguments
/// * `positions` - Matrix of all control point coordinates (rows are points).
/// * `selected` - Indices of the selected rows, written in selection order.
/// * `path` - Output CSV filename.
///
/// # Errors
/// Returns an error if writing to disk fails.
pub fn selected_points_to_csv(
    positions: &Mat<f64>,
    selected: &[usize],
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_path(path)?;

    let mut headers = vec!["Index".to_string()];
    for d in 0..positions.ncols() {
        headers.push(format!("X{d}"));
    }
    wtr.write_record(&headers)?;

    for &index in selected {
        let mut record = vec![index.to_string()];
        record.extend(positions.row(index).iter().map(|c| c.to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
