/////////////////////////////////////////////////////////////////////////////////////////////
//
// Supplies general-purpose helpers for matrices, row norms, and distances.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::{Mat, RowRef};

/// Returns an owned `Mat<T>` from a subset of row indices.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use motus_rbf_utils::select_mat_rows;
///
/// let matrix = mat![
///     [0.0, 1.0],
///     [1.0, 1.0],
///     [2.0, 2.0],
///     [3.0, 3.0f64],
/// ];
///
/// let sub_matrix = select_mat_rows(&matrix, &[0, 2]);
///
/// assert_eq!(
///     sub_matrix,
///     mat![
///         [0.0, 1.0],
///         [2.0, 2.0f64],
///     ]
/// );
/// ```
#[inline(always)]
pub fn select_mat_rows<T>(existing_mat: &Mat<T>, row_indices: &[usize]) -> Mat<T>
where
    T: Clone,
{
    Mat::from_fn(row_indices.len(), existing_mat.ncols(), |i, j| {
        existing_mat.get(row_indices[i], j).clone()
    })
}

/// Returns the Euclidean distance between two points stored as matrix rows.
#[inline(always)]
pub fn get_distance(target: RowRef<f64>, source: RowRef<f64>) -> f64 {
    let mut dist = 0.0;
    for (t, s) in target.iter().zip(source.iter()) {
        let diff = t - s;
        dist += diff * diff;
    }
    dist.sqrt()
}

/// Returns the Euclidean norm of a matrix row.
#[inline(always)]
pub fn get_norm(row: RowRef<f64>) -> f64 {
    let mut acc = 0.0;
    for value in row.iter() {
        acc += value * value;
    }
    acc.sqrt()
}

/// Returns the largest Euclidean row norm of a matrix, `0.0` for an empty one.
#[inline(always)]
pub fn max_row_norm(mat: &Mat<f64>) -> f64 {
    (0..mat.nrows())
        .map(|i| get_norm(mat.row(i)))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn distance_and_norm_agree_with_hand_values() {
        let points = mat![[0.0, 0.0], [3.0, 4.0f64]];
        assert!((get_distance(points.row(0), points.row(1)) - 5.0).abs() < 1e-14);
        assert!((get_norm(points.row(1)) - 5.0).abs() < 1e-14);
    }

    #[test]
    fn max_row_norm_scans_every_row() {
        let values = mat![[1.0, 0.0], [0.0, -7.0], [2.0, 2.0f64]];
        assert!((max_row_norm(&values) - 7.0).abs() < 1e-14);

        let empty = Mat::<f64>::new();
        assert_eq!(max_row_norm(&empty), 0.0);
    }

    #[test]
    fn select_mat_rows_preserves_order_and_repeats() {
        let matrix = mat![[0.0], [1.0], [2.0f64]];
        let picked = select_mat_rows(&matrix, &[2, 0, 2]);
        assert_eq!(picked, mat![[2.0], [0.0], [2.0f64]]);
    }
}
