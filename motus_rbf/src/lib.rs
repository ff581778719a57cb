/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for adaptive RBF coarsening.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Adaptive control-point coarsening for RBF mesh motion.
//!
//! Radial Basis Function (RBF) mesh motion interpolates boundary
//! displacements to interior mesh points, but the dense system it solves
//! grows with the **square** of the number of boundary control points. For
//! smooth motions most of those points are redundant: a small, well-placed
//! subset reproduces the field to within a user tolerance.
//!
//! This crate grows that subset with a greedy algorithm: starting from two
//! geometric seeds, it repeatedly fits a coarse interpolant on the selected
//! points, evaluates it at **every** control point, and adds the
//! worst-resolved one until the relative error drops below tolerance.
//! The [`RbfCoarsening`] controller wraps the process for a mesh motion
//! loop, reusing a selection while it still resolves the live displacement
//! field and reselecting only when it no longer does.
//!
//! # Features
//! - Static (unit-probe) and live (field-driven) selection regimes
//! - Single and paired point growth per greedy iteration
//! - Optional near-surface correction of the residual coarsening error
//! - Moving/static point bookkeeping for mixed boundary patches
//! - A distributed selection variant over row-partitioned data
//!
//! # Examples
//!
//! ```
//! use motus_rbf::{
//!     RbfCoarsening, DenseSolverFactory,
//!     config::{CoarseningSettings, RbfFunctionType, SelectionMode},
//! };
//! use faer::Mat;
//!
//! // Control points on a unit circle, interpolation targets inside it.
//! let n = 64;
//! let positions = Mat::from_fn(n, 2, |i, j| {
//!     let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
//!     match j {
//!         0 => angle.cos(),
//!         _ => angle.sin(),
//!     }
//! });
//! let targets = Mat::from_fn(200, 2, |i, j| {
//!     let angle = 0.17 * i as f64;
//!     let radius = 0.9 * (i as f64 / 200.0);
//!     match j {
//!         0 => radius * angle.cos(),
//!         _ => radius * angle.sin(),
//!     }
//! });
//!
//! let factory = Box::new(DenseSolverFactory::new(
//!     RbfFunctionType::WendlandC2 { radius: 5.0 },
//!     false,
//! ));
//! let settings = CoarseningSettings::builder(SelectionMode::Live)
//!     .tol(0.05)
//!     .tol_live_point_selection(0.1)
//!     .min_points(4)
//!     .max_points(n)
//!     .build();
//!
//! let mut coarsening = RbfCoarsening::builder(factory, settings).build();
//! coarsening.compute(positions.clone(), targets);
//!
//! // Radial expansion of the boundary, interpolated from a coarse subset.
//! let displacement = Mat::from_fn(n, 2, |i, j| 0.1 * positions[(i, j)]);
//! let motion = coarsening.interpolate(&displacement);
//!
//! assert_eq!(motion.nrows(), 200);
//! assert!(coarsening.selected_indices().len() < n);
//! ```
//!
//! # References
//! 1.  T. C. S. Rendall and C. B. Allen. Reduced surface point selection
//!     options for efficient mesh deformation using radial basis functions.
//!     J. Comput. Phys., 229(8):2810-2820, 2010.
//! 2.  A. de Boer, M. S. van der Schoot, and H. Bijl. Mesh deformation
//!     based on radial basis function interpolation. Computers and
//!     Structures, 85(11-14):784-795, 2007.
pub mod config;

pub mod progress;

mod coarsening;

mod common;

mod correction;

mod distributed;

mod selection;

mod solver;

pub use {
    coarsening::{RbfCoarsening, RbfCoarseningBuilder},
    common::{generate_random_points, selected_points_to_csv},
    distributed::{
        DistributedRows, DistributedSolver, DistributedSolverFactory, DistributedUnitCoarsening,
        pull_selected_rows,
    },
    selection::{GreedySelection, GreedySelector, SeedRule, SelectionReport},
    solver::{DenseRbfSolver, DenseSolverFactory, RbfSolver, SolverFactory},
};
