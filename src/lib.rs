//! Feasibility core for a fiber-positioner assignment engine.
//!
//! A focal plane populated with thousands of two-arm (theta/phi) robotic
//! positioners must place each fiber tip on the image of a sky target,
//! subject to joint angle limits, positioner-to-positioner keep-out
//! polygons and petal/GFA boundary polygons. This crate models the focal
//! plane, solves the arm kinematics, projects sky coordinates onto the
//! plate for a given tile pointing, and decides for large sets of
//! positioners simultaneously which pairs collide.
//!
//! The crate is a pure library: all file I/O, target catalogs and
//! assignment policy live in external collaborators that feed it plain
//! numeric arrays and consume the per-positioner verdicts.

/// Positioner-to-positioner and positioner-to-boundary collision checks
pub mod collision_detection;

/// Geometric primitives and base algorithms
pub mod geometry;

/// The static focal-plane model: positioner records and the neighbor graph
pub mod hardware;

/// Sky <-> focal-plane projection for a single tile pointing
pub mod projection;

/// Helper functions which do not belong to any specific module
pub mod util;
