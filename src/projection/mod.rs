//! Sky <-> focal-plane projection. This is the only surface of the crate
//! that knows about celestial coordinates; everything else works in mm on
//! the plate.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use anyhow::{ensure, Result};
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geometry::primitives::Point;
use crate::hardware::FocalPlane;
use crate::util::with_pool;

/// Coefficients of the radial plate-scale polynomial, highest order first.
/// A fit to the instrument optics model.
const RADIAL_POLY: [f64; 4] = [8.297e5, -1750.0, 1.394e4, 0.0];

/// Newton step for the numeric inverse of the radial polynomial.
const NEWTON_DELTA_RAD: f64 = 1e-4;
/// Convergence tolerance of the numeric inverse, mm.
const NEWTON_TOL_MM: f64 = 1e-7;
/// Inside the plate the iteration converges in a handful of steps; hitting
/// this cap means the caller left the supported radius.
const NEWTON_MAX_ITER: usize = 64;

/// Radial distance on the focal plane (mm) for a sky angle (radians) off
/// the optical axis. Monotonically increasing over the plate.
pub fn radial_ang2dist(theta_rad: f64) -> f64 {
    RADIAL_POLY.iter().fold(0.0, |dist, p| theta_rad * dist + p)
}

/// Sky angle (radians) off the optical axis for a radial focal-plane
/// distance (mm): the numeric inverse of [`radial_ang2dist`], a Newton
/// iteration with a forward finite difference.
///
/// Only defined inside the plate radius; panics if the iteration fails to
/// converge there.
pub fn radial_dist2ang(dist_mm: f64) -> f64 {
    let mut theta_rad = 0.01;
    for _ in 0..NEWTON_MAX_ITER {
        let cur = radial_ang2dist(theta_rad);
        let err = cur - dist_mm;
        if err.abs() <= NEWTON_TOL_MM {
            return theta_rad;
        }
        let ahead = radial_ang2dist(theta_rad + NEWTON_DELTA_RAD);
        theta_rad -= err * NEWTON_DELTA_RAD / (ahead - cur);
    }
    panic!("radial inverse did not converge for {dist_mm} mm: off the plate");
}

/// A single telescope pointing. Defines the mapping from the sky to the
/// focal plane; ephemeral per call. All fields in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub ra: f64,
    pub dec: f64,
    /// In-plane field rotation, with the hour-angle correction baked in.
    pub theta: f64,
}

impl FocalPlane {
    /// Maps a sky position (degrees) to focal-plane mm for a tile.
    ///
    /// The plate is oriented with +yfocal = +Dec and +xfocal = -RA.
    pub fn radec2xy(&self, tile: &Tile, ra: f64, dec: f64) -> Point {
        // unit vector of the target; inclination is 90 degrees minus Dec
        let inc_rad = (90.0 - dec).to_radians();
        let ra_rad = ra.to_radians();
        let sin_inc = inc_rad.sin();
        let x0 = sin_inc * ra_rad.cos();
        let y0 = sin_inc * ra_rad.sin();
        let z0 = inc_rad.cos();

        // rotate about z by minus the tile RA
        let tile_ra_rad = tile.ra.to_radians();
        let (cos_ra, sin_ra) = (tile_ra_rad.cos(), tile_ra_rad.sin());
        let x1 = cos_ra * x0 + sin_ra * y0;
        let y1 = -sin_ra * x0 + cos_ra * y0;
        let z1 = z0;

        // rotate about y by minus the tile Dec, into the tile-centered frame
        let tile_dec_rad = tile.dec.to_radians();
        let (cos_dec, sin_dec) = (tile_dec_rad.cos(), tile_dec_rad.sin());
        let x = cos_dec * x1 + sin_dec * z1;
        let y = y1;
        let z = -sin_dec * x1 + cos_dec * z1;

        let mut ra_ang_rad = y.atan2(x);
        if ra_ang_rad < 0.0 {
            ra_ang_rad += 2.0 * PI;
        }
        let dec_ang_rad = PI / 2.0 - (z / (x * x + y * y + z * z).sqrt()).acos();

        // angular separation from the field center, haversine form
        let radius_rad = 2.0
            * ((dec_ang_rad / 2.0).sin().powi(2)
                + dec_ang_rad.cos() * (ra_ang_rad / 2.0).sin().powi(2))
            .sqrt()
            .asin();

        // position angle, then the field rotation
        let q_rad = z.atan2(-y);
        let radius_mm = radial_ang2dist(radius_rad);
        let rotated = q_rad + tile.theta.to_radians();

        Point(radius_mm * rotated.cos(), radius_mm * rotated.sin())
    }

    /// Maps focal-plane mm back to a sky position (degrees) for a tile.
    /// Exact inverse of [`FocalPlane::radec2xy`]; RA is normalized into
    /// [0, 360).
    pub fn xy2radec(&self, tile: &Tile, xy: Point) -> (f64, f64) {
        let radius_mm = xy.sq_norm().sqrt();
        let radius_rad = radial_dist2ang(radius_mm);

        // angle with the +x axis of the plate, field rotation removed
        let q_rad = xy.1.atan2(xy.0) - tile.theta.to_radians();

        // clockwise about z by the radial angle (y0 = 0 drops the sin term)
        let x1 = radius_rad.cos();
        let y1 = -radius_rad.sin();

        // clockwise about x by the position angle (z1 = 0)
        let x2 = x1;
        let y2 = y1 * q_rad.cos();
        let z2 = -y1 * q_rad.sin();

        // clockwise about y by the tile Dec
        let tile_dec_rad = tile.dec.to_radians();
        let (cos_dec, sin_dec) = (tile_dec_rad.cos(), tile_dec_rad.sin());
        let x3 = cos_dec * x2 - sin_dec * z2;
        let y3 = y2;
        let z3 = sin_dec * x2 + cos_dec * z2;

        // counter-clockwise about z by the tile RA
        let tile_ra_rad = tile.ra.to_radians();
        let (cos_ra, sin_ra) = (tile_ra_rad.cos(), tile_ra_rad.sin());
        let x4 = cos_ra * x3 - sin_ra * y3;
        let y4 = sin_ra * x3 + cos_ra * y3;
        let z4 = z3;

        let mut ra_rad = y4.atan2(x4);
        if ra_rad < 0.0 {
            ra_rad += 2.0 * PI;
        }
        let dec_rad = PI / 2.0 - z4.acos();

        (ra_rad.to_degrees() % 360.0, dec_rad.to_degrees())
    }

    /// Parallel batch projection of target arrays onto the plate. Output
    /// index matches input index; no ordering between elements.
    pub fn radec2xy_multi(
        &self,
        tile: &Tile,
        ra: &[f64],
        dec: &[f64],
        threads: usize,
    ) -> Vec<Point> {
        with_pool(threads, || {
            ra.par_iter()
                .zip(dec.par_iter())
                .map(|(&r, &d)| self.radec2xy(tile, r, d))
                .collect()
        })
    }

    /// Parallel batch inverse projection.
    pub fn xy2radec_multi(&self, tile: &Tile, xy: &[Point], threads: usize) -> Vec<(f64, f64)> {
        with_pool(threads, || {
            xy.par_iter()
                .map(|&p| self.xy2radec(tile, p))
                .collect()
        })
    }
}

/// Ordered table of the tiles of a planning run, with the mapping from
/// tile id to its position in the observing sequence and a shared handle
/// to the hardware model the run uses.
#[derive(Debug, Clone)]
pub struct TileTable {
    hw: Arc<FocalPlane>,
    pub id: Vec<i32>,
    pub ra: Vec<f64>,
    pub dec: Vec<f64>,
    /// Observing-condition bitmask per tile, opaque to this crate.
    pub obscond: Vec<i32>,
    order: HashMap<i32, usize>,
}

impl TileTable {
    pub fn new(
        hw: Arc<FocalPlane>,
        id: Vec<i32>,
        ra: Vec<f64>,
        dec: Vec<f64>,
        obscond: Vec<i32>,
    ) -> Result<Self> {
        ensure!(
            ra.len() == id.len() && dec.len() == id.len() && obscond.len() == id.len(),
            "tile table arrays are not index-aligned"
        );
        ensure!(
            id.iter().unique().count() == id.len(),
            "tile table contains duplicate tile ids"
        );
        let order = id.iter().enumerate().map(|(i, &t)| (t, i)).collect();
        Ok(TileTable {
            hw,
            id,
            ra,
            dec,
            obscond,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// The hardware model this observing sequence runs against.
    pub fn hardware(&self) -> &Arc<FocalPlane> {
        &self.hw
    }

    /// Position of a tile id in the observing sequence.
    pub fn order(&self, tile_id: i32) -> Option<usize> {
        self.order.get(&tile_id).copied()
    }
}
