//! Pairwise and boundary collision checks, plus the batch APIs that
//! parallelize placement and pair testing across a whole focal plane.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use itertools::Itertools;
use rayon::prelude::*;

use crate::geometry::geo_traits::CollidesWith;
use crate::geometry::primitives::{Point, Polygon};
use crate::hardware::FocalPlane;
use crate::util::with_pool;

/// Outcome of placing one positioner: the central-body and fiber-arm
/// keep-outs, or `None` when the requested configuration is kinematically
/// infeasible (the "fail" channel of the batch APIs).
pub type Placement = Option<(Polygon, Polygon)>;

/// The three intersection tests run for a pair of placed positioners.
/// Central bodies cannot touch each other by construction, so
/// theta-vs-theta is never tested.
fn arms_collide(
    (theta1, phi1): &(Polygon, Polygon),
    (theta2, phi2): &(Polygon, Polygon),
) -> bool {
    phi1.collides_with(phi2) || theta1.collides_with(phi2) || theta2.collides_with(phi1)
}

impl FocalPlane {
    /// True iff the kinematics alone make `xy` infeasible for `loc`.
    pub fn position_xy_bad(&self, loc: i32, xy: Point) -> bool {
        self.pos(loc).xy_to_thetaphi(xy).is_none()
    }

    /// Places the keep-outs of `loc` for a fiber-tip target.
    pub fn loc_position_xy(&self, loc: i32, xy: Point) -> Placement {
        self.pos(loc).place_xy(xy)
    }

    /// Places the keep-outs of `loc` for explicit joint angles (radians).
    pub fn loc_position_thetaphi(&self, loc: i32, theta: f64, phi: f64) -> Placement {
        self.pos(loc).place_thetaphi(theta, phi)
    }

    /// True iff either placement fails, or the placed keep-outs of the two
    /// positioners intersect. An infeasible placement is not strictly a
    /// collision, but the configuration cannot be accepted either way.
    pub fn collide_xy(&self, loc1: i32, xy1: Point, loc2: i32, xy2: Point) -> bool {
        let (Some(placed1), Some(placed2)) = (
            self.loc_position_xy(loc1, xy1),
            self.loc_position_xy(loc2, xy2),
        ) else {
            return true;
        };
        arms_collide(&placed1, &placed2)
    }

    /// [`FocalPlane::collide_xy`] for explicit joint angles.
    pub fn collide_thetaphi(
        &self,
        loc1: i32,
        theta1: f64,
        phi1: f64,
        loc2: i32,
        theta2: f64,
        phi2: f64,
    ) -> bool {
        let (Some(placed1), Some(placed2)) = (
            self.loc_position_thetaphi(loc1, theta1, phi1),
            self.loc_position_thetaphi(loc2, theta2, phi2),
        ) else {
            return true;
        };
        arms_collide(&placed1, &placed2)
    }

    /// True iff placement fails, or the placed fiber arm of `loc` hits the
    /// GFA or petal-edge keep-out of its own petal. The central body cannot
    /// reach either boundary and is not tested.
    pub fn collide_xy_edges(&self, loc: i32, xy: Point) -> bool {
        let pos = self.pos(loc);
        let Some((_, shp_phi)) = pos.place_xy(xy) else {
            return true;
        };
        shp_phi.collides_with(&pos.excl_gfa) || shp_phi.collides_with(&pos.excl_petal)
    }

    /// Parallel batch placement for fiber-tip targets. Output is
    /// index-aligned with the input.
    pub fn loc_position_xy_multi(
        &self,
        loc: &[i32],
        xy: &[Point],
        threads: usize,
    ) -> Vec<Placement> {
        with_pool(threads, || {
            loc.par_iter()
                .zip(xy.par_iter())
                .map(|(&l, &p)| self.loc_position_xy(l, p))
                .collect()
        })
    }

    /// Parallel batch placement for explicit joint angles (radians).
    pub fn loc_position_thetaphi_multi(
        &self,
        loc: &[i32],
        theta: &[f64],
        phi: &[f64],
        threads: usize,
    ) -> Vec<Placement> {
        with_pool(threads, || {
            loc.par_iter()
                .zip(theta.par_iter())
                .zip(phi.par_iter())
                .map(|((&l, &t), &p)| self.loc_position_thetaphi(l, t, p))
                .collect()
        })
    }

    /// Batch pairwise collision check for fiber-tip targets.
    ///
    /// A `true` entry means the positioner conflicts with at least one
    /// neighbor (or its own placement failed while a neighbor pair exists);
    /// the planner must retry it. Only neighbor pairs within the input set
    /// are tested; boundary checks are a separate API
    /// ([`FocalPlane::collide_xy_edges`]).
    pub fn check_collisions_xy(&self, loc: &[i32], xy: &[Point], threads: usize) -> Vec<bool> {
        let placed = self.loc_position_xy_multi(loc, xy, threads);
        self.mark_colliding_pairs(loc, &placed, threads)
    }

    /// [`FocalPlane::check_collisions_xy`] for explicit joint angles.
    pub fn check_collisions_thetaphi(
        &self,
        loc: &[i32],
        theta: &[f64],
        phi: &[f64],
        threads: usize,
    ) -> Vec<bool> {
        let placed = self.loc_position_thetaphi_multi(loc, theta, phi, threads);
        self.mark_colliding_pairs(loc, &placed, threads)
    }

    fn mark_colliding_pairs(
        &self,
        loc: &[i32],
        placed: &[Placement],
        threads: usize,
    ) -> Vec<bool> {
        let index: HashMap<i32, usize> =
            loc.iter().enumerate().map(|(i, &l)| (l, i)).collect();

        // deduplicated unordered pairs, restricted to the input set
        let pairs: Vec<(i32, i32)> = loc
            .iter()
            .flat_map(|&lid| {
                self.neighbors(lid)
                    .iter()
                    .filter(|nb| index.contains_key(*nb))
                    .map(move |&nb| (lid.min(nb), lid.max(nb)))
            })
            .sorted_unstable()
            .dedup()
            .collect();

        let hit: Vec<AtomicBool> = (0..loc.len()).map(|_| AtomicBool::new(false)).collect();

        with_pool(threads, || {
            pairs.par_iter().for_each(|&(lo, hi)| {
                let i = index[&lo];
                let j = index[&hi];
                let collides = match (&placed[i], &placed[j]) {
                    (Some(p1), Some(p2)) => arms_collide(p1, p2),
                    _ => true,
                };
                if collides {
                    // idempotent writes; relaxed ordering is enough
                    hit[i].store(true, Ordering::Relaxed);
                    hit[j].store(true, Ordering::Relaxed);
                }
            })
        });

        hit.into_iter().map(AtomicBool::into_inner).collect()
    }
}
