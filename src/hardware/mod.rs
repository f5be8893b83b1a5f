mod record;
pub mod positioner;

#[doc(inline)]
pub use positioner::{Arm, Positioner, STATE_BROKEN, STATE_RESTRICTED, STATE_STUCK};
#[doc(inline)]
pub use record::FocalPlaneRecord;

use std::collections::HashMap;

use anyhow::{ensure, Result};
use itertools::{izip, Itertools};
use log::{debug, info};

use crate::geometry::geo_traits::DistanceTo;
use crate::geometry::primitives::Point;
use positioner::STATE_MASK;

/// The static focal-plane model: every positioner location with its
/// kinematic parameters and keep-out polygons, plus the neighbor graph
/// used to restrict the quadratic collision problem.
///
/// Constructed once from a [`FocalPlaneRecord`], read-only afterwards, and
/// freely shareable across worker threads for the lifetime of a planning
/// run.
#[derive(Debug, Clone)]
pub struct FocalPlane {
    timestamp: String,
    /// Science positioners per petal.
    pub nfiber_petal: i32,
    /// Tile / focal-plane radius in degrees, used for selecting targets
    /// that are available to a particular tile.
    pub focalplane_radius_deg: f64,
    /// Center distance in mm below which two locations are neighbors.
    pub neighbor_radius_mm: f64,
    /// Amount to reduce the total arm length when considering which
    /// targets are reachable. Set to 200 microns long ago.
    pub patrol_buffer_mm: f64,
    locations: Vec<i32>,
    petal_locations: Vec<Vec<i32>>,
    positioners: HashMap<i32, Positioner>,
    neighbors: HashMap<i32, Vec<i32>>,
    ps_radius: Vec<f64>,
    ps_theta: Vec<f64>,
}

impl FocalPlane {
    /// Builds and validates the model. Fails on non-index-aligned arrays,
    /// duplicate location ids, negative petal indices or unknown status
    /// bits; the model is never partially initialized.
    pub fn new(rec: FocalPlaneRecord) -> Result<Self> {
        ensure!(
            rec.is_aligned(),
            "focal-plane record arrays are not index-aligned"
        );
        ensure!(
            rec.location.iter().unique().count() == rec.location.len(),
            "focal-plane record contains duplicate location ids"
        );
        ensure!(
            rec.petal.iter().all(|&p| p >= 0),
            "focal-plane record contains negative petal indices"
        );
        for (&lid, &st) in rec.location.iter().zip(&rec.status) {
            ensure!(
                (st & !STATE_MASK) == 0,
                "location {lid} has unknown status bits: {st:#x}"
            );
        }

        let nloc = rec.len();
        let npetal = rec.petal.iter().max().map_or(0, |&p| p as usize + 1);

        let mut positioners = HashMap::with_capacity(nloc);
        let mut petal_locations = vec![Vec::new(); npetal];
        let mut n_out = 0usize;

        let shapes = izip!(rec.excl_theta, rec.excl_phi, rec.excl_gfa, rec.excl_petal);
        for (i, (excl_theta, excl_phi, mut excl_gfa, mut excl_petal)) in shapes.enumerate() {
            let lid = rec.location[i];
            let petal = rec.petal[i];
            let status = rec.status[i];
            if status != 0 {
                n_out += 1;
            }

            // rotate the canonical petal-frame keep-outs to this petal
            let petalrot_deg = (((7 + petal) * 36) % 360) as f64;
            let petalrot = petalrot_deg.to_radians();
            let cs = (petalrot.cos(), petalrot.sin());
            excl_gfa.rotate_origin(cs);
            excl_petal.rotate_origin(cs);

            petal_locations[petal as usize].push(lid);
            positioners.insert(
                lid,
                Positioner {
                    loc: lid,
                    petal,
                    device: rec.device[i],
                    slitblock: rec.slitblock[i],
                    blockfiber: rec.blockfiber[i],
                    fiber: rec.fiber[i],
                    device_type: rec.device_type[i].clone(),
                    center: Point(rec.x_mm[i], rec.y_mm[i]),
                    status,
                    theta: Arm {
                        offset: rec.theta_offset[i].to_radians(),
                        min: rec.theta_min[i].to_radians(),
                        max: rec.theta_max[i].to_radians(),
                        length: rec.theta_arm[i],
                    },
                    phi: Arm {
                        offset: rec.phi_offset[i].to_radians(),
                        min: rec.phi_min[i].to_radians(),
                        max: rec.phi_max[i].to_radians(),
                        length: rec.phi_arm[i],
                    },
                    excl_theta,
                    excl_phi,
                    excl_gfa,
                    excl_petal,
                },
            );
        }

        info!("focal plane has {n_out} fibers that are stuck / broken");

        let mut locations = rec.location;
        locations.sort_unstable();
        for locs in petal_locations.iter_mut() {
            locs.sort_unstable();
        }

        // neighbor graph, O(N^2) once per model; symmetric by construction
        let neighbor_radius_mm = 14.05;
        let mut neighbors: HashMap<i32, Vec<i32>> =
            locations.iter().map(|&l| (l, Vec::new())).collect();
        let mut n_pairs = 0usize;
        for (&a, &b) in locations.iter().tuple_combinations() {
            let dist = positioners[&a].center.distance_to(&positioners[&b].center);
            if dist <= neighbor_radius_mm {
                neighbors.entry(a).or_default().push(b);
                neighbors.entry(b).or_default().push(a);
                n_pairs += 1;
            }
        }
        debug!("neighbor graph has {n_pairs} undirected pairs");

        Ok(FocalPlane {
            timestamp: rec.timestamp,
            nfiber_petal: 500,
            focalplane_radius_deg: 1.65,
            neighbor_radius_mm,
            patrol_buffer_mm: 0.2,
            locations,
            petal_locations,
            positioners,
            neighbors,
            ps_radius: rec.ps_radius,
            ps_theta: rec.ps_theta,
        })
    }

    /// Time-stamp string of the mechanical snapshot this model describes.
    pub fn time(&self) -> &str {
        &self.timestamp
    }

    pub fn n_locations(&self) -> usize {
        self.locations.len()
    }

    pub fn n_petals(&self) -> usize {
        self.petal_locations.len()
    }

    /// All location ids, sorted ascending.
    pub fn locations(&self) -> &[i32] {
        &self.locations
    }

    /// Location ids of one petal, sorted ascending.
    pub fn petal_locations(&self, petal: i32) -> &[i32] {
        &self.petal_locations[petal as usize]
    }

    pub fn positioner(&self, loc: i32) -> Option<&Positioner> {
        self.positioners.get(&loc)
    }

    /// Internal lookup for APIs whose contract requires a known location.
    pub(crate) fn pos(&self, loc: i32) -> &Positioner {
        self.positioners
            .get(&loc)
            .unwrap_or_else(|| panic!("unknown location id {loc}"))
    }

    /// Other locations within the neighbor radius of `loc`. Symmetric:
    /// `m` is in `neighbors(l)` iff `l` is in `neighbors(m)`.
    pub fn neighbors(&self, loc: i32) -> &[i32] {
        self.neighbors.get(&loc).map_or(&[], |n| n.as_slice())
    }

    /// Location ids whose device type matches, in ascending order.
    pub fn device_locations(&self, device_type: &str) -> Vec<i32> {
        self.locations
            .iter()
            .copied()
            .filter(|lid| self.positioners[lid].device_type == device_type)
            .collect()
    }

    /// Polygon-scan radii from the metrology pipeline, informational.
    pub fn ps_radius(&self) -> &[f64] {
        &self.ps_radius
    }

    /// Polygon-scan angles from the metrology pipeline, informational.
    pub fn ps_theta(&self) -> &[f64] {
        &self.ps_theta
    }
}
