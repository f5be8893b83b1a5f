use serde::{Deserialize, Serialize};

use crate::geometry::primitives::Polygon;

/// Externally supplied description of every device location on the focal
/// plane, as index-aligned vectors. This is the single input record of the
/// crate; the loader that fills it (files, databases) lives outside.
///
/// Angles are in degrees and arm lengths in mm; the model converts angles
/// to radians on ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FocalPlaneRecord {
    /// Time-stamp string identifying the mechanical snapshot.
    pub timestamp: String,
    pub location: Vec<i32>,
    pub petal: Vec<i32>,
    pub device: Vec<i32>,
    pub slitblock: Vec<i32>,
    pub blockfiber: Vec<i32>,
    pub fiber: Vec<i32>,
    /// Device type string ("POS", "ETC", "FIF", ...).
    pub device_type: Vec<String>,
    pub x_mm: Vec<f64>,
    pub y_mm: Vec<f64>,
    /// Status bitmask per location, 0 = OK.
    pub status: Vec<i32>,
    /// Theta joint zero-point, degrees.
    pub theta_offset: Vec<f64>,
    /// Theta travel limits relative to the zero-point, degrees.
    pub theta_min: Vec<f64>,
    pub theta_max: Vec<f64>,
    /// Theta arm length, mm.
    pub theta_arm: Vec<f64>,
    pub phi_offset: Vec<f64>,
    pub phi_min: Vec<f64>,
    pub phi_max: Vec<f64>,
    pub phi_arm: Vec<f64>,
    /// Polygon-scan radii and angles from the metrology pipeline.
    /// Stored verbatim; informational only.
    pub ps_radius: Vec<f64>,
    pub ps_theta: Vec<f64>,
    /// Keep-out templates: central body, fiber arm, GFA camera, petal edge.
    /// GFA and petal templates are in the canonical petal frame and are
    /// rotated to their petal location at construction.
    pub excl_theta: Vec<Polygon>,
    pub excl_phi: Vec<Polygon>,
    pub excl_gfa: Vec<Polygon>,
    pub excl_petal: Vec<Polygon>,
}

impl FocalPlaneRecord {
    pub fn len(&self) -> usize {
        self.location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.location.is_empty()
    }

    /// True when every per-location array has the same length as `location`.
    pub(crate) fn is_aligned(&self) -> bool {
        let n = self.location.len();
        [
            self.petal.len(),
            self.device.len(),
            self.slitblock.len(),
            self.blockfiber.len(),
            self.fiber.len(),
            self.device_type.len(),
            self.x_mm.len(),
            self.y_mm.len(),
            self.status.len(),
            self.theta_offset.len(),
            self.theta_min.len(),
            self.theta_max.len(),
            self.theta_arm.len(),
            self.phi_offset.len(),
            self.phi_min.len(),
            self.phi_max.len(),
            self.phi_arm.len(),
            self.ps_radius.len(),
            self.ps_theta.len(),
            self.excl_theta.len(),
            self.excl_phi.len(),
            self.excl_gfa.len(),
            self.excl_petal.len(),
        ]
        .iter()
        .all(|&l| l == n)
    }
}
