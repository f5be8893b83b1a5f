use std::f64::consts::PI;

use crate::geometry::primitives::{Point, Polygon};

/// Status bit: the positioner is stuck at its current angles.
pub const STATE_STUCK: i32 = 1 << 0;
/// Status bit: the fiber or positioner is broken.
pub const STATE_BROKEN: i32 = 1 << 1;
/// Status bit: the positioner is restricted to a reduced patrol area.
pub const STATE_RESTRICTED: i32 = 1 << 2;

pub(crate) const STATE_MASK: i32 = STATE_STUCK | STATE_BROKEN | STATE_RESTRICTED;

/// Boundary tolerance of the patrol annulus: targets within f32 epsilon of
/// full extension or full retraction snap to the limit configuration.
const ANNULUS_EPS: f64 = f32::EPSILON as f64;

/// One rotary joint of a positioner: zero-point offset, travel limits
/// relative to the offset, and arm length. Angles in radians, length in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arm {
    pub offset: f64,
    pub min: f64,
    pub max: f64,
    pub length: f64,
}

impl Arm {
    /// Normalizes `ang` into `[offset + min, offset + max]` by at most one
    /// full turn in either direction. `None` if the joint cannot reach it.
    pub fn into_range(&self, mut ang: f64) -> Option<f64> {
        let abs_min = self.offset + self.min;
        let abs_max = self.offset + self.max;
        if ang < abs_min {
            ang += 2.0 * PI;
        }
        if ang > abs_max {
            ang -= 2.0 * PI;
        }
        if ang < abs_min || ang > abs_max {
            None
        } else {
            Some(ang)
        }
    }
}

/// A two-arm robotic positioner at a fixed focal-plane location.
/// Immutable after construction of the focal-plane model.
#[derive(Debug, Clone)]
pub struct Positioner {
    /// Location id, the primary key of the focal plane.
    pub loc: i32,
    pub petal: i32,
    pub device: i32,
    pub slitblock: i32,
    pub blockfiber: i32,
    pub fiber: i32,
    /// Device type string ("POS", "ETC", "FIF", ...).
    pub device_type: String,
    /// Nominal center of the theta axis, mm.
    pub center: Point,
    /// Status bitmask, 0 = OK.
    pub status: i32,
    pub theta: Arm,
    pub phi: Arm,
    /// Keep-out of the central body. Never tested against other central
    /// bodies or the petal boundary; it cannot reach either.
    pub excl_theta: Polygon,
    /// Keep-out of the fiber-carrying phi arm.
    pub excl_phi: Polygon,
    /// Keep-out of the GFA camera of this petal, in the petal's frame.
    pub excl_gfa: Polygon,
    /// Keep-out of the petal edge, in the petal's frame.
    pub excl_petal: Polygon,
}

impl Positioner {
    pub fn is_ok(&self) -> bool {
        self.status == 0
    }

    /// Inverse kinematics: the joint angles (radians) that put the fiber
    /// tip on `target`, or `None` when the target lies outside the patrol
    /// annulus or the implied angles violate the travel limits.
    ///
    /// The solver always takes the same elbow branch; the hardware only
    /// supports one within its limits, and the range check rejects the rest.
    pub fn xy_to_thetaphi(&self, target: Point) -> Option<(f64, f64)> {
        let dx = target.0 - self.center.0;
        let dy = target.1 - self.center.1;

        let sq_theta_arm = self.theta.length * self.theta.length;
        let sq_phi_arm = self.phi.length * self.phi.length;
        let sq_offset = dx * dx + dy * dy;
        let sq_total_arm = (self.theta.length + self.phi.length).powi(2);
        let sq_diff_arm = (self.theta.length - self.phi.length).powi(2);

        let (theta, phi) = if (sq_offset - sq_total_arm).abs() <= ANNULUS_EPS {
            // maximum extension: force phi to zero
            (dy.atan2(dx), 0.0)
        } else if (sq_diff_arm - sq_offset).abs() <= ANNULUS_EPS {
            // arm folded fully inwards: force phi to PI
            (dy.atan2(dx), PI)
        } else {
            if sq_total_arm < sq_offset || sq_offset < sq_diff_arm {
                // physically impossible for any choice of angles
                return None;
            }

            // opening angle at the elbow, law of cosines; phi is its
            // supplement
            let opening = ((sq_theta_arm + sq_phi_arm - sq_offset)
                / (2.0 * self.theta.length * self.phi.length))
                .acos();
            let phi = PI - opening;

            // angle between the theta arm and the sight line to the target
            let nrm_offset = sq_offset.sqrt();
            let txy = ((sq_theta_arm + sq_offset - sq_phi_arm)
                / (2.0 * self.theta.length * nrm_offset))
                .acos();
            (dy.atan2(dx) - txy, phi)
        };

        let theta = self.theta.into_range(theta)?;
        let phi = self.phi.into_range(phi)?;
        Some((theta, phi))
    }

    /// Forward kinematics: fiber-tip position for the given joint angles.
    /// The angles are not range-checked.
    pub fn thetaphi_to_xy(&self, theta: f64, phi: f64) -> Point {
        // the phi arm direction is measured from the extended theta arm
        let tip_ang = theta + phi;
        Point(
            self.center.0 + self.theta.length * theta.cos() + self.phi.length * tip_ang.cos(),
            self.center.1 + self.theta.length * theta.sin() + self.phi.length * tip_ang.sin(),
        )
    }

    /// Places the central-body and fiber-arm keep-outs for the given joint
    /// angles. The templates are cloned, never aliased, so concurrent
    /// placements do not contend. `None` when either angle is out of range.
    pub fn place_thetaphi(&self, theta: f64, phi: f64) -> Option<(Polygon, Polygon)> {
        let theta = self.theta.into_range(theta)?;
        let phi = self.phi.into_range(phi)?;

        let cs_theta = (theta.cos(), theta.sin());
        let cs_phi = (phi.cos(), phi.sin());

        let mut shp_theta = self.excl_theta.clone();
        let mut shp_phi = self.excl_phi.clone();

        // move the phi template into the fully extended position along +x
        shp_phi.translate(self.theta.length, 0.0);

        // rotate the fully extended positioner about its center
        shp_theta.rotate_origin(cs_theta);
        shp_phi.rotate_origin(cs_theta);

        // rotate just the phi arm about the elbow
        shp_phi.rotate_pivot(cs_phi);

        // translate the whole positioner to its location
        shp_theta.translate(self.center.0, self.center.1);
        shp_phi.translate(self.center.0, self.center.1);

        Some((shp_theta, shp_phi))
    }

    /// Inverse kinematics followed by [`Positioner::place_thetaphi`].
    pub fn place_xy(&self, target: Point) -> Option<(Polygon, Polygon)> {
        let (theta, phi) = self.xy_to_thetaphi(target)?;
        self.place_thetaphi(theta, phi)
    }
}
