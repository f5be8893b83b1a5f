use anyhow::{ensure, Result};

use crate::geometry::geo_traits::{CollidesWith, DistanceTo};
use crate::geometry::primitives::Point;
use crate::geometry::EPS;

/// Line segment between two [`Point`]s
#[derive(Clone, Debug, PartialEq, Copy)]
pub struct Edge {
    pub start: Point,
    pub end: Point,
}

impl Edge {
    pub fn new(start: Point, end: Point) -> Result<Self> {
        ensure!(start != end, "degenerate edge, {start:?} == {end:?}");
        Ok(Edge { start, end })
    }

    pub fn x_min(&self) -> f64 {
        f64::min(self.start.0, self.end.0)
    }

    pub fn y_min(&self) -> f64 {
        f64::min(self.start.1, self.end.1)
    }

    pub fn x_max(&self) -> f64 {
        f64::max(self.start.0, self.end.0)
    }

    pub fn y_max(&self) -> f64 {
        f64::max(self.start.1, self.end.1)
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// True if `point` lies within the bounding box of the edge.
    /// Only meaningful for points already known to be collinear with it.
    fn envelops_collinear(&self, point: Point) -> bool {
        point.0 >= self.x_min() - EPS
            && point.0 <= self.x_max() + EPS
            && point.1 >= self.y_min() - EPS
            && point.1 <= self.y_max() + EPS
    }
}

/// Signed area of the triangle (a, b, c), twice.
/// Positive when c lies left of the directed line a -> b.
#[inline(always)]
fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

impl CollidesWith<Edge> for Edge {
    fn collides_with(&self, other: &Edge) -> bool {
        // bounding boxes must overlap
        if f64::max(self.x_min(), other.x_min()) > f64::min(self.x_max(), other.x_max()) + EPS
            || f64::max(self.y_min(), other.y_min()) > f64::min(self.y_max(), other.y_max()) + EPS
        {
            return false;
        }

        let d1 = orient(other.start, other.end, self.start);
        let d2 = orient(other.start, other.end, self.end);
        let d3 = orient(self.start, self.end, other.start);
        let d4 = orient(self.start, self.end, other.end);

        // proper crossing: each segment separates the endpoints of the other
        if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
            && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
        {
            return true;
        }

        // collinear or endpoint-touching configurations count as contact
        (d1.abs() <= EPS && other.envelops_collinear(self.start))
            || (d2.abs() <= EPS && other.envelops_collinear(self.end))
            || (d3.abs() <= EPS && self.envelops_collinear(other.start))
            || (d4.abs() <= EPS && self.envelops_collinear(other.end))
    }
}
