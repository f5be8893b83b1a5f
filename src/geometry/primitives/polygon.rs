use anyhow::{bail, Result};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::geometry::geo_traits::CollidesWith;
use crate::geometry::primitives::{Edge, Point};
use crate::geometry::EPS;

/// Closed polygon with a mutable pivot: the swept footprint (keep-out) of a
/// moving part, used as the collision proxy.
///
/// Vertex `i` connects to vertex `(i + 1) % n`, so consecutive segments
/// share endpoints by construction. The pivot rides along with every rigid
/// motion and is the rotation center of [`Polygon::rotate_pivot`].
///
/// An empty vertex list is a valid footprint that collides with nothing,
/// for devices whose keep-out is not modeled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point>,
    pub pivot: Point,
}

impl Polygon {
    /// Creates a polygon from its vertices, pivot at the origin.
    pub fn new(vertices: Vec<Point>) -> Result<Self> {
        Self::with_pivot(vertices, Point(0.0, 0.0))
    }

    pub fn with_pivot(vertices: Vec<Point>, pivot: Point) -> Result<Self> {
        if !vertices.is_empty() && vertices.len() < 3 {
            bail!("polygon must have at least 3 vertices: {vertices:?}");
        }
        if vertices.iter().unique().count() != vertices.len() {
            bail!("polygon contains duplicate vertices: {vertices:?}");
        }
        Ok(Polygon { vertices, pivot })
    }

    pub fn empty() -> Self {
        Polygon {
            vertices: vec![],
            pivot: Point(0.0, 0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex(&self, i: usize) -> Point {
        self.vertices[i]
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn edge(&self, i: usize) -> Edge {
        let j = (i + 1) % self.n_vertices();
        Edge::new(self.vertices[i], self.vertices[j]).unwrap()
    }

    pub fn edge_iter(&self) -> impl Iterator<Item = Edge> + '_ {
        (0..self.n_vertices()).map(move |i| self.edge(i))
    }

    /// Rigid translation of every vertex and the pivot.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for v in self.vertices.iter_mut() {
            v.0 += dx;
            v.1 += dy;
        }
        self.pivot.0 += dx;
        self.pivot.1 += dy;
    }

    /// Rotation about the origin (0, 0) of every vertex and the pivot.
    ///
    /// Takes a precomputed (cos, sin) pair so the caller amortizes the trig
    /// across the many shapes sharing one angle.
    pub fn rotate_origin(&mut self, (cos_a, sin_a): (f64, f64)) {
        for v in self.vertices.iter_mut() {
            *v = rotate(*v, Point(0.0, 0.0), cos_a, sin_a);
        }
        self.pivot = rotate(self.pivot, Point(0.0, 0.0), cos_a, sin_a);
    }

    /// Rotation about the current pivot; the pivot itself stays put.
    pub fn rotate_pivot(&mut self, (cos_a, sin_a): (f64, f64)) {
        let pivot = self.pivot;
        for v in self.vertices.iter_mut() {
            *v = rotate(*v, pivot, cos_a, sin_a);
        }
    }

    fn bbox(&self) -> (Point, Point) {
        let (mut x_min, mut y_min) = (f64::MAX, f64::MAX);
        let (mut x_max, mut y_max) = (f64::MIN, f64::MIN);
        for v in self.vertices.iter() {
            x_min = x_min.min(v.0);
            y_min = y_min.min(v.1);
            x_max = x_max.max(v.0);
            y_max = y_max.max(v.1);
        }
        (Point(x_min, y_min), Point(x_max, y_max))
    }
}

#[inline(always)]
fn rotate(p: Point, about: Point, cos_a: f64, sin_a: f64) -> Point {
    let (dx, dy) = (p.0 - about.0, p.1 - about.1);
    Point(
        about.0 + cos_a * dx - sin_a * dy,
        about.1 + sin_a * dx + cos_a * dy,
    )
}

impl CollidesWith<Point> for Polygon {
    /// Ray casting: a horizontal ray shot to the right from `point`.
    fn collides_with(&self, point: &Point) -> bool {
        if self.is_empty() {
            return false;
        }
        let x_max = self
            .vertices
            .iter()
            .map(|v| OrderedFloat(v.0))
            .max()
            .unwrap()
            .into_inner();
        if point.0 > x_max + EPS {
            return false;
        }
        let ray = Edge {
            start: *point,
            end: Point(x_max + 1.0, point.1),
        };

        let mut n_hits = 0;
        for edge in self.edge_iter() {
            let touches_start = (edge.start.1 - point.1).abs() <= EPS && edge.start.0 > point.0;
            let touches_end = (edge.end.1 - point.1).abs() <= EPS && edge.end.0 > point.0;
            if touches_start || touches_end {
                // the ray passes through (or dangerously close to) a vertex;
                // count the edge only when it dips below the ray
                if edge.start.1 < point.1 - EPS || edge.end.1 < point.1 - EPS {
                    n_hits += 1;
                }
            } else if ray.collides_with(&edge) {
                n_hits += 1;
            }
        }
        n_hits % 2 == 1
    }
}

impl CollidesWith<Polygon> for Polygon {
    /// True iff any edge of one polygon crosses or touches an edge of the
    /// other, or either polygon contains a vertex of the other.
    fn collides_with(&self, other: &Polygon) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }

        let (a_min, a_max) = self.bbox();
        let (b_min, b_max) = other.bbox();
        if a_min.0 > b_max.0 + EPS
            || b_min.0 > a_max.0 + EPS
            || a_min.1 > b_max.1 + EPS
            || b_min.1 > a_max.1 + EPS
        {
            return false;
        }

        for ea in self.edge_iter() {
            for eb in other.edge_iter() {
                if ea.collides_with(&eb) {
                    return true;
                }
            }
        }

        // no edges cross: overlap is possible only by full containment
        self.collides_with(&other.vertex(0)) || other.collides_with(&self.vertex(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use std::f64::consts::FRAC_PI_2;

    fn unit_square(x0: f64, y0: f64) -> Polygon {
        Polygon::new(vec![
            Point(x0, y0),
            Point(x0 + 1.0, y0),
            Point(x0 + 1.0, y0 + 1.0),
            Point(x0, y0 + 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn translate_moves_vertices_and_pivot() {
        let mut p = unit_square(0.0, 0.0);
        p.translate(2.0, -1.0);
        assert_eq!(p.vertex(0), Point(2.0, -1.0));
        assert_eq!(p.pivot, Point(2.0, -1.0));
    }

    #[test]
    fn rotate_origin_carries_pivot() {
        let mut p = unit_square(1.0, 0.0);
        let ang = FRAC_PI_2;
        p.translate(1.0, 0.0);
        p.rotate_origin((ang.cos(), ang.sin()));
        // pivot was at (1, 0), a quarter turn puts it at (0, 1)
        assert!(approx_eq!(f64, p.pivot.0, 0.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, p.pivot.1, 1.0, epsilon = 1e-12));
    }

    #[test]
    fn rotate_pivot_fixes_pivot() {
        let mut p = unit_square(0.0, 0.0);
        p.translate(3.0, 0.0);
        let pivot_before = p.pivot;
        let ang = FRAC_PI_2;
        p.rotate_pivot((ang.cos(), ang.sin()));
        assert_eq!(p.pivot, pivot_before);
        // vertex (4, 0) relative to pivot (3, 0) rotates to (3, 1)
        assert!(approx_eq!(f64, p.vertex(1).0, 3.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, p.vertex(1).1, 1.0, epsilon = 1e-12));
    }

    #[test]
    fn explicit_pivot_is_rotation_center() {
        let mut p = Polygon::with_pivot(
            vec![Point(2.0, 0.0), Point(3.0, 0.0), Point(3.0, 1.0)],
            Point(2.0, 0.0),
        )
        .unwrap();
        let ang = FRAC_PI_2;
        p.rotate_pivot((ang.cos(), ang.sin()));
        // vertex (3, 0) swings a quarter turn about (2, 0) to (2, 1)
        assert!(approx_eq!(f64, p.vertex(1).0, 2.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, p.vertex(1).1, 1.0, epsilon = 1e-12));
    }

    #[test]
    fn contains_point() {
        let p = unit_square(0.0, 0.0);
        assert!(p.collides_with(&Point(0.5, 0.5)));
        assert!(!p.collides_with(&Point(1.5, 0.5)));
        assert!(!p.collides_with(&Point(0.5, -0.5)));
    }

    #[test]
    fn overlapping_squares_intersect() {
        let a = unit_square(0.0, 0.0);
        let b = unit_square(0.5, 0.5);
        assert!(a.collides_with(&b));
        assert!(b.collides_with(&a));
    }

    #[test]
    fn disjoint_squares_do_not_intersect() {
        let a = unit_square(0.0, 0.0);
        let b = unit_square(2.5, 0.0);
        assert!(!a.collides_with(&b));
    }

    #[test]
    fn edge_touch_counts_as_intersection() {
        let a = unit_square(0.0, 0.0);
        let b = unit_square(1.0, 0.0);
        assert!(a.collides_with(&b));
    }

    #[test]
    fn full_containment_detected() {
        let outer = Polygon::new(vec![
            Point(-2.0, -2.0),
            Point(2.0, -2.0),
            Point(2.0, 2.0),
            Point(-2.0, 2.0),
        ])
        .unwrap();
        let inner = unit_square(-0.5, -0.5);
        assert!(outer.collides_with(&inner));
        assert!(inner.collides_with(&outer));
    }

    #[test]
    fn empty_polygon_collides_with_nothing() {
        let a = Polygon::empty();
        let b = unit_square(0.0, 0.0);
        assert!(!a.collides_with(&b));
        assert!(!b.collides_with(&a));
    }

    #[test]
    fn two_vertices_rejected() {
        assert!(Polygon::new(vec![Point(0.0, 0.0), Point(1.0, 0.0)]).is_err());
    }

    #[test]
    fn duplicate_vertices_rejected() {
        assert!(
            Polygon::new(vec![Point(0.0, 0.0), Point(1.0, 0.0), Point(0.0, 0.0)]).is_err()
        );
    }
}
