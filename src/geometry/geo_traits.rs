/// Trait for types that can detect collisions between `Self` and `T`.
///
/// Touching counts as a collision: the keep-out polygons are already the
/// swept footprints of the moving parts, so zero-area overlap is contact.
pub trait CollidesWith<T> {
    fn collides_with(&self, other: &T) -> bool;
}

/// Trait for types that can compute the minimum distance between `Self` and `T`.
pub trait DistanceTo<T> {
    /// Minimum distance between two primitives.
    fn distance_to(&self, other: &T) -> f64;

    /// Squared version of [DistanceTo::distance_to]
    fn sq_distance_to(&self, other: &T) -> f64;
}
