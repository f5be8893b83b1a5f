pub mod geo_traits;
pub mod primitives;

/// Tolerance for orientation and coincidence tests on focal-plane
/// coordinates (mm scale, f64). Coincident endpoints of adjacent keep-out
/// edges must not register as spurious crossings.
pub(crate) const EPS: f64 = 1e-9;
