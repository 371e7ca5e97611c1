use glam::{DVec2, DVec3};
use std::f64::consts::PI;

/// Web Mercator sphere radius (EPSG:3857), meters
pub const MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Poles are undefined in Mercator; latitudes are clamped to this before projecting
pub const MAX_MERCATOR_LAT: f64 = 85.0;

/// Half the width of the projected world in meters
pub const MERCATOR_HALF_EXTENT: f64 = PI * MERCATOR_RADIUS;

/// Wrap longitude into [-180, 180)
#[inline(always)]
pub fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Clamp latitude to the range the map plane can represent
#[inline(always)]
pub fn clamp_map_lat(lat: f64) -> f64 {
    lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT)
}

/// Place a geodetic coordinate on a sphere of the given radius.
///
/// Convention: phi is the polar angle measured from +Y (north pole), theta is
/// the longitude shifted by 180 degrees. Anything else placed on the globe
/// (marker, rotation targets, texture lookup) must use this same convention.
#[inline]
pub fn to_sphere_point(lat: f64, lon: f64, radius: f64) -> DVec3 {
    let phi = (90.0 - lat).to_radians();
    let theta = (lon + 180.0).to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();

    DVec3::new(
        -radius * sin_phi * cos_theta,
        radius * cos_phi,
        radius * sin_phi * sin_theta,
    )
}

/// Inverse of [`to_sphere_point`]: recover (lat, lon) from any non-zero point.
#[inline]
pub fn from_sphere_point(p: DVec3) -> (f64, f64) {
    let r = p.length();
    if r <= f64::EPSILON {
        return (0.0, 0.0);
    }
    let phi = (p.y / r).clamp(-1.0, 1.0).acos();
    let theta = p.z.atan2(-p.x);
    let lat = 90.0 - phi.to_degrees();
    let lon = wrap_lon(theta.to_degrees() - 180.0);
    (lat, lon)
}

/// Forward Web Mercator projection to EPSG:3857 meters.
#[inline]
pub fn to_map_projection(lat: f64, lon: f64) -> DVec2 {
    let lat_rad = clamp_map_lat(lat).to_radians();
    let x = MERCATOR_RADIUS * lon.to_radians();
    let y = MERCATOR_RADIUS * (PI / 4.0 + lat_rad / 2.0).tan().ln();
    DVec2::new(x, y)
}

/// Inverse Web Mercator projection, returns (lat, lon) in degrees.
#[inline]
pub fn from_map_projection(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (y / MERCATOR_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lat, lon)
}
