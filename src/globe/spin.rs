use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Returns the shortest angular delta from `from` to `to`, in range -PI..PI.
#[inline]
pub fn shortest_angular_delta(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(TAU);
    if delta > PI {
        delta - TAU
    } else {
        delta
    }
}

/// Globe yaw that turns meridian `longitude` toward a camera at `camera_azimuth`.
///
/// A surface point at longitude `lon` sits at angle `(lon + 180)` degrees in
/// the globe's local frame; yawing by `camera_azimuth + pi/2 - that angle`
/// lands it on the camera's side.
pub fn yaw_facing(longitude: f64, camera_azimuth: f64) -> f64 {
    let theta = (longitude + 180.0).to_radians();
    (camera_azimuth + FRAC_PI_2 - theta).rem_euclid(TAU)
}

/// Linear yaw interpolation along the shortest arc over a fixed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct YawAnimation {
    from: f64,
    delta: f64,
    duration_s: f64,
    elapsed_s: f64,
}

impl YawAnimation {
    pub fn new(from: f64, to: f64, duration_s: f64) -> Self {
        Self {
            from,
            delta: shortest_angular_delta(from, to),
            duration_s: duration_s.max(0.0),
            elapsed_s: 0.0,
        }
    }

    /// Advance and return the yaw for this frame plus whether the animation
    /// is finished.
    pub fn step(&mut self, dt: f64) -> (f64, bool) {
        self.elapsed_s += dt;
        let t = if self.duration_s <= 0.0 {
            1.0
        } else {
            (self.elapsed_s / self.duration_s).min(1.0)
        };
        ((self.from + self.delta * t).rem_euclid(TAU), t >= 1.0)
    }

    pub fn target(&self) -> f64 {
        (self.from + self.delta).rem_euclid(TAU)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        let d = shortest_angular_delta(a, b).abs();
        assert!(d < 1e-9, "{a} vs {b}");
    }

    #[test]
    fn test_shortest_delta_wraps() {
        assert!((shortest_angular_delta(0.1, TAU - 0.1) + 0.2).abs() < 1e-12);
        assert!((shortest_angular_delta(TAU - 0.1, 0.1) - 0.2).abs() < 1e-12);
        assert!((shortest_angular_delta(1.0, 2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_yaw_facing_prime_meridian() {
        // Longitude 0 sits at theta = pi, so a camera on +Z needs -pi/2.
        assert_close(yaw_facing(0.0, 0.0), 1.5 * PI);
        assert_close(yaw_facing(-180.0, 0.0), FRAC_PI_2);
    }

    #[test]
    fn test_animation_reaches_target_and_finishes() {
        let mut anim = YawAnimation::new(0.2, TAU - 0.2, 1.0);
        let (mid, done) = anim.step(0.5);
        assert!(!done);
        assert_close(mid, 0.0);
        let (end, done) = anim.step(0.5);
        assert!(done);
        assert_close(end, TAU - 0.2);
    }

    #[test]
    fn test_zero_duration_finishes_immediately() {
        let mut anim = YawAnimation::new(1.0, 2.0, 0.0);
        let (yaw, done) = anim.step(0.0);
        assert!(done);
        assert_close(yaw, 2.0);
    }
}
