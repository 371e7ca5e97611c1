use std::fmt;

use crate::error::ViewError;

/// The point of interest shared by both surfaces.
///
/// Values are validated on construction and never mutated afterwards; an
/// update always produces a fresh `Location`.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    display_name: Option<String>,
}

impl Location {
    /// Build a location, rejecting out-of-range or non-finite coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ViewError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(ViewError::InvalidCoordinate { latitude, longitude });
        }
        Ok(Self {
            latitude,
            longitude,
            display_name: None,
        })
    }

    /// Build a location from a device reading, clamping small overshoots
    /// instead of rejecting them. Non-finite input is still rejected.
    pub fn clamped(latitude: f64, longitude: f64) -> Result<Self, ViewError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ViewError::InvalidCoordinate { latitude, longitude });
        }
        Self::new(latitude.clamp(-90.0, 90.0), longitude.clamp(-180.0, 180.0))
    }

    /// Return a copy carrying the given display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// True when both locations refer to the same coordinate, ignoring names.
    pub fn same_point(&self, other: &Location) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4}°{}, {:.4}°{}",
            self.latitude.abs(),
            if self.latitude >= 0.0 { "N" } else { "S" },
            self.longitude.abs(),
            if self.longitude >= 0.0 { "E" } else { "W" }
        )
    }
}

type Subscriber = Box<dyn FnMut(&Location)>;

/// Single source of truth for the current location.
#[derive(Default)]
pub struct LocationModel {
    current: Option<Location>,
    revision: u64,
    subscribers: Vec<Subscriber>,
}

impl LocationModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Location> {
        self.current.as_ref()
    }

    /// Monotonic counter bumped on every `set`, cheap change detection for readers.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Register a listener; it is called synchronously on every `set`.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&Location) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Replace the current location and notify every subscriber before returning.
    pub fn set(&mut self, location: Location) {
        self.revision += 1;
        for subscriber in &mut self.subscribers {
            subscriber(&location);
        }
        self.current = Some(location);
    }
}

impl fmt::Debug for LocationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationModel")
            .field("current", &self.current)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Location::new(91.0, 0.0).is_err());
        assert!(Location::new(0.0, -180.5).is_err());
        assert!(Location::new(f64::NAN, 0.0).is_err());
        assert!(Location::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_clamped_accepts_overshoot() {
        let loc = Location::clamped(90.0001, -180.2).unwrap();
        assert_eq!(loc.latitude(), 90.0);
        assert_eq!(loc.longitude(), -180.0);
        assert!(Location::clamped(f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn test_set_notifies_subscribers_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut model = LocationModel::new();

        let a = Rc::clone(&seen);
        model.subscribe(move |loc| a.borrow_mut().push(("a", loc.latitude())));
        let b = Rc::clone(&seen);
        model.subscribe(move |loc| b.borrow_mut().push(("b", loc.latitude())));

        model.set(Location::new(10.0, 20.0).unwrap());
        assert_eq!(*seen.borrow(), vec![("a", 10.0), ("b", 10.0)]);
        assert_eq!(model.get().map(Location::latitude), Some(10.0));
        assert_eq!(model.revision(), 1);
    }

    #[test]
    fn test_same_point_ignores_name() {
        let a = Location::new(1.0, 2.0).unwrap();
        let b = a.clone().with_name("Somewhere");
        assert!(a.same_point(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let loc = Location::new(-33.8688, 151.2093).unwrap();
        assert_eq!(loc.to_string(), "33.8688°S, 151.2093°E");
    }
}
