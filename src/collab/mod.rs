//! External collaborators: place search, reverse geocoding, device location.
//!
//! The core only sees the traits below. Every call returns a [`Pending`]
//! that the coordinator polls once per tick, so a slow network never blocks
//! the UI thread.

mod locate;
mod nominatim;

use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::error::{CollaboratorError, ViewError};
use crate::location::Location;

pub use locate::IpLocator;
pub use nominatim::Nominatim;

/// A one-shot result produced off the UI thread.
#[derive(Debug)]
pub struct Pending<T> {
    rx: Receiver<Result<T, CollaboratorError>>,
}

impl<T: Send + 'static> Pending<T> {
    /// Run `job` on a worker thread.
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce() -> Result<T, CollaboratorError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(job());
        });
        Self { rx }
    }
}

impl<T> Pending<T> {
    /// Already-resolved value.
    pub fn ready(value: T) -> Self {
        Self::resolved(Ok(value))
    }

    /// Already-failed request.
    pub fn failed(err: CollaboratorError) -> Self {
        Self::resolved(Err(err))
    }

    fn resolved(result: Result<T, CollaboratorError>) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Pending value resolved by hand through the returned sender.
    #[cfg(test)]
    pub(crate) fn manual() -> (mpsc::Sender<Result<T, CollaboratorError>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    /// `None` while still running. A worker that died without answering
    /// resolves to [`CollaboratorError::Cancelled`].
    pub fn try_take(&mut self) -> Option<Result<T, CollaboratorError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CollaboratorError::Cancelled)),
        }
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Place {
    pub fn to_location(&self) -> Result<Location, ViewError> {
        Ok(Location::new(self.latitude, self.longitude)?.with_name(self.name.clone()))
    }
}

/// Free-text place search. Resolves to `None` when nothing matched.
pub trait SearchProvider {
    fn search(&self, query: &str) -> Pending<Option<Place>>;
}

/// Coordinate to human-readable place name.
pub trait ReverseGeocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Pending<String>;
}

/// Device position as (latitude, longitude).
pub trait GpsProvider {
    fn locate(&self) -> Pending<(f64, f64)>;
}

/// Stand-in for every collaborator when running offline.
#[derive(Debug, Default, Clone, Copy)]
pub struct Offline;

impl SearchProvider for Offline {
    fn search(&self, _query: &str) -> Pending<Option<Place>> {
        Pending::failed(CollaboratorError::Unavailable("offline mode".into()))
    }
}

impl ReverseGeocoder for Offline {
    fn reverse(&self, _latitude: f64, _longitude: f64) -> Pending<String> {
        Pending::failed(CollaboratorError::Unavailable("offline mode".into()))
    }
}

impl GpsProvider for Offline {
    fn locate(&self) -> Pending<(f64, f64)> {
        Pending::failed(CollaboratorError::Unavailable("offline mode".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_ready_resolves_immediately() {
        let mut pending = Pending::ready(7);
        assert!(matches!(pending.try_take(), Some(Ok(7))));
    }

    #[test]
    fn test_spawned_job_resolves() {
        let mut pending = Pending::spawn(|| Ok("done".to_string()));
        let deadline = Instant::now() + Duration::from_secs(5);
        let result = loop {
            if let Some(result) = pending.try_take() {
                break result;
            }
            assert!(Instant::now() < deadline, "job never resolved");
            std::thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(result.unwrap(), "done");
    }

    #[test]
    fn test_dropped_worker_is_cancelled() {
        let mut pending: Pending<u8> = Pending::spawn(|| panic!("worker died"));
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match pending.try_take() {
                Some(Err(CollaboratorError::Cancelled)) => break,
                Some(other) => panic!("unexpected {other:?}"),
                None => {
                    assert!(Instant::now() < deadline);
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }

    #[test]
    fn test_place_to_location_validates() {
        let place = Place {
            name: "Nowhere".into(),
            latitude: 123.0,
            longitude: 0.0,
        };
        assert!(place.to_location().is_err());

        let sydney = Place {
            name: "Sydney".into(),
            latitude: -33.8688,
            longitude: 151.2093,
        };
        let loc = sydney.to_location().unwrap();
        assert_eq!(loc.display_name(), Some("Sydney"));
    }

    #[test]
    fn test_offline_fails_everything() {
        assert!(matches!(
            Offline.search("paris").try_take(),
            Some(Err(CollaboratorError::Unavailable(_)))
        ));
        assert!(matches!(Offline.locate().try_take(), Some(Err(_))));
    }
}
