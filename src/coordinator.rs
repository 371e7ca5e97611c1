//! Surface, style and transition state shared by the globe and the map.
//!
//! The coordinator owns both renderers and the frame scheduler. Everything
//! happens on the caller's thread: collaborator results are polled and frame
//! callbacks dispatched from [`ViewCoordinator::tick`].

use crate::collab::{GpsProvider, Pending, Place, ReverseGeocoder, SearchProvider};
use crate::error::{CollaboratorError, ViewError};
use crate::globe::{GlobeEvent, GlobeRenderer};
use crate::location::{Location, LocationModel};
use crate::map::{MapEvent, MapRenderer};
use crate::render::{Container, FrameScheduler, Surface};
use crate::style::ViewStyle;

/// Progress of the search-driven globe-to-map hand-off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Idle,
    /// Globe is turning to face the searched location
    Rotating,
    /// Rotation done; the map appears when the countdown runs out
    Settling { remaining_s: f64 },
}

/// Where a picked location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickSource {
    Map,
    Gps,
}

/// The external services the coordinator talks to.
pub struct Collaborators {
    pub search: Box<dyn SearchProvider>,
    pub reverse: Box<dyn ReverseGeocoder>,
    pub gps: Box<dyn GpsProvider>,
}

pub struct ViewCoordinator {
    surface: Surface,
    style: ViewStyle,
    transition: Transition,
    model: LocationModel,
    globe: GlobeRenderer,
    map: MapRenderer,
    globe_container: Container,
    map_container: Container,
    scheduler: FrameScheduler,
    collaborators: Collaborators,
    pending_search: Option<(String, Pending<Option<Place>>)>,
    /// Reverse lookup together with the location it was issued for
    pending_reverse: Option<(Location, Pending<String>)>,
    pending_gps: Option<Pending<(f64, f64)>>,
    settle_delay_s: f64,
    status: Option<String>,
}

impl ViewCoordinator {
    pub fn new(
        globe: GlobeRenderer,
        map: MapRenderer,
        collaborators: Collaborators,
        style: ViewStyle,
        settle_delay_s: f64,
        (cols, rows): (u16, u16),
    ) -> Self {
        Self {
            surface: Surface::Globe,
            style,
            transition: Transition::Idle,
            model: LocationModel::new(),
            globe,
            map,
            globe_container: Container::new(Surface::Globe, cols, rows),
            map_container: Container::new(Surface::Map, cols, rows),
            scheduler: FrameScheduler::new(),
            collaborators,
            pending_search: None,
            pending_reverse: None,
            pending_gps: None,
            settle_delay_s: settle_delay_s.max(0.0),
            status: None,
        }
    }

    /// Bring up the globe. The map is created the first time it is shown.
    pub fn initialize(&mut self) -> Result<(), ViewError> {
        self.globe
            .initialize(&self.globe_container, self.style, &mut self.scheduler)
    }

    /// Start a place search. Ignored while another search is running.
    pub fn search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        if self.pending_search.is_some() {
            log::debug!("Search for {query:?} ignored; another search is running");
            return;
        }
        log::info!("Searching for {query:?}");
        self.status = Some(format!("Searching for {query}..."));
        let pending = self.collaborators.search.search(query);
        self.pending_search = Some((query.to_string(), pending));
    }

    /// Ask the device location provider for a fix.
    pub fn locate(&mut self) {
        if self.pending_gps.is_some() {
            return;
        }
        self.status = Some("Locating...".into());
        self.pending_gps = Some(self.collaborators.gps.locate());
    }

    /// Adopt a location chosen on the map or reported by GPS. The surface
    /// stays as it is; a reverse geocode fills in the name later.
    pub fn pick(&mut self, location: Location, source: PickSource) {
        let lookup = self
            .collaborators
            .reverse
            .reverse(location.latitude(), location.longitude());
        self.pending_reverse = Some((location.clone(), lookup));
        self.apply_location(location, source == PickSource::Gps);
    }

    /// Flip between globe and map. Returns false when the flip was refused.
    pub fn toggle_surface(&mut self) -> bool {
        if self.is_transitioning() || self.is_locked() {
            log::debug!(
                "Surface toggle ignored ({:?}, locked: {})",
                self.transition,
                self.is_locked()
            );
            return false;
        }
        self.show(self.surface.other())
    }

    pub fn set_style(&mut self, style: ViewStyle) {
        if style == self.style {
            return;
        }
        log::info!("Style {} -> {style}", self.style);
        self.style = style;
        log_view_error(self.globe.set_style(style));
        log_view_error(self.map.set_style(style));
    }

    /// Advance one frame: poll collaborators, run due frame callbacks and
    /// move the transition along.
    pub fn tick(&mut self, dt_s: f64) {
        self.poll_collaborators();

        let (frame, due) = self.scheduler.begin_frame(dt_s);
        for (handle, owner) in due {
            match owner {
                Surface::Globe => self.globe.on_frame(handle, &frame, &mut self.scheduler),
                Surface::Map => self.map.on_frame(handle, &frame, &mut self.scheduler),
            };
        }

        if let Transition::Settling { remaining_s } = &mut self.transition {
            *remaining_s -= dt_s;
            if *remaining_s <= 0.0 {
                self.transition = Transition::Idle;
                self.show(Surface::Map);
            }
        }

        for event in self.globe.drain_events() {
            match event {
                GlobeEvent::RotationFinished => {
                    if self.transition == Transition::Rotating {
                        log::debug!("Rotation finished; settling");
                        self.transition = Transition::Settling {
                            remaining_s: self.settle_delay_s,
                        };
                    }
                }
            }
        }

        for event in self.map.drain_events() {
            match event {
                MapEvent::LocationPicked(location) => self.pick(location, PickSource::Map),
            }
        }
    }

    /// Tear down both renderers and drop outstanding requests. Idempotent.
    pub fn dispose(&mut self) {
        self.globe.dispose(&mut self.scheduler);
        self.map.dispose(&mut self.scheduler);
        self.pending_search = None;
        self.pending_reverse = None;
        self.pending_gps = None;
        self.transition = Transition::Idle;
    }

    /// Follow the terminal size. Renderers pick it up on their next frame.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.globe_container.resize(cols, rows);
        self.map_container.resize(cols, rows);
    }

    pub fn current_location(&self) -> Option<&Location> {
        self.model.get()
    }

    /// Register a listener for location changes.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&Location) + 'static) {
        self.model.subscribe(subscriber);
    }

    pub fn location_revision(&self) -> u64 {
        self.model.revision()
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn style(&self) -> ViewStyle {
        self.style
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition != Transition::Idle
    }

    /// A search is in flight.
    pub fn is_locked(&self) -> bool {
        self.pending_search.is_some()
    }

    pub fn is_locating(&self) -> bool {
        self.pending_gps.is_some()
    }

    /// Last user-facing message (search misses, collaborator failures).
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn globe(&self) -> &GlobeRenderer {
        &self.globe
    }

    pub fn globe_mut(&mut self) -> &mut GlobeRenderer {
        &mut self.globe
    }

    pub fn map(&self) -> &MapRenderer {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapRenderer {
        &mut self.map
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    fn apply_location(&mut self, location: Location, recenter_map: bool) {
        log::info!("Location -> {location}");
        self.model.set(location.clone());
        if self.globe.is_initialized() {
            log_view_error(self.globe.set_location(&location));
        }
        if self.map.is_initialized() {
            log_view_error(self.map.set_location(&location, recenter_map));
        }
    }

    /// Make `target` the visible surface. Returns whether it changed.
    fn show(&mut self, target: Surface) -> bool {
        if target == self.surface {
            return false;
        }
        match target {
            Surface::Map => {
                let result = self.map.initialize(
                    &self.map_container,
                    self.model.get(),
                    self.style,
                    &mut self.scheduler,
                );
                if let Err(e) = result {
                    log::warn!("Cannot show map: {e}");
                    return false;
                }
                self.globe.set_visible(false);
            }
            Surface::Globe => {
                self.map.dispose(&mut self.scheduler);
                if !self.globe.is_initialized() {
                    if let Err(e) = self.initialize() {
                        log::warn!("Cannot show globe: {e}");
                    }
                    if let Some(location) = self.model.get().cloned() {
                        log_view_error(self.globe.set_location(&location));
                    }
                }
                self.globe.set_visible(true);
            }
        }
        log::info!("Surface {} -> {target}", self.surface);
        self.surface = target;
        true
    }

    fn poll_collaborators(&mut self) {
        if let Some((query, pending)) = self.pending_search.as_mut() {
            if let Some(result) = pending.try_take() {
                let query = std::mem::take(query);
                self.pending_search = None;
                self.finish_search(&query, result);
            }
        }

        if let Some(pending) = self.pending_gps.as_mut() {
            if let Some(result) = pending.try_take() {
                self.pending_gps = None;
                self.status = None;
                match result.map_err(|e| e.to_string()).and_then(|(lat, lon)| {
                    Location::clamped(lat, lon).map_err(|e| e.to_string())
                }) {
                    Ok(location) => self.pick(location, PickSource::Gps),
                    Err(e) => {
                        log::info!("Location lookup ignored: {e}");
                        self.status = Some(format!("Location unavailable: {e}"));
                    }
                }
            }
        }

        if let Some((target, pending)) = self.pending_reverse.as_mut() {
            if let Some(result) = pending.try_take() {
                let target = target.clone();
                self.pending_reverse = None;
                match result {
                    Ok(name) => self.apply_name(&target, name),
                    Err(e) => log::debug!("Reverse geocode for {target} failed: {e}"),
                }
            }
        }
    }

    fn finish_search(
        &mut self,
        query: &str,
        result: Result<Option<Place>, CollaboratorError>,
    ) {
        let place = match result {
            Ok(Some(place)) => place,
            Ok(None) => {
                log::info!("No results for {query:?}");
                self.status = Some(format!("No results for {query}"));
                return;
            }
            Err(e) => {
                log::warn!("Search for {query:?} failed: {e}");
                self.status = Some(format!("Search failed: {e}"));
                return;
            }
        };
        let location = match place.to_location() {
            Ok(location) => location,
            Err(e) => {
                log::warn!("Search result {:?} rejected: {e}", place.name);
                self.status = Some(format!("Search failed: {e}"));
                return;
            }
        };

        self.status = None;
        self.apply_location(location.clone(), true);

        if self.surface != Surface::Globe {
            return;
        }
        match self.globe.rotate_to(&location) {
            Ok(()) => self.transition = Transition::Rotating,
            Err(e) => {
                log::debug!("{e}; revealing map without rotation");
                self.transition = Transition::Settling {
                    remaining_s: self.settle_delay_s,
                };
            }
        }
    }

    fn apply_name(&mut self, target: &Location, name: String) {
        match self.model.get() {
            Some(current) if current.same_point(target) => {
                let named = current.clone().with_name(name);
                self.model.set(named);
            }
            _ => log::debug!("Dropping stale place name {name:?} for {target}"),
        }
    }
}

fn log_view_error(result: Result<(), ViewError>) {
    if let Err(e) = result {
        log::debug!("{e}");
    }
}
