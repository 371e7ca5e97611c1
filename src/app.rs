use crate::coordinator::{Transition, ViewCoordinator};
use crate::render::Surface;
use crate::style::ViewStyle;

/// Keyboard focus: normal navigation or typing a search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search(String),
}

/// Application state
pub struct App {
    pub view: ViewCoordinator,
    pub should_quit: bool,
    pub input: InputMode,
    /// Last mouse position for globe drag tracking
    last_mouse: Option<(u16, u16)>,
    /// Current mouse position for the coordinate readout
    mouse_pos: Option<(u16, u16)>,
}

/// Drawable cells inside the border, above the status bar.
pub fn canvas_cells(width: u16, height: u16) -> (u16, u16) {
    // 2 for border horizontally; 2 for border + 1 for status bar vertically
    (width.saturating_sub(2), height.saturating_sub(3))
}

/// Terminal cell to canvas pixel. Each cell holds two pixels stacked
/// vertically; the border shifts everything by one cell.
fn to_pixel(col: u16, row: u16) -> (f64, f64) {
    (col.saturating_sub(1) as f64, row.saturating_sub(1) as f64 * 2.0)
}

impl App {
    pub fn new(view: ViewCoordinator) -> Self {
        Self {
            view,
            should_quit: false,
            input: InputMode::Normal,
            last_mouse: None,
            mouse_pos: None,
        }
    }

    /// Update container sizes when terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        let (cols, rows) = canvas_cells(width, height);
        self.view.resize(cols, rows);
    }

    /// Advance animations and poll background work.
    pub fn update(&mut self, dt_s: f64) {
        self.view.tick(dt_s);
    }

    /// Orbit the globe or pan the map by (dx, dy) canvas pixels
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let result = match self.view.surface() {
            Surface::Globe => self.view.globe_mut().drag(dx as f64, dy as f64),
            Surface::Map => self.view.map_mut().pan(-dx as f64, -dy as f64),
        };
        if let Err(e) = result {
            log::debug!("{e}");
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom(1);
    }

    pub fn zoom_out(&mut self) {
        self.zoom(-1);
    }

    fn zoom(&mut self, steps: i32) {
        let result = match self.view.surface() {
            Surface::Globe => self.view.globe_mut().zoom(steps),
            Surface::Map => self.view.map_mut().zoom(steps),
        };
        if let Err(e) = result {
            log::debug!("{e}");
        }
    }

    /// Scroll-wheel zoom towards a screen position (terminal column/row)
    pub fn zoom_at(&mut self, col: u16, row: u16, steps: i32) {
        let (px, py) = to_pixel(col, row);
        let result = match self.view.surface() {
            Surface::Globe => self.view.globe_mut().zoom(steps),
            Surface::Map => self.view.map_mut().scroll(px, py, steps),
        };
        if let Err(e) = result {
            log::debug!("{e}");
        }
    }

    pub fn mouse_down(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        if self.view.surface() == Surface::Map {
            let (px, py) = to_pixel(col, row);
            if let Err(e) = self.view.map_mut().pointer_down(px, py) {
                log::debug!("{e}");
            }
        }
    }

    pub fn mouse_drag(&mut self, col: u16, row: u16) {
        match self.view.surface() {
            Surface::Globe => {
                if let Some((last_col, last_row)) = self.last_mouse {
                    let dx = col as i32 - last_col as i32;
                    let dy = (row as i32 - last_row as i32) * 2;
                    if let Err(e) = self.view.globe_mut().drag(dx as f64, dy as f64) {
                        log::debug!("{e}");
                    }
                }
            }
            Surface::Map => {
                let (px, py) = to_pixel(col, row);
                if let Err(e) = self.view.map_mut().pointer_move(px, py) {
                    log::debug!("{e}");
                }
            }
        }
        self.last_mouse = Some((col, row));
    }

    pub fn mouse_up(&mut self, col: u16, row: u16) {
        self.last_mouse = None;
        if self.view.surface() == Surface::Map {
            let (px, py) = to_pixel(col, row);
            if let Err(e) = self.view.map_mut().pointer_up(px, py) {
                log::debug!("{e}");
            }
        }
    }

    /// Update mouse cursor position
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// (lat, lon) under the mouse cursor, if it is over the world.
    pub fn cursor_coords(&self) -> Option<(f64, f64)> {
        let (col, row) = self.mouse_pos?;
        let (px, py) = to_pixel(col, row);
        match self.view.surface() {
            Surface::Globe => self.view.globe().pick(px as usize, py as usize),
            Surface::Map => self.view.map().pick(px, py),
        }
    }

    pub fn toggle_surface(&mut self) {
        self.last_mouse = None;
        self.view.toggle_surface();
    }

    /// Select the style bound to number keys 1-4.
    pub fn select_style(&mut self, index: usize) {
        if let Some(style) = ViewStyle::ALL.get(index) {
            self.view.set_style(*style);
        }
    }

    pub fn locate(&mut self) {
        self.view.locate();
    }

    pub fn start_search(&mut self) {
        self.input = InputMode::Search(String::new());
    }

    pub fn search_input(&mut self, ch: char) {
        if let InputMode::Search(query) = &mut self.input {
            query.push(ch);
        }
    }

    pub fn search_backspace(&mut self) {
        if let InputMode::Search(query) = &mut self.input {
            query.pop();
        }
    }

    pub fn cancel_search(&mut self) {
        self.input = InputMode::Normal;
    }

    pub fn submit_search(&mut self) {
        if let InputMode::Search(query) = std::mem::replace(&mut self.input, InputMode::Normal) {
            self.view.search(&query);
        }
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Current location as a string
    pub fn location_text(&self) -> String {
        match self.view.current_location() {
            Some(loc) => format_coords(loc.latitude(), loc.longitude()),
            None => "no location".to_string(),
        }
    }

    pub fn place_name(&self) -> Option<&str> {
        self.view.current_location().and_then(|loc| loc.display_name())
    }

    pub fn transition_text(&self) -> &'static str {
        match self.view.transition() {
            Transition::Idle if self.view.is_locked() => "searching",
            Transition::Idle if self.view.is_locating() => "locating",
            Transition::Idle => "",
            Transition::Rotating => "rotating",
            Transition::Settling { .. } => "settling",
        }
    }
}

/// Format coordinates as `12.3°N, 45.6°W`
pub fn format_coords(lat: f64, lon: f64) -> String {
    format!(
        "{:.3}°{}, {:.3}°{}",
        lat.abs(),
        if lat >= 0.0 { "N" } else { "S" },
        lon.abs(),
        if lon >= 0.0 { "E" } else { "W" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::assets::OfflineLoader;
    use crate::collab::Offline;
    use crate::coordinator::Collaborators;
    use crate::data::Outlines;
    use crate::globe::{GlobeRenderer, GlobeSettings};
    use crate::map::{MapRenderer, MapSettings};

    fn app() -> App {
        let outlines = Rc::new(Outlines::simple_world());
        let mut view = ViewCoordinator::new(
            GlobeRenderer::new(
                Box::new(OfflineLoader::default()),
                outlines.clone(),
                GlobeSettings::default(),
            ),
            MapRenderer::new(
                Box::new(OfflineLoader::default()),
                outlines,
                MapSettings::default(),
            ),
            Collaborators {
                search: Box::new(Offline),
                reverse: Box::new(Offline),
                gps: Box::new(Offline),
            },
            ViewStyle::Standard,
            0.5,
            canvas_cells(42, 23),
        );
        view.initialize().unwrap();
        App::new(view)
    }

    #[test]
    fn test_canvas_cells_leave_room_for_chrome() {
        assert_eq!(canvas_cells(80, 24), (78, 21));
        assert_eq!(canvas_cells(1, 1), (0, 0));
    }

    #[test]
    fn test_format_coords() {
        assert_eq!(format_coords(51.5074, -0.1278), "51.507°N, 0.128°W");
        assert_eq!(format_coords(-33.8688, 151.2093), "33.869°S, 151.209°E");
    }

    #[test]
    fn test_search_prompt_edits_and_cancels() {
        let mut app = app();
        app.start_search();
        for ch in "parix".chars() {
            app.search_input(ch);
        }
        app.search_backspace();
        assert_eq!(app.input, InputMode::Search("pari".into()));
        app.cancel_search();
        assert_eq!(app.input, InputMode::Normal);
        assert!(!app.view.is_locked());
    }

    #[test]
    fn test_map_click_through_mouse_events() {
        let mut app = app();
        app.toggle_surface();
        app.update(0.016);
        assert_eq!(app.view.surface(), Surface::Map);

        app.mouse_down(11, 6);
        app.mouse_up(11, 6);
        app.update(0.016);
        assert!(app.view.current_location().is_some());
        assert_eq!(app.view.map().markers().len(), 1);
        assert_eq!(app.view.surface(), Surface::Map);
    }

    #[test]
    fn test_cursor_readout_on_globe_center() {
        let mut app = app();
        app.update(0.016);
        // Middle of a 40x20 cell canvas, plus the border
        app.set_mouse_pos(21, 11);
        assert!(app.cursor_coords().is_some());
        app.set_mouse_pos(1, 1);
        assert!(app.cursor_coords().is_none());
    }

    #[test]
    fn test_number_keys_select_style() {
        let mut app = app();
        app.select_style(2);
        assert_eq!(app.view.style(), ViewStyle::Night);
        app.select_style(9);
        assert_eq!(app.view.style(), ViewStyle::Night);
    }
}
