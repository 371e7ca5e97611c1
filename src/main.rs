use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;

use globe_map::app::{canvas_cells, App, InputMode};
use globe_map::assets::{AssetLoader, HttpLoader, OfflineLoader};
use globe_map::collab::{GpsProvider, IpLocator, Nominatim, Offline};
use globe_map::config::AppConfig;
use globe_map::coordinator::{Collaborators, ViewCoordinator};
use globe_map::data::Outlines;
use globe_map::globe::GlobeRenderer;
use globe_map::map::MapRenderer;
use globe_map::style::ViewStyle;
use globe_map::ui;

#[derive(Parser, Debug)]
#[command(author, version, about = "Spin a globe, search a place, land on the map")]
struct Cli {
    /// Initial imagery style (overrides the config file)
    #[arg(long, value_enum)]
    style: Option<ViewStyle>,

    /// Place to search for right after startup
    #[arg(long)]
    search: Option<String>,

    /// Never touch the network
    #[arg(long)]
    offline: bool,

    /// Log file (default: globe-map.log in the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Ignore the config file and use built-in defaults
    #[arg(long)]
    no_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let mut config = if cli.no_config {
        AppConfig::default()
    } else {
        match AppConfig::load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config, using defaults: {e}");
                AppConfig::default()
            }
        }
    };
    if let Some(style) = cli.style {
        config.default_style = style;
    }
    config.offline |= cli.offline;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, &config, cli.search.as_deref());

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Route log output to a file; the terminal belongs to the UI.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let path = match log_file {
        Some(path) => path.to_path_buf(),
        None => {
            let dir = dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("globe-map");
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            dir.join("globe-map.log")
        }
    };
    let file = File::create(&path).with_context(|| format!("opening log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    log::info!("globe-map {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn asset_loader(config: &AppConfig) -> Box<dyn AssetLoader> {
    if config.offline {
        return Box::new(OfflineLoader::default());
    }
    match HttpLoader::new(&config.user_agent) {
        Ok(loader) => Box::new(loader),
        Err(e) => {
            log::warn!("HTTP client unavailable, using placeholder imagery: {e}");
            Box::new(OfflineLoader::default())
        }
    }
}

fn collaborators(config: &AppConfig) -> Collaborators {
    let offline = || Collaborators {
        search: Box::new(Offline),
        reverse: Box::new(Offline),
        gps: Box::new(Offline),
    };
    if config.offline {
        return offline();
    }

    let nominatim = match Nominatim::new(&config.user_agent) {
        Ok(nominatim) => nominatim,
        Err(e) => {
            log::warn!("Geocoding unavailable: {e}");
            return offline();
        }
    };
    let gps: Box<dyn GpsProvider> = match IpLocator::new(&config.user_agent, config.gps_override()) {
        Ok(locator) => Box::new(locator),
        Err(e) => {
            log::warn!("Location lookup unavailable: {e}");
            Box::new(Offline)
        }
    };
    Collaborators {
        search: Box::new(nominatim.clone()),
        reverse: Box::new(nominatim),
        gps,
    }
}

fn build_view(config: &AppConfig, cells: (u16, u16)) -> ViewCoordinator {
    let data_dir = config
        .data_dir
        .clone()
        .or_else(|| Some(PathBuf::from("data")).filter(|dir| dir.exists()));
    let outlines = Rc::new(Outlines::load(data_dir.as_deref()));

    ViewCoordinator::new(
        GlobeRenderer::new(asset_loader(config), outlines.clone(), config.globe_settings()),
        MapRenderer::new(asset_loader(config), outlines, config.map_settings()),
        collaborators(config),
        config.default_style,
        config.settle_delay_s(),
        cells,
    )
}

/// Handle mouse events for orbiting, panning, picking and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for the coordinate readout
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_at(mouse.column, mouse.row, 1),
        MouseEventKind::ScrollDown => app.zoom_at(mouse.column, mouse.row, -1),
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(mouse.column, mouse.row),
        _ => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if let InputMode::Search(_) = app.input {
        match key.code {
            KeyCode::Enter => app.submit_search(),
            KeyCode::Esc => app.cancel_search(),
            KeyCode::Backspace => app.search_backspace(),
            KeyCode::Char(ch) => app.search_input(ch),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('g') | KeyCode::Char('G') => app.locate(),
        KeyCode::Char('t') | KeyCode::Char('T') => app.toggle_surface(),
        KeyCode::Char(ch @ '1'..='4') => app.select_style(ch as usize - '1' as usize),

        // Orbit (globe) or pan (map) with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-8, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(8, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: &AppConfig, search: Option<&str>) -> Result<()> {
    let size = terminal.size()?;
    let mut view = build_view(config, canvas_cells(size.width, size.height));
    view.initialize().context("initializing globe")?;
    let mut app = App::new(view);
    if let Some(query) = search {
        app.view.search(query);
    }

    let mut last_frame = Instant::now();

    // Main loop
    loop {
        let now = Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f64().min(0.25);
        last_frame = now;
        app.update(dt);

        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        handle_key(&mut app, key);
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, mouse);
                }
                Event::Resize(width, height) => {
                    app.resize(width, height);
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.view.dispose();
    Ok(())
}
