use crate::app::{format_coords, App, InputMode};
use crate::canvas::RasterCanvas;
use crate::render::Surface;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into view area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Globe or map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_view(frame, app, chunks[0]);
    match &app.input {
        InputMode::Search(query) => render_search_prompt(frame, query, chunks[1]),
        InputMode::Normal => render_status_bar(frame, app, chunks[1]),
    }
}

fn render_view(frame: &mut Frame, app: &App, area: Rect) {
    let surface = app.view.surface();
    let title = match surface {
        Surface::Globe => " Globe ",
        Surface::Map => " Map ",
    };
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    if surface == Surface::Map {
        block = block.title_bottom(
            Line::from(Span::styled(
                format!(" {} ", app.view.style().assets().attribution),
                Style::default().fg(Color::DarkGray),
            ))
            .right_aligned(),
        );
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let canvas = match surface {
        Surface::Globe => app.view.globe().canvas(),
        Surface::Map => app.view.map().canvas(),
    };
    if let Some(canvas) = canvas {
        frame.render_widget(HalfBlockWidget { canvas }, inner);
    }
}

/// Paints a raster canvas with upper-half blocks: foreground is the top
/// pixel of the cell, background the bottom one.
struct HalfBlockWidget<'a> {
    canvas: &'a RasterCanvas,
}

impl Widget for HalfBlockWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (cols, rows) = self.canvas.cells();
        let cols = cols.min(area.width as usize);
        let rows = rows.min(area.height as usize);
        for row in 0..rows {
            let y = area.y + row as u16;
            for col in 0..cols {
                let x = area.x + col as u16;
                let (top, bottom) = self.canvas.cell(col, row);
                buf[(x, y)]
                    .set_char('▀')
                    .set_fg(Color::Rgb(top[0], top[1], top[2]))
                    .set_bg(Color::Rgb(bottom[0], bottom[1], bottom[2]));
            }
        }
    }
}

fn render_search_prompt(frame: &mut Frame, query: &str, area: Rect) {
    let prompt = Line::from(vec![
        Span::styled(" Search: ", Style::default().fg(Color::Yellow)),
        Span::styled(query.to_string(), Style::default().fg(Color::White)),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
        Span::styled(
            "  enter:go esc:cancel",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(prompt), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let view = &app.view;
    let mut spans = vec![
        Span::styled(" ", Style::default()),
        Span::styled(
            view.surface().to_string(),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(view.style().label(), Style::default().fg(Color::Magenta)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.location_text(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(name) = app.place_name() {
        let short: String = name.chars().take(32).collect();
        spans.push(Span::styled(format!(" {short}"), Style::default().fg(Color::White)));
    }

    let transition = app.transition_text();
    if !transition.is_empty() {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            transition,
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(status) = view.status() {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(status.to_string(), Style::default().fg(Color::Red)));
    }

    if let Some((lat, lon)) = app.cursor_coords() {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            format_coords(lat, lon),
            Style::default().fg(Color::Gray),
        ));
    }

    spans.push(Span::styled(
        " | /:search g:locate t:toggle 1-4:style hjkl:move +/-:zoom q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
