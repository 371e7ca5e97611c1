use super::raster::{RasterCanvas, Rgb};

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut RasterCanvas, x0: i32, y0: i32, x1: i32, y1: i32, rgb: Rgb) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y, rgb);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a filled circle
pub fn draw_circle(canvas: &mut RasterCanvas, cx: i32, cy: i32, radius: i32, rgb: Rgb) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy, rgb);
            }
        }
    }
}

/// Draw a map pin whose tip sits on (x, y): a round head above a short stem.
pub fn draw_pin(canvas: &mut RasterCanvas, x: i32, y: i32, rgb: Rgb) {
    draw_line(canvas, x, y, x, y - 2, rgb);
    draw_circle(canvas, x, y - 4, 2, rgb);
    canvas.set_pixel_signed(x, y - 4, [255, 255, 255]);
}

/// Draw a projected polyline. `project` returns `None` for vertices that
/// cannot be drawn (back side of the globe), which breaks the line.
/// Segments longer than `max_jump` pixels are skipped; they come from
/// antimeridian wraps, not real geometry.
pub fn draw_polyline(
    canvas: &mut RasterCanvas,
    line: &[(f64, f64)],
    max_jump: i32,
    rgb: Rgb,
    mut project: impl FnMut(f64, f64) -> Option<(i32, i32)>,
) {
    let mut prev: Option<(i32, i32)> = None;
    for &(lon, lat) in line {
        let point = project(lon, lat);
        if let (Some((x0, y0)), Some((x1, y1))) = (prev, point) {
            let jump = (x1 - x0).abs() + (y1 - y0).abs();
            if jump < max_jump && segment_might_be_visible(canvas, (x0, y0), (x1, y1)) {
                draw_line(canvas, x0, y0, x1, y1, rgb);
            }
        }
        prev = point;
    }
}

/// Rough bounding box check against the canvas
fn segment_might_be_visible(canvas: &RasterCanvas, p1: (i32, i32), p2: (i32, i32)) -> bool {
    let min_x = p1.0.min(p2.0);
    let max_x = p1.0.max(p2.0);
    let min_y = p1.1.min(p2.1);
    let max_y = p1.1.max(p2.1);

    max_x >= 0 && min_x < canvas.width() as i32 && max_y >= 0 && min_y < canvas.height() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = [255, 0, 0];

    #[test]
    fn test_horizontal_line() {
        let mut canvas = RasterCanvas::new(10, 1);
        draw_line(&mut canvas, 0, 0, 9, 0, RED);
        assert_eq!(canvas.count(RED), 10);
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = RasterCanvas::new(1, 4);
        draw_line(&mut canvas, 0, 0, 0, 7, RED);
        assert_eq!(canvas.count(RED), 8);
    }

    #[test]
    fn test_polyline_breaks_on_hidden_vertex() {
        let mut canvas = RasterCanvas::new(10, 5);
        let line = [(0.0, 0.0), (5.0, 0.0), (9.0, 0.0)];
        draw_polyline(&mut canvas, &line, 100, RED, |lon, _| {
            if lon == 5.0 {
                None
            } else {
                Some((lon as i32, 0))
            }
        });
        assert_eq!(canvas.count(RED), 0);
    }

    #[test]
    fn test_polyline_skips_wrap_jumps() {
        let mut canvas = RasterCanvas::new(20, 2);
        let line = [(0.0, 0.0), (19.0, 0.0)];
        draw_polyline(&mut canvas, &line, 10, RED, |lon, _| Some((lon as i32, 1)));
        assert_eq!(canvas.count(RED), 0);
    }

    #[test]
    fn test_pin_tip_is_painted() {
        let mut canvas = RasterCanvas::new(10, 5);
        draw_pin(&mut canvas, 5, 8, RED);
        assert_eq!(canvas.pixel(5, 8), Some(RED));
        assert_eq!(canvas.pixel(5, 4), Some([255, 255, 255]));
    }
}
