/// RGB triple
pub type Rgb = [u8; 3];

/// Scale a color by a light intensity, saturating at white.
#[inline(always)]
pub fn shade(rgb: Rgb, intensity: f64) -> Rgb {
    let scale = |c: u8| (c as f64 * intensity).round().clamp(0.0, 255.0) as u8;
    [scale(rgb[0]), scale(rgb[1]), scale(rgb[2])]
}

/// Color canvas for terminal graphics using upper half blocks.
/// Each character cell represents a 1x2 pixel column: the top pixel is drawn
/// as the glyph foreground and the bottom pixel as its background, which
/// gives roughly square pixels in common terminal fonts.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    width: usize,  // Pixels (== characters)
    height: usize, // Pixels (== 2 * characters)
    pixels: Vec<Rgb>,
}

impl RasterCanvas {
    /// Create a canvas for the given character dimensions.
    /// Effective pixel resolution: cols x rows*2
    pub fn new(cols: usize, rows: usize) -> Self {
        let width = cols;
        let height = rows * 2;
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0]; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Character dimensions (cols, rows)
    pub fn cells(&self) -> (usize, usize) {
        (self.width, self.height / 2)
    }

    /// Reallocate for new character dimensions if they changed.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        if cols != self.width || rows * 2 != self.height {
            *self = Self::new(cols, rows);
        }
    }

    pub fn fill(&mut self, rgb: Rgb) {
        self.pixels.fill(rgb);
    }

    /// Set a pixel; out-of-bounds writes are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: Rgb) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = rgb;
        }
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    #[inline]
    pub fn set_pixel_signed(&mut self, x: i32, y: i32, rgb: Rgb) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize, rgb);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Mutable access to one pixel row, used by the rasterizers.
    pub fn row_mut(&mut self, y: usize) -> &mut [Rgb] {
        let start = y * self.width;
        &mut self.pixels[start..start + self.width]
    }

    /// (top, bottom) colors of one character cell.
    pub fn cell(&self, col: usize, row: usize) -> (Rgb, Rgb) {
        let top = self.pixel(col, row * 2).unwrap_or_default();
        let bottom = self.pixel(col, row * 2 + 1).unwrap_or_default();
        (top, bottom)
    }

    /// Count pixels exactly matching a color. Used by tests and diagnostics.
    pub fn count(&self, rgb: Rgb) -> usize {
        self.pixels.iter().filter(|&&p| p == rgb).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let canvas = RasterCanvas::new(10, 4);
        assert_eq!(canvas.width(), 10);
        assert_eq!(canvas.height(), 8);
        assert_eq!(canvas.cells(), (10, 4));
    }

    #[test]
    fn test_cell_packs_two_rows() {
        let mut canvas = RasterCanvas::new(1, 1);
        canvas.set_pixel(0, 0, [255, 0, 0]);
        canvas.set_pixel(0, 1, [0, 0, 255]);
        assert_eq!(canvas.cell(0, 0), ([255, 0, 0], [0, 0, 255]));
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut canvas = RasterCanvas::new(2, 1);
        canvas.set_pixel(5, 5, [1, 1, 1]);
        canvas.set_pixel_signed(-1, 0, [1, 1, 1]);
        assert_eq!(canvas.count([1, 1, 1]), 0);
    }

    #[test]
    fn test_shade_saturates() {
        assert_eq!(shade([100, 200, 250], 0.5), [50, 100, 125]);
        assert_eq!(shade([200, 200, 200], 2.0), [255, 255, 255]);
    }
}
