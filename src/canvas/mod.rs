mod geometry;
mod raster;

pub use geometry::{draw_circle, draw_line, draw_pin, draw_polyline};
pub use raster::{shade, RasterCanvas, Rgb};
