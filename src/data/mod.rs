//! Coastline outlines drawn as placeholder imagery on both surfaces.

use anyhow::Result;
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

/// Polylines in (lon, lat) degrees.
#[derive(Debug, Clone, Default)]
pub struct Outlines {
    lines: Vec<Vec<(f64, f64)>>,
}

impl Outlines {
    pub fn lines(&self) -> &[Vec<(f64, f64)>] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Natural Earth coastlines from `data_dir`, coarsest file first, or the
    /// built-in outline when none of them can be read.
    pub fn load(data_dir: Option<&Path>) -> Self {
        const COASTLINE_FILES: [&str; 3] = [
            "ne_110m_coastline.json",
            "ne_50m_coastline.json",
            "natural-earth.json",
        ];

        if let Some(dir) = data_dir {
            for filename in COASTLINE_FILES {
                let path = dir.join(filename);
                if !path.exists() {
                    continue;
                }
                match Self::from_file(&path) {
                    Ok(outlines) if !outlines.is_empty() => {
                        log::info!("Loaded {} coastlines from {}", outlines.lines.len(), path.display());
                        return outlines;
                    }
                    Ok(_) => log::warn!("{} has no line geometry", path.display()),
                    Err(e) => log::warn!("Failed to load {}: {e}", path.display()),
                }
            }
        }

        log::info!("Using built-in world outline");
        Self::simple_world()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_geojson_str(&content)
    }

    pub fn from_geojson_str(content: &str) -> Result<Self> {
        let geojson: GeoJson = content.parse()?;
        let mut lines = Vec::new();
        process_geojson_lines(&geojson, |line| {
            if line.len() >= 2 {
                lines.push(line);
            }
        });
        Ok(Self { lines })
    }

    /// Simplified continent outlines, used when no data file is available.
    pub fn simple_world() -> Self {
        let lines = vec![
            // North America
            vec![
                (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
                (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
                (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
                (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
                (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
                (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
                (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
                (-168.0, 65.0),
            ],
            // South America
            vec![
                (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
                (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
                (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
                (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
                (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
                (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
            ],
            // Europe
            vec![
                (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
                (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
                (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
                (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
                (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
                (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
            ],
            // Africa
            vec![
                (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
                (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
                (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
                (40.0, -5.0), (35.0, -20.0), (35.0, -25.0), (30.0, -30.0),
                (20.0, -35.0), (18.0, -35.0), (15.0, -30.0), (10.0, -15.0),
                (10.0, 0.0), (5.0, 5.0), (-5.0, 5.0), (-10.0, 10.0),
                (-17.0, 15.0),
            ],
            // Asia
            vec![
                (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0),
                (60.0, 25.0), (65.0, 25.0), (70.0, 20.0), (75.0, 15.0),
                (80.0, 8.0), (80.0, 15.0), (88.0, 22.0), (92.0, 22.0),
                (95.0, 16.0), (100.0, 14.0), (105.0, 10.0), (110.0, 20.0),
                (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
                (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0),
                (145.0, 50.0), (140.0, 55.0), (135.0, 55.0), (130.0, 52.0),
                (130.0, 43.0), (120.0, 40.0), (110.0, 45.0), (90.0, 50.0),
                (70.0, 55.0), (60.0, 55.0), (50.0, 50.0), (40.0, 43.0),
            ],
            // Australia
            vec![
                (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
                (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
                (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
                (125.0, -32.0), (115.0, -35.0), (115.0, -25.0), (115.0, -20.0),
            ],
        ];
        Self { lines }
    }
}

/// Walk a GeoJSON document and hand every line (or polygon exterior) to `add_line`.
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(Vec<(f64, f64)>),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn to_line(coords: &[Vec<f64>]) -> Vec<(f64, f64)> {
    coords.iter().filter(|c| c.len() >= 2).map(|c| (c[0], c[1])).collect()
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(Vec<(f64, f64)>),
{
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => lines.iter().for_each(|c| add_line(to_line(c))),
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for exterior in polygons.iter().filter_map(|rings| rings.first()) {
                add_line(to_line(exterior));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_lines_and_polygons() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [10, 10]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [5, 5]}}
            ]
        }"#;
        let outlines = Outlines::from_geojson_str(doc).unwrap();
        assert_eq!(outlines.lines().len(), 2);
        assert_eq!(outlines.lines()[0], vec![(0.0, 0.0), (10.0, 10.0)]);
    }

    #[test]
    fn test_missing_dir_falls_back() {
        let outlines = Outlines::load(Some(Path::new("/nonexistent/globe-map-data")));
        assert_eq!(outlines.lines().len(), Outlines::simple_world().lines().len());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(Outlines::from_geojson_str("not json").is_err());
    }
}
