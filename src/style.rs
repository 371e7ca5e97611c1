use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Visual theme selecting the globe texture and the map tile source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewStyle {
    Standard,
    #[default]
    Satellite,
    Night,
    Topology,
}

impl ViewStyle {
    pub const ALL: [ViewStyle; 4] = [
        ViewStyle::Standard,
        ViewStyle::Satellite,
        ViewStyle::Night,
        ViewStyle::Topology,
    ];

    /// Asset configuration for this style.
    pub fn assets(self) -> &'static StyleAssets {
        match self {
            ViewStyle::Standard => &STANDARD,
            ViewStyle::Satellite => &SATELLITE,
            ViewStyle::Night => &NIGHT,
            ViewStyle::Topology => &TOPOLOGY,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewStyle::Standard => "Standard",
            ViewStyle::Satellite => "Satellite",
            ViewStyle::Night => "Night",
            ViewStyle::Topology => "Topology",
        }
    }
}

impl fmt::Display for ViewStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a style's imagery comes from.
#[derive(Debug)]
pub struct StyleAssets {
    /// Equirectangular texture wrapped onto the globe
    pub texture_url: &'static str,
    /// XYZ tile template with `{z}`, `{x}`, `{y}` placeholders
    pub tile_template: &'static str,
    /// Highest zoom level the tile source serves
    pub max_zoom: u8,
    pub attribution: &'static str,
    /// Flat color used for the sphere and map background before imagery arrives
    pub placeholder_rgb: [u8; 3],
}

impl StyleAssets {
    /// Expand the tile template for one tile.
    pub fn tile_url(&self, z: u8, x: u32, y: u32) -> String {
        self.tile_template
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

static STANDARD: StyleAssets = StyleAssets {
    texture_url: "https://unpkg.com/three-globe/example/img/earth-day.jpg",
    tile_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
    max_zoom: 19,
    attribution: "© OpenStreetMap contributors",
    placeholder_rgb: [38, 78, 128],
};

static SATELLITE: StyleAssets = StyleAssets {
    texture_url: "https://unpkg.com/three-globe/example/img/earth-blue-marble.jpg",
    tile_template:
        "https://services.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
    max_zoom: 19,
    attribution: "© Esri World Imagery",
    placeholder_rgb: [18, 42, 84],
};

// Source tiles only exist down to level 8
static NIGHT: StyleAssets = StyleAssets {
    texture_url: "https://unpkg.com/three-globe/example/img/earth-night.jpg",
    tile_template: "https://gibs.earthdata.nasa.gov/wmts/epsg3857/best/VIIRS_CityLights_2012/default/GoogleMapsCompatible_Level8/{z}/{y}/{x}.jpg",
    max_zoom: 8,
    attribution: "NASA EOSDIS GIBS",
    placeholder_rgb: [8, 10, 24],
};

static TOPOLOGY: StyleAssets = StyleAssets {
    texture_url: "https://unpkg.com/three-globe/example/img/earth-topology.png",
    tile_template: "https://tile.opentopomap.org/{z}/{x}/{y}.png",
    max_zoom: 17,
    attribution: "© OpenTopoMap (CC-BY-SA)",
    placeholder_rgb: [90, 96, 88],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_style_has_distinct_sources() {
        for (i, a) in ViewStyle::ALL.iter().enumerate() {
            for b in &ViewStyle::ALL[i + 1..] {
                assert_ne!(a.assets().texture_url, b.assets().texture_url);
                assert_ne!(a.assets().tile_template, b.assets().tile_template);
            }
        }
    }

    #[test]
    fn test_night_is_coarsest() {
        let night = ViewStyle::Night.assets().max_zoom;
        for style in ViewStyle::ALL {
            assert!(style.assets().max_zoom >= night);
        }
        assert_eq!(night, 8);
    }

    #[test]
    fn test_tile_url_expansion() {
        assert_eq!(
            ViewStyle::Standard.assets().tile_url(3, 4, 5),
            "https://tile.openstreetmap.org/3/4/5.png"
        );
        // ArcGIS orders row before column
        assert!(ViewStyle::Satellite
            .assets()
            .tile_url(3, 4, 5)
            .ends_with("/tile/3/5/4"));
    }
}
