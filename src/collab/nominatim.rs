use std::time::Duration;

use serde::Deserialize;

use super::{Pending, Place, ReverseGeocoder, SearchProvider};
use crate::error::CollaboratorError;

const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";

/// OpenStreetMap Nominatim client for search and reverse lookups.
#[derive(Debug, Clone)]
pub struct Nominatim {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    display_name: String,
    lat: String,
    lon: String,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    municipality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseHit {
    display_name: Option<String>,
    #[serde(default)]
    address: Address,
}

impl Nominatim {
    /// Nominatim's usage policy requires an identifying user agent.
    pub fn new(user_agent: &str) -> Result<Self, CollaboratorError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    fn get(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, CollaboratorError> {
        let response = client.get(url).send()?;
        if !response.status().is_success() {
            return Err(CollaboratorError::Unavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl SearchProvider for Nominatim {
    fn search(&self, query: &str) -> Pending<Option<Place>> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.endpoint,
            urlencoding::encode(query)
        );
        let client = self.client.clone();
        Pending::spawn(move || {
            let mut body = Self::get(&client, &url)?;
            parse_search(&mut body)
        })
    }
}

impl ReverseGeocoder for Nominatim {
    fn reverse(&self, latitude: f64, longitude: f64) -> Pending<String> {
        let url = format!(
            "{}/reverse?lat={latitude}&lon={longitude}&format=json&zoom=10",
            self.endpoint
        );
        let client = self.client.clone();
        Pending::spawn(move || {
            let mut body = Self::get(&client, &url)?;
            parse_reverse(&mut body)
        })
    }
}

fn parse_search(body: &mut [u8]) -> Result<Option<Place>, CollaboratorError> {
    let hits: Vec<SearchHit> = simd_json::serde::from_slice(body)?;
    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };
    let parse = |s: &str| {
        s.parse::<f64>()
            .map_err(|e| CollaboratorError::Decode(format!("coordinate {s:?}: {e}")))
    };
    Ok(Some(Place {
        latitude: parse(&hit.lat)?,
        longitude: parse(&hit.lon)?,
        name: hit.display_name,
    }))
}

fn parse_reverse(body: &mut [u8]) -> Result<String, CollaboratorError> {
    let hit: ReverseHit = simd_json::serde::from_slice(body)?;
    place_name(hit)
}

/// Most specific settlement name available, then the full display name.
fn place_name(hit: ReverseHit) -> Result<String, CollaboratorError> {
    let Address {
        city,
        town,
        village,
        suburb,
        municipality,
    } = hit.address;
    city.or(town)
        .or(village)
        .or(suburb)
        .or(municipality)
        .or(hit.display_name)
        .ok_or_else(|| CollaboratorError::Decode("no place name in response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_hit() {
        let mut body = br#"[{"place_id":1,"display_name":"London, Greater London, England","lat":"51.5074","lon":"-0.1278"}]"#.to_vec();
        let place = parse_search(&mut body).unwrap().unwrap();
        assert_eq!(place.name, "London, Greater London, England");
        assert!((place.latitude - 51.5074).abs() < 1e-9);
        assert!((place.longitude + 0.1278).abs() < 1e-9);
    }

    #[test]
    fn test_parse_search_empty() {
        let mut body = b"[]".to_vec();
        assert_eq!(parse_search(&mut body).unwrap(), None);
    }

    #[test]
    fn test_parse_search_bad_coordinate() {
        let mut body = br#"[{"display_name":"X","lat":"north","lon":"0"}]"#.to_vec();
        assert!(matches!(
            parse_search(&mut body),
            Err(CollaboratorError::Decode(_))
        ));
    }

    #[test]
    fn test_reverse_prefers_city() {
        let mut body = br#"{"display_name":"Full, Name","address":{"town":"Townsville","city":"Metropolis"}}"#.to_vec();
        assert_eq!(parse_reverse(&mut body).unwrap(), "Metropolis");
    }

    #[test]
    fn test_reverse_falls_through_chain() {
        let mut body = br#"{"display_name":"Full","address":{"suburb":"Inner","municipality":"Outer"}}"#.to_vec();
        assert_eq!(parse_reverse(&mut body).unwrap(), "Inner");

        let mut body = br#"{"display_name":"Somewhere at sea"}"#.to_vec();
        assert_eq!(parse_reverse(&mut body).unwrap(), "Somewhere at sea");
    }

    #[test]
    fn test_reverse_error_response() {
        let mut body = br#"{"error":"Unable to geocode"}"#.to_vec();
        assert!(parse_reverse(&mut body).is_err());
    }
}
