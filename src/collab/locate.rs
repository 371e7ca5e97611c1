use std::time::Duration;

use serde::Deserialize;

use super::{GpsProvider, Pending};
use crate::error::CollaboratorError;

/// Device location: a configured fix if present, otherwise IP geolocation.
#[derive(Debug, Clone)]
pub struct IpLocator {
    client: reqwest::blocking::Client,
    fixed: Option<(f64, f64)>,
}

#[derive(Debug, Deserialize)]
struct IpApiCo {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct IpApiCom {
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpLocator {
    pub fn new(user_agent: &str, fixed: Option<(f64, f64)>) -> Result<Self, CollaboratorError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, fixed })
    }
}

impl GpsProvider for IpLocator {
    fn locate(&self) -> Pending<(f64, f64)> {
        if let Some(fix) = self.fixed {
            log::info!("Using configured location override: {}, {}", fix.0, fix.1);
            return Pending::ready(fix);
        }
        let client = self.client.clone();
        Pending::spawn(move || lookup(&client))
    }
}

fn lookup(client: &reqwest::blocking::Client) -> Result<(f64, f64), CollaboratorError> {
    log::info!("Falling back to IP-based geolocation");

    match fetch(client, "https://ipapi.co/json/").and_then(|mut body| parse_ipapi_co(&mut body)) {
        Ok(fix) => {
            log::info!("Location found via ipapi.co: {}, {}", fix.0, fix.1);
            return Ok(fix);
        }
        Err(e) => log::debug!("ipapi.co lookup failed: {e}"),
    }

    match fetch(client, "http://ip-api.com/json/").and_then(|mut body| parse_ip_api_com(&mut body))
    {
        Ok(fix) => {
            log::info!("Location found via ip-api.com: {}, {}", fix.0, fix.1);
            Ok(fix)
        }
        Err(e) => {
            log::warn!("Failed to fetch location from all sources: {e}");
            Err(CollaboratorError::Unavailable(
                "no geolocation source answered".into(),
            ))
        }
    }
}

fn fetch(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, CollaboratorError> {
    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(CollaboratorError::Unavailable(format!(
            "{url}: HTTP {}",
            response.status()
        )));
    }
    Ok(response.bytes()?.to_vec())
}

fn parse_ipapi_co(body: &mut [u8]) -> Result<(f64, f64), CollaboratorError> {
    let reply: IpApiCo = simd_json::serde::from_slice(body)?;
    reply
        .latitude
        .zip(reply.longitude)
        .ok_or_else(|| CollaboratorError::Decode("ipapi.co reply without coordinates".into()))
}

fn parse_ip_api_com(body: &mut [u8]) -> Result<(f64, f64), CollaboratorError> {
    let reply: IpApiCom = simd_json::serde::from_slice(body)?;
    reply
        .lat
        .zip(reply.lon)
        .ok_or_else(|| CollaboratorError::Decode("ip-api.com reply without coordinates".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_resolves_without_network() {
        let locator = IpLocator::new("globe-map-test", Some((48.8566, 2.3522))).unwrap();
        let mut pending = locator.locate();
        assert_eq!(pending.try_take().unwrap().unwrap(), (48.8566, 2.3522));
    }

    #[test]
    fn test_parse_ipapi_co() {
        let mut body = br#"{"ip":"1.2.3.4","city":"Oslo","latitude":59.9139,"longitude":10.7522}"#.to_vec();
        assert_eq!(parse_ipapi_co(&mut body).unwrap(), (59.9139, 10.7522));
    }

    #[test]
    fn test_parse_ip_api_com_missing_fields() {
        let mut body = br#"{"status":"fail","message":"reserved range"}"#.to_vec();
        assert!(parse_ip_api_com(&mut body).is_err());

        let mut body = br#"{"status":"success","lat":-33.87,"lon":151.21}"#.to_vec();
        assert_eq!(parse_ip_api_com(&mut body).unwrap(), (-33.87, 151.21));
    }
}
