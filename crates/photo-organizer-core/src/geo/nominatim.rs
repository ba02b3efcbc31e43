use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::throttle::RateLimiter;
use super::{Address, Coordinates, GeocodeError, ReverseGeocoder};
use crate::GeocoderOptions;

/// Reverse geocoder for the Nominatim `/reverse` endpoint.
///
/// Every attempt, retries included, goes through the rate limiter first.
pub struct NominatimClient {
    http: Client,
    endpoint: String,
    language: String,
    retries: u32,
    limiter: RateLimiter,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    error: Option<String>,
}

impl NominatimClient {
    pub fn new(options: &GeocoderOptions) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: options.endpoint.trim_end_matches('/').to_string(),
            language: options.language.clone(),
            retries: options.retries,
            limiter: RateLimiter::new(Duration::from_millis(options.min_interval_ms)),
        })
    }

    fn request(&mut self, coordinates: Coordinates) -> Result<Address, GeocodeError> {
        let waited = self.limiter.acquire();
        debug!(%coordinates, waited_ms = waited.as_millis() as u64, "reverse geocoding");

        let response = self
            .http
            .get(format!("{}/reverse", self.endpoint))
            .query(&[
                ("format", "jsonv2".to_string()),
                ("addressdetails", "1".to_string()),
                ("lat", format!("{:.6}", coordinates.latitude)),
                ("lon", format!("{:.6}", coordinates.longitude)),
                ("accept-language", self.language.clone()),
            ])
            .send()
            .map_err(GeocodeError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.text().map_err(GeocodeError::Http)?;
        parse_reverse_response(&body)
    }
}

impl ReverseGeocoder for NominatimClient {
    fn reverse(&mut self, coordinates: Coordinates) -> Result<Address, GeocodeError> {
        let mut attempt = 0;
        loop {
            match self.request(coordinates) {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "geocoding failed, retrying");
                }
                other => return other,
            }
        }
    }
}

/// Decode a `/reverse` JSON body. Nominatim answers points it cannot place
/// (open sea, for instance) with `{"error": "..."}` and a 200 status.
pub fn parse_reverse_response(body: &str) -> Result<Address, GeocodeError> {
    let parsed: ReverseResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;
    if let Some(message) = parsed.error {
        return Err(GeocodeError::Service(message));
    }
    parsed
        .address
        .ok_or_else(|| GeocodeError::Malformed("response has no address".to_string()))
}
