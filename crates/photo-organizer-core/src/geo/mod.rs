pub mod nominatim;
pub mod throttle;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

pub use nominatim::NominatimClient;
pub use throttle::RateLimiter;

/// Folder place name used whenever no real place can be determined.
pub const UNKNOWN_PLACE: &str = "Inconnu";

/// Longest place name kept in a folder name, in characters.
pub const MAX_PLACE_LEN: usize = 60;

const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Decimal degrees. Present-but-zero is a real position; absence is modelled
/// with `Option<Coordinates>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Within [-90, 90] x [-180, 180] and finite.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Fixed 1e-4 degree grid cell for the lookup cache. Two points only
    /// share an entry when they round to the same cell, however close they are.
    fn cache_key(&self) -> (i64, i64) {
        (
            (self.latitude * 10_000.0).round() as i64,
            (self.longitude * 10_000.0).round() as i64,
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Address breakdown of a reverse-geocoding result. Only the levels a
/// place name can come from are kept; the rest of the response is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Address {
    pub village: Option<String>,
    pub town: Option<String>,
    pub city: Option<String>,
    pub municipality: Option<String>,
    pub county: Option<String>,
}

impl Address {
    /// First non-empty of village, town, city, municipality, county.
    pub fn place_name(&self) -> Option<&str> {
        [
            &self.village,
            &self.town,
            &self.city,
            &self.municipality,
            &self.county,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
    }
}

#[derive(Debug)]
pub enum GeocodeError {
    /// Transport failure, including timeouts.
    Http(reqwest::Error),
    /// Non-success HTTP status.
    Status(u16),
    /// The service answered with an error message.
    Service(String),
    /// The body could not be decoded.
    Malformed(String),
}

impl GeocodeError {
    /// Worth another attempt: timeouts, connection failures, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            GeocodeError::Http(e) => e.is_timeout() || e.is_connect(),
            GeocodeError::Status(code) => *code == 429 || *code >= 500,
            GeocodeError::Service(_) | GeocodeError::Malformed(_) => false,
        }
    }
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeError::Http(e) => write!(f, "request failed: {e}"),
            GeocodeError::Status(code) => write!(f, "service returned HTTP {code}"),
            GeocodeError::Service(msg) => write!(f, "service error: {msg}"),
            GeocodeError::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for GeocodeError {}

/// Turns coordinates into an address.
pub trait ReverseGeocoder {
    fn reverse(&mut self, coordinates: Coordinates) -> Result<Address, GeocodeError>;
}

/// How a place name was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaceSource {
    Geocoded,
    Cached,
    NoCoordinates,
    OutOfRange,
    LookupFailed,
    Offline,
}

impl PlaceSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaceSource::Geocoded => "geocoded",
            PlaceSource::Cached => "cached",
            PlaceSource::NoCoordinates => "no-coordinates",
            PlaceSource::OutOfRange => "out-of-range",
            PlaceSource::LookupFailed => "lookup-failed",
            PlaceSource::Offline => "offline",
        }
    }
}

impl fmt::Display for PlaceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPlace {
    pub name: String,
    pub source: PlaceSource,
}

impl ResolvedPlace {
    fn unknown(source: PlaceSource) -> Self {
        Self {
            name: UNKNOWN_PLACE.to_string(),
            source,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_PLACE
    }
}

/// Make a geocoder place string safe to use inside a folder name.
///
/// Keeps the part before the first comma (dropping region, postcode and
/// country), applies NFC, replaces path separators and other characters
/// Windows rejects, collapses whitespace, caps the length and strips leading
/// and trailing dots. Returns None if nothing usable is left.
pub fn normalize_place_name(raw: &str) -> Option<String> {
    let nfc: String = raw.nfc().collect();
    let head = nfc.split(',').next().unwrap_or("");
    let cleaned: String = head
        .chars()
        .map(|c| {
            if c.is_control() || FORBIDDEN_CHARS.contains(&c) {
                ' '
            } else {
                c
            }
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(MAX_PLACE_LEN).collect();
    let name = capped
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string();
    (!name.is_empty()).then_some(name)
}

/// Location Resolver: coordinates in, folder-safe place name out.
///
/// Lookups that succeed are cached for the rest of the run. Every failure
/// degrades to [`UNKNOWN_PLACE`] with a [`PlaceSource`] saying why.
pub struct LocationResolver<G> {
    geocoder: Option<G>,
    cache: HashMap<(i64, i64), String>,
}

impl<G: ReverseGeocoder> LocationResolver<G> {
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder: Some(geocoder),
            cache: HashMap::new(),
        }
    }

    /// A resolver that never makes network calls.
    pub fn offline() -> Self {
        Self {
            geocoder: None,
            cache: HashMap::new(),
        }
    }

    pub fn resolve_location(&mut self, coordinates: Option<Coordinates>) -> ResolvedPlace {
        let Some(coordinates) = coordinates else {
            debug!("no GPS coordinates");
            return ResolvedPlace::unknown(PlaceSource::NoCoordinates);
        };
        if !coordinates.is_valid() {
            warn!(%coordinates, "GPS coordinates out of range");
            return ResolvedPlace::unknown(PlaceSource::OutOfRange);
        }

        let key = coordinates.cache_key();
        if let Some(name) = self.cache.get(&key) {
            debug!(%coordinates, place = %name, "place from cache");
            return ResolvedPlace {
                name: name.clone(),
                source: PlaceSource::Cached,
            };
        }

        let Some(geocoder) = self.geocoder.as_mut() else {
            return ResolvedPlace::unknown(PlaceSource::Offline);
        };

        match geocoder.reverse(coordinates) {
            Ok(address) => match address.place_name().and_then(normalize_place_name) {
                Some(name) => {
                    self.cache.insert(key, name.clone());
                    ResolvedPlace {
                        name,
                        source: PlaceSource::Geocoded,
                    }
                }
                None => {
                    warn!(%coordinates, "geocoder returned no usable place name");
                    ResolvedPlace::unknown(PlaceSource::LookupFailed)
                }
            },
            Err(e) => {
                warn!(%coordinates, error = %e, "geocoding failed");
                ResolvedPlace::unknown(PlaceSource::LookupFailed)
            }
        }
    }
}
