//! Three-word geocodes and the cells they name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::LandgrabError;

/// Separator between the three words of a geocode.
pub const WORD_SEPARATOR: char = '.';

/// A validated three-word geocode such as `filled.count.soap`.
///
/// Matches `^[a-z]+\.[a-z]+\.[a-z]+$`. Every ledger write path takes a
/// `GeoCode`, so an unvalidated string can never reach a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeoCode(String);

impl GeoCode {
    pub fn parse(raw: &str) -> Result<Self, LandgrabError> {
        if is_valid_code(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(LandgrabError::InvalidGeoCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The three words, in order.
    pub fn words(&self) -> [&str; 3] {
        let mut parts = self.0.split(WORD_SEPARATOR);
        // Construction guarantees exactly three non-empty parts.
        [
            parts.next().unwrap_or_default(),
            parts.next().unwrap_or_default(),
            parts.next().unwrap_or_default(),
        ]
    }
}

fn is_valid_code(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split(WORD_SEPARATOR).collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|w| !w.is_empty() && w.bytes().all(|b| b.is_ascii_lowercase()))
}

impl fmt::Display for GeoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GeoCode {
    type Err = LandgrabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for GeoCode {
    type Error = LandgrabError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GeoCode> for String {
    fn from(code: GeoCode) -> Self {
        code.0
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// The rectangle named by a geocode.
///
/// The JSON shape mirrors the geocoding API's `convert-to-coordinates`
/// response, so a fetched body deserializes straight into a `GeoCell`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoCell {
    #[serde(default)]
    pub country: String,
    pub square: Square,
    #[serde(default)]
    pub nearest_place: String,
    pub coordinates: Coordinates,
    pub words: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub map: String,
}

/// Bounding rectangle of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Square {
    pub southwest: Coordinates,
    pub northeast: Coordinates,
}

impl GeoCell {
    pub fn southwest(&self) -> Coordinates {
        self.square.southwest
    }

    pub fn northeast(&self) -> Coordinates {
        self.square.northeast
    }

    pub fn centroid(&self) -> Coordinates {
        self.coordinates
    }

    /// Closed-interval containment on both axes.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        let sw = self.square.southwest;
        let ne = self.square.northeast;
        sw.lat <= lat && lat <= ne.lat && sw.lng <= lng && lng <= ne.lng
    }
}
