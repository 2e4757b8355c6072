//! Deterministic offline oracle.
//!
//! Every code maps to a fixed pseudo-random coordinate through an
//! order-dependent string hash, so results are identical within and across
//! processes. Adjacent cells are synthetic labels and do not round-trip.

use async_trait::async_trait;
use landgrab_types::{Coordinates, GeoCell, Square};

use crate::error::GeofenceError;
use crate::oracle::GeofenceOracle;

/// Half the side of a mock cell, in degrees.
pub const MOCK_HALF_SIZE: f64 = 0.000003;

/// 32-bit `h = h * 31 + c` over UTF-16 code units.
fn code_hash(input: &str) -> i32 {
    input
        .encode_utf16()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(i32::from(c)))
}

/// Stable coordinate for an arbitrary string.
pub fn mock_coordinates(input: &str) -> Coordinates {
    let h = code_hash(input);
    let lat = f64::from((h % 18_000).abs()) / 100.0 - 90.0;
    let lng = f64::from(((h >> 16) % 36_000).abs()) / 100.0 - 180.0;
    Coordinates::new(lat, lng)
}

#[derive(Clone, Debug, Default)]
pub struct MockOracle;

impl MockOracle {
    pub fn new() -> Self {
        Self
    }

    /// Pure function of `code`.
    pub fn cell_for(code: &str) -> GeoCell {
        let centre = mock_coordinates(code);
        GeoCell {
            country: "US".to_string(),
            square: Square {
                southwest: Coordinates::new(centre.lat - MOCK_HALF_SIZE, centre.lng - MOCK_HALF_SIZE),
                northeast: Coordinates::new(centre.lat + MOCK_HALF_SIZE, centre.lng + MOCK_HALF_SIZE),
            },
            nearest_place: "Mock Location".to_string(),
            coordinates: centre,
            words: code.to_string(),
            language: "en".to_string(),
            map: format!("https://w3w.co/{}", code.replace('.', "-")),
        }
    }
}

#[async_trait]
impl GeofenceOracle for MockOracle {
    async fn words_to_cell(&self, code: &str) -> Result<GeoCell, GeofenceError> {
        Ok(Self::cell_for(code))
    }

    async fn coords_to_words(&self, lat: f64, lng: f64) -> Result<String, GeofenceError> {
        Ok(format!("mock.{lat:.6}.{lng:.6}").replace('.', "-"))
    }

    async fn adjacent_cells(&self, code: &str) -> Result<Vec<String>, GeofenceError> {
        Ok((1..=8).map(|i| format!("{code}-adjacent-{i}")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::contains;

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(code_hash(""), 0);
        assert_eq!(code_hash("a"), 97);
        assert_eq!(code_hash("ab"), 97 * 31 + 98);
        // Overflow wraps like a 32-bit integer.
        assert_eq!(code_hash("filled.count.soap"), {
            let mut h: i32 = 0;
            for c in "filled.count.soap".bytes() {
                h = h.wrapping_mul(31).wrapping_add(i32::from(c));
            }
            h
        });
    }

    #[test]
    fn coordinates_stay_in_range() {
        for code in ["filled.count.soap", "index.home.raft", "a.b.c", "zzzz.zzzz.zzzz"] {
            let c = mock_coordinates(code);
            assert!((-90.0..90.0).contains(&c.lat), "{code}: {}", c.lat);
            assert!((-180.0..180.0).contains(&c.lng), "{code}: {}", c.lng);
        }
    }

    #[tokio::test]
    async fn cell_is_deterministic_and_contains_centroid() {
        let oracle = MockOracle::new();
        let a = oracle.words_to_cell("filled.count.soap").await.unwrap();
        let b = oracle.words_to_cell("filled.count.soap").await.unwrap();
        assert_eq!(a, b);
        assert!(contains(&a, a.centroid().lat, a.centroid().lng));
        assert_eq!(a.country, "US");
        assert_eq!(a.map, "https://w3w.co/filled-count-soap");
    }

    #[tokio::test]
    async fn coords_to_words_replaces_every_dot() {
        let oracle = MockOracle::new();
        let words = oracle.coords_to_words(51.5074, -0.1278).await.unwrap();
        assert_eq!(words, "mock-51-507400--0-127800");
    }

    #[tokio::test]
    async fn adjacency_is_synthetic() {
        let oracle = MockOracle::new();
        let cells = oracle.adjacent_cells("filled.count.soap").await.unwrap();
        assert_eq!(cells.len(), 8);
        assert_eq!(cells[0], "filled.count.soap-adjacent-1");
        assert_eq!(cells[7], "filled.count.soap-adjacent-8");
    }

    #[tokio::test]
    async fn presence_check_uses_the_cell() {
        let oracle = MockOracle::new();
        let cell = MockOracle::cell_for("index.home.raft");
        let inside = oracle
            .is_user_at_location(cell.centroid().lat, cell.centroid().lng, "index.home.raft")
            .await
            .unwrap();
        let outside = oracle
            .is_user_at_location(cell.centroid().lat + 0.001, cell.centroid().lng, "index.home.raft")
            .await
            .unwrap();
        assert!(inside);
        assert!(!outside);
    }
}
