//! The oracle contract shared by both implementations.

use async_trait::async_trait;
use landgrab_types::{Coordinates, GeoCell};

use crate::error::GeofenceError;

/// Angular step, in degrees, between a cell's centroid and the probe point
/// used to find each neighbour.
pub const ADJACENT_OFFSET: f64 = 0.00003;

/// Closed-interval containment: true iff `southwest <= (lat, lng) <= northeast`
/// on both axes.
pub fn contains(cell: &GeoCell, lat: f64, lng: f64) -> bool {
    cell.contains(lat, lng)
}

/// The eight probe points around `centre`, in the order N, NE, E, SE, S, SW, W, NW.
pub fn neighbour_points(centre: Coordinates) -> [Coordinates; 8] {
    let d = ADJACENT_OFFSET;
    [(d, 0.0), (d, d), (0.0, d), (-d, d), (-d, 0.0), (-d, -d), (0.0, -d), (d, -d)]
        .map(|(dlat, dlng)| Coordinates::new(centre.lat + dlat, centre.lng + dlng))
}

#[async_trait]
pub trait GeofenceOracle: Send + Sync {
    /// Resolve a geocode to its cell.
    async fn words_to_cell(&self, code: &str) -> Result<GeoCell, GeofenceError>;

    /// Resolve a coordinate to the geocode of the cell containing it.
    async fn coords_to_words(&self, lat: f64, lng: f64) -> Result<String, GeofenceError>;

    /// The eight cells surrounding `code`, in the order N, NE, E, SE, S, SW, W, NW.
    async fn adjacent_cells(&self, code: &str) -> Result<Vec<String>, GeofenceError>;

    /// Whether `(lat, lng)` lies inside the cell named by `code`.
    async fn is_user_at_location(
        &self,
        lat: f64,
        lng: f64,
        code: &str,
    ) -> Result<bool, GeofenceError> {
        let cell = self.words_to_cell(code).await?;
        Ok(contains(&cell, lat, lng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_are_in_compass_order() {
        let points = neighbour_points(Coordinates::new(10.0, 20.0));
        let north = points[0];
        let east = points[2];
        let south = points[4];
        let northwest = points[7];
        assert!(north.lat > 10.0 && north.lng == 20.0);
        assert!(east.lat == 10.0 && east.lng > 20.0);
        assert!(south.lat < 10.0 && south.lng == 20.0);
        assert!(northwest.lat > 10.0 && northwest.lng < 20.0);
    }
}
