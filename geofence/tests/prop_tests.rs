use proptest::prelude::*;

use landgrab_geofence::{contains, MockOracle};

proptest! {
    /// Mock cells are a pure function of the code.
    #[test]
    fn mock_cell_is_pure(a in "[a-z]{1,10}", b in "[a-z]{1,10}", c in "[a-z]{1,10}") {
        let code = format!("{a}.{b}.{c}");
        prop_assert_eq!(MockOracle::cell_for(&code), MockOracle::cell_for(&code));
    }

    /// The centroid of every mock cell lies inside it.
    #[test]
    fn mock_centroid_is_contained(a in "[a-z]{1,10}", b in "[a-z]{1,10}", c in "[a-z]{1,10}") {
        let cell = MockOracle::cell_for(&format!("{a}.{b}.{c}"));
        let centre = cell.centroid();
        prop_assert!(contains(&cell, centre.lat, centre.lng));
        prop_assert!(cell.southwest().lat < centre.lat && centre.lat < cell.northeast().lat);
        prop_assert!(cell.southwest().lng < centre.lng && centre.lng < cell.northeast().lng);
    }

    /// One millidegree past any edge is outside.
    #[test]
    fn mock_cell_edges_are_tight(a in "[a-z]{1,10}", b in "[a-z]{1,10}", c in "[a-z]{1,10}") {
        let cell = MockOracle::cell_for(&format!("{a}.{b}.{c}"));
        let centre = cell.centroid();
        prop_assert!(!contains(&cell, cell.northeast().lat + 0.001, centre.lng));
        prop_assert!(!contains(&cell, cell.southwest().lat - 0.001, centre.lng));
        prop_assert!(!contains(&cell, centre.lat, cell.northeast().lng + 0.001));
        prop_assert!(!contains(&cell, centre.lat, cell.southwest().lng - 0.001));
    }
}
