use proptest::prelude::*;

use landgrab_types::{Address, Coordinates, GeoCell, GeoCode, RequestId, Square, TokenId};

fn cell(sw_lat: f64, sw_lng: f64, height: f64, width: f64) -> GeoCell {
    GeoCell {
        country: String::new(),
        square: Square {
            southwest: Coordinates::new(sw_lat, sw_lng),
            northeast: Coordinates::new(sw_lat + height, sw_lng + width),
        },
        nearest_place: String::new(),
        coordinates: Coordinates::new(sw_lat + height / 2.0, sw_lng + width / 2.0),
        words: "a.b.c".into(),
        language: String::new(),
        map: String::new(),
    }
}

proptest! {
    /// Any three lowercase words joined by dots form a valid geocode.
    #[test]
    fn lowercase_triples_parse(a in "[a-z]{1,12}", b in "[a-z]{1,12}", c in "[a-z]{1,12}") {
        let raw = format!("{a}.{b}.{c}");
        let code = GeoCode::parse(&raw).unwrap();
        prop_assert_eq!(code.as_str(), raw.as_str());
    }

    /// A code containing anything outside [a-z.] is rejected.
    #[test]
    fn foreign_characters_are_rejected(
        a in "[a-z]{1,8}",
        bad in "[A-Z0-9_ -]",
        b in "[a-z]{1,8}",
    ) {
        let raw = format!("{a}{bad}.{b}.{b}");
        prop_assert!(GeoCode::parse(&raw).is_err());
    }

    /// The wrong number of words is rejected.
    #[test]
    fn word_count_must_be_three(words in prop::collection::vec("[a-z]{1,6}", 0..7usize)) {
        prop_assume!(words.len() != 3);
        prop_assert!(GeoCode::parse(&words.join(".")).is_err());
    }

    /// The centroid of a cell is contained in it.
    #[test]
    fn centroid_is_contained(
        lat in -89.0f64..89.0,
        lng in -179.0f64..179.0,
        h in 0.000001f64..0.01,
        w in 0.000001f64..0.01,
    ) {
        let c = cell(lat, lng, h, w);
        prop_assert!(c.contains(c.centroid().lat, c.centroid().lng));
    }

    /// Corners are contained; points just outside any edge are not.
    #[test]
    fn boundaries_are_closed(
        lat in -89.0f64..89.0,
        lng in -179.0f64..179.0,
        h in 0.0001f64..0.01,
        w in 0.0001f64..0.01,
    ) {
        let c = cell(lat, lng, h, w);
        let sw = c.southwest();
        let ne = c.northeast();
        let eps = 0.00001;
        prop_assert!(c.contains(sw.lat, sw.lng));
        prop_assert!(c.contains(ne.lat, ne.lng));
        prop_assert!(!c.contains(sw.lat - eps, c.centroid().lng));
        prop_assert!(!c.contains(ne.lat + eps, c.centroid().lng));
        prop_assert!(!c.contains(c.centroid().lat, sw.lng - eps));
        prop_assert!(!c.contains(c.centroid().lat, ne.lng + eps));
    }

    /// Address display parses back to the same address.
    #[test]
    fn address_display_parses_back(bytes in prop::array::uniform20(0u8..)) {
        let a = Address::new(bytes);
        prop_assert_eq!(Address::parse(&a.to_string()).unwrap(), a);
        prop_assert_eq!(Address::parse(&a.to_string().to_uppercase().replacen("0X", "0x", 1)).unwrap(), a);
    }

    /// Request ids display as 0x + 64 hex digits and parse back.
    #[test]
    fn request_id_display_parses_back(bytes in prop::array::uniform32(0u8..)) {
        let id = RequestId::new(bytes);
        let shown = id.to_string();
        prop_assert_eq!(shown.len(), 66);
        prop_assert_eq!(RequestId::parse(&shown).unwrap(), id);
    }

    /// Token ids survive the ABI word encoding.
    #[test]
    fn token_id_word_encoding(value in any::<u128>()) {
        let id = TokenId::new(value);
        prop_assert_eq!(TokenId::from_word(&id.to_word()).unwrap(), id);
    }
}
