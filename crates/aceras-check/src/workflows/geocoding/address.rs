use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Address components keyed the way OpenStreetMap-style geocoders return them.
pub type AddressParts = BTreeMap<String, String>;

const STREET_KEYS: [&str; 6] = ["road", "pedestrian", "path", "cycleway", "footway", "highway"];
const ROAD_NAME_KEYS: [&str; 3] = ["road", "pedestrian", "path"];
const LOCALITY_KEYS: [&str; 6] = ["neighbourhood", "suburb", "village", "town", "city", "state"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

fn first<'a>(address: &'a AddressParts, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| address.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Short label such as `"Calle 50 12, Obarrio"`: street and house number, then locality.
/// A locality equal to the first line is not repeated. Falls back to the geocoder's
/// display name when no usable components exist.
pub fn format_address(display_name: Option<&str>, address: Option<&AddressParts>) -> String {
    let fallback = || display_name.unwrap_or_default().to_string();
    let Some(address) = address else {
        return fallback();
    };

    let line_one = match first(address, &STREET_KEYS) {
        Some(street) => match first(address, &["house_number"]) {
            Some(house) => format!("{street} {house}"),
            None => street.to_string(),
        },
        None => first(address, &["neighbourhood", "suburb"])
            .unwrap_or_default()
            .to_string(),
    };
    let locality = first(address, &LOCALITY_KEYS).unwrap_or_default();

    match (line_one.is_empty(), locality.is_empty()) {
        (true, true) => fallback(),
        (false, true) => line_one,
        (true, false) => locality.to_string(),
        (false, false) if line_one == locality => line_one,
        (false, false) => format!("{line_one}, {locality}"),
    }
}

pub fn road_name(address: Option<&AddressParts>) -> Option<String> {
    address
        .and_then(|address| first(address, &ROAD_NAME_KEYS))
        .map(str::to_string)
}

/// Parse a `[south, north, west, east]` box of numeric strings. Any unparsable corner
/// discards the whole box.
pub fn parse_bounding_box<S: AsRef<str>>(corners: &[S]) -> Option<BoundingBox> {
    let [south, north, west, east] = corners else {
        return None;
    };
    let parse = |value: &S| value.as_ref().trim().parse::<f64>().ok().filter(|v| v.is_finite());
    Some(BoundingBox {
        south: parse(south)?,
        north: parse(north)?,
        west: parse(west)?,
        east: parse(east)?,
    })
}

/// Cache key for free-text searches.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(pairs: &[(&str, &str)]) -> AddressParts {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn formats_street_house_and_locality() {
        let address = parts(&[
            ("road", "Calle 50"),
            ("house_number", "12"),
            ("suburb", "Obarrio"),
            ("city", "Panamá"),
        ]);
        assert_eq!(
            format_address(Some("long display name"), Some(&address)),
            "Calle 50 12, Obarrio"
        );
    }

    #[test]
    fn falls_back_to_neighbourhood_without_street() {
        let address = parts(&[("neighbourhood", "Bella Vista"), ("city", "Panamá")]);
        assert_eq!(format_address(None, Some(&address)), "Bella Vista");

        let address = parts(&[("footway", "Cinta Costera")]);
        assert_eq!(format_address(None, Some(&address)), "Cinta Costera");
    }

    #[test]
    fn falls_back_to_display_name() {
        assert_eq!(format_address(Some("Panamá"), None), "Panamá");
        assert_eq!(format_address(Some("Panamá"), Some(&parts(&[]))), "Panamá");
        assert_eq!(format_address(None, None), "");
    }

    #[test]
    fn road_name_prefers_road_over_paths() {
        let address = parts(&[("path", "Sendero"), ("road", "Vía Argentina")]);
        assert_eq!(road_name(Some(&address)).as_deref(), Some("Vía Argentina"));
        assert_eq!(road_name(Some(&parts(&[("footway", "x")]))), None);
    }

    #[test]
    fn parses_bounding_boxes() {
        let bbox = parse_bounding_box(&["8.97", "8.99", "-79.53", "-79.51"]).expect("bbox");
        assert_eq!(bbox.south, 8.97);
        assert_eq!(bbox.east, -79.51);

        assert_eq!(parse_bounding_box(&["8.97", "x", "-79.53", "-79.51"]), None);
        assert_eq!(parse_bounding_box(&["8.97", "8.99"]), None);
    }

    #[test]
    fn normalizes_queries() {
        assert_eq!(normalize_query("  Vía ESPAÑA "), "vía españa");
    }
}
