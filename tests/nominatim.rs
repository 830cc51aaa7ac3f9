//! Geocoding against recorded Nominatim responses.

use osm_services::{ErrorKind, Format, MockTransport, Nominatim, SearchResults};

const LIMERICK: &str = include_str!("fixtures/nominatim_search_limerick.xml");
const NEEENAAA: &str = include_str!("fixtures/nominatim_search_neeenaaa.xml");
const SEARCH_JSON: &str = include_str!("fixtures/search.json");
const SEARCH_HTML: &str = include_str!("fixtures/search.html");

fn replaying(body: &str) -> MockTransport {
    let mock = MockTransport::new();
    mock.add_body(body);
    mock
}

#[test]
fn coords_of_place() {
    let mock = replaying(LIMERICK);
    let coords = Nominatim::new()
        .get_coords_of_place(&mut mock.clone(), "Limerick, Ireland")
        .unwrap();
    assert_eq!(coords.lat, "52.6612577");
    assert_eq!(coords.lon, "-8.6302084");

    let request = &mock.requests()[0];
    assert_eq!(request.param_value("q"), Some("Limerick, Ireland"));
    assert_eq!(request.param_value("limit"), Some("1"));
}

#[test]
fn coords_of_unknown_place() {
    let err = Nominatim::new()
        .get_coords_of_place(&mut replaying(NEEENAAA), "Neeenaaa, Ireland")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::GeocodeNotFound);
    assert_eq!(err.message, "Could not get coords for Neeenaaa, Ireland");
}

#[test]
fn coords_are_always_requested_as_xml() {
    let mock = replaying(LIMERICK);
    let mut nominatim = Nominatim::new();
    nominatim.set_format("json").unwrap();

    nominatim
        .get_coords_of_place(&mut mock.clone(), "Limerick, Ireland")
        .unwrap();
    assert_eq!(mock.requests()[0].param_value("format"), Some("xml"));
    assert_eq!(nominatim.format(), Format::Json);
}

#[test]
fn json_search() {
    let mut nominatim = Nominatim::new();
    nominatim.set_format("json").unwrap();
    let results = nominatim
        .search(&mut replaying(SEARCH_JSON), "Limerick, Ireland", None)
        .unwrap();

    let place = &results.places()[0];
    assert_eq!(place.class.as_deref(), Some("place"));
    assert_eq!(place.kind.as_deref(), Some("city"));
    assert_eq!(place.osm_type.as_deref(), Some("node"));
    assert_eq!(place.boundingbox.len(), 4);
}

#[test]
fn xml_search() {
    let results = Nominatim::new()
        .search(&mut replaying(LIMERICK), "Limerick, Ireland", None)
        .unwrap();

    let place = &results.places()[0];
    assert_eq!(place.class.as_deref(), Some("place"));
    assert_eq!(place.kind.as_deref(), Some("city"));
    assert_eq!(place.osm_id.as_deref(), Some("314705734"));
    assert_eq!(place.importance, Some(0.71));
    assert_eq!(
        place.display_name.as_deref(),
        Some("Limerick, County Limerick, Munster, Ireland")
    );
}

#[test]
fn html_search() {
    let mut nominatim = Nominatim::new();
    nominatim.set_format("html").unwrap();
    let results = nominatim
        .search(&mut replaying(SEARCH_HTML), "Limerick, Ireland", None)
        .unwrap();

    match results {
        SearchResults::Html(html) => {
            assert!(!html.body.is_empty());
            assert_eq!(html.names.len(), 2);
            assert_eq!(html.names[0], "Limerick, County Limerick, Munster, Ireland");
        },
        SearchResults::Places(_) => panic!("expected html results"),
    }
}

#[test]
fn garbled_json_is_a_format_error() {
    let mut nominatim = Nominatim::new();
    nominatim.set_format("json").unwrap();
    let err = nominatim
        .search(&mut replaying("{not json"), "Limerick", None)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DocumentFormat);
}
