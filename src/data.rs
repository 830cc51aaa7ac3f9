use std::{fmt, str::FromStr};

use quick_xml::events::BytesStart;

use crate::errors::{Error, Result};
use crate::xml::{attribute, parse_value};

pub mod document;
pub mod element;
pub mod history;

pub use document::Document;
pub use element::{Element, Geometry, Member};
pub use history::History;

pub type OsmId = i64;

/// The three OSM primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }

    pub(crate) fn from_tag_name(name: &[u8]) -> Option<ElementKind> {
        match name {
            b"node" => Some(ElementKind::Node),
            b"way" => Some(ElementKind::Way),
            b"relation" => Some(ElementKind::Relation),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ElementKind::from_tag_name(s.as_bytes())
            .ok_or_else(|| Error::document_format(format!("Unknown element type '{s}'")))
    }
}

/// A lat/lon rectangle, used both for `<bounds>` metadata and to scope map requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        BoundingBox {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Build from corners given lon first, the order the OSM `bbox` parameter uses.
    pub fn from_lon_lat(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        BoundingBox::new(min_lat, min_lon, max_lat, max_lon)
    }

    pub fn to_min_max(&self) -> [f64; 4] {
        [self.min_lat, self.min_lon, self.max_lat, self.max_lon]
    }

    /// Area in square degrees, as compared against the server's `<area maximum>`.
    pub fn area(&self) -> f64 {
        (self.max_lat - self.min_lat) * (self.max_lon - self.min_lon)
    }

    pub fn is_valid(&self) -> bool {
        self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
            && (-90.0..=90.0).contains(&self.min_lat)
            && (-90.0..=90.0).contains(&self.max_lat)
            && (-180.0..=180.0).contains(&self.min_lon)
            && (-180.0..=180.0).contains(&self.max_lon)
    }

    pub fn to_query(&self) -> String {
        format!("{},{},{},{}", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }

    pub(crate) fn from_start(el: &BytesStart) -> Result<BoundingBox> {
        let corner = |name: &str| -> Result<f64> {
            let value = attribute(el, name.as_bytes())?
                .ok_or_else(|| Error::document_format(format!("bounds is missing {name}")))?;
            parse_value(name, &value)
        };
        Ok(BoundingBox {
            min_lat: corner("minlat")?,
            min_lon: corner("minlon")?,
            max_lat: corner("maxlat")?,
            max_lon: corner("maxlon")?,
        })
    }

    pub(crate) fn to_start(&self) -> BytesStart<'static> {
        let mut el = BytesStart::new("bounds");
        el.push_attribute(("minlat", self.min_lat.to_string().as_str()));
        el.push_attribute(("minlon", self.min_lon.to_string().as_str()));
        el.push_attribute(("maxlat", self.max_lat.to_string().as_str()));
        el.push_attribute(("maxlon", self.max_lon.to_string().as_str()));
        el
    }
}
