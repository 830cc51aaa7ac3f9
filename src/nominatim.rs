use std::{fmt, str::FromStr, sync::LazyLock};

use log::info;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::config::is_http_url;
use crate::errors::{Error, ErrorKind, Result};
use crate::transport::{Request, Transport};
use crate::xml::{attribute, parse_attribute};

pub const NOMINATIM_SERVER: &str = "http://nominatim.openstreetmap.org/";
pub const MAPQUEST_SERVER: &str = "http://open.mapquestapi.com/nominatim/v1/";

/// Result names in Nominatim's HTML results page.
static HTML_NAME: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#"<span class=['"]name['"]>([^<]*)</span>"#));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Json,
    Xml,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "html" => Ok(Format::Html),
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            _ => Err(Error::invalid_config(format!("Unrecognised format ({s})"))),
        }
    }
}

/// Map a server alias to its URL, or check that `server` is a usable URL.
pub fn resolve_server(server: &str) -> Result<String> {
    match server {
        "nominatim" => Ok(NOMINATIM_SERVER.to_string()),
        "mapquest" => Ok(MAPQUEST_SERVER.to_string()),
        _ if is_http_url(server) => Ok(server.to_string()),
        _ => Err(Error::invalid_config("Server endpoint invalid")),
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

/// One search hit.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Place {
    #[serde(default, deserialize_with = "string_or_number")]
    pub place_id: Option<String>,
    #[serde(default)]
    pub osm_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub osm_id: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub boundingbox: Vec<String>,
}

impl Place {
    fn from_start(el: &BytesStart) -> Result<Place> {
        let required = |name: &str| -> Result<String> {
            attribute(el, name.as_bytes())?
                .ok_or_else(|| Error::document_format(format!("place is missing {name}")))
        };
        Ok(Place {
            place_id: attribute(el, b"place_id")?,
            osm_type: attribute(el, b"osm_type")?,
            osm_id: attribute(el, b"osm_id")?,
            class: attribute(el, b"class")?,
            kind: attribute(el, b"type")?,
            lat: required("lat")?,
            lon: required("lon")?,
            display_name: attribute(el, b"display_name")?,
            importance: parse_attribute(el, "importance")?,
            boundingbox: attribute(el, b"boundingbox")?
                .map(|bbox| bbox.split(',').map(|part| part.trim().to_string()).collect())
                .unwrap_or_default(),
        })
    }
}

/// An HTML results page, kept whole, with whatever result names could be picked out.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlResults {
    pub body: String,
    pub names: Vec<String>,
}

impl HtmlResults {
    fn parse(body: &str) -> Result<HtmlResults> {
        let re = HTML_NAME
            .as_ref()
            .map_err(|err| Error::document_format(err.to_string()))?;
        let names = re
            .captures_iter(body)
            .filter_map(|captures| captures.get(1))
            .map(|name| {
                unescape(name.as_str().trim())
                    .map(|name| name.into_owned())
                    .unwrap_or_else(|_| name.as_str().trim().to_string())
            })
            .collect();
        Ok(HtmlResults {
            body: body.to_string(),
            names,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResults {
    Places(Vec<Place>),
    Html(HtmlResults),
}

impl SearchResults {
    /// Structured hits. Always empty for HTML results.
    pub fn places(&self) -> &[Place] {
        match self {
            SearchResults::Places(places) => places,
            SearchResults::Html(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coords {
    pub lat: String,
    pub lon: String,
}

/// Nominatim geocoder settings plus the request/response mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Nominatim {
    format: Format,
    limit: u32,
    server: String,
}

impl Default for Nominatim {
    fn default() -> Self {
        Nominatim {
            format: Format::Xml,
            limit: 1,
            server: NOMINATIM_SERVER.to_string(),
        }
    }
}

impl Nominatim {
    pub fn new() -> Self {
        Nominatim::default()
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn set_format(&mut self, format: &str) -> Result<&mut Self> {
        self.format = format.parse()?;
        Ok(self)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn set_limit(&mut self, limit: u32) -> Result<&mut Self> {
        if limit == 0 {
            return Err(Error::invalid_config("Limit must be a positive value"));
        }
        self.limit = limit;
        Ok(self)
    }

    /// Like [`Nominatim::set_limit`], for a limit that arrives as text.
    pub fn set_limit_str(&mut self, limit: &str) -> Result<&mut Self> {
        let limit = limit
            .trim()
            .parse()
            .map_err(|_| Error::invalid_config("Limit must be a numeric value"))?;
        self.set_limit(limit)
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn set_server(&mut self, server: &str) -> Result<&mut Self> {
        self.server = resolve_server(server)?;
        Ok(self)
    }

    fn search_url(&self) -> String {
        if self.server.ends_with('/') {
            format!("{}search", self.server)
        } else {
            format!("{}/search", self.server)
        }
    }

    /// Search in the configured format, returning at most `limit` hits, or the
    /// configured limit when `limit` is `None`.
    pub fn search(
        &self,
        transport: &mut dyn Transport,
        query: &str,
        limit: Option<u32>,
    ) -> Result<SearchResults> {
        let limit = match limit {
            Some(0) => return Err(Error::invalid_config("Limit must be a positive value")),
            Some(limit) => limit,
            None => self.limit,
        };
        self.fetch(transport, query, limit, self.format)
    }

    fn fetch(&self, transport: &mut dyn Transport, query: &str, limit: u32, format: Format) -> Result<SearchResults> {
        let request = Request::get(self.search_url())
            .param("q", query)
            .param("format", format.as_str())
            .param("limit", limit.to_string());
        info!(query = query, format = format.as_str(), limit = limit; "Searching Nominatim");

        let response = transport.send(&request)?;
        if !response.is_success() {
            return Err(Error::transport(format!(
                "Nominatim search returned status {}",
                response.status
            )));
        }
        let body = response.text()?;

        let results = match format {
            Format::Json => SearchResults::Places(serde_json::from_str(body)?),
            Format::Xml => SearchResults::Places(parse_xml_places(body)?),
            Format::Html => SearchResults::Html(HtmlResults::parse(body)?),
        };
        Ok(results)
    }

    /// Coordinates of the best match for `place`, always asked for as XML.
    pub fn get_coords_of_place(&self, transport: &mut dyn Transport, place: &str) -> Result<Coords> {
        let results = self.fetch(transport, place, 1, Format::Xml)?;
        results
            .places()
            .first()
            .map(|found| Coords {
                lat: found.lat.clone(),
                lon: found.lon.clone(),
            })
            .ok_or_else(|| {
                Error::new(ErrorKind::GeocodeNotFound, format!("Could not get coords for {place}"))
            })
    }
}

fn parse_xml_places(xml: &str) -> Result<Vec<Place>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut places = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                if e.name().as_ref() == b"place" {
                    places.push(Place::from_start(&e)?);
                }
            },
            _ => (),
        }
    }
    Ok(places)
}
