use std::{fmt, str::FromStr};

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::errors::{Error, ErrorKind, Result};
use crate::xml::parse_attribute;

pub(crate) const CAPABILITIES_PROBLEM: &str = "Problem checking server capabilities";

/// Operational state the server reports for one of its services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Online,
    Readonly,
    Offline,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Readonly => "readonly",
            Status::Offline => "offline",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "online" => Ok(Status::Online),
            "readonly" => Ok(Status::Readonly),
            "offline" => Ok(Status::Offline),
            _ => Err(Error::document_format(format!("Unknown status '{s}'"))),
        }
    }
}

/// Server policy from `/api/capabilities`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Capabilities {
    pub min_version: f64,
    pub max_version: f64,
    pub max_area: Option<f64>,
    pub tracepoints_per_page: Option<u64>,
    pub max_nodes: Option<u64>,
    pub max_elements: Option<u64>,
    pub timeout: Option<u64>,
    pub database_status: Option<Status>,
    pub api_status: Option<Status>,
    pub gpx_status: Option<Status>,
}

impl Capabilities {
    /// Parse a capabilities response.
    ///
    /// Anything wrong with the payload, including a missing `<version>` block, is
    /// reported as a [`ErrorKind::Capabilities`] error. A missing `<status>` block
    /// just leaves the statuses unset.
    pub fn parse(xml: &str) -> Result<Capabilities> {
        Self::parse_inner(xml).map_err(|err| {
            warn!(err = err.message.as_str(); "Could not read capabilities");
            Error::new(ErrorKind::Capabilities, CAPABILITIES_PROBLEM)
        })
    }

    fn parse_inner(xml: &str) -> Result<Capabilities> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut capabilities = Capabilities::default();
        let mut versions: Option<(f64, f64)> = None;

        loop {
            match reader.read_event()? {
                Event::Eof => break,
                Event::Start(e) | Event::Empty(e) => {
                    if let Some(found) = capabilities.read_limit(&e)? {
                        versions = Some(found);
                    }
                },
                _ => (),
            }
        }

        let (min_version, max_version) =
            versions.ok_or_else(|| Error::document_format("No version block"))?;
        capabilities.min_version = min_version;
        capabilities.max_version = max_version;
        Ok(capabilities)
    }

    /// Record whatever `el` says. Returns the version range when `el` is `<version>`.
    fn read_limit(&mut self, el: &BytesStart) -> Result<Option<(f64, f64)>> {
        match el.name().as_ref() {
            b"version" => {
                let min = parse_attribute(el, "minimum")?;
                let max = parse_attribute(el, "maximum")?;
                match (min, max) {
                    (Some(min), Some(max)) => return Ok(Some((min, max))),
                    _ => return Err(Error::document_format("Incomplete version block")),
                }
            },
            b"area" => self.max_area = parse_attribute(el, "maximum")?,
            b"tracepoints" => self.tracepoints_per_page = parse_attribute(el, "per_page")?,
            b"waynodes" => self.max_nodes = parse_attribute(el, "maximum")?,
            b"changesets" => self.max_elements = parse_attribute(el, "maximum_elements")?,
            b"timeout" => self.timeout = parse_attribute(el, "seconds")?,
            b"status" => {
                self.database_status = parse_attribute(el, "database")?;
                self.api_status = parse_attribute(el, "api")?;
                self.gpx_status = parse_attribute(el, "gpx")?;
            },
            _ => (),
        }
        Ok(None)
    }

    /// Check that the server serves `api_version`.
    pub fn validate(&self, api_version: &str) -> Result<()> {
        let version: f64 = api_version.trim().parse().map_err(|_| {
            Error::invalid_config(format!("API version '{api_version}' is not numeric"))
        })?;
        if version < self.min_version || version > self.max_version {
            return Err(Error::new(
                ErrorKind::UnsupportedVersion,
                format!("Specified API Version {api_version} not supported."),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const FULL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="OpenStreetMap server">
  <api>
    <version minimum="0.5" maximum="0.6"/>
    <area maximum="0.25"/>
    <tracepoints per_page="5000"/>
    <waynodes maximum="2000"/>
    <changesets maximum_elements="50000"/>
    <timeout seconds="300"/>
    <status database="online" api="readonly" gpx="offline"/>
  </api>
</osm>"#;

    #[test]
    fn every_limit_is_read() {
        let capabilities = Capabilities::parse(FULL).unwrap();
        assert_eq!(capabilities.min_version, 0.5);
        assert_eq!(capabilities.max_version, 0.6);
        assert_eq!(capabilities.max_area, Some(0.25));
        assert_eq!(capabilities.tracepoints_per_page, Some(5000));
        assert_eq!(capabilities.max_nodes, Some(2000));
        assert_eq!(capabilities.max_elements, Some(50000));
        assert_eq!(capabilities.timeout, Some(300));
        assert_eq!(capabilities.database_status, Some(Status::Online));
        assert_eq!(capabilities.api_status, Some(Status::Readonly));
        assert_eq!(capabilities.gpx_status, Some(Status::Offline));
    }

    #[test]
    fn missing_status_block_is_not_an_error() {
        let capabilities = Capabilities::parse(
            r#"<osm><api><version minimum="0.6" maximum="0.6"/></api></osm>"#,
        )
        .unwrap();
        assert_eq!(capabilities.database_status, None);
        assert_eq!(capabilities.api_status, None);
        assert_eq!(capabilities.gpx_status, None);
        assert_eq!(capabilities.max_area, None);
    }

    #[rstest]
    #[case::empty("")]
    #[case::no_version(r#"<osm><api><area maximum="0.25"/></api></osm>"#)]
    #[case::half_version(r#"<osm><api><version minimum="0.6"/></api></osm>"#)]
    #[case::bad_number(r#"<osm><api><version minimum="0.6" maximum="zero"/></api></osm>"#)]
    #[case::bad_status(r#"<osm><api><version minimum="0.6" maximum="0.6"/><status api="sleepy"/></api></osm>"#)]
    #[case::broken_xml("<osm><api></osm>")]
    fn invalid_payloads_are_capabilities_errors(#[case] xml: &str) {
        let err = Capabilities::parse(xml).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Capabilities);
        assert_eq!(err.message, "Problem checking server capabilities");
    }

    #[rstest]
    #[case(0.5, 0.6, true)]
    #[case(0.6, 0.6, true)]
    #[case(0.5, 0.5, false)]
    #[case(0.7, 0.8, false)]
    fn version_range_is_enforced(#[case] min: f64, #[case] max: f64, #[case] supported: bool) {
        let capabilities = Capabilities {
            min_version: min,
            max_version: max,
            ..Capabilities::default()
        };
        match capabilities.validate("0.6") {
            Ok(()) => assert!(supported),
            Err(err) => {
                assert!(!supported);
                assert_eq!(err.kind, ErrorKind::UnsupportedVersion);
                assert_eq!(err.message, "Specified API Version 0.6 not supported.");
            },
        }
    }
}
