use std::{fs, path::Path};

use log::info;

use crate::capabilities::{Capabilities, CAPABILITIES_PROBLEM};
use crate::config::Config;
use crate::data::{BoundingBox, Document, Element, ElementKind, History, OsmId};
use crate::errors::{Error, ErrorKind, Result};
use crate::nominatim::{Coords, Nominatim, SearchResults};
use crate::search::Criteria;
use crate::transport::{HttpTransport, Request, Transport};

/// One session against an OSM API server.
///
/// Construction fetches and checks the server's capabilities; a server that is
/// unreachable, answers with something unreadable, or does not serve the configured
/// API version fails construction. Data fetched afterwards accumulates in a single
/// [`Document`] that [`OsmClient::search`] runs over.
pub struct OsmClient {
    config: Config,
    transport: Box<dyn Transport>,
    capabilities: Capabilities,
    document: Document,
    last_xml: Option<String>,
    nominatim: Nominatim,
}

impl OsmClient {
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout(), &config.user_agent);
        OsmClient::with_transport(config, Box::new(transport))
    }

    pub fn with_transport(config: Config, mut transport: Box<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let capabilities = Self::negotiate(&config, transport.as_mut())?;

        let mut nominatim = Nominatim::new();
        nominatim.set_server(&config.nominatim_server)?;

        Ok(OsmClient {
            config,
            transport,
            capabilities,
            document: Document::new(),
            last_xml: None,
            nominatim,
        })
    }

    fn negotiate(config: &Config, transport: &mut dyn Transport) -> Result<Capabilities> {
        let url = format!("{}/api/capabilities", config.server.trim_end_matches('/'));
        let response = transport.send(&Request::get(url))?;
        let problem = || Error::new(ErrorKind::Capabilities, CAPABILITIES_PROBLEM);
        if !response.is_success() {
            return Err(problem());
        }

        let capabilities = Capabilities::parse(response.text().map_err(|_| problem())?)?;
        capabilities.validate(&config.api_version)?;
        info!(
            server = config.server.as_str(),
            min_version = capabilities.min_version,
            max_version = capabilities.max_version;
            "Negotiated server capabilities"
        );
        Ok(capabilities)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn min_version(&self) -> f64 {
        self.capabilities.min_version
    }

    pub fn max_version(&self) -> f64 {
        self.capabilities.max_version
    }

    /// Timeout in seconds the server advertises, if any.
    pub fn timeout(&self) -> Option<u64> {
        self.capabilities.timeout
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/{}/{}",
            self.config.server.trim_end_matches('/'),
            self.config.api_version,
            path
        )
    }

    fn fetch(&mut self, request: Request) -> Result<String> {
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(Error::transport(format!(
                "Request to {} returned status {}",
                request.url, response.status
            )));
        }
        Ok(response.text()?.to_string())
    }

    /// Fetch everything inside `bbox`, merge it into the document and return the raw XML.
    pub fn get(&mut self, bbox: &BoundingBox) -> Result<String> {
        if !bbox.is_valid() {
            return Err(Error::invalid_config(format!("Invalid bounding box {}", bbox.to_query())));
        }
        if let Some(max_area) = self.capabilities.max_area {
            if bbox.area() > max_area {
                return Err(Error::new(
                    ErrorKind::LimitExceeded,
                    format!("Requested area {} exceeds server maximum of {max_area}", bbox.area()),
                ));
            }
        }

        let request = Request::get(self.api_url("map")).param("bbox", bbox.to_query());
        let xml = self.fetch(request)?;
        self.load_xml(&xml)?;
        info!(bbox = bbox.to_query().as_str(), elements = self.document.len(); "Loaded map area");
        Ok(xml)
    }

    /// The most recent payload merged into the document.
    pub fn get_xml(&self) -> Option<&str> {
        self.last_xml.as_deref()
    }

    pub fn load_xml(&mut self, xml: &str) -> Result<&Document> {
        self.document.load(xml)?;
        self.last_xml = Some(xml.to_string());
        Ok(&self.document)
    }

    pub fn load_xml_file(&mut self, path: impl AsRef<Path>) -> Result<&Document> {
        let xml = fs::read_to_string(path)?;
        self.load_xml(&xml)
    }

    pub fn get_element(&mut self, kind: ElementKind, id: OsmId) -> Result<Element> {
        let request = Request::get(self.api_url(&format!("{kind}/{id}")));
        let xml = self.fetch(request)?;
        self.load_xml(&xml)?;
        self.document
            .get(kind, id)
            .cloned()
            .ok_or_else(|| Error::document_format(format!("Response did not contain {kind} {id}")))
    }

    pub fn get_node(&mut self, id: OsmId) -> Result<Element> {
        self.get_element(ElementKind::Node, id)
    }

    pub fn get_way(&mut self, id: OsmId) -> Result<Element> {
        self.get_element(ElementKind::Way, id)
    }

    pub fn get_relation(&mut self, id: OsmId) -> Result<Element> {
        self.get_element(ElementKind::Relation, id)
    }

    /// Every version of an element. The working document is left as it is.
    pub fn get_history(&mut self, kind: ElementKind, id: OsmId) -> Result<History> {
        let request = Request::get(self.api_url(&format!("{kind}/{id}/history")));
        let xml = self.fetch(request)?;
        let history = Document::parse(&xml)?
            .take_history(kind, id)
            .unwrap_or_else(|| History::new(kind, id));
        info!(kind = kind.as_str(), id = id, versions = history.len(); "Fetched history");
        Ok(history)
    }

    pub fn search(&self, criteria: &Criteria) -> Vec<&Element> {
        self.document.search(criteria)
    }

    pub fn nominatim(&self) -> &Nominatim {
        &self.nominatim
    }

    pub fn nominatim_mut(&mut self) -> &mut Nominatim {
        &mut self.nominatim
    }

    pub fn nominatim_search(&mut self, query: &str, limit: Option<u32>) -> Result<SearchResults> {
        self.nominatim.search(self.transport.as_mut(), query, limit)
    }

    pub fn get_coords_of_place(&mut self, place: &str) -> Result<Coords> {
        self.nominatim.get_coords_of_place(self.transport.as_mut(), place)
    }
}
