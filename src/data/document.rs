use std::collections::HashMap;

use log::{debug, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

use crate::config::API_VERSION;
use crate::data::{BoundingBox, Element, ElementKind, History, OsmId};
use crate::errors::{Error, Result};
use crate::search::{Criteria, SearchEngine};
use crate::xml::attribute;

type Key = (ElementKind, OsmId);

/// Everything read out of one OSM XML payload, before it is merged.
#[derive(Default)]
struct Payload {
    version: Option<String>,
    generator: Option<String>,
    bounds: Option<BoundingBox>,
    elements: Vec<Element>,
}

struct Parser {
    depth: usize,
    seen_root: bool,
    current: Option<Element>,
    payload: Payload,
}

impl Parser {
    fn new() -> Self {
        Parser {
            depth: 0,
            seen_root: false,
            current: None,
            payload: Payload::default(),
        }
    }

    fn open(&mut self, el: &BytesStart, empty: bool) -> Result<()> {
        let level = self.depth + 1;
        match level {
            1 => {
                if self.seen_root {
                    return Err(Error::document_format("Document has more than one root element"));
                }
                self.seen_root = true;
                self.payload.version = attribute(el, b"version")?;
                self.payload.generator = attribute(el, b"generator")?;
            },
            2 => {
                if let Some(kind) = ElementKind::from_tag_name(el.name().as_ref()) {
                    self.current = Some(Element::from_start(kind, el)?);
                } else if el.name().as_ref() == b"bounds" {
                    self.payload.bounds = Some(BoundingBox::from_start(el)?);
                }
            },
            3 => {
                if let Some(current) = self.current.as_mut() {
                    current.push_child(el)?;
                }
            },
            _ => (),
        }

        if empty {
            if level == 2 {
                self.finish_element();
            }
        } else {
            self.depth = level;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.depth == 2 {
            self.finish_element();
        }
        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| Error::document_format("Unexpected closing tag"))?;
        Ok(())
    }

    fn finish_element(&mut self) {
        if let Some(element) = self.current.take() {
            if element.id().is_some() {
                self.payload.elements.push(element);
            } else {
                warn!(kind = element.kind().as_str(); "Skipping element without id");
            }
        }
    }

    fn parse(mut self, xml: &str) -> Result<Payload> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event()? {
                Event::Eof => break,
                Event::Start(e) => self.open(&e, false)?,
                Event::Empty(e) => self.open(&e, true)?,
                Event::End(_e) => self.close()?,
                // Declarations, text, comments and the like carry no map data.
                _ => (),
            }
        }

        if !self.seen_root {
            return Err(Error::document_format("Document has no root element"));
        }
        if self.depth != 0 {
            return Err(Error::document_format("Unexpected end of document"));
        }
        Ok(self.payload)
    }
}

/// The working set of OSM data: elements keyed by (kind, id) in the order they were
/// first seen, plus optional bounds and the history of every versioned element loaded.
#[derive(Debug, Default, Clone)]
pub struct Document {
    version: Option<String>,
    generator: Option<String>,
    bounds: Option<BoundingBox>,
    elements: Vec<Element>,
    index: HashMap<Key, usize>,
    histories: HashMap<Key, History>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn parse(xml: &str) -> Result<Document> {
        let mut document = Document::new();
        document.load(xml)?;
        Ok(document)
    }

    /// Merge an OSM XML payload into this document.
    ///
    /// Elements already held under the same (kind, id) are replaced in place, whatever
    /// their version; elements the payload does not mention are kept. The payload is
    /// parsed completely before anything is merged, so a malformed payload leaves the
    /// document untouched.
    pub fn load(&mut self, xml: &str) -> Result<&mut Self> {
        let payload = Parser::new().parse(xml)?;
        debug!(elements = payload.elements.len(); "Merging payload into document");

        if payload.version.is_some() {
            self.version = payload.version;
        }
        if payload.generator.is_some() {
            self.generator = payload.generator;
        }
        if payload.bounds.is_some() {
            self.bounds = payload.bounds;
        }
        for element in payload.elements {
            self.insert(element)?;
        }
        Ok(self)
    }

    /// Add or replace an element. Elements without an id are ignored.
    pub fn insert(&mut self, element: Element) -> Result<()> {
        let Some(id) = element.id() else {
            return Ok(());
        };
        let key = (element.kind(), id);

        if element.version().is_some() {
            self.histories
                .entry(key)
                .or_insert_with(|| History::new(key.0, key.1))
                .insert(element.clone())?;
        }

        match self.index.get(&key).copied() {
            Some(position) => self.elements[position] = element,
            None => {
                self.index.insert(key, self.elements.len());
                self.elements.push(element);
            },
        }
        Ok(())
    }

    pub fn get(&self, kind: ElementKind, id: OsmId) -> Option<&Element> {
        self.index.get(&(kind, id)).map(|&position| &self.elements[position])
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn bounds(&self) -> Option<&BoundingBox> {
        self.bounds.as_ref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn generator(&self) -> Option<&str> {
        self.generator.as_deref()
    }

    pub fn history(&self, kind: ElementKind, id: OsmId) -> Option<&History> {
        self.histories.get(&(kind, id))
    }

    pub fn take_history(&mut self, kind: ElementKind, id: OsmId) -> Option<History> {
        self.histories.remove(&(kind, id))
    }

    pub fn search(&self, criteria: &Criteria) -> Vec<&Element> {
        SearchEngine::new(self).search(criteria)
    }

    pub fn serialize(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("osm");
        root.push_attribute(("version", self.version.as_deref().unwrap_or(API_VERSION)));
        if let Some(generator) = &self.generator {
            root.push_attribute(("generator", generator.as_str()));
        }
        writer.write_event(Event::Start(root))?;
        if let Some(bounds) = &self.bounds {
            writer.write_event(Event::Empty(bounds.to_start()))?;
        }
        for element in &self.elements {
            element.write_xml(&mut writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("osm")))?;

        String::from_utf8(writer.into_inner()).map_err(|err| err.utf8_error().into())
    }
}
