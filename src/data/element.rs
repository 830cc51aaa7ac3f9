use std::{collections::BTreeMap, fmt, io::Write};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::data::{ElementKind, OsmId};
use crate::errors::{Error, Result};
use crate::xml::{attribute, parse_attribute, parse_value};

/// A member of a relation, in the order the relation lists it.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub kind: ElementKind,
    pub reference: OsmId,
    pub role: String,
}

impl Member {
    pub fn new(kind: ElementKind, reference: OsmId, role: &str) -> Self {
        Member {
            kind,
            reference,
            role: role.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Node { lat: Option<f64>, lon: Option<f64> },
    Way { node_refs: Vec<OsmId> },
    Relation { members: Vec<Member> },
}

impl Geometry {
    fn empty(kind: ElementKind) -> Geometry {
        match kind {
            ElementKind::Node => Geometry::Node { lat: None, lon: None },
            ElementKind::Way => Geometry::Way { node_refs: Vec::new() },
            ElementKind::Relation => Geometry::Relation { members: Vec::new() },
        }
    }

    fn kind(&self) -> ElementKind {
        match self {
            Geometry::Node { .. } => ElementKind::Node,
            Geometry::Way { .. } => ElementKind::Way,
            Geometry::Relation { .. } => ElementKind::Relation,
        }
    }

    fn has_children(&self) -> bool {
        match self {
            Geometry::Node { .. } => false,
            Geometry::Way { node_refs } => !node_refs.is_empty(),
            Geometry::Relation { members } => !members.is_empty(),
        }
    }
}

/// A node, way or relation together with its version metadata and tags.
///
/// Every attribute is optional: an element built with [`Element::new`] has no id,
/// reports `None` from every getter and displays as an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: Option<OsmId>,
    version: Option<u64>,
    user: Option<String>,
    uid: Option<u64>,
    timestamp: Option<String>,
    changeset: Option<u64>,
    visible: Option<bool>,
    tags: BTreeMap<String, String>,
    geometry: Geometry,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Element {
            id: None,
            version: None,
            user: None,
            uid: None,
            timestamp: None,
            changeset: None,
            visible: None,
            tags: BTreeMap::new(),
            geometry: Geometry::empty(kind),
        }
    }

    pub fn node(id: OsmId, lat: f64, lon: f64) -> Self {
        Element {
            id: Some(id),
            geometry: Geometry::Node { lat: Some(lat), lon: Some(lon) },
            ..Element::new(ElementKind::Node)
        }
    }

    pub fn way(id: OsmId, node_refs: Vec<OsmId>) -> Self {
        Element {
            id: Some(id),
            geometry: Geometry::Way { node_refs },
            ..Element::new(ElementKind::Way)
        }
    }

    pub fn relation(id: OsmId, members: Vec<Member>) -> Self {
        Element {
            id: Some(id),
            geometry: Geometry::Relation { members },
            ..Element::new(ElementKind::Relation)
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.set_tag(key, value);
        self
    }

    pub fn set_tag(&mut self, key: &str, value: &str) {
        self.tags.insert(key.to_string(), value.to_string());
    }

    pub fn kind(&self) -> ElementKind {
        self.geometry.kind()
    }

    pub fn id(&self) -> Option<OsmId> {
        self.id
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn uid(&self) -> Option<u64> {
        self.uid
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn changeset(&self) -> Option<u64> {
        self.changeset
    }

    pub fn visible(&self) -> Option<bool> {
        self.visible
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn lat(&self) -> Option<f64> {
        match self.geometry {
            Geometry::Node { lat, .. } => lat,
            _ => None,
        }
    }

    pub fn lon(&self) -> Option<f64> {
        match self.geometry {
            Geometry::Node { lon, .. } => lon,
            _ => None,
        }
    }

    /// Node ids of a way, empty for other kinds.
    pub fn node_refs(&self) -> &[OsmId] {
        match &self.geometry {
            Geometry::Way { node_refs } => node_refs,
            _ => &[],
        }
    }

    pub fn members(&self) -> &[Member] {
        match &self.geometry {
            Geometry::Relation { members } => members,
            _ => &[],
        }
    }

    /// Build an element from the attributes of its opening tag.
    pub(crate) fn from_start(kind: ElementKind, el: &BytesStart) -> Result<Element> {
        let mut element = Element::new(kind);

        for attribute_res in el.attributes() {
            let attribute = attribute_res?;
            let value = attribute.unescape_value()?;
            match attribute.key.as_ref() {
                b"id" => element.id = Some(parse_value("id", &value)?),
                b"version" => element.version = Some(parse_value("version", &value)?),
                b"user" => element.user = Some(value.into_owned()),
                b"uid" => element.uid = Some(parse_value("uid", &value)?),
                b"timestamp" => element.timestamp = Some(value.into_owned()),
                b"changeset" => element.changeset = Some(parse_value("changeset", &value)?),
                b"visible" => element.visible = Some(parse_value("visible", &value)?),
                b"lat" => {
                    if let Geometry::Node { lat, .. } = &mut element.geometry {
                        *lat = Some(parse_value("lat", &value)?);
                    }
                },
                b"lon" => {
                    if let Geometry::Node { lon, .. } = &mut element.geometry {
                        *lon = Some(parse_value("lon", &value)?);
                    }
                },
                _ => (),
            }
        }

        Ok(element)
    }

    /// Apply a `<tag>`, `<nd>` or `<member>` child. Anything else is ignored.
    pub(crate) fn push_child(&mut self, el: &BytesStart) -> Result<()> {
        match el.name().as_ref() {
            b"tag" => {
                if let Some(key) = attribute(el, b"k")? {
                    let value = attribute(el, b"v")?.unwrap_or_default();
                    self.tags.insert(key, value);
                }
            },
            b"nd" => {
                if let Geometry::Way { node_refs } = &mut self.geometry {
                    let reference = parse_attribute(el, "ref")?
                        .ok_or_else(|| Error::document_format("nd is missing ref"))?;
                    node_refs.push(reference);
                }
            },
            b"member" => {
                if let Geometry::Relation { members } = &mut self.geometry {
                    let kind = attribute(el, b"type")?
                        .ok_or_else(|| Error::document_format("member is missing type"))?
                        .parse()?;
                    let reference = parse_attribute(el, "ref")?
                        .ok_or_else(|| Error::document_format("member is missing ref"))?;
                    let role = attribute(el, b"role")?.unwrap_or_default();
                    members.push(Member { kind, reference, role });
                }
            },
            _ => (),
        }
        Ok(())
    }

    pub(crate) fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let Some(id) = self.id else {
            return Ok(());
        };
        let name = self.kind().as_str();

        let mut start = BytesStart::new(name);
        start.push_attribute(("id", id.to_string().as_str()));
        if let Some(version) = self.version {
            start.push_attribute(("version", version.to_string().as_str()));
        }
        if let Some(user) = &self.user {
            start.push_attribute(("user", user.as_str()));
        }
        if let Some(uid) = self.uid {
            start.push_attribute(("uid", uid.to_string().as_str()));
        }
        if let Some(timestamp) = &self.timestamp {
            start.push_attribute(("timestamp", timestamp.as_str()));
        }
        if let Some(changeset) = self.changeset {
            start.push_attribute(("changeset", changeset.to_string().as_str()));
        }
        if let Some(visible) = self.visible {
            start.push_attribute(("visible", if visible { "true" } else { "false" }));
        }
        if let Geometry::Node { lat, lon } = &self.geometry {
            if let Some(lat) = lat {
                start.push_attribute(("lat", lat.to_string().as_str()));
            }
            if let Some(lon) = lon {
                start.push_attribute(("lon", lon.to_string().as_str()));
            }
        }

        if self.tags.is_empty() && !self.geometry.has_children() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        match &self.geometry {
            Geometry::Node { .. } => (),
            Geometry::Way { node_refs } => {
                for reference in node_refs {
                    let nd = BytesStart::new("nd")
                        .with_attributes([("ref", reference.to_string().as_str())]);
                    writer.write_event(Event::Empty(nd))?;
                }
            },
            Geometry::Relation { members } => {
                for member in members {
                    let reference = member.reference.to_string();
                    let el = BytesStart::new("member").with_attributes([
                        ("type", member.kind.as_str()),
                        ("ref", reference.as_str()),
                        ("role", member.role.as_str()),
                    ]);
                    writer.write_event(Event::Empty(el))?;
                }
            },
        }
        for (key, value) in &self.tags {
            let tag = BytesStart::new("tag")
                .with_attributes([("k", key.as_str()), ("v", value.as_str())]);
            writer.write_event(Event::Empty(tag))?;
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// The element as an OSM XML fragment. Empty for an element without an id.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_xml(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|err| err.utf8_error().into())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xml = self.to_xml().map_err(|_| fmt::Error)?;
        f.write_str(&xml)
    }
}
