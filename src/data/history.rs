use std::collections::BTreeMap;

use crate::data::{Element, ElementKind, OsmId};
use crate::errors::{Error, Result};

/// Every version seen of one element, ordered by version number.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    kind: ElementKind,
    id: OsmId,
    versions: BTreeMap<u64, Element>,
}

impl History {
    pub fn new(kind: ElementKind, id: OsmId) -> Self {
        History {
            kind,
            id,
            versions: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn id(&self) -> OsmId {
        self.id
    }

    /// Record a version. A version number already present is replaced.
    pub fn insert(&mut self, element: Element) -> Result<()> {
        if element.kind() != self.kind || element.id() != Some(self.id) {
            return Err(Error::document_format(format!(
                "{} {:?} does not belong to the history of {} {}",
                element.kind(),
                element.id(),
                self.kind,
                self.id
            )));
        }
        let version = element.version().ok_or_else(|| {
            Error::document_format(format!("{} {} has no version", self.kind, self.id))
        })?;
        self.versions.insert(version, element);
        Ok(())
    }

    /// Versions of `id` in ascending order, or nothing if `id` is not this element's.
    pub fn versions_of(&self, id: OsmId) -> Vec<&Element> {
        if id != self.id {
            return Vec::new();
        }
        self.versions.values().collect()
    }

    pub fn get(&self, version: u64) -> Option<&Element> {
        self.versions.get(&version)
    }

    pub fn latest(&self) -> Option<&Element> {
        self.versions.values().next_back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.versions.values()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Element;
    type IntoIter = std::collections::btree_map::Values<'a, u64, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.values()
    }
}
