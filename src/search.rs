use std::collections::BTreeMap;

use crate::data::{Document, Element};

/// Tag key to expected value. Every entry has to match.
pub type Criteria = BTreeMap<String, String>;

const VALUE_DELIMITER: char = ';';

/// Whether `expected` is one of the `;` separated values in `value`.
///
/// Each piece is trimmed before comparing, so `pub; restaurant` holds `restaurant`.
/// Escaped semicolons are not treated specially.
pub fn tag_matches(value: &str, expected: &str) -> bool {
    value
        .split(VALUE_DELIMITER)
        .map(str::trim)
        .any(|token| token == expected)
}

pub struct SearchEngine<'a> {
    document: &'a Document,
}

impl<'a> SearchEngine<'a> {
    pub fn new(document: &'a Document) -> Self {
        SearchEngine { document }
    }

    pub fn matches(element: &Element, criteria: &Criteria) -> bool {
        criteria.iter().all(|(key, expected)| {
            element
                .tag(key)
                .is_some_and(|value| tag_matches(value, expected))
        })
    }

    /// Elements matching all `criteria`, in document order.
    pub fn search(&self, criteria: &Criteria) -> Vec<&'a Element> {
        self.document
            .elements()
            .filter(|element| Self::matches(element, criteria))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::data::ElementKind;

    fn criteria(pairs: &[(&str, &str)]) -> Criteria {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn nenagh() -> Document {
        let mut document = Document::new();
        let elements = [
            Element::node(1, 52.86, -8.19).with_tag("amenity", "pharmacy").with_tag("name", "Cuddys"),
            Element::node(2, 52.86, -8.20).with_tag("amenity", "pub;restaurant").with_tag("name", "Andy's"),
            Element::node(3, 52.87, -8.20).with_tag("amenity", "restaurant").with_tag("cuisine", "indian"),
            Element::way(4, vec![1, 2]).with_tag("amenity", "restaurant").with_tag("cuisine", "chinese"),
            Element::node(5, 52.87, -8.21).with_tag("shop", "chemist"),
        ];
        for element in elements {
            document.insert(element).unwrap();
        }
        document
    }

    #[rstest]
    #[case("pub;restaurant", "restaurant", true)]
    #[case("pub;restaurant", "pub", true)]
    #[case("pub; restaurant", "restaurant", true)]
    #[case(" restaurant ", "restaurant", true)]
    #[case("pub;restaurant", "pub;restaurant", false)]
    #[case("restaurants", "restaurant", false)]
    #[case("", "restaurant", false)]
    fn multi_value_tags(#[case] value: &str, #[case] expected: &str, #[case] matched: bool) {
        assert_eq!(tag_matches(value, expected), matched);
    }

    #[test]
    fn empty_document_yields_nothing() {
        let document = Document::new();
        let engine = SearchEngine::new(&document);
        assert!(engine.search(&Criteria::new()).is_empty());
        assert!(engine.search(&criteria(&[("amenity", "pharmacy")])).is_empty());
    }

    #[test]
    fn delimited_values_match_in_document_order() {
        let document = nenagh();
        let found: Vec<_> = SearchEngine::new(&document)
            .search(&criteria(&[("amenity", "restaurant")]))
            .iter()
            .map(|el| (el.kind(), el.id()))
            .collect();
        assert_eq!(
            found,
            vec![
                (ElementKind::Node, Some(2)),
                (ElementKind::Node, Some(3)),
                (ElementKind::Way, Some(4)),
            ]
        );
    }

    #[test]
    fn all_criteria_must_hold() {
        let document = nenagh();
        let found = document.search(&criteria(&[("amenity", "restaurant"), ("cuisine", "chinese")]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), Some(4));
    }

    #[test]
    fn missing_key_never_matches() {
        let document = nenagh();
        assert!(document.search(&criteria(&[("opening_hours", "24/7")])).is_empty());
    }

    #[test]
    fn empty_criteria_match_everything() {
        let document = nenagh();
        assert_eq!(document.search(&Criteria::new()).len(), document.len());
    }
}
