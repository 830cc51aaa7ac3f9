use std::str::FromStr;

use quick_xml::events::BytesStart;

use crate::errors::{Error, Result};

pub(crate) fn attribute(el: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        if attribute.key.as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

pub(crate) fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::document_format(format!("Invalid value '{value}' for attribute {name}"))
    })
}

pub(crate) fn parse_attribute<T: FromStr>(el: &BytesStart, name: &str) -> Result<Option<T>> {
    attribute(el, name.as_bytes())?
        .map(|value| parse_value(name, &value))
        .transpose()
}
