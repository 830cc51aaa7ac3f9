//! Client for the OpenStreetMap data API and the Nominatim geocoder.
//!
//! Map data is merged into an in-memory [`Document`] and searched locally by tag.
//! Every session starts by checking the server's capabilities.

pub mod capabilities;
pub mod client;
pub mod config;
pub mod data;
pub mod errors;
pub mod nominatim;
pub mod search;
pub mod transport;
mod xml;

pub use capabilities::{Capabilities, Status};
pub use client::OsmClient;
pub use config::{Config, API_VERSION};
pub use data::{BoundingBox, Document, Element, ElementKind, Geometry, History, Member, OsmId};
pub use errors::{Error, ErrorKind, Result};
pub use nominatim::{Coords, Format, Nominatim, Place, SearchResults};
pub use search::{Criteria, SearchEngine};
pub use transport::{HttpTransport, MockTransport, Request, Response, Transport};
