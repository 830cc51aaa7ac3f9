use std::{env, io};

use log::info;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_services::errors::{Error, Result};
use osm_services::{Config, OsmClient};

const USAGE: &str = "usage: osm_services <config.json> <place name>";

fn setup_logging() {
    Builder::with_level("info")
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    setup_logging();

    let mut args = env::args().skip(1);
    let config_path = args.next().ok_or_else(|| Error::invalid_config(USAGE))?;
    let place = args.collect::<Vec<_>>().join(" ");
    if place.is_empty() {
        return Err(Error::invalid_config(USAGE));
    }

    let config = Config::from_file(&config_path)?;
    let mut client = OsmClient::new(config)?;
    let coords = client.get_coords_of_place(&place)?;
    info!(place = place.as_str(), lat = coords.lat.as_str(), lon = coords.lon.as_str(); "Found place");
    println!("{} {}", coords.lat, coords.lon);

    Ok(())
}
