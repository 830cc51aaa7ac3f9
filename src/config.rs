use std::{fs::File, io::BufReader, path::Path, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::errors::{Error, Result};
use crate::nominatim::resolve_server;

/// API version this library speaks.
pub const API_VERSION: &str = "0.6";
pub const DEFAULT_SERVER: &str = "https://api.openstreetmap.org/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client options. Fields missing from a config file take their defaults.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Nominatim server or one of its aliases (`nominatim`, `mapquest`).
    pub nominatim_server: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: DEFAULT_SERVER.to_string(),
            api_version: API_VERSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("osm_services/{}", env!("CARGO_PKG_VERSION")),
            nominatim_server: "nominatim".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let file = File::open(path)?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|err| Error::invalid_config(format!("Could not parse config: {err}")))
    }

    pub fn with_server(mut self, server: &str) -> Self {
        self.server = server.to_string();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.server) {
            return Err(Error::invalid_config(format!("Invalid server URL '{}'", self.server)));
        }
        if self.api_version.trim().parse::<f64>().is_err() {
            return Err(Error::invalid_config(format!(
                "API version '{}' is not numeric",
                self.api_version
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_config("Timeout must be at least one second"));
        }
        resolve_server(&self.nominatim_server)?;
        Ok(())
    }
}

/// Absolute http(s) URL with a host.
pub(crate) fn is_http_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.api_version, "0.6");
        assert_eq!(config.server, DEFAULT_SERVER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": "http://api06.dev.openstreetmap.org/", "timeout_secs": 5}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server, "http://api06.dev.openstreetmap.org/");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.api_version, API_VERSION);
    }

    #[test]
    fn unreadable_config_is_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "server = nope").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
    }

    #[test]
    fn bad_values_fail_validation() {
        let cases = [
            Config::default().with_server("invalid"),
            Config::default().with_server("ftp://example.com/"),
            Config { api_version: "six".into(), ..Config::default() },
            Config { timeout_secs: 0, ..Config::default() },
            Config { nominatim_server: "bing".into(), ..Config::default() },
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidConfig, "{config:?}");
        }
    }

    #[test]
    fn http_urls() {
        assert!(is_http_url("http://nominatim.example.com/"));
        assert!(is_http_url("https://api.openstreetmap.org"));
        assert!(!is_http_url("invalid"));
        assert!(!is_http_url("mailto:someone@example.com"));
    }
}
