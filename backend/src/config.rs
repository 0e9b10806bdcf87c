//! Process settings, read once from the environment at start-up.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub listen_addr: String,
    /// Public URL of this service, used for self and alternate links.
    pub base_url: String,
    pub elasticsearch_url: String,
    pub elasticsearch_index: String,
    pub elasticsearch_timeout: Duration,
    pub ftp_server: String,
    pub pydap_server: String,
    pub feed_author: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            base_url: "http://localhost:8080".to_string(),
            elasticsearch_url: "http://127.0.0.1:9200".to_string(),
            elasticsearch_index: "eo-catalogue".to_string(),
            elasticsearch_timeout: Duration::from_secs(20),
            ftp_server: "ftp://localhost/".to_string(),
            pydap_server: "http://localhost/pydap/".to_string(),
            feed_author: "CEDA".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).filter(|v| !v.is_empty()).unwrap_or(default);

        let timeout_secs = match lookup("ELASTICSEARCH_TIMEOUT_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) => secs,
            Some(Err(e)) => {
                tracing::warn!("ELASTICSEARCH_TIMEOUT_SECS is not a number ({}), using the default", e);
                defaults.elasticsearch_timeout.as_secs()
            }
            None => defaults.elasticsearch_timeout.as_secs(),
        };

        Self {
            listen_addr: text("CATALOGUE_LISTEN_ADDR", defaults.listen_addr),
            base_url: text("CATALOGUE_BASE_URL", defaults.base_url).trim_end_matches('/').to_string(),
            elasticsearch_url: text("ELASTICSEARCH_URL", defaults.elasticsearch_url).trim_end_matches('/').to_string(),
            elasticsearch_index: text("ELASTICSEARCH_INDEX", defaults.elasticsearch_index),
            elasticsearch_timeout: Duration::from_secs(timeout_secs),
            ftp_server: text("FTP_SERVER", defaults.ftp_server),
            pydap_server: text("PYDAP_SERVER", defaults.pydap_server),
            feed_author: text("FEED_AUTHOR", defaults.feed_author),
        }
    }
}
