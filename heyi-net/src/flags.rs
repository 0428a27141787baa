//! Flagged-domain lookup
//!
//! Asks the ledger whether earlier scans flagged a site's domain as AI
//! generated. Failures read as "not flagged" so browsing is never blocked.

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{create_client, EndpointConfig, NetError};

/// Answer from the flag lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SiteWarning {
    #[serde(default)]
    pub warn: bool,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Client for the ledger's site-warning endpoint
pub struct FlagLookup {
    client: Client,
    config: EndpointConfig,
}

impl FlagLookup {
    pub fn new(config: EndpointConfig) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(&config)?,
            config,
        })
    }

    /// Whether `url`'s domain has been flagged before
    pub async fn check(&self, url: &str) -> SiteWarning {
        match self.fetch(url).await {
            Ok(warning) => warning,
            Err(e) => {
                warn!("Site warning check failed for {}: {}", url, e);
                SiteWarning::default()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<SiteWarning, NetError> {
        let endpoint = format!(
            "{}?url={}",
            self.config.ledger_url("/api/site-warning"),
            urlencoding::encode(url)
        );

        let response = self.client.get(&endpoint).send().await?.error_for_status()?;
        let warning: SiteWarning = response.json().await?;

        debug!("Site warning for {}: {:?}", url, warning);
        Ok(warning)
    }
}

/// Host part of a URL, the granularity flags are kept at
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}
