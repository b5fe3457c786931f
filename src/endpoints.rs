//! URIs of the remote item API

use crate::error::{Error, Result};
use crate::types::ItemId;
use url::Url;

/// Builds request URIs relative to the API base
///
/// URIs double as fetch cache keys, so the same item always maps to the same string.
#[derive(Clone, Debug)]
pub struct Endpoints {
    base: Url,
    updates: String,
}

impl Endpoints {
    /// Create endpoints from a base URL such as `https://hacker-news.firebaseio.com/v0/`
    ///
    /// A missing trailing slash is added so relative joins stay under the base path.
    pub fn new(base_url: &str) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        let base = Url::parse(&normalized)
            .map_err(|e| Error::config("api.base_url", format!("invalid base URL: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::config(
                "api.base_url",
                format!("{} cannot be used as a base URL", base_url),
            ));
        }

        let updates = base
            .join("updates.json")
            .map_err(|e| Error::config("api.base_url", e.to_string()))?
            .to_string();

        Ok(Self { base, updates })
    }

    /// `{base}/updates.json`
    pub fn updates(&self) -> &str {
        &self.updates
    }

    /// `{base}/item/{id}.json`
    pub fn item(&self, id: ItemId) -> String {
        format!("{}item/{}.json", self.base, id)
    }
}
