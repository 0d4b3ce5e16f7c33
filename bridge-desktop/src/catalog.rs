//! Catalog document loaded through a media fetcher

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    media::{CatalogSource, MediaFetcher},
};
use bytes::Bytes;
use tracing::debug;

/// Reads the catalog document stored under `key` with any [`MediaFetcher`],
/// so the catalog can live next to the media it references.
pub struct FetchedCatalog {
    fetcher: Arc<dyn MediaFetcher>,
    key: String,
}

impl FetchedCatalog {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, key: impl Into<String>) -> Self {
        Self {
            fetcher,
            key: key.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for FetchedCatalog {
    async fn load_document(&self) -> Result<Bytes> {
        let document = self.fetcher.fetch(&self.key).await?;
        debug!(key = %self.key, bytes = document.len(), "Catalog document fetched");
        Ok(document)
    }

    fn describe(&self) -> String {
        self.key.clone()
    }
}
