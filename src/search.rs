//! Search aggregation across site adapters.

use crate::error::SiteError;
use crate::resolver::Resolver;
use crate::sites::{Site, SiteType, Title};
use futures::future::join_all;

impl Resolver {
    /// Searches one site, or every primary site when `site` is `None`.
    ///
    /// Each adapter call is raced against the search timeout. A single-site
    /// search returns that site's error; an all-sites search drops failing
    /// sites and concatenates the rest in registry order.
    pub async fn search(&self, query: &str, site: Option<SiteType>) -> Result<Vec<Title>, SiteError> {
        self.queue.run(self.search_inner(query, site)).await
    }

    async fn search_inner(&self, query: &str, site: Option<SiteType>) -> Result<Vec<Title>, SiteError> {
        if let Some(site) = site {
            let adapter = self
                .registry
                .get_any(site)
                .ok_or_else(|| SiteError::NotFound(format!("Unknown site: {}", site)))?;
            return self.race(adapter.as_ref(), query).await;
        }

        let searches = self
            .registry
            .primary()
            .iter()
            .map(|adapter| self.race(adapter.as_ref(), query));

        let mut titles = Vec::new();
        for (adapter, result) in self.registry.primary().iter().zip(join_all(searches).await) {
            match result {
                Ok(found) => titles.extend(found),
                Err(err) => {
                    tracing::warn!(site = %adapter.site_type(), error = %err, "Search failed");
                }
            }
        }

        tracing::debug!(query = %query, results = titles.len(), "Search finished");
        Ok(titles)
    }

    /// Runs one adapter search against the timeout. The slower call is
    /// dropped.
    async fn race(&self, adapter: &dyn Site, query: &str) -> Result<Vec<Title>, SiteError> {
        match tokio::time::timeout(self.search_timeout, adapter.search(query)).await {
            Ok(result) => result,
            Err(_) => Err(SiteError::Timeout),
        }
    }
}
