//! Resolution engine.
//!
//! Routes a URL or site identifier to its adapter, runs the read through
//! the shared request queue, follows redirect signals and falls back to
//! alternate sources.

use crate::config::Config;
use crate::error::SiteError;
use crate::queue::RequestQueue;
use crate::sites::{Site, SiteLoginState, SiteReachability, SiteRegistry, SiteType, Title};
use futures::future::{BoxFuture, join_all};
use std::time::Duration;

/// An alternate place to read the same title: site and URL on that site.
pub type AltSource = (SiteType, String);

/// Health report for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteHealth {
    pub site: SiteType,
    pub login: SiteLoginState,
    pub reachability: SiteReachability,
}

/// Entry point for reading and searching titles across every site.
///
/// Owns the adapter registry and the global request queue; both live as
/// long as the resolver.
pub struct Resolver {
    pub(crate) registry: SiteRegistry,
    pub(crate) queue: RequestQueue,
    max_redirects: u32,
    pub(crate) search_timeout: Duration,
}

impl Resolver {
    pub fn new(config: &Config, registry: SiteRegistry) -> Self {
        Self {
            registry,
            queue: RequestQueue::new(&config.queue),
            max_redirects: config.resolve.max_redirects,
            search_timeout: config.search.timeout(),
        }
    }

    /// Returns the adapter registry.
    pub fn sites(&self) -> &SiteRegistry {
        &self.registry
    }

    /// Reads a title, picking the adapter from the URL.
    pub async fn resolve(&self, url: &str, alt_sources: &[AltSource]) -> Result<Title, SiteError> {
        self.resolve_at(url, None, alt_sources, 0).await
    }

    /// Reads a title with an explicit adapter, primary or linking, falling
    /// back to the URL when `site` has no adapter.
    pub async fn resolve_by_site(
        &self,
        url: &str,
        site: SiteType,
        alt_sources: &[AltSource],
    ) -> Result<Title, SiteError> {
        self.resolve_at(url, Some(site), alt_sources, 0).await
    }

    fn resolve_at<'a>(
        &'a self,
        url: &'a str,
        site: Option<SiteType>,
        alt_sources: &'a [AltSource],
        depth: u32,
    ) -> BoxFuture<'a, Result<Title, SiteError>> {
        Box::pin(async move {
            let adapter = match site {
                Some(site) => self
                    .registry
                    .get_any(site)
                    .or_else(|| self.registry.find_for_url(url)),
                None => Some(
                    self.registry
                        .find_for_url(url)
                        .ok_or_else(|| SiteError::NotFound("Valid site not found".to_string()))?,
                ),
            };

            let mut error = None;

            if let Some(adapter) = adapter {
                match self.read(adapter.as_ref(), url).await {
                    Ok(title) => return Ok(title),
                    Err(SiteError::Redirect { target }) if depth < self.max_redirects => {
                        tracing::debug!(from = %url, to = %target, depth, "Following redirect");
                        return self.resolve_at(&target, None, alt_sources, depth + 1).await;
                    }
                    Err(SiteError::Redirect { target }) => {
                        tracing::warn!(url = %url, target = %target, "Redirect limit reached");
                        error = Some(SiteError::TooManyRedirects(target));
                    }
                    Err(err) => {
                        tracing::debug!(site = %adapter.site_type(), url = %url, error = %err, "Primary read failed");
                        error = Some(err);
                    }
                }
            }

            for (alt_site, alt_url) in alt_sources {
                let Some(alt_adapter) = self.registry.get_any(*alt_site) else {
                    continue;
                };

                match self.read(alt_adapter.as_ref(), alt_url).await {
                    Ok(title) => {
                        tracing::info!(site = %alt_site, url = %alt_url, "Resolved through alternate source");
                        return Ok(title);
                    }
                    Err(err) => {
                        tracing::debug!(site = %alt_site, url = %alt_url, error = %err, "Alternate source failed");
                    }
                }
            }

            Err(error.unwrap_or_else(|| SiteError::NotFound("Invalid site type".to_string())))
        })
    }

    async fn read(&self, adapter: &dyn Site, url: &str) -> Result<Title, SiteError> {
        self.queue.run(adapter.read_url(url)).await
    }

    /// Runs the login and reachability probes of every primary site.
    pub async fn check_sites(&self) -> Vec<SiteHealth> {
        let probes = self.registry.primary().iter().map(|site| async move {
            let (login, reachability) =
                futures::join!(site.check_login(), site.check_reachability());
            tracing::info!(
                site = %site.site_type(),
                login = %login,
                reachability = %reachability,
                "Site checked"
            );

            SiteHealth {
                site: site.site_type(),
                login,
                reachability,
            }
        });

        join_all(probes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockSite;
    use std::sync::Arc;

    const SK: SiteType = SiteType::SleepingKnightScans;

    fn resolver(primary: Vec<Arc<dyn Site>>) -> Resolver {
        Resolver::new(&Config::default(), SiteRegistry::from_sites(primary, Vec::new()))
    }

    /// A site whose URLs `r0..r{hops-1}` redirect to the next one and
    /// `r{hops}` succeeds.
    fn redirect_chain(hops: usize) -> MockSite {
        let url = |i: usize| format!("https://skscans.com/r{}", i);
        let mut site = MockSite::new(SK);
        for i in 0..hops {
            site = site.with_read(&url(i), Err(SiteError::Redirect { target: url(i + 1) }));
        }
        site.with_title(&url(hops), "End of chain")
    }

    #[tokio::test]
    async fn test_resolve_by_url() {
        let site = Arc::new(MockSite::new(SK).with_title("https://skscans.com/manga/a/", "A"));
        let resolver = resolver(vec![site.clone()]);

        let title = resolver.resolve("https://skscans.com/manga/a/", &[]).await.unwrap();
        assert_eq!(title.title, "A");
        assert_eq!(site.calls(), vec!["https://skscans.com/manga/a/"]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_host() {
        let resolver = resolver(vec![Arc::new(MockSite::new(SK))]);

        let err = resolver.resolve("https://example.com/manga/a/", &[]).await.unwrap_err();
        assert_eq!(err, SiteError::NotFound("Valid site not found".to_string()));
    }

    #[tokio::test]
    async fn test_explicit_site_wins_over_url() {
        let mangatx = Arc::new(MockSite::new(SiteType::MangaTx).with_title("https://skscans.com/manga/a/", "From MangaTx"));
        let skscans = Arc::new(MockSite::new(SK).with_title("https://skscans.com/manga/a/", "From SK"));
        let resolver = resolver(vec![skscans, mangatx]);

        let title = resolver
            .resolve_by_site("https://skscans.com/manga/a/", SiteType::MangaTx, &[])
            .await
            .unwrap();
        assert_eq!(title.title, "From MangaTx");
    }

    #[tokio::test]
    async fn test_unregistered_site_falls_back_to_url() {
        let skscans = Arc::new(MockSite::new(SK).with_title("https://skscans.com/manga/a/", "From SK"));
        let resolver = resolver(vec![skscans]);

        let title = resolver
            .resolve_by_site("https://skscans.com/manga/a/", SiteType::ResetScans, &[])
            .await
            .unwrap();
        assert_eq!(title.title, "From SK");
    }

    #[tokio::test]
    async fn test_explicit_linking_site() {
        let kitsu = Arc::new(MockSite::new(SiteType::Kitsu).with_title("https://kitsu.io/manga/berserk", "Berserk"));
        let skscans = Arc::new(MockSite::new(SK).with_read(
            "https://skscans.com/manga/berserk/",
            Err(SiteError::Transport("connection reset".to_string())),
        ));
        let resolver = Resolver::new(
            &Config::default(),
            SiteRegistry::from_sites(vec![skscans], vec![kitsu.clone()]),
        );

        let title = resolver
            .resolve_by_site("https://kitsu.io/manga/berserk", SiteType::Kitsu, &[])
            .await
            .unwrap();
        assert_eq!(title.source_id, SiteType::Kitsu);

        let alts = vec![(SiteType::Kitsu, "https://kitsu.io/manga/berserk".to_string())];
        let title = resolver.resolve("https://skscans.com/manga/berserk/", &alts).await.unwrap();
        assert_eq!(title.title, "Berserk");
        assert_eq!(kitsu.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_five_redirects_succeed() {
        let resolver = resolver(vec![Arc::new(redirect_chain(5))]);

        let title = resolver.resolve("https://skscans.com/r0", &[]).await.unwrap();
        assert_eq!(title.canonical_url, "https://skscans.com/r5");
    }

    #[tokio::test]
    async fn test_six_redirects_fail() {
        let site = Arc::new(redirect_chain(6));
        let resolver = resolver(vec![site.clone()]);

        let err = resolver.resolve("https://skscans.com/r0", &[]).await.unwrap_err();
        assert_eq!(err, SiteError::TooManyRedirects("https://skscans.com/r6".to_string()));
        assert_eq!(site.calls().len(), 6);
    }

    #[tokio::test]
    async fn test_redirect_to_other_site() {
        let old = Arc::new(MockSite::new(SK).with_read(
            "https://skscans.com/manga/a/",
            Err(SiteError::Redirect {
                target: "https://mangatx.com/manga/a/".to_string(),
            }),
        ));
        let new = Arc::new(MockSite::new(SiteType::MangaTx).with_title("https://mangatx.com/manga/a/", "Moved"));
        let resolver = resolver(vec![old, new]);

        let title = resolver.resolve("https://skscans.com/manga/a/", &[]).await.unwrap();
        assert_eq!(title.source_id, SiteType::MangaTx);
        assert_eq!(title.title, "Moved");
    }

    #[tokio::test]
    async fn test_alternate_source_fallback() {
        let primary = Arc::new(MockSite::new(SK).with_read(
            "https://skscans.com/manga/a/",
            Err(SiteError::Transport("connection reset".to_string())),
        ));
        let first_alt = Arc::new(MockSite::new(SiteType::MangaTx));
        let second_alt = Arc::new(MockSite::new(SiteType::ResetScans).with_title("https://reset-scans.com/manga/a/", "Alt"));
        let resolver = resolver(vec![primary, first_alt.clone(), second_alt]);

        let alts = vec![
            (SiteType::MangaTx, "https://mangatx.com/manga/a/".to_string()),
            (SiteType::ResetScans, "https://reset-scans.com/manga/a/".to_string()),
        ];
        let title = resolver.resolve("https://skscans.com/manga/a/", &alts).await.unwrap();

        assert_eq!(title.source_id, SiteType::ResetScans);
        assert_eq!(first_alt.calls(), vec!["https://mangatx.com/manga/a/"]);
    }

    #[tokio::test]
    async fn test_primary_error_kept_when_alternates_fail() {
        let primary = Arc::new(MockSite::new(SK).with_read(
            "https://skscans.com/manga/a/",
            Err(SiteError::Transport("connection reset".to_string())),
        ));
        let alt = Arc::new(MockSite::new(SiteType::MangaTx));
        let resolver = resolver(vec![primary, alt]);

        let alts = vec![
            (SiteType::MangaTx, "https://mangatx.com/manga/a/".to_string()),
            (SiteType::HiperDex, "https://hiperdex.com/manga/a/".to_string()),
        ];
        let err = resolver.resolve("https://skscans.com/manga/a/", &alts).await.unwrap_err();

        assert_eq!(err, SiteError::Transport("connection reset".to_string()));
    }

    #[tokio::test]
    async fn test_no_adapter_and_no_alternates() {
        let resolver = resolver(Vec::new());

        let err = resolver
            .resolve_by_site("https://example.com/a", SK, &[])
            .await
            .unwrap_err();
        assert_eq!(err, SiteError::NotFound("Invalid site type".to_string()));
    }

    #[tokio::test]
    async fn test_check_sites_reports_every_primary_site() {
        let healthy = Arc::new(MockSite::new(SK).with_title("https://skscans.com/manga/test/", "ok"));
        let broken = Arc::new(MockSite::new(SiteType::MangaTx));
        let resolver = resolver(vec![healthy, broken]);

        let report = resolver.check_sites().await;

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].site, SK);
        assert_eq!(report[0].reachability, SiteReachability::Reachable);
        assert_eq!(report[1].reachability, SiteReachability::NeedsCookies);
        assert_eq!(report[1].login, SiteLoginState::NotRequired);
    }
}
