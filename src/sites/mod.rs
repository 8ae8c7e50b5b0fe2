//! Site adapter trait and common types for source sites.
//!
//! Every source site is one [`Site`] implementation. Adapters of the same
//! family (for example every WordPress manga theme) share one type,
//! parameterised by [`SiteType`].

mod kitsu;
mod wordpress;

pub use kitsu::Kitsu;
pub use wordpress::WordPress;

use crate::config::ScrapingConfig;
use crate::error::SiteError;
use crate::normalize::UNKNOWN_CHAPTER;
use crate::transport::Transport;
use crate::utils::host_of;
use async_trait::async_trait;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Identifier of a source site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteType {
    #[serde(rename = "1stkissmanga.me")]
    FirstKissManga,
    #[serde(rename = "mangakomi.io")]
    MangaKomi,
    #[serde(rename = "en.leviatanscans.com")]
    LeviatanScans,
    #[serde(rename = "hiperdex.com")]
    HiperDex,
    #[serde(rename = "mangatx.com")]
    MangaTx,
    #[serde(rename = "skscans.com")]
    SleepingKnightScans,
    #[serde(rename = "reset-scans.com")]
    ResetScans,
    #[serde(rename = "kitsu.io")]
    Kitsu,
}

impl SiteType {
    pub const ALL: [SiteType; 8] = [
        SiteType::FirstKissManga,
        SiteType::MangaKomi,
        SiteType::LeviatanScans,
        SiteType::HiperDex,
        SiteType::MangaTx,
        SiteType::SleepingKnightScans,
        SiteType::ResetScans,
        SiteType::Kitsu,
    ];

    /// Domain used as the site's identifier.
    pub fn id(self) -> &'static str {
        match self {
            SiteType::FirstKissManga => "1stkissmanga.me",
            SiteType::MangaKomi => "mangakomi.io",
            SiteType::LeviatanScans => "en.leviatanscans.com",
            SiteType::HiperDex => "hiperdex.com",
            SiteType::MangaTx => "mangatx.com",
            SiteType::SleepingKnightScans => "skscans.com",
            SiteType::ResetScans => "reset-scans.com",
            SiteType::Kitsu => "kitsu.io",
        }
    }

    /// Human-readable site name.
    pub fn name(self) -> &'static str {
        match self {
            SiteType::FirstKissManga => "1st Kiss Manga",
            SiteType::MangaKomi => "Manga Komi",
            SiteType::LeviatanScans => "Leviatan Scans",
            SiteType::HiperDex => "HiperDEX",
            SiteType::MangaTx => "MangaTx",
            SiteType::SleepingKnightScans => "Sleeping Knight Scans",
            SiteType::ResetScans => "Reset Scans",
            SiteType::Kitsu => "Kitsu",
        }
    }

    pub fn base_url(self) -> String {
        format!("https://{}", self.id())
    }

    /// Checks whether `url` points at this site.
    pub fn matches_url(self, url: &str) -> bool {
        host_of(url).is_some_and(|host| {
            host == self.id() || host.ends_with(&format!(".{}", self.id()))
        })
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SiteType {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches("www.");
        SiteType::ALL
            .into_iter()
            .find(|site| site.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| SiteError::NotFound(format!("Unknown site: {}", s)))
    }
}

/// A work on one source site, with its latest chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    /// Site this title was read from.
    pub source_id: SiteType,

    /// Identity of the title within its source.
    pub canonical_url: String,

    pub title: String,

    pub cover_image_url: String,

    /// Display label of the latest chapter, e.g. `"Vol.12 | Chapter 45"`.
    pub chapter_label: String,

    /// Canonical latest chapter number (never negative).
    pub chapter_number: f64,

    pub chapter_url: String,

    /// Release date of the latest chapter as a relative phrase.
    pub chapter_relative_date: String,
}

impl Title {
    /// Creates an empty title for `canonical_url`.
    pub fn new(canonical_url: impl Into<String>, source_id: SiteType) -> Self {
        Self {
            source_id,
            canonical_url: canonical_url.into(),
            title: String::new(),
            cover_image_url: String::new(),
            chapter_label: UNKNOWN_CHAPTER.to_string(),
            chapter_number: 0.0,
            chapter_url: String::new(),
            chapter_relative_date: String::new(),
        }
    }
}

/// Result of a login health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SiteLoginState {
    NotRequired,
    LoggedIn,
    LoggedOut,
    Unknown,
}

impl fmt::Display for SiteLoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SiteLoginState::NotRequired => "No login required",
            SiteLoginState::LoggedIn => "Logged in",
            SiteLoginState::LoggedOut => "Logged out",
            SiteLoginState::Unknown => "Unknown",
        })
    }
}

/// Result of a reachability health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SiteReachability {
    Reachable,
    Offline,
    NeedsCookies,
}

impl fmt::Display for SiteReachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SiteReachability::Reachable => "Reachable",
            SiteReachability::Offline => "Site not reachable",
            SiteReachability::NeedsCookies => "Visit to set cookies",
        })
    }
}

/// Trait for source site adapters.
///
/// Adapters convert every transport and parse failure into a
/// [`SiteError`]; nothing escapes as a panic.
#[async_trait]
pub trait Site: Send + Sync {
    /// Returns the identifier of the site this adapter reads.
    fn site_type(&self) -> SiteType;

    /// Checks if this adapter can handle the given URL.
    fn can_handle(&self, url: &str) -> bool {
        self.site_type().matches_url(url)
    }

    /// Reads title metadata and the latest chapter from a title page.
    ///
    /// Fails with [`SiteError::Redirect`] when `url` is an alias of another
    /// title URL.
    async fn read_url(&self, url: &str) -> Result<Title, SiteError>;

    /// Searches the site. Rows whose title doesn't match `query` are dropped.
    async fn search(&self, query: &str) -> Result<Vec<Title>, SiteError>;

    /// Best-effort login probe. Failures are logged, not returned.
    async fn check_login(&self) -> SiteLoginState;

    /// Best-effort reachability probe that reads the test URL.
    async fn check_reachability(&self) -> SiteReachability {
        let site = self.site_type();
        match self.read_url(&self.test_url()).await {
            Ok(_) => SiteReachability::Reachable,
            Err(SiteError::Transport(err)) => {
                tracing::warn!(site = %site, error = %err, "Site not reachable");
                SiteReachability::Offline
            }
            Err(err) => {
                tracing::warn!(site = %site, error = %err, "Site reachable but unreadable");
                SiteReachability::NeedsCookies
            }
        }
    }

    /// A fixed title URL known to work, for self-tests.
    fn test_url(&self) -> String;
}

/// Registry of available site adapters.
///
/// Primary sites are scraped for chapters; linking sites only resolve
/// identity. Both lists keep registration order.
pub struct SiteRegistry {
    primary: Vec<Arc<dyn Site>>,
    linking: Vec<Arc<dyn Site>>,
}

impl SiteRegistry {
    /// Creates a registry with every built-in adapter.
    pub fn new(config: &ScrapingConfig, transport: Arc<dyn Transport>) -> Self {
        let primary: Vec<Arc<dyn Site>> = [
            SiteType::FirstKissManga,
            SiteType::MangaKomi,
            SiteType::LeviatanScans,
            SiteType::HiperDex,
            SiteType::MangaTx,
            SiteType::SleepingKnightScans,
            SiteType::ResetScans,
        ]
        .into_iter()
        .map(|site| Arc::new(WordPress::new(site, transport.clone(), config)) as Arc<dyn Site>)
        .collect();

        let linking: Vec<Arc<dyn Site>> = vec![Arc::new(Kitsu::new(transport, config))];

        Self::from_sites(primary, linking)
    }

    /// Creates a registry from explicit adapters.
    ///
    /// A site registered twice keeps its first adapter.
    pub fn from_sites(primary: Vec<Arc<dyn Site>>, linking: Vec<Arc<dyn Site>>) -> Self {
        fn dedup(sites: Vec<Arc<dyn Site>>) -> Vec<Arc<dyn Site>> {
            let mut kept: Vec<Arc<dyn Site>> = Vec::with_capacity(sites.len());
            for site in sites {
                if kept.iter().any(|k| k.site_type() == site.site_type()) {
                    tracing::warn!(site = %site.site_type(), "Duplicate adapter ignored");
                    continue;
                }
                kept.push(site);
            }
            kept
        }

        Self {
            primary: dedup(primary),
            linking: dedup(linking),
        }
    }

    /// Finds a primary adapter by identifier.
    pub fn get(&self, site: SiteType) -> Option<&Arc<dyn Site>> {
        self.primary.iter().find(|s| s.site_type() == site)
    }

    /// Finds a primary or linking adapter by identifier.
    pub fn get_any(&self, site: SiteType) -> Option<&Arc<dyn Site>> {
        self.get(site)
            .or_else(|| self.linking.iter().find(|s| s.site_type() == site))
    }

    /// Finds a primary adapter that can handle the given URL.
    pub fn find_for_url(&self, url: &str) -> Option<&Arc<dyn Site>> {
        self.primary.iter().find(|s| s.can_handle(url))
    }

    /// Returns all primary adapters, in registration order.
    pub fn primary(&self) -> &[Arc<dyn Site>] {
        &self.primary
    }

    /// Returns all linking adapters, in registration order.
    pub fn linking(&self) -> &[Arc<dyn Site>] {
        &self.linking
    }
}

/// Reads an image URL from an element.
///
/// Tries `content`, then the lazy-load attributes, then `src`. A
/// protocol-relative URL gets an `https:` scheme.
pub fn image_src(element: Option<ElementRef>) -> String {
    const ATTRIBUTES: [&str; 5] = ["content", "data-src", "data-lazy-src", "data-cfsrc", "src"];

    let url = element
        .and_then(|e| {
            ATTRIBUTES
                .iter()
                .filter_map(|name| e.value().attr(name))
                .map(str::trim)
                .find(|value| !value.is_empty())
        })
        .unwrap_or_default();

    match url.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}
