//! WordPress manga theme (Madara) adapter.
//!
//! Used by many scanlation sites. Chapters are listed flat or grouped by
//! volume; some installs render the list inline, others load it through
//! an AJAX endpoint.

use super::{Site, SiteLoginState, SiteType, Title, image_src};
use crate::config::ScrapingConfig;
use crate::error::SiteError;
use crate::normalize::{ChapterListing, UNKNOWN_CHAPTER};
use crate::queue::RequestQueue;
use crate::transport::{HttpRequest, HttpResponse, Platform, Transport};
use crate::utils::{host_of, match_num, resolve_url, title_contains_query};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};

/// Numeric id prefix some installs put in front of search result slugs.
static SLUG_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/manga/)\d+-").unwrap());

/// CSS selectors used for parsing.
struct Selectors {
    /// Holder of the AJAX chapter list, carries `data-id`.
    chapters_holder: Selector,
    /// Cover image on the title page.
    summary_image: Selector,
    og_image: Selector,
    og_title: Selector,
    og_url: Selector,
    /// One search result row.
    search_row: Selector,
    search_title: Selector,
    search_chapter: Selector,
    link: Selector,
    image: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    chapters_holder: Selector::parse("#manga-chapters-holder").unwrap(),
    summary_image: Selector::parse(".summary_image img").unwrap(),
    og_image: Selector::parse(r#"meta[property="og:image"]"#).unwrap(),
    og_title: Selector::parse(r#"meta[property="og:title"]"#).unwrap(),
    og_url: Selector::parse(r#"meta[property="og:url"]"#).unwrap(),
    search_row: Selector::parse(".c-tabs-item__content").unwrap(),
    search_title: Selector::parse(".post-title").unwrap(),
    search_chapter: Selector::parse(".font-meta.chapter").unwrap(),
    link: Selector::parse("a").unwrap(),
    image: Selector::parse("img").unwrap(),
});

/// Everything read from a title page, owned so no parsed document is held
/// across an await.
#[derive(Debug)]
struct TitlePage {
    listing: ChapterListing,
    manga_id: String,
    og_url: Option<String>,
    image: String,
    title: String,
}

impl TitlePage {
    fn parse(body: &str) -> Self {
        let doc = Html::parse_document(body);

        let image_element = doc
            .select(&SELECTORS.summary_image)
            .next()
            .or_else(|| doc.select(&SELECTORS.og_image).next());

        Self {
            listing: ChapterListing::from_document(&doc),
            manga_id: doc
                .select(&SELECTORS.chapters_holder)
                .next()
                .and_then(|e| e.value().attr("data-id"))
                .unwrap_or_default()
                .to_string(),
            og_url: doc
                .select(&SELECTORS.og_url)
                .next()
                .and_then(|e| e.value().attr("content"))
                .map(str::to_string),
            image: image_src(image_element),
            title: doc
                .select(&SELECTORS.og_title)
                .last()
                .and_then(|e| e.value().attr("content"))
                .unwrap_or_default()
                .trim()
                .to_string(),
        }
    }
}

/// Adapter for sites running the WordPress manga theme.
pub struct WordPress {
    site_type: SiteType,
    transport: Arc<dyn Transport>,
    platform: Platform,
    /// Stricter per-site limiter, applied inside the global queue.
    limiter: Option<RequestQueue>,
}

impl WordPress {
    /// Creates an adapter for `site_type`.
    pub fn new(site_type: SiteType, transport: Arc<dyn Transport>, config: &ScrapingConfig) -> Self {
        let limiter = config
            .throttle_for(site_type.id())
            .map(RequestQueue::per_second);

        Self {
            site_type,
            transport,
            platform: config.platform,
            limiter,
        }
    }

    fn base_url(&self) -> String {
        self.site_type.base_url()
    }

    /// Sends a request with the platform user agent, through the site
    /// limiter when there is one.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SiteError> {
        let request = request.with_user_agent(self.platform);
        match &self.limiter {
            Some(limiter) => limiter.run(self.transport.send(request)).await,
            None => self.transport.send(request).await,
        }
    }

    /// Fetches the chapter list through one of the AJAX endpoints.
    async fn read_chapters(&self, manga_id: &str, endpoint: &str) -> Result<ChapterListing, SiteError> {
        let request = HttpRequest::post_form(
            endpoint,
            &[("action", "manga_get_chapters"), ("manga", manga_id)],
        );
        let response = self.send(request).await?.error_for_status()?;

        if response.body.trim() == "0" {
            return Err(SiteError::Invalid("Invalid chapter data".to_string()));
        }

        Ok(ChapterListing::from_document(&Html::parse_fragment(&response.body)))
    }

    fn build_title(&self, url: &str, page: TitlePage, listing: ChapterListing) -> Title {
        let mut title = Title::new(url, self.site_type);
        title.title = page.title;
        title.cover_image_url = page.image;
        title.chapter_label = listing.label();
        title.chapter_number = listing.number();
        title.chapter_url = listing
            .chapter_url
            .as_deref()
            .map(|href| resolve_url(url, href))
            .unwrap_or_default();
        title.chapter_relative_date = listing.relative_date();
        title
    }

    fn parse_search_results(&self, body: &str, query: &str) -> Vec<Title> {
        let doc = Html::parse_document(body);

        doc.select(&SELECTORS.search_row)
            .filter_map(|row| {
                let link = row.select(&SELECTORS.link).next();
                let href = link.and_then(|a| a.value().attr("href")).unwrap_or_default();
                let url = SLUG_PREFIX_REGEX.replace(href, "$1").to_string();

                let mut title = Title::new(url, self.site_type);
                title.cover_image_url = image_src(link.and_then(|a| a.select(&SELECTORS.image).next()));
                title.title = row
                    .select(&SELECTORS.search_title)
                    .next()
                    .map(|e| e.text().collect::<String>().trim().to_string())
                    .unwrap_or_default();

                let chapter = row
                    .select(&SELECTORS.search_chapter)
                    .next()
                    .map(|e| e.text().collect::<String>().trim().to_string())
                    .filter(|c| !c.is_empty());
                title.chapter_number = match_num(chapter.as_deref());
                title.chapter_label = chapter.unwrap_or_else(|| UNKNOWN_CHAPTER.to_string());

                title_contains_query(query, &title.title).then_some(title)
            })
            .collect()
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

#[async_trait]
impl Site for WordPress {
    fn site_type(&self) -> SiteType {
        self.site_type
    }

    async fn read_url(&self, url: &str) -> Result<Title, SiteError> {
        let response = self.send(HttpRequest::get(url)).await?;

        // The site moved: let the engine pick the adapter for the new host.
        if let (Some(requested), Some(landed)) = (host_of(url), host_of(&response.url))
            && requested != landed
        {
            return Err(SiteError::Redirect {
                target: response.url,
            });
        }

        let response = response.error_for_status()?;
        let page = TitlePage::parse(&response.body);
        let mut listing = page.listing.clone();

        if listing.is_incomplete() {
            let admin_ajax = format!("{}/wp-admin/admin-ajax.php", self.base_url());
            listing = match self.read_chapters(&page.manga_id, &admin_ajax).await {
                Ok(listing) => listing,
                Err(err) => {
                    tracing::debug!(site = %self.site_type, error = %err, "admin-ajax chapter list failed");
                    let actual_url = page.og_url.as_deref().unwrap_or(url);
                    let endpoint = format!("{}ajax/chapters", with_trailing_slash(actual_url));
                    self.read_chapters(&page.manga_id, &endpoint).await?
                }
            };
        }

        Ok(self.build_title(url, page, listing))
    }

    async fn search(&self, query: &str) -> Result<Vec<Title>, SiteError> {
        let params = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("s", query.trim())
            .append_pair("post_type", "wp-manga")
            .finish();
        let url = format!("{}/?{}", self.base_url(), params);

        let response = self.send(HttpRequest::get(url)).await?.error_for_status()?;
        Ok(self.parse_search_results(&response.body, query))
    }

    async fn check_login(&self) -> SiteLoginState {
        match self.send(HttpRequest::get(self.base_url())).await {
            Ok(response) if response.is_success() => SiteLoginState::NotRequired,
            Ok(response) => {
                tracing::warn!(site = %self.site_type, status = response.status, "Login page returned an error");
                SiteLoginState::Unknown
            }
            Err(err) => {
                tracing::warn!(site = %self.site_type, error = %err, "Login check failed");
                SiteLoginState::Unknown
            }
        }
    }

    fn test_url(&self) -> String {
        let path = match self.site_type {
            SiteType::FirstKissManga => "/manga/the-elegant-sea-of-savagery/",
            SiteType::MangaKomi => "/manga/good-night/",
            SiteType::HiperDex => "/manga/10-years-in-the-friend-zone/",
            SiteType::MangaTx => "/manga/grandest-wedding/",
            SiteType::LeviatanScans => "/manga/trash-of-the-counts-family/",
            SiteType::SleepingKnightScans => "/manga/chronicles-of-the-martial-gods-return/",
            SiteType::ResetScans => "/manga/the-unwanted-undead-adventurer/",
            SiteType::Kitsu => "",
        };
        format!("{}{}", self.base_url(), path)
    }
}
