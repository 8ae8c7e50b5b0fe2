//! Kitsu (kitsu.io) linking source.
//!
//! Kitsu is only used to resolve a title's identity, so it reads its
//! public JSON API instead of scraping markup.

use super::{Site, SiteLoginState, SiteType, Title};
use crate::config::ScrapingConfig;
use crate::error::SiteError;
use crate::normalize::{UNKNOWN_CHAPTER, from_now};
use crate::transport::{HttpRequest, Platform, Transport};
use crate::utils::title_contains_query;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};

const API_URL: &str = "https://kitsu.io/api/edge/manga";
const ACCEPT_JSON_API: &str = "application/vnd.api+json";

/// Regex to extract the slug from a title URL.
static SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"kitsu\.io/manga/([^/?#]+)").unwrap());

#[derive(Debug, Deserialize)]
struct MangaResponse {
    data: Vec<MangaData>,
}

#[derive(Debug, Deserialize)]
struct MangaData {
    attributes: MangaAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MangaAttributes {
    slug: String,
    #[serde(default)]
    canonical_title: String,
    poster_image: Option<PosterImage>,
    chapter_count: Option<u32>,
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PosterImage {
    original: Option<String>,
}

impl MangaAttributes {
    fn into_title(self) -> Title {
        let mut title = Title::new(format!("https://kitsu.io/manga/{}", self.slug), SiteType::Kitsu);
        title.title = self.canonical_title;
        title.cover_image_url = self
            .poster_image
            .and_then(|p| p.original)
            .unwrap_or_default();

        if let Some(count) = self.chapter_count.filter(|c| *c > 0) {
            title.chapter_label = format!("Chapter {}", count);
            title.chapter_number = f64::from(count);
        } else {
            title.chapter_label = UNKNOWN_CHAPTER.to_string();
        }

        title.chapter_relative_date = self
            .updated_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| {
                from_now(
                    ts.with_timezone(&Local).naive_local(),
                    Local::now().naive_local(),
                )
            })
            .unwrap_or_default();

        title
    }
}

/// Kitsu API adapter.
pub struct Kitsu {
    transport: Arc<dyn Transport>,
    platform: Platform,
}

impl Kitsu {
    pub fn new(transport: Arc<dyn Transport>, config: &ScrapingConfig) -> Self {
        Self {
            transport,
            platform: config.platform,
        }
    }

    fn extract_slug(url: &str) -> Result<String, SiteError> {
        SLUG_REGEX
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| SiteError::NotFound(format!("No Kitsu slug in {}", url)))
    }

    async fn query(&self, filter: &str, value: &str) -> Result<Vec<MangaData>, SiteError> {
        let url = url::Url::parse_with_params(API_URL, &[(filter, value)])
            .map_err(|e| SiteError::Invalid(e.to_string()))?;
        let request = HttpRequest::get(url.as_str())
            .with_header("Accept", ACCEPT_JSON_API)
            .with_user_agent(self.platform);

        let response = self.transport.send(request).await?.error_for_status()?;
        let parsed: MangaResponse = serde_json::from_str(&response.body)?;
        Ok(parsed.data)
    }
}

#[async_trait]
impl Site for Kitsu {
    fn site_type(&self) -> SiteType {
        SiteType::Kitsu
    }

    async fn read_url(&self, url: &str) -> Result<Title, SiteError> {
        let slug = Self::extract_slug(url)?;
        self.query("filter[slug]", &slug)
            .await?
            .into_iter()
            .next()
            .map(|manga| manga.attributes.into_title())
            .ok_or_else(|| SiteError::NotFound(format!("Kitsu has no manga {}", slug)))
    }

    async fn search(&self, query: &str) -> Result<Vec<Title>, SiteError> {
        let titles = self
            .query("filter[text]", query.trim())
            .await?
            .into_iter()
            .map(|manga| manga.attributes.into_title())
            .filter(|title| title_contains_query(query, &title.title))
            .collect();

        Ok(titles)
    }

    async fn check_login(&self) -> SiteLoginState {
        SiteLoginState::NotRequired
    }

    fn test_url(&self) -> String {
        "https://kitsu.io/manga/berserk".to_string()
    }
}
