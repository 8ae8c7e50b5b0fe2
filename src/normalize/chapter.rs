//! Chapter and volume normalization for volume-grouped chapter lists.
//!
//! Sites built on the WordPress manga theme list chapters either flat or
//! grouped under collapsible volume headers:
//!
//! ```html
//! <li class="parent has-child">
//!   <a class="has-child">Vol.02</a>
//!   <ul><li class="wp-manga-chapter"><a href="..">Chapter 12.5</a>
//!       <span class="chapter-release-date"><i>May 5, 2023</i></span></li></ul>
//! </li>
//! ```
//!
//! [`ChapterListing::from_document`] reduces such a tree to owned values;
//! `label`, `number` and `relative_date` produce the canonical forms.

use super::date::normalize_date;
use crate::utils::match_num;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// CSS selectors used for parsing.
struct Selectors {
    /// Volume grouping element.
    volume_group: Selector,
    /// Volume header inside a grouping.
    volume_header: Selector,
    /// Chapter link.
    chapter: Selector,
    /// Chapter release date.
    chapter_date: Selector,
    /// Link inside the release date (carries a `title` on some themes).
    link: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    volume_group: Selector::parse(".parent.has-child").unwrap(),
    volume_header: Selector::parse(".parent.has-child .has-child").unwrap(),
    chapter: Selector::parse(".wp-manga-chapter a").unwrap(),
    chapter_date: Selector::parse(".chapter-release-date").unwrap(),
    link: Selector::parse("a").unwrap(),
});

/// Label used when no volume was selected.
const DEFAULT_VOLUME: &str = "Vol.01";

/// Label used when no chapter text was found.
pub const UNKNOWN_CHAPTER: &str = "Unknown";

/// Chapter data extracted from a volume-grouped chapter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterListing {
    /// Header of the volume the chapter was taken from.
    pub volume: Option<String>,
    /// Text of the matching chapter entry.
    pub chapter_text: Option<String>,
    /// `href` of the matching chapter entry.
    pub chapter_url: Option<String>,
    /// Text of the release date element, if there is one.
    pub chapter_date: Option<String>,
    /// `title` attribute of the first link inside the date element.
    pub chapter_date_title: Option<String>,
    /// Whether the date element exists and has any child node. Badge-only
    /// dates have no text but still count.
    pub chapter_date_present: bool,
    /// Number of the matching chapter of each volume grouping, in document
    /// order. Empty when the chapter did not come from a grouping.
    pub volume_chapters: Vec<f64>,
}

impl ChapterListing {
    /// Extracts the chapter listing from a parsed page or chapter fragment.
    pub fn from_document(doc: &Html) -> Self {
        let root = doc.root_element();

        if let Some((header, group)) = select_volume(root)
            && let Some((chapter, text)) = matching_chapter(group.select(&SELECTORS.chapter))
        {
            let mut listing = Self::from_scope(group, chapter, text);
            listing.volume = Some(element_text(header));
            listing.volume_chapters = volume_chapters(root);
            return listing;
        }

        match matching_chapter(root.select(&SELECTORS.chapter)) {
            Some((chapter, text)) => {
                let mut listing = Self::from_scope(root, chapter, text);
                if in_volume_group(chapter) {
                    listing.volume_chapters = volume_chapters(root);
                }
                listing
            }
            None => Self {
                chapter_date: root
                    .select(&SELECTORS.chapter_date)
                    .next()
                    .map(element_text),
                ..Self::default()
            },
        }
    }

    fn from_scope(scope: ElementRef, chapter: ElementRef, text: String) -> Self {
        let date = scope.select(&SELECTORS.chapter_date).next();

        Self {
            volume: None,
            chapter_text: Some(text),
            chapter_url: chapter.value().attr("href").map(str::to_string),
            chapter_date: date.map(element_text),
            chapter_date_present: date.is_some_and(|d| d.has_children()),
            chapter_date_title: date.and_then(|d| {
                d.select(&SELECTORS.link)
                    .next()
                    .and_then(|a| a.value().attr("title"))
                    .map(str::to_string)
            }),
            volume_chapters: Vec::new(),
        }
    }

    /// True when the page lacks the chapter or its date and the chapter
    /// list has to be fetched separately.
    pub fn is_incomplete(&self) -> bool {
        self.chapter_text.is_none() || !self.chapter_date_present
    }

    /// Chapter text with the release date stripped out.
    fn chapter_without_date(&self) -> String {
        let text = self.chapter_text.as_deref().unwrap_or_default();
        match self.chapter_date.as_deref() {
            Some(date) if !date.is_empty() => text.replace(date, "").trim().to_string(),
            _ => text.trim().to_string(),
        }
    }

    /// Display label, e.g. `"Vol.12 | Chapter 45"`.
    ///
    /// The volume prefix is omitted for first volumes (`.01` / ` 1`).
    pub fn label(&self) -> String {
        let volume = self.volume.as_deref().unwrap_or(DEFAULT_VOLUME);
        let chapter = self.chapter_without_date();

        if chapter.is_empty() {
            UNKNOWN_CHAPTER.to_string()
        } else if !volume.ends_with(".01") && !volume.ends_with(" 1") {
            format!("{} | {}", volume, chapter)
        } else {
            chapter
        }
    }

    /// Canonical chapter number.
    ///
    /// For grouped lists this is the exact number of the first volume plus
    /// the floored numbers of every later volume.
    pub fn number(&self) -> f64 {
        if self.volume_chapters.is_empty() {
            return match self.chapter_text {
                Some(_) => match_num(Some(&self.chapter_without_date())),
                None => 0.0,
            };
        }

        self.volume_chapters
            .iter()
            .enumerate()
            .map(|(index, number)| if index == 0 { *number } else { number.floor() })
            .sum()
    }

    /// Release date as a relative phrase, or empty.
    pub fn relative_date(&self) -> String {
        normalize_date(
            self.chapter_date.as_deref(),
            self.chapter_date_title.as_deref(),
        )
    }
}

/// Picks the volume header with the numerically largest index.
///
/// The index is every digit of the header concatenated, so `"Vol.02"` is 2.
/// Headers without digits never win.
fn select_volume(root: ElementRef<'_>) -> Option<(ElementRef<'_>, ElementRef<'_>)> {
    let mut best: Option<(ElementRef, ElementRef, u64)> = None;

    for header in root.select(&SELECTORS.volume_header) {
        let text = element_text(header);
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        let Ok(number) = digits.parse::<u64>() else {
            continue;
        };
        let Some(group) = header.parent().and_then(ElementRef::wrap) else {
            continue;
        };

        if best.is_none_or(|(_, _, current)| current < number) {
            best = Some((header, group, number));
        }
    }

    best.map(|(header, group, _)| (header, group))
}

/// First chapter entry with non-empty text.
///
/// Some themes nest the label in a child node next to badges or dates, so
/// the first child's text wins over the element's full text.
pub fn matching_chapter<'a>(
    elements: impl IntoIterator<Item = ElementRef<'a>>,
) -> Option<(ElementRef<'a>, String)> {
    elements.into_iter().find_map(|element| {
        let child_text = element
            .first_child()
            .map(|child| match child.value() {
                Node::Text(text) => text.trim().to_string(),
                Node::Element(_) => ElementRef::wrap(child).map(element_text).unwrap_or_default(),
                _ => String::new(),
            })
            .unwrap_or_default();

        let text = if child_text.is_empty() {
            element_text(element)
        } else {
            child_text
        };

        (!text.is_empty()).then_some((element, text))
    })
}

/// Numbers of each grouping's matching chapter, in document order.
fn volume_chapters(root: ElementRef) -> Vec<f64> {
    root.select(&SELECTORS.volume_group)
        .map(|group| {
            let text = matching_chapter(group.select(&SELECTORS.chapter)).map(|(_, text)| text);
            match_num(text.as_deref())
        })
        .collect()
}

fn in_volume_group(element: ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            let classes: Vec<&str> = ancestor.value().classes().collect();
            classes.contains(&"parent") && classes.contains(&"has-child")
        })
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}
