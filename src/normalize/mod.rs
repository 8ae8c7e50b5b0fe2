//! Pure normalization of scraped chapter lists and release dates.

pub mod chapter;
pub mod date;

pub use chapter::{ChapterListing, UNKNOWN_CHAPTER};
pub use date::{from_now, normalize_date, normalize_date_at, relative_phrase};
