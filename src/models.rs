//! Data models for extracted dashboard records.

use serde::{Deserialize, Serialize};

/// One article discovered on the statistics dashboard.
///
/// Created by the listing pass with whatever the stats table exposes,
/// then filled in place by the per-article detail pass. `title` and
/// `url` are fixed at creation; the detail pass may overwrite
/// `published_at`, `text_content`/`char_count` and (only while it is
/// still 0) `views`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Article title ("unknown" when the listing row had no usable text).
    pub title: String,
    /// Absolute permalink. Empty when unresolved; such records are
    /// skipped by the detail pass.
    pub url: String,
    /// Raw publish-date text as rendered on the page. Normalized by the
    /// report layer, not here.
    pub published_at: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    /// Full body text from the article page, empty until enriched.
    pub text_content: String,
    /// Character count of `text_content`. Kept in lockstep via
    /// [`Article::set_text_content`].
    pub char_count: u64,
}

impl Article {
    /// Create a listing-level record. Counters start at 0 until parsed
    /// from the row.
    pub fn new(title: impl Into<String>, url: impl Into<String>, published_at: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            published_at: published_at.into(),
            views: 0,
            likes: 0,
            comments: 0,
            text_content: String::new(),
            char_count: 0,
        }
    }

    /// Set the body text and its derived character count together.
    pub fn set_text_content(&mut self, text: impl Into<String>) {
        self.text_content = text.into();
        self.char_count = self.text_content.chars().count() as u64;
    }

    /// Whether the detail pass can visit this record at all.
    pub fn enrichable(&self) -> bool {
        !self.url.is_empty()
    }
}
