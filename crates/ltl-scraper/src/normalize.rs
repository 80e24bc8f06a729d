//! Turns raw post views into clean [`Post`] rows.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use ltl_core::analytics::within_dates;
use ltl_core::{post_id, Post, PLATFORM_BLUESKY};
use regex::Regex;

use crate::types::PostView;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("valid regex"));

/// Remove links and surrounding whitespace from post text.
#[must_use]
pub fn strip_urls(text: &str) -> String {
    URL_RE.replace_all(text, "").trim().to_string()
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    pub query: String,
    /// Keep only posts declaring this language. Posts with no declared
    /// languages are kept.
    pub language: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

/// Why rows were dropped during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub kept: usize,
    pub empty_text: usize,
    pub bad_timestamp: usize,
    pub out_of_window: usize,
    pub wrong_language: usize,
    pub duplicate: usize,
}

impl NormalizeStats {
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.empty_text
            + self.bad_timestamp
            + self.out_of_window
            + self.wrong_language
            + self.duplicate
    }
}

/// Stateful normalizer; remembers ids across pages for deduplication.
#[derive(Debug)]
pub struct Normalizer {
    options: NormalizeOptions,
    seen: HashSet<String>,
    stats: NormalizeStats,
}

impl Normalizer {
    #[must_use]
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            options,
            seen: HashSet::new(),
            stats: NormalizeStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> NormalizeStats {
        self.stats
    }

    /// Normalize one page, preserving order.
    pub fn normalize_page(&mut self, page: Vec<PostView>) -> Vec<Post> {
        page.into_iter().filter_map(|view| self.normalize(view)).collect()
    }

    fn normalize(&mut self, view: PostView) -> Option<Post> {
        if !language_matches(view.record.langs.as_deref(), self.options.language.as_deref()) {
            self.stats.wrong_language += 1;
            return None;
        }

        let text = strip_urls(&view.record.text);
        if text.is_empty() {
            self.stats.empty_text += 1;
            return None;
        }

        let raw_ts = view
            .record
            .created_at
            .as_deref()
            .or(view.indexed_at.as_deref());
        let Some(timestamp) = raw_ts.and_then(parse_timestamp) else {
            tracing::debug!(uri = %view.uri, "dropping post with unparseable timestamp");
            self.stats.bad_timestamp += 1;
            return None;
        };

        if !within_dates(&timestamp, self.options.since, self.options.until) {
            self.stats.out_of_window += 1;
            return None;
        }

        let id = post_id(Some(&view.uri), &view.author.handle, &timestamp, &text);
        if !self.seen.insert(id.clone()) {
            self.stats.duplicate += 1;
            return None;
        }

        self.stats.kept += 1;
        let language = view
            .record
            .langs
            .as_ref()
            .and_then(|langs| langs.first().cloned());

        Some(Post {
            id,
            text,
            author: view.author.handle,
            author_display_name: view.author.display_name.filter(|n| !n.trim().is_empty()),
            timestamp,
            query: self.options.query.clone(),
            uri: Some(view.uri),
            reply_count: view.reply_count,
            repost_count: view.repost_count,
            quote_count: view.quote_count,
            like_count: view.like_count,
            embed_type: view.embed.and_then(|e| e.kind),
            language,
            platform: PLATFORM_BLUESKY.to_string(),
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `en` matches `en` and `en-US`; an undeclared language always matches.
fn language_matches(langs: Option<&[String]>, wanted: Option<&str>) -> bool {
    let (Some(langs), Some(wanted)) = (langs, wanted) else {
        return true;
    };
    if langs.is_empty() {
        return true;
    }
    langs.iter().any(|lang| {
        let primary = lang.split(['-', '_']).next().unwrap_or(lang);
        lang.eq_ignore_ascii_case(wanted) || primary.eq_ignore_ascii_case(wanted)
    })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
