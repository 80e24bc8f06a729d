use chrono::TimeZone;

use super::*;
use crate::types::{EmbedView, PostRecord, ProfileView};

fn view(uri: &str, text: &str, created_at: &str, langs: Option<&[&str]>) -> PostView {
    PostView {
        uri: uri.to_string(),
        author: ProfileView {
            handle: "walker.bsky.social".to_string(),
            display_name: Some("Walker".to_string()),
        },
        record: PostRecord {
            text: text.to_string(),
            created_at: Some(created_at.to_string()),
            langs: langs.map(|l| l.iter().map(|s| (*s).to_string()).collect()),
        },
        indexed_at: None,
        reply_count: Some(0),
        repost_count: Some(1),
        quote_count: None,
        like_count: Some(4),
        embed: Some(EmbedView {
            kind: Some("app.bsky.embed.external#view".to_string()),
        }),
    }
}

fn options() -> NormalizeOptions {
    NormalizeOptions {
        query: "trekking poles".to_string(),
        language: Some("en".to_string()),
        since: None,
        until: None,
    }
}

#[test]
fn strip_urls_removes_links() {
    assert_eq!(
        strip_urls("great poles https://shop.example/p?x=1 and www.example.com"),
        "great poles  and"
    );
    assert_eq!(strip_urls("https://only.example"), "");
}

#[test]
fn normalize_builds_post_fields() {
    let mut norm = Normalizer::new(options());
    let posts = norm.normalize_page(vec![view(
        "at://a/1",
        "love these poles https://t.co/x",
        "2025-03-04T12:00:00.000Z",
        Some(&["en"]),
    )]);

    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert_eq!(post.text, "love these poles");
    assert_eq!(post.author, "walker.bsky.social");
    assert_eq!(post.author_display_name.as_deref(), Some("Walker"));
    assert_eq!(
        post.timestamp,
        Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap()
    );
    assert_eq!(post.query, "trekking poles");
    assert_eq!(post.like_count, Some(4));
    assert_eq!(
        post.embed_type.as_deref(),
        Some("app.bsky.embed.external#view")
    );
    assert_eq!(post.language.as_deref(), Some("en"));
    assert_eq!(post.platform, "bluesky");
    assert_eq!(post.id.len(), 16);
}

#[test]
fn link_only_posts_are_dropped() {
    let mut norm = Normalizer::new(options());
    let posts = norm.normalize_page(vec![view(
        "at://a/1",
        "https://t.co/x",
        "2025-03-04T12:00:00Z",
        None,
    )]);
    assert!(posts.is_empty());
    assert_eq!(norm.stats().empty_text, 1);
}

#[test]
fn language_filter_matches_primary_subtag_and_keeps_undeclared() {
    let mut norm = Normalizer::new(options());
    let posts = norm.normalize_page(vec![
        view("at://a/1", "one", "2025-03-04T12:00:00Z", Some(&["en-US"])),
        view("at://a/2", "dos", "2025-03-04T12:00:00Z", Some(&["es"])),
        view("at://a/3", "three", "2025-03-04T12:00:00Z", None),
    ]);
    let texts: Vec<&str> = posts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "three"]);
    assert_eq!(norm.stats().wrong_language, 1);
}

#[test]
fn no_language_configured_keeps_everything() {
    let mut norm = Normalizer::new(NormalizeOptions {
        language: None,
        ..options()
    });
    let posts = norm.normalize_page(vec![view(
        "at://a/2",
        "dos",
        "2025-03-04T12:00:00Z",
        Some(&["es"]),
    )]);
    assert_eq!(posts.len(), 1);
}

#[test]
fn date_window_is_inclusive_of_until_day() {
    let mut norm = Normalizer::new(NormalizeOptions {
        since: NaiveDate::from_ymd_opt(2025, 3, 2),
        until: NaiveDate::from_ymd_opt(2025, 3, 4),
        ..options()
    });
    let posts = norm.normalize_page(vec![
        view("at://a/1", "before", "2025-03-01T23:59:59Z", None),
        view("at://a/2", "first day", "2025-03-02T00:00:00Z", None),
        view("at://a/3", "late on last day", "2025-03-04T23:30:00Z", None),
        view("at://a/4", "after", "2025-03-05T00:00:01Z", None),
    ]);
    let texts: Vec<&str> = posts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["first day", "late on last day"]);
    assert_eq!(norm.stats().out_of_window, 2);
}

#[test]
fn duplicates_across_pages_are_dropped() {
    let mut norm = Normalizer::new(options());
    let first = norm.normalize_page(vec![view("at://a/1", "hi", "2025-03-04T12:00:00Z", None)]);
    let second = norm.normalize_page(vec![
        view("at://a/1", "hi", "2025-03-04T12:00:00Z", None),
        view("at://a/2", "hello", "2025-03-04T12:00:00Z", None),
    ]);
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].text, "hello");
    assert_eq!(norm.stats().duplicate, 1);
    assert_eq!(norm.stats().kept, 2);
}

#[test]
fn unparseable_timestamp_is_counted() {
    let mut norm = Normalizer::new(options());
    let posts = norm.normalize_page(vec![view("at://a/1", "hi", "yesterday", None)]);
    assert!(posts.is_empty());
    assert_eq!(norm.stats().bad_timestamp, 1);
    assert_eq!(norm.stats().dropped(), 1);
}
