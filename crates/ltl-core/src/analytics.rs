//! Aggregations over a labeled dataset, backing the dashboard views.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::funnel::FunnelStage;
use crate::posts::LabeledPost;

/// Row filter. Empty lists and `None` bounds match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFilter {
    #[serde(default)]
    pub stages: Vec<FunnelStage>,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub author: Option<String>,
    pub since: Option<NaiveDate>,
    /// Inclusive: the whole `until` day matches.
    pub until: Option<NaiveDate>,
}

impl PostFilter {
    #[must_use]
    pub fn matches(&self, post: &LabeledPost) -> bool {
        if !self.stages.is_empty() && !self.stages.contains(&post.funnel_stage) {
            return false;
        }
        if !self.emotions.is_empty()
            && !self
                .emotions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&post.sentiment_label))
        {
            return false;
        }
        if !self.platforms.is_empty()
            && !self
                .platforms
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&post.platform))
        {
            return false;
        }
        if let Some(author) = &self.author {
            if !author.eq_ignore_ascii_case(&post.author) {
                return false;
            }
        }
        within_dates(&post.timestamp, self.since, self.until)
    }
}

/// `true` when `ts` falls on or after `since` and on or before `until`.
#[must_use]
pub fn within_dates(ts: &DateTime<Utc>, since: Option<NaiveDate>, until: Option<NaiveDate>) -> bool {
    let day = ts.date_naive();
    since.is_none_or(|s| day >= s) && until.is_none_or(|u| day <= u)
}

/// Apply `filter`, preserving dataset order.
#[must_use]
pub fn filter_posts<'a>(posts: &'a [LabeledPost], filter: &PostFilter) -> Vec<&'a LabeledPost> {
    posts.iter().filter(|p| filter.matches(p)).collect()
}

/// Monday of the ISO week containing `ts`.
#[must_use]
pub fn week_start(ts: &DateTime<Utc>) -> NaiveDate {
    let day = ts.date_naive();
    let offset = u64::from(day.weekday().num_days_from_monday());
    day.checked_sub_days(Days::new(offset)).unwrap_or(day)
}

/// Per-stage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub awareness: usize,
    pub consideration: usize,
    pub conversion: usize,
    pub loyalty: usize,
    pub advocacy: usize,
}

impl StageCounts {
    #[must_use]
    pub fn get(&self, stage: FunnelStage) -> usize {
        match stage {
            FunnelStage::Awareness => self.awareness,
            FunnelStage::Consideration => self.consideration,
            FunnelStage::Conversion => self.conversion,
            FunnelStage::Loyalty => self.loyalty,
            FunnelStage::Advocacy => self.advocacy,
        }
    }

    fn slot(&mut self, stage: FunnelStage) -> &mut usize {
        match stage {
            FunnelStage::Awareness => &mut self.awareness,
            FunnelStage::Consideration => &mut self.consideration,
            FunnelStage::Conversion => &mut self.conversion,
            FunnelStage::Loyalty => &mut self.loyalty,
            FunnelStage::Advocacy => &mut self.advocacy,
        }
    }

    pub fn add(&mut self, stage: FunnelStage) {
        *self.slot(stage) += 1;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        FunnelStage::ALL.iter().map(|s| self.get(*s)).sum()
    }

    fn accumulate(&mut self, other: &StageCounts) {
        for stage in FunnelStage::ALL {
            *self.slot(stage) += other.get(stage);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyStageCounts {
    pub week: NaiveDate,
    pub counts: StageCounts,
}

/// Stage totals across the whole slice.
#[must_use]
pub fn stage_totals<'a, I>(posts: I) -> StageCounts
where
    I: IntoIterator<Item = &'a LabeledPost>,
{
    let mut counts = StageCounts::default();
    for post in posts {
        counts.add(post.funnel_stage);
    }
    counts
}

/// Stage counts per week, oldest week first. Weeks without posts are omitted.
#[must_use]
pub fn weekly_stage_counts<'a, I>(posts: I) -> Vec<WeeklyStageCounts>
where
    I: IntoIterator<Item = &'a LabeledPost>,
{
    let mut by_week: BTreeMap<NaiveDate, StageCounts> = BTreeMap::new();
    for post in posts {
        by_week
            .entry(week_start(&post.timestamp))
            .or_default()
            .add(post.funnel_stage);
    }
    by_week
        .into_iter()
        .map(|(week, counts)| WeeklyStageCounts { week, counts })
        .collect()
}

/// Running totals of [`weekly_stage_counts`].
#[must_use]
pub fn cumulative_stage_counts(weekly: &[WeeklyStageCounts]) -> Vec<WeeklyStageCounts> {
    let mut running = StageCounts::default();
    weekly
        .iter()
        .map(|w| {
            running.accumulate(&w.counts);
            WeeklyStageCounts {
                week: w.week,
                counts: running,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionRate {
    pub week: NaiveDate,
    pub from: FunnelStage,
    pub to: FunnelStage,
    pub step: String,
    pub rate: f64,
}

/// Weekly stage-to-next-stage ratios (`to / from`).
///
/// These are aggregate volumes, not tracked users. A zero denominator yields
/// a rate of `0.0`.
#[must_use]
pub fn weekly_conversions(weekly: &[WeeklyStageCounts]) -> Vec<ConversionRate> {
    let mut rates = Vec::new();
    for w in weekly {
        for from in FunnelStage::ALL {
            let Some(to) = from.next() else { continue };
            let denom = w.counts.get(from);
            #[allow(clippy::cast_precision_loss)]
            let rate = if denom == 0 {
                0.0
            } else {
                w.counts.get(to) as f64 / denom as f64
            };
            rates.push(ConversionRate {
                week: w.week,
                from,
                to,
                step: format!("{to} / {from}"),
                rate,
            });
        }
    }
    rates
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaSummary {
    pub author: String,
    pub display_name: Option<String>,
    pub post_count: usize,
    pub latest_stage: FunnelStage,
    pub furthest_stage: FunnelStage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyStep {
    pub timestamp: DateTime<Utc>,
    pub stage: FunnelStage,
    pub emotion: String,
    pub text: String,
}

/// One author's path through the funnel, in time order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaJourney {
    pub author: String,
    pub steps: Vec<JourneyStep>,
    pub furthest_stage: FunnelStage,
    pub reached_advocacy: bool,
}

/// Authors ranked by post count (ties by handle).
#[must_use]
pub fn persona_summaries(posts: &[LabeledPost]) -> Vec<PersonaSummary> {
    let mut by_author: BTreeMap<String, Vec<&LabeledPost>> = BTreeMap::new();
    for post in posts {
        by_author
            .entry(post.author.to_lowercase())
            .or_default()
            .push(post);
    }

    let mut summaries: Vec<PersonaSummary> = by_author
        .into_values()
        .filter_map(|mut rows| {
            rows.sort_by_key(|p| p.timestamp);
            let latest = *rows.last()?;
            let furthest = rows.iter().map(|p| p.funnel_stage).max()?;
            Some(PersonaSummary {
                author: latest.author.clone(),
                display_name: latest.author_display_name.clone(),
                post_count: rows.len(),
                latest_stage: latest.funnel_stage,
                furthest_stage: furthest,
            })
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.post_count
            .cmp(&a.post_count)
            .then_with(|| a.author.cmp(&b.author))
    });
    summaries
}

/// Journey for `author`, or `None` if they have no posts in the dataset.
#[must_use]
pub fn persona_journey(posts: &[LabeledPost], author: &str) -> Option<PersonaJourney> {
    let mut rows: Vec<&LabeledPost> = posts
        .iter()
        .filter(|p| p.author.eq_ignore_ascii_case(author))
        .collect();
    rows.sort_by_key(|p| p.timestamp);

    let furthest = rows.iter().map(|p| p.funnel_stage).max()?;
    let steps = rows
        .iter()
        .map(|p| JourneyStep {
            timestamp: p.timestamp,
            stage: p.funnel_stage,
            emotion: p.sentiment_label.clone(),
            text: p.text.clone(),
        })
        .collect();

    Some(PersonaJourney {
        author: rows[0].author.clone(),
        steps,
        furthest_stage: furthest,
        reached_advocacy: furthest == FunnelStage::Advocacy,
    })
}

/// Up to `n` distinct rows chosen uniformly at random, in dataset order.
pub fn sample_posts<'a, R: Rng + ?Sized>(
    posts: &[&'a LabeledPost],
    n: usize,
    rng: &mut R,
) -> Vec<&'a LabeledPost> {
    let amount = n.min(posts.len());
    let mut picked: Vec<usize> = rand::seq::index::sample(rng, posts.len(), amount).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| posts[i]).collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;

    use super::*;

    fn row(author: &str, day: u32, label: &str, stage: FunnelStage) -> LabeledPost {
        LabeledPost {
            id: format!("{author}-{day}-{label}"),
            text: format!("{label} post"),
            author: author.to_string(),
            author_display_name: None,
            timestamp: Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap(),
            query: "trekking poles".to_string(),
            uri: None,
            reply_count: None,
            repost_count: None,
            quote_count: None,
            like_count: None,
            embed_type: None,
            language: Some("en".to_string()),
            platform: "bluesky".to_string(),
            sentiment_label: label.to_string(),
            sentiment_confidence: 0.8,
            funnel_stage: stage,
        }
    }

    // 2025-03-03 is a Monday.
    fn dataset() -> Vec<LabeledPost> {
        vec![
            row("alice", 3, "curiosity", FunnelStage::Awareness),
            row("alice", 5, "desire", FunnelStage::Consideration),
            row("bob", 4, "neutral", FunnelStage::Awareness),
            row("alice", 11, "joy", FunnelStage::Advocacy),
            row("carol", 12, "admiration", FunnelStage::Loyalty),
        ]
    }

    #[test]
    fn week_start_is_monday() {
        let sunday = Utc.with_ymd_and_hms(2025, 3, 9, 23, 0, 0).unwrap();
        assert_eq!(
            week_start(&sunday),
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
        );
        let monday = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(
            week_start(&monday),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
    }

    #[test]
    fn weekly_counts_group_by_week() {
        let data = dataset();
        let weekly = weekly_stage_counts(&data);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].counts.awareness, 2);
        assert_eq!(weekly[0].counts.consideration, 1);
        assert_eq!(weekly[1].counts.advocacy, 1);
        assert_eq!(weekly[1].counts.loyalty, 1);
    }

    #[test]
    fn cumulative_counts_run_forward() {
        let data = dataset();
        let cumulative = cumulative_stage_counts(&weekly_stage_counts(&data));
        assert_eq!(cumulative[1].counts.awareness, 2);
        assert_eq!(cumulative[1].counts.total(), 5);
    }

    #[test]
    fn conversions_divide_next_by_current_and_guard_zero() {
        let data = dataset();
        let rates = weekly_conversions(&weekly_stage_counts(&data));
        // 4 transitions per week.
        assert_eq!(rates.len(), 8);
        let first = &rates[0];
        assert_eq!(first.from, FunnelStage::Awareness);
        assert_eq!(first.step, "Consideration / Awareness");
        assert!((first.rate - 0.5).abs() < f64::EPSILON);
        // Week 2 has no Awareness posts.
        assert!(rates[4].rate.abs() < f64::EPSILON);
    }

    #[test]
    fn filter_by_stage_author_and_dates() {
        let data = dataset();
        let filter = PostFilter {
            stages: vec![FunnelStage::Awareness],
            ..PostFilter::default()
        };
        assert_eq!(filter_posts(&data, &filter).len(), 2);

        let filter = PostFilter {
            author: Some("ALICE".to_string()),
            since: NaiveDate::from_ymd_opt(2025, 3, 5),
            until: NaiveDate::from_ymd_opt(2025, 3, 11),
            ..PostFilter::default()
        };
        let hits = filter_posts(&data, &filter);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|p| p.author == "alice"));
    }

    #[test]
    fn filter_by_emotion_is_case_insensitive() {
        let data = dataset();
        let filter = PostFilter {
            emotions: vec!["JOY".to_string()],
            ..PostFilter::default()
        };
        assert_eq!(filter_posts(&data, &filter).len(), 1);
    }

    #[test]
    fn personas_rank_by_post_count() {
        let data = dataset();
        let personas = persona_summaries(&data);
        assert_eq!(personas[0].author, "alice");
        assert_eq!(personas[0].post_count, 3);
        assert_eq!(personas[0].latest_stage, FunnelStage::Advocacy);
        assert_eq!(personas[1].author, "bob");
    }

    #[test]
    fn journey_is_chronological() {
        let data = dataset();
        let journey = persona_journey(&data, "alice").unwrap();
        let stages: Vec<FunnelStage> = journey.steps.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![
                FunnelStage::Awareness,
                FunnelStage::Consideration,
                FunnelStage::Advocacy
            ]
        );
        assert!(journey.reached_advocacy);
        assert!(persona_journey(&data, "nobody").is_none());
    }

    #[test]
    fn sample_is_bounded_and_distinct() {
        let data = dataset();
        let all: Vec<&LabeledPost> = data.iter().collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let picked = sample_posts(&all, 3, &mut rng);
        assert_eq!(picked.len(), 3);
        let mut ids: Vec<&str> = picked.iter().map(|p| p.id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);

        assert_eq!(sample_posts(&all, 50, &mut rng).len(), data.len());
        assert!(sample_posts(&[], 5, &mut rng).is_empty());
    }

    #[test]
    fn empty_dataset_aggregates_to_nothing() {
        let empty: Vec<LabeledPost> = Vec::new();
        assert!(weekly_stage_counts(&empty).is_empty());
        assert!(persona_summaries(&empty).is_empty());
        assert_eq!(stage_totals(&empty).total(), 0);
    }
}
