//! Term-frequency tracking over the post archives.
//!
//! Two CSV archives back the tracker: stratified samples of forum posts and
//! of reddit comments. Only the `timestamp` and `text` columns matter; any
//! other columns the exports carry are ignored. When an archive file is
//! absent the tracker falls back to deterministic generated placeholder data
//! so the endpoint stays demonstrable without the real datasets.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const FORUM_FILE: &str = "lgbt_stratified.csv";
const REDDIT_FILE: &str = "r4tran_stratified.csv";

const PLACEHOLDER_FORUM_POSTS: usize = 1000;
const PLACEHOLDER_REDDIT_COMMENTS: usize = 800;
const PLACEHOLDER_TERMS: &[&str] = &[
    "hon", "pooner", "boymoder", "gigahon", "passoid", "repressor", "youngshit", "midshit",
];

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read post archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse post archive: {0}")]
    Csv(#[from] csv::Error),
}

/// Source platform of a post.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    Forum,
    Reddit,
}

impl Platform {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "forum" | "lgbt" => Some(Platform::Forum),
            "reddit" | "r4tran" => Some(Platform::Reddit),
            _ => None,
        }
    }
}

/// The columns we keep from either CSV export.
#[derive(Debug, Deserialize)]
struct RawPost {
    timestamp: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug)]
struct Post {
    timestamp: DateTime<Utc>,
    /// Lowercased once at load; frequency queries are substring checks.
    text: String,
    platform: Platform,
}

/// Immutable, load-once view over both archives.
#[derive(Debug)]
pub struct PostArchive {
    posts: Vec<Post>,
    forum_posts: usize,
    reddit_comments: usize,
    placeholder: bool,
}

/// Counts for one term within one month bucket.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TermCount {
    pub term: String,
    pub forum: u64,
    pub reddit: u64,
    pub total: u64,
}

/// One `YYYY-MM` bucket of the frequency series.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyPoint {
    pub month: String,
    pub counts: Vec<TermCount>,
}

/// Summary shown on the tracker page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStats {
    pub forum_posts: usize,
    pub reddit_comments: usize,
    pub placeholder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_month: Option<String>,
}

impl PostArchive {
    /// Load both archives from `tracker_dir`, generating placeholder data
    /// for whichever file is missing.
    pub fn load(tracker_dir: impl AsRef<Path>) -> Result<Arc<Self>, ArchiveError> {
        let dir = tracker_dir.as_ref();
        let mut posts = Vec::new();
        let mut placeholder = false;

        for (file, platform) in [(FORUM_FILE, Platform::Forum), (REDDIT_FILE, Platform::Reddit)] {
            let path = dir.join(file);
            if path.exists() {
                let before = posts.len();
                read_csv(&path, platform, &mut posts)?;
                info!("loaded {} posts from {}", posts.len() - before, file);
            } else {
                warn!("{} not found; generating placeholder data", path.display());
                generate_placeholder(platform, &mut posts);
                placeholder = true;
            }
        }

        let forum_posts = posts.iter().filter(|p| p.platform == Platform::Forum).count();
        let reddit_comments = posts.len() - forum_posts;

        Ok(Arc::new(Self {
            posts,
            forum_posts,
            reddit_comments,
            placeholder,
        }))
    }

    /// Archive backed entirely by generated placeholder data.
    pub fn placeholder() -> Arc<Self> {
        let mut posts = Vec::new();
        generate_placeholder(Platform::Forum, &mut posts);
        generate_placeholder(Platform::Reddit, &mut posts);
        let forum_posts = posts.iter().filter(|p| p.platform == Platform::Forum).count();
        let reddit_comments = posts.len() - forum_posts;
        Arc::new(Self {
            posts,
            forum_posts,
            reddit_comments,
            placeholder: true,
        })
    }

    pub fn stats(&self) -> ArchiveStats {
        let mut months: Vec<String> = self.posts.iter().map(|p| month_key(&p.timestamp)).collect();
        months.sort();
        ArchiveStats {
            forum_posts: self.forum_posts,
            reddit_comments: self.reddit_comments,
            placeholder: self.placeholder,
            first_month: months.first().cloned(),
            last_month: months.last().cloned(),
        }
    }

    /// Monthly mention counts for each requested term, restricted to the
    /// selected platforms. Mentions are case-insensitive substring matches,
    /// one count per post regardless of repetition. Months sort ascending.
    pub fn frequency(&self, terms: &[String], platforms: &[Platform]) -> Vec<FrequencyPoint> {
        let needles: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        let mut months: BTreeMap<String, Vec<(u64, u64)>> = BTreeMap::new();

        for post in &self.posts {
            if !platforms.contains(&post.platform) {
                continue;
            }
            let bucket = months
                .entry(month_key(&post.timestamp))
                .or_insert_with(|| vec![(0, 0); needles.len()]);
            for (idx, needle) in needles.iter().enumerate() {
                if post.text.contains(needle) {
                    match post.platform {
                        Platform::Forum => bucket[idx].0 += 1,
                        Platform::Reddit => bucket[idx].1 += 1,
                    }
                }
            }
        }

        months
            .into_iter()
            .map(|(month, bucket)| FrequencyPoint {
                month,
                counts: terms
                    .iter()
                    .zip(bucket)
                    .map(|(term, (forum, reddit))| TermCount {
                        term: term.clone(),
                        forum,
                        reddit,
                        total: forum + reddit,
                    })
                    .collect(),
            })
            .collect()
    }
}

fn read_csv(path: &Path, platform: Platform, out: &mut Vec<Post>) -> Result<(), ArchiveError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    for record in reader.deserialize::<RawPost>() {
        let raw = record?;
        let Some(timestamp) = parse_timestamp(&raw.timestamp) else {
            continue;
        };
        out.push(Post {
            timestamp,
            text: raw.text.to_lowercase(),
            platform,
        });
    }
    Ok(())
}

/// Archives store either unix seconds or an RFC 3339 string.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn month_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m").to_string()
}

/// Deterministic stand-in data spanning 2023-2024, seeded per platform so
/// repeated runs chart identically.
fn generate_placeholder(platform: Platform, out: &mut Vec<Post>) {
    let (seed, count) = match platform {
        Platform::Forum => (0x666f72756du64, PLACEHOLDER_FORUM_POSTS),
        Platform::Reddit => (0x7265646469u64, PLACEHOLDER_REDDIT_COMMENTS),
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap().timestamp();
    let end = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap().timestamp();

    for _ in 0..count {
        let secs = rng.gen_range(start..end);
        let term = PLACEHOLDER_TERMS[rng.gen_range(0..PLACEHOLDER_TERMS.len())];
        out.push(Post {
            timestamp: Utc.timestamp_opt(secs, 0).single().unwrap_or_default(),
            text: format!("placeholder post mentioning {term} and other discussion"),
            platform,
        });
    }
}
