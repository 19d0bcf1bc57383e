use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::field::ContentFields;

pub type PostId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Active,
    Inactive,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last value handed out by `TrackingId::generate`, in milliseconds.
static LAST_TRACKING_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Opaque per-submission idempotency token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    /// Derive a new id from the current time. Ids are strictly increasing
    /// within the process even if the clock stalls or steps backwards.
    pub fn generate() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = LAST_TRACKING_MILLIS.load(Ordering::SeqCst);
        loop {
            let next = now.max(last + 1);
            match LAST_TRACKING_MILLIS.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return TrackingId(format!("trk-{}", next)),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackingId {
    fn from(s: &str) -> Self {
        TrackingId(s.to_string())
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a post goes live right away or at a later scheduled time.
/// Advisory only: nothing enforces the deferred reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTiming {
    Immediate,
    Scheduled(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogDraft {
    pub title: String,
    pub date: NaiveDate,
    pub author: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_publish_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<TrackingId>,
    #[serde(default)]
    pub fields: ContentFields,
}

impl BlogDraft {
    pub fn new(date: NaiveDate) -> Self {
        BlogDraft {
            title: String::new(),
            date,
            author: String::new(),
            status: PostStatus::Active,
            scheduled_publish_time: None,
            tracking_id: None,
            fields: ContentFields::new(),
        }
    }

    /// Classify against `now`, a local timestamp in the site timezone.
    pub fn timing(&self, now: NaiveDateTime) -> PublishTiming {
        match self.scheduled_publish_time {
            Some(at) if at > now => PublishTiming::Scheduled(at),
            _ => PublishTiming::Immediate,
        }
    }

    /// Stamp a tracking id unless one is already attached. Returns the id in use.
    pub fn ensure_tracking_id(&mut self) -> &TrackingId {
        self.tracking_id.get_or_insert_with(TrackingId::generate)
    }

    pub(crate) fn same_identity(&self, other: &BlogDraft) -> bool {
        self.title == other.title && self.author == other.author && self.date == other.date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: PostId,
    #[serde(flatten)]
    pub post: BlogDraft,
}

impl PublishedPost {
    /// Working copy for the editor: everything except the id.
    pub fn to_draft(&self) -> BlogDraft {
        self.post.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").unwrap()
    }

    #[test]
    fn test_tracking_ids_strictly_increase() {
        let ids: Vec<TrackingId> = (0..50).map(|_| TrackingId::generate()).collect();
        let nums: Vec<i64> = ids
            .iter()
            .map(|t| t.as_str().trim_start_matches("trk-").parse().unwrap())
            .collect();
        assert!(nums.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_ensure_tracking_id_keeps_existing() {
        let mut draft = BlogDraft::new(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        draft.tracking_id = Some(TrackingId::from("trk-1"));
        assert_eq!(draft.ensure_tracking_id().as_str(), "trk-1");

        draft.tracking_id = None;
        let stamped = draft.ensure_tracking_id().clone();
        assert!(stamped.as_str().starts_with("trk-"));
        assert_eq!(draft.tracking_id, Some(stamped));
    }

    #[test]
    fn test_timing_classification() {
        let mut draft = BlogDraft::new(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        let now = ts("2024-04-01T10:00");
        assert_eq!(draft.timing(now), PublishTiming::Immediate);

        draft.scheduled_publish_time = Some(ts("2024-04-01T10:00"));
        assert_eq!(draft.timing(now), PublishTiming::Immediate);

        draft.scheduled_publish_time = Some(ts("2024-04-02T09:30"));
        assert_eq!(draft.timing(now), PublishTiming::Scheduled(ts("2024-04-02T09:30")));
    }

    #[test]
    fn test_published_post_json_is_flat() {
        let post = PublishedPost {
            id: 7,
            post: BlogDraft {
                title: "Hello".into(),
                author: "Ann".into(),
                ..BlogDraft::new(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap())
            },
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["title"], "Hello");
        assert_eq!(json["date"], "2024-04-01");
        assert_eq!(json["status"], "active");
        assert!(json.get("tracking_id").is_none());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(PostStatus::from_str("Inactive"), Some(PostStatus::Inactive));
        assert_eq!(PostStatus::from_str("draft"), None);
    }
}
