use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;

use crate::error::DeskError;
use crate::models::post::{BlogDraft, PostId, PostStatus, PublishTiming, PublishedPost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// An existing entry was replaced in place.
    Updated(PostId),
    Inserted(PostId),
    /// Same submission seen before; nothing changed. Holds the matching entry.
    Duplicate(PostId),
}

/// One line of the listing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRow {
    pub serial: usize,
    pub id: PostId,
    pub title: String,
    pub thumbnail: Option<String>,
    pub status: PostStatus,
    pub scheduled_for: Option<NaiveDateTime>,
}

/// The authoritative collection of published posts, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BlogListing {
    posts: Vec<PublishedPost>,
    /// Also treat an identical (title, author, date) as a duplicate.
    match_title_author_date: bool,
}

impl BlogListing {
    pub fn new(match_title_author_date: bool) -> Self {
        BlogListing {
            posts: Vec::new(),
            match_title_author_date,
        }
    }

    pub fn from_posts(posts: Vec<PublishedPost>, match_title_author_date: bool) -> Self {
        BlogListing {
            posts,
            match_title_author_date,
        }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, id: PostId) -> Option<&PublishedPost> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PublishedPost> {
        self.posts.iter()
    }

    pub fn next_id(&self) -> PostId {
        self.posts.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Reconcile an incoming draft:
    /// 1. `origin` names an existing entry: update it in place, keeping its id.
    /// 2. A previous submission matches: drop the incoming draft.
    /// 3. Otherwise append it under `max(id) + 1`.
    pub fn merge(&mut self, origin: Option<PostId>, incoming: BlogDraft) -> MergeOutcome {
        if let Some(id) = origin {
            if let Some(existing) = self.posts.iter_mut().find(|p| p.id == id) {
                existing.post = incoming;
                info!("Updated post {} '{}'", id, existing.post.title);
                return MergeOutcome::Updated(id);
            }
            debug!("Post {} no longer listed, treating edit as a new post", id);
        }

        if let Some(dup) = self.find_duplicate(&incoming) {
            debug!("Duplicate submission of '{}' dropped (matches post {})", incoming.title, dup);
            return MergeOutcome::Duplicate(dup);
        }

        let id = self.next_id();
        info!("Published post {} '{}'", id, incoming.title);
        self.posts.push(PublishedPost { id, post: incoming });
        MergeOutcome::Inserted(id)
    }

    fn find_duplicate(&self, incoming: &BlogDraft) -> Option<PostId> {
        self.posts
            .iter()
            .find(|p| {
                let same_tracking = match (&p.post.tracking_id, &incoming.tracking_id) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                };
                same_tracking || (self.match_title_author_date && p.post.same_identity(incoming))
            })
            .map(|p| p.id)
    }

    pub fn set_status(&mut self, id: PostId, status: PostStatus) -> Result<(), DeskError> {
        let post = self
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(DeskError::UnknownPost(id))?;
        post.post.status = status;
        info!("Post {} is now {}", id, status);
        Ok(())
    }

    /// Remove an entry for good and hand it back.
    pub fn remove(&mut self, id: PostId) -> Result<PublishedPost, DeskError> {
        let pos = self
            .posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(DeskError::UnknownPost(id))?;
        let removed = self.posts.remove(pos);
        info!("Deleted post {} '{}'", id, removed.post.title);
        Ok(removed)
    }

    /// Table rows, judged against `now` for the scheduled column.
    pub fn rows(&self, now: NaiveDateTime) -> Vec<ListingRow> {
        self.posts
            .iter()
            .enumerate()
            .map(|(i, p)| ListingRow {
                serial: i + 1,
                id: p.id,
                title: p.post.title.clone(),
                thumbnail: p.post.fields.first_image().map(|s| s.to_string()),
                status: p.post.status,
                scheduled_for: match p.post.timing(now) {
                    PublishTiming::Scheduled(at) => Some(at),
                    PublishTiming::Immediate => None,
                },
            })
            .collect()
    }

    // ── Snapshot ────────────────────────────────────────

    pub fn load(path: &Path, match_title_author_date: bool) -> Result<Self, DeskError> {
        if !path.exists() {
            debug!("No listing at {}, starting empty", path.display());
            return Ok(BlogListing::new(match_title_author_date));
        }
        let raw = fs::read_to_string(path)?;
        let posts: Vec<PublishedPost> = serde_json::from_str(&raw)?;
        Ok(BlogListing::from_posts(posts, match_title_author_date))
    }

    pub fn save(&self, path: &Path) -> Result<(), DeskError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.posts)?;
        fs::write(path, json)?;
        debug!("Saved {} posts to {}", self.posts.len(), path.display());
        Ok(())
    }
}
