use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};

use crate::config::{truncate_to_minute, DeskConfig};
use crate::error::{DeskError, ValidationError};
use crate::html_sanitizer::sanitize_html;
use crate::media::{MediaFile, MediaStore};
use crate::models::field::{ContentField, FieldKind};
use crate::models::post::{BlogDraft, PostId, PostStatus, PublishedPost, TrackingId};
use crate::preview::PreviewedDraft;
use crate::youtube;

/// Asked before a populated media or link field is overwritten.
pub trait ConfirmReplace {
    fn confirm_replace(&mut self, kind: FieldKind, current: &str) -> bool;
}

impl<F> ConfirmReplace for F
where
    F: FnMut(FieldKind, &str) -> bool,
{
    fn confirm_replace(&mut self, kind: FieldKind, current: &str) -> bool {
        self(kind, current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced,
    /// The user declined; the field still holds its old value.
    Kept,
    /// The new value equals the current one; nothing was asked or changed.
    Unchanged,
}

/// Working copy of a post being created or edited.
///
/// The editor holds one media-store reference for every image/video value in
/// its draft and gives them back on `reset_to_blank`, `discard`, or when a value
/// is replaced.
pub struct BlogDraftEditor {
    config: DeskConfig,
    draft: BlogDraft,
    origin: Option<PostId>,
}

impl BlogDraftEditor {
    pub fn new(config: &DeskConfig) -> Self {
        BlogDraftEditor {
            draft: blank_draft(config),
            config: config.clone(),
            origin: None,
        }
    }

    /// Open an editor on an existing post.
    pub fn editing(config: &DeskConfig, post: &PublishedPost, media: &mut dyn MediaStore) -> Self {
        let mut editor = BlogDraftEditor::new(config);
        editor.seed_from_existing(post, media);
        editor
    }

    /// Re-open a draft coming back from the preview stage.
    pub fn reopen(config: &DeskConfig, previewed: PreviewedDraft, media: &mut dyn MediaStore) -> Self {
        for reference in previewed.draft.fields.media_refs() {
            media.retain(reference);
        }
        BlogDraftEditor {
            config: config.clone(),
            draft: previewed.draft,
            origin: previewed.origin,
        }
    }

    pub fn draft(&self) -> &BlogDraft {
        &self.draft
    }

    /// Id of the listing entry this draft will update, if any.
    pub fn origin(&self) -> Option<PostId> {
        self.origin
    }

    pub fn is_editing_existing(&self) -> bool {
        self.origin.is_some()
    }

    /// Replace the working copy with everything from `post` except its id.
    pub fn seed_from_existing(&mut self, post: &PublishedPost, media: &mut dyn MediaStore) {
        self.release_media(media);
        self.draft = post.to_draft();
        if self.draft.tracking_id.is_none() {
            self.draft.tracking_id = Some(TrackingId::generate());
        }
        for reference in self.draft.fields.media_refs() {
            media.retain(reference);
        }
        self.origin = Some(post.id);
        debug!("Editor seeded from post {}", post.id);
    }

    /// Back to the default form. An edit in progress keeps targeting its post.
    pub fn reset_to_blank(&mut self, media: &mut dyn MediaStore) {
        self.release_media(media);
        self.draft = blank_draft(&self.config);
    }

    /// Abandon the draft. The listing is never touched.
    pub fn discard(mut self, media: &mut dyn MediaStore) {
        self.release_media(media);
        debug!("Draft '{}' discarded", self.draft.title);
    }

    fn release_media(&mut self, media: &mut dyn MediaStore) {
        for reference in self.draft.fields.media_refs() {
            media.release(reference);
        }
    }

    // ── Metadata ────────────────────────────────────────

    pub fn set_title(&mut self, title: &str) {
        self.draft.title = title.to_string();
    }

    pub fn set_author(&mut self, author: &str) {
        self.draft.author = author.to_string();
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.draft.date = date;
    }

    pub fn set_status(&mut self, status: PostStatus) {
        self.draft.status = status;
    }

    // ── Scheduling ──────────────────────────────────────

    pub fn is_scheduled(&self) -> bool {
        self.draft.scheduled_publish_time.is_some()
    }

    /// Enabling stamps the current local time; disabling clears it.
    pub fn toggle_scheduled(&mut self, enabled: bool) {
        self.draft.scheduled_publish_time = if enabled {
            Some(self.config.local_now())
        } else {
            None
        };
    }

    pub fn set_scheduled_publish_time(&mut self, at: NaiveDateTime) -> Result<(), DeskError> {
        if !self.is_scheduled() {
            return Err(DeskError::SchedulingDisabled);
        }
        self.draft.scheduled_publish_time = Some(truncate_to_minute(at));
        Ok(())
    }

    // ── Fields ──────────────────────────────────────────

    /// Add an empty block at the end. New content blocks start with the
    /// configured placeholder markup.
    pub fn append_field(&mut self, kind: FieldKind) -> usize {
        match kind {
            FieldKind::Content => self.draft.fields.append_field_with(placeholder(&self.config)),
            _ => self.draft.fields.append(kind),
        }
    }

    /// Store rich-text editor output. Markup is sanitized before it is kept.
    pub fn set_content(&mut self, index: usize, html: &str) -> Result<(), DeskError> {
        self.draft
            .fields
            .set_value_checked(index, FieldKind::Content, sanitize_html(html))?;
        Ok(())
    }

    pub fn replace_image(
        &mut self,
        index: usize,
        file: MediaFile,
        media: &mut dyn MediaStore,
        confirm: &mut dyn ConfirmReplace,
    ) -> Result<ReplaceOutcome, DeskError> {
        self.replace_media(index, FieldKind::Image, file, media, confirm)
    }

    pub fn replace_video(
        &mut self,
        index: usize,
        file: MediaFile,
        media: &mut dyn MediaStore,
        confirm: &mut dyn ConfirmReplace,
    ) -> Result<ReplaceOutcome, DeskError> {
        self.replace_media(index, FieldKind::Video, file, media, confirm)
    }

    fn replace_media(
        &mut self,
        index: usize,
        kind: FieldKind,
        file: MediaFile,
        media: &mut dyn MediaStore,
        confirm: &mut dyn ConfirmReplace,
    ) -> Result<ReplaceOutcome, DeskError> {
        let found = self.draft.fields.kind_at(index)?;
        if found != kind {
            return Err(DeskError::KindMismatch { expected: kind, found });
        }
        if !self.approve(index, kind, confirm) {
            return Ok(ReplaceOutcome::Kept);
        }

        let reference = media.create(kind, file)?;
        let previous = self.draft.fields.set_value(index, reference)?;
        if !previous.trim().is_empty() {
            media.release(&previous);
        }
        Ok(ReplaceOutcome::Replaced)
    }

    /// Store a YouTube link. Links that yield no video id are still kept;
    /// the preview simply has nothing to embed for them.
    pub fn set_youtube_url(
        &mut self,
        index: usize,
        url: &str,
        confirm: &mut dyn ConfirmReplace,
    ) -> Result<ReplaceOutcome, DeskError> {
        let found = self.draft.fields.kind_at(index)?;
        if found != FieldKind::YouTubeLink {
            return Err(DeskError::KindMismatch { expected: FieldKind::YouTubeLink, found });
        }
        let url = url.trim();
        let current = self.draft.fields.get(index).map(|f| f.value()).unwrap_or("");
        if current == url {
            return Ok(ReplaceOutcome::Unchanged);
        }
        if !self.approve(index, FieldKind::YouTubeLink, confirm) {
            return Ok(ReplaceOutcome::Kept);
        }
        if !url.is_empty() && youtube::extract_id(url).is_none() {
            debug!("No YouTube video id in '{}', keeping the link without an embed", url);
        }
        self.draft.fields.set_value(index, url)?;
        Ok(ReplaceOutcome::Replaced)
    }

    /// Video id for a YouTube field, if its link is recognised.
    pub fn youtube_id(&self, index: usize) -> Option<String> {
        match self.draft.fields.get(index)? {
            f if f.kind() == FieldKind::YouTubeLink => youtube::extract_id(f.value()),
            _ => None,
        }
    }

    fn approve(&self, index: usize, kind: FieldKind, confirm: &mut dyn ConfirmReplace) -> bool {
        match self.draft.fields.get(index) {
            Some(field) if !field.is_empty() => confirm.confirm_replace(kind, field.value()),
            _ => true,
        }
    }

    // ── Submission ──────────────────────────────────────

    /// Gate to the preview stage: every image block must have media attached.
    pub fn submit_for_preview(&mut self) -> Result<PreviewedDraft, DeskError> {
        let missing = self.draft.fields.images_missing_value();
        if !missing.is_empty() {
            debug!("Draft '{}' blocked, images missing at {:?}", self.draft.title, missing);
            return Err(ValidationError::MissingImage { indices: missing }.into());
        }
        let tracking = self.draft.ensure_tracking_id().clone();
        info!("Draft '{}' ({}) sent to preview", self.draft.title, tracking);
        Ok(PreviewedDraft {
            origin: self.origin,
            draft: self.draft.clone(),
        })
    }
}

/// Default form: empty title and author, today's date, one image block and
/// one content block, no schedule.
fn blank_draft(config: &DeskConfig) -> BlogDraft {
    let mut draft = BlogDraft::new(config.today());
    draft.tracking_id = Some(TrackingId::generate());
    draft.fields.append(FieldKind::Image);
    draft.fields.append_field_with(placeholder(config));
    draft
}

fn placeholder(config: &DeskConfig) -> ContentField {
    ContentField::Content {
        html: sanitize_html(&config.default_content_html),
    }
}
