use log::{info, warn};

use crate::listing::{BlogListing, MergeOutcome};
use crate::media::MediaStore;
use crate::preview::PreviewedDraft;

/// The only way a draft becomes listing state.
#[derive(Debug, Default)]
pub struct BlogPublishCoordinator {
    duplicates_dropped: usize,
}

impl BlogPublishCoordinator {
    pub fn new() -> Self {
        BlogPublishCoordinator::default()
    }

    /// Tag the draft with a tracking id (if it has none) and merge it.
    ///
    /// Media ownership follows the merge: the stored version holds its own
    /// references and a replaced version gives its references back.
    pub fn publish(
        &mut self,
        previewed: PreviewedDraft,
        listing: &mut BlogListing,
        media: &mut dyn MediaStore,
    ) -> MergeOutcome {
        let PreviewedDraft { origin, mut draft } = previewed;
        let tracking = draft.ensure_tracking_id().clone();

        let incoming_refs: Vec<String> = draft
            .fields
            .media_refs()
            .into_iter()
            .map(String::from)
            .collect();
        let replaced_refs: Vec<String> = origin
            .and_then(|id| listing.get(id))
            .map(|p| p.post.fields.media_refs().into_iter().map(String::from).collect())
            .unwrap_or_default();

        let outcome = listing.merge(origin, draft);
        match outcome {
            MergeOutcome::Inserted(id) | MergeOutcome::Updated(id) => {
                for reference in &incoming_refs {
                    media.retain(reference);
                }
                if let MergeOutcome::Updated(_) = outcome {
                    for reference in &replaced_refs {
                        media.release(reference);
                    }
                }
                info!("Submission {} stored as post {}", tracking, id);
            }
            MergeOutcome::Duplicate(id) => {
                self.duplicates_dropped += 1;
                warn!("Submission {} already stored as post {}, ignored", tracking, id);
            }
        }
        outcome
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaFile, ObjectUrlTable};
    use crate::models::field::{ContentField, FieldKind};
    use crate::models::post::BlogDraft;
    use chrono::NaiveDate;

    fn previewed(origin: Option<i64>, title: &str, image: &str) -> PreviewedDraft {
        let mut draft = BlogDraft::new(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        draft.title = title.to_string();
        draft.fields = vec![ContentField::Image { src: image.to_string() }].into();
        PreviewedDraft { origin, draft }
    }

    #[test]
    fn test_publish_assigns_missing_tracking_id() {
        let mut listing = BlogListing::new(true);
        let mut media = ObjectUrlTable::new("blob:blogdesk");
        let mut coordinator = BlogPublishCoordinator::new();

        let outcome = coordinator.publish(previewed(None, "a", "/img/a.jpg"), &mut listing, &mut media);
        assert_eq!(outcome, MergeOutcome::Inserted(1));
        assert!(listing.get(1).unwrap().post.tracking_id.is_some());
    }

    #[test]
    fn test_republishing_same_submission_is_noop() {
        let mut listing = BlogListing::new(true);
        let mut media = ObjectUrlTable::new("blob:blogdesk");
        let mut coordinator = BlogPublishCoordinator::new();

        let mut p = previewed(None, "a", "/img/a.jpg");
        p.draft.ensure_tracking_id();
        coordinator.publish(p.clone(), &mut listing, &mut media);
        let outcome = coordinator.publish(p, &mut listing, &mut media);

        assert_eq!(outcome, MergeOutcome::Duplicate(1));
        assert_eq!(listing.len(), 1);
        assert_eq!(coordinator.duplicates_dropped(), 1);
    }

    #[test]
    fn test_media_ownership_moves_to_listing() {
        let mut listing = BlogListing::new(true);
        let mut media = ObjectUrlTable::new("blob:blogdesk");
        let mut coordinator = BlogPublishCoordinator::new();

        // The editor's hold
        let old = media.create(FieldKind::Image, MediaFile::new("a.png", vec![1])).unwrap();
        coordinator.publish(previewed(None, "a", &old), &mut listing, &mut media);
        // Editor goes away, listing keeps the image alive
        media.release(&old);
        assert!(media.is_live(&old));

        let new = media.create(FieldKind::Image, MediaFile::new("b.png", vec![2])).unwrap();
        coordinator.publish(previewed(Some(1), "a", &new), &mut listing, &mut media);
        media.release(&new);

        assert!(!media.is_live(&old));
        assert!(media.is_live(&new));
        assert_eq!(listing.get(1).unwrap().post.fields.first_image(), Some(new.as_str()));
    }
}
