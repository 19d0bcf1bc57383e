//! Blog authoring pipeline: draft editing, read-only preview, and publishing
//! into an id-keyed listing with duplicate suppression.

pub mod boot;
pub mod config;
pub mod editor;
pub mod error;
pub mod html_sanitizer;
pub mod listing;
pub mod media;
pub mod models;
pub mod preview;
pub mod publish;
pub mod workflow;
pub mod youtube;

pub use config::DeskConfig;
pub use editor::{BlogDraftEditor, ConfirmReplace, ReplaceOutcome};
pub use error::{DeskError, ValidationError};
pub use listing::{BlogListing, MergeOutcome};
pub use media::{MediaFile, MediaStore, ObjectUrlTable};
pub use models::field::{ContentField, ContentFields, FieldKind};
pub use models::post::{BlogDraft, PostId, PostStatus, PublishedPost, TrackingId};
pub use preview::{BlogPreviewRenderer, PreviewedDraft};
pub use publish::BlogPublishCoordinator;
pub use workflow::{BlogDesk, NavigationRequest, Route};
