//! Application store for the authoring pipeline.
//!
//! Holds the listing, the media table and whatever draft is in flight. Screen
//! changes are explicit transitions on [`BlogDesk`]; a host router can mirror
//! them through [`NavigationRequest`].

use std::mem;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::DeskConfig;
use crate::editor::BlogDraftEditor;
use crate::error::DeskError;
use crate::listing::{BlogListing, ListingRow, MergeOutcome};
use crate::media::{MediaStore, ObjectUrlTable};
use crate::models::post::{PostId, PostStatus};
use crate::preview::{BlogPreviewRenderer, PreviewIntent, PreviewedDraft};
use crate::publish::BlogPublishCoordinator;

// ── Routes ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    #[serde(rename = "/blog")]
    Listing,
    #[serde(rename = "/createeditblog")]
    Editor,
    #[serde(rename = "/previewblog")]
    Preview,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Listing => "/blog",
            Route::Editor => "/createeditblog",
            Route::Preview => "/previewblog",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/blog" => Some(Route::Listing),
            "/createeditblog" => Some(Route::Editor),
            "/previewblog" => Some(Route::Preview),
            _ => None,
        }
    }
}

/// Route plus the draft it carries, as handed to a host router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub route: Route,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

// ── Screens ─────────────────────────────────────────────

pub enum Screen {
    Listing,
    Editing(BlogDraftEditor),
    /// The editor stays alive underneath so "return to edit" loses nothing.
    Previewing {
        editor: BlogDraftEditor,
        previewed: PreviewedDraft,
    },
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Listing => "listing",
            Screen::Editing(_) => "editor",
            Screen::Previewing { .. } => "preview",
        }
    }

    pub fn route(&self) -> Route {
        match self {
            Screen::Listing => Route::Listing,
            Screen::Editing(_) => Route::Editor,
            Screen::Previewing { .. } => Route::Preview,
        }
    }
}

pub struct BlogDesk<M: MediaStore = ObjectUrlTable> {
    config: DeskConfig,
    listing: BlogListing,
    media: M,
    coordinator: BlogPublishCoordinator,
    screen: Screen,
}

impl BlogDesk<ObjectUrlTable> {
    pub fn new(config: DeskConfig, listing: BlogListing) -> Self {
        let media = ObjectUrlTable::new(&config.media_origin);
        BlogDesk::with_media(config, listing, media)
    }
}

impl<M: MediaStore> BlogDesk<M> {
    pub fn with_media(config: DeskConfig, listing: BlogListing, media: M) -> Self {
        BlogDesk {
            config,
            listing,
            media,
            coordinator: BlogPublishCoordinator::new(),
            screen: Screen::Listing,
        }
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn listing(&self) -> &BlogListing {
        &self.listing
    }

    pub fn into_listing(self) -> BlogListing {
        self.listing
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn rows(&self) -> Vec<ListingRow> {
        self.listing.rows(self.config.local_now())
    }

    // ── Listing actions ─────────────────────────────────

    /// Open a blank editor.
    pub fn create_post(&mut self) -> Result<&mut BlogDraftEditor, DeskError> {
        self.expect_screen("listing")?;
        self.screen = Screen::Editing(BlogDraftEditor::new(&self.config));
        self.editor_mut()
    }

    /// Open an editor seeded from a listed post.
    pub fn edit_post(&mut self, id: PostId) -> Result<&mut BlogDraftEditor, DeskError> {
        self.expect_screen("listing")?;
        let post = self.listing.get(id).ok_or(DeskError::UnknownPost(id))?;
        let editor = BlogDraftEditor::editing(&self.config, post, &mut self.media);
        self.screen = Screen::Editing(editor);
        self.editor_mut()
    }

    pub fn set_status(&mut self, id: PostId, status: PostStatus) -> Result<(), DeskError> {
        self.listing.set_status(id, status)
    }

    /// Delete a post and give back the media it held.
    pub fn remove(&mut self, id: PostId) -> Result<(), DeskError> {
        let removed = self.listing.remove(id)?;
        for reference in removed.post.fields.media_refs() {
            self.media.release(reference);
        }
        Ok(())
    }

    /// Read-only view of a listed post.
    pub fn preview_published(&self, id: PostId) -> Result<String, DeskError> {
        let post = self.listing.get(id).ok_or(DeskError::UnknownPost(id))?;
        Ok(BlogPreviewRenderer::new(&self.config).render_html(&post.post))
    }

    // ── Editor actions ──────────────────────────────────

    pub fn editor_mut(&mut self) -> Result<&mut BlogDraftEditor, DeskError> {
        let current = self.screen.name();
        match &mut self.screen {
            Screen::Editing(editor) => Ok(editor),
            _ => Err(DeskError::WrongScreen { expected: "editor", current }),
        }
    }

    /// Editor together with the media store, for uploads and resets.
    pub fn editing(&mut self) -> Result<(&mut BlogDraftEditor, &mut M), DeskError> {
        let current = self.screen.name();
        match &mut self.screen {
            Screen::Editing(editor) => Ok((editor, &mut self.media)),
            _ => Err(DeskError::WrongScreen { expected: "editor", current }),
        }
    }

    /// Validate the draft and move to the preview screen. A rejected draft
    /// stays in the editor.
    pub fn submit_for_preview(&mut self) -> Result<&PreviewedDraft, DeskError> {
        let mut editor = match mem::replace(&mut self.screen, Screen::Listing) {
            Screen::Editing(editor) => editor,
            other => {
                let current = other.name();
                self.screen = other;
                return Err(DeskError::WrongScreen { expected: "editor", current });
            }
        };
        match editor.submit_for_preview() {
            Ok(previewed) => {
                self.screen = Screen::Previewing { editor, previewed };
                self.previewed()
            }
            Err(e) => {
                self.screen = Screen::Editing(editor);
                Err(e)
            }
        }
    }

    // ── Preview actions ─────────────────────────────────

    pub fn previewed(&self) -> Result<&PreviewedDraft, DeskError> {
        match &self.screen {
            Screen::Previewing { previewed, .. } => Ok(previewed),
            other => Err(DeskError::WrongScreen { expected: "preview", current: other.name() }),
        }
    }

    pub fn render_preview(&self) -> Result<String, DeskError> {
        let previewed = self.previewed()?;
        Ok(BlogPreviewRenderer::new(&self.config).render_html(&previewed.draft))
    }

    pub fn return_to_edit(&mut self) -> Result<&mut BlogDraftEditor, DeskError> {
        match mem::replace(&mut self.screen, Screen::Listing) {
            Screen::Previewing { editor, .. } => {
                self.screen = Screen::Editing(editor);
                self.editor_mut()
            }
            other => {
                let current = other.name();
                self.screen = other;
                Err(DeskError::WrongScreen { expected: "preview", current })
            }
        }
    }

    /// Hand the previewed draft to the coordinator and go back to the listing.
    pub fn publish(&mut self) -> Result<MergeOutcome, DeskError> {
        match mem::replace(&mut self.screen, Screen::Listing) {
            Screen::Previewing { editor, previewed } => {
                let outcome = self
                    .coordinator
                    .publish(previewed, &mut self.listing, &mut self.media);
                editor.discard(&mut self.media);
                Ok(outcome)
            }
            other => {
                let current = other.name();
                self.screen = other;
                Err(DeskError::WrongScreen { expected: "preview", current })
            }
        }
    }

    pub fn choose(&mut self, intent: PreviewIntent) -> Result<Option<MergeOutcome>, DeskError> {
        match intent {
            PreviewIntent::ReturnToEdit => self.return_to_edit().map(|_| None),
            PreviewIntent::Publish => self.publish().map(Some),
        }
    }

    /// Leave the editor or preview without publishing.
    pub fn close(&mut self) {
        self.switch_screen(Screen::Listing);
    }

    /// Install `next` and discard the draft it supersedes. `next` must already
    /// hold its own media references.
    fn switch_screen(&mut self, next: Screen) {
        match mem::replace(&mut self.screen, next) {
            Screen::Listing => {}
            Screen::Editing(editor) | Screen::Previewing { editor, .. } => {
                editor.discard(&mut self.media);
                debug!("Discarded draft, now on {}", self.screen.name());
            }
        }
    }

    // ── Navigation ──────────────────────────────────────

    /// Where a host router should be, and the draft it should carry.
    pub fn navigation(&self) -> Result<NavigationRequest, DeskError> {
        let state = match &self.screen {
            Screen::Listing => None,
            Screen::Editing(editor) => Some(
                PreviewedDraft {
                    origin: editor.origin(),
                    draft: editor.draft().clone(),
                }
                .to_navigation_state()?,
            ),
            Screen::Previewing { previewed, .. } => Some(previewed.to_navigation_state()?),
        };
        Ok(NavigationRequest {
            route: self.screen.route(),
            state,
        })
    }

    /// Follow a request coming from the host router. A request carrying a
    /// draft replaces whatever draft is in flight.
    pub fn navigate(&mut self, request: NavigationRequest) -> Result<(), DeskError> {
        let carried = request
            .state
            .map(PreviewedDraft::from_navigation_state)
            .transpose()?;

        match (request.route, carried) {
            (Route::Listing, _) => self.close(),
            (Route::Editor, None) => {
                if !matches!(self.screen, Screen::Editing(_)) {
                    self.close();
                    self.create_post()?;
                }
            }
            (Route::Editor, Some(previewed)) => {
                let editor = BlogDraftEditor::reopen(&self.config, previewed, &mut self.media);
                self.switch_screen(Screen::Editing(editor));
            }
            (Route::Preview, None) => {
                if !matches!(self.screen, Screen::Previewing { .. }) {
                    return Err(DeskError::NothingToPreview);
                }
            }
            (Route::Preview, Some(previewed)) => {
                let editor = BlogDraftEditor::reopen(&self.config, previewed.clone(), &mut self.media);
                self.switch_screen(Screen::Previewing { editor, previewed });
            }
        }
        info!("Navigated to {}", request.route.path());
        Ok(())
    }

    fn expect_screen(&self, expected: &'static str) -> Result<(), DeskError> {
        let current = self.screen.name();
        if current == expected {
            Ok(())
        } else {
            Err(DeskError::WrongScreen { expected, current })
        }
    }
}
