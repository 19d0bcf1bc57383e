use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::DeskConfig;
use crate::error::DeskError;
use crate::html_sanitizer::{html_escape, sanitize_html};
use crate::models::field::ContentField;
use crate::models::post::{BlogDraft, PostId, PublishTiming};
use crate::youtube;

/// A validated draft on its way from the editor to the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewedDraft {
    /// Listing entry to update; `None` for a new post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<PostId>,
    pub draft: BlogDraft,
}

impl PreviewedDraft {
    /// JSON payload carried by a navigation request.
    pub fn to_navigation_state(&self) -> Result<serde_json::Value, DeskError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_navigation_state(state: serde_json::Value) -> Result<Self, DeskError> {
        Ok(serde_json::from_value(state)?)
    }
}

/// What the user can do from the preview screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewIntent {
    ReturnToEdit,
    Publish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Byline {
    pub published_on: String,
    pub author: String,
}

/// One block of the read-only view, in the post's field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedBlock {
    Image {
        index: usize,
        src: String,
        /// Only the first image carries the date/author line.
        byline: Option<Byline>,
    },
    Content {
        index: usize,
        html: String,
    },
    Video {
        index: usize,
        src: String,
    },
    YouTube {
        index: usize,
        video_id: String,
        embed_url: String,
    },
}

impl RenderedBlock {
    pub fn index(&self) -> usize {
        match self {
            RenderedBlock::Image { index, .. }
            | RenderedBlock::Content { index, .. }
            | RenderedBlock::Video { index, .. }
            | RenderedBlock::YouTube { index, .. } => *index,
        }
    }
}

/// Side-effect-free renderer for drafts and published posts.
pub struct BlogPreviewRenderer<'a> {
    config: &'a DeskConfig,
}

impl<'a> BlogPreviewRenderer<'a> {
    pub fn new(config: &'a DeskConfig) -> Self {
        BlogPreviewRenderer { config }
    }

    pub fn render(&self, post: &BlogDraft) -> Vec<RenderedBlock> {
        let mut blocks = Vec::with_capacity(post.fields.len());
        let mut byline_placed = false;

        for (index, field) in post.fields.iter().enumerate() {
            match field {
                ContentField::Image { src } => {
                    if src.trim().is_empty() {
                        continue;
                    }
                    let byline = if byline_placed {
                        None
                    } else {
                        byline_placed = true;
                        Some(self.byline(post))
                    };
                    blocks.push(RenderedBlock::Image {
                        index,
                        src: src.clone(),
                        byline,
                    });
                }
                ContentField::Content { html } => blocks.push(RenderedBlock::Content {
                    index,
                    html: sanitize_html(html),
                }),
                ContentField::Video { src } => {
                    if src.trim().is_empty() {
                        continue;
                    }
                    blocks.push(RenderedBlock::Video {
                        index,
                        src: src.clone(),
                    });
                }
                ContentField::YouTubeLink { url } => {
                    match (
                        youtube::extract_id(url),
                        youtube::embed_url(&self.config.youtube_embed_base, url),
                    ) {
                        (Some(video_id), Some(embed_url)) => blocks.push(RenderedBlock::YouTube {
                            index,
                            video_id,
                            embed_url,
                        }),
                        _ => debug!("Field {} has no embeddable YouTube link, skipped", index),
                    }
                }
            }
        }

        blocks
    }

    pub fn render_html(&self, post: &BlogDraft) -> String {
        self.render_html_at(post, self.config.local_now())
    }

    /// Full article markup, judging "scheduled" against `now`.
    pub fn render_html_at(&self, post: &BlogDraft, now: NaiveDateTime) -> String {
        let mut html = String::from("<article class=\"blog-container\">");
        html.push_str(&format!(
            "<div class=\"blog-header\"><h1 class=\"blog-title\">{}</h1>",
            html_escape(&post.title)
        ));
        if let PublishTiming::Scheduled(at) = post.timing(now) {
            html.push_str(&format!(
                "<p class=\"blog-scheduled\">Scheduled for {}</p>",
                at.format("%Y-%m-%d %H:%M")
            ));
        }
        html.push_str("</div><div class=\"blog-content\">");

        for block in self.render(post) {
            html.push_str(&block_html(&block));
        }

        html.push_str("</div></article>");
        html
    }

    fn byline(&self, post: &BlogDraft) -> Byline {
        let author = post.author.trim();
        Byline {
            published_on: self.format_date(post.date),
            author: if author.is_empty() {
                "Unknown Author".to_string()
            } else {
                author.to_string()
            },
        }
    }

    fn format_date(&self, date: NaiveDate) -> String {
        let mut out = String::new();
        if write!(out, "{}", date.format(&self.config.date_format)).is_err() {
            warn!("Bad date_format '{}', using ISO dates", self.config.date_format);
            return date.format("%Y-%m-%d").to_string();
        }
        out
    }
}

fn block_html(block: &RenderedBlock) -> String {
    match block {
        RenderedBlock::Image { index, src, byline } => {
            let mut html = format!(
                "<div class=\"content-image\"><img src=\"{}\" alt=\"Blog content {}\">",
                html_escape(src),
                index
            );
            if let Some(b) = byline {
                html.push_str(&format!(
                    "<div class=\"blog-footer\"><p><span>Published on {}</span> <span>Author: <strong>{}</strong></span></p></div>",
                    html_escape(&b.published_on),
                    html_escape(&b.author)
                ));
            }
            html.push_str("</div>");
            html
        }
        RenderedBlock::Content { html, .. } => {
            format!("<div class=\"content-text\">{}</div>", html)
        }
        RenderedBlock::Video { src, .. } => format!(
            "<div class=\"content-video\"><video controls width=\"100%\"><source src=\"{}\" type=\"video/mp4\">Your browser does not support the video tag.</video></div>",
            html_escape(src)
        ),
        RenderedBlock::YouTube { embed_url, .. } => format!(
            "<div class=\"content-youtube\"><iframe width=\"100%\" height=\"400\" src=\"{}\" title=\"YouTube video preview\" frameborder=\"0\" allow=\"accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture\" allowfullscreen></iframe></div>",
            html_escape(embed_url)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::ContentFields;

    fn post(fields: Vec<ContentField>) -> BlogDraft {
        let mut draft = BlogDraft::new(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        draft.title = "Hello <World>".into();
        draft.author = "Ann".into();
        draft.fields = ContentFields::from(fields);
        draft
    }

    #[test]
    fn test_blocks_follow_field_order() {
        let config = DeskConfig::default();
        let renderer = BlogPreviewRenderer::new(&config);
        let draft = post(vec![
            ContentField::Content { html: "<p>intro</p>".into() },
            ContentField::Image { src: "blob:a".into() },
            ContentField::YouTubeLink { url: "https://youtu.be/dQw4w9WgXcQ".into() },
            ContentField::Video { src: "blob:v".into() },
            ContentField::Image { src: "blob:b".into() },
        ]);
        let blocks = renderer.render(&draft);
        let order: Vec<usize> = blocks.iter().map(|b| b.index()).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert_eq!(
            blocks[2],
            RenderedBlock::YouTube {
                index: 2,
                video_id: "dQw4w9WgXcQ".into(),
                embed_url: "https://www.youtube.com/embed/dQw4w9WgXcQ".into(),
            }
        );
    }

    #[test]
    fn test_only_first_image_has_byline() {
        let config = DeskConfig::default();
        let renderer = BlogPreviewRenderer::new(&config);
        let draft = post(vec![
            ContentField::Image { src: "blob:a".into() },
            ContentField::Image { src: "blob:b".into() },
        ]);
        let blocks = renderer.render(&draft);
        match &blocks[0] {
            RenderedBlock::Image { byline: Some(b), .. } => {
                assert_eq!(b.published_on, "April 01, 2024");
                assert_eq!(b.author, "Ann");
            }
            other => panic!("unexpected block {:?}", other),
        }
        assert!(matches!(blocks[1], RenderedBlock::Image { byline: None, .. }));
    }

    #[test]
    fn test_unknown_author_fallback() {
        let config = DeskConfig::default();
        let renderer = BlogPreviewRenderer::new(&config);
        let mut draft = post(vec![ContentField::Image { src: "blob:a".into() }]);
        draft.author = "  ".into();
        match &renderer.render(&draft)[0] {
            RenderedBlock::Image { byline: Some(b), .. } => assert_eq!(b.author, "Unknown Author"),
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn test_unrecognised_youtube_and_empty_media_render_nothing() {
        let config = DeskConfig::default();
        let renderer = BlogPreviewRenderer::new(&config);
        let draft = post(vec![
            ContentField::YouTubeLink { url: "https://vimeo.com/1".into() },
            ContentField::Video { src: String::new() },
            ContentField::Content { html: "<p>x</p>".into() },
        ]);
        let blocks = renderer.render(&draft);
        assert_eq!(blocks, vec![RenderedBlock::Content { index: 2, html: "<p>x</p>".into() }]);
    }

    #[test]
    fn test_content_is_sanitized_at_render() {
        let config = DeskConfig::default();
        let renderer = BlogPreviewRenderer::new(&config);
        let draft = post(vec![ContentField::Content {
            html: "<p>ok</p><script>steal()</script>".into(),
        }]);
        let html = renderer.render_html(&draft);
        assert!(html.contains("<div class=\"content-text\"><p>ok</p></div>"));
        assert!(!html.contains("script"));
    }

    #[test]
    fn test_render_html_escapes_title_and_marks_schedule() {
        let config = DeskConfig::default();
        let renderer = BlogPreviewRenderer::new(&config);
        let mut draft = post(vec![ContentField::Image { src: "blob:a".into() }]);
        let now = NaiveDateTime::parse_from_str("2024-04-01 08:00", "%Y-%m-%d %H:%M").unwrap();

        let html = renderer.render_html_at(&draft, now);
        assert!(html.contains("<h1 class=\"blog-title\">Hello &lt;World&gt;</h1>"));
        assert!(!html.contains("blog-scheduled"));
        assert!(html.contains("Published on April 01, 2024"));

        draft.scheduled_publish_time =
            Some(NaiveDateTime::parse_from_str("2024-04-02 09:15", "%Y-%m-%d %H:%M").unwrap());
        let html = renderer.render_html_at(&draft, now);
        assert!(html.contains("<p class=\"blog-scheduled\">Scheduled for 2024-04-02 09:15</p>"));
    }

    #[test]
    fn test_bad_date_format_falls_back() {
        let config = DeskConfig {
            date_format: "%H:%M on %Q".into(),
            ..DeskConfig::default()
        };
        let renderer = BlogPreviewRenderer::new(&config);
        let draft = post(vec![ContentField::Image { src: "blob:a".into() }]);
        match &renderer.render(&draft)[0] {
            RenderedBlock::Image { byline: Some(b), .. } => assert_eq!(b.published_on, "2024-04-01"),
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn test_previewed_draft_roundtrips_through_json() {
        let previewed = PreviewedDraft {
            origin: Some(2),
            draft: post(vec![ContentField::Image { src: "blob:a".into() }]),
        };
        let json = serde_json::to_string(&previewed).unwrap();
        let back: PreviewedDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(back, previewed);

        let state = previewed.to_navigation_state().unwrap();
        assert_eq!(state["origin"], 2);
        assert_eq!(state["draft"]["fields"][0]["type"], "image");
        assert_eq!(PreviewedDraft::from_navigation_state(state).unwrap(), previewed);
    }

    #[test]
    fn test_malformed_navigation_state_is_rejected() {
        let err = PreviewedDraft::from_navigation_state(serde_json::json!({ "title": 3 })).unwrap_err();
        assert!(matches!(err, DeskError::Serde(_)));
    }
}
