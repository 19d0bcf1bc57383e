use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Image,
    Content,
    Video,
    #[serde(rename = "youtube")]
    YouTubeLink,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Content => "content",
            Self::Video => "video",
            Self::YouTubeLink => "youtube",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "image" => Some(Self::Image),
            "content" => Some(Self::Content),
            "video" => Some(Self::Video),
            "youtube" => Some(Self::YouTubeLink),
            _ => None,
        }
    }

    /// Kinds whose value is a media reference owned by the media store.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One content block of a post. Each kind carries only its own payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentField {
    Image {
        #[serde(default)]
        src: String,
    },
    Content {
        #[serde(default)]
        html: String,
    },
    Video {
        #[serde(default)]
        src: String,
    },
    #[serde(rename = "youtube")]
    YouTubeLink {
        #[serde(default)]
        url: String,
    },
}

impl ContentField {
    pub fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Image => ContentField::Image { src: String::new() },
            FieldKind::Content => ContentField::Content { html: String::new() },
            FieldKind::Video => ContentField::Video { src: String::new() },
            FieldKind::YouTubeLink => ContentField::YouTubeLink { url: String::new() },
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            ContentField::Image { .. } => FieldKind::Image,
            ContentField::Content { .. } => FieldKind::Content,
            ContentField::Video { .. } => FieldKind::Video,
            ContentField::YouTubeLink { .. } => FieldKind::YouTubeLink,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ContentField::Image { src } | ContentField::Video { src } => src,
            ContentField::Content { html } => html,
            ContentField::YouTubeLink { url } => url,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value().trim().is_empty()
    }

    fn slot(&mut self) -> &mut String {
        match self {
            ContentField::Image { src } | ContentField::Video { src } => src,
            ContentField::Content { html } => html,
            ContentField::YouTubeLink { url } => url,
        }
    }
}

/// Ordered sequence of content blocks. Position is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFields(Vec<ContentField>);

impl ContentFields {
    pub fn new() -> Self {
        ContentFields(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ContentField> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContentField> {
        self.0.iter()
    }

    /// Push an empty field of `kind` at the end and return its index.
    pub fn append(&mut self, kind: FieldKind) -> usize {
        self.append_field_with(ContentField::empty(kind))
    }

    /// Push a ready-made field at the end and return its index.
    pub fn append_field_with(&mut self, field: ContentField) -> usize {
        self.0.push(field);
        self.0.len() - 1
    }

    /// Replace one field's value in place. Returns the previous value.
    pub fn set_value(&mut self, index: usize, value: impl Into<String>) -> Result<String, DeskError> {
        let len = self.0.len();
        let field = self
            .0
            .get_mut(index)
            .ok_or(DeskError::FieldIndex { index, len })?;
        Ok(std::mem::replace(field.slot(), value.into()))
    }

    /// Like `set_value`, but refuses to touch a field of another kind.
    pub fn set_value_checked(
        &mut self,
        index: usize,
        expected: FieldKind,
        value: impl Into<String>,
    ) -> Result<String, DeskError> {
        let found = self.kind_at(index)?;
        if found != expected {
            return Err(DeskError::KindMismatch { expected, found });
        }
        self.set_value(index, value)
    }

    pub fn kind_at(&self, index: usize) -> Result<FieldKind, DeskError> {
        self.0
            .get(index)
            .map(|f| f.kind())
            .ok_or(DeskError::FieldIndex { index, len: self.0.len() })
    }

    /// Indices of image fields that still have no media attached.
    pub fn images_missing_value(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind() == FieldKind::Image && f.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Non-empty image and video sources, in display order.
    pub fn media_refs(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|f| f.kind().is_media() && !f.is_empty())
            .map(|f| f.value())
            .collect()
    }

    pub fn first_image(&self) -> Option<&str> {
        self.0.iter().find_map(|f| match f {
            ContentField::Image { src } if !src.trim().is_empty() => Some(src.as_str()),
            _ => None,
        })
    }
}

impl From<Vec<ContentField>> for ContentFields {
    fn from(fields: Vec<ContentField>) -> Self {
        ContentFields(fields)
    }
}

impl<'a> IntoIterator for &'a ContentFields {
    type Item = &'a ContentField;
    type IntoIter = std::slice::Iter<'a, ContentField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
