use std::fmt;

use crate::models::field::FieldKind;
use crate::models::post::PostId;

/// Reasons a draft may not advance to preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more image fields have no media attached. Holds their indices.
    MissingImage { indices: Vec<usize> },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingImage { .. } => "missing-image",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug)]
pub enum DeskError {
    Validation(ValidationError),
    FieldIndex { index: usize, len: usize },
    KindMismatch { expected: FieldKind, found: FieldKind },
    UnsupportedMedia { kind: FieldKind, mime: String },
    UnknownPost(PostId),
    SchedulingDisabled,
    /// Preview requested with no draft to show.
    NothingToPreview,
    WrongScreen { expected: &'static str, current: &'static str },
    Config(String),
    Io(String),
    Serde(String),
}

impl fmt::Display for DeskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation failed: {}", e),
            Self::FieldIndex { index, len } => {
                write!(f, "field index {} out of range (draft has {} fields)", index, len)
            }
            Self::KindMismatch { expected, found } => {
                write!(f, "expected a {} field, found {}", expected, found)
            }
            Self::UnsupportedMedia { kind, mime } => {
                write!(f, "'{}' cannot be attached to a {} field", mime, kind)
            }
            Self::UnknownPost(id) => write!(f, "no post with id {}", id),
            Self::SchedulingDisabled => write!(f, "scheduling is not enabled for this draft"),
            Self::NothingToPreview => write!(f, "no blog data to preview"),
            Self::WrongScreen { expected, current } => {
                write!(f, "action needs the {} screen, currently on {}", expected, current)
            }
            Self::Config(msg) => write!(f, "config: {}", msg),
            Self::Io(msg) => write!(f, "io: {}", msg),
            Self::Serde(msg) => write!(f, "serialization: {}", msg),
        }
    }
}

impl std::error::Error for DeskError {}

impl From<ValidationError> for DeskError {
    fn from(e: ValidationError) -> Self {
        DeskError::Validation(e)
    }
}

impl From<std::io::Error> for DeskError {
    fn from(e: std::io::Error) -> Self {
        DeskError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(e: serde_json::Error) -> Self {
        DeskError::Serde(e.to_string())
    }
}

impl From<toml::de::Error> for DeskError {
    fn from(e: toml::de::Error) -> Self {
        DeskError::Config(e.to_string())
    }
}
