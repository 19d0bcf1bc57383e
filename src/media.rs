use std::collections::HashMap;

use log::{debug, warn};

use crate::error::DeskError;
use crate::models::field::FieldKind;

/// A raw file selection handed over by the host (file input, drag and drop).
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub name: String,
    /// Declared MIME type; guessed from `name` when absent.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        MediaFile {
            name: name.to_string(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: &str) -> Self {
        self.mime = Some(mime.to_string());
        self
    }

    pub fn mime_type(&self) -> String {
        match &self.mime {
            Some(m) if !m.trim().is_empty() => m.trim().to_lowercase(),
            _ => mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }
}

/// Media storage collaborator: turns a file selection into a displayable,
/// ephemeral reference and takes it back once nothing points at it.
pub trait MediaStore {
    fn create(&mut self, kind: FieldKind, file: MediaFile) -> Result<String, DeskError>;
    /// Register one more holder of `reference`. Unknown references are ignored.
    fn retain(&mut self, reference: &str);
    /// Drop one holder; the reference is revoked when none remain.
    fn release(&mut self, reference: &str);
    fn is_live(&self, reference: &str) -> bool;
}

struct ObjectUrl {
    mime: String,
    size: usize,
    holders: usize,
}

/// In-memory object-URL table issuing `blob:<origin>/<uuid>` handles.
pub struct ObjectUrlTable {
    origin: String,
    entries: HashMap<String, ObjectUrl>,
}

impl ObjectUrlTable {
    pub fn new(origin: &str) -> Self {
        ObjectUrlTable {
            origin: origin.trim_end_matches('/').to_string(),
            entries: HashMap::new(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    pub fn mime_of(&self, reference: &str) -> Option<&str> {
        self.entries.get(reference).map(|e| e.mime.as_str())
    }
}

fn accepts(kind: FieldKind, mime: &str) -> bool {
    match kind {
        FieldKind::Image => mime.starts_with("image/"),
        FieldKind::Video => mime.starts_with("video/"),
        _ => false,
    }
}

impl MediaStore for ObjectUrlTable {
    fn create(&mut self, kind: FieldKind, file: MediaFile) -> Result<String, DeskError> {
        let mime = file.mime_type();
        if !accepts(kind, &mime) {
            return Err(DeskError::UnsupportedMedia { kind, mime });
        }
        let reference = format!("{}/{}", self.origin, uuid::Uuid::new_v4());
        debug!("Created {} for {} ({}, {} bytes)", reference, file.name, mime, file.bytes.len());
        self.entries.insert(
            reference.clone(),
            ObjectUrl {
                mime,
                size: file.bytes.len(),
                holders: 1,
            },
        );
        Ok(reference)
    }

    fn retain(&mut self, reference: &str) {
        if let Some(entry) = self.entries.get_mut(reference) {
            entry.holders += 1;
        }
    }

    fn release(&mut self, reference: &str) {
        let revoke = match self.entries.get_mut(reference) {
            Some(entry) => {
                entry.holders = entry.holders.saturating_sub(1);
                entry.holders == 0
            }
            None => {
                if reference.starts_with(&self.origin) {
                    warn!("Release of unknown media reference {}", reference);
                }
                false
            }
        };
        if revoke {
            if let Some(entry) = self.entries.remove(reference) {
                debug!("Revoked {} ({}, {} bytes)", reference, entry.mime, entry.size);
            }
        }
    }

    fn is_live(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }
}
