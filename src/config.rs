use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use log::{debug, warn};
use serde::Deserialize;

use crate::error::DeskError;

pub const DEFAULT_CONFIG_PATH: &str = "blogdesk.toml";

/// Runtime settings. Every key has a default, so an empty or missing file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// IANA timezone used for "today" and "now" (e.g. "Europe/Berlin").
    pub timezone: String,
    /// strftime pattern for bylines.
    pub date_format: String,
    /// Markup placed in newly added content blocks.
    pub default_content_html: String,
    pub youtube_embed_base: String,
    /// Prefix for object-URL style media handles.
    pub media_origin: String,
    /// Also treat an identical (title, author, date) as a duplicate submission.
    pub match_title_author_date: bool,
    /// JSON snapshot used by the command-line tool.
    pub listing_path: PathBuf,
}

impl Default for DeskConfig {
    fn default() -> Self {
        DeskConfig {
            timezone: "UTC".to_string(),
            date_format: "%B %d, %Y".to_string(),
            default_content_html: "<p>Default content goes here...</p>".to_string(),
            youtube_embed_base: "https://www.youtube.com/embed/".to_string(),
            media_origin: "blob:blogdesk".to_string(),
            match_title_author_date: true,
            listing_path: PathBuf::from("data/blog.json"),
        }
    }
}

impl DeskConfig {
    /// Load from `path` (or `blogdesk.toml` if present), then apply
    /// `BLOGDESK_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, DeskError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                DeskConfig::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, DeskError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| DeskError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, DeskError> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("BLOGDESK_TIMEZONE") {
            self.timezone = v;
        }
        if let Some(v) = get("BLOGDESK_DATE_FORMAT") {
            self.date_format = v;
        }
        if let Some(v) = get("BLOGDESK_LISTING_PATH") {
            self.listing_path = PathBuf::from(v);
        }
        if let Some(v) = get("BLOGDESK_MATCH_TITLE_AUTHOR_DATE") {
            self.match_title_author_date = v == "true" || v == "1";
        }
    }

    pub fn validate(&self) -> Result<(), DeskError> {
        if self.timezone.parse::<Tz>().is_err() {
            return Err(DeskError::Config(format!("unknown timezone '{}'", self.timezone)));
        }
        if self.youtube_embed_base.trim().is_empty() {
            return Err(DeskError::Config("youtube_embed_base must not be empty".into()));
        }
        Ok(())
    }

    pub fn tz(&self) -> Tz {
        self.timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!("Unknown timezone '{}', falling back to UTC", self.timezone);
            Tz::UTC
        })
    }

    /// Current wall-clock time in the site timezone, to the minute.
    pub fn local_now(&self) -> NaiveDateTime {
        let local = chrono::Utc::now().with_timezone(&self.tz()).naive_local();
        truncate_to_minute(local)
    }

    pub fn today(&self) -> NaiveDate {
        chrono::Utc::now().with_timezone(&self.tz()).date_naive()
    }
}

/// Matches what a `datetime-local` input holds: no seconds.
pub fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.date()
        .and_hms_opt(t.hour(), t.minute(), 0)
        .unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = DeskConfig::from_toml("").unwrap();
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.default_content_html, "<p>Default content goes here...</p>");
        assert!(config.match_title_author_date);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = DeskConfig::from_toml(
            "timezone = \"Asia/Kolkata\"\nmatch_title_author_date = false\n",
        )
        .unwrap();
        assert_eq!(config.timezone, "Asia/Kolkata");
        assert!(!config.match_title_author_date);
        assert_eq!(config.date_format, "%B %d, %Y");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = DeskConfig::from_toml("timezone = ").unwrap_err();
        assert!(matches!(err, DeskError::Config(_)));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let config = DeskConfig {
            timezone: "Mars/Olympus".into(),
            ..DeskConfig::default()
        };
        assert!(matches!(config.validate(), Err(DeskError::Config(_))));
        assert_eq!(config.tz(), Tz::UTC);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BLOGDESK_TIMEZONE", "Europe/Berlin"),
            ("BLOGDESK_MATCH_TITLE_AUTHOR_DATE", "0"),
            ("BLOGDESK_LISTING_PATH", "/tmp/posts.json"),
        ]
        .into_iter()
        .collect();
        let mut config = DeskConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.timezone, "Europe/Berlin");
        assert!(!config.match_title_author_date);
        assert_eq!(config.listing_path, PathBuf::from("/tmp/posts.json"));
    }

    #[test]
    fn test_local_now_has_no_seconds() {
        let now = DeskConfig::default().local_now();
        assert_eq!(now.second(), 0);
        assert_eq!(now.nanosecond(), 0);
    }
}
