use log::{error, info, warn};
use std::fs;
use std::path::Path;

use crate::config::DeskConfig;
use crate::error::DeskError;

/// Run all boot checks. Call this before touching the listing.
/// Creates the data directory if missing and warns about anything that
/// will make the first run behave differently from later ones.
pub fn run(config: &DeskConfig) -> Result<(), DeskError> {
    info!("Blogdesk boot check starting...");

    let mut warnings = 0u32;
    let mut errors = 0u32;
    let listing: &Path = &config.listing_path;

    // ── 1. Data directory ──────────────────────────────
    if let Some(dir) = listing.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            match fs::create_dir_all(dir) {
                Ok(_) => info!("  Created directory: {}", dir.display()),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", dir.display(), e);
                    errors += 1;
                }
            }
        }

        // ── 2. Data directory writable ─────────────────
        if dir.exists() {
            let test_file = dir.join(".write_test");
            match fs::write(&test_file, "test") {
                Ok(_) => {
                    let _ = fs::remove_file(&test_file);
                }
                Err(e) => {
                    error!("  Data directory not writable: {}", e);
                    errors += 1;
                }
            }
        }
    }

    // ── 3. Listing snapshot ────────────────────────────
    if !listing.exists() {
        warn!("  No listing at {}, starting with an empty blog", listing.display());
        warnings += 1;
    } else if listing.is_dir() {
        error!("  Listing path {} is a directory", listing.display());
        errors += 1;
    }

    // ── 4. Timezone ────────────────────────────────────
    if config.timezone.parse::<chrono_tz::Tz>().is_err() {
        warn!("  Unknown timezone '{}', dates will use UTC", config.timezone);
        warnings += 1;
    }

    // ── Summary ────────────────────────────────────────
    if errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s).",
            errors, warnings
        );
        return Err(DeskError::Io(format!("boot check failed with {} error(s)", errors)));
    }

    if warnings > 0 {
        warn!("Boot check passed with {} warning(s).", warnings);
    } else {
        info!("Boot check passed.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("blogdesk-boot-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_creates_missing_data_directory() {
        let root = scratch();
        let config = DeskConfig {
            listing_path: root.join("data").join("blog.json"),
            ..DeskConfig::default()
        };
        run(&config).unwrap();
        assert!(root.join("data").is_dir());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_listing_path_that_is_a_directory_fails() {
        let root = scratch();
        fs::create_dir_all(root.join("blog.json")).unwrap();
        let config = DeskConfig {
            listing_path: root.join("blog.json"),
            ..DeskConfig::default()
        };
        assert!(run(&config).is_err());
        let _ = fs::remove_dir_all(&root);
    }
}
