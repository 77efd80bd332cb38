//! Small helpers shared by the phases.
//!
//! - Image file naming from story titles
//! - String truncation for log previews
//! - File system validation for output directories

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;

use tokio::fs;
use tracing::{info, instrument};

/// Extension given to every stored image, whatever the source format.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Convert a story title into the image file name.
///
/// Spaces become hyphens and the fixed extension is appended. Path
/// separators are replaced too so the name always stays inside the images
/// directory. Everything else (case, punctuation) is kept.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(image_file_name("Jane & John"), "Jane-&-John.jpg");
/// assert_eq!(image_file_name(""), ".jpg");
/// ```
pub fn image_file_name(title: &str) -> String {
    let slug = title.replace([' ', '/', '\\'], "-");
    format!("{slug}.{IMAGE_EXTENSION}")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last character boundary before `max` bytes
/// and get `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
