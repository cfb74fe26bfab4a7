//! Utility functions for file naming and blob path manipulation

use chrono::{DateTime, TimeZone};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Container extension of every downloaded file (`--merge-output-format mp4`)
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Characters that are not allowed in file names on common filesystems
fn forbidden_chars() -> &'static Regex {
    static FORBIDDEN: OnceLock<Regex> = OnceLock::new();
    FORBIDDEN.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // literal pattern
        Regex::new(r#"[\\/*?:"<>|]"#).unwrap()
    })
}

/// Replace characters that are invalid in file names with `_`
///
/// # Examples
///
/// ```
/// use media_relay::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
/// assert_eq!(sanitize_filename("plain title"), "plain title");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    forbidden_chars().replace_all(name, "_").into_owned()
}

/// Timestamp prefix used in output file names (`HH_MM_SS_DD-MM-YYYY`)
#[must_use]
pub fn timestamp_label<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%H_%M_%S_%d-%m-%Y").to_string()
}

/// Build the output file name for a job
///
/// Title and quality are sanitized; the timestamp label is used verbatim.
///
/// # Examples
///
/// ```
/// use media_relay::utils::output_filename;
///
/// assert_eq!(
///     output_filename("10_00_00_01-02-2024", "My: Video", "720p"),
///     "10_00_00_01-02-2024_My_ Video_720p.mp4"
/// );
/// ```
#[must_use]
pub fn output_filename(timestamp: &str, title: &str, quality: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        timestamp,
        sanitize_filename(title),
        sanitize_filename(quality),
        OUTPUT_EXTENSION
    )
}

/// Build a blob name from a destination prefix and a path relative to the source folder
///
/// Components are joined with forward slashes. An empty prefix yields the bare
/// relative path; a trailing slash on the prefix is not doubled.
///
/// # Examples
///
/// ```
/// use media_relay::utils::blob_name;
/// use std::path::Path;
///
/// assert_eq!(blob_name("backups/", Path::new("a/b.txt")), "backups/a/b.txt");
/// assert_eq!(blob_name("", Path::new("b.txt")), "b.txt");
/// ```
#[must_use]
pub fn blob_name(prefix: &str, relative: &Path) -> String {
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
        .replace('\\', "/");
    let prefix = prefix.replace('\\', "/");

    if prefix.is_empty() {
        relative
    } else if prefix.ends_with('/') {
        format!("{prefix}{relative}")
    } else {
        format!("{prefix}/{relative}")
    }
}
