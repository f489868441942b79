//! JSON output generation.
//!
//! Results are pretty-printed to stdout by the CLI and, when an output
//! directory is given, also written under a per-day directory:
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     └── {file_stem}.json
//! ```

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of a dated JSON file: `{output_dir}/{date}/{file_stem}.json`.
///
/// # Arguments
///
/// * `output_dir` - Base directory for JSON output
/// * `date` - Day the file belongs to
/// * `file_stem` - File name without the `.json` extension
pub fn dated_path(output_dir: &str, date: NaiveDate, file_stem: &str) -> PathBuf {
    Path::new(output_dir)
        .join(date.to_string())
        .join(format!("{file_stem}.json"))
}

/// Report file stem stamped with the local wall-clock time, e.g. `report_143012`.
pub fn report_file_stem() -> String {
    format!("report_{}", Local::now().format("%H%M%S"))
}

/// Serialize `value` as pretty JSON.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Write `value` to `{output_dir}/{today}/{file_stem}.json`, creating directories as needed.
///
/// # Arguments
///
/// * `value` - Anything serializable (a report or an article list)
/// * `output_dir` - Base directory for JSON output
/// * `file_stem` - File name without the `.json` extension
///
/// # Returns
///
/// The path written, or an error if directory creation or file writing fails.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, file_stem = %file_stem))]
pub async fn write_dated<T: Serialize>(
    value: &T,
    output_dir: &str,
    file_stem: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = to_pretty_json(value)?;
    let path = dated_path(output_dir, Local::now().date_naive(), file_stem);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON file");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Report;

    #[test]
    fn test_dated_path_layout() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        let path = dated_path("/tmp/out", date, "election_articles");
        assert_eq!(path, PathBuf::from("/tmp/out/2025-05-06/election_articles.json"));
    }

    #[test]
    fn test_report_file_stem_shape() {
        let stem = report_file_stem();
        assert!(stem.starts_with("report_"));
        assert_eq!(stem.len(), "report_".len() + 6);
    }

    #[tokio::test]
    async fn test_write_dated_creates_dirs_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let report = Report::failure("boom");

        let path = write_dated(&report, out.to_str().unwrap(), "report_test")
            .await
            .unwrap();

        assert!(path.starts_with(&out));
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let back: Report = serde_json::from_str(&written).unwrap();
        assert_eq!(back, report);
    }
}
