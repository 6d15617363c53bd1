use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rust_xlsxwriter::XlsxError;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::StoryExport;
use crate::services::excel::WorkbookBuilder;
use crate::services::risk::aggregate_or_zero;
use crate::services::table::sanitize_table;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no stories to export")]
    NoStories,
    #[error("failed to write workbook to {}: {source}", .path.display())]
    WorkbookWrite {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("failed to create temporary workbook: {0}")]
    TempFile(#[source] io::Error),
    #[error("failed to read exported workbook: {0}")]
    Read(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub stories: usize,
    pub sheets: usize,
    pub test_cases: usize,
}

/// Lays out every story (summary first) without touching the filesystem.
pub fn plan_workbook(stories: &[StoryExport]) -> (WorkbookBuilder, ExportReport) {
    let mut builder = WorkbookBuilder::new();
    let mut report = ExportReport {
        stories: stories.len(),
        ..Default::default()
    };

    for story in stories {
        match &story.table {
            Some(table) => {
                let table = sanitize_table(table.clone());
                let (counts, risk_styling) = aggregate_or_zero(&story.id, &table);
                report.test_cases += table.len();
                builder.add_table(story, &table, &counts, risk_styling);
            }
            None => {
                tracing::warn!("Story {} has no parsed table, writing raw text", story.id);
                builder.add_fallback(story);
            }
        }
    }

    report.sheets = builder.sheet_count();
    (builder, report)
}

/// Writes one workbook holding a summary sheet plus one sheet per story.
pub fn export_stories(stories: &[StoryExport], destination: &Path) -> Result<ExportReport, ExportError> {
    if stories.is_empty() {
        return Err(ExportError::NoStories);
    }
    let (builder, report) = plan_workbook(stories);
    persist(&builder, destination)?;
    tracing::info!(
        "Exported {} stories ({} test cases, {} sheets) to {}",
        report.stories,
        report.test_cases,
        report.sheets,
        destination.display()
    );
    Ok(report)
}

/// Exports a single story. Without a table the workbook holds only the raw text sheet.
pub fn export_single(story: &StoryExport, destination: &Path) -> Result<ExportReport, ExportError> {
    if story.table.is_some() {
        return export_stories(std::slice::from_ref(story), destination);
    }

    tracing::info!("Creating raw text workbook for story {}", story.id);
    let mut builder = WorkbookBuilder::without_summary();
    builder.add_fallback(story);
    persist(&builder, destination)?;
    Ok(ExportReport {
        stories: 1,
        sheets: builder.sheet_count(),
        test_cases: 0,
    })
}

fn persist(builder: &WorkbookBuilder, destination: &Path) -> Result<(), ExportError> {
    let mut workbook = builder.build();
    workbook.save(destination).map_err(|source| {
        tracing::error!("Failed to save workbook to {}: {}", destination.display(), source);
        if let Err(e) = fs::remove_file(destination) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove partial workbook {}: {}", destination.display(), e);
            }
        }
        ExportError::WorkbookWrite {
            path: destination.to_path_buf(),
            source,
        }
    })
}

/// A workbook written to a uniquely named temporary file. The file is removed when
/// the artifact is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct ExportArtifact {
    file: NamedTempFile,
    report: ExportReport,
}

impl ExportArtifact {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn report(&self) -> ExportReport {
        self.report
    }

    /// Reads the finished workbook and removes the temporary file.
    pub fn into_bytes(self) -> Result<Vec<u8>, ExportError> {
        fs::read(self.file.path()).map_err(ExportError::Read)
    }
}

fn temp_destination() -> Result<NamedTempFile, ExportError> {
    tempfile::Builder::new()
        .prefix("test_cases_")
        .suffix(".xlsx")
        .tempfile()
        .map_err(ExportError::TempFile)
}

pub fn export_stories_to_temp(stories: &[StoryExport]) -> Result<ExportArtifact, ExportError> {
    let file = temp_destination()?;
    let report = export_stories(stories, file.path())?;
    Ok(ExportArtifact { file, report })
}

pub fn export_single_to_temp(story: &StoryExport) -> Result<ExportArtifact, ExportError> {
    let file = temp_destination()?;
    let report = export_single(story, file.path())?;
    Ok(ExportArtifact { file, report })
}

/// `test_cases_<story_id>_<YYYYMMDD_HHMMSS>.xlsx`, or without the id for multi-story exports.
/// Characters that are unsafe in a download name are replaced with `_`.
pub fn download_filename(story_id: Option<&str>, at: DateTime<Local>) -> String {
    let stamp = at.format("%Y%m%d_%H%M%S");
    match story_id {
        Some(id) => {
            let id: String = id
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect();
            format!("test_cases_{}_{}.xlsx", id, stamp)
        }
        None => format!("test_cases_{}.xlsx", stamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RAW: &str = "| Test Case ID | Area/Feature | Description | Steps | Expected Result | Risk Level | Priority |\n\
                       |---|---|---|---|---|---|---|\n\
                       | TC001 | Login | Valid login | Enter creds | Dashboard shown | High | 1 |\n\
                       | TC002 | Login | Bad password | Enter wrong creds | Error shown | Medium | 2 |";

    #[test]
    fn plan_counts_stories_and_sheets() {
        let stories = vec![
            StoryExport::from_raw("US001", "Login", RAW),
            StoryExport::from_raw("US002", "Signup", "no table here"),
        ];
        let (_, report) = plan_workbook(&stories);
        assert_eq!(report, ExportReport { stories: 2, sheets: 3, test_cases: 2 });
    }

    #[test]
    fn empty_export_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = export_stories(&[], &dir.path().join("out.xlsx"));
        assert!(matches!(result, Err(ExportError::NoStories)));
    }

    #[test]
    fn write_failure_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("missing").join("out.xlsx");
        let story = StoryExport::from_raw("US001", "Login", RAW);
        match export_stories(&[story], &destination) {
            Err(ExportError::WorkbookWrite { path, .. }) => assert_eq!(path, destination),
            other => panic!("expected write failure, got {:?}", other),
        }
        assert!(!destination.exists());
    }

    #[test]
    fn single_fallback_has_one_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let story = StoryExport::from_raw("US003", "Profile", "just prose");
        let report = export_single(&story, &dir.path().join("single.xlsx")).unwrap();
        assert_eq!(report.sheets, 1);
        assert_eq!(report.test_cases, 0);
    }

    #[test]
    fn temp_artifact_is_removed_after_reading() {
        let artifact = export_stories_to_temp(&[StoryExport::from_raw("US001", "Login", RAW)]).unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(artifact.report().test_cases, 2);

        let bytes = artifact.into_bytes().unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert!(!path.exists());
    }

    #[test]
    fn temp_artifacts_use_distinct_paths() {
        let story = StoryExport::from_raw("US001", "Login", RAW);
        let a = export_single_to_temp(&story).unwrap();
        let b = export_single_to_temp(&story).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn filenames_follow_download_convention() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(download_filename(Some("US001"), at), "test_cases_US001_20240309_140507.xlsx");
        assert_eq!(download_filename(Some("US 1/\"x\""), at), "test_cases_US_1__x__20240309_140507.xlsx");
        assert_eq!(download_filename(None, at), "test_cases_20240309_140507.xlsx");
    }
}
