use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::serializer::{schedule_to_csv, ScheduleRecord};
use crate::error::WaterfallError;
use crate::WaterfallResult;

/// File name every exported schedule is saved under.
pub const EXPORT_FILENAME: &str = "data_result.csv";

/// Media type attached to the exported file.
pub const EXPORT_MIME_TYPE: &str = "text/csv;charset=utf-8;";

/// A host capability that persists generated text as a user-visible file.
///
/// Implementations decide where the bytes go (a directory on disk, a browser
/// blob, an in-memory buffer). Saving is fire-and-forget: success carries no
/// value.
pub trait DownloadSink {
    fn save(&self, filename: &str, mime_type: &str, content: &str) -> WaterfallResult<()>;
}

impl<S: DownloadSink + ?Sized> DownloadSink for &S {
    fn save(&self, filename: &str, mime_type: &str, content: &str) -> WaterfallResult<()> {
        (**self).save(filename, mime_type, content)
    }
}

/// Everything a host needs to hand a file to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadPayload {
    pub filename: String,
    pub mime_type: String,
    pub content: String,
}

// ---------------------------------------------------------------------------
// File sink
// ---------------------------------------------------------------------------

/// Writes files into an existing directory.
///
/// Content goes to a temporary file in the target directory first and is
/// renamed into place once fully written; the temporary file is removed if
/// anything fails before the rename.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path a file with `filename` is saved to.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

impl DownloadSink for FileSink {
    fn save(&self, filename: &str, mime_type: &str, content: &str) -> WaterfallResult<()> {
        validate_filename(filename)?;

        if !self.dir.is_dir() {
            return Err(WaterfallError::DownloadUnsupported(format!(
                "destination '{}' is not a directory",
                self.dir.display()
            )));
        }

        let target = self.path_for(filename);
        let mut staged = tempfile::NamedTempFile::new_in(&self.dir)?;
        staged.write_all(content.as_bytes())?;
        staged.flush()?;
        staged
            .persist(&target)
            .map_err(|e| WaterfallError::Io(e.error.to_string()))?;

        tracing::info!(
            path = %target.display(),
            mime_type,
            bytes = content.len(),
            "saved export"
        );
        Ok(())
    }
}

fn validate_filename(filename: &str) -> WaterfallResult<()> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\']);
    if invalid {
        return Err(WaterfallError::InvalidInput {
            field: "filename".into(),
            reason: format!("'{filename}' is not a plain file name"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Memory sink
// ---------------------------------------------------------------------------

/// Captures saved files for hosts that perform the download themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: RefCell<Vec<DownloadPayload>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently saved payload, if any.
    pub fn last(&self) -> Option<DownloadPayload> {
        self.saved.borrow().last().cloned()
    }

    pub fn into_payloads(self) -> Vec<DownloadPayload> {
        self.saved.into_inner()
    }
}

impl DownloadSink for MemorySink {
    fn save(&self, filename: &str, mime_type: &str, content: &str) -> WaterfallResult<()> {
        self.saved.borrow_mut().push(DownloadPayload {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialise `record` and hand it to `sink` as `data_result.csv`.
pub fn export_schedule(record: &ScheduleRecord, sink: &impl DownloadSink) -> WaterfallResult<()> {
    let text = schedule_to_csv(record)?;
    sink.save(EXPORT_FILENAME, EXPORT_MIME_TYPE, &text)
}

/// Build the payload a host needs to save `record` itself.
pub fn download_payload(record: &ScheduleRecord) -> WaterfallResult<DownloadPayload> {
    let sink = MemorySink::new();
    export_schedule(record, &sink)?;
    sink.last().ok_or_else(|| {
        WaterfallError::SerializationError("export produced no payload".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn one_period_record() -> ScheduleRecord {
        ScheduleRecord {
            periods: vec![1],
            beginning_balance: vec![dec!(1000)],
            smm: vec![dec!(0.01)],
            mortgage_payments: vec![dec!(50)],
            net_interest: vec![dec!(5)],
            scheduled_principal: vec![dec!(45)],
            prepayments: vec![dec!(9.55)],
            total_principal: vec![dec!(54.55)],
            cash_flow: vec![dec!(59.55)],
        }
    }

    #[test]
    fn test_memory_sink_records_filename_and_mime() {
        let sink = MemorySink::new();
        export_schedule(&one_period_record(), &sink).unwrap();
        let payload = sink.last().unwrap();
        assert_eq!(payload.filename, "data_result.csv");
        assert_eq!(payload.mime_type, "text/csv;charset=utf-8;");
        assert!(payload.content.ends_with("1,1000,0.01,50,5,45,9.55,54.55,59.55\n"));
    }

    #[test]
    fn test_download_payload_matches_sink_output() {
        let payload = download_payload(&one_period_record()).unwrap();
        let sink = MemorySink::new();
        export_schedule(&one_period_record(), &sink).unwrap();
        assert_eq!(sink.into_payloads(), vec![payload]);
    }

    #[test]
    fn test_shape_error_reaches_no_sink() {
        let mut record = one_period_record();
        record.prepayments.clear();
        let sink = MemorySink::new();
        assert!(export_schedule(&record, &sink).is_err());
        assert!(sink.last().is_none());
    }

    #[test]
    fn test_file_sink_missing_directory_unsupported() {
        let sink = FileSink::new("/nonexistent/mbs-waterfall/export-dir");
        let err = sink
            .save(EXPORT_FILENAME, EXPORT_MIME_TYPE, "x")
            .unwrap_err();
        assert!(matches!(err, WaterfallError::DownloadUnsupported(_)));
    }

    #[test]
    fn test_file_sink_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        for name in ["", "..", "a/b.csv", "a\\b.csv"] {
            assert!(matches!(
                sink.save(name, EXPORT_MIME_TYPE, "x"),
                Err(WaterfallError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_file_sink_leaves_only_target_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        export_schedule(&one_period_record(), &sink).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(EXPORT_FILENAME)]);
    }
}
