//! Persistence layer for prediction files and evaluation reports.
//!
//! Everything is JSON. Prediction files are written atomically so an
//! interrupted run leaves the previous checkpoint intact.

use crate::error::{GhostError, Result};
use crate::prediction::{QuestionRecord, parse_predictions};
use crate::report::EvaluationReport;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Records already present in a prediction file and their question ids.
#[derive(Debug, Clone, Default)]
pub struct Checkpoint {
    pub records: Vec<QuestionRecord>,
    pub completed: HashSet<String>,
}

impl Checkpoint {
    pub fn new(records: Vec<QuestionRecord>) -> Self {
        let completed = records.iter().map(|r| r.question_id.clone()).collect();
        Self { records, completed }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load and validate a prediction file.
///
/// `sample` is the number of leading records checked for all required fields.
pub fn load_predictions(path: &Path, sample: usize) -> Result<Vec<QuestionRecord>> {
    if !path.exists() {
        return Err(GhostError::PredictionsNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| GhostError::io(path, e))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let records = parse_predictions(value, sample).map_err(|e| match e {
        GhostError::Format(msg) => {
            GhostError::Format(format!("{} (in '{}')", msg, path.display()))
        }
        other => other,
    })?;

    info!(path = %path.display(), records = records.len(), "loaded predictions");
    Ok(records)
}

/// Write prediction records as pretty JSON, atomically.
pub fn save_predictions(records: &[QuestionRecord], path: &Path) -> Result<()> {
    write_json_atomic(records, path)?;
    debug!(path = %path.display(), records = records.len(), "saved predictions");
    Ok(())
}

/// Load the records of an existing prediction file, or nothing if it is absent.
///
/// An existing file is parsed without format sampling: a checkpoint written by
/// [`save_predictions`] may legitimately be empty.
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint> {
    if !path.exists() {
        return Ok(Checkpoint::default());
    }

    let content = fs::read_to_string(path).map_err(|e| GhostError::io(path, e))?;
    let records: Vec<QuestionRecord> = serde_json::from_str(&content)?;
    info!(path = %path.display(), completed = records.len(), "resuming from checkpoint");
    Ok(Checkpoint::new(records))
}

/// Save an evaluation report as pretty JSON.
pub fn save_report(report: &EvaluationReport, path: &Path) -> Result<()> {
    write_json_atomic(report, path)
}

/// Save several reports as one pretty JSON array, in the given order.
pub fn save_reports(reports: &[&EvaluationReport], path: &Path) -> Result<()> {
    write_json_atomic(reports, path)?;
    debug!(path = %path.display(), reports = reports.len(), "saved reports");
    Ok(())
}

/// Load a report written by [`save_report`].
pub fn load_report(path: &Path) -> Result<EvaluationReport> {
    let content = fs::read_to_string(path).map_err(|e| GhostError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| GhostError::Serialization(e.to_string()))
}

/// Default report location next to a prediction file: `<stem>.report.json`.
pub fn report_path_for(predictions: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = predictions
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("predictions");
    let file_name = format!("{}.report.json", stem);

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => predictions.with_file_name(file_name),
    }
}

fn write_json_atomic<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| GhostError::io(parent, e))?;
        }
    }

    let data = serde_json::to_string_pretty(value)
        .map_err(|e| GhostError::Serialization(e.to_string()))?;

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, data).map_err(|e| GhostError::io(&temp, e))?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(GhostError::io(path, e));
    }

    Ok(())
}
