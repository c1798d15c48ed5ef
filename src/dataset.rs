//! GHOST dataset files.
//!
//! A dataset file is a JSON object mapping composite question keys to
//! templated statements:
//!
//! ```json
//! {
//!   "img1_0_pos": "A dog is present in the image.",
//!   "img1_0_attr_color_neg": "The color of the dog present in the image is blue."
//! }
//! ```
//!
//! The scorer never reads it; it drives prompt generation.

use crate::error::{GhostError, Result};
use crate::prediction::{Label, QuestionKey};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// One statement of the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    /// Composite key `{image_id}_{object_index}_{question_type}`.
    pub question_id: String,
    /// Templated statement.
    pub statement: String,
}

/// All statements of a dataset file, in file order.
#[derive(Debug, Clone, Default)]
pub struct GhostDataset {
    pub entries: Vec<DatasetEntry>,
}

impl GhostDataset {
    /// Load and validate a dataset file.
    pub fn load(path: &Path, sample: usize) -> Result<Self> {
        if !path.exists() {
            return Err(GhostError::DatasetNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| GhostError::io(path, e))?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let dataset = Self::from_value(value, sample)?;

        info!(path = %path.display(), statements = dataset.len(), "loaded dataset");
        Ok(dataset)
    }

    /// Validate a parsed dataset.
    ///
    /// The object must be non-empty, and each of the first `sample` keys must
    /// have at least three `_`-separated segments and a string value. Later
    /// entries only need string values.
    pub fn from_value(value: serde_json::Value, sample: usize) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(GhostError::format("dataset must be a JSON object"));
        };

        if map.is_empty() {
            return Err(GhostError::format("dataset is empty"));
        }

        for key in map.keys().take(sample) {
            if key.split('_').count() < 3 {
                return Err(GhostError::format(format!(
                    "dataset key '{}' has fewer than 3 '_'-separated segments",
                    key
                )));
            }
        }

        let entries = map
            .into_iter()
            .map(|(question_id, value)| match value {
                serde_json::Value::String(statement) => Ok(DatasetEntry {
                    question_id,
                    statement,
                }),
                _ => Err(GhostError::format(format!(
                    "dataset value for '{}' is not a string",
                    question_id
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose key is not yet in `completed`, in dataset order.
    pub fn pending<'a>(&'a self, completed: &HashSet<String>) -> Vec<&'a DatasetEntry> {
        self.entries
            .iter()
            .filter(|e| !completed.contains(&e.question_id))
            .collect()
    }
}

/// Image file name for a question key: `{image_id}.{extension}`.
pub fn image_file_name(key: &str, extension: &str) -> String {
    let image_id = key.split('_').next().unwrap_or(key);
    format!("{}.{}", image_id, extension.trim_start_matches('.'))
}

/// Object id for a question key.
pub fn object_id_from_key(key: &str) -> Result<String> {
    QuestionKey::parse(key).map(|k| k.object_id)
}

/// Ground truth encoded in the key: keys ending in `pos` are `yes`.
pub fn label_from_key(key: &str) -> Label {
    if key.ends_with("pos") {
        Label::Yes
    } else {
        Label::No
    }
}
