//! Prediction records and the vocabulary used to score them.
//!
//! A prediction file is a JSON array of [`QuestionRecord`]s. Each record is
//! identified by a composite key `{image_id}_{object_index}_{question_type}`
//! which [`QuestionKey`] splits apart, and carries a free-text model answer
//! which [`Prediction::normalize`] maps onto a tri-state value.

use crate::error::{GhostError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fields every prediction record must carry.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "question_id",
    "object_id",
    "image",
    "text",
    "label",
    "model_name",
    "prediction",
];

/// A single model answer to one benchmark question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Composite key `{image_id}_{object_index}_{question_type}`.
    pub question_id: String,
    /// Object id as written by the prediction generator (not used for scoring).
    #[serde(default)]
    pub object_id: String,
    /// Image file name (not used for scoring).
    #[serde(default)]
    pub image: String,
    /// Question or statement text shown to the model.
    pub text: String,
    /// Ground truth, `"yes"` or `"no"`.
    pub label: String,
    /// Name of the model that produced the answer.
    #[serde(default)]
    pub model_name: String,
    /// Raw model output.
    pub prediction: String,
}

impl QuestionRecord {
    /// Create a record with only the fields scoring reads.
    pub fn new(
        question_id: impl Into<String>,
        label: impl Into<String>,
        prediction: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            object_id: String::new(),
            image: String::new(),
            text: String::new(),
            label: label.into(),
            model_name: String::new(),
            prediction: prediction.into(),
        }
    }

    /// Set the question text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }
}

/// Ground-truth answer of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Yes,
    No,
}

impl Label {
    /// Parse a label string. Only the exact strings `yes` and `no` are labels.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Label::Yes),
            "no" => Some(Label::No),
            _ => None,
        }
    }

    /// The prediction a correct answer normalizes to.
    pub fn expected(self) -> Prediction {
        match self {
            Label::Yes => Prediction::True,
            Label::No => Prediction::False,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Yes => "yes",
            Label::No => "no",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized model answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    True,
    False,
    Unknown,
}

const TRUE_WORDS: [&str; 2] = ["true", "yes"];
const FALSE_WORDS: [&str; 2] = ["false", "no"];

impl Prediction {
    /// Map free-text model output onto `true`, `false` or `unknown`.
    ///
    /// The rules are tried in order and the first hit wins:
    /// 1. the whole answer (trimmed, trailing periods removed, lowercased)
    ///    is one of `true`/`yes` or `false`/`no`;
    /// 2. the first whitespace-delimited word is;
    /// 3. any of `true`/`yes` occurs anywhere, then any of `false`/`no`.
    ///
    /// Rule 3 is a plain substring search, so `"not sure"` and `"unknown"`
    /// both normalize to `false`.
    pub fn normalize(raw: &str) -> Self {
        let answer = raw.trim().trim_end_matches('.').to_lowercase();

        if let Some(prediction) = Self::from_word(&answer) {
            return prediction;
        }

        let first_word = answer.split_whitespace().next().unwrap_or("");
        if let Some(prediction) = Self::from_word(first_word) {
            return prediction;
        }

        if TRUE_WORDS.iter().any(|w| answer.contains(w)) {
            Prediction::True
        } else if FALSE_WORDS.iter().any(|w| answer.contains(w)) {
            Prediction::False
        } else {
            Prediction::Unknown
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        if TRUE_WORDS.contains(&word) {
            Some(Prediction::True)
        } else if FALSE_WORDS.contains(&word) {
            Some(Prediction::False)
        } else {
            None
        }
    }

    /// Whether this answer agrees with the label. `Unknown` never does.
    pub fn is_correct(self, label: Label) -> bool {
        self == label.expected()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Prediction::True => "true",
            Prediction::False => "false",
            Prediction::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question category, selected by the prefix of the question type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Object presence questions.
    Objects,
    /// Attribute questions (`attr*`).
    Attributes,
    /// Relation questions (`rel*`).
    Relations,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Objects, Category::Attributes, Category::Relations];

    /// Route a question type to its category.
    pub fn for_question_type(question_type: &str) -> Self {
        if question_type.starts_with("attr") {
            Category::Attributes
        } else if question_type.starts_with("rel") {
            Category::Relations
        } else {
            Category::Objects
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Objects => "objects",
            Category::Attributes => "attributes",
            Category::Relations => "relations",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = GhostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "objects" => Ok(Category::Objects),
            "attributes" => Ok(Category::Attributes),
            "relations" => Ok(Category::Relations),
            other => Err(GhostError::InvalidCategory(other.to_string())),
        }
    }
}

/// A composite question key split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionKey {
    /// First segment.
    pub image_id: String,
    /// First two segments joined with `_`.
    pub object_id: String,
    /// Everything after the second segment, joined with `_`. May be empty.
    pub question_type: String,
}

impl QuestionKey {
    /// Split a key on `_`. Keys with fewer than two segments are rejected.
    pub fn parse(key: &str) -> Result<Self> {
        let parts: Vec<&str> = key.split('_').collect();
        if parts.len() < 2 {
            return Err(GhostError::format(format!(
                "question key '{}' has fewer than 2 '_'-separated segments",
                key
            )));
        }

        Ok(Self {
            image_id: parts[0].to_string(),
            object_id: format!("{}_{}", parts[0], parts[1]),
            question_type: parts[2..].join("_"),
        })
    }

    /// Category the question belongs to.
    pub fn category(&self) -> Category {
        Category::for_question_type(&self.question_type)
    }
}

/// Validate the shape of a parsed prediction file and deserialize its records.
///
/// Only the first `sample` records are checked for all [`REQUIRED_FIELDS`].
/// This is a cheap heuristic: later records only need the fields scoring
/// reads (`question_id`, `text`, `label`, `prediction`).
pub fn parse_predictions(value: serde_json::Value, sample: usize) -> Result<Vec<QuestionRecord>> {
    let serde_json::Value::Array(items) = value else {
        return Err(GhostError::format("predictions must be a JSON array"));
    };

    if items.is_empty() {
        return Err(GhostError::format("prediction list is empty"));
    }

    for (index, item) in items.iter().take(sample).enumerate() {
        let Some(object) = item.as_object() else {
            return Err(GhostError::format(format!(
                "prediction #{} is not a JSON object",
                index
            )));
        };
        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
            return Err(GhostError::format(format!(
                "prediction #{} is missing required field '{}'",
                index, missing
            )));
        }
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                GhostError::format(format!("prediction #{} is malformed: {}", index, e))
            })
        })
        .collect()
}
