//! Per-object hierarchy built from a flat list of predictions.
//!
//! Predictions are grouped image → object → category bucket → question type.
//! Every question lands in exactly one slot; a later record with the same
//! composite key replaces the earlier one.

use crate::error::{GhostError, Result};
use crate::prediction::{Category, Label, Prediction, QuestionKey, QuestionRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One scored question inside an object bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionEntry {
    /// Question or statement text.
    pub text: String,
    /// Ground truth.
    pub label: Label,
    /// Normalized model answer.
    pub prediction: Prediction,
}

impl QuestionEntry {
    pub fn new(text: impl Into<String>, label: Label, prediction: Prediction) -> Self {
        Self {
            text: text.into(),
            label,
            prediction,
        }
    }

    pub fn is_correct(&self) -> bool {
        self.prediction.is_correct(self.label)
    }
}

/// Questions of one category keyed by question type.
pub type Bucket = BTreeMap<String, QuestionEntry>;

/// All questions asked about one depicted object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Object presence questions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub questions: Bucket,

    /// Attribute questions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attr: Bucket,

    /// Relation questions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rel: Bucket,
}

impl ObjectRecord {
    /// Bucket holding the questions of a category.
    pub fn bucket(&self, category: Category) -> &Bucket {
        match category {
            Category::Objects => &self.questions,
            Category::Attributes => &self.attr,
            Category::Relations => &self.rel,
        }
    }

    pub fn bucket_mut(&mut self, category: Category) -> &mut Bucket {
        match category {
            Category::Objects => &mut self.questions,
            Category::Attributes => &mut self.attr,
            Category::Relations => &mut self.rel,
        }
    }

    /// Insert a question, returning the entry it replaced if any.
    pub fn insert(
        &mut self,
        category: Category,
        question_type: impl Into<String>,
        entry: QuestionEntry,
    ) -> Option<QuestionEntry> {
        self.bucket_mut(category).insert(question_type.into(), entry)
    }

    /// Iterate every question across all three buckets.
    pub fn entries(&self) -> impl Iterator<Item = (Category, &QuestionEntry)> {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.bucket(category).values().map(move |e| (category, e)))
    }

    /// Number of questions in all buckets.
    pub fn question_count(&self) -> usize {
        self.questions.len() + self.attr.len() + self.rel.len()
    }

    /// Number of questions answered incorrectly in one bucket.
    pub fn incorrect_count(&self, category: Category) -> usize {
        self.bucket(category)
            .values()
            .filter(|e| !e.is_correct())
            .count()
    }
}

/// Objects of one image keyed by object id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRecord {
    pub objects: BTreeMap<String, ObjectRecord>,
}

/// The complete aggregated structure keyed by image id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GhostTree {
    pub images: BTreeMap<String, ImageRecord>,
}

impl GhostTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the record for an object.
    pub fn object_mut(&mut self, image_id: &str, object_id: &str) -> &mut ObjectRecord {
        self.images
            .entry(image_id.to_string())
            .or_default()
            .objects
            .entry(object_id.to_string())
            .or_default()
    }

    /// Look up an object by its id.
    pub fn object(&self, object_id: &str) -> Option<&ObjectRecord> {
        self.images
            .values()
            .find_map(|image| image.objects.get(object_id))
    }

    /// Iterate all objects as `(object_id, record)` pairs.
    pub fn objects(&self) -> impl Iterator<Item = (&str, &ObjectRecord)> {
        self.images.values().flat_map(|image| {
            image
                .objects
                .iter()
                .map(|(id, record)| (id.as_str(), record))
        })
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn object_count(&self) -> usize {
        self.images.values().map(|i| i.objects.len()).sum()
    }

    /// Number of question slots, after duplicate keys were collapsed.
    pub fn question_count(&self) -> usize {
        self.objects().map(|(_, o)| o.question_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Insert one prediction record at the slot its composite key names.
    ///
    /// Returns `true` when an earlier record with the same key was replaced.
    pub fn insert_record(&mut self, record: &QuestionRecord) -> Result<bool> {
        let key = QuestionKey::parse(&record.question_id)?;
        let label = Label::parse(&record.label).ok_or_else(|| {
            GhostError::format(format!(
                "question '{}' has label '{}'; labels must be exactly 'yes' or 'no' \
                 (lowercase), fix the prediction file and rerun",
                record.question_id, record.label
            ))
        })?;

        let entry = QuestionEntry::new(
            record.text.clone(),
            label,
            Prediction::normalize(&record.prediction),
        );
        let category = key.category();

        let replaced = self
            .object_mut(&key.image_id, &key.object_id)
            .insert(category, key.question_type, entry);

        Ok(replaced.is_some())
    }
}

/// Build the per-object hierarchy from prediction records.
///
/// Fails on an empty input, a key with fewer than two segments, or a label
/// other than `yes`/`no`.
pub fn aggregate(records: &[QuestionRecord]) -> Result<GhostTree> {
    if records.is_empty() {
        return Err(GhostError::format("prediction list is empty"));
    }

    let mut tree = GhostTree::new();
    let mut overwritten = 0usize;

    for record in records {
        if tree.insert_record(record)? {
            warn!(question_id = %record.question_id, "duplicate question key, keeping the later record");
            overwritten += 1;
        }
    }

    debug!(
        records = records.len(),
        images = tree.image_count(),
        objects = tree.object_count(),
        overwritten,
        "aggregated predictions"
    );

    Ok(tree)
}
