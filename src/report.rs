//! Evaluation reports: the metrics record and its text rendering.

use crate::aggregate::{GhostTree, aggregate};
use crate::error::{GhostError, Result};
use crate::persistence::load_predictions;
use crate::prediction::{Category, QuestionRecord};
use crate::score::{ConfusionMatrix, score_category, score_combined};
use crate::stats::PredictionStats;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Number of scored objects per metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectsEvaluated {
    pub objects: usize,
    pub attributes: usize,
    pub relations: usize,
    pub combined: usize,
}

/// All metrics computed for one prediction file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// First non-empty `model_name` of the input, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Number of input records (before duplicate keys collapse).
    pub num_records: usize,
    pub objects_gcs: f64,
    pub attributes_gcs: f64,
    pub relations_gcs: f64,
    pub combined_gcs: f64,
    pub accuracy: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub objects_evaluated: ObjectsEvaluated,
    pub statistics: PredictionStats,
}

impl EvaluationReport {
    /// Compute every metric from an aggregated tree.
    pub fn from_tree(tree: &GhostTree, model_name: Option<String>, num_records: usize) -> Self {
        let objects = score_category(tree, Category::Objects);
        let attributes = score_category(tree, Category::Attributes);
        let relations = score_category(tree, Category::Relations);
        let combined = score_combined(tree);
        let confusion_matrix = ConfusionMatrix::from_tree(tree);

        Self {
            model_name,
            num_records,
            objects_gcs: objects.mean_score,
            attributes_gcs: attributes.mean_score,
            relations_gcs: relations.mean_score,
            combined_gcs: combined.mean_score,
            accuracy: confusion_matrix.accuracy(),
            confusion_matrix,
            objects_evaluated: ObjectsEvaluated {
                objects: objects.num_objects,
                attributes: attributes.num_objects,
                relations: relations.num_objects,
                combined: combined.num_objects,
            },
            statistics: PredictionStats::from_tree(tree),
        }
    }

    /// GCS of one category.
    pub fn gcs(&self, category: Category) -> f64 {
        match category {
            Category::Objects => self.objects_gcs,
            Category::Attributes => self.attributes_gcs,
            Category::Relations => self.relations_gcs,
        }
    }

    /// Abbreviated report: the four GCS values and accuracy.
    pub fn format_summary(&self) -> String {
        let mut out = String::new();
        if let Some(model) = &self.model_name {
            out.push_str(&format!("Model: {}\n", model));
        }
        out.push_str(&format!("  Objects GCS:      {:.2}%\n", self.objects_gcs));
        out.push_str(&format!("  Attributes GCS:   {:.2}%\n", self.attributes_gcs));
        out.push_str(&format!("  Relations GCS:    {:.2}%\n", self.relations_gcs));
        out.push_str(&format!("  Combined GCS:     {:.2}%\n", self.combined_gcs));
        out.push_str(&format!("  Accuracy:         {:.2}%\n", self.accuracy));
        out
    }

    /// Full report with confusion matrix and dataset statistics.
    pub fn format_full(&self) -> String {
        let stats = &self.statistics;
        let matrix = &self.confusion_matrix;
        let rule = "─".repeat(44);

        let mut out = String::new();
        out.push_str("GHOST Evaluation Report\n");
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!(
            "Model:            {}\n",
            self.model_name.as_deref().unwrap_or("(unnamed)")
        ));
        out.push_str(&format!("Records:          {}\n", self.num_records));
        out.push_str(&format!("Questions:        {}\n", stats.total_questions));
        out.push_str(&format!("Images:           {}\n", stats.unique_images));
        out.push_str(&format!("Objects:          {}\n", stats.unique_objects));
        for category in Category::ALL {
            out.push_str(&format!(
                "  {:<16}{}\n",
                format!("{}:", category),
                stats.per_category.get(category)
            ));
        }
        out.push_str(&format!(
            "Predictions:      true {} / false {} / unknown {}\n",
            stats.predictions.true_count, stats.predictions.false_count, stats.predictions.unknown
        ));

        out.push_str(&rule);
        out.push('\n');
        out.push_str("GhostConsistencyScore\n");
        let evaluated = &self.objects_evaluated;
        let rows = [
            ("Objects", self.objects_gcs, evaluated.objects),
            ("Attributes", self.attributes_gcs, evaluated.attributes),
            ("Relations", self.relations_gcs, evaluated.relations),
            ("Combined", self.combined_gcs, evaluated.combined),
        ];
        for (name, gcs, count) in rows {
            out.push_str(&format!(
                "  {:<16}{:>7.2}%  ({} objects)\n",
                format!("{}:", name),
                gcs,
                count
            ));
        }

        out.push_str(&rule);
        out.push('\n');
        out.push_str("Confusion matrix (unknown counts as a wrong answer)\n");
        out.push_str(&format!(
            "  TP {:<8} FN {}\n",
            matrix.true_positives, matrix.false_negatives
        ));
        out.push_str(&format!(
            "  FP {:<8} TN {}\n",
            matrix.false_positives, matrix.true_negatives
        ));
        out.push_str(&format!("  Accuracy:       {:>7.2}%\n", self.accuracy));
        out.push_str(&rule);
        out.push('\n');
        out
    }
}

/// Aggregate and score a list of prediction records.
pub fn evaluate(records: &[QuestionRecord]) -> Result<EvaluationReport> {
    let tree = aggregate(records)?;
    let model_name = records
        .iter()
        .map(|r| r.model_name.as_str())
        .find(|m| !m.is_empty())
        .map(str::to_string);

    let report = EvaluationReport::from_tree(&tree, model_name, records.len());
    info!(
        model = report.model_name.as_deref().unwrap_or("(unnamed)"),
        combined_gcs = report.combined_gcs,
        accuracy = report.accuracy,
        "evaluation finished"
    );
    Ok(report)
}

/// Reports of every valid prediction file under a directory.
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    /// Evaluated files, best combined GCS first.
    pub ranked: Vec<(PathBuf, EvaluationReport)>,
    /// Files or entries that could not be read or failed validation.
    pub skipped: Vec<PathBuf>,
}

impl Comparison {
    /// Display name of a ranked entry: the model name, else the file stem.
    pub fn display_name(path: &Path, report: &EvaluationReport) -> String {
        report.model_name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

/// Evaluate every `*.json` prediction file below `dir` and rank the results.
///
/// The walk is recursive and skips `*.report.json` files. Entries that cannot
/// be read and files that fail validation are logged and listed in
/// [`Comparison::skipped`]; ties in combined GCS keep path order.
pub fn compare_dir(dir: &Path, sample: usize) -> Result<Comparison> {
    if !dir.is_dir() {
        return Err(GhostError::PredictionsNotFound(dir.to_path_buf()));
    }

    let mut comparison = Comparison::default();
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let path = entry.into_path();
                if is_prediction_file(&path) {
                    files.push(path);
                }
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                comparison.skipped.push(path);
            }
        }
    }
    files.sort();

    for path in files {
        match load_predictions(&path, sample).and_then(|records| evaluate(&records)) {
            Ok(report) => comparison.ranked.push((path, report)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                comparison.skipped.push(path);
            }
        }
    }

    comparison
        .ranked
        .sort_by(|a, b| b.1.combined_gcs.total_cmp(&a.1.combined_gcs));
    info!(
        evaluated = comparison.ranked.len(),
        skipped = comparison.skipped.len(),
        "comparison finished"
    );
    Ok(comparison)
}

fn is_prediction_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
        && !path.to_string_lossy().ends_with(".report.json")
}
