//! GHOST evaluator - consistency-aware scoring for visual question answering.
//!
//! The GHOST benchmark probes every depicted object with several yes/no
//! questions about its presence, attributes and relations. Instead of
//! averaging per-question accuracy, the GhostConsistencyScore (GCS) scores
//! each object and penalizes it more heavily as more of its questions are
//! answered incorrectly.
//!
//! # Quick Start
//!
//! ```no_run
//! use ghost_eval::{
//!     config::Config,
//!     persistence::load_predictions,
//!     report::evaluate,
//! };
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let records = load_predictions(
//!         Path::new("predictions.json"),
//!         config.evaluation.validation_sample,
//!     )?;
//!     let report = evaluate(&records)?;
//!
//!     print!("{}", report.format_full());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **prediction**: prediction records, answer normalization, question keys
//! - **aggregate**: groups predictions image → object → category bucket
//! - **score**: per-category and combined GCS, confusion matrix, accuracy
//! - **stats**: descriptive counts reported next to the metrics
//! - **report**: the metrics record and its text rendering
//! - **dataset** / **prompts**: dataset files and the prompts built from them

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod persistence;
pub mod prediction;
pub mod prompts;
pub mod report;
pub mod score;
pub mod stats;

// Re-export commonly used types
pub use aggregate::{GhostTree, ImageRecord, ObjectRecord, QuestionEntry, aggregate};
pub use config::Config;
pub use error::{GhostError, Result};
pub use prediction::{Category, Label, Prediction, QuestionKey, QuestionRecord};
pub use report::{EvaluationReport, evaluate};
pub use score::{
    CategoryScore, ConfusionMatrix, accuracy, halving_sum, object_score, score_category,
    score_category_by_name, score_combined,
};
pub use stats::PredictionStats;
