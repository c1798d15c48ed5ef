//! GhostConsistencyScore (GCS) and confusion-matrix metrics.
//!
//! GCS scores each object rather than each question. An object asked `n`
//! questions with `k` of them answered incorrectly scores
//!
//! ```text
//! 1 - W(k) / W(n),   W(i) = sum_{j=0}^{i-1} (1/2)^j
//! ```
//!
//! so every additional wrong answer on the same object is discounted
//! geometrically against the number of questions asked. Category scores
//! average the per-object values and report them as a percentage.

use crate::aggregate::GhostTree;
use crate::error::Result;
use crate::prediction::{Category, Label, Prediction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sum of the halving series with `i` terms: `1 + 1/2 + ... + (1/2)^(i-1)`.
///
/// `W(0) = 0`; the sum is strictly increasing and approaches 2.
pub fn halving_sum(i: usize) -> f64 {
    (0..i).map(|j| 0.5f64.powi(j as i32)).sum()
}

/// Consistency score of one object with `total` questions and `incorrect` errors.
///
/// An object without questions scores `1.0`.
pub fn object_score(total: usize, incorrect: usize) -> f64 {
    let possible = halving_sum(total);
    if possible > 0.0 {
        1.0 - halving_sum(incorrect) / possible
    } else {
        1.0
    }
}

/// Per-object scores of one category (or combined) and their mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// One score in `[0, 1]` per scored object.
    pub scores: Vec<f64>,
    /// Mean of `scores` as a percentage; `0.0` when nothing was scored.
    pub mean_score: f64,
    /// Number of scored objects.
    pub num_objects: usize,
}

impl CategoryScore {
    /// Summarize a list of per-object scores.
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let mean_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64 * 100.0
        };

        Self {
            num_objects: scores.len(),
            mean_score,
            scores,
        }
    }
}

/// Score every object that has questions in `category`.
///
/// Objects with an empty bucket for the category are left out entirely:
/// they add nothing to `scores` and do not count towards the mean.
pub fn score_category(tree: &GhostTree, category: Category) -> CategoryScore {
    let scores: Vec<f64> = tree
        .objects()
        .filter_map(|(_, object)| {
            let bucket = object.bucket(category);
            if bucket.is_empty() {
                return None;
            }
            Some(object_score(bucket.len(), object.incorrect_count(category)))
        })
        .collect();

    let result = CategoryScore::from_scores(scores);
    debug!(
        category = %category,
        objects = result.num_objects,
        mean = result.mean_score,
        "scored category"
    );
    result
}

/// Score a category given by name (`objects`, `attributes` or `relations`).
pub fn score_category_by_name(tree: &GhostTree, category: &str) -> Result<CategoryScore> {
    let category: Category = category.parse()?;
    Ok(score_category(tree, category))
}

/// Score every object once over the questions of all three categories.
///
/// Question and error counts are pooled before the discount is applied, so
/// this is not the mean of the per-category object scores. Every object in
/// the tree contributes; one without any question scores `1.0`, which cannot
/// happen for a tree built by [`crate::aggregate::aggregate`].
pub fn score_combined(tree: &GhostTree) -> CategoryScore {
    let scores: Vec<f64> = tree
        .objects()
        .map(|(_, object)| {
            let total = object.question_count();
            let incorrect: usize = Category::ALL
                .iter()
                .map(|c| object.incorrect_count(*c))
                .sum();
            object_score(total, incorrect)
        })
        .collect();

    CategoryScore::from_scores(scores)
}

/// Binary confusion matrix over every individual question.
///
/// An `unknown` prediction is always a disagreement and is counted as the
/// opposite of the label: a false negative for `yes`, a false positive for
/// `no`. Every question therefore lands in exactly one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    #[serde(rename = "TP")]
    pub true_positives: usize,
    #[serde(rename = "TN")]
    pub true_negatives: usize,
    #[serde(rename = "FP")]
    pub false_positives: usize,
    #[serde(rename = "FN")]
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    /// Count every question of every object and category in the tree.
    pub fn from_tree(tree: &GhostTree) -> Self {
        let mut matrix = Self::default();
        for (_, object) in tree.objects() {
            for (_, entry) in object.entries() {
                matrix.record(entry.label, entry.prediction);
            }
        }
        matrix
    }

    /// Add one judgment.
    pub fn record(&mut self, label: Label, prediction: Prediction) {
        match (label, prediction) {
            (Label::Yes, Prediction::True) => self.true_positives += 1,
            (Label::No, Prediction::False) => self.true_negatives += 1,
            (Label::No, Prediction::True | Prediction::Unknown) => self.false_positives += 1,
            (Label::Yes, Prediction::False | Prediction::Unknown) => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    pub fn correct(&self) -> usize {
        self.true_positives + self.true_negatives
    }

    /// Accuracy as a percentage, see [`accuracy`].
    pub fn accuracy(&self) -> f64 {
        accuracy(self)
    }
}

/// `(TP + TN) / total * 100`, or `0.0` for an empty matrix.
pub fn accuracy(matrix: &ConfusionMatrix) -> f64 {
    let total = matrix.total();
    if total == 0 {
        return 0.0;
    }
    matrix.correct() as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, QuestionEntry};
    use crate::error::GhostError;
    use crate::prediction::QuestionRecord;
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    fn record(question_id: &str, label: &str, prediction: &str) -> QuestionRecord {
        QuestionRecord::new(question_id, label, prediction)
    }

    #[test]
    fn test_halving_sum_values() {
        assert_eq!(halving_sum(0), 0.0);
        assert_eq!(halving_sum(1), 1.0);
        assert_eq!(halving_sum(2), 1.5);
        assert_eq!(halving_sum(3), 1.75);
        assert!(approx_eq!(f64, halving_sum(60), 2.0, epsilon = 1e-12));
    }

    #[test]
    fn test_object_score_small_cases() {
        assert_eq!(object_score(1, 0), 1.0);
        assert_eq!(object_score(1, 1), 0.0);
        assert!(approx_eq!(f64, object_score(2, 1), 1.0 / 3.0, epsilon = 1e-12));
        assert_eq!(object_score(2, 2), 0.0);
        // 1 - 1.5 / 1.75
        assert!(approx_eq!(f64, object_score(3, 2), 1.0 / 7.0, epsilon = 1e-12));
        assert_eq!(object_score(0, 0), 1.0);
    }

    #[test]
    fn test_one_error_costs_less_with_more_questions() {
        assert!(object_score(4, 1) > object_score(2, 1));
        assert!(object_score(2, 1) > object_score(1, 1));
    }

    #[test]
    fn test_from_scores_empty_is_zero() {
        let result = CategoryScore::from_scores(Vec::new());
        assert_eq!(result.mean_score, 0.0);
        assert_eq!(result.num_objects, 0);
        assert!(!result.mean_score.is_nan());
    }

    #[test]
    fn test_attribute_scenario_all_correct() {
        let tree = aggregate(&[
            record("img1_0_attr_color_pos", "yes", "True"),
            record("img1_0_attr_color_neg", "no", "false"),
        ])
        .unwrap();

        let attributes = score_category(&tree, Category::Attributes);
        assert_eq!(attributes.scores, vec![1.0]);
        assert_eq!(attributes.num_objects, 1);
        assert!(approx_eq!(f64, attributes.mean_score, 100.0, ulps = 2));

        let objects = score_category(&tree, Category::Objects);
        assert_eq!(objects.num_objects, 0);
        assert_eq!(objects.mean_score, 0.0);
    }

    #[test]
    fn test_single_wrong_answer_scenario() {
        let tree = aggregate(&[record("img1_0_pos", "yes", "false")]).unwrap();

        let objects = score_category(&tree, Category::Objects);
        assert_eq!(objects.scores, vec![0.0]);
        assert_eq!(objects.mean_score, 0.0);

        let matrix = ConfusionMatrix::from_tree(&tree);
        assert_eq!(
            matrix,
            ConfusionMatrix {
                true_positives: 0,
                true_negatives: 0,
                false_positives: 0,
                false_negatives: 1,
            }
        );
        assert_eq!(accuracy(&matrix), 0.0);
    }

    #[test]
    fn test_objects_without_bucket_are_excluded() {
        let tree = aggregate(&[
            record("img1_0_pos", "yes", "true"),
            record("img1_0_attr_color_pos", "yes", "no"),
            record("img1_1_pos", "yes", "no"),
        ])
        .unwrap();

        let attributes = score_category(&tree, Category::Attributes);
        assert_eq!(attributes.num_objects, 1);
        assert_eq!(attributes.mean_score, 0.0);

        let objects = score_category(&tree, Category::Objects);
        assert_eq!(objects.num_objects, 2);
        assert!(approx_eq!(f64, objects.mean_score, 50.0, epsilon = 1e-9));
    }

    #[test]
    fn test_unknown_counts_as_incorrect() {
        let tree = aggregate(&[
            record("img1_0_pos", "yes", "true"),
            record("img1_0_neg", "no", "perhaps"),
        ])
        .unwrap();
        let objects = score_category(&tree, Category::Objects);
        assert!(approx_eq!(f64, objects.scores[0], 1.0 / 3.0, epsilon = 1e-12));
    }

    #[test]
    fn test_score_category_by_name() {
        let tree = aggregate(&[record("img1_0_rel_on_pos", "yes", "yes")]).unwrap();
        let result = score_category_by_name(&tree, "relations").unwrap();
        assert_eq!(result.num_objects, 1);

        assert!(matches!(
            score_category_by_name(&tree, "colors"),
            Err(GhostError::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_combined_pools_counts() {
        // objects: 1 question, 1 wrong; attributes: 3 questions, 0 wrong
        let tree = aggregate(&[
            record("img1_0_pos", "yes", "false"),
            record("img1_0_attr_a_pos", "yes", "true"),
            record("img1_0_attr_b_pos", "yes", "true"),
            record("img1_0_attr_c_neg", "no", "false"),
        ])
        .unwrap();

        let combined = score_combined(&tree);
        assert_eq!(combined.num_objects, 1);
        // 1 - W(1) / W(4) = 1 - 1 / 1.875
        assert!(approx_eq!(f64, combined.scores[0], 1.0 - 1.0 / 1.875, epsilon = 1e-12));

        let per_category_mean = (score_category(&tree, Category::Objects).scores[0]
            + score_category(&tree, Category::Attributes).scores[0])
            / 2.0;
        assert!(!approx_eq!(f64, combined.scores[0], per_category_mean, epsilon = 1e-6));
    }

    #[test]
    fn test_combined_scores_question_free_object_as_perfect() {
        let mut tree = GhostTree::new();
        tree.object_mut("img1", "img1_0");
        tree.object_mut("img1", "img1_1").insert(
            Category::Objects,
            "pos",
            QuestionEntry::new("", Label::Yes, Prediction::False),
        );

        let combined = score_combined(&tree);
        assert_eq!(combined.num_objects, 2);
        assert_eq!(combined.scores, vec![1.0, 0.0]);
        assert!(approx_eq!(f64, combined.mean_score, 50.0, epsilon = 1e-9));
    }

    #[test]
    fn test_confusion_matrix_unknown_rule() {
        let mut matrix = ConfusionMatrix::default();
        matrix.record(Label::Yes, Prediction::Unknown);
        matrix.record(Label::No, Prediction::Unknown);
        assert_eq!(matrix.false_negatives, 1);
        assert_eq!(matrix.false_positives, 1);
        assert_eq!(matrix.total(), 2);
    }

    #[test]
    fn test_confusion_matrix_counts_all_categories() {
        let tree = aggregate(&[
            record("img1_0_pos", "yes", "yes"),
            record("img1_0_attr_a_neg", "no", "no"),
            record("img1_0_rel_b_neg", "no", "true"),
            record("img2_0_pos", "yes", "what?"),
        ])
        .unwrap();

        let matrix = ConfusionMatrix::from_tree(&tree);
        assert_eq!(matrix.true_positives, 1);
        assert_eq!(matrix.true_negatives, 1);
        assert_eq!(matrix.false_positives, 1);
        assert_eq!(matrix.false_negatives, 1);
        assert!(approx_eq!(f64, matrix.accuracy(), 50.0, epsilon = 1e-9));
    }

    #[test]
    fn test_accuracy_empty_matrix_is_zero() {
        assert_eq!(accuracy(&ConfusionMatrix::default()), 0.0);
    }

    #[test]
    fn test_confusion_matrix_serializes_short_names() {
        let matrix = ConfusionMatrix {
            true_positives: 3,
            true_negatives: 2,
            false_positives: 1,
            false_negatives: 0,
        };
        let value = serde_json::to_value(matrix).unwrap();
        assert_eq!(value["TP"], 3);
        assert_eq!(value["FN"], 0);
    }

    fn arb_records() -> impl Strategy<Value = Vec<QuestionRecord>> {
        let key = "img[0-3]_[0-3]_(pos|neg|attr_[a-c]|rel_[a-c])";
        let label = prop_oneof![Just("yes"), Just("no")];
        let answer = prop_oneof![
            Just("True"),
            Just("false."),
            Just("Yes, it is"),
            Just("no"),
            Just("unsure"),
            Just(""),
        ];
        prop::collection::vec((key, label, answer), 1..40).prop_map(|items| {
            items
                .into_iter()
                .map(|(k, l, a)| QuestionRecord::new(k, l, a))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_halving_sum_recurrence(i in 1usize..48) {
            let expected = halving_sum(i - 1) + 0.5f64.powi(i as i32 - 1);
            prop_assert!((halving_sum(i) - expected).abs() < 1e-12);
            prop_assert!(halving_sum(i) > halving_sum(i - 1));
            prop_assert!(halving_sum(i) < 2.0);
        }

        #[test]
        fn prop_object_score_in_unit_range(total in 1usize..50, incorrect in 0usize..50) {
            let incorrect = incorrect.min(total);
            let score = object_score(total, incorrect);
            prop_assert!((0.0..=1.0).contains(&score));
            if incorrect == 0 {
                prop_assert_eq!(score, 1.0);
            }
            if incorrect == total {
                prop_assert_eq!(score, 0.0);
            }
        }

        #[test]
        fn prop_confusion_matrix_conserves_questions(records in arb_records()) {
            let tree = aggregate(&records).unwrap();
            let matrix = ConfusionMatrix::from_tree(&tree);
            prop_assert_eq!(matrix.total(), tree.question_count());
        }

        #[test]
        fn prop_means_are_percentages(records in arb_records()) {
            let tree = aggregate(&records).unwrap();
            for category in Category::ALL {
                let result = score_category(&tree, category);
                prop_assert!((0.0..=100.0).contains(&result.mean_score));
                prop_assert_eq!(result.num_objects, result.scores.len());
            }
            let combined = score_combined(&tree);
            prop_assert_eq!(combined.num_objects, tree.object_count());
        }
    }
}
