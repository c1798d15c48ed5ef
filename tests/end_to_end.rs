use float_cmp::approx_eq;
use ghost_eval::persistence::{load_predictions, save_predictions};
use ghost_eval::{
    Category, ConfusionMatrix, GhostError, QuestionRecord, accuracy, aggregate, evaluate,
    score_category, score_category_by_name, score_combined,
};
use tempfile::TempDir;

fn record(question_id: &str, label: &str, prediction: &str) -> QuestionRecord {
    QuestionRecord::new(question_id, label, prediction)
        .with_text("statement")
        .with_model("test-vlm")
}

#[test]
fn attribute_pair_answered_consistently() {
    let records = vec![
        record("img1_0_attr_color_pos", "yes", "True"),
        record("img1_0_attr_color_neg", "no", "false"),
    ];
    let tree = aggregate(&records).unwrap();

    let object = tree.object("img1_0").unwrap();
    assert_eq!(object.attr.len(), 2);
    assert_eq!(object.incorrect_count(Category::Attributes), 0);

    let attributes = score_category(&tree, Category::Attributes);
    assert_eq!(attributes.scores, vec![1.0]);
    assert!(approx_eq!(f64, attributes.mean_score, 100.0, ulps = 2));
}

#[test]
fn single_wrong_answer() {
    let tree = aggregate(&[record("img1_0_pos", "yes", "false")]).unwrap();

    let objects = score_category_by_name(&tree, "objects").unwrap();
    assert_eq!(objects.scores, vec![0.0]);
    assert_eq!(objects.mean_score, 0.0);

    let matrix = ConfusionMatrix::from_tree(&tree);
    assert_eq!(
        (
            matrix.true_positives,
            matrix.true_negatives,
            matrix.false_positives,
            matrix.false_negatives
        ),
        (0, 0, 0, 1)
    );
    assert_eq!(accuracy(&matrix), 0.0);
}

#[test]
fn category_without_questions_is_excluded() {
    let tree = aggregate(&[
        record("img1_0_pos", "yes", "yes"),
        record("img1_0_rel_on_pos", "yes", "no"),
        record("img2_0_pos", "yes", "yes"),
    ])
    .unwrap();

    let relations = score_category(&tree, Category::Relations);
    assert_eq!(relations.num_objects, 1);
    assert_eq!(relations.mean_score, 0.0);

    let objects = score_category(&tree, Category::Objects);
    assert_eq!(objects.num_objects, 2);
    assert!(approx_eq!(f64, objects.mean_score, 100.0, ulps = 2));

    // img1_0: 2 questions, 1 wrong; img2_0: perfect
    let combined = score_combined(&tree);
    assert_eq!(combined.num_objects, 2);
    let expected = (1.0 / 3.0 + 1.0) / 2.0 * 100.0;
    assert!(approx_eq!(f64, combined.mean_score, expected, epsilon = 1e-9));
}

#[test]
fn invalid_category_is_rejected() {
    let tree = aggregate(&[record("img1_0_pos", "yes", "yes")]).unwrap();
    assert!(matches!(
        score_category_by_name(&tree, "scenes"),
        Err(GhostError::InvalidCategory(_))
    ));
}

#[test]
fn duplicate_keys_keep_the_later_record() {
    let report = evaluate(&[
        record("img1_0_pos", "yes", "yes"),
        record("img1_0_pos", "yes", "no"),
    ])
    .unwrap();

    assert_eq!(report.num_records, 2);
    assert_eq!(report.statistics.total_questions, 1);
    assert_eq!(report.confusion_matrix.total(), 1);
    assert_eq!(report.objects_gcs, 0.0);
}

#[test]
fn evaluate_prediction_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test-vlm.json");

    let records = vec![
        record("img1_0_pos", "yes", "True."),
        record("img1_0_attr_size_neg", "no", "No, it is not."),
        record("img1_1_pos", "yes", "Unclear"),
        record("img2_0_rel_near_pos", "yes", "The statement is true"),
    ];
    save_predictions(&records, &path).unwrap();

    let loaded = load_predictions(&path, 10).unwrap();
    let report = evaluate(&loaded).unwrap();

    assert_eq!(report.model_name.as_deref(), Some("test-vlm"));
    assert_eq!(report.statistics.unique_objects, 3);
    assert_eq!(report.statistics.predictions.unknown, 1);
    assert_eq!(report.confusion_matrix.total(), 4);
    assert_eq!(report.confusion_matrix.false_negatives, 1);
    assert!(approx_eq!(f64, report.accuracy, 75.0, epsilon = 1e-9));
    assert!(approx_eq!(f64, report.objects_gcs, 50.0, epsilon = 1e-9));
    assert!(approx_eq!(f64, report.relations_gcs, 100.0, epsilon = 1e-9));
}

#[test]
fn malformed_key_is_a_format_error() {
    let result = evaluate(&[record("img1", "yes", "yes")]);
    assert!(matches!(result, Err(GhostError::Format(_))));
}
