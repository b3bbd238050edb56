use crate::densify::{Densifier, SparseRecords, Vocabulary, densify};
use crate::error::ClusterError;

fn labels(records: &[&[&str]]) -> SparseRecords {
    SparseRecords::LabelSets(
        records
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    )
}

fn fruit_records() -> SparseRecords {
    labels(&[
        &["apple", "orange"],
        &["black", "white"],
        &["white", "cyan"],
        &["apple", "orange"],
        &["apple"],
    ])
}

#[test]
fn test_label_sets_one_hot() {
    crate::init();
    let (store, weights) = densify(&fruit_records(), None).unwrap();

    assert_eq!((store.nrows, store.ncols), (5, 5));
    assert_eq!(store.row(0), &[1.0, 1.0, 0.0, 0.0, 0.0]);
    assert_eq!(store.row(1), &[0.0, 0.0, 1.0, 1.0, 0.0]);
    assert_eq!(store.row(2), &[0.0, 0.0, 0.0, 1.0, 1.0]);
    assert_eq!(store.row(3), store.row(0));
    assert_eq!(store.row(4), &[1.0, 0.0, 0.0, 0.0, 0.0]);
    assert!(!store.has_mask());
    assert_eq!(weights, vec![1.0; 5]);
}

#[test]
fn test_vocabulary_first_seen_order() {
    let densifier = Densifier::fit(&fruit_records()).unwrap();
    assert_eq!(
        densifier.vocabulary().labels(),
        &["apple", "orange", "black", "white", "cyan"]
    );
    assert_eq!(densifier.vocabulary().column("white"), Some(3));
    assert_eq!(densifier.vocabulary().column("purple"), None);
}

#[test]
fn test_densify_is_deterministic() {
    let first = Densifier::fit(&fruit_records()).unwrap();
    let second = Densifier::fit(&fruit_records()).unwrap();
    assert_eq!(first.vocabulary(), second.vocabulary());
    assert_eq!(
        first.transform(&fruit_records()).unwrap(),
        second.transform(&fruit_records()).unwrap()
    );
}

#[test]
fn test_labeled_weights() {
    let records = SparseRecords::LabeledWeights(vec![
        vec![("a".to_string(), 0.5), ("b".to_string(), 2.0)],
        vec![("c".to_string(), 3.0)],
        vec![("b".to_string(), 1.5), ("a".to_string(), 4.0)],
    ]);
    let (store, _) = densify(&records, None).unwrap();

    assert_eq!(store.ncols, 3);
    assert_eq!(store.row(0), &[0.5, 2.0, 0.0]);
    assert_eq!(store.row(1), &[0.0, 0.0, 3.0]);
    assert_eq!(store.row(2), &[4.0, 1.5, 0.0]);
}

#[test]
fn test_weight_override_is_resampled() {
    let overrides = vec![
        ("white".to_string(), 3.0),
        ("apple".to_string(), 0.5),
        ("never-seen".to_string(), 9.0),
    ];
    let (store, weights) = densify(&fruit_records(), Some(&overrides)).unwrap();

    assert_eq!(weights, vec![0.5, 1.0, 1.0, 3.0, 1.0]);
    assert_eq!(store.column_weights(), weights.as_slice());
}

#[test]
fn test_fixed_vocabulary_drops_unseen_labels() {
    let densifier = Densifier::with_vocabulary(Vocabulary::from_labels(["apple", "white"]));
    let store = densifier
        .transform(&labels(&[&["white", "purple"], &["apple"]]))
        .unwrap();

    assert_eq!(store.ncols, 2);
    assert_eq!(store.row(0), &[0.0, 1.0]);
    assert_eq!(store.row(1), &[1.0, 0.0]);
    assert_eq!(densifier.vocabulary().len(), 2);
}

#[test]
fn test_empty_records() {
    let err = densify(&SparseRecords::LabelSets(vec![]), None).unwrap_err();
    assert!(matches!(err, ClusterError::EmptyInput { .. }));

    let err = densify(&SparseRecords::LabelSets(vec![vec![], vec![]]), None).unwrap_err();
    assert!(matches!(err, ClusterError::EmptyInput { .. }));
}
