//! Entry-point tests: input resolution, option plumbing and error surfacing.

use std::str::FromStr;

use crate::tests::init;
use crate::tests::test_data::{fruit_records, recovers_blocks, three_blobs};
use crate::{
    ClusterError, ClusterInput, ClusterOptions, EmptyClusterPolicy, Linkage, Method, Metric,
    Seeding, cluster_grid, cluster_partition, cluster_tree, prepare_store,
};

#[test]
fn test_fruit_partition_keeps_identical_rows_together() {
    init();
    let options = ClusterOptions::new().with_seed(2024);

    let result = cluster_partition(2, fruit_records(), &options).unwrap();

    assert_eq!(result.assignment.len(), 5);
    assert_eq!(result.assignment[0], result.assignment[3]);
    assert!(result.assignment.iter().all(|&c| c < 2));
    assert_eq!(result.centroids[0].len(), 5);
}

#[test]
fn test_fruit_tree() {
    init();
    let options = ClusterOptions::new().with_linkage(Linkage::Average);

    let result = cluster_tree(2, fruit_records(), &options).unwrap();

    assert_eq!(result.tree.len(), 4);
    assert_eq!(result.assignment[0], result.assignment[3]);
    assert_eq!(result.assignment[0], result.assignment[4]);
    assert_eq!(result.assignment[1], result.assignment[2]);
    assert_ne!(result.assignment[0], result.assignment[1]);
}

#[test]
fn test_dense_entry_points() {
    init();
    let options = ClusterOptions::new()
        .with_seed(5)
        .with_seeding(Seeding::SpreadOut)
        .with_metric(Metric::CityBlock);

    let partition = cluster_partition(3, three_blobs(), &options).unwrap();
    assert!(recovers_blocks(&partition.assignment, 12));

    let tree = cluster_tree(3, three_blobs(), &options).unwrap();
    assert!(recovers_blocks(&tree.assignment, 12));

    let grid = cluster_grid(2, 2, three_blobs(), &options).unwrap();
    assert_eq!(grid.assignment.len(), 36);
}

#[test]
fn test_errors_surface_before_work() {
    init();
    let options = ClusterOptions::new();

    assert_eq!(
        cluster_partition(0, three_blobs(), &options).unwrap_err(),
        ClusterError::InvalidK { k: 0, n_rows: 36 }
    );
    assert_eq!(
        cluster_tree(37, three_blobs(), &options).unwrap_err(),
        ClusterError::InvalidK { k: 37, n_rows: 36 }
    );
    assert_eq!(
        cluster_grid(0, 4, three_blobs(), &options).unwrap_err(),
        ClusterError::InvalidGrid { nx: 0, ny: 4 }
    );
    assert!(matches!(
        cluster_partition(1, Vec::<Vec<f64>>::new(), &options),
        Err(ClusterError::EmptyInput { .. })
    ));
    assert!(matches!(
        cluster_partition(1, vec![vec![1.0, 2.0], vec![3.0]], &options),
        Err(ClusterError::Shape { .. })
    ));

    let bad_mask = ClusterOptions::new().with_mask(vec![vec![true]]);
    assert!(matches!(
        cluster_partition(1, vec![vec![1.0, 2.0]], &bad_mask),
        Err(ClusterError::Shape { .. })
    ));
    let bad_weights = ClusterOptions::new().with_weights(vec![1.0, -1.0]);
    assert!(matches!(
        cluster_tree(1, vec![vec![1.0, 2.0]], &bad_weights),
        Err(ClusterError::Shape { .. })
    ));
}

#[test]
fn test_prepare_dense_with_mask_and_weights() {
    init();
    let options = ClusterOptions::new()
        .with_mask(vec![vec![true, false], vec![true, true]])
        .with_weights(vec![2.0, 0.5])
        .with_row_weights(vec![1.0, 3.0]);

    let store = prepare_store(vec![vec![1.0, f64::NAN], vec![2.0, 3.0]].into(), &options).unwrap();

    assert!(!store.is_observed(0, 1));
    assert_eq!(store.column_weights(), &[2.0, 0.5]);
    assert_eq!(store.row_weights(), &[1.0, 3.0]);
}

#[test]
fn test_prepare_transpose_swaps_weights() {
    init();
    let options = ClusterOptions::new()
        .with_transpose(true)
        .with_row_weights(vec![2.0, 3.0]);

    let store = prepare_store(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]].into(), &options).unwrap();

    assert_eq!((store.nrows, store.ncols), (3, 2));
    assert_eq!(store.row(2), &[3.0, 6.0]);
    assert_eq!(store.column_weights(), &[2.0, 3.0]);
}

#[test]
fn test_prepare_sparse_forcing_treats_values_as_labels() {
    init();
    let options = ClusterOptions::new()
        .with_sparse(true)
        .with_mask(vec![vec![true, false]; 3]);

    let store = prepare_store(
        vec![vec![1.0, 2.0], vec![2.0, 1.0], vec![3.0, 4.0]].into(),
        &options,
    )
    .unwrap();

    assert_eq!((store.nrows, store.ncols), (3, 4));
    assert_eq!(store.row(0), store.row(1));
    assert_eq!(store.row(2), &[0.0, 0.0, 1.0, 1.0]);
    assert!(!store.has_mask());
}

#[test]
fn test_prepare_labeled_weights_with_override() {
    init();
    let records = vec![
        vec![("red".to_string(), 0.5), ("blue".to_string(), 2.0)],
        vec![("green".to_string(), 1.0)],
    ];
    let options = ClusterOptions::new()
        .with_label_weights(vec![("green".to_string(), 4.0), ("pink".to_string(), 9.0)]);

    let store = prepare_store(ClusterInput::from(records), &options).unwrap();

    assert_eq!(store.row(0), &[0.5, 2.0, 0.0]);
    assert_eq!(store.row(1), &[0.0, 0.0, 1.0]);
    assert_eq!(store.column_weights(), &[1.0, 1.0, 4.0]);
}

#[test]
fn test_option_enums_parse() {
    assert_eq!(Method::from_str("m").unwrap(), Method::Median);
    assert_eq!(Method::from_str("Average").unwrap(), Method::Average);
    assert_eq!(Seeding::from_str("kmeans++").unwrap(), Seeding::KMeansPlusPlus);
    assert_eq!(Seeding::from_str("spreadout").unwrap(), Seeding::SpreadOut);
    assert_eq!(Linkage::from_str("c").unwrap(), Linkage::Centroid);
    assert_eq!(Linkage::from_str("maximum").unwrap(), Linkage::Complete);
    assert_eq!(
        EmptyClusterPolicy::from_str("reseed").unwrap(),
        EmptyClusterPolicy::ReseedFarthest
    );
    assert!(Linkage::from_str("ward").is_err());

    for seeding in [Seeding::Random, Seeding::KMeansPlusPlus, Seeding::SpreadOut] {
        assert_eq!(Seeding::from_str(&seeding.to_string()).unwrap(), seeding);
    }
}

#[test]
fn test_option_defaults() {
    let options = ClusterOptions::default();

    assert_eq!(options.metric, Metric::Euclidean);
    assert_eq!(options.method, Method::Average);
    assert_eq!(options.linkage, Linkage::Average);
    assert_eq!(options.trials, 10);
    assert_eq!(options.empty_cluster, EmptyClusterPolicy::Retain);
    assert!(options.parallel);
    assert_eq!(ClusterOptions::new().with_trials(0).trials, 1);
}
