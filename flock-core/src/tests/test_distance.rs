// flock-core/src/tests/test_distance.rs
use approx::assert_relative_eq;

use crate::distance::{DEGENERATE_DISTANCE, Metric, distance, ranks};
use crate::matrix::VectorStore;

const W2: [f64; 2] = [1.0, 1.0];
const W3: [f64; 3] = [1.0, 1.0, 1.0];
const W4: [f64; 4] = [1.0, 1.0, 1.0, 1.0];

#[test]
fn test_euclidean_is_squared_internally() {
    crate::init();
    let d = Metric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0], None, None, &W2);
    assert_relative_eq!(d, 25.0, epsilon = 1e-12);
    assert_relative_eq!(Metric::Euclidean.report(d), 5.0, epsilon = 1e-12);
}

#[test]
fn test_city_block() {
    let d = distance(&[0.0, 0.0], &[3.0, -4.0], None, None, &W2, Metric::CityBlock);
    assert_relative_eq!(d, 7.0, epsilon = 1e-12);
    assert_relative_eq!(Metric::CityBlock.report(d), 7.0, epsilon = 1e-12);
}

#[test]
fn test_mask_excludes_columns() {
    let a = [1.0, 2.0, 100.0];
    let b = [1.0, 4.0, 0.0];
    let mask_a = [true, true, false];

    let d = Metric::Euclidean.distance(&a, &b, Some(&mask_a), None, &W3);
    assert_relative_eq!(d, 4.0, epsilon = 1e-12);

    // the unobserved column may hold anything
    let a_other = [1.0, 2.0, -7.5];
    let d_other = Metric::Euclidean.distance(&a_other, &b, Some(&mask_a), None, &W3);
    assert_relative_eq!(d, d_other, epsilon = 1e-12);
}

#[test]
fn test_column_weights() {
    let d = Metric::Euclidean.distance(&[0.0, 0.0], &[1.0, 1.0], None, None, &[2.0, 0.0]);
    assert_relative_eq!(d, 2.0, epsilon = 1e-12);

    let d = Metric::CityBlock.distance(&[0.0, 0.0], &[1.0, 3.0], None, None, &[0.5, 2.0]);
    assert_relative_eq!(d, 6.5, epsilon = 1e-12);
}

#[test]
fn test_no_joint_columns() {
    let mask_a = [true, false];
    let mask_b = [false, true];
    let a = [1.0, 2.0];
    let b = [5.0, 9.0];

    for metric in [Metric::Euclidean, Metric::CityBlock] {
        assert_eq!(metric.distance(&a, &b, Some(&mask_a), Some(&mask_b), &W2), 0.0);
    }
    for metric in Metric::ALL.iter().filter(|m| m.is_correlation()) {
        assert_eq!(
            metric.distance(&a, &b, Some(&mask_a), Some(&mask_b), &W2),
            DEGENERATE_DISTANCE,
            "{} should be degenerate without joint columns",
            metric
        );
    }
}

#[test]
fn test_correlation_needs_two_columns() {
    let mask = [true, false, false];
    let d = Metric::Correlation.distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], Some(&mask), None, &W3);
    assert_eq!(d, DEGENERATE_DISTANCE);
    assert_eq!(Metric::Correlation.report(d), DEGENERATE_DISTANCE);
}

#[test]
fn test_pearson_family() {
    let a = [1.0, 2.0, 3.0];
    let up = [2.0, 4.0, 6.0];
    let down = [3.0, 2.0, 1.0];

    assert_relative_eq!(Metric::Correlation.distance(&a, &up, None, None, &W3), 0.0, epsilon = 1e-12);
    assert_relative_eq!(Metric::Correlation.distance(&a, &down, None, None, &W3), 2.0, epsilon = 1e-12);
    assert_relative_eq!(
        Metric::AbsoluteCorrelation.distance(&a, &down, None, None, &W3),
        0.0,
        epsilon = 1e-12
    );
}

#[test]
fn test_uncentered_correlation() {
    let d = Metric::UncenteredCorrelation.distance(&[1.0, 0.0], &[0.0, 1.0], None, None, &W2);
    assert_relative_eq!(d, 1.0, epsilon = 1e-12);

    let d = Metric::UncenteredCorrelation.distance(&[1.0, 1.0], &[2.0, 2.0], None, None, &W2);
    assert_relative_eq!(d, 0.0, epsilon = 1e-12);

    let d = Metric::AbsoluteUncenteredCorrelation.distance(&[1.0, 1.0], &[-3.0, -3.0], None, None, &W2);
    assert_relative_eq!(d, 0.0, epsilon = 1e-12);
}

#[test]
fn test_zero_variance_is_uncorrelated() {
    let d = Metric::Correlation.distance(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0], None, None, &W3);
    assert_relative_eq!(d, 1.0, epsilon = 1e-12);
}

#[test]
fn test_spearman_ignores_monotone_transform() {
    let a = [1.0, 2.0, 3.0, 4.0];
    let b = [1.0, 4.0, 9.0, 16.0];
    let d = Metric::Spearman.distance(&a, &b, None, None, &W4);
    assert_relative_eq!(d, 0.0, epsilon = 1e-12);

    let pearson = Metric::Correlation.distance(&a, &b, None, None, &W4);
    assert!(pearson > d);
}

#[test]
fn test_ranks_average_ties() {
    assert_eq!(ranks(&[10.0, 20.0, 20.0, 30.0]), vec![1.0, 2.5, 2.5, 4.0]);
    assert_eq!(ranks(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    assert_eq!(ranks(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
}

#[test]
fn test_kendall() {
    let d = Metric::Kendall.distance(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0], None, None, &W3);
    assert_relative_eq!(d, 2.0, epsilon = 1e-12);

    // one discordant pair out of six
    let d = Metric::Kendall.distance(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 2.0, 4.0], None, None, &W4);
    assert_relative_eq!(d, 1.0 - 4.0 / 6.0, epsilon = 1e-12);
}

#[test]
fn test_metric_symmetry() {
    let a = [0.3, -1.2, 4.4, 2.0];
    let b = [1.1, 0.7, -2.0, 2.5];
    for metric in Metric::ALL {
        let ab = metric.distance(&a, &b, None, None, &W4);
        let ba = metric.distance(&b, &a, None, None, &W4);
        assert_relative_eq!(ab, ba, epsilon = 1e-12);
        assert!(ab >= 0.0, "{} produced a negative distance", metric);
    }
}

#[test]
fn test_metric_from_str() {
    for metric in Metric::ALL {
        assert_eq!(metric.to_string().parse::<Metric>().unwrap(), metric);
        assert_eq!(metric.code().to_string().parse::<Metric>().unwrap(), metric);
    }
    assert_eq!("Pearson".parse::<Metric>().unwrap(), Metric::Correlation);
    assert_eq!("manhattan".parse::<Metric>().unwrap(), Metric::CityBlock);
    assert!("cosine".parse::<Metric>().is_err());
}

#[test]
fn test_store_row_distance() {
    let store = VectorStore::load(
        vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 9.0]],
        Some(vec![
            vec![true, true],
            vec![true, true],
            vec![true, false],
        ]),
        None,
    )
    .unwrap()
    .with_column_weights(vec![1.0, 2.0])
    .unwrap();

    assert_relative_eq!(store.row_distance(0, 1, Metric::Euclidean), 9.0 + 32.0, epsilon = 1e-12);
    assert_relative_eq!(store.row_distance(0, 2, Metric::Euclidean), 1.0, epsilon = 1e-12);
    assert_relative_eq!(
        store.distance_to(2, &[1.0, 0.0], None, Metric::CityBlock),
        0.0,
        epsilon = 1e-12
    );
}
