//! Seeded synthetic datasets shared by the clustering tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// `n` points in `dim` dimensions scattered uniformly within `spread` of `center`.
pub fn make_blob(center: &[f64], n: usize, spread: f64, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            center
                .iter()
                .map(|c| c + rng.random_range(-spread..spread))
                .collect()
        })
        .collect()
}

/// Well separated blobs, rows grouped by blob: rows `b*per..(b+1)*per` belong to blob `b`.
pub fn make_blobs(centers: &[Vec<f64>], per: usize, spread: f64, seed: u64) -> Vec<Vec<f64>> {
    centers
        .iter()
        .enumerate()
        .flat_map(|(b, c)| make_blob(c, per, spread, seed.wrapping_add(b as u64)))
        .collect()
}

pub fn three_blobs() -> Vec<Vec<f64>> {
    make_blobs(
        &[vec![0.0, 0.0], vec![10.0, 10.0], vec![-10.0, 10.0]],
        12,
        1.0,
        42,
    )
}

pub fn fruit_records() -> Vec<Vec<&'static str>> {
    vec![
        vec!["apple", "orange"],
        vec!["black", "white"],
        vec!["white", "cyan"],
        vec!["apple", "orange"],
        vec!["apple"],
    ]
}

/// True when rows in the same blob share a label and different blobs do not.
pub fn recovers_blocks(assignment: &[usize], per: usize) -> bool {
    let blocks = assignment.len() / per;
    let labels: Vec<usize> = (0..blocks).map(|b| assignment[b * per]).collect();
    let distinct = labels
        .iter()
        .enumerate()
        .all(|(i, l)| !labels[..i].contains(l));
    distinct
        && assignment
            .iter()
            .enumerate()
            .all(|(i, &a)| a == labels[i / per])
}
