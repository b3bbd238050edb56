// flock-core/src/distance.rs
//! Distance metrics over masked, column-weighted rows
//!
//! Implements:
//! - Euclidean (kept squared internally) and city-block distances
//! - Pearson, absolute Pearson, uncentered and absolute uncentered correlation
//! - Spearman rank correlation and Kendall's tau-b
//!
//! Every metric is computed over S, the set of columns observed in both rows.
//! Correlation-type metrics need |S| >= 2; below that they return
//! [`DEGENERATE_DISTANCE`] instead of failing, so the iterative algorithms that
//! call them stay total.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::matrix::VectorStore;

/// Sentinel for "cannot be compared": fewer than two jointly observed columns
/// under a correlation-type metric.
pub const DEGENERATE_DISTANCE: f64 = f64::MAX;

/// Distance measure selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Weighted sum of squared differences
    #[default]
    Euclidean,
    /// Weighted sum of absolute differences
    CityBlock,
    /// 1 - r, Pearson correlation
    Correlation,
    /// 1 - |r|
    AbsoluteCorrelation,
    /// 1 - r without mean subtraction
    UncenteredCorrelation,
    /// 1 - |r| without mean subtraction
    AbsoluteUncenteredCorrelation,
    /// 1 - r over averaged-tie ranks
    Spearman,
    /// 1 - tau-b
    Kendall,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Euclidean,
        Metric::CityBlock,
        Metric::Correlation,
        Metric::AbsoluteCorrelation,
        Metric::UncenteredCorrelation,
        Metric::AbsoluteUncenteredCorrelation,
        Metric::Spearman,
        Metric::Kendall,
    ];

    /// Single-character code used by the Cluster 3.0 family of tools.
    pub fn code(&self) -> char {
        match self {
            Metric::Euclidean => 'e',
            Metric::CityBlock => 'b',
            Metric::Correlation => 'c',
            Metric::AbsoluteCorrelation => 'a',
            Metric::UncenteredCorrelation => 'u',
            Metric::AbsoluteUncenteredCorrelation => 'x',
            Metric::Spearman => 's',
            Metric::Kendall => 'k',
        }
    }

    pub fn is_correlation(&self) -> bool {
        !matches!(self, Metric::Euclidean | Metric::CityBlock)
    }

    /// Convert an internal distance to its reported form.
    ///
    /// Euclidean distances are squared internally; this takes the root.
    pub fn report(&self, distance: f64) -> f64 {
        match self {
            Metric::Euclidean if distance < DEGENERATE_DISTANCE => distance.sqrt(),
            _ => distance,
        }
    }

    /// Distance between `a` and `b` over the columns observed in both.
    ///
    /// `weights` holds one weight per column. A `None` mask means fully observed.
    pub fn distance(
        &self,
        a: &[f64],
        b: &[f64],
        mask_a: Option<&[bool]>,
        mask_b: Option<&[bool]>,
        weights: &[f64],
    ) -> f64 {
        assert_eq!(a.len(), b.len());
        assert_eq!(a.len(), weights.len());

        let joint = joint_columns(a.len(), mask_a, mask_b);
        match self {
            Metric::Euclidean => joint
                .iter()
                .map(|&j| {
                    let diff = a[j] - b[j];
                    weights[j] * diff * diff
                })
                .sum(),
            Metric::CityBlock => joint
                .iter()
                .map(|&j| weights[j] * (a[j] - b[j]).abs())
                .sum(),
            _ if joint.len() < 2 => DEGENERATE_DISTANCE,
            Metric::Correlation => 1.0 - pearson(a, b, &joint, weights, true),
            Metric::AbsoluteCorrelation => 1.0 - pearson(a, b, &joint, weights, true).abs(),
            Metric::UncenteredCorrelation => 1.0 - pearson(a, b, &joint, weights, false),
            Metric::AbsoluteUncenteredCorrelation => {
                1.0 - pearson(a, b, &joint, weights, false).abs()
            }
            Metric::Spearman => {
                let xs: Vec<f64> = joint.iter().map(|&j| a[j]).collect();
                let ys: Vec<f64> = joint.iter().map(|&j| b[j]).collect();
                let ws: Vec<f64> = joint.iter().map(|&j| weights[j]).collect();
                let (rx, ry) = (ranks(&xs), ranks(&ys));
                let all: Vec<usize> = (0..rx.len()).collect();
                1.0 - pearson(&rx, &ry, &all, &ws, true)
            }
            Metric::Kendall => 1.0 - kendall_tau(a, b, &joint),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Euclidean => "euclidean",
            Metric::CityBlock => "cityblock",
            Metric::Correlation => "correlation",
            Metric::AbsoluteCorrelation => "absolute_correlation",
            Metric::UncenteredCorrelation => "uncentered_correlation",
            Metric::AbsoluteUncenteredCorrelation => "absolute_uncentered_correlation",
            Metric::Spearman => "spearman",
            Metric::Kendall => "kendall",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Metric {
    type Err = String;

    /// Accepts the display name or the single-character code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.to_string() == lowered || lowered == m.code().to_string())
            .or(match lowered.as_str() {
                "city_block" | "manhattan" => Some(Metric::CityBlock),
                "pearson" => Some(Metric::Correlation),
                _ => None,
            })
            .ok_or_else(|| format!("unknown metric '{}'", s))
    }
}

/// Free-function form of [`Metric::distance`].
pub fn distance(
    a: &[f64],
    b: &[f64],
    mask_a: Option<&[bool]>,
    mask_b: Option<&[bool]>,
    weights: &[f64],
    metric: Metric,
) -> f64 {
    metric.distance(a, b, mask_a, mask_b, weights)
}

impl VectorStore {
    /// Distance between rows `i` and `j` under the store's column weights.
    pub fn row_distance(&self, i: usize, j: usize, metric: Metric) -> f64 {
        metric.distance(
            self.row(i),
            self.row(j),
            self.row_mask(i),
            self.row_mask(j),
            self.column_weights(),
        )
    }

    /// Distance between row `i` and an arbitrary point (centroid, grid node).
    pub fn distance_to(
        &self,
        i: usize,
        point: &[f64],
        point_mask: Option<&[bool]>,
        metric: Metric,
    ) -> f64 {
        metric.distance(
            self.row(i),
            point,
            self.row_mask(i),
            point_mask,
            self.column_weights(),
        )
    }
}

fn joint_columns(n: usize, mask_a: Option<&[bool]>, mask_b: Option<&[bool]>) -> Vec<usize> {
    (0..n)
        .filter(|&j| mask_a.map_or(true, |m| m[j]) && mask_b.map_or(true, |m| m[j]))
        .collect()
}

/// Weighted (centered or uncentered) correlation over `cols`.
///
/// Zero total weight, zero variance or zero norm yield r = 0.
fn pearson(a: &[f64], b: &[f64], cols: &[usize], weights: &[f64], centered: bool) -> f64 {
    let total: f64 = cols.iter().map(|&j| weights[j]).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let (mean_a, mean_b) = if centered {
        (
            cols.iter().map(|&j| weights[j] * a[j]).sum::<f64>() / total,
            cols.iter().map(|&j| weights[j] * b[j]).sum::<f64>() / total,
        )
    } else {
        (0.0, 0.0)
    };

    let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
    for &j in cols {
        let (x, y) = (a[j] - mean_a, b[j] - mean_b);
        sab += weights[j] * x * y;
        saa += weights[j] * x * x;
        sbb += weights[j] * y * y;
    }

    let denom = (saa * sbb).sqrt();
    if denom <= f64::EPSILON * f64::EPSILON || !denom.is_finite() {
        return 0.0;
    }
    (sab / denom).clamp(-1.0, 1.0)
}

/// 1-based ranks, ties receive the average of the ranks they span.
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&x, &y| values[x].total_cmp(&values[y]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        start = end;
    }
    ranks
}

/// Kendall's tau-b over `cols` from concordant / discordant pair counts.
fn kendall_tau(a: &[f64], b: &[f64], cols: &[usize]) -> f64 {
    let (mut concordant, mut discordant) = (0.0f64, 0.0f64);
    let (mut ties_a, mut ties_b) = (0.0f64, 0.0f64);

    for (p, &jp) in cols.iter().enumerate() {
        for &jq in &cols[p + 1..] {
            let da = a[jp] - a[jq];
            let db = b[jp] - b[jq];
            if da == 0.0 && db == 0.0 {
                continue;
            } else if da == 0.0 {
                ties_a += 1.0;
            } else if db == 0.0 {
                ties_b += 1.0;
            } else if da * db > 0.0 {
                concordant += 1.0;
            } else {
                discordant += 1.0;
            }
        }
    }

    let denom = ((concordant + discordant + ties_a) * (concordant + discordant + ties_b)).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (concordant - discordant) / denom
}
