// flock-core/src/matrix.rs
//! Row-major vector store shared by every clustering stage.
//!
//! A `VectorStore` holds N rows × D columns of reals, an optional observed-mask of
//! the same shape, one weight per row and one weight per column. It is validated
//! once at load time and never mutated afterwards.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{ClusterError, ClusterResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorStore {
    values: Vec<f64>,
    /// `None` means every entry is observed.
    mask: Option<Vec<bool>>,
    row_weights: Vec<f64>,
    column_weights: Vec<f64>,
    pub nrows: usize,
    pub ncols: usize,
}

impl VectorStore {
    /// Load rows with an optional mask and optional per-row weights.
    ///
    /// Fails with `Shape` on ragged rows, a mask whose shape differs from the data,
    /// a weight count different from the row count, negative or non-finite weights,
    /// and non-finite observed values. Fails with `EmptyInput` on zero rows or columns.
    pub fn load(
        rows: Vec<Vec<f64>>,
        mask: Option<Vec<Vec<bool>>>,
        row_weights: Option<Vec<f64>>,
    ) -> ClusterResult<Self> {
        let nrows = rows.len();
        if nrows == 0 {
            return Err(ClusterError::empty_input("no rows to load"));
        }
        let ncols = rows[0].len();
        if ncols == 0 {
            return Err(ClusterError::empty_input("rows have zero columns"));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
            return Err(ClusterError::shape(format!(
                "row {} has {} columns, expected {}",
                i,
                row.len(),
                ncols
            )));
        }

        let flat_mask = match mask {
            Some(m) => {
                if m.len() != nrows {
                    return Err(ClusterError::shape(format!(
                        "mask has {} rows, data has {}",
                        m.len(),
                        nrows
                    )));
                }
                if let Some((i, row)) = m.iter().enumerate().find(|(_, r)| r.len() != ncols) {
                    return Err(ClusterError::shape(format!(
                        "mask row {} has {} columns, data has {}",
                        i,
                        row.len(),
                        ncols
                    )));
                }
                Some(m.into_iter().flatten().collect::<Vec<bool>>())
            }
            None => None,
        };

        let values: Vec<f64> = rows.into_iter().flatten().collect();
        Self::from_parts(values, flat_mask, row_weights, nrows, ncols)
    }

    /// Factory from a flat row-major buffer, all entries observed, unit weights.
    pub fn from_vec(data: Vec<f64>, nrows: usize, ncols: usize) -> ClusterResult<Self> {
        if nrows == 0 || ncols == 0 {
            return Err(ClusterError::empty_input(format!(
                "cannot build a {}x{} store",
                nrows, ncols
            )));
        }
        if data.len() != nrows * ncols {
            return Err(ClusterError::shape(format!(
                "buffer holds {} values, expected {}x{}",
                data.len(),
                nrows,
                ncols
            )));
        }
        Self::from_parts(data, None, None, nrows, ncols)
    }

    /// Copy a smartcore matrix into a fully observed store.
    pub fn from_dense_matrix(matrix: &DenseMatrix<f64>) -> ClusterResult<Self> {
        let (nrows, ncols) = matrix.shape();
        let mut data = Vec::with_capacity(nrows * ncols);
        for i in 0..nrows {
            for j in 0..ncols {
                data.push(*matrix.get((i, j)));
            }
        }
        Self::from_vec(data, nrows, ncols)
    }

    fn from_parts(
        values: Vec<f64>,
        mask: Option<Vec<bool>>,
        row_weights: Option<Vec<f64>>,
        nrows: usize,
        ncols: usize,
    ) -> ClusterResult<Self> {
        let row_weights = match row_weights {
            Some(w) => {
                if w.len() != nrows {
                    return Err(ClusterError::shape(format!(
                        "{} row weights for {} rows",
                        w.len(),
                        nrows
                    )));
                }
                check_weights(&w, "row")?;
                w
            }
            None => vec![1.0; nrows],
        };

        for (idx, v) in values.iter().enumerate() {
            let observed = mask.as_ref().map_or(true, |m| m[idx]);
            if observed && !v.is_finite() {
                return Err(ClusterError::shape(format!(
                    "non-finite observed value at ({}, {}); mask it out instead",
                    idx / ncols,
                    idx % ncols
                )));
            }
        }

        // An all-true mask carries no information.
        let mask = mask.filter(|m| m.iter().any(|&o| !o));

        debug!(
            "VectorStore loaded: {} rows x {} cols, masked={}",
            nrows,
            ncols,
            mask.is_some()
        );

        Ok(Self {
            values,
            mask,
            row_weights,
            column_weights: vec![1.0; ncols],
            nrows,
            ncols,
        })
    }

    /// Replace the per-column (feature) weights used by weighted metrics.
    pub fn with_column_weights(mut self, weights: Vec<f64>) -> ClusterResult<Self> {
        if weights.len() != self.ncols {
            return Err(ClusterError::shape(format!(
                "{} column weights for {} columns",
                weights.len(),
                self.ncols
            )));
        }
        check_weights(&weights, "column")?;
        self.column_weights = weights;
        Ok(self)
    }

    /// Replace the per-row (record) weights used by centroid aggregation.
    pub fn with_row_weights(mut self, weights: Vec<f64>) -> ClusterResult<Self> {
        if weights.len() != self.nrows {
            return Err(ClusterError::shape(format!(
                "{} row weights for {} rows",
                weights.len(),
                self.nrows
            )));
        }
        check_weights(&weights, "row")?;
        self.row_weights = weights;
        Ok(self)
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.ncols..(i + 1) * self.ncols]
    }

    /// Mask of row `i`, `None` when the store is fully observed.
    pub fn row_mask(&self, i: usize) -> Option<&[bool]> {
        self.mask
            .as_ref()
            .map(|m| &m[i * self.ncols..(i + 1) * self.ncols])
    }

    pub fn is_observed(&self, i: usize, j: usize) -> bool {
        self.mask.as_ref().map_or(true, |m| m[i * self.ncols + j])
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn row_weight(&self, i: usize) -> f64 {
        self.row_weights[i]
    }

    pub fn row_weights(&self) -> &[f64] {
        &self.row_weights
    }

    pub fn column_weights(&self) -> &[f64] {
        &self.column_weights
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.ncols)
    }

    /// Swap rows and columns so that features become the clustered items.
    ///
    /// Row weights become column weights and vice versa.
    pub fn transpose(&self) -> Self {
        let (n, d) = (self.nrows, self.ncols);
        let mut values = Vec::with_capacity(n * d);
        for j in 0..d {
            for i in 0..n {
                values.push(self.values[i * d + j]);
            }
        }
        let mask = self.mask.as_ref().map(|m| {
            let mut t = Vec::with_capacity(n * d);
            for j in 0..d {
                for i in 0..n {
                    t.push(m[i * d + j]);
                }
            }
            t
        });
        trace!("Transposed store {}x{} -> {}x{}", n, d, d, n);

        Self {
            values,
            mask,
            row_weights: self.column_weights.clone(),
            column_weights: self.row_weights.clone(),
            nrows: d,
            ncols: n,
        }
    }

    /// Mean of the observed entries in each column, 0 for never-observed columns.
    pub fn column_observed_means(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.ncols];
        let mut counts = vec![0usize; self.ncols];
        for i in 0..self.nrows {
            for (j, &v) in self.row(i).iter().enumerate() {
                if self.is_observed(i, j) {
                    sums[j] += v;
                    counts[j] += 1;
                }
            }
        }
        sums.iter()
            .zip(&counts)
            .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
            .collect()
    }

    /// Row `i` with unobserved entries replaced by `fill`.
    pub fn filled_row(&self, i: usize, fill: &[f64]) -> Vec<f64> {
        self.row(i)
            .iter()
            .enumerate()
            .map(|(j, &v)| if self.is_observed(i, j) { v } else { fill[j] })
            .collect()
    }

    pub fn to_dense_matrix(&self) -> ClusterResult<DenseMatrix<f64>> {
        row_major_matrix(self.values.clone(), self.nrows, self.ncols)
    }
}

/// Pack equally sized rows (centroids, grid nodes) into a smartcore matrix.
pub fn rows_to_dense_matrix(rows: &[Vec<f64>]) -> ClusterResult<DenseMatrix<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(ClusterError::shape(format!(
            "row {} has {} columns, expected {}",
            i,
            row.len(),
            ncols
        )));
    }
    row_major_matrix(rows.iter().flatten().copied().collect(), nrows, ncols)
}

// smartcore reads the buffer column-major unless told otherwise
fn row_major_matrix(values: Vec<f64>, nrows: usize, ncols: usize) -> ClusterResult<DenseMatrix<f64>> {
    DenseMatrix::new(nrows, ncols, values, false)
        .map_err(|e| ClusterError::shape(format!("cannot build {}x{} matrix: {}", nrows, ncols, e)))
}

fn check_weights(weights: &[f64], kind: &str) -> ClusterResult<()> {
    if let Some((i, w)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(ClusterError::shape(format!(
            "{} weight {} is {}, weights must be finite and >= 0",
            kind, i, w
        )));
    }
    Ok(())
}
