// flock-core/src/densify.rs
//! Densification of categorical and weighted-sparse records.
//!
//! Records are mapped onto a fixed-width numeric matrix over a vocabulary of all
//! labels seen, in first-seen order. The vocabulary is an explicit value: build it
//! once with [`Densifier::fit`] and reuse it to encode more records; labels that are
//! not in the vocabulary are dropped, never appended.

use std::collections::HashMap;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};
use crate::matrix::VectorStore;

/// Raw sparse input, one entry per record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SparseRecords {
    /// Each record is the set of labels it carries. Encoded as 1 (present) / 0.
    LabelSets(Vec<Vec<String>>),
    /// Each record maps labels to a value. Absent labels encode as 0.
    LabeledWeights(Vec<Vec<(String, f64)>>),
}

impl SparseRecords {
    pub fn len(&self) -> usize {
        match self {
            SparseRecords::LabelSets(r) => r.len(),
            SparseRecords::LabeledWeights(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn labels(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            SparseRecords::LabelSets(r) => Box::new(r.iter().flatten().map(String::as_str)),
            SparseRecords::LabeledWeights(r) => {
                Box::new(r.iter().flatten().map(|(l, _)| l.as_str()))
            }
        }
    }
}

/// Label → column index, in order of first appearance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut vocab = Self::default();
        for label in labels {
            if !vocab.index.contains_key(label) {
                vocab.index.insert(label.to_string(), vocab.labels.len());
                vocab.labels.push(label.to_string());
            }
        }
        vocab
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn column(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Resample per-label weights into per-column form. Columns without an
    /// override keep weight 1; labels outside the vocabulary are ignored.
    pub fn column_weights(&self, overrides: &[(String, f64)]) -> Vec<f64> {
        let mut weights = vec![1.0; self.len()];
        for (label, w) in overrides {
            match self.column(label) {
                Some(j) => weights[j] = *w,
                None => trace!("Weight override for unknown label '{}' ignored", label),
            }
        }
        weights
    }
}

/// Encodes sparse records against a fixed vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct Densifier {
    vocabulary: Vocabulary,
}

impl Densifier {
    /// Build the vocabulary from every label in `records`.
    pub fn fit(records: &SparseRecords) -> ClusterResult<Self> {
        if records.is_empty() {
            return Err(ClusterError::empty_input("no records to densify"));
        }
        let vocabulary = Vocabulary::from_labels(records.labels());
        if vocabulary.is_empty() {
            return Err(ClusterError::empty_input(
                "records carry no labels, vocabulary is empty",
            ));
        }
        debug!(
            "Densifier fitted: {} records, {} labels",
            records.len(),
            vocabulary.len()
        );
        Ok(Self { vocabulary })
    }

    pub fn with_vocabulary(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Encode `records` into a fully observed store of `|vocabulary|` columns.
    pub fn transform(&self, records: &SparseRecords) -> ClusterResult<VectorStore> {
        if records.is_empty() {
            return Err(ClusterError::empty_input("no records to densify"));
        }
        let d = self.vocabulary.len();
        let mut data = vec![0.0; records.len() * d];

        match records {
            SparseRecords::LabelSets(rows) => {
                for (i, labels) in rows.iter().enumerate() {
                    for label in labels {
                        if let Some(j) = self.vocabulary.column(label) {
                            data[i * d + j] = 1.0;
                        }
                    }
                }
            }
            SparseRecords::LabeledWeights(rows) => {
                for (i, pairs) in rows.iter().enumerate() {
                    for (label, value) in pairs {
                        if let Some(j) = self.vocabulary.column(label) {
                            data[i * d + j] = *value;
                        }
                    }
                }
            }
        }

        VectorStore::from_vec(data, records.len(), d)
    }
}

/// Densify `records` over their own vocabulary.
///
/// Returns the store (carrying the resampled column weights) and the per-column
/// weights. Without an override every column weight is 1.
pub fn densify(
    records: &SparseRecords,
    weight_overrides: Option<&[(String, f64)]>,
) -> ClusterResult<(VectorStore, Vec<f64>)> {
    let densifier = Densifier::fit(records)?;
    let column_weights = match weight_overrides {
        Some(overrides) => densifier.vocabulary().column_weights(overrides),
        None => vec![1.0; densifier.vocabulary().len()],
    };
    let store = densifier
        .transform(records)?
        .with_column_weights(column_weights.clone())?;
    Ok((store, column_weights))
}
