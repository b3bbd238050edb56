//! Clustering options shared by the partition, grid and tree entry points.
//!
//! `ClusterOptions` follows the builder pattern: start from `ClusterOptions::new()`
//! (or `Default`) and chain `with_*` calls. Each entry point reads the fields it
//! needs and ignores the rest.

use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use flock_core::Metric;

/// Default cap on Assign steps per k-means trial.
pub const DEFAULT_ITERATIONS: usize = 100;
/// Default number of independent k-means trials.
pub const DEFAULT_TRIALS: usize = 10;
/// Default initial learning rate of the self-organizing map.
pub const DEFAULT_TAU: f64 = 0.02;
/// Default SOM training steps per input row.
pub const DEFAULT_SOM_PASSES: usize = 100;

/// Centroid aggregate for the partition solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    /// k-means: weighted mean
    #[default]
    Average,
    /// k-medians: weighted per-column median
    Median,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "average" | "mean" | "kmeans" => Ok(Method::Average),
            "m" | "median" | "kmedians" => Ok(Method::Median),
            _ => Err(format!("unknown method '{}'", s)),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Average => write!(f, "average"),
            Method::Median => write!(f, "median"),
        }
    }
}

/// Initial centroid selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seeding {
    /// k distinct rows uniformly at random
    #[default]
    Random,
    /// first row uniform, then proportional to squared distance to the nearest pick
    KMeansPlusPlus,
    /// greedy farthest-first from row 0
    SpreadOut,
}

impl FromStr for Seeding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Seeding::Random),
            "kmeans++" | "kmeanspp" | "kmeans_plusplus" => Ok(Seeding::KMeansPlusPlus),
            "spreadout" | "spread_out" | "farthest" => Ok(Seeding::SpreadOut),
            _ => Err(format!("unknown seeding '{}'", s)),
        }
    }
}

impl fmt::Display for Seeding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seeding::Random => write!(f, "random"),
            Seeding::KMeansPlusPlus => write!(f, "kmeans++"),
            Seeding::SpreadOut => write!(f, "spreadout"),
        }
    }
}

/// Inter-cluster distance rule for agglomerative merging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// minimum member-pair distance
    Single,
    /// maximum member-pair distance
    Complete,
    /// mean member-pair distance
    #[default]
    Average,
    /// distance between cluster mean vectors
    Centroid,
}

impl FromStr for Linkage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "single" => Ok(Linkage::Single),
            "m" | "maximum" | "complete" => Ok(Linkage::Complete),
            "a" | "average" => Ok(Linkage::Average),
            "c" | "centroid" => Ok(Linkage::Centroid),
            _ => Err(format!("unknown linkage '{}'", s)),
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linkage::Single => write!(f, "single"),
            Linkage::Complete => write!(f, "complete"),
            Linkage::Average => write!(f, "average"),
            Linkage::Centroid => write!(f, "centroid"),
        }
    }
}

/// What the partition solver does with a cluster that lost all its rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptyClusterPolicy {
    /// Keep the previous centroid unchanged.
    #[default]
    Retain,
    /// Move the row farthest from its centroid (taken from a cluster with more
    /// than one member) into the empty cluster.
    ReseedFarthest,
}

impl FromStr for EmptyClusterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(EmptyClusterPolicy::Retain),
            "reseed" | "reseed_farthest" => Ok(EmptyClusterPolicy::ReseedFarthest),
            _ => Err(format!("unknown empty-cluster policy '{}'", s)),
        }
    }
}

/// Cooperative early-stop predicate, polled between outer-loop steps.
#[derive(Clone)]
pub struct StopCheck(Arc<dyn Fn() -> bool + Send + Sync>);

impl StopCheck {
    pub fn new(check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(check))
    }

    pub fn should_stop(&self) -> bool {
        (self.0)()
    }
}

impl Debug for StopCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StopCheck(..)")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterOptions {
    /// Observed-mask for dense input (ignored for sparse input)
    pub mask: Option<Vec<Vec<bool>>>,
    /// Per-column weights for dense input
    pub weights: Option<Vec<f64>>,
    /// Per-label weight override for sparse input, resampled into columns
    pub label_weights: Option<Vec<(String, f64)>>,
    /// Per-row (record) weights
    pub row_weights: Option<Vec<f64>>,
    pub metric: Metric,
    pub method: Method,
    pub seeding: Seeding,
    pub linkage: Linkage,
    pub empty_cluster: EmptyClusterPolicy,
    /// k-means: cap on Assign steps per trial (default 100).
    /// SOM: total training steps (default 100 × rows).
    pub iterations: Option<usize>,
    pub trials: usize,
    /// Force densification, treating every distinct dense value as a label
    pub sparse: bool,
    /// Cluster columns instead of rows
    pub transpose: bool,
    /// SOM initial learning rate
    pub tau: f64,
    /// SOM initial neighborhood radius, defaults to the grid diagonal
    pub radius: Option<f64>,
    /// Seed for every random choice; drawn at random when absent
    pub rng_seed: Option<u64>,
    /// Run k-means trials on the rayon pool
    pub parallel: bool,
    #[serde(skip)]
    pub stop: Option<StopCheck>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        debug!("Creating ClusterOptions with default parameters");
        Self {
            mask: None,
            weights: None,
            label_weights: None,
            row_weights: None,
            metric: Metric::Euclidean,
            method: Method::Average,
            seeding: Seeding::Random,
            linkage: Linkage::Average,
            empty_cluster: EmptyClusterPolicy::Retain,
            iterations: None,
            trials: DEFAULT_TRIALS,
            sparse: false,
            transpose: false,
            tau: DEFAULT_TAU,
            radius: None,
            rng_seed: None,
            parallel: true,
            stop: None,
        }
    }
}

impl ClusterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mask(mut self, mask: Vec<Vec<bool>>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_label_weights(mut self, weights: Vec<(String, f64)>) -> Self {
        self.label_weights = Some(weights);
        self
    }

    pub fn with_row_weights(mut self, weights: Vec<f64>) -> Self {
        self.row_weights = Some(weights);
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_seeding(mut self, seeding: Seeding) -> Self {
        self.seeding = seeding;
        self
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn with_empty_cluster_policy(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster = policy;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Number of k-means trials, at least one.
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials.max(1);
        self
    }

    pub fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    pub fn with_transpose(mut self, transpose: bool) -> Self {
        self.transpose = transpose;
        self
    }

    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_stop_check(mut self, check: StopCheck) -> Self {
        self.stop = Some(check);
        self
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.stop.as_ref().is_some_and(StopCheck::should_stop)
    }

    /// Resolve the run seed: the configured one, or a fresh random one.
    pub(crate) fn base_seed(&self) -> u64 {
        self.rng_seed.unwrap_or_else(rand::random)
    }
}
