//! Bagged random forest of linfa decision trees
//!
//! Each tree is fitted on a bootstrap sample of the rows and a random subset
//! of the columns (`max_features`, drawn once per tree). linfa trees consider
//! every column they are given at each split, so the subset is what
//! decorrelates the ensemble.

use std::fmt;

use linfa::prelude::Predict;
use linfa::traits::Fit;
use linfa::Dataset;
use linfa_trees::{DecisionTree, DecisionTreeParams, SplitQuality};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{FraudError, FraudResult};

/// How many columns each tree sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxFeatures {
    #[default]
    Sqrt,
    Log2,
    All,
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(k) => *k,
        };
        k.clamp(1, n_features.max(1))
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::Sqrt => f.write_str("sqrt"),
            MaxFeatures::Log2 => f.write_str("log2"),
            MaxFeatures::All => f.write_str("all"),
            MaxFeatures::Count(k) => write!(f, "{}", k),
        }
    }
}

impl Serialize for MaxFeatures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MaxFeatures::Count(k) => serializer.serialize_u64(*k as u64),
            named => serializer.collect_str(named),
        }
    }
}

/// `"sqrt"`, `"auto"`, `"log2"`, `"all"`, a positive integer, or `null` (all columns)
impl<'de> Deserialize<'de> for MaxFeatures {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Count(usize),
            Name(String),
        }

        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(MaxFeatures::All),
            Some(Repr::Count(0)) => Err(de::Error::custom("max_features must be positive")),
            Some(Repr::Count(k)) => Ok(MaxFeatures::Count(k)),
            Some(Repr::Name(name)) => match name.as_str() {
                "sqrt" | "auto" => Ok(MaxFeatures::Sqrt),
                "log2" => Ok(MaxFeatures::Log2),
                "all" => Ok(MaxFeatures::All),
                other => Err(de::Error::custom(format!("unknown max_features '{}'", other))),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            random_state: 42,
        }
    }
}

impl ForestParams {
    /// Unit sample weights, so the weight limits are sample counts
    fn tree_params(&self) -> DecisionTreeParams<f64, usize> {
        DecisionTree::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(self.max_depth)
            .min_weight_split(self.min_samples_split as f32)
            .min_weight_leaf(self.min_samples_leaf as f32)
    }

    /// Per-tree seed; independent of the order rayon schedules trees in
    fn tree_seed(&self, tree: usize) -> u64 {
        self.random_state
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(tree as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Member {
    /// Sorted column indices the tree was fitted on
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

impl Member {
    fn predict(&self, x: ArrayView2<f64>) -> Array1<usize> {
        self.tree.predict(&x.select(Axis(1), &self.features))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<Member>,
}

impl RandomForest {
    /// Fit `n_estimators` trees on bootstrap samples of `(x, y)`
    pub fn fit(x: ArrayView2<f64>, y: &[u8], params: &ForestParams) -> FraudResult<Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(FraudError::InsufficientData("cannot fit forest on zero rows".to_string()));
        }
        if n != y.len() {
            return Err(FraudError::InsufficientData(format!(
                "{} feature rows but {} labels",
                n,
                y.len()
            )));
        }
        if let Some((row, &value)) = y.iter().enumerate().find(|&(_, &v)| v > 1) {
            return Err(FraudError::InvalidLabel { row, value: value as f64 });
        }
        if params.n_estimators == 0 {
            return Err(FraudError::Config("n_estimators must be positive".to_string()));
        }

        let n_features = x.ncols();
        let subset = params.max_features.resolve(n_features);
        let tree_params = params.tree_params();

        let trees = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.tree_seed(t));
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut features = index::sample(&mut rng, n_features, subset).into_vec();
                features.sort_unstable();

                let records = x.select(Axis(0), &rows).select(Axis(1), &features);
                let targets: Array1<usize> = rows.iter().map(|&i| y[i] as usize).collect();
                let tree = tree_params
                    .fit(&Dataset::new(records, targets))
                    .map_err(|e| FraudError::Model(e.to_string()))?;

                Ok(Member { features, tree })
            })
            .collect::<FraudResult<Vec<Member>>>()?;

        tracing::debug!(
            "Fitted {} trees on {} of {} columns each",
            trees.len(),
            subset,
            n_features
        );

        Ok(Self {
            params: *params,
            n_features,
            trees,
        })
    }

    /// Share of trees voting fraud
    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        self.predict_proba(row.insert_axis(Axis(0)))
            .first()
            .copied()
            .unwrap_or_default()
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> u8 {
        Self::decide(self.predict_proba_row(row))
    }

    /// Hard class for a fraud probability; ties go to the legitimate class
    pub fn decide(proba: f64) -> u8 {
        (proba > 0.5) as u8
    }

    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Vec<f64> {
        let mut votes = Array1::<f64>::zeros(x.nrows());
        for member in &self.trees {
            votes.zip_mut_with(&member.predict(x), |v, &class| *v += class as f64);
        }
        let n_trees = self.trees.len().max(1) as f64;
        votes.iter().map(|v| v / n_trees).collect()
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> Vec<u8> {
        self.predict_proba(x).into_iter().map(Self::decide).collect()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    /// Two well separated blobs in 3 dimensions
    fn blobs() -> (Array2<f64>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let jitter = (i % 7) as f64 * 0.1;
            rows.extend_from_slice(&[jitter, 1.0 - jitter, 0.5 * jitter]);
            labels.push(0);
        }
        for i in 0..20 {
            let jitter = (i % 5) as f64 * 0.1;
            rows.extend_from_slice(&[5.0 + jitter, 6.0 - jitter, 4.0 + jitter]);
            labels.push(1);
        }
        (Array2::from_shape_vec((60, 3), rows).unwrap(), labels)
    }

    fn small_params() -> ForestParams {
        ForestParams { n_estimators: 15, ..ForestParams::default() }
    }

    #[test]
    fn test_forest_learns_separable_data() {
        let (x, y) = blobs();
        let forest = RandomForest::fit(x.view(), &y, &small_params()).unwrap();

        assert_eq!(forest.n_trees(), 15);
        assert_eq!(forest.n_features(), 3);
        assert_eq!(forest.predict(x.view()), y);
        assert_eq!(forest.predict_row(array![0.2, 0.8, 0.1].view()), 0);
        assert_eq!(forest.predict_row(array![5.2, 5.8, 4.1].view()), 1);
    }

    #[test]
    fn test_each_tree_sees_a_column_subset() {
        let (x, y) = blobs();
        let forest = RandomForest::fit(x.view(), &y, &small_params()).unwrap();
        // sqrt(3) rounds down to a single column
        assert!(forest.trees.iter().all(|m| m.features.len() == 1 && m.features[0] < 3));

        let params = ForestParams { max_features: MaxFeatures::All, ..small_params() };
        let forest = RandomForest::fit(x.view(), &y, &params).unwrap();
        assert!(forest.trees.iter().all(|m| m.features == vec![0, 1, 2]));
    }

    #[test]
    fn test_same_seed_gives_same_forest() {
        let (x, y) = blobs();
        let a = RandomForest::fit(x.view(), &y, &small_params()).unwrap();
        let b = RandomForest::fit(x.view(), &y, &small_params()).unwrap();

        let grid = array![[0.0, 0.0, 0.0], [2.5, 3.0, 2.0], [3.0, 3.5, 2.5], [6.0, 6.0, 6.0]];
        assert_eq!(a.predict_proba(grid.view()), b.predict_proba(grid.view()));
        let features = |f: &RandomForest| f.trees.iter().map(|m| m.features.clone()).collect::<Vec<_>>();
        assert_eq!(features(&a), features(&b));
    }

    #[test]
    fn test_json_round_trip_keeps_predictions() {
        let (x, y) = blobs();
        let forest = RandomForest::fit(x.view(), &y, &small_params()).unwrap();

        let json = serde_json::to_string(&forest).unwrap();
        let restored: RandomForest = serde_json::from_str(&json).unwrap();

        assert_eq!(forest.predict_proba(x.view()), restored.predict_proba(x.view()));
        assert_eq!(restored.params(), forest.params());
    }

    #[test]
    fn test_rejects_bad_input() {
        let (x, y) = blobs();
        assert!(RandomForest::fit(x.view(), &y[..10], &small_params()).is_err());

        let mut bad = y.clone();
        bad[3] = 2;
        assert!(matches!(
            RandomForest::fit(x.view(), &bad, &small_params()),
            Err(FraudError::InvalidLabel { row: 3, .. })
        ));

        let empty = Array2::<f64>::zeros((0, 3));
        assert!(RandomForest::fit(empty.view(), &[], &small_params()).is_err());
    }

    #[test]
    fn test_max_features_accepts_names_counts_and_null() {
        let parse = |raw: &str| serde_json::from_str::<MaxFeatures>(raw);

        assert_eq!(parse(r#""sqrt""#).unwrap(), MaxFeatures::Sqrt);
        assert_eq!(parse(r#""auto""#).unwrap(), MaxFeatures::Sqrt);
        assert_eq!(parse(r#""log2""#).unwrap(), MaxFeatures::Log2);
        assert_eq!(parse(r#""all""#).unwrap(), MaxFeatures::All);
        assert_eq!(parse("5").unwrap(), MaxFeatures::Count(5));
        assert_eq!(parse("null").unwrap(), MaxFeatures::All);
        assert!(parse("0").is_err());
        assert!(parse(r#""half""#).is_err());

        assert_eq!(serde_json::to_string(&MaxFeatures::Count(5)).unwrap(), "5");
        assert_eq!(serde_json::to_string(&MaxFeatures::Sqrt).unwrap(), r#""sqrt""#);
        assert_eq!(MaxFeatures::Count(5).to_string(), "5");
    }

    #[test]
    fn test_max_features_resolves_against_column_count() {
        assert_eq!(MaxFeatures::Sqrt.resolve(29), 5);
        assert_eq!(MaxFeatures::Log2.resolve(29), 4);
        assert_eq!(MaxFeatures::All.resolve(29), 29);
        assert_eq!(MaxFeatures::Count(50).resolve(29), 29);
    }
}
