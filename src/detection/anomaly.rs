//! Unsupervised anomaly scoring over window features.
//!
//! Isolation forest over the 5-dimensional feature space (average
//! pressure, pressure-drop rate, average flow, flow standard deviation,
//! acoustic peak). Points isolated by few random splits score as more
//! anomalous; the path-length score is normalized to [0, 1] with the
//! standard `2^(-E[h]/c(n))` formulation, which is monotonic in the
//! isolation signal and saturates at 1.
//!
//! The leak/no-leak decision cut is not a fixed score: it is calibrated
//! at train time to the (1 - contamination) quantile of the training
//! set's own scores. Small forests compress scores toward the middle of
//! [0, 1], so an absolute cut would drift with subsample size and
//! window shape; the quantile tracks whatever range the trained forest
//! actually produces.
//!
//! The trained model is an immutable snapshot behind an
//! [`ArcSwapOption`]: retraining stores a whole new forest, so
//! predictions in flight always complete against one consistent model,
//! old or new, never a mixture.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::config::defaults::FOREST_SUBSAMPLE;
use crate::config::DetectionConfig;
use crate::types::FeatureVector;

const FEATURE_DIM: usize = 5;

/// Euler–Mascheroni constant, for the average-path-length normalizer.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average unsuccessful-search path length in a binary search tree of
/// `n` points. Used both as the leaf-size adjustment and the score
/// normalizer.
fn c_factor(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

// ============================================================================
// Isolation Tree
// ============================================================================

enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// One randomly-built isolation tree over a point subsample.
struct IsoTree {
    nodes: Vec<Node>,
}

impl IsoTree {
    fn build(points: Vec<[f64; FEATURE_DIM]>, height_limit: usize, rng: &mut StdRng) -> Self {
        let mut nodes = Vec::new();
        Self::build_node(&mut nodes, points, 0, height_limit, rng);
        Self { nodes }
    }

    /// Recursively partition `points`, returning the arena index of the
    /// subtree root. The root of the whole tree is always index 0.
    fn build_node(
        nodes: &mut Vec<Node>,
        points: Vec<[f64; FEATURE_DIM]>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let idx = nodes.len();
        if points.len() <= 1 || depth >= height_limit {
            nodes.push(Node::Leaf {
                size: points.len(),
            });
            return idx;
        }

        // Only features with spread can split; a fully degenerate subsample
        // (all points identical) becomes a leaf.
        let mut splittable = Vec::with_capacity(FEATURE_DIM);
        let mut bounds = [(0.0f64, 0.0f64); FEATURE_DIM];
        for f in 0..FEATURE_DIM {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for p in &points {
                min = min.min(p[f]);
                max = max.max(p[f]);
            }
            if max > min {
                splittable.push(f);
                bounds[f] = (min, max);
            }
        }
        if splittable.is_empty() {
            nodes.push(Node::Leaf {
                size: points.len(),
            });
            return idx;
        }

        let feature = splittable[rng.gen_range(0..splittable.len())];
        let (min, max) = bounds[feature];
        let threshold = rng.gen_range(min..max);

        let (left_points, right_points): (Vec<_>, Vec<_>) =
            points.into_iter().partition(|p| p[feature] < threshold);

        // Placeholder so children get stable indices after this node.
        nodes.push(Node::Leaf { size: 0 });
        let left = Self::build_node(nodes, left_points, depth + 1, height_limit, rng);
        let right = Self::build_node(nodes, right_points, depth + 1, height_limit, rng);
        nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    /// Path length from the root to the leaf this point falls into,
    /// adjusted by the expected extra depth for multi-point leaves.
    fn path_length(&self, point: &[f64; FEATURE_DIM]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { size } => return depth + c_factor(size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if point[feature] < threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

// ============================================================================
// Forest Model Snapshot
// ============================================================================

/// One trained, immutable forest. Replaced wholesale on retraining.
struct ForestModel {
    trees: Vec<IsoTree>,
    /// Per-tree subsample size used at training time (score normalizer)
    subsample: usize,
    /// Scores strictly above this are anomalous. Calibrated at train
    /// time to the (1 - contamination) training-score quantile.
    score_threshold: f64,
    sample_count: usize,
    trained_at: DateTime<Utc>,
}

impl ForestModel {
    /// Normalized anomaly score in [0, 1]; higher is more anomalous.
    fn score(&self, point: &[f64; FEATURE_DIM]) -> f64 {
        let normalizer = c_factor(self.subsample);
        if self.trees.is_empty() || normalizer <= 0.0 {
            return 0.0;
        }
        let avg_path: f64 = self
            .trees
            .iter()
            .map(|t| t.path_length(point))
            .sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-avg_path / normalizer).min(1.0)
    }
}

/// Summary of the currently-loaded model, for status endpoints.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelInfo {
    pub sample_count: usize,
    pub tree_count: usize,
    pub score_threshold: f64,
    pub trained_at: DateTime<Utc>,
}

// ============================================================================
// Anomaly Scorer
// ============================================================================

/// Trainable anomaly scorer with a graceful untrained default.
///
/// Before `train` has been called with a non-empty sample set, `predict`
/// returns `(false, 0.0)` so the pipeline degrades gracefully rather than
/// erroring.
pub struct AnomalyScorer {
    model: ArcSwapOption<ForestModel>,
    contamination: f64,
    tree_count: usize,
    seed: u64,
}

impl AnomalyScorer {
    pub fn new(cfg: &DetectionConfig) -> Self {
        Self {
            model: ArcSwapOption::const_empty(),
            contamination: cfg.contamination,
            tree_count: cfg.tree_count,
            seed: cfg.train_seed,
        }
    }

    /// Train a new forest on known-normal samples and atomically swap it in.
    ///
    /// An empty sample set is ignored (the previous model, if any, stays
    /// active). Training is seeded, so identical inputs build identical
    /// forests.
    pub fn train(&self, samples: &[FeatureVector]) {
        if samples.is_empty() {
            tracing::warn!("AnomalyScorer::train called with no samples, keeping current model");
            return;
        }

        let points: Vec<[f64; FEATURE_DIM]> = samples.iter().map(FeatureVector::as_point).collect();
        let subsample = points.len().min(FOREST_SUBSAMPLE);
        // ceil(log2(subsample)): deeper splits than this only separate
        // points that are already deep inside the normal mass.
        let height_limit = (subsample.max(2) as f64).log2().ceil() as usize;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let trees = (0..self.tree_count)
            .map(|_| {
                let sample: Vec<[f64; FEATURE_DIM]> = if points.len() > subsample {
                    points
                        .choose_multiple(&mut rng, subsample)
                        .cloned()
                        .collect()
                } else {
                    points.clone()
                };
                IsoTree::build(sample, height_limit, &mut rng)
            })
            .collect();

        let mut model = ForestModel {
            trees,
            subsample,
            score_threshold: 1.0,
            sample_count: points.len(),
            trained_at: Utc::now(),
        };

        // Calibrate the decision cut from the training set itself: sort
        // the training scores and place the cut so the top contamination
        // share falls above it.
        let mut scores: Vec<f64> = points.iter().map(|p| model.score(p)).collect();
        scores.sort_by(|a, b| a.total_cmp(b));
        let cut = ((scores.len() as f64) * (1.0 - self.contamination)).ceil() as usize;
        let raw = scores[cut.saturating_sub(1).min(scores.len() - 1)];
        model.score_threshold = (raw * 10_000.0).round() / 10_000.0;

        let threshold = model.score_threshold;
        self.model.store(Some(Arc::new(model)));
        tracing::info!(
            samples = points.len(),
            trees = self.tree_count,
            subsample,
            threshold,
            "Anomaly model trained and swapped in"
        );
    }

    /// Score a feature vector against the current model snapshot.
    ///
    /// Returns `(is_anomaly, score)` with the score in [0, 1]. Untrained
    /// scorers return the deterministic non-anomalous default `(false, 0.0)`.
    pub fn predict(&self, features: &FeatureVector) -> (bool, f64) {
        // load() pins one snapshot for the whole prediction; a concurrent
        // retrain swaps the pointer without disturbing this call.
        let guard = self.model.load();
        let model = match guard.as_ref() {
            Some(m) => m,
            None => return (false, 0.0),
        };

        let raw = model.score(&features.as_point());
        let score = (raw * 10_000.0).round() / 10_000.0;
        (score > model.score_threshold, score)
    }

    /// Whether a trained model snapshot is currently loaded.
    pub fn is_trained(&self) -> bool {
        self.model.load().is_some()
    }

    /// Metadata for the current model snapshot, if any.
    pub fn model_info(&self) -> Option<ModelInfo> {
        self.model.load().as_ref().map(|m| ModelInfo {
            sample_count: m.sample_count,
            tree_count: m.trees.len(),
            score_threshold: m.score_threshold,
            trained_at: m.trained_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn features(pressure: f64, drop: f64, flow: f64, std: f64, acoustic: f64) -> FeatureVector {
        FeatureVector {
            window_start: Utc::now(),
            window_end: Utc::now(),
            avg_pressure: pressure,
            pressure_drop_rate: drop,
            avg_flow: flow,
            flow_std_dev: std,
            acoustic_peak: acoustic,
            sample_count: 60,
        }
    }

    /// A spread of plausible normal-operation windows.
    fn normal_samples(count: usize) -> Vec<FeatureVector> {
        (0..count)
            .map(|i| {
                let jitter = (i % 10) as f64 / 100.0;
                features(
                    5.0 + jitter - 0.05,
                    0.001 * (i % 3) as f64,
                    100.0 + (i % 7) as f64 - 3.0,
                    0.4 + jitter,
                    10.0 + (i % 5) as f64 - 2.0,
                )
            })
            .collect()
    }

    fn scorer() -> AnomalyScorer {
        AnomalyScorer::new(&DetectionConfig::default())
    }

    #[test]
    fn test_untrained_predict_is_graceful_default() {
        let scorer = scorer();
        assert!(!scorer.is_trained());
        let (is_anomaly, score) = scorer.predict(&features(1.0, 0.5, 250.0, 40.0, 60.0));
        assert!(!is_anomaly);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_train_on_empty_samples_is_noop() {
        let scorer = scorer();
        scorer.train(&[]);
        assert!(!scorer.is_trained());
    }

    #[test]
    fn test_outlier_scores_above_normal() {
        let scorer = scorer();
        scorer.train(&normal_samples(120));

        let (_, normal_score) = scorer.predict(&features(5.0, 0.0, 100.0, 0.5, 10.0));
        let (outlier_flag, outlier_score) = scorer.predict(&features(1.5, 0.5, 160.0, 25.0, 55.0));

        assert!(
            outlier_score > normal_score,
            "outlier {} should exceed normal {}",
            outlier_score,
            normal_score
        );
        assert!(outlier_flag, "extreme outlier should be flagged (score {})", outlier_score);
    }

    #[test]
    fn test_in_distribution_point_not_flagged() {
        let scorer = scorer();
        scorer.train(&normal_samples(120));
        let (is_anomaly, score) = scorer.predict(&features(5.0, 0.0, 100.0, 0.5, 10.0));
        assert!(!is_anomaly, "in-distribution point flagged with score {}", score);
    }

    #[test]
    fn test_score_bounds() {
        let scorer = scorer();
        scorer.train(&normal_samples(50));
        for fv in [
            features(5.0, 0.0, 100.0, 0.5, 10.0),
            features(0.0, 2.0, 500.0, 100.0, 200.0),
            features(-3.0, -1.0, -50.0, 0.0, 0.0),
        ] {
            let (_, score) = scorer.predict(&fv);
            assert!((0.0..=1.0).contains(&score), "score out of range: {}", score);
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let samples = normal_samples(80);
        let probe = features(3.2, 0.1, 120.0, 8.0, 30.0);

        let a = scorer();
        a.train(&samples);
        let b = scorer();
        b.train(&samples);

        assert_eq!(a.predict(&probe), b.predict(&probe));
    }

    #[test]
    fn test_retrain_replaces_snapshot() {
        let scorer = scorer();
        scorer.train(&normal_samples(120));

        let burst = features(1.5, 0.5, 160.0, 25.0, 55.0);
        let (flagged_before, _) = scorer.predict(&burst);
        assert!(flagged_before);

        // Retrain on a cloud centered on the burst regime: the same point
        // must now be in-distribution under the new snapshot.
        let burst_like: Vec<FeatureVector> = (0..120)
            .map(|i| {
                let jitter = (i % 10) as f64 / 10.0 - 0.45;
                features(1.5 + jitter, 0.5, 160.0 + jitter * 5.0, 25.0 + jitter, 55.0 + jitter)
            })
            .collect();
        scorer.train(&burst_like);

        let (flagged_after, score_after) = scorer.predict(&burst);
        assert!(
            !flagged_after,
            "point inside new training cloud still flagged (score {})",
            score_after
        );
    }

    #[test]
    fn test_degenerate_constant_training_data() {
        let scorer = scorer();
        // All samples identical: trees collapse to a single leaf, every
        // query scores 2^-1 = 0.5, and the calibrated cut lands exactly
        // there. The strict comparison keeps the training point itself
        // unflagged.
        scorer.train(&vec![features(5.0, 0.0, 100.0, 0.0, 10.0); 40]);
        let (is_anomaly, score) = scorer.predict(&features(5.0, 0.0, 100.0, 0.0, 10.0));
        assert!(!is_anomaly);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sustained_burst_window_flagged() {
        let scorer = scorer();
        scorer.train(&normal_samples(120));

        // Sustained major-burst regime: collapsed pressure, choked flow,
        // loud acoustics. Scores only modestly above the normal mass, so
        // the calibrated cut has to catch it where a fixed high cut
        // would not.
        let (flagged, score) = scorer.predict(&features(1.5, 0.0, 25.0, 0.5, 55.0));
        assert!(flagged, "sustained burst scored {} below the cut", score);
    }

    #[test]
    fn test_cut_calibrated_from_training_scores() {
        let scorer = scorer();
        scorer.train(&normal_samples(120));

        let info = scorer.model_info().unwrap();
        assert!(info.score_threshold > 0.0 && info.score_threshold < 0.6);

        // Roughly the contamination share of the training set sits above
        // the cut
        let flagged = normal_samples(120)
            .iter()
            .filter(|f| scorer.predict(f).0)
            .count();
        assert!(flagged <= 12, "{} of 120 training samples flagged", flagged);
    }

    #[test]
    fn test_c_factor_small_values() {
        assert_eq!(c_factor(0), 0.0);
        assert_eq!(c_factor(1), 0.0);
        assert_eq!(c_factor(2), 1.0);
        assert!(c_factor(256) > c_factor(64));
    }
}
