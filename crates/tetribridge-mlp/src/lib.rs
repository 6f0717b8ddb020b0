//! MLP policy/value estimator backing the bridge binary.
//!
//! A single hidden layer with ReLU activation feeds two heads: a softmax
//! policy over the flat placement action space and a tanh scalar value.
//! Weights are loaded from a JSON checkpoint with full shape validation,
//! then inference runs allocation-light and lock-free; the loaded model is
//! immutable and shared read-only by every session worker.

use std::{fs, io, path::Path};

use serde::Deserialize;

use tetribridge_agent::{PolicyEstimator, PolicyOutput};
use tetribridge_protocol::Strategy;

/// Checkpoint type tag accepted by [`MlpEstimator::load`].
pub const MODEL_TYPE: &str = "bridge_mlp_v1";

/// Failure to load a checkpoint.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LoadError {
    #[display("cannot read checkpoint: {_0}")]
    Io(io::Error),
    #[display("cannot parse checkpoint: {_0}")]
    Json(serde_json::Error),
    #[display("incompatible checkpoint type {found:?} (expected {MODEL_TYPE:?})")]
    IncompatibleType { found: String },
    #[display("{name} has shape {rows}x{columns}, expected {expected_rows}x{expected_columns}")]
    Shape {
        name: &'static str,
        rows: usize,
        columns: usize,
        expected_rows: usize,
        expected_columns: usize,
    },
    #[display("action size {found} does not match the placement space {expected}")]
    ActionSize { found: usize, expected: usize },
}

/// JSON checkpoint schema, matrices in row-major nested lists.
#[derive(Debug, Deserialize)]
struct Checkpoint {
    #[serde(rename = "type")]
    model_type: String,
    feat_dim: usize,
    action_size: usize,
    hidden: usize,
    w1: Vec<Vec<f32>>,
    b1: Vec<f32>,
    wp: Vec<Vec<f32>>,
    bp: Vec<f32>,
    wv: Vec<f32>,
    bv: f32,
}

/// One-hidden-layer policy/value network.
#[derive(Debug, Clone)]
pub struct MlpEstimator {
    feat_dim: usize,
    hidden: usize,
    /// `[hidden, feat_dim]`, row-major.
    w1: Vec<f32>,
    b1: Vec<f32>,
    /// `[ACTION_SPACE, hidden]`, row-major.
    wp: Vec<f32>,
    bp: Vec<f32>,
    wv: Vec<f32>,
    bv: f32,
}

impl MlpEstimator {
    /// Loads and validates a JSON checkpoint from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let raw = fs::read_to_string(path).map_err(LoadError::Io)?;
        Self::from_json(&raw)
    }

    /// Loads and validates a JSON checkpoint from a string.
    pub fn from_json(raw: &str) -> Result<Self, LoadError> {
        let checkpoint: Checkpoint = serde_json::from_str(raw).map_err(LoadError::Json)?;
        if checkpoint.model_type != MODEL_TYPE {
            return Err(LoadError::IncompatibleType {
                found: checkpoint.model_type,
            });
        }
        if checkpoint.action_size != Strategy::ACTION_SPACE {
            return Err(LoadError::ActionSize {
                found: checkpoint.action_size,
                expected: Strategy::ACTION_SPACE,
            });
        }
        let Checkpoint {
            feat_dim,
            hidden,
            w1,
            b1,
            wp,
            bp,
            wv,
            bv,
            ..
        } = checkpoint;
        Ok(Self {
            feat_dim,
            hidden,
            w1: flatten("w1", &w1, hidden, feat_dim)?,
            b1: exact("b1", b1, hidden)?,
            wp: flatten("wp", &wp, Strategy::ACTION_SPACE, hidden)?,
            bp: exact("bp", bp, Strategy::ACTION_SPACE)?,
            wv: exact("wv", wv, hidden)?,
            bv,
        })
    }

    #[must_use]
    pub const fn feat_dim(&self) -> usize {
        self.feat_dim
    }

    fn hidden_activations(&self, observation: &[f32]) -> Vec<f32> {
        assert_eq!(
            observation.len(),
            self.feat_dim,
            "observation length does not match the checkpoint's feature dimension"
        );
        let mut activations = vec![0.0_f32; self.hidden];
        for (i, activation) in activations.iter_mut().enumerate() {
            let row = &self.w1[i * self.feat_dim..(i + 1) * self.feat_dim];
            let sum: f32 = self.b1[i]
                + row
                    .iter()
                    .zip(observation)
                    .map(|(weight, feature)| weight * feature)
                    .sum::<f32>();
            *activation = sum.max(0.0);
        }
        activations
    }
}

impl PolicyEstimator for MlpEstimator {
    fn evaluate(&self, observation: &[f32]) -> PolicyOutput {
        let hidden = self.hidden_activations(observation);

        let mut logits = vec![0.0_f32; Strategy::ACTION_SPACE];
        for (action, logit) in logits.iter_mut().enumerate() {
            let row = &self.wp[action * self.hidden..(action + 1) * self.hidden];
            *logit = self.bp[action]
                + row
                    .iter()
                    .zip(&hidden)
                    .map(|(weight, activation)| weight * activation)
                    .sum::<f32>();
        }
        let scores = softmax(&logits);

        let value = (self.bv
            + self
                .wv
                .iter()
                .zip(&hidden)
                .map(|(weight, activation)| weight * activation)
                .sum::<f32>())
        .tanh();

        PolicyOutput { scores, value }
    }
}

/// Numerically stable softmax over the logits.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f64> = logits
        .iter()
        .map(|&logit| f64::from(logit - max).exp())
        .collect();
    let total: f64 = exps.iter().sum();
    #[expect(clippy::cast_possible_truncation)]
    exps.iter().map(|&e| (e / total) as f32).collect()
}

fn flatten(
    name: &'static str,
    matrix: &[Vec<f32>],
    rows: usize,
    columns: usize,
) -> Result<Vec<f32>, LoadError> {
    let shape_error = |found_rows: usize, found_columns: usize| LoadError::Shape {
        name,
        rows: found_rows,
        columns: found_columns,
        expected_rows: rows,
        expected_columns: columns,
    };
    if matrix.len() != rows {
        return Err(shape_error(matrix.len(), columns));
    }
    let mut flat = Vec::with_capacity(rows * columns);
    for row in matrix {
        if row.len() != columns {
            return Err(shape_error(rows, row.len()));
        }
        flat.extend_from_slice(row);
    }
    Ok(flat)
}

fn exact(name: &'static str, vector: Vec<f32>, len: usize) -> Result<Vec<f32>, LoadError> {
    if vector.len() == len {
        Ok(vector)
    } else {
        Err(LoadError::Shape {
            name,
            rows: 1,
            columns: vector.len(),
            expected_rows: 1,
            expected_columns: len,
        })
    }
}

#[cfg(test)]
mod tests {
    use tetribridge_agent::Observation;

    use super::*;

    /// A tiny checkpoint: 3 features, 2 hidden units, weights chosen so
    /// the arg-max action tracks the first feature's sign.
    fn tiny_checkpoint() -> String {
        let mut wp = vec![vec![0.0_f32; 2]; Strategy::ACTION_SPACE];
        wp[42] = vec![1.0, 0.0];
        wp[700] = vec![0.0, 1.0];
        serde_json::json!({
            "type": MODEL_TYPE,
            "feat_dim": 3,
            "action_size": Strategy::ACTION_SPACE,
            "hidden": 2,
            "w1": [[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]],
            "b1": [0.0, 0.0],
            "wp": wp,
            "bp": vec![0.0_f32; Strategy::ACTION_SPACE],
            "wv": [0.5, -0.5],
            "bv": 0.1,
        })
        .to_string()
    }

    #[test]
    fn test_load_and_argmax() {
        let estimator = MlpEstimator::from_json(&tiny_checkpoint()).unwrap();
        assert_eq!(estimator.feat_dim(), 3);

        let positive = estimator.evaluate(&[1.0, 0.0, 0.0]);
        assert_eq!(positive.best_strategy(), Strategy::from_action(42));
        let negative = estimator.evaluate(&[-1.0, 0.0, 0.0]);
        assert_eq!(negative.best_strategy(), Strategy::from_action(700));
    }

    #[test]
    fn test_scores_are_a_distribution() {
        let estimator = MlpEstimator::from_json(&tiny_checkpoint()).unwrap();
        let output = estimator.evaluate(&[1.0, -2.0, 0.5]);
        assert_eq!(output.scores.len(), Strategy::ACTION_SPACE);
        let total: f32 = output.scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(output.scores.iter().all(|&score| score >= 0.0));
    }

    #[test]
    fn test_value_is_bounded() {
        let estimator = MlpEstimator::from_json(&tiny_checkpoint()).unwrap();
        let output = estimator.evaluate(&[100.0, 0.0, 0.0]);
        assert!(output.value.abs() <= 1.0);
    }

    #[test]
    fn test_batch_matches_single() {
        let estimator = MlpEstimator::from_json(&tiny_checkpoint()).unwrap();
        let observations: Vec<Observation> =
            vec![vec![1.0, 0.0, 0.0], vec![-1.0, 0.0, 0.0]];
        let batch = estimator.evaluate_batch(&observations);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], estimator.evaluate(&observations[0]));
        assert_eq!(batch[1], estimator.evaluate(&observations[1]));
    }

    #[test]
    fn test_rejects_wrong_type() {
        let raw = tiny_checkpoint().replace(MODEL_TYPE, "other_model");
        assert!(matches!(
            MlpEstimator::from_json(&raw),
            Err(LoadError::IncompatibleType { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let raw = tiny_checkpoint().replace("\"b1\":[0.0,0.0]", "\"b1\":[0.0]");
        assert!(matches!(
            MlpEstimator::from_json(&raw),
            Err(LoadError::Shape { name: "b1", .. })
        ));
    }
}
