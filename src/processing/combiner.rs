//! Fusion of the five similarity signals into one match score

use crate::config::{CombinerKind, ScoringConfig, SignalWeights};
use crate::error::{AtsScorerError, Result};
use crate::processing::signals::SignalVector;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Match score in [0, 100], two decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchScore(f32);

impl MatchScore {
    /// Scale a combiner output in [0, 1] to a percentage.
    pub fn from_unit(value: f32) -> Self {
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        Self((value * 100.0 * 100.0).round() / 100.0)
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl fmt::Display for MatchScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Deterministic function from a signal vector to [0, 1].
pub trait Combiner: Send + Sync {
    fn combine(&self, signals: &SignalVector) -> f32;
    fn name(&self) -> String;

    fn score(&self, signals: &SignalVector) -> MatchScore {
        MatchScore::from_unit(self.combine(signals))
    }
}

/// Non-finite signals count as 0; everything else is clamped to [0, 1].
fn sanitized(signals: &SignalVector) -> [f32; 5] {
    signals
        .to_array()
        .map(|v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 })
}

/// Normalized weighted sum of the signals.
#[derive(Debug, Clone)]
pub struct WeightedSumCombiner {
    weights: [f32; 5],
}

impl WeightedSumCombiner {
    pub fn new(weights: SignalWeights) -> Result<Self> {
        let raw = weights.to_array();
        if raw.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AtsScorerError::Configuration(
                "combiner weights must be finite and non-negative".to_string(),
            ));
        }
        let total: f32 = raw.iter().sum();
        if total <= 0.0 {
            return Err(AtsScorerError::Configuration(
                "combiner weights must not all be zero".to_string(),
            ));
        }

        Ok(Self {
            weights: raw.map(|w| w / total),
        })
    }
}

impl Default for WeightedSumCombiner {
    fn default() -> Self {
        let weights = SignalWeights::default().to_array();
        let total: f32 = weights.iter().sum();
        Self {
            weights: weights.map(|w| w / total),
        }
    }
}

impl Combiner for WeightedSumCombiner {
    fn combine(&self, signals: &SignalVector) -> f32 {
        let value: f32 = sanitized(signals)
            .iter()
            .zip(self.weights.iter())
            .map(|(s, w)| s * w)
            .sum();
        value.clamp(0.0, 1.0)
    }

    fn name(&self) -> String {
        "weighted-sum".to_string()
    }
}

pub const MLP_WEIGHTS_VERSION: u32 = 1;
const HIDDEN_1: usize = 16;
const HIDDEN_2: usize = 8;

/// On-disk weight file for [`MlpCombiner`]. Matrices are row-major
/// `[out][in]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpWeights {
    pub version: u32,
    #[serde(default)]
    pub label: Option<String>,
    pub w1: Vec<Vec<f32>>,
    pub b1: Vec<f32>,
    pub w2: Vec<Vec<f32>>,
    pub b2: Vec<f32>,
    pub w3: Vec<Vec<f32>>,
    pub b3: Vec<f32>,
}

/// 5 -> 16 -> 8 -> 1 network, ReLU hidden layers and sigmoid output.
#[derive(Debug, Clone)]
pub struct MlpCombiner {
    w1: Array2<f32>,
    b1: Array1<f32>,
    w2: Array2<f32>,
    b2: Array1<f32>,
    w3: Array2<f32>,
    b3: Array1<f32>,
    label: String,
}

fn to_matrix(name: &str, rows: &[Vec<f32>], shape: (usize, usize)) -> Result<Array2<f32>> {
    if rows.len() != shape.0 || rows.iter().any(|r| r.len() != shape.1) {
        return Err(AtsScorerError::Configuration(format!(
            "MLP weight {} must be {}x{}",
            name, shape.0, shape.1
        )));
    }
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    if flat.iter().any(|v| !v.is_finite()) {
        return Err(AtsScorerError::Configuration(format!("MLP weight {} has non-finite values", name)));
    }
    Array2::from_shape_vec(shape, flat)
        .map_err(|e| AtsScorerError::Configuration(format!("MLP weight {}: {}", name, e)))
}

fn to_vector(name: &str, values: &[f32], len: usize) -> Result<Array1<f32>> {
    if values.len() != len || values.iter().any(|v| !v.is_finite()) {
        return Err(AtsScorerError::Configuration(format!(
            "MLP bias {} must hold {} finite values",
            name, len
        )));
    }
    Ok(Array1::from_vec(values.to_vec()))
}

impl MlpCombiner {
    pub fn from_weights(weights: &MlpWeights) -> Result<Self> {
        if weights.version != MLP_WEIGHTS_VERSION {
            return Err(AtsScorerError::Configuration(format!(
                "Unsupported MLP weights version {} (expected {})",
                weights.version, MLP_WEIGHTS_VERSION
            )));
        }

        Ok(Self {
            w1: to_matrix("w1", &weights.w1, (HIDDEN_1, SignalVector::LEN))?,
            b1: to_vector("b1", &weights.b1, HIDDEN_1)?,
            w2: to_matrix("w2", &weights.w2, (HIDDEN_2, HIDDEN_1))?,
            b2: to_vector("b2", &weights.b2, HIDDEN_2)?,
            w3: to_matrix("w3", &weights.w3, (1, HIDDEN_2))?,
            b3: to_vector("b3", &weights.b3, 1)?,
            label: weights
                .label
                .clone()
                .unwrap_or_else(|| format!("v{}", weights.version)),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AtsScorerError::Configuration(format!("Failed to read MLP weights {}: {}", path.display(), e))
        })?;
        let weights: MlpWeights = serde_json::from_str(&content).map_err(|e| {
            AtsScorerError::Configuration(format!("Malformed MLP weights {}: {}", path.display(), e))
        })?;
        Self::from_weights(&weights)
    }
}

impl Combiner for MlpCombiner {
    fn combine(&self, signals: &SignalVector) -> f32 {
        let x = Array1::from_vec(sanitized(signals).to_vec());

        let h1 = (self.w1.dot(&x) + &self.b1).mapv(|v| v.max(0.0));
        let h2 = (self.w2.dot(&h1) + &self.b2).mapv(|v| v.max(0.0));
        let logit = (self.w3.dot(&h2) + &self.b3)[0];

        let out = 1.0 / (1.0 + (-logit).exp());
        if out.is_finite() { out.clamp(0.0, 1.0) } else { 0.0 }
    }

    fn name(&self) -> String {
        format!("mlp-{}", self.label)
    }
}

/// Build the combiner selected in the configuration.
pub fn combiner_from_config(config: &ScoringConfig) -> Result<Box<dyn Combiner>> {
    match config.combiner {
        CombinerKind::WeightedSum => Ok(Box::new(WeightedSumCombiner::new(config.weights)?)),
        CombinerKind::Mlp => {
            let path = config.mlp_weights_path.as_ref().ok_or_else(|| {
                AtsScorerError::Configuration("the mlp combiner requires scoring.mlp_weights_path".to_string())
            })?;
            Ok(Box::new(MlpCombiner::load(path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn boundary_vectors() -> Vec<SignalVector> {
        vec![
            SignalVector::from_array([0.0; 5]),
            SignalVector::from_array([1.0; 5]),
            SignalVector::from_array([0.3, 0.9, 0.0, 1.0, 0.5]),
            SignalVector::from_array([f32::NAN, 2.0, -1.0, f32::INFINITY, 0.5]),
        ]
    }

    fn sample_weights(scale: f32) -> MlpWeights {
        MlpWeights {
            version: MLP_WEIGHTS_VERSION,
            label: Some("test".to_string()),
            w1: (0..HIDDEN_1)
                .map(|i| (0..5).map(|j| scale * ((i + j) % 3) as f32 - 0.5).collect())
                .collect(),
            b1: vec![0.1; HIDDEN_1],
            w2: (0..HIDDEN_2)
                .map(|i| (0..HIDDEN_1).map(|j| scale * ((i * j) % 5) as f32 / 5.0).collect())
                .collect(),
            b2: vec![-0.2; HIDDEN_2],
            w3: vec![vec![scale; HIDDEN_2]],
            b3: vec![-1.0],
        }
    }

    #[test]
    fn test_match_score_rounding_and_bounds() {
        assert_eq!(MatchScore::from_unit(0.123456).value(), 12.35);
        assert_eq!(MatchScore::from_unit(1.5).value(), 100.0);
        assert_eq!(MatchScore::from_unit(-0.1).value(), 0.0);
        assert_eq!(MatchScore::from_unit(f32::NAN).value(), 0.0);
        assert_eq!(MatchScore::from_unit(0.5).to_string(), "50.00");
    }

    #[test]
    fn test_weighted_sum_bounds() {
        let combiner = WeightedSumCombiner::default();
        for v in boundary_vectors() {
            let score = combiner.score(&v).value();
            assert!((0.0..=100.0).contains(&score), "{:?} -> {}", v, score);
        }
        assert_eq!(combiner.score(&SignalVector::from_array([0.0; 5])).value(), 0.0);
        assert_eq!(combiner.score(&SignalVector::from_array([1.0; 5])).value(), 100.0);
    }

    #[test]
    fn test_weighted_sum_normalizes_weights() {
        let combiner = WeightedSumCombiner::new(SignalWeights {
            semantic: 2.0,
            keyword: 2.0,
            skills: 0.0,
            experience: 0.0,
            education: 0.0,
        })
        .unwrap();
        let v = SignalVector::from_array([1.0, 0.5, 1.0, 1.0, 1.0]);
        assert!((combiner.combine(&v) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_mlp_bounds_and_determinism() {
        let combiner = MlpCombiner::from_weights(&sample_weights(1.0)).unwrap();
        for v in boundary_vectors() {
            let first = combiner.combine(&v);
            assert!((0.0..=1.0).contains(&first));
            assert_eq!(first, combiner.combine(&v));
        }

        // Huge weights saturate the sigmoid but stay bounded
        let saturated = MlpCombiner::from_weights(&sample_weights(1e6)).unwrap();
        let score = saturated.score(&SignalVector::from_array([1.0; 5])).value();
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn test_mlp_rejects_bad_shapes() {
        let mut weights = sample_weights(1.0);
        weights.w2.pop();
        assert!(matches!(
            MlpCombiner::from_weights(&weights),
            Err(AtsScorerError::Configuration(_))
        ));

        let mut weights = sample_weights(1.0);
        weights.b3 = vec![f32::NAN];
        assert!(MlpCombiner::from_weights(&weights).is_err());

        let mut weights = sample_weights(1.0);
        weights.version = 99;
        assert!(MlpCombiner::from_weights(&weights).is_err());
    }

    #[test]
    fn test_combiner_from_config_loads_mlp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("weights.json");
        std::fs::write(&path, serde_json::to_string(&sample_weights(1.0)).unwrap()).unwrap();

        let config = ScoringConfig {
            combiner: CombinerKind::Mlp,
            weights: SignalWeights::default(),
            mlp_weights_path: Some(path),
        };
        let combiner = combiner_from_config(&config).unwrap();
        assert_eq!(combiner.name(), "mlp-test");
    }

    #[test]
    fn test_malformed_mlp_file_is_configuration_error() {
        let temp_dir = TempDir::new().unwrap();

        let missing_layers = temp_dir.path().join("missing.json");
        std::fs::write(&missing_layers, r#"{"version": 1, "w1": [], "b1": []}"#).unwrap();
        assert!(matches!(
            MlpCombiner::load(&missing_layers),
            Err(AtsScorerError::Configuration(_))
        ));

        let wrong_types = temp_dir.path().join("types.json");
        std::fs::write(&wrong_types, r#"{"version": "one"}"#).unwrap();
        assert!(matches!(
            MlpCombiner::load(&wrong_types),
            Err(AtsScorerError::Configuration(_))
        ));

        let not_json = temp_dir.path().join("garbage.json");
        std::fs::write(&not_json, "w1 = 3").unwrap();
        assert!(matches!(
            MlpCombiner::load(&not_json),
            Err(AtsScorerError::Configuration(_))
        ));
    }
}
