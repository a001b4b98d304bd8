//! Serialized model artifacts.
//!
//! Classifiers are persisted as random forests: flat node arrays per tree,
//! split nodes referencing children by index, leaves carrying class
//! probabilities. Class order is `[away, home]` for the win/loss task and
//! `[under, over]` for over/under. Scalers are standard scalers persisted as
//! per-feature mean/scale pairs.
//!
//! Every artifact carries the `model_version` tag of the training run that
//! produced it; the store refuses to pair artifacts from different runs.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::features::FeatureVector;

/// Standard-scaler parameters paired with a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub model_version: String,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl ScalerArtifact {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.mean.is_empty() {
            return Err("scaler has no parameters".into());
        }
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "scaler mean width {} does not match scale width {}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        Ok(())
    }

    /// Apply `(x − mean) / scale` per feature. Zero-variance columns are
    /// stored with scale 0 and pass through centered only.
    pub fn transform(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.mean.len() {
            return Err(ModelError::WidthMismatch {
                expected: self.mean.len(),
                got: features.len(),
            });
        }
        Ok(features
            .as_slice()
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| {
                let centered = x - mean;
                if *scale == 0.0 {
                    centered
                } else {
                    centered / scale
                }
            })
            .collect())
    }
}

/// One node of a decision tree. Children are indices into the tree's node
/// array and always point forward, so traversal terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        probabilities: [f64; 2],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, width: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= width {
                        return Err(format!("node {i} splits on feature {feature} >= {width}"));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(format!("node {i} has out-of-order child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { probabilities } => {
                    if probabilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
                        return Err(format!("node {i} has probabilities outside [0, 1]"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk the tree for one scaled sample. Indices were range-checked at
    /// load time.
    fn predict(&self, sample: &[f64]) -> [f64; 2] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { probabilities } => return *probabilities,
            }
        }
    }
}

/// A persisted random-forest classifier for one prediction task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub model_version: String,
    /// "win_loss" or "over_under"
    pub task: String,
    /// Class labels in probability order
    pub classes: [String; 2],
    pub trees: Vec<DecisionTree>,
}

impl ForestArtifact {
    pub(crate) fn validate(&self, width: usize) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(width)
                .map_err(|reason| format!("tree {i}: {reason}"))?;
        }
        Ok(())
    }

    /// Average the per-tree class probabilities and renormalize.
    pub fn predict(&self, sample: &[f64]) -> [f64; 2] {
        let mut summed = [0.0f64; 2];
        for tree in &self.trees {
            let p = tree.predict(sample);
            summed[0] += p[0];
            summed[1] += p[1];
        }
        let total = summed[0] + summed[1];
        if total <= 0.0 {
            return [0.5, 0.5];
        }
        [summed[0] / total, summed[1] / total]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{build_features, FEATURE_WIDTH};
    use crate::types::{Team, TeamStats};
    use approx::assert_relative_eq;

    fn sample_tree() -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf {
                    probabilities: [0.8, 0.2],
                },
                TreeNode::Leaf {
                    probabilities: [0.3, 0.7],
                },
            ],
        }
    }

    #[test]
    fn tree_routes_by_threshold() {
        let tree = sample_tree();
        let mut sample = vec![0.0; FEATURE_WIDTH];
        sample[0] = -1.0;
        assert_eq!(tree.predict(&sample), [0.8, 0.2]);
        sample[0] = 1.0;
        assert_eq!(tree.predict(&sample), [0.3, 0.7]);
    }

    #[test]
    fn forest_averages_trees() {
        let forest = ForestArtifact {
            model_version: "rf-2024.03".into(),
            task: "win_loss".into(),
            classes: ["AWAY".into(), "HOME".into()],
            trees: vec![sample_tree(), sample_tree()],
        };
        let mut sample = vec![0.0; FEATURE_WIDTH];
        sample[0] = 1.0;
        let p = forest.predict(&sample);
        assert_relative_eq!(p[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(p[1], 0.7, epsilon = 1e-12);
        assert_relative_eq!(p[0] + p[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn node_json_round_trip() {
        let json = r#"{
            "model_version": "rf-2024.03",
            "task": "win_loss",
            "classes": ["AWAY", "HOME"],
            "trees": [
                {
                    "nodes": [
                        {"feature": 8, "threshold": 0.25, "left": 1, "right": 2},
                        {"probabilities": [0.6, 0.4]},
                        {"probabilities": [0.2, 0.8]}
                    ]
                }
            ]
        }"#;
        let forest: ForestArtifact = serde_json::from_str(json).unwrap();
        assert!(forest.validate(FEATURE_WIDTH).is_ok());
        assert_eq!(forest.trees[0].nodes.len(), 3);
        assert!(matches!(
            forest.trees[0].nodes[0],
            TreeNode::Split { feature: 8, .. }
        ));
    }

    #[test]
    fn validate_rejects_backward_children() {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 1,
                },
                TreeNode::Leaf {
                    probabilities: [0.5, 0.5],
                },
            ],
        };
        assert!(tree.validate(FEATURE_WIDTH).is_err());
    }

    #[test]
    fn validate_rejects_wide_feature_index() {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: FEATURE_WIDTH,
                    threshold: 0.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf {
                    probabilities: [1.0, 0.0],
                },
                TreeNode::Leaf {
                    probabilities: [0.0, 1.0],
                },
            ],
        };
        assert!(tree.validate(FEATURE_WIDTH).is_err());
    }

    #[test]
    fn scaler_centers_and_scales() {
        let home = Team {
            team_id: "bos".into(),
            name: "Boston Celtics".into(),
            season: "2023-24".into(),
            stats: TeamStats {
                offensive_rating: Some(118.0),
                defensive_rating: Some(108.0),
                pace: Some(101.0),
                recent_win_pct: Some(0.70),
            },
        };
        let away = Team {
            team_id: "mia".into(),
            name: "Miami Heat".into(),
            season: "2023-24".into(),
            stats: TeamStats {
                offensive_rating: Some(112.0),
                defensive_rating: Some(110.0),
                pace: Some(98.0),
                recent_win_pct: Some(0.55),
            },
        };
        let features = build_features(&home, &away).unwrap();

        let scaler = ScalerArtifact {
            model_version: "rf-2024.03".into(),
            mean: vec![110.0; FEATURE_WIDTH],
            scale: vec![4.0; FEATURE_WIDTH],
        };
        let scaled = scaler.transform(&features).unwrap();
        assert_eq!(scaled.len(), FEATURE_WIDTH);
        assert_relative_eq!(scaled[0], (118.0 - 110.0) / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn scaler_width_mismatch_is_typed() {
        let scaler = ScalerArtifact {
            model_version: "rf-2024.03".into(),
            mean: vec![0.0; 4],
            scale: vec![1.0; 4],
        };
        let home = Team {
            team_id: "den".into(),
            name: "Denver Nuggets".into(),
            season: "2023-24".into(),
            stats: TeamStats {
                offensive_rating: Some(116.8),
                defensive_rating: Some(110.5),
                pace: Some(99.2),
                recent_win_pct: Some(0.65),
            },
        };
        let features = build_features(&home, &home).unwrap();
        let err = scaler.transform(&features).unwrap_err();
        assert_eq!(
            err,
            crate::error::ModelError::WidthMismatch {
                expected: 4,
                got: FEATURE_WIDTH,
            }
        );
    }
}
