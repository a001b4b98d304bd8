//! Pre-trained classifier store.
//!
//! Loads the win/loss and over/under forests with their paired input scalers
//! from a models directory, once, at construction. The store is read-only
//! after load and safe to share across tasks behind an `Arc` without
//! locking. Callers that need predictions when loading failed should treat
//! the store as absent and degrade (the prediction service does this).

pub mod artifact;

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::ModelError;
use crate::features::{FeatureVector, FEATURE_WIDTH};
use crate::types::{TotalsCall, Winner};
use self::artifact::{ForestArtifact, ScalerArtifact};

pub const WIN_LOSS_MODEL_FILE: &str = "win_loss_model.json";
pub const OVER_UNDER_MODEL_FILE: &str = "over_under_model.json";
pub const WIN_LOSS_SCALER_FILE: &str = "win_loss_scaler.json";
pub const OVER_UNDER_SCALER_FILE: &str = "over_under_scaler.json";

/// One task's classifier with its paired scaler.
#[derive(Debug, Clone)]
struct TaskModel {
    forest: ForestArtifact,
    scaler: ScalerArtifact,
}

impl TaskModel {
    /// Scale the raw features and return `[negative, positive]` class
    /// probabilities.
    fn probabilities(&self, features: &FeatureVector) -> Result<[f64; 2], ModelError> {
        let scaled = self.scaler.transform(features)?;
        Ok(self.forest.predict(&scaled))
    }
}

/// Immutable pair of classifiers from a single training run.
#[derive(Debug, Clone)]
pub struct ModelStore {
    version: String,
    win_loss: TaskModel,
    over_under: TaskModel,
}

impl ModelStore {
    /// Load all four artifacts from `models_dir`.
    pub fn load(models_dir: impl AsRef<Path>) -> Result<ModelStore, ModelError> {
        let dir = models_dir.as_ref();
        let win_loss_forest: ForestArtifact = read_artifact(&dir.join(WIN_LOSS_MODEL_FILE))?;
        let over_under_forest: ForestArtifact = read_artifact(&dir.join(OVER_UNDER_MODEL_FILE))?;
        let win_loss_scaler: ScalerArtifact = read_artifact(&dir.join(WIN_LOSS_SCALER_FILE))?;
        let over_under_scaler: ScalerArtifact = read_artifact(&dir.join(OVER_UNDER_SCALER_FILE))?;
        let store = ModelStore::from_artifacts(
            win_loss_forest,
            win_loss_scaler,
            over_under_forest,
            over_under_scaler,
        )?;
        info!(
            version = %store.version,
            dir = %dir.display(),
            "Loaded prediction models"
        );
        Ok(store)
    }

    /// Assemble a store from already-parsed artifacts, enforcing the
    /// same-training-run invariant.
    pub fn from_artifacts(
        win_loss_forest: ForestArtifact,
        win_loss_scaler: ScalerArtifact,
        over_under_forest: ForestArtifact,
        over_under_scaler: ScalerArtifact,
    ) -> Result<ModelStore, ModelError> {
        let version = win_loss_forest.model_version.clone();
        check_version(WIN_LOSS_SCALER_FILE, &version, &win_loss_scaler.model_version)?;
        check_version(OVER_UNDER_MODEL_FILE, &version, &over_under_forest.model_version)?;
        check_version(
            OVER_UNDER_SCALER_FILE,
            &version,
            &over_under_scaler.model_version,
        )?;

        check_task(WIN_LOSS_MODEL_FILE, &win_loss_forest, "win_loss")?;
        check_task(OVER_UNDER_MODEL_FILE, &over_under_forest, "over_under")?;
        validate(WIN_LOSS_MODEL_FILE, win_loss_forest.validate(FEATURE_WIDTH))?;
        validate(OVER_UNDER_MODEL_FILE, over_under_forest.validate(FEATURE_WIDTH))?;
        validate(WIN_LOSS_SCALER_FILE, win_loss_scaler.validate())?;
        validate(OVER_UNDER_SCALER_FILE, over_under_scaler.validate())?;

        Ok(ModelStore {
            version,
            win_loss: TaskModel {
                forest: win_loss_forest,
                scaler: win_loss_scaler,
            },
            over_under: TaskModel {
                forest: over_under_forest,
                scaler: over_under_scaler,
            },
        })
    }

    /// Training-run tag shared by all loaded artifacts.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Predict the winner. Returns the winning label with its probability.
    pub fn predict_win_loss(
        &self,
        features: &FeatureVector,
    ) -> Result<(Winner, f64), ModelError> {
        let [p_away, p_home] = self.win_loss.probabilities(features)?;
        if p_home > 0.5 {
            Ok((Winner::Home, p_home))
        } else {
            Ok((Winner::Away, p_away))
        }
    }

    /// Predict over/under against a points line. Returns the chosen label
    /// with its probability.
    pub fn predict_over_under(
        &self,
        features: &FeatureVector,
    ) -> Result<(TotalsCall, f64), ModelError> {
        let [p_under, p_over] = self.over_under.probabilities(features)?;
        if p_over > 0.5 {
            Ok((TotalsCall::Over, p_over))
        } else {
            Ok((TotalsCall::Under, p_under))
        }
    }
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let text = fs::read_to_string(path).map_err(|e| ModelError::LoadFailure {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ModelError::LoadFailure {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn check_version(artifact: &str, expected: &str, found: &str) -> Result<(), ModelError> {
    if expected != found {
        return Err(ModelError::VersionMismatch {
            artifact: artifact.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

fn check_task(artifact: &str, forest: &ForestArtifact, expected: &str) -> Result<(), ModelError> {
    if forest.task != expected {
        return Err(ModelError::LoadFailure {
            path: artifact.to_string(),
            reason: format!("artifact is for task `{}`, expected `{expected}`", forest.task),
        });
    }
    Ok(())
}

fn validate(artifact: &str, result: Result<(), String>) -> Result<(), ModelError> {
    result.map_err(|reason| ModelError::LoadFailure {
        path: artifact.to_string(),
        reason,
    })
}
