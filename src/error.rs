use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while deriving a feature vector from team snapshots.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("missing statistic `{stat}` for {team}")]
    MissingStatistic { team: String, stat: &'static str },
}

/// Errors raised while loading model artifacts or running inference.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("failed to load model artifact `{path}`: {reason}")]
    LoadFailure { path: String, reason: String },

    /// Scaler and classifier must come from the same training run.
    #[error("artifact `{artifact}` has version `{found}`, expected `{expected}`")]
    VersionMismatch {
        artifact: String,
        expected: String,
        found: String,
    },

    #[error("feature vector width {got} does not match model input width {expected}")]
    WidthMismatch { expected: usize, got: usize },
}

/// Errors surfaced by the data source gateway after retries are exhausted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataSourceError {
    #[error("network failure talking to {provider}: {reason}")]
    NetworkFailure { provider: String, reason: String },

    #[error("{provider} returned no rows for the requested range")]
    EmptyResult { provider: String },
}

/// Errors raised while matching predictions against recorded results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no completed result matches {home} vs {away} on {date}")]
    NoMatch {
        home: String,
        away: String,
        date: NaiveDate,
    },
}
