//! NBA game prediction pipeline.
//!
//! A library core for dashboards that surface win/loss and over/under
//! predictions: live schedule and team-stat ingestion with demo fallback,
//! feature construction, inference over persisted random-forest artifacts,
//! and accuracy validation against recorded results. The hosting process
//! owns presentation and logging setup; this crate only emits `tracing`
//! events.

pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod gateway;
pub mod model_store;
pub mod prediction;
pub mod types;
pub mod validation;

pub use config::Config;
pub use db::Database;
pub use error::{DataSourceError, FeatureError, ModelError, ValidationError};
pub use features::{build_features, FeatureVector, FEATURE_WIDTH};
pub use gateway::{
    current_season, season_is_active, DemoDataset, EspnScoreboard, NbaStatsClient, RetryPolicy,
    ScheduleSource, SportsDataGateway, TeamStatsSource,
};
pub use model_store::ModelStore;
pub use prediction::{normalize_team_name, PredictionService, PredictorSettings};
pub use types::{
    CompletedGame, ConfidenceTier, DataOrigin, DateRange, GameContext, OverUnderPrediction,
    Prediction, Team, TeamStats, TotalsCall, WinLossPrediction, Winner,
};
pub use validation::{AccuracyReport, TaskAccuracy, ValidationEngine, ValidationRecord};
