//! Prediction service.
//!
//! Orchestrates the gateway, feature builder and model store into a single
//! `predict` call. The service never fails the caller: anything that
//! prevents a model call — missing team statistics, a missing statistic,
//! an absent model store — comes back as a clearly labeled unavailable
//! `Prediction` instead of an error.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::Config;
use crate::features::build_features;
use crate::gateway::SportsDataGateway;
use crate::model_store::ModelStore;
use crate::types::{
    ConfidenceTier, DataOrigin, DateRange, GameContext, OverUnderPrediction, Prediction, Team,
    TotalsCall, WinLossPrediction, Winner,
};

/// Tunables the service reads from configuration.
#[derive(Debug, Clone, Copy)]
pub struct PredictorSettings {
    pub high_confidence_threshold: f64,
    pub medium_confidence_threshold: f64,
    pub default_total_line: f64,
}

impl PredictorSettings {
    pub fn from_config(config: &Config) -> PredictorSettings {
        PredictorSettings {
            high_confidence_threshold: config.high_confidence_threshold,
            medium_confidence_threshold: config.medium_confidence_threshold,
            default_total_line: config.default_total_line,
        }
    }

    /// Map a probability to its confidence tier. Monotonic by construction.
    pub fn tier(&self, probability: f64) -> ConfidenceTier {
        if probability >= self.high_confidence_threshold {
            ConfidenceTier::High
        } else if probability >= self.medium_confidence_threshold {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

impl Default for PredictorSettings {
    fn default() -> Self {
        PredictorSettings {
            high_confidence_threshold: 0.80,
            medium_confidence_threshold: 0.65,
            default_total_line: 235.0,
        }
    }
}

/// Canonical form of team names that schedule feeds abbreviate.
pub fn normalize_team_name(name: &str) -> &str {
    match name {
        "LA Lakers" => "Los Angeles Lakers",
        "Golden State" => "Golden State Warriors",
        "San Antonio" => "San Antonio Spurs",
        "New York" => "New York Knicks",
        "Oklahoma City" => "Oklahoma City Thunder",
        "New Orleans" => "New Orleans Pelicans",
        other => other,
    }
}

fn find_team<'a>(teams: &'a [Team], name: &str) -> Option<&'a Team> {
    let wanted = normalize_team_name(name);
    teams
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(wanted) || t.team_id == wanted)
}

/// Produces structured predictions for games. Exclusively owns
/// `Prediction` creation.
pub struct PredictionService {
    /// `None` when artifact loading failed at startup; predictions then
    /// degrade instead of crashing the hosting process.
    models: Option<Arc<ModelStore>>,
    gateway: Arc<SportsDataGateway>,
    settings: PredictorSettings,
}

impl PredictionService {
    pub fn new(
        models: Option<Arc<ModelStore>>,
        gateway: Arc<SportsDataGateway>,
        settings: PredictorSettings,
    ) -> PredictionService {
        PredictionService {
            models,
            gateway,
            settings,
        }
    }

    /// Build the whole pipeline from configuration. A model-loading failure
    /// is logged and leaves the service in degraded mode.
    pub fn from_config(config: &Config) -> anyhow::Result<PredictionService> {
        let gateway = Arc::new(SportsDataGateway::from_config(config)?);
        let models = match ModelStore::load(&config.models_dir) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!("Prediction models unavailable, serving degraded predictions: {e}");
                None
            }
        };
        Ok(PredictionService::new(
            models,
            gateway,
            PredictorSettings::from_config(config),
        ))
    }

    pub fn models_loaded(&self) -> bool {
        self.models.is_some()
    }

    /// Predict a single game, fetching the current team statistics through
    /// the gateway.
    pub async fn predict(&self, game: &GameContext) -> Prediction {
        let (teams, origin) = self.gateway.fetch_team_stats().await;
        self.predict_with_stats(game, &teams, origin)
    }

    /// Predict an ad-hoc matchup by team name.
    pub async fn predict_matchup(&self, home_team: &str, away_team: &str) -> Prediction {
        let home = normalize_team_name(home_team);
        let away = normalize_team_name(away_team);
        let game = GameContext {
            game_id: format!(
                "matchup-{}-{}",
                home.to_lowercase().replace(' ', "-"),
                away.to_lowercase().replace(' ', "-")
            ),
            home_team: home.to_string(),
            away_team: away.to_string(),
            scheduled_at: Utc::now(),
            venue: None,
            over_under_line: None,
        };
        self.predict(&game).await
    }

    /// Predict every game scheduled in the range.
    pub async fn predict_slate(&self, range: DateRange) -> Vec<Prediction> {
        let (games, schedule_origin) = self.gateway.fetch_schedule(range).await;
        let (teams, stats_origin) = self.gateway.fetch_team_stats().await;
        let origin = if schedule_origin == DataOrigin::Demo || stats_origin == DataOrigin::Demo {
            DataOrigin::Demo
        } else {
            DataOrigin::Live
        };
        info!(
            games = games.len(),
            origin = origin.as_label(),
            "Predicting slate"
        );
        games
            .iter()
            .map(|game| self.predict_with_stats(game, &teams, origin))
            .collect()
    }

    /// Pure orchestration over an already-fetched statistics snapshot.
    pub fn predict_with_stats(
        &self,
        game: &GameContext,
        teams: &[Team],
        origin: DataOrigin,
    ) -> Prediction {
        let Some(models) = self.models.as_ref() else {
            return self.unavailable(game, origin, "prediction models unavailable".to_string());
        };
        let Some(home) = find_team(teams, &game.home_team) else {
            return self.unavailable(
                game,
                origin,
                format!("no statistics for {}", game.home_team),
            );
        };
        let Some(away) = find_team(teams, &game.away_team) else {
            return self.unavailable(
                game,
                origin,
                format!("no statistics for {}", game.away_team),
            );
        };

        let features = match build_features(home, away) {
            Ok(f) => f,
            Err(e) => return self.unavailable(game, origin, e.to_string()),
        };
        let (winner, win_probability) = match models.predict_win_loss(&features) {
            Ok(call) => call,
            Err(e) => return self.unavailable(game, origin, e.to_string()),
        };
        let (totals_call, totals_probability) = match models.predict_over_under(&features) {
            Ok(call) => call,
            Err(e) => return self.unavailable(game, origin, e.to_string()),
        };

        let (home_win_probability, away_win_probability) = match winner {
            Winner::Home => (win_probability, 1.0 - win_probability),
            Winner::Away => (1.0 - win_probability, win_probability),
        };
        let (over_probability, under_probability) = match totals_call {
            TotalsCall::Over => (totals_probability, 1.0 - totals_probability),
            TotalsCall::Under => (1.0 - totals_probability, totals_probability),
        };
        let line = game
            .over_under_line
            .unwrap_or(self.settings.default_total_line);
        let confidence = self.settings.tier(win_probability.max(totals_probability));

        Prediction {
            game: game.clone(),
            win_loss: Some(WinLossPrediction {
                predicted: winner,
                home_win_probability,
                away_win_probability,
            }),
            over_under: Some(OverUnderPrediction {
                predicted: totals_call,
                over_probability,
                under_probability,
                line,
            }),
            confidence,
            model_version: Some(models.version().to_string()),
            stats_origin: origin,
            unavailable_reason: None,
            generated_at: Utc::now(),
        }
    }

    fn unavailable(&self, game: &GameContext, origin: DataOrigin, reason: String) -> Prediction {
        warn!(game = %game.game_id, "Prediction unavailable: {reason}");
        Prediction {
            game: game.clone(),
            win_loss: None,
            over_under: None,
            confidence: ConfidenceTier::Low,
            model_version: self.models.as_ref().map(|m| m.version().to_string()),
            stats_origin: origin,
            unavailable_reason: Some(reason),
            generated_at: Utc::now(),
        }
    }
}
