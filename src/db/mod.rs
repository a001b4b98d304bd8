//! Prediction history persistence.
//!
//! Stores every prediction the dashboards surface and the final scores
//! recorded later, so the validation engine can measure accuracy over real
//! outcomes across process restarts.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

use crate::types::{
    CompletedGame, ConfidenceTier, DataOrigin, GameContext, OverUnderPrediction, Prediction,
    TotalsCall, WinLossPrediction, Winner,
};

/// Thread-safe SQLite connection (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database, used by tests and throwaway sessions
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Predictions ───────────────────────────────────────────────────────────

    /// Insert a prediction snapshot
    pub fn insert_prediction(&self, p: &Prediction) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO predictions (
                game_id, home_team, away_team, scheduled_at, venue, game_line,
                predicted_winner, home_win_prob, away_win_prob,
                predicted_total, over_prob, under_prob, total_line,
                confidence, model_version, stats_origin, unavailable_reason,
                generated_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
            params![
                p.game.game_id,
                p.game.home_team,
                p.game.away_team,
                p.game.scheduled_at,
                p.game.venue,
                p.game.over_under_line,
                p.win_loss.as_ref().map(|w| w.predicted.as_label()),
                p.win_loss.as_ref().map(|w| w.home_win_probability),
                p.win_loss.as_ref().map(|w| w.away_win_probability),
                p.over_under.as_ref().map(|o| o.predicted.as_label()),
                p.over_under.as_ref().map(|o| o.over_probability),
                p.over_under.as_ref().map(|o| o.under_probability),
                p.over_under.as_ref().map(|o| o.line),
                p.confidence.as_label(),
                p.model_version,
                p.stats_origin.as_label(),
                p.unavailable_reason,
                p.generated_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List the most recent predictions
    pub fn list_recent_predictions(&self, limit: i64) -> Result<Vec<Prediction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions
             ORDER BY generated_at DESC LIMIT ?1",
        ))?;
        let rows = stmt
            .query_map(params![limit], map_prediction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// List predictions for games scheduled at or after the given time
    pub fn list_predictions_since(&self, since: DateTime<Utc>) -> Result<Vec<Prediction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions
             WHERE scheduled_at >= ?1 ORDER BY scheduled_at ASC",
        ))?;
        let rows = stmt
            .query_map(params![since], map_prediction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Outcomes ──────────────────────────────────────────────────────────────

    /// Record (or refresh) the final score of a completed game
    pub fn record_outcome(&self, result: &CompletedGame) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO outcomes (
                game_id, home_team, away_team, scheduled_at,
                home_score, away_score, recorded_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7)
             ON CONFLICT(game_id) DO UPDATE SET
                home_score=excluded.home_score,
                away_score=excluded.away_score,
                recorded_at=excluded.recorded_at",
            params![
                result.game.game_id,
                result.game.home_team,
                result.game.away_team,
                result.game.scheduled_at,
                result.home_score,
                result.away_score,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// List recorded outcomes for games scheduled at or after the given time
    pub fn list_outcomes_since(&self, since: DateTime<Utc>) -> Result<Vec<CompletedGame>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT game_id, home_team, away_team, scheduled_at, home_score, away_score
             FROM outcomes WHERE scheduled_at >= ?1 ORDER BY scheduled_at ASC",
        )?;
        let rows = stmt
            .query_map(params![since], map_outcome)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Everything the validation engine needs for one reconciliation pass
    pub fn validation_inputs(
        &self,
        since: DateTime<Utc>,
    ) -> Result<(Vec<Prediction>, Vec<CompletedGame>)> {
        Ok((
            self.list_predictions_since(since)?,
            self.list_outcomes_since(since)?,
        ))
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const PREDICTION_COLUMNS: &str = "game_id, home_team, away_team, scheduled_at, venue, game_line,
    predicted_winner, home_win_prob, away_win_prob,
    predicted_total, over_prob, under_prob, total_line,
    confidence, model_version, stats_origin, unavailable_reason, generated_at";

fn map_prediction(row: &rusqlite::Row) -> rusqlite::Result<Prediction> {
    let game = GameContext {
        game_id: row.get(0)?,
        home_team: row.get(1)?,
        away_team: row.get(2)?,
        scheduled_at: row.get(3)?,
        venue: row.get(4)?,
        over_under_line: row.get(5)?,
    };

    let predicted_winner: Option<String> = row.get(6)?;
    let win_loss = match predicted_winner.as_deref().and_then(Winner::from_label) {
        Some(predicted) => Some(WinLossPrediction {
            predicted,
            home_win_probability: row.get(7)?,
            away_win_probability: row.get(8)?,
        }),
        None => None,
    };

    let predicted_total: Option<String> = row.get(9)?;
    let over_under = match predicted_total.as_deref().and_then(TotalsCall::from_label) {
        Some(predicted) => Some(OverUnderPrediction {
            predicted,
            over_probability: row.get(10)?,
            under_probability: row.get(11)?,
            line: row.get(12)?,
        }),
        None => None,
    };

    let confidence: String = row.get(13)?;
    let stats_origin: String = row.get(15)?;

    Ok(Prediction {
        game,
        win_loss,
        over_under,
        confidence: ConfidenceTier::from_label(&confidence).unwrap_or(ConfidenceTier::Low),
        model_version: row.get(14)?,
        stats_origin: DataOrigin::from_label(&stats_origin).unwrap_or(DataOrigin::Live),
        unavailable_reason: row.get(16)?,
        generated_at: row.get(17)?,
    })
}

fn map_outcome(row: &rusqlite::Row) -> rusqlite::Result<CompletedGame> {
    Ok(CompletedGame {
        game: GameContext {
            game_id: row.get(0)?,
            home_team: row.get(1)?,
            away_team: row.get(2)?,
            scheduled_at: row.get(3)?,
            venue: None,
            over_under_line: None,
        },
        home_score: row.get(4)?,
        away_score: row.get(5)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id            TEXT    NOT NULL,
    home_team          TEXT    NOT NULL,
    away_team          TEXT    NOT NULL,
    scheduled_at       TEXT    NOT NULL,
    venue              TEXT,
    game_line          REAL,
    predicted_winner   TEXT,
    home_win_prob      REAL,
    away_win_prob      REAL,
    predicted_total    TEXT,
    over_prob          REAL,
    under_prob         REAL,
    total_line         REAL,
    confidence         TEXT    NOT NULL,
    model_version      TEXT,
    stats_origin       TEXT    NOT NULL DEFAULT 'live',
    unavailable_reason TEXT,
    generated_at       TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS outcomes (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id      TEXT    NOT NULL UNIQUE,
    home_team    TEXT    NOT NULL,
    away_team    TEXT    NOT NULL,
    scheduled_at TEXT    NOT NULL,
    home_score   INTEGER NOT NULL,
    away_score   INTEGER NOT NULL,
    recorded_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_predictions_game ON predictions(game_id);
CREATE INDEX IF NOT EXISTS idx_predictions_scheduled ON predictions(scheduled_at);
CREATE INDEX IF NOT EXISTS idx_outcomes_scheduled ON outcomes(scheduled_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_prediction(game_id: &str, hours_ago: i64) -> Prediction {
        let scheduled = Utc.with_ymd_and_hms(2024, 3, 14, 23, 30, 0).unwrap()
            - Duration::hours(hours_ago);
        Prediction {
            game: GameContext {
                game_id: game_id.into(),
                home_team: "Boston Celtics".into(),
                away_team: "Miami Heat".into(),
                scheduled_at: scheduled,
                venue: Some("TD Garden".into()),
                over_under_line: Some(224.5),
            },
            win_loss: Some(WinLossPrediction {
                predicted: Winner::Home,
                home_win_probability: 0.71,
                away_win_probability: 0.29,
            }),
            over_under: Some(OverUnderPrediction {
                predicted: TotalsCall::Under,
                over_probability: 0.41,
                under_probability: 0.59,
                line: 224.5,
            }),
            confidence: ConfidenceTier::Medium,
            model_version: Some("rf-2024.04.1".into()),
            stats_origin: DataOrigin::Live,
            unavailable_reason: None,
            generated_at: scheduled - Duration::hours(3),
        }
    }

    #[test]
    fn prediction_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let original = sample_prediction("401585601", 0);
        db.insert_prediction(&original).unwrap();

        let listed = db.list_recent_predictions(10).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], original);
    }

    #[test]
    fn unavailable_prediction_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let mut original = sample_prediction("401585602", 0);
        original.win_loss = None;
        original.over_under = None;
        original.model_version = None;
        original.stats_origin = DataOrigin::Demo;
        original.unavailable_reason = Some("prediction models unavailable".into());
        original.confidence = ConfidenceTier::Low;
        db.insert_prediction(&original).unwrap();

        let listed = db.list_recent_predictions(10).unwrap();
        assert_eq!(listed[0], original);
    }

    #[test]
    fn since_filter_uses_scheduled_time() {
        let db = Database::open_in_memory().unwrap();
        db.insert_prediction(&sample_prediction("401585603", 0)).unwrap();
        db.insert_prediction(&sample_prediction("401585604", 24 * 30)).unwrap();

        let cutoff = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let recent = db.list_predictions_since(cutoff).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].game.game_id, "401585603");
    }

    #[test]
    fn outcome_upsert_refreshes_scores() {
        let db = Database::open_in_memory().unwrap();
        let p = sample_prediction("401585605", 0);
        let mut result = CompletedGame {
            game: p.game.clone(),
            home_score: 110,
            away_score: 104,
        };
        db.record_outcome(&result).unwrap();
        // Late stat correction
        result.home_score = 111;
        db.record_outcome(&result).unwrap();

        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let outcomes = db.list_outcomes_since(since).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].home_score, 111);
    }

    #[test]
    fn validation_inputs_pair_up() {
        let db = Database::open_in_memory().unwrap();
        let p = sample_prediction("401585606", 0);
        db.insert_prediction(&p).unwrap();
        db.record_outcome(&CompletedGame {
            game: p.game.clone(),
            home_score: 121,
            away_score: 99,
        })
        .unwrap();

        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (predictions, outcomes) = db.validation_inputs(since).unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(predictions[0].game.game_id, outcomes[0].game.game_id);
    }
}
