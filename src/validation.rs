//! Prediction validation.
//!
//! Joins stored predictions against recorded final scores and aggregates
//! per-task accuracy. Training-set accuracy claims mean nothing here; this
//! is the component that measures how the models actually perform.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::error::ValidationError;
use crate::types::{CompletedGame, Prediction, TotalsCall};

/// A prediction paired with the actual outcome it was validated against.
/// Created only here; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRecord {
    pub prediction: Prediction,
    pub outcome: CompletedGame,
    pub win_loss_correct: Option<bool>,
    pub over_under_correct: Option<bool>,
}

/// Correct/resolved tally for one prediction task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskAccuracy {
    pub correct: usize,
    pub resolved: usize,
}

impl TaskAccuracy {
    fn record(&mut self, correct: bool) {
        self.resolved += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// `None` when nothing resolved — never a division by zero.
    pub fn accuracy(&self) -> Option<f64> {
        if self.resolved == 0 {
            None
        } else {
            Some(self.correct as f64 / self.resolved as f64)
        }
    }
}

/// Aggregate outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracyReport {
    /// Predictions with a matching recorded result
    pub resolved: usize,
    /// Predictions past the grace period with no result
    pub unresolved: usize,
    /// Predictions still inside the grace period with no result
    pub pending: usize,
    pub win_loss: TaskAccuracy,
    pub over_under: TaskAccuracy,
    /// Resolved records where both calls were correct
    pub both_correct: usize,
    pub records: Vec<ValidationRecord>,
}

impl AccuracyReport {
    /// All predictions without a matching result, whatever the bucket.
    pub fn unmatched(&self) -> usize {
        self.unresolved + self.pending
    }
}

/// Reconciles predictions with actual outcomes.
pub struct ValidationEngine {
    /// How long after tip-off a result may reasonably still be missing
    grace: Duration,
}

impl ValidationEngine {
    pub fn new(grace_hours: i64) -> ValidationEngine {
        ValidationEngine {
            grace: Duration::hours(grace_hours.max(0)),
        }
    }

    pub fn from_config(config: &crate::config::Config) -> ValidationEngine {
        ValidationEngine::new(config.validation_grace_hours)
    }

    /// Join predictions to outcomes by (home, away, date) and score each
    /// matched pair. Unmatched predictions are bucketed, never errors.
    pub fn reconcile(
        &self,
        predictions: &[Prediction],
        actuals: &[CompletedGame],
        now: DateTime<Utc>,
    ) -> AccuracyReport {
        let mut report = AccuracyReport::default();

        for prediction in predictions {
            match self.match_result(prediction, actuals) {
                Ok(outcome) => {
                    let record = score(prediction, outcome);
                    report.resolved += 1;
                    if let Some(correct) = record.win_loss_correct {
                        report.win_loss.record(correct);
                    }
                    if let Some(correct) = record.over_under_correct {
                        report.over_under.record(correct);
                    }
                    if record.win_loss_correct == Some(true)
                        && record.over_under_correct == Some(true)
                    {
                        report.both_correct += 1;
                    }
                    report.records.push(record);
                }
                Err(e) => {
                    if prediction.game.scheduled_at + self.grace > now {
                        report.pending += 1;
                    } else {
                        debug!("{e}");
                        report.unresolved += 1;
                    }
                }
            }
        }

        report
    }

    /// Find the recorded result for a prediction's game.
    pub fn match_result<'a>(
        &self,
        prediction: &Prediction,
        actuals: &'a [CompletedGame],
    ) -> Result<&'a CompletedGame, ValidationError> {
        let key = join_key(
            &prediction.game.home_team,
            &prediction.game.away_team,
            prediction.game.scheduled_at.date_naive(),
        );
        actuals
            .iter()
            .find(|actual| {
                join_key(
                    &actual.game.home_team,
                    &actual.game.away_team,
                    actual.game.scheduled_at.date_naive(),
                ) == key
            })
            .ok_or_else(|| ValidationError::NoMatch {
                home: prediction.game.home_team.clone(),
                away: prediction.game.away_team.clone(),
                date: prediction.game.scheduled_at.date_naive(),
            })
    }
}

fn join_key(home: &str, away: &str, date: NaiveDate) -> (String, String, NaiveDate) {
    (home.to_lowercase(), away.to_lowercase(), date)
}

/// Score one matched prediction. Unavailable calls resolve the record but
/// contribute to neither task tally.
fn score(prediction: &Prediction, outcome: &CompletedGame) -> ValidationRecord {
    let win_loss_correct = prediction
        .win_loss
        .as_ref()
        .map(|call| call.predicted == outcome.winner());
    let over_under_correct = prediction.over_under.as_ref().map(|call| {
        // Totals exactly on the line resolve Under.
        let actual = if (outcome.total_points() as f64) > call.line {
            TotalsCall::Over
        } else {
            TotalsCall::Under
        };
        call.predicted == actual
    });
    ValidationRecord {
        prediction: prediction.clone(),
        outcome: outcome.clone(),
        win_loss_correct,
        over_under_correct,
    }
}
