use anyhow::Result;
use async_trait::async_trait;

use crate::types::{CompletedGame, DateRange, GameContext, Team};

/// Trait that every schedule/results provider must implement.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Games scheduled (or in progress) in the given date range.
    async fn fetch_schedule(&self, range: DateRange) -> Result<Vec<GameContext>>;

    /// Games that finished in the given date range, with final scores.
    async fn fetch_completed(&self, range: DateRange) -> Result<Vec<CompletedGame>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Trait for providers of per-team aggregate statistics.
#[async_trait]
pub trait TeamStatsSource: Send + Sync {
    /// Current statistics snapshot for every team in the league.
    async fn fetch_team_stats(&self) -> Result<Vec<Team>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
