//! Data source gateway.
//!
//! Wraps the live schedule/results and team-statistics providers with
//! bounded exponential-backoff retry, converts exhausted failures into the
//! typed `DataSourceError`, and falls back to the bundled demo snapshot so
//! callers always get usable data. Every response is tagged with its
//! `DataOrigin` so downstream consumers can label degraded output.

pub mod demo;
pub mod espn;
pub mod nba_stats;
pub mod provider;

pub use demo::DemoDataset;
pub use espn::EspnScoreboard;
pub use nba_stats::NbaStatsClient;
pub use provider::{ScheduleSource, TeamStatsSource};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use tracing::warn;

use crate::config::Config;
use crate::error::DataSourceError;
use crate::types::{CompletedGame, DataOrigin, DateRange, GameContext, Team};

/// Bounded exponential backoff settings for live API calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_backoff_ms: 250,
            max_backoff_ms: 4000,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> RetryPolicy {
        RetryPolicy {
            max_attempts: config.retry_max_attempts,
            base_backoff_ms: config.retry_base_backoff_ms,
            max_backoff_ms: config.retry_max_backoff_ms,
        }
    }

    /// Delay before the next attempt: doubled per attempt, capped, with a
    /// little jitter so concurrent callers do not retry in lockstep.
    fn backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .base_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_backoff_ms);
        let jitter = rand::thread_rng().gen_range(0..=backoff_ms / 4);
        Duration::from_millis(backoff_ms + jitter)
    }
}

/// Run a provider call with retries. After exhaustion the last error is
/// surfaced as a typed `DataSourceError`, never a raw transport error.
async fn fetch_with_retry<T, F, Fut>(
    source: &str,
    what: &str,
    policy: &RetryPolicy,
    mut f: F,
) -> Result<T, DataSourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{source} {what} fetch failed (attempt {attempt}/{}): {e}. Retrying in {:?}",
                    policy.max_attempts, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(DataSourceError::NetworkFailure {
                    provider: source.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Facade over the live providers with demo fallback.
pub struct SportsDataGateway {
    schedule: Arc<dyn ScheduleSource>,
    stats: Arc<dyn TeamStatsSource>,
    demo: DemoDataset,
    retry: RetryPolicy,
}

impl SportsDataGateway {
    pub fn new(
        schedule: Arc<dyn ScheduleSource>,
        stats: Arc<dyn TeamStatsSource>,
        retry: RetryPolicy,
    ) -> SportsDataGateway {
        SportsDataGateway {
            schedule,
            stats,
            demo: DemoDataset::bundled(),
            retry,
        }
    }

    /// Wire up the ESPN and NBA Stats clients from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<SportsDataGateway> {
        let timeout = Duration::from_secs(config.api_timeout_secs);
        let espn = EspnScoreboard::new(Some(&config.espn_api_url), timeout)?;
        let nba = NbaStatsClient::new(
            Some(&config.nba_stats_api_url),
            config.season.clone(),
            timeout,
        )?;
        Ok(SportsDataGateway::new(
            Arc::new(espn),
            Arc::new(nba),
            RetryPolicy::from_config(config),
        ))
    }

    /// Scheduled games in the range; demo snapshot on failure or empty
    /// season.
    pub async fn fetch_schedule(&self, range: DateRange) -> (Vec<GameContext>, DataOrigin) {
        let source = Arc::clone(&self.schedule);
        let result = fetch_with_retry(self.schedule.name(), "schedule", &self.retry, || {
            let source = Arc::clone(&source);
            async move { source.fetch_schedule(range).await }
        })
        .await;
        match result {
            Ok(games) if !games.is_empty() => (games, DataOrigin::Live),
            Ok(_) => {
                warn!(
                    "{}",
                    DataSourceError::EmptyResult {
                        provider: self.schedule.name().to_string()
                    }
                );
                (self.demo.schedule(), DataOrigin::Demo)
            }
            Err(e) => {
                warn!("Schedule fetch failed, serving demo snapshot: {e}");
                (self.demo.schedule(), DataOrigin::Demo)
            }
        }
    }

    /// Finished games with final scores; demo snapshot on failure or empty
    /// result.
    pub async fn fetch_completed_results(
        &self,
        range: DateRange,
    ) -> (Vec<CompletedGame>, DataOrigin) {
        let source = Arc::clone(&self.schedule);
        let result = fetch_with_retry(self.schedule.name(), "results", &self.retry, || {
            let source = Arc::clone(&source);
            async move { source.fetch_completed(range).await }
        })
        .await;
        match result {
            Ok(results) if !results.is_empty() => (results, DataOrigin::Live),
            Ok(_) => {
                warn!(
                    "{}",
                    DataSourceError::EmptyResult {
                        provider: self.schedule.name().to_string()
                    }
                );
                (self.demo.completed_results(), DataOrigin::Demo)
            }
            Err(e) => {
                warn!("Results fetch failed, serving demo snapshot: {e}");
                (self.demo.completed_results(), DataOrigin::Demo)
            }
        }
    }

    /// League-wide team statistics; demo snapshot on failure or empty
    /// result.
    pub async fn fetch_team_stats(&self) -> (Vec<Team>, DataOrigin) {
        let source = Arc::clone(&self.stats);
        let result = fetch_with_retry(self.stats.name(), "team stats", &self.retry, || {
            let source = Arc::clone(&source);
            async move { source.fetch_team_stats().await }
        })
        .await;
        match result {
            Ok(teams) if !teams.is_empty() => (teams, DataOrigin::Live),
            Ok(_) => {
                warn!(
                    "{}",
                    DataSourceError::EmptyResult {
                        provider: self.stats.name().to_string()
                    }
                );
                (self.demo.teams(), DataOrigin::Demo)
            }
            Err(e) => {
                warn!("Team stats fetch failed, serving demo snapshot: {e}");
                (self.demo.teams(), DataOrigin::Demo)
            }
        }
    }

    pub fn demo_dataset(&self) -> &DemoDataset {
        &self.demo
    }
}

/// NBA season string for a date, e.g. 2025-10-21 → "2025-26".
/// Seasons roll over in October.
pub fn current_season(today: NaiveDate) -> String {
    let year = today.year();
    if today.month() >= 10 {
        format!("{}-{:02}", year, (year + 1) % 100)
    } else {
        format!("{}-{:02}", year - 1, year % 100)
    }
}

/// The league plays October through June; July–September is the off-season.
pub fn season_is_active(today: NaiveDate) -> bool {
    !matches!(today.month(), 7..=9)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use crate::types::TeamStats;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    struct StubSchedule {
        games: Vec<GameContext>,
        completed: Vec<CompletedGame>,
        fail: bool,
    }

    #[async_trait]
    impl ScheduleSource for StubSchedule {
        fn name(&self) -> &str {
            "stub-schedule"
        }

        async fn fetch_schedule(&self, _range: DateRange) -> anyhow::Result<Vec<GameContext>> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.games.clone())
        }

        async fn fetch_completed(&self, _range: DateRange) -> anyhow::Result<Vec<CompletedGame>> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.completed.clone())
        }
    }

    struct StubStats {
        teams: Vec<Team>,
        fail: bool,
    }

    #[async_trait]
    impl TeamStatsSource for StubStats {
        fn name(&self) -> &str {
            "stub-stats"
        }

        async fn fetch_team_stats(&self) -> anyhow::Result<Vec<Team>> {
            if self.fail {
                anyhow::bail!("read timed out");
            }
            Ok(self.teams.clone())
        }
    }

    fn gateway(schedule: StubSchedule, stats: StubStats) -> SportsDataGateway {
        SportsDataGateway::new(Arc::new(schedule), Arc::new(stats), fast_retry())
    }

    fn sample_game() -> GameContext {
        GameContext {
            game_id: "401585601".into(),
            home_team: "Boston Celtics".into(),
            away_team: "Miami Heat".into(),
            scheduled_at: Utc::now(),
            venue: None,
            over_under_line: Some(228.5),
        }
    }

    fn sample_team() -> Team {
        Team {
            team_id: "1610612738".into(),
            name: "Boston Celtics".into(),
            season: "2023-24".into(),
            stats: TeamStats {
                offensive_rating: Some(122.2),
                defensive_rating: Some(110.6),
                pace: Some(98.5),
                recent_win_pct: Some(0.78),
            },
        }
    }

    fn today_range() -> DateRange {
        DateRange::single(Utc::now().date_naive())
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failure() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32, DataSourceError> =
            fetch_with_retry("stub", "numbers", &fast_retry(), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 2 {
                        anyhow::bail!("connection reset")
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_exhaustion_surfaces_typed_failure() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32, DataSourceError> =
            fetch_with_retry("stub", "numbers", &fast_retry(), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move { anyhow::bail!("connection refused") }
            })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, DataSourceError::NetworkFailure { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn live_data_is_tagged_live() {
        let gw = gateway(
            StubSchedule {
                games: vec![sample_game()],
                completed: vec![],
                fail: false,
            },
            StubStats {
                teams: vec![sample_team()],
                fail: false,
            },
        );
        let (games, origin) = gw.fetch_schedule(today_range()).await;
        assert_eq!(origin, DataOrigin::Live);
        assert_eq!(games.len(), 1);
        let (teams, origin) = gw.fetch_team_stats().await;
        assert_eq!(origin, DataOrigin::Live);
        assert_eq!(teams.len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_demo() {
        let gw = gateway(
            StubSchedule {
                games: vec![],
                completed: vec![],
                fail: true,
            },
            StubStats {
                teams: vec![],
                fail: true,
            },
        );
        let (games, origin) = gw.fetch_schedule(today_range()).await;
        assert_eq!(origin, DataOrigin::Demo);
        assert!(!games.is_empty());
        let (teams, origin) = gw.fetch_team_stats().await;
        assert_eq!(origin, DataOrigin::Demo);
        assert!(!teams.is_empty());
        let (results, origin) = gw.fetch_completed_results(today_range()).await;
        assert_eq!(origin, DataOrigin::Demo);
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn empty_season_falls_back_to_demo() {
        let gw = gateway(
            StubSchedule {
                games: vec![],
                completed: vec![],
                fail: false,
            },
            StubStats {
                teams: vec![sample_team()],
                fail: false,
            },
        );
        let (games, origin) = gw.fetch_schedule(today_range()).await;
        assert_eq!(origin, DataOrigin::Demo);
        assert!(!games.is_empty());
    }

    #[tokio::test]
    async fn unreachable_live_endpoint_falls_back_to_demo() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("courtside=debug")
            .try_init();
        // Nothing listens on this port; the connection fails immediately.
        let espn = EspnScoreboard::new(
            Some("http://127.0.0.1:9/apis/site/v2/sports/basketball/nba"),
            Duration::from_secs(1),
        )
        .unwrap();
        let gw = SportsDataGateway::new(
            Arc::new(espn),
            Arc::new(StubStats {
                teams: vec![sample_team()],
                fail: false,
            }),
            RetryPolicy {
                max_attempts: 1,
                base_backoff_ms: 1,
                max_backoff_ms: 1,
            },
        );
        let (games, origin) = gw.fetch_schedule(today_range()).await;
        assert_eq!(origin, DataOrigin::Demo);
        assert!(!games.is_empty());
    }

    #[test]
    fn season_string_rolls_over_in_october() {
        let oct = NaiveDate::from_ymd_opt(2025, 10, 21).unwrap();
        assert_eq!(current_season(oct), "2025-26");
        let feb = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        assert_eq!(current_season(feb), "2025-26");
        let jun = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(current_season(jun), "2023-24");
    }

    #[test]
    fn off_season_is_july_through_september() {
        assert!(!season_is_active(NaiveDate::from_ymd_opt(2024, 8, 6).unwrap()));
        assert!(season_is_active(NaiveDate::from_ymd_opt(2024, 10, 25).unwrap()));
        assert!(season_is_active(NaiveDate::from_ymd_opt(2024, 4, 10).unwrap()));
    }
}
