use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use tracing::{debug, warn};

use super::provider::ScheduleSource;
use crate::types::{CompletedGame, DateRange, GameContext};

/// Schedule and results provider backed by the public ESPN NBA API.
/// Docs are unofficial; the scoreboard endpoint takes `?dates=YYYYMMDD`.
pub struct EspnScoreboard {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
}

impl EspnScoreboard {
    pub const DEFAULT_BASE_URL: &'static str =
        "http://site.api.espn.com/apis/site/v2/sports/basketball/nba";

    pub fn new(base_url: Option<&str>, timeout: std::time::Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(EspnScoreboard {
            http,
            base_url: base_url.unwrap_or(Self::DEFAULT_BASE_URL).to_string(),
        })
    }

    async fn fetch_scoreboard(&self, date: NaiveDate) -> Result<serde_json::Value> {
        let url = format!("{}/scoreboard", self.base_url);
        let date_param = date.format("%Y%m%d").to_string();
        debug!("Fetching ESPN scoreboard for {}", date_param);

        let resp = self
            .http
            .get(&url)
            .query(&[("dates", date_param.as_str())])
            .send()
            .await
            .context("ESPN scoreboard request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("ESPN scoreboard error: {}", resp.status());
        }

        resp.json()
            .await
            .context("Failed to parse ESPN scoreboard response")
    }

    /// Fan a multi-day range out as concurrent per-date requests. A day
    /// that fails is logged and skipped; the call errors only when every
    /// day failed.
    async fn fetch_days(&self, range: DateRange) -> Result<Vec<serde_json::Value>> {
        let fetches: Vec<_> = range.days().map(|d| self.fetch_scoreboard(d)).collect();
        let results = futures_util::future::join_all(fetches).await;

        let total = results.len();
        let mut pages = Vec::with_capacity(total);
        let mut last_err = None;
        for result in results {
            match result {
                Ok(page) => pages.push(page),
                Err(e) => {
                    warn!("ESPN day fetch failed: {}", e);
                    last_err = Some(e);
                }
            }
        }
        if pages.is_empty() {
            if let Some(e) = last_err {
                return Err(e.context(format!("all {total} ESPN day fetches failed")));
            }
        }
        Ok(pages)
    }
}

#[async_trait]
impl ScheduleSource for EspnScoreboard {
    fn name(&self) -> &str {
        "ESPN"
    }

    async fn fetch_schedule(&self, range: DateRange) -> Result<Vec<GameContext>> {
        let pages = self.fetch_days(range).await?;
        Ok(pages.iter().flat_map(parse_schedule).collect())
    }

    async fn fetch_completed(&self, range: DateRange) -> Result<Vec<CompletedGame>> {
        let pages = self.fetch_days(range).await?;
        Ok(pages.iter().flat_map(parse_completed).collect())
    }
}

/// Extract every event on a scoreboard page as a `GameContext`.
pub fn parse_schedule(raw: &serde_json::Value) -> Vec<GameContext> {
    let events = match raw["events"].as_array() {
        Some(a) => a,
        None => return vec![],
    };
    events.iter().filter_map(parse_event).collect()
}

/// Extract only finished games, with their final scores.
pub fn parse_completed(raw: &serde_json::Value) -> Vec<CompletedGame> {
    let events = match raw["events"].as_array() {
        Some(a) => a,
        None => return vec![],
    };
    events
        .iter()
        .filter(|ev| is_final(ev))
        .filter_map(|ev| {
            let game = parse_event(ev)?;
            let competition = &ev["competitions"][0];
            let home_score = competitor_score(competition, "home")?;
            let away_score = competitor_score(competition, "away")?;
            Some(CompletedGame {
                game,
                home_score,
                away_score,
            })
        })
        .collect()
}

fn parse_event(ev: &serde_json::Value) -> Option<GameContext> {
    let game_id = ev["id"].as_str()?.to_string();
    let competition = &ev["competitions"][0];
    let home_team = competitor_name(competition, "home")?;
    let away_team = competitor_name(competition, "away")?;
    let scheduled_at = parse_event_date(ev["date"].as_str()?)?;
    let venue = competition["venue"]["fullName"]
        .as_str()
        .map(str::to_string);
    // Posted totals line, when the page carries odds
    let over_under_line = competition["odds"][0]["overUnder"].as_f64();

    Some(GameContext {
        game_id,
        home_team,
        away_team,
        scheduled_at,
        venue,
        over_under_line,
    })
}

fn is_final(ev: &serde_json::Value) -> bool {
    ev["status"]["type"]["description"].as_str() == Some("Final")
}

/// Competitor lookup by the `homeAway` marker, falling back to ESPN's
/// index layout (away first, home second) when the marker is absent.
fn competitor(competition: &serde_json::Value, side: &str) -> Option<serde_json::Value> {
    let competitors = competition["competitors"].as_array()?;
    if let Some(found) = competitors
        .iter()
        .find(|c| c["homeAway"].as_str() == Some(side))
    {
        return Some(found.clone());
    }
    let index = if side == "home" { 1 } else { 0 };
    competitors.get(index).cloned()
}

fn competitor_name(competition: &serde_json::Value, side: &str) -> Option<String> {
    let comp = competitor(competition, side)?;
    comp["team"]["displayName"].as_str().map(str::to_string)
}

fn competitor_score(competition: &serde_json::Value, side: &str) -> Option<u32> {
    let comp = competitor(competition, side)?;
    comp["score"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| comp["score"].as_u64().map(|v| v as u32))
}

/// ESPN timestamps come as RFC 3339 or the shortened `2024-03-14T23:30Z`.
fn parse_event_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}
