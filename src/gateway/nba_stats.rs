use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use reqwest::Client;
use tracing::debug;

use super::provider::TeamStatsSource;
use super::current_season;
use crate::types::{Team, TeamStats};

/// Team statistics provider backed by the NBA Stats API.
///
/// The endpoint returns tabular JSON: a `headers` array naming the columns
/// and a `rowSet` of value arrays. stats.nba.com rejects requests without
/// browser-ish headers, hence the default header set.
pub struct NbaStatsClient {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
    /// Fixed season override; derived from the clock when unset
    season: Option<String>,
}

impl NbaStatsClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://stats.nba.com/stats";

    pub fn new(
        base_url: Option<&str>,
        season: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            ),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NbaStatsClient {
            http,
            base_url: base_url.unwrap_or(Self::DEFAULT_BASE_URL).to_string(),
            season,
        })
    }

    fn season_param(&self) -> String {
        self.season
            .clone()
            .unwrap_or_else(|| current_season(Utc::now().date_naive()))
    }
}

#[async_trait]
impl TeamStatsSource for NbaStatsClient {
    fn name(&self) -> &str {
        "NBA Stats"
    }

    async fn fetch_team_stats(&self) -> Result<Vec<Team>> {
        let season = self.season_param();
        let url = format!("{}/leaguedashteamstats", self.base_url);
        debug!("Fetching league team stats for {}", season);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("Season", season.as_str()),
                ("SeasonType", "Regular Season"),
                ("MeasureType", "Advanced"),
            ])
            .send()
            .await
            .context("NBA Stats request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("NBA Stats error: {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse NBA Stats response")?;

        parse_league_dash(&raw, &season)
    }
}

/// Decode the `leaguedashteamstats` tabular payload into team snapshots.
///
/// Identity columns are required; a missing stat column leaves the field
/// unset so the feature builder can report it precisely.
pub fn parse_league_dash(raw: &serde_json::Value, season: &str) -> Result<Vec<Team>> {
    let result_set = &raw["resultSets"][0];
    let headers: Vec<&str> = result_set["headers"]
        .as_array()
        .context("leaguedashteamstats payload has no headers")?
        .iter()
        .filter_map(|h| h.as_str())
        .collect();
    let rows = result_set["rowSet"]
        .as_array()
        .context("leaguedashteamstats payload has no rowSet")?;

    let col = |name: &str| headers.iter().position(|h| *h == name);
    let team_id_col = col("TEAM_ID").context("TEAM_ID column missing")?;
    let team_name_col = col("TEAM_NAME").context("TEAM_NAME column missing")?;
    let win_pct_col = col("W_PCT");
    let off_rating_col = col("OFF_RATING");
    let def_rating_col = col("DEF_RATING");
    let pace_col = col("PACE");

    let teams = rows
        .iter()
        .filter_map(|row| {
            let cells = row.as_array()?;
            let team_id = cell_string(cells, Some(team_id_col))?;
            let name = cell_string(cells, Some(team_name_col))?;
            Some(Team {
                team_id,
                name,
                season: season.to_string(),
                stats: TeamStats {
                    offensive_rating: cell_f64(cells, off_rating_col),
                    defensive_rating: cell_f64(cells, def_rating_col),
                    pace: cell_f64(cells, pace_col),
                    recent_win_pct: cell_f64(cells, win_pct_col),
                },
            })
        })
        .collect();

    Ok(teams)
}

fn cell_f64(cells: &[serde_json::Value], column: Option<usize>) -> Option<f64> {
    cells.get(column?)?.as_f64()
}

fn cell_string(cells: &[serde_json::Value], column: Option<usize>) -> Option<String> {
    let cell = cells.get(column?)?;
    if let Some(s) = cell.as_str() {
        return Some(s.to_string());
    }
    cell.as_i64().map(|n| n.to_string())
}
