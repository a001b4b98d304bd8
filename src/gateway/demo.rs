use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::{CompletedGame, GameContext, Team, TeamStats};

/// Historical snapshot bundled into the binary. Served whenever the live
/// APIs are unreachable or return nothing (off-season), so predictions stay
/// available in degraded mode.
static SNAPSHOT_JSON: &str = include_str!("../../data/demo_snapshot.json");

#[derive(Debug, Clone, Deserialize)]
struct SnapshotTeam {
    team_id: String,
    name: String,
    offensive_rating: f64,
    defensive_rating: f64,
    pace: f64,
    recent_win_pct: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct SnapshotFile {
    season: String,
    teams: Vec<SnapshotTeam>,
    scheduled: Vec<GameContext>,
    completed: Vec<CompletedGame>,
}

/// In-memory demo dataset parsed from the bundled snapshot.
#[derive(Debug, Clone)]
pub struct DemoDataset {
    season: String,
    teams: Vec<Team>,
    scheduled: Vec<GameContext>,
    completed: Vec<CompletedGame>,
}

impl DemoDataset {
    /// The snapshot shipped with the crate. Parsing it is infallible by
    /// construction; the bundled file is covered by tests.
    pub fn bundled() -> DemoDataset {
        DemoDataset::parse(SNAPSHOT_JSON).expect("bundled demo snapshot is valid")
    }

    pub fn parse(text: &str) -> Result<DemoDataset> {
        let file: SnapshotFile =
            serde_json::from_str(text).context("Failed to parse demo snapshot")?;
        let season = file.season;
        let teams = file
            .teams
            .into_iter()
            .map(|t| Team {
                team_id: t.team_id,
                name: t.name,
                season: season.clone(),
                stats: TeamStats {
                    offensive_rating: Some(t.offensive_rating),
                    defensive_rating: Some(t.defensive_rating),
                    pace: Some(t.pace),
                    recent_win_pct: Some(t.recent_win_pct),
                },
            })
            .collect();
        Ok(DemoDataset {
            season,
            teams,
            scheduled: file.scheduled,
            completed: file.completed,
        })
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    pub fn teams(&self) -> Vec<Team> {
        self.teams.clone()
    }

    pub fn schedule(&self) -> Vec<GameContext> {
        self.scheduled.clone()
    }

    pub fn completed_results(&self) -> Vec<CompletedGame> {
        self.completed.clone()
    }
}
