//! Feature construction for the prediction models.
//!
//! A matchup is encoded as a fixed-width vector derived from the two team
//! snapshots. The encoding is a pure function: identical snapshots always
//! produce a bit-identical vector, which keeps predictions reproducible and
//! the models testable. Differential features follow the `home − away`
//! convention throughout.

use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::types::Team;

/// Width of every feature vector fed to the models.
pub const FEATURE_WIDTH: usize = 18;

/// Feature positions within the vector. Artifact training and inference
/// must agree on this layout.
pub mod idx {
    pub const HOME_OFF_RATING: usize = 0;
    pub const AWAY_OFF_RATING: usize = 1;
    pub const OFF_RATING_DIFF: usize = 2;
    pub const HOME_DEF_RATING: usize = 3;
    pub const AWAY_DEF_RATING: usize = 4;
    pub const DEF_RATING_DIFF: usize = 5;
    pub const HOME_NET_RATING: usize = 6;
    pub const AWAY_NET_RATING: usize = 7;
    pub const NET_RATING_DIFF: usize = 8;
    pub const HOME_PACE: usize = 9;
    pub const AWAY_PACE: usize = 10;
    pub const PACE_DIFF: usize = 11;
    pub const HOME_WIN_PCT: usize = 12;
    pub const AWAY_WIN_PCT: usize = 13;
    pub const WIN_PCT_DIFF: usize = 14;
    pub const PACE_RATIO: usize = 15;
    pub const HOME_OFF_VS_AWAY_DEF: usize = 16;
    pub const AWAY_OFF_VS_HOME_DEF: usize = 17;
}

/// Ordered numeric encoding of a (home, away) matchup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }
}

/// Build the feature vector for a matchup.
///
/// Fails with `FeatureError::MissingStatistic` when either snapshot lacks a
/// required statistic. Ratios with a zero denominator yield 0.0 so the
/// vector stays well-formed for the models.
pub fn build_features(home: &Team, away: &Team) -> Result<FeatureVector, FeatureError> {
    let home_off = require(home, "offensive_rating", home.stats.offensive_rating)?;
    let away_off = require(away, "offensive_rating", away.stats.offensive_rating)?;
    let home_def = require(home, "defensive_rating", home.stats.defensive_rating)?;
    let away_def = require(away, "defensive_rating", away.stats.defensive_rating)?;
    let home_pace = require(home, "pace", home.stats.pace)?;
    let away_pace = require(away, "pace", away.stats.pace)?;
    let home_win_pct = require(home, "recent_win_pct", home.stats.recent_win_pct)?;
    let away_win_pct = require(away, "recent_win_pct", away.stats.recent_win_pct)?;

    let home_net = home_off - home_def;
    let away_net = away_off - away_def;

    let mut v = vec![0.0; FEATURE_WIDTH];
    v[idx::HOME_OFF_RATING] = home_off;
    v[idx::AWAY_OFF_RATING] = away_off;
    v[idx::OFF_RATING_DIFF] = home_off - away_off;
    v[idx::HOME_DEF_RATING] = home_def;
    v[idx::AWAY_DEF_RATING] = away_def;
    v[idx::DEF_RATING_DIFF] = home_def - away_def;
    v[idx::HOME_NET_RATING] = home_net;
    v[idx::AWAY_NET_RATING] = away_net;
    v[idx::NET_RATING_DIFF] = home_net - away_net;
    v[idx::HOME_PACE] = home_pace;
    v[idx::AWAY_PACE] = away_pace;
    v[idx::PACE_DIFF] = home_pace - away_pace;
    v[idx::HOME_WIN_PCT] = home_win_pct;
    v[idx::AWAY_WIN_PCT] = away_win_pct;
    v[idx::WIN_PCT_DIFF] = home_win_pct - away_win_pct;
    v[idx::PACE_RATIO] = ratio(home_pace, away_pace);
    v[idx::HOME_OFF_VS_AWAY_DEF] = ratio(home_off, away_def);
    v[idx::AWAY_OFF_VS_HOME_DEF] = ratio(away_off, home_def);

    Ok(FeatureVector(v))
}

fn require(team: &Team, stat: &'static str, value: Option<f64>) -> Result<f64, FeatureError> {
    value.ok_or_else(|| FeatureError::MissingStatistic {
        team: team.name.clone(),
        stat,
    })
}

/// Division with a 0.0 sentinel for undefined denominators.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
