use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An NBA team with its current statistics snapshot.
///
/// Snapshots are immutable; a data refresh produces new `Team` values rather
/// than mutating existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Stable identifier from the stats provider (e.g. NBA team id)
    pub team_id: String,
    /// Full display name, e.g. "Boston Celtics"
    pub name: String,
    /// Season the snapshot belongs to, e.g. "2023-24"
    pub season: String,
    pub stats: TeamStats,
}

/// Aggregate statistics used for feature construction.
///
/// Every field is optional because upstream stat feeds can omit columns;
/// the feature builder reports exactly which statistic is missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamStats {
    /// Points scored per 100 possessions
    pub offensive_rating: Option<f64>,
    /// Points allowed per 100 possessions
    pub defensive_rating: Option<f64>,
    /// Possessions per 48 minutes
    pub pace: Option<f64>,
    /// Win rate over the recent window (0.0–1.0)
    pub recent_win_pct: Option<f64>,
}

/// A scheduled or in-progress game as reported by the schedule source.
/// Created per prediction request; never persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameContext {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub venue: Option<String>,
    /// Posted total-points line, when the schedule source carries odds
    #[serde(default)]
    pub over_under_line: Option<f64>,
}

/// A concluded game with its final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedGame {
    pub game: GameContext,
    pub home_score: u32,
    pub away_score: u32,
}

impl CompletedGame {
    pub fn total_points(&self) -> u32 {
        self.home_score + self.away_score
    }

    pub fn home_win(&self) -> bool {
        self.home_score > self.away_score
    }

    pub fn winner(&self) -> Winner {
        if self.home_win() {
            Winner::Home
        } else {
            Winner::Away
        }
    }
}

/// Which side is predicted (or observed) to win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Home,
    Away,
}

impl Winner {
    pub fn as_label(&self) -> &'static str {
        match self {
            Winner::Home => "HOME",
            Winner::Away => "AWAY",
        }
    }

    pub fn from_label(label: &str) -> Option<Winner> {
        match label {
            "HOME" => Some(Winner::Home),
            "AWAY" => Some(Winner::Away),
            _ => None,
        }
    }
}

/// Over/under call relative to a total-points line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalsCall {
    Over,
    Under,
}

impl TotalsCall {
    pub fn as_label(&self) -> &'static str {
        match self {
            TotalsCall::Over => "OVER",
            TotalsCall::Under => "UNDER",
        }
    }

    pub fn from_label(label: &str) -> Option<TotalsCall> {
        match label {
            "OVER" => Some(TotalsCall::Over),
            "UNDER" => Some(TotalsCall::Under),
            _ => None,
        }
    }
}

/// Confidence tier derived from model probabilities.
/// Ordered so that a higher probability can never map to a lower tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "High",
            ConfidenceTier::Medium => "Medium",
            ConfidenceTier::Low => "Low",
        }
    }

    pub fn from_label(label: &str) -> Option<ConfidenceTier> {
        match label {
            "High" => Some(ConfidenceTier::High),
            "Medium" => Some(ConfidenceTier::Medium),
            "Low" => Some(ConfidenceTier::Low),
            _ => None,
        }
    }
}

/// Where the underlying team statistics came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOrigin {
    /// Fresh data from the live APIs
    Live,
    /// Bundled historical snapshot (off-season / outage fallback)
    Demo,
}

impl DataOrigin {
    pub fn as_label(&self) -> &'static str {
        match self {
            DataOrigin::Live => "live",
            DataOrigin::Demo => "demo",
        }
    }

    pub fn from_label(label: &str) -> Option<DataOrigin> {
        match label {
            "live" => Some(DataOrigin::Live),
            "demo" => Some(DataOrigin::Demo),
            _ => None,
        }
    }
}

/// Win/loss side of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinLossPrediction {
    pub predicted: Winner,
    pub home_win_probability: f64,
    pub away_win_probability: f64,
}

/// Over/under side of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverUnderPrediction {
    pub predicted: TotalsCall,
    pub over_probability: f64,
    pub under_probability: f64,
    /// Total-points line the call is made against
    pub line: f64,
}

/// A structured game prediction. Immutable once created; only the
/// prediction service constructs these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub game: GameContext,
    /// `None` when the prediction is unavailable (see `unavailable_reason`)
    pub win_loss: Option<WinLossPrediction>,
    pub over_under: Option<OverUnderPrediction>,
    pub confidence: ConfidenceTier,
    /// Training-run tag of the models that produced the calls
    pub model_version: Option<String>,
    pub stats_origin: DataOrigin,
    /// Human-readable reason when no calls could be made
    pub unavailable_reason: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl Prediction {
    /// True when the prediction was produced without live data or without
    /// working models. Degraded predictions are still well-formed.
    pub fn is_degraded(&self) -> bool {
        self.unavailable_reason.is_some() || self.stats_origin == DataOrigin::Demo
    }

    /// True when no model calls could be made at all.
    pub fn is_unavailable(&self) -> bool {
        self.win_loss.is_none() && self.over_under.is_none()
    }

    /// Compare the predictive content of two predictions, ignoring the
    /// generation timestamp.
    pub fn outputs_match(&self, other: &Prediction) -> bool {
        self.game == other.game
            && self.win_loss == other.win_loss
            && self.over_under == other.over_under
            && self.confidence == other.confidence
            && self.model_version == other.model_version
            && self.stats_origin == other.stats_origin
    }
}

/// Inclusive calendar-date range for schedule and results queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DateRange {
        if end < start {
            DateRange {
                start: end,
                end: start,
            }
        } else {
            DateRange { start, end }
        }
    }

    pub fn single(day: NaiveDate) -> DateRange {
        DateRange {
            start: day,
            end: day,
        }
    }

    /// The `days` days ending yesterday (relative to `today`).
    pub fn last_days(today: NaiveDate, days: u32) -> DateRange {
        DateRange::new(today - Duration::days(days as i64), today - Duration::days(1))
    }

    /// The `days` days starting tomorrow (relative to `today`).
    pub fn next_days(today: NaiveDate, days: u32) -> DateRange {
        DateRange::new(today + Duration::days(1), today + Duration::days(days as i64))
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_game_derivations() {
        let game = CompletedGame {
            game: GameContext {
                game_id: "401585601".into(),
                home_team: "Boston Celtics".into(),
                away_team: "Miami Heat".into(),
                scheduled_at: Utc::now(),
                venue: Some("TD Garden".into()),
                over_under_line: None,
            },
            home_score: 119,
            away_score: 111,
        };
        assert_eq!(game.total_points(), 230);
        assert!(game.home_win());
        assert_eq!(game.winner(), Winner::Home);
    }

    #[test]
    fn confidence_tier_ordering() {
        assert!(ConfidenceTier::High > ConfidenceTier::Medium);
        assert!(ConfidenceTier::Medium > ConfidenceTier::Low);
    }

    #[test]
    fn labels_round_trip() {
        for w in [Winner::Home, Winner::Away] {
            assert_eq!(Winner::from_label(w.as_label()), Some(w));
        }
        for t in [TotalsCall::Over, TotalsCall::Under] {
            assert_eq!(TotalsCall::from_label(t.as_label()), Some(t));
        }
        for c in [
            ConfidenceTier::High,
            ConfidenceTier::Medium,
            ConfidenceTier::Low,
        ] {
            assert_eq!(ConfidenceTier::from_label(c.as_label()), Some(c));
        }
        assert_eq!(Winner::from_label("DRAW"), None);
    }

    #[test]
    fn date_range_days() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        );
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], range.start);
        assert_eq!(days[3], range.end);
    }

    #[test]
    fn date_range_swaps_inverted_bounds() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let range = DateRange::new(a, b);
        assert_eq!(range.start, b);
        assert_eq!(range.end, a);
    }

    #[test]
    fn last_and_next_days_exclude_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let back = DateRange::last_days(today, 7);
        assert_eq!(back.end, today - Duration::days(1));
        assert_eq!(back.days().count(), 7);
        let ahead = DateRange::next_days(today, 7);
        assert_eq!(ahead.start, today + Duration::days(1));
        assert_eq!(ahead.days().count(), 7);
    }
}
