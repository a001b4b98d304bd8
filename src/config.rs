use clap::Parser;

/// NBA prediction pipeline configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "courtside", version, about)]
pub struct Config {
    /// Directory holding the model and scaler artifacts
    #[arg(long, env = "MODELS_DIR", default_value = "models")]
    pub models_dir: String,

    /// SQLite database path for the prediction history
    #[arg(long, env = "DATABASE_PATH", default_value = "courtside.db")]
    pub database_path: String,

    /// ESPN NBA API base URL
    #[arg(
        long,
        env = "ESPN_API_URL",
        default_value = "http://site.api.espn.com/apis/site/v2/sports/basketball/nba"
    )]
    pub espn_api_url: String,

    /// NBA Stats API base URL
    #[arg(
        long,
        env = "NBA_STATS_API_URL",
        default_value = "https://stats.nba.com/stats"
    )]
    pub nba_stats_api_url: String,

    /// Season to request team statistics for (e.g. "2023-24");
    /// derived from the current date when unset
    #[arg(long, env = "SEASON")]
    pub season: Option<String>,

    /// Per-request timeout for live API calls, in seconds
    #[arg(long, env = "API_TIMEOUT_SECS", default_value = "10")]
    pub api_timeout_secs: u64,

    /// Maximum fetch attempts per API call (1 = no retries)
    #[arg(long, env = "RETRY_MAX_ATTEMPTS", default_value = "3")]
    pub retry_max_attempts: u32,

    /// Base backoff between retries in milliseconds (doubles per attempt)
    #[arg(long, env = "RETRY_BASE_BACKOFF_MS", default_value = "250")]
    pub retry_base_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[arg(long, env = "RETRY_MAX_BACKOFF_MS", default_value = "4000")]
    pub retry_max_backoff_ms: u64,

    /// Probability at or above which a prediction is High confidence
    #[arg(long, env = "HIGH_CONFIDENCE_THRESHOLD", default_value = "0.80")]
    pub high_confidence_threshold: f64,

    /// Probability at or above which a prediction is Medium confidence
    #[arg(long, env = "MEDIUM_CONFIDENCE_THRESHOLD", default_value = "0.65")]
    pub medium_confidence_threshold: f64,

    /// Total-points line used when the schedule source posts no odds
    #[arg(long, env = "DEFAULT_TOTAL_LINE", default_value = "235.0")]
    pub default_total_line: f64,

    /// Hours after tip-off before an unmatched prediction counts as unresolved
    #[arg(long, env = "VALIDATION_GRACE_HOURS", default_value = "6")]
    pub validation_grace_hours: i64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.5..=1.0).contains(&self.high_confidence_threshold) {
            anyhow::bail!("high_confidence_threshold must be between 0.5 and 1.0");
        }
        if !(0.5..=1.0).contains(&self.medium_confidence_threshold) {
            anyhow::bail!("medium_confidence_threshold must be between 0.5 and 1.0");
        }
        if self.medium_confidence_threshold >= self.high_confidence_threshold {
            anyhow::bail!("medium_confidence_threshold must be below high_confidence_threshold");
        }
        if self.default_total_line <= 0.0 {
            anyhow::bail!("default_total_line must be positive");
        }
        if self.retry_max_attempts == 0 {
            anyhow::bail!("retry_max_attempts must be at least 1");
        }
        if self.api_timeout_secs == 0 {
            anyhow::bail!("api_timeout_secs must be positive");
        }
        if self.validation_grace_hours < 0 {
            anyhow::bail!("validation_grace_hours must not be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> Config {
        Config::parse_from(["courtside"])
    }

    #[test]
    fn defaults_are_valid() {
        let config = default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_max_attempts, 3);
        assert!((config.default_total_line - 235.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut config = default_config();
        config.medium_confidence_threshold = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_attempts() {
        let mut config = default_config();
        config.retry_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = default_config();
        config.high_confidence_threshold = 1.2;
        assert!(config.validate().is_err());
    }
}
