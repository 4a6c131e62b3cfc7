// Settings loading and validation (streakboard.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse settings file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to write default settings file: {message}")]
    WriteDefaultsError { message: String },
}

// ---------------------------------------------------------------------------
// File sections (raw deserialization targets)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    scoring: ScoringSection,
    #[serde(default)]
    sync: SyncSection,
    #[serde(default)]
    report: ReportSection,
    #[serde(default)]
    cache: CacheSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ScoringSection {
    #[serde(default = "default_fail_penalty")]
    fail_penalty: u32,
    #[serde(default = "default_streak_start_date")]
    streak_start_date: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SyncSection {
    #[serde(default = "default_debounce_ttl_secs")]
    debounce_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ReportSection {
    #[serde(default = "default_min_games")]
    min_games: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CacheSection {
    /// Snapshot file path. When omitted, the per-user data directory is used.
    path: Option<PathBuf>,
}

fn default_fail_penalty() -> u32 {
    7
}

fn default_streak_start_date() -> String {
    "2025-01-01".to_string()
}

fn default_debounce_ttl_secs() -> u64 {
    60
}

fn default_min_games() -> usize {
    5
}

impl Default for ScoringSection {
    fn default() -> Self {
        ScoringSection {
            fail_penalty: default_fail_penalty(),
            streak_start_date: default_streak_start_date(),
        }
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        SyncSection {
            debounce_ttl_secs: default_debounce_ttl_secs(),
        }
    }
}

impl Default for ReportSection {
    fn default() -> Self {
        ReportSection {
            min_games: default_min_games(),
        }
    }
}

// ---------------------------------------------------------------------------
// Assembled Settings
// ---------------------------------------------------------------------------

/// Configuration consumed by the sync/aggregation core and the report layer.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Score substituted for a participant who failed the day's puzzle.
    pub fail_penalty: u32,
    /// Messages before this instant are ignored during scans.
    pub streak_start: DateTime<Utc>,
    /// Minimum interval between two remote-fetch attempts.
    pub debounce_ttl: Duration,
    /// Minimum games played before a player appears on the leaderboard.
    pub min_games: usize,
    /// Snapshot file location.
    pub cache_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fail_penalty: default_fail_penalty(),
            streak_start: midnight_utc(
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN),
            ),
            debounce_ttl: Duration::from_secs(default_debounce_ttl_secs()),
            min_games: default_min_games(),
            cache_path: default_cache_path(),
        }
    }
}

/// Template written when no settings file exists yet.
const DEFAULT_SETTINGS_TOML: &str = r#"[scoring]
fail_penalty = 7
streak_start_date = "2025-01-01"

[sync]
debounce_ttl_secs = 60

[report]
min_games = 5

[cache]
# path = "streakboard_cache.json"
"#;

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate settings from a TOML file at `path`.
pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;

    let file: SettingsFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let streak_start = parse_start_date(&file.scoring.streak_start_date)?;

    let settings = Settings {
        fail_penalty: file.scoring.fail_penalty,
        streak_start,
        debounce_ttl: Duration::from_secs(file.sync.debounce_ttl_secs),
        min_games: file.report.min_games,
        cache_path: file.cache.path.unwrap_or_else(default_cache_path),
    };

    validate(&settings)?;

    Ok(settings)
}

/// Load settings from `path`, writing the default template there first when
/// the file doesn't exist yet.
pub fn load_or_init(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteDefaultsError {
                    message: format!("failed to create {}: {e}", parent.display()),
                })?;
            }
        }
        std::fs::write(path, DEFAULT_SETTINGS_TOML).map_err(|e| {
            ConfigError::WriteDefaultsError {
                message: format!("failed to write {}: {e}", path.display()),
            }
        })?;
    }
    load_from(path)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_start_date(raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    let date =
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| ConfigError::ValidationError {
            field: "scoring.streak_start_date".into(),
            message: format!("expected YYYY-MM-DD, got `{raw}`: {e}"),
        })?;
    Ok(midnight_utc(date))
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn default_cache_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "streakboard")
        .map(|dirs| dirs.data_dir().join("cache.json"))
        .unwrap_or_else(|| PathBuf::from("streakboard_cache.json"))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.fail_penalty == 0 {
        return Err(ConfigError::ValidationError {
            field: "scoring.fail_penalty".into(),
            message: "must be greater than 0".into(),
        });
    }
    if settings.min_games == 0 {
        return Err(ConfigError::ValidationError {
            field: "report.min_games".into(),
            message: "must be greater than 0".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
