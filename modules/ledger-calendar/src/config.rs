use std::path::Path;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult};

/// Korea Standard Time, UTC+9. No DST.
pub const KST_OFFSET_MINUTES: i32 = 9 * 60;

pub const DEFAULT_DAILY_RESET_HOUR: u32 = 5;
/// Wednesday, counting Sunday as 0.
pub const DEFAULT_WEEKLY_RESET_WEEKDAY: u32 = 3;
pub const DEFAULT_WEEKLY_RESET_HOUR: u32 = 5;

/// Reset constants and the reference offset the game clock runs on.
///
/// Loaded from the `[calendar]` table of the TOML config, then overridden by
/// `LEDGER_*` environment variables. Values are checked by [`validate`]
/// (and again by `GameCalendar::new`), never clamped.
///
/// [`validate`]: CalendarConfig::validate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalendarConfig {
    pub utc_offset_minutes: i32,
    pub daily_reset_hour: u32,
    pub weekly_reset_weekday: u32,
    pub weekly_reset_hour: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: KST_OFFSET_MINUTES,
            daily_reset_hour: DEFAULT_DAILY_RESET_HOUR,
            weekly_reset_weekday: DEFAULT_WEEKLY_RESET_WEEKDAY,
            weekly_reset_hour: DEFAULT_WEEKLY_RESET_HOUR,
        }
    }
}

/// On-disk layout of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub calendar: CalendarConfig,
}

impl CalendarConfig {
    /// Defaults overridden by `LEDGER_*` environment variables (and `.env`).
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `LEDGER_*` environment overrides on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self> {
        dotenvy::dotenv().ok();
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. A present but unparseable
    /// value is an error rather than a silent fallback.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup("LEDGER_UTC_OFFSET_MINUTES") {
            self.utc_offset_minutes = parse_var("LEDGER_UTC_OFFSET_MINUTES", &v)?;
        }
        if let Some(v) = lookup("LEDGER_DAILY_RESET_HOUR") {
            self.daily_reset_hour = parse_var("LEDGER_DAILY_RESET_HOUR", &v)?;
        }
        if let Some(v) = lookup("LEDGER_WEEKLY_RESET_WEEKDAY") {
            self.weekly_reset_weekday = parse_var("LEDGER_WEEKLY_RESET_WEEKDAY", &v)?;
        }
        if let Some(v) = lookup("LEDGER_WEEKLY_RESET_HOUR") {
            self.weekly_reset_hour = parse_var("LEDGER_WEEKLY_RESET_HOUR", &v)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> CalendarResult<()> {
        self.offset()?;
        if self.daily_reset_hour > 23 {
            return Err(CalendarError::invalid(format!(
                "daily_reset_hour must be 0-23, got {}",
                self.daily_reset_hour
            )));
        }
        if self.weekly_reset_weekday > 6 {
            return Err(CalendarError::invalid(format!(
                "weekly_reset_weekday must be 0-6 (0 = Sunday), got {}",
                self.weekly_reset_weekday
            )));
        }
        if self.weekly_reset_hour > 23 {
            return Err(CalendarError::invalid(format!(
                "weekly_reset_hour must be 0-23, got {}",
                self.weekly_reset_hour
            )));
        }
        Ok(())
    }

    /// The reference offset as a chrono timezone.
    pub fn offset(&self) -> CalendarResult<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                CalendarError::invalid(format!(
                    "utc_offset_minutes must be within +/-24h, got {}",
                    self.utc_offset_minutes
                ))
            })
    }

    pub fn log_summary(&self) {
        tracing::info!(
            utc_offset_minutes = self.utc_offset_minutes,
            daily_reset_hour = self.daily_reset_hour,
            weekly_reset_weekday = self.weekly_reset_weekday,
            weekly_reset_hour = self.weekly_reset_hour,
            "Calendar config loaded"
        );
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {value:?}"))
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<CalendarConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let file: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Parsed calendar config file");
    Ok(file.calendar)
}
