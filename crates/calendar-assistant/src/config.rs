//! Runtime settings read from the environment.
//!
//! A `.env` file in the working directory is loaded first (via `dotenvy`), then
//! each variable falls back to the default below when unset.
//!
//! | Variable | Default |
//! |---|---|
//! | `TIME_ZONE` | `Asia/Kolkata` |
//! | `GOOGLE_CALENDAR_ID` | `primary` |
//! | `GOOGLE_ACCESS_TOKEN` | unset |
//! | `GROK_API_KEY` | unset |
//! | `LLM_BASE_URL` | `https://api.groq.com/openai/v1` |
//! | `LLM_MODEL` | `llama3-70b-8192` |
//! | `BUFFER_MINUTES` | `15` (0-60) |
//! | `DEFAULT_REMINDER_MINUTES` | `15` |
//! | `DEFAULT_DURATION_MINUTES` | `60` (15-240) |
//! | `WORK_START` / `WORK_END` | `09:00` / `18:00` |
//! | `CACHE_TTL_SECONDS` | `300` |

use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{AssistantError, Result};

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama3-70b-8192";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub time_zone: Tz,
    pub calendar_id: String,
    pub google_access_token: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub buffer_minutes: i64,
    pub reminder_minutes: i64,
    pub default_duration_minutes: i64,
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub cache_ttl: StdDuration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_zone: chrono_tz::Asia::Kolkata,
            calendar_id: "primary".to_string(),
            google_access_token: None,
            llm_api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            buffer_minutes: 15,
            reminder_minutes: 15,
            default_duration_minutes: 60,
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            work_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            cache_ttl: StdDuration::from_secs(300),
        }
    }
}

impl Settings {
    /// Load settings from the process environment, honouring a `.env` file.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(AssistantError::Config(format!("failed to read .env: {}", e))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let time_zone = match get("TIME_ZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| AssistantError::Config(format!("TIME_ZONE: unknown zone '{}'", name)))?,
            None => defaults.time_zone,
        };

        let settings = Self {
            time_zone,
            calendar_id: get("GOOGLE_CALENDAR_ID").unwrap_or(defaults.calendar_id),
            google_access_token: get("GOOGLE_ACCESS_TOKEN"),
            llm_api_key: get("GROK_API_KEY"),
            llm_base_url: get("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: get("LLM_MODEL").unwrap_or(defaults.llm_model),
            buffer_minutes: parse_in_range(get("BUFFER_MINUTES"), "BUFFER_MINUTES", 0..=60, defaults.buffer_minutes)?,
            reminder_minutes: parse_in_range(
                get("DEFAULT_REMINDER_MINUTES"),
                "DEFAULT_REMINDER_MINUTES",
                0..=40_320,
                defaults.reminder_minutes,
            )?,
            default_duration_minutes: parse_in_range(
                get("DEFAULT_DURATION_MINUTES"),
                "DEFAULT_DURATION_MINUTES",
                15..=240,
                defaults.default_duration_minutes,
            )?,
            work_start: parse_time(get("WORK_START"), "WORK_START", defaults.work_start)?,
            work_end: parse_time(get("WORK_END"), "WORK_END", defaults.work_end)?,
            cache_ttl: StdDuration::from_secs(
                parse_in_range(get("CACHE_TTL_SECONDS"), "CACHE_TTL_SECONDS", 0..=86_400, 300)? as u64,
            ),
        };

        if settings.work_start >= settings.work_end {
            return Err(AssistantError::Config(format!(
                "WORK_START {} must be before WORK_END {}",
                settings.work_start, settings.work_end
            )));
        }

        Ok(settings)
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_minutes)
    }

    pub fn default_duration(&self) -> Duration {
        Duration::minutes(self.default_duration_minutes)
    }

    /// The Google access token, or a configuration error naming the variable.
    pub fn require_google_token(&self) -> Result<&str> {
        self.google_access_token
            .as_deref()
            .ok_or_else(|| AssistantError::Config("GOOGLE_ACCESS_TOKEN is not set".to_string()))
    }

    /// The language-model API key, or a configuration error naming the variable.
    pub fn require_llm_key(&self) -> Result<&str> {
        self.llm_api_key
            .as_deref()
            .ok_or_else(|| AssistantError::Config("GROK_API_KEY environment variable is required".to_string()))
    }
}

fn parse_in_range(
    raw: Option<String>,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    default: i64,
) -> Result<i64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = i64::from_str(raw.trim())
        .map_err(|_| AssistantError::Config(format!("{}: '{}' is not a whole number", key, raw)))?;
    if !range.contains(&value) {
        return Err(AssistantError::Config(format!(
            "{}: {} is outside {}..={}",
            key,
            value,
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}

fn parse_time(raw: Option<String>, key: &str, default: NaiveTime) -> Result<NaiveTime> {
    match raw {
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map_err(|_| AssistantError::Config(format!("{}: '{}' is not HH:MM", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.buffer(), Duration::minutes(15));
        assert_eq!(settings.calendar_id, "primary");
    }

    #[test]
    fn overrides_are_applied() {
        let settings = Settings::from_lookup(lookup(&[
            ("TIME_ZONE", "Europe/Berlin"),
            ("BUFFER_MINUTES", "5"),
            ("WORK_START", "08:30"),
            ("WORK_END", "17:00"),
            ("GROK_API_KEY", "k"),
        ]))
        .unwrap();
        assert_eq!(settings.time_zone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.buffer_minutes, 5);
        assert_eq!(settings.work_start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(settings.require_llm_key().unwrap(), "k");
    }

    #[test]
    fn empty_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[("GOOGLE_CALENDAR_ID", "  ")])).unwrap();
        assert_eq!(settings.calendar_id, "primary");
    }

    #[test]
    fn out_of_range_buffer_rejected() {
        let err = Settings::from_lookup(lookup(&[("BUFFER_MINUTES", "90")])).unwrap_err();
        assert!(matches!(err, AssistantError::Config(msg) if msg.contains("BUFFER_MINUTES")));
    }

    #[test]
    fn unknown_zone_rejected() {
        let err = Settings::from_lookup(lookup(&[("TIME_ZONE", "Mars/Olympus")])).unwrap_err();
        assert!(matches!(err, AssistantError::Config(_)));
    }

    #[test]
    fn inverted_work_hours_rejected() {
        let err = Settings::from_lookup(lookup(&[("WORK_START", "18:00"), ("WORK_END", "09:00")]))
            .unwrap_err();
        assert!(matches!(err, AssistantError::Config(_)));
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let settings = Settings::default();
        assert!(matches!(
            settings.require_google_token(),
            Err(AssistantError::Config(_))
        ));
    }
}
