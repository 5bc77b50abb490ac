//! Structured event extraction from free text.
//!
//! The [`EventExtractor`] port hides the language model. Model replies are
//! validated here by [`parse_extraction`] and [`parse_suggestions`], so every
//! implementation rejects the same malformed output.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slot_engine::interval::BusyInterval;
use slot_engine::parse_timestamp;

use crate::error::{AssistantError, Result};

const REQUIRED_FIELDS: [&str; 4] = ["title", "start_time", "end_time", "duration_minutes"];
const SUGGESTION_FIELDS: [&str; 4] = ["suggestion", "start_time", "end_time", "reason"];
pub const MAX_SUGGESTIONS: usize = 3;

/// Timestamp layout requested from the model and produced by the mock.
pub const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Event fields pulled out of a natural-language request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEvent {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// An alternative time proposed after a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion: String,
    pub start_time: String,
    pub end_time: String,
    pub reason: String,
}

pub trait EventExtractor {
    fn extract_event(&self, text: &str) -> Result<ExtractedEvent>;

    /// Up to [`MAX_SUGGESTIONS`] alternative times for `description` that avoid `conflicts`.
    fn suggest_alternatives(
        &self,
        description: &str,
        conflicts: &[BusyInterval],
    ) -> Result<Vec<Suggestion>>;
}

impl<T: EventExtractor + ?Sized> EventExtractor for Box<T> {
    fn extract_event(&self, text: &str) -> Result<ExtractedEvent> {
        (**self).extract_event(text)
    }

    fn suggest_alternatives(
        &self,
        description: &str,
        conflicts: &[BusyInterval],
    ) -> Result<Vec<Suggestion>> {
        (**self).suggest_alternatives(description, conflicts)
    }
}

/// Remove a surrounding markdown code fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn is_valid_timestamp(s: &str) -> bool {
    parse_timestamp(s, chrono_tz::UTC).is_ok()
}

/// Validate a model reply to an extraction prompt.
///
/// # Errors
/// `AssistantError::Extraction` when the reply is not JSON, carries an `error`
/// field, lacks a required field, or holds an unparseable timestamp.
pub fn parse_extraction(content: &str) -> Result<ExtractedEvent> {
    let value: Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| AssistantError::Extraction(format!("Invalid JSON response from AI: {}", e)))?;

    let Some(object) = value.as_object() else {
        return Err(AssistantError::Extraction(
            "Invalid JSON response from AI: expected an object".to_string(),
        ));
    };

    if let Some(error) = object.get("error") {
        let message = error.as_str().map_or_else(|| error.to_string(), str::to_string);
        return Err(AssistantError::Extraction(message));
    }

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| object.get(*field).is_none_or(Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(AssistantError::Extraction(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let event: ExtractedEvent = serde_json::from_value(value)
        .map_err(|e| AssistantError::Extraction(format!("Invalid field in AI response: {}", e)))?;

    for stamp in [&event.start_time, &event.end_time] {
        if !is_valid_timestamp(stamp) {
            return Err(AssistantError::Extraction(format!(
                "Invalid datetime format: '{}'",
                stamp
            )));
        }
    }

    Ok(event)
}

/// Validate a model reply to a suggestion prompt.
///
/// Only the first [`MAX_SUGGESTIONS`] entries are considered; entries missing a
/// field or carrying an unparseable timestamp are skipped.
///
/// # Errors
/// `AssistantError::Extraction` when the reply is not a JSON array.
pub fn parse_suggestions(content: &str) -> Result<Vec<Suggestion>> {
    let value: Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| AssistantError::Extraction(format!("Invalid JSON response from AI: {}", e)))?;

    let Value::Array(items) = value else {
        return Err(AssistantError::Extraction(
            "Expected a JSON array of suggestions".to_string(),
        ));
    };

    Ok(items
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .filter(|item| SUGGESTION_FIELDS.iter().all(|f| item.get(*f).is_some()))
        .filter_map(|item| serde_json::from_value::<Suggestion>(item).ok())
        .filter(|s| is_valid_timestamp(&s.start_time) && is_valid_timestamp(&s.end_time))
        .collect())
}

/// Keyword-driven extractor for offline use and tests.
///
/// Every request becomes a one-hour event tomorrow at 14:00 relative to the
/// reference time given at construction.
#[derive(Debug, Clone)]
pub struct MockExtractor {
    now: NaiveDateTime,
}

impl MockExtractor {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    fn tomorrow_at(&self, hour: u32) -> NaiveDateTime {
        let tomorrow = self.now + Duration::days(1);
        tomorrow
            .with_hour(hour)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(tomorrow)
    }
}

impl EventExtractor for MockExtractor {
    fn extract_event(&self, text: &str) -> Result<ExtractedEvent> {
        let lower = text.to_lowercase();
        let title = if lower.contains("lunch") {
            "Lunch"
        } else if lower.contains("call") {
            "Call"
        } else if lower.contains("meeting") {
            "Team Meeting"
        } else if lower.contains("appointment") {
            "Appointment"
        } else {
            "Meeting"
        };

        let start = self.tomorrow_at(14);
        let end = start + Duration::hours(1);

        Ok(ExtractedEvent {
            title: title.to_string(),
            start_time: start.format(NAIVE_FORMAT).to_string(),
            end_time: end.format(NAIVE_FORMAT).to_string(),
            duration_minutes: 60,
            location: Some("Conference Room A".to_string()),
            category: Some("Meeting".to_string()),
            description: Some(format!("Event extracted from: {}", lower)),
        })
    }

    fn suggest_alternatives(
        &self,
        _description: &str,
        _conflicts: &[BusyInterval],
    ) -> Result<Vec<Suggestion>> {
        let slot = |hour: u32, label: &str, reason: &str| Suggestion {
            suggestion: label.to_string(),
            start_time: self.tomorrow_at(hour).format(NAIVE_FORMAT).to_string(),
            end_time: self.tomorrow_at(hour + 1).format(NAIVE_FORMAT).to_string(),
            reason: reason.to_string(),
        };
        Ok(vec![
            slot(15, "Tomorrow at 3 PM", "No conflicts at this time"),
            slot(16, "Tomorrow at 4 PM", "Good time for afternoon meetings"),
        ])
    }
}
