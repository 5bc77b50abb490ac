//! Google Calendar API v3 client.
//!
//! Authenticates with a bearer access token obtained elsewhere; the OAuth
//! consent flow is not handled here. Request bodies and response parsing are
//! plain functions so they can be tested without the network.

use chrono_tz::Tz;
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use slot_engine::interval::TimeInterval;
use tracing::{debug, instrument};

use crate::config::Settings;
use crate::error::{api_error_message, AssistantError, Result};
use crate::provider::{BusyRecord, CalendarProvider, EventDraft, EventPatch};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Safety cap on followed `nextPageToken` links per listing.
const MAX_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    id: String,
    summary: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    location: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
}

impl From<GoogleEvent> for BusyRecord {
    fn from(event: GoogleEvent) -> Self {
        // All-day events carry `date` instead of `dateTime`.
        BusyRecord {
            id: event.id,
            title: event.summary.unwrap_or_else(|| "No Title".to_string()),
            start: event.start.and_then(|t| t.date_time),
            end: event.end.and_then(|t| t.date_time),
            location: event.location.filter(|l| !l.is_empty()),
        }
    }
}

/// Parse one page of an `events.list` response, dropping cancelled events.
///
/// Returns the records and the token for the next page, if any.
pub fn parse_event_list(body: &Value) -> Result<(Vec<BusyRecord>, Option<String>)> {
    let list = EventList::deserialize(body)?;
    let records = list
        .items
        .into_iter()
        .filter(|e| e.status.as_deref() != Some("cancelled"))
        .map(BusyRecord::from)
        .collect();
    Ok((records, list.next_page_token))
}

/// Request body for `events.insert`.
pub fn event_body(draft: &EventDraft, tz: Tz, reminder_minutes: i64) -> Value {
    let mut body = json!({
        "summary": draft.title,
        "start": {
            "dateTime": draft.start().to_rfc3339(),
            "timeZone": tz.name(),
        },
        "end": {
            "dateTime": draft.end().to_rfc3339(),
            "timeZone": tz.name(),
        },
        "reminders": {
            "useDefault": false,
            "overrides": [
                { "method": "popup", "minutes": reminder_minutes },
                { "method": "email", "minutes": reminder_minutes },
            ],
        },
    });
    if let Some(location) = &draft.location {
        body["location"] = json!(location);
    }
    if let Some(description) = &draft.description {
        body["description"] = json!(description);
    }
    body
}

/// Apply a patch to a fetched event resource in place, for `events.update`.
pub fn apply_patch(event: &mut Value, patch: &EventPatch, tz: Tz) {
    if let Some(title) = &patch.title {
        event["summary"] = json!(title);
    }
    if let Some(interval) = &patch.interval {
        event["start"] = json!({ "dateTime": interval.start().to_rfc3339(), "timeZone": tz.name() });
        event["end"] = json!({ "dateTime": interval.end().to_rfc3339(), "timeZone": tz.name() });
    }
    if let Some(location) = &patch.location {
        event["location"] = json!(location);
    }
    if let Some(description) = &patch.description {
        event["description"] = json!(description);
    }
}

/// Calendar provider backed by the Google Calendar REST API.
pub struct GoogleCalendar {
    http: Client,
    access_token: String,
    base_url: String,
    calendar_id: String,
    time_zone: Tz,
    reminder_minutes: i64,
}

impl GoogleCalendar {
    pub fn new(
        access_token: impl Into<String>,
        calendar_id: impl Into<String>,
        time_zone: Tz,
        reminder_minutes: i64,
    ) -> Self {
        Self::with_base_url(
            access_token,
            calendar_id,
            time_zone,
            reminder_minutes,
            DEFAULT_BASE_URL,
        )
    }

    pub fn with_base_url(
        access_token: impl Into<String>,
        calendar_id: impl Into<String>,
        time_zone: Tz,
        reminder_minutes: i64,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            access_token: access_token.into(),
            base_url: base_url.into(),
            calendar_id: calendar_id.into(),
            time_zone,
            reminder_minutes,
        }
    }

    /// Build a client from settings; fails when no access token is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            settings.require_google_token()?,
            settings.calendar_id.as_str(),
            settings.time_zone,
            settings.reminder_minutes,
        ))
    }

    /// `{base}/calendars/{calendar_id}/events[/{event_id}]`, with ids percent-encoded.
    pub fn events_url(&self, event_id: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AssistantError::Config(format!("invalid calendar base URL: {}", e)))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AssistantError::Config(format!("calendar base URL cannot be a base: {}", self.base_url))
            })?;
            segments
                .pop_if_empty()
                .extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn check(&self, response: Response, event_id: Option<&str>) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if let (Some(id), StatusCode::NOT_FOUND | StatusCode::GONE) = (event_id, status) {
            return Err(AssistantError::NotFound(id.to_string()));
        }
        let body = response.text()?;
        Err(AssistantError::Provider {
            status: status.as_u16(),
            message: api_error_message(&body),
        })
    }
}

impl CalendarProvider for GoogleCalendar {
    #[instrument(skip(self, window), fields(calendar = %self.calendar_id))]
    fn list_busy_intervals(&self, window: &TimeInterval) -> Result<Vec<BusyRecord>> {
        let url = self.events_url(None)?;
        let time_min = window.start().to_rfc3339();
        let time_max = window.end().to_rfc3339();

        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query: Vec<(&str, &str)> = vec![
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self
                .http
                .get(url.clone())
                .bearer_auth(&self.access_token)
                .query(&query)
                .send()?;
            let body: Value = self.check(response, None)?.json()?;
            let (page, next) = parse_event_list(&body)?;
            records.extend(page);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = records.len(), "listed events");
        Ok(records)
    }

    #[instrument(skip(self, draft), fields(calendar = %self.calendar_id, title = %draft.title))]
    fn create_event(&self, draft: &EventDraft) -> Result<String> {
        let body = event_body(draft, self.time_zone, self.reminder_minutes);
        let response = self
            .http
            .post(self.events_url(None)?)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()?;
        let created: Value = self.check(response, None)?.json()?;

        let id = created
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AssistantError::Provider {
                status: 200,
                message: "created event has no id".to_string(),
            })?;
        debug!(event_id = %id, "created event");
        Ok(id)
    }

    #[instrument(skip(self, patch), fields(calendar = %self.calendar_id))]
    fn update_event(&self, event_id: &str, patch: &EventPatch) -> Result<()> {
        let url = self.events_url(Some(event_id))?;
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.access_token)
            .send()?;
        let mut event: Value = self.check(response, Some(event_id))?.json()?;

        apply_patch(&mut event, patch, self.time_zone);

        let response = self
            .http
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&event)
            .send()?;
        self.check(response, Some(event_id))?;
        debug!("updated event");
        Ok(())
    }

    #[instrument(skip(self), fields(calendar = %self.calendar_id))]
    fn delete_event(&self, event_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.events_url(Some(event_id))?)
            .bearer_auth(&self.access_token)
            .send()?;
        self.check(response, Some(event_id))?;
        debug!("deleted event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_url_encodes_calendar_id() {
        let calendar = GoogleCalendar::new("token", "team#work@group.calendar.google.com", chrono_tz::UTC, 15);
        let url = calendar.events_url(Some("abc123")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team%23work@group.calendar.google.com/events/abc123"
        );
    }

    #[test]
    fn events_url_tolerates_trailing_slash() {
        let calendar = GoogleCalendar::with_base_url("t", "primary", chrono_tz::UTC, 15, "http://localhost:8080/v3/");
        let url = calendar.events_url(None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v3/calendars/primary/events");
    }

    #[test]
    fn missing_token_is_config_error() {
        let result = GoogleCalendar::from_settings(&Settings::default());
        assert!(matches!(result, Err(AssistantError::Config(_))));
    }
}
