//! Event extraction through an OpenAI-compatible chat-completions endpoint.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use slot_engine::interval::BusyInterval;
use tracing::{debug, instrument, warn};

use crate::config::Settings;
use crate::error::{api_error_message, AssistantError, Result};
use crate::extract::{parse_extraction, parse_suggestions, EventExtractor, ExtractedEvent, Suggestion};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that extracts event information and returns only valid JSON responses.";
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);
const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Client for a hosted language model speaking the chat-completions protocol.
pub struct ChatCompletionsExtractor {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    model: String,
    time_zone: Tz,
}

impl ChatCompletionsExtractor {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        time_zone: Tz,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            time_zone,
        })
    }

    /// Build a client from settings; fails when no API key is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.require_llm_key()?,
            settings.llm_base_url.as_str(),
            settings.llm_model.as_str(),
            settings.time_zone,
        )
    }

    fn now_reference(&self) -> String {
        now_in(self.time_zone, Utc::now())
    }

    /// Send a short prompt and report whether the endpoint answered.
    pub fn test_connection(&self) -> Result<()> {
        self.complete("Hello, respond with just 'OK' if you can hear me.", 10)
            .map(|_| ())
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens,
            stream: false,
        };

        debug!("Sending chat completion request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "chat completion failed");
            return Err(AssistantError::Provider {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AssistantError::Extraction("Failed to get response from language model".to_string())
            })?;

        debug!(chars = content.len(), "Received chat completion");
        Ok(content)
    }
}

impl EventExtractor for ChatCompletionsExtractor {
    fn extract_event(&self, text: &str) -> Result<ExtractedEvent> {
        let prompt = extraction_prompt(text, &self.now_reference());
        let content = self.complete(&prompt, MAX_TOKENS)?;
        parse_extraction(&content)
    }

    fn suggest_alternatives(
        &self,
        description: &str,
        conflicts: &[BusyInterval],
    ) -> Result<Vec<Suggestion>> {
        let prompt = suggestion_prompt(description, conflicts, &self.now_reference());
        let content = self.complete(&prompt, MAX_TOKENS)?;
        parse_suggestions(&content)
    }
}

fn now_in(tz: Tz, now: DateTime<Utc>) -> String {
    now.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn extraction_prompt(text: &str, now: &str) -> String {
    format!(
        "Extract event information from the following text and return a JSON response:\n\
         \n\
         Text: \"{text}\"\n\
         \n\
         Return a JSON object with these fields:\n\
         - title: Event title\n\
         - start_time: ISO format datetime (YYYY-MM-DDTHH:MM:SS)\n\
         - end_time: ISO format datetime (YYYY-MM-DDTHH:MM:SS)\n\
         - duration_minutes: Duration in minutes\n\
         - location: Location (if mentioned, otherwise null)\n\
         - category: Event category (Meeting, Personal, Work, etc.)\n\
         - description: Brief description\n\
         \n\
         Current date/time reference: {now}\n\
         \n\
         If the text doesn't contain enough information for a valid event, return:\n\
         {{\"error\": \"Insufficient event information\"}}\n\
         \n\
         Only return valid JSON, no other text."
    )
}

pub fn suggestion_prompt(description: &str, conflicts: &[BusyInterval], now: &str) -> String {
    let conflict_info = conflicts
        .iter()
        .map(|c| match c.interval() {
            Some(interval) => format!(
                "- {}: {} to {}",
                c.title,
                interval.start().to_rfc3339(),
                interval.end().to_rfc3339()
            ),
            None => format!("- {}: all day", c.title),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Suggest 3 alternative times for this event: {description}\n\
         \n\
         Existing conflicts:\n\
         {conflict_info}\n\
         \n\
         Current time: {now}\n\
         \n\
         Return a JSON array with 3 alternatives, each containing:\n\
         - suggestion: Human readable suggestion\n\
         - start_time: ISO format datetime\n\
         - end_time: ISO format datetime\n\
         - reason: Why this time is better\n\
         \n\
         Only return valid JSON array, no other text."
    )
}
