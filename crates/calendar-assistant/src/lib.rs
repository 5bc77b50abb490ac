//! # calendar-assistant
//!
//! Natural-language event scheduling around [`slot_engine`].
//!
//! A free-text request ("Lunch with Sarah on Friday at 12:30") goes to a
//! language model for structured extraction, the calendar is checked for
//! conflicts with a buffer on either side, and the event is created, or
//! alternative times are offered.
//!
//! Hosted services sit behind two ports so the workflow runs offline in tests:
//!
//! | Port | Hosted implementation | Offline implementation |
//! |---|---|---|
//! | [`CalendarProvider`] | [`GoogleCalendar`] | [`InMemoryCalendar`] |
//! | [`EventExtractor`] | [`ChatCompletionsExtractor`] | [`MockExtractor`] |
//!
//! ## Modules
//!
//! - [`config`]: `Settings` from the environment / `.env`
//! - [`provider`]: Calendar port, `BusyRecord`, `EventDraft`, `EventPatch`
//! - [`google`]: Google Calendar v3 client
//! - [`memory`]: In-memory calendar
//! - [`extract`]: Extraction port, reply validation, keyword mock
//! - [`llm`]: Chat-completions client
//! - [`cache`]: TTL cache for listings
//! - [`scheduler`]: The end-to-end workflow
//! - [`error`]: Error types

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod google;
pub mod llm;
pub mod memory;
pub mod provider;
pub mod scheduler;

pub use config::Settings;
pub use error::AssistantError;
pub use extract::{EventExtractor, ExtractedEvent, MockExtractor, Suggestion};
pub use google::GoogleCalendar;
pub use llm::ChatCompletionsExtractor;
pub use memory::InMemoryCalendar;
pub use provider::{BusyRecord, CalendarProvider, EventDraft, EventPatch};
pub use scheduler::{Alternatives, ScheduleOutcome, Scheduler};
