//! `calassist` CLI: schedule events from plain English, check conflicts, and
//! find free slots from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Check a proposed event against a JSON list of busy intervals (offline)
//! calassist check --busy busy.json --start 2026-03-02T14:00:00 --end 2026-03-02T15:00:00 --buffer 15
//!
//! # Free 30-minute slots between 09:00 and 18:00 (busy list on stdin)
//! cat busy.json | calassist free --busy - --date 2026-03-02 --duration 30
//!
//! # Extract an event from text (needs GROK_API_KEY)
//! calassist extract "Lunch with Sarah on Friday at 12:30 PM"
//!
//! # Extract, check for conflicts and create (needs GROK_API_KEY and GOOGLE_ACCESS_TOKEN)
//! calassist schedule "Team meeting tomorrow at 2 PM for 1 hour"
//!
//! # Same flow fully offline: keyword extractor, in-memory calendar seeded from a file
//! calassist schedule --mock --busy busy.json "Call with client"
//!
//! # Upcoming events for the next 7 days
//! calassist upcoming --days 7
//! ```
//!
//! Settings come from the environment or a `.env` file; see
//! `calendar_assistant::config`. Logs go to stderr (`-v`, `-vv`, or `RUST_LOG`).

use std::io::{self, Read};

use anyhow::{Context, Result};
use calendar_assistant::provider::to_busy_intervals;
use calendar_assistant::{
    BusyRecord, CalendarProvider, ChatCompletionsExtractor, EventExtractor, GoogleCalendar,
    InMemoryCalendar, MockExtractor, ScheduleOutcome, Scheduler, Settings,
};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use slot_engine::interval::{TimeInterval, WorkingHours};
use slot_engine::{find_free_slots, has_conflict};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "calassist",
    version,
    about = "Natural-language calendar assistant"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// IANA time zone for timestamps without an offset (defaults to TIME_ZONE)
    #[arg(long, global = true, value_parser = parse_tz)]
    tz: Option<Tz>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a proposed event against busy intervals read from JSON
    Check {
        /// Busy-interval JSON file ("-" for stdin)
        #[arg(short, long)]
        busy: String,
        /// Event start (ISO 8601)
        #[arg(long)]
        start: String,
        /// Event end (ISO 8601)
        #[arg(long)]
        end: String,
        /// Minutes of padding on each side (defaults to BUFFER_MINUTES)
        #[arg(long, allow_negative_numbers = true)]
        buffer: Option<i64>,
    },
    /// List free slots within working hours on one day
    Free {
        /// Busy-interval JSON file ("-" for stdin)
        #[arg(short, long)]
        busy: String,
        /// Day to search (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Minimum slot length in minutes
        #[arg(long, allow_negative_numbers = true)]
        duration: i64,
        /// Start of working hours, HH:MM (defaults to WORK_START)
        #[arg(long, value_parser = parse_hhmm)]
        work_start: Option<NaiveTime>,
        /// End of working hours, HH:MM (defaults to WORK_END)
        #[arg(long, value_parser = parse_hhmm)]
        work_end: Option<NaiveTime>,
    },
    /// Extract structured event details from text
    Extract {
        text: String,
        /// Use the offline keyword extractor instead of the language model
        #[arg(long)]
        mock: bool,
    },
    /// Extract an event, check for conflicts and create it
    Schedule {
        text: String,
        /// Create the event even if it conflicts
        #[arg(long)]
        force: bool,
        /// Use the offline keyword extractor instead of the language model
        #[arg(long)]
        mock: bool,
        /// Use an in-memory calendar seeded from this JSON file instead of Google
        /// (with --mock and no file, the in-memory calendar starts empty)
        #[arg(short, long)]
        busy: Option<String>,
    },
    /// Show upcoming timed events
    Upcoming {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Delete an event by id
    Delete { id: String },
    /// Check that the language-model endpoint answers
    TestConnection,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = Settings::from_env().context("Failed to load settings")?;
    if let Some(tz) = cli.tz {
        settings.time_zone = tz;
    }
    debug!(time_zone = %settings.time_zone, "settings loaded");

    match cli.command {
        Commands::Check {
            busy,
            start,
            end,
            buffer,
        } => {
            let records = read_busy(&busy)?;
            let intervals = to_busy_intervals(&records, settings.time_zone)
                .context("Invalid busy interval")?;
            let candidate = TimeInterval::parse(&start, &end, settings.time_zone)
                .context("Invalid event interval")?;
            let buffer = minutes(buffer.unwrap_or(settings.buffer_minutes), "--buffer")?;

            let check = has_conflict(&candidate, &intervals, buffer)
                .context("Conflict check failed")?;
            print_json(&check)?;
        }
        Commands::Free {
            busy,
            date,
            duration,
            work_start,
            work_end,
        } => {
            let records = read_busy(&busy)?;
            let intervals = to_busy_intervals(&records, settings.time_zone)
                .context("Invalid busy interval")?;
            let window = WorkingHours::on(
                date,
                work_start.unwrap_or(settings.work_start),
                work_end.unwrap_or(settings.work_end),
                settings.time_zone,
            )
            .context("Invalid working hours")?;

            let slots = find_free_slots(&window, &intervals, minutes(duration, "--duration")?)
                .context("Free-slot search failed")?;
            print_json(&slots)?;
        }
        Commands::Extract { text, mock } => {
            let scheduler = Scheduler::new(
                InMemoryCalendar::new(settings.time_zone),
                extractor(&settings, mock)?,
                settings,
            );
            let draft = scheduler
                .extract(&text)
                .context("Failed to extract information")?;
            print_json(&draft)?;
        }
        Commands::Schedule {
            text,
            force,
            mock,
            busy,
        } => {
            let provider: Box<dyn CalendarProvider> = match busy.as_deref() {
                None if mock => Box::new(InMemoryCalendar::new(settings.time_zone)),
                busy => calendar(&settings, busy)?,
            };
            let extractor = extractor(&settings, mock)?;
            let mut scheduler = Scheduler::new(provider, extractor, settings);

            let draft = scheduler
                .extract(&text)
                .context("Failed to extract information")?;

            let mut report = if force {
                let event_id = scheduler
                    .force_schedule(&draft)
                    .context("Failed to create event")?;
                json!({ "outcome": "created", "event_id": event_id })
            } else {
                let outcome = scheduler
                    .schedule(&draft)
                    .context("Failed to schedule event")?;
                let mut report = serde_json::to_value(&outcome)?;
                if let ScheduleOutcome::Conflicted { conflicts } = &outcome {
                    let alternatives = scheduler
                        .alternatives(&draft, conflicts)
                        .context("Failed to find alternative times")?;
                    report["alternatives"] = serde_json::to_value(&alternatives)?;
                }
                report
            };
            report["event"] = serde_json::to_value(&draft)?;
            print_json(&report)?;
        }
        Commands::Upcoming { days } => {
            let tz = settings.time_zone;
            let provider = calendar(&settings, None)?;
            // Listing never extracts; the keyword extractor only fills the slot.
            let extractor = MockExtractor::new(Utc::now().with_timezone(&tz).naive_local());
            let mut scheduler = Scheduler::new(provider, extractor, settings);

            let now = Utc::now().with_timezone(&tz).fixed_offset();
            let events = scheduler
                .upcoming(now, days)
                .context("Failed to list upcoming events")?;
            print_json(&events)?;
        }
        Commands::Delete { id } => {
            calendar(&settings, None)?
                .delete_event(&id)
                .with_context(|| format!("Failed to delete event {}", id))?;
            print_json(&json!({ "deleted": id }))?;
        }
        Commands::TestConnection => {
            ChatCompletionsExtractor::from_settings(&settings)?
                .test_connection()
                .context("Connection failed")?;
            println!("Connection successful");
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// The Google calendar, or an in-memory calendar seeded from `busy`.
fn calendar(settings: &Settings, busy: Option<&str>) -> Result<Box<dyn CalendarProvider>> {
    match busy {
        Some(path) => Ok(Box::new(InMemoryCalendar::with_records(
            settings.time_zone,
            read_busy(path)?,
        ))),
        None => Ok(Box::new(
            GoogleCalendar::from_settings(settings).context("Google Calendar is not configured")?,
        )),
    }
}

fn extractor(settings: &Settings, mock: bool) -> Result<Box<dyn EventExtractor>> {
    if mock {
        let now = Utc::now().with_timezone(&settings.time_zone).naive_local();
        return Ok(Box::new(MockExtractor::new(now)));
    }
    Ok(Box::new(
        ChatCompletionsExtractor::from_settings(settings)
            .context("Language model is not configured")?,
    ))
}

fn minutes(value: i64, flag: &str) -> Result<Duration> {
    Duration::try_minutes(value).with_context(|| format!("{} {} minutes is out of range", flag, value))
}

fn parse_tz(s: &str) -> std::result::Result<Tz, String> {
    s.parse::<Tz>()
        .map_err(|_| format!("unknown time zone '{}'", s))
}

fn parse_hhmm(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| format!("expected HH:MM, got '{}'", s))
}

fn read_busy(path: &str) -> Result<Vec<BusyRecord>> {
    let text = read_input(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid busy-interval JSON in {}", display_name(path)))
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
}

fn display_name(path: &str) -> &str {
    if path == "-" {
        "stdin"
    } else {
        path
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
