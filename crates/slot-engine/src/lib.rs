//! # slot-engine
//!
//! Interval arithmetic behind a natural-language calendar assistant.
//!
//! Given busy intervals already fetched from a calendar provider, the engine
//! answers two questions without doing any I/O: does a proposed event (plus a
//! buffer on each side) collide with anything, and where are the gaps of a
//! given length inside a day's working hours.
//!
//! ## Modules
//!
//! - [`interval`]: `TimeInterval`, `BusyInterval`, `WorkingHours`, `FreeSlot`, timestamp parsing
//! - [`conflict`]: Buffered conflict detection
//! - [`freebusy`]: Free-slot sweep within working hours
//! - [`error`]: Error types

pub mod conflict;
pub mod error;
pub mod freebusy;
pub mod interval;

pub use conflict::{has_conflict, ConflictCheck};
pub use error::SlotError;
pub use freebusy::{find_first_free_slot, find_free_slots};
pub use interval::{parse_timestamp, BusyInterval, FreeSlot, TimeInterval, Timing, WorkingHours};
