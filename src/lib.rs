//! Weekly class timetabling for the U-Engine ecosystem.
//!
//! Assigns subject/instructor sessions of one or more student sections to
//! day/period slots. Hard constraints (no instructor double-booking, exact
//! weekly quotas, contiguous labs, external bookings) dominate soft
//! institutional preferences (free periods at day's end, balanced daily
//! load, no repeated subject per day). Solved by a genetic algorithm with
//! constraint-aware initialization and repair.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `TimeGrid`, `Slot`, `SubjectAssignment`,
//!   `Session`, `ExternalBooking`, `InstitutionalRules`, `Timetable`, `Violation`
//! - **`ga`**: Decomposition, chromosome, fitness, selection, operators and
//!   the evolution controller
//! - **`scheduler`**: `schedule` entry point, `Timetabler`, KPIs
//! - **`validation`**: Input checks and independent timetable validation
//! - **`error`**: `EngineError`
//!
//! # Architecture
//!
//! The engine performs no I/O. Callers load assignments and a snapshot of
//! committed bookings, call [`schedule`], persist the returned timetable and
//! feed [`Timetable::to_bookings`] into later runs.
//!
//! # References
//!
//! - Schaerf (1999), "A survey of automated timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"

pub mod error;
pub mod ga;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use error::EngineError;
pub use ga::{CancellationToken, EvolutionParams, TerminationReason};
pub use models::{
    BookingSnapshot, ClashOracle, ExternalBooking, InstitutionalRules, SessionKind, Slot,
    SubjectAssignment, TimeGrid, Timetable, Violation, ViolationType,
};
pub use scheduler::{schedule, ScheduleOutcome, ScheduleRequest, Timetabler, TimetableKpi};
