//! Scheduling entry points and KPI evaluation.
//!
//! # Entry points
//!
//! [`schedule`] runs one evolutionary search over a booking snapshot and
//! returns the best-ever timetable with its fitness, feasibility and
//! violations. [`Timetabler`] holds parameters and a cancellation token and
//! adds retry-with-fresh-seed.
//!
//! # KPI
//!
//! [`TimetableKpi`] computes descriptive metrics of a delivered timetable:
//! daily load spread, utilization, instructor hours, free last periods and
//! idle gaps.
//!
//! # References
//!
//! - Schaerf (1999), "A survey of automated timetabling"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1.2

mod kpi;
mod timetabler;

pub use kpi::TimetableKpi;
pub use timetabler::{schedule, ScheduleOutcome, ScheduleRequest, Timetabler};
