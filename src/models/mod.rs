//! Timetabling domain models.
//!
//! Provides the data types for describing a weekly timetabling problem
//! and its solution.
//!
//! # Domain Mappings
//!
//! | u-timetable | College | School | Training Center |
//! |-------------|---------|--------|-----------------|
//! | Section | Class Section | Grade/Class | Cohort |
//! | SubjectAssignment | Course Offering | Subject Allocation | Module |
//! | Session | Lecture / Lab Hour | Lesson | Workshop Block |
//! | ExternalBooking | Other Dept. Timetable | Shared Teacher Plan | Trainer Calendar |

mod assignment;
mod booking;
mod grid;
mod rules;
mod session;
mod timetable;

pub use assignment::{SessionKind, SubjectAssignment};
pub use booking::{BookingSnapshot, ClashOracle, ExternalBooking};
pub use grid::{LabBlock, Slot, TimeGrid};
pub use rules::InstitutionalRules;
pub use session::Session;
pub use timetable::{Timetable, TimetableEntry, Violation, ViolationType};
