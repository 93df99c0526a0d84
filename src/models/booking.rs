//! External bookings and the clash oracle.
//!
//! An external booking records that an instructor is already committed at
//! a slot outside the current run (another section, another department, a
//! previous run). The engine only *queries* bookings through
//! [`ClashOracle`]; refreshing the snapshot between runs and persisting new
//! bookings afterwards is the caller's job.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use super::Slot;

/// Read-only query surface over committed instructor bookings.
///
/// Implementations must be safe to query from several threads at once.
pub trait ClashOracle: Send + Sync + Debug {
    /// Whether `instructor` is already committed at `slot`.
    fn is_booked(&self, instructor: &str, slot: Slot) -> bool;
}

/// An instructor commitment finalized outside this run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalBooking {
    /// Instructor identifier.
    pub instructor: String,
    /// Committed slot.
    pub slot: Slot,
    /// Where the booking came from (section or department), for reporting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl ExternalBooking {
    /// Creates a booking.
    pub fn new(instructor: impl Into<String>, slot: Slot) -> Self {
        Self {
            instructor: instructor.into(),
            slot,
            origin: None,
        }
    }

    /// Sets the origin label.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// Immutable snapshot of external bookings, indexed by instructor.
#[derive(Debug, Clone, Default)]
pub struct BookingSnapshot {
    by_instructor: HashMap<String, HashSet<Slot>>,
    bookings: Vec<ExternalBooking>,
}

impl BookingSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from bookings. Duplicate rows are kept once.
    pub fn from_bookings(bookings: impl IntoIterator<Item = ExternalBooking>) -> Self {
        let mut snapshot = Self::new();
        for booking in bookings {
            snapshot.insert(booking);
        }
        snapshot
    }

    /// Adds a booking while the snapshot is being assembled.
    pub fn with_booking(mut self, booking: ExternalBooking) -> Self {
        self.insert(booking);
        self
    }

    fn insert(&mut self, booking: ExternalBooking) {
        let fresh = self
            .by_instructor
            .entry(booking.instructor.clone())
            .or_default()
            .insert(booking.slot);
        if fresh {
            self.bookings.push(booking);
        }
    }

    /// Returns a new snapshot holding the bookings of both.
    pub fn merged_with(&self, other: &Self) -> Self {
        Self::from_bookings(self.bookings.iter().chain(&other.bookings).cloned())
    }

    /// All bookings in insertion order.
    pub fn bookings(&self) -> &[ExternalBooking] {
        &self.bookings
    }

    /// Booked slots of one instructor, sorted.
    pub fn bookings_for(&self, instructor: &str) -> Vec<Slot> {
        let mut slots: Vec<Slot> = self
            .by_instructor
            .get(instructor)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        slots.sort();
        slots
    }

    /// Number of distinct (instructor, slot) bookings.
    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

impl ClashOracle for BookingSnapshot {
    fn is_booked(&self, instructor: &str, slot: Slot) -> bool {
        self.by_instructor
            .get(instructor)
            .is_some_and(|slots| slots.contains(&slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_booked() {
        let snap = BookingSnapshot::from_bookings([
            ExternalBooking::new("Rao", Slot::new(0, 1)),
            ExternalBooking::new("Rao", Slot::new(2, 3)).with_origin("CSE/B"),
            ExternalBooking::new("Iyer", Slot::new(0, 1)),
        ]);
        assert!(snap.is_booked("Rao", Slot::new(0, 1)));
        assert!(snap.is_booked("Rao", Slot::new(2, 3)));
        assert!(!snap.is_booked("Rao", Slot::new(0, 2)));
        assert!(!snap.is_booked("Nobody", Slot::new(0, 1)));
        assert_eq!(snap.len(), 3);
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let snap = BookingSnapshot::new()
            .with_booking(ExternalBooking::new("Rao", Slot::new(0, 0)))
            .with_booking(ExternalBooking::new("Rao", Slot::new(0, 0)).with_origin("ISE/A"));
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.bookings_for("Rao"), vec![Slot::new(0, 0)]);
    }

    #[test]
    fn test_merged_with() {
        let a = BookingSnapshot::from_bookings([ExternalBooking::new("Rao", Slot::new(1, 1))]);
        let b = BookingSnapshot::from_bookings([
            ExternalBooking::new("Rao", Slot::new(0, 4)),
            ExternalBooking::new("Rao", Slot::new(1, 1)),
        ]);
        let merged = a.merged_with(&b);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged.bookings_for("Rao"),
            vec![Slot::new(0, 4), Slot::new(1, 1)]
        );
        // Inputs untouched
        assert_eq!(a.len(), 1);
    }
}
