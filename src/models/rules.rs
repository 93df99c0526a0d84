//! Institutional scheduling rules.
//!
//! Rules parameterize both the initializer (what a placement may do) and
//! the fitness evaluator (what is rewarded or penalized). Extra blocked
//! slots are hard: they are merged into the grid before search. Every
//! other rule is soft.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Slot, TimeGrid};

/// Rules an institution applies on top of the bare time grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionalRules {
    /// Slots blocked in addition to the grid's own blocked slots.
    pub blocked: BTreeSet<Slot>,
    /// Slots that should stay free (e.g. last period of the final day).
    /// Occupying one is penalized, never forbidden.
    pub reserved_free: BTreeSet<Slot>,
    /// Maximum lab sessions per section per day.
    pub max_labs_per_day: usize,
    /// Maximum occurrences of a theory subject per section per day.
    pub max_same_subject_per_day: usize,
    /// Tolerated spread between a section's busiest and lightest day.
    pub load_imbalance_threshold: usize,
    /// Teaching periods per instructor per week before overload is penalized.
    pub max_instructor_weekly_load: usize,
}

impl Default for InstitutionalRules {
    fn default() -> Self {
        Self {
            blocked: BTreeSet::new(),
            reserved_free: BTreeSet::new(),
            max_labs_per_day: 1,
            max_same_subject_per_day: 1,
            load_imbalance_threshold: 3,
            max_instructor_weekly_load: 25,
        }
    }
}

impl InstitutionalRules {
    /// Creates the default rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules of the standard grid: the last period of Friday stays free.
    pub fn standard_for(grid: &TimeGrid) -> Self {
        let mut rules = Self::default();
        if let Some(friday) = grid.day_index("Friday") {
            rules.reserved_free.insert(Slot::new(friday, grid.last_period()));
        }
        rules
    }

    /// Blocks an extra slot.
    pub fn with_blocked(mut self, slot: Slot) -> Self {
        self.blocked.insert(slot);
        self
    }

    /// Marks a slot that should stay free.
    pub fn with_reserved_free(mut self, slot: Slot) -> Self {
        self.reserved_free.insert(slot);
        self
    }

    /// Sets the maximum labs per section per day.
    pub fn with_max_labs_per_day(mut self, max: usize) -> Self {
        self.max_labs_per_day = max;
        self
    }

    /// Sets the maximum same-subject occurrences per section per day.
    pub fn with_max_same_subject_per_day(mut self, max: usize) -> Self {
        self.max_same_subject_per_day = max;
        self
    }

    /// Sets the tolerated daily load spread.
    pub fn with_load_imbalance_threshold(mut self, threshold: usize) -> Self {
        self.load_imbalance_threshold = threshold;
        self
    }

    /// Sets the weekly instructor load cap.
    pub fn with_max_instructor_weekly_load(mut self, max: usize) -> Self {
        self.max_instructor_weekly_load = max;
        self
    }

    /// Whether the slot should stay free.
    #[inline]
    pub fn is_reserved(&self, slot: Slot) -> bool {
        self.reserved_free.contains(&slot)
    }

    /// The grid with this rule set's extra blocked slots applied.
    pub fn apply_to(&self, grid: &TimeGrid) -> TimeGrid {
        grid.clone().with_blocked_slots(self.blocked.iter().copied())
    }
}
