//! Weekly time grid and slot coordinates.
//!
//! A [`TimeGrid`] is an ordered list of working days, each split into the
//! same number of periods. Some slots are *blocked* (breaks, lunch,
//! institution-specific rules) and are never assignable. Labs run in
//! predefined two-period *lab blocks*.
//!
//! # Precedence
//! A slot is assignable iff it lies inside the grid AND it is not blocked.
//! Lab blocks that touch a blocked slot are skipped, not rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::EngineError;

/// A (day, period) coordinate. Both indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    /// Day index into [`TimeGrid::days`].
    pub day: usize,
    /// Period index within the day.
    pub period: usize,
}

impl Slot {
    /// Creates a slot.
    #[inline]
    pub const fn new(day: usize, period: usize) -> Self {
        Self { day, period }
    }

    /// The slot one period later on the same day.
    #[inline]
    pub const fn next(self) -> Self {
        Self::new(self.day, self.period + 1)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}p{}", self.day, self.period)
    }
}

/// A two-period block reserved for labs: periods `start` and `start + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabBlock {
    /// First period of the block.
    pub start: usize,
}

impl LabBlock {
    /// Creates a block covering `start` and `start + 1`.
    pub const fn new(start: usize) -> Self {
        Self { start }
    }

    /// The two slots of this block on `day`.
    #[inline]
    pub fn slots(self, day: usize) -> [Slot; 2] {
        [Slot::new(day, self.start), Slot::new(day, self.start + 1)]
    }
}

/// Weekly grid of working days × periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    /// Working-day names, in week order.
    pub days: Vec<String>,
    /// Number of periods per day.
    pub periods_per_day: usize,
    /// Slots that can never hold a session.
    #[serde(default)]
    pub blocked: BTreeSet<Slot>,
    /// Predefined lab blocks, identical on every day.
    #[serde(default = "default_lab_blocks")]
    pub lab_blocks: Vec<LabBlock>,
}

fn default_lab_blocks() -> Vec<LabBlock> {
    vec![LabBlock::new(0), LabBlock::new(2), LabBlock::new(4)]
}

impl TimeGrid {
    /// Creates a grid with the given day names and period count.
    ///
    /// Lab blocks default to consecutive pairs `(0,1), (2,3), ...`.
    pub fn new<S: Into<String>>(days: impl IntoIterator<Item = S>, periods_per_day: usize) -> Self {
        Self {
            days: days.into_iter().map(Into::into).collect(),
            periods_per_day,
            blocked: BTreeSet::new(),
            lab_blocks: (0..periods_per_day / 2).map(|i| LabBlock::new(i * 2)).collect(),
        }
    }

    /// Five working days (Tuesday to Saturday), six periods, three lab blocks.
    pub fn standard() -> Self {
        Self::new(["Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"], 6)
    }

    /// Blocks a single slot.
    pub fn with_blocked(mut self, slot: Slot) -> Self {
        self.blocked.insert(slot);
        self
    }

    /// Blocks several slots.
    pub fn with_blocked_slots(mut self, slots: impl IntoIterator<Item = Slot>) -> Self {
        self.blocked.extend(slots);
        self
    }

    /// Blocks `period` on every day (e.g. lunch).
    pub fn with_blocked_period(mut self, period: usize) -> Self {
        for day in 0..self.days.len() {
            self.blocked.insert(Slot::new(day, period));
        }
        self
    }

    /// Replaces the lab blocks with blocks starting at the given periods.
    pub fn with_lab_blocks(mut self, starts: impl IntoIterator<Item = usize>) -> Self {
        self.lab_blocks = starts.into_iter().map(LabBlock::new).collect();
        self
    }

    /// Number of working days.
    #[inline]
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// Total number of cells (blocked included).
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.days.len() * self.periods_per_day
    }

    /// Index of the last period of a day.
    #[inline]
    pub fn last_period(&self) -> usize {
        self.periods_per_day.saturating_sub(1)
    }

    /// Whether the slot lies inside the grid.
    #[inline]
    pub fn contains(&self, slot: Slot) -> bool {
        slot.day < self.days.len() && slot.period < self.periods_per_day
    }

    /// Whether the slot is blocked.
    #[inline]
    pub fn is_blocked(&self, slot: Slot) -> bool {
        self.blocked.contains(&slot)
    }

    /// Whether a session may be placed in the slot.
    #[inline]
    pub fn is_assignable(&self, slot: Slot) -> bool {
        self.contains(slot) && !self.is_blocked(slot)
    }

    /// Row-major index of a slot (`day * periods_per_day + period`).
    #[inline]
    pub fn slot_index(&self, slot: Slot) -> usize {
        slot.day * self.periods_per_day + slot.period
    }

    /// Inverse of [`slot_index`](Self::slot_index).
    #[inline]
    pub fn slot_at(&self, index: usize) -> Slot {
        Slot::new(index / self.periods_per_day, index % self.periods_per_day)
    }

    /// All slots in day-then-period order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..self.slot_count()).map(|i| self.slot_at(i))
    }

    /// All assignable slots in day-then-period order.
    pub fn open_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.slots().filter(|s| !self.is_blocked(*s))
    }

    /// Number of assignable slots.
    pub fn open_slot_count(&self) -> usize {
        self.open_slots().count()
    }

    /// Lab blocks on `day` whose two slots are both assignable.
    pub fn open_lab_blocks(&self, day: usize) -> impl Iterator<Item = LabBlock> + '_ {
        self.lab_blocks
            .iter()
            .copied()
            .filter(move |b| b.slots(day).iter().all(|s| self.is_assignable(*s)))
    }

    /// Looks up a day index by name (case-insensitive).
    pub fn day_index(&self, name: &str) -> Option<usize> {
        self.days.iter().position(|d| d.eq_ignore_ascii_case(name))
    }

    /// Day name for an index, if in range.
    pub fn day_name(&self, day: usize) -> Option<&str> {
        self.days.get(day).map(String::as_str)
    }

    /// Checks structural sanity.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.days.is_empty() {
            return Err(EngineError::InvalidGrid("grid has no working days".into()));
        }
        if self.periods_per_day == 0 {
            return Err(EngineError::InvalidGrid("grid has no periods per day".into()));
        }
        if let Some(block) = self
            .lab_blocks
            .iter()
            .find(|b| b.start + 1 >= self.periods_per_day)
        {
            return Err(EngineError::InvalidGrid(format!(
                "lab block starting at period {} runs past the end of the day",
                block.start
            )));
        }
        if let Some(slot) = self.blocked.iter().find(|s| !self.contains(**s)) {
            return Err(EngineError::InvalidGrid(format!(
                "blocked slot {slot} lies outside the grid"
            )));
        }
        Ok(())
    }
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_grid() {
        let g = TimeGrid::standard();
        assert_eq!(g.day_count(), 5);
        assert_eq!(g.periods_per_day, 6);
        assert_eq!(g.slot_count(), 30);
        assert_eq!(g.lab_blocks.len(), 3);
        assert_eq!(g.day_index("friday"), Some(3));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_slot_index_roundtrip() {
        let g = TimeGrid::new(["Mon", "Tue"], 4);
        for (i, slot) in g.slots().enumerate() {
            assert_eq!(g.slot_index(slot), i);
            assert_eq!(g.slot_at(i), slot);
        }
        assert_eq!(g.slot_at(5), Slot::new(1, 1));
    }

    #[test]
    fn test_blocked_is_not_assignable() {
        let g = TimeGrid::standard()
            .with_blocked(Slot::new(3, 5))
            .with_blocked_period(2);
        assert!(!g.is_assignable(Slot::new(3, 5)));
        assert!(!g.is_assignable(Slot::new(0, 2)));
        assert!(!g.is_assignable(Slot::new(4, 2)));
        assert!(g.is_assignable(Slot::new(0, 3)));
        assert!(!g.is_assignable(Slot::new(5, 0)));
        assert_eq!(g.open_slot_count(), 30 - 5 - 1);
    }

    #[test]
    fn test_open_lab_blocks_skip_blocked() {
        let g = TimeGrid::standard().with_blocked(Slot::new(0, 3));
        let blocks: Vec<_> = g.open_lab_blocks(0).collect();
        assert_eq!(blocks, vec![LabBlock::new(0), LabBlock::new(4)]);
        assert_eq!(g.open_lab_blocks(1).count(), 3);
    }

    #[test]
    fn test_validate_rejects_bad_grids() {
        assert!(TimeGrid::new(Vec::<String>::new(), 6).validate().is_err());
        assert!(TimeGrid::new(["Mon"], 0).validate().is_err());
        let g = TimeGrid::new(["Mon"], 3).with_lab_blocks([2]);
        assert!(matches!(g.validate(), Err(EngineError::InvalidGrid(_))));
        let g = TimeGrid::new(["Mon"], 3).with_blocked(Slot::new(1, 0));
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_odd_period_count_lab_blocks() {
        let g = TimeGrid::new(["Mon"], 5);
        assert_eq!(g.lab_blocks, vec![LabBlock::new(0), LabBlock::new(2)]);
    }
}
