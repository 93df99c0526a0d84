//! Timetable quality metrics (KPIs).
//!
//! Computes descriptive indicators from a decoded timetable and its grid.
//! Complements fitness: fitness ranks candidates during search, KPIs
//! describe the delivered timetable to an operator.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Daily load | Occupied periods per section per day |
//! | Max spread | Largest (busiest − lightest day) over sections |
//! | Utilization | Occupied cells / (sections × open slots) |
//! | Instructor hours | Distinct teaching slots per instructor |
//! | Free last period rate | Section-days whose last open period is free |
//! | Idle gaps | Free open periods between a section's first and last class |

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Slot, TimeGrid, Timetable};

/// Timetable performance indicators.
#[derive(Debug, Clone)]
pub struct TimetableKpi {
    /// Occupied cells (lab sessions count twice).
    pub total_periods: usize,
    /// Occupied periods per day, per section.
    pub daily_load_by_section: BTreeMap<String, Vec<usize>>,
    /// Largest daily load spread of any section.
    pub max_daily_spread: usize,
    /// Fraction of open section cells in use (0.0..1.0).
    pub utilization: f64,
    /// Teaching periods per instructor.
    pub instructor_hours: BTreeMap<String, usize>,
    /// Fraction of section-days that end with a free period (0.0..1.0).
    pub free_last_period_rate: f64,
    /// Total idle gaps across sections.
    pub idle_gaps: usize,
}

impl TimetableKpi {
    /// Computes KPIs from a timetable and the grid it was built on.
    pub fn calculate(timetable: &Timetable, grid: &TimeGrid) -> Self {
        let days = grid.day_count();
        let mut occupied: BTreeMap<&str, BTreeSet<Slot>> = BTreeMap::new();
        let mut instructor_slots: BTreeMap<&str, BTreeSet<Slot>> = BTreeMap::new();
        for e in &timetable.entries {
            occupied.entry(e.section.as_str()).or_default().insert(e.slot);
            instructor_slots
                .entry(e.instructor.as_str())
                .or_default()
                .insert(e.slot);
        }

        let mut daily_load_by_section = BTreeMap::new();
        let mut max_daily_spread = 0;
        let mut free_last = 0usize;
        let mut section_days = 0usize;
        let mut idle_gaps = 0;

        for (section, slots) in &occupied {
            let mut loads = vec![0usize; days];
            for s in slots.iter().filter(|s| s.day < days) {
                loads[s.day] += 1;
            }

            for day in 0..days {
                let open: Vec<usize> = (0..grid.periods_per_day)
                    .filter(|&q| grid.is_assignable(Slot::new(day, q)))
                    .collect();
                let Some(&last_open) = open.last() else { continue };
                section_days += 1;
                if !slots.contains(&Slot::new(day, last_open)) {
                    free_last += 1;
                }

                let used: Vec<usize> = open
                    .iter()
                    .copied()
                    .filter(|&q| slots.contains(&Slot::new(day, q)))
                    .collect();
                if let (Some(&first), Some(&last)) = (used.first(), used.last()) {
                    idle_gaps += open
                        .iter()
                        .filter(|&&q| q > first && q < last && !used.contains(&q))
                        .count();
                }
            }

            let max = loads.iter().copied().max().unwrap_or(0);
            let min = loads.iter().copied().min().unwrap_or(0);
            max_daily_spread = max_daily_spread.max(max - min);
            daily_load_by_section.insert(section.to_string(), loads);
        }

        let capacity = occupied.len() * grid.open_slot_count();
        let total_periods = timetable.entry_count();
        let utilization = if capacity == 0 {
            0.0
        } else {
            total_periods as f64 / capacity as f64
        };
        let free_last_period_rate = if section_days == 0 {
            1.0
        } else {
            free_last as f64 / section_days as f64
        };

        Self {
            total_periods,
            daily_load_by_section,
            max_daily_spread,
            utilization,
            instructor_hours: instructor_slots
                .into_iter()
                .map(|(name, slots)| (name.to_string(), slots.len()))
                .collect(),
            free_last_period_rate,
            idle_gaps,
        }
    }

    /// Whether the timetable meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_spread: usize, max_idle_gaps: usize) -> bool {
        self.max_daily_spread <= max_spread && self.idle_gaps <= max_idle_gaps
    }
}
