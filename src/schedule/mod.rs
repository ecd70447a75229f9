//! Season calendar → dense week enumeration.
//!
//! Weeks are flattened across all periods in source order and numbered
//! `0..N-1`. The index, not the label, is the handle callers hold on to.

use chrono::{DateTime, Utc};

use crate::db::models::{Event, SeasonCalendar, WeekEntry};

/// Every week of the season, paired with its stable index.
pub fn resolve_weeks(calendar: &SeasonCalendar) -> Vec<(usize, &WeekEntry)> {
    calendar
        .periods
        .iter()
        .flat_map(|period| period.entries.iter())
        .enumerate()
        .collect()
}

/// The week containing `now` (first match in traversal order wins). Falls
/// back to week 0 when `now` is outside the season, and to `None` when the
/// calendar has no weeks at all.
pub fn current_week_index(calendar: &SeasonCalendar, now: DateTime<Utc>) -> Option<usize> {
    let weeks = resolve_weeks(calendar);
    weeks
        .iter()
        .find(|(_, week)| week.contains(now))
        .map(|(index, _)| *index)
        .or_else(|| (!weeks.is_empty()).then_some(0))
}

pub fn week_at(calendar: &SeasonCalendar, index: usize) -> Option<&WeekEntry> {
    calendar
        .periods
        .iter()
        .flat_map(|period| period.entries.iter())
        .nth(index)
}

/// Events kicking off inside `week` (inclusive), in upstream order.
pub fn events_in_week<'a>(events: &'a [Event], week: &WeekEntry) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|event| week.contains(event.start_time))
        .collect()
}
