//! Week-by-week grid computation for the term and monthly views.
//!
//! A grid is built for one display period (a term, or a month). The window
//! is widened to whole weeks: the start snaps back to its Monday, the end
//! snaps to the following Sunday, or to a Friday when weekends are hidden
//! (a Saturday or Sunday end snaps *back* to the Friday before it). The
//! window is then walked in 7-day strides, one row per week; days outside
//! the period itself stay in the grid but are flagged so the renderer can
//! dim them.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::types::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridOptions {
    /// Leave Saturday and Sunday out of every row
    pub hide_weekends: bool,
    /// Number the rows 1-based within the period (term view)
    pub show_week_numbers: bool,
}

/// A computed calendar grid, ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<'a> {
    pub weeks: Vec<GridWeek<'a>>,
    pub options: GridOptions,
}

/// One week row
#[derive(Debug, Clone, PartialEq)]
pub struct GridWeek<'a> {
    /// 1-based within the period; restarts for every grid, not an ISO week
    pub number: u32,
    pub days: Vec<GridDay<'a>>,
}

/// One day cell
#[derive(Debug, Clone, PartialEq)]
pub struct GridDay<'a> {
    pub date: NaiveDate,
    /// False for the padding days the week-snapping adds; rendered dimmed
    pub in_period: bool,
    pub weekend: bool,
    pub events: Vec<DayEvent<'a>>,
}

/// One event's appearance in one day cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayEvent<'a> {
    pub event: &'a Event,
    pub multi_day: bool,
    pub starts_here: bool,
    pub ends_here: bool,
}

impl DayEvent<'_> {
    /// True on the later days of a multi-day span; rendered with a
    /// trailing continuation marker
    pub fn continues(&self) -> bool {
        self.multi_day && !self.starts_here
    }

    /// Whether this cell shows the event's start time
    pub fn show_time(&self) -> bool {
        !self.event.all_day && (!self.multi_day || self.starts_here)
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Snap a date back to the Monday of its week
pub fn snap_to_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Snap a period end forward to its Sunday, or to a Friday when weekends
/// are hidden. Saturday and Sunday ends snap back to the preceding Friday.
pub fn snap_period_end(date: NaiveDate, hide_weekends: bool) -> NaiveDate {
    let from_monday = date.weekday().num_days_from_monday() as i64;
    let target = if hide_weekends { 4 } else { 6 };
    date + Duration::days(target - from_monday)
}

/// Build the grid for `[period_start, period_end]` from the given
/// already-filtered events.
pub fn build_grid<'a>(
    period_start: NaiveDate,
    period_end: NaiveDate,
    events: &[&'a Event],
    options: GridOptions,
) -> Grid<'a> {
    let window_start = snap_to_monday(period_start);
    let window_end = snap_period_end(period_end, options.hide_weekends);

    let mut weeks = Vec::new();
    let mut monday = window_start;
    let mut number = 1;
    while monday <= window_end {
        let mut days = Vec::new();
        for offset in 0..7 {
            let date = monday + Duration::days(offset);
            let weekend = is_weekend(date);
            if weekend && options.hide_weekends {
                continue;
            }
            days.push(GridDay {
                date,
                in_period: period_start <= date && date <= period_end,
                weekend,
                events: events_on(events, date),
            });
        }
        weeks.push(GridWeek { number, days });
        number += 1;
        monday += Duration::days(7);
    }

    Grid { weeks, options }
}

/// All events covering `date`: multi-day spans first, then single-day
/// events, input order preserved within each group.
fn events_on<'a>(events: &[&'a Event], date: NaiveDate) -> Vec<DayEvent<'a>> {
    let mut multi = Vec::new();
    let mut single = Vec::new();
    for &event in events {
        if !event.occurs_on(date) {
            continue;
        }
        let day_event = DayEvent {
            event,
            multi_day: event.is_multi_day(),
            starts_here: event.start.date() == date,
            ends_here: event.end.date() == date,
        };
        if day_event.multi_day {
            multi.push(day_event);
        } else {
            single.push(day_event);
        }
    }
    multi.append(&mut single);
    multi
}
