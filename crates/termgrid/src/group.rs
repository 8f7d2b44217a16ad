//! Bucketing of events into day, ISO-week and month groups for the list and
//! monthly views. All three groupings iterate in ascending key order.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::Event;

/// An ISO-8601 week, displayed as e.g. "2024-W01".
/// Week 1 is the week containing the year's first Thursday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn for_date(date: NaiveDate) -> WeekKey {
        let iso = date.iso_week();
        WeekKey {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Monday and Sunday of this week
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let monday = NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)?;
        Some((monday, monday + Duration::days(6)))
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// A calendar month, displayed as e.g. "2024-01"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn for_date(date: NaiveDate) -> MonthKey {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First and last day of the month
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)? - Duration::days(1);
        Some((first, last))
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Group events by their start date
pub fn group_by_day<'a>(events: &[&'a Event]) -> BTreeMap<NaiveDate, Vec<&'a Event>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&Event>> = BTreeMap::new();
    for &event in events {
        groups.entry(event.start.date()).or_default().push(event);
    }
    groups
}

/// Group events by the ISO week of their start date
pub fn group_by_week<'a>(events: &[&'a Event]) -> BTreeMap<WeekKey, Vec<&'a Event>> {
    let mut groups: BTreeMap<WeekKey, Vec<&Event>> = BTreeMap::new();
    for &event in events {
        groups
            .entry(WeekKey::for_date(event.start.date()))
            .or_default()
            .push(event);
    }
    groups
}

/// Group events by the calendar month of their start date
pub fn group_by_month<'a>(events: &[&'a Event]) -> BTreeMap<MonthKey, Vec<&'a Event>> {
    let mut groups: BTreeMap<MonthKey, Vec<&Event>> = BTreeMap::new();
    for &event in events {
        groups
            .entry(MonthKey::for_date(event.start.date()))
            .or_default()
            .push(event);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn make_event(title: &str, start: &str) -> Event {
        let start = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M").unwrap();
        Event {
            title: title.to_string(),
            start,
            end: start + Duration::hours(1),
            all_day: false,
            background_color: None,
            location: None,
            description: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========== group_by_day tests ==========

    #[test]
    fn test_group_by_day_keys_ascending() {
        let a = make_event("C", "2024-03-13 09:00");
        let b = make_event("A", "2024-03-11 09:00");
        let c = make_event("B", "2024-03-11 14:00");
        let events = vec![&a, &b, &c];

        let groups = group_by_day(&events);

        let keys: Vec<NaiveDate> = groups.keys().copied().collect();
        assert_eq!(keys, vec![date(2024, 3, 11), date(2024, 3, 13)]);
        assert_eq!(groups[&date(2024, 3, 11)].len(), 2);
    }

    #[test]
    fn test_group_by_day_preserves_input_order_within_day() {
        let a = make_event("first", "2024-03-11 08:00");
        let b = make_event("second", "2024-03-11 10:00");
        let events = vec![&a, &b];

        let groups = group_by_day(&events);
        let titles: Vec<&str> = groups[&date(2024, 3, 11)]
            .iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn test_group_by_day_empty() {
        assert!(group_by_day(&[]).is_empty());
    }

    // ========== group_by_week tests ==========

    #[test]
    fn test_same_iso_week_is_one_group() {
        // 2024-01-01 is a Monday and 2024-01-07 the following Sunday
        let a = make_event("a", "2024-01-01 09:00");
        let b = make_event("b", "2024-01-07 09:00");
        let events = vec![&a, &b];

        let groups = group_by_week(&events);

        assert_eq!(groups.len(), 1);
        let (key, members) = groups.iter().next().unwrap();
        assert_eq!(key.to_string(), "2024-W01");
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_week_key_zero_pads() {
        assert_eq!(WeekKey { year: 2024, week: 7 }.to_string(), "2024-W07");
        assert_eq!(
            WeekKey {
                year: 2024,
                week: 33
            }
            .to_string(),
            "2024-W33"
        );
    }

    #[test]
    fn test_december_days_can_belong_to_next_iso_year() {
        // 2024-12-30 is the Monday of week 1 of ISO year 2025
        let key = WeekKey::for_date(date(2024, 12, 30));
        assert_eq!(key.to_string(), "2025-W01");
    }

    #[test]
    fn test_group_by_week_sorts_across_year_boundary() {
        let late = make_event("new year", "2025-01-06 09:00");
        let early = make_event("december", "2024-12-02 09:00");
        let events = vec![&late, &early];

        let groups = group_by_week(&events);

        let keys: Vec<String> = groups.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2024-W49", "2025-W02"]);
    }

    #[test]
    fn test_week_bounds_are_monday_to_sunday() {
        let key = WeekKey {
            year: 2024,
            week: 1,
        };
        let (monday, sunday) = key.bounds().unwrap();
        assert_eq!(monday, date(2024, 1, 1));
        assert_eq!(sunday, date(2024, 1, 7));
    }

    // ========== group_by_month tests ==========

    #[test]
    fn test_group_by_month_keys_ascending() {
        let feb = make_event("feb", "2024-02-10 09:00");
        let jan = make_event("jan", "2024-01-20 09:00");
        let events = vec![&feb, &jan];

        let groups = group_by_month(&events);

        let keys: Vec<String> = groups.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-02"]);
    }

    #[test]
    fn test_multi_day_event_groups_under_start_month() {
        // Spans into February but is bucketed by its start
        let mut spanning = make_event("camp", "2024-01-29 08:00");
        spanning.end = date(2024, 2, 2).and_hms_opt(16, 0, 0).unwrap();
        let events = vec![&spanning];

        let groups = group_by_month(&events);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups.keys().next().unwrap().to_string(), "2024-01");
    }

    #[test]
    fn test_month_bounds() {
        let (first, last) = MonthKey {
            year: 2024,
            month: 2,
        }
        .bounds()
        .unwrap();
        assert_eq!(first, date(2024, 2, 1));
        assert_eq!(last, date(2024, 2, 29)); // leap year

        let (first, last) = MonthKey {
            year: 2024,
            month: 12,
        }
        .bounds()
        .unwrap();
        assert_eq!(first, date(2024, 12, 1));
        assert_eq!(last, date(2024, 12, 31));
    }
}
