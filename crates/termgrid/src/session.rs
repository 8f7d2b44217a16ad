//! One capture's worth of calendar data, normalized and ready to render.
//!
//! A [`CalendarSession`] is built once from the raw records a capture
//! delivers and owns them for its lifetime; a new capture builds a new
//! session rather than merging into an old one. Rows that fail to parse are
//! dropped individually and never fail the whole build.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{HashMap, HashSet};

use crate::types::{ColorLayer, Event, PeriodFilter, RawEvent, RawTerm, Term, ViewState};

#[derive(Debug, Clone, Default)]
pub struct CalendarSession {
    events: Vec<Event>,
    terms: Vec<Term>,
    layers: Vec<ColorLayer>,
}

impl CalendarSession {
    /// Normalize raw records into a session.
    ///
    /// Malformed rows (dates that don't parse, or an end before its start)
    /// are dropped. Events and terms come out sorted by start date, stably,
    /// and the color layers are derived from the surviving events.
    pub fn from_raw(raw_events: &[RawEvent], raw_terms: &[RawTerm]) -> CalendarSession {
        let mut events: Vec<Event> = raw_events.iter().filter_map(parse_event).collect();
        events.sort_by_key(|e| e.start);

        let mut terms: Vec<Term> = raw_terms.iter().filter_map(parse_term).collect();
        terms.sort_by_key(|t| t.start);

        let layers = derive_layers(&events);

        CalendarSession {
            events,
            terms,
            layers,
        }
    }

    /// Attach captured layer labels, keyed by background color
    pub fn with_layer_names(mut self, names: &HashMap<String, String>) -> CalendarSession {
        for layer in &mut self.layers {
            if let Some(name) = names.get(&layer.color) {
                layer.name = Some(name.clone());
            }
        }
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn layers(&self) -> &[ColorLayer] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.terms.is_empty()
    }

    pub fn term_by_id(&self, id: i64) -> Option<&Term> {
        self.terms.iter().find(|t| t.id == id)
    }

    /// The term containing the given day, used to preselect the period filter
    pub fn current_term(&self, today: NaiveDate) -> Option<&Term> {
        self.terms.iter().find(|t| t.contains(today))
    }

    /// Distinct calendar years events start in, ascending
    pub fn event_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.events.iter().map(|e| e.start.year()).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Toggle a layer by its color
    pub fn set_layer_enabled(&mut self, color: &str, enabled: bool) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.color == color) {
            layer.enabled = enabled;
        }
    }

    /// Colors of the currently enabled layers
    pub fn enabled_colors(&self) -> HashSet<String> {
        self.layers
            .iter()
            .filter(|l| l.enabled)
            .map(|l| l.color.clone())
            .collect()
    }

    /// Apply the color filter, then the period filter.
    ///
    /// A term filter keeps events that overlap the term's interval, not just
    /// those that start inside it; a year filter goes by start year. A term
    /// id with no matching term leaves the period unfiltered, so links made
    /// against an older capture still show events.
    pub fn filter_events<'a>(
        &'a self,
        enabled: &HashSet<String>,
        filter: PeriodFilter,
    ) -> Vec<&'a Event> {
        self.events
            .iter()
            .filter(|e| enabled.contains(e.layer_color()))
            .filter(|e| match filter {
                PeriodFilter::All => true,
                PeriodFilter::Term(id) => self
                    .term_by_id(id)
                    .map(|t| t.overlaps(e.start.date(), e.end.date()))
                    .unwrap_or(true),
                PeriodFilter::Year(year) => e.start.year() == year,
            })
            .collect()
    }

    /// The events a render with the given view state shows
    pub fn visible_events<'a>(&'a self, state: &ViewState) -> Vec<&'a Event> {
        let enabled: HashSet<String> = self
            .layers
            .iter()
            .filter(|l| l.enabled && !state.disabled_colors.contains(&l.color))
            .map(|l| l.color.clone())
            .collect();
        self.filter_events(&enabled, state.filter)
    }

    /// Page title for the given period filter
    pub fn title_for(&self, filter: PeriodFilter) -> String {
        match filter {
            PeriodFilter::Term(id) => match self.term_by_id(id) {
                Some(term) => format!("{} {}", term.name, term.year),
                None => "School Term Calendar".to_string(),
            },
            PeriodFilter::Year(year) => format!("{} School Calendar", year),
            PeriodFilter::All => "School Term Calendar".to_string(),
        }
    }
}

fn parse_event(raw: &RawEvent) -> Option<Event> {
    let start = parse_event_date(&raw.start)?;
    let end = parse_event_date(&raw.finish)?;
    if start > end {
        return None;
    }
    let background_color = raw
        .background_color
        .as_deref()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());
    Some(Event {
        title: raw.title.clone(),
        start,
        end,
        all_day: raw.all_day,
        background_color,
        location: raw.location.clone(),
        description: raw.description.clone(),
    })
}

/// Parse the ISO-ish timestamps the capture carries. Offsets are taken as
/// wall time (school-local), a bare date as midnight.
fn parse_event_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn parse_term(raw: &RawTerm) -> Option<Term> {
    let start = parse_day_month_year(&raw.start)?;
    let end = parse_day_month_year(&raw.finish)?;
    if start > end {
        return None;
    }
    Some(Term {
        id: raw.id,
        name: raw.name.clone(),
        year: raw.year,
        start,
        end,
    })
}

/// Parse the "DD/MM/YYYY" term dates. Anything that doesn't split into
/// exactly three numeric parts is rejected.
fn parse_day_month_year(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let day: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Partition events into color layers: descending by event count, ties in
/// first-encountered order, everything enabled to begin with.
fn derive_layers(events: &[Event]) -> Vec<ColorLayer> {
    let mut layers: Vec<ColorLayer> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for event in events {
        let color = event.layer_color().to_string();
        match index.get(&color) {
            Some(&i) => layers[i].event_count += 1,
            None => {
                index.insert(color.clone(), layers.len());
                layers.push(ColorLayer {
                    color,
                    event_count: 1,
                    sample_title: event.title.clone(),
                    name: None,
                    enabled: true,
                });
            }
        }
    }
    // Stable sort: equal counts keep their first-encountered order
    layers.sort_by(|a, b| b.event_count.cmp(&a.event_count));
    layers
}
