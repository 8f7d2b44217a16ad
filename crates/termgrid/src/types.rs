use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Background color assigned to events that arrive without one
pub const DEFAULT_COLOR: &str = "#e9ecef";

/// A raw event record as the source application's calendar endpoint returns it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default)]
    pub title: String,

    /// Start timestamp, ISO-ish string
    pub start: String,

    /// End timestamp, ISO-ish string
    pub finish: String,

    #[serde(default)]
    pub background_color: Option<String>,

    #[serde(default)]
    pub all_day: bool,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// A raw term record as the source application's terms endpoint returns it
#[derive(Debug, Clone, Deserialize)]
pub struct RawTerm {
    pub id: i64,

    /// Term name, e.g. "Term 1"
    #[serde(rename = "n")]
    pub name: String,

    /// Calendar year the term belongs to
    #[serde(rename = "cy")]
    pub year: i32,

    /// Start date as "DD/MM/YYYY"
    #[serde(rename = "s")]
    pub start: String,

    /// End date as "DD/MM/YYYY"
    #[serde(rename = "f")]
    pub finish: String,
}

/// A normalized calendar event
///
/// Invariant: `start <= end`. Rows violating it are dropped during
/// normalization, so a constructed event always holds it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub all_day: bool,
    /// Normalized (lowercased) background color, if the source supplied one
    pub background_color: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl Event {
    /// The color layer this event belongs to, falling back to the neutral default
    pub fn layer_color(&self) -> &str {
        self.background_color.as_deref().unwrap_or(DEFAULT_COLOR)
    }

    /// Whether the event spans more than one calendar day
    pub fn is_multi_day(&self) -> bool {
        self.start.date() != self.end.date()
    }

    /// Whether the event covers the given calendar day
    pub fn occurs_on(&self, day: NaiveDate) -> bool {
        self.start.date() <= day && day <= self.end.date()
    }
}

/// A normalized school term
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Term {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Term {
    /// Whether the given day falls inside the term
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Whether the given date range intersects the term at all.
    /// An event that starts before the term and ends inside it still counts.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end && end >= self.start
    }
}

/// One toggleable visibility group: all events sharing a background color
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColorLayer {
    /// Normalized background color, the grouping key
    pub color: String,
    pub event_count: usize,
    /// Title of the first event seen with this color
    pub sample_title: String,
    /// Label the source application shows for this color, when captured
    pub name: Option<String>,
    pub enabled: bool,
}

impl ColorLayer {
    /// Label shown on the layer toggle
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.sample_title)
    }
}

/// The four calendar view modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Term,
    Monthly,
    Weekly,
    Daily,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Term,
        ViewMode::Monthly,
        ViewMode::Weekly,
        ViewMode::Daily,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Term => "term",
            ViewMode::Monthly => "monthly",
            ViewMode::Weekly => "weekly",
            ViewMode::Daily => "daily",
        }
    }

    /// Human-readable name for the view selector
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Term => "Term",
            ViewMode::Monthly => "Monthly",
            ViewMode::Weekly => "Weekly",
            ViewMode::Daily => "Daily",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "term" => Ok(ViewMode::Term),
            "monthly" => Ok(ViewMode::Monthly),
            "weekly" => Ok(ViewMode::Weekly),
            "daily" => Ok(ViewMode::Daily),
            _ => Err(ParseKeyError::ViewMode(s.to_string())),
        }
    }
}

/// Which period of events a view shows
///
/// Round-trips through the key grammar `"all" | "term-{id}" | "year-{YYYY}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodFilter {
    #[default]
    All,
    Term(i64),
    Year(i32),
}

impl PeriodFilter {
    pub fn key(&self) -> String {
        match self {
            PeriodFilter::All => "all".to_string(),
            PeriodFilter::Term(id) => format!("term-{}", id),
            PeriodFilter::Year(year) => format!("year-{}", year),
        }
    }
}

impl fmt::Display for PeriodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for PeriodFilter {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(PeriodFilter::All);
        }
        if let Some(id) = s.strip_prefix("term-") {
            if let Ok(id) = id.parse() {
                return Ok(PeriodFilter::Term(id));
            }
        }
        if let Some(year) = s.strip_prefix("year-") {
            if let Ok(year) = year.parse() {
                return Ok(PeriodFilter::Year(year));
            }
        }
        Err(ParseKeyError::PeriodFilter(s.to_string()))
    }
}

/// Failure to parse a view-state key from the UI
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseKeyError {
    #[error("unknown view mode: {0:?}")]
    ViewMode(String),
    #[error("unknown period filter: {0:?}")]
    PeriodFilter(String),
}

/// Ephemeral view state owned by the presentation host
///
/// Initialized to defaults, mutated only by user interaction, read on every
/// render, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub mode: ViewMode,
    pub filter: PeriodFilter,
    pub hide_weekends: bool,
    /// Colors the user toggled off; layers start enabled, so the complement
    /// of this set is what renders
    pub disabled_colors: HashSet<String>,
}
