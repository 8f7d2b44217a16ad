use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use termgrid::grid::DayEvent;
use termgrid::group::{group_by_day, group_by_month, group_by_week};
use termgrid::{
    build_grid, CalendarSession, Event, Grid, GridOptions, PeriodFilter, Term, TextColor,
    ViewMode, ViewState,
};

use crate::capture::Snapshot;

/// Paper size the stylesheet scales the grid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperSize {
    #[default]
    A4,
    A3,
}

impl PaperSize {
    pub const ALL: [PaperSize; 2] = [PaperSize::A4, PaperSize::A3];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSize::A4 => "a4",
            PaperSize::A3 => "a3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaperSize::A4 => "A4",
            PaperSize::A3 => "A3",
        }
    }

    /// Unknown values fall back to A4 rather than erroring
    pub fn parse(value: &str) -> PaperSize {
        match value {
            "a3" => PaperSize::A3,
            _ => PaperSize::A4,
        }
    }
}

/// Generate a standalone HTML file for the given snapshot and view
pub fn generate_html(
    snapshot: &Snapshot,
    state: &ViewState,
    paper: PaperSize,
    path: &Path,
) -> Result<()> {
    let html = render_page(snapshot, state, paper);
    fs::write(path, html.into_string())?;
    Ok(())
}

pub fn render_page(snapshot: &Snapshot, state: &ViewState, paper: PaperSize) -> Markup {
    let session = &snapshot.session;
    let events = session.visible_events(state);

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (session.title_for(state.filter)) }
                style { (PreEscaped(CSS)) }
            }
            body class={"paper-" (paper.as_str())} {
                div.container {
                    header.toolbar.no-print {
                        div.toolbar-row {
                            h1 { (session.title_for(state.filter)) }
                            @if let Some(captured) = &snapshot.captured_at {
                                div.captured-at { "Last captured: " (format_captured(captured)) }
                            }
                        }
                        div.stats {
                            span #"event-count" { (events.len()) }
                            " events shown"
                        }
                        (render_controls(session, state, paper))
                        (render_layer_chips(session, state, paper))
                    }
                    main.calendar {
                        @if session.is_empty() {
                            div.empty-state {
                                p { "No calendar data captured yet." }
                            }
                        } @else {
                            @match state.mode {
                                ViewMode::Term => { (render_term_view(session, &events, state)) }
                                ViewMode::Monthly => { (render_monthly_view(&events, state)) }
                                ViewMode::Weekly => { (render_weekly_view(&events)) }
                                ViewMode::Daily => { (render_daily_view(&events)) }
                            }
                        }
                    }
                }
                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    }
}

fn render_controls(session: &CalendarSession, state: &ViewState, paper: PaperSize) -> Markup {
    html! {
        form #"controls" method="get" action="/" {
            label {
                "View"
                select name="view" {
                    @for mode in ViewMode::ALL {
                        option value=(mode.as_str()) selected[state.mode == mode] { (mode.label()) }
                    }
                }
            }
            label {
                "Period"
                select name="period" {
                    option value="all" selected[state.filter == PeriodFilter::All] { "All events" }
                    @for term in session.terms() {
                        @let key = PeriodFilter::Term(term.id);
                        option value=(key.key()) selected[state.filter == key] {
                            (term.name) " " (term.year)
                        }
                    }
                    @for year in session.event_years() {
                        @let key = PeriodFilter::Year(year);
                        option value=(key.key()) selected[state.filter == key] { (year) }
                    }
                }
            }
            label {
                "Paper"
                select name="paper" {
                    @for size in PaperSize::ALL {
                        option value=(size.as_str()) selected[paper == size] { (size.label()) }
                    }
                }
            }
            label.checkbox-label {
                input type="checkbox" name="hide" value="1" checked[state.hide_weekends];
                "Hide weekends"
            }
            input type="hidden" name="off" value=(off_param(state));
            button type="button" onclick="window.print()" { "Print" }
        }
    }
}

fn render_layer_chips(session: &CalendarSession, state: &ViewState, paper: PaperSize) -> Markup {
    html! {
        @if !session.layers().is_empty() {
            div.layer-chips {
                @for layer in session.layers() {
                    @let off = state.disabled_colors.contains(&layer.color);
                    @let text = TextColor::for_background(&layer.color);
                    a.layer-chip.layer-off[off]
                        href=(toggle_layer_url(state, paper, &layer.color))
                        style={"background-color: " (layer.color) "; color: " (text.css())}
                        title=(layer.sample_title) {
                        (layer.label()) " (" (layer.event_count) ")"
                    }
                }
            }
        }
    }
}

// ========== views ==========

fn render_term_view(session: &CalendarSession, events: &[&Event], state: &ViewState) -> Markup {
    let terms: Vec<&Term> = match state.filter {
        PeriodFilter::Term(id) => session.term_by_id(id).into_iter().collect(),
        _ => session.terms().iter().collect(),
    };

    let options = GridOptions {
        hide_weekends: state.hide_weekends,
        show_week_numbers: true,
    };

    let mut sections = Vec::new();
    for term in terms {
        let term_events: Vec<&Event> = events
            .iter()
            .copied()
            .filter(|e| term.overlaps(e.start.date(), e.end.date()))
            .collect();
        sections.push((term, build_grid(term.start, term.end, &term_events, options)));
    }

    html! {
        @if session.terms().is_empty() {
            div.empty-state {
                p { "No term dates captured yet." }
            }
        } @else if sections.is_empty() {
            div.empty-state {
                p { "No events to display" }
            }
        }
        @for (term, grid) in &sections {
            section.period {
                h2 {
                    (term.name) " " (term.year)
                    span.date-range {
                        " (" (format_short(term.start)) " - " (format_short(term.end)) ")"
                    }
                }
                (render_grid(grid))
            }
        }
    }
}

fn render_monthly_view(events: &[&Event], state: &ViewState) -> Markup {
    let by_month = group_by_month(events);
    let options = GridOptions {
        hide_weekends: state.hide_weekends,
        show_week_numbers: false,
    };

    html! {
        @if by_month.is_empty() {
            div.empty-state {
                p { "No events to display" }
            }
        }
        @for (month, month_events) in &by_month {
            @if let Some((first, last)) = month.bounds() {
                @let grid = build_grid(first, last, month_events, options);
                section.period {
                    h2 { (first.format("%B %Y")) }
                    (render_grid(&grid))
                }
            }
        }
    }
}

fn render_weekly_view(events: &[&Event]) -> Markup {
    let by_week = group_by_week(events);

    html! {
        @if by_week.is_empty() {
            div.empty-state {
                p { "No events to display" }
            }
        }
        @for (week, week_events) in &by_week {
            section.period {
                h2 {
                    "Week " (week.week) ", " (week.year)
                    @if let Some((start, end)) = week.bounds() {
                        span.date-range {
                            " (" (format_short(start)) " - " (format_short(end)) ")"
                        }
                    }
                }
                @let by_day = group_by_day(week_events);
                @for (day, day_events) in &by_day {
                    div.day-group {
                        h3 { (day.format("%A, %-d %B %Y")) }
                        @for event in day_events {
                            (render_event_card(event))
                        }
                    }
                }
            }
        }
    }
}

fn render_daily_view(events: &[&Event]) -> Markup {
    let by_day = group_by_day(events);

    html! {
        @if by_day.is_empty() {
            div.empty-state {
                p { "No events to display" }
            }
        }
        @for (day, day_events) in &by_day {
            section.period {
                h2 { (day.format("%A, %-d %B %Y")) }
                @for event in day_events {
                    (render_event_card(event))
                }
            }
        }
    }
}

// ========== building blocks ==========

fn render_grid(grid: &Grid) -> Markup {
    let day_names: &[&str] = if grid.options.hide_weekends {
        &["Mon", "Tue", "Wed", "Thu", "Fri"]
    } else {
        &["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
    };

    html! {
        div.calendar-grid
            .weekdays-only[grid.options.hide_weekends]
            .with-week-numbers[grid.options.show_week_numbers] {
            @if grid.options.show_week_numbers {
                div.week-header-spacer {}
            }
            @for name in day_names {
                div.day-name { (name) }
            }
            @for week in &grid.weeks {
                @if grid.options.show_week_numbers {
                    div.week-number { "Week " (week.number) }
                }
                @for day in &week.days {
                    div.calendar-day.weekend[day.weekend].other-period[!day.in_period] {
                        div.day-number {
                            (day.date.day())
                            span.month-abbr { " " (day.date.format("%b")) }
                        }
                        @for day_event in &day.events {
                            (render_grid_event(day_event))
                        }
                    }
                }
            }
        }
    }
}

fn render_grid_event(day_event: &DayEvent) -> Markup {
    let event = day_event.event;
    let color = event.layer_color();

    html! {
        @if day_event.multi_day {
            @let text = TextColor::for_background(color);
            div.event.multi-day style={"background-color: " (color) "; color: " (text.css())} {
                @if day_event.show_time() {
                    span.event-time { (format_time(event.start)) " " }
                }
                (event.title)
                @if day_event.continues() { " →" }
            }
        } @else {
            @let pale = translucent(color);
            @let text = TextColor::for_background(&pale);
            div.event.single-day
                style={"background-color: " (pale) "; border-left-color: " (color) "; color: " (text.css())} {
                @if day_event.show_time() {
                    span.event-time { (format_time(event.start)) " " }
                }
                (event.title)
            }
        }
    }
}

fn render_event_card(event: &Event) -> Markup {
    let color = event.layer_color();

    html! {
        div.event-card
            style={"border-left-color: " (color) "; background-color: " (translucent(color))} {
            div.event-title { (event.title) }
            div.event-when {
                @if event.all_day {
                    "All Day"
                } @else {
                    (format_time(event.start)) " - " (format_time(event.end))
                }
            }
            @if let Some(location) = &event.location {
                div.event-location { "📍 " (location) }
            }
            @if let Some(description) = &event.description {
                div.event-description { (description) }
            }
        }
    }
}

// ========== helpers ==========

/// Reduce a color value to a token safe for a query string.
/// Works for hex colors and rgb()/rgba() strings alike, no escaping needed.
pub fn color_token(color: &str) -> String {
    color.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Disabled-layer tokens, sorted so the same state always renders the
/// same markup
fn off_param(state: &ViewState) -> String {
    let mut tokens: Vec<String> = state.disabled_colors.iter().map(|c| color_token(c)).collect();
    tokens.sort();
    tokens.join(",")
}

/// Link that flips one layer while carrying the rest of the view state
fn toggle_layer_url(state: &ViewState, paper: PaperSize, color: &str) -> String {
    let token = color_token(color);
    let mut tokens: Vec<String> = state
        .disabled_colors
        .iter()
        .map(|c| color_token(c))
        .filter(|t| *t != token)
        .collect();
    if !state.disabled_colors.contains(color) {
        tokens.push(token);
    }
    tokens.sort();
    format!(
        "/?view={}&period={}{}&paper={}&off={}",
        state.mode.as_str(),
        state.filter.key(),
        if state.hide_weekends { "&hide=1" } else { "" },
        paper.as_str(),
        tokens.join(",")
    )
}

/// Append a 22 alpha channel to 6-digit hex colors for pale fills.
/// Anything else passes through unchanged.
fn translucent(color: &str) -> String {
    let hex = match color.strip_prefix('#') {
        Some(hex) => hex,
        None => return color.to_string(),
    };
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("{}22", color)
    } else {
        color.to_string()
    }
}

fn format_short(date: NaiveDate) -> String {
    date.format("%-d %b").to_string()
}

fn format_time(at: NaiveDateTime) -> String {
    at.format("%-I:%M %P").to_string()
}

/// Friendly form of the capture timestamp, or the raw string when it
/// isn't RFC 3339
fn format_captured(timestamp: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(timestamp) {
        Ok(at) => at.format("%-d %b %Y, %-I:%M %P").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: #f1f3f5;
    color: #212529;
    line-height: 1.4;
    padding: 24px;
}

.container {
    max-width: 1600px;
    margin: 0 auto;
}

.toolbar {
    margin-bottom: 20px;
}

.toolbar-row {
    display: flex;
    align-items: baseline;
    justify-content: space-between;
    gap: 16px;
    flex-wrap: wrap;
}

h1 {
    font-size: 1.6em;
    font-weight: 700;
}

.captured-at {
    color: #868e96;
    font-size: 0.85em;
}

.stats {
    color: #868e96;
    font-size: 0.85em;
    margin-bottom: 12px;
}

#controls {
    display: flex;
    align-items: center;
    gap: 16px;
    flex-wrap: wrap;
    margin-bottom: 12px;
}

#controls label {
    display: flex;
    align-items: center;
    gap: 6px;
    font-size: 0.9em;
    color: #495057;
}

#controls select {
    padding: 4px 8px;
    border: 1px solid #ced4da;
    border-radius: 4px;
    background: #fff;
    font-size: 0.9em;
}

#controls button {
    padding: 6px 16px;
    border: 1px solid #1971c2;
    border-radius: 4px;
    background: #1c7ed6;
    color: #fff;
    font-size: 0.9em;
    cursor: pointer;
}

#controls button:hover {
    background: #1971c2;
}

.layer-chips {
    display: flex;
    flex-wrap: wrap;
    gap: 8px;
}

.layer-chip {
    display: inline-block;
    padding: 3px 10px;
    border-radius: 12px;
    font-size: 0.8em;
    text-decoration: none;
    border: 1px solid rgba(0, 0, 0, 0.15);
}

.layer-chip.layer-off {
    opacity: 0.35;
    filter: grayscale(0.8);
}

.period {
    margin-bottom: 32px;
}

.period h2 {
    font-size: 1.2em;
    margin-bottom: 10px;
}

.period h3 {
    font-size: 0.95em;
    color: #495057;
    margin-bottom: 8px;
}

.date-range {
    color: #868e96;
    font-size: 0.8em;
    font-weight: 400;
}

.day-group {
    margin-bottom: 16px;
}

.calendar-grid {
    display: grid;
    grid-template-columns: repeat(7, 1fr);
    gap: 2px;
    background: #dee2e6;
    border: 1px solid #dee2e6;
    border-radius: 4px;
    overflow: hidden;
}

.calendar-grid.weekdays-only {
    grid-template-columns: repeat(5, 1fr);
}

.calendar-grid.with-week-numbers {
    grid-template-columns: 70px repeat(7, 1fr);
}

.calendar-grid.weekdays-only.with-week-numbers {
    grid-template-columns: 70px repeat(5, 1fr);
}

.day-name,
.week-header-spacer {
    background: #495057;
    color: #fff;
    font-size: 0.75em;
    font-weight: 700;
    text-transform: uppercase;
    letter-spacing: 0.05em;
    padding: 6px 8px;
    text-align: center;
}

.week-number {
    background: #e9ecef;
    color: #868e96;
    font-size: 0.75em;
    font-weight: 700;
    padding: 8px 6px;
    text-align: center;
}

.calendar-day {
    background: #fff;
    min-height: 92px;
    padding: 4px 6px;
    font-size: 0.85em;
}

.calendar-day.weekend {
    background: #f8f9fa;
}

.calendar-day.other-period {
    background: #f1f3f5;
}

.calendar-day.other-period .day-number {
    color: #ced4da;
}

.day-number {
    font-weight: 700;
    font-size: 0.85em;
    color: #495057;
    margin-bottom: 4px;
}

.month-abbr {
    font-weight: 400;
    color: #adb5bd;
    font-size: 0.85em;
}

.event {
    border-radius: 3px;
    padding: 2px 6px;
    margin-bottom: 3px;
    font-size: 0.82em;
    line-height: 1.3;
    overflow-wrap: break-word;
}

.event.single-day {
    border-left: 3px solid transparent;
}

.event-time {
    font-weight: 700;
    font-size: 0.9em;
}

.event-card {
    border-left: 4px solid transparent;
    border-radius: 4px;
    padding: 10px 14px;
    margin-bottom: 10px;
}

.event-card .event-title {
    font-weight: 700;
}

.event-when {
    color: #495057;
    font-size: 0.85em;
    margin-top: 2px;
}

.event-location,
.event-description {
    color: #868e96;
    font-size: 0.85em;
    margin-top: 4px;
}

.empty-state {
    padding: 60px 20px;
    text-align: center;
    color: #868e96;
    background: #fff;
    border-radius: 4px;
}

body.paper-a3 {
    font-size: 18px;
}

body.paper-a3 .calendar-day {
    min-height: 120px;
}

@page {
    size: landscape;
    margin: 10mm;
}

@media print {
    body {
        background: #fff;
        padding: 0;
    }

    .no-print {
        display: none;
    }

    .container {
        max-width: none;
    }

    .period {
        page-break-after: always;
        margin-bottom: 0;
    }

    .period:last-child {
        page-break-after: auto;
    }

    .calendar-day {
        min-height: 80px;
    }

    .calendar-grid,
    .calendar-day,
    .day-name,
    .week-number,
    .event,
    .event-card {
        -webkit-print-color-adjust: exact;
        print-color-adjust: exact;
    }
}
"#;

const JAVASCRIPT: &str = r#"
// Re-render with the new settings as soon as a control changes
document.querySelectorAll('#controls select, #controls input[type="checkbox"]').forEach((el) => {
    el.addEventListener('change', () => el.form.submit());
});
"#;
