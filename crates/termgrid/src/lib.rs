//! Termgrid - Calendar grid engine for captured school calendar data.
//!
//! Takes the raw event and term records a capture delivers, normalizes them
//! into a [`CalendarSession`], and turns them into plain structured data for
//! the four calendar views: week-by-week grids for the term and monthly
//! views, and day/week/month buckets for the list views. Rendering is left
//! entirely to the caller; nothing in here produces markup or does I/O.

pub mod color;
pub mod grid;
pub mod group;
pub mod session;
pub mod types;

pub use color::TextColor;
pub use grid::{build_grid, Grid, GridDay, GridOptions, GridWeek};
pub use session::CalendarSession;
pub use types::{
    ColorLayer, Event, ParseKeyError, PeriodFilter, RawEvent, RawTerm, Term, ViewMode, ViewState,
};
