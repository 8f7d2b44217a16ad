use axum::extract::{Query, State};
use axum::{response::Html, routing::get, Router};
use chrono::NaiveDate;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use termgrid::{CalendarSession, Event, PeriodFilter, Term, ViewState};

use crate::capture::{self, Snapshot};
use crate::html::{self, PaperSize};

/// Application state shared across requests
pub struct AppState {
    pub snapshot: RwLock<Snapshot>,
    pub captures_dir: PathBuf,
}

/// Start the web server with capture watching
pub async fn serve(port: u16, captures_dir: PathBuf) -> anyhow::Result<()> {
    // Load the newest capture on startup
    println!("Scanning captures directory...");
    let snapshot = capture::load_latest(&captures_dir)?;
    info!(
        events = snapshot.session.events().len(),
        terms = snapshot.session.terms().len(),
        "Session loaded"
    );

    let state = Arc::new(AppState {
        snapshot: RwLock::new(snapshot),
        captures_dir: captures_dir.clone(),
    });

    // Start capture watcher
    let watcher_state = state.clone();
    start_capture_watcher(watcher_state)?;

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("\nServer running at http://{}", addr);
    println!("Watching {}/ for new captures...", captures_dir.display());
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/events", get(events_handler))
        .route("/api/terms", get(terms_handler))
        .route("/api/refresh", get(refresh_handler))
        .with_state(state)
}

/// Start watching the captures directory for new files
fn start_capture_watcher(state: Arc<AppState>) -> anyhow::Result<()> {
    if !state.captures_dir.exists() {
        std::fs::create_dir_all(&state.captures_dir)?;
        println!("Created {}/ directory", state.captures_dir.display());
    }

    // Create a channel to receive events
    let (tx, mut rx) = tokio::sync::mpsc::channel(10);

    // Spawn a blocking task for the file watcher
    let watch_dir = state.captures_dir.clone();
    std::thread::spawn(move || {
        let tx_clone = tx.clone();
        let mut debouncer = new_debouncer(
            Duration::from_secs(2),
            move |result: DebounceEventResult| {
                if let Ok(events) = result {
                    // Check if any event is for a capture file
                    let has_capture = events.iter().any(|e| {
                        e.path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .map(capture::is_capture_name)
                            .unwrap_or(false)
                    });

                    if has_capture {
                        let _ = tx_clone.blocking_send(());
                    }
                }
            },
        )
        .expect("Failed to create debouncer");

        debouncer
            .watcher()
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .expect("Failed to watch captures directory");

        // Keep the watcher alive
        loop {
            std::thread::sleep(Duration::from_secs(60));
        }
    });

    // Spawn a task to handle capture change notifications
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            info!("Captures changed, reloading");
            match capture::load_latest(&state.captures_dir) {
                Ok(new_snapshot) => {
                    let mut snapshot = state.snapshot.write().await;
                    let old_count = snapshot.session.events().len();
                    let new_count = new_snapshot.session.events().len();
                    *snapshot = new_snapshot;
                    info!(
                        events = new_count,
                        delta = new_count as i64 - old_count as i64,
                        "Session reloaded"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Failed to reload captures");
                }
            }
        }
    });

    Ok(())
}

/// View settings as they arrive in the query string
#[derive(Debug, Clone, Default, Deserialize)]
struct ViewQuery {
    view: Option<String>,
    period: Option<String>,
    hide: Option<String>,
    paper: Option<String>,
    off: Option<String>,
}

/// Resolve query parameters against the session.
///
/// Without an explicit period the view opens on the term containing today,
/// falling back to all events. Unknown values fall back to defaults rather
/// than erroring, so stale links keep working after a re-capture; a term id
/// the current capture no longer has gets the same no-period treatment.
fn view_state_from_query(
    query: &ViewQuery,
    session: &CalendarSession,
    today: NaiveDate,
) -> (ViewState, PaperSize) {
    let mode = query
        .view
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();

    let parsed = query.period.as_deref().and_then(|key| key.parse().ok());
    let filter = match parsed {
        Some(PeriodFilter::Term(id)) if session.term_by_id(id).is_none() => None,
        other => other,
    }
    .unwrap_or_else(|| {
        session
            .current_term(today)
            .map(|t| PeriodFilter::Term(t.id))
            .unwrap_or_default()
    });

    let mut disabled_colors = HashSet::new();
    if let Some(off) = query.off.as_deref() {
        for token in off.split(',').filter(|t| !t.is_empty()) {
            for layer in session.layers() {
                if html::color_token(&layer.color) == token {
                    disabled_colors.insert(layer.color.clone());
                }
            }
        }
    }

    let state = ViewState {
        mode,
        filter,
        hide_weekends: query.hide.is_some(),
        disabled_colors,
    };
    let paper = query
        .paper
        .as_deref()
        .map(PaperSize::parse)
        .unwrap_or_default();

    (state, paper)
}

/// Serve the calendar page
async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Html<String> {
    let snapshot = state.snapshot.read().await;
    let today = chrono::Local::now().date_naive();
    let (view_state, paper) = view_state_from_query(&query, &snapshot.session, today);
    let markup = html::render_page(&snapshot, &view_state, paper);
    Html(markup.into_string())
}

/// Return normalized events as JSON
async fn events_handler(State(state): State<Arc<AppState>>) -> axum::Json<Vec<Event>> {
    let snapshot = state.snapshot.read().await;
    axum::Json(snapshot.session.events().to_vec())
}

/// Return normalized terms as JSON
async fn terms_handler(State(state): State<Arc<AppState>>) -> axum::Json<Vec<Term>> {
    let snapshot = state.snapshot.read().await;
    axum::Json(snapshot.session.terms().to_vec())
}

/// Reload captures from disk (manual trigger)
async fn refresh_handler(State(state): State<Arc<AppState>>) -> &'static str {
    info!("Manual refresh triggered");

    match capture::load_latest(&state.captures_dir) {
        Ok(new_snapshot) => {
            let mut snapshot = state.snapshot.write().await;
            *snapshot = new_snapshot;
            "OK"
        }
        Err(e) => {
            warn!(error = %e, "Refresh failed");
            "ERROR"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use hyper::{Request, StatusCode};
    use tempfile::TempDir;
    use termgrid::{RawEvent, RawTerm};
    use tower::ServiceExt;

    fn sample_session() -> CalendarSession {
        let events = vec![RawEvent {
            title: "Assembly".to_string(),
            start: "2024-02-05T09:00:00".to_string(),
            finish: "2024-02-05T10:00:00".to_string(),
            background_color: Some("#dce6f4".to_string()),
            all_day: false,
            location: None,
            description: None,
        }];
        let terms = vec![RawTerm {
            id: 1,
            name: "Term 1".to_string(),
            year: 2024,
            start: "29/01/2024".to_string(),
            finish: "28/03/2024".to_string(),
        }];
        CalendarSession::from_raw(&events, &terms)
    }

    fn test_state(captures_dir: PathBuf) -> Arc<AppState> {
        Arc::new(AppState {
            snapshot: RwLock::new(Snapshot {
                session: sample_session(),
                captured_at: None,
            }),
            captures_dir,
        })
    }

    // ========== handler tests ==========

    #[tokio::test]
    async fn test_index_serves_calendar_page() {
        let app = router(test_state(PathBuf::from("captures")));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("Assembly"));
        assert!(page.contains("Term 1 2024"));
    }

    #[tokio::test]
    async fn test_index_honors_query_parameters() {
        let app = router(test_state(PathBuf::from("captures")));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/?view=monthly&period=year-2024&hide=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("February 2024"));
        assert!(page.contains("calendar-grid weekdays-only"));
    }

    #[tokio::test]
    async fn test_events_endpoint_returns_json() {
        let app = router(test_state(PathBuf::from("captures")));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let events: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["title"], "Assembly");
    }

    #[tokio::test]
    async fn test_terms_endpoint_returns_json() {
        let app = router(test_state(PathBuf::from("captures")));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/terms")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let terms: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0]["name"], "Term 1");
    }

    #[tokio::test]
    async fn test_refresh_reloads_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(temp_dir.path().to_path_buf());
        let app = router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");

        // Empty directory replaces the session with an empty one
        assert!(state.snapshot.read().await.session.is_empty());
    }

    // ========== query parsing tests ==========

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_view_state_defaults() {
        let session = sample_session();
        let query = ViewQuery::default();

        // Today is past every captured term, so no current term preselects
        let (state, paper) = view_state_from_query(&query, &session, date(2025, 6, 2));

        assert_eq!(state.filter, PeriodFilter::All);
        assert!(!state.hide_weekends);
        assert!(state.disabled_colors.is_empty());
        assert_eq!(paper, PaperSize::A4);
    }

    #[test]
    fn test_view_state_preselects_current_term() {
        let session = sample_session();
        let query = ViewQuery::default();

        let (state, _) = view_state_from_query(&query, &session, date(2024, 2, 6));

        assert_eq!(state.filter, PeriodFilter::Term(1));
    }

    #[test]
    fn test_view_state_explicit_values() {
        let session = sample_session();
        let query = ViewQuery {
            view: Some("weekly".to_string()),
            period: Some("term-1".to_string()),
            hide: Some("1".to_string()),
            paper: Some("a3".to_string()),
            off: Some("dce6f4".to_string()),
        };

        let (state, paper) = view_state_from_query(&query, &session, date(2025, 6, 2));

        assert_eq!(state.mode, termgrid::ViewMode::Weekly);
        assert_eq!(state.filter, PeriodFilter::Term(1));
        assert!(state.hide_weekends);
        assert!(state.disabled_colors.contains("#dce6f4"));
        assert_eq!(paper, PaperSize::A3);
    }

    #[test]
    fn test_view_state_stale_term_id_reanchors() {
        let session = sample_session();
        let query = ViewQuery {
            period: Some("term-99".to_string()),
            ..ViewQuery::default()
        };

        // A link made against an older capture: inside a term it re-anchors
        // to that term, otherwise it falls back to showing everything
        let (state, _) = view_state_from_query(&query, &session, date(2024, 2, 6));
        assert_eq!(state.filter, PeriodFilter::Term(1));

        let (state, _) = view_state_from_query(&query, &session, date(2025, 6, 2));
        assert_eq!(state.filter, PeriodFilter::All);
    }

    #[test]
    fn test_view_state_ignores_garbage() {
        let session = sample_session();
        let query = ViewQuery {
            view: Some("yearly".to_string()),
            period: Some("term-next".to_string()),
            hide: None,
            paper: Some("letter".to_string()),
            off: Some(",unknown,".to_string()),
        };

        let (state, paper) = view_state_from_query(&query, &session, date(2025, 6, 2));

        assert_eq!(state.mode, termgrid::ViewMode::Term);
        assert_eq!(state.filter, PeriodFilter::All);
        assert!(state.disabled_colors.is_empty());
        assert_eq!(paper, PaperSize::A4);
    }
}
