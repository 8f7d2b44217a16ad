use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use termgrid::ViewState;

mod capture;
mod html;
mod server;

#[derive(Parser, Debug)]
#[command(name = "termly")]
#[command(about = "Render captured school calendar data as a printable web view")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory the browser extension saves captures into
    #[arg(short, long, default_value = "captures", global = true)]
    captures_dir: PathBuf,

    /// Output directory for generated files
    #[arg(short, long, default_value = ".", global = true)]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Generate a static HTML calendar (no server)
    Build {
        /// View mode: term, monthly, weekly or daily
        #[arg(long, default_value = "term")]
        view: String,

        /// Period filter: all, term-{id} or year-{yyyy}
        #[arg(long, default_value = "all")]
        period: String,

        /// Leave Saturdays and Sundays out of the grid
        #[arg(long)]
        hide_weekends: bool,

        /// Paper size: a4 or a3
        #[arg(long, default_value = "a4")]
        paper: String,
    },

    /// Inspect a single capture file
    Parse {
        /// Path to the capture JSON file
        file: PathBuf,
    },
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    match args.command {
        // Default to serve if no command specified
        None => {
            server::serve(8080, args.captures_dir).await?;
        }
        Some(Commands::Serve { port }) => {
            server::serve(port, args.captures_dir).await?;
        }
        Some(Commands::Build {
            view,
            period,
            hide_weekends,
            paper,
        }) => {
            let snapshot = capture::load_latest(&args.captures_dir)?;
            let state = ViewState {
                mode: view.parse()?,
                filter: period.parse()?,
                hide_weekends,
                disabled_colors: HashSet::new(),
            };
            let html_path = args.output.join("calendar.html");
            html::generate_html(&snapshot, &state, html::PaperSize::parse(&paper), &html_path)?;
            info!(path = %html_path.display(), "Calendar saved");
        }
        Some(Commands::Parse { file }) => {
            let capture_file = capture::parse_capture(&file)?;
            let snapshot = capture::build_snapshot(capture_file);
            let session = &snapshot.session;
            info!(
                events = session.events().len(),
                terms = session.terms().len(),
                file = %file.display(),
                "Parsed capture"
            );
            for term in session.terms() {
                info!(
                    name = %term.name,
                    year = term.year,
                    start = %term.start,
                    end = %term.end,
                    "Term"
                );
            }
            for layer in session.layers() {
                info!(
                    color = %layer.color,
                    count = layer.event_count,
                    label = %layer.label(),
                    "Layer"
                );
            }
        }
    }

    Ok(())
}
