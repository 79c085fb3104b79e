//! Order Analytics Dashboard CLI
//!
//! Loads the order dataset, applies a date range and renders the eight
//! dashboard panels. In interactive mode every new range read from stdin
//! recomputes all panels.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use order_dashboard::{Command, Config, DashboardSession, OutputFormat, output};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "order-dashboard")]
#[command(about = "Customer purchase analytics dashboard")]
#[command(version = order_dashboard::VERSION)]
struct Args {
    /// Order dataset (delimited file with a header row)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// First purchase date to include (YYYY-MM-DD), defaults to the earliest
    #[arg(short, long)]
    start: Option<NaiveDate>,

    /// Last purchase date to include (YYYY-MM-DD), defaults to the latest
    #[arg(short, long)]
    end: Option<NaiveDate>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Directory for HTML charts
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Read new date ranges from stdin and re-render after each one
    #[arg(short, long)]
    interactive: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env();

    init_tracing(&config.log_level, args.json_logs || config.log_json);

    let data_path = args.data.unwrap_or(config.data_path);
    let format = args.format.unwrap_or(config.format);
    let output_dir = args.output_dir.unwrap_or(config.output_dir);

    info!(
        version = order_dashboard::VERSION,
        data = %data_path.display(),
        format = %format,
        "Starting order dashboard"
    );

    let mut session = DashboardSession::open(&data_path)
        .with_context(|| format!("failed to load {}", data_path.display()))?;

    let range = session.resolve_range(args.start, args.end)?;
    let report = session.apply(range)?;
    print!("{}", output::render(&report, format, &output_dir)?);

    if args.interactive {
        run_interactive(&mut session, format, &output_dir)?;
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays clean for the rendered panels
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run_interactive(
    session: &mut DashboardSession,
    format: OutputFormat,
    output_dir: &std::path::Path,
) -> Result<()> {
    let stdin = std::io::stdin();
    prompt(session)?;

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            prompt(session)?;
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                error!("{e}");
                prompt(session)?;
                continue;
            }
        };

        match session.handle(command)? {
            Some(report) => print!("{}", output::render(&report, format, output_dir)?),
            None => break,
        }
        prompt(session)?;
    }

    info!("Dashboard session closed");
    Ok(())
}

fn prompt(session: &DashboardSession) -> Result<()> {
    let mut stderr = std::io::stderr();
    write!(
        stderr,
        "[{}] enter START END (YYYY-MM-DD), 'reset' or 'quit': ",
        session.range()
    )?;
    stderr.flush()?;
    Ok(())
}
