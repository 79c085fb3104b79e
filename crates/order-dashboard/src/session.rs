//! # Dashboard Session
//!
//! One loaded dataset and the date range currently applied to it. Every
//! range change recomputes the full report from the filtered dataset.

use crate::error::Result;
use chrono::{NaiveDate, Utc};
use order_analytics::{AnalyticsEngine, DashboardReport};
use order_domain::{DateRange, DomainError};
use std::path::Path;
use tracing::info;

/// Input accepted by the interactive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Apply a new date range
    Apply(DateRange),
    /// Go back to the full dataset range
    Reset,
    /// Leave the loop
    Quit,
}

impl Command {
    /// Parse one line: `START END`, `START,END`, `reset` or `quit`.
    pub fn parse(line: &str) -> std::result::Result<Self, DomainError> {
        match line.trim() {
            "q" | "quit" | "exit" => Ok(Self::Quit),
            "reset" | "all" => Ok(Self::Reset),
            other => DateRange::parse(other).map(Self::Apply),
        }
    }
}

/// A single user's dashboard: its own engine, nothing shared.
pub struct DashboardSession {
    engine: AnalyticsEngine,
    bounds: Option<DateRange>,
    range: DateRange,
}

impl DashboardSession {
    /// Load the dataset. Any load failure is fatal and happens before a
    /// single panel is computed.
    pub fn open(path: &Path) -> Result<Self> {
        let engine = AnalyticsEngine::from_csv(path)?;
        Self::with_engine(engine)
    }

    /// Wrap an already populated engine.
    pub fn with_engine(engine: AnalyticsEngine) -> Result<Self> {
        let bounds = engine.date_bounds()?;
        let range = bounds.unwrap_or_else(|| DateRange::single_day(Utc::now().date_naive()));
        info!(
            rows = engine.row_count()?,
            range = %range,
            "Dashboard session ready"
        );
        Ok(Self {
            engine,
            bounds,
            range,
        })
    }

    /// First and last purchase date of the whole dataset.
    #[must_use]
    pub fn bounds(&self) -> Option<DateRange> {
        self.bounds
    }

    /// Range currently applied.
    #[must_use]
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Fill missing ends from the dataset bounds, like date pickers that
    /// default to the first and last purchase date.
    pub fn resolve_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<DateRange> {
        let default = self
            .bounds
            .unwrap_or_else(|| DateRange::single_day(Utc::now().date_naive()));
        Ok(DateRange::new(
            start.unwrap_or(default.start),
            end.unwrap_or(default.end),
        )?)
    }

    /// Apply a range and recompute every panel.
    pub fn apply(&mut self, range: DateRange) -> Result<DashboardReport> {
        info!(range = %range, days = range.days(), "Applying date range");
        self.range = range;
        self.refresh()
    }

    /// Recompute every panel for the current range.
    pub fn refresh(&self) -> Result<DashboardReport> {
        Ok(self.engine.generate_report(&self.range)?)
    }

    /// Handle one interactive command. `None` means quit.
    pub fn handle(&mut self, command: Command) -> Result<Option<DashboardReport>> {
        match command {
            Command::Apply(range) => self.apply(range).map(Some),
            Command::Reset => {
                let range = self.resolve_range(None, None)?;
                self.apply(range).map(Some)
            }
            Command::Quit => Ok(None),
        }
    }
}
