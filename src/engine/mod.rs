//! Core engine: one batch run over a quote snapshot.
//!
//! snapshot → grouped markets → dynamic bankroll → picks → ledger merge.
//! Everything is computed in memory first; files are written only once the
//! whole snapshot has been processed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::analytics::deviation_records;
use crate::config::AppConfig;
use crate::ledger::{Bankroll, PickLedger};
use crate::markets::{GroupedMarkets, MarketGrouper};
use crate::storage;
use crate::strategy::PickGenerator;
use crate::types::Event;

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub events: usize,
    pub games: usize,
    pub lines: usize,
    pub props: usize,
    pub picks_generated: usize,
    pub inserted: usize,
    pub improved: usize,
    pub replaced: usize,
    pub discarded: usize,
    pub ledger_size: usize,
    pub dynamic_bankroll: Decimal,
    pub deviations_logged: usize,
    pub timestamp: DateTime<Utc>,
}

impl RunReport {
    pub fn log(&self) {
        info!(
            events = self.events,
            games = self.games,
            lines = self.lines,
            props = self.props,
            picks = self.picks_generated,
            inserted = self.inserted,
            improved = self.improved,
            replaced = self.replaced,
            discarded = self.discarded,
            ledger = self.ledger_size,
            bankroll = format!("${:.2}", self.dynamic_bankroll),
            deviations = self.deviations_logged,
            "Run complete"
        );
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline<'a> {
    config: &'a AppConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Group the snapshot and merge new picks into `ledger`, in memory.
    pub fn process(&self, events: &[Event], ledger: &mut PickLedger, now: DateTime<Utc>) -> (GroupedMarkets, RunReport) {
        let pipeline = &self.config.pipeline;

        let markets = MarketGrouper::new(self.config).group(events);

        let bankroll = Bankroll::from_ledger(pipeline.starting_bankroll_amount(), ledger);
        info!(
            starting = format!("${:.2}", bankroll.starting),
            realized_pnl = format!("${:.2}", bankroll.realized_pnl),
            dynamic = format!("${:.2}", bankroll.dynamic()),
            "Bankroll computed from ledger"
        );

        let picks = PickGenerator::new(pipeline).generate(&markets.games, bankroll.dynamic(), now);
        let picks_generated = picks.len();
        let summary = ledger.merge_all(picks);

        let report = RunReport {
            events: events.len(),
            games: markets.games.len(),
            lines: markets.line_count(),
            props: markets.props.len(),
            picks_generated,
            inserted: summary.inserted,
            improved: summary.improved,
            replaced: summary.replaced,
            discarded: summary.discarded,
            ledger_size: ledger.len(),
            dynamic_bankroll: bankroll.dynamic(),
            deviations_logged: 0,
            timestamp: now,
        };
        (markets, report)
    }

    /// Full file-backed run using the configured paths.
    pub fn run(&self) -> Result<RunReport> {
        let files = &self.config.files;
        let now = Utc::now();

        let events = storage::load_snapshot(&files.snapshot)?;
        let mut ledger = storage::load_ledger(&files.ledger);

        let (markets, mut report) = self.process(&events, &mut ledger, now);

        storage::save_games(&files.games, &markets.games, now)?;
        storage::save_props(&files.props, &markets.props, now)?;
        storage::save_ledger(&files.ledger, &ledger)?;

        if self.config.pipeline.log_deviations {
            let rows = deviation_records(&markets.games, &markets.props, now);
            report.deviations_logged = storage::append_analytics(&files.analytics, &rows)?;
        }

        report.log();
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
