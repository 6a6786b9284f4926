//! Strategy engine: edge detection and Kelly sizing over game lines.

pub mod edge;
pub mod kelly;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::ledger::Pick;
use crate::types::{GameMarket, GameRecord, Line};
use edge::{best_price, BestPrice, EdgeDetector};
use kelly::{KellyCalculator, SizedPick};

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Pipelines edge detection → best price → Kelly sizing → pick record.
///
/// Only game lines (moneyline, spreads, totals) produce picks.
pub struct PickGenerator<'a> {
    config: &'a PipelineConfig,
    edge_detector: EdgeDetector,
    kelly: KellyCalculator,
}

impl<'a> PickGenerator<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            edge_detector: EdgeDetector::new(config),
            kelly: KellyCalculator::new(config.starting_bankroll_amount()),
        }
    }

    /// Every positive-edge, positive-Kelly side across `games`, stamped with
    /// `logged_at`.
    pub fn generate(&self, games: &[GameRecord], dynamic_bankroll: Decimal, logged_at: DateTime<Utc>) -> Vec<Pick> {
        let mut picks = Vec::new();
        let mut lines_checked = 0usize;

        for game in games {
            for market in GameMarket::ALL {
                for line in game.lines(market) {
                    lines_checked += 1;
                    picks.extend(self.picks_for_line(game, market, line, dynamic_bankroll, logged_at));
                }
            }
        }

        info!(
            games = games.len(),
            lines = lines_checked,
            picks = picks.len(),
            dynamic_bankroll = %dynamic_bankroll,
            "Pick generation complete"
        );
        picks
    }

    fn picks_for_line(
        &self,
        game: &GameRecord,
        market: GameMarket,
        line: &Line,
        dynamic_bankroll: Decimal,
        logged_at: DateTime<Utc>,
    ) -> Vec<Pick> {
        let mut picks = Vec::new();
        for edge in self.edge_detector.find_edges(market, line) {
            let Some(best) = best_price(line, edge.side, self.config) else {
                debug!(game_id = %game.id, market = %market, side = %edge.side, "No eligible book for best price");
                continue;
            };
            if let Some(sized) = self.kelly.size(&edge, dynamic_bankroll) {
                picks.push(build_pick(game, line, &sized, best, logged_at));
            }
        }
        picks
    }
}

/// Assemble the stored pick record.
fn build_pick(game: &GameRecord, line: &Line, sized: &SizedPick, best: BestPrice, logged_at: DateTime<Utc>) -> Pick {
    let edge = &sized.edge;
    let mut pick = Pick {
        pick_id: String::new(),
        game_id: game.id.clone(),
        sport: game.sport.clone(),
        game_time: game.game_time,
        team_a: game.team_a.clone(),
        team_b: game.team_b.clone(),
        market_key: edge.market,
        point: edge.point.map(|p| p.value()),
        side: edge.side,
        odds: best.odds,
        bookmaker: best.bookmaker,
        bookmaker_count: line.bookmaker_odds.len(),
        edge: edge.edge,
        nova_consensus: edge.nova_consensus,
        market_consensus: edge.market_consensus,
        wager_full: sized.wagers.full,
        percent_full: sized.percent_full,
        wager_half: sized.wagers.half,
        percent_half: sized.percent_half,
        wager_quarter: sized.wagers.quarter,
        percent_quarter: sized.percent_quarter,
        wager_full_dynamic: Some(sized.dynamic_wagers.full),
        wager_half_dynamic: Some(sized.dynamic_wagers.half),
        wager_quarter_dynamic: Some(sized.dynamic_wagers.quarter),
        logged_at,
        result: None,
        extra: serde_json::Map::new(),
    };
    pick.pick_id = pick.key().to_string();
    pick
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
