//! Bookmaker deviation analytics.
//!
//! For every emitted game line and two-way prop, compares each book's own
//! vig-free probability with the sharp consensus, one row per side. Rows
//! accumulate across runs into a historical dataset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::odds::implied_probability;
use crate::types::{GameMarket, GameRecord, PropRecord, Side, TwoWayOdds};

/// One book's deviation from the consensus on one side of one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviationRecord {
    pub timestamp: DateTime<Utc>,
    pub game_id: String,
    pub sport: String,
    pub market_key: String,
    pub point: Option<f64>,
    pub player: Option<String>,
    pub bookmaker: String,
    pub side: Side,
    pub bookmaker_true_prob: f64,
    pub nova_line_true_prob: f64,
    /// `bookmaker_true_prob - nova_line_true_prob`
    pub deviation: f64,
}

/// Shared context for the rows of one line.
struct LineContext<'a> {
    game_id: &'a str,
    sport: &'a str,
    market_key: &'a str,
    point: Option<f64>,
    player: Option<&'a str>,
}

/// Build every deviation row for one run.
pub fn deviation_records(games: &[GameRecord], props: &[PropRecord], timestamp: DateTime<Utc>) -> Vec<DeviationRecord> {
    let mut rows = Vec::new();

    for game in games {
        for market in GameMarket::ALL {
            for line in game.lines(market) {
                let ctx = LineContext {
                    game_id: &game.id,
                    sport: &game.sport,
                    market_key: market.key(),
                    point: line.point,
                    player: None,
                };
                let books = line.bookmaker_odds.iter().filter_map(|b| Some((b.bookmaker.as_str(), b.true_odds?)));
                push_rows(&mut rows, &ctx, line.true_odds, books, timestamp);
            }
        }
    }

    for prop in props {
        // One-way props have no complementary side to compare.
        let PropRecord::TwoWay(prop) = prop else {
            continue;
        };
        let ctx = LineContext {
            game_id: &prop.game_id,
            sport: &prop.sport,
            market_key: &prop.market,
            point: prop.point,
            player: prop.player.as_deref(),
        };
        let consensus = TwoWayOdds::new(prop.true_odds.over, prop.true_odds.under);
        let books = prop.bookmaker_odds.iter().filter_map(|b| {
            let fair = b.true_odds?;
            Some((b.bookmaker.as_str(), TwoWayOdds::new(fair.over, fair.under)))
        });
        push_rows(&mut rows, &ctx, consensus, books, timestamp);
    }

    rows
}

fn push_rows<'a>(
    rows: &mut Vec<DeviationRecord>,
    ctx: &LineContext<'_>,
    consensus: TwoWayOdds,
    books: impl Iterator<Item = (&'a str, TwoWayOdds)>,
    timestamp: DateTime<Utc>,
) {
    for (bookmaker, fair) in books {
        for side in Side::BOTH {
            let book_prob = implied_probability(fair.side(side));
            let nova_prob = implied_probability(consensus.side(side));
            rows.push(DeviationRecord {
                timestamp,
                game_id: ctx.game_id.to_string(),
                sport: ctx.sport.to_string(),
                market_key: ctx.market_key.to_string(),
                point: ctx.point,
                player: ctx.player.map(str::to_string),
                bookmaker: bookmaker.to_string(),
                side,
                bookmaker_true_prob: book_prob,
                nova_line_true_prob: nova_prob,
                deviation: book_prob - nova_prob,
            });
        }
    }
}
