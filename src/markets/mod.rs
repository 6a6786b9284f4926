//! Market grouping.
//!
//! Reshapes one event's flat per-bookmaker quotes into canonical markets:
//! a moneyline, spread and total lines (main plus nearby alternates),
//! two-way player props and one-way (multi-entrant) props. Each canonical
//! line is priced through the consensus engine.

pub mod game_lines;
pub mod one_way;
pub mod props;

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::consensus::{two_sided_consensus, WeightedPair};
use crate::odds::{vig_free_two_way, within_band};
use crate::types::{BookLine, BookType, Event, GameMarket, GameRecord, Line, PropRecord, TwoWayOdds};

/// Prefixes identifying player prop markets.
const PROP_PREFIXES: &[&str] = &["player_", "batter_", "pitcher_"];

pub fn is_prop_market(key: &str) -> bool {
    PROP_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Everything computed from one snapshot.
#[derive(Debug, Clone, Default)]
pub struct GroupedMarkets {
    pub games: Vec<GameRecord>,
    pub props: Vec<PropRecord>,
}

impl GroupedMarkets {
    pub fn line_count(&self) -> usize {
        self.games
            .iter()
            .map(|g| g.moneyline.len() + g.spreads.len() + g.totals.len())
            .sum()
    }
}

/// One book's complete two-way price on a single line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookPair<'a> {
    pub bookmaker: &'a str,
    pub odds_a: f64,
    pub odds_b: f64,
}

pub struct MarketGrouper<'a> {
    config: &'a AppConfig,
}

impl<'a> MarketGrouper<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Group every event in the snapshot.
    pub fn group(&self, events: &[Event]) -> GroupedMarkets {
        let mut out = GroupedMarkets::default();
        for event in events {
            if let Some(game) = self.group_game_lines(event) {
                out.games.push(game);
            }
            out.props.extend(self.group_props(event));
        }
        info!(
            events = events.len(),
            games = out.games.len(),
            lines = out.line_count(),
            props = out.props.len(),
            "Markets grouped"
        );
        out
    }

    /// Moneyline, spreads and totals for one event. `None` when no line
    /// survives the gates.
    pub fn group_game_lines(&self, event: &Event) -> Option<GameRecord> {
        let book_markets = event.book_markets();
        let pipeline = &self.config.pipeline;

        let moneyline = game_lines::moneyline(event, &book_markets, self.config)
            .map(|l| vec![l])
            .unwrap_or_default();
        let spreads = game_lines::filter_alt_lines(
            game_lines::grouped_lines(event, &book_markets, GameMarket::Spreads, self.config),
            pipeline.alt_line_range,
        );
        let totals = game_lines::filter_alt_lines(
            game_lines::grouped_lines(event, &book_markets, GameMarket::Totals, self.config),
            pipeline.alt_line_range,
        );

        let record = GameRecord {
            id: event.id.clone(),
            sport: event.sport_title.clone(),
            team_a: event.home_team.clone(),
            team_b: event.away_team.clone(),
            game_time: event.commence_time,
            moneyline,
            spreads,
            totals,
        };

        if record.has_lines() {
            Some(record)
        } else {
            debug!(event_id = %event.id, "No game lines passed the gates");
            None
        }
    }

    /// Two-way and one-way props for one event.
    pub fn group_props(&self, event: &Event) -> Vec<PropRecord> {
        let book_markets = event.book_markets();
        let (one_way_quotes, two_way_quotes): (Vec<_>, Vec<_>) = book_markets
            .into_iter()
            .filter(|m| is_prop_market(&m.market.key))
            .partition(|m| self.config.pipeline.is_one_way(&m.market.key));

        let mut records: Vec<PropRecord> = props::two_way_props(event, &two_way_quotes, self.config)
            .into_iter()
            .map(PropRecord::TwoWay)
            .collect();
        records.extend(
            one_way::one_way_props(event, &one_way_quotes, self.config)
                .into_iter()
                .map(PropRecord::OneWay),
        );
        records
    }
}

/// Price one canonical game line from the books quoting it.
///
/// Books missing from the game-line weight table are ignored, and books
/// with a price outside the outlier band are rejected entirely. The line
/// is dropped unless enough sharp and market books remain.
pub(crate) fn build_line(
    event: &Event,
    market: GameMarket,
    point: Option<f64>,
    quotes: &[BookPair<'_>],
    config: &AppConfig,
) -> Option<Line> {
    let pipeline = &config.pipeline;
    let weights = &config.weights;

    let mut sharp = Vec::new();
    let mut market_pool = Vec::new();
    let mut ev_tab = Vec::new();
    let mut books = Vec::new();

    for quote in quotes {
        let Some((book_type, weight)) = weights.game_lines.classify(quote.bookmaker, &event.sport_key)
        else {
            continue;
        };

        if !within_band(&[quote.odds_a, quote.odds_b], pipeline.min_odds, pipeline.max_odds) {
            debug!(
                event_id = %event.id,
                market = %market,
                point = ?point,
                bookmaker = quote.bookmaker,
                "Ignoring outlier odds"
            );
            continue;
        }

        let pair = WeightedPair {
            odds_a: quote.odds_a,
            odds_b: quote.odds_b,
            weight,
        };
        match book_type {
            BookType::Sharp => sharp.push(pair),
            BookType::Market => market_pool.push(pair),
        }

        if let Some((_, ev_weight)) = weights.ev_tab.classify(quote.bookmaker, &event.sport_key) {
            ev_tab.push(WeightedPair { weight: ev_weight, ..pair });
        }

        books.push(BookLine {
            bookmaker: quote.bookmaker.to_string(),
            book_type,
            vig_odds: TwoWayOdds::new(quote.odds_a, quote.odds_b),
            true_odds: vig_free_two_way(Some(quote.odds_a), Some(quote.odds_b)),
        });
    }

    if sharp.len() < pipeline.min_sharp_books || market_pool.len() < pipeline.min_market_books {
        debug!(
            event_id = %event.id,
            market = %market,
            point = ?point,
            sharp = sharp.len(),
            market_books = market_pool.len(),
            "Not enough books for consensus"
        );
        return None;
    }

    Some(Line {
        point,
        true_odds: two_sided_consensus(&sharp, true)?,
        market_odds: two_sided_consensus(&market_pool, false)?,
        true_market_odds: two_sided_consensus(&market_pool, true)?,
        ev_tab_true_odds: two_sided_consensus(&ev_tab, true)?,
        sharp_book_count: sharp.len(),
        bookmaker_odds: books,
    })
}
