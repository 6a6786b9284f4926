//! Two-way player props (over/under, yes/no).

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::AppConfig;
use crate::consensus::{over_under_consensus, WeightedPrice};
use crate::odds::{vig_free_two_way, within_band};
use crate::types::{BookMarket, BookType, Event, LinePoint, OverUnderOdds, OverUnderQuote, PropBookLine, TwoWayProp};

/// Grouping key for one prop line within an event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PropKey<'a> {
    market: &'a str,
    player: Option<&'a str>,
    point: Option<LinePoint>,
}

/// Which half of a two-way prop an outcome name refers to.
fn prop_side(name: &str) -> Option<bool> {
    match name.to_ascii_lowercase().as_str() {
        "over" | "yes" => Some(true),
        "under" | "no" => Some(false),
        _ => None,
    }
}

pub fn prop_id(game_id: &str, market: &str, player: Option<&str>, point: Option<LinePoint>) -> String {
    let point = point.map(|p| p.to_string()).unwrap_or_else(|| "null".into());
    format!("{game_id}-{market}-{}-{point}", player.unwrap_or("null"))
}

/// Every two-way prop for one event with a sharp and an EV-tab consensus.
///
/// Unlike game lines there is no book-count gate: a prop is kept as soon as
/// the pools can produce a consensus.
pub fn two_way_props(event: &Event, book_markets: &[BookMarket<'_>], config: &AppConfig) -> Vec<TwoWayProp> {
    // Per prop line, each book's over/under prices. First quote wins.
    let mut grouped: BTreeMap<PropKey<'_>, Vec<(&str, OverUnderQuote)>> = BTreeMap::new();
    for m in book_markets {
        for outcome in &m.market.outcomes {
            let Some(is_over) = prop_side(&outcome.name) else {
                continue;
            };
            let key = PropKey {
                market: m.market.key.as_str(),
                player: outcome.description.as_deref(),
                point: outcome.point.map(LinePoint::new),
            };
            let books = grouped.entry(key).or_default();
            let idx = match books.iter().position(|(b, _)| *b == m.bookmaker) {
                Some(idx) => idx,
                None => {
                    books.push((m.bookmaker, OverUnderQuote::default()));
                    books.len() - 1
                }
            };
            let slot = if is_over { &mut books[idx].1.over } else { &mut books[idx].1.under };
            slot.get_or_insert(outcome.price);
        }
    }

    grouped
        .into_iter()
        .filter_map(|(key, quotes)| price_prop(event, &key, &quotes, config))
        .collect()
}

fn price_prop(
    event: &Event,
    key: &PropKey<'_>,
    quotes: &[(&str, OverUnderQuote)],
    config: &AppConfig,
) -> Option<TwoWayProp> {
    let pipeline = &config.pipeline;
    let weights = &config.weights;

    let (mut sharp_over, mut sharp_under) = (Vec::new(), Vec::new());
    let (mut market_over, mut market_under) = (Vec::new(), Vec::new());
    let (mut ev_over, mut ev_under) = (Vec::new(), Vec::new());
    let mut books = Vec::new();

    for (bookmaker, quote) in quotes {
        let Some((book_type, weight)) = weights.props.classify(bookmaker, &event.sport_key) else {
            continue;
        };

        books.push(PropBookLine {
            bookmaker: bookmaker.to_string(),
            book_type: Some(book_type),
            vig_odds: *quote,
            true_odds: vig_free_two_way(quote.over, quote.under).map(OverUnderOdds::from),
        });

        let present: Vec<f64> = quote.over.into_iter().chain(quote.under).collect();
        if !within_band(&present, pipeline.min_odds, pipeline.max_odds) {
            debug!(
                event_id = %event.id,
                market = key.market,
                player = ?key.player,
                bookmaker,
                "Ignoring outlier prop odds"
            );
            continue;
        }

        let (over_pool, under_pool) = match book_type {
            BookType::Sharp => (&mut sharp_over, &mut sharp_under),
            BookType::Market => (&mut market_over, &mut market_under),
        };
        if let Some(odds) = quote.over {
            over_pool.push(WeightedPrice { odds, weight });
        }
        if let Some(odds) = quote.under {
            under_pool.push(WeightedPrice { odds, weight });
        }

        if let Some((_, ev_weight)) = weights.ev_tab.classify(bookmaker, &event.sport_key) {
            if let Some(odds) = quote.over {
                ev_over.push(WeightedPrice { odds, weight: ev_weight });
            }
            if let Some(odds) = quote.under {
                ev_under.push(WeightedPrice { odds, weight: ev_weight });
            }
        }
    }

    if books.is_empty() {
        return None;
    }
    let true_odds = over_under_consensus(&sharp_over, &sharp_under, true)?;
    let ev_tab_true_odds = over_under_consensus(&ev_over, &ev_under, true)?;

    Some(TwoWayProp {
        prop_id: prop_id(&event.id, key.market, key.player, key.point),
        game_id: event.id.clone(),
        sport: event.sport_title.clone(),
        game_time: event.commence_time,
        team_a: event.home_team.clone(),
        team_b: event.away_team.clone(),
        player: key.player.map(str::to_string),
        market: key.market.to_string(),
        point: key.point.map(|p| p.value()),
        true_odds,
        market_odds: over_under_consensus(&market_over, &market_under, false),
        true_market_odds: over_under_consensus(&market_over, &market_under, true),
        ev_tab_true_odds,
        bookmaker_odds: books,
    })
}
