//! One-way (multi-entrant) props such as first touchdown scorer.
//!
//! Entrants are not complementary pairs, so each sharp book's overround is
//! removed by dividing every entrant's implied probability by the sum of
//! that book's implied probabilities across all entrants it quotes. The
//! normalized probabilities are then averaged with the EV-tab sharp weights.

use std::collections::HashMap;

use tracing::debug;

use crate::config::AppConfig;
use crate::odds::{implied_probability, within_band};
use crate::types::{BookMarket, BookType, Event, OneWayProp, OverUnderQuote, PropBookLine};

/// One book's price on one entrant.
#[derive(Debug, Clone, Copy)]
struct EntrantQuote<'a> {
    bookmaker: &'a str,
    price: f64,
}

/// Every entrant with sharp coverage, across all one-way markets of an event.
pub fn one_way_props(event: &Event, book_markets: &[BookMarket<'_>], config: &AppConfig) -> Vec<OneWayProp> {
    // market key -> entrants in first-seen order
    let mut markets: Vec<(&str, Vec<(&str, Vec<EntrantQuote<'_>>)>)> = Vec::new();
    for m in book_markets {
        let idx = match markets.iter().position(|(key, _)| *key == m.market.key) {
            Some(idx) => idx,
            None => {
                markets.push((m.market.key.as_str(), Vec::new()));
                markets.len() - 1
            }
        };
        let entrants = &mut markets[idx].1;
        for outcome in &m.market.outcomes {
            let name = outcome.description.as_deref().unwrap_or(&outcome.name);
            let quote = EntrantQuote {
                bookmaker: m.bookmaker,
                price: outcome.price,
            };
            match entrants.iter_mut().find(|(entrant, _)| *entrant == name) {
                Some((_, quotes)) => quotes.push(quote),
                None => entrants.push((name, vec![quote])),
            }
        }
    }

    markets
        .iter()
        .flat_map(|(market, entrants)| price_market(event, market, entrants, config))
        .collect()
}

fn price_market(
    event: &Event,
    market: &str,
    entrants: &[(&str, Vec<EntrantQuote<'_>>)],
    config: &AppConfig,
) -> Vec<OneWayProp> {
    let pipeline = &config.pipeline;
    let weights = &config.weights;
    let in_band = |q: &EntrantQuote<'_>| within_band(&[q.price], pipeline.min_odds, pipeline.max_odds);

    // Each sharp book's overround across all entrants it prices.
    let mut book_totals: HashMap<&str, f64> = HashMap::new();
    for (entrant, quotes) in entrants {
        for q in quotes {
            if !in_band(q) {
                debug!(event_id = %event.id, market, entrant, bookmaker = q.bookmaker, "Ignoring outlier one-way odds");
                continue;
            }
            if let Some((BookType::Sharp, _)) = weights.props.classify(q.bookmaker, &event.sport_key) {
                *book_totals.entry(q.bookmaker).or_default() += implied_probability(q.price);
            }
        }
    }

    let mut props = Vec::new();
    for (entrant, quotes) in entrants {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for q in quotes.iter().filter(|q| in_band(*q)) {
            let Some((BookType::Sharp, weight)) = weights.ev_tab.classify(q.bookmaker, &event.sport_key) else {
                continue;
            };
            let Some(&book_total) = book_totals.get(q.bookmaker).filter(|t| **t > 0.0) else {
                continue;
            };
            weighted += implied_probability(q.price) / book_total * weight;
            total_weight += weight;
        }

        if total_weight <= 0.0 {
            debug!(event_id = %event.id, market, entrant, "No sharp coverage for entrant");
            continue;
        }

        props.push(OneWayProp {
            prop_id: format!("{}-{market}-{entrant}", event.id),
            game_id: event.id.clone(),
            sport: event.sport_title.clone(),
            game_time: event.commence_time,
            team_a: event.home_team.clone(),
            team_b: event.away_team.clone(),
            player: entrant.to_string(),
            market: market.to_string(),
            point: None,
            true_prob: weighted / total_weight,
            bookmaker_odds: quotes
                .iter()
                .map(|q| PropBookLine {
                    bookmaker: q.bookmaker.to_string(),
                    book_type: weights.props.get(q.bookmaker).map(|w| w.book_type),
                    vig_odds: OverUnderQuote {
                        over: Some(q.price),
                        under: None,
                    },
                    true_odds: None,
                })
                .collect(),
        });
    }
    props
}
