//! Moneyline, spread and total lines.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{build_line, BookPair};
use crate::config::AppConfig;
use crate::types::{BookMarket, Event, GameMarket, Line, LinePoint, Outcome, Side};

/// The event's single moneyline, priced home (A) vs away (B).
pub fn moneyline(event: &Event, book_markets: &[BookMarket<'_>], config: &AppConfig) -> Option<Line> {
    let quotes: Vec<BookPair<'_>> = book_markets
        .iter()
        .filter(|m| quotes_market(m, GameMarket::Moneyline))
        .filter_map(|m| {
            let home = m.market.outcomes.iter().find(|o| o.name == event.home_team)?;
            let away = m.market.outcomes.iter().find(|o| o.name == event.away_team)?;
            Some(BookPair {
                bookmaker: m.bookmaker,
                odds_a: home.price,
                odds_b: away.price,
            })
        })
        .collect();

    if quotes.is_empty() {
        return None;
    }
    build_line(event, GameMarket::Moneyline, None, &quotes, config)
}

/// Every spread or total point that passes the book-count gate.
///
/// Main and alternate markets are merged. Within each book, a side-A
/// outcome (home team, or Over) is paired with the side-B outcome at the
/// complementary point: negated for spreads, identical for totals. Lines
/// come back in ascending point order.
pub fn grouped_lines(
    event: &Event,
    book_markets: &[BookMarket<'_>],
    market: GameMarket,
    config: &AppConfig,
) -> Vec<Line> {
    let mut by_book: Vec<(&str, Vec<&Outcome>)> = Vec::new();
    for m in book_markets.iter().filter(|m| quotes_market(m, market)) {
        match by_book.iter_mut().find(|(book, _)| *book == m.bookmaker) {
            Some((_, outcomes)) => outcomes.extend(m.market.outcomes.iter()),
            None => by_book.push((m.bookmaker, m.market.outcomes.iter().collect())),
        }
    }

    let mut lines_by_point: BTreeMap<LinePoint, Vec<BookPair<'_>>> = BTreeMap::new();
    for (bookmaker, outcomes) in &by_book {
        let mut seen = BTreeSet::new();
        for a in outcomes.iter().filter(|o| is_side(o, event, market, Side::A)) {
            let Some(point) = a.point.map(LinePoint::new) else {
                continue;
            };
            if seen.contains(&point) {
                continue;
            }
            let opposite = market.point_for_side(Some(point), Side::B);
            let paired = outcomes
                .iter()
                .filter(|o| is_side(o, event, market, Side::B))
                .find(|o| o.point.map(LinePoint::new) == opposite);
            if let Some(b) = paired {
                lines_by_point.entry(point).or_default().push(BookPair {
                    bookmaker,
                    odds_a: a.price,
                    odds_b: b.price,
                });
                seen.insert(point);
            }
        }
    }

    lines_by_point
        .into_iter()
        .filter_map(|(point, quotes)| build_line(event, market, Some(point.value()), &quotes, config))
        .collect()
}

/// The line quoted by the most books. Ties keep the earlier line.
pub fn main_line(lines: &[Line]) -> Option<&Line> {
    lines.iter().reduce(|best, line| {
        if line.bookmaker_odds.len() > best.bookmaker_odds.len() {
            line
        } else {
            best
        }
    })
}

/// Drop alternate lines further than `range` from the main line's point.
pub fn filter_alt_lines(lines: Vec<Line>, range: f64) -> Vec<Line> {
    if lines.len() <= 1 {
        return lines;
    }
    let Some(main_point) = main_line(&lines).and_then(|l| l.point) else {
        return lines;
    };

    let (lower, upper) = (main_point - range, main_point + range);
    let before = lines.len();
    let kept: Vec<Line> = lines
        .into_iter()
        .filter(|l| l.point.is_some_and(|p| p >= lower && p <= upper))
        .collect();

    if kept.len() < before {
        debug!(main_point, dropped = before - kept.len(), "Alt lines outside range dropped");
    }
    kept
}

fn quotes_market(m: &BookMarket<'_>, market: GameMarket) -> bool {
    market.source_keys().contains(&m.market.key.as_str())
}

fn is_side(outcome: &Outcome, event: &Event, market: GameMarket, side: Side) -> bool {
    let (team, total_name) = match side {
        Side::A => (&event.home_team, "Over"),
        Side::B => (&event.away_team, "Under"),
    };
    outcome.name == *team || (market == GameMarket::Totals && outcome.name == total_name)
}
