//! Edge detection on finished game lines.
//!
//! Compares the sharp vig-free consensus against the vig-free market-book
//! consensus, side by side, and finds the best executable price.

use tracing::debug;

use crate::config::PipelineConfig;
use crate::odds::{decimal_odds, implied_probability, is_valid_american};
use crate::types::{GameMarket, Line, LinePoint, Side};

// ---------------------------------------------------------------------------
// Edge detection
// ---------------------------------------------------------------------------

/// Positive-edge side of one canonical line.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub market: GameMarket,
    /// Point as quoted for `side` (spreads side B is negated).
    pub point: Option<LinePoint>,
    pub side: Side,
    /// Sharp vig-free probability.
    pub true_prob: f64,
    /// Market-book vig-free probability.
    pub market_prob: f64,
    pub edge: f64,
    /// Sharp consensus price for the side, American odds.
    pub nova_consensus: f64,
    /// Market-book vig-free consensus price for the side, American odds.
    pub market_consensus: f64,
}

/// Highest-paying book for a side.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPrice {
    pub bookmaker: String,
    pub odds: f64,
}

pub struct EdgeDetector {
    min_edge: f64,
    min_sharp_books: usize,
    min_market_books: usize,
}

impl EdgeDetector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_edge: config.min_edge,
            min_sharp_books: config.min_sharp_books,
            min_market_books: config.min_market_books,
        }
    }

    /// Book-count gate, re-checked on the finished line.
    pub fn is_eligible(&self, line: &Line) -> bool {
        line.sharp_book_count >= self.min_sharp_books && line.market_book_count() >= self.min_market_books
    }

    /// Every side of `line` at or above the minimum edge.
    pub fn find_edges(&self, market: GameMarket, line: &Line) -> Vec<Edge> {
        if !self.is_eligible(line) {
            return Vec::new();
        }
        Side::BOTH
            .iter()
            .filter_map(|side| self.detect_edge(market, line, *side))
            .collect()
    }

    fn detect_edge(&self, market: GameMarket, line: &Line, side: Side) -> Option<Edge> {
        let nova_consensus = line.true_odds.side(side);
        let market_consensus = line.true_market_odds.side(side);
        let true_prob = implied_probability(nova_consensus);
        let market_prob = implied_probability(market_consensus);
        let edge = true_prob - market_prob;

        if edge < self.min_edge {
            return None;
        }

        let point = market.point_for_side(line.line_point(), side);
        debug!(
            market = %market,
            point = ?point.map(|p| p.value()),
            side = %side,
            edge = format!("{:.2}%", edge * 100.0),
            "Edge found"
        );

        Some(Edge {
            market,
            point,
            side,
            true_prob,
            market_prob,
            edge,
            nova_consensus,
            market_consensus,
        })
    }
}

// ---------------------------------------------------------------------------
// Best price
// ---------------------------------------------------------------------------

/// The contributing book paying the most on `side`, skipping excluded books
/// and invalid prices. Ties keep the first book listed.
pub fn best_price(line: &Line, side: Side, config: &PipelineConfig) -> Option<BestPrice> {
    line.bookmaker_odds
        .iter()
        .filter(|b| !config.is_excluded(&b.bookmaker))
        .map(|b| (b, b.vig_odds.side(side)))
        .filter(|(_, odds)| is_valid_american(*odds))
        .fold(None, |best: Option<(&str, f64)>, (book, odds)| match best {
            Some((_, best_odds)) if decimal_odds(odds) <= decimal_odds(best_odds) => best,
            _ => Some((book.bookmaker.as_str(), odds)),
        })
        .map(|(bookmaker, odds)| BestPrice {
            bookmaker: bookmaker.to_string(),
            odds,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BookLine, BookType, TwoWayOdds};

    fn book(name: &str, book_type: BookType, a: f64, b: f64) -> BookLine {
        BookLine {
            bookmaker: name.into(),
            book_type,
            vig_odds: TwoWayOdds::new(a, b),
            true_odds: None,
        }
    }

    /// 3 sharp + 5 market books, sharp line -150/+150 vs market -120/+120.
    fn make_line(point: Option<f64>) -> Line {
        let mut books = vec![
            book("pinnacle", BookType::Sharp, -155.0, 135.0),
            book("novig", BookType::Sharp, -150.0, 140.0),
            book("prophetx", BookType::Sharp, -152.0, 138.0),
        ];
        for (name, b) in [("betmgm", 105.0), ("fanduel", 110.0), ("draftkings", 108.0), ("betway", 150.0), ("fliff", 110.0)] {
            books.push(book(name, BookType::Market, -130.0, b));
        }
        Line {
            point,
            true_odds: TwoWayOdds::new(-150.0, 150.0),
            market_odds: TwoWayOdds::new(-130.0, 110.0),
            true_market_odds: TwoWayOdds::new(-120.0, 120.0),
            ev_tab_true_odds: TwoWayOdds::new(-148.0, 148.0),
            sharp_book_count: 3,
            bookmaker_odds: books,
        }
    }

    #[test]
    fn test_edge_on_favoured_side_only() {
        let detector = EdgeDetector::new(&PipelineConfig::default());
        let edges = detector.find_edges(GameMarket::Moneyline, &make_line(None));
        assert_eq!(edges.len(), 1);
        let e = &edges[0];
        assert_eq!(e.side, Side::A);
        assert!((e.true_prob - 0.6).abs() < 1e-9);
        assert!((e.edge - (0.6 - 120.0 / 220.0)).abs() < 1e-9);
        assert_eq!(e.nova_consensus, -150.0);
        assert_eq!(e.market_consensus, -120.0);
        assert_eq!(e.point, None);
    }

    #[test]
    fn test_min_edge_threshold() {
        let config = PipelineConfig {
            min_edge: 0.06,
            ..Default::default()
        };
        let detector = EdgeDetector::new(&config);
        assert!(detector.find_edges(GameMarket::Moneyline, &make_line(None)).is_empty());
    }

    #[test]
    fn test_gate_rechecked() {
        let detector = EdgeDetector::new(&PipelineConfig::default());
        let mut line = make_line(None);
        line.bookmaker_odds.pop();
        assert!(!detector.is_eligible(&line));
        assert!(detector.find_edges(GameMarket::Moneyline, &line).is_empty());

        let mut line = make_line(None);
        line.sharp_book_count = 2;
        assert!(detector.find_edges(GameMarket::Moneyline, &line).is_empty());
    }

    #[test]
    fn test_spread_side_b_point_negated() {
        let mut line = make_line(Some(3.5));
        line.true_odds = TwoWayOdds::new(150.0, -150.0);
        line.true_market_odds = TwoWayOdds::new(120.0, -120.0);
        let detector = EdgeDetector::new(&PipelineConfig::default());
        let edges = detector.find_edges(GameMarket::Spreads, &line);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].side, Side::B);
        assert_eq!(edges[0].point, Some(LinePoint::new(-3.5)));

        let totals = detector.find_edges(GameMarket::Totals, &line);
        assert_eq!(totals[0].point, Some(LinePoint::new(3.5)));
    }

    #[test]
    fn test_best_price_skips_excluded_books() {
        let config = PipelineConfig::default();
        let line = make_line(None);
        // betway quotes +150 on B but is excluded.
        let best = best_price(&line, Side::B, &config).unwrap();
        assert_eq!(best.bookmaker, "novig");
        assert_eq!(best.odds, 140.0);

        let best_a = best_price(&line, Side::A, &config).unwrap();
        assert_eq!(best_a.bookmaker, "betmgm");
        assert_eq!(best_a.odds, -130.0);
    }

    #[test]
    fn test_best_price_none_when_all_excluded() {
        let config = PipelineConfig {
            excluded_books: vec!["only".into()],
            ..Default::default()
        };
        let mut line = make_line(None);
        line.bookmaker_odds = vec![book("only", BookType::Market, -110.0, -110.0)];
        assert!(best_price(&line, Side::A, &config).is_none());
    }

    #[test]
    fn test_best_price_ignores_invalid_odds() {
        let config = PipelineConfig::default();
        let mut line = make_line(None);
        line.bookmaker_odds.insert(0, book("fanatics", BookType::Market, 0.0, 50.0));
        let best = best_price(&line, Side::A, &config).unwrap();
        assert_eq!(best.bookmaker, "betmgm");
        assert_eq!(best.odds, -130.0);
        let best_b = best_price(&line, Side::B, &config).unwrap();
        assert_eq!(best_b.odds, 140.0);

        line.bookmaker_odds = vec![book("fanatics", BookType::Market, 0.0, 0.0)];
        assert!(best_price(&line, Side::A, &config).is_none());
    }
}
