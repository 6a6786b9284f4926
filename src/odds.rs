//! American odds conversions.
//!
//! Stateless helpers between American odds, implied probability and
//! decimal odds, plus the per-book vig-free two-way line.

use crate::types::TwoWayOdds;

/// Implied probability of an American price.
///
/// `+150` → 0.4, `-150` → 0.6.
pub fn implied_probability(odds: f64) -> f64 {
    if odds >= 100.0 {
        100.0 / (odds + 100.0)
    } else {
        odds.abs() / (odds.abs() + 100.0)
    }
}

/// A finite American price with magnitude of at least 100. Anything in
/// (-100, 100) has no meaning and `0` would divide by zero.
pub fn is_valid_american(odds: f64) -> bool {
    odds.is_finite() && odds.abs() >= 100.0
}

/// Decimal (European) odds of an American price, stake included.
pub fn decimal_odds(odds: f64) -> f64 {
    if odds >= 100.0 {
        odds / 100.0 + 1.0
    } else {
        100.0 / odds.abs() + 1.0
    }
}

/// Convert a probability back to American odds, rounded to 4 dp.
///
/// Returns `None` outside the open interval (0, 1).
pub fn probability_to_american(p: f64) -> Option<f64> {
    if !p.is_finite() || p <= 0.0 || p >= 1.0 {
        return None;
    }
    let odds = if p >= 0.5 {
        -(p / (1.0 - p)) * 100.0
    } else {
        100.0 / p - 100.0
    };
    Some((odds * 10_000.0).round() / 10_000.0)
}

/// Remove the vig from one book's two-way price.
///
/// Both prices are required; the pair is scaled so the implied
/// probabilities sum to 1.
pub fn vig_free_two_way(odds_a: Option<f64>, odds_b: Option<f64>) -> Option<TwoWayOdds> {
    let (a, b) = (odds_a?, odds_b?);
    let prob_a = implied_probability(a);
    let prob_b = implied_probability(b);
    let total = prob_a + prob_b;
    if total <= 0.0 {
        return None;
    }
    let fair_a = prob_a / total;
    Some(TwoWayOdds {
        odds_a: probability_to_american(fair_a)?,
        odds_b: probability_to_american(1.0 - fair_a)?,
    })
}

/// Whether every price is a valid American price inside `[min, max]`.
pub fn within_band(prices: &[f64], min: f64, max: f64) -> bool {
    prices.iter().all(|&p| is_valid_american(p) && p >= min && p <= max)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
