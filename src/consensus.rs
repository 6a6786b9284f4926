//! Weighted consensus lines.
//!
//! Two aggregators are kept deliberately distinct:
//!
//! * [`two_sided_consensus`] averages complete two-way quotes (game lines)
//!   and, when asked, always rescales the pair to sum to 1.
//! * [`over_under_consensus`] averages separate over and under pools (props,
//!   where a book may quote a single side) and only rescales when the
//!   averaged pair sums to more than 1.

use crate::odds::{implied_probability, probability_to_american};
use crate::types::{OverUnderOdds, TwoWayOdds};

/// One book's complete two-way quote with its weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPair {
    pub odds_a: f64,
    pub odds_b: f64,
    pub weight: f64,
}

/// One book's single-side quote with its weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPrice {
    pub odds: f64,
    pub weight: f64,
}

/// Weighted average of a pool of two-way quotes.
///
/// Returns `None` for an empty pool, a zero total weight, or a degenerate
/// averaged probability.
pub fn two_sided_consensus(pool: &[WeightedPair], remove_vig: bool) -> Option<TwoWayOdds> {
    let mut total_weight = 0.0;
    let mut weighted_a = 0.0;
    let mut weighted_b = 0.0;

    for item in pool {
        let prob_a = implied_probability(item.odds_a);
        let prob_b = implied_probability(item.odds_b);
        if prob_a == 0.0 || prob_b == 0.0 {
            continue;
        }
        weighted_a += prob_a * item.weight;
        weighted_b += prob_b * item.weight;
        total_weight += item.weight;
    }

    if total_weight <= 0.0 {
        return None;
    }

    let mut prob_a = weighted_a / total_weight;
    let mut prob_b = weighted_b / total_weight;

    if remove_vig {
        let total = prob_a + prob_b;
        if total > 0.0 {
            prob_a /= total;
            prob_b /= total;
        }
    }

    Some(TwoWayOdds {
        odds_a: probability_to_american(prob_a)?,
        odds_b: probability_to_american(prob_b)?,
    })
}

/// Weighted average of independent over and under pools.
///
/// The under side is always reported as the complement of the final over
/// probability.
pub fn over_under_consensus(
    over_pool: &[WeightedPrice],
    under_pool: &[WeightedPrice],
    remove_vig: bool,
) -> Option<OverUnderOdds> {
    if over_pool.is_empty() || under_pool.is_empty() {
        return None;
    }

    let avg_over = weighted_average(over_pool)?;
    let avg_under = weighted_average(under_pool)?;

    let mut final_over = avg_over;
    if remove_vig {
        let total = avg_over + avg_under;
        if total > 1.0 {
            final_over = avg_over / total;
        }
    }

    Some(OverUnderOdds {
        over: probability_to_american(final_over)?,
        under: probability_to_american(1.0 - final_over)?,
    })
}

fn weighted_average(pool: &[WeightedPrice]) -> Option<f64> {
    let (sum, weight) = pool.iter().fold((0.0, 0.0), |(s, w), item| {
        (s + implied_probability(item.odds) * item.weight, w + item.weight)
    });
    if weight <= 0.0 {
        None
    } else {
        Some(sum / weight)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
