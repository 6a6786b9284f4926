//! Kelly criterion stake sizing.
//!
//! Stakes are computed at full, half and quarter Kelly against two
//! bankrolls: the fixed starting bankroll and the dynamic bankroll
//! (starting value plus realized P/L from the ledger).

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::debug;

use super::edge::Edge;
use crate::odds::decimal_odds;

/// Full Kelly fraction for win probability `p` priced at `market_odds`.
///
/// Kelly formula: f* = (bp - q) / b
/// where:
///   b = decimal odds - 1 (net payout per unit staked)
///   p = true win probability
///   q = 1 - p
///
/// Returns 0 when `b` is not positive.
pub fn kelly_fraction(p: f64, market_odds: f64) -> f64 {
    let b = decimal_odds(market_odds) - 1.0;
    if b <= 0.0 {
        return 0.0;
    }
    (b * p - (1.0 - p)) / b
}

/// Round a fraction to 4 dp for reporting.
pub fn round_fraction(fraction: f64) -> f64 {
    (fraction * 10_000.0).round() / 10_000.0
}

/// Stake at `bankroll × fraction × multiplier`, rounded to cents.
fn stake(bankroll: Decimal, fraction: Decimal, multiplier: Decimal) -> Decimal {
    (bankroll * fraction * multiplier).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Full, half and quarter Kelly stakes against one bankroll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wagers {
    pub full: Decimal,
    pub half: Decimal,
    pub quarter: Decimal,
}

impl Wagers {
    pub fn at(bankroll: Decimal, fraction: f64) -> Self {
        let fraction = Decimal::from_f64(fraction).unwrap_or(Decimal::ZERO);
        Self {
            full: stake(bankroll, fraction, Decimal::ONE),
            half: stake(bankroll, fraction, dec!(0.5)),
            quarter: stake(bankroll, fraction, dec!(0.25)),
        }
    }
}

/// Sized recommendation for one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedPick {
    pub edge: Edge,
    pub percent_full: f64,
    pub percent_half: f64,
    pub percent_quarter: f64,
    pub wagers: Wagers,
    pub dynamic_wagers: Wagers,
}

pub struct KellyCalculator {
    starting_bankroll: Decimal,
}

impl KellyCalculator {
    pub fn new(starting_bankroll: Decimal) -> Self {
        Self { starting_bankroll }
    }

    /// Size an edge against its market consensus price. `None` unless the
    /// Kelly fraction is strictly positive.
    pub fn size(&self, edge: &Edge, dynamic_bankroll: Decimal) -> Option<SizedPick> {
        let fraction = kelly_fraction(edge.true_prob, edge.market_consensus);
        if fraction <= 0.0 || !fraction.is_finite() {
            debug!(
                market = %edge.market,
                side = %edge.side,
                kelly = fraction,
                "Non-positive Kelly, no pick"
            );
            return None;
        }

        Some(SizedPick {
            edge: edge.clone(),
            percent_full: round_fraction(fraction),
            percent_half: round_fraction(fraction * 0.5),
            percent_quarter: round_fraction(fraction * 0.25),
            wagers: Wagers::at(self.starting_bankroll, fraction),
            dynamic_wagers: Wagers::at(dynamic_bankroll, fraction),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
