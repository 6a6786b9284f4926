//! Shared types for the NOVA pipeline.
//!
//! Three groups live here: the raw quote snapshot handed over by the
//! odds fetcher, the canonical market records written for the dashboard,
//! and the small value types (sides, markets, points) that key everything
//! else. Pick ledger types live in `ledger`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

// ---------------------------------------------------------------------------
// Input snapshot
// ---------------------------------------------------------------------------

/// One real-world event with every bookmaker's quotes for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub sport_key: String,
    #[serde(default)]
    pub sport_title: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "skip_malformed")]
    pub bookmakers: Vec<BookmakerQuotes>,
}

/// All markets quoted by a single bookmaker for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmakerQuotes {
    pub key: String,
    #[serde(default, deserialize_with = "skip_malformed")]
    pub markets: Vec<MarketQuote>,
}

/// A single market (e.g. `h2h`, `alternate_spreads`, `player_points`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub key: String,
    #[serde(default, deserialize_with = "skip_malformed")]
    pub outcomes: Vec<Outcome>,
}

/// One priced outcome. Price is in American odds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<f64>,
}

/// Deserialize a quote list entry by entry, dropping entries that fail to
/// parse (a null price, a missing key) instead of the whole event.
fn skip_malformed<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "Skipping malformed quote entry");
                None
            }
        })
        .collect())
}

/// A market quote tagged with the bookmaker that offered it.
#[derive(Debug, Clone, Copy)]
pub struct BookMarket<'a> {
    pub bookmaker: &'a str,
    pub market: &'a MarketQuote,
}

impl Event {
    /// Flatten every bookmaker's markets into one list, tagged by book.
    pub fn book_markets(&self) -> Vec<BookMarket<'_>> {
        self.bookmakers
            .iter()
            .flat_map(|b| {
                b.markets.iter().map(move |m| BookMarket {
                    bookmaker: b.key.as_str(),
                    market: m,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Enums and keys
// ---------------------------------------------------------------------------

/// Side of a two-way line. A is home / Over, B is away / Under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub const BOTH: [Side; 2] = [Side::A, Side::B];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// Bookmaker credibility class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookType {
    Sharp,
    Market,
}

impl fmt::Display for BookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookType::Sharp => write!(f, "sharp"),
            BookType::Market => write!(f, "market"),
        }
    }
}

/// Canonical game-line market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMarket {
    Moneyline,
    Spreads,
    Totals,
}

impl GameMarket {
    pub const ALL: [GameMarket; 3] = [GameMarket::Moneyline, GameMarket::Spreads, GameMarket::Totals];

    /// Key used in output records and pick identifiers.
    pub fn key(&self) -> &'static str {
        match self {
            GameMarket::Moneyline => "moneyline",
            GameMarket::Spreads => "spreads",
            GameMarket::Totals => "totals",
        }
    }

    /// Raw provider market keys folded into this canonical market.
    pub fn source_keys(&self) -> &'static [&'static str] {
        match self {
            GameMarket::Moneyline => &["h2h"],
            GameMarket::Spreads => &["spreads", "alternate_spreads"],
            GameMarket::Totals => &["totals", "alternate_totals"],
        }
    }

    /// Point as quoted for `side`, given the line's side-A point.
    /// Spreads flip sign for the away side; totals share one number.
    pub fn point_for_side(&self, point: Option<LinePoint>, side: Side) -> Option<LinePoint> {
        match (self, side) {
            (GameMarket::Spreads, Side::B) => point.map(|p| p.negate()),
            _ => point,
        }
    }
}

impl fmt::Display for GameMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A line's point value with a total order, usable as a map key.
///
/// `-0.0` is folded into `0.0` so that a pick'em spread and its negation
/// share one key.
#[derive(Debug, Clone, Copy)]
pub struct LinePoint(f64);

impl LinePoint {
    pub fn new(value: f64) -> Self {
        if value == 0.0 {
            Self(0.0)
        } else {
            Self(value)
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn negate(&self) -> Self {
        Self::new(-self.0)
    }
}

impl PartialEq for LinePoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LinePoint {}

impl PartialOrd for LinePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LinePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for LinePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for LinePoint {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// Odds pairs
// ---------------------------------------------------------------------------

/// A two-sided line in American odds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoWayOdds {
    pub odds_a: f64,
    pub odds_b: f64,
}

impl TwoWayOdds {
    pub fn new(odds_a: f64, odds_b: f64) -> Self {
        Self { odds_a, odds_b }
    }

    pub fn side(&self, side: Side) -> f64 {
        match side {
            Side::A => self.odds_a,
            Side::B => self.odds_b,
        }
    }
}

impl fmt::Display for TwoWayOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.0} / {:+.0}", self.odds_a, self.odds_b)
    }
}

/// An over/under consensus line in American odds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverUnderOdds {
    pub over: f64,
    pub under: f64,
}

impl From<TwoWayOdds> for OverUnderOdds {
    fn from(odds: TwoWayOdds) -> Self {
        Self {
            over: odds.odds_a,
            under: odds.odds_b,
        }
    }
}

/// A single book's raw over/under prices; either side may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverUnderQuote {
    pub over: Option<f64>,
    pub under: Option<f64>,
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// One contributing book's price on a game line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookLine {
    pub bookmaker: String,
    #[serde(rename = "type")]
    pub book_type: BookType,
    pub vig_odds: TwoWayOdds,
    pub true_odds: Option<TwoWayOdds>,
}

/// A canonical game line: moneyline, or one spread/total point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<f64>,
    /// Sharp books, vig removed.
    pub true_odds: TwoWayOdds,
    /// Market books, raw.
    pub market_odds: TwoWayOdds,
    /// Market books, vig removed.
    pub true_market_odds: TwoWayOdds,
    /// EV-tab weighting table, vig removed.
    pub ev_tab_true_odds: TwoWayOdds,
    pub sharp_book_count: usize,
    pub bookmaker_odds: Vec<BookLine>,
}

impl Line {
    pub fn line_point(&self) -> Option<LinePoint> {
        self.point.map(LinePoint::new)
    }

    /// Number of contributing books classed as `market`.
    pub fn market_book_count(&self) -> usize {
        self.bookmaker_odds
            .iter()
            .filter(|b| b.book_type == BookType::Market)
            .count()
    }
}

/// All canonical game lines for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub sport: String,
    pub team_a: String,
    pub team_b: String,
    pub game_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moneyline: Vec<Line>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spreads: Vec<Line>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub totals: Vec<Line>,
}

impl GameRecord {
    pub fn lines(&self, market: GameMarket) -> &[Line] {
        match market {
            GameMarket::Moneyline => &self.moneyline,
            GameMarket::Spreads => &self.spreads,
            GameMarket::Totals => &self.totals,
        }
    }

    pub fn has_lines(&self) -> bool {
        !(self.moneyline.is_empty() && self.spreads.is_empty() && self.totals.is_empty())
    }
}

/// One book's price on a prop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropBookLine {
    pub bookmaker: String,
    #[serde(rename = "type")]
    pub book_type: Option<BookType>,
    pub vig_odds: OverUnderQuote,
    pub true_odds: Option<OverUnderOdds>,
}

/// A two-way (over/under, yes/no) player prop at one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoWayProp {
    pub prop_id: String,
    pub game_id: String,
    pub sport: String,
    pub game_time: DateTime<Utc>,
    pub team_a: String,
    pub team_b: String,
    pub player: Option<String>,
    pub market: String,
    pub point: Option<f64>,
    pub true_odds: OverUnderOdds,
    pub market_odds: Option<OverUnderOdds>,
    pub true_market_odds: Option<OverUnderOdds>,
    pub ev_tab_true_odds: OverUnderOdds,
    pub bookmaker_odds: Vec<PropBookLine>,
}

/// One entrant of a multi-outcome market such as first touchdown scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneWayProp {
    pub prop_id: String,
    pub game_id: String,
    pub sport: String,
    pub game_time: DateTime<Utc>,
    pub team_a: String,
    pub team_b: String,
    pub player: String,
    pub market: String,
    pub point: Option<f64>,
    pub true_prob: f64,
    pub bookmaker_odds: Vec<PropBookLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropRecord {
    TwoWay(TwoWayProp),
    OneWay(OneWayProp),
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for NOVA.
#[derive(Debug, thiserror::Error)]
pub enum NovaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot contains no events: {0}")]
    EmptySnapshot(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
