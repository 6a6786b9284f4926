//! Pick ledger.
//!
//! A persisted, keyed collection of recommended picks. New picks are merged
//! so that at most one side of any canonical line is live at a time, and the
//! side with the larger edge wins. Settlement fields (`result`, `pnl_*`) are
//! written by an external grader; they are carried through untouched, as is
//! any field this crate does not know about.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::types::{GameMarket, LinePoint, Side};

// ---------------------------------------------------------------------------
// Pick record
// ---------------------------------------------------------------------------

/// Graded outcome of a settled pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PickResult {
    Win,
    Loss,
    Push,
}

/// One recommended wager as stored in the ledger file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pick {
    pub pick_id: String,
    pub game_id: String,
    pub sport: String,
    pub game_time: DateTime<Utc>,
    pub team_a: String,
    pub team_b: String,
    pub market_key: GameMarket,
    /// Point as quoted for `side`.
    pub point: Option<f64>,
    pub side: Side,
    /// Best executable price, American odds.
    pub odds: f64,
    pub bookmaker: String,
    pub bookmaker_count: usize,
    pub edge: f64,
    pub nova_consensus: f64,
    pub market_consensus: f64,

    #[serde(rename = "wager_full", deserialize_with = "lenient::decimal")]
    pub wager_full: Decimal,
    #[serde(rename = "percent_full", deserialize_with = "lenient::float")]
    pub percent_full: f64,
    #[serde(rename = "wager_half", deserialize_with = "lenient::decimal")]
    pub wager_half: Decimal,
    #[serde(rename = "percent_half", deserialize_with = "lenient::float")]
    pub percent_half: f64,
    #[serde(rename = "wager_quarter", deserialize_with = "lenient::decimal")]
    pub wager_quarter: Decimal,
    #[serde(rename = "percent_quarter", deserialize_with = "lenient::float")]
    pub percent_quarter: f64,
    // Absent on picks logged before dynamic sizing existed.
    #[serde(rename = "wager_full_dynamic", default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_decimal")]
    pub wager_full_dynamic: Option<Decimal>,
    #[serde(rename = "wager_half_dynamic", default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_decimal")]
    pub wager_half_dynamic: Option<Decimal>,
    #[serde(rename = "wager_quarter_dynamic", default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_decimal")]
    pub wager_quarter_dynamic: Option<Decimal>,

    pub logged_at: DateTime<Utc>,
    pub result: Option<PickResult>,

    /// Fields owned by other tools, preserved verbatim. This includes the
    /// grader's `pnl_*` amounts, which are never re-encoded.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Pick {
    pub fn key(&self) -> PickKey {
        PickKey {
            game_id: self.game_id.clone(),
            market: self.market_key,
            point: self.point.map(LinePoint::new),
            side: self.side,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.result.is_some()
    }

    /// Realized full-Kelly P/L on the dynamic bankroll, as written by the
    /// grader.
    pub fn pnl_full_dynamic(&self) -> Option<Decimal> {
        self.extra.get(PNL_FULL_DYNAMIC).and_then(lenient::value_to_decimal)
    }
}

const PNL_FULL_DYNAMIC: &str = "pnl_full_dynamic";

/// Older ledgers store stakes and fractions as fixed-point strings
/// (`"550.00"`); newer ones as numbers. Both are accepted, at the precision
/// they were written with.
mod lenient {
    use rust_decimal::prelude::*;
    use serde::de::{self, Deserializer};
    use serde::Deserialize;
    use serde_json::{Number, Value};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(Number),
        Str(String),
    }

    impl NumOrStr {
        fn into_decimal<E: de::Error>(self) -> Result<Decimal, E> {
            let text = match self {
                NumOrStr::Num(n) => n.to_string(),
                NumOrStr::Str(s) => s,
            };
            parse_decimal(&text).ok_or_else(|| E::custom(format!("invalid amount: {text}")))
        }
    }

    /// Shortest-form number text parses exactly; `1e-7` style needs the
    /// scientific parser.
    fn parse_decimal(text: &str) -> Option<Decimal> {
        let text = text.trim();
        text.parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(text))
            .ok()
    }

    pub fn value_to_decimal(value: &Value) -> Option<Decimal> {
        match value {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s),
            _ => None,
        }
    }

    pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
        NumOrStr::deserialize(d)?.into_decimal()
    }

    pub fn opt_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
        Option::<NumOrStr>::deserialize(d)?.map(NumOrStr::into_decimal).transpose()
    }

    pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match NumOrStr::deserialize(d)? {
            NumOrStr::Num(n) => n
                .as_f64()
                .ok_or_else(|| de::Error::custom(format!("invalid number: {n}"))),
            NumOrStr::Str(s) => s.trim().parse::<f64>().map_err(de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Identity of one side of one canonical line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PickKey {
    pub game_id: String,
    pub market: GameMarket,
    /// Point as quoted for `side`.
    pub point: Option<LinePoint>,
    pub side: Side,
}

impl PickKey {
    /// The other side of the same line. Spread points change sign because
    /// each side carries its own quoted point.
    pub fn opposite(&self) -> Self {
        let point = match self.market {
            GameMarket::Spreads => self.point.map(|p| p.negate()),
            _ => self.point,
        };
        Self {
            game_id: self.game_id.clone(),
            market: self.market,
            point,
            side: self.side.opposite(),
        }
    }
}

/// `<gameId>-<marketKey>-<point>-<side>`, with `null` for a missing point.
impl fmt::Display for PickKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.point {
            Some(p) => write!(f, "{}-{}-{}-{}", self.game_id, self.market, p, self.side),
            None => write!(f, "{}-{}-null-{}", self.game_id, self.market, self.side),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// What happened to a pick offered to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// New line, stored.
    Inserted,
    /// Same side already stored with a smaller edge; replaced.
    Improved,
    /// Opposite side stored with a smaller edge; it was removed and this
    /// pick stored.
    ReplacedOpposite,
    /// Same side already stored with an equal or larger edge.
    KeptExisting,
    /// Opposite side stored with an equal or larger edge.
    KeptOpposite,
}

/// Tally of merge outcomes over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub improved: usize,
    pub replaced: usize,
    pub discarded: usize,
}

impl MergeSummary {
    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Improved => self.improved += 1,
            MergeOutcome::ReplacedOpposite => self.replaced += 1,
            MergeOutcome::KeptExisting | MergeOutcome::KeptOpposite => self.discarded += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickLedger {
    picks: BTreeMap<PickKey, Pick>,
    /// Stored entries that take no part in merging: ones this crate cannot
    /// read, and displaced duplicates. Written back unchanged.
    retained: Vec<Value>,
}

impl PickLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from stored picks. When two picks share a key the
    /// settled one (or else the later one) takes part in merging; the other
    /// is retained as-is.
    pub fn from_picks(picks: Vec<Pick>) -> Self {
        let mut ledger = Self::new();
        for pick in picks {
            ledger.insert_stored(pick);
        }
        ledger
    }

    /// Build a ledger from raw stored entries. Entries that do not parse
    /// as picks are retained verbatim rather than dropped.
    pub fn from_entries(entries: Vec<Value>) -> Self {
        let mut ledger = Self::new();
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Pick>(entry.clone()) {
                Ok(pick) => ledger.insert_stored(pick),
                Err(e) => {
                    warn!(
                        index,
                        pick_id = entry.get("pickId").and_then(serde_json::Value::as_str).unwrap_or("?"),
                        error = %e,
                        "Unreadable ledger entry, keeping it unchanged"
                    );
                    ledger.retained.push(entry);
                }
            }
        }
        ledger
    }

    fn insert_stored(&mut self, pick: Pick) {
        let key = pick.key();
        let keep_stored = !pick.is_settled() && self.picks.get(&key).is_some_and(Pick::is_settled);
        let displaced = if keep_stored {
            Some(pick)
        } else {
            self.picks.insert(key.clone(), pick)
        };
        if let Some(displaced) = displaced {
            debug!(pick = %key, "Duplicate pick in stored ledger, retaining the extra entry");
            match serde_json::to_value(&displaced) {
                Ok(value) => self.retained.push(value),
                Err(e) => warn!(pick = %key, error = %e, "Failed to retain duplicate ledger entry"),
            }
        }
    }

    /// Every stored entry in file form: picks in key order, then retained
    /// entries in their original order.
    pub fn to_entries(&self) -> Result<Vec<Value>, serde_json::Error> {
        let mut entries = Vec::with_capacity(self.len());
        for pick in self.picks.values() {
            entries.push(serde_json::to_value(pick)?);
        }
        entries.extend(self.retained.iter().cloned());
        Ok(entries)
    }

    pub fn picks(&self) -> impl Iterator<Item = &Pick> {
        self.picks.values()
    }

    pub fn retained(&self) -> &[Value] {
        &self.retained
    }

    /// Number of stored entries, retained ones included.
    pub fn len(&self) -> usize {
        self.picks.len() + self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge one freshly computed pick.
    ///
    /// 1. If the opposite side is stored, the larger edge wins; a tie keeps
    ///    the stored pick.
    /// 2. Otherwise a stored pick on the same side is replaced only by a
    ///    strictly larger edge.
    /// 3. Otherwise the pick is inserted.
    ///
    /// A stored pick that already has a `result` is never removed or
    /// replaced, whatever the new edge: against a settled opposite side the
    /// new pick is `KeptOpposite`, against a settled same side it is
    /// `KeptExisting`. Retained entries take no part in merging.
    pub fn merge(&mut self, pick: Pick) -> MergeOutcome {
        let key = pick.key();
        let opposite = key.opposite();
        let mut replaced_opposite = false;

        if let Some(stored) = self.picks.get(&opposite) {
            if pick.edge > stored.edge && !stored.is_settled() {
                info!(
                    removed = %opposite,
                    added = %key,
                    edge = format!("{:.2}%", pick.edge * 100.0),
                    "Edge flipped, replacing opposite side"
                );
                self.picks.remove(&opposite);
                replaced_opposite = true;
            } else {
                debug!(kept = %opposite, discarded = %key, "Edge flipped to worse side, keeping stored pick");
                return MergeOutcome::KeptOpposite;
            }
        }

        match self.picks.get(&key) {
            None => {
                self.picks.insert(key, pick);
                if replaced_opposite {
                    MergeOutcome::ReplacedOpposite
                } else {
                    MergeOutcome::Inserted
                }
            }
            Some(stored) if pick.edge > stored.edge && !stored.is_settled() => {
                info!(
                    pick = %key,
                    from = format!("{:.2}%", stored.edge * 100.0),
                    to = format!("{:.2}%", pick.edge * 100.0),
                    "Edge improved"
                );
                self.picks.insert(key, pick);
                MergeOutcome::Improved
            }
            Some(_) => MergeOutcome::KeptExisting,
        }
    }

    /// Merge a batch, returning the tally.
    pub fn merge_all(&mut self, picks: Vec<Pick>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for pick in picks {
            summary.record(self.merge(pick));
        }
        info!(
            inserted = summary.inserted,
            improved = summary.improved,
            replaced = summary.replaced,
            discarded = summary.discarded,
            total = self.len(),
            "Picks merged into ledger"
        );
        summary
    }
}

// ---------------------------------------------------------------------------
// Bankroll
// ---------------------------------------------------------------------------

/// Capital base for dynamic stakes, recomputed from the ledger each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bankroll {
    pub starting: Decimal,
    /// Realized full-Kelly P/L on the dynamic bankroll.
    pub realized_pnl: Decimal,
}

impl Bankroll {
    /// Sums `pnl_full_dynamic` over every stored entry, retained ones
    /// included.
    pub fn from_ledger(starting: Decimal, ledger: &PickLedger) -> Self {
        let picked: Decimal = ledger.picks().filter_map(Pick::pnl_full_dynamic).sum();
        let retained: Decimal = ledger
            .retained()
            .iter()
            .filter_map(|entry| entry.get(PNL_FULL_DYNAMIC))
            .filter_map(lenient::value_to_decimal)
            .sum();
        let realized_pnl = picked + retained;
        Self {
            starting,
            realized_pnl,
        }
    }

    pub fn dynamic(&self) -> Decimal {
        self.starting + self.realized_pnl
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
