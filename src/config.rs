//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section falls back to the built-in defaults, so a partial (or empty)
//! file is valid. The resulting `AppConfig` is passed by reference into
//! every aggregation step; nothing reads ambient state.

use anyhow::{Context, Result};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;

use crate::types::{BookType, NovaError};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub files: FilesConfig,
    pub weights: WeightsConfig,
}

/// Numeric thresholds for grouping and pick generation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fixed bankroll used for static stakes and as the dynamic base.
    pub starting_bankroll: f64,
    /// Minimum edge for a pick to be logged.
    pub min_edge: f64,
    /// Alt spreads/totals further than this from the main point are dropped.
    pub alt_line_range: f64,
    /// Outlier band, American odds.
    pub min_odds: f64,
    pub max_odds: f64,
    pub min_sharp_books: usize,
    pub min_market_books: usize,
    /// Books never used as the best executable price.
    pub excluded_books: Vec<String>,
    /// Multi-entrant prop markets handled by the one-way path.
    pub one_way_markets: Vec<String>,
    /// Append bookmaker deviation rows to the analytics file.
    pub log_deviations: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            starting_bankroll: 10_000.0,
            min_edge: 0.0001,
            alt_line_range: 0.5,
            min_odds: -1999.0,
            max_odds: 1999.0,
            min_sharp_books: 3,
            min_market_books: 5,
            excluded_books: ["unibet_uk", "betway", "onexbet"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            one_way_markets: DEFAULT_ONE_WAY_MARKETS.iter().map(|s| s.to_string()).collect(),
            log_deviations: false,
        }
    }
}

const DEFAULT_ONE_WAY_MARKETS: &[&str] = &[
    "player_anytime_td",
    "player_1st_td",
    "player_last_td",
    "batter_home_runs",
    "batter_first_home_run",
    "pitcher_record_a_win",
    "player_goal_scorer_first",
    "player_goal_scorer_last",
    "player_goal_scorer_anytime",
    "player_first_basket",
    "player_first_team_basket",
    "player_double_double",
    "player_triple_double",
    "player_method_of_first_basket",
];

impl PipelineConfig {
    pub fn is_one_way(&self, market_key: &str) -> bool {
        self.one_way_markets.iter().any(|m| m == market_key)
    }

    pub fn is_excluded(&self, bookmaker: &str) -> bool {
        self.excluded_books.iter().any(|b| b == bookmaker)
    }

    /// Starting bankroll in cents precision.
    pub fn starting_bankroll_amount(&self) -> Decimal {
        Decimal::from_f64(self.starting_bankroll)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2)
    }
}

/// Input and output file locations.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FilesConfig {
    pub snapshot: String,
    pub games: String,
    pub props: String,
    pub ledger: String,
    pub analytics: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            snapshot: "odds_snapshot.json".into(),
            games: "games.json".into(),
            props: "player_props.json".into(),
            ledger: "system_picks.json".into(),
            analytics: "bookmaker_analytics.json".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Book weights
// ---------------------------------------------------------------------------

/// One bookmaker's credibility class and weights.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BookWeight {
    #[serde(rename = "type")]
    pub book_type: BookType,
    /// Keyed by sport key, with `default` as the fallback.
    pub weights: HashMap<String, f64>,
}

impl BookWeight {
    pub fn new(book_type: BookType, default_weight: f64) -> Self {
        Self {
            book_type,
            weights: HashMap::from([("default".to_string(), default_weight)]),
        }
    }

    /// Sport-specific weight if set and positive, else the default.
    pub fn weight_for(&self, sport_key: &str) -> Option<f64> {
        self.weights
            .get(sport_key)
            .copied()
            .filter(|w| *w > 0.0)
            .or_else(|| self.weights.get("default").copied())
            .filter(|w| *w > 0.0)
    }
}

/// Bookmaker → weight lookup for one use (game lines, props or EV tab).
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct BookWeightTable(BTreeMap<String, BookWeight>);

impl BookWeightTable {
    pub fn from_entries(entries: &[(&str, BookType, f64)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(book, t, w)| (book.to_string(), BookWeight::new(*t, *w)))
                .collect(),
        )
    }

    /// Add or override a sport-specific weight.
    pub fn with_sport_weight(mut self, book: &str, sport_key: &str, weight: f64) -> Self {
        if let Some(entry) = self.0.get_mut(book) {
            entry.weights.insert(sport_key.to_string(), weight);
        }
        self
    }

    pub fn get(&self, bookmaker: &str) -> Option<&BookWeight> {
        self.0.get(bookmaker)
    }

    /// Class and effective weight of a book for a sport, if configured.
    pub fn classify(&self, bookmaker: &str, sport_key: &str) -> Option<(BookType, f64)> {
        let entry = self.0.get(bookmaker)?;
        Some((entry.book_type, entry.weight_for(sport_key)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BookWeight)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Default weights for moneylines, spreads and totals.
    pub fn game_lines() -> Self {
        use BookType::*;
        Self::from_entries(&[
            ("pinnacle", Sharp, 3.0),
            ("novig", Sharp, 2.0),
            ("prophetx", Sharp, 2.0),
            ("matchbook", Sharp, 2.0),
            ("smarkets", Sharp, 2.0),
            ("betfair_ex_eu", Sharp, 1.33),
            ("betfair_ex_au", Sharp, 1.33),
            ("betfair_ex_uk", Sharp, 1.33),
            ("betrivers", Market, 7.5),
            ("ballybet", Market, 7.5),
            ("mybookieag", Market, 7.5),
            ("fliff", Market, 7.0),
            ("unibet_uk", Market, 7.0),
            ("betmgm", Market, 5.0),
            ("hardrockbet", Market, 5.0),
            ("fanatics", Market, 5.0),
            ("espnbet", Market, 2.0),
            ("bet365_au", Market, 2.0),
            ("williamhill_us", Market, 2.0),
            ("rebet", Market, 2.0),
            ("onexbet", Market, 2.0),
            ("betway", Market, 2.0),
            ("draftkings", Market, 1.0),
            ("fanduel", Market, 1.0),
            ("lowvig", Market, 0.25),
            ("betonlineag", Market, 0.025),
        ])
        .with_sport_weight("fliff", "icehockey_nhl", 5.0)
    }

    /// Default weights for player props.
    pub fn props() -> Self {
        use BookType::*;
        Self::from_entries(&[
            ("pinnacle", Sharp, 3.0),
            ("novig", Sharp, 2.0),
            ("prophetx", Sharp, 2.0),
            ("betfair_ex_eu", Sharp, 2.0),
            ("draftkings", Sharp, 0.25),
            ("fanduel", Sharp, 1.0),
            ("matchbook", Sharp, 1.0),
            ("smarkets", Sharp, 1.0),
            ("betrivers", Market, 7.5),
            ("ballybet", Market, 7.5),
            ("fliff", Market, 7.0),
            ("betmgm", Market, 5.0),
            ("hardrockbet", Market, 5.0),
            ("fanatics", Market, 5.0),
            ("espnbet", Market, 2.0),
            ("bet365_au", Market, 2.0),
            ("williamhill_us", Market, 2.0),
            ("rebet", Market, 1.0),
            ("mybookieag", Market, 2.0),
            ("unibet_uk", Market, 2.0),
            ("betway", Market, 2.0),
        ])
    }

    /// Default weights for the EV evaluation view and one-way props.
    pub fn ev_tab() -> Self {
        use BookType::*;
        Self::from_entries(&[
            ("pinnacle", Sharp, 3.0),
            ("fanduel", Market, 2.25),
            ("novig", Sharp, 2.0),
            ("prophetx", Sharp, 2.0),
            ("betfair_ex_eu", Sharp, 2.0),
            ("betfair_ex_uk", Sharp, 1.0),
            ("betfair_ex_au", Sharp, 1.0),
            ("matchbook", Sharp, 1.0),
            ("smarkets", Sharp, 1.0),
            ("draftkings", Market, 1.75),
            ("williamhill_us", Market, 1.0),
            ("espnbet", Market, 0.75),
            ("fanatics", Market, 0.75),
            ("hardrockbet", Market, 0.75),
            ("bet365_au", Market, 0.75),
            ("betmgm", Market, 0.25),
            ("betrivers", Market, 0.25),
            ("ballybet", Market, 0.25),
            ("fliff", Market, 0.25),
            ("rebet", Market, 0.25),
            ("mybookieag", Market, 0.01),
            ("betonlineag", Market, 0.125),
            ("lowvig", Market, 0.125),
        ])
    }
}

/// The three independent weight tables.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WeightsConfig {
    pub game_lines: BookWeightTable,
    pub props: BookWeightTable,
    pub ev_tab: BookWeightTable,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            game_lines: BookWeightTable::game_lines(),
            props: BookWeightTable::props(),
            ev_tab: BookWeightTable::ev_tab(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Reject values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<(), NovaError> {
        let p = &self.pipeline;
        if p.min_odds > p.max_odds {
            return Err(NovaError::Config(format!(
                "min_odds ({}) exceeds max_odds ({})",
                p.min_odds, p.max_odds
            )));
        }
        if p.alt_line_range < 0.0 {
            return Err(NovaError::Config("alt_line_range must be non-negative".into()));
        }
        if p.starting_bankroll <= 0.0 {
            return Err(NovaError::Config("starting_bankroll must be positive".into()));
        }
        for (table_name, table) in [
            ("game_lines", &self.weights.game_lines),
            ("props", &self.weights.props),
            ("ev_tab", &self.weights.ev_tab),
        ] {
            for (book, entry) in table.iter() {
                if let Some((sport, w)) = entry.weights.iter().find(|(_, w)| **w <= 0.0) {
                    return Err(NovaError::Config(format!(
                        "weights.{table_name}.{book}: weight for '{sport}' must be positive, got {w}"
                    )));
                }
                if !entry.weights.contains_key("default") {
                    return Err(NovaError::Config(format!(
                        "weights.{table_name}.{book}: missing 'default' weight"
                    )));
                }
            }
        }
        Ok(())
    }
}
