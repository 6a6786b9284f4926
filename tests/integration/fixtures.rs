//! Deterministic quote snapshots and file sandboxes for integration tests.
//!
//! Snapshots are built as raw JSON, the same shape the odds fetcher writes,
//! so the tests exercise deserialisation as well as the pipeline.

use serde_json::{json, Value};
use std::path::PathBuf;

use nova::config::{AppConfig, FilesConfig};

pub const GAME_ID: &str = "nba-celtics-knicks";

pub const SHARP_BOOKS: &[&str] = &["pinnacle", "novig", "prophetx"];
pub const MARKET_BOOKS: &[&str] = &["betrivers", "ballybet", "fliff", "betmgm", "hardrockbet"];

/// A scratch directory holding every file one pipeline touches.
pub struct Sandbox {
    dir: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let mut dir = std::env::temp_dir();
        dir.push(format!("nova_it_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    pub fn path(&self, name: &str) -> String {
        self.dir.join(name).to_string_lossy().to_string()
    }

    pub fn config(&self, log_deviations: bool) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.files = FilesConfig {
            snapshot: self.path("odds_snapshot.json"),
            games: self.path("games.json"),
            props: self.path("player_props.json"),
            ledger: self.path("system_picks.json"),
            analytics: self.path("bookmaker_analytics.json"),
        };
        cfg.pipeline.log_deviations = log_deviations;
        cfg
    }

    pub fn write_snapshot(&self, snapshot: &Value) {
        std::fs::write(self.path("odds_snapshot.json"), snapshot.to_string()).unwrap();
    }

    pub fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.path(name), contents).unwrap();
    }

    pub fn read_json(&self, name: &str) -> Value {
        serde_json::from_str(&std::fs::read_to_string(self.path(name)).unwrap()).unwrap()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.dir.join(name).exists()
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn two_team_market(key: &str, home: (f64, Option<f64>), away: (f64, Option<f64>)) -> Value {
    let outcome = |name: &str, (price, point): (f64, Option<f64>)| match point {
        Some(point) => json!({ "name": name, "price": price, "point": point }),
        None => json!({ "name": name, "price": price }),
    };
    json!({
        "key": key,
        "outcomes": [outcome("Boston Celtics", home), outcome("New York Knicks", away)]
    })
}

fn totals(point: f64, over: f64, under: f64) -> Value {
    json!({
        "key": "totals",
        "outcomes": [
            { "name": "Over", "price": over, "point": point },
            { "name": "Under", "price": under, "point": point }
        ]
    })
}

fn player_points(over: f64, under: f64) -> Value {
    json!({
        "key": "player_points",
        "outcomes": [
            { "name": "Over", "description": "Jayson Tatum", "price": over, "point": 27.5 },
            { "name": "Under", "description": "Jayson Tatum", "price": under, "point": 27.5 }
        ]
    })
}

/// One NBA game. Sharps price the Celtics moneyline at `sharp_home` /
/// `sharp_away`; market books hang -112/-108. Spreads and totals are
/// priced identically everywhere, so only the moneyline can carry an edge.
pub fn snapshot(sharp_home: f64, sharp_away: f64) -> Value {
    let mut bookmakers = Vec::new();
    for (i, book) in SHARP_BOOKS.iter().chain(MARKET_BOOKS.iter()).enumerate() {
        let (home, away) = if i < SHARP_BOOKS.len() {
            (sharp_home, sharp_away)
        } else {
            (-112.0, -108.0)
        };
        bookmakers.push(json!({
            "key": book,
            "markets": [
                two_team_market("h2h", (home, None), (away, None)),
                two_team_market("spreads", (-110.0, Some(-3.5)), (-110.0, Some(3.5))),
                totals(221.5, -110.0, -110.0),
                player_points(-115.0, -105.0)
            ]
        }));
    }

    json!([{
        "id": GAME_ID,
        "sport_key": "basketball_nba",
        "sport_title": "NBA",
        "home_team": "Boston Celtics",
        "away_team": "New York Knicks",
        "commence_time": "2025-01-10T00:30:00Z",
        "bookmakers": bookmakers
    }])
}

/// A settled pick on an unrelated game in the legacy string-amount format.
pub fn legacy_settled_ledger() -> String {
    json!([{
        "pickId": "nba-old-game-moneyline-null-B",
        "gameId": "nba-old-game",
        "sport": "NBA",
        "gameTime": "2025-01-03T00:30:00Z",
        "teamA": "Miami Heat",
        "teamB": "Orlando Magic",
        "marketKey": "moneyline",
        "point": null,
        "side": "B",
        "odds": 120.0,
        "bookmaker": "betmgm",
        "bookmakerCount": 9,
        "edge": 0.031,
        "novaConsensus": 104.0,
        "marketConsensus": 118.0,
        "wager_full": "500.00",
        "percent_full": "0.0500",
        "wager_half": "250.00",
        "percent_half": "0.0250",
        "wager_quarter": "125.00",
        "percent_quarter": "0.0125",
        "wager_full_dynamic": "500.00",
        "wager_half_dynamic": "250.00",
        "wager_quarter_dynamic": "125.00",
        "loggedAt": "2025-01-02T15:00:00Z",
        "result": "WIN",
        "pnl_full": "600.00",
        "pnl_full_dynamic": "600.00",
        "gradedBy": "settler-v2"
    }])
    .to_string()
}

/// The standard game plus two damaged copies: one with a null price on a
/// single outcome (only that quote is lost), one with an unparseable start
/// time (the whole event is lost).
pub fn snapshot_with_bad_events(sharp_home: f64, sharp_away: f64) -> Value {
    let good = snapshot(sharp_home, sharp_away)[0].clone();

    let mut null_price = good.clone();
    null_price["id"] = json!("nba-null-price");
    null_price["bookmakers"][0]["markets"][0]["outcomes"][0]["price"] = Value::Null;

    let mut bad_time = good.clone();
    bad_time["id"] = json!("nba-bad-time");
    bad_time["commence_time"] = json!("tomorrow-ish");

    json!([good, null_price, bad_time])
}

/// A settled pick from before dynamic sizing (no `*_dynamic` fields) and an
/// entry that no longer parses as a pick.
pub fn pre_dynamic_ledger() -> String {
    json!([
        {
            "pickId": "nba-older-game-totals-210.5-A",
            "gameId": "nba-older-game",
            "sport": "NBA",
            "gameTime": "2024-12-01T00:30:00Z",
            "teamA": "Denver Nuggets",
            "teamB": "Utah Jazz",
            "marketKey": "totals",
            "point": 210.5,
            "side": "A",
            "odds": -108.0,
            "bookmaker": "fliff",
            "bookmakerCount": 8,
            "edge": 0.024,
            "novaConsensus": -125.0,
            "marketConsensus": -110.0,
            "wager_full": "300.00",
            "percent_full": "0.0300",
            "wager_half": "150.00",
            "percent_half": "0.0150",
            "wager_quarter": "75.00",
            "percent_quarter": "0.0075",
            "loggedAt": "2024-11-30T15:00:00Z",
            "result": "LOSS",
            "pnl_full": -300.0,
            "pnl_full_dynamic": -300.0
        },
        {
            "pickId": "nba-garbled-moneyline-null-A",
            "gameId": "nba-garbled",
            "side": "home",
            "result": "LOSS",
            "pnl_full_dynamic": "-100.00"
        }
    ])
    .to_string()
}

/// A settled pick whose P/L carries full float precision.
pub fn precise_pnl_ledger() -> String {
    json!([{
        "pickId": "nba-precise-moneyline-null-B",
        "gameId": "nba-precise",
        "sport": "NBA",
        "gameTime": "2025-01-04T00:30:00Z",
        "teamA": "Chicago Bulls",
        "teamB": "Detroit Pistons",
        "marketKey": "moneyline",
        "point": null,
        "side": "B",
        "odds": -110.0,
        "bookmaker": "betrivers",
        "bookmakerCount": 8,
        "edge": 0.027,
        "novaConsensus": -125.0,
        "marketConsensus": -112.0,
        "wager_full": 500.0,
        "percent_full": 0.05,
        "wager_half": 250.0,
        "percent_half": 0.025,
        "wager_quarter": 125.0,
        "percent_quarter": 0.0125,
        "wager_full_dynamic": 500.0,
        "wager_half_dynamic": 250.0,
        "wager_quarter_dynamic": 125.0,
        "loggedAt": "2025-01-03T15:00:00Z",
        "result": "WIN",
        "pnl_full": 454.5454545454545,
        "pnl_half": 227.27272727272725,
        "pnl_full_dynamic": 454.5454545454545
    }])
    .to_string()
}
