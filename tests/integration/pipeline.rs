//! Full batch runs over file-backed snapshots and ledgers.

use rust_decimal_macros::dec;

use nova::engine::Pipeline;
use nova::ledger::PickResult;
use nova::storage;
use nova::types::Side;

use crate::fixtures::*;

const ML_HOME: &str = "nba-celtics-knicks-moneyline-null-A";
const ML_AWAY: &str = "nba-celtics-knicks-moneyline-null-B";

#[test]
fn test_full_run_writes_every_output() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(true);
    sandbox.write_snapshot(&snapshot(-150.0, 130.0));

    let report = Pipeline::new(&cfg).run().unwrap();
    assert_eq!(report.events, 1);
    assert_eq!(report.games, 1);
    assert_eq!(report.lines, 3);
    assert_eq!(report.props, 1);
    assert_eq!(report.picks_generated, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.ledger_size, 1);
    assert_eq!(report.dynamic_bankroll, dec!(10000));

    let games = sandbox.read_json("games.json");
    assert!(games.get("lastUpdated").is_some());
    let game = &games["games"][0];
    assert_eq!(game["id"], GAME_ID);
    assert_eq!(game["teamA"], "Boston Celtics");
    assert_eq!(game["moneyline"][0]["sharpBookCount"], 3);
    assert_eq!(game["spreads"][0]["point"], -3.5);
    assert_eq!(game["totals"][0]["point"], 221.5);
    assert_eq!(game["moneyline"][0]["bookmakerOdds"].as_array().unwrap().len(), 8);

    let props = sandbox.read_json("player_props.json");
    assert_eq!(props["props"][0]["propId"], "nba-celtics-knicks-player_points-Jayson Tatum-27.5");
    assert_eq!(props["props"][0]["player"], "Jayson Tatum");

    let picks = sandbox.read_json("system_picks.json");
    let picks = picks.as_array().unwrap();
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0]["pickId"], ML_HOME);
    assert_eq!(picks[0]["side"], "A");
    assert_eq!(picks[0]["result"], serde_json::Value::Null);
    // Market books all hang -112 on the Celtics; sharps are worse.
    assert_eq!(picks[0]["odds"], -112.0);

    // Three lines and one prop, eight books each, two sides per book.
    assert_eq!(report.deviations_logged, 64);
    let analytics = sandbox.read_json("bookmaker_analytics.json");
    assert_eq!(analytics.as_array().unwrap().len(), 64);
}

#[test]
fn test_analytics_disabled_writes_nothing() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(false);
    sandbox.write_snapshot(&snapshot(-150.0, 130.0));

    let report = Pipeline::new(&cfg).run().unwrap();
    assert_eq!(report.deviations_logged, 0);
    assert!(!sandbox.exists("bookmaker_analytics.json"));
}

#[test]
fn test_rerun_keeps_then_improves() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(true);
    let pipeline = Pipeline::new(&cfg);

    sandbox.write_snapshot(&snapshot(-150.0, 130.0));
    pipeline.run().unwrap();
    let first_edge = storage::load_ledger(&cfg.files.ledger).picks().next().unwrap().edge;

    // Identical snapshot: nothing new.
    let report = pipeline.run().unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.discarded, 1);

    // Sharps move further toward the Celtics.
    sandbox.write_snapshot(&snapshot(-170.0, 150.0));
    let report = pipeline.run().unwrap();
    assert_eq!(report.improved, 1);

    let ledger = storage::load_ledger(&cfg.files.ledger);
    assert_eq!(ledger.len(), 1);
    let pick = ledger.picks().next().unwrap();
    assert_eq!(pick.pick_id, ML_HOME);
    assert!(pick.edge > first_edge);

    // Analytics accumulate across runs.
    let analytics = sandbox.read_json("bookmaker_analytics.json");
    assert_eq!(analytics.as_array().unwrap().len(), 3 * 64);
}

#[test]
fn test_flip_replaces_opposite_side() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(false);
    let pipeline = Pipeline::new(&cfg);

    sandbox.write_snapshot(&snapshot(-150.0, 130.0));
    pipeline.run().unwrap();

    // Sharps flip to the Knicks by more than the stored edge.
    sandbox.write_snapshot(&snapshot(130.0, -150.0));
    let report = pipeline.run().unwrap();
    assert_eq!(report.replaced, 1);

    let ledger = storage::load_ledger(&cfg.files.ledger);
    assert_eq!(ledger.len(), 1);
    let pick = ledger.picks().next().unwrap();
    assert_eq!(pick.pick_id, ML_AWAY);
    assert_eq!(pick.side, Side::B);
}

#[test]
fn test_settled_legacy_pick_feeds_bankroll() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(false);
    sandbox.write("system_picks.json", &legacy_settled_ledger());
    sandbox.write_snapshot(&snapshot(-150.0, 130.0));

    let report = Pipeline::new(&cfg).run().unwrap();
    assert_eq!(report.dynamic_bankroll, dec!(10600));
    assert_eq!(report.ledger_size, 2);

    let ledger = storage::load_ledger(&cfg.files.ledger);
    let settled = ledger.picks().find(|p| p.game_id == "nba-old-game").unwrap();
    assert_eq!(settled.result, Some(PickResult::Win));
    assert_eq!(settled.wager_full, dec!(500.00));
    assert_eq!(settled.pnl_full_dynamic(), Some(dec!(600.00)));
    assert_eq!(settled.extra["gradedBy"], "settler-v2");

    let fresh = ledger.picks().find(|p| p.pick_id == ML_HOME).unwrap();
    assert!(fresh.wager_full_dynamic.unwrap() > fresh.wager_full);
}

#[test]
fn test_empty_snapshot_aborts_without_writing() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(true);
    let ledger = legacy_settled_ledger();
    sandbox.write("system_picks.json", &ledger);
    sandbox.write("odds_snapshot.json", "[]");

    assert!(Pipeline::new(&cfg).run().is_err());
    assert!(!sandbox.exists("games.json"));
    assert!(!sandbox.exists("player_props.json"));
    assert!(!sandbox.exists("bookmaker_analytics.json"));
    assert_eq!(std::fs::read_to_string(sandbox.path("system_picks.json")).unwrap(), ledger);
}

#[test]
fn test_malformed_ledger_starts_fresh() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(false);
    sandbox.write("system_picks.json", "{ this is not a ledger");
    sandbox.write_snapshot(&snapshot(-150.0, 130.0));

    let report = Pipeline::new(&cfg).run().unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(storage::load_ledger(&cfg.files.ledger).len(), 1);
}

#[test]
fn test_pre_dynamic_and_unreadable_entries_survive() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(false);
    sandbox.write("system_picks.json", &pre_dynamic_ledger());
    sandbox.write_snapshot(&snapshot(-150.0, 130.0));

    let report = Pipeline::new(&cfg).run().unwrap();
    assert_eq!(report.inserted, 1);
    // 10000 - 300 (old settled pick) - 100 (unreadable entry)
    assert_eq!(report.dynamic_bankroll, dec!(9600));
    assert_eq!(report.ledger_size, 3);

    let picks = sandbox.read_json("system_picks.json");
    let ids: Vec<&str> = picks
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["pickId"].as_str())
        .collect();
    assert!(ids.contains(&"nba-older-game-totals-210.5-A"));
    assert!(ids.contains(&"nba-garbled-moneyline-null-A"));
    assert!(ids.contains(&ML_HOME));

    let old = picks
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["pickId"] == "nba-older-game-totals-210.5-A")
        .unwrap();
    assert_eq!(old["result"], "LOSS");
    assert!(old.get("wager_full_dynamic").is_none());
}

#[test]
fn test_settlement_amounts_written_back_unchanged() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(false);
    sandbox.write("system_picks.json", &precise_pnl_ledger());
    sandbox.write_snapshot(&snapshot(-150.0, 130.0));

    let report = Pipeline::new(&cfg).run().unwrap();
    assert_eq!(report.dynamic_bankroll, dec!(10454.5454545454545));

    let picks = sandbox.read_json("system_picks.json");
    let settled = picks
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["gameId"] == "nba-precise")
        .unwrap();
    assert_eq!(settled["pnl_full"], serde_json::json!(454.5454545454545));
    assert_eq!(settled["pnl_full_dynamic"], serde_json::json!(454.5454545454545));
    assert_eq!(settled["pnl_half"], serde_json::json!(227.27272727272725));
}

#[test]
fn test_bad_event_skipped_good_event_processed() {
    let sandbox = Sandbox::new();
    let cfg = sandbox.config(false);
    sandbox.write_snapshot(&snapshot_with_bad_events(-150.0, 130.0));

    let report = Pipeline::new(&cfg).run().unwrap();
    assert_eq!(report.events, 2);
    assert_eq!(report.games, 2);
    assert!(report.picks_generated >= 1);

    let games = sandbox.read_json("games.json");
    let ids: Vec<&str> = games["games"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|g| g["id"].as_str())
        .collect();
    assert!(ids.contains(&GAME_ID));
    assert!(ids.contains(&"nba-null-price"));
    assert!(!ids.contains(&"nba-bad-time"));
}
