//! Persistence layer.
//!
//! Reads the quote snapshot and writes the pipeline outputs as JSON files.
//! The pick ledger and the analytics dataset are read whole, updated in
//! memory and written whole; callers must not run two pipelines against the
//! same files at once.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::analytics::DeviationRecord;
use crate::ledger::PickLedger;
use crate::types::{Event, GameRecord, NovaError, PropRecord};

/// Contents of the games output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamesFile {
    pub last_updated: DateTime<Utc>,
    pub games: Vec<GameRecord>,
}

/// Contents of the props output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropsFile {
    pub last_updated: DateTime<Utc>,
    pub props: Vec<PropRecord>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Load the quote snapshot. Events that fail to parse are skipped with a
/// warning; an unreadable file, or one with no usable event, stops the run.
pub fn load_snapshot(path: &str) -> Result<Vec<Event>> {
    let json = std::fs::read_to_string(path).context(format!("Failed to read snapshot from {path}"))?;
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(&json).context(format!("Failed to parse snapshot from {path}"))?;

    let total = raw.len();
    let mut events = Vec::with_capacity(total);
    for (index, value) in raw.into_iter().enumerate() {
        let id = value.get("id").and_then(|v| v.as_str()).map(str::to_string);
        match serde_json::from_value::<Event>(value) {
            Ok(event) => events.push(event),
            Err(e) => warn!(path, index, event_id = ?id, error = %e, "Skipping malformed snapshot event"),
        }
    }

    if events.is_empty() {
        return Err(NovaError::EmptySnapshot(path.to_string()).into());
    }

    let bookmakers: usize = events.iter().map(|e| e.bookmakers.len()).sum();
    info!(
        path,
        events = events.len(),
        skipped = total - events.len(),
        bookmakers,
        "Snapshot loaded"
    );
    Ok(events)
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

fn write_json<T: Serialize + ?Sized>(path: &str, value: &T, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context(format!("Failed to serialise {what}"))?;
    std::fs::write(path, &json).context(format!("Failed to write {what} to {path}"))?;
    Ok(())
}

pub fn save_games(path: &str, games: &[GameRecord], last_updated: DateTime<Utc>) -> Result<()> {
    let file = GamesFile {
        last_updated,
        games: games.to_vec(),
    };
    write_json(path, &file, "games")?;
    info!(path, games = games.len(), "Game lines saved");
    Ok(())
}

pub fn save_props(path: &str, props: &[PropRecord], last_updated: DateTime<Utc>) -> Result<()> {
    let file = PropsFile {
        last_updated,
        props: props.to_vec(),
    };
    write_json(path, &file, "props")?;
    info!(path, props = props.len(), "Player props saved");
    Ok(())
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Load the pick ledger. A missing, empty or malformed file yields an
/// empty ledger; only the malformed case is reported. Individual entries
/// that do not parse are kept verbatim (see `PickLedger::from_entries`).
pub fn load_ledger(path: &str) -> PickLedger {
    if !Path::new(path).exists() {
        info!(path, "No pick ledger found, starting fresh");
        return PickLedger::new();
    }

    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            warn!(path, error = %e, "Failed to read pick ledger, treating as empty");
            return PickLedger::new();
        }
    };
    if json.trim().is_empty() {
        return PickLedger::new();
    }

    match serde_json::from_str::<Vec<serde_json::Value>>(&json) {
        Ok(entries) => {
            let ledger = PickLedger::from_entries(entries);
            info!(
                path,
                picks = ledger.picks().count(),
                retained = ledger.retained().len(),
                "Pick ledger loaded"
            );
            ledger
        }
        Err(e) => {
            warn!(path, error = %e, "Malformed pick ledger, treating as empty");
            PickLedger::new()
        }
    }
}

pub fn save_ledger(path: &str, ledger: &PickLedger) -> Result<()> {
    let entries = ledger.to_entries().context("Failed to serialise pick ledger")?;
    write_json(path, &entries, "pick ledger")?;
    debug!(path, entries = entries.len(), "Pick ledger saved");
    Ok(())
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Append deviation rows to the analytics file. Existing rows are kept
/// as-is; a malformed file is replaced.
pub fn append_analytics(path: &str, rows: &[DeviationRecord]) -> Result<usize> {
    if rows.is_empty() {
        info!("No new bookmaker deviation data to log");
        return Ok(0);
    }

    let mut all: Vec<serde_json::Value> = match std::fs::read_to_string(path) {
        Ok(json) if !json.trim().is_empty() => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!(path, error = %e, "Malformed analytics file, starting a new one");
            Vec::new()
        }),
        _ => Vec::new(),
    };

    for row in rows {
        all.push(serde_json::to_value(row).context("Failed to serialise deviation record")?);
    }
    write_json(path, &all, "bookmaker analytics")?;

    info!(path, new = rows.len(), total = all.len(), "Bookmaker deviations logged");
    Ok(rows.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
