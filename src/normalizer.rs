//! Best-effort reshaping of the ParseExtract payload into the match schema.
//!
//! The upstream response is unpredictable: sometimes a list of round tokens,
//! sometimes just free text with lines like `"R1: 60 (441)"`. Both paths end
//! up as the same per-player, per-leg visit sequence.

use serde_json::Value;

use crate::model::{Leg, MatchData, PlayerEntry, Visit};

/// Multiplayer is capped at 7 players.
const MAX_PLAYERS: usize = 7;

/// Builds the normalized match: one synthetic leg shared by every player.
pub fn normalize(raw: &Value, player_names: &[String], bust: bool, meta: Value) -> MatchData {
    let names = limit_players(player_names);
    let visits = infer_visits(raw);

    let darts_thrown = if visits.is_empty() {
        None
    } else {
        // Visits without recognized darts count as a full three-dart turn.
        Some(
            visits
                .iter()
                .map(|v| match v.darts_thrown.len() as u32 {
                    0 => 3,
                    n => n,
                })
                .sum(),
        )
    };
    let best_visit = visits.iter().map(|v| v.score_of_visit).max();

    let leg = Leg {
        leg_number: 1,
        visits,
        average: None,
        checkout_percent: None,
        darts_thrown,
        best_visit,
    };

    MatchData {
        players: names
            .into_iter()
            .map(|player_name| PlayerEntry {
                player_name,
                bust,
                legs: vec![leg.clone()],
            })
            .collect(),
        meta,
    }
}

/// Trims, drops empties, dedupes preserving order and caps at [`MAX_PLAYERS`].
/// An empty result falls back to a single "Player 1".
pub fn limit_players(names: &[String]) -> Vec<String> {
    let mut uniq: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() || uniq.iter().any(|n| n == name) {
            continue;
        }
        uniq.push(name.to_string());
        if uniq.len() >= MAX_PLAYERS {
            break;
        }
    }
    if uniq.is_empty() {
        uniq.push("Player 1".to_string());
    }
    uniq
}

/// Two-path heuristic: a `tokens` array wins, otherwise `text` lines are
/// scanned for the `"<label>: <num> (<num>)"` shape.
pub fn infer_visits(raw: &Value) -> Vec<Visit> {
    if let Some(tokens) = raw.get("tokens").and_then(Value::as_array) {
        return visits_from_tokens(tokens);
    }
    match raw.get("text").and_then(Value::as_str) {
        Some(text) => visits_from_text(text),
        None => Vec::new(),
    }
}

fn visits_from_tokens(tokens: &[Value]) -> Vec<Visit> {
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| Visit {
            round: int_field(token, "round").unwrap_or(i as i64 + 1),
            score_of_visit: int_field(token, "visit").unwrap_or(0),
            score_after_visit: int_field(token, "after").unwrap_or(0),
            darts_thrown: token
                .get("darts")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        })
        .collect()
}

fn visits_from_text(text: &str) -> Vec<Visit> {
    let mut visits = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || !(line.contains(':') && line.contains('(') && line.contains(')')) {
            continue;
        }
        // "R1: 60 (441)" -> split off the label, then the parenthesized rest
        let Some((_, rest)) = line.split_once(':') else {
            continue;
        };
        let Some((visit_str, after_str)) = rest.split_once('(') else {
            continue;
        };
        let (Some(visit), Some(after)) = (digits(visit_str), digits(after_str)) else {
            continue;
        };
        visits.push(Visit {
            round: visits.len() as i64 + 1,
            score_of_visit: visit,
            score_after_visit: after,
            darts_thrown: Vec::new(),
        });
    }
    visits
}

/// Token fields arrive as numbers or numeric strings, depending on the engine.
fn int_field(token: &Value, key: &str) -> Option<i64> {
    match token.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Keeps only ASCII digits; `None` when there are none.
fn digits(s: &str) -> Option<i64> {
    let filtered: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    filtered.parse().ok()
}
