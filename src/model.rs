// Core structs: Visit, Leg, PlayerEntry, MatchData, IngestRecord
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single visit to the oche: one scoring turn of up to three darts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub round: i64,
    pub score_of_visit: i64,
    pub score_after_visit: i64,
    pub darts_thrown: Vec<Value>,
}

/// One leg of a match, with placeholder summary fields the UI fills in later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub leg_number: u32,
    pub visits: Vec<Visit>,
    pub average: Option<f64>,
    pub checkout_percent: Option<f64>,
    pub darts_thrown: Option<u32>,
    pub best_visit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    pub player_name: String,
    pub bust: bool,
    pub legs: Vec<Leg>,
}

/// Normalized match schema handed to the companion UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchData {
    pub players: Vec<PlayerEntry>,
    pub meta: Value,
}

/// Full persisted ingest row, including the raw and normalized payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub filename: String,
    pub player_names: Vec<String>,
    pub bust: bool,
    pub meta: Value,
    pub raw: Value,
    pub normalized: Value,
}

/// Listing projection of an ingest row (no payload blobs).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub filename: String,
    pub player_names: Vec<String>,
    pub bust: bool,
}

/// An image file pulled out of the multipart upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0} is not set. Configure it via POST /config or the environment.")]
    NotConfigured(&'static str),
    #[error("network error calling ParseExtract: {0}")]
    Network(#[from] reqwest::Error),
    #[error("ParseExtract returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config payload: {0}")]
    Invalid(#[from] serde_json::Error),
}
