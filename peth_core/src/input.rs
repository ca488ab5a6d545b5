//! Loading drinking sessions from files and command line specs.
//!
//! Supported formats:
//! - JSON: an array of `{ "start", "end", "grams", "absorption_factor"? }`
//! - CSV: header `start,end,grams[,absorption_factor]`
//!
//! Timestamps are RFC 3339. Every loaded session is validated.

use crate::{DrinkingSession, Error, Result};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;

/// CSV row format for session files
#[derive(Debug, Deserialize)]
struct CsvRow {
    start: String,
    end: String,
    grams: f64,
    #[serde(default)]
    absorption_factor: Option<f64>,
}

impl TryFrom<CsvRow> for DrinkingSession {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let session = DrinkingSession {
            start: parse_timestamp(&row.start)?,
            end: parse_timestamp(&row.end)?,
            ethanol_grams: row.grams,
            absorption_factor: row.absorption_factor,
        };
        session.validate()?;
        Ok(session)
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Input(format!("Invalid timestamp '{}': {}", s, e)))
}

/// Load sessions from a `.json` or `.csv` file
pub fn load_sessions(path: &Path) -> Result<Vec<DrinkingSession>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let sessions = match extension.as_deref() {
        Some("json") => load_json(path)?,
        Some("csv") => load_csv(path)?,
        _ => {
            return Err(Error::Input(format!(
                "Unsupported session file {:?}: expected .json or .csv",
                path
            )))
        }
    };

    tracing::info!("Loaded {} session(s) from {:?}", sessions.len(), path);
    Ok(sessions)
}

fn load_json(path: &Path) -> Result<Vec<DrinkingSession>> {
    let contents = std::fs::read_to_string(path)?;
    let sessions: Vec<DrinkingSession> = serde_json::from_str(&contents)?;
    for (idx, session) in sessions.iter().enumerate() {
        session
            .validate()
            .map_err(|e| Error::Input(format!("session {}: {}", idx + 1, e)))?;
    }
    Ok(sessions)
}

fn load_csv(path: &Path) -> Result<Vec<DrinkingSession>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut sessions = Vec::new();
    for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let line = idx + 2;
        let row = result?;
        let session = DrinkingSession::try_from(row)
            .map_err(|e| Error::Input(format!("line {}: {}", line, e)))?;
        sessions.push(session);
    }
    Ok(sessions)
}

/// Parse an inline `START,END,GRAMS[,FACTOR]` session
pub fn parse_session_spec(spec: &str) -> Result<DrinkingSession> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(Error::Input(format!(
            "Expected START,END,GRAMS[,FACTOR], got '{}'",
            spec
        )));
    }

    let parse_number = |field: &str, name: &str| -> Result<f64> {
        field
            .parse::<f64>()
            .map_err(|e| Error::Input(format!("Invalid {} '{}': {}", name, field, e)))
    };

    let row = CsvRow {
        start: parts[0].to_string(),
        end: parts[1].to_string(),
        grams: parse_number(parts[2], "grams")?,
        absorption_factor: parts
            .get(3)
            .map(|f| parse_number(f, "absorption factor"))
            .transpose()?,
    };
    DrinkingSession::try_from(row)
}
