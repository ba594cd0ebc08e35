//! Data models for the cohort assistant.
//!
//! This module contains the core data structures shared across the
//! loader, aggregator and chat pipeline: cohort rows, chat messages and
//! the tagged reply returned by a chat turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::llm::ProviderError;

/// One row of the pre-computed cohort summary table.
///
/// Numeric cells may be blank, `NaN`, or not numbers at all; all of those
/// deserialize to `None` and are skipped by the aggregations. Column
/// presence is checked by the loader, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    /// Identifying label of the cohort (e.g. `2020-08`).
    pub cohort: String,
    /// Total value of loans disbursed to the cohort.
    #[serde(default, deserialize_with = "deserialize_number")]
    pub total_loans_disbursed: Option<f64>,
    /// Total value collected back from the cohort.
    #[serde(default, deserialize_with = "deserialize_number")]
    pub total_loans_received: Option<f64>,
    /// Value still outstanding.
    #[serde(default, deserialize_with = "deserialize_number")]
    pub total_outstanding_loans: Option<f64>,
    /// Recovery rate as a percentage.
    #[serde(default, deserialize_with = "deserialize_number")]
    pub loan_recovery_rate_pct: Option<f64>,
    /// Fraction of disbursed value written off.
    #[serde(default, deserialize_with = "deserialize_number")]
    pub loss_rate: Option<f64>,
    /// Rank of the cohort in the portfolio (1 = best). Kept as written,
    /// so `2.5` or `-1` are valid ranks.
    #[serde(default, deserialize_with = "deserialize_number")]
    pub portfolio_rank: Option<f64>,
}

/// Parse a numeric cell leniently: anything that isn't a finite number
/// becomes `None` instead of failing the whole file.
fn deserialize_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|cell| parse_number(&cell)))
}

fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        Ok(_) => None,
        Err(_) => {
            warn!("Ignoring non-numeric cell value '{}'", trimmed);
            None
        }
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl Role {
    /// Returns an emoji representation of the role.
    pub fn emoji(&self) -> &'static str {
        match self {
            Role::User => "🧑",
            Role::Assistant => "🤖",
        }
    }
}

/// A single chat message. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// `role: content`, the line format used when serializing a conversation.
    pub fn as_transcript_line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// Outcome of one chat turn.
#[derive(Debug)]
pub enum Reply {
    /// The model answered with this text.
    Success(String),
    /// The turn failed; the error text has already been recorded as the
    /// assistant's reply.
    Failure(ProviderError),
}

impl Reply {
    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }
}
