//! Pending command records
//!
//! Builds [`PendingCommand`] values from the remote store's response body.
//! Each object blob is decoded with `serde_json`; a blob it rejects falls
//! back to the tolerant field extractor. Objects without an `id` or a
//! `command` are dropped.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::json::{self, FieldPattern, SplitError};

/// Placeholder tokens replaced with the target user's name
pub const USER_PLACEHOLDERS: [&str; 2] = ["{user_name}", "{username}"];

/// Status value of records the bridge acts on
pub const STATUS_PENDING: &str = "pending";

/// Keys read from each object
const FIELD_KEYS: [&str; 9] = [
    "id",
    "command",
    "mc_username",
    "status",
    "discord_message_id",
    "product",
    "notes",
    "price",
    "delivered",
];

/// Extractor patterns for objects `serde_json` rejects, compiled once
static RAW_PATTERNS: Lazy<HashMap<&'static str, FieldPattern>> = Lazy::new(|| {
    FIELD_KEYS
        .iter()
        .filter_map(|key| FieldPattern::new(key).ok().map(|pattern| (*key, pattern)))
        .collect()
});

/// Errors that can occur while parsing a response body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("response body is not a JSON array")]
    MissingArrayFraming,

    #[error("response body has unbalanced objects")]
    UnbalancedObjects,
}

impl From<SplitError> for ParseError {
    fn from(err: SplitError) -> Self {
        match err {
            SplitError::NotAnArray => ParseError::MissingArrayFraming,
        }
    }
}

/// A record from the `pending_commands` collection
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    /// Primary key in the remote store, de-duplication key locally
    pub id: String,
    /// In-game account the command targets (`mc_username`)
    pub target_user: Option<String>,
    /// Command template, may contain [`USER_PLACEHOLDERS`]
    pub command: String,
    pub status: Option<String>,
    /// Originating notification id (`discord_message_id`), passed through
    pub correlation_id: Option<String>,
    pub product: Option<String>,
    pub notes: Option<String>,
    pub price: Option<f64>,
    pub delivered: Option<bool>,
}

impl PendingCommand {
    /// Build a record from one object blob.
    ///
    /// Returns `None` when `id` or `command` is missing or null.
    pub fn from_object(blob: &str) -> Option<Self> {
        let fields = match serde_json::from_str::<Map<String, Value>>(blob) {
            Ok(map) => Fields::Structured(map),
            Err(_) => Fields::Raw(blob),
        };

        let id = fields.get("id")?;
        let command = fields.get("command")?;

        Some(Self {
            id,
            target_user: fields.get("mc_username"),
            command,
            status: fields.get("status"),
            correlation_id: fields.get("discord_message_id"),
            product: fields.get("product"),
            notes: fields.get("notes"),
            price: fields.get("price").and_then(|p| p.parse().ok()),
            delivered: fields.get("delivered").and_then(|d| d.parse().ok()),
        })
    }

    /// Whether the record is still waiting to be delivered.
    ///
    /// An absent status is trusted to be pending (the fetch filters on it).
    pub fn is_pending(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == STATUS_PENDING)
    }
}

/// Trim the template and replace every user placeholder with `user`
pub fn substitute_placeholders(template: &str, user: &str) -> String {
    USER_PLACEHOLDERS
        .iter()
        .fold(template.trim().to_string(), |cmd, token| cmd.replace(token, user))
}

/// Field access over either a decoded object or its raw text
enum Fields<'a> {
    Structured(Map<String, Value>),
    Raw(&'a str),
}

impl Fields<'_> {
    fn get(&self, key: &str) -> Option<String> {
        match self {
            Fields::Structured(map) => match map.get(key)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                Value::Null | Value::Array(_) | Value::Object(_) => None,
            },
            Fields::Raw(blob) => RAW_PATTERNS.get(key)?.extract(blob),
        }
    }
}

/// Records parsed from one response body
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBatch {
    pub records: Vec<PendingCommand>,
    /// Set when the body ended in a damaged object; `records` still holds
    /// everything that closed before it
    pub damaged: Option<ParseError>,
}

/// Parse a response body into pending commands.
///
/// Invalid objects are skipped and a damaged tail is reported alongside
/// the records. Only a body without array framing is an error.
pub fn parse_commands(body: &str) -> Result<ParsedBatch, ParseError> {
    let split = json::split_array(body)?;
    let records = split
        .objects
        .into_iter()
        .filter_map(PendingCommand::from_object)
        .collect();
    Ok(ParsedBatch {
        records,
        damaged: (!split.balanced).then_some(ParseError::UnbalancedObjects),
    })
}
