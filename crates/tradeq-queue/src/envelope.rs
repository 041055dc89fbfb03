//! Message envelope and dead-letter record formats.
//!
//! The wire shape is `{"trade": {...}, "meta": {"attempt": N, "enqueued_at": ...}}`.
//! Bare trade objects written by older producers are still accepted and
//! normalised to `attempt = 0` as soon as they are parsed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tradeq_core::{Trade, TradeqError};

/// Dead-letter reason for content that is not a valid envelope.
pub const INVALID_PAYLOAD: &str = "invalid_payload";

/// Delivery metadata carried alongside the trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    /// Processing attempts already made.
    #[serde(default)]
    pub attempt: u32,

    /// Time of the original enqueue.
    #[serde(default = "Utc::now")]
    pub enqueued_at: DateTime<Utc>,
}

impl Default for EnvelopeMeta {
    fn default() -> Self {
        Self {
            attempt: 0,
            enqueued_at: Utc::now(),
        }
    }
}

/// A trade plus its delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The business payload.
    #[serde(alias = "payload")]
    pub trade: Trade,

    /// Delivery metadata.
    #[serde(default)]
    pub meta: EnvelopeMeta,
}

/// Accepted wire shapes. Current envelopes are tried first.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireMessage {
    Current(Envelope),
    Legacy(Trade),
}

impl From<WireMessage> for Envelope {
    fn from(message: WireMessage) -> Self {
        match message {
            WireMessage::Current(envelope) => envelope,
            WireMessage::Legacy(trade) => Self::new(trade),
        }
    }
}

/// Why raw queue content could not be turned into an envelope.
#[derive(Debug)]
pub enum ParseError {
    /// Not JSON at all.
    Json(serde_json::Error),
    /// JSON, but neither an envelope nor a bare trade.
    Shape,
    /// Well-formed, but the trade fails validation.
    Invalid(TradeqError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid json: {err}"),
            Self::Shape => write!(f, "not a trade envelope or bare trade"),
            Self::Invalid(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl Envelope {
    /// Wraps a trade for its first delivery.
    #[must_use]
    pub fn new(trade: Trade) -> Self {
        Self {
            trade,
            meta: EnvelopeMeta::default(),
        }
    }

    /// Parses raw queue content in either accepted shape.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let value: serde_json::Value = serde_json::from_str(raw).map_err(ParseError::Json)?;
        let message: WireMessage = serde_json::from_value(value).map_err(|_| ParseError::Shape)?;
        let envelope = Self::from(message);
        envelope.trade.ensure_valid().map_err(ParseError::Invalid)?;
        Ok(envelope)
    }

    /// Returns the envelope for the next delivery attempt.
    ///
    /// The trade and `enqueued_at` are carried over unchanged.
    #[must_use]
    pub fn next_attempt(&self) -> Self {
        Self {
            trade: self.trade.clone(),
            meta: EnvelopeMeta {
                attempt: self.meta.attempt.saturating_add(1),
                enqueued_at: self.meta.enqueued_at,
            },
        }
    }

    /// Returns the business key.
    #[must_use]
    pub fn trade_id(&self) -> &str {
        &self.trade.trade_id
    }

    /// Serializes to the current wire shape.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Entry appended to the dead-letter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    /// When the item was dead-lettered.
    pub failed_at: DateTime<Utc>,
    /// Last error, or [`INVALID_PAYLOAD`].
    pub reason: String,
    /// The full envelope, or `{"raw_payload": ...}` when it never parsed.
    pub envelope: serde_json::Value,
}

impl DeadLetterRecord {
    /// Record for an envelope whose processing failed.
    pub fn for_envelope(envelope: &Envelope, reason: impl Into<String>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            failed_at: Utc::now(),
            reason: reason.into(),
            envelope: serde_json::to_value(envelope)?,
        })
    }

    /// Record for raw content that could not be parsed.
    #[must_use]
    pub fn for_raw(raw: &str) -> Self {
        Self {
            failed_at: Utc::now(),
            reason: INVALID_PAYLOAD.to_string(),
            envelope: serde_json::json!({ "raw_payload": raw }),
        }
    }

    /// Serializes the record.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade() -> Trade {
        Trade::new("t1", "u", "BTC", 1.0)
    }

    #[test]
    fn test_current_shape_round_trips() {
        let envelope = Envelope::new(trade()).next_attempt();
        let parsed = Envelope::parse(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.meta.attempt, 1);
    }

    #[test]
    fn test_legacy_shape_normalised() {
        let parsed =
            Envelope::parse(r#"{"trade_id":"t1","user":"u","symbol":"BTC","price":1.0}"#).unwrap();
        assert_eq!(parsed.trade, trade());
        assert_eq!(parsed.meta.attempt, 0);
    }

    #[test]
    fn test_payload_alias_accepted() {
        let parsed = Envelope::parse(
            r#"{"payload":{"trade_id":"t1","user":"u","symbol":"BTC","price":1},"meta":{"attempt":3}}"#,
        )
        .unwrap();
        assert_eq!(parsed.trade, trade());
        assert_eq!(parsed.meta.attempt, 3);
    }

    #[test]
    fn test_missing_meta_defaults_to_first_attempt() {
        let parsed =
            Envelope::parse(r#"{"trade":{"trade_id":"t1","user":"u","symbol":"BTC","price":1.0}}"#)
                .unwrap();
        assert_eq!(parsed.meta.attempt, 0);
    }

    #[test]
    fn test_not_json_rejected() {
        assert!(matches!(Envelope::parse("not-json"), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_wrong_shape_rejected() {
        assert!(matches!(Envelope::parse(r#"{"hello":"world"}"#), Err(ParseError::Shape)));
        assert!(matches!(Envelope::parse("[1,2,3]"), Err(ParseError::Shape)));
        assert!(matches!(
            Envelope::parse(r#"{"trade":{"trade_id":"t1"},"meta":{"attempt":0}}"#),
            Err(ParseError::Shape)
        ));
    }

    #[test]
    fn test_invalid_trade_rejected() {
        let result = Envelope::parse(r#"{"trade_id":"","user":"u","symbol":"BTC","price":1.0}"#);
        assert!(matches!(result, Err(ParseError::Invalid(_))));
    }

    #[test]
    fn test_next_attempt_keeps_payload_and_enqueued_at() {
        let first = Envelope::new(trade());
        let second = first.next_attempt();
        assert_eq!(second.trade, first.trade);
        assert_eq!(second.meta.enqueued_at, first.meta.enqueued_at);
        assert_eq!(second.meta.attempt, first.meta.attempt + 1);
    }

    #[test]
    fn test_dead_letter_record_for_raw() {
        let record = DeadLetterRecord::for_raw("not-json");
        assert_eq!(record.reason, INVALID_PAYLOAD);
        assert_eq!(record.envelope["raw_payload"], "not-json");
    }

    #[test]
    fn test_dead_letter_record_shape() {
        let envelope = Envelope::new(trade());
        let record = DeadLetterRecord::for_envelope(&envelope, "db down").unwrap();
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert!(json.get("failed_at").is_some());
        assert_eq!(json["reason"], "db down");
        assert_eq!(json["envelope"]["trade"]["trade_id"], "t1");
        assert_eq!(json["envelope"]["meta"]["attempt"], 0);
    }
}
