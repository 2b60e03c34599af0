//! Message model representing a chat message as delivered by the server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FeedError;

/// Numeric id of a user
pub type UserId = i64;

/// Numeric id of a channel (stream)
pub type StreamId = i64;

/// Number of local-echo slots between two consecutive server ids
const LOCAL_ID_SCALE: i64 = 100;

/// Unique, totally ordered identifier for a message
///
/// Server ids are integers. A locally echoed message that has not been
/// acknowledged yet gets a fractional id (`1234.01`, `1234.02`, ...) so it
/// sorts directly after the last server id it was sent after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawMessageId", into = "RawMessageId")]
pub struct MessageId(i64);

impl MessageId {
    /// Id assigned by the server.
    ///
    /// Ids beyond `i64::MAX / 100` saturate; use [`MessageId::checked`] for
    /// untrusted input.
    pub const fn new(id: i64) -> Self {
        Self(id.saturating_mul(LOCAL_ID_SCALE))
    }

    /// Local-echo id: slot `seq` (1..=99) after server id `after`
    pub fn local(after: i64, seq: u32) -> Self {
        let seq = i64::from(seq).clamp(1, LOCAL_ID_SCALE - 1);
        Self(after.saturating_mul(LOCAL_ID_SCALE).saturating_add(seq))
    }

    /// Id for server id `server` and local slot `local`, or `None` if it
    /// doesn't fit
    pub fn checked(server: i64, local: i64) -> Option<Self> {
        server
            .checked_mul(LOCAL_ID_SCALE)
            .and_then(|scaled| scaled.checked_add(local))
            .map(Self)
    }

    /// The integral (server) part of the id
    pub fn server_id(&self) -> i64 {
        self.0.div_euclid(LOCAL_ID_SCALE)
    }

    /// Whether this id belongs to a locally echoed message
    pub fn is_local(&self) -> bool {
        self.0.rem_euclid(LOCAL_ID_SCALE) != 0
    }

    /// Absolute numeric distance between two ids, in local-id units
    pub fn distance(&self, other: MessageId) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local = self.0.rem_euclid(LOCAL_ID_SCALE);
        if local == 0 {
            write!(f, "{}", self.server_id())
        } else {
            write!(f, "{}.{:02}", self.server_id(), local)
        }
    }
}

impl FromStr for MessageId {
    type Err = FeedError;

    /// Parse `"1234"` or `"1234.01"`; anything else is a bad id
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || FeedError::BadMessageId(s.to_string());
        let trimmed = s.trim();
        let (whole, frac) = match trimmed.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (trimmed, None),
        };

        let server: i64 = whole.parse().map_err(|_| bad())?;
        let local = match frac {
            None | Some("") => 0,
            Some(frac) if frac.len() <= 2 && frac.chars().all(|c| c.is_ascii_digit()) => {
                // "5" means .50, matching decimal notation
                let padded = format!("{:0<2}", frac);
                padded.parse::<i64>().map_err(|_| bad())?
            }
            Some(_) => return Err(bad()),
        };

        Self::checked(server, local).ok_or_else(bad)
    }
}

impl TryFrom<&str> for MessageId {
    type Error = FeedError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for MessageId {
    type Error = FeedError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Wire form of a message id: integers for server ids, strings for local ids
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawMessageId {
    Server(i64),
    Local(String),
}

impl TryFrom<RawMessageId> for MessageId {
    type Error = FeedError;

    fn try_from(raw: RawMessageId) -> Result<Self, Self::Error> {
        match raw {
            RawMessageId::Server(id) => {
                MessageId::checked(id, 0).ok_or_else(|| FeedError::BadMessageId(id.to_string()))
            }
            RawMessageId::Local(s) => s.parse(),
        }
    }
}

impl From<MessageId> for RawMessageId {
    fn from(id: MessageId) -> Self {
        if id.is_local() {
            RawMessageId::Local(id.to_string())
        } else {
            RawMessageId::Server(id.server_id())
        }
    }
}

/// Server flag names carried in [`Message::flags`]
pub mod flags {
    pub const READ: &str = "read";
    pub const HISTORICAL: &str = "historical";
    pub const MENTIONED: &str = "mentioned";
    pub const STARRED: &str = "starred";
}

/// Where a message was sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Recipient {
    /// Channel message, addressed to a topic
    Stream { stream_id: StreamId, topic: String },
    /// Direct message
    Private {
        /// Sorted, comma separated user ids of the other participants
        to_user_ids: String,
        /// Comma separated emails of the other participants
        reply_to: String,
    },
}

/// A single message. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    /// When the message was sent
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Server flags (e.g., "read", "historical", "starred")
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(flatten)]
    pub recipient: Recipient,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: impl Into<MessageId>) -> MessageBuilder {
        MessageBuilder::new(id.into())
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Unread as of fetch time. Live state belongs to the unread tracker.
    pub fn is_unread(&self) -> bool {
        !self.has_flag(flags::READ)
    }

    /// Whether the user was not subscribed when the message was sent
    pub fn is_historical(&self) -> bool {
        self.has_flag(flags::HISTORICAL)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.recipient, Recipient::Stream { .. })
    }

    pub fn is_private(&self) -> bool {
        matches!(self.recipient, Recipient::Private { .. })
    }

    pub fn stream_id(&self) -> Option<StreamId> {
        match &self.recipient {
            Recipient::Stream { stream_id, .. } => Some(*stream_id),
            Recipient::Private { .. } => None,
        }
    }

    pub fn topic(&self) -> Option<&str> {
        match &self.recipient {
            Recipient::Stream { topic, .. } => Some(topic),
            Recipient::Private { .. } => None,
        }
    }

    /// Copy of this message under a different id (local echo acknowledgement)
    pub fn with_id(&self, id: MessageId) -> Message {
        Message {
            id,
            ..self.clone()
        }
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    sender_id: UserId,
    timestamp: Option<DateTime<Utc>>,
    flags: Vec<String>,
    recipient: Recipient,
}

impl MessageBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            sender_id: 0,
            timestamp: None,
            flags: Vec::new(),
            recipient: Recipient::Stream {
                stream_id: 0,
                topic: String::new(),
            },
        }
    }

    pub fn sender(mut self, sender_id: UserId) -> Self {
        self.sender_id = sender_id;
        self
    }

    pub fn stream(mut self, stream_id: StreamId, topic: impl Into<String>) -> Self {
        self.recipient = Recipient::Stream {
            stream_id,
            topic: topic.into(),
        };
        self
    }

    pub fn private(mut self, to_user_ids: impl Into<String>, reply_to: impl Into<String>) -> Self {
        self.recipient = Recipient::Private {
            to_user_ids: to_user_ids.into(),
            reply_to: reply_to.into(),
        };
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn flag(mut self, flag: &str) -> Self {
        if !self.flags.iter().any(|f| f == flag) {
            self.flags.push(flag.to_string());
        }
        self
    }

    pub fn read(self) -> Self {
        self.flag(flags::READ)
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            sender_id: self.sender_id,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            flags: self.flags,
            recipient: self.recipient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ids_sort_after_their_server_id() {
        let server = MessageId::new(1234);
        let local = MessageId::local(1234, 1);
        let next = MessageId::new(1235);

        assert!(server < local);
        assert!(local < next);
        assert!(local.is_local());
        assert!(!server.is_local());
        assert_eq!(local.server_id(), 1234);
    }

    #[test]
    fn test_parse_message_id() {
        assert_eq!("42".parse::<MessageId>().unwrap(), MessageId::new(42));
        assert_eq!(" 42 ".parse::<MessageId>().unwrap(), MessageId::new(42));
        assert_eq!("42.01".parse::<MessageId>().unwrap(), MessageId::local(42, 1));
        assert_eq!("42.5".parse::<MessageId>().unwrap(), MessageId::local(42, 50));
    }

    #[test]
    fn test_parse_bad_message_id() {
        assert_eq!(
            "abc".parse::<MessageId>(),
            Err(FeedError::BadMessageId("abc".to_string()))
        );
        assert!("".parse::<MessageId>().is_err());
        assert!("1.234".parse::<MessageId>().is_err());
        assert!("1.x".parse::<MessageId>().is_err());
    }

    #[test]
    fn test_oversized_message_id_is_rejected() {
        assert_eq!(
            "100000000000000000".parse::<MessageId>(),
            Err(FeedError::BadMessageId("100000000000000000".to_string()))
        );
        assert!(MessageId::try_from("92233720368547758.08").is_err());

        let json = r#"{"id": 100000000000000000, "sender_id": 1, "timestamp": 0,
            "type": "stream", "stream_id": 1, "topic": "t"}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());

        assert_eq!(MessageId::new(i64::MAX), MessageId::new(i64::MAX / 100 + 1));
    }

    #[test]
    fn test_display_message_id() {
        assert_eq!(MessageId::new(7).to_string(), "7");
        assert_eq!(MessageId::local(7, 3).to_string(), "7.03");
    }

    #[test]
    fn test_distance() {
        assert_eq!(MessageId::new(10).distance(MessageId::new(15)), 500);
        assert_eq!(MessageId::new(15).distance(MessageId::new(10)), 500);
    }

    #[test]
    fn test_deserialize_stream_message() {
        let json = r#"{
            "id": 101,
            "sender_id": 5,
            "timestamp": 1700000000,
            "flags": ["read"],
            "type": "stream",
            "stream_id": 3,
            "topic": "lunch"
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, MessageId::new(101));
        assert_eq!(msg.stream_id(), Some(3));
        assert_eq!(msg.topic(), Some("lunch"));
        assert!(!msg.is_unread());
    }

    #[test]
    fn test_deserialize_private_message_defaults_to_unread() {
        let json = r#"{
            "id": 102,
            "sender_id": 5,
            "timestamp": 1700000000,
            "type": "private",
            "to_user_ids": "5,9",
            "reply_to": "alice@example.com"
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(msg.is_private());
        assert!(msg.is_unread());
        assert_eq!(msg.topic(), None);
    }

    #[test]
    fn test_serialize_local_id_as_string() {
        let msg = Message::builder(MessageId::local(10, 1)).sender(1).build();
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["id"], "10.01");

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back.id, MessageId::local(10, 1));
    }
}
