//! Channel subscription snapshot

use serde::{Deserialize, Serialize};

use super::StreamId;

/// What the client knows about a channel and the user's membership in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub stream_id: StreamId,
    pub name: String,
    /// Whether the current user is subscribed
    pub subscribed: bool,
    #[serde(default)]
    pub invite_only: bool,
    #[serde(default)]
    pub is_web_public: bool,
}

impl Subscription {
    /// A public channel the user is subscribed to
    pub fn new(stream_id: StreamId, name: impl Into<String>) -> Self {
        Self {
            stream_id,
            name: name.into(),
            subscribed: true,
            invite_only: false,
            is_web_public: false,
        }
    }

    pub fn unsubscribed(mut self) -> Self {
        self.subscribed = false;
        self
    }

    pub fn invite_only(mut self) -> Self {
        self.invite_only = true;
        self
    }
}
