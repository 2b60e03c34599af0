//! Fetch boundary tracking for a message list
//!
//! A list only holds a window of history. `FetchStatus` records whether the
//! window has reached the oldest and newest ends of the conversation on the
//! server, and whether a fetch in either direction is in flight.

use crate::models::{Message, MessageId};
use std::sync::Arc;

/// Outcome of a completed backward fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinishOlderBatch {
    /// Server reported there is nothing older
    pub found_oldest: bool,
    /// Older history exists but the plan limits access to it
    pub history_limited: bool,
}

/// Per-list fetch state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStatus {
    loading_older: bool,
    loading_newer: bool,
    found_oldest: bool,
    found_newest: bool,
    history_limited: bool,
    /// Highest id we know exists for this narrow, even if not yet held
    expected_max_message_id: Option<MessageId>,
}

fn max_id_for_messages(messages: &[Arc<Message>]) -> Option<MessageId> {
    messages.iter().map(|m| m.id).max()
}

impl FetchStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; used when a list is refilled from scratch
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn start_older_batch(&mut self) {
        self.loading_older = true;
    }

    pub fn finish_older_batch(&mut self, outcome: FinishOlderBatch) {
        self.loading_older = false;
        self.found_oldest = self.found_oldest || outcome.found_oldest;
        self.history_limited = self.history_limited || outcome.history_limited;
    }

    pub fn can_load_older_messages(&self) -> bool {
        !self.loading_older && !self.found_oldest
    }

    pub fn has_found_oldest(&self) -> bool {
        self.found_oldest
    }

    pub fn history_limited(&self) -> bool {
        self.history_limited
    }

    pub fn start_newer_batch(&mut self) {
        self.loading_newer = true;
    }

    /// Record the result of a forward fetch.
    ///
    /// Returns `true` when the server claimed we reached the newest message
    /// but a message newer than anything in `messages` arrived by event in
    /// the meantime. In that case the newest boundary is not recorded and
    /// the caller has to fetch again.
    pub fn finish_newer_batch(&mut self, messages: &[Arc<Message>], found_newest: bool) -> bool {
        self.loading_newer = false;
        self.found_newest = found_newest;

        let found_max = max_id_for_messages(messages);
        if self.found_newest
            && let Some(expected) = self.expected_max_message_id
            && found_max.is_none_or(|found| expected > found)
        {
            log::debug!(
                "[FEED] Newest boundary claimed below expected max id {}; refetching",
                expected
            );
            self.found_newest = false;
            return true;
        }
        false
    }

    pub fn can_load_newer_messages(&self) -> bool {
        !self.loading_newer && !self.found_newest
    }

    pub fn has_found_newest(&self) -> bool {
        self.found_newest
    }

    pub fn expected_max_message_id(&self) -> Option<MessageId> {
        self.expected_max_message_id
    }

    /// Raise the expected max id to cover `messages`.
    ///
    /// Called for messages that arrive while the newest boundary is unknown
    /// and therefore can't be added to the list. No-op for an empty batch.
    pub fn update_expected_max_message_id(&mut self, messages: &[Arc<Message>]) {
        if let Some(batch_max) = max_id_for_messages(messages) {
            self.expected_max_message_id = Some(
                self.expected_max_message_id
                    .map_or(batch_max, |current| current.max(batch_max)),
            );
        }
    }
}
