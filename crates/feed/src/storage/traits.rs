//! Collaborator trait definitions
//!
//! Message lists consume shared client state (the message store, unread
//! tracking, muting, subscriptions, the user directory) through these
//! narrow traits. Implementations are shared behind `Arc` and use interior
//! mutability, so every method takes `&self`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Message, MessageId, StreamId, Subscription, UserId};

/// Canonical store of every message the client has fetched
pub trait MessageStore: Send + Sync {
    /// Get a message by ID
    fn get(&self, id: MessageId) -> Option<Arc<Message>>;

    /// Insert or replace a message, returning the shared handle
    fn insert(&self, message: Message) -> Arc<Message>;

    /// Drop a message (e.g. after a local echo was acknowledged)
    fn remove(&self, id: MessageId);
}

/// Aggregate unread counts shown in the UI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadCounts {
    pub direct_message_count: usize,
    pub home_unread_messages: usize,
    pub stream_unread_messages: usize,
    pub stream_count: HashMap<StreamId, usize>,
}

/// Live unread bookkeeping
pub trait UnreadState: Send + Sync {
    /// Record freshly loaded messages.
    ///
    /// Returns whether any of them is a previously unknown unread message.
    fn process_loaded_messages(&self, messages: &[Arc<Message>], expect_no_new_unreads: bool)
    -> bool;

    /// Whether the message is currently unread
    fn message_unread(&self, message: &Message) -> bool;

    /// Oldest unread message outside muted topics, across all conversations
    fn first_unread_unmuted_message_id(&self) -> Option<MessageId>;

    fn get_counts(&self) -> UnreadCounts;
}

/// Receives recomputed unread counts
pub trait UnreadCountsUi {
    fn update_unread_counts(&self, counts: &UnreadCounts);
}

/// Muted topics and users
pub trait MutingPolicy: Send + Sync {
    fn is_topic_muted(&self, stream_id: StreamId, topic: &str) -> bool;

    fn is_user_muted(&self, user_id: UserId) -> bool;

    /// Whether the message should be hidden from a list that excludes muted content
    fn is_message_muted(&self, message: &Message) -> bool {
        if self.is_user_muted(message.sender_id) {
            return true;
        }
        match (message.stream_id(), message.topic()) {
            (Some(stream_id), Some(topic)) => self.is_topic_muted(stream_id, topic),
            _ => false,
        }
    }
}

/// Channel subscription lookups
pub trait SubscriptionDirectory: Send + Sync {
    fn get_sub(&self, name: &str) -> Option<Subscription>;

    fn get_sub_by_id(&self, stream_id: StreamId) -> Option<Subscription>;

    fn is_subscribed_by_name(&self, name: &str) -> bool {
        self.get_sub(name).is_some_and(|sub| sub.subscribed)
    }

    /// Whether the current user may join or leave the channel
    fn can_toggle_subscription(&self, sub: &Subscription) -> bool;
}

/// User directory and direct message conversation cache
pub trait PeopleDirectory: Send + Sync {
    fn my_user_id(&self) -> UserId;

    /// Resolve comma separated emails into a sorted, comma separated id list
    fn emails_strings_to_user_ids_string(&self, emails: &str) -> Option<String>;

    /// Whether a DM conversation with these users is in the recent cache
    fn has_recent_conversation(&self, user_ids_string: &str) -> bool;

    /// Whether the current user may start a new DM thread with these users
    fn user_can_initiate_direct_message_thread(&self, user_ids_string: &str) -> bool;

    /// Whether the current user may DM these users at all
    fn user_can_direct_message(&self, user_ids_string: &str) -> bool;

    /// Canonical key for a DM conversation.
    ///
    /// Sorted ids of the other participants; the current user's own id is
    /// only kept for a conversation with themself.
    fn pm_lookup_key(&self, user_ids_string: &str) -> String {
        let me = self.my_user_id();
        let mut ids: Vec<UserId> = user_ids_string
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() > 1 {
            ids.retain(|&id| id != me);
        }
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
