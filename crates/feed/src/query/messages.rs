//! Lookups over the cache of every loaded message

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::list::MessageListData;
use crate::models::{Message, MessageId, Recipient, StreamId};
use crate::storage::MessageStore;

/// Loaded messages in a topic, compared case-insensitively
pub fn get_messages_in_topic(
    all_messages: &MessageListData,
    stream_id: StreamId,
    topic: &str,
) -> Vec<Arc<Message>> {
    all_messages
        .all_messages()
        .iter()
        .filter(|m| {
            m.stream_id() == Some(stream_id)
                && m.topic().is_some_and(|t| t.to_lowercase() == topic.to_lowercase())
        })
        .cloned()
        .collect()
}

/// Loaded direct messages whose recipients match one of `user_ids_strings`
pub fn get_messages_in_dm_conversations(
    all_messages: &MessageListData,
    user_ids_strings: &[&str],
) -> Vec<Arc<Message>> {
    let wanted: BTreeSet<String> = user_ids_strings.iter().map(|s| canonical_ids(s)).collect();
    all_messages
        .all_messages()
        .iter()
        .filter(|m| match &m.recipient {
            Recipient::Private { to_user_ids, .. } => wanted.contains(&canonical_ids(to_user_ids)),
            Recipient::Stream { .. } => false,
        })
        .cloned()
        .collect()
}

/// Newest loaded message id in a channel
pub fn get_max_message_id_in_stream(
    all_messages: &MessageListData,
    stream_id: StreamId,
) -> Option<MessageId> {
    all_messages
        .all_messages()
        .iter()
        .rev()
        .find(|m| m.stream_id() == Some(stream_id))
        .map(|m| m.id)
}

/// Group channel messages by conversation, keyed `"stream_id:topic"`.
///
/// Ids missing from the store and direct messages are skipped.
pub fn get_topics_for_message_ids(
    store: &dyn MessageStore,
    ids: &[MessageId],
) -> BTreeMap<String, (StreamId, String)> {
    let mut topics = BTreeMap::new();
    for id in ids {
        let Some(message) = store.get(*id) else {
            continue;
        };
        if let Recipient::Stream { stream_id, topic } = &message.recipient {
            topics
                .entry(format!("{}:{}", stream_id, topic.to_lowercase()))
                .or_insert_with(|| (*stream_id, topic.clone()));
        }
    }
    topics
}

fn canonical_ids(user_ids_string: &str) -> String {
    let mut ids: Vec<i64> = user_ids_string
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
