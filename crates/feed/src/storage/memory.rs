//! In-memory collaborator implementations
//!
//! Used by tests and by headless consumers that keep all client state in
//! process. Each type guards its maps with `RwLock`s so it can be shared
//! behind an `Arc`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::traits::{
    MessageStore, MutingPolicy, PeopleDirectory, SubscriptionDirectory, UnreadCounts, UnreadState,
};
use crate::models::{Message, MessageId, Recipient, StreamId, Subscription, UserId};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory implementation of MessageStore
#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<HashMap<MessageId, Arc<Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch, returning the shared handles in input order
    pub fn insert_all(&self, messages: impl IntoIterator<Item = Message>) -> Vec<Arc<Message>> {
        messages.into_iter().map(|m| self.insert(m)).collect()
    }

    pub fn len(&self) -> usize {
        read(&self.messages).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageStore for InMemoryMessageStore {
    fn get(&self, id: MessageId) -> Option<Arc<Message>> {
        read(&self.messages).get(&id).cloned()
    }

    fn insert(&self, message: Message) -> Arc<Message> {
        let message = Arc::new(message);
        write(&self.messages).insert(message.id, Arc::clone(&message));
        message
    }

    fn remove(&self, id: MessageId) {
        write(&self.messages).remove(&id);
    }
}

/// Where an unread message lives, for count aggregation
#[derive(Debug, Clone)]
struct UnreadEntry {
    stream: Option<(StreamId, String)>,
}

/// In-memory unread tracker
///
/// A message is unread from the moment it is loaded with no `read` flag
/// until [`InMemoryUnread::mark_as_read`] is called for it.
pub struct InMemoryUnread {
    unread: RwLock<BTreeMap<MessageId, UnreadEntry>>,
    muting: Option<Arc<dyn MutingPolicy>>,
}

impl InMemoryUnread {
    pub fn new() -> Self {
        Self {
            unread: RwLock::new(BTreeMap::new()),
            muting: None,
        }
    }

    /// Tracker that skips muted topics when looking for the first unread
    pub fn with_muting(muting: Arc<dyn MutingPolicy>) -> Self {
        Self {
            unread: RwLock::new(BTreeMap::new()),
            muting: Some(muting),
        }
    }

    pub fn mark_as_read(&self, ids: &[MessageId]) {
        let mut unread = write(&self.unread);
        for id in ids {
            unread.remove(id);
        }
    }

    pub fn mark_as_unread(&self, messages: &[Arc<Message>]) {
        let mut unread = write(&self.unread);
        for message in messages {
            unread.insert(message.id, Self::entry_for(message));
        }
    }

    pub fn unread_count(&self) -> usize {
        read(&self.unread).len()
    }

    fn entry_for(message: &Message) -> UnreadEntry {
        UnreadEntry {
            stream: match &message.recipient {
                Recipient::Stream { stream_id, topic } => Some((*stream_id, topic.clone())),
                Recipient::Private { .. } => None,
            },
        }
    }

    fn is_muted(&self, entry: &UnreadEntry) -> bool {
        match (&self.muting, &entry.stream) {
            (Some(muting), Some((stream_id, topic))) => muting.is_topic_muted(*stream_id, topic),
            _ => false,
        }
    }
}

impl Default for InMemoryUnread {
    fn default() -> Self {
        Self::new()
    }
}

impl UnreadState for InMemoryUnread {
    fn process_loaded_messages(
        &self,
        messages: &[Arc<Message>],
        expect_no_new_unreads: bool,
    ) -> bool {
        let mut unread = write(&self.unread);
        let mut any_new_unreads = false;

        for message in messages {
            if !message.is_unread() || unread.contains_key(&message.id) {
                continue;
            }
            if expect_no_new_unreads {
                log::warn!(
                    "[UNREAD] New unread message {} discovered where none were expected",
                    message.id
                );
            }
            unread.insert(message.id, Self::entry_for(message));
            any_new_unreads = true;
        }

        any_new_unreads
    }

    fn message_unread(&self, message: &Message) -> bool {
        read(&self.unread).contains_key(&message.id)
    }

    fn first_unread_unmuted_message_id(&self) -> Option<MessageId> {
        read(&self.unread)
            .iter()
            .find(|(_, entry)| !self.is_muted(entry))
            .map(|(id, _)| *id)
    }

    fn get_counts(&self) -> UnreadCounts {
        let unread = read(&self.unread);
        let mut counts = UnreadCounts::default();

        for entry in unread.values() {
            match &entry.stream {
                Some((stream_id, _)) => {
                    counts.stream_unread_messages += 1;
                    *counts.stream_count.entry(*stream_id).or_default() += 1;
                    if !self.is_muted(entry) {
                        counts.home_unread_messages += 1;
                    }
                }
                None => {
                    counts.direct_message_count += 1;
                    counts.home_unread_messages += 1;
                }
            }
        }

        counts
    }
}

/// In-memory muted topics and users
#[derive(Default)]
pub struct InMemoryMuting {
    topics: RwLock<HashSet<(StreamId, String)>>,
    users: RwLock<HashSet<UserId>>,
}

impl InMemoryMuting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mute_topic(&self, stream_id: StreamId, topic: &str) {
        write(&self.topics).insert((stream_id, topic.to_lowercase()));
    }

    pub fn unmute_topic(&self, stream_id: StreamId, topic: &str) {
        write(&self.topics).remove(&(stream_id, topic.to_lowercase()));
    }

    pub fn mute_user(&self, user_id: UserId) {
        write(&self.users).insert(user_id);
    }

    pub fn unmute_user(&self, user_id: UserId) {
        write(&self.users).remove(&user_id);
    }
}

impl MutingPolicy for InMemoryMuting {
    fn is_topic_muted(&self, stream_id: StreamId, topic: &str) -> bool {
        read(&self.topics).contains(&(stream_id, topic.to_lowercase()))
    }

    fn is_user_muted(&self, user_id: UserId) -> bool {
        read(&self.users).contains(&user_id)
    }
}

/// In-memory channel subscriptions, keyed by channel name
#[derive(Default)]
pub struct InMemorySubscriptions {
    subs: RwLock<HashMap<String, Subscription>>,
    /// Channels whose subscription the current user may not toggle
    locked: RwLock<HashSet<StreamId>>,
}

impl InMemorySubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sub: Subscription) {
        write(&self.subs).insert(sub.name.clone(), sub);
    }

    pub fn remove(&self, name: &str) {
        write(&self.subs).remove(name);
    }

    pub fn set_subscribed(&self, name: &str, subscribed: bool) {
        if let Some(sub) = write(&self.subs).get_mut(name) {
            sub.subscribed = subscribed;
        }
    }

    pub fn lock_subscription(&self, stream_id: StreamId) {
        write(&self.locked).insert(stream_id);
    }
}

impl SubscriptionDirectory for InMemorySubscriptions {
    fn get_sub(&self, name: &str) -> Option<Subscription> {
        read(&self.subs).get(name).cloned()
    }

    fn get_sub_by_id(&self, stream_id: StreamId) -> Option<Subscription> {
        read(&self.subs)
            .values()
            .find(|sub| sub.stream_id == stream_id)
            .cloned()
    }

    fn can_toggle_subscription(&self, sub: &Subscription) -> bool {
        // Private channels can be left but not joined without an invite
        if sub.invite_only && !sub.subscribed {
            return false;
        }
        !read(&self.locked).contains(&sub.stream_id)
    }
}

/// In-memory user directory
pub struct InMemoryPeople {
    my_user_id: UserId,
    ids_by_email: RwLock<HashMap<String, UserId>>,
    recent_conversations: RwLock<HashSet<String>>,
    /// Users the current user may not DM at all
    blocked: RwLock<HashSet<UserId>>,
    /// Whether the current user may start new DM threads
    can_initiate: RwLock<bool>,
}

impl InMemoryPeople {
    pub fn new(my_user_id: UserId) -> Self {
        Self {
            my_user_id,
            ids_by_email: RwLock::new(HashMap::new()),
            recent_conversations: RwLock::new(HashSet::new()),
            blocked: RwLock::new(HashSet::new()),
            can_initiate: RwLock::new(true),
        }
    }

    pub fn add_user(&self, user_id: UserId, email: &str) {
        write(&self.ids_by_email).insert(email.trim().to_lowercase(), user_id);
    }

    /// Record a DM conversation as present in the recent-conversations cache
    pub fn add_recent_conversation(&self, user_ids_string: &str) {
        let key = self.pm_lookup_key(user_ids_string);
        write(&self.recent_conversations).insert(key);
    }

    pub fn block_direct_messages(&self, user_id: UserId) {
        write(&self.blocked).insert(user_id);
    }

    pub fn set_can_initiate_direct_message_thread(&self, allowed: bool) {
        *write(&self.can_initiate) = allowed;
    }

    fn parse_ids(user_ids_string: &str) -> Vec<UserId> {
        user_ids_string
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }
}

impl PeopleDirectory for InMemoryPeople {
    fn my_user_id(&self) -> UserId {
        self.my_user_id
    }

    fn emails_strings_to_user_ids_string(&self, emails: &str) -> Option<String> {
        let by_email = read(&self.ids_by_email);
        let mut ids = emails
            .split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| by_email.get(&e).copied())
            .collect::<Option<Vec<UserId>>>()?;
        if ids.is_empty() {
            return None;
        }
        ids.sort_unstable();
        ids.dedup();
        Some(
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    fn has_recent_conversation(&self, user_ids_string: &str) -> bool {
        let key = self.pm_lookup_key(user_ids_string);
        read(&self.recent_conversations).contains(&key)
    }

    fn user_can_initiate_direct_message_thread(&self, _user_ids_string: &str) -> bool {
        *read(&self.can_initiate)
    }

    fn user_can_direct_message(&self, user_ids_string: &str) -> bool {
        let blocked = read(&self.blocked);
        !Self::parse_ids(user_ids_string)
            .iter()
            .any(|id| blocked.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_msg(id: i64, stream_id: StreamId, topic: &str) -> Arc<Message> {
        Arc::new(
            Message::builder(MessageId::new(id))
                .sender(1)
                .stream(stream_id, topic)
                .build(),
        )
    }

    #[test]
    fn test_message_store_roundtrip() {
        let store = InMemoryMessageStore::new();
        assert!(store.is_empty());
        store.insert(Message::builder(MessageId::new(1)).build());
        assert!(store.get(MessageId::new(1)).is_some());
        store.remove(MessageId::new(1));
        assert!(store.get(MessageId::new(1)).is_none());
    }

    #[test]
    fn test_process_loaded_messages_reports_new_unreads() {
        let unread = InMemoryUnread::new();
        let read_msg = Arc::new(Message::builder(MessageId::new(1)).read().build());
        assert!(!unread.process_loaded_messages(&[read_msg], false));

        let new_msg = stream_msg(2, 1, "a");
        assert!(unread.process_loaded_messages(&[Arc::clone(&new_msg)], false));
        // Already known; nothing new the second time
        assert!(!unread.process_loaded_messages(&[Arc::clone(&new_msg)], false));
        assert!(unread.message_unread(&new_msg));

        unread.mark_as_read(&[new_msg.id]);
        assert!(!unread.message_unread(&new_msg));
    }

    #[test]
    fn test_first_unread_unmuted_skips_muted_topics() {
        let muting = Arc::new(InMemoryMuting::new());
        muting.mute_topic(1, "Noise");
        let unread = InMemoryUnread::with_muting(muting);

        let loaded = [stream_msg(5, 1, "noise"), stream_msg(8, 1, "signal")];
        unread.process_loaded_messages(&loaded, false);
        assert_eq!(unread.first_unread_unmuted_message_id(), Some(MessageId::new(8)));

        let counts = unread.get_counts();
        assert_eq!(counts.stream_unread_messages, 2);
        assert_eq!(counts.home_unread_messages, 1);
        assert_eq!(counts.stream_count.get(&1), Some(&2));
    }

    #[test]
    fn test_muting_policy_default_method() {
        let muting = InMemoryMuting::new();
        muting.mute_user(9);
        let from_muted = Message::builder(MessageId::new(1)).sender(9).build();
        let from_other = Message::builder(MessageId::new(2)).sender(3).stream(4, "x").build();
        assert!(muting.is_message_muted(&from_muted));
        assert!(!muting.is_message_muted(&from_other));
    }

    #[test]
    fn test_can_toggle_subscription() {
        let subs = InMemorySubscriptions::new();
        let private = Subscription::new(1, "secret").invite_only().unsubscribed();
        let public = Subscription::new(2, "general");
        assert!(!subs.can_toggle_subscription(&private));
        assert!(subs.can_toggle_subscription(&public));
        subs.lock_subscription(2);
        assert!(!subs.can_toggle_subscription(&public));
    }

    #[test]
    fn test_pm_lookup_key_drops_self() {
        let people = InMemoryPeople::new(1);
        assert_eq!(people.pm_lookup_key("3,1,2"), "2,3");
        assert_eq!(people.pm_lookup_key("1"), "1");
    }

    #[test]
    fn test_emails_to_user_ids() {
        let people = InMemoryPeople::new(1);
        people.add_user(2, "alice@example.com");
        people.add_user(3, "bob@example.com");
        assert_eq!(
            people.emails_strings_to_user_ids_string("Bob@example.com,alice@example.com"),
            Some("2,3".to_string())
        );
        assert_eq!(people.emails_strings_to_user_ids_string("nobody@example.com"), None);
    }
}
