//! Feed crate - Message list core for a chat client
//!
//! This crate provides the platform-independent state behind a message
//! feed:
//! - Domain models (Message, MessageId, Filter, Subscription)
//! - Fetch boundary tracking and message ingestion
//! - Ordered per-narrow message storage with selection
//! - Message lists bound to a renderer, and the registry that owns them
//! - Collaborator traits for unread state, muting, subscriptions and people
//! - Cross-list queries
//!
//! Rendering is a trait; the crate ships a headless renderer and in-memory
//! collaborators so it can run without any UI.

pub mod config;
pub mod error;
pub mod list;
pub mod models;
pub mod query;
pub mod render;
pub mod storage;
pub mod sync;

pub use config::{HomeView, MarkReadOnScrollPolicy, UserSettings};
pub use error::{FeedError, ListId, Result};
pub use list::{
    AddMessagesInfo, AddMessagesOptions, ClearOptions, ListServices, ListenerId, MessageList,
    MessageListData, MessageListOptions, MessageLists, MessageSelected, SelectOptions,
};
pub use models::{Filter, Message, MessageBuilder, MessageId, NarrowTerm, Recipient, Subscription};
pub use query::{
    DirectMessagePermissionHints, get_direct_message_permission_hints, get_max_message_id_in_stream,
    get_messages_in_dm_conversations, get_messages_in_topic, get_topics_for_message_ids,
    user_can_send_direct_message,
};
pub use render::{
    HeadlessRenderer, MessageListRenderer, RenderInfo, RenderOp, TrailingBookend, ViewSnapshot,
};
pub use storage::{
    InMemoryMessageStore, InMemoryMuting, InMemoryPeople, InMemorySubscriptions, InMemoryUnread,
    MessageStore, MutingPolicy, PeopleDirectory, SubscriptionDirectory, UnreadCounts,
    UnreadCountsUi, UnreadState,
};
pub use sync::{
    FetchStatus, FinishOlderBatch, add_messages, add_new_messages, add_new_messages_data,
    add_old_messages, do_unread_count_updates, insert_new_messages,
};
