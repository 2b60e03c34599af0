//! Queries that span lists
//!
//! Read-only helpers over the shared message cache and the current list,
//! for callers outside any single message list.

mod direct_messages;
mod messages;

pub use direct_messages::{
    DirectMessagePermissionHints, get_direct_message_permission_hints,
    user_can_send_direct_message,
};
pub use messages::{
    get_max_message_id_in_stream, get_messages_in_dm_conversations, get_messages_in_topic,
    get_topics_for_message_ids,
};
