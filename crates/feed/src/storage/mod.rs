//! Shared client state consumed by message lists
//!
//! This module defines the collaborator traits message lists depend on,
//! plus in-memory implementations. The trait-based design keeps the list
//! logic independent of where unread, muting and subscription state lives.

mod memory;
mod traits;

pub use memory::{
    InMemoryMessageStore, InMemoryMuting, InMemoryPeople, InMemorySubscriptions, InMemoryUnread,
};
pub use traits::{
    MessageStore, MutingPolicy, PeopleDirectory, SubscriptionDirectory, UnreadCounts,
    UnreadCountsUi, UnreadState,
};
