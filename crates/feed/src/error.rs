//! Error types for the feed crate

use std::convert::Infallible;

use crate::models::NarrowTerm;

/// Identifier for a message list, allocated by [`crate::list::MessageLists`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(pub u64);

impl std::fmt::Display for ListId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller errors surfaced by message list operations
///
/// These abort the operation without touching list state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    #[error("Bad message id {0}")]
    BadMessageId(String),

    #[error("Cannot select into an empty message list ({items_length} items)")]
    EmptySelection {
        filter_terms: Vec<NarrowTerm>,
        items_length: usize,
    },

    #[error("Unknown message list {0}")]
    UnknownMessageList(ListId),
}

impl From<Infallible> for FeedError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
