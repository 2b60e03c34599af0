//! Option structs and selection notifications for message lists

use std::sync::Arc;

use crate::error::ListId;
use crate::models::MessageId;
use crate::storage::{MutingPolicy, SubscriptionDirectory, UnreadState};

/// Options for [`super::MessageList::select_id`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    /// Scroll the selected message into view
    pub then_scroll: bool,
    /// Pixel offset from the top of the viewport to scroll the message to
    pub target_scroll_offset: Option<i32>,
    /// The caller expects the id may not be present and accepts the closest one
    pub use_closest: bool,
    /// Selecting into an empty list is allowed (and clears the selection)
    pub empty_ok: bool,
    /// Whether observers may mark the selected message as read
    pub mark_read: bool,
    /// Rebuild the rendering from scratch after selecting
    pub force_rerender: bool,
    /// The call comes from the rendering pass itself
    pub from_rendering: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            then_scroll: false,
            target_scroll_offset: None,
            use_closest: false,
            empty_ok: false,
            mark_read: true,
            force_rerender: false,
            from_rendering: false,
        }
    }
}

/// Options for adding messages to a list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddMessagesOptions {
    /// The messages were just sent, as opposed to fetched history
    pub messages_are_new: bool,
}

/// Options for [`super::MessageList::clear`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOptions {
    pub clear_selected_id: bool,
}

impl Default for ClearOptions {
    fn default() -> Self {
        Self {
            clear_selected_id: true,
        }
    }
}

/// Construction options for a message list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageListOptions {
    /// Hide messages in muted topics and from muted users
    pub excludes_muted_topics: bool,
}

/// Shared collaborators handed to every list
#[derive(Clone)]
pub struct ListServices {
    pub unread: Arc<dyn UnreadState>,
    pub muting: Arc<dyn MutingPolicy>,
    pub subscriptions: Arc<dyn SubscriptionDirectory>,
}

/// Emitted after every selection change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSelected {
    pub list_id: ListId,
    /// The resolved id; `None` only when selecting into an empty list with `empty_ok`
    pub id: Option<MessageId>,
    pub previously_selected_id: Option<MessageId>,
    pub options: SelectOptions,
}

/// Handle returned by [`super::MessageList::subscribe_selection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&MessageSelected)>;

/// Ordered list of selection listeners, invoked synchronously
#[derive(Default)]
pub(crate) struct SelectionObservers {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl SelectionObservers {
    pub(crate) fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub(crate) fn notify(&mut self, event: &MessageSelected) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}
