//! Ordered message storage for a single narrow
//!
//! `MessageListData` holds the messages matching one [`Filter`], strictly
//! ordered by id and free of duplicates. Two sequences are kept:
//! `all_items` has every held message, `items` has the ones visible after
//! muting. They are identical unless the list was built with a muting
//! policy.
//!
//! Selection is tracked as an id. Whenever it has to be resolved against
//! the held messages, the closest visible id wins.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::models::{Filter, Message, MessageId, UserId};
use crate::storage::{MutingPolicy, UnreadState};
use crate::sync::FetchStatus;

/// Where freshly added messages landed relative to the held range
#[derive(Debug, Clone, Default)]
pub struct AddMessagesInfo {
    /// Older than everything held; rendered by prepending
    pub top_messages: Vec<Arc<Message>>,
    /// Newer than everything held; rendered by appending
    pub bottom_messages: Vec<Arc<Message>>,
    /// Inside the held range; forces a full rerender
    pub interior_messages: Vec<Arc<Message>>,
}

impl AddMessagesInfo {
    pub fn is_empty(&self) -> bool {
        self.top_messages.is_empty()
            && self.bottom_messages.is_empty()
            && self.interior_messages.is_empty()
    }
}

fn sort_by_id(messages: &mut [Arc<Message>]) {
    messages.sort_by_key(|m| m.id);
}

fn is_sorted_by_id(messages: &[Arc<Message>]) -> bool {
    messages.windows(2).all(|pair| pair[0].id < pair[1].id)
}

/// Messages for one narrow, plus selection and fetch state
pub struct MessageListData {
    filter: Filter,
    muting: Option<Arc<dyn MutingPolicy>>,
    all_items: Vec<Arc<Message>>,
    items: Vec<Arc<Message>>,
    hash: HashMap<MessageId, Arc<Message>>,
    local_only: HashSet<MessageId>,
    selected_id: Option<MessageId>,
    fetch_status: FetchStatus,
}

impl MessageListData {
    /// Data for a narrow that shows muted content
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            muting: None,
            all_items: Vec::new(),
            items: Vec::new(),
            hash: HashMap::new(),
            local_only: HashSet::new(),
            selected_id: None,
            fetch_status: FetchStatus::new(),
        }
    }

    /// Data for a narrow that hides muted topics and users
    pub fn excluding_muted(filter: Filter, muting: Arc<dyn MutingPolicy>) -> Self {
        Self {
            muting: Some(muting),
            ..Self::new(filter)
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn excludes_muted_topics(&self) -> bool {
        self.muting.is_some()
    }

    pub fn fetch_status(&self) -> &FetchStatus {
        &self.fetch_status
    }

    pub fn fetch_status_mut(&mut self) -> &mut FetchStatus {
        &mut self.fetch_status
    }

    // === Size and bounds ===

    /// Number of visible messages
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// No messages held at all, muted or not
    pub fn empty(&self) -> bool {
        self.all_items.is_empty()
    }

    /// No visible messages
    pub fn visibly_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&Arc<Message>> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&Arc<Message>> {
        self.items.last()
    }

    pub fn first_including_muted(&self) -> Option<&Arc<Message>> {
        self.all_items.first()
    }

    pub fn last_including_muted(&self) -> Option<&Arc<Message>> {
        self.all_items.last()
    }

    /// Visible messages in id order
    pub fn all_messages(&self) -> &[Arc<Message>] {
        &self.items
    }

    pub fn get(&self, id: MessageId) -> Option<&Arc<Message>> {
        self.hash.get(&id)
    }

    /// Whether `id` lies inside the fetched range, held or not.
    ///
    /// An id inside the range that isn't held was deleted or never
    /// existed; one outside it simply hasn't been fetched.
    pub fn msg_id_in_fetched_range(&self, id: MessageId) -> bool {
        match (self.first_including_muted(), self.last_including_muted()) {
            (Some(first), Some(last)) => first.id <= id && id <= last.id,
            _ => false,
        }
    }

    /// Visible messages with ids in `start..=end`
    pub fn message_range(&self, start: MessageId, end: MessageId) -> &[Arc<Message>] {
        let start_idx = self.items.partition_point(|m| m.id < start);
        let end_idx = self.items.partition_point(|m| m.id <= end);
        if start_idx >= end_idx {
            return &[];
        }
        &self.items[start_idx..end_idx]
    }

    // === Filtering ===

    pub fn is_keyword_search(&self) -> bool {
        self.filter.is_keyword_search()
    }

    /// Whether this narrow allows passive mark-as-read
    pub fn can_mark_messages_read(&self) -> bool {
        self.filter.can_mark_messages_read()
    }

    /// The subset of `messages` this list would display
    pub fn unmuted_messages(&self, messages: &[Arc<Message>]) -> Vec<Arc<Message>> {
        match &self.muting {
            Some(muting) => messages
                .iter()
                .filter(|m| !muting.is_message_muted(m))
                .cloned()
                .collect(),
            None => messages.to_vec(),
        }
    }

    /// Recompute the visible items after muting changed
    pub fn update_items_for_muting(&mut self) {
        if self.muting.is_none() {
            return;
        }
        self.items = self.unmuted_messages(&self.all_items);
        self.resolve_stale_selection();
    }

    /// Drop messages we already hold, repeats within the batch, and
    /// messages outside this narrow
    fn valid_non_duplicated_messages(&self, messages: &[Arc<Message>]) -> Vec<Arc<Message>> {
        let mut seen = HashSet::new();
        messages
            .iter()
            .filter(|m| !self.hash.contains_key(&m.id) && seen.insert(m.id))
            .filter(|m| self.filter.predicate(m))
            .cloned()
            .collect()
    }

    // === Ingestion ===

    /// Add a batch, classifying each new message against the held range.
    ///
    /// Storage is updated for every category; the returned vectors only
    /// contain the messages that are visible in this list.
    pub fn add_messages(&mut self, messages: &[Arc<Message>]) -> AddMessagesInfo {
        let fresh = self.valid_non_duplicated_messages(messages);
        let mut top_messages = Vec::new();
        let mut bottom_messages = Vec::new();
        let mut interior_messages = Vec::new();

        let bounds = self
            .first_including_muted()
            .zip(self.last_including_muted())
            .map(|(first, last)| (first.id, last.id));

        match bounds {
            // Initial fill: everything goes at the bottom
            None => bottom_messages = fresh,
            Some((first_id, last_id)) => {
                for message in fresh {
                    if message.id > last_id {
                        bottom_messages.push(message);
                    } else if message.id < first_id {
                        top_messages.push(message);
                    } else {
                        interior_messages.push(message);
                    }
                }
            }
        }

        if !interior_messages.is_empty() {
            interior_messages = self.add_anywhere(interior_messages);
        }
        if !top_messages.is_empty() {
            top_messages = self.prepend(top_messages);
        }
        if !bottom_messages.is_empty() {
            bottom_messages = self.append(bottom_messages);
        }

        log::debug!(
            "[FEED] Added messages: {} top, {} bottom, {} interior",
            top_messages.len(),
            bottom_messages.len(),
            interior_messages.len()
        );

        AddMessagesInfo {
            top_messages,
            bottom_messages,
            interior_messages,
        }
    }

    /// Add messages newer than everything held; returns the visible ones
    pub fn append(&mut self, messages: Vec<Arc<Message>>) -> Vec<Arc<Message>> {
        let mut messages = self.valid_non_duplicated_messages(&messages);
        sort_by_id(&mut messages);

        let fits = match (self.last_including_muted(), messages.first()) {
            (Some(last), Some(first)) => first.id > last.id,
            _ => true,
        };
        if !fits {
            log::debug!("[FEED] append() given messages inside the held range; merging");
            return self.add_anywhere(messages);
        }

        let viewable = self.unmuted_messages(&messages);
        self.add_to_hash(&messages);
        self.all_items.extend(messages);
        self.items.extend(viewable.iter().cloned());
        viewable
    }

    /// Add messages older than everything held; returns the visible ones
    pub fn prepend(&mut self, messages: Vec<Arc<Message>>) -> Vec<Arc<Message>> {
        let mut messages = self.valid_non_duplicated_messages(&messages);
        sort_by_id(&mut messages);

        let fits = match (self.first_including_muted(), messages.last()) {
            (Some(first), Some(last)) => last.id < first.id,
            _ => true,
        };
        if !fits {
            log::debug!("[FEED] prepend() given messages inside the held range; merging");
            return self.add_anywhere(messages);
        }

        let viewable = self.unmuted_messages(&messages);
        self.add_to_hash(&messages);
        self.all_items.splice(0..0, messages);
        self.items.splice(0..0, viewable.iter().cloned());
        viewable
    }

    /// Insert messages at their sorted positions; returns the visible ones
    pub fn add_anywhere(&mut self, messages: Vec<Arc<Message>>) -> Vec<Arc<Message>> {
        let mut messages = self.valid_non_duplicated_messages(&messages);
        sort_by_id(&mut messages);

        let viewable = self.unmuted_messages(&messages);
        self.add_to_hash(&messages);
        self.all_items.extend(messages);
        self.items.extend(viewable.iter().cloned());
        sort_by_id(&mut self.all_items);
        sort_by_id(&mut self.items);
        viewable
    }

    fn add_to_hash(&mut self, messages: &[Arc<Message>]) {
        for message in messages {
            if message.id.is_local() {
                self.local_only.insert(message.id);
            }
            if self.hash.insert(message.id, Arc::clone(message)).is_some() {
                log::error!(
                    "[FEED] Duplicate message added to MessageListData: {}",
                    message.id
                );
            }
        }
    }

    /// Remove messages by id. Unknown ids are ignored.
    pub fn remove(&mut self, ids: &[MessageId]) {
        let to_remove: HashSet<MessageId> = ids.iter().copied().collect();
        if !to_remove.iter().any(|id| self.hash.contains_key(id)) {
            return;
        }

        for id in &to_remove {
            self.hash.remove(id);
            self.local_only.remove(id);
        }
        self.all_items.retain(|m| !to_remove.contains(&m.id));
        self.items.retain(|m| !to_remove.contains(&m.id));
        self.resolve_stale_selection();
    }

    /// Empty the list. Selection is left to the caller.
    pub fn clear(&mut self) {
        self.all_items.clear();
        self.items.clear();
        self.hash.clear();
        self.local_only.clear();
    }

    /// Swap a local-echo id for the id the server assigned.
    ///
    /// Returns whether the visible order changed, in which case whatever
    /// rendered this list has to rerender.
    pub fn change_message_id(&mut self, old_id: MessageId, new_id: MessageId) -> bool {
        if !self.hash.contains_key(&old_id) || old_id == new_id {
            return false;
        }
        if self.hash.contains_key(&new_id) {
            return self.drop_superseded_echo(old_id, new_id);
        }
        let Some(message) = self.hash.remove(&old_id) else {
            return false;
        };
        let updated = Arc::new(message.with_id(new_id));
        self.hash.insert(new_id, Arc::clone(&updated));

        if self.local_only.remove(&old_id) && new_id.is_local() {
            self.local_only.insert(new_id);
        }
        if self.selected_id == Some(old_id) {
            self.selected_id = Some(new_id);
        }

        for slot in self.all_items.iter_mut().filter(|m| m.id == old_id) {
            *slot = Arc::clone(&updated);
        }
        let mut visible = false;
        for slot in self.items.iter_mut().filter(|m| m.id == old_id) {
            *slot = Arc::clone(&updated);
            visible = true;
        }

        if !is_sorted_by_id(&self.all_items) {
            sort_by_id(&mut self.all_items);
        }
        if !visible {
            return false;
        }
        if is_sorted_by_id(&self.items) {
            return false;
        }

        log::debug!(
            "[FEED] Message id {} -> {} left the list out of order; reordering",
            old_id,
            new_id
        );
        sort_by_id(&mut self.items);
        true
    }

    /// The server copy of an echoed message arrived before the ack; keep
    /// the server copy and drop the echo
    fn drop_superseded_echo(&mut self, old_id: MessageId, new_id: MessageId) -> bool {
        log::debug!(
            "[FEED] Message {} already held; dropping local echo {}",
            new_id,
            old_id
        );
        let was_visible = self.items.iter().any(|m| m.id == old_id);
        let was_selected = self.selected_id == Some(old_id);
        self.remove(&[old_id]);
        if was_selected {
            self.selected_id = Some(new_id);
            self.resolve_stale_selection();
        }
        was_visible
    }

    pub fn is_local_only(&self, id: MessageId) -> bool {
        self.local_only.contains(&id)
    }

    // === Selection and navigation ===

    /// Visible id closest to `target`; ties go to the newer message
    pub fn closest_id(&self, target: MessageId) -> Option<MessageId> {
        let items = &self.items;
        let last = items.last()?;

        let idx = items.partition_point(|m| m.id < target);
        let mut best = match items.get(idx) {
            Some(message) if message.id == target => return Some(target),
            Some(message) => message.id,
            None => last.id,
        };
        if idx > 0 {
            let before = items[idx - 1].id;
            if target.distance(before) < target.distance(best) {
                best = before;
            }
        }
        Some(best)
    }

    pub fn selected_id(&self) -> Option<MessageId> {
        self.selected_id
    }

    pub fn set_selected_id(&mut self, id: Option<MessageId>) {
        self.selected_id = id;
    }

    pub fn clear_selected_id(&mut self) {
        self.selected_id = None;
    }

    /// Position of the selected message among the visible items
    pub fn selected_idx(&self) -> Option<usize> {
        let selected = self.selected_id?;
        self.items.binary_search_by_key(&selected, |m| m.id).ok()
    }

    /// Re-resolve the selection after messages were hidden or removed
    pub fn reset_select_to_closest(&mut self) {
        if let Some(selected) = self.selected_id {
            self.selected_id = self.closest_id(selected);
        }
    }

    fn resolve_stale_selection(&mut self) {
        if self.selected_id.is_some() && self.selected_idx().is_none() {
            self.reset_select_to_closest();
        }
    }

    /// Visible message after the selection
    pub fn next(&self) -> Option<MessageId> {
        let idx = self.selected_idx()?;
        self.items.get(idx + 1).map(|m| m.id)
    }

    /// Visible message before the selection
    pub fn prev(&self) -> Option<MessageId> {
        let idx = self.selected_idx()?;
        idx.checked_sub(1).map(|i| self.items[i].id)
    }

    /// Whether the last visible message is selected
    pub fn is_at_end(&self) -> bool {
        match (self.selected_id, self.last()) {
            (Some(selected), Some(last)) => last.id == selected,
            _ => false,
        }
    }

    /// Move the selection forward over consecutive messages in `ids`
    pub fn advance_past_messages(&mut self, ids: &[MessageId]) {
        let id_set: HashSet<MessageId> = ids.iter().copied().collect();
        let Some(mut idx) = self.selected_idx() else {
            return;
        };
        while let Some(next) = self.items.get(idx + 1) {
            if !id_set.contains(&next.id) {
                break;
            }
            self.selected_id = Some(next.id);
            idx += 1;
        }
    }

    // === Unread and sender queries ===

    /// First visible unread message, or the last visible message when
    /// nothing is unread
    pub fn first_unread_message_id(&self, unread: &dyn UnreadState) -> Option<MessageId> {
        self.items
            .iter()
            .find(|m| unread.message_unread(m))
            .or_else(|| self.items.last())
            .map(|m| m.id)
    }

    pub fn has_unread_messages(&self, unread: &dyn UnreadState) -> bool {
        self.items.iter().any(|m| unread.message_unread(m))
    }

    pub fn get_last_message_sent_by(&self, user_id: UserId) -> Option<&Arc<Message>> {
        self.items.iter().rev().find(|m| m.sender_id == user_id)
    }
}
