//! Routing fetched and pushed messages into lists
//!
//! History fetches always land in their list. Messages pushed by the
//! server only land in lists that already reached the newest boundary;
//! for the rest, the list's watermark is raised so the next forward fetch
//! can tell whether it really caught up.

use std::sync::Arc;

use crate::error::ListId;
use crate::list::{AddMessagesInfo, AddMessagesOptions, MessageList, MessageListData, MessageLists};
use crate::models::Message;
use crate::render::{MessageListRenderer, RenderInfo};
use crate::storage::{UnreadCountsUi, UnreadState};

/// Add a batch to a list; an empty batch is a no-op
pub fn add_messages<R: MessageListRenderer>(
    messages: &[Arc<Message>],
    list: &mut MessageList<R>,
    opts: AddMessagesOptions,
) -> Option<RenderInfo> {
    if messages.is_empty() {
        return None;
    }
    list.add_messages(messages, opts)
}

/// Add messages fetched from history
pub fn add_old_messages<R: MessageListRenderer>(
    messages: &[Arc<Message>],
    list: &mut MessageList<R>,
) -> Option<RenderInfo> {
    add_messages(messages, list, AddMessagesOptions { messages_are_new: false })
}

/// Add messages that were just sent.
///
/// Until the list has found its newest message there may be a gap between
/// what it holds and these messages, so they are only recorded in the
/// watermark.
pub fn add_new_messages<R: MessageListRenderer>(
    messages: &[Arc<Message>],
    list: &mut MessageList<R>,
) -> Option<RenderInfo> {
    if !list.data().fetch_status().has_found_newest() {
        list.data_mut()
            .fetch_status_mut()
            .update_expected_max_message_id(messages);
        log::debug!(
            "[INGEST] List {} hasn't found newest; deferring {} messages",
            list.id(),
            messages.len()
        );
        return None;
    }
    add_messages(messages, list, AddMessagesOptions { messages_are_new: true })
}

/// [`add_new_messages`] for list data that has no renderer
pub fn add_new_messages_data(
    messages: &[Arc<Message>],
    data: &mut MessageListData,
) -> Option<AddMessagesInfo> {
    if !data.fetch_status().has_found_newest() {
        data.fetch_status_mut()
            .update_expected_max_message_id(messages);
        return None;
    }
    Some(data.add_messages(messages))
}

/// Feed new messages to unread tracking and refresh the counts if needed.
///
/// Returns whether the counts were recomputed.
pub fn do_unread_count_updates(
    messages: &[Arc<Message>],
    expect_no_new_unreads: bool,
    unread: &dyn UnreadState,
    ui: &dyn UnreadCountsUi,
) -> bool {
    let any_new_unreads = unread.process_loaded_messages(messages, expect_no_new_unreads);
    if any_new_unreads {
        ui.update_unread_counts(&unread.get_counts());
    }
    any_new_unreads
}

/// Deliver messages pushed by the server to every list that can take them.
///
/// `all_messages` is the shared cache of every loaded message. Lists whose
/// filter needs the server to decide membership only get their watermark
/// raised. Returns the render info of each list that rendered something.
pub fn insert_new_messages<R: MessageListRenderer>(
    messages: &[Arc<Message>],
    all_messages: &mut MessageListData,
    lists: &mut MessageLists<R>,
) -> Vec<(ListId, RenderInfo)> {
    add_new_messages_data(messages, all_messages);

    let mut rendered = Vec::new();
    for list in lists.rendered_lists_mut() {
        if !list.filter().can_apply_locally() {
            list.data_mut()
                .fetch_status_mut()
                .update_expected_max_message_id(messages);
            log::debug!("[INGEST] List {} can't filter locally; skipping", list.id());
            continue;
        }
        if let Some(info) = add_new_messages(messages, list) {
            rendered.push((list.id(), info));
        }
    }
    rendered
}
