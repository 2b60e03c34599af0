//! A message list bound to a renderer
//!
//! `MessageList` couples one [`MessageListData`] with the renderer that
//! draws it. It decides when to prepend, append or rerender, owns the
//! selection protocol, and answers the policy questions the rest of the
//! client asks about a view (may it mark messages read, should it survive
//! a narrow change, does it need a trailing bookend).

use std::sync::Arc;

use super::data::MessageListData;
use super::options::{
    AddMessagesOptions, ClearOptions, ListServices, ListenerId, MessageListOptions,
    MessageSelected, SelectOptions, SelectionObservers,
};
use crate::config::{HomeView, MarkReadOnScrollPolicy, UserSettings};
use crate::error::{FeedError, ListId, Result};
use crate::models::{Filter, Message, MessageId, StreamId};
use crate::render::{MessageListRenderer, RenderInfo, TrailingBookend, ViewSnapshot};
use crate::storage::{PeopleDirectory, SubscriptionDirectory, UnreadState};

fn snapshot(data: &MessageListData) -> ViewSnapshot<'_> {
    ViewSnapshot {
        messages: data.all_messages(),
        selected_id: data.selected_id(),
        selected_idx: data.selected_idx(),
    }
}

/// Messages for one narrow, as presented by a renderer
pub struct MessageList<R: MessageListRenderer> {
    id: ListId,
    data: MessageListData,
    view: R,
    unread: Arc<dyn UnreadState>,
    subscriptions: Arc<dyn SubscriptionDirectory>,
    /// Fixed when the list is built; the filter never changes afterwards
    is_combined_feed_view: bool,
    reading_prevented: bool,
    last_message_historical: bool,
    is_current: bool,
    observers: SelectionObservers,
}

impl<R: MessageListRenderer> MessageList<R> {
    pub fn new(
        id: ListId,
        filter: Filter,
        view: R,
        services: &ListServices,
        options: MessageListOptions,
    ) -> Self {
        let data = if options.excludes_muted_topics {
            MessageListData::excluding_muted(filter, Arc::clone(&services.muting))
        } else {
            MessageListData::new(filter)
        };
        Self::with_data(id, data, view, services)
    }

    /// Build a list around existing data, e.g. a cached narrow
    pub fn with_data(id: ListId, data: MessageListData, view: R, services: &ListServices) -> Self {
        let is_combined_feed_view = data.filter().is_in_home();
        Self {
            id,
            data,
            view,
            unread: Arc::clone(&services.unread),
            subscriptions: Arc::clone(&services.subscriptions),
            is_combined_feed_view,
            reading_prevented: false,
            last_message_historical: false,
            is_current: false,
            observers: SelectionObservers::default(),
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn data(&self) -> &MessageListData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut MessageListData {
        &mut self.data
    }

    pub fn view(&self) -> &R {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut R {
        &mut self.view
    }

    pub fn filter(&self) -> &Filter {
        self.data.filter()
    }

    pub fn is_combined_feed_view(&self) -> bool {
        self.is_combined_feed_view
    }

    pub fn is_current(&self) -> bool {
        self.is_current
    }

    pub(crate) fn set_current(&mut self, is_current: bool) {
        self.is_current = is_current;
    }

    pub fn last_message_historical(&self) -> bool {
        self.last_message_historical
    }

    pub fn set_last_message_historical(&mut self, historical: bool) {
        self.last_message_historical = historical;
    }

    // === Adding and removing ===

    /// Insert a batch and render it.
    ///
    /// Interior messages can't be spliced into the rendered rows, so they
    /// force a rerender and report that the user has to scroll.
    pub fn add_messages(
        &mut self,
        messages: &[Arc<Message>],
        opts: AddMessagesOptions,
    ) -> Option<RenderInfo> {
        let info = self.data.add_messages(messages);

        if !info.interior_messages.is_empty() {
            self.view
                .rerender_preserving_scrolltop(snapshot(&self.data), true);
            return Some(RenderInfo {
                need_user_to_scroll: true,
            });
        }

        let mut render_info = None;

        if !info.top_messages.is_empty() {
            self.view.prepend(&info.top_messages);
        }

        if let Some(last) = info.bottom_messages.last() {
            self.last_message_historical = last.is_historical();
            render_info = self.append_to_view(&info.bottom_messages, opts);
        }

        if !self.visibly_empty() && self.is_current {
            self.view.hide_empty_narrow_message();
        }

        if !self.visibly_empty()
            && self.selected_id().is_none()
            && self.is_current
            && let Some(first_unread) = self.first_unread_message_id()
        {
            let select_opts = SelectOptions {
                then_scroll: true,
                use_closest: true,
                ..SelectOptions::default()
            };
            if let Err(err) = self.select_id(first_unread, select_opts) {
                log::error!("[LIST] Failed to select first unread message: {}", err);
            }
        }

        render_info
    }

    /// Append messages known to be newer than everything held
    pub fn append(
        &mut self,
        messages: &[Arc<Message>],
        opts: AddMessagesOptions,
    ) -> Option<RenderInfo> {
        let viewable = self.data.append(messages.to_vec());
        self.append_to_view(&viewable, opts)
    }

    fn append_to_view(
        &mut self,
        messages: &[Arc<Message>],
        opts: AddMessagesOptions,
    ) -> Option<RenderInfo> {
        self.view.append(messages, opts.messages_are_new)
    }

    pub fn remove_and_rerender(&mut self, ids: &[MessageId]) {
        self.data.remove(ids);
        self.rerender();
    }

    pub fn clear(&mut self, opts: ClearOptions) {
        self.data.clear();
        self.view.clear_rendering_state(true);

        if opts.clear_selected_id {
            self.data.clear_selected_id();
        }
    }

    // === Selection ===

    /// Register a listener for selection changes
    pub fn subscribe_selection(
        &mut self,
        listener: impl FnMut(&MessageSelected) + 'static,
    ) -> ListenerId {
        self.observers.subscribe(Box::new(listener))
    }

    pub fn unsubscribe_selection(&mut self, id: ListenerId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Select a message, resolving to the closest visible id.
    ///
    /// Fails without changing anything when the id doesn't parse, or when
    /// nothing can be selected and `empty_ok` isn't set.
    pub fn select_id<I>(&mut self, id: I, opts: SelectOptions) -> Result<()>
    where
        I: TryInto<MessageId>,
        I::Error: Into<FeedError>,
    {
        let id: MessageId = id.try_into().map_err(Into::into)?;
        let previously_selected_id = self.data.selected_id();
        let closest_id = self.data.closest_id(id);

        if !opts.use_closest && closest_id != Some(id) {
            log::error!(
                "[LIST] Selected id not in list: filter_terms={:?} id={} closest_id={:?}",
                self.data.filter().terms(),
                id,
                closest_id
            );
        }

        if closest_id.is_none() && !opts.empty_ok {
            let err = FeedError::EmptySelection {
                filter_terms: self.data.filter().terms().to_vec(),
                items_length: self.data.num_items(),
            };
            log::error!("[LIST] Cannot select id None: {:?}", err);
            return Err(err);
        }

        self.data.set_selected_id(closest_id);

        if opts.force_rerender {
            self.rerender_inner(false);
        } else if !opts.from_rendering {
            self.view.maybe_rerender(snapshot(&self.data));
        }

        self.observers.notify(&MessageSelected {
            list_id: self.id,
            id: closest_id,
            previously_selected_id,
            options: opts,
        });

        Ok(())
    }

    fn reselect_selected_id(&mut self) {
        let Some(selected_id) = self.data.selected_id() else {
            return;
        };
        let opts = SelectOptions {
            from_rendering: true,
            mark_read: false,
            ..SelectOptions::default()
        };
        if let Err(err) = self.select_id(selected_id, opts) {
            log::warn!("[LIST] Could not reselect {}: {}", selected_id, err);
        }
    }

    pub fn selected_id(&self) -> Option<MessageId> {
        self.data.selected_id()
    }

    pub fn selected_idx(&self) -> Option<usize> {
        self.data.selected_idx()
    }

    pub fn selected_message(&self) -> Option<&Arc<Message>> {
        self.data.get(self.data.selected_id()?)
    }

    pub fn selected_row(&self) -> Option<R::Row> {
        self.get_row(self.data.selected_id()?)
    }

    pub fn get_row(&self, id: MessageId) -> Option<R::Row> {
        self.view.get_row(id)
    }

    // === Reading policy ===

    /// Whether reading messages in this view may mark them as read,
    /// ignoring the user's scroll policy
    pub fn can_mark_messages_read_without_setting(&self) -> bool {
        self.data.can_mark_messages_read() && !self.reading_prevented
    }

    /// Whether reading messages in this view may mark them as read
    pub fn can_mark_messages_read(&self, settings: &UserSettings) -> bool {
        if !self.can_mark_messages_read_without_setting() {
            return false;
        }
        match settings.web_mark_read_on_scroll_policy {
            MarkReadOnScrollPolicy::Always => true,
            MarkReadOnScrollPolicy::ConversationOnly => self.data.filter().is_conversation_view(),
            MarkReadOnScrollPolicy::Never => false,
        }
    }

    pub fn prevent_reading(&mut self) {
        self.reading_prevented = true;
    }

    pub fn resume_reading(&mut self) {
        self.reading_prevented = false;
    }

    /// Whether this list should stay rendered after narrowing elsewhere.
    ///
    /// Only the combined feed is kept, and only while it is the home view
    /// and either holds the user's first unread message or is caught up.
    pub fn should_preserve_current_rendered_state(&self, settings: &UserSettings) -> bool {
        if settings.web_home_view != HomeView::AllMessages || !self.is_combined_feed_view {
            return false;
        }

        let holds_first_unread = self
            .unread
            .first_unread_unmuted_message_id()
            .and_then(|id| self.data.get(id))
            .is_some_and(|message| self.unread.message_unread(message));
        if holds_first_unread {
            return true;
        }

        self.data.fetch_status().has_found_newest()
    }

    // === Trailing bookend ===

    fn channel_name(&self) -> Option<String> {
        let operand = *self.data.filter().operands("channel").first()?;
        match operand.parse::<StreamId>() {
            Ok(stream_id) => self
                .subscriptions
                .get_sub_by_id(stream_id)
                .map(|sub| sub.name),
            Err(_) => Some(operand.to_string()),
        }
    }

    /// Refresh the subscription notice shown under a channel view
    pub fn update_trailing_bookend(&mut self, settings: &UserSettings, force_render: bool) {
        self.view.clear_trailing_bookend();
        if self.is_combined_feed_view {
            return;
        }
        let Some(stream_name) = self.channel_name() else {
            return;
        };

        let sub = self.subscriptions.get_sub(&stream_name);
        if let Some(sub) = &sub
            && sub.subscribed
            && !self.last_message_historical
            && !settings.is_spectator
            && !force_render
        {
            return;
        }

        let subscribed = self.subscriptions.is_subscribed_by_name(&stream_name);
        let bookend = TrailingBookend {
            subscribed,
            deactivated: sub.is_none(),
            just_unsubscribed: sub.is_some() && !subscribed && !self.last_message_historical,
            can_toggle_subscription: sub
                .as_ref()
                .is_some_and(|sub| self.subscriptions.can_toggle_subscription(sub)),
            is_spectator: settings.is_spectator,
            invite_only: sub.as_ref().is_some_and(|sub| sub.invite_only),
            is_web_public: sub.as_ref().is_some_and(|sub| sub.is_web_public),
            stream_name,
        };
        self.view.render_trailing_bookend(&bookend);
    }

    // === Rendering ===

    /// Rebuild the rendering from the current data
    pub fn rerender(&mut self) {
        self.rerender_inner(true);
    }

    fn rerender_inner(&mut self, reselect: bool) {
        self.data.reset_select_to_closest();
        self.view.clear_rendering_state(false);
        self.view
            .update_render_window(self.data.selected_idx(), false);

        if !self.is_combined_feed_view {
            let fetch_status = self.data.fetch_status();
            if self.data.visibly_empty()
                && fetch_status.has_found_oldest()
                && fetch_status.has_found_newest()
            {
                self.view.show_empty_narrow_message();
            } else {
                self.view.hide_empty_narrow_message();
            }
        }

        self.view
            .rerender_preserving_scrolltop(snapshot(&self.data), false);
        if reselect {
            self.reselect_selected_id();
        }
    }

    /// Rerender the rows without resetting the render window
    pub fn rerender_view(&mut self) {
        self.view
            .rerender_preserving_scrolltop(snapshot(&self.data), false);
        self.reselect_selected_id();
    }

    /// Rekey a local echo once the server acknowledges it
    pub fn change_message_id(&mut self, old_id: MessageId, new_id: MessageId) {
        if self.data.change_message_id(old_id, new_id) {
            self.rerender_view();
        }
    }

    pub fn update_muting_and_rerender(&mut self) {
        self.data.update_items_for_muting();
        self.rerender();
    }

    // === Delegating accessors ===

    pub fn get(&self, id: MessageId) -> Option<&Arc<Message>> {
        self.data.get(id)
    }

    pub fn msg_id_in_fetched_range(&self, id: MessageId) -> bool {
        self.data.msg_id_in_fetched_range(id)
    }

    pub fn num_items(&self) -> usize {
        self.data.num_items()
    }

    pub fn empty(&self) -> bool {
        self.data.empty()
    }

    pub fn visibly_empty(&self) -> bool {
        self.data.visibly_empty()
    }

    pub fn first(&self) -> Option<&Arc<Message>> {
        self.data.first()
    }

    pub fn last(&self) -> Option<&Arc<Message>> {
        self.data.last()
    }

    pub fn prev(&self) -> Option<MessageId> {
        self.data.prev()
    }

    pub fn next(&self) -> Option<MessageId> {
        self.data.next()
    }

    pub fn is_at_end(&self) -> bool {
        self.data.is_at_end()
    }

    pub fn is_keyword_search(&self) -> bool {
        self.data.is_keyword_search()
    }

    pub fn closest_id(&self, id: MessageId) -> Option<MessageId> {
        self.data.closest_id(id)
    }

    pub fn advance_past_messages(&mut self, ids: &[MessageId]) {
        self.data.advance_past_messages(ids);
    }

    pub fn all_messages(&self) -> &[Arc<Message>] {
        self.data.all_messages()
    }

    pub fn first_unread_message_id(&self) -> Option<MessageId> {
        self.data.first_unread_message_id(self.unread.as_ref())
    }

    pub fn has_unread_messages(&self) -> bool {
        self.data.has_unread_messages(self.unread.as_ref())
    }

    pub fn message_range(&self, start: MessageId, end: MessageId) -> &[Arc<Message>] {
        self.data.message_range(start, end)
    }

    pub fn get_last_message_sent_by_me(
        &self,
        people: &dyn PeopleDirectory,
    ) -> Option<&Arc<Message>> {
        self.data.get_last_message_sent_by(people.my_user_id())
    }

    pub fn unmuted_messages(&self, messages: &[Arc<Message>]) -> Vec<Arc<Message>> {
        self.data.unmuted_messages(messages)
    }
}
