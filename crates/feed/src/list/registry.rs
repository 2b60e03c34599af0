//! Registry of live message lists
//!
//! Allocates list ids, tracks which list is current, and decides which
//! rendered lists survive a narrow change.

use super::message_list::MessageList;
use super::options::{ListServices, MessageListOptions};
use crate::config::UserSettings;
use crate::error::{FeedError, ListId, Result};
use crate::models::Filter;
use crate::render::MessageListRenderer;

/// Owns every rendered message list
pub struct MessageLists<R: MessageListRenderer> {
    services: ListServices,
    last_id: u64,
    lists: Vec<MessageList<R>>,
    current: Option<ListId>,
}

impl<R: MessageListRenderer> MessageLists<R> {
    pub fn new(services: ListServices) -> Self {
        Self {
            services,
            last_id: 0,
            lists: Vec::new(),
            current: None,
        }
    }

    pub fn services(&self) -> &ListServices {
        &self.services
    }

    /// Next unused list id; the first one is 1
    pub fn allocate_id(&mut self) -> ListId {
        self.last_id += 1;
        ListId(self.last_id)
    }

    /// Build and register a list for `filter`
    pub fn create(&mut self, filter: Filter, view: R, options: MessageListOptions) -> ListId {
        let id = self.allocate_id();
        log::info!("[LIST] Creating message list {} for {:?}", id, filter.terms());
        self.lists
            .push(MessageList::new(id, filter, view, &self.services, options));
        id
    }

    pub fn get(&self, id: ListId) -> Option<&MessageList<R>> {
        self.lists.iter().find(|list| list.id() == id)
    }

    pub fn get_mut(&mut self, id: ListId) -> Option<&mut MessageList<R>> {
        self.lists.iter_mut().find(|list| list.id() == id)
    }

    pub fn current_id(&self) -> Option<ListId> {
        self.current
    }

    pub fn current(&self) -> Option<&MessageList<R>> {
        self.get(self.current?)
    }

    pub fn current_mut(&mut self) -> Option<&mut MessageList<R>> {
        let id = self.current?;
        self.get_mut(id)
    }

    /// Make `id` the current list, or clear the current list with `None`
    pub fn set_current(&mut self, id: Option<ListId>) -> Result<()> {
        if let Some(id) = id
            && self.get(id).is_none()
        {
            return Err(FeedError::UnknownMessageList(id));
        }

        if let Some(previous) = self.current_mut() {
            previous.set_current(false);
        }
        self.current = id;
        if let Some(list) = self.current_mut() {
            list.set_current(true);
        }
        Ok(())
    }

    /// Drop a list; removing the current list leaves no current list
    pub fn remove(&mut self, id: ListId) -> Option<MessageList<R>> {
        let idx = self.lists.iter().position(|list| list.id() == id)?;
        if self.current == Some(id) {
            self.current = None;
        }
        let mut list = self.lists.remove(idx);
        list.set_current(false);
        Some(list)
    }

    /// Lists still holding rendered state, in creation order
    pub fn rendered_lists(&self) -> impl Iterator<Item = &MessageList<R>> {
        self.lists.iter()
    }

    pub fn rendered_lists_mut(&mut self) -> impl Iterator<Item = &mut MessageList<R>> {
        self.lists.iter_mut()
    }

    /// Drop lists that are neither current nor worth preserving.
    ///
    /// Call after switching the current list. Returns the ids dropped.
    pub fn update_views_on_narrow_change(&mut self, settings: &UserSettings) -> Vec<ListId> {
        let current = self.current;
        let mut dropped = Vec::new();
        self.lists.retain(|list| {
            let keep = Some(list.id()) == current
                || list.should_preserve_current_rendered_state(settings);
            if !keep {
                dropped.push(list.id());
            }
            keep
        });
        if !dropped.is_empty() {
            log::debug!("[LIST] Dropped rendered lists {:?}", dropped);
        }
        dropped
    }
}
