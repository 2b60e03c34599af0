//! Renderer without a display
//!
//! Tracks which messages would be on screen given a fixed-size render
//! window, and records every call it receives. Used by tests and by
//! consumers that only need list state.

use std::sync::Arc;

use super::{MessageListRenderer, RenderInfo, TrailingBookend, ViewSnapshot};
use crate::models::{Message, MessageId};

/// Default number of rows kept rendered at once
const DEFAULT_WINDOW_SIZE: usize = 250;

/// One call received by a [`HeadlessRenderer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    Prepend(Vec<MessageId>),
    Append {
        ids: Vec<MessageId>,
        messages_are_new: bool,
    },
    Rerender {
        discard_rendering_state: bool,
    },
    ClearRenderingState {
        clear_table: bool,
    },
    UpdateRenderWindow {
        selected_idx: Option<usize>,
        check_for_changed: bool,
    },
    MaybeRerender {
        rerendered: bool,
    },
    RenderTrailingBookend(TrailingBookend),
    ClearTrailingBookend,
    ShowEmptyNarrowMessage,
    HideEmptyNarrowMessage,
}

/// Renderer that keeps rendered ids in memory
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    window_size: usize,
    rendered: Vec<MessageId>,
    bookend: Option<TrailingBookend>,
    empty_narrow_shown: bool,
    ops: Vec<RenderOp>,
}

fn ids_of(messages: &[Arc<Message>]) -> Vec<MessageId> {
    messages.iter().map(|m| m.id).collect()
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::with_window_size(DEFAULT_WINDOW_SIZE)
    }

    pub fn with_window_size(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            rendered: Vec::new(),
            bookend: None,
            empty_narrow_shown: false,
            ops: Vec::new(),
        }
    }

    /// Ids currently rendered, in display order
    pub fn rendered_ids(&self) -> &[MessageId] {
        &self.rendered
    }

    pub fn trailing_bookend(&self) -> Option<&TrailingBookend> {
        self.bookend.as_ref()
    }

    pub fn is_empty_narrow_message_shown(&self) -> bool {
        self.empty_narrow_shown
    }

    pub fn ops(&self) -> &[RenderOp] {
        &self.ops
    }

    /// Drain the recorded calls
    pub fn take_ops(&mut self) -> Vec<RenderOp> {
        std::mem::take(&mut self.ops)
    }

    /// Render the window of `snapshot` that contains the selection
    fn render_window(&mut self, snapshot: ViewSnapshot<'_>) {
        let len = snapshot.messages.len();
        let center = snapshot.selected_idx.unwrap_or(len.saturating_sub(1));
        let half = self.window_size / 2;
        let start = center.saturating_sub(half).min(len.saturating_sub(self.window_size));
        let end = (start + self.window_size).min(len);
        self.rendered = ids_of(&snapshot.messages[start..end]);
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListRenderer for HeadlessRenderer {
    type Row = MessageId;

    fn prepend(&mut self, messages: &[Arc<Message>]) {
        let ids = ids_of(messages);
        self.ops.push(RenderOp::Prepend(ids.clone()));
        self.rendered.splice(0..0, ids);
        self.rendered.truncate(self.window_size);
    }

    fn append(&mut self, messages: &[Arc<Message>], messages_are_new: bool) -> Option<RenderInfo> {
        let ids = ids_of(messages);
        self.ops.push(RenderOp::Append {
            ids: ids.clone(),
            messages_are_new,
        });

        let room = self.window_size.saturating_sub(self.rendered.len());
        let overflow = ids.len() > room;
        self.rendered.extend(ids.into_iter().take(room));

        Some(RenderInfo {
            need_user_to_scroll: messages_are_new && overflow,
        })
    }

    fn rerender_preserving_scrolltop(
        &mut self,
        snapshot: ViewSnapshot<'_>,
        discard_rendering_state: bool,
    ) {
        self.ops.push(RenderOp::Rerender {
            discard_rendering_state,
        });
        self.render_window(snapshot);
    }

    fn clear_rendering_state(&mut self, clear_table: bool) {
        self.ops.push(RenderOp::ClearRenderingState { clear_table });
        self.rendered.clear();
    }

    fn update_render_window(&mut self, selected_idx: Option<usize>, check_for_changed: bool) {
        self.ops.push(RenderOp::UpdateRenderWindow {
            selected_idx,
            check_for_changed,
        });
    }

    fn maybe_rerender(&mut self, snapshot: ViewSnapshot<'_>) -> bool {
        let rerendered = match snapshot.selected_id {
            Some(selected) => !self.rendered.contains(&selected),
            None => false,
        };
        if rerendered {
            self.render_window(snapshot);
        }
        self.ops.push(RenderOp::MaybeRerender { rerendered });
        rerendered
    }

    fn get_row(&self, id: MessageId) -> Option<MessageId> {
        self.rendered.contains(&id).then_some(id)
    }

    fn render_trailing_bookend(&mut self, bookend: &TrailingBookend) {
        self.ops.push(RenderOp::RenderTrailingBookend(bookend.clone()));
        self.bookend = Some(bookend.clone());
    }

    fn clear_trailing_bookend(&mut self) {
        self.ops.push(RenderOp::ClearTrailingBookend);
        self.bookend = None;
    }

    fn show_empty_narrow_message(&mut self) {
        self.ops.push(RenderOp::ShowEmptyNarrowMessage);
        self.empty_narrow_shown = true;
    }

    fn hide_empty_narrow_message(&mut self) {
        self.ops.push(RenderOp::HideEmptyNarrowMessage);
        self.empty_narrow_shown = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msgs(ids: &[i64]) -> Vec<Arc<Message>> {
        ids.iter()
            .map(|&id| Arc::new(Message::builder(MessageId::new(id)).build()))
            .collect()
    }

    fn snapshot(messages: &[Arc<Message>], selected_idx: Option<usize>) -> ViewSnapshot<'_> {
        ViewSnapshot {
            messages,
            selected_id: selected_idx.map(|i| messages[i].id),
            selected_idx,
        }
    }

    #[test]
    fn test_append_within_window() {
        let mut view = HeadlessRenderer::with_window_size(4);
        let info = view.append(&msgs(&[1, 2]), true);
        assert_eq!(info, Some(RenderInfo { need_user_to_scroll: false }));
        assert_eq!(view.rendered_ids(), &[MessageId::new(1), MessageId::new(2)]);
    }

    #[test]
    fn test_append_past_window_needs_scroll() {
        let mut view = HeadlessRenderer::with_window_size(2);
        view.append(&msgs(&[1]), false);
        let info = view.append(&msgs(&[2, 3]), true);
        assert_eq!(info, Some(RenderInfo { need_user_to_scroll: true }));
        assert_eq!(view.rendered_ids().len(), 2);
        assert!(view.get_row(MessageId::new(3)).is_none());
    }

    #[test]
    fn test_render_window_follows_selection() {
        let messages = msgs(&[1, 2, 3, 4, 5, 6]);
        let mut view = HeadlessRenderer::with_window_size(2);
        view.rerender_preserving_scrolltop(snapshot(&messages, Some(0)), false);
        assert_eq!(view.rendered_ids(), &[MessageId::new(1), MessageId::new(2)]);

        assert!(view.maybe_rerender(snapshot(&messages, Some(5))));
        assert_eq!(view.rendered_ids(), &[MessageId::new(5), MessageId::new(6)]);
        assert!(!view.maybe_rerender(snapshot(&messages, Some(4))));
    }

    #[test]
    fn test_bookend_and_ops_log() {
        let mut view = HeadlessRenderer::new();
        let bookend = TrailingBookend {
            stream_name: "general".to_string(),
            subscribed: false,
            deactivated: false,
            just_unsubscribed: true,
            can_toggle_subscription: true,
            is_spectator: false,
            invite_only: false,
            is_web_public: false,
        };
        view.render_trailing_bookend(&bookend);
        assert_eq!(view.trailing_bookend(), Some(&bookend));
        view.clear_trailing_bookend();
        assert!(view.trailing_bookend().is_none());
        assert_eq!(view.take_ops().len(), 2);
        assert!(view.ops().is_empty());
    }
}
