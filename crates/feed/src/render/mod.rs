//! Rendering collaborator for message lists
//!
//! A [`MessageListRenderer`] turns list state into something on screen.
//! The dependency runs one way: the list owns its renderer and calls into
//! it, handing over whatever state a call needs. Renderers never hold a
//! reference back to their list; anything the list needs to know comes
//! back as a return value.

mod headless;

pub use headless::{HeadlessRenderer, RenderOp};

use std::sync::Arc;

use crate::models::{Message, MessageId};

/// What the list learns back from rendering appended messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderInfo {
    /// New messages landed out of view; the user has to scroll to see them
    pub need_user_to_scroll: bool,
}

/// Read-only view of list state passed to the renderer
#[derive(Debug, Clone, Copy)]
pub struct ViewSnapshot<'a> {
    /// Visible messages, in id order
    pub messages: &'a [Arc<Message>],
    pub selected_id: Option<MessageId>,
    pub selected_idx: Option<usize>,
}

/// Membership notice rendered below the last message of a channel view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingBookend {
    pub stream_name: String,
    pub subscribed: bool,
    /// The channel no longer exists (or is invisible to the user)
    pub deactivated: bool,
    /// The user left the channel during this session
    pub just_unsubscribed: bool,
    pub can_toggle_subscription: bool,
    pub is_spectator: bool,
    pub invite_only: bool,
    pub is_web_public: bool,
}

/// Render collaborator owned by a [`crate::list::MessageList`]
pub trait MessageListRenderer {
    /// Handle to a rendered row
    type Row;

    /// Render messages older than everything currently rendered
    fn prepend(&mut self, messages: &[Arc<Message>]);

    /// Render messages newer than everything currently rendered
    fn append(&mut self, messages: &[Arc<Message>], messages_are_new: bool) -> Option<RenderInfo>;

    /// Rebuild the rendered rows without moving the viewport
    fn rerender_preserving_scrolltop(
        &mut self,
        snapshot: ViewSnapshot<'_>,
        discard_rendering_state: bool,
    );

    /// Drop rendered rows; `clear_table` also empties the table itself
    fn clear_rendering_state(&mut self, clear_table: bool);

    /// Recenter the render window around `selected_idx`
    fn update_render_window(&mut self, selected_idx: Option<usize>, check_for_changed: bool);

    /// Rerender if the selection moved outside the rendered window.
    ///
    /// Returns whether a rerender happened.
    fn maybe_rerender(&mut self, snapshot: ViewSnapshot<'_>) -> bool;

    fn get_row(&self, id: MessageId) -> Option<Self::Row>;

    fn render_trailing_bookend(&mut self, bookend: &TrailingBookend);

    fn clear_trailing_bookend(&mut self);

    fn show_empty_narrow_message(&mut self) {}

    fn hide_empty_narrow_message(&mut self) {}
}
