//! Direct message send permissions

use crate::list::MessageListData;
use crate::storage::PeopleDirectory;

/// What the client can tell about a DM conversation before sending to it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectMessagePermissionHints {
    /// The conversation certainly has no messages yet
    pub is_known_empty_conversation: bool,
    /// A local echo can be shown without risking a confusing rollback
    pub is_local_echo_safe: bool,
}

/// Classify a DM conversation using cached state.
///
/// `current` is the data of the list the user is looking at, if any. When
/// it is the same DM conversation and has loaded up to the newest message,
/// an empty list means an empty conversation.
pub fn get_direct_message_permission_hints(
    recipient_ids_string: &str,
    current: Option<&MessageListData>,
    people: &dyn PeopleDirectory,
) -> DirectMessagePermissionHints {
    if people.has_recent_conversation(recipient_ids_string) {
        return DirectMessagePermissionHints {
            is_known_empty_conversation: false,
            is_local_echo_safe: true,
        };
    }

    if let Some(data) = current
        && let Some(dm_conversation) = data.filter().operands("dm").first()
    {
        match people.emails_strings_to_user_ids_string(dm_conversation) {
            Some(current_ids_string) => {
                if people.pm_lookup_key(recipient_ids_string)
                    == people.pm_lookup_key(&current_ids_string)
                    && data.fetch_status().has_found_newest()
                {
                    return DirectMessagePermissionHints {
                        is_known_empty_conversation: true,
                        is_local_echo_safe: true,
                    };
                }
            }
            None => {
                log::warn!(
                    "[FEED] Current DM narrow has unknown recipients: {}",
                    dm_conversation
                );
            }
        }
    }

    DirectMessagePermissionHints {
        is_known_empty_conversation: false,
        is_local_echo_safe: false,
    }
}

/// Whether the current user may send a DM to these users
pub fn user_can_send_direct_message(
    user_ids_string: &str,
    current: Option<&MessageListData>,
    people: &dyn PeopleDirectory,
) -> bool {
    let hints = get_direct_message_permission_hints(user_ids_string, current, people);
    (!hints.is_known_empty_conversation
        || people.user_can_initiate_direct_message_thread(user_ids_string))
        && people.user_can_direct_message(user_ids_string)
}
