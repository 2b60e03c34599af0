//! Message lists: ordered data, the view-facing list, and the registry

mod data;
mod message_list;
mod options;
mod registry;

pub use data::{AddMessagesInfo, MessageListData};
pub use message_list::MessageList;
pub use options::{
    AddMessagesOptions, ClearOptions, ListServices, ListenerId, MessageListOptions,
    MessageSelected, SelectOptions,
};
pub use registry::MessageLists;
