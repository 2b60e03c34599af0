//! Fetch bookkeeping and message ingestion
//!
//! Tracks how much of a narrow's history has been loaded and routes new
//! batches into the lists that should show them.

mod fetch_status;
mod ingest;

pub use fetch_status::{FetchStatus, FinishOlderBatch};
pub use ingest::{
    add_messages, add_new_messages, add_new_messages_data, add_old_messages,
    do_unread_count_updates, insert_new_messages,
};
