//! Integration tests for the feed crate
//!
//! These tests drive message lists the way a client does: fetch batches,
//! push events, select, narrow elsewhere and come back.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use feed::models::{Filter, Message, MessageId, Subscription};
use feed::storage::{
    InMemoryMessageStore, InMemoryMuting, InMemoryPeople, InMemorySubscriptions, InMemoryUnread,
    MessageStore,
};
use feed::{
    AddMessagesOptions, FeedError, FinishOlderBatch, HeadlessRenderer, HomeView, ListServices,
    MarkReadOnScrollPolicy, MessageListData, MessageListOptions, MessageLists, RenderInfo,
    RenderOp, SelectOptions, UserSettings, add_new_messages, add_old_messages,
    get_direct_message_permission_hints, get_messages_in_topic, insert_new_messages,
    user_can_send_direct_message,
};
use tempfile::TempDir;

struct Client {
    unread: Arc<InMemoryUnread>,
    muting: Arc<InMemoryMuting>,
    subscriptions: Arc<InMemorySubscriptions>,
    lists: MessageLists<HeadlessRenderer>,
}

fn make_client() -> Client {
    let muting = Arc::new(InMemoryMuting::new());
    let unread = Arc::new(InMemoryUnread::with_muting(muting.clone()));
    let subscriptions = Arc::new(InMemorySubscriptions::new());
    let lists = MessageLists::new(ListServices {
        unread: unread.clone(),
        muting: muting.clone(),
        subscriptions: subscriptions.clone(),
    });
    Client {
        unread,
        muting,
        subscriptions,
        lists,
    }
}

/// Helper to create channel messages
fn make_message(id: i64, stream_id: i64, topic: &str) -> Arc<Message> {
    Arc::new(
        Message::builder(MessageId::new(id))
            .sender(7)
            .stream(stream_id, topic)
            .read()
            .build(),
    )
}

fn make_unread_message(id: i64, stream_id: i64, topic: &str) -> Arc<Message> {
    Arc::new(
        Message::builder(MessageId::new(id))
            .sender(7)
            .stream(stream_id, topic)
            .build(),
    )
}

fn ids(messages: &[Arc<Message>]) -> Vec<MessageId> {
    messages.iter().map(|m| m.id).collect()
}

fn new_list(client: &mut Client, filter: Filter) -> feed::ListId {
    client
        .lists
        .create(filter, HeadlessRenderer::new(), MessageListOptions::default())
}

#[test]
fn test_new_messages_gated_on_newest_boundary() {
    let mut client = make_client();
    let id = new_list(&mut client, Filter::channel(3));
    let list = client.lists.get_mut(id).unwrap();

    // History fetch that stops short of the newest message
    list.data_mut().fetch_status_mut().start_newer_batch();
    add_old_messages(
        &[make_message(10, 3, "lunch"), make_message(20, 3, "lunch")],
        list,
    );
    list.data_mut()
        .fetch_status_mut()
        .finish_newer_batch(&[make_message(20, 3, "lunch")], false);

    // A message pushed while the gap is open only moves the watermark
    assert!(add_new_messages(&[make_message(40, 3, "lunch")], list).is_none());
    assert_eq!(list.num_items(), 2);
    assert_eq!(
        list.data().fetch_status().expected_max_message_id(),
        Some(MessageId::new(40))
    );

    // The server claims we're caught up, but 40 is newer than the batch
    let batch = [make_message(30, 3, "lunch")];
    add_old_messages(&batch, list);
    let refetch = list
        .data_mut()
        .fetch_status_mut()
        .finish_newer_batch(&batch, true);
    assert!(refetch);
    assert!(!list.data().fetch_status().has_found_newest());

    // Second fetch covers 40
    let batch = [make_message(40, 3, "lunch")];
    add_old_messages(&batch, list);
    assert!(
        !list
            .data_mut()
            .fetch_status_mut()
            .finish_newer_batch(&batch, true)
    );

    let info = add_new_messages(&[make_message(50, 3, "lunch")], list);
    assert!(info.is_some());
    assert_eq!(
        ids(list.all_messages()),
        vec![
            MessageId::new(10),
            MessageId::new(20),
            MessageId::new(30),
            MessageId::new(40),
            MessageId::new(50),
        ]
    );
}

#[test]
fn test_interior_insert_rerenders() {
    let mut client = make_client();
    let id = new_list(&mut client, Filter::channel(3));
    let list = client.lists.get_mut(id).unwrap();

    add_old_messages(
        &[make_message(10, 3, "a"), make_message(30, 3, "a")],
        list,
    );
    list.view_mut().take_ops();

    let info = add_old_messages(
        &[make_message(20, 3, "a"), make_message(10, 3, "a")],
        list,
    );
    assert_eq!(info, Some(RenderInfo { need_user_to_scroll: true }));
    assert_eq!(
        list.view_mut().take_ops(),
        vec![RenderOp::Rerender {
            discard_rendering_state: true
        }]
    );
    assert_eq!(list.num_items(), 3);
    assert_eq!(list.view().rendered_ids().len(), 3);
}

#[test]
fn test_read_gating_matrix() {
    let mut client = make_client();
    let feed_id = new_list(&mut client, Filter::combined_feed());
    let channel_id = new_list(&mut client, Filter::channel(3));
    let topic_id = new_list(&mut client, Filter::topic(3, "lunch"));
    let dm_id = new_list(&mut client, Filter::dm("alice@example.com"));
    let search_id = new_list(&mut client, Filter::search("pizza"));

    let ids = [feed_id, channel_id, topic_id, dm_id, search_id];
    let cases = [
        (MarkReadOnScrollPolicy::Always, [true, true, true, true, false]),
        (MarkReadOnScrollPolicy::ConversationOnly, [false, false, true, true, false]),
        (MarkReadOnScrollPolicy::Never, [false, false, false, false, false]),
    ];

    for prevented in [false, true] {
        for id in ids {
            let list = client.lists.get_mut(id).unwrap();
            if prevented {
                list.prevent_reading();
            } else {
                list.resume_reading();
            }
        }

        let without_setting: Vec<bool> = ids
            .iter()
            .map(|id| client.lists.get(*id).unwrap().can_mark_messages_read_without_setting())
            .collect();
        let expected_without_setting = [!prevented, !prevented, !prevented, !prevented, false];
        assert_eq!(without_setting, expected_without_setting, "prevented {}", prevented);

        for (policy, expected) in cases {
            let settings = UserSettings {
                web_mark_read_on_scroll_policy: policy,
                ..UserSettings::default()
            };
            let actual: Vec<bool> = ids
                .iter()
                .map(|id| client.lists.get(*id).unwrap().can_mark_messages_read(&settings))
                .collect();
            let expected = expected.map(|allowed| allowed && !prevented);
            assert_eq!(actual, expected, "policy {:?} prevented {}", policy, prevented);
        }
    }
}

#[test]
fn test_selection_failures_leave_state_alone() {
    let mut client = make_client();
    let id = new_list(&mut client, Filter::channel(3));
    let list = client.lists.get_mut(id).unwrap();

    let err = list
        .select_id(MessageId::new(10), SelectOptions::default())
        .unwrap_err();
    assert!(matches!(err, FeedError::EmptySelection { .. }));

    add_old_messages(&[make_message(10, 3, "a")], list);
    list.select_id("10", SelectOptions::default()).unwrap();

    let err = list.select_id("abc", SelectOptions::default()).unwrap_err();
    assert_eq!(err, FeedError::BadMessageId("abc".to_string()));
    assert_eq!(list.selected_id(), Some(MessageId::new(10)));
}

#[test]
fn test_selection_observers_run_in_order() {
    let mut client = make_client();
    let id = new_list(&mut client, Filter::channel(3));
    let list = client.lists.get_mut(id).unwrap();
    add_old_messages(
        &[make_message(10, 3, "a"), make_message(20, 3, "a")],
        list,
    );

    let log = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::clone(&log);
    list.subscribe_selection(move |event| {
        first.borrow_mut().push(format!("narrow:{:?}", event.id));
    });
    let second = Rc::clone(&log);
    list.subscribe_selection(move |event| {
        second
            .borrow_mut()
            .push(format!("unread:{}", event.options.mark_read));
    });

    let opts = SelectOptions {
        use_closest: true,
        ..SelectOptions::default()
    };
    list.select_id(MessageId::new(12), opts).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            format!("narrow:{:?}", Some(MessageId::new(10))),
            "unread:true".to_string(),
        ]
    );
}

#[test]
fn test_current_list_auto_selects_first_unread() {
    let mut client = make_client();
    let id = new_list(&mut client, Filter::channel(3));
    client.lists.set_current(Some(id)).unwrap();

    let batch = vec![
        make_message(10, 3, "a"),
        make_unread_message(20, 3, "a"),
        make_unread_message(30, 3, "a"),
    ];
    client.unread.mark_as_unread(&batch[1..]);

    let list = client.lists.current_mut().unwrap();
    add_old_messages(&batch, list);
    assert_eq!(list.selected_id(), Some(MessageId::new(20)));
    assert_eq!(list.next(), Some(MessageId::new(30)));
    assert_eq!(list.prev(), Some(MessageId::new(10)));
}

#[test]
fn test_combined_feed_preserved_across_narrows() {
    let mut client = make_client();
    let feed = new_list(&mut client, Filter::combined_feed());
    let channel = new_list(&mut client, Filter::channel(3));
    client.lists.set_current(Some(feed)).unwrap();

    let batch = vec![make_unread_message(10, 3, "a"), make_message(20, 3, "a")];
    client.unread.mark_as_unread(&batch[..1]);
    add_old_messages(&batch, client.lists.current_mut().unwrap());

    client.lists.set_current(Some(channel)).unwrap();
    let settings = UserSettings::default();
    assert!(client.lists.update_views_on_narrow_change(&settings).is_empty());

    // Once the first unread is read and nothing says we're caught up,
    // the combined feed is no longer worth keeping
    client.unread.mark_as_read(&[MessageId::new(10)]);
    let other = new_list(&mut client, Filter::channel(4));
    client.lists.set_current(Some(other)).unwrap();
    let dropped = client.lists.update_views_on_narrow_change(&settings);
    assert_eq!(dropped, vec![feed, channel]);

    let inbox = UserSettings {
        web_home_view: HomeView::Inbox,
        ..UserSettings::default()
    };
    assert!(client.lists.update_views_on_narrow_change(&inbox).is_empty());
}

#[test]
fn test_muted_topics_hidden_and_restored() {
    let mut client = make_client();
    let id = client.lists.create(
        Filter::combined_feed(),
        HeadlessRenderer::new(),
        MessageListOptions {
            excludes_muted_topics: true,
        },
    );
    client.muting.mute_topic(3, "noise");

    let list = client.lists.get_mut(id).unwrap();
    add_old_messages(
        &[
            make_message(10, 3, "lunch"),
            make_message(20, 3, "noise"),
            make_message(30, 3, "lunch"),
        ],
        list,
    );
    assert_eq!(list.num_items(), 2);
    assert!(list.msg_id_in_fetched_range(MessageId::new(20)));

    client.muting.unmute_topic(3, "noise");
    let list = client.lists.get_mut(id).unwrap();
    list.update_muting_and_rerender();
    assert_eq!(list.num_items(), 3);
    assert_eq!(list.view().rendered_ids().len(), 3);
}

#[test]
fn test_local_echo_acknowledged() {
    let mut client = make_client();
    let id = new_list(&mut client, Filter::channel(3));
    let list = client.lists.get_mut(id).unwrap();

    add_old_messages(&[make_message(10, 3, "a")], list);
    let local_id = MessageId::local(10, 1);
    let local = Arc::new(Message::builder(local_id).stream(3, "a").read().build());
    list.append(&[local], AddMessagesOptions { messages_are_new: true });
    list.select_id(local_id, SelectOptions::default()).unwrap();

    list.change_message_id(local_id, MessageId::new(11));
    assert_eq!(list.selected_id(), Some(MessageId::new(11)));
    assert!(list.get(local_id).is_none());
    assert!(list.get(MessageId::new(11)).is_some());
}

#[test]
fn test_trailing_bookend_after_unsubscribe() {
    let mut client = make_client();
    client.subscriptions.add(Subscription::new(3, "design"));
    let id = new_list(&mut client, Filter::channel(3));
    let settings = UserSettings::default();

    let list = client.lists.get_mut(id).unwrap();
    list.update_trailing_bookend(&settings, false);
    assert!(list.view().trailing_bookend().is_none());

    client.subscriptions.set_subscribed("design", false);
    let list = client.lists.get_mut(id).unwrap();
    list.update_trailing_bookend(&settings, false);
    let bookend = list.view().trailing_bookend().unwrap();
    assert_eq!(bookend.stream_name, "design");
    assert!(bookend.just_unsubscribed);
    assert!(!bookend.deactivated);

    let spectator = UserSettings {
        is_spectator: true,
        ..UserSettings::default()
    };
    list.update_trailing_bookend(&spectator, false);
    assert!(list.view().trailing_bookend().unwrap().is_spectator);
}

#[test]
fn test_event_routing_and_queries() {
    let mut client = make_client();
    let lunch = new_list(&mut client, Filter::topic(3, "lunch"));
    let design = new_list(&mut client, Filter::channel(4));
    for id in [lunch, design] {
        client
            .lists
            .get_mut(id)
            .unwrap()
            .data_mut()
            .fetch_status_mut()
            .finish_newer_batch(&[], true);
    }

    let mut all_messages = MessageListData::new(Filter::all_messages());
    all_messages
        .fetch_status_mut()
        .finish_older_batch(FinishOlderBatch {
            found_oldest: true,
            history_limited: false,
        });
    all_messages.fetch_status_mut().finish_newer_batch(&[], true);

    let batch = vec![make_message(5, 3, "Lunch"), make_message(6, 4, "specs")];
    let rendered = insert_new_messages(&batch, &mut all_messages, &mut client.lists);
    assert_eq!(rendered.len(), 2);

    assert_eq!(client.lists.get(lunch).unwrap().num_items(), 1);
    assert_eq!(client.lists.get(design).unwrap().num_items(), 1);
    assert_eq!(get_messages_in_topic(&all_messages, 3, "lunch").len(), 1);
}

#[test]
fn test_direct_message_hints_follow_current_list() {
    let mut client = make_client();
    let people = InMemoryPeople::new(1);
    people.add_user(2, "alice@example.com");

    let id = new_list(&mut client, Filter::dm("alice@example.com"));
    client.lists.set_current(Some(id)).unwrap();

    let current = client.lists.current().map(|list| list.data());
    let hints = get_direct_message_permission_hints("2", current, &people);
    assert!(!hints.is_local_echo_safe);

    client
        .lists
        .current_mut()
        .unwrap()
        .data_mut()
        .fetch_status_mut()
        .finish_newer_batch(&[], true);
    let current = client.lists.current().map(|list| list.data());
    let hints = get_direct_message_permission_hints("2", current, &people);
    assert!(hints.is_known_empty_conversation);

    people.set_can_initiate_direct_message_thread(false);
    assert!(!user_can_send_direct_message("2", current, &people));
}

#[test]
fn test_messages_loaded_from_server_json() {
    let json = r#"[
        {"id": 10, "sender_id": 7, "timestamp": 1700000000, "flags": ["read"],
         "type": "stream", "stream_id": 3, "topic": "lunch"},
        {"id": 11, "sender_id": 8, "timestamp": 1700000060, "flags": [],
         "type": "private", "to_user_ids": "1,8", "reply_to": "bob@example.com"}
    ]"#;
    let messages: Vec<Message> = serde_json::from_str(json).unwrap();

    let store = InMemoryMessageStore::new();
    let shared = store.insert_all(messages);
    assert_eq!(store.len(), 2);
    assert!(store.get(MessageId::new(11)).unwrap().is_unread());

    let mut client = make_client();
    let id = new_list(&mut client, Filter::all_messages());
    let list = client.lists.get_mut(id).unwrap();
    add_old_messages(&shared, list);
    assert_eq!(list.num_items(), 2);
    assert_eq!(list.last().unwrap().sender_id, 8);
}

#[test]
fn test_settings_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"web_home_view": "inbox", "web_mark_read_on_scroll_policy": "conversation_only"}"#,
    )
    .unwrap();

    let settings = UserSettings::from_file(&path).unwrap();
    assert_eq!(settings.web_home_view, HomeView::Inbox);
    assert_eq!(
        settings.web_mark_read_on_scroll_policy,
        MarkReadOnScrollPolicy::ConversationOnly
    );
    assert!(!settings.is_spectator);
}
