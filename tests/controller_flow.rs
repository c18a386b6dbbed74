//! Integration tests for the request lifecycle
//!
//! Drives a `RequestController` against scripted and held completion
//! services and checks what ends up in the store.

mod common;

use chatshell::chat::{
    derive_title, IgnoreReason, Message, ModelSelection, RequestController, RequestOptions,
    SharedStore, SubmitOutcome, NEW_CHAT_TITLE,
};
use chatshell::providers::ChatTurn;
use common::{Call, HeldService, ScriptedService};
use std::sync::Arc;

const FALLBACK: &str = "Something went wrong.";

fn options() -> RequestOptions {
    RequestOptions {
        system_instruction: None,
        search_grounding: false,
        clean_responses: true,
        fallback_reply: FALLBACK.to_string(),
    }
}

fn controller(service: Arc<dyn chatshell::providers::CompletionService>) -> RequestController {
    RequestController::new(
        SharedStore::default(),
        service,
        ModelSelection::new("gemini-2.5-flash"),
        options(),
    )
}

fn current_messages(controller: &RequestController) -> Vec<Message> {
    controller
        .store()
        .read()
        .current()
        .map(|c| c.messages().to_vec())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_successful_turns_append_in_order() {
    let service = Arc::new(ScriptedService::replying(&["a1", "a2"]));
    let controller = controller(service.clone());

    controller.send("u1").await;
    controller.send("u2").await;

    assert_eq!(
        current_messages(&controller),
        vec![
            Message::user("u1"),
            Message::assistant("a1"),
            Message::user("u2"),
            Message::assistant("a2"),
        ]
    );

    assert_eq!(
        service.calls(),
        vec![
            Call::Single {
                prompt: "u1".to_string(),
                model: "gemini-2.5-flash".to_string(),
            },
            Call::Chat {
                history: vec![
                    ChatTurn::user("u1"),
                    ChatTurn::model("a1"),
                    ChatTurn::user("u2"),
                ],
                model: "gemini-2.5-flash".to_string(),
            },
        ]
    );
    assert!(controller.input().is_empty());
    assert!(!controller.is_pending());
}

#[tokio::test]
async fn test_failure_appends_single_fallback() {
    let service = Arc::new(ScriptedService::new(vec![Err("HTTP 500")]));
    let controller = controller(service);

    let outcome = controller.send("hello").await;

    match outcome {
        SubmitOutcome::Fallback { error, .. } => assert!(error.contains("HTTP 500")),
        other => panic!("expected fallback, got {:?}", other),
    }
    assert_eq!(
        current_messages(&controller),
        vec![Message::user("hello"), Message::assistant(FALLBACK)]
    );
    assert!(!controller.is_pending());
}

#[tokio::test]
async fn test_conversation_continues_after_failure() {
    let service = Arc::new(ScriptedService::new(vec![Err("timeout"), Ok("better")]));
    let controller = controller(service.clone());

    controller.send("first").await;
    let outcome = controller.send("second").await;

    assert!(matches!(outcome, SubmitOutcome::Replied { .. }));
    assert_eq!(current_messages(&controller).len(), 4);
    assert!(matches!(service.calls()[1], Call::Chat { .. }));
}

#[tokio::test]
async fn test_submit_ignored_while_pending() {
    let service = Arc::new(HeldService::default());
    let controller = controller(service.clone());

    let (first, second) = tokio::join!(controller.send("first"), async {
        service.started.notified().await;
        assert!(controller.is_pending());
        assert!(!controller.can_send());

        let second = controller.send("second").await;
        service.release.notify_one();
        second
    });

    assert!(matches!(first, SubmitOutcome::Replied { .. }));
    assert_eq!(second, SubmitOutcome::Ignored(IgnoreReason::Busy));
    assert_eq!(controller.input(), "second");
    assert_eq!(service.models.lock().unwrap().len(), 1);
    assert_eq!(
        current_messages(&controller),
        vec![Message::user("first"), Message::assistant("re:first")]
    );
}

#[tokio::test]
async fn test_reply_lands_in_captured_conversation() {
    let service = Arc::new(HeldService::default());
    let controller = controller(service.clone());

    let (outcome, other) = tokio::join!(controller.send("question"), async {
        service.started.notified().await;
        let other = controller.store().write().create_conversation(false).id();
        service.release.notify_one();
        other
    });

    let target = outcome.conversation_id().unwrap();
    assert_ne!(target, other);

    let store = controller.store().read();
    assert_eq!(store.current_id(), Some(other));
    assert!(store.get(other).unwrap().is_empty());
    assert_eq!(
        store.get(target).unwrap().messages(),
        &[Message::user("question"), Message::assistant("re:question")]
    );
}

#[tokio::test]
async fn test_reply_for_deleted_conversation_is_dropped() {
    let service = Arc::new(HeldService::default());
    let controller = controller(service.clone());

    let (outcome, ()) = tokio::join!(controller.send("question"), async {
        service.started.notified().await;
        let id = controller.store().read().current_id().unwrap();
        controller.store().write().delete_conversation(id);
        service.release.notify_one();
    });

    assert!(matches!(outcome, SubmitOutcome::Dropped { .. }));
    assert!(controller.store().read().is_empty());
    assert!(!controller.is_pending());
}

#[tokio::test]
async fn test_model_change_applies_to_next_request() {
    let service = Arc::new(HeldService::default());
    let controller = controller(service.clone());

    tokio::join!(controller.send("one"), async {
        service.started.notified().await;
        controller.model().set("gemini-2.5-pro");
        service.release.notify_one();
    });

    service.release.notify_one();
    controller.send("two").await;

    assert_eq!(
        *service.models.lock().unwrap(),
        vec!["gemini-2.5-flash".to_string(), "gemini-2.5-pro".to_string()]
    );
}

#[tokio::test]
async fn test_edit_truncates_and_resends() {
    let service = Arc::new(ScriptedService::replying(&["a1", "a2", "a2 revised"]));
    let controller = controller(service.clone());

    controller.send("u1").await;
    controller.send("u2").await;

    assert_eq!(controller.editable_index(), Some(2));
    assert_eq!(controller.begin_edit(2).unwrap(), "u2");
    assert!(controller.begin_edit(0).is_err());

    let outcome = controller.save_edit("u2 revised").await;
    assert!(matches!(outcome, SubmitOutcome::Replied { .. }));

    assert_eq!(
        current_messages(&controller),
        vec![
            Message::user("u1"),
            Message::assistant("a1"),
            Message::user("u2 revised"),
            Message::assistant("a2 revised"),
        ]
    );
    assert_eq!(
        service.calls().last(),
        Some(&Call::Chat {
            history: vec![
                ChatTurn::user("u1"),
                ChatTurn::model("a1"),
                ChatTurn::user("u2 revised"),
            ],
            model: "gemini-2.5-flash".to_string(),
        })
    );
}

#[tokio::test]
async fn test_edit_truncates_before_reply_arrives() {
    let service = Arc::new(HeldService::default());
    let controller = controller(service.clone());

    service.release.notify_one();
    controller.send("u1").await;
    service.release.notify_one();
    controller.send("u2").await;
    // Drain the start signal left by the completed sends
    service.started.notified().await;

    controller.begin_edit(2).unwrap();
    let (outcome, in_flight) = tokio::join!(controller.save_edit("u2x"), async {
        service.started.notified().await;
        let snapshot = current_messages(&controller);
        assert!(controller.is_pending());
        service.release.notify_one();
        snapshot
    });

    assert_eq!(
        in_flight,
        vec![
            Message::user("u1"),
            Message::assistant("re:u1"),
            Message::user("u2x"),
        ]
    );
    assert!(matches!(outcome, SubmitOutcome::Replied { .. }));
    assert_eq!(
        current_messages(&controller),
        vec![
            Message::user("u1"),
            Message::assistant("re:u1"),
            Message::user("u2x"),
            Message::assistant("re:u2x"),
        ]
    );
}

#[tokio::test]
async fn test_save_without_edit_is_ignored() {
    let service = Arc::new(ScriptedService::replying(&[]));
    let controller = controller(service.clone());

    assert_eq!(
        controller.save_edit("text").await,
        SubmitOutcome::Ignored(IgnoreReason::NoEdit)
    );
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_titles_follow_first_message() {
    let service = Arc::new(ScriptedService::replying(&["fine"]));
    let controller = controller(service);

    controller.store().write().create_conversation(false);
    assert_eq!(
        controller.store().read().current().unwrap().title(),
        NEW_CHAT_TITLE
    );

    controller.send("How are you today?").await;
    let messages = current_messages(&controller);
    let title = controller.store().read().current().unwrap().title().to_string();

    assert_eq!(title, "How are you today?");
    assert_eq!(derive_title(&messages, 50), title);
    assert_eq!(derive_title(&messages, 50), derive_title(&messages, 50));
    assert_eq!(derive_title(&[], 50), NEW_CHAT_TITLE);
}

#[tokio::test]
async fn test_temporary_conversations_are_discarded() {
    let service = Arc::new(ScriptedService::replying(&["kept", "gone"]));
    let controller = controller(service);

    controller.send("regular").await;
    let regular = controller.store().read().current_id().unwrap();

    controller.store().write().set_temporary_mode(true);
    controller.send("secret").await;
    assert_eq!(controller.store().read().len(), 2);

    let fresh = controller.store().write().set_temporary_mode(false);

    let store = controller.store().read();
    assert_eq!(store.len(), 2);
    assert!(store.conversations().iter().all(|c| !c.is_temporary()));
    assert_eq!(store.current_id(), Some(fresh));
    assert_eq!(
        store.get(regular).unwrap().messages(),
        &[Message::user("regular"), Message::assistant("kept")]
    );
}
