//! Entry points: authorization, /start, /cancel confirmation and link batches
//!
//! Run with: cargo test --test handlers_test

mod common;
mod mocks;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use teloxide::types::ChatId;

use doralink::core::{Authorizer, UNAUTHORIZED_NOTICE};
use doralink::download::SessionOutcome;
use doralink::telegram::handlers::{handle_cancel, handle_start, handle_text, HandlerDeps, WELCOME_TEXT};
use common::{assert_settled_before, pipeline, Call, RecordingTransport, DIRECT_LINK};
use mocks::{MockRetriever, RetrieverBehavior};

const CHAT: ChatId = ChatId(1001);
const ALLOWED: i64 = 1001;
const STRANGER: i64 = 666;

struct Harness {
    deps: HandlerDeps,
    transport: Arc<RecordingTransport>,
    direct: Arc<MockRetriever>,
    _dir: tempfile::TempDir,
}

fn harness(direct: RetrieverBehavior) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let transport = RecordingTransport::new();
    let direct = MockRetriever::new(direct).arc();
    let ctx = pipeline(
        transport.clone(),
        MockRetriever::new(RetrieverBehavior::Succeed).arc(),
        direct.clone(),
        dir.path(),
    );
    let deps = HandlerDeps::new(Arc::new(Authorizer::new([ALLOWED])), Arc::new(ctx));
    Harness {
        deps,
        transport,
        direct,
        _dir: dir,
    }
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_unauthorized_start_only_gets_notice() {
    let h = harness(RetrieverBehavior::Succeed);
    handle_start(&h.deps, CHAT, Some(STRANGER)).await.unwrap();
    assert_eq!(h.transport.texts(), vec![UNAUTHORIZED_NOTICE.to_string()]);
}

#[tokio::test]
async fn test_missing_sender_is_unauthorized() {
    let h = harness(RetrieverBehavior::Succeed);
    handle_start(&h.deps, CHAT, None).await.unwrap();
    assert_eq!(h.transport.texts(), vec![UNAUTHORIZED_NOTICE.to_string()]);
}

#[tokio::test]
async fn test_unauthorized_links_trigger_nothing() {
    let h = harness(RetrieverBehavior::Succeed);
    let batch = handle_text(&h.deps, CHAT, Some(STRANGER), DIRECT_LINK).await.unwrap();

    assert!(batch.is_none());
    assert_eq!(h.direct.resolve_count(), 0);
    assert_eq!(h.transport.calls().len(), 1);
    assert_eq!(h.transport.texts(), vec![UNAUTHORIZED_NOTICE.to_string()]);
}

#[tokio::test]
async fn test_unauthorized_cancel_does_not_open_gate() {
    let h = harness(RetrieverBehavior::Succeed);
    handle_cancel(&h.deps, CHAT, Some(STRANGER)).await.unwrap();

    assert!(!h.deps.gate.is_awaiting(CHAT).await);
    assert!(!h.transport.calls().iter().any(|c| matches!(c, Call::SendPrompt { .. })));
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_start_sends_welcome() {
    let h = harness(RetrieverBehavior::Succeed);
    handle_start(&h.deps, CHAT, Some(ALLOWED)).await.unwrap();
    assert_eq!(h.transport.texts(), vec![WELCOME_TEXT.to_string()]);
}

#[tokio::test]
async fn test_cancel_prompts_with_yes_no() {
    let h = harness(RetrieverBehavior::Succeed);
    handle_cancel(&h.deps, CHAT, Some(ALLOWED)).await.unwrap();

    assert_eq!(
        h.transport.calls(),
        vec![Call::SendPrompt {
            chat_id: CHAT,
            text: "Are you sure you want to cancel? This will stop the current download process.".to_string(),
            choices: vec!["Yes".to_string(), "No".to_string()],
        }]
    );
    assert!(h.deps.gate.is_awaiting(CHAT).await);
}

#[tokio::test]
async fn test_declined_confirmation_is_not_treated_as_link() {
    let h = harness(RetrieverBehavior::Succeed);
    handle_cancel(&h.deps, CHAT, Some(ALLOWED)).await.unwrap();
    let batch = handle_text(&h.deps, CHAT, Some(ALLOWED), "No").await.unwrap();

    assert!(batch.is_none());
    assert_eq!(h.direct.resolve_count(), 0);
    assert_eq!(h.transport.texts(), vec!["Cancelled request aborted.".to_string()]);
    assert!(!h.deps.gate.is_awaiting(CHAT).await);
}

#[tokio::test]
async fn test_confirmation_with_nothing_running() {
    let h = harness(RetrieverBehavior::Succeed);
    handle_cancel(&h.deps, CHAT, Some(ALLOWED)).await.unwrap();
    handle_text(&h.deps, CHAT, Some(ALLOWED), "Yes").await.unwrap();

    assert_eq!(h.transport.texts(), vec!["No download is in progress.".to_string()]);
}

// ============================================================================
// Links
// ============================================================================

#[tokio::test]
async fn test_links_are_processed_in_order() {
    let h = harness(RetrieverBehavior::Succeed);
    let second = "https://cdn.example.org/b.mp4";
    let text = format!("{}\n\n  {}  \n", DIRECT_LINK, second);

    let batch = handle_text(&h.deps, CHAT, Some(ALLOWED), &text).await.unwrap();
    let outcomes = batch.expect("batch spawned").await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(SessionOutcome::is_ok));
    assert_eq!(h.direct.fetched_links(), vec![DIRECT_LINK.to_string(), second.to_string()]);
    assert_settled_before(&h.transport, DIRECT_LINK, second, true);
}

#[tokio::test]
async fn test_blank_text_spawns_nothing() {
    let h = harness(RetrieverBehavior::Succeed);
    let batch = handle_text(&h.deps, CHAT, Some(ALLOWED), "  \n ").await.unwrap();
    assert!(batch.is_none());
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn test_confirmed_cancel_stops_running_download() {
    let h = harness(RetrieverBehavior::Hang);

    let batch = handle_text(&h.deps, CHAT, Some(ALLOWED), DIRECT_LINK)
        .await
        .unwrap()
        .expect("batch spawned");
    h.direct.fetch_started.notified().await;

    handle_cancel(&h.deps, CHAT, Some(ALLOWED)).await.unwrap();
    let confirm = handle_text(&h.deps, CHAT, Some(ALLOWED), "yes").await.unwrap();
    assert!(confirm.is_none());

    let outcomes = batch.await.unwrap();
    assert!(matches!(outcomes[..], [SessionOutcome::Cancelled]));

    let texts = h.transport.texts();
    assert!(texts.contains(&"Download process cancelled.".to_string()));
    assert!(texts.contains(&format!("⛔ Download cancelled: {}", DIRECT_LINK)));
    assert!(h.transport.videos().is_empty());
}
