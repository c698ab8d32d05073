use super::*;
use crate::client::timeline::LocalStatus;
use crate::state::test_helpers::spawn_test_server;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn session(base_url: &str, user: &str) -> ChatSession {
    ChatSession::new(ApiClient::new(base_url).unwrap(), user).unwrap()
}

// =============================================================================
// Input rules
// =============================================================================

#[test]
fn user_name_is_trimmed() {
    assert_eq!(validate_user_name("  ana  ").unwrap(), "ana");
}

#[test]
fn blank_user_name_is_rejected() {
    assert!(matches!(validate_user_name("   "), Err(ClientError::Invalid(_))));
}

#[test]
fn user_name_limit_counts_chars() {
    assert!(validate_user_name(&"é".repeat(MAX_USER_NAME_CHARS)).is_ok());
    assert!(validate_user_name(&"é".repeat(MAX_USER_NAME_CHARS + 1)).is_err());
}

#[test]
fn text_rules() {
    assert_eq!(validate_text(" oi \n").unwrap(), "oi");
    assert!(validate_text("\t").is_err());
    assert!(validate_text(&"a".repeat(MAX_TEXT_CHARS)).is_ok());
    assert!(validate_text(&"a".repeat(MAX_TEXT_CHARS + 1)).is_err());
}

#[test]
fn content_type_guess_by_extension() {
    assert_eq!(guess_content_type("cat.PNG"), "image/png");
    assert_eq!(guess_content_type("a.b.jpeg"), "image/jpeg");
    assert_eq!(guess_content_type("song.mp3"), "audio/mpeg");
    assert_eq!(guess_content_type("notes.txt"), "application/octet-stream");
    assert_eq!(guess_content_type("README"), "application/octet-stream");
}

#[test]
fn new_session_rejects_blank_user() {
    let api = ApiClient::new("http://localhost:3000").unwrap();
    assert!(ChatSession::new(api, " ").is_err());
}

// =============================================================================
// Sending
// =============================================================================

#[tokio::test]
async fn send_text_stores_under_client_id_and_marks_sent() {
    let server = spawn_test_server().await.unwrap();
    let chat = session(&server.base_url, " ana ");
    assert_eq!(chat.user(), "ana");

    let stored = chat.send_text("  oi  ").await.unwrap();
    assert_eq!(stored.content, "oi");
    assert_eq!(stored.sender, "ana");

    let entries = chat.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message().id, stored.id);
    assert_eq!(entries[0].status(), Some(&LocalStatus::Sent));
    assert!(entries[0].is_mine("ana"));

    let on_server = server.state.messages.list().await.unwrap();
    assert_eq!(on_server[0].id, stored.id);
}

#[tokio::test]
async fn refresh_confirms_sent_message() {
    let server = spawn_test_server().await.unwrap();
    let chat = session(&server.base_url, "ana");
    let stored = chat.send_text("oi").await.unwrap();

    chat.refresh().await;

    let entries = chat.entries().await;
    assert_eq!(entries.len(), 1);
    assert!(matches!(&entries[0], TimelineEntry::Confirmed(m) if m.id == stored.id));
}

#[tokio::test]
async fn invalid_text_adds_nothing() {
    let server = spawn_test_server().await.unwrap();
    let chat = session(&server.base_url, "ana");
    assert!(matches!(chat.send_text("   ").await, Err(ClientError::Invalid(_))));
    assert!(chat.entries().await.is_empty());
}

#[tokio::test]
async fn unreachable_server_marks_failed_then_discard() {
    // Nothing listens on port 9 (discard) on test hosts.
    let api = ApiClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let chat = ChatSession::new(api, "ana").unwrap();
    let mut changes = chat.subscribe();

    assert!(chat.send_text("oi").await.is_err());
    assert!(changes.has_changed().unwrap());
    changes.borrow_and_update();

    let entries = chat.entries().await;
    assert!(matches!(entries[0].status(), Some(LocalStatus::Failed(_))));

    let id = entries[0].message().id.clone();
    assert!(chat.discard(&id).await);
    assert!(chat.entries().await.is_empty());
    assert!(changes.has_changed().unwrap());
}

#[tokio::test]
async fn send_file_uploads_then_posts_url() {
    let server = spawn_test_server().await.unwrap();
    let chat = session(&server.base_url, "ana");

    let stored = chat.send_file(PNG.to_vec(), "cat.png", "image/png").await.unwrap();
    assert_eq!(stored.kind, MessageKind::Image);
    assert!(stored.content.starts_with(&server.base_url));
    assert!(stored.content.ends_with(".png"));

    let body = reqwest::get(&stored.content).await.unwrap().bytes().await.unwrap();
    assert_eq!(body.as_ref(), PNG);
}

#[tokio::test]
async fn send_file_rejects_non_media_type_before_upload() {
    let server = spawn_test_server().await.unwrap();
    let chat = session(&server.base_url, "ana");

    let err = chat.send_file(b"hi".to_vec(), "notes.txt", "text/plain").await.unwrap_err();
    assert!(matches!(err, ClientError::Invalid(_)));
    assert!(chat.entries().await.is_empty());
    assert!(server.state.messages.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn send_file_with_disallowed_extension_fails_entry() {
    let server = spawn_test_server().await.unwrap();
    let chat = session(&server.base_url, "ana");

    let err = chat.send_file(PNG.to_vec(), "cat.bmp", "image/bmp").await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 400, .. }));

    let entries = chat.entries().await;
    assert_eq!(entries[0].message().content, "cat.bmp");
    assert!(matches!(entries[0].status(), Some(LocalStatus::Failed(_))));
    assert!(server.state.messages.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn polling_picks_up_other_users() {
    let server = spawn_test_server().await.unwrap();
    let ana = session(&server.base_url, "ana");
    let bia = session(&server.base_url, "bia");
    let mut changes = ana.subscribe();

    let _poller = ana.start_polling(Duration::from_millis(50));
    bia.send_text("oi ana").await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            changes.changed().await.unwrap();
            if ana.entries().await.iter().any(|e| e.message().sender == "bia") {
                break;
            }
        }
    })
    .await
    .unwrap();

    let entries = ana.entries().await;
    assert!(!entries[0].is_mine(ana.user()));
}
