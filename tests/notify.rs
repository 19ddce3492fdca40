//! Pushover delivery against a local scripted server

mod common;

use common::MockServer;
use mtgjson_util::http::{HttpConfig, SessionFactory};
use mtgjson_util::{PushoverConfig, PushoverNotifier};

fn notifier(server: &MockServer, users: &[&str]) -> PushoverNotifier {
    let config = PushoverConfig::default()
        .with_app_token("app-token")
        .with_user_tokens(users.iter().copied())
        .with_endpoint(server.url("/1/messages.json"))
        .with_version("5.2.2");
    let session = SessionFactory::new(HttpConfig::default()).session(None).unwrap();
    PushoverNotifier::with_session(config, session)
}

#[tokio::test]
async fn test_no_app_token_sends_nothing() {
    let server = MockServer::constant(200, "{}").await;
    let config = PushoverConfig::default()
        .with_user_tokens(["user"])
        .with_endpoint(server.url("/1/messages.json"));
    let notifier = PushoverNotifier::new(config).unwrap();

    assert!(!notifier.send("Build finished").await);
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn test_no_users_sends_nothing() {
    let server = MockServer::constant(200, "{}").await;
    let notifier = notifier(&server, &[]);

    assert!(!notifier.send("Build finished").await);
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn test_delivers_to_every_user() {
    let server = MockServer::constant(200, r#"{"status": 1}"#).await;
    let notifier = notifier(&server, &["user-a", "user-b"]);

    assert!(notifier.send("Build finished").await);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    for (request, user) in requests.iter().zip(["user-a", "user-b"]) {
        assert!(request.starts_with("POST /1/messages.json "));
        assert!(request.contains("token=app-token"));
        assert!(request.contains(&format!("user={user}")));
        assert!(request.contains("title=MTGJSON+5.2.2"));
        assert!(request.contains("message=Build+finished"));
    }
}

#[tokio::test]
async fn test_rejection_still_attempts_every_user() {
    let server = MockServer::start(vec![(400, r#"{"status": 0}"#), (200, r#"{"status": 1}"#)]).await;
    let notifier = notifier(&server, &["bad-user", "good-user"]);

    assert!(!notifier.send("Build failed").await);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::constant(500, "").await;
    let notifier = notifier(&server, &["user"]);

    assert!(!notifier.send("Build failed").await);
    assert_eq!(server.hits(), 1);
}
