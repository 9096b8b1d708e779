//! Sessions and account flows against a mock EasyTL backend.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use easytl::auth::{AccessToken, AuthState, LoginCheck, TokenStore};
use easytl::client::TranslationClient;
use easytl::config::ApiConfig;
use easytl::session::{SessionSlot, TranslationSession};
use easytl::stream::{event_channel, StreamEvent, TranslationOutcome, FAILURE_MARKER};
use easytl::translate::{CredentialMode, Provider, TranslationRequest};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> TranslationClient {
    TranslationClient::new(ApiConfig {
        base_url: server.uri(),
        ..Default::default()
    })
    .unwrap()
}

fn valid_token() -> AccessToken {
    let exp = chrono::Utc::now().timestamp() + 3600;
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#));
    AccessToken::new(format!("eyJhbGciOiJIUzI1NiJ9.{payload}.sig"))
}

fn request(credentials: CredentialMode) -> TranslationRequest {
    TranslationRequest::builder("Hello world")
        .language("Spanish")
        .tone("Casual")
        .provider(Provider::Anthropic)
        .additional_instructions("Keep it short")
        .credentials(credentials)
        .build()
        .unwrap()
}

async fn collect(mut rx: tokio::sync::mpsc::UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn credit_translation_streams_text_and_balance() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"text\":\"Hola\"}\n",
        "\n",
        "data: {\"text\":\" mundo\",\"credits\":41.5}\n",
        "data: [DONE]\n",
    );

    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(header("authorization", "Bearer jwt"))
        .and(body_partial_json(serde_json::json!({
            "provider": "Anthropic",
            "model": "claude-3-haiku-20240307",
            "using_credits": true
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (tx, rx) = event_channel();
    let session = TranslationSession::spawn(
        Arc::new(client_for(&server)),
        request(CredentialMode::Credits {
            access_token: "jwt".to_string(),
        }),
        tx,
    );

    let termination = session.join().await.unwrap();
    assert_eq!(
        termination.outcome(),
        Some(&TranslationOutcome::Completed("Hola mundo".to_string()))
    );
    assert_eq!(
        collect(rx).await,
        vec![
            StreamEvent::Update {
                text: "Hola".to_string()
            },
            StreamEvent::Update {
                text: "Hola mundo".to_string()
            },
            StreamEvent::Balance { credits: 41.5 },
            StreamEvent::Finished {
                outcome: TranslationOutcome::Completed("Hola mundo".to_string())
            },
        ]
    );
}

#[tokio::test]
async fn rejected_translation_shows_failure_marker() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/translate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream provider error"))
        .mount(&server)
        .await;

    let (tx, rx) = event_channel();
    let mut slot = SessionSlot::new();
    slot.start(
        Arc::new(client_for(&server)),
        request(CredentialMode::ApiKey {
            key: "sk-test".to_string(),
        }),
        tx,
    )
    .await;

    let termination = slot.join().await.unwrap();
    let outcome = termination.outcome().unwrap();
    assert_eq!(outcome.display_text(), FAILURE_MARKER);

    let events = collect(rx).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        StreamEvent::Finished { outcome } if outcome.is_failure()
    ));
}

#[tokio::test]
async fn login_status_and_logout() {
    let server = MockServer::start().await;
    let token = valid_token();

    Mock::given(method("GET"))
        .and(path("/user/info"))
        .and(header("authorization", format!("Bearer {}", token.as_str()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "email": "user@example.com",
            "credits": 100,
            "isPrivilegedUser": false
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("access_token"));
    let mut auth = AuthState::new(client_for(&server), store.clone());

    assert_eq!(auth.login(token.clone()).await.unwrap(), LoginCheck::Refreshed);
    assert_eq!(auth.email(), Some("user@example.com"));
    assert_eq!(auth.credits().balance(), 100.0);
    assert_eq!(store.load().unwrap(), Some(token));

    // A fresh process picks the stored login up again.
    let mut restarted = AuthState::new(client_for(&server), store.clone());
    restarted.check_login_status(false).await.unwrap();
    assert!(restarted.is_logged_in());

    restarted.logout().unwrap();
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn rejected_stored_token_is_discarded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/info"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("access_token"));
    store.save(&valid_token()).unwrap();

    let mut auth = AuthState::new(client_for(&server), store.clone());
    let check = auth.check_login_status(true).await.unwrap();

    assert_eq!(check, LoginCheck::LoggedOut);
    assert!(!auth.is_logged_in());
    assert!(store.load().unwrap().is_none());
}
