use super::*;
use crate::net::types::{MessageRole, Stage};
use crate::test_helpers::{fixture, user_json};
use reqwest::Method;
use serde_json::json;

fn api() -> (crate::test_helpers::Fixture, Api) {
    let fx = fixture();
    let api = Api::new(fx.client.clone(), Duration::from_secs(15));
    (fx, api)
}

#[test]
fn session_endpoints_format_expected_paths() {
    assert_eq!(session_messages_endpoint("s1"), "/sessions/s1/messages");
    assert_eq!(session_start_endpoint("s1"), "/sessions/s1/start");
    assert_eq!(session_message_endpoint("s1"), "/sessions/s1/message");
    assert_eq!(session_finalize_endpoint("s1"), "/sessions/s1/finalize");
    assert_eq!(session_results_endpoint("s1"), "/analytics/sessions/s1/results");
}

#[tokio::test]
async fn signup_omits_missing_full_name() {
    let (fx, api) = api();
    fx.transport.reply(
        Method::POST,
        "/auth/signup",
        201,
        json!({ "message": "Verification code sent", "email": "a@example.com" }),
    );

    let resp = api.signup("a@example.com", "pw123456", None).await.unwrap();

    assert_eq!(resp.email, "a@example.com");
    assert_eq!(fx.transport.sent()[0].body, Some(json!({ "email": "a@example.com", "password": "pw123456" })));
}

#[tokio::test]
async fn verify_decodes_token_and_user() {
    let (fx, api) = api();
    fx.transport.reply(
        Method::POST,
        "/auth/verify",
        200,
        json!({ "access_token": "jwt", "token_type": "bearer", "user": user_json("a@example.com") }),
    );

    let resp = api.verify("a@example.com", "123456").await.unwrap();

    assert_eq!(resp.access_token, "jwt");
    assert_eq!(resp.user.email, "a@example.com");
    assert_eq!(fx.transport.sent()[0].body, Some(json!({ "email": "a@example.com", "code": "123456" })));
}

#[tokio::test]
async fn update_me_sends_partial_patch() {
    let (fx, api) = api();
    fx.transport.reply(Method::PATCH, "/users/me", 200, user_json("a@example.com"));

    let update = ProfileUpdate { role_preference: Some("data".to_owned()), ..ProfileUpdate::default() };
    api.update_me(&update).await.unwrap();

    let sent = &fx.transport.sent()[0];
    assert_eq!(sent.method, Method::PATCH);
    assert_eq!(sent.body, Some(json!({ "role_preference": "data" })));
}

#[tokio::test]
async fn session_calls_hit_their_endpoints() {
    let (fx, api) = api();
    fx.transport.reply(Method::POST, "/sessions", 201, json!({ "id": 9, "role": "backend", "stage": "warmup" }));
    fx.transport.reply(
        Method::POST,
        "/sessions/9/message",
        200,
        json!({ "role": "interviewer", "content": "Why?", "stage": "main" }),
    );
    fx.transport.reply(
        Method::GET,
        "/sessions/9/messages",
        200,
        json!([{ "role": "interviewer", "content": "Hi" }, { "role": "user", "content": "Hello" }]),
    );

    let session = api
        .create_session(&SessionConfig { role: "backend".to_owned(), ..SessionConfig::default() })
        .await
        .unwrap();
    assert_eq!(session.id, "9");
    assert_eq!(session.stage, Stage::Warmup);

    let reply = api.send_message("9", "Because.").await.unwrap();
    assert_eq!(reply.stage, Some(Stage::Main));
    assert_eq!(fx.transport.sent()[1].body, Some(json!({ "content": "Because." })));

    let messages = api.session_messages("9").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, MessageRole::Student);
}

#[tokio::test]
async fn speech_uses_short_timeout() {
    let (fx, api) = api();
    fx.transport.reply(Method::POST, "/ai/speech", 200, json!({ "audio": "UklGRg==", "format": "wav" }));

    let clip = api.synthesize_speech("Hello there", Some("alloy")).await.unwrap();

    assert_eq!(clip.format.as_deref(), Some("wav"));
    let sent = &fx.transport.sent()[0];
    assert_eq!(sent.timeout, Duration::from_secs(15));
    assert_eq!(sent.body, Some(json!({ "text": "Hello there", "voice": "alloy" })));
}

#[tokio::test]
async fn chat_returns_response_text() {
    let (fx, api) = api();
    fx.transport.reply(Method::POST, "/ai/chat", 200, json!({ "response": "Use STAR." }));
    assert_eq!(api.chat("How do I answer?").await.unwrap().response, "Use STAR.");
}
