use super::*;
use serde_json::json;

#[test]
fn string_detail_wins() {
    let body = json!({ "detail": "Incorrect email or password", "message": "ignored" });
    assert_eq!(extract_error_message(&body).as_deref(), Some("Incorrect email or password"));
}

#[test]
fn validation_detail_list_is_joined() {
    let body = json!({
        "detail": [
            { "loc": ["body", "email"], "msg": "field required" },
            { "loc": ["body", "password"], "msg": "ensure this value has at least 8 characters" }
        ]
    });
    assert_eq!(
        extract_error_message(&body).as_deref(),
        Some("field required, ensure this value has at least 8 characters")
    );
}

#[test]
fn message_field_is_fallback() {
    assert_eq!(extract_error_message(&json!({ "message": "Nope" })).as_deref(), Some("Nope"));
    assert_eq!(extract_error_message(&json!({ "detail": [] , "message": "Nope" })).as_deref(), Some("Nope"));
}

#[test]
fn unrecognized_body_yields_none() {
    assert!(extract_error_message(&json!({ "error": "x" })).is_none());
    assert!(extract_error_message(&json!({ "detail": 5 })).is_none());
}

#[test]
fn from_response_keeps_status_and_details() {
    let err = ApiError::from_response(403, r#"{"detail":"Please verify your email first"}"#);
    assert_eq!(err.status, 403);
    assert!(err.is_forbidden());
    assert_eq!(err.message, "Please verify your email first");
    assert_eq!(err.details, Some(json!({ "detail": "Please verify your email first" })));
}

#[test]
fn from_response_non_json_uses_generic_message() {
    let err = ApiError::from_response(502, "<html>Bad Gateway</html>");
    assert_eq!(err.status, 502);
    assert_eq!(err.message, GENERIC_ERROR_MESSAGE);
    assert!(err.details.is_none());
}

#[test]
fn network_error_names_base_url() {
    let err = ApiError::network("http://127.0.0.1:8000/api/v1");
    assert_eq!(err.status, 0);
    assert!(err.is_network());
    assert!(err.message.contains("http://127.0.0.1:8000/api/v1"));
}

#[test]
fn classification_helpers() {
    assert!(ApiError::new(422, "bad").is_validation());
    assert!(ApiError::new(400, "bad").is_validation());
    assert!(ApiError::new(401, "who").is_unauthorized());
    assert!(!ApiError::new(500, "boom").is_network());
    assert_eq!(ApiError::new(418, "teapot").to_string(), "teapot");
}
