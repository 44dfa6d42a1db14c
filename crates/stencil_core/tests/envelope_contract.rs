use http::StatusCode;
use serde_json::{json, Map};
use stencil_core::api::{from_error, ActionCode, ApiError, Envelope, ResponseStatus};

fn wrap(code: u16, action_code: ActionCode) -> Envelope {
    Envelope::wrap(
        json!({"k": "v"}),
        StatusCode::from_u16(code).unwrap(),
        action_code,
        Map::new(),
    )
}

#[test]
fn status_is_success_exactly_for_2xx() {
    for code in 200..300 {
        assert_eq!(wrap(code, ActionCode::DoNothing).status, ResponseStatus::Success);
    }
    for code in [100, 101, 199, 300, 301, 304, 400, 403, 404, 405, 418, 500, 503] {
        let envelope = wrap(code, ActionCode::DoNothing);
        assert_eq!(envelope.status, ResponseStatus::Error, "code {code}");
        assert_eq!(envelope.to_json()["status"], "error");
    }
}

#[test]
fn unauthorized_always_carries_the_auth_action_code() {
    for supplied in [
        ActionCode::DoNothing,
        ActionCode::DisplayErrorMessages,
        ActionCode::Custom("OPEN_DIALOG".to_string()),
    ] {
        let envelope = wrap(401, supplied);
        assert_eq!(envelope.action_code, ActionCode::AuthTokenNotProvidedOrInvalid);
        assert_eq!(
            envelope.to_json()["action_code"],
            "AUTH_TOKEN_NOT_PROVIDED_OR_INVALID"
        );
    }
}

#[test]
fn other_codes_keep_the_caller_action_code() {
    let envelope = wrap(403, ActionCode::Custom("OPEN_DIALOG".to_string()));
    assert_eq!(envelope.to_json()["action_code"], "OPEN_DIALOG");
    let envelope = wrap(200, ActionCode::default());
    assert_eq!(envelope.to_json()["action_code"], "DO_NOTHING");
}

#[test]
fn payload_is_passed_through_verbatim() {
    let envelope = wrap(201, ActionCode::DoNothing);
    assert_eq!(
        serde_json::to_value(&envelope).unwrap(),
        json!({"data": {"k": "v"}, "status": "success", "action_code": "DO_NOTHING"})
    );
}

#[test]
fn error_envelopes_display_messages() {
    let envelope = from_error(&ApiError::NotFound);
    assert_eq!(envelope.status_code, StatusCode::NOT_FOUND);
    assert_eq!(
        envelope.to_json(),
        json!({
            "data": {"detail": "Not found."},
            "status": "error",
            "action_code": "DISPLAY_ERROR_MESSAGES",
        })
    );

    let envelope = from_error(&ApiError::NotAuthenticated);
    assert_eq!(envelope.to_json()["action_code"], "AUTH_TOKEN_NOT_PROVIDED_OR_INVALID");
}
