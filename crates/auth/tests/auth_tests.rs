use gigboard_auth::{AuthError, HostedIdentity, IdentityService};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_body(display_name: &str) -> serde_json::Value {
    json!({
        "access_token": "test_access_token",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "test_refresh_token",
        "user": {
            "id": "test_user_id",
            "email": "test@example.com",
            "user_metadata": { "display_name": display_name }
        }
    })
}

#[tokio::test]
async fn test_sign_up_publishes_actor() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_json(json!({
            "email": "test@example.com",
            "password": "password123",
            "data": { "display_name": "Ana" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("Ana")))
        .mount(&mock_server)
        .await;

    let identity = HostedIdentity::new(&mock_server.uri(), "test_anon_key", reqwest::Client::new());
    let mut rx = identity.watch();

    let session = identity
        .sign_up("Ana", "test@example.com", "password123")
        .await
        .unwrap();
    assert_eq!(session.user.id, "test_user_id");

    assert!(rx.has_changed().unwrap());
    let actor = rx.borrow_and_update().clone().unwrap();
    assert_eq!(actor.id, "test_user_id");
    assert_eq!(actor.display_name.as_deref(), Some("Ana"));
    assert_eq!(identity.access_token().as_deref(), Some("test_access_token"));
}

#[tokio::test]
async fn test_sign_in_with_password() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("Ana")))
        .mount(&mock_server)
        .await;

    let identity = HostedIdentity::new(&mock_server.uri(), "test_anon_key", reqwest::Client::new());
    identity
        .sign_in_with_password("test@example.com", "password123")
        .await
        .unwrap();

    let actor = identity.current_actor().unwrap();
    assert_eq!(actor.email.as_deref(), Some("test@example.com"));
}

#[tokio::test]
async fn test_failed_sign_in_stays_signed_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid login credentials"))
        .mount(&mock_server)
        .await;

    let identity = HostedIdentity::new(&mock_server.uri(), "test_anon_key", reqwest::Client::new());
    let result = identity.sign_in_with_password("test@example.com", "wrong").await;

    match result {
        Err(AuthError::ApiError(message)) => assert!(message.contains("Invalid login")),
        other => panic!("unexpected result: {:?}", other.map(|s| s.user.id)),
    }
    assert!(identity.current_actor().is_none());
}

#[tokio::test]
async fn test_sign_out_clears_session_even_on_server_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("Ana")))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer test_access_token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let identity = HostedIdentity::new(&mock_server.uri(), "test_anon_key", reqwest::Client::new());
    identity
        .sign_in_with_password("test@example.com", "password123")
        .await
        .unwrap();

    let result = identity.sign_out().await;
    assert!(matches!(result, Err(AuthError::ApiError(_))));
    assert!(identity.current_actor().is_none());
    assert!(identity.get_session().is_none());

    assert!(matches!(identity.sign_out().await, Err(AuthError::MissingSession)));
}

#[tokio::test]
async fn test_update_display_name_republishes_actor() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("Ana")))
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "test_user_id",
            "email": "test@example.com",
            "user_metadata": { "display_name": "Ana Lopez" }
        })))
        .mount(&mock_server)
        .await;

    let identity = HostedIdentity::new(&mock_server.uri(), "test_anon_key", reqwest::Client::new());
    identity
        .sign_in_with_password("test@example.com", "password123")
        .await
        .unwrap();

    identity.update_display_name("Ana Lopez").await.unwrap();
    let actor = identity.current_actor().unwrap();
    assert_eq!(actor.display_name.as_deref(), Some("Ana Lopez"));
    assert_eq!(identity.access_token().as_deref(), Some("test_access_token"));
}
