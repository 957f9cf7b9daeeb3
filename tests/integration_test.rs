// Integration tests for Storefront Client
//
// These tests drive the public API against a mock backend and verify the
// token lifecycle end to end: sign-in, persistence, refresh-on-401 and logout.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;

use storefront_client::{
    models::LoginRequest, AuthState, ClientError, Config, KeyValueStore, MemoryStore,
    SessionUser, StorefrontApi,
};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

const API_KEY: &str = "test-api-key-secret";

/// Create a client against `server` backed by a fresh in-memory store
fn create_test_api(server: &ServerGuard) -> (StorefrontApi, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = Config::new(server.url(), API_KEY);
    let api = StorefrontApi::new(&config, store.clone()).expect("Failed to create test client");
    (api, store)
}

fn customer_details_body() -> String {
    json!({
        "isTempPasswordUsed": false,
        "firstName": "Ada",
        "lastName": "Lovelace",
        "birthdate": null,
        "email": "a@b.com",
        "mobilePhone": "+15550100",
        "title": null,
        "homeNumber": null,
        "loyaltyNumber": "L-1001",
        "createdDate": "2023-05-01T10:00:00",
        "activateDate": "2023-05-02T10:00:00",
        "enumStatus": 1,
        "statusName": "Active",
        "signupChannel": "app",
        "mostShoppedStoreId": 12,
        "nearestStoreId": null,
        "id": 1001,
        "emailNotProvided": false,
        "customerNumber": "C-1001"
    })
    .to_string()
}

fn orders_body() -> String {
    json!([
        {"id": "A100", "date": "2024-03-01", "total": 42.5, "status": "completed", "items": 3},
        {"id": "A101", "date": "2024-03-09", "total": 9.99, "status": "pending", "items": 1}
    ])
    .to_string()
}

/// Token endpoint answering a refresh grant for `refresh_token`
async fn mock_refresh(server: &mut ServerGuard, refresh_token: &str, body: &str) -> Mock {
    server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), refresh_token.into()),
            Matcher::UrlEncoded("client_id".into(), "mobileapp".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(1)
        .create_async()
        .await
}

/// `/orders` answering 401 for a stale token
async fn mock_orders_unauthorized(server: &mut ServerGuard, token: &str) -> Mock {
    server
        .mock("GET", "/orders")
        .match_header("authorization", format!("Bearer {}", token).as_str())
        .with_status(401)
        .with_body(r#"{"message":"Access token expired"}"#)
        .create_async()
        .await
}

fn seed_session(store: &MemoryStore, access: &str, refresh: Option<&str>) {
    store.set("jwt_token", access).unwrap();
    if let Some(refresh) = refresh {
        store.set("refresh_token", refresh).unwrap();
    }
}

// ==================================================================================================
// Sign-in Tests
// ==================================================================================================

#[tokio::test]
async fn test_sign_in_persists_tokens_and_attaches_bearer() {
    let mut server = Server::new_async().await;

    let token = server
        .mock("POST", "/token")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "password".into()),
            Matcher::UrlEncoded("username".into(), "a@b.com".into()),
            Matcher::UrlEncoded("password".into(), "secret".into()),
            Matcher::UrlEncoded("client_id".into(), "mobileapp".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"access_token":"AT1","refresh_token":"RT1","expires_in":3600}"#)
        .expect(1)
        .create_async()
        .await;

    // Fetched once by sign-in and once explicitly below
    let details = server
        .mock("GET", "/api/v3/customer/details")
        .match_header("authorization", "Bearer AT1")
        .match_header("x-api-key", API_KEY)
        .with_status(200)
        .with_body(customer_details_body())
        .expect(2)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);

    let user = api
        .sign_in(&LoginRequest::new("a@b.com", "secret"))
        .await
        .unwrap();

    assert_eq!(store.get("jwt_token").unwrap().as_deref(), Some("AT1"));
    assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("RT1"));
    assert_eq!(
        user,
        SessionUser {
            id: "1001".to_string(),
            email: "a@b.com".to_string(),
            name: "Ada Lovelace".to_string(),
        }
    );
    assert_eq!(api.auth_state().await, AuthState::Authenticated(user.clone()));
    assert_eq!(api.stored_user().unwrap(), Some(user));

    let profile = api.get_customer_details().await.unwrap();
    assert_eq!(profile.loyalty_number.as_deref(), Some("L-1001"));

    token.assert_async().await;
    details.assert_async().await;
}

#[tokio::test]
async fn test_sign_in_falls_back_when_profile_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"AT1"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/v3/customer/details")
        .with_status(500)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);

    let user = api
        .sign_in(&LoginRequest::new("a@b.com", "secret"))
        .await
        .unwrap();

    assert_eq!(user, SessionUser::fallback("a@b.com"));
    assert_eq!(store.get("jwt_token").unwrap().as_deref(), Some("AT1"));
    assert_eq!(store.get("refresh_token").unwrap(), None);
    assert!(api.is_authenticated().await);
}

#[tokio::test]
async fn test_sign_in_rejected_surfaces_server_message() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"message":"The user name or password is incorrect."}"#)
        .create_async()
        .await;
    let details = server
        .mock("GET", "/api/v3/customer/details")
        .expect(0)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);

    let err = api
        .sign_in(&LoginRequest::new("a@b.com", "wrong"))
        .await
        .unwrap_err();

    match err {
        ClientError::AuthFailure { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "The user name or password is incorrect.");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(store.is_empty());
    assert_eq!(api.auth_state().await, AuthState::Unknown);
    details.assert_async().await;
}

#[tokio::test]
async fn test_legacy_login_stores_token_and_user() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/login")
        .match_header("x-api-key", API_KEY)
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"email": "a@b.com", "password": "secret"})))
        .with_status(200)
        .with_body(r#"{"token":"LEGACY1","user":{"id":"7","email":"a@b.com","name":"Ada"}}"#)
        .expect(1)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    // A leftover token must not be sent to the login endpoint
    store.set("jwt_token", "STALE").unwrap();

    let response = api
        .legacy_login(&LoginRequest::new("a@b.com", "secret"))
        .await
        .unwrap();

    assert_eq!(response.token, "LEGACY1");
    assert_eq!(store.get("jwt_token").unwrap().as_deref(), Some("LEGACY1"));
    assert_eq!(
        api.stored_user().unwrap(),
        Some(SessionUser {
            id: "7".to_string(),
            email: "a@b.com".to_string(),
            name: "Ada".to_string(),
        })
    );
    login.assert_async().await;
}

#[tokio::test]
async fn test_legacy_login_discards_previous_refresh_token() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/login")
        .with_status(200)
        .with_body(r#"{"token":"LEGACY_B","user":{"id":"8","email":"b@b.com","name":"Bea"}}"#)
        .expect(1)
        .create_async()
        .await;
    let orders = mock_orders_unauthorized(&mut server, "LEGACY_B").await;
    let token = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    // Session left behind by another account
    seed_session(&store, "AT_A", Some("RT_USER_A"));

    api.legacy_login(&LoginRequest::new("b@b.com", "secret"))
        .await
        .unwrap();
    assert_eq!(store.get("refresh_token").unwrap(), None);

    let err = api.get_orders().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Unauthorized: Access token expired");
    assert_eq!(store.get("jwt_token").unwrap().as_deref(), Some("LEGACY_B"));

    orders.assert_async().await;
    token.assert_async().await;
}

#[tokio::test]
async fn test_legacy_login_failure_is_auth_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/login")
        .with_status(403)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    let err = api
        .legacy_login(&LoginRequest::new("a@b.com", "secret"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::AuthFailure { status: 403, .. }));
    assert_eq!(err.to_string(), "Authentication failed: HTTP error! status: 403");
    assert!(store.is_empty());
}

// ==================================================================================================
// Refresh-on-401 Tests
// ==================================================================================================

#[tokio::test]
async fn test_orders_401_refresh_succeeds_and_retries_once() {
    let mut server = Server::new_async().await;

    let stale = mock_orders_unauthorized(&mut server, "AT1").await;
    let refresh = mock_refresh(&mut server, "RT1", r#"{"access_token":"AT2"}"#).await;
    let retried = server
        .mock("GET", "/orders")
        .match_header("authorization", "Bearer AT2")
        .with_status(200)
        .with_body(orders_body())
        .expect(1)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    seed_session(&store, "AT1", Some("RT1"));

    let orders = api.get_orders().await.unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, "A100");
    assert_eq!(orders[0].items, 3);
    assert_eq!(orders[1].status, "pending");

    assert_eq!(store.get("jwt_token").unwrap().as_deref(), Some("AT2"));
    assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("RT1"));

    stale.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn test_refresh_rotates_refresh_token_when_issued() {
    let mut server = Server::new_async().await;

    mock_orders_unauthorized(&mut server, "AT1").await;
    let refresh = mock_refresh(
        &mut server,
        "RT1",
        r#"{"access_token":"AT2","refresh_token":"RT2"}"#,
    )
    .await;
    server
        .mock("GET", "/orders")
        .match_header("authorization", "Bearer AT2")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    seed_session(&store, "AT1", Some("RT1"));

    assert!(api.get_orders().await.unwrap().is_empty());
    assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("RT2"));
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_orders_401_refresh_fails_returns_original_401() {
    let mut server = Server::new_async().await;

    let stale = mock_orders_unauthorized(&mut server, "AT1").await;
    let refresh = server
        .mock("POST", "/token")
        .with_status(500)
        .with_body(r#"{"message":"token service down"}"#)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/orders")
        .match_header("authorization", "Bearer AT2")
        .expect(0)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    seed_session(&store, "AT1", Some("RT1"));

    let err = api.get_orders().await.unwrap_err();

    // The refresh error is swallowed; the caller sees the original 401
    match err {
        ClientError::Unauthorized { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Access token expired");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(store.get("jwt_token").unwrap().as_deref(), Some("AT1"));

    stale.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn test_refresh_without_access_token_returns_original_401() {
    let mut server = Server::new_async().await;

    mock_orders_unauthorized(&mut server, "AT1").await;
    let refresh = mock_refresh(&mut server, "RT1", r#"{"token_type":"bearer"}"#).await;

    let (api, store) = create_test_api(&server);
    seed_session(&store, "AT1", Some("RT1"));

    let err = api.get_orders().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.is_unauthorized());
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_401_without_refresh_token_makes_no_refresh_call() {
    let mut server = Server::new_async().await;

    let stale = server
        .mock("GET", "/orders")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    seed_session(&store, "AT1", None);

    let err = api.get_orders().await.unwrap_err();
    assert_eq!(err.to_string(), "Unauthorized: HTTP error! status: 401");

    stale.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/orders")
        .match_header("authorization", "Bearer AT1")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("GET", "/api/v3/customer/details")
        .match_header("authorization", "Bearer AT1")
        .with_status(401)
        .create_async()
        .await;
    let refresh = mock_refresh(&mut server, "RT1", r#"{"access_token":"AT2"}"#).await;
    let orders = server
        .mock("GET", "/orders")
        .match_header("authorization", "Bearer AT2")
        .with_status(200)
        .with_body(orders_body())
        .expect(1)
        .create_async()
        .await;
    let details = server
        .mock("GET", "/api/v3/customer/details")
        .match_header("authorization", "Bearer AT2")
        .with_status(200)
        .with_body(customer_details_body())
        .expect(1)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    seed_session(&store, "AT1", Some("RT1"));

    let (orders_result, details_result) =
        tokio::join!(api.get_orders(), api.get_customer_details());

    assert_eq!(orders_result.unwrap().len(), 2);
    assert_eq!(details_result.unwrap().id, 1001);

    refresh.assert_async().await;
    orders.assert_async().await;
    details.assert_async().await;
}

// ==================================================================================================
// Session Tests
// ==================================================================================================

#[tokio::test]
async fn test_logout_then_no_access_token() {
    let server = Server::new_async().await;
    let (api, store) = create_test_api(&server);
    seed_session(&store, "AT1", Some("RT1"));
    store
        .set("user_data", r#"{"id":"1","email":"a@b.com","name":"Ada"}"#)
        .unwrap();

    assert!(api.check_auth_status().await.is_authenticated());

    api.logout().await.unwrap();

    assert_eq!(api.tokens().access_token().unwrap(), None);
    assert_eq!(api.tokens().refresh_token().unwrap(), None);
    assert_eq!(api.check_auth_status().await, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_requests_after_logout_carry_no_bearer() {
    let mut server = Server::new_async().await;
    let customer = server
        .mock("GET", "/customer")
        .match_header("authorization", Matcher::Missing)
        .match_header("x-api-key", API_KEY)
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    seed_session(&store, "AT1", Some("RT1"));
    api.logout().await.unwrap();

    let err = api.get_customer().await.unwrap_err();
    assert!(err.is_unauthorized());
    customer.assert_async().await;
}

#[tokio::test]
async fn test_get_customer() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/customer")
        .match_header("authorization", "Bearer AT1")
        .with_status(200)
        .with_body(
            r#"{"id":"c1","name":"Ada","email":"a@b.com","phone":"+15550100","createdAt":"2023-05-01"}"#,
        )
        .create_async()
        .await;

    let (api, store) = create_test_api(&server);
    seed_session(&store, "AT1", None);

    let customer = api.get_customer().await.unwrap();
    assert_eq!(customer.id, "c1");
    assert_eq!(customer.created_at, "2023-05-01");
}

#[tokio::test]
async fn test_session_survives_restart_with_sqlite() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"AT1","refresh_token":"RT1"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/v3/customer/details")
        .with_status(200)
        .with_body(customer_details_body())
        .create_async()
        .await;

    let dir = std::env::temp_dir().join(format!("storefront-it-{}", std::process::id()));
    let path = dir.join("session.sqlite3");
    let _ = std::fs::remove_file(&path);
    let config = Config::new(server.url(), API_KEY);

    {
        let store = Arc::new(storefront_client::SqliteStore::open(&path).unwrap());
        let api = StorefrontApi::new(&config, store).unwrap();
        api.sign_in(&LoginRequest::new("a@b.com", "secret"))
            .await
            .unwrap();
    }

    let store = Arc::new(storefront_client::SqliteStore::open(&path).unwrap());
    let api = StorefrontApi::new(&config, store).unwrap();
    assert_eq!(api.auth_state().await, AuthState::Unknown);

    let state = api.check_auth_status().await;
    assert_eq!(state.user().map(|u| u.name.as_str()), Some("Ada Lovelace"));
    assert_eq!(api.tokens().access_token().unwrap().as_deref(), Some("AT1"));

    drop(api);
    let _ = std::fs::remove_dir_all(&dir);
}
