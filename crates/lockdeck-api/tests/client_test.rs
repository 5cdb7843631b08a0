// Integration tests for `LockClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lockdeck_api::{
    Backoff, ClassTimeouts, ControlAction, Error, LockClient, NewUser, NotificationQuery,
    RetryPolicy, Role, SessionContext, SessionState, UserUpdate,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, LockClient) {
    let server = MockServer::start().await;
    let client = LockClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        SessionContext::shared(),
    )
    .with_retry(RetryPolicy::none());
    (server, client)
}

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

fn login_as(client: &LockClient, access: &str) {
    client.session().establish(secret(access), Some(secret("refresh-1")), None);
}

fn locks_body() -> serde_json::Value {
    json!({
        "status": "success",
        "data": [
            {
                "id": 1,
                "name": "Front Door",
                "location": "Lobby",
                "is_online": true,
                "status": { "is_locked": true, "battery_level": 80 }
            }
        ]
    })
}

fn jwt_expiring_at(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"7","exp":{exp}}}"#));
    format!("{header}.{payload}.c2ln")
}

fn access_token(client: &LockClient) -> Option<String> {
    client
        .session()
        .access_token()
        .map(|t| t.expose_secret().to_owned())
}

// ── Refresh and replay ──────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_refreshes_and_replays_once() {
    let (server, client) = setup().await;
    login_as(&client, "old-token");

    Mock::given(method("GET"))
        .and(path("/locks"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/locks"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locks_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "success", "data": { "token": "new-token" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let locks = client.list_locks().await.unwrap();

    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].name, "Front Door");
    assert_eq!(access_token(&client).as_deref(), Some("new-token"));
    assert_eq!(client.session().state(), SessionState::Authenticated);
}

#[tokio::test]
async fn test_concurrent_unauthorized_share_one_refresh() {
    let (server, client) = setup().await;
    login_as(&client, "old-token");

    Mock::given(method("GET"))
        .and(path("/locks"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/locks"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locks_body()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "success", "data": { "token": "new-token" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (a, b) = tokio::join!(client.list_locks(), client.list_locks());
    assert!(a.is_ok());
    assert!(b.is_ok());
}

#[tokio::test]
async fn test_refresh_failure_expires_session() {
    let (server, client) = setup().await;
    login_as(&client, "old-token");
    let generation = client.session().generation();

    Mock::given(method("GET"))
        .and(path("/locks"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "status": "error", "message": "refresh token revoked" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client.list_locks().await.unwrap_err();

    assert!(err.is_session_expired(), "got {err:?}");
    assert_eq!(client.session().state(), SessionState::Expired);
    assert!(client.session().access_token().is_none());
    assert!(client.session().refresh_token().is_none());
    assert!(client.session().generation() > generation);
}

#[tokio::test]
async fn test_second_unauthorized_is_hard_failure() {
    let (server, client) = setup().await;
    login_as(&client, "old-token");

    Mock::given(method("GET"))
        .and(path("/locks/4"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "success", "data": { "token": "new-token" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get_lock(4).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized), "got {err:?}");
}

#[tokio::test]
async fn test_missing_refresh_token_expires_session() {
    let (server, client) = setup().await;
    client.session().establish(secret("old-token"), None, None);

    Mock::given(method("GET"))
        .and(path("/locks"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.list_locks().await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(client.session().state(), SessionState::Expired);
}

// ── Local expiry ────────────────────────────────────────────────────

#[tokio::test]
async fn test_expired_token_never_reaches_network() {
    let (server, client) = setup().await;
    let expired = jwt_expiring_at(chrono::Utc::now().timestamp() - 30);
    login_as(&client, &expired);

    Mock::given(method("GET"))
        .and(path("/locks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locks_body()))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.list_locks().await.unwrap_err();

    assert!(err.is_session_expired());
    assert_eq!(client.session().state(), SessionState::Expired);
    assert!(client.session().access_token().is_none());
}

#[tokio::test]
async fn test_live_jwt_is_sent() {
    let (server, client) = setup().await;
    let live = jwt_expiring_at(chrono::Utc::now().timestamp() + 3600);
    login_as(&client, &live);

    Mock::given(method("GET"))
        .and(path("/locks"))
        .and(header("authorization", format!("Bearer {live}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(locks_body()))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.list_locks().await.unwrap().len(), 1);
}

// ── Retry and timeouts ──────────────────────────────────────────────

#[tokio::test]
async fn test_notification_server_error_is_not_retried() {
    let (server, client) = setup().await;
    let client = client.with_retry(RetryPolicy::default());
    login_as(&client, "token");

    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .list_notifications(NotificationQuery::unread())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_notification_timeout_is_not_retried() {
    let (server, client) = setup().await;
    let client = client
        .with_retry(RetryPolicy {
            max_retries: 2,
            backoff: Backoff::Fixed(Duration::ZERO),
        })
        .with_timeouts(ClassTimeouts {
            baseline: Duration::from_secs(2),
            notification: Duration::from_millis(50),
        });
    login_as(&client, "token");

    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "success", "data": { "notifications": [] } }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .list_notifications(NotificationQuery::unread())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }), "got {err:?}");
}

#[tokio::test]
async fn test_device_query_timeout_is_retried() {
    let (server, client) = setup().await;
    let client = client
        .with_retry(RetryPolicy {
            max_retries: 2,
            backoff: Backoff::Fixed(Duration::ZERO),
        })
        .with_timeouts(ClassTimeouts {
            baseline: Duration::from_millis(100),
            notification: Duration::from_millis(80),
        });
    login_as(&client, "token");

    Mock::given(method("GET"))
        .and(path("/locks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(locks_body())
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/locks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locks_body()))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.list_locks().await.unwrap().len(), 1);
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_installs_tokens() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "username": "admin", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "token": "issued",
                "refresh_token": "refresh-9",
                "user": { "id": 1, "username": "admin", "role": "admin" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = client.login("admin", &secret("hunter2")).await.unwrap();

    assert_eq!(user.role.as_deref(), Some("admin"));
    assert_eq!(access_token(&client).as_deref(), Some("issued"));
    assert_eq!(
        client
            .session()
            .refresh_token()
            .map(|t| t.expose_secret().to_owned())
            .as_deref(),
        Some("refresh-9")
    );
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let (server, client) = setup().await;
    login_as(&client, "existing");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "status": "error", "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.login("admin", &secret("wrong")).await.unwrap_err();

    assert!(
        matches!(err, Error::Authentication { ref message } if message == "Invalid credentials"),
        "got {err:?}"
    );
    assert_eq!(access_token(&client).as_deref(), Some("existing"));
    assert_eq!(client.session().state(), SessionState::Authenticated);
}

#[tokio::test]
async fn test_logout_clears_session_even_on_failure() {
    let (server, client) = setup().await;
    login_as(&client, "token");

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.logout().await.is_err());
    assert_eq!(client.session().state(), SessionState::Anonymous);
    assert!(client.session().access_token().is_none());
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_control_lock_returns_ack() {
    let (server, client) = setup().await;
    login_as(&client, "token");

    Mock::given(method("POST"))
        .and(path("/locks/3/control"))
        .and(body_json(json!({ "action": "unlock" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Unlock command sent"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client.control_lock(3, ControlAction::Unlock).await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("Unlock command sent"));
}

#[tokio::test]
async fn test_control_lock_error_envelope() {
    let (server, client) = setup().await;
    login_as(&client, "token");

    Mock::given(method("POST"))
        .and(path("/locks/3/control"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "Device is offline"
        })))
        .mount(&server)
        .await;

    let err = client.control_lock(3, ControlAction::Lock).await.unwrap_err();
    assert!(matches!(err, Error::Rejected { ref message } if message == "Device is offline"));
}

// ── Users ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_user_crud_round() {
    let (server, client) = setup().await;
    login_as(&client, "token");

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(header("authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [
                { "id": 1, "username": "admin", "role": "admin", "name": "System Administrator" },
                { "id": 2, "username": "guest", "role": "guest" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_json(json!({
            "username": "manager2",
            "role": "manager",
            "email": "m2@example.com",
            "password": "s3cret"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "status": "success",
            "data": { "id": 9, "username": "manager2", "role": "manager", "email": "m2@example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users/9"))
        .and(body_json(json!({ "role": "guest" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "id": 9, "username": "manager2", "role": "guest" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/users/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    let users = client.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users[0].has_role(Role::Manager));
    assert_eq!(users[1].known_role(), Some(Role::Guest));

    let new_user = NewUser {
        username: "manager2".into(),
        role: Role::Manager,
        email: Some("m2@example.com".into()),
        name: None,
    };
    let created = client.create_user(&new_user, &secret("s3cret")).await.unwrap();
    assert_eq!(created.id, Some(9));

    let update = UserUpdate {
        role: Some(Role::Guest),
        ..UserUpdate::default()
    };
    let updated = client.update_user(9, &update).await.unwrap();
    assert_eq!(updated.known_role(), Some(Role::Guest));

    client.delete_user(9).await.unwrap();
}

#[tokio::test]
async fn test_users_forbidden_for_non_admin() {
    let (server, client) = setup().await;
    login_as(&client, "token");

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": "error",
            "message": "Admin access required"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.list_users().await.unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }), "got {err:?}");
    assert_eq!(client.session().state(), SessionState::Authenticated);
}

// ── Notifications ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_unread_notifications_query() {
    let (server, client) = setup().await;
    login_as(&client, "token");

    Mock::given(method("GET"))
        .and(path("/notifications"))
        .and(query_param("unread_only", "true"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "notifications": [
                    { "id": 5, "type": "low_battery", "message": "Battery at 12%", "is_read": false }
                ],
                "unread_count": 1
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client
        .list_notifications(NotificationQuery::unread())
        .await
        .unwrap();
    assert_eq!(page.unread_count, 1);
    assert_eq!(page.notifications[0].kind, "low_battery");
}

#[tokio::test]
async fn test_notification_mutations() {
    let (server, client) = setup().await;
    login_as(&client, "token");

    Mock::given(method("PUT"))
        .and(path("/notifications/5/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/notifications/read-all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/notifications/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.mark_notification_read(5).await.unwrap();
    client.mark_all_notifications_read().await.unwrap();
    client.delete_notification(5).await.unwrap();
}
