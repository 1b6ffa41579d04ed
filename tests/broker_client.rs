#![cfg(feature = "broker")]

use std::sync::Arc;

use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, Key};
use serde_json::json;
use sso_broker::broker::{
    BrokerAgent, BrokerClient, BrokerConfig, FailureKind, HostReply, UserInfoReply, Visit,
};
use sso_broker::{Error, Token};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, BrokerClient) {
    let server = MockServer::start().await;
    let config = BrokerConfig::new(&server.uri(), "app1", "s3cret").unwrap();
    let client = BrokerClient::new(&config).unwrap();
    (server, client)
}

#[tokio::test]
async fn test_user_info_signed_with_session_id() {
    let (server, client) = setup().await;
    let token = Token::from("tok1".to_string());
    let bearer = format!("Bearer {}", client.session_id(&token));

    Mock::given(method("GET"))
        .and(path("/api/sso/userInfo"))
        .and(header("Authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 42 } })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client.user_info(&token).await.unwrap();
    let HostReply::User(info) = reply else {
        panic!("expected user, got {reply:?}");
    };
    assert_eq!(info.id(), &json!(42));
}

#[tokio::test]
async fn test_login_posts_credentials() {
    let (server, client) = setup().await;
    let token = Token::from("tok1".to_string());

    Mock::given(method("POST"))
        .and(path("/api/sso/login"))
        .and(body_string_contains("username=alice%40example.com"))
        .and(body_string_contains("password=pw"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "User authentication failed." })),
        )
        .mount(&server)
        .await;

    let reply = client.login(&token, "alice@example.com", "pw").await.unwrap();
    let HostReply::Failure(failure) = reply else {
        panic!("expected failure, got {reply:?}");
    };
    assert_eq!(failure.message(), "User authentication failed.");
    assert_eq!(failure.kind(), FailureKind::Other);
}

#[tokio::test]
async fn test_stale_session_is_classified() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sso/userInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "There is no saved session data associated with the client session id."
        })))
        .mount(&server)
        .await;

    let reply = client.user_info(&Token::from("tok1".to_string())).await.unwrap();
    let HostReply::Failure(failure) = reply else {
        panic!("expected failure, got {reply:?}");
    };
    assert!(failure.is_stale_session());
}

#[tokio::test]
async fn test_logout_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/sso/logout"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": "User has been successfully logged out." })),
        )
        .mount(&server)
        .await;

    let reply = client.logout(&Token::from("tok1".to_string())).await.unwrap();
    assert!(matches!(reply, HostReply::Success(_)));
}

#[tokio::test]
async fn test_server_error_maps_to_host_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sso/userInfo"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client
        .user_info(&Token::from("tok1".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Host { operation: "userInfo", status: 500, ref detail } if detail == "boom"
    ));
}

#[tokio::test]
async fn test_non_protocol_body_is_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sso/userInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "name": "x" } })))
        .mount(&server)
        .await;

    let err = client
        .user_info(&Token::from("tok1".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse(_)));
}

/// An agent for a visitor that already carries the token `tok1`.
fn ready_agent(client: BrokerClient) -> BrokerAgent {
    let jar = PrivateCookieJar::new(Key::generate())
        .add(Cookie::new(client.cookie_name().to_string(), "tok1"));
    match BrokerAgent::start(Arc::new(client), jar, "http://app1.test/") {
        Visit::Ready(agent) => agent,
        Visit::Attach(redirect) => panic!("unexpected attach: {redirect:?}"),
    }
}

#[tokio::test]
async fn test_agent_caches_user_info_but_not_login() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sso/userInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 42 } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/sso/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 42 } })))
        .expect(2)
        .mount(&server)
        .await;

    let mut agent = ready_agent(client);
    assert_eq!(agent.token().as_str(), "tok1");

    for _ in 0..2 {
        let reply = agent.get_user_info().await.unwrap();
        assert!(matches!(reply, UserInfoReply::Authenticated(ref info) if info.id() == &json!(42)));
    }

    assert!(agent.login("alice@example.com", "pw").await.unwrap());
    assert!(agent.login("alice@example.com", "pw").await.unwrap());
    assert!(agent.last_failure().is_none());
}

#[tokio::test]
async fn test_agent_records_refused_login() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/sso/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "User authentication failed." })),
        )
        .mount(&server)
        .await;

    let mut agent = ready_agent(client);
    assert!(!agent.login("alice@example.com", "bad").await.unwrap());
    assert_eq!(
        agent.last_failure().map(|f| f.message()),
        Some("User authentication failed.")
    );
}
