#![cfg(feature = "host")]

use serde_json::json;
use sso_broker::checksum::{attach_checksum, session_id};
use sso_broker::host::{
    AttachRequest, HostAuthority, HostConfig, ManualClock, MemoryClientRegistry,
    MemoryHostSessions, MemorySessionStore, MemoryUserRegistry, NO_SESSION_DATA_MESSAGE,
};
use sso_broker::{Client, DerivedSessionId, HostSessionId};
use time::Duration;

type Authority =
    HostAuthority<MemorySessionStore, MemoryHostSessions, MemoryClientRegistry, MemoryUserRegistry>;

struct Fixture {
    authority: Authority,
    client: Client,
    clock: ManualClock,
}

fn fixture(config: HostConfig, authorize: bool) -> Fixture {
    let clock = ManualClock::default();

    let clients = MemoryClientRegistry::new();
    let client = clients.register("app1");

    let users = MemoryUserRegistry::new();
    users
        .add_user(42, "Alice", "alice@example.com", "correct horse")
        .unwrap();
    if authorize {
        clients.authorize(&client, "42");
    }

    let authority = HostAuthority::new(
        config,
        MemorySessionStore::with_clock(clock.clone()),
        MemoryHostSessions::with_clock(clock.clone()),
        clients,
        users,
    );

    Fixture {
        authority,
        client,
        clock,
    }
}

impl Fixture {
    fn attach_request(&self, token: &str) -> AttachRequest {
        AttachRequest::new(
            &self.client.name,
            token,
            attach_checksum(token, &self.client.secret),
        )
        .with_return_url("https://app1.example.com/page")
    }

    fn session_id(&self, token: &str) -> DerivedSessionId {
        session_id(&self.client.name, token, &self.client.secret)
    }

    /// Attach `token` and return the Host session the browser received.
    async fn attach(&self, token: &str, existing: Option<&HostSessionId>) -> HostSessionId {
        let result = self.authority.attach(self.attach_request(token), existing).await;
        let redirect = result.outcome.redirect().unwrap();
        assert_eq!(redirect.sso_error(), None);
        assert_eq!(redirect.location(), "https://app1.example.com/page");
        result.host_session.unwrap()
    }
}

fn error_of(outcome: &sso_broker::host::Outcome) -> String {
    outcome.json().unwrap()["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn attach_rejects_bad_requests_without_binding() {
    let f = fixture(HostConfig::new(), true);
    let token = "tok1";

    let mut no_token = f.attach_request(token);
    no_token.token = None;
    let mut bad_checksum = f.attach_request(token);
    bad_checksum.checksum = Some("deadbeef".into());

    let cases = [
        (AttachRequest::default(), "No client id specified."),
        (no_token, "No token specified."),
        (bad_checksum, "Invalid checksum."),
        (
            AttachRequest::new("ghost", token, attach_checksum(token, "whatever")),
            "Provided client does not exist.",
        ),
    ];

    for (request, expected) in cases {
        let result = f.authority.attach(request, None).await;
        assert!(result.host_session.is_none());
        let redirect = result.outcome.redirect().unwrap();
        assert_eq!(redirect.sso_error(), Some(expected));
        assert!(redirect.location().contains("sso_error="));
    }

    assert!(f.authority.binding(&f.session_id(token)).await.unwrap().is_none());
}

#[tokio::test]
async fn binding_expires_after_ttl() {
    let f = fixture(HostConfig::new(), true);
    let host_session = f.attach("tok1", None).await;

    let id = f.session_id("tok1");
    assert_eq!(f.authority.binding(&id).await.unwrap(), Some(host_session));

    f.clock.advance(Duration::minutes(61));
    assert_eq!(f.authority.binding(&id).await.unwrap(), None);

    let outcome = f.authority.user_info(Some(&id)).await;
    assert_eq!(error_of(&outcome), NO_SESSION_DATA_MESSAGE);
}

#[tokio::test]
async fn login_without_binding_reports_no_session_data() {
    let f = fixture(HostConfig::new(), true);
    let id = f.session_id("never-attached");

    let outcome = f
        .authority
        .login(Some(&id), Some("alice@example.com"), Some("correct horse"))
        .await;
    assert_eq!(
        outcome.json().unwrap(),
        &json!({ "error": "There is no saved session data associated with the client session id." })
    );
}

#[tokio::test]
async fn missing_bearer_is_rejected() {
    let f = fixture(HostConfig::new(), true);
    let outcome = f.authority.user_info(None).await;
    assert_eq!(error_of(&outcome), "Missing session key from client.");
}

#[tokio::test]
async fn login_then_user_info_return_same_projection() {
    let f = fixture(HostConfig::new(), true);
    f.attach("tok1", None).await;
    let id = f.session_id("tok1");

    let login = f
        .authority
        .login(Some(&id), Some("alice@example.com"), Some("correct horse"))
        .await;
    assert_eq!(login.json().unwrap(), &json!({ "data": { "id": 42 } }));

    let info = f.authority.check_user_application_auth(Some(&id)).await;
    assert_eq!(info.json(), login.json());
}

#[tokio::test]
async fn wrong_password_leaves_session_anonymous() {
    let f = fixture(HostConfig::new(), true);
    f.attach("tok1", None).await;
    let id = f.session_id("tok1");

    let outcome = f
        .authority
        .login(Some(&id), Some("alice@example.com"), Some("wrong"))
        .await;
    assert_eq!(error_of(&outcome), "User authentication failed.");

    let outcome = f
        .authority
        .login(Some(&id), Some("alice@example.com"), None)
        .await;
    assert_eq!(error_of(&outcome), "No username and/or password provided.");

    let info = f.authority.user_info(Some(&id)).await;
    assert!(error_of(&info).starts_with("User not authenticated."));
}

#[tokio::test]
async fn logout_clears_user_for_every_attached_client() {
    let f = fixture(HostConfig::new(), true);
    let host_session = f.attach("tok1", None).await;
    // A second token attached to the same browser session.
    let same = f.attach("tok2", Some(&host_session)).await;
    assert_eq!(same, host_session);

    let first = f.session_id("tok1");
    let second = f.session_id("tok2");

    f.authority
        .login(Some(&first), Some("alice@example.com"), Some("correct horse"))
        .await;
    assert_eq!(
        f.authority.user_info(Some(&second)).await.json().unwrap(),
        &json!({ "data": { "id": 42 } })
    );

    let outcome = f.authority.logout(Some(&second)).await;
    assert_eq!(
        outcome.json().unwrap(),
        &json!({ "success": "User has been successfully logged out." })
    );

    let info = f.authority.user_info(Some(&first)).await;
    assert_eq!(
        error_of(&info),
        format!("User not authenticated. Session ID: {first}")
    );
}

#[tokio::test]
async fn tampered_session_id_is_rejected() {
    let f = fixture(HostConfig::new(), true);
    f.attach("tok1", None).await;

    let forged = session_id(&f.client.name, "tok1", "not-the-secret");
    let outcome = f.authority.user_info(Some(&forged)).await;
    // The binding lookup uses the full id, so a forged hash finds nothing.
    assert_eq!(error_of(&outcome), NO_SESSION_DATA_MESSAGE);
}

#[tokio::test]
async fn application_authorization_is_enforced() {
    let f = fixture(HostConfig::new(), false);
    f.attach("tok1", None).await;
    let id = f.session_id("tok1");

    f.authority
        .login(Some(&id), Some("alice@example.com"), Some("correct horse"))
        .await;

    let gated = f.authority.check_user_application_auth(Some(&id)).await;
    assert_eq!(
        error_of(&gated),
        "User authorization failed with application."
    );

    let ungated = f.authority.user_info(Some(&id)).await;
    assert_eq!(ungated.json().unwrap(), &json!({ "data": { "id": 42 } }));
}

#[tokio::test]
async fn user_fields_control_projection() {
    let config = HostConfig::new().with_user_fields([("id", "id"), ("display_name", "name")]);
    let f = fixture(config, true);
    f.attach("tok1", None).await;
    let id = f.session_id("tok1");

    let login = f
        .authority
        .login(Some(&id), Some("alice@example.com"), Some("correct horse"))
        .await;
    assert_eq!(
        login.json().unwrap(),
        &json!({ "data": { "id": 42, "display_name": "Alice" } })
    );
}
