use super::*;
use crate::net::transport::MockTransport;
use crate::util::clock::ManualClock;
use futures::executor::block_on;

const TOKEN_URL: &str = "http://localhost:8090/realms/elearning/protocol/openid-connect/token";
const USERINFO_URL: &str = "http://localhost:8090/realms/elearning/protocol/openid-connect/userinfo";

fn oidc(transport: &MockTransport) -> OidcProvider {
    OidcProvider::new(IdentityProviderConfig::default(), Rc::new(transport.clone()))
}

fn grant_json(token: &str) -> serde_json::Value {
    json!({
        "access_token": token,
        "refresh_token": "r1",
        "expires_in": 300,
        "token_type": "Bearer",
    })
}

// =============================================================
// OidcProvider
// =============================================================

#[test]
fn password_grant_posts_form_to_token_endpoint() {
    let transport = MockTransport::new();
    transport.respond(TOKEN_URL, HttpResponse::json(200, &grant_json("a1")));

    let grant = block_on(oidc(&transport).password_grant("ana", "p@ss")).unwrap();
    assert_eq!(grant.access_token, "a1");
    assert_eq!(grant.refresh_token.as_deref(), Some("r1"));
    assert_eq!(grant.expires_in, Some(300));

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, crate::net::transport::Method::Post);
    let body = sent[0].body.as_deref().unwrap();
    assert!(body.starts_with("grant_type=password&client_id=frontend&username=ana&password=p%40ss"));
    assert!(body.ends_with("scope=openid%20profile%20email"));
}

#[test]
fn refresh_grant_sends_refresh_token() {
    let transport = MockTransport::new();
    transport.respond(TOKEN_URL, HttpResponse::json(200, &grant_json("a2")));

    block_on(oidc(&transport).refresh_grant("r-old")).unwrap();
    let body = transport.requests()[0].body.clone().unwrap();
    assert_eq!(body, "grant_type=refresh_token&client_id=frontend&refresh_token=r-old");
}

#[test]
fn rejected_password_maps_to_credentials_invalid() {
    let transport = MockTransport::new();
    transport.respond(
        TOKEN_URL,
        HttpResponse::json(401, &json!({ "error": "invalid_grant", "error_description": "Invalid user credentials" })),
    );

    let err = block_on(oidc(&transport).password_grant("ana", "nope")).unwrap_err();
    assert_eq!(err, ClientError::CredentialsInvalid("Invalid user credentials".to_owned()));
}

#[test]
fn rejected_password_without_body_has_empty_detail() {
    let transport = MockTransport::new();
    transport.respond(TOKEN_URL, HttpResponse::new(400, "<html>bad request</html>"));

    let err = block_on(oidc(&transport).password_grant("ana", "nope")).unwrap_err();
    assert_eq!(err, ClientError::CredentialsInvalid(String::new()));
    assert_eq!(err.user_message(), "Invalid username or password.");
}

#[test]
fn rejected_refresh_maps_to_session_expired() {
    let transport = MockTransport::new();
    transport.respond(TOKEN_URL, HttpResponse::json(400, &json!({ "error": "invalid_grant" })));

    let err = block_on(oidc(&transport).refresh_grant("r-old")).unwrap_err();
    assert_eq!(err, ClientError::SessionExpired);
}

#[test]
fn provider_outage_maps_to_status() {
    let transport = MockTransport::new();
    transport.respond(TOKEN_URL, HttpResponse::new(503, ""));

    let err = block_on(oidc(&transport).password_grant("ana", "x")).unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 503, .. }));
    assert!(err.is_retryable());
}

#[test]
fn unparseable_grant_is_malformed() {
    let transport = MockTransport::new();
    transport.respond(TOKEN_URL, HttpResponse::new(200, "{\"token\":\"x\"}"));

    let err = block_on(oidc(&transport).password_grant("ana", "x")).unwrap_err();
    assert!(matches!(err, ClientError::MalformedServerResponse(_)));
}

#[test]
fn empty_access_token_is_malformed() {
    let transport = MockTransport::new();
    transport.respond(TOKEN_URL, HttpResponse::json(200, &grant_json("  ")));

    let err = block_on(oidc(&transport).password_grant("ana", "x")).unwrap_err();
    assert!(matches!(err, ClientError::MalformedServerResponse(_)));
}

#[test]
fn no_response_maps_to_network_unavailable() {
    let transport = MockTransport::new();
    transport.fail(TOKEN_URL, "connection refused");

    let err = block_on(oidc(&transport).password_grant("ana", "x")).unwrap_err();
    assert_eq!(err, ClientError::NetworkUnavailable("connection refused".to_owned()));
}

#[test]
fn user_info_sends_bearer_and_builds_profile() {
    let transport = MockTransport::new();
    transport.respond(
        USERINFO_URL,
        HttpResponse::json(
            200,
            &json!({
                "sub": "u-1",
                "preferred_username": "ana",
                "email": "ana@example.com",
                "given_name": "Ana",
                "family_name": "Lima",
                "realm_access": { "roles": ["student"] },
            }),
        ),
    );

    let profile = block_on(oidc(&transport).user_info("tok")).unwrap();
    assert_eq!(profile.id, "u-1");
    assert_eq!(profile.display_name(), "Ana Lima");
    assert!(profile.roles.contains("student"));
    assert_eq!(transport.requests()[0].header_value("Authorization"), Some("Bearer tok"));
}

#[test]
fn user_info_status_mapping() {
    let cases = [
        (401, ClientError::SessionExpired),
        (403, ClientError::Forbidden),
        (500, ClientError::Status { status: 500, message: "user-info request failed: 500".to_owned() }),
    ];
    for (status, expected) in cases {
        let transport = MockTransport::new();
        transport.respond(USERINFO_URL, HttpResponse::new(status, ""));
        let err = block_on(oidc(&transport).user_info("tok")).unwrap_err();
        assert_eq!(err, expected, "status {status}");
    }
}

#[test]
fn user_info_without_sub_is_malformed() {
    let transport = MockTransport::new();
    transport.respond(USERINFO_URL, HttpResponse::json(200, &json!({ "email": "x@y" })));

    let err = block_on(oidc(&transport).user_info("tok")).unwrap_err();
    assert!(matches!(err, ClientError::MalformedServerResponse(_)));
}

// =============================================================
// MockProvider
// =============================================================

fn mock_at(now: i64) -> (MockProvider, ManualClock) {
    let clock = ManualClock::new(now);
    (MockProvider::new(Rc::new(clock.clone())), clock)
}

#[test]
fn mock_without_accounts_accepts_anyone() {
    let (provider, _) = mock_at(1_000);
    let grant = block_on(provider.password_grant("guest", "anything")).unwrap();

    assert_eq!(grant.expires_in, Some(MOCK_TOKEN_TTL_SECS));
    assert_eq!(jwt::expires_at(&grant.access_token), Some(1_000 + MOCK_TOKEN_TTL_SECS));
    let claims = jwt::decode_claims(&grant.access_token).unwrap();
    assert!(claims.roles().contains("user"));
    assert_eq!(provider.password_calls(), 1);
}

#[test]
fn mock_with_accounts_checks_password() {
    let (provider, _) = mock_at(1_000);
    provider.add_account("ana", "secret", &["student"]);

    let err = block_on(provider.password_grant("ana", "wrong")).unwrap_err();
    assert!(matches!(err, ClientError::CredentialsInvalid(_)));
    let err = block_on(provider.password_grant("bob", "secret")).unwrap_err();
    assert!(matches!(err, ClientError::CredentialsInvalid(_)));

    let grant = block_on(provider.password_grant("ana", "secret")).unwrap();
    let profile = block_on(provider.user_info(&grant.access_token)).unwrap();
    assert_eq!(profile.username, "ana");
    assert!(profile.roles.contains("student"));
}

#[test]
fn mock_refresh_issues_new_tokens() {
    let (provider, clock) = mock_at(1_000);
    let first = block_on(provider.password_grant("ana", "x")).unwrap();
    clock.advance(100);

    let second = block_on(provider.refresh_grant(first.refresh_token.as_deref().unwrap())).unwrap();
    assert_ne!(first.access_token, second.access_token);
    assert_ne!(first.refresh_token, second.refresh_token);
    assert_eq!(jwt::expires_at(&second.access_token), Some(1_100 + MOCK_TOKEN_TTL_SECS));
    assert_eq!(provider.refresh_calls(), 1);
}

#[test]
fn mock_refresh_retires_used_tokens() {
    let (provider, _) = mock_at(1_000);
    let first = block_on(provider.password_grant("ana", "x")).unwrap();
    let used = first.refresh_token.unwrap();
    assert_eq!(provider.live_tokens(), 2);

    let second = block_on(provider.refresh_grant(&used)).unwrap();
    block_on(provider.refresh_grant(second.refresh_token.as_deref().unwrap())).unwrap();
    assert_eq!(provider.live_tokens(), 2);

    assert_eq!(block_on(provider.refresh_grant(&used)).unwrap_err(), ClientError::SessionExpired);
    assert_eq!(block_on(provider.user_info(&first.access_token)).unwrap_err(), ClientError::SessionExpired);
}

#[test]
fn mock_refresh_with_unknown_token_expires_session() {
    let (provider, _) = mock_at(1_000);
    let err = block_on(provider.refresh_grant("forged")).unwrap_err();
    assert_eq!(err, ClientError::SessionExpired);
}

#[test]
fn mock_user_info_rejects_expired_token() {
    let (provider, clock) = mock_at(1_000);
    provider.set_token_ttl(60);
    let grant = block_on(provider.password_grant("ana", "x")).unwrap();
    clock.advance(60);

    let err = block_on(provider.user_info(&grant.access_token)).unwrap_err();
    assert_eq!(err, ClientError::SessionExpired);
    assert_eq!(provider.user_info_calls(), 1);
}

#[test]
fn mock_scripted_failure_applies_once() {
    let (provider, _) = mock_at(1_000);
    provider.fail_next(ClientError::NetworkUnavailable("down".to_owned()));

    let err = block_on(provider.password_grant("ana", "x")).unwrap_err();
    assert_eq!(err, ClientError::NetworkUnavailable("down".to_owned()));
    assert!(block_on(provider.password_grant("ana", "x")).is_ok());
}

#[test]
fn mock_latency_still_completes() {
    let (provider, _) = mock_at(1_000);
    provider.set_latency(3);
    assert!(block_on(provider.password_grant("ana", "x")).is_ok());
}
