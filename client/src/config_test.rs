use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_when_nothing_is_set() {
    let cfg = ClientConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg.backend, AuthBackend::Oidc);
    assert_eq!(cfg.idp, IdentityProviderConfig::default());
    assert_eq!(cfg.services, ServiceEndpoints::default());
    assert_eq!(cfg.refresh_leeway_secs, DEFAULT_REFRESH_LEEWAY_SECS);
}

#[test]
fn endpoints_follow_realm_layout() {
    let cfg = ClientConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(
        cfg.idp.token_endpoint(),
        "http://localhost:8090/realms/elearning/protocol/openid-connect/token"
    );
    assert_eq!(
        cfg.idp.userinfo_endpoint(),
        "http://localhost:8090/realms/elearning/protocol/openid-connect/userinfo"
    );
}

#[test]
fn overrides_are_trimmed() {
    let cfg = ClientConfig::from_lookup(lookup(&[
        ("COURSEHUB_AUTH_BACKEND", "mock"),
        ("COURSEHUB_IDP_URL", "https://id.example.test/"),
        ("COURSEHUB_IDP_REALM", "school"),
        ("COURSEHUB_COURSE_SERVICE_URL", " https://courses.example.test/// "),
        ("COURSEHUB_REFRESH_LEEWAY_SECS", "30"),
    ]))
    .unwrap();
    assert_eq!(cfg.backend, AuthBackend::Mock);
    assert_eq!(cfg.idp.base_url, "https://id.example.test");
    assert_eq!(cfg.idp.realm, "school");
    assert_eq!(cfg.services.courses, "https://courses.example.test");
    assert_eq!(cfg.refresh_leeway_secs, 30);
}

#[test]
fn blank_values_use_defaults() {
    let cfg = ClientConfig::from_lookup(lookup(&[("COURSEHUB_IDP_CLIENT_ID", "  ")])).unwrap();
    assert_eq!(cfg.idp.client_id, DEFAULT_IDP_CLIENT_ID);
}

#[test]
fn unknown_backend_is_rejected() {
    let err = ClientConfig::from_lookup(lookup(&[("COURSEHUB_AUTH_BACKEND", "ldap")])).unwrap_err();
    assert!(err.to_string().contains("ldap"));
}

#[test]
fn invalid_leeway_is_rejected() {
    assert!(ClientConfig::from_lookup(lookup(&[("COURSEHUB_REFRESH_LEEWAY_SECS", "soon")])).is_err());
    assert!(ClientConfig::from_lookup(lookup(&[("COURSEHUB_REFRESH_LEEWAY_SECS", "-1")])).is_err());
}

#[test]
fn every_key_is_known_to_build_env() {
    for key in CONFIG_KEYS {
        // Unset at build time in tests; the point is that the match covers it.
        let _ = build_env(key);
    }
    assert!(build_env("UNRELATED").is_none());
}
