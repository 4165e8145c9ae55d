use super::*;
use base64::Engine as _;
use serde_json::json;

fn token_with(claims: &serde_json::Value) -> String {
    encode_unsigned(claims)
}

#[test]
fn decodes_expiry_and_subject() {
    let token = token_with(&json!({ "sub": "u-1", "exp": 2_000, "preferred_username": "alice" }));
    let claims = decode_claims(&token).unwrap();
    assert_eq!(claims.sub.as_deref(), Some("u-1"));
    assert_eq!(claims.exp, Some(2_000));
    assert_eq!(claims.preferred_username.as_deref(), Some("alice"));
}

#[test]
fn tolerates_padded_payload() {
    let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":77}"#);
    let token = format!("h.{payload}.sig");
    assert_eq!(expires_at(&token), Some(77));
}

#[test]
fn expired_at_and_after_exp() {
    let token = token_with(&json!({ "exp": 1_000 }));
    assert!(!is_expired(&token, 999));
    assert!(is_expired(&token, 1_000));
    assert!(is_expired(&token, 5_000));
}

#[test]
fn missing_exp_counts_as_expired() {
    let token = token_with(&json!({ "sub": "u-1" }));
    assert!(is_expired(&token, 0));
}

#[test]
fn malformed_tokens_count_as_expired() {
    for token in ["", "T", "a.b", "a.b.c.d", "a..c", "a.!!!.c", "a.bm90LWpzb24.c"] {
        assert!(decode_claims(token).is_none(), "decoded {token:?}");
        assert!(is_expired(token, 0), "treated {token:?} as valid");
    }
}

#[test]
fn non_integer_exp_is_malformed() {
    let token = token_with(&json!({ "exp": "tomorrow" }));
    assert!(decode_claims(&token).is_none());
    assert!(is_expired(&token, 0));
}

#[test]
fn roles_merge_realm_and_single_role_claim() {
    let token = token_with(&json!({
        "exp": 10,
        "realm_access": { "roles": ["student", "user"] },
        "role": "instructor"
    }));
    let roles = decode_claims(&token).unwrap().roles();
    let expected: BTreeSet<String> = ["instructor", "student", "user"].iter().map(|r| (*r).to_owned()).collect();
    assert_eq!(roles, expected);
}

#[test]
fn roles_empty_without_claims() {
    assert!(AccessClaims::default().roles().is_empty());
}
