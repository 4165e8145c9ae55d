use super::*;
use crate::auth::jwt;
use crate::state::session::UserProfile;
use serde_json::json;

const NOW: i64 = 1_700_000_000;

fn token(exp: i64, roles: &[&str]) -> String {
    jwt::encode_unsigned(&json!({ "sub": "u-1", "exp": exp, "realm_access": { "roles": roles } }))
}

fn session_with(exp: i64, roles: &[&str]) -> Session {
    Session {
        access_token: Some(token(exp, &[])),
        refresh_token: Some("r".to_owned()),
        expires_at: Some(exp),
        user: Some(UserProfile {
            id: "u-1".to_owned(),
            username: "ana".to_owned(),
            roles: roles.iter().map(|r| (*r).to_owned()).collect(),
            ..UserProfile::default()
        }),
    }
}

// =============================================================
// classify
// =============================================================

#[test]
fn empty_role_set_means_authenticated() {
    assert_eq!(RouteAccess::roles(Vec::<String>::new()), RouteAccess::Authenticated);
    assert!(RouteAccess::roles(["admin"]).requires_authentication());
}

#[test]
fn longest_segment_prefix_wins() {
    let guard = SessionGuard::default()
        .route("/docs", RouteAccess::Public)
        .route("/docs/internal", RouteAccess::roles(["staff"]));

    assert_eq!(guard.classify("/docs/intro"), &RouteAccess::Public);
    assert_eq!(guard.classify("/docs/internal/notes"), &RouteAccess::roles(["staff"]));
    assert_eq!(guard.classify("/docsearch"), &RouteAccess::Authenticated);
}

#[test]
fn query_fragment_and_trailing_slash_are_ignored() {
    let guard = SessionGuard::coursehub();
    assert_eq!(guard.classify("/courses/?page=2#top"), &RouteAccess::Public);
    assert_eq!(guard.classify("/admin/users?x=1"), &RouteAccess::roles(["admin"]));
}

#[test]
fn root_is_public_but_not_a_catch_all() {
    let guard = SessionGuard::coursehub();
    assert_eq!(guard.classify("/"), &RouteAccess::Public);
    assert_eq!(guard.classify("/dashboard"), &RouteAccess::Authenticated);
    assert_eq!(guard.classify("/profile"), &RouteAccess::Authenticated);
}

#[test]
fn login_path_is_always_public() {
    let guard = SessionGuard::coursehub().with_default(RouteAccess::roles(["admin"]));
    assert_eq!(guard.classify("/login?from=%2Fadmin"), &RouteAccess::Public);
}

#[test]
fn later_route_replaces_earlier_one() {
    let guard = SessionGuard::coursehub().route("/courses", RouteAccess::Authenticated);
    assert_eq!(guard.classify("/courses/1"), &RouteAccess::Authenticated);
}

// =============================================================
// authorize
// =============================================================

#[test]
fn public_paths_always_allow() {
    let guard = SessionGuard::coursehub();
    let anonymous = Session::default();
    for path in ["/", "/login", "/register", "/forgot-password", "/reset-password", "/courses/7"] {
        assert_eq!(guard.authorize(path, &anonymous, NOW), AccessDecision::allow(), "{path}");
    }
}

#[test]
fn anonymous_user_is_sent_to_login_with_return_path() {
    let decision = SessionGuard::coursehub().authorize("/student/progress", &Session::default(), NOW);
    assert!(!decision.allow);
    assert_eq!(decision.redirect_to.as_deref(), Some("/login?from=%2Fstudent%2Fprogress"));
}

#[test]
fn expired_tokens_are_denied_on_every_protected_path() {
    let guard = SessionGuard::coursehub();
    for exp in [NOW - 3600, NOW - 1, NOW] {
        let session = session_with(exp, &["admin"]);
        for path in ["/dashboard", "/profile", "/admin", "/instructor/courses", "/student"] {
            let decision = guard.authorize(path, &session, NOW);
            assert!(!decision.allow, "{path} exp={exp}");
            assert!(decision.redirect_to.as_deref().is_some_and(|r| r.starts_with("/login")), "{path}");
        }
    }
}

#[test]
fn malformed_token_is_never_valid() {
    let session = Session { access_token: Some("not-a-jwt".to_owned()), ..session_with(NOW + 60, &["admin"]) };
    let decision = SessionGuard::coursehub().authorize("/dashboard", &session, NOW);
    assert!(!decision.allow);
}

#[test]
fn valid_token_allows_authenticated_path() {
    let decision = SessionGuard::coursehub().authorize("/dashboard", &session_with(NOW + 60, &[]), NOW);
    assert_eq!(decision, AccessDecision::allow());
}

#[test]
fn missing_role_redirects_to_landing_not_login() {
    let guard = SessionGuard::default().route("/reports", RouteAccess::roles(["admin"]));
    let decision = guard.authorize("/reports", &session_with(NOW + 3600, &["user"]), NOW);
    assert!(!decision.allow);
    assert_eq!(decision.redirect_to.as_deref(), Some(LANDING_PATH));
}

#[test]
fn any_required_role_is_enough() {
    let guard = SessionGuard::coursehub();
    let instructor = session_with(NOW + 3600, &["instructor"]);
    assert!(guard.authorize("/instructor/new", &instructor, NOW).allow);
    assert!(guard.authorize("/student", &instructor, NOW).allow);
    assert!(!guard.authorize("/admin", &instructor, NOW).allow);
}

#[test]
fn roles_fall_back_to_token_claims_without_profile() {
    let session = Session {
        access_token: Some(token(NOW + 3600, &["admin"])),
        ..Session::default()
    };
    assert!(SessionGuard::coursehub().authorize("/admin", &session, NOW).allow);
}

// =============================================================
// redirects
// =============================================================

#[test]
fn login_redirect_drops_fragment_and_root() {
    let guard = SessionGuard::coursehub();
    assert_eq!(guard.login_redirect("/profile#bio"), "/login?from=%2Fprofile");
    assert_eq!(guard.login_redirect("/"), "/login");
    assert_eq!(guard.login_redirect("/courses?q=rust"), "/login?from=%2Fcourses%3Fq%3Drust");
}

#[test]
fn return_target_accepts_local_paths_only() {
    let guard = SessionGuard::coursehub();
    assert_eq!(guard.return_target(Some("%2Fstudent%2Fprogress")), "/student/progress");
    assert_eq!(guard.return_target(Some("/courses?q=rust")), "/courses?q=rust");
    assert_eq!(guard.return_target(None), LANDING_PATH);
    assert_eq!(guard.return_target(Some("https://evil.example")), LANDING_PATH);
    assert_eq!(guard.return_target(Some("//evil.example")), LANDING_PATH);
    assert_eq!(guard.return_target(Some("/\\evil.example")), LANDING_PATH);
    assert_eq!(guard.return_target(Some("/login")), LANDING_PATH);
}

#[test]
fn return_target_rejects_stripped_characters() {
    let guard = SessionGuard::coursehub();
    for raw in ["/%09/evil.example", "/%0A/evil.example", "/%0D/evil.example", "/%00/evil.example", "/%20/evil.example"] {
        assert_eq!(guard.return_target(Some(raw)), LANDING_PATH, "{raw}");
    }
    assert_eq!(guard.return_target(Some("/\t/evil.example")), LANDING_PATH);
}

#[test]
fn bounce_sends_signed_in_users_to_landing() {
    let guard = SessionGuard::coursehub();
    let signed_in = session_with(NOW + 60, &[]);
    assert_eq!(guard.bounce_target("/login", &signed_in, NOW), Some(LANDING_PATH.to_owned()));
    assert_eq!(guard.bounce_target("/register", &signed_in, NOW), Some(LANDING_PATH.to_owned()));
    assert_eq!(guard.bounce_target("/courses", &signed_in, NOW), None);
    assert_eq!(guard.bounce_target("/login", &Session::default(), NOW), None);
}
