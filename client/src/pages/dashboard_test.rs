use super::*;
use crate::state::session::UserProfile;

fn session_with_roles(roles: &[&str]) -> Session {
    Session {
        user: Some(UserProfile {
            username: "ana".to_owned(),
            first_name: "Ana".to_owned(),
            roles: roles.iter().map(|r| (*r).to_owned()).collect(),
            ..UserProfile::default()
        }),
        ..Session::default()
    }
}

#[test]
fn greeting_uses_display_name() {
    assert_eq!(greeting(&session_with_roles(&[])), "Welcome back, Ana!");
    assert_eq!(greeting(&Session::default()), "Welcome back!");
}

#[test]
fn role_badges_are_sorted() {
    assert_eq!(role_badges(&session_with_roles(&["student", "admin"])), vec!["admin", "student"]);
}

#[test]
fn role_links_follow_route_table() {
    let hrefs = |roles: &[&str]| role_links(&session_with_roles(roles)).into_iter().map(|(h, _)| h).collect::<Vec<_>>();
    assert_eq!(hrefs(&["admin"]), vec!["/admin", "/instructor", "/student"]);
    assert_eq!(hrefs(&["instructor"]), vec!["/instructor", "/student"]);
    assert_eq!(hrefs(&["student"]), vec!["/student"]);
    assert!(hrefs(&["user"]).is_empty());
}
