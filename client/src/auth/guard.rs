//! Route classification and the single navigation decision point.
//!
//! DESIGN
//! ======
//! `authorize` is pure: it reads a `Session` snapshot and a timestamp and
//! never touches storage or the network. Every redirect that follows an auth
//! change goes through it, so the same rules apply on first load, after
//! login, after logout and after a 401.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::collections::BTreeSet;

use crate::state::session::Session;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const LANDING_PATH: &str = "/dashboard";

/// Access rule for one route prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Authenticated,
    /// Authenticated and holding at least one of these roles.
    Roles(BTreeSet<String>),
}

impl RouteAccess {
    /// Role-restricted access. An empty role set means plain `Authenticated`.
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        if roles.is_empty() { Self::Authenticated } else { Self::Roles(roles) }
    }

    #[must_use]
    pub fn requires_authentication(&self) -> bool {
        !matches!(self, Self::Public)
    }
}

/// Outcome of `SessionGuard::authorize`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessDecision {
    pub allow: bool,
    pub redirect_to: Option<String>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self { allow: true, redirect_to: None }
    }

    fn redirect(to: String) -> Self {
        Self { allow: false, redirect_to: Some(to) }
    }
}

#[derive(Clone, Debug)]
pub struct SessionGuard {
    routes: Vec<(String, RouteAccess)>,
    default_access: RouteAccess,
    login_path: String,
    landing_path: String,
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new(LOGIN_PATH, LANDING_PATH)
    }
}

impl SessionGuard {
    /// Empty table: every path other than `login_path` needs authentication.
    pub fn new(login_path: &str, landing_path: &str) -> Self {
        Self {
            routes: Vec::new(),
            default_access: RouteAccess::Authenticated,
            login_path: normalize(login_path),
            landing_path: normalize(landing_path),
        }
    }

    /// Route table of the course platform.
    #[must_use]
    pub fn coursehub() -> Self {
        Self::default()
            .route("/", RouteAccess::Public)
            .route(REGISTER_PATH, RouteAccess::Public)
            .route("/forgot-password", RouteAccess::Public)
            .route("/reset-password", RouteAccess::Public)
            .route("/courses", RouteAccess::Public)
            .route("/admin", RouteAccess::roles(["admin"]))
            .route("/instructor", RouteAccess::roles(["admin", "instructor"]))
            .route("/student", RouteAccess::roles(["admin", "instructor", "student"]))
    }

    /// Classify `prefix` and everything below it. Later calls for the same
    /// prefix replace earlier ones.
    #[must_use]
    pub fn route(mut self, prefix: &str, access: RouteAccess) -> Self {
        let prefix = normalize(prefix);
        self.routes.retain(|(p, _)| *p != prefix);
        self.routes.push((prefix, access));
        self
    }

    #[must_use]
    pub fn with_default(mut self, access: RouteAccess) -> Self {
        self.default_access = access;
        self
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Access rule for `path` by longest segment-aligned prefix.
    #[must_use]
    pub fn classify(&self, path: &str) -> &RouteAccess {
        static PUBLIC: RouteAccess = RouteAccess::Public;
        let path = normalize(path);
        if path == self.login_path {
            return &PUBLIC;
        }
        self.routes
            .iter()
            .filter(|(prefix, _)| segment_prefix(prefix, &path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(&self.default_access, |(_, access)| access)
    }

    /// Whether `session` may view `path` at time `now`.
    #[must_use]
    pub fn authorize(&self, path: &str, session: &Session, now: i64) -> AccessDecision {
        let access = self.classify(path);
        if !access.requires_authentication() {
            return AccessDecision::allow();
        }
        if !session.is_authenticated(now) {
            return AccessDecision::redirect(self.login_redirect(path));
        }
        match access {
            RouteAccess::Roles(required) if session.roles().is_disjoint(required) => {
                AccessDecision::redirect(self.landing_path.clone())
            }
            _ => AccessDecision::allow(),
        }
    }

    /// Login URL that returns to `path` afterwards.
    #[must_use]
    pub fn login_redirect(&self, path: &str) -> String {
        let target = strip_fragment(path.trim());
        if target.is_empty() || target == "/" {
            return self.login_path.clone();
        }
        format!("{}?from={}", self.login_path, urlencoding::encode(target))
    }

    /// Where to go after a successful login, given the `from` parameter.
    ///
    /// Only same-origin absolute paths are honored; anything else, any path
    /// holding whitespace or control characters, and any path back into the
    /// login page lands on the default page.
    #[must_use]
    pub fn return_target(&self, from: Option<&str>) -> String {
        let Some(decoded) = from.and_then(|raw| urlencoding::decode(raw).ok()) else {
            return self.landing_path.clone();
        };
        let target = decoded.trim();
        // Browsers drop tabs and newlines while parsing, so "/\t/host" is "//host".
        let same_origin = target.starts_with('/')
            && !target.starts_with("//")
            && !target.contains('\\')
            && !target.chars().any(|c| c.is_control() || c.is_whitespace());
        if !same_origin || normalize(target) == self.login_path {
            return self.landing_path.clone();
        }
        target.to_owned()
    }

    /// Send an authenticated user away from the login and register pages.
    #[must_use]
    pub fn bounce_target(&self, path: &str, session: &Session, now: i64) -> Option<String> {
        let path = normalize(path);
        let is_entry = path == self.login_path || path == REGISTER_PATH;
        (is_entry && session.is_authenticated(now)).then(|| self.landing_path.clone())
    }
}

fn strip_fragment(path: &str) -> &str {
    path.split('#').next().unwrap_or_default()
}

/// Path without query, fragment, or trailing slash; always starts with `/`.
fn normalize(path: &str) -> String {
    let path = strip_fragment(path.trim());
    let path = path.split('?').next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

/// `/courses` covers `/courses` and `/courses/42` but not `/coursesx`.
fn segment_prefix(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    path.strip_prefix(prefix).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
