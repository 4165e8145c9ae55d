//! Client configuration from key/value lookups.
//!
//! The browser build bakes values in at compile time (`option_env!`); native
//! callers pass the process environment. Unset keys fall back to the local
//! development defaults.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_IDP_URL: &str = "http://localhost:8090";
pub const DEFAULT_IDP_REALM: &str = "elearning";
pub const DEFAULT_IDP_CLIENT_ID: &str = "frontend";
pub const DEFAULT_IDP_SCOPE: &str = "openid profile email";
pub const DEFAULT_COURSE_SERVICE_URL: &str = "http://localhost:8084";
pub const DEFAULT_VIDEO_SERVICE_URL: &str = "http://localhost:8085";
pub const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:8083";
pub const DEFAULT_AI_SERVICE_URL: &str = "http://localhost:8086";
pub const DEFAULT_REFRESH_LEEWAY_SECS: i64 = 5;

/// Every key `ClientConfig` reads.
pub const CONFIG_KEYS: [&str; 10] = [
    "COURSEHUB_AUTH_BACKEND",
    "COURSEHUB_IDP_URL",
    "COURSEHUB_IDP_REALM",
    "COURSEHUB_IDP_CLIENT_ID",
    "COURSEHUB_IDP_SCOPE",
    "COURSEHUB_COURSE_SERVICE_URL",
    "COURSEHUB_VIDEO_SERVICE_URL",
    "COURSEHUB_USER_SERVICE_URL",
    "COURSEHUB_AI_SERVICE_URL",
    "COURSEHUB_REFRESH_LEEWAY_SECS",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// Which identity-provider implementation to wire up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthBackend {
    #[default]
    Oidc,
    Mock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProviderConfig {
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub scope: String,
}

impl IdentityProviderConfig {
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/realms/{}/protocol/openid-connect/token", self.base_url, self.realm)
    }

    #[must_use]
    pub fn userinfo_endpoint(&self) -> String {
        format!("{}/realms/{}/protocol/openid-connect/userinfo", self.base_url, self.realm)
    }
}

impl Default for IdentityProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_IDP_URL.to_owned(),
            realm: DEFAULT_IDP_REALM.to_owned(),
            client_id: DEFAULT_IDP_CLIENT_ID.to_owned(),
            scope: DEFAULT_IDP_SCOPE.to_owned(),
        }
    }
}

/// Base URLs of the REST backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub courses: String,
    pub videos: String,
    pub users: String,
    pub ai: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            courses: DEFAULT_COURSE_SERVICE_URL.to_owned(),
            videos: DEFAULT_VIDEO_SERVICE_URL.to_owned(),
            users: DEFAULT_USER_SERVICE_URL.to_owned(),
            ai: DEFAULT_AI_SERVICE_URL.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub backend: AuthBackend,
    pub idp: IdentityProviderConfig,
    pub services: ServiceEndpoints,
    /// Refresh when the access token expires within this many seconds.
    pub refresh_leeway_secs: i64,
}

impl ClientConfig {
    /// Build typed config from `lookup`.
    ///
    /// Optional (defaults in parentheses):
    /// - `COURSEHUB_AUTH_BACKEND`: `oidc` (default) or `mock`
    /// - `COURSEHUB_IDP_URL` / `_REALM` / `_CLIENT_ID` / `_SCOPE`
    /// - `COURSEHUB_{COURSE,VIDEO,USER,AI}_SERVICE_URL`
    /// - `COURSEHUB_REFRESH_LEEWAY_SECS` (5)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for an unknown backend or a non-integer leeway.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let url = |key: &str, default: &str| {
            get(key).unwrap_or_else(|| default.to_owned()).trim_end_matches('/').to_owned()
        };

        let backend = parse_backend(get("COURSEHUB_AUTH_BACKEND").as_deref())?;
        let idp = IdentityProviderConfig {
            base_url: url("COURSEHUB_IDP_URL", DEFAULT_IDP_URL),
            realm: get("COURSEHUB_IDP_REALM").unwrap_or_else(|| DEFAULT_IDP_REALM.to_owned()),
            client_id: get("COURSEHUB_IDP_CLIENT_ID").unwrap_or_else(|| DEFAULT_IDP_CLIENT_ID.to_owned()),
            scope: get("COURSEHUB_IDP_SCOPE").unwrap_or_else(|| DEFAULT_IDP_SCOPE.to_owned()),
        };
        let services = ServiceEndpoints {
            courses: url("COURSEHUB_COURSE_SERVICE_URL", DEFAULT_COURSE_SERVICE_URL),
            videos: url("COURSEHUB_VIDEO_SERVICE_URL", DEFAULT_VIDEO_SERVICE_URL),
            users: url("COURSEHUB_USER_SERVICE_URL", DEFAULT_USER_SERVICE_URL),
            ai: url("COURSEHUB_AI_SERVICE_URL", DEFAULT_AI_SERVICE_URL),
        };
        let refresh_leeway_secs = match get("COURSEHUB_REFRESH_LEEWAY_SECS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|v| *v >= 0)
                .ok_or_else(|| ConfigError::Parse(format!("invalid COURSEHUB_REFRESH_LEEWAY_SECS: {raw}")))?,
            None => DEFAULT_REFRESH_LEEWAY_SECS,
        };

        Ok(Self { backend, idp, services, refresh_leeway_secs })
    }

    /// Config baked in when the crate was compiled.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_lookup`].
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::from_lookup(build_env)
    }
}

fn build_env(key: &str) -> Option<String> {
    let value = match key {
        "COURSEHUB_AUTH_BACKEND" => option_env!("COURSEHUB_AUTH_BACKEND"),
        "COURSEHUB_IDP_URL" => option_env!("COURSEHUB_IDP_URL"),
        "COURSEHUB_IDP_REALM" => option_env!("COURSEHUB_IDP_REALM"),
        "COURSEHUB_IDP_CLIENT_ID" => option_env!("COURSEHUB_IDP_CLIENT_ID"),
        "COURSEHUB_IDP_SCOPE" => option_env!("COURSEHUB_IDP_SCOPE"),
        "COURSEHUB_COURSE_SERVICE_URL" => option_env!("COURSEHUB_COURSE_SERVICE_URL"),
        "COURSEHUB_VIDEO_SERVICE_URL" => option_env!("COURSEHUB_VIDEO_SERVICE_URL"),
        "COURSEHUB_USER_SERVICE_URL" => option_env!("COURSEHUB_USER_SERVICE_URL"),
        "COURSEHUB_AI_SERVICE_URL" => option_env!("COURSEHUB_AI_SERVICE_URL"),
        "COURSEHUB_REFRESH_LEEWAY_SECS" => option_env!("COURSEHUB_REFRESH_LEEWAY_SECS"),
        _ => None,
    };
    value.map(str::to_owned)
}

fn parse_backend(raw: Option<&str>) -> Result<AuthBackend, ConfigError> {
    match raw.unwrap_or("oidc") {
        "oidc" | "keycloak" => Ok(AuthBackend::Oidc),
        "mock" => Ok(AuthBackend::Mock),
        other => Err(ConfigError::Parse(format!(
            "unknown COURSEHUB_AUTH_BACKEND '{other}' (expected 'oidc' or 'mock')"
        ))),
    }
}
