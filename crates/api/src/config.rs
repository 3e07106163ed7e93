use std::str::FromStr;

use gemrush_core::launch::{Verifier, DEFAULT_MAX_AGE_SECS};

use crate::auth::jwt::JwtConfig;

/// Source of configuration values, keyed by variable name.
///
/// Production reads the process environment; tests pass closures.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Invalid or incomplete configuration. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where user rows live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserStoreBackend {
    /// The managed backend's REST API, authenticated with the service role.
    Rest {
        url: String,
        service_role_key: String,
    },
    /// A Postgres database reached directly.
    Postgres { database_url: String },
    /// Process-local map. Development only.
    Memory,
}

/// How launch data is authenticated.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub bot_token: Option<String>,
    pub allow_insecure: bool,
    /// `None` disables the `auth_date` freshness check.
    pub max_age_secs: Option<i64>,
}

impl LaunchConfig {
    /// Build the verifier for this configuration. A configured bot token
    /// always wins over the insecure flag.
    pub fn verifier(&self) -> Verifier {
        match &self.bot_token {
            Some(token) => Verifier::enforced(token.clone(), self.max_age_secs),
            None => Verifier::insecure(),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub launch: LaunchConfig,
    pub user_store: UserStoreBackend,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                      | Default    |
    /// |------------------------------|------------|
    /// | `HOST`                       | `0.0.0.0`  |
    /// | `PORT`                       | `8000`     |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`       |
    /// | `TELEGRAM_BOT_TOKEN`         | --         |
    /// | `ALLOW_INSECURE_LAUNCH_DATA` | `false`    |
    /// | `LAUNCH_DATA_MAX_AGE_SECS`   | see below  |
    /// | `USER_STORE`                 | `rest`     |
    /// | `BAAS_URL`                   | --         |
    /// | `BAAS_SERVICE_ROLE_KEY`      | --         |
    /// | `DATABASE_URL`               | --         |
    ///
    /// `LAUNCH_DATA_MAX_AGE_SECS` defaults to the larger of
    /// [`DEFAULT_MAX_AGE_SECS`] and the session lifetime, so a client can
    /// refresh its token with the launch data it started with.
    ///
    /// See [`JwtConfig::from_lookup`] for the session variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let host = var(lookup, "HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_var(lookup, "PORT")?.unwrap_or(8000);
        let request_timeout_secs: u64 = parse_var(lookup, "REQUEST_TIMEOUT_SECS")?.unwrap_or(30);

        let jwt = JwtConfig::from_lookup(lookup)?;
        let launch = launch_config(lookup, jwt.session_ttl_secs())?;
        let user_store = user_store_backend(lookup, launch.allow_insecure)?;

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            jwt,
            launch,
            user_store,
        })
    }
}

fn launch_config(lookup: Lookup<'_>, session_ttl_secs: i64) -> Result<LaunchConfig, ConfigError> {
    let bot_token = var(lookup, "TELEGRAM_BOT_TOKEN");
    let allow_insecure = flag_var(lookup, "ALLOW_INSECURE_LAUNCH_DATA")?;

    if bot_token.is_none() && !allow_insecure {
        return Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN"));
    }

    let max_age_secs: i64 = match parse_var(lookup, "LAUNCH_DATA_MAX_AGE_SECS")? {
        Some(secs) => secs,
        None => DEFAULT_MAX_AGE_SECS.max(session_ttl_secs),
    };
    if max_age_secs < 0 {
        return Err(ConfigError::Invalid {
            name: "LAUNCH_DATA_MAX_AGE_SECS",
            reason: "must not be negative".into(),
        });
    }
    if max_age_secs > 0 && max_age_secs < session_ttl_secs {
        tracing::warn!(
            max_age_secs,
            session_ttl_secs,
            "Launch data window is shorter than the session lifetime"
        );
    }

    Ok(LaunchConfig {
        bot_token,
        allow_insecure,
        max_age_secs: (max_age_secs > 0).then_some(max_age_secs),
    })
}

fn user_store_backend(
    lookup: Lookup<'_>,
    allow_insecure: bool,
) -> Result<UserStoreBackend, ConfigError> {
    let kind = var(lookup, "USER_STORE").unwrap_or_else(|| "rest".into());

    match kind.to_ascii_lowercase().as_str() {
        "rest" => Ok(UserStoreBackend::Rest {
            url: require_var(lookup, "BAAS_URL")?,
            service_role_key: require_var(lookup, "BAAS_SERVICE_ROLE_KEY")?,
        }),
        "postgres" => Ok(UserStoreBackend::Postgres {
            database_url: require_var(lookup, "DATABASE_URL")?,
        }),
        "memory" if allow_insecure => Ok(UserStoreBackend::Memory),
        "memory" => Err(ConfigError::Invalid {
            name: "USER_STORE",
            reason: "memory store requires ALLOW_INSECURE_LAUNCH_DATA".into(),
        }),
        other => Err(ConfigError::Invalid {
            name: "USER_STORE",
            reason: format!("unknown backend '{other}' (expected rest, postgres or memory)"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Variable helpers
// ---------------------------------------------------------------------------

/// A set, non-blank variable.
pub(crate) fn var(lookup: Lookup<'_>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn require_var(lookup: Lookup<'_>, name: &'static str) -> Result<String, ConfigError> {
    var(lookup, name).ok_or(ConfigError::Missing(name))
}

pub(crate) fn parse_var<T>(lookup: Lookup<'_>, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(lookup, name)
        .map(|raw| {
            raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn flag_var(lookup: Lookup<'_>, name: &'static str) -> Result<bool, ConfigError> {
    match var(lookup, name).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
