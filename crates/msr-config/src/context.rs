use crate::settings::SubsystemConfig;
use anyhow::{bail, Result};
use std::env;

pub const DEFAULT_CLUSTER_USER: &str = "ACTIVEMQ.CLUSTER.ADMIN.USER";

/// Credentials servers use to join their cluster.
///
/// Resolved once at startup. **The password is redacted in `Debug` output.**
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterCredentials {
    user: String,
    password: String,
}

impl ClusterCredentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Default user with a random password. Stable for the life of the value.
    pub fn generated() -> Self {
        Self::new(DEFAULT_CLUSTER_USER, uuid::Uuid::new_v4().to_string())
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for ClusterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterCredentials")
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Process-wide facts decided at startup and handed to the controller.
#[derive(Debug, Clone)]
pub struct StartupContext {
    pub credentials: ClusterCredentials,
    pub legacy_compatibility: bool,
}

impl StartupContext {
    pub fn new(credentials: ClusterCredentials, legacy_compatibility: bool) -> Self {
        Self {
            credentials,
            legacy_compatibility,
        }
    }

    /// Resolve credentials from the process environment.
    ///
    /// If `cluster.password_env` names a variable it MUST be set and non-empty;
    /// if it is absent a random password is generated once.
    pub fn from_config(cfg: &SubsystemConfig) -> Result<Self> {
        Self::from_config_with(cfg, |name| env::var(name).ok())
    }

    /// Same as [`StartupContext::from_config`] with an injectable env lookup.
    pub fn from_config_with<F>(cfg: &SubsystemConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let user = cfg
            .cluster
            .user
            .clone()
            .unwrap_or_else(|| DEFAULT_CLUSTER_USER.to_string());

        let credentials = match cfg.cluster.password_env.as_deref() {
            Some(var) => match lookup(var).filter(|v| !v.trim().is_empty()) {
                Some(password) => ClusterCredentials::new(user, password),
                // Name the variable, never a value.
                None => bail!("CLUSTER_PASSWORD_MISSING: env var {var} is not set"),
            },
            None => ClusterCredentials::new(user, uuid::Uuid::new_v4().to_string()),
        };

        Ok(Self::new(credentials, cfg.subsystem.legacy_compatibility))
    }
}

impl Default for StartupContext {
    fn default() -> Self {
        Self::new(ClusterCredentials::generated(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_password() {
        let c = ClusterCredentials::new("admin", "hunter2-secret");
        let dbg = format!("{c:?}");
        assert!(dbg.contains("admin"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn generated_password_is_stable_per_value() {
        let ctx = StartupContext::default();
        let again = ctx.clone();
        assert_eq!(ctx.credentials.password(), again.credentials.password());
        assert_eq!(ctx.credentials.user(), DEFAULT_CLUSTER_USER);
    }
}
