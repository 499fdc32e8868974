//! Process identity resolution.
//!
//! Resolved once at startup — metadata endpoint, then environment
//! variables, then a synthetic development identity — and cached for the
//! process lifetime via `OnceLock`, a write-once, read-many shared
//! resource.

use std::env;
use std::sync::OnceLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Environment;
use crate::error::{NavigatorError, NavigatorResult};

/// The resolved identity of the current process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIdentity {
    /// Service-account email.
    pub email: String,
    /// Cloud project id, if resolved from the platform.
    pub project_id: String,
    /// A stable unique id for this process instance.
    pub unique_id: String,
}

/// The synthetic identity used in development mode when no platform
/// metadata or environment variables are available.
pub fn synthetic_dev_identity() -> ServiceIdentity {
    ServiceIdentity {
        email: "dev-agent@localhost".to_string(),
        project_id: "local-dev".to_string(),
        unique_id: "dev-instance".to_string(),
    }
}

/// Resolves the current process's [`ServiceIdentity`].
///
/// Implementations try, in order: (a) a platform metadata endpoint, (b)
/// configured environment variables, (c) a synthetic development identity
/// in non-production mode. Production mode with nothing resolvable is a
/// startup error.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the identity, without caching.
    async fn resolve(&self, environment: Environment) -> NavigatorResult<ServiceIdentity>;
}

/// Default provider: queries environment variables, falling back to the
/// synthetic development identity. The platform-metadata lookup is left to
/// a deployment-specific `IdentityProvider` implementation, since reaching
/// an actual metadata server is outside this crate's scope.
#[derive(Debug, Default)]
pub struct EnvIdentityProvider;

#[async_trait]
impl IdentityProvider for EnvIdentityProvider {
    async fn resolve(&self, environment: Environment) -> NavigatorResult<ServiceIdentity> {
        let email = env::var("service_account_email").ok();
        let project_id = env::var("project_id").ok();

        match (email, project_id) {
            (Some(email), Some(project_id)) => Ok(ServiceIdentity {
                unique_id: format!("{email}:{project_id}"),
                email,
                project_id,
            }),
            _ if environment == Environment::Development => Ok(synthetic_dev_identity()),
            _ => Err(NavigatorError::ConfigInvalid {
                message: "production requires service_account_email and project_id".to_string(),
            }),
        }
    }
}

/// Caches a resolved [`ServiceIdentity`] for the process lifetime.
#[derive(Default)]
pub struct IdentityCache {
    cell: OnceLock<ServiceIdentity>,
}

impl IdentityCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve once via `provider` and cache the result; subsequent calls
    /// return the cached value regardless of `environment`.
    pub async fn get_or_resolve(
        &self,
        provider: &dyn IdentityProvider,
        environment: Environment,
    ) -> NavigatorResult<&ServiceIdentity> {
        if let Some(identity) = self.cell.get() {
            return Ok(identity);
        }
        let identity = provider.resolve(environment).await?;
        // `set` can lose a race under concurrent first-callers; either way
        // `get` below returns a consistent cached value.
        let _ = self.cell.set(identity);
        Ok(self.cell.get().expect("just set"))
    }
}
