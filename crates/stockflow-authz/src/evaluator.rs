//! Authorization evaluator.
//!
//! Pure decision logic over a pluggable [`PermissionSource`]. The static
//! source answers from the fixed in-process role tables; the dynamic source
//! resolves grant edges through the role store with a TTL cache in front.
//!
//! Evaluation fails closed: a store error is an `Err`, never a silent allow
//! or deny.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use stockflow_config::{AuthzConfig, EvaluationMode};
use stockflow_core::CoreResult;
use stockflow_models::roles::RoleRef;
use stockflow_models::{Principal, UserRole};
use stockflow_store::RoleStore;

use crate::cache::PermissionCache;

/// Resolves the permission names held by one role.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn permissions_for_role(&self, role: &RoleRef) -> CoreResult<HashSet<String>>;
}

/// Answers from the hardcoded role tables. Roles whose name has no legacy
/// view resolve to the empty set.
pub struct StaticPermissionSource;

#[async_trait]
impl PermissionSource for StaticPermissionSource {
    async fn permissions_for_role(&self, role: &RoleRef) -> CoreResult<HashSet<String>> {
        let permissions = UserRole::from_role_name(&role.name)
            .map(|r| {
                r.static_permissions()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(permissions)
    }
}

/// Resolves active grant edges through the role store, read-through cached
/// per role id.
pub struct DynamicPermissionSource {
    roles: Arc<dyn RoleStore>,
    cache: Arc<PermissionCache>,
}

impl DynamicPermissionSource {
    pub fn new(roles: Arc<dyn RoleStore>, cache: Arc<PermissionCache>) -> Self {
        Self { roles, cache }
    }
}

#[async_trait]
impl PermissionSource for DynamicPermissionSource {
    async fn permissions_for_role(&self, role: &RoleRef) -> CoreResult<HashSet<String>> {
        if let Some(cached) = self.cache.get(role.id) {
            debug!(role = %role.name, "permission cache hit");
            return Ok(cached);
        }
        let permissions = self.roles.permission_names_for_role(role.id).await?;
        self.cache.insert(role.id, permissions.clone());
        Ok(permissions)
    }
}

/// The permission check surface handed to callers.
pub struct AuthorizationEvaluator {
    source: Arc<dyn PermissionSource>,
}

impl AuthorizationEvaluator {
    pub fn new(source: Arc<dyn PermissionSource>) -> Self {
        Self { source }
    }

    /// Builds the evaluator the configured mode asks for. The role store is
    /// only consulted in dynamic mode.
    pub fn from_config(config: &AuthzConfig, roles: Arc<dyn RoleStore>) -> Self {
        match config.mode {
            EvaluationMode::Static => Self::new(Arc::new(StaticPermissionSource)),
            EvaluationMode::Dynamic => {
                let cache = Arc::new(PermissionCache::new(config.cache_ttl));
                Self::new(Arc::new(DynamicPermissionSource::new(roles, cache)))
            }
        }
    }

    /// Whether any of the principal's roles holds the permission. Unknown
    /// permission names are simply never granted.
    #[instrument(skip(self, principal), fields(user = %principal.user_id))]
    pub async fn has_permission(
        &self,
        principal: &Principal,
        permission: &str,
    ) -> CoreResult<bool> {
        for role in &principal.roles {
            if self
                .source
                .permissions_for_role(role)
                .await?
                .contains(permission)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the principal holds at least one of the listed permissions.
    /// An empty list is vacuously `false`.
    pub async fn has_any_permission(
        &self,
        principal: &Principal,
        permissions: &[&str],
    ) -> CoreResult<bool> {
        if permissions.is_empty() {
            return Ok(false);
        }
        let effective = self.effective_permissions(principal).await?;
        Ok(permissions.iter().any(|p| effective.contains(*p)))
    }

    /// Whether the principal holds every listed permission. An empty list is
    /// vacuously `true`.
    pub async fn has_all_permissions(
        &self,
        principal: &Principal,
        permissions: &[&str],
    ) -> CoreResult<bool> {
        let effective = self.effective_permissions(principal).await?;
        Ok(permissions.iter().all(|p| effective.contains(*p)))
    }

    /// The union of permissions across all of the principal's roles.
    pub async fn effective_permissions(
        &self,
        principal: &Principal,
    ) -> CoreResult<HashSet<String>> {
        let mut effective = HashSet::new();
        for role in &principal.roles {
            effective.extend(self.source.permissions_for_role(role).await?);
        }
        Ok(effective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::CoreError;
    use stockflow_models::{RoleId, UserId};

    fn principal(role_name: &str) -> Principal {
        Principal::with_role(
            UserId::new(),
            RoleRef {
                id: RoleId::new(),
                name: role_name.to_string(),
            },
        )
    }

    fn static_evaluator() -> AuthorizationEvaluator {
        AuthorizationEvaluator::new(Arc::new(StaticPermissionSource))
    }

    /// A source standing in for an unreachable store.
    struct FailingSource;

    #[async_trait]
    impl PermissionSource for FailingSource {
        async fn permissions_for_role(&self, _role: &RoleRef) -> CoreResult<HashSet<String>> {
            Err(CoreError::store("connection refused"))
        }
    }

    #[tokio::test]
    async fn static_tables_answer_checks() {
        let eval = static_evaluator();
        assert!(eval
            .has_permission(&principal("Manager"), "invoice.create")
            .await
            .unwrap());
        assert!(!eval
            .has_permission(&principal("User"), "invoice.create")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unknown_role_holds_nothing() {
        let eval = static_evaluator();
        assert!(!eval
            .has_permission(&principal("Warehouse Lead"), "users.view")
            .await
            .unwrap());
        assert!(eval
            .effective_permissions(&principal("Warehouse Lead"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_permission_is_never_granted() {
        let eval = static_evaluator();
        assert!(!eval
            .has_permission(&principal("Admin"), "warp.core_breach")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn vacuous_truths() {
        let eval = static_evaluator();
        let p = principal("User");
        assert!(!eval.has_any_permission(&p, &[]).await.unwrap());
        assert!(eval.has_all_permissions(&p, &[]).await.unwrap());
    }

    #[tokio::test]
    async fn any_and_all_over_static_tables() {
        let eval = static_evaluator();
        let p = principal("User");
        assert!(eval
            .has_any_permission(&p, &["invoice.create", "users.view"])
            .await
            .unwrap());
        assert!(!eval
            .has_all_permissions(&p, &["invoice.create", "users.view"])
            .await
            .unwrap());
        assert!(eval
            .has_all_permissions(&p, &["users.view", "product.view"])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let eval = AuthorizationEvaluator::new(Arc::new(FailingSource));
        let err = eval
            .has_permission(&principal("Admin"), "users.view")
            .await
            .unwrap_err();
        assert!(err.is_store_failure());
    }
}
