//! Role management utilities

use tracing::info;
use warden_config::RoleDefinition;

use crate::{
    config::role_rules,
    enforcer::Enforcer,
    error::{RbacError, RbacResult},
    rules::Rule,
};

/// Role manager for handling role operations
#[derive(Debug, Clone)]
pub struct RoleManager {
    enforcer: Enforcer,
}

impl RoleManager {
    /// Create a new role manager
    pub fn new(enforcer: Enforcer) -> Self {
        Self { enforcer }
    }

    pub fn enforcer(&self) -> &Enforcer {
        &self.enforcer
    }

    /// Create or extend `name` with the permissions and parents in
    /// `definition`. Returns the number of rules that were new.
    ///
    /// A malformed definition is rejected before anything is written.
    pub async fn create_role(&self, name: &str, definition: &RoleDefinition) -> RbacResult<usize> {
        let rules = role_rules(name, definition)?;
        let added = self.enforcer.add_rules(rules).await?;

        info!("Role '{}' created with {} new rules", name, added);
        Ok(added)
    }

    /// Delete `name` with all of its permissions and memberships.
    ///
    /// Deleting a role that does not exist removes nothing and succeeds.
    pub async fn delete_role(&self, name: &str) -> RbacResult<u64> {
        let removed = self.enforcer.delete_role(name).await?;
        if removed == 0 {
            info!("Role '{}' already deleted", name);
        }
        Ok(removed)
    }

    /// Make `subject` a member of `role`
    pub async fn assign(&self, subject: &str, role: &str) -> RbacResult<bool> {
        self.enforcer.grant_role(subject, role).await
    }

    /// Remove `subject` from `role`; a missing membership is not an error
    pub async fn drop_membership(&self, subject: &str, role: &str) -> RbacResult<u64> {
        self.enforcer.revoke_role_grouping(subject, role).await
    }

    /// Whether any rule mentions `name` as a role or as a permission holder
    pub async fn role_exists(&self, name: &str) -> bool {
        self.enforcer.rules().await.iter().any(|rule| match rule {
            Rule::Permission(p) => p.subject == name,
            Rule::Grouping(g) => g.subject == name || g.role == name,
        })
    }

    /// Reconstruct the definition of `name` from the stored rules
    pub async fn role_definition(&self, name: &str) -> RbacResult<RoleDefinition> {
        if !self.role_exists(name).await {
            return Err(RbacError::RoleNotFound {
                role_name: name.to_string(),
            });
        }

        let mut definition = RoleDefinition::default();
        for permission in self.enforcer.permissions_for_subject(name).await {
            definition.add_permission(format!("{}:{}", permission.object, permission.action));
        }
        for parent in self.enforcer.roles_for_subject(name).await {
            definition.add_inheritance(parent);
        }
        Ok(definition)
    }
}
