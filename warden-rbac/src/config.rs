//! Runtime configuration for the enforcer

use std::collections::BTreeMap;
use std::time::Duration;
use warden_config::{DatabaseConfig, PolicyConfig, RoleDefinition, WardenConfig};

use crate::error::{RbacError, RbacResult};
use crate::rules::{PolicyRule, RoleAssignment, Rule};

/// Settings the enforcer needs, assembled from the policy and database domains
#[derive(Debug, Clone)]
pub struct RbacConfig {
    /// Role that bypasses every check
    pub super_user: Option<String>,

    /// Stored `*` objects/actions match anything
    pub wildcard_matching: bool,

    /// Upper bound for a single store call
    pub store_timeout: Duration,

    /// Periodic model reload, if any
    pub reload_interval: Option<Duration>,

    /// Roles written to an empty store on first start
    pub seed_roles: BTreeMap<String, RoleDefinition>,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self::from_parts(&PolicyConfig::default(), &DatabaseConfig::default())
    }
}

impl From<&WardenConfig> for RbacConfig {
    fn from(config: &WardenConfig) -> Self {
        Self::from_parts(&config.policy, &config.database)
    }
}

impl RbacConfig {
    /// Combine the policy domain with the store timeout of the database domain
    pub fn from_parts(policy: &PolicyConfig, database: &DatabaseConfig) -> Self {
        Self {
            super_user: policy.super_user.clone(),
            wildcard_matching: policy.wildcard_matching,
            store_timeout: database.store_timeout,
            reload_interval: policy.reload_interval,
            seed_roles: policy.seed_roles.clone(),
        }
    }

    /// Set the super-user role
    pub fn with_super_user(mut self, role: impl Into<String>) -> Self {
        self.super_user = Some(role.into());
        self
    }

    /// Set the store call timeout
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Enable or disable wildcard matching
    pub fn with_wildcard_matching(mut self, enabled: bool) -> Self {
        self.wildcard_matching = enabled;
        self
    }

    /// Add a role to seed into an empty store
    pub fn with_seed_role(mut self, name: impl Into<String>, definition: RoleDefinition) -> Self {
        self.seed_roles.insert(name.into(), definition);
        self
    }

    /// Whether `role` is the configured super-user role (exact match)
    pub fn is_super_user(&self, role: &str) -> bool {
        self.super_user.as_deref() == Some(role)
    }

    /// Rules for the configured seed roles
    pub fn seed_rules(&self) -> RbacResult<Vec<Rule>> {
        let mut rules = Vec::new();
        for (name, definition) in &self.seed_roles {
            let role = role_rules(name, definition)
                .map_err(|e| RbacError::invalid_config(format!("seed role '{}': {}", name, e)))?;
            rules.extend(role);
        }
        Ok(rules)
    }
}

/// Every rule that makes up role `name` as described by `definition`.
///
/// The whole definition is checked before any rule is returned: a malformed
/// permission or a self-inheritance fails the call as a unit.
pub fn role_rules(name: &str, definition: &RoleDefinition) -> RbacResult<Vec<Rule>> {
    if name.is_empty() {
        return Err(RbacError::invalid_rule("role name cannot be empty"));
    }

    let pairs = definition.permission_pairs().map_err(|permission| {
        RbacError::invalid_rule(format!(
            "permission '{}' must be in 'object:action' form",
            permission
        ))
    })?;
    if definition.inherits_from.iter().any(|parent| parent == name) {
        return Err(RbacError::invalid_rule(format!(
            "role '{}' cannot inherit from itself",
            name
        )));
    }

    let mut rules = Vec::with_capacity(pairs.len() + definition.inherits_from.len());
    for (object, action) in pairs {
        rules.push(PolicyRule::new(name, object, action)?.into());
    }
    for parent in &definition.inherits_from {
        rules.push(RoleAssignment::new(name, parent.as_str())?.into());
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RbacConfig::default();
        assert!(config.super_user.is_none());
        assert!(!config.is_super_user("admin"));
        assert_eq!(config.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_super_user_exact_match() {
        let config = RbacConfig::default().with_super_user("root");
        assert!(config.is_super_user("root"));
        assert!(!config.is_super_user("Root"));
        assert!(!config.is_super_user("root "));
    }

    #[test]
    fn test_seed_rules() {
        let mut admin = RoleDefinition::new(vec!["role:add".to_string(), "role:del".to_string()]);
        admin.add_inheritance("viewer");
        let config = RbacConfig::default().with_seed_role("admin", admin);

        let rules = config.seed_rules().unwrap();
        assert_eq!(rules.len(), 3);
        assert!(rules.contains(&PolicyRule::new("admin", "role", "del").unwrap().into()));
        assert!(rules.contains(&RoleAssignment::new("admin", "viewer").unwrap().into()));
    }

    #[test]
    fn test_malformed_seed_permission() {
        let config = RbacConfig::default()
            .with_seed_role("admin", RoleDefinition::new(vec!["role-add".to_string()]));
        assert!(matches!(
            config.seed_rules(),
            Err(RbacError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_role_rules_checks_whole_definition() {
        let mut editor = RoleDefinition::new(vec!["doc:write".to_string()]);
        editor.add_inheritance("viewer");
        assert_eq!(role_rules("editor", &editor).unwrap().len(), 2);

        for bad in ["doc:", ":read"] {
            let definition = RoleDefinition::new(vec!["doc:read".to_string(), bad.to_string()]);
            let err = role_rules("broken", &definition).unwrap_err();
            assert!(err.to_string().contains(bad));
        }
        assert!(role_rules("", &editor).is_err());
        assert!(role_rules("viewer", &editor).is_err());
    }

    #[test]
    fn test_from_warden_config() {
        let mut warden = WardenConfig::default();
        warden.policy.super_user = Some("root".to_string());
        warden.database.store_timeout = Duration::from_secs(1);

        let config = RbacConfig::from(&warden);
        assert!(config.is_super_user("root"));
        assert_eq!(config.store_timeout, Duration::from_secs(1));
    }
}
