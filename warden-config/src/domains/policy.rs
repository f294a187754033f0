//! Access-control policy configuration

use crate::error::ConfigResult;
use crate::validation::{
    parse_permission, validate_permission_string, validate_required_string, Validatable,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Policy engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PolicyConfig {
    /// Role that bypasses every permission check. `None` disables the bypass.
    pub super_user: Option<String>,

    /// Treat a stored `*` object or action as matching any requested value
    #[serde(default = "crate::domains::utils::default_false")]
    pub wildcard_matching: bool,

    /// Periodic reload of the compiled model from the store
    #[serde(
        with = "crate::domains::utils::serde_duration_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub reload_interval: Option<Duration>,

    /// Roles written to an empty store on first start
    pub seed_roles: BTreeMap<String, RoleDefinition>,
}

/// Role definition in configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RoleDefinition {
    /// Human readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Permissions as `object:action` strings
    pub permissions: Vec<String>,

    /// Roles whose permissions this role inherits
    pub inherits_from: Vec<String>,
}

impl RoleDefinition {
    /// Create a role definition from permission strings
    pub fn new(permissions: Vec<String>) -> Self {
        Self {
            description: None,
            permissions,
            inherits_from: Vec::new(),
        }
    }

    /// Add permission to role definition
    pub fn add_permission(&mut self, permission: impl Into<String>) {
        let permission = permission.into();
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
    }

    /// Add role inheritance
    pub fn add_inheritance(&mut self, parent_role: impl Into<String>) {
        let parent_role = parent_role.into();
        if !self.inherits_from.contains(&parent_role) {
            self.inherits_from.push(parent_role);
        }
    }

    /// Permissions split into `(object, action)` pairs.
    ///
    /// Fails with the first entry that is not `object:action` with two
    /// non-empty halves, so callers can reject a definition before acting on
    /// any part of it.
    pub fn permission_pairs(&self) -> Result<Vec<(&str, &str)>, &str> {
        self.permissions
            .iter()
            .map(|permission| parse_permission(permission).ok_or(permission.as_str()))
            .collect()
    }
}

impl Validatable for PolicyConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(ref super_user) = self.super_user {
            validate_required_string(super_user, "super_user", self.domain_name())?;
        }

        if let Some(interval) = self.reload_interval {
            if interval.is_zero() {
                return Err(self.validation_error("reload_interval must be greater than 0"));
            }
        }

        for (name, role) in &self.seed_roles {
            validate_required_string(name, "seed_roles key", self.domain_name())?;
            for permission in &role.permissions {
                validate_permission_string(permission, "seed_roles.permissions", self.domain_name())?;
            }
            for parent in &role.inherits_from {
                validate_required_string(parent, "seed_roles.inherits_from", self.domain_name())?;
                if parent == name {
                    return Err(self.validation_error(format!("role '{}' cannot inherit from itself", name)));
                }
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "policy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_config() {
        let config = PolicyConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.super_user.is_none());
        assert!(!config.wildcard_matching);
    }

    #[test]
    fn test_seed_role_validation() {
        let mut config = PolicyConfig::default();
        config
            .seed_roles
            .insert("admin".to_string(), RoleDefinition::new(vec!["role:add".to_string()]));
        assert!(config.validate().is_ok());

        config
            .seed_roles
            .insert("broken".to_string(), RoleDefinition::new(vec!["nocolon".to_string()]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_self_inheritance_rejected() {
        let mut role = RoleDefinition::default();
        role.add_inheritance("loop");
        let mut config = PolicyConfig::default();
        config.seed_roles.insert("loop".to_string(), role);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cannot inherit from itself"));
    }

    #[test]
    fn test_role_definition_helpers() {
        let mut role = RoleDefinition::default();
        role.add_permission("role:add");
        role.add_permission("role:add");
        role.add_permission("role:del");
        role.add_inheritance("viewer");
        role.add_inheritance("viewer");

        assert_eq!(role.permissions.len(), 2);
        assert_eq!(role.inherits_from, vec!["viewer".to_string()]);

        assert_eq!(role.permission_pairs().unwrap(), vec![("role", "add"), ("role", "del")]);

        for bad in ["doc:", ":read", "nocolon"] {
            role.add_permission(bad);
            assert_eq!(role.permission_pairs().unwrap_err(), bad);
            role.permissions.pop();
        }
    }
}
