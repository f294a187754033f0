//! Rule types shared by the policy store, the compiled model and the enforcer
//!
//! Two kinds of rule live in the same rule space, following the usual RBAC
//! table convention:
//! - permission rules (`p`): `(subject_or_role, object, action)`
//! - grouping rules (`g`): `(subject, role)`
//!
//! All fields are opaque strings compared by exact byte equality. Empty
//! fields are rejected at construction time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RbacError, RbacResult};

/// Object/action value that matches anything when wildcard matching is enabled
pub const WILDCARD: &str = "*";

/// Kind of a stored rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Permission,
    Grouping,
}

impl RuleType {
    /// Policy type tag as persisted in the rule table
    pub fn ptype(&self) -> &'static str {
        match self {
            RuleType::Permission => "p",
            RuleType::Grouping => "g",
        }
    }

    /// Parse a persisted policy type tag
    pub fn from_ptype(ptype: &str) -> Option<Self> {
        match ptype {
            "p" => Some(RuleType::Permission),
            "g" => Some(RuleType::Grouping),
            _ => None,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ptype())
    }
}

/// "`subject` (a role or a single subject) may perform `action` on `object`"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRule {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl PolicyRule {
    /// Create a permission rule, rejecting empty fields
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> RbacResult<Self> {
        let rule = Self {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        };
        require_non_empty("subject", &rule.subject)?;
        require_non_empty("object", &rule.object)?;
        require_non_empty("action", &rule.action)?;
        Ok(rule)
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p, {}, {}, {}", self.subject, self.object, self.action)
    }
}

/// "`subject` is a member of `role`"
///
/// The subject may itself be a role, which is how role inheritance is
/// expressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub subject: String,
    pub role: String,
}

impl RoleAssignment {
    /// Create a grouping rule, rejecting empty fields
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> RbacResult<Self> {
        let assignment = Self {
            subject: subject.into(),
            role: role.into(),
        };
        require_non_empty("subject", &assignment.subject)?;
        require_non_empty("role", &assignment.role)?;
        Ok(assignment)
    }
}

impl fmt::Display for RoleAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g, {}, {}", self.subject, self.role)
    }
}

/// Any rule that can be persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Rule {
    Permission(PolicyRule),
    Grouping(RoleAssignment),
}

impl Rule {
    /// Kind of this rule
    pub fn rule_type(&self) -> RuleType {
        match self {
            Rule::Permission(_) => RuleType::Permission,
            Rule::Grouping(_) => RuleType::Grouping,
        }
    }

    /// Positional fields `v0..v2` as stored in the rule table.
    ///
    /// Grouping rules only use two fields; the third is stored empty.
    pub fn fields(&self) -> [&str; 3] {
        match self {
            Rule::Permission(rule) => [&rule.subject, &rule.object, &rule.action],
            Rule::Grouping(assignment) => [&assignment.subject, &assignment.role, ""],
        }
    }

    /// Rebuild a rule from its persisted form
    pub fn from_fields(ptype: &str, v0: &str, v1: &str, v2: &str) -> RbacResult<Self> {
        match RuleType::from_ptype(ptype) {
            Some(RuleType::Permission) => Ok(Rule::Permission(PolicyRule::new(v0, v1, v2)?)),
            Some(RuleType::Grouping) => Ok(Rule::Grouping(RoleAssignment::new(v0, v1)?)),
            None => Err(RbacError::invalid_rule(format!("unknown policy type '{}'", ptype))),
        }
    }

    /// Values in the order the enforcement model declares them:
    /// `[sub, obj, act]` for permissions, `[subject, role]` for groupings
    pub fn values(&self) -> Vec<String> {
        match self {
            Rule::Permission(rule) => vec![
                rule.subject.clone(),
                rule.object.clone(),
                rule.action.clone(),
            ],
            Rule::Grouping(assignment) => vec![assignment.subject.clone(), assignment.role.clone()],
        }
    }

    /// Rebuild a rule from the values of a model policy line
    pub fn from_values(rule_type: RuleType, values: &[String]) -> RbacResult<Self> {
        match (rule_type, values) {
            (RuleType::Permission, [subject, object, action]) => {
                Ok(Rule::Permission(PolicyRule::new(subject, object, action)?))
            }
            (RuleType::Grouping, [subject, role]) => {
                Ok(Rule::Grouping(RoleAssignment::new(subject, role)?))
            }
            _ => Err(RbacError::invalid_rule(format!(
                "'{}' rule cannot have {} values",
                rule_type,
                values.len()
            ))),
        }
    }
}

impl From<PolicyRule> for Rule {
    fn from(rule: PolicyRule) -> Self {
        Rule::Permission(rule)
    }
}

impl From<RoleAssignment> for Rule {
    fn from(assignment: RoleAssignment) -> Self {
        Rule::Grouping(assignment)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Permission(rule) => fmt::Display::fmt(rule, f),
            Rule::Grouping(assignment) => fmt::Display::fmt(assignment, f),
        }
    }
}

/// Parse an `"object,action"` policy string as attached to protected operations
pub fn parse_policy(policy: &str) -> RbacResult<(String, String)> {
    let (object, action) = policy
        .split_once(',')
        .ok_or_else(|| RbacError::invalid_rule(format!("expected 'object,action', got '{}'", policy)))?;
    let (object, action) = (object.trim(), action.trim());

    if action.contains(',') {
        return Err(RbacError::invalid_rule(format!(
            "expected 'object,action', got '{}'",
            policy
        )));
    }
    require_non_empty("object", object)?;
    require_non_empty("action", action)?;

    Ok((object.to_string(), action.to_string()))
}

fn require_non_empty(field: &str, value: &str) -> RbacResult<()> {
    if value.is_empty() {
        return Err(RbacError::invalid_rule(format!("{} cannot be empty", field)));
    }
    Ok(())
}
