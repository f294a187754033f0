//! Policy store contract and implementations
//!
//! The store is the source of truth for every permission and grouping rule.
//! Writes must go through the [`Enforcer`](crate::Enforcer) so the casbin
//! model is refreshed in the same logical operation; writing to a store that
//! an enforcer is serving from breaks read-after-write.
//!
//! Concurrent writes of the same rule tuple are resolved by the store itself
//! (a unique index for SQL, a set for memory): the last writer wins at row
//! granularity.

mod adapter;
mod entity;
mod memory;
mod seaorm;

pub use adapter::StoreAdapter;
pub use entity::policy_rules;
pub use memory::MemoryPolicyStore;
pub use seaorm::SeaOrmPolicyStore;

use async_trait::async_trait;

use crate::error::RbacResult;
use crate::rules::{Rule, RuleType};

/// Durable storage of permission and grouping rules
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Insert a rule if absent. Returns `true` when a row was written;
    /// a duplicate is not an error.
    async fn add_rule(&self, rule: &Rule) -> RbacResult<bool>;

    /// Delete the rule. Returns the number of rows removed, 0 when none matched.
    async fn remove_rule(&self, rule: &Rule) -> RbacResult<u64>;

    /// Delete every rule of `rule_type` whose fields starting at
    /// `field_index` equal `field_values`. An empty value list removes nothing.
    async fn remove_filtered_rules(
        &self,
        rule_type: RuleType,
        field_index: usize,
        field_values: &[String],
    ) -> RbacResult<u64>;

    /// Every persisted rule, in no particular order
    async fn load_all(&self) -> RbacResult<Vec<Rule>>;
}

/// Whether `rule` matches a positional filter as used by
/// [`PolicyStore::remove_filtered_rules`]
pub(crate) fn matches_filter(
    rule: &Rule,
    rule_type: RuleType,
    field_index: usize,
    field_values: &[String],
) -> bool {
    if rule.rule_type() != rule_type || field_values.is_empty() {
        return false;
    }

    let fields = rule.fields();
    field_values.iter().enumerate().all(|(i, value)| {
        fields
            .get(field_index + i)
            .is_some_and(|field| *field == value.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{PolicyRule, RoleAssignment};

    #[test]
    fn test_matches_filter() {
        let grant = Rule::from(PolicyRule::new("admin", "role", "add").unwrap());
        let member = Rule::from(RoleAssignment::new("u1", "admin").unwrap());

        let admin = vec!["admin".to_string()];
        assert!(matches_filter(&grant, RuleType::Permission, 0, &admin));
        assert!(!matches_filter(&grant, RuleType::Grouping, 0, &admin));
        assert!(matches_filter(&member, RuleType::Grouping, 1, &admin));
        assert!(!matches_filter(&member, RuleType::Grouping, 0, &admin));

        let both = vec!["role".to_string(), "add".to_string()];
        assert!(matches_filter(&grant, RuleType::Permission, 1, &both));
        assert!(!matches_filter(&grant, RuleType::Permission, 2, &both));
        assert!(!matches_filter(&grant, RuleType::Permission, 0, &[]));
    }
}
