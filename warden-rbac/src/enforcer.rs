//! RBAC enforcer
//!
//! The enforcer wraps a casbin enforcer whose adapter writes through to the
//! policy store. Every mutation holds the write lock across the store write
//! and the model update, so a reader observes the rule set either fully
//! before or fully after a mutation, and a caller that awaited a mutation
//! always sees it on its next `enforce`.
//!
//! Instances do not talk to each other. Several processes sharing one store
//! stay coherent only through [`Enforcer::reload`] (optionally periodic via
//! [`Enforcer::spawn_reload_task`]).

use casbin::{CoreApi, DefaultRoleManager, MgmtApi, RbacApi, RoleManager as _};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{
    config::RbacConfig,
    error::{RbacError, RbacResult},
    model::{policy_model, MAX_ROLE_DEPTH},
    rules::{PolicyRule, RoleAssignment, Rule, RuleType},
    store::{PolicyStore, StoreAdapter},
};

/// Enforcer for authorization decisions and rule mutations
#[derive(Clone)]
pub struct Enforcer {
    store: Arc<dyn PolicyStore>,
    casbin: Arc<RwLock<casbin::Enforcer>>,
    config: Arc<RbacConfig>,
}

impl std::fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enforcer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Enforcer {
    /// Create an enforcer, loading the full rule set from `store`.
    ///
    /// An empty store is seeded with the configured seed roles first.
    pub async fn new(store: Arc<dyn PolicyStore>, config: RbacConfig) -> RbacResult<Self> {
        let casbin = with_timeout(
            config.store_timeout,
            "load_all",
            open_casbin(store.clone(), config.wildcard_matching),
        )
        .await?;

        let enforcer = Self {
            store,
            casbin: Arc::new(RwLock::new(casbin)),
            config: Arc::new(config),
        };

        let loaded = rule_count(&*enforcer.casbin.read().await);
        if loaded == 0 && !enforcer.config.seed_roles.is_empty() {
            enforcer.initialize_seed_roles().await?;
        }

        info!("Policy model loaded with {} rules", rule_count(&*enforcer.casbin.read().await));
        Ok(enforcer)
    }

    /// Decide whether `subject` may perform `action` on `object`.
    ///
    /// Resolution order: super-user bypass (any role the subject holds
    /// through groupings, transitively), then a permission rule on the
    /// subject or on any of its roles. A subject whose own name equals the
    /// super-user role gets no bypass without a grouping; callers that carry
    /// a resolved role check it with [`is_super_user`](Self::is_super_user).
    pub async fn enforce(&self, subject: &str, object: &str, action: &str) -> RbacResult<bool> {
        require_request_field("subject", subject)?;
        require_request_field("object", object)?;
        require_request_field("action", action)?;

        let casbin = self.casbin.read().await;

        if let Some(super_user) = self.config.super_user.as_deref() {
            if holds_role(&casbin, subject, super_user) {
                debug!("Allow {} {} {}: super user", subject, object, action);
                return Ok(true);
            }
        }

        let allowed = casbin.enforce((subject, object, action))?;
        debug!(
            "{} {} {} {}",
            if allowed { "Allow" } else { "Deny" },
            subject,
            object,
            action
        );
        Ok(allowed)
    }

    /// Assign `subject` to `role`. Returns `true` if the assignment is new;
    /// repeating a grant is not an error.
    pub async fn grant_role(&self, subject: &str, role: &str) -> RbacResult<bool> {
        let rule = Rule::from(RoleAssignment::new(subject, role)?);
        let added = self.add_rule(rule).await?;
        if added {
            info!("Granted role '{}' to '{}'", role, subject);
        }
        Ok(added)
    }

    /// Remove the assignment of `subject` to `role`. Returns the number of
    /// removed assignments; 0 means there was nothing to revoke.
    pub async fn revoke_role_grouping(&self, subject: &str, role: &str) -> RbacResult<u64> {
        let rule = Rule::from(RoleAssignment::new(subject, role)?);
        let removed = self.remove_rule(rule).await?;
        if removed == 0 {
            debug!("No grouping of '{}' to '{}' to revoke", subject, role);
        } else {
            info!("Revoked role '{}' from '{}'", role, subject);
        }
        Ok(removed)
    }

    /// Allow `subject` (usually a role) to perform `action` on `object`
    pub async fn add_permission(&self, subject: &str, object: &str, action: &str) -> RbacResult<bool> {
        let rule = Rule::from(PolicyRule::new(subject, object, action)?);
        self.add_rule(rule).await
    }

    /// Remove a permission rule. Returns the number of removed rules.
    pub async fn remove_permission(&self, subject: &str, object: &str, action: &str) -> RbacResult<u64> {
        let rule = Rule::from(PolicyRule::new(subject, object, action)?);
        self.remove_rule(rule).await
    }

    /// Write a batch of rules, stopping at the first store failure.
    /// Returns how many of them were new.
    pub async fn add_rules(&self, rules: Vec<Rule>) -> RbacResult<usize> {
        let mut added = 0;
        for rule in rules {
            if self.add_rule(rule).await? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Delete a role: every membership in it, every inheritance it declares
    /// and every permission granted to it. Returns the number of removed rules.
    pub async fn delete_role(&self, role: &str) -> RbacResult<u64> {
        require_request_field("role", role)?;
        let values = vec![role.to_string()];
        let filters = [
            (RuleType::Grouping, 1),
            (RuleType::Grouping, 0),
            (RuleType::Permission, 0),
        ];

        let mut casbin = self.casbin.write().await;
        let mut removed = 0;

        // Each step updates store and model together, so a failure part-way
        // leaves them matching
        for (rule_type, field_index) in filters {
            let matching = filtered_lines(&casbin, rule_type, field_index, &values).len() as u64;
            self.call_store("remove_filtered_rules", async {
                match rule_type {
                    RuleType::Permission => {
                        casbin.remove_filtered_policy(field_index, values.clone()).await?
                    }
                    RuleType::Grouping => {
                        casbin
                            .remove_filtered_grouping_policy(field_index, values.clone())
                            .await?
                    }
                };
                Ok(())
            })
            .await?;
            removed += matching;
        }

        info!("Deleted role '{}' ({} rules removed)", role, removed);
        Ok(removed)
    }

    /// Roles directly assigned to `subject`
    pub async fn roles_for_subject(&self, subject: &str) -> Vec<String> {
        let casbin = self.casbin.read().await;
        let lines = filtered_lines(&casbin, RuleType::Grouping, 0, &[subject.to_string()]);
        sorted_column(lines, 1)
    }

    /// Every role `subject` holds, directly or through inheritance
    pub async fn implicit_roles_for_subject(&self, subject: &str) -> Vec<String> {
        // casbin's role traversal needs exclusive access to the enforcer
        let mut casbin = self.casbin.write().await;
        let mut roles = casbin.get_implicit_roles_for_user(subject, None);
        roles.retain(|role| role.as_str() != subject);
        roles.sort();
        roles.dedup();
        roles
    }

    /// Subjects directly assigned to `role`
    pub async fn subjects_for_role(&self, role: &str) -> Vec<String> {
        let casbin = self.casbin.read().await;
        let lines = filtered_lines(&casbin, RuleType::Grouping, 1, &[role.to_string()]);
        sorted_column(lines, 0)
    }

    /// Whether `subject` holds `role` through one or more groupings
    pub async fn has_role(&self, subject: &str, role: &str) -> bool {
        holds_role(&*self.casbin.read().await, subject, role)
    }

    /// Permission rules attached directly to `subject`
    pub async fn permissions_for_subject(&self, subject: &str) -> Vec<PolicyRule> {
        let casbin = self.casbin.read().await;
        let mut rules: Vec<PolicyRule> =
            filtered_lines(&casbin, RuleType::Permission, 0, &[subject.to_string()])
                .iter()
                .filter_map(|values| match Rule::from_values(RuleType::Permission, values) {
                    Ok(Rule::Permission(rule)) => Some(rule),
                    _ => None,
                })
                .collect();
        rules.sort();
        rules
    }

    /// Snapshot of every rule in the model
    pub async fn rules(&self) -> Vec<Rule> {
        let casbin = self.casbin.read().await;
        let permissions = casbin
            .get_policy()
            .into_iter()
            .map(|values| (RuleType::Permission, values));
        let groupings = casbin
            .get_grouping_policy()
            .into_iter()
            .map(|values| (RuleType::Grouping, values));

        let mut rules: Vec<Rule> = permissions
            .chain(groupings)
            .filter_map(|(rule_type, values)| Rule::from_values(rule_type, &values).ok())
            .collect();
        rules.sort();
        rules
    }

    /// Rebuild the model from the store. Returns the number of loaded rules.
    ///
    /// The current model keeps serving until the new one is fully loaded; a
    /// failed reload leaves it in place.
    pub async fn reload(&self) -> RbacResult<usize> {
        let mut casbin = self.casbin.write().await;
        let fresh = self
            .call_store(
                "load_all",
                open_casbin(self.store.clone(), self.config.wildcard_matching),
            )
            .await?;
        *casbin = fresh;

        let loaded = rule_count(&casbin);
        debug!("Policy model reloaded with {} rules", loaded);
        Ok(loaded)
    }

    /// Reload the model every `interval` until the returned task is aborted.
    ///
    /// Failed reloads are logged and retried on the next tick; the previous
    /// model stays in place meanwhile.
    pub fn spawn_reload_task(&self, interval: Duration) -> JoinHandle<()> {
        let enforcer = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; the model is fresh at this point
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = enforcer.reload().await {
                    error!("Periodic policy reload failed: {}", e);
                }
            }
        })
    }

    /// Start the periodic reload if the configuration asks for one
    pub fn spawn_configured_reload(&self) -> Option<JoinHandle<()>> {
        let interval = self.config.reload_interval?;
        info!("Reloading policy model every {:?}", interval);
        Some(self.spawn_reload_task(interval))
    }

    /// Whether `role` is the configured super-user role
    pub fn is_super_user(&self, role: &str) -> bool {
        self.config.is_super_user(role)
    }

    /// Active configuration
    pub fn config(&self) -> &RbacConfig {
        &self.config
    }

    async fn add_rule(&self, rule: Rule) -> RbacResult<bool> {
        let mut casbin = self.casbin.write().await;
        let values = rule.values();
        self.call_store("add_rule", async {
            let added = match rule.rule_type() {
                RuleType::Permission => casbin.add_policy(values).await?,
                RuleType::Grouping => casbin.add_grouping_policy(values).await?,
            };
            Ok(added)
        })
        .await
    }

    async fn remove_rule(&self, rule: Rule) -> RbacResult<u64> {
        let mut casbin = self.casbin.write().await;
        let values = rule.values();
        self.call_store("remove_rule", async {
            let removed = match rule.rule_type() {
                RuleType::Permission => casbin.remove_policy(values).await?,
                RuleType::Grouping => casbin.remove_grouping_policy(values).await?,
            };
            Ok(u64::from(removed))
        })
        .await
    }

    /// Write seed rules to an empty store
    async fn initialize_seed_roles(&self) -> RbacResult<()> {
        let rules = self.config.seed_rules()?;
        let count = rules.len();
        self.add_rules(rules).await?;
        info!(
            "Seeded {} roles ({} rules) into empty policy store",
            self.config.seed_roles.len(),
            count
        );
        Ok(())
    }

    /// Run a store call under the configured timeout
    async fn call_store<T>(
        &self,
        operation: &str,
        call: impl Future<Output = RbacResult<T>>,
    ) -> RbacResult<T> {
        with_timeout(self.config.store_timeout, operation, call).await
    }
}

/// Build a casbin enforcer over `store` and load every rule into it
async fn open_casbin(store: Arc<dyn PolicyStore>, wildcard_matching: bool) -> RbacResult<casbin::Enforcer> {
    let model = policy_model(wildcard_matching).await?;
    let mut casbin = casbin::Enforcer::new(model, StoreAdapter::new(store)).await?;

    // Deep role chains; the default manager stops after ten levels
    casbin.set_role_manager(Arc::new(parking_lot::RwLock::new(DefaultRoleManager::new(
        MAX_ROLE_DEPTH,
    ))))?;
    casbin.load_policy().await?;

    Ok(casbin)
}

async fn with_timeout<T>(
    timeout: Duration,
    operation: &str,
    call: impl Future<Output = RbacResult<T>>,
) -> RbacResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!("Policy store {} failed: {}", operation, e);
            Err(e)
        }
        Err(_) => {
            error!("Policy store {} timed out after {:?}", operation, timeout);
            Err(RbacError::store_unavailable(format!(
                "{} timed out after {:?}",
                operation, timeout
            )))
        }
    }
}

/// Whether `subject` reaches `role` through one or more groupings
fn holds_role(casbin: &casbin::Enforcer, subject: &str, role: &str) -> bool {
    let role_manager = casbin.get_role_manager();
    let mut role_manager = role_manager.write();
    let direct = role_manager.get_roles(subject, None);
    direct
        .iter()
        .any(|held| held.as_str() == role || role_manager.has_link(held, role, None))
}

fn filtered_lines(
    casbin: &casbin::Enforcer,
    rule_type: RuleType,
    field_index: usize,
    values: &[String],
) -> Vec<Vec<String>> {
    match rule_type {
        RuleType::Permission => casbin.get_filtered_policy(field_index, values.to_vec()),
        RuleType::Grouping => casbin.get_filtered_grouping_policy(field_index, values.to_vec()),
    }
}

fn sorted_column(lines: Vec<Vec<String>>, column: usize) -> Vec<String> {
    let mut values: Vec<String> = lines
        .into_iter()
        .filter_map(|mut line| (column < line.len()).then(|| line.swap_remove(column)))
        .collect();
    values.sort();
    values
}

fn rule_count(casbin: &casbin::Enforcer) -> usize {
    casbin.get_policy().len() + casbin.get_grouping_policy().len()
}

fn require_request_field(field: &str, value: &str) -> RbacResult<()> {
    if value.is_empty() {
        return Err(RbacError::invalid_rule(format!("{} cannot be empty", field)));
    }
    Ok(())
}
