//! In-memory policy store

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use super::{matches_filter, PolicyStore};
use crate::error::{RbacError, RbacResult};
use crate::rules::{Rule, RuleType};

/// Policy store backed by a process-local set
///
/// Useful for tests and single-process deployments without durability
/// requirements. The store can be taken offline or slowed down to exercise
/// the failure paths of its callers.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    rules: RwLock<BTreeSet<Rule>>,
    offline: AtomicBool,
    latency: Option<Duration>,
}

impl MemoryPolicyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with rules
    pub fn with_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: RwLock::new(rules.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every subsequent call fail (or succeed again) with `StoreUnavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of rules currently held
    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    /// Whether the store holds no rules
    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }

    async fn ready(&self) -> RbacResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RbacError::store_unavailable("memory store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn add_rule(&self, rule: &Rule) -> RbacResult<bool> {
        self.ready().await?;
        Ok(self.rules.write().await.insert(rule.clone()))
    }

    async fn remove_rule(&self, rule: &Rule) -> RbacResult<u64> {
        self.ready().await?;
        Ok(u64::from(self.rules.write().await.remove(rule)))
    }

    async fn remove_filtered_rules(
        &self,
        rule_type: RuleType,
        field_index: usize,
        field_values: &[String],
    ) -> RbacResult<u64> {
        self.ready().await?;
        let mut rules = self.rules.write().await;
        let before = rules.len();
        rules.retain(|rule| !matches_filter(rule, rule_type, field_index, field_values));
        Ok((before - rules.len()) as u64)
    }

    async fn load_all(&self) -> RbacResult<Vec<Rule>> {
        self.ready().await?;
        Ok(self.rules.read().await.iter().cloned().collect())
    }
}
