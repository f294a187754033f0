//! Casbin adapter over any [`PolicyStore`]

use async_trait::async_trait;
use casbin::{error::AdapterError, Adapter, Filter, Model, Result as CasbinResult};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::PolicyStore;
use crate::error::{RbacError, RbacResult};
use crate::rules::{Rule, RuleType};

/// Casbin adapter persisting policy lines through a [`PolicyStore`]
///
/// Both the SQL and the in-memory store reach casbin through this type. Write
/// calls answer `true` whenever the store accepted them, duplicates included,
/// so casbin always applies the same change to its model.
#[derive(Clone)]
pub struct StoreAdapter {
    store: Arc<dyn PolicyStore>,
}

impl StoreAdapter {
    /// Create an adapter writing to `store`
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }

    fn rule(ptype: &str, values: &[String]) -> RbacResult<Rule> {
        let rule_type = rule_type(ptype)?;
        Rule::from_values(rule_type, values)
    }

    async fn add_line(&self, ptype: &str, values: &[String]) -> RbacResult<()> {
        let rule = Self::rule(ptype, values)?;
        self.store.add_rule(&rule).await?;
        Ok(())
    }

    async fn remove_line(&self, ptype: &str, values: &[String]) -> RbacResult<()> {
        let rule = Self::rule(ptype, values)?;
        self.store.remove_rule(&rule).await?;
        Ok(())
    }

    /// Every rule held by `model`, in both sections
    fn model_rules(model: &dyn Model) -> RbacResult<BTreeSet<Rule>> {
        let mut rules = BTreeSet::new();
        for rule_type in [RuleType::Permission, RuleType::Grouping] {
            let ptype = rule_type.ptype();
            for values in model.get_policy(ptype, ptype) {
                rules.insert(Rule::from_values(rule_type, &values)?);
            }
        }
        Ok(rules)
    }
}

fn rule_type(ptype: &str) -> RbacResult<RuleType> {
    RuleType::from_ptype(ptype)
        .ok_or_else(|| RbacError::invalid_rule(format!("unknown policy type '{}'", ptype)))
}

fn adapter_error(err: RbacError) -> casbin::Error {
    casbin::Error::AdapterError(AdapterError(Box::new(err)))
}

#[async_trait]
impl Adapter for StoreAdapter {
    async fn load_policy(&mut self, model: &mut dyn Model) -> CasbinResult<()> {
        let rules = self.store.load_all().await.map_err(adapter_error)?;

        for rule in rules {
            let ptype = rule.rule_type().ptype();
            model.add_policy(ptype, ptype, rule.values());
        }

        Ok(())
    }

    async fn load_filtered_policy<'a>(
        &mut self,
        model: &mut dyn Model,
        _filter: Filter<'a>,
    ) -> CasbinResult<()> {
        self.load_policy(model).await
    }

    async fn save_policy(&mut self, model: &mut dyn Model) -> CasbinResult<()> {
        let wanted = Self::model_rules(model).map_err(adapter_error)?;
        let stored = self.store.load_all().await.map_err(adapter_error)?;

        for rule in stored.iter().filter(|rule| !wanted.contains(rule)) {
            self.store.remove_rule(rule).await.map_err(adapter_error)?;
        }
        for rule in &wanted {
            self.store.add_rule(rule).await.map_err(adapter_error)?;
        }

        Ok(())
    }

    async fn clear_policy(&mut self) -> CasbinResult<()> {
        let stored = self.store.load_all().await.map_err(adapter_error)?;
        for rule in &stored {
            self.store.remove_rule(rule).await.map_err(adapter_error)?;
        }
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        false
    }

    async fn add_policy(&mut self, _sec: &str, ptype: &str, rule: Vec<String>) -> CasbinResult<bool> {
        self.add_line(ptype, &rule).await.map_err(adapter_error)?;
        Ok(true)
    }

    async fn add_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: Vec<Vec<String>>,
    ) -> CasbinResult<bool> {
        for rule in &rules {
            self.add_line(ptype, rule).await.map_err(adapter_error)?;
        }
        Ok(true)
    }

    async fn remove_policy(&mut self, _sec: &str, ptype: &str, rule: Vec<String>) -> CasbinResult<bool> {
        self.remove_line(ptype, &rule).await.map_err(adapter_error)?;
        Ok(true)
    }

    async fn remove_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: Vec<Vec<String>>,
    ) -> CasbinResult<bool> {
        for rule in &rules {
            self.remove_line(ptype, rule).await.map_err(adapter_error)?;
        }
        Ok(true)
    }

    async fn remove_filtered_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: Vec<String>,
    ) -> CasbinResult<bool> {
        let rule_type = rule_type(ptype).map_err(adapter_error)?;
        self.store
            .remove_filtered_rules(rule_type, field_index, &field_values)
            .await
            .map_err(adapter_error)?;
        Ok(true)
    }
}
