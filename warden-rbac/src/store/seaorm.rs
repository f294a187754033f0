//! SeaORM adapter for policy storage

use async_trait::async_trait;
use sea_orm::{
    sea_query::{Index, OnConflict},
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Schema, Set,
};
use tracing::{debug, info};
use warden_config::DatabaseConfig;

use super::entity::policy_rules::{self, Column, Entity as PolicyRules};
use super::PolicyStore;
use crate::error::{RbacError, RbacResult};
use crate::rules::{Rule, RuleType};

const UNIQUE_RULE_INDEX: &str = "idx_policy_rules_unique";

/// SeaORM-backed policy store
#[derive(Clone)]
pub struct SeaOrmPolicyStore {
    db: DatabaseConnection,
}

impl SeaOrmPolicyStore {
    /// Wrap an existing connection. The schema is not touched; call
    /// [`ensure_schema`](Self::ensure_schema) for fresh databases.
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connect using the database configuration and create the rule table if needed
    pub async fn connect(config: &DatabaseConfig) -> RbacResult<Self> {
        info!("Connecting policy store: {}", config.url);

        let mut opts = ConnectOptions::new(config.url.clone());
        opts.max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(config.connection_timeout)
            .acquire_timeout(config.connection_timeout)
            .sqlx_logging(false);

        let db = Database::connect(opts).await?;
        let store = Self::new(db);
        store.ensure_schema().await?;

        debug!(
            "Policy store ready with {} max connections",
            config.max_connections
        );
        Ok(store)
    }

    /// Create the rule table if it does not exist.
    ///
    /// The uniqueness constraint is part of the `CREATE TABLE` statement, so
    /// every pooled connection that can see the table also sees the constraint
    /// that `ON CONFLICT` inserts depend on.
    pub async fn ensure_schema(&self) -> RbacResult<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(PolicyRules);
        table.if_not_exists().index(
            Index::create()
                .name(UNIQUE_RULE_INDEX)
                .col(Column::Ptype)
                .col(Column::V0)
                .col(Column::V1)
                .col(Column::V2)
                .unique(),
        );
        self.db.execute(backend.build(&table)).await?;

        Ok(())
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn field_column(index: usize) -> Option<Column> {
        match index {
            0 => Some(Column::V0),
            1 => Some(Column::V1),
            2 => Some(Column::V2),
            _ => None,
        }
    }
}

#[async_trait]
impl PolicyStore for SeaOrmPolicyStore {
    async fn add_rule(&self, rule: &Rule) -> RbacResult<bool> {
        let [v0, v1, v2] = rule.fields();
        let row = policy_rules::ActiveModel {
            ptype: Set(rule.rule_type().ptype().to_string()),
            v0: Set(v0.to_string()),
            v1: Set(v1.to_string()),
            v2: Set(v2.to_string()),
            ..Default::default()
        };

        let inserted = PolicyRules::insert(row)
            .on_conflict(
                OnConflict::columns([Column::Ptype, Column::V0, Column::V1, Column::V2])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted > 0)
    }

    async fn remove_rule(&self, rule: &Rule) -> RbacResult<u64> {
        let [v0, v1, v2] = rule.fields();
        let result = PolicyRules::delete_many()
            .filter(Column::Ptype.eq(rule.rule_type().ptype()))
            .filter(Column::V0.eq(v0))
            .filter(Column::V1.eq(v1))
            .filter(Column::V2.eq(v2))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn remove_filtered_rules(
        &self,
        rule_type: RuleType,
        field_index: usize,
        field_values: &[String],
    ) -> RbacResult<u64> {
        if field_values.is_empty() {
            return Ok(0);
        }

        let mut query = PolicyRules::delete_many().filter(Column::Ptype.eq(rule_type.ptype()));
        for (i, value) in field_values.iter().enumerate() {
            let column = Self::field_column(field_index + i).ok_or_else(|| {
                RbacError::invalid_rule(format!("field index {} out of range", field_index + i))
            })?;
            query = query.filter(column.eq(value.as_str()));
        }

        let result = query.exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    async fn load_all(&self) -> RbacResult<Vec<Rule>> {
        let rows = PolicyRules::find().all(&self.db).await?;

        rows.into_iter()
            .map(|row| {
                Rule::from_fields(&row.ptype, &row.v0, &row.v1, &row.v2).map_err(|e| {
                    RbacError::internal(format!("corrupt policy row {}: {}", row.id, e))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{PolicyRule, RoleAssignment};
    use std::time::Duration;

    async fn memory_store() -> SeaOrmPolicyStore {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            connection_timeout: Duration::from_secs(5),
            store_timeout: Duration::from_secs(5),
        };
        SeaOrmPolicyStore::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_rule_is_idempotent() {
        let store = memory_store().await;
        let rule = Rule::from(PolicyRule::new("admin", "role", "add").unwrap());

        assert!(store.add_rule(&rule).await.unwrap());
        assert!(!store.add_rule(&rule).await.unwrap());
        assert_eq!(store.load_all().await.unwrap(), vec![rule]);
    }

    #[tokio::test]
    async fn test_remove_rule_counts() {
        let store = memory_store().await;
        let rule = Rule::from(RoleAssignment::new("u1", "admin").unwrap());

        assert_eq!(store.remove_rule(&rule).await.unwrap(), 0);
        store.add_rule(&rule).await.unwrap();
        assert_eq!(store.remove_rule(&rule).await.unwrap(), 1);
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_filtered_rules() {
        let store = memory_store().await;
        for rule in [
            Rule::from(RoleAssignment::new("u1", "admin").unwrap()),
            Rule::from(RoleAssignment::new("u2", "admin").unwrap()),
            Rule::from(RoleAssignment::new("u2", "guest").unwrap()),
        ] {
            store.add_rule(&rule).await.unwrap();
        }

        let removed = store
            .remove_filtered_rules(RuleType::Grouping, 1, &["admin".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.load_all().await.unwrap().len(), 1);

        let err = store
            .remove_filtered_rules(RuleType::Grouping, 3, &["x".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::InvalidRule { .. }));
    }

    #[tokio::test]
    async fn test_ensure_schema_is_repeatable() {
        let store = memory_store().await;
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();
    }

    fn file_config(dir: &tempfile::TempDir) -> DatabaseConfig {
        DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("rules.db").display()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_write_on_fresh_pooled_database() {
        // Default pool size, several sibling connections
        for _ in 0..5 {
            let dir = tempfile::tempdir().unwrap();
            let config = file_config(&dir);
            assert!(config.max_connections > 1);

            let store = SeaOrmPolicyStore::connect(&config).await.unwrap();
            let rule = Rule::from(RoleAssignment::new("u1", "admin").unwrap());
            assert!(store.add_rule(&rule).await.unwrap());
            assert!(!store.add_rule(&rule).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_concurrent_writes_on_fresh_pooled_database() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeaOrmPolicyStore::connect(&file_config(&dir)).await.unwrap();

        let writes = (0..8).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let rule = Rule::from(PolicyRule::new("admin", "report", format!("a{}", i % 4)).unwrap());
                store.add_rule(&rule).await
            })
        });
        for write in writes.collect::<Vec<_>>() {
            write.await.unwrap().unwrap();
        }

        assert_eq!(store.load_all().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_rules_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            max_connections: 2,
            ..file_config(&dir)
        };
        let rule = Rule::from(PolicyRule::new("admin", "role", "del").unwrap());

        {
            let store = SeaOrmPolicyStore::connect(&config).await.unwrap();
            store.add_rule(&rule).await.unwrap();
        }

        let store = SeaOrmPolicyStore::connect(&config).await.unwrap();
        assert_eq!(store.load_all().await.unwrap(), vec![rule]);
    }
}
