//! Rule table entity

/// `policy_rules` table: one row per permission (`p`) or grouping (`g`) rule
pub mod policy_rules {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "policy_rules")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub ptype: String,
        pub v0: String,
        pub v1: String,
        pub v2: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
