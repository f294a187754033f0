//! Role-based access control for Warden
//!
//! This crate provides:
//! - A persistent policy store with SQL and in-memory backends
//! - The casbin model and the enforcer answering `(subject, object, action)`
//!   decisions with transitive role resolution
//! - Signed identity tokens and an access guard for protected operations

pub mod config;
pub mod enforcer;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod model;
pub mod roles;
pub mod rules;
pub mod store;
pub mod token;

pub use config::RbacConfig;
pub use enforcer::Enforcer;
pub use error::{RbacError, RbacResult};
pub use guard::{AccessGuard, AuthContext};
pub use middleware::{authenticate, require_access};
pub use roles::RoleManager;
pub use rules::{parse_policy, PolicyRule, RoleAssignment, Rule, RuleType, WILDCARD};
pub use store::{MemoryPolicyStore, PolicyStore, SeaOrmPolicyStore, StoreAdapter};
pub use token::{TokenClaims, TokenService};
