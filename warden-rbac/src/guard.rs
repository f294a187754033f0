//! Access guard for protected operations

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{
    enforcer::Enforcer,
    error::{RbacError, RbacResult},
    rules::parse_policy,
    token::TokenService,
};

/// An already-authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Subject resolved from a verified token
    pub subject: String,

    /// Primary role from the caller's user record, if known
    pub role: Option<String>,
}

impl AuthContext {
    /// Create a context for `subject` with no primary role
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: None,
        }
    }

    /// Set the primary role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// A reusable permission check bound to one `(object, action)` pair.
///
/// Guards are cheap to clone and hold no per-request state, so one instance
/// can serve any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    enforcer: Enforcer,
    object: String,
    action: String,
}

impl AccessGuard {
    /// Create a guard for `object`/`action`
    pub fn new(enforcer: Enforcer, object: impl Into<String>, action: impl Into<String>) -> RbacResult<Self> {
        let (object, action) = (object.into(), action.into());
        if object.is_empty() || action.is_empty() {
            return Err(RbacError::invalid_rule("guard object and action cannot be empty"));
        }
        Ok(Self {
            enforcer,
            object,
            action,
        })
    }

    /// Create a guard from an `"object,action"` string such as `"role,add"`
    pub fn from_policy(enforcer: Enforcer, policy: &str) -> RbacResult<Self> {
        let (object, action) = parse_policy(policy)?;
        Self::new(enforcer, object, action)
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Check the caller against this guard.
    ///
    /// Any enforcer error is returned as-is and the operation must not run.
    pub async fn check(&self, ctx: &AuthContext) -> RbacResult<()> {
        if let Some(role) = ctx.role.as_deref() {
            if self.enforcer.is_super_user(role) {
                debug!(
                    "Super user '{}' allowed {} {}",
                    ctx.subject, self.object, self.action
                );
                return Ok(());
            }
        }

        if self.enforce(&ctx.subject).await? {
            return Ok(());
        }

        if let Some(role) = ctx.role.as_deref() {
            if role != ctx.subject && self.enforce(role).await? {
                return Ok(());
            }
        }

        warn!(
            "Permission denied: '{}' (role {:?}) may not {} {}",
            ctx.subject, ctx.role, self.action, self.object
        );
        Err(RbacError::permission_denied(&self.object, &self.action))
    }

    /// Resolve the subject from `token`, then check it
    pub async fn check_token(&self, tokens: &TokenService, token: &str) -> RbacResult<AuthContext> {
        let ctx = AuthContext::new(tokens.validate(token)?);
        self.check(&ctx).await?;
        Ok(ctx)
    }

    async fn enforce(&self, subject: &str) -> RbacResult<bool> {
        self.enforcer
            .enforce(subject, &self.object, &self.action)
            .await
            .inspect_err(|e| {
                error!(
                    "Refusing {} {} for '{}': {}",
                    self.action, self.object, subject, e
                )
            })
    }
}
