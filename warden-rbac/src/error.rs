//! Error types for access-control operations

use thiserror::Error;

/// Result type for RBAC operations
pub type RbacResult<T> = Result<T, RbacError>;

/// RBAC-specific errors
///
/// Authentication failures (`CredentialInvalid`, `TokenExpired`,
/// `TokenInvalid`, `Unauthenticated`) are kept distinct from authorization
/// failures (`PermissionDenied`) so transports can answer 401 and 403
/// respectively.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RbacError {
    /// Wrong username or password at login
    #[error("Invalid credentials")]
    CredentialInvalid,

    /// No authenticated subject is attached to the request
    #[error("Authentication required")]
    Unauthenticated,

    /// Token is past its expiry
    #[error("Token has expired")]
    TokenExpired,

    /// Token signature, encoding or claims could not be verified
    #[error("Invalid token: {reason}")]
    TokenInvalid { reason: String },

    /// Token lifetime is not usable
    #[error("Invalid token lifetime: {message}")]
    InvalidTtl { message: String },

    /// Subject may not perform the action on the object
    #[error("Permission denied: [{object},{action}]")]
    PermissionDenied { object: String, action: String },

    /// Policy store could not be reached or did not answer in time
    #[error("Policy store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Rule or policy string is malformed
    #[error("Invalid policy rule: {message}")]
    InvalidRule { message: String },

    /// Role not found
    #[error("Role not found: {role_name}")]
    RoleNotFound { role_name: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RbacError {
    /// Create a new permission denied error
    pub fn permission_denied(object: impl Into<String>, action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            object: object.into(),
            action: action.into(),
        }
    }

    /// Create a new store unavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create a new invalid token error
    pub fn token_invalid(reason: impl Into<String>) -> Self {
        Self::TokenInvalid {
            reason: reason.into(),
        }
    }

    /// Create a new invalid rule error
    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Self::InvalidRule {
            message: message.into(),
        }
    }

    /// Create a new invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error means the caller is not (or no longer) authenticated
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::CredentialInvalid
                | Self::Unauthenticated
                | Self::TokenExpired
                | Self::TokenInvalid { .. }
        )
    }

    /// Check if this is a permission denied error
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Check if this is an infrastructure failure of the policy store
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    /// Check if this error was caused by malformed caller input
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidRule { .. } | Self::InvalidTtl { .. })
    }
}

impl From<sea_orm::DbErr> for RbacError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::store_unavailable(err.to_string())
    }
}

impl From<casbin::Error> for RbacError {
    fn from(err: casbin::Error) -> Self {
        match err {
            // Store errors travel through casbin boxed; unwrap them unchanged
            casbin::Error::AdapterError(casbin::error::AdapterError(inner)) => {
                match inner.downcast::<RbacError>() {
                    Ok(err) => *err,
                    Err(other) => Self::store_unavailable(other.to_string()),
                }
            }
            other => Self::internal(format!("policy engine: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_and_authorization_are_distinct() {
        let expired = RbacError::TokenExpired;
        let denied = RbacError::permission_denied("role", "add");

        assert!(expired.is_authentication_failure());
        assert!(!expired.is_permission_denied());
        assert!(denied.is_permission_denied());
        assert!(!denied.is_authentication_failure());
    }

    #[test]
    fn test_permission_denied_message() {
        let err = RbacError::permission_denied("role", "add");
        assert_eq!(err.to_string(), "Permission denied: [role,add]");
    }

    #[test]
    fn test_db_error_becomes_store_unavailable() {
        let err: RbacError = sea_orm::DbErr::Custom("connection reset".to_string()).into();
        assert!(err.is_store_unavailable());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_store_error_survives_casbin_round_trip() {
        let original = RbacError::store_unavailable("disk full");
        let wrapped = casbin::Error::AdapterError(casbin::error::AdapterError(Box::new(original.clone())));
        assert_eq!(RbacError::from(wrapped), original);
    }
}
