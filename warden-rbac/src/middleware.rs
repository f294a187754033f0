//! axum integration for the access guard

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::RbacError,
    guard::{AccessGuard, AuthContext},
    token::TokenService,
};

impl RbacError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RbacError::CredentialInvalid
            | RbacError::Unauthenticated
            | RbacError::TokenExpired
            | RbacError::TokenInvalid { .. } => StatusCode::UNAUTHORIZED,
            RbacError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            RbacError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RbacError::InvalidTtl { .. } | RbacError::InvalidRule { .. } => StatusCode::BAD_REQUEST,
            RbacError::RoleNotFound { .. } => StatusCode::NOT_FOUND,
            RbacError::InvalidConfig { .. } | RbacError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            RbacError::CredentialInvalid => "CREDENTIAL_INVALID",
            RbacError::Unauthenticated => "UNAUTHENTICATED",
            RbacError::TokenExpired => "TOKEN_EXPIRED",
            RbacError::TokenInvalid { .. } => "TOKEN_INVALID",
            RbacError::PermissionDenied { .. } => "PERMISSION_DENIED",
            RbacError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            RbacError::InvalidTtl { .. } | RbacError::InvalidRule { .. } => "BAD_REQUEST",
            RbacError::RoleNotFound { .. } => "NOT_FOUND",
            RbacError::InvalidConfig { .. } | RbacError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for RbacError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Infrastructure details stay in the logs
        let message = match &self {
            RbacError::StoreUnavailable { .. } => "Policy store unavailable".to_string(),
            RbacError::InvalidConfig { .. } | RbacError::Internal { .. } => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": message
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Resolve a bearer token into an [`AuthContext`] request extension.
///
/// Requests without an `Authorization` header pass through unchanged so
/// that public routes keep working; guarded routes reject them later.
pub async fn authenticate(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, RbacError> {
    let bearer = match request.headers().get(AUTHORIZATION) {
        Some(header) => Some(
            header
                .to_str()
                .ok()
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(|token| token.trim().to_string())
                .ok_or_else(|| RbacError::token_invalid("malformed authorization header"))?,
        ),
        None => None,
    };

    if let Some(token) = bearer {
        let subject = tokens.validate(&token)?;
        debug!("Authenticated request for '{}'", subject);
        request.extensions_mut().insert(AuthContext::new(subject));
    }

    Ok(next.run(request).await)
}

/// Run `guard` against the request's [`AuthContext`].
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn require_access(
    State(guard): State<AccessGuard>,
    request: Request,
    next: Next,
) -> Result<Response, RbacError> {
    let ctx = request
        .extensions()
        .get::<AuthContext>()
        .ok_or(RbacError::Unauthenticated)?;

    guard.check(ctx).await?;

    Ok(next.run(request).await)
}
