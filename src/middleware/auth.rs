//! Authentication middleware

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::header::AUTHORIZATION,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{AppState, AppError};
use crate::handlers::auth::Claims;
use crate::models::UserRole;

/// Caller identity extracted from the access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub role: UserRole,
}

impl Principal {
    pub fn can_read(&self) -> bool {
        matches!(self.role, UserRole::Viewer | UserRole::Editor)
    }

    pub fn can_write(&self) -> bool {
        self.role == UserRole::Editor
    }
}

/// RBAC: any recognised role may read
pub fn require_reader(principal: &Principal) -> Result<(), AppError> {
    if !principal.can_read() {
        tracing::warn!("Read denied for {} with role '{}'", principal.subject, principal.role.as_str());
        return Err(AppError::Forbidden("Viewer or editor role required".to_string()));
    }
    Ok(())
}

/// RBAC: mutations need the editor role
pub fn require_editor(principal: &Principal) -> Result<(), AppError> {
    if !principal.can_write() {
        tracing::warn!(
            "Editor required but {} has role '{}'",
            principal.subject, principal.role.as_str()
        );
        return Err(AppError::Forbidden("Editor role required".to_string()));
    }
    Ok(())
}

/// Middleware: Require a valid bearer JWT
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)?;
    let principal = decode_principal(token, &state.config.jwt_secret)?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Decode and verify a token. Signature or expiry failures are 401; a
/// well-formed token carrying an unknown role is 403.
pub fn decode_principal(token: &str, secret: &str) -> Result<Principal, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    let claims = token_data.claims;
    if claims.sub.is_empty() {
        return Err(AppError::TokenInvalid);
    }

    let role = UserRole::parse(&claims.role).ok_or_else(|| {
        tracing::warn!("Token for {} carries unknown role '{}'", claims.sub, claims.role);
        AppError::Forbidden("Unknown role".to_string())
    })?;

    Ok(Principal { subject: claims.sub, role })
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Result<&str, AppError> {
    let auth_header = req.headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AppError::Unauthorized)?;

    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    Ok(token)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
