//! Authentication handlers

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::extract::AppJson;
use crate::middleware::auth::Principal;
use crate::models::UserRole;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub role: String, // viewer | editor
    pub exp: usize,   // Expiration timestamp
    pub iat: usize,   // Issued at
}

#[derive(Debug, Deserialize, Validate)]
pub struct DevLoginRequest {
    #[validate(email)]
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub user_role: &'static str,
}

/// Password-less login for local development. Finds or creates the user
/// and returns a token carrying the stored role.
pub async fn dev_login(
    State(state): State<AppState>,
    AppJson(req): AppJson<DevLoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    if !state.config.dev_mode {
        return Err(AppError::NotFound("Not found".to_string()));
    }
    req.validate()?;

    let user = match state.store.find_user_by_email(&req.email).await? {
        Some(user) => user,
        None => {
            let role = UserRole::parse_or_viewer(req.role.as_deref());
            let user = state.store.create_user(&req.email, role).await?;
            tracing::info!("Created dev user {} with role '{}'", user.id, user.role);
            user
        }
    };

    // Rows are constrained to known roles; anything else degrades to viewer
    let role = UserRole::parse_or_viewer(Some(&user.role));
    let access_token = issue_token(
        &user.id.to_string(),
        role,
        &state.config.jwt_secret,
        state.config.access_token_ttl_min,
    )?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

pub async fn me(principal: Principal) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: principal.subject,
        user_role: principal.role.as_str(),
    })
}

/// Sign an HS256 access token valid for `ttl_minutes`.
pub fn issue_token(
    subject: &str,
    role: UserRole,
    secret: &str,
    ttl_minutes: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::minutes(ttl_minutes);

    let claims = Claims {
        sub: subject.to_string(),
        role: role.as_str().to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalError(format!("Failed to sign token: {}", e)))
}
