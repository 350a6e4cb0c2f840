use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};

use super::{validate_jwt, Claims, JwtError};

/// One entry of a caller's role sequence, shaped `{ "roles": "<name>" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaim {
    pub roles: String,
}

impl RoleClaim {
    pub fn new(role: impl Into<String>) -> Self {
        Self { roles: role.into() }
    }
}

/// How an admin caller is recognised in the role sequence.
///
/// `LegacyIndex` treats the caller as admin only when the first matching entry
/// sits at position 1. `AnyPosition` accepts a matching entry anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRoleCheck {
    LegacyIndex,
    AnyPosition,
}

impl AdminRoleCheck {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" | "legacy_index" | "index" => Some(AdminRoleCheck::LegacyIndex),
            "any" | "any_position" => Some(AdminRoleCheck::AnyPosition),
            _ => None,
        }
    }
}

/// Authenticated caller resolved for the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub roles: Vec<RoleClaim>,
}

impl UserProfile {
    /// Position of the first role entry equal to `role`
    pub fn role_position(&self, role: &str) -> Option<usize> {
        self.roles.iter().position(|claim| claim.roles == role)
    }

    pub fn is_admin(&self, admin_role: &str, check: AdminRoleCheck) -> bool {
        let position = self.role_position(admin_role);
        match check {
            AdminRoleCheck::LegacyIndex => position == Some(1),
            AdminRoleCheck::AnyPosition => position.is_some(),
        }
    }
}

impl From<Claims> for UserProfile {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name,
            roles: claims.roles,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidHeader,
    #[error("Authorization header must use Bearer token format")]
    UnsupportedScheme,
    #[error("Empty JWT token")]
    EmptyToken,
    #[error(transparent)]
    Token(#[from] JwtError),
}

/// Resolves the caller of a request from its headers
#[async_trait]
pub trait CurrentUserProvider: Send + Sync {
    async fn current_user(&self, headers: &HeaderMap) -> Result<UserProfile, AuthError>;
}

/// Bearer-token provider backed by HS256 JWTs
pub struct JwtUserProvider {
    secret: String,
}

impl JwtUserProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
        let auth_header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
        let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidHeader)?;

        let token = auth_str.strip_prefix("Bearer ").ok_or(AuthError::UnsupportedScheme)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(token)
    }
}

#[async_trait]
impl CurrentUserProvider for JwtUserProvider {
    async fn current_user(&self, headers: &HeaderMap) -> Result<UserProfile, AuthError> {
        let token = Self::bearer_token(headers)?;
        let claims = validate_jwt(token, &self.secret)?;
        Ok(UserProfile::from(claims))
    }
}
