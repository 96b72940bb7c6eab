use crate::error::AppError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

/// Header installed by the identity proxy in front of this service.
pub const IDENTITY_HEADER: &str = "x-user-id";

/// The authenticated caller, as asserted by the upstream identity provider.
///
/// The raw provider id is the canonical owner identity everywhere: it is
/// what gets stored on properties and appointments and what ownership
/// checks compare against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match value {
            Some(id) => Ok(CallerIdentity(id.to_string())),
            None => Err(AppError::Unauthorized),
        }
    }
}

/// Lifecycle event delivered by the identity provider's webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: IdentityUser,
}

/// User payload carried inside an [`IdentityEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}
