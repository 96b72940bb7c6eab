use serde::{Deserialize, Serialize};

use crate::identity::IdentityUser;
use crate::listings::Property;

/// Role tag marking accounts that may publish listings.
pub const SELLER_ROLE: &str = "seller";

/// Mirror of an identity-provider account.
///
/// `id` is the provider's id verbatim; the webhook keeps this collection in
/// sync with the provider's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Opaque cart/metadata bag owned by the UI.
    #[serde(default)]
    pub cart: serde_json::Value,
}

impl User {
    pub fn is_seller(&self) -> bool {
        self.role.as_deref() == Some(SELLER_ROLE)
    }

    /// Build the mirrored account from a webhook payload.
    pub fn from_event(payload: IdentityUser) -> Self {
        Self {
            id: payload.id,
            name: payload.name.unwrap_or_default(),
            email: payload.email.unwrap_or_default(),
            avatar_url: payload.avatar_url,
            role: payload.role,
            cart: serde_json::Value::Null,
        }
    }
}

/// Public card for an agent: sensitive fields projected away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&User> for AgentCard {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// A seller annotated with how many listings they own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub property_count: u64,
}

/// One agent plus their published listings, joined at the application
/// layer (two queries, no transactional read).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub agent: AgentCard,
    pub properties: Vec<Property>,
}
