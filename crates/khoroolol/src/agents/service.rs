use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::domain::{AgentCard, AgentProfile, SellerSummary, User};
use super::repository::UserRepository;
use crate::error::AppError;
use crate::identity::IdentityEvent;
use crate::listings::{ListingRepository, PageRequest};

/// One page of the public agent directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPage {
    pub agents: Vec<AgentCard>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Read-side services over the mirrored user collection, plus the webhook
/// that keeps it in sync with the identity provider.
pub struct AgentDirectory {
    users: Arc<dyn UserRepository>,
    listings: Arc<dyn ListingRepository>,
}

impl AgentDirectory {
    pub fn new(users: Arc<dyn UserRepository>, listings: Arc<dyn ListingRepository>) -> Self {
        Self { users, listings }
    }

    /// Sellers with their listing counts, for the landing page.
    pub async fn seller_directory(&self) -> Result<Vec<SellerSummary>, AppError> {
        Ok(self.users.sellers_with_counts().await?)
    }

    /// Paginated public agent list.
    pub async fn agent_directory(&self, request: PageRequest) -> Result<AgentPage, AppError> {
        let (users, total) = self
            .users
            .sellers_page(request.skip(), i64::from(request.limit()))
            .await?;

        Ok(AgentPage {
            agents: users.iter().map(AgentCard::from).collect(),
            total,
            page: request.page(),
            total_pages: total.div_ceil(u64::from(request.limit())) as u32,
        })
    }

    /// One agent plus their listings.
    ///
    /// Two queries joined here in the service; the pair is not a
    /// transactional read and may observe a write between them.
    pub async fn agent_profile(&self, id: &str) -> Result<AgentProfile, AppError> {
        let user = self
            .users
            .fetch(id)
            .await?
            .ok_or(AppError::NotFound("agent"))?;
        let properties = self.listings.owned_by(&user.id).await?;

        Ok(AgentProfile {
            agent: AgentCard::from(&user),
            properties,
        })
    }

    /// Apply one identity-provider lifecycle event to the mirror.
    pub async fn apply_event(&self, event: IdentityEvent) -> Result<(), AppError> {
        match event.kind.as_str() {
            "user.created" | "user.updated" => {
                let user = User::from_event(event.data);
                info!(user_id = %user.id, kind = %event.kind, "mirroring identity event");
                self.users.upsert(user).await?;
            }
            "user.deleted" => {
                info!(user_id = %event.data.id, "removing identity mirror");
                self.users.remove(&event.data.id).await?;
            }
            other => {
                // Acknowledged so the provider stops retrying.
                debug!(kind = %other, "ignoring unrecognized identity event");
            }
        }
        Ok(())
    }
}
