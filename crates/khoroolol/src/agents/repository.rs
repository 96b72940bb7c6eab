use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::domain::{SellerSummary, User};
use crate::listings::ListingRepository;
use crate::store::RepositoryError;

/// Storage abstraction over the mirrored user collection.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert or overwrite the mirror for one provider account.
    async fn upsert(&self, user: User) -> Result<(), RepositoryError>;

    /// Drop the mirror. Idempotent: removing an unknown id is fine, the
    /// provider may replay deletion events.
    async fn remove(&self, id: &str) -> Result<(), RepositoryError>;

    async fn fetch(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    /// Sellers annotated with listing counts, sorted by name ascending.
    /// Unpaginated; bounded by the total seller count.
    async fn sellers_with_counts(&self) -> Result<Vec<SellerSummary>, RepositoryError>;

    /// One page of seller accounts sorted by name, plus the total.
    async fn sellers_page(
        &self,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<User>, u64), RepositoryError>;
}

/// In-memory backend for tests and `--in-memory` runs. Listing counts come
/// from the listing repository by iteration instead of a server-side join.
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
    listings: Arc<dyn ListingRepository>,
}

impl InMemoryUserRepository {
    pub fn new(listings: Arc<dyn ListingRepository>) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            listings,
        }
    }

    fn sellers_by_name(&self) -> Vec<User> {
        let guard = self.users.lock().expect("user mutex poisoned");
        let mut sellers: Vec<User> = guard
            .values()
            .filter(|user| user.is_seller())
            .cloned()
            .collect();
        sellers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        sellers
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn upsert(&self, user: User) -> Result<(), RepositoryError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        guard.insert(user.id.clone(), user);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), RepositoryError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        guard.remove(id);
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn sellers_with_counts(&self) -> Result<Vec<SellerSummary>, RepositoryError> {
        let sellers = self.sellers_by_name();
        let mut summaries = Vec::with_capacity(sellers.len());
        for seller in sellers {
            let property_count = self.listings.count_owned_by(&seller.id).await?;
            summaries.push(SellerSummary {
                id: seller.id,
                name: seller.name,
                avatar_url: seller.avatar_url,
                property_count,
            });
        }
        Ok(summaries)
    }

    async fn sellers_page(
        &self,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<User>, u64), RepositoryError> {
        let sellers = self.sellers_by_name();
        let total = sellers.len() as u64;
        let page = sellers
            .into_iter()
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}
