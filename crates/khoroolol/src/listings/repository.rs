use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::domain::Property;
use super::filter::ListingFilter;
use crate::store::RepositoryError;

/// Storage abstraction over the property collection so the query and
/// mutation services can be exercised without a live document store.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Persist a new listing. The backend assigns the id.
    async fn insert(&self, property: Property) -> Result<Property, RepositoryError>;

    async fn fetch(&self, id: &str) -> Result<Option<Property>, RepositoryError>;

    /// One page of matches, sorted by creation time descending.
    async fn page(
        &self,
        filter: &ListingFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Property>, RepositoryError>;

    /// Total matches for the same predicate. Runs separately from [`page`];
    /// the two are not a snapshot under concurrent writes.
    ///
    /// [`page`]: ListingRepository::page
    async fn count(&self, filter: &ListingFilter) -> Result<u64, RepositoryError>;

    /// Everything owned by one account, newest first.
    async fn owned_by(&self, user_id: &str) -> Result<Vec<Property>, RepositoryError>;

    async fn count_owned_by(&self, user_id: &str) -> Result<u64, RepositoryError>;

    /// Replace a stored listing wholesale (single-document write).
    async fn replace(&self, property: &Property) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}

static LISTING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_listing_id() -> String {
    let id = LISTING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("prop-{id:06}")
}

/// In-memory backend for tests and `--in-memory` runs.
#[derive(Default)]
pub struct InMemoryListingRepository {
    records: Mutex<HashMap<String, Property>>,
}

impl InMemoryListingRepository {
    fn sorted_matches(&self, filter: &ListingFilter) -> Vec<Property> {
        let guard = self.records.lock().expect("listing mutex poisoned");
        let mut matches: Vec<Property> = guard
            .values()
            .filter(|property| filter.matches(property))
            .cloned()
            .collect();
        // id breaks ties so pagination stays deterministic.
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        matches
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn insert(&self, mut property: Property) -> Result<Property, RepositoryError> {
        property.id = next_listing_id();
        let mut guard = self.records.lock().expect("listing mutex poisoned");
        guard.insert(property.id.clone(), property.clone());
        Ok(property)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Property>, RepositoryError> {
        let guard = self.records.lock().expect("listing mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn page(
        &self,
        filter: &ListingFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Property>, RepositoryError> {
        let matches = self.sorted_matches(filter);
        Ok(matches
            .into_iter()
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, filter: &ListingFilter) -> Result<u64, RepositoryError> {
        Ok(self.sorted_matches(filter).len() as u64)
    }

    async fn owned_by(&self, user_id: &str) -> Result<Vec<Property>, RepositoryError> {
        let guard = self.records.lock().expect("listing mutex poisoned");
        let mut owned: Vec<Property> = guard
            .values()
            .filter(|property| property.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(owned)
    }

    async fn count_owned_by(&self, user_id: &str) -> Result<u64, RepositoryError> {
        let guard = self.records.lock().expect("listing mutex poisoned");
        Ok(guard
            .values()
            .filter(|property| property.user_id == user_id)
            .count() as u64)
    }

    async fn replace(&self, property: &Property) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("listing mutex poisoned");
        match guard.get_mut(&property.id) {
            Some(stored) => {
                *stored = property.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("listing mutex poisoned");
        match guard.remove(id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, Utc};

    use crate::listings::domain::{ListingStatus, Property, PropertyType};

    /// Minimal listing literal for repository and service tests.
    pub(crate) fn property(title: &str, price: i64, created_at: DateTime<Utc>) -> Property {
        Property {
            id: String::new(),
            title: title.to_string(),
            description: String::new(),
            address: String::new(),
            district: "Баянзүрх".to_string(),
            khoroo: "1".to_string(),
            property_type: PropertyType::Apartment,
            status: ListingStatus::ForSale,
            price,
            area: 60.0,
            rooms: Some(2),
            floor: Some(4),
            near_school: false,
            near_playground: false,
            loan_eligible: false,
            barter_eligible: false,
            leasing_eligible: false,
            images: vec!["a.jpg".to_string()],
            videos: Vec::new(),
            user_id: "user_1".to_string(),
            created_at,
        }
    }
}
