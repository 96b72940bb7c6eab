use std::sync::Arc;

use serde::Serialize;

use super::domain::Property;
use super::filter::ListingFilter;
use super::repository::ListingRepository;
use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 60;

/// Offset pagination request; page numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        Self { page, limit }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of listings plus the totals the pagination UI needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub properties: Vec<Property>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Read side of the property collection: search, list, and single fetch.
pub struct ListingCatalog {
    repository: Arc<dyn ListingRepository>,
}

impl ListingCatalog {
    pub fn new(repository: Arc<dyn ListingRepository>) -> Self {
        Self { repository }
    }

    /// Execute a filter with offset pagination.
    ///
    /// Count and fetch are two separate operations against the same
    /// predicate; under concurrent writes the total and the page may
    /// disagree, which is acceptable for a listing UI.
    pub async fn search(
        &self,
        filter: &ListingFilter,
        request: PageRequest,
    ) -> Result<ListingPage, AppError> {
        let total = self.repository.count(filter).await?;
        let properties = self
            .repository
            .page(filter, request.skip(), i64::from(request.limit()))
            .await?;

        let total_pages = total.div_ceil(u64::from(request.limit())) as u32;

        Ok(ListingPage {
            properties,
            total,
            page: request.page(),
            limit: request.limit(),
            total_pages,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Property, AppError> {
        self.repository
            .fetch(id)
            .await?
            .ok_or(AppError::NotFound("property"))
    }
}
