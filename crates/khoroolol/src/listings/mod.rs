//! Property listings: search/filter, paginated queries, and owner-scoped
//! mutations.

pub mod domain;
pub mod filter;
pub mod mongo;
pub mod mutation;
pub mod query;
pub mod repository;

pub use domain::{ListingStatus, Property, PropertyDraft, PropertyPatch, PropertyType};
pub use filter::{ListingFilter, SearchParams};
pub use mutation::PropertyMutationService;
pub use query::{ListingCatalog, ListingPage, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use repository::{InMemoryListingRepository, ListingRepository};
