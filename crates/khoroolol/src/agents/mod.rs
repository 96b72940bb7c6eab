//! Agent and seller directory: the mirrored user collection, the
//! identity-provider webhook, and the seller/listing-count aggregation.

pub mod domain;
pub mod mongo;
pub mod repository;
pub mod service;

pub use domain::{AgentCard, AgentProfile, SellerSummary, User, SELLER_ROLE};
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::{AgentDirectory, AgentPage};
