//! Domain library for the Khoroolol real-estate listing marketplace.
//!
//! The HTTP surface lives in the `khoroolol-api` service crate; this crate
//! holds the domain services (listings, agents, appointments), the filter
//! and aggregation builders, and the gateways to the document store, the
//! media CDN, and the email provider.

pub mod agents;
pub mod appointments;
pub mod config;
pub mod error;
pub mod identity;
pub mod listings;
pub mod mailer;
pub mod media;
pub mod store;
pub mod telemetry;
