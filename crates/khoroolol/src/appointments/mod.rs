//! Buyer/seller viewing appointments with a non-fatal seller notification.

pub mod domain;
pub mod mongo;
pub mod repository;
pub mod service;

pub use domain::{Appointment, AppointmentRequest, AppointmentStatus};
pub use repository::{AppointmentRepository, InMemoryAppointmentRepository};
pub use service::AppointmentScheduler;
