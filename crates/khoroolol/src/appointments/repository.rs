use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::domain::Appointment;
use crate::store::RepositoryError;

/// Storage abstraction over the appointment collection.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Persist a new appointment. The backend assigns the id.
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, RepositoryError>;

    async fn fetch(&self, id: &str) -> Result<Option<Appointment>, RepositoryError>;

    async fn replace(&self, appointment: &Appointment) -> Result<(), RepositoryError>;

    /// A seller's incoming appointments, newest first.
    async fn for_seller(&self, seller_id: &str) -> Result<Vec<Appointment>, RepositoryError>;
}

static APPOINTMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_appointment_id() -> String {
    let id = APPOINTMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("appt-{id:06}")
}

/// In-memory backend for tests and `--in-memory` runs.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    records: Mutex<HashMap<String, Appointment>>,
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert(&self, mut appointment: Appointment) -> Result<Appointment, RepositoryError> {
        appointment.id = next_appointment_id();
        let mut guard = self.records.lock().expect("appointment mutex poisoned");
        guard.insert(appointment.id.clone(), appointment.clone());
        Ok(appointment)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Appointment>, RepositoryError> {
        let guard = self.records.lock().expect("appointment mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn replace(&self, appointment: &Appointment) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("appointment mutex poisoned");
        match guard.get_mut(&appointment.id) {
            Some(stored) => {
                *stored = appointment.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn for_seller(&self, seller_id: &str) -> Result<Vec<Appointment>, RepositoryError> {
        let guard = self.records.lock().expect("appointment mutex poisoned");
        let mut incoming: Vec<Appointment> = guard
            .values()
            .filter(|appointment| appointment.seller_id == seller_id)
            .cloned()
            .collect();
        incoming.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(incoming)
    }
}
