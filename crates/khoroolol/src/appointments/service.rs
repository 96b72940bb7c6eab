use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::domain::{Appointment, AppointmentRequest, AppointmentStatus};
use super::repository::AppointmentRepository;
use crate::agents::{User, UserRepository};
use crate::error::AppError;
use crate::identity::CallerIdentity;
use crate::listings::{ListingRepository, Property};
use crate::mailer::{EmailMessage, Mailer};

/// Viewer appointment scheduling.
///
/// The seller notification is an explicit asynchronous side-effect: the
/// task is dispatched after the appointment is persisted, delivery errors
/// are logged, and request completion is never gated on it.
pub struct AppointmentScheduler {
    appointments: Arc<dyn AppointmentRepository>,
    listings: Arc<dyn ListingRepository>,
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
}

impl AppointmentScheduler {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        listings: Arc<dyn ListingRepository>,
        users: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            appointments,
            listings,
            users,
            mailer,
        }
    }

    /// Create a pending appointment for the calling buyer.
    pub async fn schedule(
        &self,
        caller: &CallerIdentity,
        request: AppointmentRequest,
    ) -> Result<Appointment, AppError> {
        let property = self
            .listings
            .fetch(&request.property_id)
            .await?
            .ok_or(AppError::NotFound("property"))?;

        let appointment = Appointment {
            id: String::new(),
            property_id: property.id.clone(),
            seller_id: property.user_id.clone(),
            buyer_id: caller.0.clone(),
            scheduled_at: request.scheduled_at,
            message: request.message,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        };

        let stored = self.appointments.insert(appointment).await?;
        self.notify_seller(&property, &stored).await;
        Ok(stored)
    }

    /// Cancel an appointment; only the listing's seller may do this.
    pub async fn cancel(
        &self,
        caller: &CallerIdentity,
        id: &str,
    ) -> Result<Appointment, AppError> {
        let mut appointment = self
            .appointments
            .fetch(id)
            .await?
            .ok_or(AppError::NotFound("appointment"))?;

        if appointment.seller_id != caller.0 {
            return Err(AppError::Forbidden(
                "only the listing's seller may cancel an appointment",
            ));
        }

        appointment.status = AppointmentStatus::Cancelled;
        self.appointments.replace(&appointment).await?;
        Ok(appointment)
    }

    /// The calling seller's incoming appointments, newest first.
    pub async fn for_seller(&self, caller: &CallerIdentity) -> Result<Vec<Appointment>, AppError> {
        Ok(self.appointments.for_seller(&caller.0).await?)
    }

    /// Dispatch the seller notification without gating the request on it.
    async fn notify_seller(&self, property: &Property, appointment: &Appointment) {
        let seller = match self.users.fetch(&appointment.seller_id).await {
            Ok(Some(seller)) if !seller.email.is_empty() => seller,
            Ok(_) => {
                debug!(seller_id = %appointment.seller_id, "no deliverable address for seller, skipping notification");
                return;
            }
            Err(err) => {
                warn!(seller_id = %appointment.seller_id, %err, "seller lookup failed, skipping notification");
                return;
            }
        };

        let message = notification_email(property, appointment, &seller);
        let mailer = Arc::clone(&self.mailer);
        let appointment_id = appointment.id.clone();
        tokio::spawn(async move {
            if let Err(err) = mailer.send(message).await {
                warn!(%appointment_id, %err, "appointment notification failed");
            }
        });
    }
}

/// Render the seller-facing notification for a new appointment.
pub fn notification_email(
    property: &Property,
    appointment: &Appointment,
    seller: &User,
) -> EmailMessage {
    let mut body = format!(
        "Танд шинэ цаг захиалга ирлээ.\n\nЗар: {}\nОгноо: {}\n",
        property.title,
        appointment.scheduled_at.format("%Y-%m-%d %H:%M UTC"),
    );
    if let Some(note) = &appointment.message {
        body.push_str("Захиа: ");
        body.push_str(note);
        body.push('\n');
    }

    EmailMessage {
        to: seller.email.clone(),
        subject: format!("Шинэ цаг захиалга: {}", property.title),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn notification_includes_listing_and_optional_note() {
        let property = crate::listings::repository::testing::property(
            "Нарлаг байр",
            1,
            Utc::now(),
        );
        let appointment = Appointment {
            id: "appt-000001".to_string(),
            property_id: property.id.clone(),
            seller_id: "user_seller".to_string(),
            buyer_id: "user_buyer".to_string(),
            scheduled_at: Utc
                .with_ymd_and_hms(2026, 9, 12, 10, 30, 0)
                .single()
                .expect("valid timestamp"),
            message: Some("Бямба гарагт болох уу?".to_string()),
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        };
        let seller = User {
            id: "user_seller".to_string(),
            name: "Сарнай".to_string(),
            email: "sarnai@example.mn".to_string(),
            avatar_url: None,
            role: Some("seller".to_string()),
            cart: serde_json::Value::Null,
        };

        let message = notification_email(&property, &appointment, &seller);
        assert_eq!(message.to, "sarnai@example.mn");
        assert!(message.subject.contains("Нарлаг байр"));
        assert!(message.body.contains("2026-09-12 10:30"));
        assert!(message.body.contains("Бямба гарагт болох уу?"));
    }
}
