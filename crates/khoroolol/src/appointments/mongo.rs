use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::domain::{Appointment, AppointmentStatus};
use super::repository::AppointmentRepository;
use crate::store::RepositoryError;

pub const COLLECTION: &str = "appointments";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    property_id: String,
    seller_id: String,
    buyer_id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    scheduled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    status: AppointmentStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
}

impl AppointmentDocument {
    fn from_domain(appointment: &Appointment) -> Result<Self, RepositoryError> {
        let id = if appointment.id.is_empty() {
            ObjectId::new()
        } else {
            ObjectId::parse_str(&appointment.id).map_err(|_| {
                RepositoryError::Malformed(format!(
                    "'{}' is not a valid document id",
                    appointment.id
                ))
            })?
        };

        Ok(Self {
            id,
            property_id: appointment.property_id.clone(),
            seller_id: appointment.seller_id.clone(),
            buyer_id: appointment.buyer_id.clone(),
            scheduled_at: appointment.scheduled_at,
            message: appointment.message.clone(),
            status: appointment.status,
            created_at: appointment.created_at,
        })
    }

    fn into_domain(self) -> Appointment {
        Appointment {
            id: self.id.to_hex(),
            property_id: self.property_id,
            seller_id: self.seller_id,
            buyer_id: self.buyer_id,
            scheduled_at: self.scheduled_at,
            message: self.message,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Appointment repository backed by the shared database handle.
pub struct MongoAppointmentRepository {
    collection: Collection<AppointmentDocument>,
}

impl MongoAppointmentRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl AppointmentRepository for MongoAppointmentRepository {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, RepositoryError> {
        let document = AppointmentDocument::from_domain(&appointment)?;
        self.collection.insert_one(&document, None).await?;
        Ok(document.into_domain())
    }

    async fn fetch(&self, id: &str) -> Result<Option<Appointment>, RepositoryError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        let found = self.collection.find_one(doc! { "_id": oid }, None).await?;
        Ok(found.map(AppointmentDocument::into_domain))
    }

    async fn replace(&self, appointment: &Appointment) -> Result<(), RepositoryError> {
        let document = AppointmentDocument::from_domain(appointment)?;
        let result = self
            .collection
            .replace_one(doc! { "_id": document.id }, &document, None)
            .await?;

        if result.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn for_seller(&self, seller_id: &str) -> Result<Vec<Appointment>, RepositoryError> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .build();
        let cursor = self
            .collection
            .find(doc! { "sellerId": seller_id }, options)
            .await?;
        let documents: Vec<AppointmentDocument> = cursor.try_collect().await?;
        Ok(documents
            .into_iter()
            .map(AppointmentDocument::into_domain)
            .collect())
    }
}
