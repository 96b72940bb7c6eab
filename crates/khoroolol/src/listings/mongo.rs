use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::domain::{ListingStatus, Property, PropertyType};
use super::filter::ListingFilter;
use super::repository::ListingRepository;
use crate::store::RepositoryError;

pub const COLLECTION: &str = "properties";

/// Persisted shape of a listing. Field names match the wire format the
/// original collection was written with (camelCase, `_id`).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    address: String,
    district: String,
    khoroo: String,
    #[serde(rename = "type")]
    property_type: PropertyType,
    status: ListingStatus,
    price: i64,
    area: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    floor: Option<i32>,
    #[serde(default)]
    near_school: bool,
    #[serde(default)]
    near_playground: bool,
    #[serde(default)]
    loan_eligible: bool,
    #[serde(default)]
    barter_eligible: bool,
    #[serde(default)]
    leasing_eligible: bool,
    images: Vec<String>,
    #[serde(default)]
    videos: Vec<String>,
    user_id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
}

impl PropertyDocument {
    fn from_domain(property: &Property) -> Result<Self, RepositoryError> {
        let id = if property.id.is_empty() {
            ObjectId::new()
        } else {
            parse_object_id(&property.id)?
        };

        Ok(Self {
            id,
            title: property.title.clone(),
            description: property.description.clone(),
            address: property.address.clone(),
            district: property.district.clone(),
            khoroo: property.khoroo.clone(),
            property_type: property.property_type,
            status: property.status,
            price: property.price,
            area: property.area,
            rooms: property.rooms,
            floor: property.floor,
            near_school: property.near_school,
            near_playground: property.near_playground,
            loan_eligible: property.loan_eligible,
            barter_eligible: property.barter_eligible,
            leasing_eligible: property.leasing_eligible,
            images: property.images.clone(),
            videos: property.videos.clone(),
            user_id: property.user_id.clone(),
            created_at: property.created_at,
        })
    }

    fn into_domain(self) -> Property {
        Property {
            id: self.id.to_hex(),
            title: self.title,
            description: self.description,
            address: self.address,
            district: self.district,
            khoroo: self.khoroo,
            property_type: self.property_type,
            status: self.status,
            price: self.price,
            area: self.area,
            rooms: self.rooms,
            floor: self.floor,
            near_school: self.near_school,
            near_playground: self.near_playground,
            loan_eligible: self.loan_eligible,
            barter_eligible: self.barter_eligible,
            leasing_eligible: self.leasing_eligible,
            images: self.images,
            videos: self.videos,
            user_id: self.user_id,
            created_at: self.created_at,
        }
    }
}

fn parse_object_id(raw: &str) -> Result<ObjectId, RepositoryError> {
    ObjectId::parse_str(raw)
        .map_err(|_| RepositoryError::Malformed(format!("'{raw}' is not a valid document id")))
}

fn newest_first() -> Document {
    doc! { "createdAt": -1, "_id": -1 }
}

/// Property repository backed by the shared database handle.
pub struct MongoListingRepository {
    collection: Collection<PropertyDocument>,
}

impl MongoListingRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl ListingRepository for MongoListingRepository {
    async fn insert(&self, property: Property) -> Result<Property, RepositoryError> {
        let document = PropertyDocument::from_domain(&property)?;
        self.collection.insert_one(&document, None).await?;
        Ok(document.into_domain())
    }

    async fn fetch(&self, id: &str) -> Result<Option<Property>, RepositoryError> {
        // A malformed path id can never name a document.
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        let found = self.collection.find_one(doc! { "_id": oid }, None).await?;
        Ok(found.map(PropertyDocument::into_domain))
    }

    async fn page(
        &self,
        filter: &ListingFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Property>, RepositoryError> {
        let options = FindOptions::builder()
            .sort(newest_first())
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = self.collection.find(filter.to_document(), options).await?;
        let documents: Vec<PropertyDocument> = cursor.try_collect().await?;
        Ok(documents
            .into_iter()
            .map(PropertyDocument::into_domain)
            .collect())
    }

    async fn count(&self, filter: &ListingFilter) -> Result<u64, RepositoryError> {
        Ok(self
            .collection
            .count_documents(filter.to_document(), None)
            .await?)
    }

    async fn owned_by(&self, user_id: &str) -> Result<Vec<Property>, RepositoryError> {
        let options = FindOptions::builder().sort(newest_first()).build();
        let cursor = self
            .collection
            .find(doc! { "userId": user_id }, options)
            .await?;
        let documents: Vec<PropertyDocument> = cursor.try_collect().await?;
        Ok(documents
            .into_iter()
            .map(PropertyDocument::into_domain)
            .collect())
    }

    async fn count_owned_by(&self, user_id: &str) -> Result<u64, RepositoryError> {
        Ok(self
            .collection
            .count_documents(doc! { "userId": user_id }, None)
            .await?)
    }

    async fn replace(&self, property: &Property) -> Result<(), RepositoryError> {
        let document = PropertyDocument::from_domain(property)?;
        let result = self
            .collection
            .replace_one(doc! { "_id": document.id }, &document, None)
            .await?;

        if result.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let oid = parse_object_id(id)?;
        let result = self.collection.delete_one(doc! { "_id": oid }, None).await?;

        if result.deleted_count == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
