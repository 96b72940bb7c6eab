use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, from_document, to_document, Document};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::domain::{SellerSummary, User, SELLER_ROLE};
use super::repository::UserRepository;
use crate::listings::mongo::COLLECTION as PROPERTY_COLLECTION;
use crate::store::RepositoryError;

pub const COLLECTION: &str = "users";

/// Persisted user mirror. `_id` is the provider id string, not an ObjectId.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    cart: serde_json::Value,
}

impl From<User> for UserDocument {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
            role: user.role,
            cart: user.cart,
        }
    }
}

impl From<UserDocument> for User {
    fn from(document: UserDocument) -> Self {
        Self {
            id: document.id,
            name: document.name,
            email: document.email,
            avatar_url: document.avatar_url,
            role: document.role,
            cart: document.cart,
        }
    }
}

/// The seller aggregation: match on the role tag, left-join the property
/// collection on owner id, materialize the joined array's length, project
/// away sensitive fields, and sort by name.
pub fn seller_pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": { "role": SELLER_ROLE } },
        doc! { "$lookup": {
            "from": PROPERTY_COLLECTION,
            "localField": "_id",
            "foreignField": "userId",
            "as": "listings",
        } },
        doc! { "$addFields": { "propertyCount": { "$size": "$listings" } } },
        doc! { "$project": { "listings": 0, "email": 0, "cart": 0 } },
        doc! { "$sort": { "name": 1 } },
    ]
}

/// User repository backed by the shared database handle.
pub struct MongoUserRepository {
    collection: Collection<UserDocument>,
}

impl MongoUserRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn upsert(&self, user: User) -> Result<(), RepositoryError> {
        let document = UserDocument::from(user);
        let replacement = to_document(&document)?;
        self.collection
            .update_one(
                doc! { "_id": &document.id },
                doc! { "$set": replacement },
                mongodb::options::UpdateOptions::builder()
                    .upsert(true)
                    .build(),
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), RepositoryError> {
        self.collection.delete_one(doc! { "_id": id }, None).await?;
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let found = self.collection.find_one(doc! { "_id": id }, None).await?;
        Ok(found.map(User::from))
    }

    async fn sellers_with_counts(&self) -> Result<Vec<SellerSummary>, RepositoryError> {
        let cursor = self.collection.aggregate(seller_pipeline(), None).await?;
        let rows: Vec<Document> = cursor.try_collect().await?;

        rows.into_iter()
            .map(|row| from_document::<SellerSummary>(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn sellers_page(
        &self,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<User>, u64), RepositoryError> {
        let predicate = doc! { "role": SELLER_ROLE };
        let total = self
            .collection
            .count_documents(predicate.clone(), None)
            .await?;

        let options = FindOptions::builder()
            .sort(doc! { "name": 1 })
            .skip(skip)
            .limit(limit)
            .build();
        let cursor = self.collection.find(predicate, options).await?;
        let documents: Vec<UserDocument> = cursor.try_collect().await?;

        Ok((documents.into_iter().map(User::from).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_stages_are_ordered_match_lookup_size_project_sort() {
        let pipeline = seller_pipeline();
        assert_eq!(pipeline.len(), 5);

        let keys: Vec<&str> = pipeline
            .iter()
            .map(|stage| stage.keys().next().expect("stage has an operator"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec!["$match", "$lookup", "$addFields", "$project", "$sort"]
        );

        let matcher = pipeline[0].get_document("$match").expect("$match");
        assert_eq!(matcher.get_str("role").expect("role"), SELLER_ROLE);

        let lookup = pipeline[1].get_document("$lookup").expect("$lookup");
        assert_eq!(lookup.get_str("from").expect("from"), "properties");
        assert_eq!(lookup.get_str("foreignField").expect("field"), "userId");

        let project = pipeline[3].get_document("$project").expect("$project");
        assert_eq!(project.get_i32("email").expect("email dropped"), 0);
        assert_eq!(project.get_i32("cart").expect("cart dropped"), 0);
    }

    #[test]
    fn seller_summary_deserializes_a_pipeline_row() {
        let row = doc! {
            "_id": "user_77",
            "name": "Сарнай",
            "avatarUrl": "https://img.example.mn/u/77.png",
            "role": SELLER_ROLE,
            "propertyCount": 4,
        };

        let summary: SellerSummary = from_document(row).expect("row deserializes");
        assert_eq!(summary.id, "user_77");
        assert_eq!(summary.property_count, 4);
    }
}
