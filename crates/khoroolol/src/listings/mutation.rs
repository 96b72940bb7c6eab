use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{debug, warn};

use super::domain::{Property, PropertyDraft, PropertyPatch};
use super::repository::ListingRepository;
use crate::error::AppError;
use crate::identity::CallerIdentity;
use crate::media::{public_id_from_url, MediaKind, MediaStore, MediaUpload};

/// Write side of the property collection.
///
/// Every mutation is a single-document write. Media uploads happen before
/// the database write and all-or-nothing: one failed upload aborts the
/// request with nothing persisted. A crash between upload and persist can
/// orphan media at the store; there is no reconciliation job.
pub struct PropertyMutationService {
    repository: Arc<dyn ListingRepository>,
    media: Arc<dyn MediaStore>,
}

impl PropertyMutationService {
    pub fn new(repository: Arc<dyn ListingRepository>, media: Arc<dyn MediaStore>) -> Self {
        Self { repository, media }
    }

    /// Create a listing owned by the caller.
    pub async fn create(
        &self,
        caller: &CallerIdentity,
        draft: PropertyDraft,
        files: Vec<MediaUpload>,
    ) -> Result<Property, AppError> {
        let image_count = files
            .iter()
            .filter(|file| file.kind == MediaKind::Image)
            .count();
        draft.validate(image_count)?;

        let (images, videos) = self.upload_all(files).await?;

        let property = Property {
            id: String::new(),
            title: draft.title,
            description: draft.description,
            address: draft.address,
            district: draft.district,
            khoroo: draft.khoroo,
            property_type: draft.property_type,
            status: draft.status,
            price: draft.price,
            area: draft.area,
            rooms: draft.rooms,
            floor: draft.floor,
            near_school: draft.near_school,
            near_playground: draft.near_playground,
            loan_eligible: draft.loan_eligible,
            barter_eligible: draft.barter_eligible,
            leasing_eligible: draft.leasing_eligible,
            images,
            videos,
            user_id: caller.0.clone(),
            created_at: Utc::now(),
        };

        let stored = self.repository.insert(property).await?;
        Ok(stored)
    }

    /// Partially update a listing the caller owns.
    ///
    /// New media is uploaded first and appended to the existing arrays;
    /// nothing is persisted when any upload fails.
    pub async fn update(
        &self,
        caller: &CallerIdentity,
        id: &str,
        patch: PropertyPatch,
        files: Vec<MediaUpload>,
    ) -> Result<Property, AppError> {
        let mut property = self
            .repository
            .fetch(id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        ensure_owner(&property, caller)?;

        let (images, videos) = self.upload_all(files).await?;

        property.apply(patch);
        property.append_media(images, videos);

        self.repository.replace(&property).await?;
        Ok(property)
    }

    /// Delete a listing the caller owns, dropping its media first.
    pub async fn delete(&self, caller: &CallerIdentity, id: &str) -> Result<(), AppError> {
        let property = self
            .repository
            .fetch(id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        ensure_owner(&property, caller)?;

        // Best effort: a media-store failure must not strand the document.
        let public_ids: Vec<String> = property
            .images
            .iter()
            .chain(property.videos.iter())
            .filter_map(|url| {
                let id = public_id_from_url(url);
                if id.is_none() {
                    debug!(%url, "stored media url does not match the store pattern");
                }
                id
            })
            .collect();

        if !public_ids.is_empty() {
            if let Err(err) = self.media.delete(&public_ids).await {
                warn!(property_id = %property.id, %err, "media cleanup failed, deleting document anyway");
            }
        }

        self.repository.delete(id).await?;
        Ok(())
    }

    /// Upload every file concurrently, preserving submission order per kind.
    async fn upload_all(
        &self,
        files: Vec<MediaUpload>,
    ) -> Result<(Vec<String>, Vec<String>), AppError> {
        let kinds: Vec<MediaKind> = files.iter().map(|file| file.kind).collect();
        let urls = try_join_all(files.into_iter().map(|file| self.media.upload(file))).await?;

        let mut images = Vec::new();
        let mut videos = Vec::new();
        for (kind, url) in kinds.into_iter().zip(urls) {
            match kind {
                MediaKind::Image => images.push(url),
                MediaKind::Video => videos.push(url),
            }
        }
        Ok((images, videos))
    }
}

fn ensure_owner(property: &Property, caller: &CallerIdentity) -> Result<(), AppError> {
    if property.user_id == caller.0 {
        Ok(())
    } else {
        Err(AppError::Forbidden("only the listing owner may modify it"))
    }
}
