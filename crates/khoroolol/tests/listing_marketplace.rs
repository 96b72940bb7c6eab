//! Integration scenarios for the listing marketplace: publishing and
//! mutating listings through the service facade, browsing the catalog,
//! mirroring identity events, and scheduling viewings.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use khoroolol::agents::{AgentDirectory, InMemoryUserRepository, User, UserRepository};
    use khoroolol::appointments::{AppointmentScheduler, InMemoryAppointmentRepository};
    use khoroolol::listings::{
        InMemoryListingRepository, ListingCatalog, ListingRepository, ListingStatus, Property,
        PropertyDraft, PropertyMutationService, PropertyType,
    };
    use khoroolol::mailer::{Mailer, RecordingMailer};
    use khoroolol::media::{MediaKind, MediaStore, MediaUpload, RecordingMediaStore};

    pub(super) use khoroolol::identity::CallerIdentity;

    pub(super) struct Harness {
        pub(super) listings: Arc<InMemoryListingRepository>,
        pub(super) users: Arc<InMemoryUserRepository>,
        pub(super) media: Arc<RecordingMediaStore>,
        pub(super) mailer: Arc<RecordingMailer>,
        pub(super) catalog: ListingCatalog,
        pub(super) mutations: PropertyMutationService,
        pub(super) agents: AgentDirectory,
        pub(super) appointments: AppointmentScheduler,
    }

    pub(super) fn harness() -> Harness {
        harness_with_media(Arc::new(RecordingMediaStore::default()))
    }

    pub(super) fn harness_with_media(media: Arc<RecordingMediaStore>) -> Harness {
        harness_with(media, Arc::new(RecordingMailer::default()))
    }

    pub(super) fn harness_with(
        media: Arc<RecordingMediaStore>,
        mailer: Arc<RecordingMailer>,
    ) -> Harness {
        let listings = Arc::new(InMemoryListingRepository::default());
        let listings_dyn: Arc<dyn ListingRepository> = listings.clone();
        let users = Arc::new(InMemoryUserRepository::new(listings_dyn.clone()));
        let users_dyn: Arc<dyn UserRepository> = users.clone();
        let appointments = Arc::new(InMemoryAppointmentRepository::default());
        let media_dyn: Arc<dyn MediaStore> = media.clone();
        let mailer_dyn: Arc<dyn Mailer> = mailer.clone();

        Harness {
            catalog: ListingCatalog::new(listings_dyn.clone()),
            mutations: PropertyMutationService::new(listings_dyn.clone(), media_dyn),
            agents: AgentDirectory::new(users_dyn.clone(), listings_dyn.clone()),
            appointments: AppointmentScheduler::new(
                appointments,
                listings_dyn,
                users_dyn,
                mailer_dyn,
            ),
            listings,
            users,
            media,
            mailer,
        }
    }

    pub(super) fn caller(id: &str) -> CallerIdentity {
        CallerIdentity(id.to_string())
    }

    pub(super) fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    pub(super) fn draft(title: &str, price: i64) -> PropertyDraft {
        PropertyDraft {
            title: title.to_string(),
            description: "Нарны хороолол, дулаан байр".to_string(),
            address: "Токиогийн гудамж 12".to_string(),
            district: "Баянзүрх".to_string(),
            khoroo: "14".to_string(),
            property_type: PropertyType::Apartment,
            status: ListingStatus::ForSale,
            price,
            area: 64.5,
            rooms: Some(3),
            floor: Some(5),
            near_school: true,
            near_playground: false,
            loan_eligible: true,
            barter_eligible: false,
            leasing_eligible: false,
        }
    }

    pub(super) fn image(name: &str) -> MediaUpload {
        MediaUpload {
            file_name: name.to_string(),
            kind: MediaKind::Image,
            bytes: vec![0xde, 0xad],
        }
    }

    pub(super) fn video(name: &str) -> MediaUpload {
        MediaUpload {
            file_name: name.to_string(),
            kind: MediaKind::Video,
            bytes: vec![0xbe, 0xef],
        }
    }

    pub(super) fn seller(id: &str, name: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            avatar_url: None,
            role: Some("seller".to_string()),
            cart: serde_json::Value::Null,
        }
    }

    /// Seed a stored listing directly, bypassing media upload.
    pub(super) async fn seed_listing(
        listings: &dyn ListingRepository,
        owner: &str,
        title: &str,
        price: i64,
        minutes_after_base: i64,
    ) -> Property {
        let mut property = Property {
            id: String::new(),
            title: title.to_string(),
            description: String::new(),
            address: String::new(),
            district: "Баянзүрх".to_string(),
            khoroo: "1".to_string(),
            property_type: PropertyType::Apartment,
            status: ListingStatus::ForSale,
            price,
            area: 60.0,
            rooms: Some(2),
            floor: Some(4),
            near_school: false,
            near_playground: false,
            loan_eligible: false,
            barter_eligible: false,
            leasing_eligible: false,
            images: vec![
                "https://cdn.example.com/demo/image/upload/v17/listings/seeded.jpg".to_string(),
            ],
            videos: Vec::new(),
            user_id: owner.to_string(),
            created_at: base_time() + Duration::minutes(minutes_after_base),
        };
        property = listings
            .insert(property)
            .await
            .expect("seed insert succeeds");
        property
    }
}

use std::sync::Arc;

use chrono::Duration;

use khoroolol::agents::UserRepository;
use khoroolol::appointments::{AppointmentRequest, AppointmentStatus};
use khoroolol::error::AppError;
use khoroolol::identity::{IdentityEvent, IdentityUser};
use khoroolol::listings::{ListingFilter, PageRequest, SearchParams};
use khoroolol::media::RecordingMediaStore;

use common::{
    base_time, caller, draft, harness, harness_with, harness_with_media, image, seed_listing,
    seller, video,
};

#[tokio::test]
async fn create_uploads_media_and_publishes_the_listing() {
    let h = harness();
    let created = h
        .mutations
        .create(
            &caller("user_1"),
            draft("Нарны хороолол 3 өрөө", 100_000_000),
            vec![image("front.jpg"), image("kitchen.jpg"), video("tour.mp4")],
        )
        .await
        .expect("create succeeds");

    assert!(created.id.starts_with("prop-"));
    assert_eq!(created.images.len(), 2);
    assert_eq!(created.videos.len(), 1);
    assert!(created.images[0].contains("front"));
    assert!(created.images[1].contains("kitchen"));

    let fetched = h.catalog.get(&created.id).await.expect("listing is stored");
    assert_eq!(fetched, created);
    assert_eq!(h.media.uploaded().len(), 3);
}

#[tokio::test]
async fn create_without_images_fails_and_persists_nothing() {
    let h = harness();
    let err = h
        .mutations
        .create(&caller("user_1"), draft("Зураггүй зар", 50_000_000), vec![])
        .await
        .expect_err("creation requires at least one image");

    assert!(matches!(err, AppError::Validation(_)));
    assert!(h.media.uploaded().is_empty());

    let page = h
        .catalog
        .search(&ListingFilter::default(), PageRequest::default())
        .await
        .expect("search succeeds");
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn upload_failure_aborts_creation() {
    let h = harness_with_media(Arc::new(RecordingMediaStore::failing_uploads()));
    let err = h
        .mutations
        .create(
            &caller("user_1"),
            draft("Орон сууц", 80_000_000),
            vec![image("front.jpg")],
        )
        .await
        .expect_err("upload failure propagates");

    assert!(matches!(err, AppError::Media(_)));
    let page = h
        .catalog
        .search(&ListingFilter::default(), PageRequest::default())
        .await
        .expect("search succeeds");
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn upload_failure_aborts_update_without_persisting() {
    let h = harness_with_media(Arc::new(RecordingMediaStore::failing_uploads()));
    let seeded = seed_listing(h.listings.as_ref(), "user_1", "Хэвээр үлдэх зар", 80_000_000, 0).await;

    let mut patch = khoroolol::listings::PropertyPatch::default();
    patch.price = Some(90_000_000);

    let err = h
        .mutations
        .update(&caller("user_1"), &seeded.id, patch, vec![image("new.jpg")])
        .await
        .expect_err("upload failure propagates");
    assert!(matches!(err, AppError::Media(_)));

    let unchanged = h.catalog.get(&seeded.id).await.expect("still stored");
    assert_eq!(unchanged, seeded);
}

#[tokio::test]
async fn only_the_owner_may_update_or_delete() {
    let h = harness();
    let created = h
        .mutations
        .create(
            &caller("user_1"),
            draft("Эзэмшигчийн зар", 90_000_000),
            vec![image("a.jpg")],
        )
        .await
        .expect("create succeeds");

    let err = h
        .mutations
        .update(
            &caller("user_2"),
            &created.id,
            Default::default(),
            Vec::new(),
        )
        .await
        .expect_err("stranger update is rejected");
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = h
        .mutations
        .delete(&caller("user_2"), &created.id)
        .await
        .expect_err("stranger delete is rejected");
    assert!(matches!(err, AppError::Forbidden(_)));

    let unchanged = h.catalog.get(&created.id).await.expect("still stored");
    assert_eq!(unchanged, created);
}

#[tokio::test]
async fn update_applies_patch_and_appends_media() {
    let h = harness();
    let created = h
        .mutations
        .create(
            &caller("user_1"),
            draft("Хуучин гарчиг", 90_000_000),
            vec![image("a.jpg"), image("b.jpg")],
        )
        .await
        .expect("create succeeds");

    let mut patch = khoroolol::listings::PropertyPatch::default();
    patch.title = Some("Шинэ гарчиг".to_string());
    patch.price = Some(95_000_000);

    let updated = h
        .mutations
        .update(&caller("user_1"), &created.id, patch, vec![image("c.jpg")])
        .await
        .expect("update succeeds");

    assert_eq!(updated.title, "Шинэ гарчиг");
    assert_eq!(updated.price, 95_000_000);
    assert_eq!(updated.images.len(), 3);
    assert_eq!(updated.images[..2], created.images[..]);
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn delete_removes_the_listing_and_requests_media_cleanup() {
    let h = harness();
    let created = h
        .mutations
        .create(
            &caller("user_1"),
            draft("Устгах зар", 70_000_000),
            vec![image("front.jpg")],
        )
        .await
        .expect("create succeeds");

    h.mutations
        .delete(&caller("user_1"), &created.id)
        .await
        .expect("delete succeeds");

    let err = h
        .catalog
        .get(&created.id)
        .await
        .expect_err("listing is gone");
    assert!(matches!(err, AppError::NotFound(_)));

    let deleted = h.media.deleted();
    assert_eq!(deleted.len(), 1);
    assert!(deleted[0].starts_with("listings/front"));
}

#[tokio::test]
async fn media_delete_failure_does_not_strand_the_document() {
    let h = harness_with_media(Arc::new(RecordingMediaStore::failing_deletes()));
    let created = h
        .mutations
        .create(
            &caller("user_1"),
            draft("Устгах зар", 70_000_000),
            vec![image("front.jpg")],
        )
        .await
        .expect("create succeeds");

    h.mutations
        .delete(&caller("user_1"), &created.id)
        .await
        .expect("document deletion survives media-store failure");

    let err = h
        .catalog
        .get(&created.id)
        .await
        .expect_err("listing is gone");
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(h.media.deleted().is_empty());
}

#[tokio::test]
async fn search_honors_the_price_range() {
    let h = harness();
    for (i, price) in [40_000_000i64, 60_000_000, 120_000_000, 200_000_000]
        .into_iter()
        .enumerate()
    {
        seed_listing(
            h.listings.as_ref(),
            "user_1",
            &format!("Зар {price}"),
            price,
            i as i64,
        )
        .await;
    }

    let mut query = std::collections::HashMap::new();
    query.insert("minPrice".to_string(), "50000000".to_string());
    query.insert("maxPrice".to_string(), "150000000".to_string());
    let filter = ListingFilter::from_params(&SearchParams::from_query(&query));

    let page = h
        .catalog
        .search(&filter, PageRequest::default())
        .await
        .expect("search succeeds");

    assert_eq!(page.total, 2);
    let prices: Vec<i64> = page.properties.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![120_000_000, 60_000_000]);
}

#[tokio::test]
async fn catalog_paginates_newest_first() {
    let h = harness();
    for i in 0..15 {
        seed_listing(
            h.listings.as_ref(),
            "user_1",
            &format!("Зар {i:02}"),
            50_000_000,
            i,
        )
        .await;
    }

    let first = h
        .catalog
        .search(&ListingFilter::default(), PageRequest::new(Some(1), None))
        .await
        .expect("first page");
    assert_eq!(first.total, 15);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.properties.len(), 12);
    assert_eq!(first.properties[0].title, "Зар 14");

    let second = h
        .catalog
        .search(&ListingFilter::default(), PageRequest::new(Some(2), None))
        .await
        .expect("second page");
    assert_eq!(second.properties.len(), 3);

    // Concatenated pages cover every listing exactly once, newest first.
    let titles: Vec<String> = first
        .properties
        .iter()
        .chain(second.properties.iter())
        .map(|p| p.title.clone())
        .collect();
    let expected: Vec<String> = (0..15).rev().map(|i| format!("Зар {i:02}")).collect();
    assert_eq!(titles, expected);
}

#[tokio::test]
async fn identity_events_drive_the_agent_directory() {
    let h = harness();

    for (id, name, role) in [
        ("user_10", "Болд", Some("seller")),
        ("user_11", "Алимаа", Some("seller")),
        ("user_12", "Дорж", None),
    ] {
        h.agents
            .apply_event(IdentityEvent {
                kind: "user.created".to_string(),
                data: IdentityUser {
                    id: id.to_string(),
                    name: Some(name.to_string()),
                    email: Some(format!("{id}@example.mn")),
                    avatar_url: None,
                    role: role.map(str::to_string),
                },
            })
            .await
            .expect("event applies");
    }

    seed_listing(h.listings.as_ref(), "user_10", "Болдын зар", 55_000_000, 0).await;
    seed_listing(h.listings.as_ref(), "user_10", "Болдын зар 2", 65_000_000, 1).await;

    let sellers = h.agents.seller_directory().await.expect("directory loads");
    assert_eq!(sellers.len(), 2);
    // Sorted by name ascending, counts joined in.
    assert_eq!(sellers[0].name, "Алимаа");
    assert_eq!(sellers[0].property_count, 0);
    assert_eq!(sellers[1].name, "Болд");
    assert_eq!(sellers[1].property_count, 2);

    let profile = h
        .agents
        .agent_profile("user_10")
        .await
        .expect("profile loads");
    assert_eq!(profile.agent.id, "user_10");
    assert_eq!(profile.properties.len(), 2);

    h.agents
        .apply_event(IdentityEvent {
            kind: "user.deleted".to_string(),
            data: IdentityUser {
                id: "user_11".to_string(),
                name: None,
                email: None,
                avatar_url: None,
                role: None,
            },
        })
        .await
        .expect("deletion applies");

    let sellers = h.agents.seller_directory().await.expect("directory loads");
    assert_eq!(sellers.len(), 1);
    assert_eq!(sellers[0].id, "user_10");
}

#[tokio::test]
async fn unrecognized_identity_events_are_acknowledged_and_ignored() {
    let h = harness();
    h.agents
        .apply_event(IdentityEvent {
            kind: "session.created".to_string(),
            data: IdentityUser {
                id: "user_55".to_string(),
                name: Some("Түмэн".to_string()),
                email: None,
                avatar_url: None,
                role: Some("seller".to_string()),
            },
        })
        .await
        .expect("unknown event kinds are acknowledged");

    assert!(h
        .users
        .fetch("user_55")
        .await
        .expect("lookup succeeds")
        .is_none());
    assert!(h
        .agents
        .seller_directory()
        .await
        .expect("directory loads")
        .is_empty());
}

#[tokio::test]
async fn scheduling_derives_the_seller_and_notifies_them() {
    let h = harness();
    h.users
        .upsert(seller("user_1", "Болд", "bold@example.mn"))
        .await
        .expect("seller mirrored");
    let property = seed_listing(h.listings.as_ref(), "user_1", "Үзэх зар", 60_000_000, 0).await;

    let appointment = h
        .appointments
        .schedule(
            &caller("user_9"),
            AppointmentRequest {
                property_id: property.id.clone(),
                scheduled_at: base_time() + Duration::days(2),
                message: Some("Бямба гарагт үзэж болох уу?".to_string()),
            },
        )
        .await
        .expect("scheduling succeeds");

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.seller_id, "user_1");
    assert_eq!(appointment.buyer_id, "user_9");

    // The notification task runs off the request path; give it a few ticks.
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "bold@example.mn");
    assert!(sent[0].body.contains("Үзэх зар"));

    let mine = h
        .appointments
        .for_seller(&caller("user_1"))
        .await
        .expect("seller inbox loads");
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn only_the_seller_may_cancel() {
    let h = harness();
    let property = seed_listing(h.listings.as_ref(), "user_1", "Үзэх зар", 60_000_000, 0).await;

    let appointment = h
        .appointments
        .schedule(
            &caller("user_9"),
            AppointmentRequest {
                property_id: property.id,
                scheduled_at: base_time() + Duration::days(1),
                message: None,
            },
        )
        .await
        .expect("scheduling succeeds");

    let err = h
        .appointments
        .cancel(&caller("user_9"), &appointment.id)
        .await
        .expect_err("buyers cannot cancel");
    assert!(matches!(err, AppError::Forbidden(_)));

    let cancelled = h
        .appointments
        .cancel(&caller("user_1"), &appointment.id)
        .await
        .expect("seller cancels");
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn mailer_failure_does_not_fail_scheduling() {
    let h = harness_with(
        Arc::new(RecordingMediaStore::default()),
        Arc::new(khoroolol::mailer::RecordingMailer::failing()),
    );
    h.users
        .upsert(seller("user_1", "Болд", "bold@example.mn"))
        .await
        .expect("seller mirrored");
    let property = seed_listing(h.listings.as_ref(), "user_1", "Үзэх зар", 60_000_000, 0).await;

    let appointment = h
        .appointments
        .schedule(
            &caller("user_9"),
            AppointmentRequest {
                property_id: property.id,
                scheduled_at: base_time() + Duration::days(1),
                message: None,
            },
        )
        .await
        .expect("delivery failure is not surfaced");

    assert_eq!(appointment.status, AppointmentStatus::Pending);
}
