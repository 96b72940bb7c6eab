use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::extract::multipart::Multipart;
use khoroolol::agents::{AgentDirectory, InMemoryUserRepository, UserRepository};
use khoroolol::appointments::{
    AppointmentScheduler, InMemoryAppointmentRepository,
};
use khoroolol::config::AppConfig;
use khoroolol::error::AppError;
use khoroolol::listings::domain::ValidationError;
use khoroolol::listings::mongo::MongoListingRepository;
use khoroolol::listings::{
    InMemoryListingRepository, ListingCatalog, ListingRepository, ListingStatus, PropertyDraft,
    PropertyMutationService, PropertyPatch, PropertyType,
};
use khoroolol::mailer::{HttpMailer, Mailer, RecordingMailer};
use khoroolol::media::{HttpMediaStore, MediaKind, MediaStore, MediaUpload, RecordingMediaStore};
use khoroolol::{agents, appointments, store};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The wired domain services the router closes over.
pub(crate) struct Services {
    pub(crate) catalog: ListingCatalog,
    pub(crate) mutations: PropertyMutationService,
    pub(crate) agents: AgentDirectory,
    pub(crate) appointments: AppointmentScheduler,
}

impl Services {
    fn wire(
        listings: Arc<dyn ListingRepository>,
        users: Arc<dyn UserRepository>,
        appointment_repo: Arc<dyn appointments::AppointmentRepository>,
        media: Arc<dyn MediaStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            catalog: ListingCatalog::new(Arc::clone(&listings)),
            mutations: PropertyMutationService::new(Arc::clone(&listings), media),
            agents: AgentDirectory::new(Arc::clone(&users), Arc::clone(&listings)),
            appointments: AppointmentScheduler::new(appointment_repo, listings, users, mailer),
        }
    }

    /// Everything in-process: local development and tests.
    pub(crate) fn in_memory() -> Self {
        let listings: Arc<dyn ListingRepository> = Arc::new(InMemoryListingRepository::default());
        let users: Arc<dyn UserRepository> =
            Arc::new(InMemoryUserRepository::new(Arc::clone(&listings)));
        Self::wire(
            listings,
            users,
            Arc::new(InMemoryAppointmentRepository::default()),
            Arc::new(RecordingMediaStore::default()),
            Arc::new(RecordingMailer::default()),
        )
    }

    /// Production wiring: Mongo-backed repositories plus the hosted media
    /// and email providers.
    pub(crate) async fn connected(config: &AppConfig) -> Result<Self, AppError> {
        let database = store::connect(&config.database).await?;

        let listings: Arc<dyn ListingRepository> =
            Arc::new(MongoListingRepository::new(&database));
        let users: Arc<dyn UserRepository> =
            Arc::new(agents::mongo::MongoUserRepository::new(&database));
        let appointment_repo: Arc<dyn appointments::AppointmentRepository> =
            Arc::new(appointments::mongo::MongoAppointmentRepository::new(&database));

        Ok(Self::wire(
            listings,
            users,
            appointment_repo,
            Arc::new(HttpMediaStore::new(config.media.clone())),
            Arc::new(HttpMailer::new(config.mailer.clone())),
        ))
    }
}

/// Text fields plus decoded media files from one multipart request.
#[derive(Debug, Default)]
pub(crate) struct ListingForm {
    pub(crate) fields: HashMap<String, String>,
    pub(crate) files: Vec<MediaUpload>,
}

/// Drain a multipart body: `images` and `videos` parts are media, every
/// other part is a text field.
pub(crate) async fn read_listing_form(mut multipart: Multipart) -> Result<ListingForm, AppError> {
    let mut form = ListingForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" | "videos" => {
                let kind = if name == "images" {
                    MediaKind::Image
                } else {
                    MediaKind::Video
                };
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                form.files.push(MediaUpload {
                    file_name,
                    kind,
                    bytes: bytes.to_vec(),
                });
            }
            "" => continue,
            _ => {
                let value = field.text().await.map_err(bad_multipart)?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(ValidationError::Invalid {
        field: "multipart",
        value: err.to_string(),
    })
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on")
}

fn parse_i64(fields: &HashMap<String, String>, key: &'static str) -> Result<Option<i64>, ValidationError> {
    fields
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<i64>()
                .map_err(|_| ValidationError::Invalid {
                    field: key,
                    value: raw.clone(),
                })
        })
        .transpose()
}

fn parse_f64(fields: &HashMap<String, String>, key: &'static str) -> Result<Option<f64>, ValidationError> {
    fields
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::Invalid {
                    field: key,
                    value: raw.clone(),
                })
        })
        .transpose()
}

fn parse_u32(fields: &HashMap<String, String>, key: &'static str) -> Result<Option<u32>, ValidationError> {
    fields
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .map_err(|_| ValidationError::Invalid {
                    field: key,
                    value: raw.clone(),
                })
        })
        .transpose()
}

fn parse_i32(fields: &HashMap<String, String>, key: &'static str) -> Result<Option<i32>, ValidationError> {
    fields
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<i32>()
                .map_err(|_| ValidationError::Invalid {
                    field: key,
                    value: raw.clone(),
                })
        })
        .transpose()
}

/// Assemble a creation draft from multipart text fields.
pub(crate) fn draft_from_fields(
    fields: &HashMap<String, String>,
) -> Result<PropertyDraft, ValidationError> {
    let type_raw = fields
        .get("type")
        .ok_or(ValidationError::MissingField("type"))?;
    let property_type =
        PropertyType::parse(type_raw).ok_or_else(|| ValidationError::Invalid {
            field: "type",
            value: type_raw.clone(),
        })?;

    let status = match fields.get("status") {
        Some(raw) => ListingStatus::parse(raw).ok_or_else(|| ValidationError::Invalid {
            field: "status",
            value: raw.clone(),
        })?,
        None => ListingStatus::ForSale,
    };

    Ok(PropertyDraft {
        title: fields.get("title").cloned().unwrap_or_default(),
        description: fields.get("description").cloned().unwrap_or_default(),
        address: fields.get("address").cloned().unwrap_or_default(),
        district: fields.get("district").cloned().unwrap_or_default(),
        khoroo: fields.get("khoroo").cloned().unwrap_or_default(),
        property_type,
        status,
        price: parse_i64(fields, "price")?.ok_or(ValidationError::MissingField("price"))?,
        area: parse_f64(fields, "area")?.ok_or(ValidationError::MissingField("area"))?,
        rooms: parse_u32(fields, "rooms")?,
        floor: parse_i32(fields, "floor")?,
        near_school: fields.get("nearSchool").map(|v| parse_flag(v)).unwrap_or(false),
        near_playground: fields
            .get("nearPlayground")
            .map(|v| parse_flag(v))
            .unwrap_or(false),
        loan_eligible: fields
            .get("loanEligible")
            .map(|v| parse_flag(v))
            .unwrap_or(false),
        barter_eligible: fields
            .get("barterEligible")
            .map(|v| parse_flag(v))
            .unwrap_or(false),
        leasing_eligible: fields
            .get("leasingEligible")
            .map(|v| parse_flag(v))
            .unwrap_or(false),
    })
}

/// Assemble a partial update from multipart text fields; absent keys stay
/// untouched.
pub(crate) fn patch_from_fields(
    fields: &HashMap<String, String>,
) -> Result<PropertyPatch, ValidationError> {
    let status = fields
        .get("status")
        .map(|raw| {
            ListingStatus::parse(raw).ok_or_else(|| ValidationError::Invalid {
                field: "status",
                value: raw.clone(),
            })
        })
        .transpose()?;

    Ok(PropertyPatch {
        title: fields.get("title").cloned(),
        description: fields.get("description").cloned(),
        address: fields.get("address").cloned(),
        district: fields.get("district").cloned(),
        khoroo: fields.get("khoroo").cloned(),
        status,
        price: parse_i64(fields, "price")?,
        area: parse_f64(fields, "area")?,
        rooms: parse_u32(fields, "rooms")?,
        floor: parse_i32(fields, "floor")?,
        near_school: fields.get("nearSchool").map(|v| parse_flag(v)),
        near_playground: fields.get("nearPlayground").map(|v| parse_flag(v)),
        loan_eligible: fields.get("loanEligible").map(|v| parse_flag(v)),
        barter_eligible: fields.get("barterEligible").map(|v| parse_flag(v)),
        leasing_eligible: fields.get("leasingEligible").map(|v| parse_flag(v)),
    })
}
