use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of asset a listing advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    Apartment,
    Land,
    Car,
    Barter,
}

impl PropertyType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "house" => Some(Self::House),
            "apartment" => Some(Self::Apartment),
            "land" => Some(Self::Land),
            "car" => Some(Self::Car),
            "barter" => Some(Self::Barter),
            _ => None,
        }
    }

    /// Floor and room counts only make sense for buildings.
    pub const fn is_building(self) -> bool {
        matches!(self, Self::House | Self::Apartment)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Apartment => "apartment",
            Self::Land => "land",
            Self::Car => "car",
            Self::Barter => "barter",
        }
    }
}

/// Whether the listing is offered for sale or for rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    #[serde(rename = "for sale")]
    ForSale,
    #[serde(rename = "for rent")]
    ForRent,
}

impl ListingStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "for sale" | "sale" => Some(Self::ForSale),
            "for rent" | "rent" => Some(Self::ForRent),
            _ => None,
        }
    }
}

/// A published listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    pub district: String,
    pub khoroo: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub price: i64,
    pub area: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,
    #[serde(default)]
    pub near_school: bool,
    #[serde(default)]
    pub near_playground: bool,
    #[serde(default)]
    pub loan_eligible: bool,
    #[serde(default)]
    pub barter_eligible: bool,
    #[serde(default)]
    pub leasing_eligible: bool,
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Property {
    /// Apply a partial update; `None` fields leave the document untouched.
    pub fn apply(&mut self, patch: PropertyPatch) {
        let PropertyPatch {
            title,
            description,
            address,
            district,
            khoroo,
            status,
            price,
            area,
            rooms,
            floor,
            near_school,
            near_playground,
            loan_eligible,
            barter_eligible,
            leasing_eligible,
        } = patch;

        if let Some(value) = title {
            self.title = value;
        }
        if let Some(value) = description {
            self.description = value;
        }
        if let Some(value) = address {
            self.address = value;
        }
        if let Some(value) = district {
            self.district = value;
        }
        if let Some(value) = khoroo {
            self.khoroo = value;
        }
        if let Some(value) = status {
            self.status = value;
        }
        if let Some(value) = price {
            self.price = value;
        }
        if let Some(value) = area {
            self.area = value;
        }
        if let Some(value) = rooms {
            self.rooms = Some(value);
        }
        if let Some(value) = floor {
            self.floor = Some(value);
        }
        if let Some(value) = near_school {
            self.near_school = value;
        }
        if let Some(value) = near_playground {
            self.near_playground = value;
        }
        if let Some(value) = loan_eligible {
            self.loan_eligible = value;
        }
        if let Some(value) = barter_eligible {
            self.barter_eligible = value;
        }
        if let Some(value) = leasing_eligible {
            self.leasing_eligible = value;
        }
    }

    /// Append freshly uploaded media, preserving existing order.
    pub fn append_media(&mut self, images: Vec<String>, videos: Vec<String>) {
        self.images.extend(images);
        self.videos.extend(videos);
    }
}

/// Fields required to create a listing, before media upload.
#[derive(Debug, Clone)]
pub struct PropertyDraft {
    pub title: String,
    pub description: String,
    pub address: String,
    pub district: String,
    pub khoroo: String,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub price: i64,
    pub area: f64,
    pub rooms: Option<u32>,
    pub floor: Option<i32>,
    pub near_school: bool,
    pub near_playground: bool,
    pub loan_eligible: bool,
    pub barter_eligible: bool,
    pub leasing_eligible: bool,
}

impl PropertyDraft {
    /// Check the minimum field set plus the media and building invariants.
    pub fn validate(&self, image_count: usize) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        if self.district.trim().is_empty() {
            return Err(ValidationError::MissingField("district"));
        }
        if self.khoroo.trim().is_empty() {
            return Err(ValidationError::MissingField("khoroo"));
        }
        if self.price <= 0 {
            return Err(ValidationError::NonPositive("price"));
        }
        if self.area <= 0.0 {
            return Err(ValidationError::NonPositive("area"));
        }
        if self.property_type.is_building() {
            if self.rooms.is_none() {
                return Err(ValidationError::MissingBuildingField("rooms"));
            }
            if self.floor.is_none() {
                return Err(ValidationError::MissingBuildingField("floor"));
            }
        }
        if image_count == 0 {
            return Err(ValidationError::NoImages);
        }
        Ok(())
    }
}

/// Partial update accepted by the mutation service; media is handled
/// separately because new files are uploaded and appended, never replaced.
#[derive(Debug, Clone, Default)]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub khoroo: Option<String>,
    pub status: Option<ListingStatus>,
    pub price: Option<i64>,
    pub area: Option<f64>,
    pub rooms: Option<u32>,
    pub floor: Option<i32>,
    pub near_school: Option<bool>,
    pub near_playground: Option<bool>,
    pub loan_eligible: Option<bool>,
    pub barter_eligible: Option<bool>,
    pub leasing_eligible: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("'{0}' must be a positive number")]
    NonPositive(&'static str),
    #[error("at least one image is required")]
    NoImages,
    #[error("'{0}' is required for houses and apartments")]
    MissingBuildingField(&'static str),
    #[error("unrecognized value '{value}' for '{field}'")]
    Invalid { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> PropertyDraft {
        PropertyDraft {
            title: "Гэр бүлд зориулсан орон сууц".to_string(),
            description: String::new(),
            address: "Токиогийн гудамж 12".to_string(),
            district: "Баянзүрх".to_string(),
            khoroo: "1".to_string(),
            property_type: PropertyType::Apartment,
            status: ListingStatus::ForSale,
            price: 100_000_000,
            area: 80.0,
            rooms: Some(3),
            floor: Some(5),
            near_school: true,
            near_playground: false,
            loan_eligible: true,
            barter_eligible: false,
            leasing_eligible: false,
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate(1).is_ok());
    }

    #[test]
    fn zero_images_is_rejected() {
        assert!(matches!(draft().validate(0), Err(ValidationError::NoImages)));
    }

    #[test]
    fn buildings_require_floor_and_rooms() {
        let mut apartment = draft();
        apartment.floor = None;
        assert!(matches!(
            apartment.validate(1),
            Err(ValidationError::MissingBuildingField("floor"))
        ));

        let mut land = draft();
        land.property_type = PropertyType::Land;
        land.floor = None;
        land.rooms = None;
        assert!(land.validate(1).is_ok());
    }

    #[test]
    fn missing_district_is_rejected() {
        let mut bad = draft();
        bad.district = "  ".to_string();
        assert!(matches!(
            bad.validate(1),
            Err(ValidationError::MissingField("district"))
        ));
    }

    #[test]
    fn patch_leaves_unset_fields_alone() {
        let mut property = Property {
            id: "prop-000001".to_string(),
            title: "Анхны гарчиг".to_string(),
            description: "desc".to_string(),
            address: "addr".to_string(),
            district: "Сүхбаатар".to_string(),
            khoroo: "8".to_string(),
            property_type: PropertyType::House,
            status: ListingStatus::ForSale,
            price: 250_000_000,
            area: 120.0,
            rooms: Some(4),
            floor: Some(2),
            near_school: false,
            near_playground: false,
            loan_eligible: false,
            barter_eligible: false,
            leasing_eligible: false,
            images: vec!["a.jpg".to_string()],
            videos: Vec::new(),
            user_id: "user_1".to_string(),
            created_at: Utc::now(),
        };

        property.apply(PropertyPatch {
            price: Some(240_000_000),
            near_school: Some(true),
            ..PropertyPatch::default()
        });

        assert_eq!(property.price, 240_000_000);
        assert!(property.near_school);
        assert_eq!(property.title, "Анхны гарчиг");
        assert_eq!(property.rooms, Some(4));
    }

    #[test]
    fn append_media_preserves_order() {
        let mut property = Property {
            id: String::new(),
            title: "t".to_string(),
            description: String::new(),
            address: String::new(),
            district: "d".to_string(),
            khoroo: "1".to_string(),
            property_type: PropertyType::Land,
            status: ListingStatus::ForRent,
            price: 1,
            area: 1.0,
            rooms: None,
            floor: None,
            near_school: false,
            near_playground: false,
            loan_eligible: false,
            barter_eligible: false,
            leasing_eligible: false,
            images: vec!["one.jpg".to_string(), "two.jpg".to_string()],
            videos: Vec::new(),
            user_id: "user_1".to_string(),
            created_at: Utc::now(),
        };

        property.append_media(vec!["three.jpg".to_string()], Vec::new());
        assert_eq!(property.images, vec!["one.jpg", "two.jpg", "three.jpg"]);
    }

    #[test]
    fn status_serializes_with_spaces() {
        let value = serde_json::to_value(ListingStatus::ForSale).expect("serializes");
        assert_eq!(value, serde_json::json!("for sale"));
        assert_eq!(ListingStatus::parse("For Rent"), Some(ListingStatus::ForRent));
    }
}
