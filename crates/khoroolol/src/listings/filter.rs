use std::collections::HashMap;

use mongodb::bson::{doc, Document};

use super::domain::{Property, PropertyType};

/// Raw filter values lifted from the query string. Only recognized keys are
/// kept; everything else in the query string is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub q: Option<String>,
    pub property_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

impl SearchParams {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        Self {
            q: query.get("q").cloned(),
            property_type: query.get("type").cloned(),
            min_price: query.get("minPrice").cloned(),
            max_price: query.get("maxPrice").cloned(),
        }
    }
}

/// A supplied value that means "no constraint": empty, the `all` sentinel,
/// or a boolean false that UI toggles send for unchecked filters.
fn constrains(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("all")
        || trimmed.eq_ignore_ascii_case("false")
    {
        None
    } else {
        Some(trimmed)
    }
}

/// Type constraint derived from the raw `type` value.
///
/// An unrecognized type string is kept as an always-false constraint rather
/// than being validated away; the original behaves the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeConstraint {
    Known(PropertyType),
    Unmatchable,
}

/// Validated filter over the property collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub text: Option<String>,
    pub property_type: Option<TypeConstraint>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

impl ListingFilter {
    pub fn from_params(params: &SearchParams) -> Self {
        let text = params
            .q
            .as_deref()
            .and_then(constrains)
            .map(str::to_string);

        let property_type = params.property_type.as_deref().and_then(constrains).map(
            |value| match PropertyType::parse(value) {
                Some(kind) => TypeConstraint::Known(kind),
                None => TypeConstraint::Unmatchable,
            },
        );

        // Malformed numbers coerce to a bound nothing satisfies, mirroring
        // the original's NaN comparisons.
        let min_price = params
            .min_price
            .as_deref()
            .and_then(constrains)
            .map(|raw| raw.parse::<i64>().unwrap_or(i64::MAX));
        let max_price = params
            .max_price
            .as_deref()
            .and_then(constrains)
            .map(|raw| raw.parse::<i64>().unwrap_or(i64::MIN));

        Self {
            text,
            property_type,
            min_price,
            max_price,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.text.is_none()
            && self.property_type.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    /// In-memory evaluation, used by the in-memory repository.
    pub fn matches(&self, property: &Property) -> bool {
        if let Some(needle) = &self.text {
            let needle = needle.to_lowercase();
            let hit = property.title.to_lowercase().contains(&needle)
                || property.address.to_lowercase().contains(&needle)
                || property.description.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        match self.property_type {
            Some(TypeConstraint::Known(kind)) if property.property_type != kind => return false,
            Some(TypeConstraint::Unmatchable) => return false,
            _ => {}
        }

        if let Some(min) = self.min_price {
            if property.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if property.price > max {
                return false;
            }
        }

        true
    }

    /// Render the filter as a document-store predicate.
    pub fn to_document(&self) -> Document {
        let mut predicate = Document::new();

        if let Some(needle) = &self.text {
            let pattern = escape_regex(needle);
            let clause = |field: &str| {
                doc! { field: { "$regex": pattern.clone(), "$options": "i" } }
            };
            predicate.insert(
                "$or",
                vec![clause("title"), clause("address"), clause("description")],
            );
        }

        match self.property_type {
            Some(TypeConstraint::Known(kind)) => {
                predicate.insert("type", kind.label());
            }
            Some(TypeConstraint::Unmatchable) => {
                // Matches no document, by construction.
                predicate.insert("type", doc! { "$in": [] });
            }
            None => {}
        }

        let mut price = Document::new();
        if let Some(min) = self.min_price {
            price.insert("$gte", min);
        }
        if let Some(max) = self.max_price {
            price.insert("$lte", max);
        }
        if !price.is_empty() {
            predicate.insert("price", price);
        }

        predicate
    }
}

/// Escape regex metacharacters so free-text search stays a substring match.
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
