//! Company business logic - Registration, service area and lead preferences.
//!
//! Companies are never hard-deleted; [`deactivate_company`] takes them out of
//! matching while keeping purchase history intact.

use crate::{
    core::geo,
    entities::{Company, company},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, Set, prelude::*};
use tracing::info;

/// Radius used when a company has not set one.
pub const DEFAULT_SERVICE_RADIUS_MILES: i32 = 30;
const MIN_SERVICE_RADIUS_MILES: i32 = 1;
const MAX_SERVICE_RADIUS_MILES: i32 = 500;
const MAX_SLUG_LEN: usize = 100;

/// Sign-up details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCompany {
    /// Trading name
    pub company_name: String,
    /// Account email
    pub email: String,
    /// Contact phone
    pub phone: Option<String>,
}

/// Depot location and travel radius.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceArea {
    /// Depot postcode, required
    pub base_postcode: String,
    /// Geocoded depot latitude
    pub base_lat: Option<f64>,
    /// Geocoded depot longitude
    pub base_lng: Option<f64>,
    /// Travel radius in miles, defaulted and clamped
    pub service_radius_miles: Option<i32>,
}

/// Which leads a company wants to hear about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadPreferences {
    pub min_cbm: Option<f64>,
    pub max_cbm: Option<f64>,
    pub property_types: Vec<String>,
    pub notification_email: Option<String>,
    pub notification_phone: Option<String>,
}

/// URL-safe handle: lower-cased, punctuation removed, separator runs collapsed
/// to a single hyphen.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_separator = false;

    for ch in text.trim().to_lowercase().chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_separator = true;
        } else if ch.is_alphanumeric() {
            if pending_separator {
                slug.push('-');
                pending_separator = false;
            }
            slug.push(ch);
        }
    }
    if pending_separator {
        slug.push('-');
    }

    slug.chars().take(MAX_SLUG_LEN).collect()
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn slug_taken<C>(db: &C, slug: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(Company::find()
        .filter(company::Column::Slug.eq(slug))
        .one(db)
        .await?
        .is_some())
}

/// Registers a new, active, unverified company.
///
/// # Errors
/// Returns an error if:
/// - The name is blank
/// - The email is blank, malformed or already registered
/// - The database insert fails
pub async fn register_company(db: &DatabaseConnection, new: NewCompany) -> Result<company::Model> {
    let company_name = new.company_name.trim().to_string();
    if company_name.is_empty() {
        return Err(Error::validation("Company name cannot be empty"));
    }

    let email = new.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::validation("A valid email address is required"));
    }
    let exists = Company::find()
        .filter(company::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if exists.is_some() {
        return Err(Error::validation("An account with this email already exists"));
    }

    let mut slug = slugify(&company_name);
    if slug.is_empty() {
        slug = "company".to_string();
    }
    if slug_taken(db, &slug).await? {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        slug = format!("{slug}-{}", &suffix[..6]);
    }

    let now = chrono::Utc::now();
    let company = company::ActiveModel {
        company_name: Set(company_name),
        slug: Set(slug),
        email: Set(email),
        phone: Set(optional(new.phone)),
        is_active: Set(true),
        is_verified: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let company = company.insert(db).await?;
    info!("Registered company {} ({})", company.id, company.slug);
    Ok(company)
}

/// Finds a company by id.
///
/// # Errors
/// Returns [`Error::CompanyNotFound`] if it does not exist, or a database error.
pub async fn get_company_by_id<C>(db: &C, company_id: i64) -> Result<company::Model>
where
    C: ConnectionTrait,
{
    Company::find_by_id(company_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::CompanyNotFound {
            reference: company_id.to_string(),
        })
}

/// Finds a company by slug.
///
/// # Errors
/// Returns [`Error::CompanyNotFound`] if it does not exist, or a database error.
pub async fn get_company_by_slug(db: &DatabaseConnection, slug: &str) -> Result<company::Model> {
    Company::find()
        .filter(company::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| Error::CompanyNotFound {
            reference: slug.to_string(),
        })
}

/// Sets the depot location and travel radius.
///
/// The radius defaults to 30 miles and is clamped to 1..=500. Coordinates must
/// be in range; matching silently treats bad coordinates as distance zero, so
/// they are rejected here instead.
///
/// # Errors
/// Returns an error if the postcode is blank, the coordinates are out of range,
/// the company is missing, or the update fails.
pub async fn update_service_area(
    db: &DatabaseConnection,
    company_id: i64,
    area: ServiceArea,
) -> Result<company::Model> {
    let postcode = area.base_postcode.trim().to_uppercase();
    if postcode.is_empty() {
        return Err(Error::validation("Base postcode is required"));
    }

    if let (Some(lat), Some(lng)) = (area.base_lat, area.base_lng) {
        if !geo::validate_coordinates(lat, lng) {
            return Err(Error::validation(format!(
                "Coordinates out of range: ({lat}, {lng})"
            )));
        }
    } else if area.base_lat.is_some() || area.base_lng.is_some() {
        return Err(Error::validation("Latitude and longitude must be set together"));
    }

    let radius = area
        .service_radius_miles
        .unwrap_or(DEFAULT_SERVICE_RADIUS_MILES)
        .clamp(MIN_SERVICE_RADIUS_MILES, MAX_SERVICE_RADIUS_MILES);

    let company = get_company_by_id(db, company_id).await?;
    let mut active: company::ActiveModel = company.into();
    active.base_postcode = Set(Some(postcode));
    active.base_lat = Set(area.base_lat);
    active.base_lng = Set(area.base_lng);
    active.service_radius_miles = Set(Some(radius));
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

fn check_volume(value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(volume) if !volume.is_finite() || volume < 0.0 => Err(Error::InvalidVolume { volume }),
        other => Ok(other),
    }
}

/// Stores lead preferences.
///
/// # Errors
/// Returns an error if a volume bound is negative, `min > max`, the company is
/// missing, or the update fails.
pub async fn update_preferences(
    db: &DatabaseConnection,
    company_id: i64,
    prefs: LeadPreferences,
) -> Result<company::Model> {
    let min_cbm = check_volume(prefs.min_cbm)?;
    let max_cbm = check_volume(prefs.max_cbm)?;
    if let (Some(min), Some(max)) = (min_cbm, max_cbm) {
        if min > max {
            return Err(Error::validation(
                "Minimum volume cannot exceed maximum volume",
            ));
        }
    }

    let property_types: Vec<String> = prefs
        .property_types
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let property_types =
        (!property_types.is_empty()).then_some(company::PropertyTypes(property_types));

    let company = get_company_by_id(db, company_id).await?;
    let mut active: company::ActiveModel = company.into();
    active.pref_min_cbm = Set(min_cbm);
    active.pref_max_cbm = Set(max_cbm);
    active.pref_property_types = Set(property_types);
    active.pref_notification_email = Set(optional(prefs.notification_email));
    active.pref_notification_phone = Set(optional(prefs.notification_phone));
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

async fn set_flag<F>(db: &DatabaseConnection, company_id: i64, apply: F) -> Result<company::Model>
where
    F: FnOnce(&mut company::ActiveModel),
{
    let company = get_company_by_id(db, company_id).await?;
    let mut active: company::ActiveModel = company.into();
    apply(&mut active);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Marks a company as checked by an admin.
///
/// # Errors
/// Returns an error if the company is missing or the update fails.
pub async fn verify_company(db: &DatabaseConnection, company_id: i64) -> Result<company::Model> {
    let company = set_flag(db, company_id, |c| c.is_verified = Set(true)).await?;
    info!("Verified company {}", company_id);
    Ok(company)
}

/// Soft-deletes a company so it is no longer matched.
///
/// # Errors
/// Returns an error if the company is missing or the update fails.
pub async fn deactivate_company(db: &DatabaseConnection, company_id: i64) -> Result<company::Model> {
    let company = set_flag(db, company_id, |c| c.is_active = Set(false)).await?;
    info!("Deactivated company {}", company_id);
    Ok(company)
}

/// Returns the company's payment-processor customer id, creating one with
/// `create` and storing it the first time.
///
/// # Errors
/// Returns an error if the company is missing, `create` fails, or the update
/// fails.
pub async fn ensure_payment_customer<F, Fut>(
    db: &DatabaseConnection,
    company_id: i64,
    create: F,
) -> Result<String>
where
    F: FnOnce(&company::Model) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let company = get_company_by_id(db, company_id).await?;
    if let Some(existing) = company.payment_customer_id.as_deref().filter(|id| !id.is_empty()) {
        return Ok(existing.to_string());
    }

    let customer_id = create(&company).await?;
    let mut active: company::ActiveModel = company.into();
    active.payment_customer_id = Set(Some(customer_id.clone()));
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await?;
    info!("Created payment customer {} for company {}", customer_id, company_id);
    Ok(customer_id)
}

/// Where lead alerts go: the override if set, else the account email.
#[must_use]
pub fn alert_email(company: &company::Model) -> &str {
    company
        .pref_notification_email
        .as_deref()
        .filter(|email| !email.is_empty())
        .unwrap_or(&company.email)
}
