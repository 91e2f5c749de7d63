//! Shared test utilities for the lead marketplace.
//!
//! This module provides an in-memory database, fixtures with sensible defaults
//! and a notifier that records what it was asked to send.

use crate::{
    config::settings::LeadSettings,
    core::{
        company::{self, NewCompany, ServiceArea},
        geo::Coordinates,
        inventory::{self, NewItem},
        lead as lead_core,
        tier::{self, NewTier},
    },
    entities::{self, lead, lead_purchase},
    errors::{Error, Result},
    notify::LeadNotifier,
};
use sea_orm::DatabaseConnection;
use std::sync::{Mutex, PoisonError};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Central London, with coordinates.
pub fn london() -> lead::Location {
    lead::Location {
        label: "10 Downing Street, London, SW1A 2AA, United Kingdom".to_string(),
        lat: Some(51.5074),
        lng: Some(-0.1278),
        postcode: "SW1A 2AA".to_string(),
        city: "London".to_string(),
    }
}

/// Central Manchester, with coordinates.
pub fn manchester() -> lead::Location {
    lead::Location {
        label: "Piccadilly, Manchester, M1 1AA, United Kingdom".to_string(),
        lat: Some(53.4808),
        lng: Some(-2.2426),
        postcode: "M1 1AA".to_string(),
        city: "Manchester".to_string(),
    }
}

/// An unsaved active lead model for pure tests.
pub fn sample_lead() -> lead::Model {
    let now = chrono::Utc::now();
    lead::Model {
        id: 1,
        token: "sampletoken".to_string(),
        created_at: now,
        updated_at: now,
        pickup: None,
        dropoff: None,
        distance_miles: None,
        property_type: Some("House".to_string()),
        dropoff_property_type: None,
        move_date: None,
        pickup_access: None,
        dropoff_access: None,
        customer_name: Some("Sam Taylor".to_string()),
        customer_email: Some("sam@example.com".to_string()),
        customer_phone: None,
        total_cbm: 0.0,
        total_weight_kg: 0.0,
        total_items: 0,
        bulky_items: 0,
        fragile_items: 0,
        estimate_low: None,
        estimate_high: None,
        status: lead::LeadStatus::Active,
        submitted_at: Some(now),
        expires_at: None,
        lead_price_pence: Some(1000),
        utm_source: None,
        utm_medium: None,
        utm_campaign: None,
    }
}

/// An unsaved active company model without a base location.
pub fn sample_company(id: i64) -> entities::company::Model {
    let now = chrono::Utc::now();
    entities::company::Model {
        id,
        company_name: format!("Company {id}"),
        slug: format!("company-{id}"),
        email: format!("company{id}@example.com"),
        phone: None,
        base_postcode: None,
        base_lat: None,
        base_lng: None,
        service_radius_miles: None,
        pref_min_cbm: None,
        pref_max_cbm: None,
        pref_property_types: None,
        pref_notification_email: None,
        pref_notification_phone: None,
        payment_customer_id: None,
        is_active: true,
        is_verified: false,
        created_at: now,
        updated_at: now,
    }
}

/// Registers a company with a unique email and no base location.
pub async fn create_test_company(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::company::Model> {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    company::register_company(
        db,
        NewCompany {
            company_name: name.to_string(),
            email: format!("{unique}@example.com"),
            phone: None,
        },
    )
    .await
}

/// Registers a company based at `base` with the given radius.
pub async fn create_located_company(
    db: &DatabaseConnection,
    name: &str,
    base: Coordinates,
    radius_miles: i32,
) -> Result<entities::company::Model> {
    let created = create_test_company(db, name).await?;
    company::update_service_area(
        db,
        created.id,
        ServiceArea {
            base_postcode: "SW1A 1AA".to_string(),
            base_lat: Some(base.lat),
            base_lng: Some(base.lng),
            service_radius_miles: Some(radius_miles),
        },
    )
    .await
}

/// Creates an active pricing tier.
pub async fn create_test_tier(
    db: &DatabaseConnection,
    name: &str,
    min_cbm: f64,
    max_cbm: Option<f64>,
    price_pence: i64,
) -> Result<entities::lead_pricing_tier::Model> {
    tier::create_tier(
        db,
        NewTier {
            name: name.to_string(),
            min_cbm,
            max_cbm,
            price_pence,
        },
    )
    .await
}

/// Runs a whole survey and submits it.
///
/// # Defaults
/// * property type: "House"
/// * one item of `cbm` cubic metres
/// * drop-off: same as pickup
pub async fn create_active_lead(
    db: &DatabaseConnection,
    cbm: f64,
    pickup: Option<lead::Location>,
) -> Result<lead::Model> {
    let lead = lead_core::start_survey(db).await?;
    if let Some(pickup) = pickup {
        lead_core::set_locations(db, &lead.token, pickup.clone(), pickup).await?;
    }
    lead_core::set_property_types(db, &lead.token, "House", None).await?;

    let room = inventory::add_room(db, &lead.token, "Lounge").await?;
    inventory::add_items(
        db,
        room.id,
        vec![NewItem {
            name: "Boxes".to_string(),
            qty: 1,
            cbm: Some(cbm),
            ..NewItem::default()
        }],
        None,
    )
    .await?;

    lead_core::submit_lead(
        db,
        &lead.token,
        lead_core::ContactDetails {
            name: "Sam Taylor".to_string(),
            email: "sam@example.com".to_string(),
            phone: None,
        },
        &LeadSettings::default(),
        chrono::Utc::now(),
    )
    .await
}

#[derive(Debug, Default)]
struct Sent {
    confirmations: Vec<i64>,
    alerts: Vec<(i64, i64)>,
    purchases: Vec<(i64, i64)>,
}

/// Records every send; fails alerts for chosen companies and, optionally,
/// customer confirmations.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Sent>,
    failing_companies: Vec<i64>,
    failing_confirmations: bool,
}

impl RecordingNotifier {
    /// Alerts to these companies fail with a notification error.
    pub fn failing_for(company_ids: &[i64]) -> Self {
        Self {
            failing_companies: company_ids.to_vec(),
            ..Self::default()
        }
    }

    /// Customer confirmations fail with a notification error.
    pub fn failing_confirmations() -> Self {
        Self {
            failing_confirmations: true,
            ..Self::default()
        }
    }

    fn with_sent<T>(&self, f: impl FnOnce(&mut Sent) -> T) -> T {
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut sent)
    }

    /// Lead ids that got a customer confirmation.
    pub fn confirmations(&self) -> Vec<i64> {
        self.with_sent(|s| s.confirmations.clone())
    }

    /// `(company_id, lead_id)` of delivered alerts.
    pub fn alerts(&self) -> Vec<(i64, i64)> {
        self.with_sent(|s| s.alerts.clone())
    }

    /// `(company_id, lead_id)` of purchase confirmations.
    pub fn purchase_confirmations(&self) -> Vec<(i64, i64)> {
        self.with_sent(|s| s.purchases.clone())
    }
}

impl LeadNotifier for RecordingNotifier {
    async fn send_customer_confirmation(&self, lead: &lead::Model) -> Result<()> {
        if self.failing_confirmations {
            return Err(Error::Notification {
                message: format!("customer mailbox for lead {} unavailable", lead.id),
            });
        }
        self.with_sent(|s| s.confirmations.push(lead.id));
        Ok(())
    }

    async fn send_lead_alert(
        &self,
        company: &entities::company::Model,
        lead: &lead::Model,
    ) -> Result<()> {
        if self.failing_companies.contains(&company.id) {
            return Err(Error::Notification {
                message: format!("mailbox for company {} unavailable", company.id),
            });
        }
        self.with_sent(|s| s.alerts.push((company.id, lead.id)));
        Ok(())
    }

    async fn send_purchase_confirmation(
        &self,
        company: &entities::company::Model,
        lead: &lead::Model,
        _purchase: &lead_purchase::Model,
    ) -> Result<()> {
        self.with_sent(|s| s.purchases.push((company.id, lead.id)));
        Ok(())
    }
}
