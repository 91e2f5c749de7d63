//! Lead lifecycle - Survey scratch state, submission and expiry.
//!
//! A lead is created `in_progress` when a consumer starts the survey and is
//! edited freely until submission. [`submit_lead`] finalises totals, estimate
//! and price in one transaction and moves the lead to `active`; after that only
//! the expiry sweep touches it.

use crate::{
    config::settings::LeadSettings,
    core::{geo, inventory, pricing, tier},
    entities::{
        Lead,
        lead::{self, AccessDetails, LeadStatus, Location},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Set, TransactionTrait, prelude::*};
use tracing::{debug, info};

/// Contact details collected on the final survey step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    /// Customer name
    pub name: String,
    /// Customer email, required
    pub email: String,
    /// Customer phone
    pub phone: Option<String>,
}

/// Ad-campaign attribution captured from the landing URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribution {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Fails with [`Error::InvalidLeadState`] unless the lead is in `expected`.
pub(crate) fn ensure_status(lead: &lead::Model, expected: LeadStatus) -> Result<()> {
    if lead.status == expected {
        Ok(())
    } else {
        Err(Error::InvalidLeadState {
            lead_id: lead.id,
            status: lead.status,
            expected,
        })
    }
}

/// Starts a new survey with a fresh random token.
///
/// # Errors
/// Returns an error if the database insert fails.
pub async fn start_survey(db: &DatabaseConnection) -> Result<lead::Model> {
    let now = Utc::now();
    let token = uuid::Uuid::new_v4().simple().to_string();

    let lead = lead::ActiveModel {
        token: Set(token),
        created_at: Set(now),
        updated_at: Set(now),
        total_cbm: Set(0.0),
        total_weight_kg: Set(0.0),
        total_items: Set(0),
        bulky_items: Set(0),
        fragile_items: Set(0),
        status: Set(LeadStatus::InProgress),
        ..Default::default()
    };
    let lead = lead.insert(db).await?;
    debug!("Started survey for lead {}", lead.id);
    Ok(lead)
}

/// Finds a lead by its survey token.
///
/// # Errors
/// Returns [`Error::LeadNotFound`] if no lead has this token, or a database error.
pub async fn get_lead_by_token<C>(db: &C, token: &str) -> Result<lead::Model>
where
    C: ConnectionTrait,
{
    Lead::find()
        .filter(lead::Column::Token.eq(token))
        .one(db)
        .await?
        .ok_or_else(|| Error::LeadNotFound {
            reference: token.to_string(),
        })
}

/// Finds a lead by id.
///
/// # Errors
/// Returns [`Error::LeadNotFound`] if the lead does not exist, or a database error.
pub async fn get_lead_by_id<C>(db: &C, lead_id: i64) -> Result<lead::Model>
where
    C: ConnectionTrait,
{
    Lead::find_by_id(lead_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::LeadNotFound {
            reference: lead_id.to_string(),
        })
}

/// Loads an `in_progress` lead for editing.
pub(crate) async fn get_scratch_lead<C>(db: &C, token: &str) -> Result<lead::Model>
where
    C: ConnectionTrait,
{
    let lead = get_lead_by_token(db, token).await?;
    ensure_status(&lead, LeadStatus::InProgress)?;
    Ok(lead)
}

async fn update_scratch<F>(db: &DatabaseConnection, token: &str, apply: F) -> Result<lead::Model>
where
    F: FnOnce(&mut lead::ActiveModel),
{
    let lead = get_scratch_lead(db, token).await?;
    let mut active: lead::ActiveModel = lead.into();
    apply(&mut active);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Stores the pickup and drop-off locations.
///
/// `distance_miles` is recomputed when both ends have coordinates and cleared
/// otherwise.
///
/// # Errors
/// Returns an error if the lead is missing, no longer `in_progress`, or the
/// update fails.
pub async fn set_locations(
    db: &DatabaseConnection,
    token: &str,
    pickup: Location,
    dropoff: Location,
) -> Result<lead::Model> {
    let distance = match (pickup.coordinates(), dropoff.coordinates()) {
        (Some(from), Some(to)) => Some((geo::distance_miles(from, to) * 10.0).round() / 10.0),
        _ => None,
    };

    update_scratch(db, token, |lead| {
        lead.pickup = Set(Some(pickup));
        lead.dropoff = Set(Some(dropoff));
        lead.distance_miles = Set(distance);
    })
    .await
}

/// Stores the property types at both ends.
///
/// # Errors
/// Returns an error if the pickup type is blank, the lead is missing or no
/// longer `in_progress`, or the update fails.
pub async fn set_property_types(
    db: &DatabaseConnection,
    token: &str,
    pickup_type: &str,
    dropoff_type: Option<&str>,
) -> Result<lead::Model> {
    let pickup_type = pickup_type.trim();
    if pickup_type.is_empty() {
        return Err(Error::validation("Property type cannot be empty"));
    }
    let pickup_type = pickup_type.to_string();
    let dropoff_type = non_blank(dropoff_type.map(str::to_string));

    update_scratch(db, token, |lead| {
        lead.property_type = Set(Some(pickup_type));
        lead.dropoff_property_type = Set(dropoff_type);
    })
    .await
}

/// Stores the access descriptors for both ends.
///
/// # Errors
/// Returns an error if the lead is missing, no longer `in_progress`, or the
/// update fails.
pub async fn set_access(
    db: &DatabaseConnection,
    token: &str,
    pickup: Option<AccessDetails>,
    dropoff: Option<AccessDetails>,
) -> Result<lead::Model> {
    update_scratch(db, token, |lead| {
        lead.pickup_access = Set(pickup);
        lead.dropoff_access = Set(dropoff);
    })
    .await
}

/// Stores the requested move date.
///
/// # Errors
/// Returns an error if the lead is missing, no longer `in_progress`, or the
/// update fails.
pub async fn set_move_date(
    db: &DatabaseConnection,
    token: &str,
    move_date: NaiveDate,
) -> Result<lead::Model> {
    update_scratch(db, token, |lead| {
        lead.move_date = Set(Some(move_date));
    })
    .await
}

/// Stores UTM attribution.
///
/// # Errors
/// Returns an error if the lead is missing, no longer `in_progress`, or the
/// update fails.
pub async fn set_attribution(
    db: &DatabaseConnection,
    token: &str,
    attribution: Attribution,
) -> Result<lead::Model> {
    update_scratch(db, token, |lead| {
        lead.utm_source = Set(non_blank(attribution.source));
        lead.utm_medium = Set(non_blank(attribution.medium));
        lead.utm_campaign = Set(non_blank(attribution.campaign));
    })
    .await
}

fn validate_contact(contact: &ContactDetails) -> Result<(String, Option<String>, Option<String>)> {
    let email = contact.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::validation("A valid email address is required"));
    }
    Ok((
        email.to_string(),
        non_blank(Some(contact.name.clone())),
        non_blank(contact.phone.clone()),
    ))
}

/// Finalises a survey and makes the lead sellable.
///
/// Inside one transaction: recomputes inventory totals from the stored items,
/// computes the consumer estimate and the lead price, stores contact details
/// and moves the lead to `active` with `expires_at = now + expiry_days`.
/// Distribution is the caller's next step.
///
/// # Errors
/// Returns an error if:
/// - The lead does not exist or is not `in_progress` (a second submit included)
/// - The email is blank or has no `@`
/// - `settings.expiry_days` is out of range
/// - A database call fails, in which case nothing is written
pub async fn submit_lead(
    db: &DatabaseConnection,
    token: &str,
    contact: ContactDetails,
    settings: &LeadSettings,
    now: DateTime<Utc>,
) -> Result<lead::Model> {
    let (email, name, phone) = validate_contact(&contact)?;
    let expiry = settings.expiry()?;

    let txn = db.begin().await?;

    let mut lead = get_scratch_lead(&txn, token).await?;
    let items = inventory::load_items_for_lead(&txn, lead.id).await?;
    let totals = inventory::compute_totals(&items);
    totals.apply_to(&mut lead);

    let estimate = pricing::estimate_for_lead(&lead);
    let price = tier::calculate_lead_price_pence(&txn, lead.total_cbm).await?;

    let lead_id = lead.id;
    let mut active: lead::ActiveModel = lead.into();
    active.total_cbm = Set(totals.total_cbm);
    active.total_weight_kg = Set(totals.total_weight_kg);
    active.total_items = Set(totals.total_items);
    active.bulky_items = Set(totals.bulky_items);
    active.fragile_items = Set(totals.fragile_items);
    active.estimate_low = Set(Some(estimate.estimate_low));
    active.estimate_high = Set(Some(estimate.estimate_high));
    active.lead_price_pence = Set(Some(price));
    active.customer_name = Set(name);
    active.customer_email = Set(Some(email));
    active.customer_phone = Set(phone);
    active.status = Set(LeadStatus::Active);
    active.submitted_at = Set(Some(now));
    active.expires_at = Set(Some(now + expiry));
    active.updated_at = Set(now);
    let lead = active.update(&txn).await?;

    txn.commit().await?;

    info!(
        "Lead {} submitted: {:.2} CBM, estimate £{}-£{}, price {}p",
        lead_id, lead.total_cbm, estimate.estimate_low, estimate.estimate_high, price
    );
    Ok(lead)
}

/// Moves `active` leads whose `expires_at` has passed to `expired`.
///
/// # Errors
/// Returns an error if the update fails.
pub async fn expire_stale_leads(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<u64> {
    let result = Lead::update_many()
        .set(lead::ActiveModel {
            status: Set(LeadStatus::Expired),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(lead::Column::Status.eq(LeadStatus::Active))
        .filter(lead::Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!("Expired {} leads", result.rows_affected);
    }
    Ok(result.rows_affected)
}

/// Marks surveys started before `cutoff` and never submitted as `abandoned`.
///
/// # Errors
/// Returns an error if the update fails.
pub async fn abandon_stale_surveys(db: &DatabaseConnection, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = Lead::update_many()
        .set(lead::ActiveModel {
            status: Set(LeadStatus::Abandoned),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(lead::Column::Status.eq(LeadStatus::InProgress))
        .filter(lead::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!("Abandoned {} unfinished surveys", result.rows_affected);
    }
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::inventory::{self, NewItem};
    use crate::test_utils::*;
    use chrono::Duration;

    fn contact() -> ContactDetails {
        ContactDetails {
            name: "Sam Taylor".to_string(),
            email: "sam@example.com".to_string(),
            phone: Some("07700 900123".to_string()),
        }
    }

    #[tokio::test]
    async fn test_start_survey() -> Result<()> {
        let db = setup_test_db().await?;
        let first = start_survey(&db).await?;
        let second = start_survey(&db).await?;

        assert_eq!(first.status, LeadStatus::InProgress);
        assert_eq!(first.total_cbm, 0.0);
        assert_ne!(first.token, second.token);

        let found = get_lead_by_token(&db, &first.token).await?;
        assert_eq!(found.id, first.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_token() -> Result<()> {
        let db = setup_test_db().await?;
        let result = get_lead_by_token(&db, "nope").await;
        assert!(matches!(result.unwrap_err(), Error::LeadNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_locations_stores_distance() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = start_survey(&db).await?;

        let updated = set_locations(&db, &lead.token, london(), manchester()).await?;
        let distance = updated.distance_miles.unwrap();
        assert!(distance > 160.0 && distance < 170.0);
        assert_eq!(updated.pickup.unwrap().city, "London");

        let no_coords = Location {
            label: "Somewhere".to_string(),
            ..Location::default()
        };
        let updated = set_locations(&db, &lead.token, london(), no_coords).await?;
        assert!(updated.distance_miles.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_scratch_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = start_survey(&db).await?;

        set_property_types(&db, &lead.token, " House ", Some("  ")).await?;
        set_move_date(&db, &lead.token, NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()).await?;
        set_attribution(
            &db,
            &lead.token,
            Attribution {
                source: Some("facebook".to_string()),
                medium: Some(String::new()),
                campaign: None,
            },
        )
        .await?;
        let updated = set_access(
            &db,
            &lead.token,
            Some(AccessDetails {
                floors: 2,
                ..AccessDetails::default()
            }),
            None,
        )
        .await?;

        assert_eq!(updated.property_type.as_deref(), Some("House"));
        assert!(updated.dropoff_property_type.is_none());
        assert_eq!(updated.move_date, NaiveDate::from_ymd_opt(2026, 11, 2));
        assert_eq!(updated.utm_source.as_deref(), Some("facebook"));
        assert!(updated.utm_medium.is_none());
        assert_eq!(updated.pickup_access.unwrap().floors, 2);

        let result = set_property_types(&db, &lead.token, "", None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_finalises_once() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tier(&db, "Small", 0.0, Some(30.0), 1500).await?;
        create_test_tier(&db, "Large", 30.0, None, 3000).await?;

        let lead = start_survey(&db).await?;
        set_locations(&db, &lead.token, london(), manchester()).await?;
        let room = inventory::add_room(&db, &lead.token, "Lounge").await?;
        inventory::add_items(
            &db,
            room.id,
            vec![NewItem {
                name: "Sofa".to_string(),
                qty: 2,
                cbm: Some(12.5),
                weight_kg: Some(40.0),
                bulky: true,
                ..NewItem::default()
            }],
            None,
        )
        .await?;

        let settings = LeadSettings::default();
        let now = Utc::now();
        let submitted = submit_lead(&db, &lead.token, contact(), &settings, now).await?;

        assert_eq!(submitted.status, LeadStatus::Active);
        assert_eq!(submitted.total_cbm, 25.0);
        assert_eq!(submitted.bulky_items, 2);
        assert_eq!(submitted.total_items, 2);
        assert_eq!(submitted.lead_price_pence, Some(1500));
        assert_eq!(submitted.customer_email.as_deref(), Some("sam@example.com"));
        assert_eq!(submitted.expires_at, Some(now + Duration::days(14)));

        let estimate = pricing::estimate_for_lead(&submitted);
        assert!(estimate.breakdown.distance_cost > 0.0);
        assert_eq!(estimate.breakdown.bulky_surcharge, 50);
        assert_eq!(submitted.estimate_low, Some(estimate.estimate_low));
        assert_eq!(submitted.estimate_high, Some(estimate.estimate_high));

        let again = submit_lead(&db, &lead.token, contact(), &settings, now).await;
        assert!(matches!(
            again.unwrap_err(),
            Error::InvalidLeadState {
                status: LeadStatus::Active,
                expected: LeadStatus::InProgress,
                ..
            }
        ));

        let edit = set_move_date(&db, &lead.token, now.date_naive()).await;
        assert!(matches!(edit.unwrap_err(), Error::InvalidLeadState { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_expiry() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = start_survey(&db).await?;

        for expiry_days in [i64::MAX / 1000, -1, 0] {
            let settings = LeadSettings {
                expiry_days,
                ..LeadSettings::default()
            };
            let result = submit_lead(&db, &lead.token, contact(), &settings, Utc::now()).await;
            assert!(matches!(result.unwrap_err(), Error::Config { .. }));
        }

        let still = get_lead_by_token(&db, &lead.token).await?;
        assert_eq!(still.status, LeadStatus::InProgress);
        assert!(still.expires_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_requires_email() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = start_survey(&db).await?;

        for email in ["", "   ", "not-an-email"] {
            let details = ContactDetails {
                email: email.to_string(),
                ..contact()
            };
            let result =
                submit_lead(&db, &lead.token, details, &LeadSettings::default(), Utc::now()).await;
            assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        }

        let still = get_lead_by_token(&db, &lead.token).await?;
        assert_eq!(still.status, LeadStatus::InProgress);
        Ok(())
    }

    #[tokio::test]
    async fn test_expire_stale_leads() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let old = create_active_lead(&db, 10.0, Some(london())).await?;
        let fresh = create_active_lead(&db, 10.0, Some(london())).await?;

        let mut active: lead::ActiveModel = old.clone().into();
        active.expires_at = Set(Some(now - Duration::days(1)));
        active.update(&db).await?;

        assert_eq!(expire_stale_leads(&db, now).await?, 1);
        assert_eq!(expire_stale_leads(&db, now).await?, 0);

        assert_eq!(get_lead_by_id(&db, old.id).await?.status, LeadStatus::Expired);
        assert_eq!(get_lead_by_id(&db, fresh.id).await?.status, LeadStatus::Active);
        Ok(())
    }

    #[tokio::test]
    async fn test_abandon_stale_surveys() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = start_survey(&db).await?;
        let submitted = create_active_lead(&db, 5.0, None).await?;

        let cutoff = Utc::now() + Duration::hours(1);
        assert_eq!(abandon_stale_surveys(&db, cutoff).await?, 1);
        assert_eq!(
            get_lead_by_id(&db, lead.id).await?.status,
            LeadStatus::Abandoned
        );
        assert_eq!(
            get_lead_by_id(&db, submitted.id).await?.status,
            LeadStatus::Active
        );
        Ok(())
    }
}
