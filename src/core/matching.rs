//! Lead matching - Which companies should hear about a lead.
//!
//! Matching is an eligibility filter, not a ranking. A candidate is an active
//! company with a base location; each candidate is checked for distance,
//! minimum volume, maximum volume and property type, in that order, and the
//! first failing check rejects it.

use crate::{
    core::{
        company::DEFAULT_SERVICE_RADIUS_MILES,
        geo::{self, Coordinates},
    },
    entities::{Company, company, lead},
    errors::Result,
};
use sea_orm::{ConnectionTrait, QueryOrder, prelude::*};
use std::fmt;
use tracing::{debug, info, warn};

/// Why a company did not match a lead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// The company has no base coordinates
    NoBaseLocation,
    /// Pickup is further than the service radius
    OutOfRange {
        /// Distance from base to pickup
        distance_miles: f64,
        /// Company radius
        radius_miles: f64,
    },
    /// Lead is smaller than the company minimum
    BelowMinimumVolume,
    /// Lead is larger than the company maximum
    AboveMaximumVolume,
    /// Lead property type is not in the company's list
    PropertyTypeExcluded,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBaseLocation => f.write_str("no base location"),
            Self::OutOfRange {
                distance_miles,
                radius_miles,
            } => write!(f, "{distance_miles:.1} mi is outside {radius_miles} mi radius"),
            Self::BelowMinimumVolume => f.write_str("below minimum volume"),
            Self::AboveMaximumVolume => f.write_str("above maximum volume"),
            Self::PropertyTypeExcluded => f.write_str("property type excluded"),
        }
    }
}

fn base_coordinates(company: &company::Model) -> Option<Coordinates> {
    match (company.base_lat, company.base_lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        _ => None,
    }
}

fn accepts_property_type(company: &company::Model, property_type: &str) -> bool {
    let Some(allowed) = &company.pref_property_types else {
        return true;
    };
    let mut allowed = allowed.0.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).peekable();
    if allowed.peek().is_none() {
        return true;
    }
    let wanted = property_type.trim();
    allowed.any(|t| t.eq_ignore_ascii_case(wanted))
}

/// Checks one company against a lead's pickup point.
///
/// Returns the distance in miles on success.
///
/// # Errors
/// Returns the first [`Rejection`] that applies.
pub fn evaluate(
    company: &company::Model,
    lead: &lead::Model,
    pickup: Coordinates,
) -> std::result::Result<f64, Rejection> {
    let base = base_coordinates(company).ok_or(Rejection::NoBaseLocation)?;
    if !base.is_valid() || !pickup.is_valid() {
        // distance_miles falls back to 0.0, so the radius check always passes
        warn!(
            "Invalid coordinates comparing company {} with lead {}",
            company.id, lead.id
        );
    }

    let distance = geo::distance_miles(base, pickup);
    let radius = f64::from(
        company
            .service_radius_miles
            .unwrap_or(DEFAULT_SERVICE_RADIUS_MILES),
    );
    if distance > radius {
        return Err(Rejection::OutOfRange {
            distance_miles: distance,
            radius_miles: radius,
        });
    }

    if company.pref_min_cbm.is_some_and(|min| lead.total_cbm < min) {
        return Err(Rejection::BelowMinimumVolume);
    }
    if company.pref_max_cbm.is_some_and(|max| lead.total_cbm > max) {
        return Err(Rejection::AboveMaximumVolume);
    }

    if !accepts_property_type(company, lead.property_type.as_deref().unwrap_or("")) {
        return Err(Rejection::PropertyTypeExcluded);
    }

    Ok(distance)
}

/// Filters `candidates` down to the companies that match `lead`.
///
/// A lead without pickup coordinates matches nobody.
#[must_use]
pub fn select_matches(lead: &lead::Model, candidates: Vec<company::Model>) -> Vec<company::Model> {
    let Some(pickup) = lead.pickup_coordinates() else {
        return Vec::new();
    };

    candidates
        .into_iter()
        .filter(|company| match evaluate(company, lead, pickup) {
            Ok(distance) => {
                debug!(
                    "Lead {} matched company {} ({:.1} mi)",
                    lead.id, company.company_name, distance
                );
                true
            }
            Err(reason) => {
                debug!(
                    "Lead {} skipped company {}: {}",
                    lead.id, company.company_name, reason
                );
                false
            }
        })
        .collect()
}

/// Active companies that have a base location.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn candidate_companies<C>(db: &C) -> Result<Vec<company::Model>>
where
    C: ConnectionTrait,
{
    Company::find()
        .filter(company::Column::IsActive.eq(true))
        .filter(company::Column::BaseLat.is_not_null())
        .filter(company::Column::BaseLng.is_not_null())
        .order_by_asc(company::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Companies that should be notified about `lead`.
///
/// Returns an empty list, without querying, when the lead has no pickup
/// coordinates.
///
/// # Errors
/// Returns an error if the candidate query fails.
pub async fn find_matching_companies<C>(db: &C, lead: &lead::Model) -> Result<Vec<company::Model>>
where
    C: ConnectionTrait,
{
    if lead.pickup_coordinates().is_none() {
        warn!("Lead {} has no pickup coordinates, cannot match companies", lead.id);
        return Ok(Vec::new());
    }

    let candidates = candidate_companies(db).await?;
    let total = candidates.len();
    let matched = select_matches(lead, candidates);
    info!(
        "Lead {}: {} of {} active companies matched",
        lead.id,
        matched.len(),
        total
    );
    Ok(matched)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::company::PropertyTypes;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Transaction};

    fn lead_at(pickup: Option<Coordinates>, cbm: f64, property_type: &str) -> lead::Model {
        let mut lead = sample_lead();
        lead.pickup = pickup.map(|c| lead::Location {
            lat: Some(c.lat),
            lng: Some(c.lng),
            ..lead::Location::default()
        });
        lead.total_cbm = cbm;
        lead.property_type = Some(property_type.to_string());
        lead
    }

    fn company_at(id: i64, base: Option<Coordinates>) -> company::Model {
        let mut company = sample_company(id);
        company.base_lat = base.map(|c| c.lat);
        company.base_lng = base.map(|c| c.lng);
        company
    }

    const LONDON: Coordinates = Coordinates::new(51.5074, -0.1278);
    const CROYDON: Coordinates = Coordinates::new(51.3762, -0.0982);
    const MANCHESTER: Coordinates = Coordinates::new(53.4808, -2.2426);

    #[test]
    fn test_company_without_base_never_matches() {
        let lead = lead_at(Some(LONDON), 10.0, "House");
        let mut company = company_at(1, None);
        company.service_radius_miles = Some(500);
        assert_eq!(
            evaluate(&company, &lead, LONDON),
            Err(Rejection::NoBaseLocation)
        );
        assert!(select_matches(&lead, vec![company]).is_empty());
    }

    #[test]
    fn test_radius() {
        let lead = lead_at(Some(LONDON), 10.0, "House");
        let nearby = company_at(1, Some(CROYDON));
        let far = company_at(2, Some(MANCHESTER));

        let matched = select_matches(&lead, vec![nearby, far.clone()]);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, 1);
        assert!(matches!(
            evaluate(&far, &lead, LONDON),
            Err(Rejection::OutOfRange { .. })
        ));

        let mut wide = far;
        wide.service_radius_miles = Some(200);
        assert!(evaluate(&wide, &lead, LONDON).is_ok());
    }

    #[test]
    fn test_volume_bounds() {
        let lead = lead_at(Some(LONDON), 10.0, "House");
        let mut company = company_at(1, Some(LONDON));

        company.pref_min_cbm = Some(20.0);
        assert_eq!(
            evaluate(&company, &lead, LONDON),
            Err(Rejection::BelowMinimumVolume)
        );

        company.pref_min_cbm = Some(10.0);
        company.pref_max_cbm = Some(5.0);
        assert_eq!(
            evaluate(&company, &lead, LONDON),
            Err(Rejection::AboveMaximumVolume)
        );

        company.pref_max_cbm = Some(10.0);
        assert!(evaluate(&company, &lead, LONDON).is_ok());
    }

    #[test]
    fn test_property_type_filter() {
        let flat = lead_at(Some(LONDON), 10.0, "Flat");
        let house = lead_at(Some(LONDON), 10.0, "house");

        let mut open = company_at(1, Some(LONDON));
        assert!(evaluate(&open, &flat, LONDON).is_ok());
        open.pref_property_types = Some(PropertyTypes(Vec::new()));
        assert!(evaluate(&open, &flat, LONDON).is_ok());

        let mut houses_only = company_at(2, Some(LONDON));
        houses_only.pref_property_types = Some(PropertyTypes(vec!["House".to_string()]));
        assert_eq!(
            evaluate(&houses_only, &flat, LONDON),
            Err(Rejection::PropertyTypeExcluded)
        );
        assert!(evaluate(&houses_only, &house, LONDON).is_ok());
    }

    #[test]
    fn test_invalid_base_coordinates_fall_through() {
        let lead = lead_at(Some(LONDON), 10.0, "House");
        let corrupt = company_at(1, Some(Coordinates::new(999.0, 0.0)));
        assert_eq!(evaluate(&corrupt, &lead, LONDON), Ok(0.0));
    }

    #[tokio::test]
    async fn test_no_pickup_coordinates_skips_query() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let lead = lead_at(None, 10.0, "House");

        let matched = find_matching_companies(&db, &lead).await?;
        assert!(matched.is_empty());
        assert_eq!(db.into_transaction_log(), Vec::<Transaction>::new());
        Ok(())
    }

    #[tokio::test]
    async fn test_candidates_exclude_inactive_and_unlocated() -> Result<()> {
        let db = setup_test_db().await?;
        let located = create_located_company(&db, "Located", LONDON, 30).await?;
        create_test_company(&db, "Unlocated").await?;
        let retired = create_located_company(&db, "Retired", LONDON, 30).await?;
        crate::core::company::deactivate_company(&db, retired.id).await?;

        let candidates = candidate_companies(&db).await?;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, located.id);

        let lead = create_active_lead(&db, 10.0, Some(london())).await?;
        let matched = find_matching_companies(&db, &lead).await?;
        assert_eq!(matched.len(), 1);
        Ok(())
    }
}
