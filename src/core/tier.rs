//! Pricing tier business logic - Admin management of the volume-band price table.
//!
//! Tiers map a volume band to the flat price a company pays for a lead. The
//! lookup itself lives in [`crate::core::pricing::lookup_lead_price`]; this module
//! loads the active tiers in ascending `min_cbm` order and keeps the table
//! editable without a deploy.

use crate::{
    config::settings::TierConfig,
    core::pricing::{self, TierBand},
    entities::{LeadPricingTier, lead_pricing_tier},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Input for a new tier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTier {
    /// Display name
    pub name: String,
    /// Lower volume bound in cubic metres
    pub min_cbm: f64,
    /// Upper volume bound, `None` for unbounded
    pub max_cbm: Option<f64>,
    /// Flat lead price in pence
    pub price_pence: i64,
}

impl From<&TierConfig> for NewTier {
    fn from(config: &TierConfig) -> Self {
        Self {
            name: config.name.clone(),
            min_cbm: config.min_cbm,
            max_cbm: config.max_cbm,
            price_pence: config.price_pence,
        }
    }
}

fn validate_tier(tier: &NewTier) -> Result<()> {
    if tier.name.trim().is_empty() {
        return Err(Error::validation("Tier name cannot be empty"));
    }
    if !tier.min_cbm.is_finite() || tier.min_cbm < 0.0 {
        return Err(Error::InvalidVolume {
            volume: tier.min_cbm,
        });
    }
    if let Some(max) = tier.max_cbm {
        if !max.is_finite() || max <= tier.min_cbm {
            return Err(Error::InvalidVolume { volume: max });
        }
    }
    if tier.price_pence < 0 {
        return Err(Error::validation("Tier price cannot be negative"));
    }
    Ok(())
}

/// Creates a new active tier.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - A bound is negative, not finite, or `max_cbm <= min_cbm`
/// - The price is negative
/// - The database insert fails
pub async fn create_tier<C>(db: &C, tier: NewTier) -> Result<lead_pricing_tier::Model>
where
    C: ConnectionTrait,
{
    validate_tier(&tier)?;

    let model = lead_pricing_tier::ActiveModel {
        name: Set(tier.name.trim().to_string()),
        min_cbm: Set(tier.min_cbm),
        max_cbm: Set(tier.max_cbm),
        price_pence: Set(tier.price_pence),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!(
        "Created pricing tier '{}' ({} - {:?} CBM) at {}p",
        created.name, created.min_cbm, created.max_cbm, created.price_pence
    );
    Ok(created)
}

/// All tiers, active or not, in ascending `min_cbm` order.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_tiers(db: &DatabaseConnection) -> Result<Vec<lead_pricing_tier::Model>> {
    LeadPricingTier::find()
        .order_by_asc(lead_pricing_tier::Column::MinCbm)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active tiers in ascending `min_cbm` order.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_active_tiers<C>(db: &C) -> Result<Vec<lead_pricing_tier::Model>>
where
    C: ConnectionTrait,
{
    LeadPricingTier::find()
        .filter(lead_pricing_tier::Column::IsActive.eq(true))
        .order_by_asc(lead_pricing_tier::Column::MinCbm)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Flips a tier's active flag and returns the updated row.
///
/// # Errors
/// Returns an error if the tier does not exist or the update fails.
pub async fn toggle_tier(db: &DatabaseConnection, tier_id: i64) -> Result<lead_pricing_tier::Model> {
    let tier = LeadPricingTier::find_by_id(tier_id)
        .one(db)
        .await?
        .ok_or(Error::TierNotFound { id: tier_id })?;

    let now_active = !tier.is_active;
    let mut active: lead_pricing_tier::ActiveModel = tier.into();
    active.is_active = Set(now_active);
    let updated = active.update(db).await?;
    info!("Pricing tier {} is now active={}", tier_id, now_active);
    Ok(updated)
}

/// Inserts the configured tiers when the table is empty.
///
/// Returns how many tiers were created; an already-populated table is left
/// untouched.
///
/// # Errors
/// Returns an error if a configured tier is invalid or a database call fails.
pub async fn seed_tiers(db: &DatabaseConnection, tiers: &[TierConfig]) -> Result<usize> {
    let existing = LeadPricingTier::find().count(db).await?;
    if existing > 0 {
        debug!("Tier table already has {} rows, skipping seed", existing);
        return Ok(0);
    }

    for config in tiers {
        create_tier(db, NewTier::from(config)).await?;
    }
    Ok(tiers.len())
}

/// Price in pence a company pays for a lead of `volume` cubic metres.
///
/// Uses the active tiers; falls back to
/// [`DEFAULT_LEAD_PRICE_PENCE`](pricing::DEFAULT_LEAD_PRICE_PENCE) when none
/// covers the volume.
///
/// # Errors
/// Returns an error if the volume is negative or not finite, or the tier query
/// fails.
pub async fn calculate_lead_price_pence<C>(db: &C, volume: f64) -> Result<i64>
where
    C: ConnectionTrait,
{
    if !volume.is_finite() || volume < 0.0 {
        return Err(Error::InvalidVolume { volume });
    }

    let bands: Vec<TierBand> = get_active_tiers(db)
        .await?
        .iter()
        .map(TierBand::from)
        .collect();
    Ok(pricing::lookup_lead_price(volume, &bands))
}
