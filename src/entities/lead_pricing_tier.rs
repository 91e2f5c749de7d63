//! Lead pricing tier entity - Admin-configured volume band mapped to a flat price.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pricing tier database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead_pricing_tiers")]
pub struct Model {
    /// Unique identifier for the tier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name ("Small move")
    pub name: String,
    /// Lower volume bound in cubic metres
    pub min_cbm: f64,
    /// Upper volume bound; unset means unbounded
    pub max_cbm: Option<f64>,
    /// Flat lead price in pence
    pub price_pence: i64,
    /// Inactive tiers are ignored by the price lookup
    pub is_active: bool,
    /// When the tier was created
    pub created_at: DateTimeUtc,
}

/// `LeadPricingTier` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
