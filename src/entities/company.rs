//! Company entity - A removal business that receives and buys leads.
//!
//! Matching needs a base location; companies without one are never matched.
//! Companies are deactivated rather than deleted.

use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Property types a company accepts, stored as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct PropertyTypes(pub Vec<String>);

/// Company database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    /// Unique identifier for the company
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Trading name
    pub company_name: String,
    /// URL-safe unique handle derived from the name
    #[sea_orm(unique)]
    pub slug: String,
    /// Account email, lower-cased
    #[sea_orm(unique)]
    pub email: String,
    /// Contact phone
    pub phone: Option<String>,

    /// Postcode of the depot
    pub base_postcode: Option<String>,
    /// Depot latitude
    pub base_lat: Option<f64>,
    /// Depot longitude
    pub base_lng: Option<f64>,
    /// How far the company will travel, 30 miles when unset
    pub service_radius_miles: Option<i32>,

    /// Smallest job accepted, in cubic metres
    pub pref_min_cbm: Option<f64>,
    /// Largest job accepted, in cubic metres
    pub pref_max_cbm: Option<f64>,
    /// Accepted property types; unset or empty accepts everything
    #[sea_orm(column_type = "Json", nullable)]
    pub pref_property_types: Option<PropertyTypes>,
    /// Alert address override
    pub pref_notification_email: Option<String>,
    /// Alert phone override
    pub pref_notification_phone: Option<String>,

    /// Customer id at the payment processor
    #[sea_orm(unique)]
    pub payment_customer_id: Option<String>,

    /// Soft-delete flag; inactive companies are never matched
    pub is_active: bool,
    /// Checked by an admin
    pub is_verified: bool,
    /// When the company registered
    pub created_at: DateTimeUtc,
    /// Last profile change
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Company and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One company receives many lead notifications
    #[sea_orm(has_many = "super::lead_notification::Entity")]
    Notifications,
    /// One company makes many purchases
    #[sea_orm(has_many = "super::lead_purchase::Entity")]
    Purchases,
}

impl Related<super::lead_notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl Related<super::lead_purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
