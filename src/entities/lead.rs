//! Lead entity - One consumer moving-survey submission.
//!
//! A lead is mutable scratch state while the survey is `in_progress`. Totals,
//! estimate and price are finalised once, when the status moves to `active`.
//! Locations and access descriptors are stored as JSON documents.

use crate::core::geo::Coordinates;
use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a lead. Only `Active` leads are distributed or sold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Survey still being filled in
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Submitted, priced and available to companies
    #[sea_orm(string_value = "active")]
    Active,
    /// Past its expiry timestamp
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Survey left unfinished
    #[sea_orm(string_value = "abandoned")]
    Abandoned,
}

impl LeadStatus {
    /// Stored string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geocoded pickup or drop-off point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(default)]
pub struct Location {
    /// Free-text geocoder label ("12 High St, Leeds, ...")
    pub label: String,
    /// Latitude in degrees
    pub lat: Option<f64>,
    /// Longitude in degrees
    pub lng: Option<f64>,
    /// Full postcode as entered
    pub postcode: String,
    /// City resolved by the geocoder
    pub city: String,
}

impl Location {
    /// Both coordinates, when present.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }
}

/// Kind of parking available to the removal vehicle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParkingType {
    /// Private driveway at the door
    #[default]
    Driveway,
    /// Unrestricted street parking
    Street,
    /// Permit or paid bay required
    Permit,
    /// Limited or unreliable parking
    Limited,
}

/// Access difficulty at one end of the move.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(default)]
pub struct AccessDetails {
    /// Floors above (or below) street level
    pub floors: u32,
    /// Whether a usable lift exists
    pub has_lift: bool,
    /// Parking situation
    pub parking_type: ParkingType,
    /// Walking distance from the vehicle to the door, in metres
    pub parking_distance_m: u32,
    /// Narrow stairs, doors or passages
    pub narrow_access: bool,
    /// Loading only permitted in certain hours
    pub time_restriction: bool,
    /// Lift/loading bay must be booked
    pub booking_required: bool,
    /// Steps between vehicle and door
    pub outdoor_steps: u32,
    /// Long garden or outdoor path
    pub outdoor_path: bool,
}

/// Lead database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    /// Unique identifier for the lead
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Random survey token used in consumer URLs
    #[sea_orm(unique)]
    pub token: String,
    /// When the survey was started
    pub created_at: DateTimeUtc,
    /// Last scratch or status change
    pub updated_at: DateTimeUtc,

    /// Pickup location document
    #[sea_orm(column_type = "Json", nullable)]
    pub pickup: Option<Location>,
    /// Drop-off location document
    #[sea_orm(column_type = "Json", nullable)]
    pub dropoff: Option<Location>,
    /// Pickup to drop-off distance, when both are geocoded
    pub distance_miles: Option<f64>,

    /// Property being moved out of ("House", "Flat", ...)
    pub property_type: Option<String>,
    /// Property being moved into
    pub dropoff_property_type: Option<String>,
    /// Requested move date
    pub move_date: Option<Date>,

    /// Access difficulty at pickup
    #[sea_orm(column_type = "Json", nullable)]
    pub pickup_access: Option<AccessDetails>,
    /// Access difficulty at drop-off
    #[sea_orm(column_type = "Json", nullable)]
    pub dropoff_access: Option<AccessDetails>,

    /// Customer contact, collected last
    pub customer_name: Option<String>,
    /// Customer email address
    pub customer_email: Option<String>,
    /// Customer phone number
    pub customer_phone: Option<String>,

    /// Total inventory volume in cubic metres
    pub total_cbm: f64,
    /// Total inventory weight in kilograms
    pub total_weight_kg: f64,
    /// Number of items (quantities included)
    pub total_items: i32,
    /// Number of bulky items
    pub bulky_items: i32,
    /// Number of fragile items
    pub fragile_items: i32,

    /// Consumer-facing estimate range, lower bound
    pub estimate_low: Option<i64>,
    /// Consumer-facing estimate range, upper bound
    pub estimate_high: Option<i64>,

    /// Lifecycle status
    pub status: LeadStatus,
    /// When the consumer submitted contact details
    pub submitted_at: Option<DateTimeUtc>,
    /// When the lead stops being sellable
    pub expires_at: Option<DateTimeUtc>,

    /// Flat price charged to a company, in pence
    pub lead_price_pence: Option<i64>,

    /// Ad attribution
    pub utm_source: Option<String>,
    /// Ad attribution
    pub utm_medium: Option<String>,
    /// Ad attribution
    pub utm_campaign: Option<String>,
}

impl Model {
    /// Pickup coordinates, the anchor for company matching.
    #[must_use]
    pub fn pickup_coordinates(&self) -> Option<Coordinates> {
        self.pickup.as_ref().and_then(Location::coordinates)
    }

    /// Drop-off coordinates.
    #[must_use]
    pub fn dropoff_coordinates(&self) -> Option<Coordinates> {
        self.dropoff.as_ref().and_then(Location::coordinates)
    }
}

/// Defines relationships between Lead and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One lead has many survey rooms
    #[sea_orm(has_many = "super::lead_room::Entity")]
    Rooms,
    /// One lead is announced to many companies
    #[sea_orm(has_many = "super::lead_notification::Entity")]
    Notifications,
    /// One lead can be bought by many companies
    #[sea_orm(has_many = "super::lead_purchase::Entity")]
    Purchases,
}

impl Related<super::lead_room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rooms.def()
    }
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
