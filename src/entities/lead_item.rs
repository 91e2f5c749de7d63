//! Lead item entity - One inventory line in a survey room.
//!
//! Quantities multiply `cbm` and `weight_kg` when the lead totals are computed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead_items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Room the item was found in
    #[sea_orm(indexed)]
    pub room_id: i64,
    /// Item name ("Double wardrobe")
    pub name: String,
    /// How many of this item
    pub qty: i32,
    /// Length in centimetres
    pub length_cm: Option<f64>,
    /// Width in centimetres
    pub width_cm: Option<f64>,
    /// Height in centimetres
    pub height_cm: Option<f64>,
    /// Weight of one unit in kilograms
    pub weight_kg: Option<f64>,
    /// Volume of one unit in cubic metres
    pub cbm: Option<f64>,
    /// Needs two people or special handling
    pub bulky: bool,
    /// Needs careful packing
    pub fragile: bool,
    /// Free-form category ("furniture", "appliance")
    pub item_category: Option<String>,
    /// Packing note ("wrap", "crate")
    pub packing_requirement: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Defines relationships between items and rooms
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one room
    #[sea_orm(
        belongs_to = "super::lead_room::Entity",
        from = "Column::RoomId",
        to = "super::lead_room::Column::Id"
    )]
    Room,
}

impl Related<super::lead_room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
