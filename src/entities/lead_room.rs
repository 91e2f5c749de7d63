//! Lead room entity - A room the consumer photographed during the survey.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Survey room database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead_rooms")]
pub struct Model {
    /// Unique identifier for the room
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Lead this room belongs to
    #[sea_orm(indexed)]
    pub lead_id: i64,
    /// Room name ("Kitchen", "Bedroom 2")
    pub name: String,
    /// Short description of the contents, usually from the vision service
    pub summary: Option<String>,
    /// When the room was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between rooms and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each room belongs to one lead
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id"
    )]
    Lead,
    /// One room holds many inventory items
    #[sea_orm(has_many = "super::lead_item::Entity")]
    Items,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl Related<super::lead_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
