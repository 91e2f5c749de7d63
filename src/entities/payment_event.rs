//! Payment event entity - Audit log of payment-processor webhook events.
//! The external event id is unique so replays are detected.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_events")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event id assigned by the processor
    #[sea_orm(unique)]
    pub external_event_id: String,
    /// Event type (`"checkout.session.completed"`)
    pub event_type: String,
    /// Raw event body
    pub payload: Json,
    /// Whether the event has been fully handled
    pub processed: bool,
    /// When the event was first received
    pub created_at: DateTimeUtc,
}

/// `PaymentEvent` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
