//! Lead purchase entity - The revenue table.
//!
//! A purchase starts `pending` when checkout begins and becomes `paid` exactly
//! once. At most one paid purchase exists per `(lead_id, company_id)`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment lifecycle of a purchase.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Checkout started, awaiting confirmation
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Payment confirmed
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Payment declined
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Checkout abandoned or expired
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Lead purchase database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead_purchases")]
pub struct Model {
    /// Unique identifier for the purchase
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Lead being bought
    #[sea_orm(indexed)]
    pub lead_id: i64,
    /// Company buying it
    #[sea_orm(indexed)]
    pub company_id: i64,
    /// When checkout began
    pub created_at: DateTimeUtc,
    /// Amount charged, in pence
    pub price_pence: i64,
    /// Processor payment-intent id, known once paid
    #[sea_orm(unique)]
    pub payment_intent_id: Option<String>,
    /// Processor checkout-session id
    #[sea_orm(unique)]
    pub checkout_session_id: Option<String>,
    /// Payment lifecycle
    pub payment_status: PaymentStatus,
    /// When payment was confirmed
    pub paid_at: Option<DateTimeUtc>,
}

/// Defines relationships between purchases and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each purchase is for one lead
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id"
    )]
    Lead,
    /// Each purchase is made by one company
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
