//! Lead notification entity - Records that a company was alerted to a lead.
//!
//! `(lead_id, company_id)` is unique at the storage layer, which is what makes
//! re-running distribution for a lead safe.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How the alert was delivered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    /// Email alert
    #[sea_orm(string_value = "email")]
    Email,
    /// Text message alert
    #[sea_orm(string_value = "sms")]
    Sms,
}

/// Lead notification database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead_notifications")]
pub struct Model {
    /// Unique identifier for the notification
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Lead that was announced
    #[sea_orm(indexed)]
    pub lead_id: i64,
    /// Company that was alerted
    #[sea_orm(indexed)]
    pub company_id: i64,
    /// When the notification row was written
    pub sent_at: DateTimeUtc,
    /// Delivery channel
    pub channel: NotificationChannel,
    /// First time the company opened the lead preview
    pub opened_at: Option<DateTimeUtc>,
    /// When the company paid for the lead
    pub purchased_at: Option<DateTimeUtc>,
}

/// Defines relationships between notifications and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each notification refers to one lead
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id"
    )]
    Lead,
    /// Each notification was sent to one company
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
