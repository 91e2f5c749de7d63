//! Database configuration module.
//!
//! This module handles the database connection and schema creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. The uniqueness guards the business logic relies on (one notification
//! per lead and company, one paid purchase per lead and company) are created here
//! as explicit indexes.

use crate::entities::{
    Company, Lead, LeadItem, LeadNotification, LeadPricingTier, LeadPurchase, LeadRoom,
    PaymentEvent, lead_notification,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/primehaul_leads.sqlite?mode=rwc";

/// Name of the unique `(lead_id, company_id)` index on `lead_notifications`.
pub const NOTIFICATION_PAIR_INDEX: &str = "idx_notification_lead_company";

const PAID_PURCHASE_INDEX_SQL: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_purchase_paid_lead_company \
     ON lead_purchases (lead_id, company_id) WHERE payment_status = 'paid'";

/// Gets the database URL from the `DATABASE_URL` environment variable, or the
/// default local `SQLite` file if it is not set.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection pool to the configured database.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Safe to call on every start-up.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        schema.create_table_from_entity(Lead),
        schema.create_table_from_entity(Company),
        schema.create_table_from_entity(LeadRoom),
        schema.create_table_from_entity(LeadItem),
        schema.create_table_from_entity(LeadNotification),
        schema.create_table_from_entity(LeadPurchase),
        schema.create_table_from_entity(LeadPricingTier),
        schema.create_table_from_entity(PaymentEvent),
    ];

    for mut table in tables {
        table.if_not_exists();
        db.execute(builder.build(&table)).await?;
    }

    let notification_pair = Index::create()
        .if_not_exists()
        .name(NOTIFICATION_PAIR_INDEX)
        .table(LeadNotification)
        .col(lead_notification::Column::LeadId)
        .col(lead_notification::Column::CompanyId)
        .unique()
        .to_owned();
    db.execute(builder.build(&notification_pair)).await?;

    // Partial index: failed or cancelled attempts must not block a later purchase.
    db.execute_unprepared(PAID_PURCHASE_INDEX_SQL).await?;

    info!("Database tables and indexes ensured.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        company::Model as CompanyModel, lead::Model as LeadModel,
        lead_notification::Model as LeadNotificationModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _: Vec<LeadModel> = Lead::find().limit(1).all(&db).await?;
        let _: Vec<CompanyModel> = Company::find().limit(1).all(&db).await?;
        let _: Vec<LeadNotificationModel> = LeadNotification::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_default_database_url_is_sqlite() {
        assert!(DEFAULT_DATABASE_URL.starts_with("sqlite://"));
    }
}
