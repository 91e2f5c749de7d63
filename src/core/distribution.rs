//! Lead distribution - Records and sends alerts to every matching company.
//!
//! Notification rows for one run are written in a single transaction. The
//! unique `(lead_id, company_id)` index makes a re-run, or two runs racing,
//! insert nothing for companies already notified, and only companies whose row
//! was inserted by this run are emailed. Messages go out after the commit and
//! their failures are logged, never propagated.

use crate::{
    core::{lead as lead_core, matching},
    entities::{
        LeadNotification,
        lead::{self, LeadStatus},
        lead_notification::{self, NotificationChannel},
    },
    errors::{Error, Result},
    notify::LeadNotifier,
};
use sea_orm::{
    ConnectionTrait, DbErr, PaginatorTrait, Set, SqlErr, TransactionTrait, prelude::*,
    sea_query::OnConflict,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// What a distribution run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionOutcome {
    /// Lead that was distributed
    pub lead_id: i64,
    /// Companies that passed matching
    pub matched: usize,
    /// Companies notified for the first time by this run
    pub newly_notified: Vec<i64>,
    /// Matched companies that already had a notification row
    pub already_notified: usize,
}

/// Inserts the notification row unless one exists. Returns whether this call
/// created it.
async fn record_notification<C>(db: &C, lead_id: i64, company_id: i64, now: DateTimeUtc) -> Result<bool>
where
    C: ConnectionTrait,
{
    let row = lead_notification::ActiveModel {
        lead_id: Set(lead_id),
        company_id: Set(company_id),
        sent_at: Set(now),
        channel: Set(NotificationChannel::Email),
        ..Default::default()
    };

    let insert = LeadNotification::insert(row)
        .on_conflict(
            OnConflict::columns([
                lead_notification::Column::LeadId,
                lead_notification::Column::CompanyId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match insert {
        Ok(rows) => Ok(rows > 0),
        Err(err) if is_duplicate(&err) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn is_duplicate(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

async fn notify_after_commit<N>(
    lead: &lead::Model,
    companies: &[crate::entities::company::Model],
    outcome: &DistributionOutcome,
    first_run: bool,
    notifier: &N,
) where
    N: LeadNotifier,
{
    if first_run && !outcome.newly_notified.is_empty() {
        if let Err(e) = notifier.send_customer_confirmation(lead).await {
            error!("Failed to send customer confirmation for lead {}: {}", lead.id, e);
        }
    }

    for company in companies
        .iter()
        .filter(|c| outcome.newly_notified.contains(&c.id))
    {
        if let Err(e) = notifier.send_lead_alert(company, lead).await {
            error!(
                "Failed to send lead alert to company {} ({}) for lead {}: {}",
                company.company_name, company.id, lead.id, e
            );
        }
    }
}

/// Distributes an active lead to its matching companies.
///
/// Returns `None` when the lead is missing or not `active`; both are logged and
/// neither is an error.
///
/// # Errors
/// Returns an error if a database call fails. The transaction is rolled back
/// and no notification row from this run is kept.
pub async fn distribute_lead<N>(
    db: &DatabaseConnection,
    lead_id: i64,
    notifier: &N,
) -> Result<Option<DistributionOutcome>>
where
    N: LeadNotifier,
{
    let txn = db.begin().await?;

    let lead = match lead_core::get_lead_by_id(&txn, lead_id).await {
        Ok(lead) => lead,
        Err(Error::LeadNotFound { .. }) => {
            warn!("Lead {} not found, nothing to distribute", lead_id);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    if lead.status != LeadStatus::Active {
        info!("Lead {} has status '{}', skipping distribution", lead_id, lead.status);
        return Ok(None);
    }

    let companies = matching::find_matching_companies(&txn, &lead).await?;
    let mut outcome = DistributionOutcome {
        lead_id,
        matched: companies.len(),
        ..DistributionOutcome::default()
    };
    if companies.is_empty() {
        info!("No matching companies for lead {}", lead_id);
        return Ok(Some(outcome));
    }

    let prior = LeadNotification::find()
        .filter(lead_notification::Column::LeadId.eq(lead_id))
        .count(&txn)
        .await?;

    let now = chrono::Utc::now();
    for company in &companies {
        if record_notification(&txn, lead_id, company.id, now).await? {
            outcome.newly_notified.push(company.id);
        } else {
            outcome.already_notified += 1;
        }
    }

    txn.commit().await?;

    notify_after_commit(&lead, &companies, &outcome, prior == 0, notifier).await;

    info!(
        "Lead {} distributed: {} matched, {} newly notified, {} already notified",
        lead_id,
        outcome.matched,
        outcome.newly_notified.len(),
        outcome.already_notified
    );
    Ok(Some(outcome))
}

/// Runs [`distribute_lead`] on its own task with a shared handle on the pool.
///
/// The submitter never sees the result; failures are logged.
pub fn spawn_distribution<N>(
    db: Arc<DatabaseConnection>,
    lead_id: i64,
    notifier: Arc<N>,
) -> JoinHandle<()>
where
    N: LeadNotifier + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = distribute_lead(&db, lead_id, notifier.as_ref()).await {
            error!("Distribution of lead {} failed and was rolled back: {}", lead_id, e);
        }
    })
}
