//! Lead purchases - Checkout bookkeeping and payment-event processing.
//!
//! A purchase row is created `pending` when a company starts checkout and is
//! promoted to `paid` exactly once, when the processor reports the session as
//! completed. Processor events are recorded in `payment_events` by their
//! external id so a replayed webhook is acknowledged without being applied
//! twice. Signature verification belongs to the webhook glue, not here.

use crate::{
    core::{company as company_core, lead as lead_core, tier},
    entities::{
        LeadItem, LeadNotification, LeadPurchase, LeadRoom, PaymentEvent,
        lead::{self, LeadStatus},
        lead_item, lead_notification,
        lead_purchase::{self, PaymentStatus},
        lead_room, payment_event,
    },
    errors::{Error, Result},
    notify::LeadNotifier,
};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use serde_json::Value;
use tracing::{error, info, warn};

/// Metadata `type` that marks a checkout session as a lead purchase.
pub const LEAD_PURCHASE_METADATA_TYPE: &str = "lead_purchase";
const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const CHECKOUT_EXPIRED: &str = "checkout.session.expired";

/// Result of applying a completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The pending purchase is now paid
    Confirmed(lead_purchase::Model),
    /// The purchase was already paid; nothing changed
    AlreadyPaid,
    /// Not a lead purchase, or the session id was missing
    Ignored,
    /// No purchase row references the session
    UnknownSession,
}

/// Result of processing one processor event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event id has been processed before
    AlreadyProcessed,
    /// The event was dispatched to a handler
    Processed,
    /// Recorded and acknowledged; no handler for this type
    Ignored,
}

/// A processor event as received by the webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEventInput {
    /// Processor event id
    pub external_id: String,
    /// Event type, e.g. `checkout.session.completed`
    pub event_type: String,
    /// Full event body
    pub payload: Value,
}

impl PaymentEventInput {
    /// Reads `id` and `type` from a raw event body.
    ///
    /// # Errors
    /// Returns a validation error if either field is missing.
    pub fn from_payload(payload: Value) -> Result<Self> {
        let external_id = payload
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("Payment event has no id"))?
            .to_string();
        let event_type = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("Payment event has no type"))?
            .to_string();
        Ok(Self {
            external_id,
            event_type,
            payload,
        })
    }
}

async fn paid_purchase<C>(db: &C, lead_id: i64, company_id: i64) -> Result<Option<lead_purchase::Model>>
where
    C: ConnectionTrait,
{
    LeadPurchase::find()
        .filter(lead_purchase::Column::LeadId.eq(lead_id))
        .filter(lead_purchase::Column::CompanyId.eq(company_id))
        .filter(lead_purchase::Column::PaymentStatus.eq(PaymentStatus::Paid))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Whether the company has paid for the lead; gates the contact reveal.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn has_purchased<C>(db: &C, lead_id: i64, company_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(paid_purchase(db, lead_id, company_id).await?.is_some())
}

async fn check_purchasable<C>(db: &C, lead_id: i64, company_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let lead = lead_core::get_lead_by_id(db, lead_id).await?;
    lead_core::ensure_status(&lead, LeadStatus::Active)?;

    let company = company_core::get_company_by_id(db, company_id).await?;
    if !company.is_active {
        return Err(Error::validation(format!(
            "Company {company_id} is not active"
        )));
    }

    if paid_purchase(db, lead_id, company_id).await?.is_some() {
        return Err(Error::AlreadyPurchased {
            lead_id,
            company_id,
        });
    }

    match lead.lead_price_pence {
        Some(price) => Ok(price),
        None => tier::calculate_lead_price_pence(db, lead.total_cbm).await,
    }
}

async fn stamp_notification<C>(db: &C, lead_id: i64, company_id: i64, now: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    LeadNotification::update_many()
        .set(lead_notification::ActiveModel {
            purchased_at: Set(Some(now)),
            ..Default::default()
        })
        .filter(lead_notification::Column::LeadId.eq(lead_id))
        .filter(lead_notification::Column::CompanyId.eq(company_id))
        .filter(lead_notification::Column::PurchasedAt.is_null())
        .exec(db)
        .await?;
    Ok(())
}

fn map_paid_conflict(err: DbErr, lead_id: i64, company_id: i64) -> Error {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        Error::AlreadyPurchased {
            lead_id,
            company_id,
        }
    } else {
        err.into()
    }
}

/// Records the start of a checkout for a lead.
///
/// An existing pending purchase is re-pointed at the new session, so a company
/// that abandons and restarts checkout keeps one row.
///
/// # Errors
/// Returns an error if:
/// - The lead is missing or not `active`
/// - The company is missing or inactive
/// - The company already paid for this lead ([`Error::AlreadyPurchased`])
/// - A database call fails
pub async fn begin_purchase(
    db: &DatabaseConnection,
    lead_id: i64,
    company_id: i64,
    checkout_session_id: &str,
) -> Result<lead_purchase::Model> {
    let txn = db.begin().await?;
    let price = check_purchasable(&txn, lead_id, company_id).await?;

    let pending = LeadPurchase::find()
        .filter(lead_purchase::Column::LeadId.eq(lead_id))
        .filter(lead_purchase::Column::CompanyId.eq(company_id))
        .filter(lead_purchase::Column::PaymentStatus.eq(PaymentStatus::Pending))
        .order_by_desc(lead_purchase::Column::Id)
        .one(&txn)
        .await?;

    let purchase = if let Some(pending) = pending {
        let mut active: lead_purchase::ActiveModel = pending.into();
        active.checkout_session_id = Set(Some(checkout_session_id.to_string()));
        active.update(&txn).await?
    } else {
        lead_purchase::ActiveModel {
            lead_id: Set(lead_id),
            company_id: Set(company_id),
            created_at: Set(Utc::now()),
            price_pence: Set(price),
            checkout_session_id: Set(Some(checkout_session_id.to_string())),
            payment_status: Set(PaymentStatus::Pending),
            ..Default::default()
        }
        .insert(&txn)
        .await?
    };

    txn.commit().await?;
    info!(
        "Checkout {} started: lead {}, company {}, {}p",
        checkout_session_id, lead_id, company_id, purchase.price_pence
    );
    Ok(purchase)
}

/// Records a paid purchase without a payment processor (development mode).
///
/// # Errors
/// Same conditions as [`begin_purchase`].
pub async fn record_direct_purchase(
    db: &DatabaseConnection,
    lead_id: i64,
    company_id: i64,
    now: DateTime<Utc>,
) -> Result<lead_purchase::Model> {
    let txn = db.begin().await?;
    let price = check_purchasable(&txn, lead_id, company_id).await?;

    let purchase = lead_purchase::ActiveModel {
        lead_id: Set(lead_id),
        company_id: Set(company_id),
        created_at: Set(now),
        price_pence: Set(price),
        payment_status: Set(PaymentStatus::Paid),
        paid_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| map_paid_conflict(e, lead_id, company_id))?;

    stamp_notification(&txn, lead_id, company_id, now).await?;
    txn.commit().await?;

    info!(
        "Direct purchase {}: lead {}, company {}",
        purchase.id, lead_id, company_id
    );
    Ok(purchase)
}

fn session_id(object: &Value) -> Option<&str> {
    object.get("id").and_then(Value::as_str)
}

/// Applies a completed checkout session object.
///
/// # Errors
/// Returns an error if a database call fails.
pub async fn complete_checkout<C>(db: &C, object: &Value, now: DateTime<Utc>) -> Result<CheckoutOutcome>
where
    C: ConnectionTrait,
{
    let Some(session) = session_id(object) else {
        warn!("Completed checkout event has no session id");
        return Ok(CheckoutOutcome::Ignored);
    };

    let kind = object
        .pointer("/metadata/type")
        .and_then(Value::as_str)
        .unwrap_or("");
    if kind != LEAD_PURCHASE_METADATA_TYPE {
        info!("Ignoring completed checkout {} with type '{}'", session, kind);
        return Ok(CheckoutOutcome::Ignored);
    }

    let Some(purchase) = LeadPurchase::find()
        .filter(lead_purchase::Column::CheckoutSessionId.eq(session))
        .one(db)
        .await?
    else {
        warn!("No purchase found for checkout session {}", session);
        return Ok(CheckoutOutcome::UnknownSession);
    };

    if purchase.payment_status == PaymentStatus::Paid {
        info!("Purchase {} already paid, skipping", purchase.id);
        return Ok(CheckoutOutcome::AlreadyPaid);
    }

    let (lead_id, company_id) = (purchase.lead_id, purchase.company_id);
    let payment_intent = object
        .get("payment_intent")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut active: lead_purchase::ActiveModel = purchase.into();
    active.payment_status = Set(PaymentStatus::Paid);
    active.paid_at = Set(Some(now));
    active.payment_intent_id = Set(payment_intent);
    let purchase = active
        .update(db)
        .await
        .map_err(|e| map_paid_conflict(e, lead_id, company_id))?;

    stamp_notification(db, lead_id, company_id, now).await?;

    info!(
        "Payment confirmed: purchase {}, session {}, lead {}, company {}",
        purchase.id, session, lead_id, company_id
    );
    Ok(CheckoutOutcome::Confirmed(purchase))
}

/// Cancels the pending purchase of an expired checkout session.
///
/// Returns whether a purchase was cancelled.
///
/// # Errors
/// Returns an error if a database call fails.
pub async fn expire_checkout<C>(db: &C, object: &Value) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(session) = session_id(object) else {
        return Ok(false);
    };

    let result = LeadPurchase::update_many()
        .set(lead_purchase::ActiveModel {
            payment_status: Set(PaymentStatus::Cancelled),
            ..Default::default()
        })
        .filter(lead_purchase::Column::CheckoutSessionId.eq(session))
        .filter(lead_purchase::Column::PaymentStatus.eq(PaymentStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!("Checkout session {} expired, purchase cancelled", session);
    }
    Ok(result.rows_affected > 0)
}

async fn send_confirmation<N>(db: &DatabaseConnection, purchase: &lead_purchase::Model, notifier: &N) -> Result<()>
where
    N: LeadNotifier,
{
    let company = company_core::get_company_by_id(db, purchase.company_id).await?;
    let lead = lead_core::get_lead_by_id(db, purchase.lead_id).await?;
    notifier
        .send_purchase_confirmation(&company, &lead, purchase)
        .await
}

/// Records and applies one processor event.
///
/// The audit row and its effects commit together. The purchase confirmation
/// is sent after commit and a send failure is only logged.
///
/// # Errors
/// Returns an error if a database call fails; nothing is committed then.
pub async fn process_payment_event<N>(
    db: &DatabaseConnection,
    event: PaymentEventInput,
    notifier: &N,
    now: DateTime<Utc>,
) -> Result<EventOutcome>
where
    N: LeadNotifier,
{
    let txn = db.begin().await?;

    let existing = PaymentEvent::find()
        .filter(payment_event::Column::ExternalEventId.eq(event.external_id.as_str()))
        .one(&txn)
        .await?;

    let record = match existing {
        Some(record) if record.processed => {
            info!("Payment event {} already processed", event.external_id);
            return Ok(EventOutcome::AlreadyProcessed);
        }
        Some(record) => record,
        None => {
            let inserted = payment_event::ActiveModel {
                external_event_id: Set(event.external_id.clone()),
                event_type: Set(event.event_type.clone()),
                payload: Set(event.payload.clone()),
                processed: Set(false),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await;
            match inserted {
                Ok(record) => record,
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    return Ok(EventOutcome::AlreadyProcessed);
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let object = event.payload.pointer("/data/object").unwrap_or(&Value::Null);
    let mut confirmed = None;
    let outcome = match event.event_type.as_str() {
        CHECKOUT_COMPLETED => {
            if let CheckoutOutcome::Confirmed(purchase) = complete_checkout(&txn, object, now).await? {
                confirmed = Some(purchase);
            }
            EventOutcome::Processed
        }
        CHECKOUT_EXPIRED => {
            expire_checkout(&txn, object).await?;
            EventOutcome::Processed
        }
        other => {
            info!("Acknowledging unhandled payment event type {}", other);
            EventOutcome::Ignored
        }
    };

    let mut record: payment_event::ActiveModel = record.into();
    record.processed = Set(true);
    record.update(&txn).await?;
    txn.commit().await?;

    if let Some(purchase) = confirmed {
        if let Err(e) = send_confirmation(db, &purchase, notifier).await {
            error!(
                "Failed to send purchase confirmation for purchase {}: {}",
                purchase.id, e
            );
        }
    }

    Ok(outcome)
}

/// Stamps the first time a company opens a lead preview.
///
/// Returns `false` when there is no notification or it was already opened.
///
/// # Errors
/// Returns an error if the update fails.
pub async fn mark_notification_opened(
    db: &DatabaseConnection,
    lead_id: i64,
    company_id: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = LeadNotification::update_many()
        .set(lead_notification::ActiveModel {
            opened_at: Set(Some(now)),
            ..Default::default()
        })
        .filter(lead_notification::Column::LeadId.eq(lead_id))
        .filter(lead_notification::Column::CompanyId.eq(company_id))
        .filter(lead_notification::Column::OpenedAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// A bought lead with its full survey, rooms oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchasedLead {
    /// The paid purchase that unlocks the lead
    pub purchase: lead_purchase::Model,
    /// Lead with contact details
    pub lead: lead::Model,
    /// Rooms and their items
    pub rooms: Vec<(lead_room::Model, Vec<lead_item::Model>)>,
}

/// Loads the full lead for a company that has paid for it.
///
/// # Errors
/// Returns [`Error::PurchaseNotFound`] when the company holds no paid purchase
/// for the lead, [`Error::LeadNotFound`] if the lead is gone, or a database
/// error.
pub async fn purchased_lead_detail<C>(db: &C, lead_id: i64, company_id: i64) -> Result<PurchasedLead>
where
    C: ConnectionTrait,
{
    let purchase = paid_purchase(db, lead_id, company_id)
        .await?
        .ok_or_else(|| Error::PurchaseNotFound {
            reference: format!("lead {lead_id} for company {company_id}"),
        })?;
    let lead = lead_core::get_lead_by_id(db, lead_id).await?;
    let rooms = LeadRoom::find()
        .filter(lead_room::Column::LeadId.eq(lead_id))
        .order_by_asc(lead_room::Column::CreatedAt)
        .order_by_asc(lead_room::Column::Id)
        .find_with_related(LeadItem)
        .all(db)
        .await?;

    Ok(PurchasedLead {
        purchase,
        lead,
        rooms,
    })
}
