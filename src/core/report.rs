//! Report generation - Admin and company dashboards, revenue summaries.
//!
//! Functions return structured data; formatting helpers at the bottom turn it
//! into text for the CLI.

use crate::{
    entities::{
        Company, Lead, LeadNotification, LeadPurchase, company, lead, lead_notification,
        lead_purchase::{self, PaymentStatus},
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, PaginatorTrait, QueryOrder, QuerySelect, prelude::*, sea_query::Expr};
use std::{collections::HashMap, fmt::Write as _};

const RECENT_NOTIFICATIONS: u64 = 10;

/// Marketplace-wide counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminDashboard {
    pub total_leads: u64,
    /// Active and not yet past `expires_at`
    pub active_leads: u64,
    pub total_companies: u64,
    /// Sum of paid purchases in pence
    pub total_revenue_pence: i64,
}

/// Paid purchases, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueReport {
    pub purchases: Vec<lead_purchase::Model>,
    pub total_revenue_pence: i64,
}

/// What a company has received and bought.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDashboard {
    pub company: company::Model,
    pub leads_received: u64,
    pub leads_purchased: u64,
    pub total_spent_pence: i64,
    /// Most recent notifications with their leads
    pub recent: Vec<(lead_notification::Model, Option<lead::Model>)>,
}

/// A lead in the admin listing.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadListing {
    /// The lead
    pub lead: lead::Model,
    /// Purchase rows of any status
    pub purchase_count: i64,
}

/// A company in the admin listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyListing {
    /// The company
    pub company: company::Model,
    /// Purchase rows of any status
    pub total_purchases: i64,
}

async fn purchase_counts(db: &DatabaseConnection, by: lead_purchase::Column) -> Result<HashMap<i64, i64>> {
    let rows: Vec<(i64, i64)> = LeadPurchase::find()
        .select_only()
        .column(by)
        .column_as(Expr::col(lead_purchase::Column::Id).count(), "purchases")
        .group_by(by)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

async fn paid_purchases(db: &DatabaseConnection, company_id: Option<i64>) -> Result<Vec<lead_purchase::Model>> {
    let mut query = LeadPurchase::find()
        .filter(lead_purchase::Column::PaymentStatus.eq(PaymentStatus::Paid))
        .order_by_desc(lead_purchase::Column::PaidAt)
        .order_by_desc(lead_purchase::Column::Id);
    if let Some(company_id) = company_id {
        query = query.filter(lead_purchase::Column::CompanyId.eq(company_id));
    }
    query.all(db).await.map_err(Into::into)
}

fn sum_pence(purchases: &[lead_purchase::Model]) -> i64 {
    purchases.iter().map(|p| p.price_pence).sum()
}

/// Builds the admin dashboard counters.
///
/// # Errors
/// Returns an error if a query fails.
pub async fn admin_dashboard(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<AdminDashboard> {
    let total_leads = Lead::find().count(db).await?;
    let active_leads = Lead::find()
        .filter(lead::Column::Status.eq(lead::LeadStatus::Active))
        .filter(
            Condition::any()
                .add(lead::Column::ExpiresAt.is_null())
                .add(lead::Column::ExpiresAt.gt(now)),
        )
        .count(db)
        .await?;
    let total_companies = Company::find().count(db).await?;
    let total_revenue_pence = sum_pence(&paid_purchases(db, None).await?);

    Ok(AdminDashboard {
        total_leads,
        active_leads,
        total_companies,
        total_revenue_pence,
    })
}

/// All paid purchases and their total.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn revenue_report(db: &DatabaseConnection) -> Result<RevenueReport> {
    let purchases = paid_purchases(db, None).await?;
    let total_revenue_pence = sum_pence(&purchases);
    Ok(RevenueReport {
        purchases,
        total_revenue_pence,
    })
}

/// Builds one company's dashboard.
///
/// # Errors
/// Returns an error if the company does not exist or a query fails.
pub async fn company_dashboard(db: &DatabaseConnection, company_id: i64) -> Result<CompanyDashboard> {
    let company = crate::core::company::get_company_by_id(db, company_id).await?;

    let leads_received = LeadNotification::find()
        .filter(lead_notification::Column::CompanyId.eq(company_id))
        .count(db)
        .await?;
    let purchases = paid_purchases(db, Some(company_id)).await?;

    let recent = LeadNotification::find()
        .filter(lead_notification::Column::CompanyId.eq(company_id))
        .order_by_desc(lead_notification::Column::SentAt)
        .order_by_desc(lead_notification::Column::Id)
        .limit(RECENT_NOTIFICATIONS)
        .find_also_related(Lead)
        .all(db)
        .await?;

    Ok(CompanyDashboard {
        company,
        leads_received,
        leads_purchased: purchases.len() as u64,
        total_spent_pence: sum_pence(&purchases),
        recent,
    })
}

/// Every lead, newest first, optionally limited to one status.
///
/// # Errors
/// Returns an error if a query fails.
pub async fn list_leads(db: &DatabaseConnection, status: Option<lead::LeadStatus>) -> Result<Vec<LeadListing>> {
    let mut query = Lead::find()
        .order_by_desc(lead::Column::CreatedAt)
        .order_by_desc(lead::Column::Id);
    if let Some(status) = status {
        query = query.filter(lead::Column::Status.eq(status));
    }
    let leads = query.all(db).await?;
    let counts = purchase_counts(db, lead_purchase::Column::LeadId).await?;

    Ok(leads
        .into_iter()
        .map(|lead| LeadListing {
            purchase_count: counts.get(&lead.id).copied().unwrap_or(0),
            lead,
        })
        .collect())
}

/// Every company, newest first, with its purchase count.
///
/// # Errors
/// Returns an error if a query fails.
pub async fn list_companies(db: &DatabaseConnection) -> Result<Vec<CompanyListing>> {
    let companies = Company::find()
        .order_by_desc(company::Column::CreatedAt)
        .order_by_desc(company::Column::Id)
        .all(db)
        .await?;
    let counts = purchase_counts(db, lead_purchase::Column::CompanyId).await?;

    Ok(companies
        .into_iter()
        .map(|company| CompanyListing {
            total_purchases: counts.get(&company.id).copied().unwrap_or(0),
            company,
        })
        .collect())
}

/// A company's purchases of every status, newest first, with their leads.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn company_purchases(
    db: &DatabaseConnection,
    company_id: i64,
) -> Result<Vec<(lead_purchase::Model, Option<lead::Model>)>> {
    LeadPurchase::find()
        .filter(lead_purchase::Column::CompanyId.eq(company_id))
        .order_by_desc(lead_purchase::Column::CreatedAt)
        .order_by_desc(lead_purchase::Column::Id)
        .find_also_related(Lead)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Formats pence as pounds, dropping a zero fractional part.
///
/// `1500` is `"£15"`, `1550` is `"£15.50"`.
#[must_use]
pub fn format_price_pence(pence: i64) -> String {
    let sign = if pence < 0 { "-" } else { "" };
    let pence = pence.unsigned_abs();
    let (pounds, rest) = (pence / 100, pence % 100);
    if rest == 0 {
        format!("{sign}£{pounds}")
    } else {
        format!("{sign}£{pounds}.{rest:02}")
    }
}

/// Text summary of a revenue report.
#[must_use]
pub fn format_revenue_summary(report: &RevenueReport) -> String {
    let mut out = format!(
        "Revenue: {} from {} paid purchases\n",
        format_price_pence(report.total_revenue_pence),
        report.purchases.len()
    );
    for purchase in &report.purchases {
        let paid = purchase
            .paid_at
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        let _ = writeln!(
            out,
            "  {paid}  lead {:<6} company {:<6} {}",
            purchase.lead_id,
            purchase.company_id,
            format_price_pence(purchase.price_pence)
        );
    }
    out
}
