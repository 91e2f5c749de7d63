//! Outgoing notifications - The seam between the core and message transports.
//!
//! The core never talks to an SMTP server or SMS gateway directly. It calls a
//! [`LeadNotifier`] and treats every failure as best-effort: callers log it and
//! carry on. [`LoggingNotifier`] is the development transport.

use crate::{
    config::notifications::NotificationSettings,
    core::{geo, report::format_price_pence},
    entities::{company, lead, lead_purchase},
    errors::Result,
};
use std::future::Future;
use tracing::info;

/// Delivers the messages the marketplace sends.
pub trait LeadNotifier: Send + Sync {
    /// Thanks the consumer once their lead has been sent to companies.
    fn send_customer_confirmation(&self, lead: &lead::Model) -> impl Future<Output = Result<()>> + Send;

    /// Tells a company a new lead in its area is available.
    fn send_lead_alert(
        &self,
        company: &company::Model,
        lead: &lead::Model,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Gives a company the customer's contact details after payment.
    fn send_purchase_confirmation(
        &self,
        company: &company::Model,
        lead: &lead::Model,
        purchase: &lead_purchase::Model,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Short area name for a location: city, else postcode area, else "Unknown".
#[must_use]
pub fn area_label(location: Option<&lead::Location>) -> String {
    let Some(location) = location else {
        return "Unknown".to_string();
    };
    let city = location.city.trim();
    if !city.is_empty() {
        return city.to_string();
    }
    let area = geo::extract_postcode_area(&location.postcode);
    if area.is_empty() {
        "Unknown".to_string()
    } else {
        area.to_uppercase()
    }
}

/// Subject line of a lead alert.
#[must_use]
pub fn lead_alert_subject(lead: &lead::Model) -> String {
    format!(
        "New lead: {} to {} ({:.1} CBM)",
        area_label(lead.pickup.as_ref()),
        area_label(lead.dropoff.as_ref()),
        lead.total_cbm
    )
}

/// Writes every message to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier {
    settings: NotificationSettings,
}

impl LoggingNotifier {
    /// Uses the given sender identity and link base.
    #[must_use]
    pub const fn new(settings: NotificationSettings) -> Self {
        Self { settings }
    }
}

impl LeadNotifier for LoggingNotifier {
    async fn send_customer_confirmation(&self, lead: &lead::Model) -> Result<()> {
        let Some(email) = lead.customer_email.as_deref() else {
            info!("Lead {} has no customer email, skipping confirmation", lead.id);
            return Ok(());
        };
        info!(
            from = %self.settings.from_email,
            to = %email,
            "Your move quote request has been sent to removal companies ({})",
            self.settings.survey_url(&lead.token)
        );
        Ok(())
    }

    async fn send_lead_alert(&self, company: &company::Model, lead: &lead::Model) -> Result<()> {
        let price = lead.lead_price_pence.map_or_else(|| "-".to_string(), format_price_pence);
        info!(
            from = %self.settings.from_email,
            to = %crate::core::company::alert_email(company),
            "{} | {} items, lead price {} | {}",
            lead_alert_subject(lead),
            lead.total_items,
            price,
            self.settings.lead_preview_url(lead.id)
        );
        Ok(())
    }

    async fn send_purchase_confirmation(
        &self,
        company: &company::Model,
        lead: &lead::Model,
        purchase: &lead_purchase::Model,
    ) -> Result<()> {
        info!(
            from = %self.settings.from_email,
            to = %crate::core::company::alert_email(company),
            "Lead purchased for {}: {} <{}> {}",
            format_price_pence(purchase.price_pence),
            lead.customer_name.as_deref().unwrap_or("Customer"),
            lead.customer_email.as_deref().unwrap_or("-"),
            lead.customer_phone.as_deref().unwrap_or("")
        );
        Ok(())
    }
}
