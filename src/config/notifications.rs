//! Notification settings loaded from environment variables.
//!
//! These identify the sender of outgoing messages and the public base URL that
//! links inside them point at. All values have development defaults.

const DEFAULT_APP_URL: &str = "http://localhost:8000";
const DEFAULT_FROM_EMAIL: &str = "leads@primehaul.co.uk";
const DEFAULT_FROM_NAME: &str = "PrimeHaul Leads";

/// Sender identity and link base for notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    /// Public base URL, without a trailing slash
    pub app_url: String,
    /// From address
    pub from_email: String,
    /// From display name
    pub from_name: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            app_url: DEFAULT_APP_URL.to_string(),
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            from_name: DEFAULT_FROM_NAME.to_string(),
        }
    }
}

impl NotificationSettings {
    /// Reads `APP_URL`, `SMTP_FROM_EMAIL` and `SMTP_FROM_NAME`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            app_url: std::env::var("APP_URL")
                .map_or(defaults.app_url, |url| url.trim_end_matches('/').to_string()),
            from_email: std::env::var("SMTP_FROM_EMAIL").unwrap_or(defaults.from_email),
            from_name: std::env::var("SMTP_FROM_NAME").unwrap_or(defaults.from_name),
        }
    }

    /// Link a company follows to preview a lead.
    #[must_use]
    pub fn lead_preview_url(&self, lead_id: i64) -> String {
        format!("{}/company/leads/{lead_id}/preview", self.app_url)
    }

    /// Link a consumer follows to return to their survey.
    #[must_use]
    pub fn survey_url(&self, token: &str) -> String {
        format!("{}/survey/{token}/thank-you", self.app_url)
    }
}
