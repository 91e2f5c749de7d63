//! Unified error type for the lead marketplace core.

use crate::entities::lead::LeadStatus;
use thiserror::Error;

/// Every failure the core can surface to a caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// The relational store rejected or failed an operation
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or malformed
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// No lead with the given id or survey token
    #[error("Lead not found: {reference}")]
    LeadNotFound {
        /// Id or token used for the lookup
        reference: String,
    },

    /// No company with the given id or slug
    #[error("Company not found: {reference}")]
    CompanyNotFound {
        /// Id or slug used for the lookup
        reference: String,
    },

    /// Survey room does not exist
    #[error("Room not found: {id}")]
    RoomNotFound {
        /// Room id
        id: i64,
    },

    /// Pricing tier does not exist
    #[error("Pricing tier not found: {id}")]
    TierNotFound {
        /// Tier id
        id: i64,
    },

    /// Purchase record does not exist
    #[error("Purchase not found: {reference}")]
    PurchaseNotFound {
        /// Purchase id or checkout session id
        reference: String,
    },

    /// Operation is not allowed in the lead's current lifecycle state
    #[error("Lead {lead_id} is {status}, expected {expected}")]
    InvalidLeadState {
        /// Lead id
        lead_id: i64,
        /// Current status
        status: LeadStatus,
        /// Status the operation requires
        expected: LeadStatus,
    },

    /// Volume value is negative or not finite
    #[error("Invalid volume: {volume}")]
    InvalidVolume {
        /// Rejected value in cubic metres
        volume: f64,
    },

    /// Input failed a business rule
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// The company already holds a paid purchase for this lead
    #[error("Lead {lead_id} already purchased by company {company_id}")]
    AlreadyPurchased {
        /// Lead id
        lead_id: i64,
        /// Company id
        company_id: i64,
    },

    /// A notification collaborator failed to deliver
    #[error("Notification delivery failed: {message}")]
    Notification {
        /// Transport-level reason
        message: String,
    },
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
