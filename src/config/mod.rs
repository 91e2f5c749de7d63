/// Database connection and schema management
pub mod database;

/// Sender identity and links used by notifications, from environment variables
pub mod notifications;

/// Lead lifecycle settings and pricing-tier seeds from config.toml
pub mod settings;
