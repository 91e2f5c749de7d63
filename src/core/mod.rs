//! Core business logic, independent of any web or messaging framework.

/// Fan-out of active leads to matching companies
pub mod distribution;
/// Haversine distance and UK address helpers
pub mod geo;
/// Survey rooms and inventory items
pub mod inventory;
/// Lead lifecycle from survey to expiry
pub mod lead;
/// Company registration and preferences
pub mod company;
/// Eligibility filter deciding which companies see a lead
pub mod matching;
/// Consumer estimate and lead price
pub mod pricing;
/// Checkout bookkeeping and payment events
pub mod purchase;
/// Dashboards and revenue summaries
pub mod report;
/// Admin-managed pricing tiers
pub mod tier;
