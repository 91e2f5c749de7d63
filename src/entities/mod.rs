//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod company;
pub mod lead;
pub mod lead_item;
pub mod lead_notification;
pub mod lead_pricing_tier;
pub mod lead_purchase;
pub mod lead_room;
pub mod payment_event;

// Re-export specific types to avoid conflicts
pub use company::{Column as CompanyColumn, Entity as Company, Model as CompanyModel};
pub use lead::{Column as LeadColumn, Entity as Lead, Model as LeadModel};
pub use lead_item::{Column as LeadItemColumn, Entity as LeadItem, Model as LeadItemModel};
pub use lead_notification::{
    Column as LeadNotificationColumn, Entity as LeadNotification, Model as LeadNotificationModel,
};
pub use lead_pricing_tier::{
    Column as LeadPricingTierColumn, Entity as LeadPricingTier, Model as LeadPricingTierModel,
};
pub use lead_purchase::{
    Column as LeadPurchaseColumn, Entity as LeadPurchase, Model as LeadPurchaseModel,
};
pub use lead_room::{Column as LeadRoomColumn, Entity as LeadRoom, Model as LeadRoomModel};
pub use payment_event::{
    Column as PaymentEventColumn, Entity as PaymentEvent, Model as PaymentEventModel,
};
