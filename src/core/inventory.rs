//! Inventory - Survey rooms and the items found in them.
//!
//! Items arrive from the vision service or manual entry and are sanitised on
//! the way in. Lead totals are always derived from the stored items with
//! [`compute_totals`], never accumulated incrementally.

use crate::{
    core::{lead as lead_core, pricing},
    entities::{LeadItem, LeadRoom, lead, lead_item, lead_room},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info};

const MAX_ITEM_NAME_LEN: usize = 255;
const UNKNOWN_ITEM_NAME: &str = "Unknown item";
/// Largest quantity stored for a single item line.
pub const MAX_ITEM_QTY: i32 = 1000;

/// An item as reported by the vision service or typed in by the consumer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewItem {
    pub name: String,
    pub qty: i32,
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub cbm: Option<f64>,
    pub bulky: bool,
    pub fragile: bool,
    pub item_category: Option<String>,
    pub packing_requirement: Option<String>,
    pub notes: Option<String>,
}

/// Aggregates written onto the lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InventoryTotals {
    pub total_cbm: f64,
    pub total_weight_kg: f64,
    pub total_items: i32,
    pub bulky_items: i32,
    pub fragile_items: i32,
}

impl InventoryTotals {
    /// Copies the totals onto a lead model.
    pub fn apply_to(&self, lead: &mut lead::Model) {
        lead.total_cbm = self.total_cbm;
        lead.total_weight_kg = self.total_weight_kg;
        lead.total_items = self.total_items;
        lead.bulky_items = self.bulky_items;
        lead.fragile_items = self.fragile_items;
    }
}

fn measurement(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn item_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return UNKNOWN_ITEM_NAME.to_string();
    }
    name.chars().take(MAX_ITEM_NAME_LEN).collect()
}

fn sanitise(room_id: i64, item: NewItem) -> lead_item::ActiveModel {
    lead_item::ActiveModel {
        room_id: Set(room_id),
        name: Set(item_name(&item.name)),
        qty: Set(item.qty.clamp(1, MAX_ITEM_QTY)),
        length_cm: Set(measurement(item.length_cm)),
        width_cm: Set(measurement(item.width_cm)),
        height_cm: Set(measurement(item.height_cm)),
        weight_kg: Set(measurement(item.weight_kg)),
        cbm: Set(measurement(item.cbm)),
        bulky: Set(item.bulky),
        fragile: Set(item.fragile),
        item_category: Set(trimmed(item.item_category)),
        packing_requirement: Set(trimmed(item.packing_requirement)),
        notes: Set(trimmed(item.notes)),
        ..Default::default()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sums an inventory. Quantity multiplies volume, weight and the bulky and
/// fragile counts; quantities are clamped to `1..=MAX_ITEM_QTY` and the
/// counts saturate.
#[must_use]
pub fn compute_totals(items: &[lead_item::Model]) -> InventoryTotals {
    let mut totals = InventoryTotals::default();
    let mut cbm = 0.0;
    let mut weight = 0.0;

    for item in items {
        let qty = item.qty.clamp(1, MAX_ITEM_QTY);
        totals.total_items = totals.total_items.saturating_add(qty);
        cbm += item.cbm.unwrap_or(0.0) * f64::from(qty);
        weight += item.weight_kg.unwrap_or(0.0) * f64::from(qty);
        if item.bulky {
            totals.bulky_items = totals.bulky_items.saturating_add(qty);
        }
        if item.fragile {
            totals.fragile_items = totals.fragile_items.saturating_add(qty);
        }
    }

    totals.total_cbm = round2(cbm);
    totals.total_weight_kg = round2(weight);
    totals
}

/// Adds a room to an `in_progress` survey.
///
/// # Errors
/// Returns an error if the name is blank, the lead is missing or no longer
/// `in_progress`, or the insert fails.
pub async fn add_room(db: &DatabaseConnection, token: &str, name: &str) -> Result<lead_room::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Room name cannot be empty"));
    }

    let lead = lead_core::get_scratch_lead(db, token).await?;
    let room = lead_room::ActiveModel {
        lead_id: Set(lead.id),
        name: Set(name.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let room = room.insert(db).await?;
    debug!("Added room '{}' to lead {}", room.name, lead.id);
    Ok(room)
}

async fn scratch_room<C>(db: &C, room_id: i64) -> Result<lead_room::Model>
where
    C: ConnectionTrait,
{
    let (room, lead) = LeadRoom::find_by_id(room_id)
        .find_also_related(crate::entities::Lead)
        .one(db)
        .await?
        .ok_or(Error::RoomNotFound { id: room_id })?;
    let lead = lead.ok_or(Error::RoomNotFound { id: room_id })?;
    lead_core::ensure_status(&lead, lead::LeadStatus::InProgress)?;
    Ok(room)
}

/// Deletes a room and all of its items.
///
/// # Errors
/// Returns an error if the room is missing, its lead is no longer
/// `in_progress`, or a delete fails.
pub async fn remove_room(db: &DatabaseConnection, room_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let room = scratch_room(&txn, room_id).await?;

    let removed = LeadItem::delete_many()
        .filter(lead_item::Column::RoomId.eq(room.id))
        .exec(&txn)
        .await?;
    LeadRoom::delete_by_id(room.id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "Removed room {} and {} items from lead {}",
        room.id, removed.rows_affected, room.lead_id
    );
    Ok(())
}

/// Stores detected items for a room, replacing the room summary when given.
///
/// # Errors
/// Returns an error if the room is missing, its lead is no longer
/// `in_progress`, or an insert fails, in which case no item is stored.
pub async fn add_items(
    db: &DatabaseConnection,
    room_id: i64,
    items: Vec<NewItem>,
    summary: Option<String>,
) -> Result<Vec<lead_item::Model>> {
    let txn = db.begin().await?;
    let room = scratch_room(&txn, room_id).await?;

    let mut stored = Vec::with_capacity(items.len());
    for item in items {
        stored.push(sanitise(room.id, item).insert(&txn).await?);
    }

    if let Some(summary) = trimmed(summary) {
        let mut active: lead_room::ActiveModel = room.into();
        active.summary = Set(Some(summary));
        active.update(&txn).await?;
    }

    txn.commit().await?;
    debug!("Stored {} items in room {}", stored.len(), room_id);
    Ok(stored)
}

/// Rooms of a lead, oldest first.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn list_rooms<C>(db: &C, lead_id: i64) -> Result<Vec<lead_room::Model>>
where
    C: ConnectionTrait,
{
    LeadRoom::find()
        .filter(lead_room::Column::LeadId.eq(lead_id))
        .order_by_asc(lead_room::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every item across all rooms of a lead.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn load_items_for_lead<C>(db: &C, lead_id: i64) -> Result<Vec<lead_item::Model>>
where
    C: ConnectionTrait,
{
    LeadItem::find()
        .inner_join(LeadRoom)
        .filter(lead_room::Column::LeadId.eq(lead_id))
        .order_by_asc(lead_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Recomputes totals and the estimate for the review step and stores both on
/// the scratch lead.
///
/// # Errors
/// Returns an error if the lead is missing or no longer `in_progress`, or a
/// database call fails.
pub async fn review_inventory(
    db: &DatabaseConnection,
    token: &str,
) -> Result<(lead::Model, pricing::Estimate)> {
    let mut lead = lead_core::get_scratch_lead(db, token).await?;
    let items = load_items_for_lead(db, lead.id).await?;
    let totals = compute_totals(&items);
    totals.apply_to(&mut lead);
    let estimate = pricing::estimate_for_lead(&lead);

    let mut active: lead::ActiveModel = lead.into();
    active.total_cbm = Set(totals.total_cbm);
    active.total_weight_kg = Set(totals.total_weight_kg);
    active.total_items = Set(totals.total_items);
    active.bulky_items = Set(totals.bulky_items);
    active.fragile_items = Set(totals.fragile_items);
    active.estimate_low = Set(Some(estimate.estimate_low));
    active.estimate_high = Set(Some(estimate.estimate_high));
    active.updated_at = Set(chrono::Utc::now());
    let lead = active.update(db).await?;

    Ok((lead, estimate))
}
