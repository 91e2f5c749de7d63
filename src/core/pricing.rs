//! Pricing engine - consumer estimate range and company-facing lead price.
//!
//! Both calculations are pure. The estimate uses fixed platform rates (UK
//! averages, whole pounds); the lead price is a first-match lookup over the
//! admin-configured tier table, in pence.

use crate::core::geo::{self, Coordinates};
use crate::entities::lead::{self, AccessDetails, ParkingType};
use crate::entities::lead_pricing_tier;
use serde::Serialize;

pub const BASE_FEE: i64 = 250;
pub const PRICE_PER_CBM: f64 = 35.0;
pub const BULKY_ITEM_FEE: i64 = 25;
pub const FRAGILE_ITEM_FEE: i64 = 15;
pub const WEIGHT_THRESHOLD_KG: f64 = 1000.0;
pub const PRICE_PER_KG_OVER: f64 = 0.50;
pub const PRICE_PER_MILE: f64 = 1.50;
pub const FREE_MILES: f64 = 10.0;

pub const PRICE_PER_FLOOR: f64 = 15.0;
pub const NO_LIFT_SURCHARGE: f64 = 50.0;
pub const PARKING_DISTANCE_STEP_M: u32 = 50;
pub const PARKING_DISTANCE_FEE_PER_STEP: f64 = 10.0;
pub const NARROW_ACCESS_FEE: f64 = 35.0;
pub const TIME_RESTRICTION_FEE: f64 = 25.0;
pub const BOOKING_REQUIRED_FEE: f64 = 20.0;
pub const OUTDOOR_STEPS_STEP: u32 = 5;
pub const OUTDOOR_STEPS_FEE_PER_STEP: f64 = 15.0;
pub const OUTDOOR_PATH_FEE: f64 = 20.0;

pub const LOW_MULTIPLIER: f64 = 0.85;
pub const HIGH_MULTIPLIER: f64 = 1.25;
/// Lowest `estimate_low` ever quoted.
pub const MINIMUM_ESTIMATE: i64 = 150;

/// Price charged when no active tier covers the volume (GBP 10.00).
pub const DEFAULT_LEAD_PRICE_PENCE: i64 = 1000;

/// Fee for a parking situation. Ascending from driveway to limited.
#[must_use]
pub const fn parking_fee(parking: ParkingType) -> f64 {
    match parking {
        ParkingType::Driveway => 0.0,
        ParkingType::Street => 25.0,
        ParkingType::Permit => 40.0,
        ParkingType::Limited => 60.0,
    }
}

/// Access difficulty surcharge for one end of the move.
///
/// `None` and the default descriptor both cost nothing.
#[must_use]
pub fn access_cost(access: Option<&AccessDetails>) -> f64 {
    let Some(access) = access else {
        return 0.0;
    };

    let mut cost = f64::from(access.floors) * PRICE_PER_FLOOR;
    if access.floors > 0 && !access.has_lift {
        cost += NO_LIFT_SURCHARGE;
    }

    cost += parking_fee(access.parking_type);

    // Partial steps round up, so any distance at all costs at least one step.
    let parking_steps = access.parking_distance_m.div_ceil(PARKING_DISTANCE_STEP_M);
    cost += f64::from(parking_steps) * PARKING_DISTANCE_FEE_PER_STEP;

    if access.narrow_access {
        cost += NARROW_ACCESS_FEE;
    }
    if access.time_restriction {
        cost += TIME_RESTRICTION_FEE;
    }
    if access.booking_required {
        cost += BOOKING_REQUIRED_FEE;
    }

    let step_groups = access.outdoor_steps.div_ceil(OUTDOOR_STEPS_STEP);
    cost += f64::from(step_groups) * OUTDOOR_STEPS_FEE_PER_STEP;

    if access.outdoor_path {
        cost += OUTDOOR_PATH_FEE;
    }

    cost
}

/// Everything the estimate depends on.
#[derive(Debug, Clone, Default)]
pub struct EstimateInput<'a> {
    /// Inventory volume in cubic metres
    pub total_cbm: f64,
    /// Inventory weight in kilograms
    pub total_weight_kg: f64,
    /// Bulky item count
    pub bulky_items: i32,
    /// Fragile item count
    pub fragile_items: i32,
    /// Pickup point
    pub pickup: Option<Coordinates>,
    /// Drop-off point
    pub dropoff: Option<Coordinates>,
    /// Access at pickup
    pub pickup_access: Option<&'a AccessDetails>,
    /// Access at drop-off
    pub dropoff_access: Option<&'a AccessDetails>,
}

impl<'a> From<&'a lead::Model> for EstimateInput<'a> {
    fn from(lead: &'a lead::Model) -> Self {
        Self {
            total_cbm: lead.total_cbm,
            total_weight_kg: lead.total_weight_kg,
            bulky_items: lead.bulky_items,
            fragile_items: lead.fragile_items,
            pickup: lead.pickup_coordinates(),
            dropoff: lead.dropoff_coordinates(),
            pickup_access: lead.pickup_access.as_ref(),
            dropoff_access: lead.dropoff_access.as_ref(),
        }
    }
}

/// Line items behind an estimate, rounded to pennies for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateBreakdown {
    pub base_fee: i64,
    pub cbm_cost: f64,
    pub bulky_surcharge: i64,
    pub fragile_surcharge: i64,
    pub weight_surcharge: f64,
    pub distance_cost: f64,
    pub access_cost: f64,
    pub total_before_range: f64,
}

/// Consumer-facing price range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub estimate_low: i64,
    pub estimate_high: i64,
    pub breakdown: EstimateBreakdown,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_possible_truncation)]
fn floor_to_i64(value: f64) -> i64 {
    value.floor() as i64
}

/// Computes the estimate range and its breakdown.
///
/// Negative counts and volumes are treated as zero, so the range always holds
/// `MINIMUM_ESTIMATE <= estimate_low <= estimate_high`.
#[must_use]
pub fn calculate_estimate(input: &EstimateInput<'_>) -> Estimate {
    let total_cbm = input.total_cbm.max(0.0);
    let total_weight = input.total_weight_kg.max(0.0);
    let bulky_count = i64::from(input.bulky_items.max(0));
    let fragile_count = i64::from(input.fragile_items.max(0));

    let cbm_cost = total_cbm * PRICE_PER_CBM;
    let bulky_surcharge = bulky_count * BULKY_ITEM_FEE;
    let fragile_surcharge = fragile_count * FRAGILE_ITEM_FEE;
    let weight_surcharge = (total_weight - WEIGHT_THRESHOLD_KG).max(0.0) * PRICE_PER_KG_OVER;

    let distance_cost = match (input.pickup, input.dropoff) {
        (Some(pickup), Some(dropoff)) => {
            let miles = geo::distance_miles(pickup, dropoff);
            (miles - FREE_MILES).max(0.0) * PRICE_PER_MILE
        }
        _ => 0.0,
    };

    let access = access_cost(input.pickup_access) + access_cost(input.dropoff_access);

    #[allow(clippy::cast_precision_loss)]
    let flat_fees = (BASE_FEE + bulky_surcharge + fragile_surcharge) as f64;
    let total = flat_fees + cbm_cost + weight_surcharge + distance_cost + access;

    Estimate {
        estimate_low: floor_to_i64(total * LOW_MULTIPLIER).max(MINIMUM_ESTIMATE),
        estimate_high: floor_to_i64(total * HIGH_MULTIPLIER),
        breakdown: EstimateBreakdown {
            base_fee: BASE_FEE,
            cbm_cost: round2(cbm_cost),
            bulky_surcharge,
            fragile_surcharge,
            weight_surcharge: round2(weight_surcharge),
            distance_cost: round2(distance_cost),
            access_cost: round2(access),
            total_before_range: round2(total),
        },
    }
}

/// Estimate for a stored lead.
#[must_use]
pub fn estimate_for_lead(lead: &lead::Model) -> Estimate {
    calculate_estimate(&EstimateInput::from(lead))
}

/// One row of the tier table, as the lookup sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierBand {
    pub min_cbm: f64,
    /// `None` is unbounded
    pub max_cbm: Option<f64>,
    pub price_pence: i64,
}

impl TierBand {
    /// Inclusive on both ends.
    #[must_use]
    pub fn covers(&self, volume: f64) -> bool {
        self.min_cbm <= volume && self.max_cbm.is_none_or(|max| volume <= max)
    }
}

impl From<&lead_pricing_tier::Model> for TierBand {
    fn from(tier: &lead_pricing_tier::Model) -> Self {
        Self {
            min_cbm: tier.min_cbm,
            max_cbm: tier.max_cbm,
            price_pence: tier.price_pence,
        }
    }
}

/// Price of the first band covering `volume`, else [`DEFAULT_LEAD_PRICE_PENCE`].
///
/// Bands are expected in ascending `min_cbm` order. Overlaps are not rejected:
/// the earliest covering band wins, which makes a consistent table the
/// administrator's job.
#[must_use]
pub fn lookup_lead_price(volume: f64, tiers: &[TierBand]) -> i64 {
    tiers
        .iter()
        .find(|tier| tier.covers(volume))
        .map_or(DEFAULT_LEAD_PRICE_PENCE, |tier| tier.price_pence)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    const LONDON: Coordinates = Coordinates::new(51.5074, -0.1278);
    const MANCHESTER: Coordinates = Coordinates::new(53.4808, -2.2426);

    fn band(min_cbm: f64, max_cbm: Option<f64>, price_pence: i64) -> TierBand {
        TierBand {
            min_cbm,
            max_cbm,
            price_pence,
        }
    }

    #[test]
    fn test_base_fee_only() {
        let result = calculate_estimate(&EstimateInput::default());
        assert!(result.estimate_low <= result.estimate_high);
        assert!(result.estimate_low >= MINIMUM_ESTIMATE);
        assert_eq!(result.breakdown.total_before_range, 250.0);
        assert_eq!(result.estimate_low, 212);
        assert_eq!(result.estimate_high, 312);
    }

    #[test]
    fn test_negative_inputs_keep_the_floor() {
        let input = EstimateInput {
            total_cbm: -500.0,
            bulky_items: -10,
            ..EstimateInput::default()
        };
        let result = calculate_estimate(&input);
        assert!(result.estimate_low >= MINIMUM_ESTIMATE);
        assert!(result.estimate_low <= result.estimate_high);
    }

    #[test]
    fn test_cbm_increases_estimate() {
        let small = calculate_estimate(&EstimateInput {
            total_cbm: 5.0,
            ..EstimateInput::default()
        });
        let large = calculate_estimate(&EstimateInput {
            total_cbm: 50.0,
            ..EstimateInput::default()
        });
        assert!(large.estimate_high > small.estimate_high);
    }

    #[test]
    fn test_bulky_items_add_surcharge() {
        let none = calculate_estimate(&EstimateInput::default());
        let bulky = calculate_estimate(&EstimateInput {
            bulky_items: 4,
            ..EstimateInput::default()
        });
        assert!(bulky.estimate_high > none.estimate_high);
        assert_eq!(bulky.breakdown.bulky_surcharge, 100);
    }

    #[test]
    fn test_weight_over_threshold() {
        let result = calculate_estimate(&EstimateInput {
            total_weight_kg: 1200.0,
            ..EstimateInput::default()
        });
        assert_eq!(result.breakdown.weight_surcharge, 100.0);

        let under = calculate_estimate(&EstimateInput {
            total_weight_kg: 800.0,
            ..EstimateInput::default()
        });
        assert_eq!(under.breakdown.weight_surcharge, 0.0);
    }

    #[test]
    fn test_distance_adds_cost() {
        let result = calculate_estimate(&EstimateInput {
            pickup: Some(LONDON),
            dropoff: Some(MANCHESTER),
            ..EstimateInput::default()
        });
        assert!(result.breakdown.distance_cost > 0.0);
    }

    #[test]
    fn test_short_or_partial_distance_is_free() {
        let nearby = calculate_estimate(&EstimateInput {
            pickup: Some(LONDON),
            dropoff: Some(Coordinates::new(51.52, -0.13)),
            ..EstimateInput::default()
        });
        assert_eq!(nearby.breakdown.distance_cost, 0.0);

        let one_sided = calculate_estimate(&EstimateInput {
            pickup: Some(LONDON),
            ..EstimateInput::default()
        });
        assert_eq!(one_sided.breakdown.distance_cost, 0.0);
    }

    #[test]
    fn test_empty_access() {
        assert_eq!(access_cost(Some(&AccessDetails::default())), 0.0);
        assert_eq!(access_cost(None), 0.0);
    }

    #[test]
    fn test_lift_reduces_surcharge() {
        let no_lift = AccessDetails {
            floors: 3,
            has_lift: false,
            ..AccessDetails::default()
        };
        let with_lift = AccessDetails {
            floors: 3,
            has_lift: true,
            ..AccessDetails::default()
        };
        assert_eq!(access_cost(Some(&no_lift)), 95.0);
        assert_eq!(access_cost(Some(&with_lift)), 45.0);
        assert!(access_cost(Some(&no_lift)) > access_cost(Some(&with_lift)));
    }

    #[test]
    fn test_parking_distance_rounds_up() {
        let cost_for = |metres| {
            access_cost(Some(&AccessDetails {
                parking_distance_m: metres,
                ..AccessDetails::default()
            }))
        };
        assert_eq!(cost_for(0), 0.0);
        assert_eq!(cost_for(10), 10.0);
        assert_eq!(cost_for(50), 10.0);
        assert_eq!(cost_for(51), 20.0);
        assert_eq!(cost_for(120), 30.0);
    }

    #[test]
    fn test_outdoor_steps_and_flags() {
        let access = AccessDetails {
            parking_type: ParkingType::Permit,
            narrow_access: true,
            time_restriction: true,
            booking_required: true,
            outdoor_steps: 6,
            outdoor_path: true,
            ..AccessDetails::default()
        };
        // permit 40 + narrow 35 + time 25 + booking 20 + two step groups 30 + path 20
        assert_eq!(access_cost(Some(&access)), 170.0);
    }

    #[test]
    fn test_parking_fees_ascend() {
        assert!(parking_fee(ParkingType::Driveway) < parking_fee(ParkingType::Street));
        assert!(parking_fee(ParkingType::Street) < parking_fee(ParkingType::Permit));
        assert!(parking_fee(ParkingType::Permit) < parking_fee(ParkingType::Limited));
    }

    #[test]
    fn test_access_is_summed_over_both_ends() {
        let stairs = AccessDetails {
            floors: 2,
            ..AccessDetails::default()
        };
        let one_end = calculate_estimate(&EstimateInput {
            pickup_access: Some(&stairs),
            ..EstimateInput::default()
        });
        let both_ends = calculate_estimate(&EstimateInput {
            pickup_access: Some(&stairs),
            dropoff_access: Some(&stairs),
            ..EstimateInput::default()
        });
        assert_eq!(one_end.breakdown.access_cost, 80.0);
        assert_eq!(both_ends.breakdown.access_cost, 160.0);
    }

    #[test]
    fn test_tier_lookup() {
        let tiers = [
            band(0.0, Some(10.0), 1000),
            band(10.0, Some(30.0), 2000),
            band(30.0, None, 3500),
        ];
        assert_eq!(lookup_lead_price(25.0, &tiers), 2000);
        assert_eq!(lookup_lead_price(35.0, &tiers), 3500);
        assert_eq!(lookup_lead_price(0.0, &tiers), 1000);
        // Shared boundary goes to the earlier band.
        assert_eq!(lookup_lead_price(10.0, &tiers), 1000);
    }

    #[test]
    fn test_tier_lookup_without_tiers_uses_default() {
        assert_eq!(lookup_lead_price(25.0, &[]), DEFAULT_LEAD_PRICE_PENCE);
    }

    #[test]
    fn test_tier_lookup_gap_uses_default() {
        let tiers = [band(0.0, Some(10.0), 1000), band(20.0, None, 3000)];
        assert_eq!(lookup_lead_price(15.0, &tiers), DEFAULT_LEAD_PRICE_PENCE);
    }

    #[test]
    fn test_tier_lookup_overlap_first_match_wins() {
        let tiers = [band(0.0, Some(50.0), 1200), band(10.0, Some(30.0), 2000)];
        assert_eq!(lookup_lead_price(20.0, &tiers), 1200);
    }
}
