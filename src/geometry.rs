//! Fit predicates deciding whether a unit may go into a box.
//!
//! A unit is placeable into an open box only if all three checks hold:
//! dimensions, weight and volume. None of them positions the unit inside
//! the box; they compare totals and sorted edge lengths only.

use crate::model::{BoxState, BoxType, UnitItem};
use crate::types::{Dimensional, Weighted};

/// Checks whether the unit's edges fit the box's edges, longest against longest.
///
/// # Parameters
/// * `unit` - The unit to check
/// * `box_type` - The candidate box
///
/// # Returns
/// `true` if every sorted unit edge is at most the matching sorted box edge
pub fn fits_dimensions(unit: &UnitItem, box_type: &BoxType) -> bool {
    unit.dimensions().fits_sorted_within(&box_type.dimensions())
}

/// Checks whether the box can carry the unit's weight on top of its contents.
pub fn fits_weight(state: &BoxState, unit: &UnitItem) -> bool {
    state.weight_grams().saturating_add(unit.weight_grams()) <= state.box_type.max_weight_grams
}

/// Checks whether the unit's volume still fits the fill-adjusted capacity.
pub fn fits_volume(state: &BoxState, unit: &UnitItem) -> bool {
    state.total_volume_cm3.saturating_add(unit.volume()) <= state.box_type.capacity_volume()
}

/// Checks all three predicates against an open box.
pub fn can_place(state: &BoxState, unit: &UnitItem) -> bool {
    fits_dimensions(unit, &state.box_type) && fits_weight(state, unit) && fits_volume(state, unit)
}

/// Checks all three predicates against an empty box of the given type.
pub fn fits_empty(box_type: &BoxType, unit: &UnitItem) -> bool {
    fits_dimensions(unit, box_type)
        && unit.weight_grams() <= box_type.max_weight_grams
        && unit.volume() <= box_type.capacity_volume()
}

/// Volume that would be left in the box after adding the unit.
///
/// Only meaningful once `can_place` holds.
pub fn remaining_after(state: &BoxState, unit: &UnitItem) -> u64 {
    state
        .box_type
        .capacity_volume()
        .saturating_sub(state.total_volume_cm3.saturating_add(unit.volume()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dims3;

    fn small_box() -> BoxType {
        BoxType::new("S", (20, 15, 10), 2_000, 120, 0.82)
    }

    #[test]
    fn dimensions_fit_in_any_edge_order() {
        let unit = UnitItem::new(Dims3::new(10, 20, 15), 100);
        assert!(fits_dimensions(&unit, &small_box()));

        let too_long = UnitItem::new(Dims3::new(21, 1, 1), 100);
        assert!(!fits_dimensions(&too_long, &small_box()));
    }

    #[test]
    fn weight_limit_is_inclusive() {
        let unit = UnitItem::new(Dims3::new(5, 5, 5), 1_000);
        let mut state = BoxState::open(small_box(), &unit);
        assert!(fits_weight(&state, &unit));

        state.add(&unit);
        let feather = UnitItem::new(Dims3::new(1, 1, 1), 1);
        assert!(!fits_weight(&state, &feather));
    }

    #[test]
    fn volume_limit_uses_fill_ratio() {
        // capacity of S is floor(3000 * 0.82) = 2460
        let unit = UnitItem::new(Dims3::new(15, 15, 10), 800);
        let state = BoxState::open(small_box(), &unit);
        assert!(!fits_volume(&state, &unit));

        let filler = UnitItem::new(Dims3::new(15, 14, 1), 10);
        assert!(fits_volume(&state, &filler));
        assert_eq!(remaining_after(&state, &filler), 0);
    }

    #[test]
    fn empty_box_check_combines_all_predicates() {
        let fits = UnitItem::new(Dims3::new(15, 15, 10), 800);
        assert!(fits_empty(&small_box(), &fits));

        let heavy = UnitItem::new(Dims3::new(5, 5, 5), 2_001);
        assert!(!fits_empty(&small_box(), &heavy));

        // 20×15×10 matches the box edges but exceeds the derated capacity
        let bulky = UnitItem::new(Dims3::new(20, 15, 10), 100);
        assert!(!fits_empty(&small_box(), &bulky));
    }

    #[test]
    fn can_place_requires_every_predicate() {
        let first = UnitItem::new(Dims3::new(10, 10, 10), 500);
        let state = BoxState::open(small_box(), &first);

        let ok = UnitItem::new(Dims3::new(10, 10, 10), 500);
        assert!(can_place(&state, &ok));

        let too_big = UnitItem::new(Dims3::new(25, 2, 2), 10);
        assert!(!can_place(&state, &too_big));
    }
}
