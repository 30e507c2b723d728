//! Packing logic that turns a cart into shipping parcels.
//!
//! Implements a greedy best-fit heuristic over a box catalog:
//! - Units are packed largest first (volume, then weight)
//! - Each unit goes into the open box it fills most tightly
//! - Otherwise the first catalog box that holds it alone is opened
//! - Units no catalog box can hold become padded fallback parcels
//!
//! The result is deterministic for identical input. No unit is ever moved
//! once placed and boxes are never merged afterwards.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::geometry::{can_place, fits_empty, remaining_after};
use crate::model::{BoxState, BoxType, CartLine, Parcel, UnitDefaults, UnitItem};
use crate::types::Dims3;

/// Configuration for the packing algorithm.
///
/// Holds the substitutes for missing measurements and the sizes of parcels
/// that do not come from the catalog.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PackingConfig {
    /// Measurements used for missing or invalid unit data
    pub unit_defaults: UnitDefaults,
    /// Added to every edge of a fallback parcel
    pub fallback_padding_cm: u64,
    /// Added to the weight of a fallback parcel
    pub fallback_padding_grams: u64,
    /// Reported when the cart contains no units at all
    pub empty_cart_parcel: Parcel,
    /// Upper bound on units after quantity expansion
    pub max_units: u64,
}

impl PackingConfig {
    pub const DEFAULT_FALLBACK_PADDING_CM: u64 = 2;
    pub const DEFAULT_FALLBACK_PADDING_GRAMS: u64 = 150;
    pub const DEFAULT_EMPTY_CART_PARCEL: Parcel = Parcel::new(Dims3::new(30, 20, 15), 500);
    pub const DEFAULT_MAX_UNITS: u64 = 5_000;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            unit_defaults: UnitDefaults::default(),
            fallback_padding_cm: Self::DEFAULT_FALLBACK_PADDING_CM,
            fallback_padding_grams: Self::DEFAULT_FALLBACK_PADDING_GRAMS,
            empty_cart_parcel: Self::DEFAULT_EMPTY_CART_PARCEL,
            max_units: Self::DEFAULT_MAX_UNITS,
        }
    }
}

/// Builder for PackingConfig.
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Sets the edges used for missing unit dimensions.
    pub fn default_dims(mut self, dims: Dims3) -> Self {
        self.config.unit_defaults.dims = dims;
        self
    }

    /// Sets the weight used for missing unit weights.
    pub fn default_weight_grams(mut self, grams: u64) -> Self {
        self.config.unit_defaults.weight_grams = grams;
        self
    }

    /// Sets the per-edge padding of fallback parcels.
    pub fn fallback_padding_cm(mut self, cm: u64) -> Self {
        self.config.fallback_padding_cm = cm;
        self
    }

    /// Sets the weight padding of fallback parcels.
    pub fn fallback_padding_grams(mut self, grams: u64) -> Self {
        self.config.fallback_padding_grams = grams;
        self
    }

    /// Sets the parcel reported for an empty cart.
    pub fn empty_cart_parcel(mut self, parcel: Parcel) -> Self {
        self.config.empty_cart_parcel = parcel;
        self
    }

    /// Sets the maximum number of units a cart may expand to.
    pub fn max_units(mut self, max_units: u64) -> Self {
        self.config.max_units = max_units;
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Errors of the checked packing entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackingError {
    #[error("cart expands to {units} units, at most {limit} are allowed")]
    TooManyUnits { units: u64, limit: u64 },
}

/// A unit that no catalog box could hold, with the parcel emitted for it.
#[derive(Clone, Debug)]
pub struct FallbackParcel {
    pub unit: UnitItem,
    pub parcel: Parcel,
}

/// Result of a packing run.
#[derive(Clone, Debug)]
pub struct PackingResult {
    /// Catalog boxes in the order they were opened
    pub boxes: Vec<BoxState>,
    /// Custom parcels for oversized units, in packing order
    pub fallbacks: Vec<FallbackParcel>,
    /// Set only when the cart produced no units
    pub placeholder: Option<Parcel>,
    /// Number of units after quantity expansion
    pub unit_count: usize,
}

impl PackingResult {
    /// The parcels to quote: boxes first, then fallbacks.
    ///
    /// Never empty.
    pub fn parcels(&self) -> Vec<Parcel> {
        self.boxes
            .iter()
            .map(BoxState::to_parcel)
            .chain(self.fallbacks.iter().map(|f| f.parcel))
            .chain(self.placeholder)
            .collect()
    }

    /// Number of catalog boxes used.
    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    /// Number of fallback parcels.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    /// Total number of parcels returned by `parcels`.
    pub fn parcel_count(&self) -> usize {
        self.boxes.len() + self.fallbacks.len() + usize::from(self.placeholder.is_some())
    }

    /// Sum of the unit weights in all parcels, without packaging.
    pub fn total_content_weight(&self) -> u64 {
        let boxed: u64 = self.boxes.iter().map(|b| b.total_weight_grams).sum();
        let loose: u64 = self.fallbacks.iter().map(|f| f.unit.weight_grams).sum();
        boxed + loose
    }

    /// Average fill level of the catalog boxes in percent.
    pub fn average_utilization(&self) -> f64 {
        if self.boxes.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.boxes.iter().map(BoxState::utilization_percent).sum();
        sum / self.boxes.len() as f64
    }
}

/// Events emitted while packing, for streaming a quote as it is built.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new catalog box was opened for a unit.
    BoxOpened {
        box_index: usize,
        box_type: String,
        #[schema(value_type = [u64; 3])]
        dims: (u64, u64, u64),
        capacity_volume: u64,
        max_weight: u64,
    },
    /// A unit was added to a box.
    UnitPacked {
        box_index: usize,
        #[schema(value_type = [u64; 3])]
        dims: (u64, u64, u64),
        weight: u64,
        total_weight: u64,
        total_volume: u64,
    },
    /// A unit fit no catalog box and got its own parcel.
    FallbackEmitted {
        #[schema(value_type = [u64; 3])]
        dims: (u64, u64, u64),
        weight: u64,
        parcel: Parcel,
    },
    /// Packing completed.
    Finished {
        parcels: usize,
        boxes: usize,
        fallbacks: usize,
    },
}

/// Total number of units the cart lines expand to.
pub fn count_units(lines: &[CartLine]) -> u64 {
    lines
        .iter()
        .fold(0u64, |acc, line| acc.saturating_add(line.unit_count()))
}

/// Expands cart lines into individual units.
///
/// Lines with a quantity of zero contribute nothing; every other line
/// contributes `quantity` identical normalized units. Expansion stops once
/// `limit` units exist, so later lines may be cut short or skipped.
pub fn expand_units(lines: &[CartLine], defaults: &UnitDefaults, limit: u64) -> Vec<UnitItem> {
    let mut units = Vec::new();
    let mut remaining = limit;
    for line in lines {
        let count = line.unit_count().min(remaining);
        if count == 0 {
            continue;
        }
        let unit = line.normalized_unit(defaults);
        units.extend(std::iter::repeat_n(unit, count as usize));
        remaining -= count;
    }
    units
}

/// Main function that sizes the parcels for a cart.
///
/// # Parameters
/// * `lines` - The cart lines
/// * `catalog` - The available box types, in selection preference order
///
/// # Returns
/// At least one parcel
pub fn build_shipping_parcels(lines: &[CartLine], catalog: &[BoxType]) -> Vec<Parcel> {
    pack_cart(lines, catalog).parcels()
}

/// Packs a cart with the default configuration.
pub fn pack_cart(lines: &[CartLine], catalog: &[BoxType]) -> PackingResult {
    pack_cart_with_config(lines, catalog, &PackingConfig::default())
}

/// Packs a cart with a custom configuration.
pub fn pack_cart_with_config(
    lines: &[CartLine],
    catalog: &[BoxType],
    config: &PackingConfig,
) -> PackingResult {
    pack_cart_with_progress(lines, catalog, config, |_| {})
}

/// Packs a cart and reports every step to a callback (suitable for SSE).
///
/// Never fails. A cart beyond `config.max_units` is packed only up to that
/// many units; use [`try_pack_cart`] to reject such carts instead.
pub fn pack_cart_with_progress(
    lines: &[CartLine],
    catalog: &[BoxType],
    config: &PackingConfig,
    on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    let requested = count_units(lines);
    if requested > config.max_units {
        tracing::warn!(
            "⚠️ Cart expands to {} units, packing only the first {}.",
            requested,
            config.max_units
        );
    }
    let units = expand_units(lines, &config.unit_defaults, config.max_units);
    pack_units(units, catalog, config, on_event)
}

/// Packs a cart, rejecting it when it expands beyond `config.max_units`.
pub fn try_pack_cart(
    lines: &[CartLine],
    catalog: &[BoxType],
    config: &PackingConfig,
    on_event: impl FnMut(&PackEvent),
) -> Result<PackingResult, PackingError> {
    let units = count_units(lines);
    if units > config.max_units {
        return Err(PackingError::TooManyUnits {
            units,
            limit: config.max_units,
        });
    }
    Ok(pack_cart_with_progress(lines, catalog, config, on_event))
}

/// Packs already normalized units.
pub fn pack_units(
    mut units: Vec<UnitItem>,
    catalog: &[BoxType],
    config: &PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    let unit_count = units.len();

    if units.is_empty() {
        on_event(&PackEvent::Finished {
            parcels: 1,
            boxes: 0,
            fallbacks: 0,
        });
        return PackingResult {
            boxes: Vec::new(),
            fallbacks: Vec::new(),
            placeholder: Some(config.empty_cart_parcel),
            unit_count,
        };
    }

    // Largest first; `sort_by` is stable so equal units keep input order.
    units.sort_by(|a, b| {
        b.volume_cm3
            .cmp(&a.volume_cm3)
            .then_with(|| b.weight_grams.cmp(&a.weight_grams))
    });

    let mut boxes: Vec<BoxState> = Vec::new();
    let mut fallbacks: Vec<FallbackParcel> = Vec::new();

    for unit in units {
        if let Some(idx) = tightest_open_box(&boxes, &unit) {
            let state = &mut boxes[idx];
            state.add(&unit);
            on_event(&PackEvent::UnitPacked {
                box_index: idx,
                dims: unit.dims.into(),
                weight: unit.weight_grams,
                total_weight: state.total_weight_grams,
                total_volume: state.total_volume_cm3,
            });
            continue;
        }

        match catalog.iter().find(|box_type| fits_empty(box_type, &unit)) {
            Some(box_type) => {
                let box_index = boxes.len();
                on_event(&PackEvent::BoxOpened {
                    box_index,
                    box_type: box_type.name.clone(),
                    dims: (box_type.length_cm, box_type.width_cm, box_type.height_cm),
                    capacity_volume: box_type.capacity_volume(),
                    max_weight: box_type.max_weight_grams,
                });
                let state = BoxState::open(box_type.clone(), &unit);
                on_event(&PackEvent::UnitPacked {
                    box_index,
                    dims: unit.dims.into(),
                    weight: unit.weight_grams,
                    total_weight: state.total_weight_grams,
                    total_volume: state.total_volume_cm3,
                });
                boxes.push(state);
            }
            None => {
                let parcel = Parcel::fallback(
                    &unit,
                    config.fallback_padding_cm,
                    config.fallback_padding_grams,
                );
                on_event(&PackEvent::FallbackEmitted {
                    dims: unit.dims.into(),
                    weight: unit.weight_grams,
                    parcel,
                });
                fallbacks.push(FallbackParcel { unit, parcel });
            }
        }
    }

    on_event(&PackEvent::Finished {
        parcels: boxes.len() + fallbacks.len(),
        boxes: boxes.len(),
        fallbacks: fallbacks.len(),
    });
    PackingResult {
        boxes,
        fallbacks,
        placeholder: None,
        unit_count,
    }
}

/// Finds the open box that accepts the unit with the least volume left over.
///
/// Ties go to the box opened first.
fn tightest_open_box(boxes: &[BoxState], unit: &UnitItem) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (idx, state) in boxes.iter().enumerate() {
        if !can_place(state, unit) {
            continue;
        }
        let remaining = remaining_after(state, unit);
        match best {
            Some((_, best_remaining)) if remaining >= best_remaining => {}
            _ => best = Some((idx, remaining)),
        }
    }
    best.map(|(idx, _)| idx)
}
