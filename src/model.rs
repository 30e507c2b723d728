//! Data models for parcel packing.
//!
//! This module defines the fundamental data structures of a shipping quote:
//! - `CartLine`: A cart position as the storefront sends it
//! - `UnitItem`: One physical unit of a cart line after normalization
//! - `BoxType`: A catalog box with capacity limits
//! - `BoxState`: A box being filled during packing
//! - `Parcel`: The dimensions and weight handed to the carrier

use serde::{Deserialize, Deserializer, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Dimensional, Dims3, Weighted};

/// Validation error for box type data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid fill ratio: {0}")]
    InvalidFillRatio(String),
}

const MAX_NAME_LEN: usize = 64;

fn validate_name(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidName(
            "Name must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::InvalidName(format!(
            "Name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_dimension(value: f64, name: &str) -> Result<u64, ValidationError> {
    match positive_int(Some(value)) {
        Some(rounded) => Ok(rounded),
        None => Err(ValidationError::InvalidDimension(format!(
            "{} must be at least 1 cm, got: {}",
            name, value
        ))),
    }
}

fn validate_max_weight(value: f64) -> Result<u64, ValidationError> {
    positive_int(Some(value)).ok_or_else(|| {
        ValidationError::InvalidWeight(format!(
            "Maximum weight must be at least 1 g, got: {}",
            value
        ))
    })
}

fn validate_empty_weight(value: f64) -> Result<u64, ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidWeight(format!(
            "Empty box weight must not be negative, got: {}",
            value
        )));
    }
    Ok(value.round() as u64)
}

fn validate_fill_ratio(value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ValidationError::InvalidFillRatio(format!(
            "Fill ratio must be in (0, 1], got: {}",
            value
        )));
    }
    Ok(value)
}

/// Rounds a finite value to the nearest integer and accepts it when it is at least 1.
fn positive_int(value: Option<f64>) -> Option<u64> {
    let value = value?;
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < 1.0 {
        return None;
    }
    Some(rounded as u64)
}

/// Normalizes a measurement, substituting `fallback` for anything that is
/// missing, non-finite or rounds below 1.
pub fn normalize_positive_int(value: Option<f64>, fallback: u64) -> u64 {
    positive_int(value).unwrap_or(fallback)
}

/// Accepts any JSON value and keeps it only when it is a number.
///
/// Cart payloads come from a browser and may carry strings, `null` or
/// booleans in numeric fields; those are treated as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

/// A cart position as received from the storefront.
///
/// Every numeric field is optional and lenient; normalization happens when
/// the line is expanded into units.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "quantity": 2,
    "weight_grams": 800,
    "length_cm": 15,
    "width_cm": 15,
    "height_cm": 10
}))]
pub struct CartLine {
    #[serde(default, deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub quantity: Option<f64>,
    #[serde(default, alias = "weightGrams", deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub weight_grams: Option<f64>,
    #[serde(default, alias = "lengthCm", deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub length_cm: Option<f64>,
    #[serde(default, alias = "widthCm", deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub width_cm: Option<f64>,
    #[serde(default, alias = "heightCm", deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub height_cm: Option<f64>,
}

impl CartLine {
    /// Creates a line with all measurements set.
    pub fn new(quantity: f64, weight_grams: f64, dims: (f64, f64, f64)) -> Self {
        Self {
            quantity: Some(quantity),
            weight_grams: Some(weight_grams),
            length_cm: Some(dims.0),
            width_cm: Some(dims.1),
            height_cm: Some(dims.2),
        }
    }

    /// Number of physical units this line stands for.
    ///
    /// The quantity is rounded and clamped at zero; anything non-numeric or
    /// non-finite counts as zero.
    pub fn unit_count(&self) -> u64 {
        match self.quantity {
            Some(q) if q.is_finite() => q.round().max(0.0) as u64,
            _ => 0,
        }
    }

    /// Normalizes the measurements of one unit of this line.
    pub fn normalized_unit(&self, defaults: &UnitDefaults) -> UnitItem {
        let dims = Dims3::new(
            normalize_positive_int(self.length_cm, defaults.dims.length),
            normalize_positive_int(self.width_cm, defaults.dims.width),
            normalize_positive_int(self.height_cm, defaults.dims.height),
        );
        let weight_grams = normalize_positive_int(self.weight_grams, defaults.weight_grams);
        UnitItem::new(dims, weight_grams)
    }
}

/// Substitutes used for missing or invalid unit measurements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitDefaults {
    pub dims: Dims3,
    pub weight_grams: u64,
}

impl UnitDefaults {
    pub const DEFAULT_EDGE_CM: u64 = 10;
    pub const DEFAULT_WEIGHT_GRAMS: u64 = 500;
}

impl Default for UnitDefaults {
    fn default() -> Self {
        Self {
            dims: Dims3::new(
                Self::DEFAULT_EDGE_CM,
                Self::DEFAULT_EDGE_CM,
                Self::DEFAULT_EDGE_CM,
            ),
            weight_grams: Self::DEFAULT_WEIGHT_GRAMS,
        }
    }
}

/// One physical unit of a cart line, with strictly positive measurements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitItem {
    pub dims: Dims3,
    pub weight_grams: u64,
    pub volume_cm3: u64,
}

impl UnitItem {
    pub fn new(dims: Dims3, weight_grams: u64) -> Self {
        Self {
            dims,
            weight_grams,
            volume_cm3: dims.volume(),
        }
    }
}

impl Dimensional for UnitItem {
    fn dimensions(&self) -> Dims3 {
        self.dims
    }

    fn volume(&self) -> u64 {
        self.volume_cm3
    }
}

impl Weighted for UnitItem {
    fn weight_grams(&self) -> u64 {
        self.weight_grams
    }
}

/// A catalog box with its usable inner size and limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoxType {
    pub name: String,
    pub length_cm: u64,
    pub width_cm: u64,
    pub height_cm: u64,
    /// Maximum weight of the contents, excluding the box itself.
    pub max_weight_grams: u64,
    pub empty_weight_grams: u64,
    /// Share of the raw volume that is usable once void space is accounted for.
    pub fill_ratio: f64,
}

impl BoxType {
    /// Creates a box type without validation. Catalog entries are validated
    /// through `BoxTypeInput`.
    pub fn new(
        name: impl Into<String>,
        dims: (u64, u64, u64),
        max_weight_grams: u64,
        empty_weight_grams: u64,
        fill_ratio: f64,
    ) -> Self {
        Self {
            name: name.into(),
            length_cm: dims.0,
            width_cm: dims.1,
            height_cm: dims.2,
            max_weight_grams,
            empty_weight_grams,
            fill_ratio,
        }
    }

    /// Usable volume: `floor(L × W × H × fill_ratio)`.
    pub fn capacity_volume(&self) -> u64 {
        (self.dimensions().volume() as f64 * self.fill_ratio).floor() as u64
    }

    /// The built-in catalog, smallest first.
    pub fn default_catalog() -> Vec<BoxType> {
        vec![
            BoxType::new("S", (20, 15, 10), 2_000, 120, 0.82),
            BoxType::new("M", (30, 22, 14), 5_000, 180, 0.82),
            BoxType::new("L", (40, 30, 20), 10_000, 260, 0.8),
            BoxType::new("XL", (60, 40, 30), 20_000, 420, 0.78),
        ]
    }
}

impl Dimensional for BoxType {
    fn dimensions(&self) -> Dims3 {
        Dims3::new(self.length_cm, self.width_cm, self.height_cm)
    }
}

/// Box type data as submitted by an administrator.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "S",
    "length_cm": 20,
    "width_cm": 15,
    "height_cm": 10,
    "max_weight_grams": 2000,
    "empty_weight_grams": 120,
    "fill_ratio": 0.82,
    "sort_order": 10
}))]
pub struct BoxTypeInput {
    pub name: String,
    #[serde(alias = "lengthCm")]
    pub length_cm: f64,
    #[serde(alias = "widthCm")]
    pub width_cm: f64,
    #[serde(alias = "heightCm")]
    pub height_cm: f64,
    #[serde(alias = "maxWeightGrams")]
    pub max_weight_grams: f64,
    #[serde(default, alias = "emptyWeightGrams")]
    pub empty_weight_grams: f64,
    #[serde(alias = "fillRatio")]
    pub fill_ratio: f64,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<i32>,
}

impl BoxTypeInput {
    /// Validates the input and converts it into a box type plus its sort order.
    pub fn validate(&self) -> Result<(BoxType, i32), ValidationError> {
        let name = validate_name(&self.name)?;
        let length_cm = validate_dimension(self.length_cm, "Length")?;
        let width_cm = validate_dimension(self.width_cm, "Width")?;
        let height_cm = validate_dimension(self.height_cm, "Height")?;
        let max_weight_grams = validate_max_weight(self.max_weight_grams)?;
        let empty_weight_grams = validate_empty_weight(self.empty_weight_grams)?;
        let fill_ratio = validate_fill_ratio(self.fill_ratio)?;

        let box_type = BoxType {
            name,
            length_cm,
            width_cm,
            height_cm,
            max_weight_grams,
            empty_weight_grams,
            fill_ratio,
        };
        Ok((box_type, self.sort_order.unwrap_or(0)))
    }
}

impl From<&BoxType> for BoxTypeInput {
    fn from(box_type: &BoxType) -> Self {
        Self {
            name: box_type.name.clone(),
            length_cm: box_type.length_cm as f64,
            width_cm: box_type.width_cm as f64,
            height_cm: box_type.height_cm as f64,
            max_weight_grams: box_type.max_weight_grams as f64,
            empty_weight_grams: box_type.empty_weight_grams as f64,
            fill_ratio: box_type.fill_ratio,
            sort_order: None,
        }
    }
}

/// A box being filled during packing.
///
/// Only running totals are kept; units are never positioned.
#[derive(Clone, Debug)]
pub struct BoxState {
    pub box_type: BoxType,
    pub total_weight_grams: u64,
    pub total_volume_cm3: u64,
    pub unit_count: usize,
}

impl BoxState {
    /// Opens a box of the given type holding `unit`.
    pub fn open(box_type: BoxType, unit: &UnitItem) -> Self {
        Self {
            box_type,
            total_weight_grams: unit.weight_grams,
            total_volume_cm3: unit.volume_cm3,
            unit_count: 1,
        }
    }

    /// Adds a unit's weight and volume to the running totals.
    pub fn add(&mut self, unit: &UnitItem) {
        self.total_weight_grams = self.total_weight_grams.saturating_add(unit.weight_grams);
        self.total_volume_cm3 = self.total_volume_cm3.saturating_add(unit.volume_cm3);
        self.unit_count += 1;
    }

    /// Volume left after the current contents.
    pub fn remaining_volume(&self) -> u64 {
        self.box_type
            .capacity_volume()
            .saturating_sub(self.total_volume_cm3)
    }

    /// Content volume as a share of the fill-adjusted capacity, in percent.
    pub fn utilization_percent(&self) -> f64 {
        let capacity = self.box_type.capacity_volume();
        if capacity == 0 {
            return 0.0;
        }
        (self.total_volume_cm3 as f64 / capacity as f64) * 100.0
    }

    /// Converts the box into the parcel reported to the carrier.
    pub fn to_parcel(&self) -> Parcel {
        Parcel {
            length: self.box_type.length_cm,
            width: self.box_type.width_cm,
            height: self.box_type.height_cm,
            weight: self
                .total_weight_grams
                .saturating_add(self.box_type.empty_weight_grams)
                .max(1),
        }
    }
}

impl Weighted for BoxState {
    fn weight_grams(&self) -> u64 {
        self.total_weight_grams
    }
}

/// A shipping parcel in centimetres and grams, as carrier tariff calculators expect it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "length": 20, "width": 15, "height": 10, "weight": 920 }))]
pub struct Parcel {
    pub length: u64,
    pub width: u64,
    pub height: u64,
    pub weight: u64,
}

impl Parcel {
    pub const fn new(dims: Dims3, weight: u64) -> Self {
        Self {
            length: dims.length,
            width: dims.width,
            height: dims.height,
            weight,
        }
    }

    /// Custom parcel for a unit no catalog box can hold.
    pub fn fallback(unit: &UnitItem, padding_cm: u64, padding_grams: u64) -> Self {
        Self::new(
            unit.dims.padded(padding_cm),
            unit.weight_grams.saturating_add(padding_grams).max(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_valid_values_rounded() {
        assert_eq!(normalize_positive_int(Some(15.0), 10), 15);
        assert_eq!(normalize_positive_int(Some(14.6), 10), 15);
        assert_eq!(normalize_positive_int(Some(1.0), 10), 1);
    }

    #[test]
    fn normalize_substitutes_invalid_values() {
        assert_eq!(normalize_positive_int(None, 10), 10);
        assert_eq!(normalize_positive_int(Some(0.0), 10), 10);
        assert_eq!(normalize_positive_int(Some(-5.0), 500), 500);
        assert_eq!(normalize_positive_int(Some(0.4), 10), 10);
        assert_eq!(normalize_positive_int(Some(f64::NAN), 10), 10);
        assert_eq!(normalize_positive_int(Some(f64::INFINITY), 10), 10);
    }

    #[test]
    fn unit_count_rounds_and_clamps() {
        let mut line = CartLine::new(3.0, 100.0, (1.0, 1.0, 1.0));
        assert_eq!(line.unit_count(), 3);
        line.quantity = Some(2.6);
        assert_eq!(line.unit_count(), 3);
        line.quantity = Some(-4.0);
        assert_eq!(line.unit_count(), 0);
        line.quantity = Some(f64::INFINITY);
        assert_eq!(line.unit_count(), 0);
        line.quantity = None;
        assert_eq!(line.unit_count(), 0);
    }

    #[test]
    fn cart_line_ignores_non_numeric_fields() {
        let json = r#"{
            "quantity": 1,
            "weightGrams": "heavy",
            "lengthCm": null,
            "widthCm": true,
            "heightCm": 12.2
        }"#;
        let line: CartLine = serde_json::from_str(json).expect("lenient payload should parse");
        assert_eq!(line.weight_grams, None);
        assert_eq!(line.length_cm, None);
        assert_eq!(line.width_cm, None);
        assert_eq!(line.height_cm, Some(12.2));

        let unit = line.normalized_unit(&UnitDefaults::default());
        assert_eq!(unit.dims, Dims3::new(10, 10, 12));
        assert_eq!(unit.weight_grams, 500);
        assert_eq!(unit.volume_cm3, 1200);
    }

    #[test]
    fn cart_line_without_quantity_parses_as_empty() {
        let line: CartLine = serde_json::from_str("{}").expect("empty object should parse");
        assert_eq!(line.unit_count(), 0);
    }

    #[test]
    fn default_catalog_capacities() {
        let capacities: Vec<u64> = BoxType::default_catalog()
            .iter()
            .map(BoxType::capacity_volume)
            .collect();
        assert_eq!(capacities, vec![2460, 7576, 19200, 56160]);
    }

    #[test]
    fn box_type_input_validates() {
        let input = BoxTypeInput {
            name: "  Medium ".to_string(),
            length_cm: 30.2,
            width_cm: 22.0,
            height_cm: 14.0,
            max_weight_grams: 5000.0,
            empty_weight_grams: 180.0,
            fill_ratio: 0.82,
            sort_order: Some(20),
        };
        let (box_type, sort_order) = input.validate().expect("input should be valid");
        assert_eq!(box_type.name, "Medium");
        assert_eq!(box_type.length_cm, 30);
        assert_eq!(sort_order, 20);
    }

    #[test]
    fn box_type_input_rejects_bad_values() {
        let valid = BoxTypeInput::from(&BoxType::default_catalog()[0]);

        let mut input = valid.clone();
        input.name = "   ".to_string();
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidName(_))
        ));

        let mut input = valid.clone();
        input.height_cm = 0.2;
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidDimension(_))
        ));

        let mut input = valid.clone();
        input.max_weight_grams = f64::NAN;
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidWeight(_))
        ));

        let mut input = valid.clone();
        input.empty_weight_grams = -1.0;
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidWeight(_))
        ));

        for ratio in [0.0, 1.5, f64::INFINITY] {
            let mut input = valid.clone();
            input.fill_ratio = ratio;
            assert!(matches!(
                input.validate(),
                Err(ValidationError::InvalidFillRatio(_))
            ));
        }
    }

    #[test]
    fn box_state_tracks_totals_and_parcel_weight() {
        let small = BoxType::default_catalog().remove(0);
        let unit = UnitItem::new(Dims3::new(10, 10, 10), 400);
        let mut state = BoxState::open(small, &unit);
        state.add(&unit);

        assert_eq!(state.total_weight_grams, 800);
        assert_eq!(state.total_volume_cm3, 2000);
        assert_eq!(state.unit_count, 2);
        assert_eq!(state.remaining_volume(), 460);
        assert_eq!(
            state.to_parcel(),
            Parcel {
                length: 20,
                width: 15,
                height: 10,
                weight: 920
            }
        );
    }

    #[test]
    fn fallback_parcel_pads_dimensions_and_weight() {
        let unit = UnitItem::new(Dims3::new(1000, 10, 10), 500);
        let parcel = Parcel::fallback(&unit, 2, 150);
        assert_eq!(parcel, Parcel::new(Dims3::new(1002, 12, 12), 650));
    }
}
