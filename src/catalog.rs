//! In-memory box type catalog managed through the admin endpoints.
//!
//! Records are kept in insertion order and listed by `sort_order`, so equal
//! sort orders keep the order in which they were created. The packer never
//! sees this store directly; it receives a `snapshot`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::{BoxType, BoxTypeInput, ValidationError};

/// Errors of catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Box type {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Errors while loading an initial catalog file.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("entry {index} in {path} is invalid: {source}")]
    Invalid {
        path: String,
        index: usize,
        source: ValidationError,
    },
}

/// A stored box type.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "6f1c1a8e-2d0b-4c36-9a57-0f7d8f0c2e11",
    "name": "S",
    "length_cm": 20,
    "width_cm": 15,
    "height_cm": 10,
    "max_weight_grams": 2000,
    "empty_weight_grams": 120,
    "fill_ratio": 0.82,
    "sort_order": 10
}))]
pub struct BoxTypeRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub box_type: BoxType,
    pub sort_order: i32,
}

/// Shared, mutable box type catalog.
#[derive(Clone, Debug, Default)]
pub struct BoxCatalog {
    records: Arc<RwLock<Vec<BoxTypeRecord>>>,
}

impl BoxCatalog {
    /// Creates a catalog holding the given box types, in order.
    ///
    /// Sort orders are assigned in steps of 10 so administrators can insert
    /// entries in between.
    pub fn seeded(box_types: Vec<BoxType>) -> Self {
        let records = box_types
            .into_iter()
            .enumerate()
            .map(|(idx, box_type)| BoxTypeRecord {
                id: Uuid::new_v4(),
                box_type,
                sort_order: ((idx as i32) + 1) * 10,
            })
            .collect();
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Lists all box types ordered by sort order, then creation.
    pub async fn list_box_types(&self) -> Vec<BoxTypeRecord> {
        let mut records = self.records.read().await.clone();
        records.sort_by_key(|record| record.sort_order);
        records
    }

    /// The current catalog in selection order, as the packer consumes it.
    pub async fn snapshot(&self) -> Vec<BoxType> {
        self.list_box_types()
            .await
            .into_iter()
            .map(|record| record.box_type)
            .collect()
    }

    /// Validates and stores a new box type.
    pub async fn create_box_type(
        &self,
        input: &BoxTypeInput,
    ) -> Result<BoxTypeRecord, CatalogError> {
        let (box_type, sort_order) = input.validate()?;
        let record = BoxTypeRecord {
            id: Uuid::new_v4(),
            box_type,
            sort_order,
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    /// Replaces all fields of an existing box type.
    pub async fn update_box_type(
        &self,
        id: Uuid,
        input: &BoxTypeInput,
    ) -> Result<BoxTypeRecord, CatalogError> {
        let (box_type, sort_order) = input.validate()?;
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(CatalogError::NotFound(id))?;
        record.box_type = box_type;
        record.sort_order = sort_order;
        Ok(record.clone())
    }

    /// Removes a box type and returns it.
    pub async fn delete_box_type(&self, id: Uuid) -> Result<BoxTypeRecord, CatalogError> {
        let mut records = self.records.write().await;
        let idx = records
            .iter()
            .position(|record| record.id == id)
            .ok_or(CatalogError::NotFound(id))?;
        Ok(records.remove(idx))
    }

    /// Number of stored box types.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

/// Reads a JSON array of box type inputs from a file.
pub fn load_catalog_file(path: &Path) -> Result<BoxCatalog, CatalogLoadError> {
    let display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
        path: display.clone(),
        source,
    })?;
    let inputs: Vec<BoxTypeInput> =
        serde_json::from_str(&raw).map_err(|source| CatalogLoadError::Parse {
            path: display.clone(),
            source,
        })?;

    let mut records = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let (box_type, sort_order) = input.validate().map_err(|source| CatalogLoadError::Invalid {
            path: display.clone(),
            index,
            source,
        })?;
        records.push(BoxTypeRecord {
            id: Uuid::new_v4(),
            box_type,
            sort_order,
        });
    }

    Ok(BoxCatalog {
        records: Arc::new(RwLock::new(records)),
    })
}
