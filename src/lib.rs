//! Parcel sizing for shipping quotes.
//!
//! Cart lines are expanded into units and packed greedily into catalog
//! boxes; whatever fits no box ships as its own padded parcel. The
//! resulting parcel list is what a carrier tariff request needs.

pub mod api;
pub mod catalog;
pub mod config;
pub mod geometry;
pub mod model;
pub mod optimizer;
pub mod types;

pub use model::{BoxType, CartLine, Parcel};
pub use optimizer::{PackingConfig, PackingResult, build_shipping_parcels, pack_cart};
