//! # Migration Shared
//! This crate defines the data structures shared across the migration workspace.
//! It includes the normalized creator and request records, the record keys used
//! against the destination, content blobs and the order-aligned batch arguments
//! submitted in a single destination call.
pub mod address;
pub mod types;

pub use address::{is_valid_address, normalize_address};
