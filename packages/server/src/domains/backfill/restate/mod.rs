//! Backfill virtual object hosted on Restate

pub mod virtual_objects;

pub use virtual_objects::*;
