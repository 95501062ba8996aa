//! Shared value types for world cell loading.

mod types;

pub use types::{GridCoord, Placement, RefNum, lowercase_id};
