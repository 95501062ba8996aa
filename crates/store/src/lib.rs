//! Cell store: lazy materialization of a world cell's references.
//!
//! A [`CellStore`] moves through `Unloaded -> Preloaded -> Loaded`. Preloading
//! only lists identifiers; loading resolves each reference against the content
//! store and files it into one of twenty typed category lists.
//!
//! # Invariants
//! - `preload` and `load` never fail as a whole; problems are scoped to one reference.
//! - Both are no-ops once the cell is at or past their target state.
//! - The identifier cache is sorted and lowercase.
//! - Traversal visits categories in a fixed order.

mod error;
mod list;
mod live_ref;
mod refdata;
mod store;
mod visit;

pub use error::{RefError, ResolutionError};
pub use list::{CategoryRefs, IdentityList, StackList};
pub use live_ref::LiveRef;
pub use refdata::RefData;
pub use store::{CellStore, LoadStats, State};
pub use visit::{Category, LiveRefVisitor};
