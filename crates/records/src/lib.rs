//! Record side of cell loading: template records, the content store, cell
//! descriptors and the positionable reference streams cells are loaded from.
//!
//! # Invariants
//! - Identifiers resolve case-insensitively.
//! - Templates are owned by the content store and never move once loading starts.
//! - A reader is always repositioned before a section is read; no reader
//!   position is assumed between calls.

mod cell;
mod content;
mod kind;
mod plugin;
mod source;
mod templates;

pub use cell::{CellContext, CellDescriptor, CellHeader, CellIndex, ReferenceSite};
pub use content::{ContentStore, RecordList, TemplateSource};
pub use kind::RecordKind;
pub use plugin::{PluginReader, PluginRecord, PluginWriter};
pub use source::{RecordSource, SourceError};
pub use templates::*;
