use worldcell_records::{RecordKind, SourceError};

/// A reference's kind was resolved but its category has no template by that name.
///
/// Means the content store's kind index and its template lists disagree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("error resolving cell reference {id} as {kind}")]
pub struct ResolutionError {
    pub id: String,
    pub kind: RecordKind,
}

/// Why a single reference was dropped while scanning a cell.
///
/// None of these abort a cell load.
#[derive(Debug, thiserror::Error)]
pub enum RefError {
    #[error("cell reference {id} not found")]
    UnresolvedIdentifier { id: String },
    #[error("ignoring reference '{id}' of unhandled type {kind}")]
    UnhandledKind { id: String, kind: RecordKind },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("reading plugin {plugin}: {source}")]
    Source {
        plugin: usize,
        #[source]
        source: SourceError,
    },
}
