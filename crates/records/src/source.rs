use crate::{CellContext, ReferenceSite};

/// Errors from reading or writing a record stream.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("unexpected {0} record inside a reference section")]
    UnexpectedRecord(&'static str),
    #[error("reference written outside of a cell section")]
    OrphanReference,
    #[error("no reader for plugin {0}")]
    MissingPlugin(usize),
}

/// A positionable stream of reference records for one plugin.
pub trait RecordSource {
    /// Reposition to the start of a cell's reference section.
    fn seek_to_context(&mut self, context: &CellContext) -> Result<(), SourceError>;

    /// Next reference of the current section, or `None` once the section ends.
    fn next_reference(&mut self) -> Result<Option<ReferenceSite>, SourceError>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn seek_to_context(&mut self, context: &CellContext) -> Result<(), SourceError> {
        (**self).seek_to_context(context)
    }

    fn next_reference(&mut self) -> Result<Option<ReferenceSite>, SourceError> {
        (**self).next_reference()
    }
}
