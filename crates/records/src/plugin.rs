//! CBOR plugin streams.
//!
//! A plugin is a flat sequence of CBOR-encoded [`PluginRecord`] values:
//! ```text
//! Template ...            - canonical templates, any order
//! Cell(header)            - opens a reference section
//!   Reference ...         - reference sites of that cell
//! EndCell                 - closes the section
//! ```
//! A cell context is the byte offset just past its `Cell` header, so a reader can
//! seek straight to the first reference.

use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom};

use crate::{
    CellContext, CellHeader, CellIndex, ContentStore, RecordSource, ReferenceSite, SourceError,
    TemplateRecord,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PluginRecord {
    Template(TemplateRecord),
    Cell(CellHeader),
    Reference(ReferenceSite),
    EndCell,
}

/// Builds a plugin stream in memory.
#[derive(Debug, Default)]
pub struct PluginWriter {
    buf: Vec<u8>,
    in_cell: bool,
}

impl PluginWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a template. Closes any open cell section first.
    pub fn template(&mut self, record: impl Into<TemplateRecord>) -> Result<(), SourceError> {
        self.end_cell()?;
        self.write(&PluginRecord::Template(record.into()))
    }

    /// Open a cell section. Closes any open cell section first.
    pub fn begin_cell(&mut self, header: CellHeader) -> Result<(), SourceError> {
        self.end_cell()?;
        self.write(&PluginRecord::Cell(header))?;
        self.in_cell = true;
        Ok(())
    }

    pub fn reference(&mut self, site: ReferenceSite) -> Result<(), SourceError> {
        if !self.in_cell {
            return Err(SourceError::OrphanReference);
        }
        self.write(&PluginRecord::Reference(site))
    }

    /// Close the open cell section, if any.
    pub fn end_cell(&mut self) -> Result<(), SourceError> {
        if self.in_cell {
            self.in_cell = false;
            self.write(&PluginRecord::EndCell)?;
        }
        Ok(())
    }

    /// Finish the stream and return its bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, SourceError> {
        self.end_cell()?;
        Ok(self.buf)
    }

    fn write(&mut self, record: &PluginRecord) -> Result<(), SourceError> {
        ciborium::into_writer(record, &mut self.buf)
            .map_err(|e| SourceError::CborEncode(e.to_string()))
    }
}

/// Reads a plugin stream. Serves as the [`RecordSource`] for its plugin index.
#[derive(Debug)]
pub struct PluginReader<R> {
    plugin: usize,
    inner: R,
    len: u64,
}

impl<R: Read + Seek> PluginReader<R> {
    pub fn new(plugin: usize, mut inner: R) -> Result<Self, SourceError> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { plugin, inner, len })
    }

    /// Index of this plugin in load order.
    pub fn plugin(&self) -> usize {
        self.plugin
    }

    /// Scan the whole stream: templates go into `store`, cell sections into `cells`.
    pub fn index_into(
        &mut self,
        store: &mut ContentStore,
        cells: &mut CellIndex,
    ) -> Result<(), SourceError> {
        let _span = tracing::debug_span!("index_plugin", plugin = self.plugin).entered();
        self.inner.seek(SeekFrom::Start(0))?;

        let mut in_cell = false;
        let mut templates = 0usize;
        let mut sections = 0usize;
        while let Some(record) = self.read_record()? {
            match record {
                PluginRecord::Template(t) => {
                    store.insert(t);
                    templates += 1;
                }
                PluginRecord::Cell(header) => {
                    let offset = self.inner.stream_position()?;
                    cells.add_section(
                        &header,
                        CellContext {
                            plugin: self.plugin,
                            offset,
                        },
                    );
                    in_cell = true;
                    sections += 1;
                }
                PluginRecord::Reference(_) if !in_cell => {
                    return Err(SourceError::OrphanReference);
                }
                PluginRecord::Reference(_) => {}
                PluginRecord::EndCell => in_cell = false,
            }
        }

        tracing::debug!(templates, sections, "plugin indexed");
        Ok(())
    }

    fn read_record(&mut self) -> Result<Option<PluginRecord>, SourceError> {
        if self.inner.stream_position()? >= self.len {
            return Ok(None);
        }
        ciborium::from_reader(&mut self.inner)
            .map(Some)
            .map_err(|e| SourceError::CborDecode(e.to_string()))
    }
}

impl<R: Read + Seek> RecordSource for PluginReader<R> {
    fn seek_to_context(&mut self, context: &CellContext) -> Result<(), SourceError> {
        self.inner.seek(SeekFrom::Start(context.offset))?;
        Ok(())
    }

    fn next_reference(&mut self) -> Result<Option<ReferenceSite>, SourceError> {
        match self.read_record()? {
            Some(PluginRecord::Reference(site)) => Ok(Some(site)),
            Some(PluginRecord::EndCell) | None => Ok(None),
            Some(PluginRecord::Cell(_)) => Err(SourceError::UnexpectedRecord("cell")),
            Some(PluginRecord::Template(_)) => Err(SourceError::UnexpectedRecord("template")),
        }
    }
}
