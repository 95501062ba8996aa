use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use worldcell_common::{GridCoord, Placement, RefNum, lowercase_id};

/// Where one plugin's references for a cell begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellContext {
    /// Index of the plugin's reader in the reader array.
    pub plugin: usize,
    /// Byte offset of the first reference in that plugin's stream.
    pub offset: u64,
}

/// Static description of a cell, merged across every plugin that touches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDescriptor {
    pub name: String,
    pub exterior: bool,
    pub grid: GridCoord,
    pub water_level: f32,
    /// Reference sections in plugin load order.
    pub contexts: Vec<CellContext>,
}

impl CellDescriptor {
    pub fn interior(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exterior: false,
            grid: GridCoord::default(),
            water_level: 0.0,
            contexts: Vec::new(),
        }
    }

    pub fn exterior(grid: GridCoord) -> Self {
        Self {
            name: String::new(),
            exterior: true,
            grid,
            water_level: 0.0,
            contexts: Vec::new(),
        }
    }

    pub fn is_exterior(&self) -> bool {
        self.exterior
    }

    /// Human-readable label for logs.
    pub fn description(&self) -> String {
        match (self.exterior, self.name.is_empty()) {
            (false, _) => self.name.clone(),
            (true, true) => self.grid.to_string(),
            (true, false) => format!("{} {}", self.name, self.grid),
        }
    }
}

fn default_scale() -> f32 {
    1.0
}

fn default_count() -> u32 {
    1
}

/// One placement of a template in a cell, as declared in a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSite {
    /// Template identifier.
    pub ref_id: String,
    pub refnum: RefNum,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Stack size for stackable items.
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub owner: Option<String>,
}

impl ReferenceSite {
    pub fn new(ref_id: impl Into<String>, refnum: u32) -> Self {
        Self {
            ref_id: ref_id.into(),
            refnum: RefNum(refnum),
            placement: Placement::default(),
            scale: default_scale(),
            count: default_count(),
            owner: None,
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// Header of a cell section in a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellHeader {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exterior: bool,
    #[serde(default)]
    pub grid: GridCoord,
    #[serde(default)]
    pub water_level: f32,
}

impl CellHeader {
    pub fn interior(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exterior: false,
            grid: GridCoord::default(),
            water_level: 0.0,
        }
    }

    pub fn exterior(grid: GridCoord) -> Self {
        Self {
            name: String::new(),
            exterior: true,
            grid,
            water_level: 0.0,
        }
    }
}

/// Every cell seen while indexing plugins.
///
/// A cell declared by several plugins keeps one descriptor whose contexts are
/// appended in the order the plugins were indexed. Header fields follow the
/// last plugin.
#[derive(Debug, Clone, Default)]
pub struct CellIndex {
    interiors: BTreeMap<String, CellDescriptor>,
    exteriors: BTreeMap<GridCoord, CellDescriptor>,
}

impl CellIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a plugin contributes a reference section to the cell in `header`.
    pub fn add_section(&mut self, header: &CellHeader, context: CellContext) {
        let cell = if header.exterior {
            self.exteriors
                .entry(header.grid)
                .or_insert_with(|| CellDescriptor::exterior(header.grid))
        } else {
            self.interiors
                .entry(lowercase_id(&header.name))
                .or_insert_with(|| CellDescriptor::interior(header.name.clone()))
        };
        cell.name = header.name.clone();
        cell.water_level = header.water_level;
        cell.contexts.push(context);
    }

    /// Interior cell by name, case-insensitive.
    pub fn interior(&self, name: &str) -> Option<&CellDescriptor> {
        self.interiors.get(&lowercase_id(name))
    }

    pub fn exterior(&self, grid: GridCoord) -> Option<&CellDescriptor> {
        self.exteriors.get(&grid)
    }

    /// Interiors by name, then exteriors by grid coordinate.
    pub fn iter(&self) -> impl Iterator<Item = &CellDescriptor> {
        self.interiors.values().chain(self.exteriors.values())
    }

    pub fn len(&self) -> usize {
        self.interiors.len() + self.exteriors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
