use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use worldcell_common::{GridCoord, Placement};
use worldcell_records::{
    CellDescriptor, CellHeader, CellIndex, ContentStore, Door, Light, Misc, PluginReader,
    PluginWriter, RecordSource, ReferenceSite, Spell, Static, TemplateRecord,
};
use worldcell_store::{CellStore, Category};

#[derive(Parser)]
#[command(name = "worldcell-cli", about = "CLI tool for world cell loading")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON plugin source into a CBOR plugin
    Compile {
        /// JSON source file
        source: PathBuf,
        /// Output plugin file
        out: PathBuf,
    },
    /// List the cells of a set of plugins, or load one of them
    Inspect {
        /// Plugin files in load order
        #[arg(required = true)]
        plugins: Vec<PathBuf>,
        /// Interior cell to load, by name
        #[arg(long, conflicts_with = "grid")]
        cell: Option<String>,
        /// Exterior cell to load, as X,Y
        #[arg(long, value_parser = parse_grid, allow_hyphen_values = true)]
        grid: Option<GridCoord>,
        /// Stop after building the identifier cache
        #[arg(long)]
        preload_only: bool,
    },
    /// Build a small plugin in memory and load its cell
    Demo,
}

/// JSON authoring format for a plugin.
#[derive(Debug, Deserialize)]
struct PluginSource {
    #[serde(default)]
    templates: Vec<TemplateRecord>,
    #[serde(default)]
    cells: Vec<CellSource>,
}

#[derive(Debug, Deserialize)]
struct CellSource {
    #[serde(flatten)]
    header: CellHeader,
    #[serde(default)]
    references: Vec<ReferenceSite>,
}

fn parse_grid(s: &str) -> Result<GridCoord, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{s}'"))?;
    let x = x.trim().parse().map_err(|e| format!("bad X in '{s}': {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad Y in '{s}': {e}"))?;
    Ok(GridCoord::new(x, y))
}

fn compile(source: &PluginSource) -> anyhow::Result<Vec<u8>> {
    let mut w = PluginWriter::new();
    for template in &source.templates {
        w.template(template.clone())?;
    }
    for cell in &source.cells {
        w.begin_cell(cell.header.clone())?;
        for site in &cell.references {
            w.reference(site.clone())?;
        }
    }
    Ok(w.finish()?)
}

/// Compile `source` and write it to `out`. Returns the number of bytes written.
fn write_plugin(source: &PluginSource, out: &Path) -> anyhow::Result<usize> {
    let bytes = compile(source)?;
    std::fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;
    tracing::info!(path = %out.display(), bytes = bytes.len(), "plugin written");
    Ok(bytes.len())
}

/// Index every plugin in order, returning the merged content store and cells.
fn index_plugins<R: Read + Seek>(
    readers: &mut [PluginReader<R>],
) -> anyhow::Result<(ContentStore, CellIndex)> {
    let mut content = ContentStore::new();
    let mut cells = CellIndex::new();
    for reader in readers.iter_mut() {
        let plugin = reader.plugin();
        reader
            .index_into(&mut content, &mut cells)
            .with_context(|| format!("indexing plugin {plugin}"))?;
    }
    Ok((content, cells))
}

fn open_plugins(paths: &[PathBuf]) -> anyhow::Result<Vec<PluginReader<BufReader<File>>>> {
    paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Ok(PluginReader::new(index, BufReader::new(file))?)
        })
        .collect()
}

fn print_cell<S: RecordSource>(
    cell: &CellDescriptor,
    content: &ContentStore,
    readers: &mut [S],
    preload_only: bool,
) {
    let mut store = CellStore::new(cell);
    if preload_only {
        store.preload(content, readers);
    } else {
        store.load(content, readers);
    }

    println!(
        "Cell '{}': state={:?}, exterior={}, water={}",
        cell.description(),
        store.state(),
        store.is_exterior(),
        store.water_level()
    );
    println!("Identifiers ({}): {}", store.ids().len(), store.ids().join(", "));
    if preload_only {
        return;
    }

    for category in Category::ALL {
        let count = store.category_len(category);
        if count > 0 {
            println!("  {category}: {count}");
        }
    }
    let stats = store.stats();
    println!(
        "Scanned {}, loaded {}, dropped {}",
        stats.scanned,
        stats.loaded,
        stats.dropped()
    );
    for issue in store.issues() {
        println!("  dropped: {issue}");
    }
}

fn inspect(
    plugins: &[PathBuf],
    cell: Option<&str>,
    grid: Option<GridCoord>,
    preload_only: bool,
) -> anyhow::Result<()> {
    let mut readers = open_plugins(plugins)?;
    let (content, cells) = index_plugins(&mut readers)?;

    let descriptor = match (cell, grid) {
        (Some(name), _) => cells
            .interior(name)
            .with_context(|| format!("no interior cell named '{name}'"))?,
        (None, Some(grid)) => cells
            .exterior(grid)
            .with_context(|| format!("no exterior cell at {grid}"))?,
        (None, None) => {
            println!(
                "{} templates, {} cells in {} plugin(s)",
                content.len(),
                cells.len(),
                plugins.len()
            );
            for cell in cells.iter() {
                println!("  {} ({} section(s))", cell.description(), cell.contexts.len());
            }
            return Ok(());
        }
    };

    print_cell(descriptor, &content, &mut readers, preload_only);
    Ok(())
}

fn demo_plugin() -> anyhow::Result<Vec<u8>> {
    let mut w = PluginWriter::new();
    w.template(Door {
        id: "in_door_01".into(),
        name: "Door".into(),
        ..Default::default()
    })?;
    w.template(Light {
        id: "torch_01".into(),
        name: "Torch".into(),
        radius: 256,
        ..Default::default()
    })?;
    w.template(Misc {
        id: "gold_001".into(),
        name: "Gold".into(),
        value: 1,
        ..Default::default()
    })?;
    w.template(Static {
        id: "in_wall_01".into(),
        ..Default::default()
    })?;
    w.template(Spell {
        id: "fireball".into(),
        ..Default::default()
    })?;

    w.begin_cell(CellHeader::interior("Demo Vault"))?;
    w.reference(ReferenceSite::new("in_door_01", 1))?;
    for i in 0..4u32 {
        w.reference(
            ReferenceSite::new("Torch_01", 10 + i)
                .with_placement(Placement::at(glam::Vec3::new(i as f32 * 128.0, 0.0, 64.0))),
        )?;
    }
    w.reference(ReferenceSite::new("gold_001", 20).with_count(35))?;
    w.reference(ReferenceSite::new("in_wall_01", 30))?;
    w.reference(ReferenceSite::new("xyz_missing", 40))?;
    w.reference(ReferenceSite::new("fireball", 41))?;
    Ok(w.finish()?)
}

fn load_source(path: &Path) -> anyhow::Result<PluginSource> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Compile { source, out } => {
            let plugin = load_source(&source)?;
            let bytes = write_plugin(&plugin, &out)?;
            println!(
                "Compiled {} templates, {} cells into {} ({} bytes)",
                plugin.templates.len(),
                plugin.cells.len(),
                out.display(),
                bytes
            );
        }
        Commands::Inspect {
            plugins,
            cell,
            grid,
            preload_only,
        } => {
            inspect(&plugins, cell.as_deref(), grid, preload_only)?;
        }
        Commands::Demo => {
            let mut readers = vec![PluginReader::new(0, Cursor::new(demo_plugin()?))?];
            let (content, cells) = index_plugins(&mut readers)?;
            let Some(cell) = cells.interior("Demo Vault") else {
                bail!("demo plugin has no cell");
            };

            print_cell(cell, &content, &mut readers, true);
            print_cell(cell, &content, &mut readers, false);
        }
    }

    Ok(())
}
