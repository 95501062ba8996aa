use worldcell_common::lowercase_id;
use worldcell_records::{
    Activator, Apparatus, Armor, Book, CellContext, CellDescriptor, Clothing, ContentStore,
    Container, Creature, CreatureLevList, Door, Ingredient, ItemLevList, Light, Lockpick, Misc,
    Npc, Potion, Probe, RecordSource, ReferenceSite, Repair, SourceError, Static, Weapon,
};

use crate::visit::SiteVisitor;
use crate::{Category, CategoryRefs, LiveRefVisitor, RefData, RefError};

/// Load lifecycle of a cell. Ordered: a later state is "further loaded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    /// Nothing read yet.
    Unloaded,
    /// Identifier cache built, no references resolved.
    Preloaded,
    /// Every reference resolved and filed.
    Loaded,
}

/// Counters from the most recent preload or load pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// References read from all sections.
    pub scanned: usize,
    /// References filed into a category list.
    pub loaded: usize,
    pub unresolved: usize,
    pub unhandled: usize,
    pub resolution_failures: usize,
    pub source_errors: usize,
}

impl LoadStats {
    pub fn dropped(&self) -> usize {
        self.unresolved + self.unhandled + self.resolution_failures
    }
}

/// Runs `$body` with `$refs` bound to the category list selected by `$category`.
macro_rules! with_category {
    ($store:expr, $category:expr, |$refs:ident| $body:expr) => {
        match $category {
            Category::Activators => {
                let $refs = &$store.activators;
                $body
            }
            Category::Potions => {
                let $refs = &$store.potions;
                $body
            }
            Category::Apparatus => {
                let $refs = &$store.apparatus;
                $body
            }
            Category::Armors => {
                let $refs = &$store.armors;
                $body
            }
            Category::Books => {
                let $refs = &$store.books;
                $body
            }
            Category::Clothes => {
                let $refs = &$store.clothes;
                $body
            }
            Category::Containers => {
                let $refs = &$store.containers;
                $body
            }
            Category::Creatures => {
                let $refs = &$store.creatures;
                $body
            }
            Category::Doors => {
                let $refs = &$store.doors;
                $body
            }
            Category::Ingredients => {
                let $refs = &$store.ingredients;
                $body
            }
            Category::CreatureLists => {
                let $refs = &$store.creature_lists;
                $body
            }
            Category::ItemLists => {
                let $refs = &$store.item_lists;
                $body
            }
            Category::Lights => {
                let $refs = &$store.lights;
                $body
            }
            Category::Lockpicks => {
                let $refs = &$store.lockpicks;
                $body
            }
            Category::MiscItems => {
                let $refs = &$store.misc_items;
                $body
            }
            Category::Npcs => {
                let $refs = &$store.npcs;
                $body
            }
            Category::Probes => {
                let $refs = &$store.probes;
                $body
            }
            Category::Repairs => {
                let $refs = &$store.repairs;
                $body
            }
            Category::Statics => {
                let $refs = &$store.statics;
                $body
            }
            Category::Weapons => {
                let $refs = &$store.weapons;
                $body
            }
        }
    };
}

/// The in-memory contents of one cell, materialized lazily from its plugins.
///
/// Borrows its descriptor and, once loaded, templates from the content store;
/// both must outlive it. Owns every live reference it creates.
#[derive(Debug)]
pub struct CellStore<'a> {
    cell: &'a CellDescriptor,
    state: State,
    /// Lowercased identifiers of every declared reference, sorted.
    ids: Vec<String>,
    water_level: f32,
    issues: Vec<RefError>,
    stats: LoadStats,

    pub activators: CategoryRefs<'a, Activator>,
    pub potions: CategoryRefs<'a, Potion>,
    pub apparatus: CategoryRefs<'a, Apparatus>,
    pub armors: CategoryRefs<'a, Armor>,
    pub books: CategoryRefs<'a, Book>,
    pub clothes: CategoryRefs<'a, Clothing>,
    pub containers: CategoryRefs<'a, Container>,
    pub creatures: CategoryRefs<'a, Creature>,
    pub doors: CategoryRefs<'a, Door>,
    pub ingredients: CategoryRefs<'a, Ingredient>,
    pub creature_lists: CategoryRefs<'a, CreatureLevList>,
    pub item_lists: CategoryRefs<'a, ItemLevList>,
    pub lights: CategoryRefs<'a, Light>,
    pub lockpicks: CategoryRefs<'a, Lockpick>,
    pub misc_items: CategoryRefs<'a, Misc>,
    pub npcs: CategoryRefs<'a, Npc>,
    pub probes: CategoryRefs<'a, Probe>,
    pub repairs: CategoryRefs<'a, Repair>,
    pub statics: CategoryRefs<'a, Static>,
    pub weapons: CategoryRefs<'a, Weapon>,
}

impl<'a> CellStore<'a> {
    /// An unloaded, empty store for `cell`.
    pub fn new(cell: &'a CellDescriptor) -> Self {
        Self {
            cell,
            state: State::Unloaded,
            ids: Vec::new(),
            water_level: cell.water_level,
            issues: Vec::new(),
            stats: LoadStats::default(),
            activators: CategoryRefs::default(),
            potions: CategoryRefs::default(),
            apparatus: CategoryRefs::default(),
            armors: CategoryRefs::default(),
            books: CategoryRefs::default(),
            clothes: CategoryRefs::default(),
            containers: CategoryRefs::default(),
            creatures: CategoryRefs::default(),
            doors: CategoryRefs::default(),
            ingredients: CategoryRefs::default(),
            creature_lists: CategoryRefs::default(),
            item_lists: CategoryRefs::default(),
            lights: CategoryRefs::default(),
            lockpicks: CategoryRefs::default(),
            misc_items: CategoryRefs::default(),
            npcs: CategoryRefs::default(),
            probes: CategoryRefs::default(),
            repairs: CategoryRefs::default(),
            statics: CategoryRefs::default(),
            weapons: CategoryRefs::default(),
        }
    }

    pub fn cell(&self) -> &'a CellDescriptor {
        self.cell
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_exterior(&self) -> bool {
        self.cell.is_exterior()
    }

    pub fn water_level(&self) -> f32 {
        self.water_level
    }

    pub fn set_water_level(&mut self, level: f32) {
        self.water_level = level;
    }

    /// Build the identifier cache without resolving anything.
    ///
    /// Only does work on an unloaded cell.
    pub fn preload<S: RecordSource>(&mut self, _store: &'a ContentStore, sources: &mut [S]) {
        if self.state != State::Unloaded {
            return;
        }
        let _span = tracing::info_span!("preload_cell", cell = %self.cell.description()).entered();
        self.stats = LoadStats::default();

        let sites = self.read_sections(sources);
        self.ids
            .extend(sites.iter().map(|site| lowercase_id(&site.ref_id)));
        self.ids.sort();

        self.state = State::Preloaded;
        tracing::trace!(ids = self.ids.len(), "cell preloaded");
    }

    /// Resolve every reference of the cell and file it into its category.
    ///
    /// A no-op once loaded. References that cannot be resolved are dropped and
    /// reported through [`issues`](Self::issues); the cell always ends up loaded.
    /// Issues from an earlier preload are replaced by this pass's.
    pub fn load<S: RecordSource>(&mut self, store: &'a ContentStore, sources: &mut [S]) {
        if self.state == State::Loaded {
            return;
        }
        let _span = tracing::info_span!("load_cell", cell = %self.cell.description()).entered();
        tracing::info!("loading cell {}", self.cell.description());
        self.stats = LoadStats::default();
        if self.state == State::Preloaded {
            // The preload pass only read; everything it found is rescanned below.
            self.ids.clear();
            self.issues.clear();
        }

        for mut site in self.read_sections(sources) {
            site.ref_id = lowercase_id(&site.ref_id);
            self.ids.push(site.ref_id.clone());
            match self.file_reference(store, site) {
                Ok(()) => self.stats.loaded += 1,
                Err(err) => self.report(err),
            }
        }
        self.ids.sort();

        self.state = State::Loaded;
        tracing::trace!(
            scanned = self.stats.scanned,
            loaded = self.stats.loaded,
            dropped = self.stats.dropped(),
            "cell loaded"
        );
    }

    /// Whether any declared reference of this cell has identifier `name`.
    ///
    /// Case-insensitive. Answers from the identifier cache, so works after a preload.
    pub fn contains_identifier(&self, name: &str) -> bool {
        self.ids.binary_search(&lowercase_id(name)).is_ok()
    }

    /// The sorted identifier cache.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Visit every live reference as `(site, runtime data)`, in category order.
    ///
    /// Returns `true` if the traversal completed, `false` if the visitor stopped it.
    pub fn for_each<F>(&mut self, visitor: F) -> bool
    where
        F: FnMut(&ReferenceSite, &mut RefData) -> bool,
    {
        self.for_each_live(&mut SiteVisitor(visitor))
    }

    /// Like [`for_each`](Self::for_each), but hands the visitor the typed reference.
    pub fn for_each_live<V: LiveRefVisitor>(&mut self, visitor: &mut V) -> bool {
        self.activators.visit(Category::Activators, visitor)
            && self.potions.visit(Category::Potions, visitor)
            && self.apparatus.visit(Category::Apparatus, visitor)
            && self.armors.visit(Category::Armors, visitor)
            && self.books.visit(Category::Books, visitor)
            && self.clothes.visit(Category::Clothes, visitor)
            && self.containers.visit(Category::Containers, visitor)
            && self.creatures.visit(Category::Creatures, visitor)
            && self.doors.visit(Category::Doors, visitor)
            && self.ingredients.visit(Category::Ingredients, visitor)
            && self.creature_lists.visit(Category::CreatureLists, visitor)
            && self.item_lists.visit(Category::ItemLists, visitor)
            && self.lights.visit(Category::Lights, visitor)
            && self.lockpicks.visit(Category::Lockpicks, visitor)
            && self.misc_items.visit(Category::MiscItems, visitor)
            && self.npcs.visit(Category::Npcs, visitor)
            && self.probes.visit(Category::Probes, visitor)
            && self.repairs.visit(Category::Repairs, visitor)
            && self.statics.visit(Category::Statics, visitor)
            && self.weapons.visit(Category::Weapons, visitor)
    }

    /// Category holding the first live reference named `name` (case-insensitive).
    pub fn search(&self, name: &str) -> Option<Category> {
        let name = lowercase_id(name);
        Category::ALL
            .into_iter()
            .find(|&category| with_category!(self, category, |refs| refs.find_by_name(&name).is_some()))
    }

    /// Number of references stored under `category`.
    pub fn category_len(&self, category: Category) -> usize {
        with_category!(self, category, |refs| refs.len())
    }

    /// Total references across all categories.
    pub fn len(&self) -> usize {
        Category::ALL
            .into_iter()
            .map(|category| self.category_len(category))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// References dropped so far, oldest first.
    pub fn issues(&self) -> &[RefError] {
        &self.issues
    }

    /// Drain and return the dropped-reference log.
    pub fn drain_issues(&mut self) -> Vec<RefError> {
        std::mem::take(&mut self.issues)
    }

    /// Counters from the last preload or load pass.
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Read every reference site of the cell, context by context in descriptor order.
    fn read_sections<S: RecordSource>(&mut self, sources: &mut [S]) -> Vec<ReferenceSite> {
        let cell = self.cell;
        let mut sites = Vec::new();
        if cell.contexts.is_empty() {
            // Generated cell without static content.
            return sites;
        }

        for context in &cell.contexts {
            let Some(source) = sources.get_mut(context.plugin) else {
                self.report(RefError::Source {
                    plugin: context.plugin,
                    source: SourceError::MissingPlugin(context.plugin),
                });
                continue;
            };
            tracing::debug!(
                plugin = context.plugin,
                offset = context.offset,
                "reading cell references"
            );
            if let Err(err) = read_section(source, context, &mut sites) {
                self.report(RefError::Source {
                    plugin: context.plugin,
                    source: err,
                });
            }
        }

        self.stats.scanned = sites.len();
        sites
    }

    /// File a resolved site into its category's identity list.
    fn file_reference(&mut self, store: &'a ContentStore, site: ReferenceSite) -> Result<(), RefError> {
        let Some(kind) = store.resolve_kind(&site.ref_id) else {
            return Err(RefError::UnresolvedIdentifier { id: site.ref_id });
        };
        let Some(category) = Category::for_kind(kind) else {
            return Err(RefError::UnhandledKind {
                id: site.ref_id,
                kind,
            });
        };

        match category {
            Category::Activators => {
                self.activators.resolve_and_insert(site, &store.activators)?;
            }
            Category::Potions => {
                self.potions.resolve_and_insert(site, &store.potions)?;
            }
            Category::Apparatus => {
                self.apparatus.resolve_and_insert(site, &store.apparatus)?;
            }
            Category::Armors => {
                self.armors.resolve_and_insert(site, &store.armors)?;
            }
            Category::Books => {
                self.books.resolve_and_insert(site, &store.books)?;
            }
            Category::Clothes => {
                self.clothes.resolve_and_insert(site, &store.clothes)?;
            }
            Category::Containers => {
                self.containers.resolve_and_insert(site, &store.containers)?;
            }
            Category::Creatures => {
                self.creatures.resolve_and_insert(site, &store.creatures)?;
            }
            Category::Doors => {
                self.doors.resolve_and_insert(site, &store.doors)?;
            }
            Category::Ingredients => {
                self.ingredients.resolve_and_insert(site, &store.ingredients)?;
            }
            Category::CreatureLists => {
                self.creature_lists
                    .resolve_and_insert(site, &store.creature_lists)?;
            }
            Category::ItemLists => {
                self.item_lists.resolve_and_insert(site, &store.item_lists)?;
            }
            Category::Lights => {
                self.lights.resolve_and_insert(site, &store.lights)?;
            }
            Category::Lockpicks => {
                self.lockpicks.resolve_and_insert(site, &store.lockpicks)?;
            }
            Category::MiscItems => {
                self.misc_items.resolve_and_insert(site, &store.misc_items)?;
            }
            Category::Npcs => {
                self.npcs.resolve_and_insert(site, &store.npcs)?;
            }
            Category::Probes => {
                self.probes.resolve_and_insert(site, &store.probes)?;
            }
            Category::Repairs => {
                self.repairs.resolve_and_insert(site, &store.repairs)?;
            }
            Category::Statics => {
                self.statics.resolve_and_insert(site, &store.statics)?;
            }
            Category::Weapons => {
                self.weapons.resolve_and_insert(site, &store.weapons)?;
            }
        }
        Ok(())
    }

    fn report(&mut self, err: RefError) {
        match &err {
            RefError::UnresolvedIdentifier { .. } => {
                tracing::info!("{err}");
                self.stats.unresolved += 1;
            }
            RefError::UnhandledKind { .. } => {
                tracing::warn!("{err}");
                self.stats.unhandled += 1;
            }
            RefError::Resolution(_) => {
                tracing::error!("{err}");
                self.stats.resolution_failures += 1;
            }
            RefError::Source { .. } => {
                tracing::error!("{err}");
                self.stats.source_errors += 1;
            }
        }
        self.issues.push(err);
    }
}

/// Seek `source` to `context` and append the section's references to `sites`.
///
/// References read before a failure stay in `sites`.
fn read_section<S: RecordSource>(
    source: &mut S,
    context: &CellContext,
    sites: &mut Vec<ReferenceSite>,
) -> Result<(), SourceError> {
    source.seek_to_context(context)?;
    while let Some(site) = source.next_reference()? {
        sites.push(site);
    }
    Ok(())
}

/// Cells are the same cell when name and grid position match; contents are not compared.
impl PartialEq for CellStore<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cell.name == other.cell.name
            && self.cell.grid.x == other.cell.grid.x
            && self.cell.grid.y == other.cell.grid.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use worldcell_common::{GridCoord, RefNum};
    use worldcell_records::{
        CellHeader, CellIndex, PluginReader, PluginWriter, Record, RecordKind, Spell,
    };

    use crate::ResolutionError;

    type Reader = PluginReader<Cursor<Vec<u8>>>;

    struct Fixture {
        content: ContentStore,
        cells: CellIndex,
        readers: Vec<Reader>,
    }

    fn fixture(plugins: Vec<Vec<u8>>) -> Fixture {
        let mut content = ContentStore::new();
        let mut cells = CellIndex::new();
        let mut readers = Vec::new();
        for (index, bytes) in plugins.into_iter().enumerate() {
            let mut reader = PluginReader::new(index, Cursor::new(bytes)).unwrap();
            reader.index_into(&mut content, &mut cells).unwrap();
            readers.push(reader);
        }
        Fixture {
            content,
            cells,
            readers,
        }
    }

    fn templates(w: &mut PluginWriter) {
        w.template(Light {
            id: "torch_01".into(),
            radius: 200,
            ..Default::default()
        })
        .unwrap();
        w.template(Door {
            id: "ex_door".into(),
            ..Default::default()
        })
        .unwrap();
        w.template(Misc {
            id: "Gold_001".into(),
            value: 1,
            ..Default::default()
        })
        .unwrap();
        w.template(Activator {
            id: "lever".into(),
            ..Default::default()
        })
        .unwrap();
        w.template(Weapon {
            id: "iron_sword".into(),
            ..Default::default()
        })
        .unwrap();
        w.template(Spell {
            id: "fireball".into(),
            ..Default::default()
        })
        .unwrap();
    }

    /// One interior "Vault" with a mix of good and bad references.
    fn vault_plugin() -> Vec<u8> {
        let mut w = PluginWriter::new();
        templates(&mut w);
        w.begin_cell(CellHeader::interior("Vault")).unwrap();
        w.reference(ReferenceSite::new("Torch_01", 1)).unwrap();
        w.reference(ReferenceSite::new("xyz_missing", 2)).unwrap();
        w.reference(ReferenceSite::new("iron_sword", 3)).unwrap();
        w.reference(ReferenceSite::new("ex_door", 4)).unwrap();
        w.reference(ReferenceSite::new("lever", 5)).unwrap();
        w.reference(ReferenceSite::new("fireball", 6)).unwrap();
        w.reference(ReferenceSite::new("gold_001", 7).with_count(50)).unwrap();
        w.finish().unwrap()
    }

    fn visit_order(store: &mut CellStore<'_>) -> Vec<(String, RefNum)> {
        let mut seen = Vec::new();
        store.for_each(|site, _| {
            seen.push((site.ref_id.clone(), site.refnum));
            true
        });
        seen
    }

    #[test]
    fn new_store_is_unloaded_and_empty() {
        let cell = CellDescriptor::interior("Vault");
        let store = CellStore::new(&cell);
        assert_eq!(store.state(), State::Unloaded);
        assert!(store.ids().is_empty());
        assert!(store.is_empty());
        assert!(!store.is_exterior());
    }

    #[test]
    fn unknown_identifier_is_dropped_but_cached() {
        let mut w = PluginWriter::new();
        templates(&mut w);
        w.begin_cell(CellHeader::interior("Cave")).unwrap();
        w.reference(ReferenceSite::new("xyz_missing", 1)).unwrap();
        w.reference(ReferenceSite::new("torch_01", 2)).unwrap();
        let mut f = fixture(vec![w.finish().unwrap()]);
        let cell = f.cells.interior("cave").unwrap();

        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        assert_eq!(store.state(), State::Loaded);
        assert!(store.contains_identifier("xyz_missing"));
        assert_eq!(store.lights.len(), 1);
        let mut visited = 0;
        assert!(store.for_each(|_, _| {
            visited += 1;
            true
        }));
        assert_eq!(visited, 1);
        assert!(matches!(
            store.issues(),
            [RefError::UnresolvedIdentifier { id }] if id == "xyz_missing"
        ));
    }

    #[test]
    fn empty_context_list_loads_to_nothing() {
        let cell = CellDescriptor::exterior(GridCoord::new(9, 9));
        let content = ContentStore::new();
        let mut readers: Vec<Reader> = Vec::new();

        let mut store = CellStore::new(&cell);
        store.load(&content, &mut readers);

        assert_eq!(store.state(), State::Loaded);
        assert!(store.ids().is_empty());
        for category in Category::ALL {
            assert_eq!(store.category_len(category), 0);
        }
        let mut visited = 0;
        assert!(store.for_each(|_, _| {
            visited += 1;
            true
        }));
        assert_eq!(visited, 0);
        assert!(store.issues().is_empty());
    }

    #[test]
    fn load_files_each_kind_and_reports_drops() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        assert_eq!(store.lights.len(), 1);
        assert_eq!(store.weapons.len(), 1);
        assert_eq!(store.doors.len(), 1);
        assert_eq!(store.activators.len(), 1);
        assert_eq!(store.misc_items.len(), 1);
        assert_eq!(store.len(), 5);

        let stats = store.stats();
        assert_eq!(stats.scanned, 7);
        assert_eq!(stats.loaded, 5);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.unhandled, 1);
        assert_eq!(stats.dropped(), 2);

        let issues = store.drain_issues();
        assert_eq!(issues.len(), 2);
        assert!(matches!(
            &issues[1],
            RefError::UnhandledKind { id, kind: RecordKind::Spell } if id == "fireball"
        ));
        assert!(store.issues().is_empty());
    }

    #[test]
    fn loaded_identifiers_are_lowercased() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        let torch = store.lights.placed.get(RefNum(1)).unwrap();
        assert_eq!(torch.site().ref_id, "torch_01");
        assert_eq!(torch.base().radius, 200);
        assert!(std::ptr::eq(
            torch.base(),
            f.content.lights.iter().next().unwrap()
        ));
        assert_eq!(
            store.misc_items.placed.get(RefNum(7)).unwrap().data().count(),
            50
        );
    }

    #[test]
    fn identifier_cache_is_sorted_and_complete() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);
        store.preload(&f.content, &mut f.readers);

        assert_eq!(store.state(), State::Preloaded);
        assert!(store.is_empty());
        assert_eq!(
            store.ids(),
            [
                "ex_door",
                "fireball",
                "gold_001",
                "iron_sword",
                "lever",
                "torch_01",
                "xyz_missing"
            ]
        );
        assert!(store.contains_identifier("TORCH_01"));
        assert!(!store.contains_identifier("torch_02"));
    }

    #[test]
    fn preload_then_load_matches_direct_load() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();

        let mut direct = CellStore::new(cell);
        direct.load(&f.content, &mut f.readers);

        let mut staged = CellStore::new(cell);
        staged.preload(&f.content, &mut f.readers);
        staged.load(&f.content, &mut f.readers);

        assert_eq!(staged.state(), State::Loaded);
        assert_eq!(staged.ids(), direct.ids());
        assert_eq!(staged.ids().len(), 7);
        for category in Category::ALL {
            assert_eq!(staged.category_len(category), direct.category_len(category));
        }
        assert_eq!(visit_order(&mut staged), visit_order(&mut direct));
    }

    #[test]
    fn repeated_calls_are_noops() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);

        store.preload(&f.content, &mut f.readers);
        store.preload(&f.content, &mut f.readers);
        assert_eq!(store.ids().len(), 7);

        store.load(&f.content, &mut f.readers);
        let stats = store.stats().clone();
        let issues = store.issues().len();
        store.load(&f.content, &mut f.readers);
        store.preload(&f.content, &mut f.readers);

        assert_eq!(store.state(), State::Loaded);
        assert_eq!(store.ids().len(), 7);
        assert_eq!(store.len(), 5);
        assert_eq!(store.stats(), &stats);
        assert_eq!(store.issues().len(), issues);
    }

    #[test]
    fn for_each_visits_in_category_order() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        let ids: Vec<String> = visit_order(&mut store).into_iter().map(|(id, _)| id).collect();
        // activators, doors, lights, misc items, weapons
        assert_eq!(ids, ["lever", "ex_door", "torch_01", "gold_001", "iron_sword"]);
    }

    #[test]
    fn for_each_stops_at_first_false() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        let mut visited = 0;
        let completed = store.for_each(|_, _| {
            visited += 1;
            visited < 3
        });
        assert!(!completed);
        assert_eq!(visited, 3);
    }

    #[test]
    fn for_each_can_mutate_runtime_data() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        store.for_each(|_, data| {
            data.disable();
            true
        });
        assert!(!store.doors.placed.get(RefNum(4)).unwrap().data().is_enabled());
    }

    struct KindCounter {
        kinds: Vec<RecordKind>,
    }

    impl LiveRefVisitor for KindCounter {
        fn visit<T: Record>(&mut self, _category: Category, _live: &mut crate::LiveRef<'_, T>) -> bool {
            self.kinds.push(T::KIND);
            true
        }
    }

    #[test]
    fn typed_traversal_sees_concrete_kinds() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        let mut counter = KindCounter { kinds: Vec::new() };
        assert!(store.for_each_live(&mut counter));
        assert_eq!(
            counter.kinds,
            [
                RecordKind::Activator,
                RecordKind::Door,
                RecordKind::Light,
                RecordKind::Misc,
                RecordKind::Weapon
            ]
        );
    }

    #[test]
    fn kind_without_template_is_resolution_error() {
        let mut w = PluginWriter::new();
        templates(&mut w);
        w.begin_cell(CellHeader::interior("Armory")).unwrap();
        w.reference(ReferenceSite::new("phantom_blade", 1)).unwrap();
        w.reference(ReferenceSite::new("iron_sword", 2)).unwrap();
        let mut f = fixture(vec![w.finish().unwrap()]);
        f.content.register_kind("phantom_blade", RecordKind::Weapon);
        let cell = f.cells.interior("Armory").unwrap();

        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        assert_eq!(store.state(), State::Loaded);
        assert_eq!(store.weapons.len(), 1);
        assert_eq!(store.stats().resolution_failures, 1);
        assert!(matches!(
            store.issues(),
            [RefError::Resolution(ResolutionError { id, kind: RecordKind::Weapon })]
                if id == "phantom_blade"
        ));
    }

    #[test]
    fn later_plugin_overrides_same_refnum() {
        let mut base = PluginWriter::new();
        templates(&mut base);
        base.begin_cell(CellHeader::interior("Vault")).unwrap();
        base.reference(ReferenceSite::new("torch_01", 1)).unwrap();
        base.reference(ReferenceSite::new("gold_001", 2)).unwrap();

        let mut patch = PluginWriter::new();
        patch.begin_cell(CellHeader::interior("Vault")).unwrap();
        patch
            .reference(ReferenceSite::new("torch_01", 1).with_count(3))
            .unwrap();

        let mut f = fixture(vec![base.finish().unwrap(), patch.finish().unwrap()]);
        let cell = f.cells.interior("vault").unwrap();
        assert_eq!(cell.contexts.len(), 2);

        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        assert_eq!(store.lights.len(), 1);
        assert_eq!(store.lights.placed.get(RefNum(1)).unwrap().data().count(), 3);
        assert_eq!(store.ids(), ["gold_001", "torch_01", "torch_01"]);
    }

    #[test]
    fn sibling_cells_share_readers() {
        let mut w = PluginWriter::new();
        templates(&mut w);
        w.begin_cell(CellHeader::exterior(GridCoord::new(0, 0))).unwrap();
        w.reference(ReferenceSite::new("ex_door", 1)).unwrap();
        w.begin_cell(CellHeader::exterior(GridCoord::new(0, 1))).unwrap();
        w.reference(ReferenceSite::new("torch_01", 1)).unwrap();
        w.reference(ReferenceSite::new("torch_01", 2)).unwrap();
        let mut f = fixture(vec![w.finish().unwrap()]);

        let a_cell = f.cells.exterior(GridCoord::new(0, 0)).unwrap();
        let b_cell = f.cells.exterior(GridCoord::new(0, 1)).unwrap();
        let mut a = CellStore::new(a_cell);
        let mut b = CellStore::new(b_cell);

        a.preload(&f.content, &mut f.readers);
        b.load(&f.content, &mut f.readers);
        a.load(&f.content, &mut f.readers);

        assert!(a.is_exterior());
        assert_eq!(a.doors.len(), 1);
        assert_eq!(a.lights.len(), 0);
        assert_eq!(b.lights.len(), 2);
        assert!(a != b);
    }

    #[test]
    fn missing_reader_is_reported_and_load_completes() {
        let mut cell = CellDescriptor::interior("Nowhere");
        cell.contexts.push(CellContext {
            plugin: 4,
            offset: 0,
        });
        let content = ContentStore::new();
        let mut readers: Vec<Reader> = Vec::new();

        let mut store = CellStore::new(&cell);
        store.load(&content, &mut readers);

        assert_eq!(store.state(), State::Loaded);
        assert_eq!(store.stats().source_errors, 1);
        assert!(matches!(
            store.issues(),
            [RefError::Source {
                plugin: 4,
                source: SourceError::MissingPlugin(4)
            }]
        ));
    }

    /// Yields `good` references, then fails.
    struct FlakySource {
        good: u32,
        read: u32,
    }

    impl RecordSource for FlakySource {
        fn seek_to_context(&mut self, _context: &CellContext) -> Result<(), SourceError> {
            self.read = 0;
            Ok(())
        }

        fn next_reference(&mut self) -> Result<Option<ReferenceSite>, SourceError> {
            if self.read == self.good {
                return Err(SourceError::Io(std::io::Error::other("disk gone")));
            }
            self.read += 1;
            Ok(Some(ReferenceSite::new("torch_01", self.read)))
        }
    }

    #[test]
    fn read_failure_keeps_earlier_references_and_other_contexts() {
        let mut content = ContentStore::new();
        content.insert(Light {
            id: "torch_01".into(),
            ..Default::default()
        });
        let mut cell = CellDescriptor::interior("Flaky");
        cell.contexts.push(CellContext { plugin: 0, offset: 0 });
        cell.contexts.push(CellContext { plugin: 1, offset: 0 });
        let mut sources: Vec<Box<dyn RecordSource>> = vec![
            Box::new(FlakySource { good: 2, read: 0 }),
            Box::new(FlakySource { good: 1, read: 0 }),
        ];

        let mut store = CellStore::new(&cell);
        store.load(&content, &mut sources);

        assert_eq!(store.state(), State::Loaded);
        // refnums 1 and 2 from the first source, refnum 1 again from the second
        assert_eq!(store.lights.len(), 2);
        assert_eq!(store.ids().len(), 3);
        assert_eq!(store.stats().source_errors, 2);
    }

    #[test]
    fn search_finds_category_case_insensitively() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        assert_eq!(store.search("EX_DOOR"), Some(Category::Doors));
        assert_eq!(store.search("xyz_missing"), None);

        store
            .doors
            .placed
            .find_by_name_mut("ex_door")
            .unwrap()
            .data_mut()
            .set_count(0);
        assert_eq!(store.search("ex_door"), None);
    }

    #[test]
    fn stacked_references_follow_placed_in_traversal() {
        let mut f = fixture(vec![vault_plugin()]);
        let cell = f.cells.interior("Vault").unwrap();
        let mut store = CellStore::new(cell);
        store.load(&f.content, &mut f.readers);

        let gold = f.content.misc_items.iter().next().unwrap();
        store
            .misc_items
            .insert_stacked(crate::LiveRef::new(ReferenceSite::new("gold_001", 7), gold));
        store
            .misc_items
            .insert_stacked(crate::LiveRef::new(ReferenceSite::new("gold_001", 7), gold));

        assert_eq!(store.misc_items.len(), 3);
        let order: Vec<String> = visit_order(&mut store).into_iter().map(|(id, _)| id).collect();
        assert_eq!(
            order,
            ["lever", "ex_door", "torch_01", "gold_001", "gold_001", "gold_001", "iron_sword"]
        );
    }

    #[test]
    fn staged_load_reports_source_errors_once() {
        let mut cell = CellDescriptor::interior("Nowhere");
        cell.contexts.push(CellContext {
            plugin: 4,
            offset: 0,
        });
        let content = ContentStore::new();
        let mut readers: Vec<Reader> = Vec::new();

        let mut direct = CellStore::new(&cell);
        direct.load(&content, &mut readers);

        let mut staged = CellStore::new(&cell);
        staged.preload(&content, &mut readers);
        assert_eq!(staged.issues().len(), 1);
        staged.load(&content, &mut readers);

        assert_eq!(staged.issues().len(), direct.issues().len());
        assert_eq!(staged.issues().len(), 1);
        assert_eq!(staged.stats(), direct.stats());
        assert_eq!(staged.stats().source_errors, 1);
    }

    #[test]
    fn water_level_starts_from_descriptor_and_can_change() {
        let mut cell = CellDescriptor::interior("Flooded Cave");
        cell.water_level = -64.0;
        let mut store = CellStore::new(&cell);
        assert_eq!(store.water_level(), -64.0);

        store.set_water_level(12.5);
        assert_eq!(store.water_level(), 12.5);
        assert_eq!(cell.water_level, -64.0);
    }

    #[test]
    fn equality_is_by_name_and_grid() {
        let mut a = CellDescriptor::interior("Vault");
        let b = CellDescriptor::interior("Vault");
        let c = CellDescriptor::interior("Cave");
        assert!(CellStore::new(&a) == CellStore::new(&b));
        assert!(CellStore::new(&a) != CellStore::new(&c));
        a.contexts.push(CellContext { plugin: 0, offset: 8 });
        a.water_level = 12.0;
        assert!(CellStore::new(&a) == CellStore::new(&b));
        assert_eq!(CellStore::new(&a).water_level(), 12.0);
    }
}
