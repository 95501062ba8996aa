use std::collections::BTreeMap;

use worldcell_common::lowercase_id;

use crate::templates::*;
use crate::RecordKind;

/// Anything that can resolve an identifier to a canonical template of type `T`.
pub trait TemplateSource<T> {
    fn find(&self, id: &str) -> Option<&T>;
}

/// All templates of one kind, keyed by lowercased identifier.
#[derive(Debug, Clone)]
pub struct RecordList<T> {
    records: BTreeMap<String, T>,
}

impl<T> Default for RecordList<T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<T: Record> RecordList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a template, replacing any earlier one with the same identifier.
    pub fn insert(&mut self, record: T) -> Option<T> {
        self.records.insert(lowercase_id(record.id()), record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Templates in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.values()
    }
}

impl<T: Record> TemplateSource<T> for RecordList<T> {
    fn find(&self, id: &str) -> Option<&T> {
        self.records.get(&lowercase_id(id))
    }
}

/// The global content store.
///
/// Owns every canonical template and an index from identifier to record kind.
/// Cell stores borrow templates from here, so it must outlive them.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    kinds: BTreeMap<String, RecordKind>,
    pub activators: RecordList<Activator>,
    pub potions: RecordList<Potion>,
    pub apparatus: RecordList<Apparatus>,
    pub armors: RecordList<Armor>,
    pub books: RecordList<Book>,
    pub clothes: RecordList<Clothing>,
    pub containers: RecordList<Container>,
    pub creatures: RecordList<Creature>,
    pub doors: RecordList<Door>,
    pub ingredients: RecordList<Ingredient>,
    pub creature_lists: RecordList<CreatureLevList>,
    pub item_lists: RecordList<ItemLevList>,
    pub lights: RecordList<Light>,
    pub lockpicks: RecordList<Lockpick>,
    pub misc_items: RecordList<Misc>,
    pub npcs: RecordList<Npc>,
    pub probes: RecordList<Probe>,
    pub repairs: RecordList<Repair>,
    pub statics: RecordList<Static>,
    pub weapons: RecordList<Weapon>,
    pub sounds: RecordList<Sound>,
    pub spells: RecordList<Spell>,
    pub scripts: RecordList<Script>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template to its kind's list and index it. Later records win.
    pub fn insert(&mut self, record: impl Into<TemplateRecord>) {
        let record = record.into();
        self.kinds.insert(lowercase_id(record.id()), record.kind());
        match record {
            TemplateRecord::Activator(r) => {
                self.activators.insert(r);
            }
            TemplateRecord::Potion(r) => {
                self.potions.insert(r);
            }
            TemplateRecord::Apparatus(r) => {
                self.apparatus.insert(r);
            }
            TemplateRecord::Armor(r) => {
                self.armors.insert(r);
            }
            TemplateRecord::Book(r) => {
                self.books.insert(r);
            }
            TemplateRecord::Clothing(r) => {
                self.clothes.insert(r);
            }
            TemplateRecord::Container(r) => {
                self.containers.insert(r);
            }
            TemplateRecord::Creature(r) => {
                self.creatures.insert(r);
            }
            TemplateRecord::Door(r) => {
                self.doors.insert(r);
            }
            TemplateRecord::Ingredient(r) => {
                self.ingredients.insert(r);
            }
            TemplateRecord::CreatureLevList(r) => {
                self.creature_lists.insert(r);
            }
            TemplateRecord::ItemLevList(r) => {
                self.item_lists.insert(r);
            }
            TemplateRecord::Light(r) => {
                self.lights.insert(r);
            }
            TemplateRecord::Lockpick(r) => {
                self.lockpicks.insert(r);
            }
            TemplateRecord::Misc(r) => {
                self.misc_items.insert(r);
            }
            TemplateRecord::Npc(r) => {
                self.npcs.insert(r);
            }
            TemplateRecord::Probe(r) => {
                self.probes.insert(r);
            }
            TemplateRecord::Repair(r) => {
                self.repairs.insert(r);
            }
            TemplateRecord::Static(r) => {
                self.statics.insert(r);
            }
            TemplateRecord::Weapon(r) => {
                self.weapons.insert(r);
            }
            TemplateRecord::Sound(r) => {
                self.sounds.insert(r);
            }
            TemplateRecord::Spell(r) => {
                self.spells.insert(r);
            }
            TemplateRecord::Script(r) => {
                self.scripts.insert(r);
            }
        }
    }

    /// Index an identifier under `kind` without storing a template for it.
    pub fn register_kind(&mut self, id: &str, kind: RecordKind) {
        self.kinds.insert(lowercase_id(id), kind);
    }

    /// Kind of the record named `id`, or `None` if nothing by that name exists.
    pub fn resolve_kind(&self, id: &str) -> Option<RecordKind> {
        self.kinds.get(&lowercase_id(id)).copied()
    }

    /// Number of indexed identifiers.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
