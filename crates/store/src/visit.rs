use worldcell_records::{Record, RecordKind, ReferenceSite};

use crate::{LiveRef, RefData};

/// The twenty categories a cell stores references in, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Activators,
    Potions,
    Apparatus,
    Armors,
    Books,
    Clothes,
    Containers,
    Creatures,
    Doors,
    Ingredients,
    CreatureLists,
    ItemLists,
    Lights,
    Lockpicks,
    MiscItems,
    Npcs,
    Probes,
    Repairs,
    Statics,
    Weapons,
}

impl Category {
    pub const ALL: [Category; 20] = [
        Self::Activators,
        Self::Potions,
        Self::Apparatus,
        Self::Armors,
        Self::Books,
        Self::Clothes,
        Self::Containers,
        Self::Creatures,
        Self::Doors,
        Self::Ingredients,
        Self::CreatureLists,
        Self::ItemLists,
        Self::Lights,
        Self::Lockpicks,
        Self::MiscItems,
        Self::Npcs,
        Self::Probes,
        Self::Repairs,
        Self::Statics,
        Self::Weapons,
    ];

    /// Category that references of `kind` are filed into.
    ///
    /// `None` for kinds that exist in the content store but cannot be placed.
    pub fn for_kind(kind: RecordKind) -> Option<Self> {
        match kind {
            RecordKind::Activator => Some(Self::Activators),
            RecordKind::Potion => Some(Self::Potions),
            RecordKind::Apparatus => Some(Self::Apparatus),
            RecordKind::Armor => Some(Self::Armors),
            RecordKind::Book => Some(Self::Books),
            RecordKind::Clothing => Some(Self::Clothes),
            RecordKind::Container => Some(Self::Containers),
            RecordKind::Creature => Some(Self::Creatures),
            RecordKind::Door => Some(Self::Doors),
            RecordKind::Ingredient => Some(Self::Ingredients),
            RecordKind::CreatureLevList => Some(Self::CreatureLists),
            RecordKind::ItemLevList => Some(Self::ItemLists),
            RecordKind::Light => Some(Self::Lights),
            RecordKind::Lockpick => Some(Self::Lockpicks),
            RecordKind::Misc => Some(Self::MiscItems),
            RecordKind::Npc => Some(Self::Npcs),
            RecordKind::Probe => Some(Self::Probes),
            RecordKind::Repair => Some(Self::Repairs),
            RecordKind::Static => Some(Self::Statics),
            RecordKind::Weapon => Some(Self::Weapons),
            RecordKind::Sound | RecordKind::Spell | RecordKind::Script => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Activators => "activators",
            Self::Potions => "potions",
            Self::Apparatus => "apparatus",
            Self::Armors => "armors",
            Self::Books => "books",
            Self::Clothes => "clothes",
            Self::Containers => "containers",
            Self::Creatures => "creatures",
            Self::Doors => "doors",
            Self::Ingredients => "ingredients",
            Self::CreatureLists => "creature lists",
            Self::ItemLists => "item lists",
            Self::Lights => "lights",
            Self::Lockpicks => "lockpicks",
            Self::MiscItems => "misc items",
            Self::Npcs => "npcs",
            Self::Probes => "probes",
            Self::Repairs => "repairs",
            Self::Statics => "statics",
            Self::Weapons => "weapons",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Visits live references of every category with their concrete template type.
///
/// Return `false` to stop the traversal.
pub trait LiveRefVisitor {
    fn visit<T: Record>(&mut self, category: Category, live: &mut LiveRef<'_, T>) -> bool;
}

/// Adapts a `(site, data)` closure to [`LiveRefVisitor`], erasing the template type.
pub(crate) struct SiteVisitor<F>(pub F);

impl<F> LiveRefVisitor for SiteVisitor<F>
where
    F: FnMut(&ReferenceSite, &mut RefData) -> bool,
{
    fn visit<T: Record>(&mut self, _category: Category, live: &mut LiveRef<'_, T>) -> bool {
        let (site, data) = live.parts_mut();
        (self.0)(site, data)
    }
}
