use serde::{Deserialize, Serialize};

/// Kind of a template record as reported by the content store.
///
/// The first twenty kinds can be placed in a cell. The rest are known to the
/// content store but have no in-cell representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Activator,
    Potion,
    Apparatus,
    Armor,
    Book,
    Clothing,
    Container,
    Creature,
    Door,
    Ingredient,
    CreatureLevList,
    ItemLevList,
    Light,
    Lockpick,
    Misc,
    Npc,
    Probe,
    Repair,
    Static,
    Weapon,
    Sound,
    Spell,
    Script,
}

impl RecordKind {
    /// Four-letter record tag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Activator => "ACTI",
            Self::Potion => "ALCH",
            Self::Apparatus => "APPA",
            Self::Armor => "ARMO",
            Self::Book => "BOOK",
            Self::Clothing => "CLOT",
            Self::Container => "CONT",
            Self::Creature => "CREA",
            Self::Door => "DOOR",
            Self::Ingredient => "INGR",
            Self::CreatureLevList => "LEVC",
            Self::ItemLevList => "LEVI",
            Self::Light => "LIGH",
            Self::Lockpick => "LOCK",
            Self::Misc => "MISC",
            Self::Npc => "NPC_",
            Self::Probe => "PROB",
            Self::Repair => "REPA",
            Self::Static => "STAT",
            Self::Weapon => "WEAP",
            Self::Sound => "SOUN",
            Self::Spell => "SPEL",
            Self::Script => "SCPT",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
