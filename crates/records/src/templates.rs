//! Canonical template records.
//!
//! One record per distinct kind of thing in the game data. Templates are owned by
//! the [`ContentStore`](crate::ContentStore) and borrowed by every live reference
//! placed from them.

use serde::{Deserialize, Serialize};

use crate::RecordKind;

/// A template record type with a fixed kind.
pub trait Record: std::fmt::Debug {
    const KIND: RecordKind;

    /// Identifier as authored. Lookups fold case.
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Activator {
    pub id: String,
    pub name: String,
    pub model: String,
    pub script: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Potion {
    pub id: String,
    pub name: String,
    pub model: String,
    pub weight: f32,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Apparatus {
    pub id: String,
    pub name: String,
    pub model: String,
    pub quality: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Armor {
    pub id: String,
    pub name: String,
    pub model: String,
    pub rating: u32,
    pub health: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    pub id: String,
    pub name: String,
    pub model: String,
    pub text: String,
    pub is_scroll: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Clothing {
    pub id: String,
    pub name: String,
    pub model: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub model: String,
    pub capacity: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Creature {
    pub id: String,
    pub name: String,
    pub model: String,
    pub level: u16,
    pub health: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Door {
    pub id: String,
    pub name: String,
    pub model: String,
    pub open_sound: Option<String>,
    pub close_sound: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub model: String,
    pub value: u32,
}

/// One entry of a levelled list: the template it spawns and the minimum player level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelledEntry {
    pub id: String,
    pub level: u16,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureLevList {
    pub id: String,
    pub chance_none: u8,
    pub entries: Vec<LevelledEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemLevList {
    pub id: String,
    pub chance_none: u8,
    pub entries: Vec<LevelledEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    pub id: String,
    pub name: String,
    pub model: String,
    pub radius: u32,
    pub color: [u8; 3],
}

/// Lockpicks are the only kind of "tool" that can be placed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Lockpick {
    pub id: String,
    pub name: String,
    pub model: String,
    pub quality: f32,
    pub uses: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Misc {
    pub id: String,
    pub name: String,
    pub model: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub race: String,
    pub class: String,
    pub level: u16,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    pub id: String,
    pub name: String,
    pub model: String,
    pub quality: f32,
    pub uses: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Repair {
    pub id: String,
    pub name: String,
    pub model: String,
    pub quality: f32,
    pub uses: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Static {
    pub id: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Weapon {
    pub id: String,
    pub name: String,
    pub model: String,
    pub damage: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sound {
    pub id: String,
    pub file: String,
    pub volume: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Spell {
    pub id: String,
    pub name: String,
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub id: String,
    pub text: String,
}

macro_rules! impl_record {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Record for $ty {
                const KIND: RecordKind = RecordKind::$ty;

                fn id(&self) -> &str {
                    &self.id
                }
            }

            impl From<$ty> for TemplateRecord {
                fn from(record: $ty) -> Self {
                    Self::$ty(record)
                }
            }
        )*

        impl TemplateRecord {
            pub fn id(&self) -> &str {
                match self {
                    $(Self::$ty(r) => &r.id,)*
                }
            }

            pub fn kind(&self) -> RecordKind {
                match self {
                    $(Self::$ty(_) => RecordKind::$ty,)*
                }
            }
        }
    };
}

/// Any template record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateRecord {
    Activator(Activator),
    Potion(Potion),
    Apparatus(Apparatus),
    Armor(Armor),
    Book(Book),
    Clothing(Clothing),
    Container(Container),
    Creature(Creature),
    Door(Door),
    Ingredient(Ingredient),
    CreatureLevList(CreatureLevList),
    ItemLevList(ItemLevList),
    Light(Light),
    Lockpick(Lockpick),
    Misc(Misc),
    Npc(Npc),
    Probe(Probe),
    Repair(Repair),
    Static(Static),
    Weapon(Weapon),
    Sound(Sound),
    Spell(Spell),
    Script(Script),
}

impl_record!(
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
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_reports_kind_and_id() {
        let t: TemplateRecord = Light {
            id: "torch_01".into(),
            radius: 128,
            ..Default::default()
        }
        .into();
        assert_eq!(t.kind(), RecordKind::Light);
        assert_eq!(t.id(), "torch_01");
        assert_eq!(<Light as Record>::KIND, RecordKind::Light);
    }

    #[test]
    fn template_json_is_internally_tagged() {
        let json = r#"{"type":"door","id":"ex_door","name":"Door"}"#;
        let t: TemplateRecord = serde_json::from_str(json).unwrap();
        assert_eq!(t.kind(), RecordKind::Door);
        assert_eq!(t.id(), "ex_door");
    }
}
