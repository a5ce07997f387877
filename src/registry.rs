//! Static content registry: items, blocks, recipes and tags.
//!
//! Built once at startup from bundled JSON and shared read-only as
//! `Arc<Registry>` by everything that needs to look content up.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use net::proto::Tag;
use serde::Deserialize;

const BUNDLED: &str = include_str!("../assets/registry.json");

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Could not parse registry data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: i32 },
    #[error("Unknown {kind} '{name}' referenced by {by}")]
    UnknownName {
        kind: &'static str,
        name: String,
        by: String,
    },
    #[error("Unsupported tag registry '{0}'")]
    UnknownTagRegistry(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmorSlot {
    Head,
    Chest,
    Legs,
    Feet,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Item {
    pub id: i32,
    pub name: String,
    /// Burns in a furnace fuel slot.
    #[serde(default)]
    pub fuel: bool,
    #[serde(default)]
    pub brewing_ingredient: bool,
    /// Powers a brewing stand.
    #[serde(default)]
    pub brewing_fuel: bool,
    /// Bottles that sit in the three lower brewing slots.
    #[serde(default)]
    pub potion: bool,
    #[serde(default)]
    pub armor: Option<ArmorSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: i32,
    pub name: String,
    pub item: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub kind: RecipeKind,
    pub result: i32,
    pub count: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecipeKind {
    Shaped {
        width: usize,
        /// Row-major grid, `None` for an empty cell.
        grid: Vec<Option<i32>>,
    },
    Shapeless {
        ingredients: Vec<i32>,
    },
    Smelting {
        ingredient: i32,
        experience: f32,
        cook_time: u32,
    },
}

/// Lookup key: numeric id or namespaced name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    Id(i32),
    Name(&'a str),
}

impl From<i32> for Key<'_> {
    fn from(value: i32) -> Self {
        Key::Id(value)
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(value: &'a str) -> Self {
        Key::Name(value)
    }
}

#[derive(Deserialize)]
struct RawRegistry {
    items: Vec<Item>,
    blocks: Vec<RawBlock>,
    recipes: Vec<RawRecipe>,
    #[serde(default)]
    tags: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

#[derive(Deserialize)]
struct RawBlock {
    id: i32,
    name: String,
    #[serde(default)]
    item: Option<String>,
}

#[derive(Deserialize)]
struct RawRecipe {
    id: String,
    #[serde(flatten)]
    kind: RawRecipeKind,
    result: RawResult,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawRecipeKind {
    Shaped {
        pattern: Vec<String>,
        key: HashMap<String, String>,
    },
    Shapeless {
        ingredients: Vec<String>,
    },
    Smelting {
        ingredient: String,
        #[serde(default)]
        experience: f32,
        #[serde(default = "default_cook_time")]
        cook_time: u32,
    },
}

#[derive(Deserialize)]
struct RawResult {
    item: String,
    #[serde(default = "default_count")]
    count: u8,
}

fn default_cook_time() -> u32 {
    200
}

fn default_count() -> u8 {
    1
}

#[derive(Debug, Default)]
pub struct Registry {
    items: Vec<Item>,
    item_index: HashMap<i32, usize>,
    item_names: HashMap<String, usize>,
    blocks: Vec<Block>,
    block_index: HashMap<i32, usize>,
    block_names: HashMap<String, usize>,
    recipes: HashMap<String, Recipe>,
    tags: Vec<(String, Vec<Tag>)>,
}

impl Registry {
    /// The registry shipped with the server binary.
    pub fn bundled() -> Result<Arc<Self>, RegistryError> {
        Self::from_json(BUNDLED).map(Arc::new)
    }

    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let raw: RawRegistry = serde_json::from_str(raw)?;
        let mut registry = Registry::default();

        for item in raw.items {
            if registry.item_index.contains_key(&item.id) {
                return Err(RegistryError::DuplicateId {
                    kind: "item",
                    id: item.id,
                });
            }
            let pos = registry.items.len();
            registry.item_index.insert(item.id, pos);
            registry.item_names.insert(item.name.clone(), pos);
            registry.items.push(item);
        }

        for block in raw.blocks {
            if registry.block_index.contains_key(&block.id) {
                return Err(RegistryError::DuplicateId {
                    kind: "block",
                    id: block.id,
                });
            }
            let item = match &block.item {
                Some(name) => Some(registry.item_id(name, &block.name)?),
                None => None,
            };
            let pos = registry.blocks.len();
            registry.block_index.insert(block.id, pos);
            registry.block_names.insert(block.name.clone(), pos);
            registry.blocks.push(Block {
                id: block.id,
                name: block.name,
                item,
            });
        }

        for recipe in raw.recipes {
            let recipe = registry.resolve_recipe(recipe)?;
            registry.recipes.insert(recipe.id.clone(), recipe);
        }

        for (kind, tags) in raw.tags {
            let mut resolved = Vec::with_capacity(tags.len());
            for (name, entries) in tags {
                let entries = entries
                    .iter()
                    .map(|entry| match kind.as_str() {
                        "minecraft:item" => registry.item_id(entry, &name),
                        "minecraft:block" => registry.block_id(entry, &name),
                        _ => Err(RegistryError::UnknownTagRegistry(kind.clone())),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                resolved.push(Tag { name, entries });
            }
            registry.tags.push((kind, resolved));
        }

        Ok(registry)
    }

    pub fn lookup_item<'a>(&self, key: impl Into<Key<'a>>) -> Option<&Item> {
        let pos = match key.into() {
            Key::Id(id) => self.item_index.get(&id),
            Key::Name(name) => self.item_names.get(name),
        }?;
        self.items.get(*pos)
    }

    pub fn lookup_block<'a>(&self, key: impl Into<Key<'a>>) -> Option<&Block> {
        let pos = match key.into() {
            Key::Id(id) => self.block_index.get(&id),
            Key::Name(name) => self.block_names.get(name),
        }?;
        self.blocks.get(*pos)
    }

    pub fn lookup_recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    /// Smelting recipe for an input item, if any.
    pub fn smelting_result(&self, ingredient: i32) -> Option<&Recipe> {
        self.recipes.values().find(|recipe| {
            matches!(recipe.kind, RecipeKind::Smelting { ingredient: i, .. } if i == ingredient)
        })
    }

    /// Tags grouped per registry, in the shape the client expects.
    pub fn tags(&self) -> &[(String, Vec<Tag>)] {
        &self.tags
    }

    fn item_id(&self, name: &str, by: &str) -> Result<i32, RegistryError> {
        self.lookup_item(name)
            .map(|item| item.id)
            .ok_or_else(|| RegistryError::UnknownName {
                kind: "item",
                name: name.to_string(),
                by: by.to_string(),
            })
    }

    fn block_id(&self, name: &str, by: &str) -> Result<i32, RegistryError> {
        self.lookup_block(name)
            .map(|block| block.id)
            .ok_or_else(|| RegistryError::UnknownName {
                kind: "block",
                name: name.to_string(),
                by: by.to_string(),
            })
    }

    fn resolve_recipe(&self, raw: RawRecipe) -> Result<Recipe, RegistryError> {
        let kind = match raw.kind {
            RawRecipeKind::Shaped { pattern, key } => {
                let width = pattern.iter().map(|row| row.chars().count()).max().unwrap_or(0);
                let mut grid = Vec::with_capacity(width * pattern.len());
                for row in &pattern {
                    let mut cells = row.chars();
                    for _ in 0..width {
                        let cell = match cells.next() {
                            Some(' ') | None => None,
                            Some(symbol) => {
                                let name = key.get(&symbol.to_string()).ok_or_else(|| {
                                    RegistryError::UnknownName {
                                        kind: "pattern key",
                                        name: symbol.to_string(),
                                        by: raw.id.clone(),
                                    }
                                })?;
                                Some(self.item_id(name, &raw.id)?)
                            }
                        };
                        grid.push(cell);
                    }
                }
                RecipeKind::Shaped { width, grid }
            }
            RawRecipeKind::Shapeless { ingredients } => RecipeKind::Shapeless {
                ingredients: ingredients
                    .iter()
                    .map(|name| self.item_id(name, &raw.id))
                    .collect::<Result<_, _>>()?,
            },
            RawRecipeKind::Smelting {
                ingredient,
                experience,
                cook_time,
            } => RecipeKind::Smelting {
                ingredient: self.item_id(&ingredient, &raw.id)?,
                experience,
                cook_time,
            },
        };

        Ok(Recipe {
            result: self.item_id(&raw.result.item, &raw.id)?,
            count: raw.result.count,
            id: raw.id,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_registry_loads() {
        let registry = Registry::bundled().unwrap();
        let coal = registry.lookup_item("minecraft:coal").unwrap();
        assert!(coal.fuel);
        assert_eq!(registry.lookup_item(coal.id), Some(coal));
        assert_eq!(
            registry.lookup_item("minecraft:iron_helmet").unwrap().armor,
            Some(ArmorSlot::Head)
        );

        let chest = registry.lookup_block("minecraft:chest").unwrap();
        assert_eq!(chest.item, Some(6));
        assert!(registry.lookup_block("minecraft:lava").unwrap().item.is_none());
    }

    #[test]
    fn recipes_resolve_to_ids() {
        let registry = Registry::bundled().unwrap();
        let stick = registry.lookup_recipe("minecraft:stick").unwrap();
        assert_eq!(stick.count, 4);
        assert_eq!(
            stick.kind,
            RecipeKind::Shaped {
                width: 1,
                grid: vec![Some(5), Some(5)],
            }
        );

        let furnace = registry.lookup_recipe("minecraft:furnace").unwrap();
        let RecipeKind::Shaped { width, grid } = &furnace.kind else {
            panic!("furnace should be shaped");
        };
        assert_eq!(*width, 3);
        assert_eq!(grid[4], None);

        assert_eq!(registry.smelting_result(13).map(|r| r.result), Some(14));
        assert!(registry.smelting_result(2).is_none());
    }

    #[test]
    fn tags_are_grouped_per_registry() {
        let registry = Registry::bundled().unwrap();
        let items = registry
            .tags()
            .iter()
            .find(|(kind, _)| kind == "minecraft:item")
            .unwrap();
        let coals = items.1.iter().find(|t| t.name == "minecraft:coals").unwrap();
        assert_eq!(coals.entries, vec![11, 12]);
    }

    #[test]
    fn unknown_references_are_rejected() {
        let raw = r#"{
            "items": [{ "id": 1, "name": "a" }],
            "blocks": [{ "id": 1, "name": "b", "item": "missing" }],
            "recipes": []
        }"#;
        assert!(matches!(
            Registry::from_json(raw),
            Err(RegistryError::UnknownName { kind: "item", .. })
        ));

        let dup = r#"{
            "items": [{ "id": 1, "name": "a" }, { "id": 1, "name": "b" }],
            "blocks": [],
            "recipes": []
        }"#;
        assert!(matches!(
            Registry::from_json(dup),
            Err(RegistryError::DuplicateId { kind: "item", id: 1 })
        ));
    }
}
