use std::ops::RangeInclusive;

use net::{proto::ScreenKind, ItemStack};

use crate::registry::{ArmorSlot, Registry};

pub const PLAYER_INVENTORY_SIZE: usize = 46;
/// Main storage of the player inventory, excluding the hotbar.
pub const PLAYER_MAIN: RangeInclusive<usize> = 9..=35;
pub const PLAYER_HOTBAR: RangeInclusive<usize> = 36..=44;
/// Main storage plus hotbar.
pub const PLAYER_STORAGE: RangeInclusive<usize> = 9..=44;
pub const PLAYER_OFFHAND: usize = 45;

/// Shape of a container: slot count and what each slot may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    PlayerInventory,
    Chest { rows: u8 },
    Furnace,
    BrewingStand,
    CraftingTable,
}

/// What a single slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Any,
    /// Written only by the crafting or smelting collaborator.
    Result,
    Armor(ArmorSlot),
    Fuel,
    PotionBottle,
    BrewingIngredient,
    BrewingFuel,
}

impl ContainerKind {
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            ContainerKind::PlayerInventory => PLAYER_INVENTORY_SIZE,
            ContainerKind::Chest { rows } => rows as usize * 9,
            ContainerKind::Furnace => 3,
            ContainerKind::BrewingStand => 5,
            ContainerKind::CraftingTable => 10,
        }
    }

    #[must_use]
    pub const fn role(self, index: usize) -> SlotRole {
        match (self, index) {
            (ContainerKind::PlayerInventory, 0) => SlotRole::Result,
            (ContainerKind::PlayerInventory, 5) => SlotRole::Armor(ArmorSlot::Head),
            (ContainerKind::PlayerInventory, 6) => SlotRole::Armor(ArmorSlot::Chest),
            (ContainerKind::PlayerInventory, 7) => SlotRole::Armor(ArmorSlot::Legs),
            (ContainerKind::PlayerInventory, 8) => SlotRole::Armor(ArmorSlot::Feet),
            (ContainerKind::Furnace, 1) => SlotRole::Fuel,
            (ContainerKind::Furnace, 2) => SlotRole::Result,
            (ContainerKind::BrewingStand, 0..=2) => SlotRole::PotionBottle,
            (ContainerKind::BrewingStand, 3) => SlotRole::BrewingIngredient,
            (ContainerKind::BrewingStand, 4) => SlotRole::BrewingFuel,
            (ContainerKind::CraftingTable, 0) => SlotRole::Result,
            _ => SlotRole::Any,
        }
    }

    #[must_use]
    pub const fn is_result(self, index: usize) -> bool {
        matches!(self.role(index), SlotRole::Result)
    }

    /// Whether `stack` may be placed in `index`. Result slots accept nothing
    /// from players.
    #[must_use]
    pub fn accepts(self, registry: &Registry, index: usize, stack: &ItemStack) -> bool {
        let role = self.role(index);
        if let SlotRole::Any = role {
            return true;
        }
        let Some(item) = registry.lookup_item(stack.item) else {
            return false;
        };
        match role {
            SlotRole::Any => true,
            SlotRole::Result => false,
            SlotRole::Armor(slot) => item.armor == Some(slot),
            SlotRole::Fuel => item.fuel,
            SlotRole::PotionBottle => item.potion,
            SlotRole::BrewingIngredient => item.brewing_ingredient,
            SlotRole::BrewingFuel => item.brewing_fuel,
        }
    }

    /// Slots that `add` fills when no explicit range is given.
    #[must_use]
    pub const fn storage(self) -> RangeInclusive<usize> {
        match self {
            ContainerKind::PlayerInventory => PLAYER_STORAGE,
            ContainerKind::Chest { rows } => 0..=(rows as usize * 9).saturating_sub(1),
            ContainerKind::Furnace => 0..=1,
            ContainerKind::BrewingStand => 0..=4,
            ContainerKind::CraftingTable => 1..=9,
        }
    }

    #[must_use]
    pub const fn screen(self) -> Option<ScreenKind> {
        let screen = match self {
            ContainerKind::PlayerInventory => return None,
            ContainerKind::Chest { rows: 1 } => ScreenKind::Generic9x1,
            ContainerKind::Chest { rows: 2 } => ScreenKind::Generic9x2,
            ContainerKind::Chest { rows: 3 } => ScreenKind::Generic9x3,
            ContainerKind::Chest { rows: 4 } => ScreenKind::Generic9x4,
            ContainerKind::Chest { rows: 5 } => ScreenKind::Generic9x5,
            ContainerKind::Chest { rows: 6 } => ScreenKind::Generic9x6,
            ContainerKind::Chest { .. } => return None,
            ContainerKind::Furnace => ScreenKind::Furnace,
            ContainerKind::BrewingStand => ScreenKind::BrewingStand,
            ContainerKind::CraftingTable => ScreenKind::Crafting,
        };
        Some(screen)
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            ContainerKind::PlayerInventory => "Inventory",
            ContainerKind::Chest { rows: 6 } => "Large Chest",
            ContainerKind::Chest { .. } => "Chest",
            ContainerKind::Furnace => "Furnace",
            ContainerKind::BrewingStand => "Brewing Stand",
            ContainerKind::CraftingTable => "Crafting",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_layouts() {
        assert_eq!(ContainerKind::PlayerInventory.size(), 46);
        assert_eq!(ContainerKind::Chest { rows: 3 }.size(), 27);
        assert_eq!(ContainerKind::Furnace.size(), 3);
        assert_eq!(ContainerKind::BrewingStand.size(), 5);
        assert_eq!(ContainerKind::CraftingTable.size(), 10);
    }

    #[test]
    fn slot_constraints() {
        let registry = Registry::bundled().unwrap();
        let coal = ItemStack::new(11, 1);
        let dirt = ItemStack::new(2, 1);
        let potion = ItemStack::new(23, 1);
        let wart = ItemStack::new(18, 1);
        let powder = ItemStack::new(17, 1);
        let helmet = ItemStack::new(25, 1);

        let furnace = ContainerKind::Furnace;
        assert!(furnace.accepts(&registry, 0, &dirt));
        assert!(furnace.accepts(&registry, 1, &coal));
        assert!(!furnace.accepts(&registry, 1, &dirt));
        assert!(!furnace.accepts(&registry, 2, &coal));

        let brewing = ContainerKind::BrewingStand;
        assert!(brewing.accepts(&registry, 0, &potion));
        assert!(!brewing.accepts(&registry, 0, &dirt));
        assert!(brewing.accepts(&registry, 3, &wart));
        assert!(!brewing.accepts(&registry, 3, &potion));
        assert!(brewing.accepts(&registry, 4, &powder));
        assert!(!brewing.accepts(&registry, 4, &wart));

        let inventory = ContainerKind::PlayerInventory;
        assert!(inventory.accepts(&registry, 5, &helmet));
        assert!(!inventory.accepts(&registry, 6, &helmet));
        assert!(!inventory.accepts(&registry, 5, &dirt));
        assert!(inventory.accepts(&registry, 20, &dirt));
        assert!(!inventory.accepts(&registry, 0, &dirt));
    }
}
