//! Authoritative container state and the click protocol that mutates it.

pub mod click;
mod container;
mod kind;

pub use click::{handle_click, ClickOutcome, ITEM_ENTITY_TYPE};
pub use container::{merge, Container, ContainerId, Side, Slot, Tx, TxPair};
pub use kind::{
    ContainerKind, SlotRole, PLAYER_HOTBAR, PLAYER_INVENTORY_SIZE, PLAYER_MAIN, PLAYER_OFFHAND,
    PLAYER_STORAGE,
};
