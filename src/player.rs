use std::sync::Arc;

use net::{
    proto::{ContainerSetContentS2c, ContainerSetSlotS2c, OpenScreenS2c},
    Uuid,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ContainerError,
    inventory::{Container, ContainerKind, Slot, PLAYER_STORAGE},
    registry::Registry,
    world::{EntityId, Vec3},
};

pub const EYE_HEIGHT: f64 = 1.62;

/// Sentinel slot index for clicks outside the window.
pub const OUTSIDE: i16 = -999;

const MAX_WINDOW_ID: u8 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
    Adventure,
    Spectator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub uuid: Uuid,
    pub username: String,
    pub entity_id: EntityId,
}

#[derive(Debug, Clone)]
pub struct OpenWindow {
    pub id: u8,
    pub container: Arc<Container>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Left,
    Right,
    Middle,
}

impl DragKind {
    /// Drag buttons come in groups of four: start, paint, end.
    pub const fn from_button(button: i8) -> Option<Self> {
        match button / 4 {
            0 => Some(DragKind::Left),
            1 => Some(DragKind::Right),
            2 => Some(DragKind::Middle),
            _ => None,
        }
    }
}

/// What a `(window, slot)` pair from a click points at.
#[derive(Debug, Clone)]
pub enum Target {
    Outside,
    Slot {
        container: Arc<Container>,
        index: usize,
    },
}

/// Per-session player state. The cursor is owned here and never shared.
#[derive(Debug)]
pub struct Player {
    pub profile: Profile,
    pub gamemode: GameMode,
    pub position: Vec3,
    pub on_ground: bool,
    pub cursor: Slot,
    pub inventory: Arc<Container>,
    pub(crate) drag: Option<DragKind>,
    window: Option<OpenWindow>,
    next_window: u8,
}

impl Player {
    pub fn new(profile: Profile, gamemode: GameMode, registry: Arc<Registry>) -> Self {
        Self {
            profile,
            gamemode,
            position: Vec3::default(),
            on_ground: true,
            cursor: None,
            inventory: Container::new(ContainerKind::PlayerInventory, registry),
            drag: None,
            window: None,
            next_window: 1,
        }
    }

    #[must_use]
    pub fn eye_position(&self) -> Vec3 {
        Vec3::new(self.position.x, self.position.y + EYE_HEIGHT, self.position.z)
    }

    #[must_use]
    pub fn open_window(&self) -> Option<&OpenWindow> {
        self.window.as_ref()
    }

    /// Opens `container` under the next window id. Returns `None` for kinds
    /// that have no screen of their own.
    pub fn open(&mut self, container: Arc<Container>) -> Option<OpenScreenS2c> {
        let kind = container.kind().screen()?;
        let id = self.next_window;
        self.next_window = if id >= MAX_WINDOW_ID { 1 } else { id + 1 };
        let title = serde_json::json!({ "text": container.kind().title() }).to_string();
        self.window = Some(OpenWindow { id, container });
        self.drag = None;
        Some(OpenScreenS2c {
            window_id: i32::from(id),
            kind,
            title,
        })
    }

    /// Closes `window_id` if it is the open one; the player inventory
    /// cannot be closed.
    pub fn close(&mut self, window_id: u8) -> Option<OpenWindow> {
        self.drag = None;
        match &self.window {
            Some(open) if open.id == window_id => self.window.take(),
            _ => None,
        }
    }

    /// The container whose state id versions `window_id`.
    pub fn window_container(&self, window_id: u8) -> Result<Arc<Container>, ContainerError> {
        match (window_id, &self.window) {
            (0, _) => Ok(self.inventory.clone()),
            (id, Some(open)) if open.id == id => Ok(open.container.clone()),
            (id, _) => Err(ContainerError::UnknownWindow(id)),
        }
    }

    /// Resolves a window-relative slot. In an opened window, indices past
    /// the container map onto the player's main inventory and hotbar.
    pub fn resolve(&self, window_id: u8, slot: i16) -> Result<Target, ContainerError> {
        if slot == OUTSIDE {
            self.window_container(window_id)?;
            return Ok(Target::Outside);
        }
        let primary = self.window_container(window_id)?;
        let index = usize::try_from(slot).map_err(|_| ContainerError::IndexOutOfBounds {
            index: usize::MAX,
            size: primary.size(),
        })?;

        if window_id == 0 || index < primary.size() {
            if index >= primary.size() {
                return Err(ContainerError::IndexOutOfBounds {
                    index,
                    size: primary.size(),
                });
            }
            return Ok(Target::Slot {
                container: primary,
                index,
            });
        }

        let offset = index - primary.size();
        let storage = PLAYER_STORAGE.count();
        if offset >= storage {
            return Err(ContainerError::IndexOutOfBounds {
                index,
                size: primary.size() + storage,
            });
        }
        Ok(Target::Slot {
            container: self.inventory.clone(),
            index: PLAYER_STORAGE.start() + offset,
        })
    }

    /// Full window contents for `window_id`, used on join and to resync.
    pub fn window_content(&self, window_id: u8) -> Result<ContainerSetContentS2c, ContainerError> {
        let primary = self.window_container(window_id)?;
        let (state_id, mut slots) = primary.snapshot();
        if window_id != 0 {
            let (_, inventory) = self.inventory.snapshot();
            slots.extend(inventory[PLAYER_STORAGE].iter().cloned());
        }
        Ok(ContainerSetContentS2c {
            window_id,
            state_id,
            slots,
        })
    }

    #[must_use]
    pub fn cursor_packet(&self, state_id: i32) -> ContainerSetSlotS2c {
        ContainerSetSlotS2c {
            window_id: -1,
            state_id,
            slot: -1,
            item: self.cursor.clone(),
        }
    }
}
