use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use bytes::Bytes;
use net::{proto::RemoveEntitiesS2c, ItemStack, ProtoError, Uuid};

use crate::broadcast::{Audience, Broadcaster};

pub type EntityId = i32;

/// Dropped items nobody picked up disappear after five minutes.
pub const ITEM_LIFETIME: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnedEntity {
    pub id: EntityId,
    pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemEntity {
    pub uuid: Uuid,
    pub position: Vec3,
    pub item: ItemStack,
    pub spawned_at: Instant,
}

#[async_trait]
pub trait World: Send + Sync {
    async fn spawn_item_entity(&self, position: Vec3, item: ItemStack) -> SpawnedEntity;

    /// Fire-and-forget; `packet` is a serialized packet body.
    fn broadcast(&self, packet: Bytes, audience: Audience);
}

/// Entity bookkeeping backed by the session broadcaster.
pub struct EntityWorld {
    next_entity: AtomicI32,
    items: Mutex<HashMap<EntityId, ItemEntity>>,
    broadcaster: Arc<Broadcaster>,
}

impl EntityWorld {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            next_entity: AtomicI32::new(1),
            items: Mutex::new(HashMap::new()),
            broadcaster,
        }
    }

    /// Entity ids are shared between players and item entities.
    pub fn allocate_entity_id(&self) -> EntityId {
        self.next_entity.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub fn item_entity(&self, id: EntityId) -> Option<ItemEntity> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    #[must_use]
    pub fn item_entity_count(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Removes one item entity (picked up or destroyed) and tells every
    /// client to forget it.
    pub fn remove_item_entity(&self, id: EntityId) -> Result<Option<ItemEntity>, ProtoError> {
        let removed = self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            self.announce_removal(vec![id])?;
        }
        Ok(removed)
    }

    /// Drops every item entity older than `lifetime`; returns how many went.
    pub fn despawn_expired(&self, lifetime: Duration) -> Result<usize, ProtoError> {
        let mut expired = Vec::new();
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, entity| {
                let keep = entity.spawned_at.elapsed() < lifetime;
                if !keep {
                    expired.push(*id);
                }
                keep
            });
        if expired.is_empty() {
            return Ok(0);
        }
        let count = expired.len();
        self.announce_removal(expired)?;
        Ok(count)
    }

    fn announce_removal(&self, entity_ids: Vec<EntityId>) -> Result<(), ProtoError> {
        self.broadcaster
            .broadcast_packet(&RemoveEntitiesS2c { entity_ids }, &Audience::All)?;
        Ok(())
    }
}

#[async_trait]
impl World for EntityWorld {
    async fn spawn_item_entity(&self, position: Vec3, item: ItemStack) -> SpawnedEntity {
        let id = self.allocate_entity_id();
        let uuid = Uuid::random_v4(rand::random(), rand::random());
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                ItemEntity {
                    uuid,
                    position,
                    item,
                    spawned_at: Instant::now(),
                },
            );
        SpawnedEntity { id, uuid }
    }

    fn broadcast(&self, packet: Bytes, audience: Audience) {
        self.broadcaster.broadcast(packet, &audience);
    }
}
