use std::{f64::consts::TAU, sync::Arc};

use bytes::Bytes;
use net::{
    proto::{ClickMode, ContainerClickC2s, SetEntityMetadataS2c, SpawnEntityS2c},
    serialize, ItemStack, MAX_STACK_SIZE,
};
use rand::Rng;

use super::{
    container::{merge, Container, Side, Slot, Tx},
    kind::{PLAYER_HOTBAR, PLAYER_MAIN, PLAYER_OFFHAND, PLAYER_STORAGE},
};
use crate::{
    broadcast::Audience,
    error::{ClickError, ContainerError},
    events::{ContainerClick, ContainerEvents},
    player::{DragKind, GameMode, Player, Target},
    world::{EntityId, Vec3, World},
};

pub const ITEM_ENTITY_TYPE: i32 = 58;
/// Metadata flags sent with a freshly dropped item.
const DROPPED_ITEM_FLAGS: i8 = 0x40;
/// Dropped items leave slightly below eye level.
const DROP_OFFSET: f64 = 0.3;
/// Wire velocity unit is 1/8000 block per tick.
const VELOCITY_SCALE: f64 = 8000.0;
const OFFHAND_BUTTON: i8 = 40;

/// Side effects of one click that the session has to publish.
#[derive(Debug, Default)]
pub struct ClickOutcome {
    /// Containers whose state id advanced.
    pub changed: Vec<Arc<Container>>,
    pub cursor_changed: bool,
    pub spawned: Option<EntityId>,
    /// Vetoed by the event hook; the client predicted a change that did not
    /// happen and needs a resync.
    pub cancelled: bool,
}

/// Applies one `ContainerClick` against the authoritative containers and
/// the player's cursor.
///
/// Every mutation is a container transaction checked against the state id
/// of the window's own container; a stale id changes nothing.
pub async fn handle_click(
    player: &mut Player,
    click: &ContainerClickC2s,
    world: &dyn World,
    events: &dyn ContainerEvents,
) -> Result<ClickOutcome, ClickError> {
    let primary = player.window_container(click.window_id)?;
    let target = player.resolve(click.window_id, click.slot)?;
    let mut ctx = ClickCtx {
        player,
        primary,
        state_id: click.state_id,
        button: click.button,
        outcome: ClickOutcome::default(),
    };

    match click.mode {
        ClickMode::MouseClick => ctx.mouse_click(target, world, events).await?,
        ClickMode::ShiftMouseClick => ctx.shift_click(target)?,
        ClickMode::NumberKeys => ctx.number_keys(target)?,
        ClickMode::MiddleMouseClick => ctx.middle_click(target)?,
        ClickMode::Drop => ctx.drop_from_slot(target, world).await?,
        ClickMode::MouseDrag => ctx.drag(target)?,
        ClickMode::DoubleClick => ctx.double_click(target)?,
    }

    Ok(ctx.outcome)
}

struct ClickCtx<'p> {
    player: &'p mut Player,
    primary: Arc<Container>,
    state_id: i32,
    button: i8,
    outcome: ClickOutcome,
}

impl ClickCtx<'_> {
    /// The expected state id for a transaction on `container`. Containers
    /// other than the window's own are checked up front instead.
    fn expected(&self, container: &Container) -> Result<Option<i32>, ContainerError> {
        if container.id() == self.primary.id() {
            Ok(Some(self.state_id))
        } else {
            self.primary.check_state(self.state_id)?;
            Ok(None)
        }
    }

    fn record(&mut self, container: &Arc<Container>, before: i32) {
        if container.state_id() != before
            && !self.outcome.changed.iter().any(|c| c.id() == container.id())
        {
            self.outcome.changed.push(container.clone());
        }
    }

    fn set_cursor(&mut self, cursor: Slot) {
        if self.player.cursor != cursor {
            self.player.cursor = cursor;
            self.outcome.cursor_changed = true;
        }
    }

    async fn mouse_click(
        &mut self,
        target: Target,
        world: &dyn World,
        events: &dyn ContainerEvents,
    ) -> Result<(), ClickError> {
        if !matches!(self.button, 0 | 1) {
            return Ok(());
        }

        let Target::Slot { container, index } = target else {
            let Some(held) = self.player.cursor.clone() else {
                return Ok(());
            };
            self.primary.check_state(self.state_id)?;
            let count = if self.button == 1 { 1 } else { held.count };
            self.set_cursor(remaining(&held, count));
            return self.spawn_drop(world, held.with_count(count)).await;
        };

        let expected = self.expected(&container)?;
        if let Some(expected) = expected {
            container.check_state(expected)?;
        }

        if let Some(item) = container.get(index)? {
            let verdict = events
                .container_click(ContainerClick {
                    player: &self.player.profile,
                    container: &container,
                    item: &item,
                    slot: index,
                })
                .await;
            if verdict.cancel {
                self.outcome.cancelled = true;
                return Ok(());
            }
        }

        let before = container.state_id();
        let cursor = self.player.cursor.clone();
        let right = self.button == 1;
        let cursor = container.transaction(expected, |tx| click_slot(tx, index, cursor, right))?;
        self.record(&container, before);
        self.set_cursor(cursor);
        Ok(())
    }

    fn shift_click(&mut self, target: Target) -> Result<(), ContainerError> {
        let Target::Slot { container, index } = target else {
            return Ok(());
        };

        let inventory = self.player.inventory.clone();
        let (dest, range) = if container.id() != inventory.id() {
            (inventory, PLAYER_STORAGE)
        } else if self.primary.id() != inventory.id() {
            let storage = self.primary.kind().storage();
            (self.primary.clone(), storage)
        } else if PLAYER_HOTBAR.contains(&index) {
            (inventory, PLAYER_MAIN)
        } else if PLAYER_MAIN.contains(&index) {
            (inventory, PLAYER_HOTBAR)
        } else {
            (inventory, PLAYER_STORAGE)
        };

        let expected = self.expected(&container)?;
        let before = (container.state_id(), dest.state_id());
        Container::transaction2(&container, &dest, expected, |pair| {
            let Some(stack) = pair.side(Side::First).take(index, None)? else {
                return Ok(());
            };
            // Whatever does not fit stays where it was.
            if let Some(left) = pair.side(Side::Second).add(range, stack)? {
                pair.side(Side::First).set(index, Some(left))?;
            }
            Ok(())
        })?;
        self.record(&container, before.0);
        self.record(&dest, before.1);
        Ok(())
    }

    fn number_keys(&mut self, target: Target) -> Result<(), ContainerError> {
        let Target::Slot { container, index } = target else {
            return Ok(());
        };
        let hotbar = match self.button {
            OFFHAND_BUTTON => PLAYER_OFFHAND,
            button @ 0..=8 => PLAYER_HOTBAR.start() + button as usize,
            _ => return Ok(()),
        };

        let inventory = self.player.inventory.clone();
        if container.id() == inventory.id() && index == hotbar {
            return Ok(());
        }

        let expected = self.expected(&container)?;
        let before = (container.state_id(), inventory.state_id());
        Container::transaction2(&container, &inventory, expected, |pair| {
            let clicked = pair.side(Side::First).get(index)?.cloned();
            let held = pair.side(Side::Second).get(hotbar)?.cloned();
            if clicked.is_none() && held.is_none() {
                return Ok(());
            }
            pair.side(Side::First).set(index, held)?;
            pair.side(Side::Second).set(hotbar, clicked)
        })?;
        self.record(&container, before.0);
        self.record(&inventory, before.1);
        Ok(())
    }

    /// Creative pick: a full stack of the clicked item onto an empty cursor.
    fn middle_click(&mut self, target: Target) -> Result<(), ContainerError> {
        if self.player.gamemode != GameMode::Creative || self.player.cursor.is_some() {
            return Ok(());
        }
        let Target::Slot { container, index } = target else {
            return Ok(());
        };
        self.primary.check_state(self.state_id)?;
        if let Some(item) = container.get(index)? {
            self.set_cursor(Some(item.with_count(MAX_STACK_SIZE)));
        }
        Ok(())
    }

    async fn drop_from_slot(&mut self, target: Target, world: &dyn World) -> Result<(), ClickError> {
        let Target::Slot { container, index } = target else {
            return Ok(());
        };
        let count = if self.button == 0 { 1 } else { MAX_STACK_SIZE };

        let expected = self.expected(&container)?;
        let before = container.state_id();
        let removed = container.transaction(expected, |tx| tx.take(index, Some(count)))?;
        let Some(item) = removed else {
            return Ok(());
        };
        self.record(&container, before);
        self.spawn_drop(world, item).await
    }

    async fn spawn_drop(&mut self, world: &dyn World, item: ItemStack) -> Result<(), ClickError> {
        let eye = self.player.eye_position();
        let position = Vec3::new(eye.x, eye.y - DROP_OFFSET, eye.z);
        let velocity = drop_velocity();

        let entity = world.spawn_item_entity(position, item.clone()).await;
        let spawn = SpawnEntityS2c {
            entity_id: entity.id,
            uuid: entity.uuid,
            entity_type: ITEM_ENTITY_TYPE,
            x: position.x,
            y: position.y,
            z: position.z,
            pitch: 0,
            yaw: 0,
            head_yaw: 0,
            data: 1,
            velocity,
        };
        let metadata = SetEntityMetadataS2c {
            entity_id: entity.id,
            flags: DROPPED_ITEM_FLAGS,
            item: Some(item),
        };
        world.broadcast(Bytes::from(serialize(&spawn)?), Audience::All);
        world.broadcast(Bytes::from(serialize(&metadata)?), Audience::All);
        self.outcome.spawned = Some(entity.id);
        Ok(())
    }

    /// Drags start and end with a click outside the window; everything in
    /// between paints the slots the mouse passes over.
    fn drag(&mut self, target: Target) -> Result<(), ContainerError> {
        let outside = matches!(target, Target::Outside);
        match self.button {
            0 | 4 | 8 if outside => {
                let kind = DragKind::from_button(self.button);
                let allowed =
                    kind != Some(DragKind::Middle) || self.player.gamemode == GameMode::Creative;
                self.player.drag = kind.filter(|_| allowed);
                Ok(())
            }
            2 | 6 | 10 if outside => {
                self.player.drag = None;
                Ok(())
            }
            1 | 5 | 9 => self.drag_paint(target),
            _ => Ok(()),
        }
    }

    fn drag_paint(&mut self, target: Target) -> Result<(), ContainerError> {
        let Target::Slot { container, index } = target else {
            return Ok(());
        };
        if self.player.drag.is_none() || self.player.drag != DragKind::from_button(self.button) {
            return Ok(());
        }
        // Creative paints full copies only; everyone else paints single items.
        if (self.player.gamemode == GameMode::Creative) != (self.button == 9) {
            return Ok(());
        }
        let Some(held) = self.player.cursor.clone() else {
            return Ok(());
        };

        let expected = self.expected(&container)?;
        let before = container.state_id();
        if self.button == 9 {
            container.transaction(expected, |tx| tx.set(index, Some(held)))?;
        } else {
            let cursor = container.transaction(expected, |tx| {
                let placed = match tx.get(index)?.cloned() {
                    None => held.with_count(1),
                    Some(stack)
                        if stack.stacks_with(&held)
                            && stack.count < MAX_STACK_SIZE
                            && !tx.kind().is_result(index) =>
                    {
                        stack.with_count(stack.count + 1)
                    }
                    Some(_) => return Ok(Some(held)),
                };
                tx.set(index, Some(placed))?;
                Ok(remaining(&held, 1))
            })?;
            self.set_cursor(cursor);
        }
        self.record(&container, before);
        Ok(())
    }

    /// Gathers stacks of the clicked item from the rest of the container,
    /// highest index first, until the clicked stack is full.
    fn double_click(&mut self, target: Target) -> Result<(), ContainerError> {
        let Target::Slot { container, index } = target else {
            return Ok(());
        };

        let expected = self.expected(&container)?;
        let before = container.state_id();
        container.transaction(expected, |tx| {
            let Some(mut gathered) = tx.get(index)?.cloned() else {
                return Ok(());
            };
            for i in (0..tx.len()).rev() {
                if gathered.count >= MAX_STACK_SIZE {
                    break;
                }
                if i == index || tx.kind().is_result(i) {
                    continue;
                }
                let Some(other) = tx.get(i)?.cloned() else {
                    continue;
                };
                if !other.stacks_with(&gathered) {
                    continue;
                }
                let (merged, rest) = merge(Some(gathered.clone()), Some(other));
                tx.set(i, rest)?;
                if let Some(merged) = merged {
                    gathered = merged;
                }
            }
            tx.set(index, Some(gathered))
        })?;
        self.record(&container, before);
        Ok(())
    }
}

/// Left or right click on one slot; returns the new cursor.
fn click_slot(tx: &mut Tx<'_>, index: usize, cursor: Slot, right: bool) -> Result<Slot, ContainerError> {
    let slot = tx.get(index)?.cloned();
    match (slot, cursor) {
        (None, None) => Ok(None),
        (Some(stack), None) => {
            let count = if right { stack.count.div_ceil(2) } else { stack.count };
            tx.take(index, Some(count))
        }
        (None, Some(held)) => {
            let placed = if right { 1 } else { held.count };
            tx.set(index, Some(held.with_count(placed)))?;
            Ok(remaining(&held, placed))
        }
        (Some(stack), Some(held)) if tx.kind().is_result(index) => {
            // Crafted output joins the cursor only if all of it fits.
            let total = u16::from(stack.count) + u16::from(held.count);
            if stack.stacks_with(&held) && total <= u16::from(MAX_STACK_SIZE) {
                tx.set(index, None)?;
                Ok(Some(held.with_count(total as u8)))
            } else {
                Ok(Some(held))
            }
        }
        (Some(stack), Some(held)) if stack.stacks_with(&held) => {
            let offered = if right { 1 } else { held.count };
            let (merged, rest) = merge(Some(stack), Some(held.with_count(offered)));
            tx.set(index, merged)?;
            let returned = rest.map_or(0, |rest| rest.count);
            Ok(remaining(&held, offered - returned))
        }
        (Some(stack), Some(held)) => {
            tx.set(index, Some(held))?;
            Ok(Some(stack))
        }
    }
}

fn remaining(held: &ItemStack, used: u8) -> Slot {
    let rest = held.count - used;
    (rest > 0).then(|| held.with_count(rest))
}

/// Horizontal push in a random direction plus a small upward kick.
fn drop_velocity() -> [i16; 3] {
    let mut rng = rand::thread_rng();
    let angle = rng.gen::<f64>() * TAU;
    let speed = rng.gen::<f64>() * 0.5 + 0.25;
    let encode = |v: f64| (v * VELOCITY_SCALE) as i16;
    [
        encode(angle.cos() * speed),
        encode(0.2),
        encode(angle.sin() * speed),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use net::{Packet, PacketFrame, Uuid};

    use super::*;
    use crate::{
        events::{EventResult, NoopEvents},
        inventory::ContainerKind,
        player::{Profile, OUTSIDE},
        registry::Registry,
        world::SpawnedEntity,
    };

    const DIRT: i32 = 2;
    const STICK: i32 = 10;
    const COAL: i32 = 11;
    const POTION: i32 = 23;

    #[derive(Default)]
    struct RecordingWorld {
        spawned: Mutex<Vec<(Vec3, ItemStack)>>,
        broadcasts: Mutex<Vec<(Bytes, Audience)>>,
    }

    #[async_trait]
    impl World for RecordingWorld {
        async fn spawn_item_entity(&self, position: Vec3, item: ItemStack) -> SpawnedEntity {
            let mut spawned = self.spawned.lock().unwrap();
            spawned.push((position, item));
            SpawnedEntity {
                id: 100 + spawned.len() as i32,
                uuid: Uuid::from_u64s(7, spawned.len() as u64),
            }
        }

        fn broadcast(&self, packet: Bytes, audience: Audience) {
            self.broadcasts.lock().unwrap().push((packet, audience));
        }
    }

    impl RecordingWorld {
        fn broadcast_ids(&self) -> Vec<i32> {
            self.broadcasts
                .lock()
                .unwrap()
                .iter()
                .map(|(body, _)| frame(body).id)
                .collect()
        }
    }

    struct Veto;

    #[async_trait]
    impl ContainerEvents for Veto {
        async fn container_click(&self, _event: ContainerClick<'_>) -> EventResult {
            EventResult::CANCEL
        }
    }

    fn frame(body: &[u8]) -> PacketFrame {
        let mut input = body;
        let id = net::proto::read_varint(&mut input).unwrap();
        PacketFrame {
            id,
            body: input.to_vec(),
        }
    }

    fn registry() -> Arc<Registry> {
        Registry::bundled().unwrap()
    }

    fn player(gamemode: GameMode) -> Player {
        let profile = Profile {
            uuid: Uuid::from_u64s(1, 1),
            username: "steve".into(),
            entity_id: 1,
        };
        Player::new(profile, gamemode, registry())
    }

    fn click(window_id: u8, state_id: i32, slot: i16, button: i8, mode: ClickMode) -> ContainerClickC2s {
        ContainerClickC2s {
            window_id,
            state_id,
            slot,
            button,
            mode,
            changed_slots: Vec::new(),
            carried: None,
        }
    }

    async fn run(player: &mut Player, click: ContainerClickC2s) -> Result<ClickOutcome, ClickError> {
        handle_click(player, &click, &RecordingWorld::default(), &NoopEvents).await
    }

    fn stack(item: i32, count: u8) -> Slot {
        Some(ItemStack::new(item, count))
    }

    #[tokio::test]
    async fn drop_one_spawns_and_broadcasts_once() {
        let mut player = player(GameMode::Survival);
        player.position = Vec3::new(1.0, 64.0, -3.0);
        player.inventory.set(20, stack(DIRT, 5)).unwrap();
        let state = player.inventory.state_id();
        let world = RecordingWorld::default();

        let outcome = handle_click(
            &mut player,
            &click(0, state, 20, 0, ClickMode::Drop),
            &world,
            &NoopEvents,
        )
        .await
        .unwrap();

        assert_eq!(player.inventory.get(20).unwrap(), stack(DIRT, 4));
        assert_eq!(player.inventory.state_id(), state + 1);
        let spawned = world.spawned.lock().unwrap().clone();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].1, ItemStack::new(DIRT, 1));
        assert!((spawned[0].0.y - (64.0 + 1.62 - 0.3)).abs() < 1e-9);
        assert_eq!(
            world.broadcast_ids(),
            vec![SpawnEntityS2c::DESCRIPTOR.id, SetEntityMetadataS2c::DESCRIPTOR.id]
        );
        assert_eq!(outcome.spawned, Some(101));
        assert_eq!(outcome.changed.len(), 1);
    }

    #[tokio::test]
    async fn drop_stack_and_empty_slot() {
        let mut player = player(GameMode::Survival);
        player.inventory.set(20, stack(DIRT, 5)).unwrap();
        let world = RecordingWorld::default();

        let state = player.inventory.state_id();
        handle_click(&mut player, &click(0, state, 20, 1, ClickMode::Drop), &world, &NoopEvents)
            .await
            .unwrap();
        assert_eq!(player.inventory.get(20).unwrap(), None);
        assert_eq!(world.spawned.lock().unwrap()[0].1.count, 5);

        let state = player.inventory.state_id();
        let outcome = handle_click(&mut player, &click(0, state, 20, 0, ClickMode::Drop), &world, &NoopEvents)
            .await
            .unwrap();
        assert!(outcome.spawned.is_none());
        assert_eq!(world.spawned.lock().unwrap().len(), 1);
        assert_eq!(player.inventory.state_id(), state);
    }

    #[tokio::test]
    async fn drop_outside_does_nothing() {
        let mut player = player(GameMode::Survival);
        let outcome = run(&mut player, click(0, 0, OUTSIDE, 0, ClickMode::Drop)).await.unwrap();
        assert!(outcome.spawned.is_none());
        assert!(outcome.changed.is_empty());
    }

    #[tokio::test]
    async fn number_key_moves_into_empty_hotbar() {
        let mut player = player(GameMode::Survival);
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        player.inventory.set(12, stack(STICK, 3)).unwrap();
        let chest_state = chest.state_id();

        let state = player.inventory.state_id();
        let outcome = run(&mut player, click(0, state, 12, 2, ClickMode::NumberKeys))
            .await
            .unwrap();

        assert_eq!(player.inventory.get(12).unwrap(), None);
        assert_eq!(player.inventory.get(38).unwrap(), stack(STICK, 3));
        assert_eq!(player.inventory.state_id(), state + 1);
        assert_eq!(outcome.changed.len(), 1);
        assert_eq!(outcome.changed[0].id(), player.inventory.id());
        assert_eq!(chest.state_id(), chest_state);
    }

    #[tokio::test]
    async fn number_key_swaps_between_containers() {
        let mut player = player(GameMode::Survival);
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        chest.set(4, stack(DIRT, 10)).unwrap();
        player.inventory.set(36, stack(STICK, 2)).unwrap();
        let window = player.open(chest.clone()).unwrap().window_id as u8;

        let outcome = run(
            &mut player,
            click(window, chest.state_id(), 4, 0, ClickMode::NumberKeys),
        )
        .await
        .unwrap();

        assert_eq!(chest.get(4).unwrap(), stack(STICK, 2));
        assert_eq!(player.inventory.get(36).unwrap(), stack(DIRT, 10));
        assert_eq!(outcome.changed.len(), 2);

        // And back out again, leaving the hotbar slot empty.
        run(
            &mut player,
            click(window, chest.state_id(), 4, 0, ClickMode::NumberKeys),
        )
        .await
        .unwrap();
        assert_eq!(chest.get(4).unwrap(), stack(DIRT, 10));
        assert_eq!(player.inventory.get(36).unwrap(), stack(STICK, 2));
    }

    #[tokio::test]
    async fn number_key_respects_slot_rules() {
        let mut player = player(GameMode::Survival);
        let furnace = Container::new(ContainerKind::Furnace, registry());
        player.inventory.set(36, stack(DIRT, 1)).unwrap();
        let window = player.open(furnace.clone()).unwrap().window_id as u8;

        let err = run(&mut player, click(window, 0, 1, 0, ClickMode::NumberKeys))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClickError::Container(ContainerError::InvalidSlotContents { index: 1, .. })
        ));
        assert_eq!(player.inventory.get(36).unwrap(), stack(DIRT, 1));
        assert_eq!(furnace.state_id(), 0);
    }

    #[tokio::test]
    async fn stale_mouse_click_changes_nothing() {
        let mut player = player(GameMode::Survival);
        player.inventory.set(9, stack(DIRT, 8)).unwrap();
        player.inventory.set(10, stack(DIRT, 8)).unwrap();
        let current = player.inventory.state_id();

        let err = run(&mut player, click(0, current - 1, 9, 0, ClickMode::MouseClick))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClickError::Container(ContainerError::StaleStateId { got, current: c }) if got == current - 1 && c == current
        ));
        assert_eq!(player.inventory.get(9).unwrap(), stack(DIRT, 8));
        assert_eq!(player.inventory.state_id(), current);
        assert!(player.cursor.is_none());
    }

    #[tokio::test]
    async fn stale_id_in_player_region_checks_the_window() {
        let mut player = player(GameMode::Survival);
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        chest.set(0, stack(DIRT, 1)).unwrap();
        player.inventory.set(9, stack(STICK, 1)).unwrap();
        let window = player.open(chest.clone()).unwrap().window_id as u8;

        // Slot 9 of the window is the first main inventory slot.
        let err = run(&mut player, click(window, 0, 9, 0, ClickMode::MouseClick))
            .await
            .unwrap_err();
        assert!(matches!(err, ClickError::Container(ContainerError::StaleStateId { .. })));
        assert_eq!(player.inventory.get(9).unwrap(), stack(STICK, 1));

        run(&mut player, click(window, 1, 9, 0, ClickMode::MouseClick)).await.unwrap();
        assert_eq!(player.cursor, stack(STICK, 1));
        assert_eq!(player.inventory.get(9).unwrap(), None);
    }

    #[tokio::test]
    async fn mouse_click_pick_place_and_merge() {
        let mut player = player(GameMode::Survival);
        let inv = player.inventory.clone();
        inv.set(9, stack(DIRT, 7)).unwrap();

        // Right click picks up half, rounded up.
        run(&mut player, click(0, inv.state_id(), 9, 1, ClickMode::MouseClick)).await.unwrap();
        assert_eq!(player.cursor, stack(DIRT, 4));
        assert_eq!(inv.get(9).unwrap(), stack(DIRT, 3));

        // Right click on an empty slot places one.
        run(&mut player, click(0, inv.state_id(), 10, 1, ClickMode::MouseClick)).await.unwrap();
        assert_eq!(inv.get(10).unwrap(), stack(DIRT, 1));
        assert_eq!(player.cursor, stack(DIRT, 3));

        // Left click on a matching stack merges the whole cursor.
        let outcome = run(&mut player, click(0, inv.state_id(), 9, 0, ClickMode::MouseClick))
            .await
            .unwrap();
        assert_eq!(inv.get(9).unwrap(), stack(DIRT, 6));
        assert!(player.cursor.is_none());
        assert!(outcome.cursor_changed);
    }

    #[tokio::test]
    async fn mouse_click_merge_keeps_overflow_on_cursor() {
        let mut player = player(GameMode::Survival);
        let inv = player.inventory.clone();
        inv.set(9, stack(DIRT, 60)).unwrap();
        player.cursor = stack(DIRT, 10);

        run(&mut player, click(0, inv.state_id(), 9, 0, ClickMode::MouseClick)).await.unwrap();
        assert_eq!(inv.get(9).unwrap(), stack(DIRT, 64));
        assert_eq!(player.cursor, stack(DIRT, 6));
    }

    #[tokio::test]
    async fn mouse_click_swaps_different_items() {
        let mut player = player(GameMode::Survival);
        let inv = player.inventory.clone();
        inv.set(9, stack(DIRT, 3)).unwrap();
        player.cursor = stack(STICK, 2);

        run(&mut player, click(0, inv.state_id(), 9, 0, ClickMode::MouseClick)).await.unwrap();
        assert_eq!(inv.get(9).unwrap(), stack(STICK, 2));
        assert_eq!(player.cursor, stack(DIRT, 3));
    }

    #[tokio::test]
    async fn vetoed_click_leaves_everything() {
        let mut player = player(GameMode::Survival);
        let inv = player.inventory.clone();
        inv.set(9, stack(DIRT, 3)).unwrap();
        let state = inv.state_id();

        let outcome = handle_click(
            &mut player,
            &click(0, state, 9, 0, ClickMode::MouseClick),
            &RecordingWorld::default(),
            &Veto,
        )
        .await
        .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(inv.get(9).unwrap(), stack(DIRT, 3));
        assert_eq!(inv.state_id(), state);
        assert!(player.cursor.is_none());
    }

    #[tokio::test]
    async fn result_slot_rejects_placement() {
        let mut player = player(GameMode::Survival);
        let inv = player.inventory.clone();
        player.cursor = stack(DIRT, 1);

        let err = run(&mut player, click(0, inv.state_id(), 0, 0, ClickMode::MouseClick))
            .await
            .unwrap_err();
        assert!(matches!(err, ClickError::Container(ContainerError::ResultSlot(0))));
        assert_eq!(player.cursor, stack(DIRT, 1));

        inv.set_result(0, stack(STICK, 4)).unwrap();
        player.cursor = None;
        run(&mut player, click(0, inv.state_id(), 0, 0, ClickMode::MouseClick)).await.unwrap();
        assert_eq!(player.cursor, stack(STICK, 4));
        assert_eq!(inv.get(0).unwrap(), None);
    }

    #[tokio::test]
    async fn click_outside_drops_cursor() {
        let mut player = player(GameMode::Survival);
        player.cursor = stack(DIRT, 5);
        let world = RecordingWorld::default();

        handle_click(&mut player, &click(0, 0, OUTSIDE, 1, ClickMode::MouseClick), &world, &NoopEvents)
            .await
            .unwrap();
        assert_eq!(player.cursor, stack(DIRT, 4));
        assert_eq!(world.spawned.lock().unwrap()[0].1.count, 1);
    }

    #[tokio::test]
    async fn shift_click_moves_hotbar_to_main() {
        let mut player = player(GameMode::Survival);
        let inv = player.inventory.clone();
        inv.set(9, stack(DIRT, 60)).unwrap();
        inv.set(40, stack(DIRT, 10)).unwrap();

        run(&mut player, click(0, inv.state_id(), 40, 0, ClickMode::ShiftMouseClick)).await.unwrap();
        assert_eq!(inv.get(9).unwrap(), stack(DIRT, 64));
        assert_eq!(inv.get(10).unwrap(), stack(DIRT, 6));
        assert_eq!(inv.get(40).unwrap(), None);
    }

    #[tokio::test]
    async fn shift_click_overflow_stays_in_source() {
        let mut player = player(GameMode::Survival);
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        let inv = player.inventory.clone();
        for i in 9..=44 {
            inv.set(i, stack(STICK, 64)).unwrap();
        }
        inv.set(44, stack(DIRT, 60)).unwrap();
        chest.set(0, stack(DIRT, 10)).unwrap();
        let window = player.open(chest.clone()).unwrap().window_id as u8;

        let outcome = run(&mut player, click(window, chest.state_id(), 0, 0, ClickMode::ShiftMouseClick))
            .await
            .unwrap();
        assert_eq!(inv.get(44).unwrap(), stack(DIRT, 64));
        assert_eq!(chest.get(0).unwrap(), stack(DIRT, 6));
        assert_eq!(outcome.changed.len(), 2);
    }

    #[tokio::test]
    async fn shift_click_into_brewing_stand_follows_slot_rules() {
        let mut player = player(GameMode::Survival);
        let stand = Container::new(ContainerKind::BrewingStand, registry());
        let inv = player.inventory.clone();
        inv.set(9, stack(POTION, 1)).unwrap();
        inv.set(10, stack(DIRT, 1)).unwrap();
        let window = player.open(stand.clone()).unwrap().window_id as u8;

        // Window slot 5 is inventory slot 9.
        run(&mut player, click(window, 0, 5, 0, ClickMode::ShiftMouseClick)).await.unwrap();
        assert_eq!(stand.get(0).unwrap(), stack(POTION, 1));
        assert_eq!(inv.get(9).unwrap(), None);

        let err = run(&mut player, click(window, stand.state_id(), 6, 0, ClickMode::ShiftMouseClick))
            .await
            .unwrap_err();
        assert!(matches!(err, ClickError::Container(ContainerError::InvalidSlotContents { .. })));
        assert_eq!(inv.get(10).unwrap(), stack(DIRT, 1));
    }

    #[tokio::test]
    async fn shift_click_on_empty_slot_is_noop() {
        let mut player = player(GameMode::Survival);
        let outcome = run(&mut player, click(0, 0, 9, 0, ClickMode::ShiftMouseClick)).await.unwrap();
        assert!(outcome.changed.is_empty());
        assert_eq!(player.inventory.state_id(), 0);
    }

    #[tokio::test]
    async fn double_click_gathers_descending() {
        let mut player = player(GameMode::Survival);
        let inv = player.inventory.clone();
        inv.set(9, stack(COAL, 10)).unwrap();
        inv.set(20, stack(COAL, 30)).unwrap();
        inv.set(30, stack(DIRT, 5)).unwrap();
        inv.set(40, stack(COAL, 30)).unwrap();
        let state = inv.state_id();

        run(&mut player, click(0, state, 9, 0, ClickMode::DoubleClick)).await.unwrap();
        assert_eq!(inv.get(9).unwrap(), stack(COAL, 64));
        assert_eq!(inv.get(40).unwrap(), None);
        assert_eq!(inv.get(20).unwrap(), stack(COAL, 6));
        assert_eq!(inv.get(30).unwrap(), stack(DIRT, 5));
        assert_eq!(inv.state_id(), state + 1);
    }

    #[tokio::test]
    async fn survival_drag_paints_one_per_slot() {
        let mut player = player(GameMode::Survival);
        let inv = player.inventory.clone();
        player.cursor = stack(DIRT, 3);

        run(&mut player, click(0, 0, OUTSIDE, 4, ClickMode::MouseDrag)).await.unwrap();
        for slot in [9, 10] {
            run(&mut player, click(0, inv.state_id(), slot, 5, ClickMode::MouseDrag)).await.unwrap();
        }
        run(&mut player, click(0, inv.state_id(), OUTSIDE, 6, ClickMode::MouseDrag)).await.unwrap();

        assert_eq!(inv.get(9).unwrap(), stack(DIRT, 1));
        assert_eq!(inv.get(10).unwrap(), stack(DIRT, 1));
        assert_eq!(player.cursor, stack(DIRT, 1));
        assert!(player.drag.is_none());
    }

    #[tokio::test]
    async fn middle_drag_needs_creative() {
        let mut survival = player(GameMode::Survival);
        survival.cursor = stack(DIRT, 3);
        run(&mut survival, click(0, 0, OUTSIDE, 8, ClickMode::MouseDrag)).await.unwrap();
        run(&mut survival, click(0, 0, 9, 9, ClickMode::MouseDrag)).await.unwrap();
        assert_eq!(survival.inventory.get(9).unwrap(), None);

        let mut creative = player(GameMode::Creative);
        creative.cursor = stack(DIRT, 3);
        run(&mut creative, click(0, 0, OUTSIDE, 8, ClickMode::MouseDrag)).await.unwrap();
        run(&mut creative, click(0, 0, 9, 9, ClickMode::MouseDrag)).await.unwrap();
        assert_eq!(creative.inventory.get(9).unwrap(), stack(DIRT, 3));
        assert_eq!(creative.cursor, stack(DIRT, 3));
    }

    #[tokio::test]
    async fn creative_paints_only_with_the_middle_button() {
        let mut player = player(GameMode::Creative);
        player.cursor = stack(DIRT, 3);
        run(&mut player, click(0, 0, OUTSIDE, 0, ClickMode::MouseDrag)).await.unwrap();
        let outcome = run(&mut player, click(0, 0, 9, 1, ClickMode::MouseDrag)).await.unwrap();

        assert_eq!(player.inventory.get(9).unwrap(), None);
        assert_eq!(player.cursor, stack(DIRT, 3));
        assert!(outcome.changed.is_empty());
        assert_eq!(player.inventory.state_id(), 0);
    }

    #[tokio::test]
    async fn drag_starts_and_ends_only_outside() {
        let mut player = player(GameMode::Survival);
        player.cursor = stack(DIRT, 3);

        run(&mut player, click(0, 0, 20, 0, ClickMode::MouseDrag)).await.unwrap();
        assert!(player.drag.is_none());
        run(&mut player, click(0, 0, 9, 1, ClickMode::MouseDrag)).await.unwrap();
        assert_eq!(player.inventory.get(9).unwrap(), None);

        run(&mut player, click(0, 0, OUTSIDE, 0, ClickMode::MouseDrag)).await.unwrap();
        run(&mut player, click(0, 0, 20, 2, ClickMode::MouseDrag)).await.unwrap();
        assert_eq!(player.drag, Some(DragKind::Left));
        run(&mut player, click(0, 0, OUTSIDE, 2, ClickMode::MouseDrag)).await.unwrap();
        assert!(player.drag.is_none());
    }

    #[tokio::test]
    async fn paint_without_drag_is_ignored() {
        let mut player = player(GameMode::Survival);
        player.cursor = stack(DIRT, 3);
        run(&mut player, click(0, 0, 9, 1, ClickMode::MouseDrag)).await.unwrap();
        assert_eq!(player.inventory.get(9).unwrap(), None);
    }

    #[tokio::test]
    async fn middle_click_clones_in_creative() {
        let mut player = player(GameMode::Creative);
        player.inventory.set(9, stack(STICK, 1)).unwrap();
        let outcome = run(&mut player, click(0, 1, 9, 2, ClickMode::MiddleMouseClick)).await.unwrap();
        assert_eq!(player.cursor, stack(STICK, 64));
        assert!(outcome.changed.is_empty());
        assert_eq!(player.inventory.get(9).unwrap(), stack(STICK, 1));
    }

    #[tokio::test]
    async fn unknown_window_is_rejected() {
        let mut player = player(GameMode::Survival);
        let err = run(&mut player, click(5, 0, 0, 0, ClickMode::MouseClick)).await.unwrap_err();
        assert!(matches!(err, ClickError::Container(ContainerError::UnknownWindow(5))));
    }
}
