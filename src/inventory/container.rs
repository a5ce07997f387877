use std::{
    ops::RangeInclusive,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use net::{ItemStack, MAX_STACK_SIZE};

use super::kind::ContainerKind;
use crate::{error::ContainerError, registry::Registry};

pub type ContainerId = u64;
pub type Slot = Option<ItemStack>;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Authoritative slot storage shared by every session that views it.
///
/// All mutation goes through [`Container::transaction`]: writes are staged on
/// a copy of the slots and committed together, and a commit that changes
/// anything advances the state id exactly once.
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    kind: ContainerKind,
    registry: Arc<Registry>,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    slots: Vec<Slot>,
    state_id: i32,
}

/// Staged view of one container inside a transaction.
pub struct Tx<'a> {
    kind: ContainerKind,
    registry: &'a Registry,
    slots: Vec<Slot>,
    privileged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

/// Two staged containers; when both sides name the same container they share
/// one staging area.
pub struct TxPair<'t, 'a> {
    first: &'t mut Tx<'a>,
    second: Option<&'t mut Tx<'a>>,
}

impl<'a> TxPair<'_, 'a> {
    pub fn side(&mut self, side: Side) -> &mut Tx<'a> {
        match side {
            Side::First => &mut *self.first,
            Side::Second => match self.second.as_deref_mut() {
                Some(tx) => tx,
                None => &mut *self.first,
            },
        }
    }
}

/// Combines two stacks of the same item up to the stack ceiling.
///
/// Returns `(merged, remainder)`; stacks that cannot share a slot come back
/// unchanged as `(Some(a), Some(b))`.
#[must_use]
pub fn merge(a: Slot, b: Slot) -> (Slot, Slot) {
    match (a, b) {
        (None, b) => (b, None),
        (a, None) => (a, None),
        (Some(a), Some(b)) if a.stacks_with(&b) => {
            let total = u16::from(a.count) + u16::from(b.count);
            let merged = total.min(u16::from(MAX_STACK_SIZE)) as u8;
            let rest = (total - u16::from(merged)) as u8;
            let remainder = (rest > 0).then(|| b.with_count(rest));
            (Some(a.with_count(merged)), remainder)
        }
        (a, b) => (a, b),
    }
}

impl Container {
    pub fn new(kind: ContainerKind, registry: Arc<Registry>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            registry,
            inner: Mutex::new(Inner {
                slots: vec![None; kind.size()],
                state_id: 0,
            }),
        })
    }

    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.kind.size()
    }

    #[must_use]
    pub fn state_id(&self) -> i32 {
        self.lock().state_id
    }

    pub fn get(&self, index: usize) -> Result<Slot, ContainerError> {
        let inner = self.lock();
        inner
            .slots
            .get(index)
            .cloned()
            .ok_or(ContainerError::IndexOutOfBounds {
                index,
                size: inner.slots.len(),
            })
    }

    pub fn set(&self, index: usize, slot: Slot) -> Result<(), ContainerError> {
        self.transaction(None, |tx| tx.set(index, slot))
    }

    /// Removes up to `count` items (the whole stack when `None`).
    pub fn remove(&self, index: usize, count: Option<u8>) -> Result<Slot, ContainerError> {
        self.transaction(None, |tx| tx.take(index, count))
    }

    /// Adds into the kind's storage slots, returning what did not fit.
    pub fn add(&self, stack: ItemStack) -> Result<Slot, ContainerError> {
        let range = self.kind.storage();
        self.transaction(None, |tx| tx.add(range, stack))
    }

    /// Privileged writer for result slots, used by crafting and smelting.
    pub fn set_result(&self, index: usize, slot: Slot) -> Result<(), ContainerError> {
        if !self.kind.is_result(index) {
            return Err(ContainerError::IndexOutOfBounds {
                index,
                size: self.size(),
            });
        }
        self.commit(None, true, |tx| tx.set(index, slot))
    }

    /// Current state id together with a copy of every slot.
    #[must_use]
    pub fn snapshot(&self) -> (i32, Vec<Slot>) {
        let inner = self.lock();
        (inner.state_id, inner.slots.clone())
    }

    pub fn check_state(&self, expected: i32) -> Result<(), ContainerError> {
        let current = self.state_id();
        if current != expected {
            return Err(ContainerError::StaleStateId {
                got: expected,
                current,
            });
        }
        Ok(())
    }

    /// Runs `f` against staged slots. When `expected` is given it must match
    /// the current state id or nothing is applied.
    pub fn transaction<T>(
        &self,
        expected: Option<i32>,
        f: impl FnOnce(&mut Tx<'_>) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        self.commit(expected, false, f)
    }

    /// Transaction spanning two containers, which may be the same one.
    /// Locks are taken in id order; `expected` is checked against `first`.
    pub fn transaction2<T>(
        first: &Container,
        second: &Container,
        expected: Option<i32>,
        f: impl FnOnce(&mut TxPair<'_, '_>) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        if first.id == second.id {
            return first.transaction(expected, |tx| {
                f(&mut TxPair {
                    first: tx,
                    second: None,
                })
            });
        }

        let (mut guard_a, mut guard_b) = if first.id < second.id {
            let a = first.lock();
            (a, second.lock())
        } else {
            let b = second.lock();
            (first.lock(), b)
        };

        if let Some(expected) = expected {
            if guard_a.state_id != expected {
                return Err(ContainerError::StaleStateId {
                    got: expected,
                    current: guard_a.state_id,
                });
            }
        }

        let mut tx_a = first.stage(&guard_a, false);
        let mut tx_b = second.stage(&guard_b, false);
        let value = f(&mut TxPair {
            first: &mut tx_a,
            second: Some(&mut tx_b),
        })?;
        apply(&mut guard_a, tx_a.slots);
        apply(&mut guard_b, tx_b.slots);
        Ok(value)
    }

    fn commit<T>(
        &self,
        expected: Option<i32>,
        privileged: bool,
        f: impl FnOnce(&mut Tx<'_>) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        let mut inner = self.lock();
        if let Some(expected) = expected {
            if inner.state_id != expected {
                return Err(ContainerError::StaleStateId {
                    got: expected,
                    current: inner.state_id,
                });
            }
        }

        let mut tx = self.stage(&inner, privileged);
        let value = f(&mut tx)?;
        apply(&mut inner, tx.slots);
        Ok(value)
    }

    fn stage(&self, inner: &Inner, privileged: bool) -> Tx<'_> {
        Tx {
            kind: self.kind,
            registry: &self.registry,
            slots: inner.slots.clone(),
            privileged,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply(inner: &mut Inner, slots: Vec<Slot>) {
    if inner.slots != slots {
        inner.slots = slots;
        // The id stays a non-negative VarInt: after i32::MAX it starts over at
        // zero, so a client holding an id from 2^31 mutations ago would match.
        inner.state_id = inner.state_id.checked_add(1).unwrap_or(0);
    }
}

impl Tx<'_> {
    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Option<&ItemStack>, ContainerError> {
        self.slots
            .get(index)
            .map(Option::as_ref)
            .ok_or(ContainerError::IndexOutOfBounds {
                index,
                size: self.slots.len(),
            })
    }

    pub fn set(&mut self, index: usize, slot: Slot) -> Result<(), ContainerError> {
        let size = self.slots.len();
        if index >= size {
            return Err(ContainerError::IndexOutOfBounds { index, size });
        }
        if let Some(stack) = &slot {
            if stack.count == 0 || stack.count > MAX_STACK_SIZE {
                return Err(ContainerError::InvalidSlotContents {
                    index,
                    item: stack.item,
                });
            }
            if self.kind.is_result(index) {
                if !self.privileged {
                    return Err(ContainerError::ResultSlot(index));
                }
            } else if !self.kind.accepts(self.registry, index, stack) {
                return Err(ContainerError::InvalidSlotContents {
                    index,
                    item: stack.item,
                });
            }
        }
        self.slots[index] = slot;
        Ok(())
    }

    pub fn take(&mut self, index: usize, count: Option<u8>) -> Result<Slot, ContainerError> {
        let Some(stack) = self.get(index)?.cloned() else {
            return Ok(None);
        };
        let taken = count.map_or(stack.count, |count| count.min(stack.count));
        if taken == 0 {
            return Ok(None);
        }
        let rest = stack.count - taken;
        self.slots[index] = (rest > 0).then(|| stack.with_count(rest));
        Ok(Some(stack.with_count(taken)))
    }

    /// Fills partial stacks in `range` in ascending order, then empty slots.
    /// Returns the leftover that did not fit.
    pub fn add(
        &mut self,
        range: RangeInclusive<usize>,
        stack: ItemStack,
    ) -> Result<Slot, ContainerError> {
        let end = *range.end();
        if end >= self.slots.len() {
            return Err(ContainerError::IndexOutOfBounds {
                index: end,
                size: self.slots.len(),
            });
        }

        let accepting: Vec<usize> = range
            .filter(|&i| {
                !self.kind.is_result(i) && self.kind.accepts(self.registry, i, &stack)
            })
            .collect();
        if accepting.is_empty() {
            return Err(ContainerError::InvalidSlotContents {
                index: end,
                item: stack.item,
            });
        }

        let mut left = Some(stack);
        for &i in &accepting {
            if matches!(&self.slots[i], Some(existing) if left.as_ref().is_some_and(|l| existing.stacks_with(l)))
            {
                let (merged, rest) = merge(self.slots[i].take(), left.take());
                self.slots[i] = merged;
                left = rest;
            }
            if left.is_none() {
                return Ok(None);
            }
        }
        for &i in &accepting {
            if self.slots[i].is_none() {
                self.slots[i] = left.take();
                return Ok(None);
            }
        }
        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRT: i32 = 2;
    const STICK: i32 = 10;
    const COAL: i32 = 11;
    const IRON_HELMET: i32 = 25;

    fn registry() -> Arc<Registry> {
        Registry::bundled().unwrap()
    }

    fn stack(item: i32, count: u8) -> Slot {
        Some(ItemStack::new(item, count))
    }

    #[test]
    fn state_id_advances_once_per_mutation() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        let mut seen = vec![chest.state_id()];
        for i in 0..9 {
            chest.set(i, stack(DIRT, 1 + i as u8)).unwrap();
            seen.push(chest.state_id());
        }
        chest.remove(3, Some(2)).unwrap();
        seen.push(chest.state_id());
        chest.add(ItemStack::new(DIRT, 1)).unwrap();
        seen.push(chest.state_id());

        assert!(seen.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn state_id_starts_over_after_the_last_positive_value() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        chest.lock().state_id = i32::MAX;
        chest.set(0, stack(DIRT, 1)).unwrap();
        assert_eq!(chest.state_id(), 0);
        chest.set(0, stack(DIRT, 2)).unwrap();
        assert_eq!(chest.state_id(), 1);
    }

    #[test]
    fn no_op_writes_keep_the_state_id() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        chest.set(0, stack(DIRT, 4)).unwrap();
        let state = chest.state_id();

        chest.set(0, stack(DIRT, 4)).unwrap();
        chest.remove(5, None).unwrap();
        chest.transaction(Some(state), |_| Ok(())).unwrap();
        assert_eq!(chest.state_id(), state);
    }

    #[test]
    fn merge_conserves_items() {
        let cases = [(10, 20), (60, 10), (64, 64), (1, 63), (33, 33)];
        for (a, b) in cases {
            let (merged, rest) = merge(stack(COAL, a), stack(COAL, b));
            let merged = merged.map_or(0, |s| u16::from(s.count));
            let rest = rest.map_or(0, |s| u16::from(s.count));
            assert_eq!(merged + rest, u16::from(a) + u16::from(b));
            assert!(merged <= 64);
        }

        let (a, b) = merge(stack(COAL, 3), stack(DIRT, 4));
        assert_eq!((a, b), (stack(COAL, 3), stack(DIRT, 4)));
        assert_eq!(merge(None, stack(DIRT, 4)), (stack(DIRT, 4), None));
    }

    #[test]
    fn add_fills_partial_stacks_then_empty_slots() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        chest.set(2, stack(DIRT, 60)).unwrap();
        chest.set(5, stack(DIRT, 62)).unwrap();
        chest.set(0, stack(STICK, 1)).unwrap();

        let left = chest.add(ItemStack::new(DIRT, 10)).unwrap();
        assert_eq!(left, None);
        assert_eq!(chest.get(2).unwrap(), stack(DIRT, 64));
        assert_eq!(chest.get(5).unwrap(), stack(DIRT, 64));
        assert_eq!(chest.get(1).unwrap(), stack(DIRT, 4));
    }

    #[test]
    fn add_returns_what_does_not_fit() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        for i in 0..9 {
            chest.set(i, stack(DIRT, 63)).unwrap();
        }
        let left = chest.add(ItemStack::new(DIRT, 20)).unwrap();
        assert_eq!(left, stack(DIRT, 11));
    }

    #[test]
    fn constraint_violation_leaves_slot_unchanged() {
        let furnace = Container::new(ContainerKind::Furnace, registry());
        furnace.set(1, stack(COAL, 2)).unwrap();
        let state = furnace.state_id();

        let err = furnace.set(1, stack(DIRT, 1)).unwrap_err();
        assert_eq!(err, ContainerError::InvalidSlotContents { index: 1, item: DIRT });
        assert_eq!(furnace.get(1).unwrap(), stack(COAL, 2));
        assert_eq!(furnace.state_id(), state);

        let inventory = Container::new(ContainerKind::PlayerInventory, registry());
        assert!(inventory.set(5, stack(IRON_HELMET, 1)).is_ok());
        assert!(inventory.set(6, stack(IRON_HELMET, 1)).is_err());
    }

    #[test]
    fn counts_outside_stack_range_are_rejected() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        assert!(chest.set(0, stack(DIRT, 0)).is_err());
        assert!(chest.set(0, stack(DIRT, 65)).is_err());
        assert!(chest.set(9, stack(DIRT, 1)).is_err());
    }

    #[test]
    fn result_slots_need_the_privileged_writer() {
        let table = Container::new(ContainerKind::CraftingTable, registry());
        assert_eq!(
            table.set(0, stack(STICK, 4)).unwrap_err(),
            ContainerError::ResultSlot(0)
        );
        table.set_result(0, stack(STICK, 4)).unwrap();
        assert_eq!(table.state_id(), 1);
        assert_eq!(table.remove(0, None).unwrap(), stack(STICK, 4));
        assert!(table.set_result(3, stack(STICK, 1)).is_err());
    }

    #[test]
    fn stale_transaction_is_rejected() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        chest.set(0, stack(DIRT, 1)).unwrap();
        let err = chest
            .transaction(Some(0), |tx| tx.set(1, stack(DIRT, 1)))
            .unwrap_err();
        assert_eq!(err, ContainerError::StaleStateId { got: 0, current: 1 });
        assert_eq!(chest.get(1).unwrap(), None);
    }

    #[test]
    fn failed_transaction_applies_nothing() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        let result = chest.transaction(None, |tx| {
            tx.set(0, stack(DIRT, 5))?;
            tx.set(20, stack(DIRT, 5))
        });
        assert!(result.is_err());
        assert_eq!(chest.get(0).unwrap(), None);
        assert_eq!(chest.state_id(), 0);
    }

    #[test]
    fn paired_transaction_across_containers() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        let inventory = Container::new(ContainerKind::PlayerInventory, registry());
        chest.set(0, stack(DIRT, 5)).unwrap();

        Container::transaction2(&chest, &inventory, Some(1), |pair| {
            let taken = pair.side(Side::First).take(0, None)?;
            pair.side(Side::Second).set(9, taken)
        })
        .unwrap();
        assert_eq!(chest.get(0).unwrap(), None);
        assert_eq!(inventory.get(9).unwrap(), stack(DIRT, 5));
        assert_eq!((chest.state_id(), inventory.state_id()), (2, 1));

        // Same order reversed still locks cleanly.
        Container::transaction2(&inventory, &chest, None, |pair| {
            let taken = pair.side(Side::First).take(9, Some(2))?;
            pair.side(Side::Second).set(0, taken)
        })
        .unwrap();
        assert_eq!(chest.get(0).unwrap(), stack(DIRT, 2));
    }

    #[test]
    fn paired_transaction_on_one_container_shares_staging() {
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, registry());
        chest.set(0, stack(DIRT, 5)).unwrap();
        Container::transaction2(&chest, &chest, Some(1), |pair| {
            let taken = pair.side(Side::First).take(0, None)?;
            assert_eq!(pair.side(Side::Second).get(0)?, None);
            pair.side(Side::Second).set(4, taken)
        })
        .unwrap();
        assert_eq!(chest.get(4).unwrap(), stack(DIRT, 5));
        assert_eq!(chest.state_id(), 2);
    }

    #[test]
    fn concurrent_mutations_never_repeat_a_state_id() {
        let chest = Container::new(ContainerKind::Chest { rows: 3 }, registry());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let chest = chest.clone();
                std::thread::spawn(move || {
                    for i in 0..50u8 {
                        chest
                            .set(t * 6 + usize::from(i % 6), stack(DIRT, 1 + i % 60))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let (state, _) = chest.snapshot();
        assert!(state > 0);
        assert!(state <= 200);
    }
}
