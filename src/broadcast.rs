use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use bytes::Bytes;
use net::{proto::ContainerSetContentS2c, serialize, Packet, ProtoError};

use crate::{
    connection::{SessionHandle, SessionId},
    inventory::{Container, ContainerId},
    logging::ServerLogger,
};

/// Who receives a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    AllExcept(SessionId),
    Session(SessionId),
    /// Sessions that currently have the container open.
    Viewers(ContainerId),
}

/// Registry of live sessions and of which windows show which container.
/// Delivery is fire-and-forget: a full or closed receiver is skipped and
/// never holds up the rest.
#[derive(Default)]
pub struct Broadcaster {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    viewers: RwLock<HashMap<ContainerId, Vec<(SessionId, u8)>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: SessionHandle) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.id(), handle);
    }

    /// Forgets the session and every window it had open.
    pub fn unregister(&self, session: SessionId) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session);
        self.viewers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, views| {
                views.retain(|(id, _)| *id != session);
                !views.is_empty()
            });
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Records that `session` shows `container` under `window_id`.
    pub fn watch(&self, container: ContainerId, session: SessionId, window_id: u8) {
        let mut viewers = self.viewers.write().unwrap_or_else(PoisonError::into_inner);
        let views = viewers.entry(container).or_default();
        views.retain(|(id, _)| *id != session);
        views.push((session, window_id));
    }

    pub fn unwatch(&self, container: ContainerId, session: SessionId) {
        let mut viewers = self.viewers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(views) = viewers.get_mut(&container) {
            views.retain(|(id, _)| *id != session);
            if views.is_empty() {
                viewers.remove(&container);
            }
        }
    }

    #[must_use]
    pub fn viewers(&self, container: ContainerId) -> Vec<(SessionId, u8)> {
        self.viewers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&container)
            .cloned()
            .unwrap_or_default()
    }

    /// Sends an already serialized body; returns how many sessions took it.
    pub fn broadcast(&self, body: Bytes, audience: &Audience) -> usize {
        let targets = self.targets(audience);
        deliver(&targets, &body)
    }

    /// Serializes once, then fans out.
    pub fn broadcast_packet<P: Packet>(
        &self,
        packet: &P,
        audience: &Audience,
    ) -> Result<usize, ProtoError> {
        let body = Bytes::from(serialize(packet)?);
        Ok(self.broadcast(body, audience))
    }

    /// Pushes the container's current contents to every viewer, one
    /// serialization per distinct window id.
    pub fn sync_container(&self, container: &Container) -> Result<usize, ProtoError> {
        let views = self.viewers(container.id());
        if views.is_empty() {
            return Ok(0);
        }

        let mut by_window: HashMap<u8, Vec<SessionId>> = HashMap::new();
        for (session, window_id) in views {
            by_window.entry(window_id).or_default().push(session);
        }

        let (state_id, slots) = container.snapshot();
        let mut delivered = 0;
        for (window_id, sessions) in by_window {
            let packet = ContainerSetContentS2c {
                window_id,
                state_id,
                slots: slots.clone(),
            };
            let body = Bytes::from(serialize(&packet)?);
            let targets = self.handles(sessions.iter());
            delivered += deliver(&targets, &body);
        }
        Ok(delivered)
    }

    fn targets(&self, audience: &Audience) -> Vec<SessionHandle> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        match audience {
            Audience::All => sessions.values().cloned().collect(),
            Audience::AllExcept(skip) => sessions
                .iter()
                .filter(|(id, _)| *id != skip)
                .map(|(_, handle)| handle.clone())
                .collect(),
            Audience::Session(id) => sessions.get(id).cloned().into_iter().collect(),
            Audience::Viewers(container) => {
                drop(sessions);
                let views = self.viewers(*container);
                self.handles(views.iter().map(|(id, _)| id))
            }
        }
    }

    fn handles<'a>(&self, ids: impl Iterator<Item = &'a SessionId>) -> Vec<SessionHandle> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        ids.filter_map(|id| sessions.get(id).cloned()).collect()
    }
}

fn deliver(targets: &[SessionHandle], body: &Bytes) -> usize {
    let mut delivered = 0;
    for handle in targets {
        match handle.send_raw(body.clone()) {
            Ok(()) => delivered += 1,
            Err(err) => ServerLogger::broadcast_failed(handle.id(), &err),
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use net::{proto::SpawnPositionS2c, BlockPos, ItemStack};
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        connection::Outbound,
        inventory::ContainerKind,
        registry::Registry,
    };

    fn session(capacity: usize) -> (SessionHandle, mpsc::Receiver<Outbound>) {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        SessionHandle::detached(addr, capacity)
    }

    fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Bytes> {
        let mut out = Vec::new();
        while let Ok(Outbound::Packet(body)) = rx.try_recv() {
            out.push(body);
        }
        out
    }

    #[test]
    fn all_except_skips_the_sender() {
        let broadcaster = Broadcaster::new();
        let (a, mut ra) = session(4);
        let (b, mut rb) = session(4);
        broadcaster.register(a.clone());
        broadcaster.register(b.clone());

        let sent = broadcaster.broadcast(Bytes::from_static(&[1, 2]), &Audience::AllExcept(a.id()));
        assert_eq!(sent, 1);
        assert!(drain(&mut ra).is_empty());
        assert_eq!(drain(&mut rb), vec![Bytes::from_static(&[1, 2])]);
    }

    #[test]
    fn a_full_receiver_does_not_block_others() {
        let broadcaster = Broadcaster::new();
        let (slow, _slow_rx) = session(1);
        let (fast, mut fast_rx) = session(8);
        broadcaster.register(slow.clone());
        broadcaster.register(fast.clone());

        for i in 0..3u8 {
            broadcaster.broadcast(Bytes::from(vec![i]), &Audience::All);
        }

        assert!(slow.is_closed());
        assert!(!fast.is_closed());
        assert_eq!(drain(&mut fast_rx).len(), 3);
    }

    #[test]
    fn viewers_get_their_own_window_id() {
        let broadcaster = Broadcaster::new();
        let chest = Container::new(ContainerKind::Chest { rows: 1 }, Registry::bundled().unwrap());
        chest.set(0, Some(ItemStack::new(2, 7))).unwrap();

        let (a, mut ra) = session(4);
        let (b, mut rb) = session(4);
        let (c, mut rc) = session(4);
        for handle in [&a, &b, &c] {
            broadcaster.register(handle.clone());
        }
        broadcaster.watch(chest.id(), a.id(), 3);
        broadcaster.watch(chest.id(), b.id(), 7);

        assert_eq!(broadcaster.sync_container(&chest).unwrap(), 2);
        let expected_a = serialize(&ContainerSetContentS2c {
            window_id: 3,
            state_id: 1,
            slots: chest.snapshot().1,
        })
        .unwrap();
        assert_eq!(drain(&mut ra), vec![Bytes::from(expected_a)]);
        assert_eq!(drain(&mut rb).len(), 1);
        assert!(drain(&mut rc).is_empty());
    }

    #[test]
    fn packets_reach_a_single_session_or_a_containers_viewers() {
        let broadcaster = Broadcaster::new();
        let (a, mut ra) = session(4);
        let (b, mut rb) = session(4);
        broadcaster.register(a.clone());
        broadcaster.register(b.clone());
        broadcaster.watch(42, b.id(), 2);

        let packet = SpawnPositionS2c {
            location: BlockPos::default(),
            angle: 90.0,
        };
        let body = Bytes::from(serialize(&packet).unwrap());

        let sent = broadcaster
            .broadcast_packet(&packet, &Audience::Session(a.id()))
            .unwrap();
        assert_eq!(sent, 1);
        assert_eq!(drain(&mut ra), vec![body.clone()]);
        assert!(drain(&mut rb).is_empty());

        assert_eq!(broadcaster.broadcast_packet(&packet, &Audience::Viewers(42)).unwrap(), 1);
        assert!(drain(&mut ra).is_empty());
        assert_eq!(drain(&mut rb), vec![body]);

        assert_eq!(broadcaster.broadcast(Bytes::new(), &Audience::Viewers(7)), 0);
        assert_eq!(broadcaster.broadcast(Bytes::new(), &Audience::Session(u64::MAX)), 0);
    }

    #[test]
    fn unregister_drops_views() {
        let broadcaster = Broadcaster::new();
        let (a, _ra) = session(4);
        broadcaster.register(a.clone());
        broadcaster.watch(42, a.id(), 1);
        broadcaster.unregister(a.id());
        assert!(broadcaster.viewers(42).is_empty());
        assert_eq!(broadcaster.session_count(), 0);
        assert_eq!(broadcaster.broadcast(Bytes::new(), &Audience::All), 0);
    }
}
