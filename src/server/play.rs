use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use net::{
    proto::{ContainerClickC2s, KeepAliveC2s, KeepAliveS2c, SpawnPositionS2c},
    BlockPos, PacketState, ProtoError, ServerboundPacket,
};

use super::{PlayerCommand, Server};
use crate::{
    connection::{Session, SessionId},
    error::{ClickError, SessionError},
    inventory::{handle_click, Container},
    logging::ServerLogger,
    player::{Player, Profile},
    world::Vec3,
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Unregisters the player however the play loop ends.
struct Presence<'a> {
    server: &'a Server,
    session: SessionId,
    username: String,
}

impl Drop for Presence<'_> {
    fn drop(&mut self) {
        self.server.leave_player(self.session);
        self.server.broadcaster().unregister(self.session);
        self.server
            .online
            .fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
        ServerLogger::player_left(&self.username);
    }
}

pub(super) async fn play(
    server: &Server,
    session: &mut Session,
    profile: Profile,
) -> Result<(), SessionError> {
    let handle = session.handle().clone();
    let mut player = Player::new(
        profile,
        server.config().default_gamemode,
        server.registry().clone(),
    );

    server.broadcaster().register(handle.clone());
    server
        .broadcaster()
        .watch(player.inventory.id(), handle.id(), 0);
    server
        .online
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let mut commands = server.join_player(handle.id(), player.profile.username.clone());
    let _presence = Presence {
        server,
        session: handle.id(),
        username: player.profile.username.clone(),
    };
    ServerLogger::player_joined(
        session.address(),
        &player.profile.username,
        player.profile.entity_id,
    );

    session.send(&SpawnPositionS2c {
        location: BlockPos::default(),
        angle: 0.0,
    })?;
    resync(session, &player, 0)?;

    let mut keep_alive = tokio::time::interval(KEEP_ALIVE_INTERVAL);
    keep_alive.tick().await;
    let mut pending: Option<(i64, Instant)> = None;

    loop {
        let packet = tokio::select! {
            _ = keep_alive.tick() => {
                if let Some((_, sent)) = pending {
                    ServerLogger::keep_alive_missed(session.address(), sent.elapsed());
                    return Err(SessionError::KeepAliveTimeout);
                }
                let id = rand::random::<i64>();
                session.send(&KeepAliveS2c { id })?;
                pending = Some((id, Instant::now()));
                continue;
            }
            Some(command) = commands.recv() => {
                match command {
                    PlayerCommand::OpenContainer(container) => {
                        open_container(server, session, &mut player, container)?;
                    }
                }
                continue;
            }
            packet = session.next_packet() => packet?,
        };

        match packet {
            ServerboundPacket::ContainerClick(click) => {
                on_click(server, session, &mut player, &click).await?;
            }
            ServerboundPacket::ContainerClose(close) => {
                if let Some(open) = player.close(close.window_id) {
                    server
                        .broadcaster()
                        .unwatch(open.container.id(), handle.id());
                }
            }
            ServerboundPacket::SetPlayerPosition(position) => {
                player.position = Vec3::new(position.x, position.feet_y, position.z);
                player.on_ground = position.on_ground;
            }
            ServerboundPacket::KeepAlive(KeepAliveC2s { id }) => match pending {
                Some((expected, _)) if expected == id => pending = None,
                _ => {
                    return Err(SessionError::ProtocolViolation(
                        ProtoError::UnexpectedPacket {
                            state: PacketState::Play,
                            id: KeepAliveC2s::ID,
                        },
                    ));
                }
            },
            other => return Err(SessionError::unexpected(session.phase(), &other)),
        }
    }
}

async fn on_click(
    server: &Server,
    session: &Session,
    player: &mut Player,
    click: &ContainerClickC2s,
) -> Result<(), SessionError> {
    server.container_metrics.record_click(click.mode);

    let world = server.world().as_ref();
    match handle_click(player, click, world, server.events.as_ref()).await {
        Ok(outcome) => {
            for container in &outcome.changed {
                server.broadcaster().sync_container(container)?;
            }
            if outcome.cancelled {
                server.container_metrics.record_rejected("cancelled");
                resync(session, player, click.window_id)?;
            } else if outcome.cursor_changed {
                let state_id = player
                    .window_container(click.window_id)
                    .map_or(0, |container| container.state_id());
                session.send(&player.cursor_packet(state_id))?;
            }
            Ok(())
        }
        Err(ClickError::Container(err)) => {
            ServerLogger::click_rejected(
                &player.profile.username,
                click.window_id,
                click.slot,
                &err,
            );
            server.container_metrics.record_rejected(err.reason());
            resync(session, player, click.window_id)
        }
        Err(ClickError::Encode(err)) => Err(err.into()),
    }
}

/// Swaps the open window for `container` and starts syncing it to this
/// session along with its other viewers.
fn open_container(
    server: &Server,
    session: &Session,
    player: &mut Player,
    container: Arc<Container>,
) -> Result<(), SessionError> {
    let previous = player.open_window().map(|open| open.container.id());
    let Some(screen) = player.open(container.clone()) else {
        return Ok(());
    };
    let session_id = session.handle().id();
    if let Some(previous) = previous {
        server.broadcaster().unwatch(previous, session_id);
    }
    let window_id = player.open_window().map_or(0, |open| open.id);
    server
        .broadcaster()
        .watch(container.id(), session_id, window_id);

    session.send(&screen)?;
    resync(session, player, window_id)
}

/// Sends the authoritative contents of `window_id` and the cursor. Unknown
/// windows fall back to the player inventory.
fn resync(session: &Session, player: &Player, window_id: u8) -> Result<(), SessionError> {
    let content = match player.window_content(window_id) {
        Ok(content) => content,
        Err(_) => match player.window_content(0) {
            Ok(content) => content,
            Err(_) => return Ok(()),
        },
    };
    let state_id = content.state_id;
    session.send(&content)?;
    session.send(&player.cursor_packet(state_id))
}
